//! Decompiler orchestration tests against stub backends

use std::cell::RefCell;

use super::{
    DecompileError, DecompileParameters, Decompiler, DecompilerEngine, DisassembleFlags,
    Disassembler, EngineOutput, StubBackend, TextBlob,
};
use crate::container::validate;
use crate::diag::LogContext;

/// Minimal DXBC-tagged blob: magic plus six payload bytes
const SIMPLE_BLOB: &[u8] = &[
    b'D', b'X', b'B', b'C', // magic
    0x10, 0x20, 0x30, 0x40, 0x50, 0x60,
];

#[test]
fn test_stub_decompile() {
    let stub = StubBackend::new("dummy_hlsl").with_shader_model("vs_4_0");
    let ctx = LogContext::default();
    let blob = validate(SIMPLE_BLOB, 0, &ctx).unwrap();

    let result = Decompiler::new(&stub, &stub).decompile(blob, &ctx).unwrap();

    assert_eq!(result.text, b"dummy_hlsl");
    assert_eq!(result.shader_model, "vs_4_0");
    assert_eq!(stub.disasm_calls(), 1);
    assert_eq!(stub.decompile_calls(), 1);
}

#[test]
fn test_stub_disassemble() {
    let stub = StubBackend::new("unused");
    let ctx = LogContext::default();
    let blob = validate(SIMPLE_BLOB, 0, &ctx).unwrap();

    let text = Decompiler::new(&stub, &stub).disassemble(blob, &ctx).unwrap();

    assert!(text.as_bytes().starts_with(b"// [Stub]"));
    assert!(text.to_string_lossy().contains("4458424310203040"));
    assert!(!text.as_bytes().contains(&0));
    assert_eq!(stub.decompile_calls(), 0);
}

#[test]
fn test_error_flag_with_text_fails() {
    let stub = StubBackend::new("float4 main() : SV_Target { return 0; }").with_error_flag();
    let ctx = LogContext::default();
    let blob = validate(SIMPLE_BLOB, 0, &ctx).unwrap();

    let result = Decompiler::new(&stub, &stub).decompile(blob, &ctx);
    assert_eq!(result, Err(DecompileError::EmptyOutput));
}

#[test]
fn test_empty_text_fails() {
    let stub = StubBackend::new("");
    let ctx = LogContext::default();
    let blob = validate(SIMPLE_BLOB, 0, &ctx).unwrap();

    let result = Decompiler::new(&stub, &stub).decompile(blob, &ctx);
    assert_eq!(result, Err(DecompileError::EmptyOutput));
}

#[test]
fn test_disassembly_failure_skips_engine() {
    let stub = StubBackend::new("dummy_hlsl").failing_disassembly(-1);
    let ctx = LogContext::default();
    let blob = validate(SIMPLE_BLOB, 0, &ctx).unwrap();

    let err = Decompiler::new(&stub, &stub).decompile(blob, &ctx).unwrap_err();

    assert!(matches!(err, DecompileError::Disassembly(_)));
    assert_eq!(stub.disasm_calls(), 1);
    assert_eq!(stub.decompile_calls(), 0);
}

/// Captures the parameter bundle it receives
#[derive(Default)]
struct CapturingEngine {
    seen: RefCell<Option<(usize, Vec<u8>, Option<u32>, Option<u32>)>>,
}

impl DecompilerEngine for CapturingEngine {
    fn decompile(&self, params: &DecompileParameters<'_>) -> EngineOutput {
        *self.seen.borrow_mut() = Some((
            params.bytecode().len(),
            params.disassembly().as_bytes().to_vec(),
            params.ini_params_reg(),
            params.stereo_params_reg(),
        ));
        EngineOutput {
            text: b"void main() {}".to_vec(),
            shader_model: "cs_5_0".to_string(),
            error_occurred: false,
        }
    }
}

#[test]
fn test_parameters_reference_blob_and_disable_registers() {
    let disassembler = StubBackend::new("unused");
    let engine = CapturingEngine::default();
    let ctx = LogContext::default();
    let blob = validate(SIMPLE_BLOB, 0, &ctx).unwrap();

    Decompiler::new(&disassembler, &engine)
        .decompile(blob, &ctx)
        .unwrap();

    let seen = engine.seen.borrow();
    let (len, disassembly, ini, stereo) = seen.as_ref().unwrap();
    assert_eq!(*len, SIMPLE_BLOB.len());
    assert!(disassembly.starts_with(b"// [Stub]"));
    assert_eq!(*ini, None);
    assert_eq!(*stereo, None);
}

/// Answers with a fixed, NUL-terminated disassembly
struct FixedDisassembler(&'static [u8]);

impl Disassembler for FixedDisassembler {
    fn disassemble(
        &self,
        _bytecode: &[u8],
        _flags: DisassembleFlags,
        _comments: &str,
    ) -> Result<Box<dyn TextBlob + '_>, i32> {
        Ok(Box::new(self.0.to_vec()))
    }
}

#[test]
fn test_non_utf8_bytes_reach_engine_and_output_unchanged() {
    // cp949 resource name inside an RDEF comment
    let disassembler = FixedDisassembler(b"// Resource Bindings:\n// \xb0\xa1 texture\nret\n\0");
    let engine = CapturingEngine::default();
    let ctx = LogContext::default();
    let blob = validate(SIMPLE_BLOB, 0, &ctx).unwrap();

    Decompiler::new(&disassembler, &engine)
        .decompile(blob, &ctx)
        .unwrap();

    let seen = engine.seen.borrow();
    let (_, disassembly, _, _) = seen.as_ref().unwrap();
    assert_eq!(
        disassembly.as_slice(),
        b"// Resource Bindings:\n// \xb0\xa1 texture\nret\n"
    );

    let stub = StubBackend::new(&b"Texture2D \xb0\xa1 : register(t0);\n"[..]);
    let result = Decompiler::new(&stub, &stub).decompile(blob, &ctx).unwrap();
    assert_eq!(result.text, b"Texture2D \xb0\xa1 : register(t0);\n");
}
