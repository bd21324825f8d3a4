//! Backend seams - Disassembler and decompiler traits
//!
//! The pipeline talks to both external engines through these traits so a
//! native build and a test stub are interchangeable.

use std::ffi::{c_char, c_int, CString};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::decomp::disasm::DisassembleFlags;
use crate::decomp::engine::DecompileParameters;
use crate::decomp::ffi;

/// E_INVALIDARG, returned when the comment preamble cannot cross into C
pub const E_INVALIDARG: i32 = 0x8007_0057_u32 as i32;

/// Text owned by a backend. Released when dropped.
pub trait TextBlob {
    /// Raw backend bytes, possibly including a trailing NUL
    fn bytes(&self) -> &[u8];
}

impl TextBlob for Vec<u8> {
    fn bytes(&self) -> &[u8] {
        self
    }
}

/// Turns bytecode into per-instruction text
pub trait Disassembler {
    /// Returns the backend text blob, or the backend status code on failure
    fn disassemble(
        &self,
        bytecode: &[u8],
        flags: DisassembleFlags,
        comments: &str,
    ) -> Result<Box<dyn TextBlob + '_>, i32>;
}

/// What the decompiler engine reports back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    /// Generated source, exactly as the engine produced it
    pub text: Vec<u8>,
    pub shader_model: String,
    /// Engine-internal error flag, independent of `text`
    pub error_occurred: bool,
}

/// Reconstructs HLSL from bytecode plus its disassembly
pub trait DecompilerEngine {
    fn decompile(&self, params: &DecompileParameters<'_>) -> EngineOutput;
}

/// Backends provided by the linked native shim
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl NativeBackend {
    pub fn new() -> Self {
        Self
    }

    /// Check if the native library is linked
    pub fn is_available() -> bool {
        unsafe { ffi::dxbc_shim_is_available() != 0 }
    }
}

/// Blob returned by `dxbc_shim_disassemble`
struct NativeBlob {
    ptr: NonNull<ffi::NativeTextBlob>,
}

impl TextBlob for NativeBlob {
    fn bytes(&self) -> &[u8] {
        unsafe {
            let data = ffi::dxbc_shim_blob_data(self.ptr.as_ptr());
            let size = ffi::dxbc_shim_blob_size(self.ptr.as_ptr());
            if data.is_null() || size == 0 {
                &[]
            } else {
                std::slice::from_raw_parts(data as *const u8, size)
            }
        }
    }
}

impl Drop for NativeBlob {
    fn drop(&mut self) {
        unsafe { ffi::dxbc_shim_blob_release(self.ptr.as_ptr()) };
    }
}

impl Disassembler for NativeBackend {
    fn disassemble(
        &self,
        bytecode: &[u8],
        flags: DisassembleFlags,
        comments: &str,
    ) -> Result<Box<dyn TextBlob + '_>, i32> {
        let comments = CString::new(comments).map_err(|_| E_INVALIDARG)?;
        let mut blob: *mut ffi::NativeTextBlob = ptr::null_mut();

        let hr = unsafe {
            ffi::dxbc_shim_disassemble(
                bytecode.as_ptr(),
                bytecode.len(),
                flags.bits(),
                comments.as_ptr(),
                &mut blob,
            )
        };

        if hr < 0 {
            if let Some(blob) = NonNull::new(blob) {
                drop(NativeBlob { ptr: blob });
            }
            return Err(hr);
        }

        match NonNull::new(blob) {
            Some(ptr) => Ok(Box::new(NativeBlob { ptr })),
            None => Err(ffi::STUB_FAILURE),
        }
    }
}

impl DecompilerEngine for NativeBackend {
    fn decompile(&self, params: &DecompileParameters<'_>) -> EngineOutput {
        let disassembly = params.disassembly().as_bytes();
        let raw_params = ffi::DecompileParamsC {
            bytecode: params.bytecode().as_ptr().cast(),
            bytecode_len: params.bytecode().len(),
            disassembly: disassembly.as_ptr() as *const c_char,
            disassembly_len: disassembly.len(),
            ini_params_reg: register_slot(params.ini_params_reg()),
            stereo_params_reg: register_slot(params.stereo_params_reg()),
            zero_output: 0,
            fix_sv_position: 0,
            recompile_vs: 0,
        };
        let mut out = ffi::DecompileOutputC::default();

        let hr = unsafe { ffi::dxbc_shim_decompile(&raw_params, &mut out) };

        // The shim hands over both strings even on failure
        let text = unsafe { take_native_bytes(out.text, out.text_len) };
        let shader_model = unsafe { take_native_bytes(out.shader_model, out.shader_model_len) };

        EngineOutput {
            text,
            shader_model: String::from_utf8_lossy(&shader_model).into_owned(),
            error_occurred: hr < 0 || out.error_occurred != 0,
        }
    }
}

/// Deterministic stand-in for both backends, used when no native library is
/// linked and in tests. Counts how often each backend is entered.
#[derive(Debug, Default)]
pub struct StubBackend {
    hlsl: Vec<u8>,
    shader_model: String,
    error_occurred: bool,
    disasm_status: Option<i32>,
    disasm_calls: AtomicUsize,
    decompile_calls: AtomicUsize,
}

impl StubBackend {
    pub fn new(hlsl: impl Into<Vec<u8>>) -> Self {
        Self {
            hlsl: hlsl.into(),
            shader_model: "ps_5_0".to_string(),
            ..Default::default()
        }
    }

    pub fn with_shader_model(mut self, shader_model: impl Into<String>) -> Self {
        self.shader_model = shader_model.into();
        self
    }

    /// Raise the engine's internal error flag on every decompile
    pub fn with_error_flag(mut self) -> Self {
        self.error_occurred = true;
        self
    }

    /// Make every disassembly fail with `status`
    pub fn failing_disassembly(mut self, status: i32) -> Self {
        self.disasm_status = Some(status);
        self
    }

    pub fn disasm_calls(&self) -> usize {
        self.disasm_calls.load(Ordering::SeqCst)
    }

    pub fn decompile_calls(&self) -> usize {
        self.decompile_calls.load(Ordering::SeqCst)
    }
}

impl Disassembler for StubBackend {
    fn disassemble(
        &self,
        bytecode: &[u8],
        _flags: DisassembleFlags,
        _comments: &str,
    ) -> Result<Box<dyn TextBlob + '_>, i32> {
        self.disasm_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.disasm_status {
            return Err(status);
        }

        let mut text = String::from("// [Stub] Native disassembler not linked\n");
        for (i, chunk) in bytecode.chunks(16).enumerate() {
            text.push_str(&format!("// {:08x}:  {}\n", i * 16, hex::encode(chunk)));
        }

        // Mimic the backend's NUL-terminated blob
        let mut bytes = text.into_bytes();
        bytes.push(0);
        Ok(Box::new(bytes))
    }
}

impl DecompilerEngine for StubBackend {
    fn decompile(&self, _params: &DecompileParameters<'_>) -> EngineOutput {
        self.decompile_calls.fetch_add(1, Ordering::SeqCst);
        EngineOutput {
            text: self.hlsl.clone(),
            shader_model: self.shader_model.clone(),
            error_occurred: self.error_occurred,
        }
    }
}

fn register_slot(reg: Option<u32>) -> c_int {
    reg.and_then(|r| c_int::try_from(r).ok()).unwrap_or(-1)
}

/// Copy a shim-allocated string byte for byte and free it
unsafe fn take_native_bytes(ptr: *mut c_char, len: usize) -> Vec<u8> {
    if ptr.is_null() {
        return Vec::new();
    }
    let bytes = std::slice::from_raw_parts(ptr as *const u8, len).to_vec();
    ffi::dxbc_shim_string_free(ptr);
    bytes
}
