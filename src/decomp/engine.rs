//! Decompiler Engine - Disassemble, then reconstruct HLSL
//!
//! Single pass: disassembly feeds the decompiler, and any failure ends the
//! call without partial output.

use thiserror::Error;

use crate::container::BytecodeBlob;
use crate::decomp::backend::{DecompilerEngine, Disassembler};
use crate::decomp::disasm::{self, BackendError, DisassembleOptions, DisassemblyText};
use crate::diag::{LogContext, Stage};

/// Decompilation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecompileError {
    #[error("disassembly failed: {0}")]
    Disassembly(#[from] BackendError),

    #[error("decompiler produced no output or reported an internal error")]
    EmptyOutput,
}

/// Everything the decompiler engine gets to see
#[derive(Debug, Clone, Copy)]
pub struct DecompileParameters<'a> {
    bytecode: BytecodeBlob<'a>,
    disassembly: &'a DisassemblyText,
    /// IniParams register; None keeps it out of the output
    ini_params_reg: Option<u32>,
    /// StereoParams register; None keeps it out of the output
    stereo_params_reg: Option<u32>,
}

impl<'a> DecompileParameters<'a> {
    /// Bundle `bytecode` with its disassembly. Both register injections are
    /// always disabled so the output stays uninstrumented.
    pub fn new(bytecode: BytecodeBlob<'a>, disassembly: &'a DisassemblyText) -> Self {
        Self {
            bytecode,
            disassembly,
            ini_params_reg: None,
            stereo_params_reg: None,
        }
    }

    pub fn bytecode(&self) -> &'a [u8] {
        self.bytecode.as_bytes()
    }

    pub fn disassembly(&self) -> &'a DisassemblyText {
        self.disassembly
    }

    pub fn ini_params_reg(&self) -> Option<u32> {
        self.ini_params_reg
    }

    pub fn stereo_params_reg(&self) -> Option<u32> {
        self.stereo_params_reg
    }
}

/// Decompiled HLSL plus the shader model the engine detected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlslResult {
    /// Source bytes as produced by the engine, not re-encoded
    pub text: Vec<u8>,
    pub shader_model: String,
}

/// High-level decompiler over a pair of backends
pub struct Decompiler<'b> {
    disassembler: &'b dyn Disassembler,
    engine: &'b dyn DecompilerEngine,
    options: DisassembleOptions,
}

impl<'b> Decompiler<'b> {
    pub fn new(disassembler: &'b dyn Disassembler, engine: &'b dyn DecompilerEngine) -> Self {
        Self {
            disassembler,
            engine,
            options: DisassembleOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DisassembleOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &DisassembleOptions {
        &self.options
    }

    /// Disassemble only
    pub fn disassemble(
        &self,
        blob: BytecodeBlob<'_>,
        ctx: &LogContext,
    ) -> Result<DisassemblyText, BackendError> {
        disasm::disassemble(blob, self.disassembler, &self.options, ctx)
    }

    /// Decompile a validated blob into HLSL
    pub fn decompile(
        &self,
        blob: BytecodeBlob<'_>,
        ctx: &LogContext,
    ) -> Result<HlslResult, DecompileError> {
        let disassembly = self.disassemble(blob, ctx)?;

        ctx.info(Stage::Decompile, format_args!("creating HLSL representation"));
        let params = DecompileParameters::new(blob, &disassembly);
        let output = self.engine.decompile(&params);

        // A non-empty text is still a failure when the engine flagged an error
        if output.text.is_empty() || output.error_occurred {
            ctx.error(
                Stage::Decompile,
                format_args!(
                    "error while decompiling ({} bytes of text, error flag {})",
                    output.text.len(),
                    output.error_occurred
                ),
            );
            return Err(DecompileError::EmptyOutput);
        }

        ctx.debug(
            Stage::Decompile,
            format_args!(
                "{} bytes of HLSL, shader model {}",
                output.text.len(),
                output.shader_model
            ),
        );

        Ok(HlslResult {
            text: output.text,
            shader_model: output.shader_model,
        })
    }
}
