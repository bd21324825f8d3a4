//! Pipeline - validate, decompile, package
//!
//! Ties the container validator, the decompiler and the buffer broker
//! together. Stateless between calls; every call takes the logging context
//! explicitly.

use thiserror::Error;

use crate::buffer::{self, OwnedBuffer};
use crate::container::{self, BytecodeBlob, InputError, DEFAULT_PREFIX_LEN};
use crate::decomp::{
    BackendError, DecompileError, Decompiler, DecompilerEngine, DisassembleFlags,
    DisassembleOptions, Disassembler, DisassemblyText, HlslResult,
};
use crate::diag::{LogContext, Stage};

/// Any failure of a pipeline run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    Input(#[from] InputError),

    #[error(transparent)]
    Decompile(#[from] DecompileError),
}

impl PipelineError {
    /// Stage at which the run failed
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Input(_) => Stage::Validate,
            PipelineError::Decompile(DecompileError::Disassembly(_)) => Stage::Disassemble,
            PipelineError::Decompile(DecompileError::EmptyOutput) => Stage::Decompile,
        }
    }
}

impl From<BackendError> for PipelineError {
    fn from(err: BackendError) -> Self {
        PipelineError::Decompile(DecompileError::Disassembly(err))
    }
}

/// Tunables for a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Envelope bytes skipped before the DXBC magic
    pub prefix_len: usize,
    pub disassemble: DisassembleOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prefix_len: DEFAULT_PREFIX_LEN,
            disassemble: DisassembleOptions::default(),
        }
    }
}

/// Container-to-HLSL pipeline over a pair of backends
pub struct Pipeline<'b> {
    prefix_len: usize,
    decompiler: Decompiler<'b>,
}

impl<'b> Pipeline<'b> {
    pub fn new(
        config: PipelineConfig,
        disassembler: &'b dyn Disassembler,
        engine: &'b dyn DecompilerEngine,
    ) -> Self {
        Self {
            prefix_len: config.prefix_len,
            decompiler: Decompiler::new(disassembler, engine).with_options(config.disassemble),
        }
    }

    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    pub fn validate<'a>(
        &self,
        raw: &'a [u8],
        ctx: &LogContext,
    ) -> Result<BytecodeBlob<'a>, InputError> {
        container::validate(raw, self.prefix_len, ctx)
    }

    /// Validate and disassemble without decompiling
    pub fn disassemble(&self, raw: &[u8], ctx: &LogContext) -> Result<DisassemblyText, PipelineError> {
        let blob = self.validate(raw, ctx)?;
        Ok(self.decompiler.disassemble(blob, ctx)?)
    }

    /// Validate and decompile a raw container
    pub fn decompile(&self, raw: &[u8], ctx: &LogContext) -> Result<HlslResult, PipelineError> {
        let blob = self.validate(raw, ctx)?;

        ctx.info(Stage::Decompile, format_args!("start decompile"));
        let result = self.decompiler.decompile(blob, ctx)?;
        ctx.info(Stage::Decompile, format_args!("end decompile"));

        Ok(result)
    }

    /// Decompile a raw container into a caller-owned buffer
    pub fn decompile_to_buffer(
        &self,
        raw: &[u8],
        ctx: &LogContext,
    ) -> Result<OwnedBuffer, PipelineError> {
        let result = self.decompile(raw, ctx)?;
        let buffer = buffer::package(&result.text);
        ctx.debug(
            Stage::Package,
            format_args!("{} byte buffer for {}", buffer.len(), result.shader_model),
        );
        Ok(buffer)
    }
}

/// Builder for Pipeline with configuration options
pub struct PipelineBuilder<'b> {
    config: PipelineConfig,
    disassembler: &'b dyn Disassembler,
    engine: &'b dyn DecompilerEngine,
}

impl<'b> PipelineBuilder<'b> {
    pub fn new(disassembler: &'b dyn Disassembler, engine: &'b dyn DecompilerEngine) -> Self {
        Self {
            config: PipelineConfig::default(),
            disassembler,
            engine,
        }
    }

    /// Set the envelope length
    pub fn prefix_len(mut self, prefix_len: usize) -> Self {
        self.config.prefix_len = prefix_len;
        self
    }

    /// Extra disassembler flags; default-value prints stay enabled
    pub fn disasm_flags(mut self, flags: DisassembleFlags) -> Self {
        self.config.disassemble.flags = flags;
        self
    }

    /// Tool identity written into the disassembly preamble
    pub fn tool(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.config.disassemble.tool_name = name.into();
        self.config.disassemble.tool_version = version.into();
        self
    }

    pub fn build(self) -> Pipeline<'b> {
        Pipeline::new(self.config, self.disassembler, self.engine)
    }
}
