//! dxbc-decomp - Compiled DXBC shader containers to HLSL source
//!
//! Strips the container envelope, validates the DXBC blob, disassembles it,
//! decompiles the disassembly into HLSL and hands the text to a foreign
//! caller as an owned buffer.

pub mod buffer;
pub mod container;
pub mod decomp;
pub mod diag;
pub mod export;
pub mod pipeline;

pub use buffer::{package, release, OwnedBuffer};
pub use container::{validate, BytecodeBlob, InputError};
pub use decomp::{DecompileError, Decompiler, HlslResult};
pub use diag::LogContext;
pub use pipeline::{Pipeline, PipelineBuilder, PipelineConfig, PipelineError};
