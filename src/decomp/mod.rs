//! Decompiler Module - D3DCompiler disassembly + HLSL decompiler integration
//!
//! Drives the external disassembler and decompiler through the traits in
//! `backend`. The native implementations live behind the `native_decomp`
//! feature; without it they report failure.

pub mod backend;
pub mod disasm;
pub mod engine;
pub mod ffi;

#[cfg(test)]
mod tests;

pub use backend::{
    DecompilerEngine, Disassembler, EngineOutput, NativeBackend, StubBackend, TextBlob,
};
pub use disasm::{BackendError, DisassembleFlags, DisassembleOptions, DisassemblyText};
pub use engine::{DecompileError, DecompileParameters, Decompiler, HlslResult};
