//! FFI Bindings for the native DXBC backends
//!
//! Unsafe C bindings to `native/dxbc_shim.cpp`, which wraps the D3DCompiler
//! disassembler and the HLSL decompiler.
//! When native_decomp feature is not enabled, these are stub functions.

use std::ffi::{c_char, c_int, c_void};

/// Opaque reference-counted text blob owned by the disassembler
#[repr(C)]
pub struct NativeTextBlob {
    _private: [u8; 0],
}

/// Parameter bundle handed to the decompiler, zeroed except for the fields set below
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DecompileParamsC {
    pub bytecode: *const c_void,
    pub bytecode_len: usize,
    pub disassembly: *const c_char,
    pub disassembly_len: usize,
    /// Register slot for IniParams, -1 disables it
    pub ini_params_reg: c_int,
    /// Register slot for StereoParams, -1 disables it
    pub stereo_params_reg: c_int,
    pub zero_output: c_int,
    pub fix_sv_position: c_int,
    pub recompile_vs: c_int,
}

/// Output of a decompile call; strings are freed with `dxbc_shim_string_free`
#[repr(C)]
#[derive(Debug)]
pub struct DecompileOutputC {
    pub text: *mut c_char,
    pub text_len: usize,
    pub shader_model: *mut c_char,
    pub shader_model_len: usize,
    pub error_occurred: c_int,
}

impl Default for DecompileOutputC {
    fn default() -> Self {
        Self {
            text: std::ptr::null_mut(),
            text_len: 0,
            shader_model: std::ptr::null_mut(),
            shader_model_len: 0,
            error_occurred: 0,
        }
    }
}

/// Status returned by the stubs (E_FAIL)
pub const STUB_FAILURE: c_int = 0x8000_4005_u32 as c_int;

// Only link native library when feature is enabled
#[cfg(feature = "native_decomp")]
#[link(name = "dxbc_shim", kind = "static")]
extern "C" {
    pub fn dxbc_shim_disassemble(
        bytecode: *const u8,
        bytecode_len: usize,
        flags: u32,
        comments: *const c_char,
        out_blob: *mut *mut NativeTextBlob,
    ) -> c_int;
    pub fn dxbc_shim_blob_data(blob: *mut NativeTextBlob) -> *const c_char;
    pub fn dxbc_shim_blob_size(blob: *mut NativeTextBlob) -> usize;
    pub fn dxbc_shim_blob_release(blob: *mut NativeTextBlob);
    pub fn dxbc_shim_decompile(params: *const DecompileParamsC, out: *mut DecompileOutputC) -> c_int;
    pub fn dxbc_shim_string_free(s: *mut c_char);
    pub fn dxbc_shim_is_available() -> c_int;
}

// Stub implementations when native is disabled
#[cfg(not(feature = "native_decomp"))]
pub unsafe fn dxbc_shim_disassemble(
    _bytecode: *const u8,
    _bytecode_len: usize,
    _flags: u32,
    _comments: *const c_char,
    _out_blob: *mut *mut NativeTextBlob,
) -> c_int {
    STUB_FAILURE
}

#[cfg(not(feature = "native_decomp"))]
pub unsafe fn dxbc_shim_blob_data(_blob: *mut NativeTextBlob) -> *const c_char {
    std::ptr::null()
}

#[cfg(not(feature = "native_decomp"))]
pub unsafe fn dxbc_shim_blob_size(_blob: *mut NativeTextBlob) -> usize {
    0
}

#[cfg(not(feature = "native_decomp"))]
pub unsafe fn dxbc_shim_blob_release(_blob: *mut NativeTextBlob) {}

#[cfg(not(feature = "native_decomp"))]
pub unsafe fn dxbc_shim_decompile(
    _params: *const DecompileParamsC,
    _out: *mut DecompileOutputC,
) -> c_int {
    STUB_FAILURE
}

#[cfg(not(feature = "native_decomp"))]
pub unsafe fn dxbc_shim_string_free(_s: *mut c_char) {}

#[cfg(not(feature = "native_decomp"))]
pub unsafe fn dxbc_shim_is_available() -> c_int {
    0
}
