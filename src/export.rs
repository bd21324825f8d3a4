//! C ABI entry points
//!
//! `dxbc_decompile` returns an owned HLSL buffer or null with a zero
//! length. Every non-null result must be passed to `dxbc_free_data` exactly
//! once.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::OnceLock;

use crate::buffer::{self, OwnedBuffer};
use crate::decomp::{DecompilerEngine, Disassembler, NativeBackend};
use crate::diag::{LogContext, Stage};
use crate::pipeline::{Pipeline, PipelineConfig};

/// Built on the first call, never reset
static CONTEXT: OnceLock<LogContext> = OnceLock::new();

fn context() -> &'static LogContext {
    CONTEXT.get_or_init(LogContext::from_env)
}

/// Decompile a raw shader container into HLSL.
///
/// # Safety
/// `data` must point to `len` readable bytes (or be null) and `out_len`
/// must be null or point to writable memory.
#[no_mangle]
pub unsafe extern "C" fn dxbc_decompile(data: *const u8, len: usize, out_len: *mut usize) -> *mut u8 {
    let backend = NativeBackend::new();
    decompile_raw(data, len, out_len, &backend, &backend, context())
}

/// Body of `dxbc_decompile` over arbitrary backends.
///
/// # Safety
/// Same contract as `dxbc_decompile`.
pub(crate) unsafe fn decompile_raw(
    data: *const u8,
    len: usize,
    out_len: *mut usize,
    disassembler: &dyn Disassembler,
    engine: &dyn DecompilerEngine,
    ctx: &LogContext,
) -> *mut u8 {
    if !out_len.is_null() {
        *out_len = 0;
    }

    if data.is_null() || out_len.is_null() {
        ctx.error(Stage::Validate, format_args!("null input or output length pointer"));
        return ptr::null_mut();
    }

    let raw = std::slice::from_raw_parts(data, len);

    // Panics must not unwind into the foreign caller
    let result = catch_unwind(AssertUnwindSafe(|| {
        Pipeline::new(PipelineConfig::default(), disassembler, engine).decompile_to_buffer(raw, ctx)
    }));

    match result {
        Ok(Ok(buffer)) => {
            *out_len = buffer.len();
            buffer.into_raw()
        }
        Ok(Err(e)) => {
            ctx.error(e.stage(), format_args!("[native] decompile failed: {}", e));
            ptr::null_mut()
        }
        Err(_) => {
            ctx.error(Stage::Decompile, format_args!("[native] decompile panicked"));
            ptr::null_mut()
        }
    }
}

/// Release a buffer returned by `dxbc_decompile`. Null is ignored.
///
/// # Safety
/// `data` must be a pointer returned by `dxbc_decompile`, released at most
/// once.
#[no_mangle]
pub unsafe extern "C" fn dxbc_free_data(data: *mut u8) {
    if let Some(buffer) = OwnedBuffer::from_raw(data) {
        buffer::release(buffer);
    }
}
