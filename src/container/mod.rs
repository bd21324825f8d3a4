//! Container Module - Envelope stripping and DXBC validation
//!
//! Raw containers carry an opaque envelope ahead of the bytecode. The
//! validator removes it and checks that what remains looks like DXBC
//! before any backend sees the bytes.

use thiserror::Error;

use crate::diag::{LogContext, Stage};

/// Bytes of opaque envelope in front of the bytecode
pub const DEFAULT_PREFIX_LEN: usize = 38;

/// Magic tag at the start of every bytecode blob
pub const DXBC_MAGIC: &[u8; 4] = b"DXBC";

/// Smallest blob handed to the backends
pub const MIN_BLOB_LEN: usize = 10;

/// Input validation errors, detected before any backend call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("bytecode is {len} bytes after the envelope, need at least {min}")]
    InvalidLength { len: usize, min: usize },

    #[error("bad magic {}, expected DXBC", hex::encode(.found))]
    InvalidMagic { found: [u8; 4] },
}

/// Validated bytecode, borrowed from the raw container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BytecodeBlob<'a> {
    bytes: &'a [u8],
}

impl<'a> BytecodeBlob<'a> {
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Strip `prefix_len` bytes from `raw` and validate the rest as DXBC
pub fn validate<'a>(
    raw: &'a [u8],
    prefix_len: usize,
    ctx: &LogContext,
) -> Result<BytecodeBlob<'a>, InputError> {
    // A container shorter than its envelope has nothing left
    let bytes = raw.get(prefix_len..).unwrap_or(&[]);

    if bytes.len() < MIN_BLOB_LEN {
        ctx.error(
            Stage::Validate,
            format_args!(
                "invalid DXBC input: {} bytes after {} byte envelope (raw {} bytes), need {}",
                bytes.len(),
                prefix_len,
                raw.len(),
                MIN_BLOB_LEN
            ),
        );
        return Err(InputError::InvalidLength {
            len: bytes.len(),
            min: MIN_BLOB_LEN,
        });
    }

    let mut found = [0u8; 4];
    found.copy_from_slice(&bytes[..4]);
    ctx.debug(
        Stage::Validate,
        format_args!("magic bytes {}, blob {} bytes", hex::encode(found), bytes.len()),
    );

    if &found != DXBC_MAGIC {
        ctx.error(
            Stage::Validate,
            format_args!("invalid DXBC input: magic {} is not DXBC", hex::encode(found)),
        );
        return Err(InputError::InvalidMagic { found });
    }

    Ok(BytecodeBlob { bytes })
}
