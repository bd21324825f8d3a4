//! Disassembly adapter
//!
//! Runs the external disassembler over a validated blob and normalizes the
//! result into plain text without a terminator byte, so line-based diff
//! tools treat dumped output as ordinary text.

use std::borrow::Cow;

use bitflags::bitflags;
use thiserror::Error;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::container::BytecodeBlob;
use crate::decomp::backend::Disassembler;
use crate::diag::{LogContext, Stage};

bitflags! {
    /// D3D_DISASM_* flags understood by the disassembler
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DisassembleFlags: u32 {
        const ENABLE_COLOR_CODE = 0x0000_0001;
        const ENABLE_DEFAULT_VALUE_PRINTS = 0x0000_0002;
        const ENABLE_INSTRUCTION_NUMBERING = 0x0000_0004;
        const ENABLE_INSTRUCTION_CYCLE = 0x0000_0008;
        const DISABLE_DEBUG_INFO = 0x0000_0010;
        const ENABLE_INSTRUCTION_OFFSET = 0x0000_0020;
        const INSTRUCTION_ONLY = 0x0000_0040;
        const PRINT_HEX_LITERALS = 0x0000_0080;
    }
}

impl Default for DisassembleFlags {
    fn default() -> Self {
        Self::ENABLE_DEFAULT_VALUE_PRINTS
    }
}

/// Failure reported by an external backend
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend failed with status {0:#010x}")]
    BackendFailure(i32),
}

/// Disassembly text with no embedded NUL bytes.
///
/// Kept as the backend's raw bytes: names in the resource definitions may
/// use a legacy code page, and the decompiler must see them unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisassemblyText(Vec<u8>);

impl DisassemblyText {
    /// Build from backend bytes, cutting at the first NUL
    pub fn from_backend_bytes(bytes: &[u8]) -> Self {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Self(bytes[..end].to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lossy view for display
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Disassembler settings and the identity written into the comment preamble
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisassembleOptions {
    pub flags: DisassembleFlags,
    pub tool_name: String,
    pub tool_version: String,
}

impl Default for DisassembleOptions {
    fn default() -> Self {
        Self {
            flags: DisassembleFlags::default(),
            tool_name: env!("CARGO_PKG_NAME").to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl DisassembleOptions {
    /// Flags actually sent to the backend; default-value prints are always on
    pub fn effective_flags(&self) -> DisassembleFlags {
        self.flags | DisassembleFlags::ENABLE_DEFAULT_VALUE_PRINTS
    }

    /// Comment block prepended to the disassembly
    pub fn comment_preamble(&self, now: OffsetDateTime) -> String {
        let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
        let timestamp = now
            .format(&format)
            .unwrap_or_else(|_| now.unix_timestamp().to_string());
        format!(
            "//   using {} v{} on {}\n//\n",
            self.tool_name, self.tool_version, timestamp
        )
    }
}

/// Disassemble a validated blob through `disassembler`
pub fn disassemble(
    blob: BytecodeBlob<'_>,
    disassembler: &dyn Disassembler,
    options: &DisassembleOptions,
    ctx: &LogContext,
) -> Result<DisassemblyText, BackendError> {
    let comments = options.comment_preamble(OffsetDateTime::now_utc());
    let flags = options.effective_flags();
    ctx.debug(
        Stage::Disassemble,
        format_args!("{} bytes, flags {:#x}", blob.len(), flags.bits()),
    );

    let text = match disassembler.disassemble(blob.as_bytes(), flags, &comments) {
        Ok(text_blob) => DisassemblyText::from_backend_bytes(text_blob.bytes()),
        Err(code) => {
            ctx.error(
                Stage::Disassemble,
                format_args!("disassembly failed. Error: {:#x}", code),
            );
            return Err(BackendError::BackendFailure(code));
        }
    };

    ctx.debug(
        Stage::Disassemble,
        format_args!("{} bytes of disassembly", text.len()),
    );
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::validate;
    use crate::decomp::backend::TextBlob;
    use std::cell::RefCell;
    use time::macros::datetime;

    const BLOB: &[u8] = b"DXBC\x00\x01\x02\x03\x04\x05";

    /// Records what it was called with, then answers with `reply`
    struct RecordingDisassembler {
        reply: Result<Vec<u8>, i32>,
        seen: RefCell<Vec<(usize, DisassembleFlags, String)>>,
    }

    impl Disassembler for RecordingDisassembler {
        fn disassemble(
            &self,
            bytecode: &[u8],
            flags: DisassembleFlags,
            comments: &str,
        ) -> Result<Box<dyn TextBlob + '_>, i32> {
            self.seen
                .borrow_mut()
                .push((bytecode.len(), flags, comments.to_string()));
            match &self.reply {
                Ok(bytes) => Ok(Box::new(bytes.clone())),
                Err(code) => Err(*code),
            }
        }
    }

    #[test]
    fn test_terminator_is_stripped() {
        let backend = RecordingDisassembler {
            reply: Ok(b"ps_5_0\ndcl_globalFlags refactoringAllowed\n\0".to_vec()),
            seen: RefCell::default(),
        };
        let ctx = LogContext::default();
        let blob = validate(BLOB, 0, &ctx).unwrap();

        let text = disassemble(blob, &backend, &DisassembleOptions::default(), &ctx).unwrap();

        assert_eq!(text.as_bytes(), b"ps_5_0\ndcl_globalFlags refactoringAllowed\n");
        assert!(!text.as_bytes().contains(&0));
    }

    #[test]
    fn test_backend_receives_flags_and_preamble() {
        let backend = RecordingDisassembler {
            reply: Ok(b"vs_4_0\n".to_vec()),
            seen: RefCell::default(),
        };
        let ctx = LogContext::default();
        let blob = validate(BLOB, 0, &ctx).unwrap();
        let options = DisassembleOptions {
            flags: DisassembleFlags::PRINT_HEX_LITERALS,
            ..Default::default()
        };

        disassemble(blob, &backend, &options, &ctx).unwrap();

        let seen = backend.seen.borrow();
        assert_eq!(seen.len(), 1);
        let (len, flags, comments) = &seen[0];
        assert_eq!(*len, BLOB.len());
        assert!(flags.contains(DisassembleFlags::ENABLE_DEFAULT_VALUE_PRINTS));
        assert!(flags.contains(DisassembleFlags::PRINT_HEX_LITERALS));
        assert!(comments.starts_with("//   using dxbc-decomp v"));
    }

    #[test]
    fn test_backend_failure_code() {
        let backend = RecordingDisassembler {
            reply: Err(0x8000_4005_u32 as i32),
            seen: RefCell::default(),
        };
        let ctx = LogContext::default();
        let blob = validate(BLOB, 0, &ctx).unwrap();

        let err = disassemble(blob, &backend, &DisassembleOptions::default(), &ctx).unwrap_err();
        assert_eq!(err, BackendError::BackendFailure(0x8000_4005_u32 as i32));
        assert_eq!(err.to_string(), "backend failed with status 0x80004005");
    }

    #[test]
    fn test_comment_preamble() {
        let options = DisassembleOptions {
            flags: DisassembleFlags::empty(),
            tool_name: "tool".to_string(),
            tool_version: "1.2.3".to_string(),
        };
        assert_eq!(
            options.comment_preamble(datetime!(2024-03-05 07:08:09 UTC)),
            "//   using tool v1.2.3 on 2024-03-05 07:08:09\n//\n"
        );
        assert_eq!(
            options.effective_flags(),
            DisassembleFlags::ENABLE_DEFAULT_VALUE_PRINTS
        );
    }

    #[test]
    fn test_text_without_terminator() {
        let text = DisassemblyText::from_backend_bytes(b"ret\n");
        assert_eq!(text.into_bytes(), b"ret\n");
    }

    #[test]
    fn test_code_page_bytes_pass_through() {
        let raw = b"// name \xb0\xa1\nret\n\0";
        let text = DisassemblyText::from_backend_bytes(raw);

        assert_eq!(text.len(), 15);
        assert_eq!(text.as_bytes(), &raw[..15]);
    }
}
