//! Buffer ownership across the foreign boundary
//!
//! An `OwnedBuffer` is handed to the caller and must come back through
//! `release` exactly once. It has no `Drop`: dropping one without
//! releasing it leaks the allocation.
//!
//! Each allocation starts with a `usize` header holding the content length,
//! followed by exactly that many content bytes. The caller only ever sees
//! the content pointer, so a release needs nothing but that pointer.

use std::alloc::{self, Layout};
use std::mem::{align_of, size_of};
use std::ptr::{self, NonNull};

const HEADER: usize = size_of::<usize>();

/// Exact-size byte buffer whose ownership passes to the caller
#[derive(Debug)]
#[must_use = "an OwnedBuffer must be passed to `release` exactly once"]
pub struct OwnedBuffer {
    /// First content byte, `HEADER` bytes into the allocation
    ptr: NonNull<u8>,
    len: usize,
}

// The buffer is uniquely owned heap memory
unsafe impl Send for OwnedBuffer {}

fn layout_for(len: usize) -> Layout {
    HEADER
        .checked_add(len)
        .and_then(|size| Layout::from_size_align(size, align_of::<usize>()).ok())
        .unwrap_or_else(|| panic!("buffer of {} bytes exceeds the address space", len))
}

impl OwnedBuffer {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Give up the buffer as a content pointer for a foreign caller
    pub fn into_raw(self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Take back a buffer previously given up by `into_raw`.
    ///
    /// # Safety
    /// `ptr` must come from `into_raw` on a buffer made by `package`, and
    /// must not have been taken back before. Anything else is an ownership
    /// misuse this module cannot detect.
    pub unsafe fn from_raw(ptr: *mut u8) -> Option<Self> {
        let ptr = NonNull::new(ptr)?;
        let len = (ptr.as_ptr().sub(HEADER) as *const usize).read();
        Some(Self { ptr, len })
    }
}

/// Copy `text` into a new allocation whose content is exactly its length
pub fn package(text: &[u8]) -> OwnedBuffer {
    let len = text.len();
    let layout = layout_for(len);

    unsafe {
        let base = alloc::alloc(layout);
        if base.is_null() {
            alloc::handle_alloc_error(layout);
        }
        (base as *mut usize).write(len);
        let content = base.add(HEADER);
        ptr::copy_nonoverlapping(text.as_ptr(), content, len);

        OwnedBuffer {
            ptr: NonNull::new_unchecked(content),
            len,
        }
    }
}

/// Free a buffer made by `package`
pub fn release(buffer: OwnedBuffer) {
    unsafe {
        let base = buffer.ptr.as_ptr().sub(HEADER);
        let len = (base as *const usize).read();
        debug_assert_eq!(len, buffer.len);
        alloc::dealloc(base, layout_for(len));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_exact_length() {
        let buffer = package(b"dummy_hlsl");

        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.as_bytes(), b"dummy_hlsl");
        release(buffer);
    }

    #[test]
    fn test_pointer_only_roundtrip() {
        let ptr = package(b"float4 main() : SV_Target;").into_raw();
        assert!(!ptr.is_null());

        let buffer = unsafe { OwnedBuffer::from_raw(ptr) }.unwrap();
        assert_eq!(buffer.len(), 26);
        assert_eq!(buffer.as_bytes(), b"float4 main() : SV_Target;");
        release(buffer);
    }

    #[test]
    fn test_content_is_aligned_after_header() {
        let buffer = package(b"x");
        assert_eq!(buffer.as_bytes().as_ptr() as usize % align_of::<usize>(), 0);
        release(buffer);
    }

    #[test]
    fn test_null_is_not_a_buffer() {
        assert!(unsafe { OwnedBuffer::from_raw(ptr::null_mut()) }.is_none());
    }

    #[test]
    fn test_empty_text() {
        let ptr = package(b"").into_raw();
        let buffer = unsafe { OwnedBuffer::from_raw(ptr) }.unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.as_bytes(), b"");
        release(buffer);
    }

    #[test]
    fn test_non_utf8_bytes_kept() {
        let buffer = package(b"// \xb0\xa1\n");
        assert_eq!(buffer.as_bytes(), b"// \xb0\xa1\n");
        release(buffer);
    }
}
