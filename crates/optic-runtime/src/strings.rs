use std::cmp::Ordering;
use std::rc::Rc;

use optic_arena::{Arena, ArenaBuf};

/// Shared, arena-charged, NUL-terminated string.
///
/// Cloning shares the allocation and bumps the ref count; the final release
/// returns the buffer to the arena's accounting. The stored buffer is
/// `len() + 1` bytes with a terminating NUL; the payload may itself contain
/// NUL bytes (the length is authoritative).
#[derive(Clone)]
pub struct RtString {
    inner: Rc<StrInner>,
}

struct StrInner {
    arena: Arena,
    buf: ArenaBuf,
}

/// Allocates a string of `length` bytes plus a NUL terminator.
///
/// When `data` is given, its first `length` bytes are copied in; otherwise
/// the payload is zero-filled.
pub fn make_string(arena: &Arena, length: usize, data: Option<&[u8]>) -> RtString {
    let mut buf = arena.alloc(length + 1);
    if let Some(data) = data {
        buf[..length].copy_from_slice(&data[..length]);
    }
    buf[length] = 0;
    RtString {
        inner: Rc::new(StrInner {
            arena: arena.clone(),
            buf,
        }),
    }
}

impl RtString {
    pub fn from_bytes(arena: &Arena, data: &[u8]) -> Self {
        make_string(arena, data.len(), Some(data))
    }

    /// Length in bytes, excluding the NUL terminator.
    pub fn len(&self) -> usize {
        self.inner.buf.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payload bytes, excluding the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner.buf.as_slice()[..self.len()]
    }

    /// Payload bytes including the terminator.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        self.inner.buf.as_slice()
    }

    /// Number of owners of the underlying allocation.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Whether two strings share one allocation.
    pub fn same_allocation(&self, other: &RtString) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Concatenation. When either side is empty the other is returned with
    /// its ref count bumped; otherwise a fresh string is allocated in
    /// `self`'s arena.
    pub fn concat(&self, other: &RtString) -> RtString {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }

        let len = self.len() + other.len();
        let mut buf = self.inner.arena.alloc(len + 1);
        buf[..self.len()].copy_from_slice(self.as_bytes());
        buf[self.len()..len].copy_from_slice(other.as_bytes());
        buf[len] = 0;
        RtString {
            inner: Rc::new(StrInner {
                arena: self.inner.arena.clone(),
                buf,
            }),
        }
    }

    /// Byte-wise lexicographic comparison over the NUL-included buffers:
    /// standard byte ordering over the common length, then by length.
    pub fn compare(&self, other: &RtString) -> Ordering {
        if self.same_allocation(other) {
            return Ordering::Equal;
        }
        self.as_bytes_with_nul().cmp(other.as_bytes_with_nul())
    }
}

impl PartialEq for RtString {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for RtString {}

impl std::fmt::Debug for RtString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RtString({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}
