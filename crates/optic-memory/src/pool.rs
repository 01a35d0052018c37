use bytes::Bytes;
use optic_arena::Arena;

use crate::interval::{Interval, IntervalList};
use crate::registry::PoolId;
use crate::{MemoryError, Result};

/// What a segment's bytes represent.
///
/// `Resource` segments reference content that has not been fetched; reading
/// one is an error rather than a guess at lazy-fetch semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    Bytes,
    Resource,
}

/// One observed region of a pool: `[start, end)` plus its backing bytes.
///
/// The backing buffer is a ref-counted [`Bytes`]; narrowing and cross-pool
/// copies share it rather than deep-copying.
#[derive(Clone, Debug)]
pub struct Segment {
    start: u64,
    end: u64,
    bytes: Bytes,
    kind: SegmentKind,
}

impl Segment {
    pub fn new(start: u64, bytes: Bytes) -> Self {
        let end = start + bytes.len() as u64;
        Self {
            start,
            end,
            bytes,
            kind: SegmentKind::Bytes,
        }
    }

    pub fn resource(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            bytes: Bytes::new(),
            kind: SegmentKind::Resource,
        }
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// The segment's backing bytes.
    pub fn data(&self) -> Result<&Bytes> {
        match self.kind {
            SegmentKind::Bytes => Ok(&self.bytes),
            SegmentKind::Resource => Err(MemoryError::UnresolvedResource {
                start: self.start,
                end: self.end,
            }),
        }
    }
}

impl Interval for Segment {
    fn start(&self) -> u64 {
        self.start
    }

    fn end(&self) -> u64 {
        self.end
    }

    fn adjust(&mut self, start: u64, end: u64) {
        debug_assert!(self.start <= start && end <= self.end && start <= end);
        if self.kind == SegmentKind::Bytes {
            let lo = (start - self.start) as usize;
            let hi = (end - self.start) as usize;
            self.bytes = self.bytes.slice(lo..hi);
        }
        self.start = start;
        self.end = end;
    }
}

/// The result of resolving a read against a pool.
#[derive(Debug)]
pub enum PoolRead {
    /// Zero-copy view into a single segment that covers the whole range.
    Direct(Bytes),
    /// Freshly gathered copy; unobserved gaps read as zero.
    Gathered(Bytes),
}

impl PoolRead {
    pub fn bytes(&self) -> &Bytes {
        match self {
            PoolRead::Direct(b) | PoolRead::Gathered(b) => b,
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            PoolRead::Direct(b) | PoolRead::Gathered(b) => b,
        }
    }

    /// True when the bytes were stitched into a fresh buffer rather than
    /// borrowed from a segment.
    pub fn is_gathered(&self) -> bool {
        matches!(self, PoolRead::Gathered(_))
    }
}

/// Sparse byte store over one pool's address space.
///
/// Writes are stored as non-overlapping segments; later writes are
/// authoritative over earlier ones. `size` is soft: sparse data may cover
/// less, and reads beyond it are defined and return zeros.
#[derive(Debug)]
pub struct Pool {
    id: PoolId,
    size: u64,
    pub(crate) ref_count: u32,
    segments: IntervalList<Segment>,
}

impl Pool {
    pub(crate) fn new(id: PoolId, size: u64) -> Self {
        Self {
            id,
            size,
            ref_count: 1,
            segments: IntervalList::new(),
        }
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    /// Number of stored segments; useful for asserting overlay behavior.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Copies `data` into a fresh arena buffer and makes it authoritative
    /// for `[base, base + data.len())`.
    pub fn write(&mut self, arena: &Arena, base: u64, data: &[u8]) -> Result<()> {
        base.checked_add(data.len() as u64)
            .ok_or(MemoryError::OffsetOverflow)?;
        let bytes = arena.alloc_copy(data).freeze();
        self.segments.replace(Segment::new(base, bytes));
        Ok(())
    }

    /// Resolves a read of `[addr, addr + size)`.
    ///
    /// Fast path: exactly one stored segment overlaps the range and fully
    /// contains it, so an interior view of its buffer is returned without
    /// copying. Otherwise a zero-filled buffer is gathered from every
    /// overlapping segment.
    pub fn read(&self, arena: &Arena, addr: u64, size: u64) -> Result<PoolRead> {
        let end = addr
            .checked_add(size)
            .ok_or(MemoryError::OffsetOverflow)?;
        let overlaps = self.segments.intersect(addr, end);

        if let [seg] = overlaps {
            if seg.start() <= addr && end <= seg.end() {
                let lo = (addr - seg.start()) as usize;
                let hi = (end - seg.start()) as usize;
                return Ok(PoolRead::Direct(seg.data()?.slice(lo..hi)));
            }
        }

        let len = usize::try_from(size).map_err(|_| MemoryError::SizeTooLarge { size })?;
        let mut out = arena.alloc(len);
        for seg in overlaps {
            let lo = seg.start().max(addr);
            let hi = seg.end().min(end);
            let dst = (lo - addr) as usize;
            let src = (lo - seg.start()) as usize;
            let n = (hi - lo) as usize;
            out[dst..dst + n].copy_from_slice(&seg.data()?[src..src + n]);
        }
        Ok(PoolRead::Gathered(out.freeze()))
    }

    /// Copies `[src_base, src_base + size)` of `src` over
    /// `[dst_base, dst_base + size)` of this pool.
    ///
    /// Segment extents are clipped and translated; the backing buffers are
    /// shared by ref count, not deep-copied.
    pub fn copy_from(&mut self, src: &Pool, dst_base: u64, src_base: u64, size: u64) -> Result<()> {
        for seg in src.clip(src_base, size, dst_base)? {
            self.segments.replace(seg);
        }
        Ok(())
    }

    /// Same-pool variant of [`Pool::copy_from`].
    pub fn copy_within(&mut self, dst_base: u64, src_base: u64, size: u64) -> Result<()> {
        for seg in self.clip(src_base, size, dst_base)? {
            self.segments.replace(seg);
        }
        Ok(())
    }

    pub(crate) fn insert_segment(&mut self, seg: Segment) {
        self.segments.replace(seg);
    }

    /// Segments overlapping the source window, clipped to it and rebased to
    /// the destination.
    pub(crate) fn clip(&self, src_base: u64, size: u64, dst_base: u64) -> Result<Vec<Segment>> {
        let src_end = src_base
            .checked_add(size)
            .ok_or(MemoryError::OffsetOverflow)?;
        let mut out = Vec::new();
        for seg in self.segments.intersect(src_base, src_end) {
            let mut seg = seg.clone();
            let lo = seg.start().max(src_base);
            let hi = seg.end().min(src_end);
            seg.adjust(lo, hi);

            let new_start = (lo - src_base)
                .checked_add(dst_base)
                .ok_or(MemoryError::OffsetOverflow)?;
            let new_end = new_start + (hi - lo);
            seg.start = new_start;
            seg.end = new_end;
            out.push(seg);
        }
        Ok(out)
    }

    /// Flattened contents of `[0, size)`; the serializer's view of the pool.
    pub fn snapshot(&self, arena: &Arena) -> Result<Bytes> {
        Ok(self.read(arena, 0, self.size)?.into_bytes())
    }
}
