use bytes::Bytes;
use optic_runtime::{Result, RuntimeError};

/// The host process's address space, as seen by application-pool (pool 0)
/// accesses on the in-process capture path.
///
/// The capture runtime never reinterprets raw pointers; every host access
/// crosses this seam with explicit bounds.
pub trait HostMemory {
    /// Reads `size` bytes starting at the host virtual address `addr`.
    fn read(&self, addr: u64, size: u64) -> Result<Bytes>;

    /// Writes `data` starting at `addr`.
    fn write(&mut self, addr: u64, data: &[u8]) -> Result<()>;

    /// Length of the NUL-terminated byte run at `addr`, excluding the
    /// terminator.
    fn strlen(&self, addr: u64) -> Result<u64>;
}

/// Host memory backed by one contiguous buffer mapped at `base`.
///
/// Embedders with richer address spaces supply their own [`HostMemory`];
/// this one covers tests and single-region captures.
pub struct BufferHostMemory {
    base: u64,
    data: Vec<u8>,
}

impl BufferHostMemory {
    pub fn new(base: u64, data: Vec<u8>) -> Self {
        Self { base, data }
    }

    fn range(&self, addr: u64, size: u64) -> Result<std::ops::Range<usize>> {
        let err = RuntimeError::HostAccess { addr, len: size };
        let end = addr.checked_add(size).ok_or(err.clone())?;
        if addr < self.base || end > self.base + self.data.len() as u64 {
            return Err(err);
        }
        let lo = (addr - self.base) as usize;
        Ok(lo..lo + size as usize)
    }
}

impl HostMemory for BufferHostMemory {
    fn read(&self, addr: u64, size: u64) -> Result<Bytes> {
        let range = self.range(addr, size)?;
        Ok(Bytes::copy_from_slice(&self.data[range]))
    }

    fn write(&mut self, addr: u64, data: &[u8]) -> Result<()> {
        let range = self.range(addr, data.len() as u64)?;
        self.data[range].copy_from_slice(data);
        Ok(())
    }

    fn strlen(&self, addr: u64) -> Result<u64> {
        let range = self.range(addr, 0)?;
        match self.data[range.start..].iter().position(|&b| b == 0) {
            Some(pos) => Ok(pos as u64),
            None => Err(RuntimeError::HostAccess {
                addr,
                len: (self.data.len() - range.start) as u64,
            }),
        }
    }
}
