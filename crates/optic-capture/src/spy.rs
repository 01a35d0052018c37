use std::any::Any;
use std::collections::HashMap;

use bytes::Bytes;
use optic_arena::{Arena, ArenaBuf};
use optic_memory::{MemoryError, Observation, PoolId, PoolRead, APPLICATION_POOL};
use optic_runtime::{DatabaseId, Result, RuntimeEnv, Slice};
use tracing::debug;

use crate::host::HostMemory;

/// A capture-path pool: one contiguous arena-backed buffer.
struct FlatPool {
    size: u64,
    ref_count: u32,
    buffer: ArenaBuf,
}

/// The in-process capture environment.
///
/// Pools are flat buffers charged to the context arena; pool 0 routes to
/// the host address space. Observation application, the content store and
/// extern dispatch belong to the executor path; their slots are left out
/// of [`optic_runtime::Callbacks::capture`], and reaching them here is
/// fatal.
pub struct CaptureEnv {
    host: Box<dyn HostMemory>,
    next_pool_id: u64,
    pools: HashMap<PoolId, FlatPool>,
}

impl CaptureEnv {
    pub fn new(host: Box<dyn HostMemory>) -> Self {
        Self {
            host,
            next_pool_id: 1,
            pools: HashMap::new(),
        }
    }

    fn pool(&self, id: PoolId) -> &FlatPool {
        match self.pools.get(&id) {
            Some(p) => p,
            None => optic_memory::fatal!("pool {id} does not exist"),
        }
    }

    fn pool_mut(&mut self, id: PoolId) -> &mut FlatPool {
        match self.pools.get_mut(&id) {
            Some(p) => p,
            None => optic_memory::fatal!("pool {id} does not exist"),
        }
    }

    fn checked_range(pool: PoolId, buffer_len: usize, ptr: u64, size: u64) -> std::ops::Range<usize> {
        let end = match ptr.checked_add(size) {
            Some(end) if end <= buffer_len as u64 => end,
            _ => optic_memory::fatal!(
                "pool {pool} access out of range: ptr={ptr:#x} size={size:#x} buffer={buffer_len:#x}"
            ),
        };
        ptr as usize..end as usize
    }

    /// Ref count of `id`; test and observer visibility.
    pub fn pool_ref_count(&self, id: PoolId) -> u32 {
        self.pool(id).ref_count
    }

    pub fn contains_pool(&self, id: PoolId) -> bool {
        self.pools.contains_key(&id)
    }

    /// Snapshot of the pool's full buffer, the serializer's view.
    pub fn pool_bytes(&self, id: PoolId) -> Bytes {
        Bytes::copy_from_slice(self.pool(id).buffer.as_slice())
    }
}

impl RuntimeEnv for CaptureEnv {
    fn make_pool(&mut self, arena: &Arena, size: u64) -> Result<PoolId> {
        let len = usize::try_from(size).map_err(|_| MemoryError::SizeTooLarge { size })?;
        let id = PoolId(self.next_pool_id);
        self.next_pool_id += 1;
        self.pools.insert(
            id,
            FlatPool {
                size,
                ref_count: 1,
                buffer: arena.alloc(len),
            },
        );
        debug!(pool = id.0, size, "created capture pool");
        Ok(id)
    }

    fn pool_size(&self, pool: PoolId) -> u64 {
        if pool.is_application() {
            optic_memory::fatal!("application pool has no bounded size");
        }
        self.pool(pool).size
    }

    fn pool_reference(&mut self, pool: PoolId) {
        if pool.is_application() {
            optic_memory::fatal!("attempting to reference the application pool");
        }
        let p = self.pool_mut(pool);
        if p.ref_count == 0 {
            optic_memory::fatal!("attempting to reference pool {pool} with no references");
        }
        p.ref_count += 1;
    }

    fn pool_release(&mut self, pool: PoolId) {
        if pool.is_application() {
            optic_memory::fatal!("attempting to release the application pool");
        }
        let p = self.pool_mut(pool);
        if p.ref_count == 0 {
            optic_memory::fatal!("attempting to release pool {pool} with no references");
        }
        p.ref_count -= 1;
        if p.ref_count == 0 {
            // Dropping the record frees both the buffer and the entry.
            self.pools.remove(&pool);
            debug!(pool = pool.0, "destroyed capture pool");
        }
    }

    fn read_pool_data(
        &mut self,
        _arena: &Arena,
        pool: PoolId,
        ptr: u64,
        size: u64,
    ) -> Result<PoolRead> {
        if pool.is_application() {
            return Ok(PoolRead::Direct(self.host.read(ptr, size)?));
        }
        let p = self.pool(pool);
        let range = Self::checked_range(pool, p.buffer.len(), ptr, size);
        // The safe boundary snapshots rather than borrowing pool interiors.
        Ok(PoolRead::Gathered(Bytes::copy_from_slice(
            &p.buffer.as_slice()[range],
        )))
    }

    fn write_pool_data(
        &mut self,
        _arena: &Arena,
        pool: PoolId,
        ptr: u64,
        data: &[u8],
    ) -> Result<()> {
        if pool.is_application() {
            return self.host.write(ptr, data);
        }
        let p = self.pool_mut(pool);
        let range = Self::checked_range(pool, p.buffer.len(), ptr, data.len() as u64);
        p.buffer.as_mut_slice()[range].copy_from_slice(data);
        Ok(())
    }

    fn copy_slice(&mut self, arena: &Arena, dst: &Slice, src: &Slice) -> Result<()> {
        let size = dst.size.min(src.size);
        let data = self
            .read_pool_data(arena, src.pool, src.base, size)?
            .into_bytes();
        self.write_pool_data(arena, dst.pool, dst.base, &data)
    }

    fn cstring_to_slice(&mut self, _arena: &Arena, ptr: u64) -> Result<Slice> {
        let size = self.host.strlen(ptr)? + 1; // include the terminator
        Ok(Slice::new(APPLICATION_POOL, ptr, ptr, size, size))
    }

    fn apply_observations(&mut self, _arena: &Arena, _observations: &[Observation]) -> Result<()> {
        optic_memory::fatal!("the capture environment does not apply observations");
    }

    fn store_in_database(&mut self, _data: &[u8]) -> Result<DatabaseId> {
        optic_memory::fatal!("the capture environment has no content store");
    }

    fn call_extern(
        &mut self,
        _arena: &Arena,
        name: &str,
        _args: &dyn Any,
        _res: &mut dyn Any,
    ) -> Result<()> {
        optic_memory::fatal!("no handler for extern '{name}' in the capture environment");
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
