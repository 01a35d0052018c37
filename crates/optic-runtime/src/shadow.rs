use std::any::Any;

use optic_arena::Arena;
use optic_memory::{
    Memory, MemoryError, Observation, ObservationData, PoolId, PoolRead, APPLICATION_POOL,
};

use crate::database::{ContentStore, DatabaseId};
use crate::env::RuntimeEnv;
use crate::error::Result;
use crate::exec::ExternRegistry;
use crate::slice::Slice;

/// The state-server environment: pool data routes through the sparse store,
/// and pool 0 is the shadow of the application's address space.
pub struct ShadowEnv {
    memory: Memory,
    externs: ExternRegistry,
    database: ContentStore,
}

impl ShadowEnv {
    /// `arena` should be the context's arena; the registry charges pool
    /// storage to it.
    pub fn new(arena: Arena) -> Self {
        Self {
            memory: Memory::new(arena),
            externs: ExternRegistry::new(),
            database: ContentStore::new(),
        }
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn externs_mut(&mut self) -> &mut ExternRegistry {
        &mut self.externs
    }

    pub fn database(&self) -> &ContentStore {
        &self.database
    }

    /// Length of the NUL-terminated byte run at `ptr` in the application
    /// pool shadow, excluding the terminator.
    fn strlen(&self, ptr: u64) -> Result<u64> {
        const CHUNK: u64 = 64;
        let mut offset = 0u64;
        loop {
            let addr = ptr
                .checked_add(offset)
                .ok_or(MemoryError::OffsetOverflow)?;
            let read = self.memory.read(APPLICATION_POOL, addr, CHUNK)?;
            if let Some(pos) = read.bytes().iter().position(|&b| b == 0) {
                return Ok(offset + pos as u64);
            }
            offset = offset
                .checked_add(CHUNK)
                .ok_or(MemoryError::OffsetOverflow)?;
        }
    }
}

impl RuntimeEnv for ShadowEnv {
    fn make_pool(&mut self, _arena: &Arena, size: u64) -> Result<PoolId> {
        Ok(self.memory.new_pool(size))
    }

    fn pool_size(&self, pool: PoolId) -> u64 {
        self.memory.get_pool(pool).size()
    }

    fn pool_reference(&mut self, pool: PoolId) {
        self.memory.reference(pool);
    }

    fn pool_release(&mut self, pool: PoolId) {
        self.memory.release(pool);
    }

    fn read_pool_data(
        &mut self,
        _arena: &Arena,
        pool: PoolId,
        ptr: u64,
        size: u64,
    ) -> Result<PoolRead> {
        Ok(self.memory.read(pool, ptr, size)?)
    }

    fn write_pool_data(
        &mut self,
        _arena: &Arena,
        pool: PoolId,
        ptr: u64,
        data: &[u8],
    ) -> Result<()> {
        Ok(self.memory.write(pool, ptr, data)?)
    }

    fn copy_slice(&mut self, _arena: &Arena, dst: &Slice, src: &Slice) -> Result<()> {
        let size = dst.size.min(src.size);
        Ok(self
            .memory
            .copy(dst.pool, dst.base, src.pool, src.base, size)?)
    }

    fn cstring_to_slice(&mut self, _arena: &Arena, ptr: u64) -> Result<Slice> {
        let size = self.strlen(ptr)? + 1; // include the terminator
        Ok(Slice::new(APPLICATION_POOL, ptr, ptr, size, size))
    }

    fn apply_observations(&mut self, _arena: &Arena, observations: &[Observation]) -> Result<()> {
        for obs in observations {
            match &obs.data {
                ObservationData::Inline(bytes) => {
                    self.memory.write(obs.pool, obs.base, bytes)?;
                }
                // Resource-backed observations carry no bytes to apply.
                ObservationData::Resource { size, .. } => {
                    return Err(MemoryError::UnresolvedResource {
                        start: obs.base,
                        end: obs.base + size,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    fn store_in_database(&mut self, data: &[u8]) -> Result<DatabaseId> {
        Ok(self.database.store(data))
    }

    fn call_extern(
        &mut self,
        arena: &Arena,
        name: &str,
        args: &dyn Any,
        res: &mut dyn Any,
    ) -> Result<()> {
        self.externs.call(arena, name, args, res)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
