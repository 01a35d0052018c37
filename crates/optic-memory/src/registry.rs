use std::collections::HashMap;
use std::fmt;

use optic_arena::Arena;
use tracing::debug;

use crate::pool::{Pool, PoolRead};
use crate::Result;

/// Identifier of a pool within a [`Memory`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(pub u64);

/// The application pool: the host process's address space. Never created,
/// referenced or released through the registry API.
pub const APPLICATION_POOL: PoolId = PoolId(0);

impl PoolId {
    pub fn is_application(self) -> bool {
        self == APPLICATION_POOL
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pool registry: issues pool ids, owns pool storage on the arena, tracks
/// ref counts across slice references.
///
/// Ids start at 1 and are never reused. The application pool is seeded at
/// construction and reachable only through [`Memory::application_pool`];
/// `get_pool`, `reference` and `release` reject it.
pub struct Memory {
    arena: Arena,
    next_pool_id: u64,
    pools: HashMap<PoolId, Pool>,
}

impl Memory {
    pub fn new(arena: Arena) -> Self {
        let mut pools = HashMap::new();
        pools.insert(APPLICATION_POOL, Pool::new(APPLICATION_POOL, 0));
        Self {
            arena,
            next_pool_id: 1,
            pools,
        }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Number of live pools, the application pool included.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn contains(&self, id: PoolId) -> bool {
        self.pools.contains_key(&id)
    }

    /// Creates a pool with ref count 1 and returns its id.
    pub fn new_pool(&mut self, size: u64) -> PoolId {
        let id = PoolId(self.next_pool_id);
        self.next_pool_id += 1;
        self.pools.insert(id, Pool::new(id, size));
        debug!(pool = id.0, size, "created pool");
        id
    }

    /// Internal lookup; the application pool is a valid target here.
    fn pool(&self, id: PoolId) -> &Pool {
        match self.pools.get(&id) {
            Some(p) => p,
            None => crate::fatal!("pool {id} does not exist"),
        }
    }

    fn pool_mut(&mut self, id: PoolId) -> &mut Pool {
        match self.pools.get_mut(&id) {
            Some(p) => p,
            None => crate::fatal!("pool {id} does not exist"),
        }
    }

    pub fn get_pool(&self, id: PoolId) -> &Pool {
        if id.is_application() {
            crate::fatal!("application pool is not addressable through the registry");
        }
        self.pool(id)
    }

    pub fn get_pool_mut(&mut self, id: PoolId) -> &mut Pool {
        if id.is_application() {
            crate::fatal!("application pool is not addressable through the registry");
        }
        self.pool_mut(id)
    }

    pub fn application_pool(&self) -> &Pool {
        self.pool(APPLICATION_POOL)
    }

    pub fn application_pool_mut(&mut self) -> &mut Pool {
        self.pool_mut(APPLICATION_POOL)
    }

    /// Increments the ref count of `id`.
    pub fn reference(&mut self, id: PoolId) {
        if id.is_application() {
            crate::fatal!("attempting to reference the application pool");
        }
        let pool = self.pool_mut(id);
        if pool.ref_count == 0 {
            crate::fatal!("attempting to reference pool {id} with no references");
        }
        pool.ref_count += 1;
    }

    /// Decrements the ref count of `id`, destroying the pool at zero.
    pub fn release(&mut self, id: PoolId) {
        if id.is_application() {
            crate::fatal!("attempting to release the application pool");
        }
        let pool = self.pool_mut(id);
        if pool.ref_count == 0 {
            crate::fatal!("attempting to release pool {id} with no references");
        }
        pool.ref_count -= 1;
        if pool.ref_count == 0 {
            self.pools.remove(&id);
            debug!(pool = id.0, "destroyed pool");
        }
    }

    /// Reads `[addr, addr + size)` of `pool`; the application pool is a
    /// valid target (shadow of host memory).
    pub fn read(&self, pool: PoolId, addr: u64, size: u64) -> Result<PoolRead> {
        self.pool(pool).read(&self.arena, addr, size)
    }

    /// Writes `data` at `addr` of `pool`; the application pool is a valid
    /// target (observations apply there).
    pub fn write(&mut self, pool: PoolId, addr: u64, data: &[u8]) -> Result<()> {
        let arena = self.arena.clone();
        self.pool_mut(pool).write(&arena, addr, data)
    }

    /// Copies `size` bytes from `(src, src_base)` to `(dst, dst_base)`.
    ///
    /// Both pools may be the same, and either side may be the application
    /// pool. Backing buffers are shared, not deep-copied.
    pub fn copy(
        &mut self,
        dst: PoolId,
        dst_base: u64,
        src: PoolId,
        src_base: u64,
        size: u64,
    ) -> Result<()> {
        if dst == src {
            return self.pool_mut(dst).copy_within(dst_base, src_base, size);
        }
        let segments = self.pool(src).clip(src_base, size, dst_base)?;
        let dst_pool = self.pool_mut(dst);
        for seg in segments {
            dst_pool.insert_segment(seg);
        }
        Ok(())
    }
}
