use std::any::Any;

use optic_arena::Arena;
use optic_memory::{Observation, PoolId, PoolRead};

use crate::database::DatabaseId;
use crate::error::Result;
use crate::slice::Slice;

/// The typed operation interface behind the runtime callback table.
///
/// An environment owns the state a context executes against: its pools, its
/// extern handlers, its content store. The standard callback tables
/// ([`crate::Callbacks::shadow`], [`crate::Callbacks::capture`]) dispatch
/// here through the context, so one table serves every environment.
pub trait RuntimeEnv: Any {
    /// Allocates a new pool with ref count 1 and returns its id (never 0).
    fn make_pool(&mut self, arena: &Arena, size: u64) -> Result<PoolId>;

    /// Logical size in bytes of `pool`. Fatal on the application pool and
    /// on a missing pool.
    fn pool_size(&self, pool: PoolId) -> u64;

    /// Increments the ref count of `pool`. Fatal on the application pool
    /// and on a pool with no references.
    fn pool_reference(&mut self, pool: PoolId);

    /// Decrements the ref count of `pool`, destroying it at zero. Fatal on
    /// the application pool and on a pool with no references.
    fn pool_release(&mut self, pool: PoolId);

    /// Resolves `[ptr, ptr + size)` of `pool` for reading. Pool 0 resolves
    /// against host memory (capture) or its shadow (store).
    fn read_pool_data(
        &mut self,
        arena: &Arena,
        pool: PoolId,
        ptr: u64,
        size: u64,
    ) -> Result<PoolRead>;

    /// Writes `data` at `ptr` of `pool`; the write half of pool data
    /// resolution.
    fn write_pool_data(&mut self, arena: &Arena, pool: PoolId, ptr: u64, data: &[u8])
        -> Result<()>;

    /// Copies `min(dst.size, src.size)` bytes from `src` to `dst`.
    fn copy_slice(&mut self, arena: &Arena, dst: &Slice, src: &Slice) -> Result<()>;

    /// Builds a slice spanning the NUL-terminated byte run starting at
    /// `ptr` in the application pool. The slice includes the terminator.
    fn cstring_to_slice(&mut self, arena: &Arena, ptr: u64) -> Result<Slice>;

    /// Applies command-tagged observations into the memory model.
    fn apply_observations(&mut self, arena: &Arena, observations: &[Observation]) -> Result<()>;

    /// Stores `data` in the content-addressed store, returning its 20-byte
    /// id.
    fn store_in_database(&mut self, data: &[u8]) -> Result<DatabaseId>;

    /// Dispatches the named extern. Fatal when no handler is registered.
    fn call_extern(
        &mut self,
        arena: &Arena,
        name: &str,
        args: &dyn Any,
        res: &mut dyn Any,
    ) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
