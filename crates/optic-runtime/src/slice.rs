use optic_memory::{PoolId, APPLICATION_POOL};

use crate::callbacks;
use crate::context::Context;

/// A value view into a pool. Copyable; does not own the referenced bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slice {
    /// Pool the slice addresses; 0 is the application pool.
    pub pool: PoolId,
    /// Offset in bytes from the pool base that the original slice derives
    /// from.
    pub root: u64,
    /// Offset in bytes from the pool base of the first element.
    pub base: u64,
    /// Size in bytes.
    pub size: u64,
    /// Total number of elements.
    pub count: u64,
}

impl Slice {
    pub fn new(pool: PoolId, root: u64, base: u64, size: u64, count: u64) -> Self {
        Self {
            pool,
            root,
            base,
            size,
            count,
        }
    }

    pub fn is_app_pool(&self) -> bool {
        self.pool == APPLICATION_POOL
    }

    /// Whether `addr` falls inside `[base, base + size)`.
    pub fn contains_addr(&self, addr: u64) -> bool {
        addr >= self.base && addr - self.base < self.size
    }

    /// Sub-slice covering `count` elements of `elem_size` bytes starting at
    /// element `first`, relative to this slice's base.
    pub fn sub(&self, first: u64, count: u64, elem_size: u64) -> Slice {
        Slice {
            pool: self.pool,
            root: self.root,
            base: self.base + first * elem_size,
            size: count * elem_size,
            count,
        }
    }

    /// Adjusts the referenced pool's ref count on slice reference.
    /// Application-pool slices are not ref counted.
    pub fn on_reference(&self, ctx: &mut Context) {
        if !self.is_app_pool() {
            callbacks::pool_reference(ctx, self.pool);
        }
    }

    /// Adjusts the referenced pool's ref count on slice release.
    pub fn on_release(&self, ctx: &mut Context) {
        if !self.is_app_pool() {
            callbacks::pool_release(ctx, self.pool);
        }
    }
}

impl Default for Slice {
    /// The empty slice: application pool, zero extent.
    fn default() -> Self {
        Slice::new(APPLICATION_POOL, 0, 0, 0, 0)
    }
}
