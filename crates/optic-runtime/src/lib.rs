//! Command runtime for the optic capture/replay system.
//!
//! Generated command code executes against a [`Context`] and reaches the
//! memory model through a process-wide table of callbacks, so the same code
//! runs both in-process (flat capture pools) and against the shadow store:
//!
//! - [`Context`]: per-command execution record (arena, ids, arguments)
//! - [`Slice`]: `(pool, root, base, size, count)` view into a pool
//! - [`RtString`] / [`RtMap`]: shared value types used by commands
//! - [`Callbacks`]: the runtime callback table, installed once at startup
//! - [`ShadowEnv`]: environment routing pool data through the sparse store
//! - [`run_batch`]: sequential command execution with abort recording
//! - [`ContentStore`]: content-addressed blob store with 20-byte ids

mod callbacks;
mod context;
mod database;
mod env;
mod error;
mod exec;
mod log;
mod map;
mod shadow;
mod slice;
mod strings;

pub use callbacks::{
    apply_reads, apply_writes, call_extern, copy_slice, cstring_to_slice, install_callbacks,
    make_pool, pool_reference, pool_release, read_pool_data, resolve_pool_data, slice_to_string,
    store_in_database, string_to_slice, write_pool_data, Callbacks,
};
pub use context::Context;
pub use database::{ContentStore, DatabaseId};
pub use env::RuntimeEnv;
pub use error::{Result, RuntimeError};
pub use exec::{run_batch, CmdFlags, Command, CommandBody, ExternFn, ExternRegistry};
pub use log::{logf, Severity};
pub use map::{
    RtMap, MAP_ELEMENT_EMPTY, MAP_ELEMENT_FULL, MAP_ELEMENT_USED, MAP_GROW_MULTIPLIER,
    MAP_MAX_CAPACITY, MIN_MAP_SIZE,
};
pub use shadow::ShadowEnv;
pub use slice::Slice;
pub use strings::{make_string, RtString};

/// Status code of a successfully completed command.
pub const ERR_SUCCESS: u32 = 0;
/// Status code of a command that aborted; the batch runner records it and
/// moves on.
pub const ERR_ABORTED: u32 = 1;

bitflags::bitflags! {
    /// How resolved pool data will be accessed.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DataAccess: u32 {
        const READ = 0x1;
        const WRITE = 0x2;
    }
}

#[cfg(test)]
mod tests;
