//! The runtime callback table.
//!
//! A single process-wide table of function slots, installed once at executor
//! startup and read-only thereafter. Every public runtime function checks
//! that its slot is populated (fatal otherwise) and delegates. Environment
//! state travels in the context, so the standard slot implementations are
//! stateless dispatchers onto [`crate::RuntimeEnv`] and one table serves
//! both the capture and the shadow-store paths.

use std::any::Any;
use std::sync::RwLock;

use optic_memory::{PoolId, PoolRead};
use tracing::debug;

use crate::context::Context;
use crate::database::DatabaseId;
use crate::error::Result;
use crate::exec::CmdFlags;
use crate::slice::Slice;
use crate::strings::{make_string, RtString};
use crate::DataAccess;

/// The callback table. Unset slots are fatal to call.
#[derive(Clone, Copy, Default)]
pub struct Callbacks {
    pub apply_reads: Option<fn(&mut Context) -> Result<()>>,
    pub apply_writes: Option<fn(&mut Context) -> Result<()>>,
    pub read_pool_data: Option<fn(&mut Context, PoolId, u64, u64) -> Result<PoolRead>>,
    pub write_pool_data: Option<fn(&mut Context, PoolId, u64, &[u8]) -> Result<()>>,
    pub store_in_database: Option<fn(&mut Context, &[u8]) -> Result<DatabaseId>>,
    pub make_pool: Option<fn(&mut Context, u64) -> Result<PoolId>>,
    pub pool_reference: Option<fn(&mut Context, PoolId)>,
    pub pool_release: Option<fn(&mut Context, PoolId)>,
    pub copy_slice: Option<fn(&mut Context, &Slice, &Slice) -> Result<()>>,
    pub cstring_to_slice: Option<fn(&mut Context, u64) -> Result<Slice>>,
    pub call_extern: Option<fn(&mut Context, &str, &dyn Any, &mut dyn Any) -> Result<()>>,
}

static CALLBACKS: RwLock<Option<Callbacks>> = RwLock::new(None);

/// Installs the process-wide callback table. Called once at executor
/// startup; the table is read-only afterwards.
pub fn install_callbacks(callbacks: Callbacks) {
    *CALLBACKS.write().expect("callback table poisoned") = Some(callbacks);
    debug!("runtime callbacks installed");
}

fn table() -> Callbacks {
    CALLBACKS
        .read()
        .expect("callback table poisoned")
        .unwrap_or_default()
}

impl Callbacks {
    /// The full table of the shadow-store executor path.
    pub fn shadow() -> Callbacks {
        Callbacks {
            apply_reads: Some(env_apply_reads),
            apply_writes: Some(env_apply_writes),
            read_pool_data: Some(env_read_pool_data),
            write_pool_data: Some(env_write_pool_data),
            store_in_database: Some(env_store_in_database),
            make_pool: Some(env_make_pool),
            pool_reference: Some(env_pool_reference),
            pool_release: Some(env_pool_release),
            copy_slice: Some(env_copy_slice),
            cstring_to_slice: Some(env_cstring_to_slice),
            call_extern: Some(env_call_extern),
        }
    }

    /// The in-process capture subset: pool data resolution and pool
    /// lifetime only. Calling any other runtime function under this table
    /// is fatal.
    pub fn capture() -> Callbacks {
        Callbacks {
            read_pool_data: Some(env_read_pool_data),
            write_pool_data: Some(env_write_pool_data),
            make_pool: Some(env_make_pool),
            pool_reference: Some(env_pool_reference),
            pool_release: Some(env_pool_release),
            ..Callbacks::default()
        }
    }
}

// Standard slot implementations: stateless dispatchers onto the context's
// environment.

fn env_apply_reads(ctx: &mut Context) -> Result<()> {
    if !ctx.cmd_flags.contains(CmdFlags::HAS_READS) {
        return Ok(());
    }
    let arena = ctx.arena.clone();
    let observations = std::mem::take(&mut ctx.pending_reads);
    let result = ctx.env_mut().apply_observations(&arena, &observations);
    ctx.pending_reads = observations;
    result
}

fn env_apply_writes(ctx: &mut Context) -> Result<()> {
    if !ctx.cmd_flags.contains(CmdFlags::HAS_WRITES) {
        return Ok(());
    }
    let arena = ctx.arena.clone();
    let observations = std::mem::take(&mut ctx.pending_writes);
    let result = ctx.env_mut().apply_observations(&arena, &observations);
    ctx.pending_writes = observations;
    result
}

fn env_read_pool_data(ctx: &mut Context, pool: PoolId, ptr: u64, size: u64) -> Result<PoolRead> {
    let arena = ctx.arena.clone();
    ctx.env_mut().read_pool_data(&arena, pool, ptr, size)
}

fn env_write_pool_data(ctx: &mut Context, pool: PoolId, ptr: u64, data: &[u8]) -> Result<()> {
    let arena = ctx.arena.clone();
    ctx.env_mut().write_pool_data(&arena, pool, ptr, data)
}

fn env_store_in_database(ctx: &mut Context, data: &[u8]) -> Result<DatabaseId> {
    ctx.env_mut().store_in_database(data)
}

fn env_make_pool(ctx: &mut Context, size: u64) -> Result<PoolId> {
    let arena = ctx.arena.clone();
    ctx.env_mut().make_pool(&arena, size)
}

fn env_pool_reference(ctx: &mut Context, pool: PoolId) {
    ctx.env_mut().pool_reference(pool);
}

fn env_pool_release(ctx: &mut Context, pool: PoolId) {
    ctx.env_mut().pool_release(pool);
}

fn env_copy_slice(ctx: &mut Context, dst: &Slice, src: &Slice) -> Result<()> {
    let arena = ctx.arena.clone();
    ctx.env_mut().copy_slice(&arena, dst, src)
}

fn env_cstring_to_slice(ctx: &mut Context, ptr: u64) -> Result<Slice> {
    let arena = ctx.arena.clone();
    ctx.env_mut().cstring_to_slice(&arena, ptr)
}

fn env_call_extern(
    ctx: &mut Context,
    name: &str,
    args: &dyn Any,
    res: &mut dyn Any,
) -> Result<()> {
    let arena = ctx.arena.clone();
    ctx.env_mut().call_extern(&arena, name, args, res)
}

// Public runtime surface: check the slot, then delegate.

macro_rules! slot {
    ($name:ident) => {
        (match table().$name {
            Some(f) => f,
            None => optic_memory::fatal!(concat!(
                stringify!($name),
                " callback is not installed"
            )),
        })
    };
}

/// Applies the read observations tagged to the current command into the
/// memory model.
pub fn apply_reads(ctx: &mut Context) -> Result<()> {
    slot!(apply_reads)(ctx)
}

/// Applies the write observations tagged to the current command into the
/// memory model.
pub fn apply_writes(ctx: &mut Context) -> Result<()> {
    slot!(apply_writes)(ctx)
}

/// Resolves `[ptr, ptr + size)` of `pool` for reading.
pub fn read_pool_data(ctx: &mut Context, pool: PoolId, ptr: u64, size: u64) -> Result<PoolRead> {
    slot!(read_pool_data)(ctx, pool, ptr, size)
}

/// Writes `data` at `ptr` of `pool`: the write half of pool data
/// resolution.
pub fn write_pool_data(ctx: &mut Context, pool: PoolId, ptr: u64, data: &[u8]) -> Result<()> {
    slot!(write_pool_data)(ctx, pool, ptr, data)
}

/// Resolves pool data for the given access mode. Read resolution returns
/// the bytes; write access goes through [`write_pool_data`], which carries
/// the data to write.
pub fn resolve_pool_data(
    ctx: &mut Context,
    pool: PoolId,
    ptr: u64,
    access: DataAccess,
    size: u64,
) -> Result<PoolRead> {
    if access.contains(DataAccess::WRITE) {
        optic_memory::fatal!("write access resolves through write_pool_data");
    }
    read_pool_data(ctx, pool, ptr, size)
}

/// Stores `data` in the content-addressed store, returning the 20-byte id.
pub fn store_in_database(ctx: &mut Context, data: &[u8]) -> Result<DatabaseId> {
    slot!(store_in_database)(ctx, data)
}

/// Allocates a new pool with ref count 1; the returned id is never 0.
pub fn make_pool(ctx: &mut Context, size: u64) -> Result<PoolId> {
    slot!(make_pool)(ctx, size)
}

/// Increments the ref count of `pool`.
pub fn pool_reference(ctx: &mut Context, pool: PoolId) {
    slot!(pool_reference)(ctx, pool)
}

/// Decrements the ref count of `pool`, freeing it at zero.
pub fn pool_release(ctx: &mut Context, pool: PoolId) {
    slot!(pool_release)(ctx, pool)
}

/// Copies `min(dst.size, src.size)` bytes from `src` to `dst`.
pub fn copy_slice(ctx: &mut Context, dst: &Slice, src: &Slice) -> Result<()> {
    slot!(copy_slice)(ctx, dst, src)
}

/// Builds a slice spanning the NUL-terminated bytes at `ptr` in the
/// application pool, terminator included.
pub fn cstring_to_slice(ctx: &mut Context, ptr: u64) -> Result<Slice> {
    slot!(cstring_to_slice)(ctx, ptr)
}

/// Dispatches the named extern.
pub fn call_extern(
    ctx: &mut Context,
    name: &str,
    args: &dyn Any,
    res: &mut dyn Any,
) -> Result<()> {
    slot!(call_extern)(ctx, name, args, res)
}

/// Allocates a string filled with the slice's bytes, trimming one trailing
/// NUL when present.
pub fn slice_to_string(ctx: &mut Context, slice: &Slice) -> Result<RtString> {
    let data = read_pool_data(ctx, slice.pool, slice.base, slice.size)?;
    let bytes = data.bytes();
    let mut len = bytes.len();
    if len > 0 && bytes[len - 1] == 0 {
        len -= 1;
    }
    Ok(make_string(&ctx.arena, len, Some(&bytes[..len])))
}

/// Allocates a new pool filled with the string's bytes (NUL terminator
/// included in the pool, excluded from the slice extent).
pub fn string_to_slice(ctx: &mut Context, string: &RtString) -> Result<Slice> {
    let len = string.len() as u64;
    let pool = make_pool(ctx, len)?;
    write_pool_data(ctx, pool, 0, string.as_bytes_with_nul())?;
    Ok(Slice::new(pool, 0, 0, len, len))
}

#[cfg(test)]
pub(crate) fn reset_callbacks_for_tests() {
    *CALLBACKS.write().expect("callback table poisoned") = None;
}
