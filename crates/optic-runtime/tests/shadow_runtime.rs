//! End-to-end runtime behavior against the shadow store: generated-code
//! style access through the callback table only.

use optic_arena::Arena;
use optic_memory::{Observation, APPLICATION_POOL};
use optic_runtime::{
    apply_reads, apply_writes, call_extern, copy_slice, cstring_to_slice, install_callbacks,
    make_pool, pool_reference, pool_release, run_batch, slice_to_string, store_in_database,
    string_to_slice, Callbacks, CmdFlags, Command, Context, RtString, RuntimeError, ShadowEnv,
    Slice, ERR_ABORTED, ERR_SUCCESS,
};
use pretty_assertions::assert_eq;

fn context() -> Context {
    install_callbacks(Callbacks::shadow());
    let arena = Arena::new();
    let env = ShadowEnv::new(arena.clone());
    Context::new(arena, Box::new(env))
}

#[test]
fn pool_lifecycle_through_the_table() {
    let mut ctx = context();

    let p1 = make_pool(&mut ctx, 8).unwrap();
    assert!(!p1.is_application());

    pool_reference(&mut ctx, p1);
    assert_eq!(ctx.env_as::<ShadowEnv>().memory().get_pool(p1).ref_count(), 2);

    pool_release(&mut ctx, p1);
    assert_eq!(ctx.env_as::<ShadowEnv>().memory().get_pool(p1).ref_count(), 1);

    pool_release(&mut ctx, p1);
    assert!(!ctx.env_as::<ShadowEnv>().memory().contains(p1));
}

#[test]
#[should_panic(expected = "does not exist")]
fn releasing_a_destroyed_pool_is_fatal() {
    let mut ctx = context();
    let p1 = make_pool(&mut ctx, 8).unwrap();
    pool_release(&mut ctx, p1);
    pool_release(&mut ctx, p1);
}

#[test]
fn copy_slice_copies_the_smaller_extent() {
    let mut ctx = context();
    let p = make_pool(&mut ctx, 32).unwrap();
    let q = make_pool(&mut ctx, 32).unwrap();

    optic_runtime::write_pool_data(&mut ctx, p, 0, &[1, 2, 3, 4, 5, 6]).unwrap();

    let src = Slice::new(p, 0, 0, 6, 6);
    let dst = Slice::new(q, 0, 8, 4, 4); // smaller: only 4 bytes move
    copy_slice(&mut ctx, &dst, &src).unwrap();

    let read = optic_runtime::read_pool_data(&mut ctx, q, 8, 6).unwrap();
    assert_eq!(&read.bytes()[..], &[1, 2, 3, 4, 0, 0]);
}

#[test]
fn cstring_to_slice_includes_the_terminator() {
    let mut ctx = context();
    ctx.env_as_mut::<ShadowEnv>()
        .memory_mut()
        .write(APPLICATION_POOL, 0x1000, b"hello\0")
        .unwrap();

    let slice = cstring_to_slice(&mut ctx, 0x1000).unwrap();
    assert_eq!(slice.pool, APPLICATION_POOL);
    assert_eq!(slice.root, 0x1000);
    assert_eq!(slice.base, 0x1000);
    assert_eq!(slice.size, 6);
    assert_eq!(slice.count, 6);

    let s = slice_to_string(&mut ctx, &slice).unwrap();
    assert_eq!(s.as_bytes(), b"hello");
}

#[test]
fn cstring_terminates_at_the_first_unobserved_byte() {
    let mut ctx = context();
    // No terminator written: the gap after the payload reads as zero.
    ctx.env_as_mut::<ShadowEnv>()
        .memory_mut()
        .write(APPLICATION_POOL, 0x2000, b"abc")
        .unwrap();

    let slice = cstring_to_slice(&mut ctx, 0x2000).unwrap();
    assert_eq!(slice.size, 4);
}

#[test]
fn string_to_slice_and_back_round_trips() {
    let mut ctx = context();
    let original = RtString::from_bytes(&ctx.arena, b"observer");

    let slice = string_to_slice(&mut ctx, &original).unwrap();
    assert!(!slice.is_app_pool());
    assert_eq!(slice.base, 0);
    assert_eq!(slice.size, 8);
    assert_eq!(slice.count, 8);

    let back = slice_to_string(&mut ctx, &slice).unwrap();
    assert_eq!(back, original);
}

#[test]
fn slice_to_string_trims_one_trailing_nul() {
    let mut ctx = context();
    let p = make_pool(&mut ctx, 8).unwrap();
    optic_runtime::write_pool_data(&mut ctx, p, 0, b"abc\0").unwrap();

    let s = slice_to_string(&mut ctx, &Slice::new(p, 0, 0, 4, 4)).unwrap();
    assert_eq!(s.as_bytes(), b"abc");

    // Without a trailing NUL nothing is trimmed.
    let s = slice_to_string(&mut ctx, &Slice::new(p, 0, 0, 3, 3)).unwrap();
    assert_eq!(s.as_bytes(), b"abc");
}

#[test]
fn store_in_database_is_content_addressed() {
    let mut ctx = context();
    let a = store_in_database(&mut ctx, b"payload").unwrap();
    let b = store_in_database(&mut ctx, b"payload").unwrap();
    let c = store_in_database(&mut ctx, b"other").unwrap();

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.as_bytes().len(), 20);
    assert_eq!(ctx.env_as::<ShadowEnv>().database().len(), 2);
}

#[test]
fn batch_records_aborts_and_continues() {
    let mut ctx = context();

    let mut first = Command::new(1, |ctx: &mut Context| {
        let pool = make_pool(ctx, 8)?;
        optic_runtime::write_pool_data(ctx, pool, 0, &[1])?;
        Ok(())
    });
    first.thread = 7;

    let aborting = Command::new(2, |_ctx: &mut Context| Err(RuntimeError::Aborted));
    let last = Command::new(3, |_ctx: &mut Context| Ok(()));

    let statuses = run_batch(&mut ctx, vec![first, aborting, last]);
    assert_eq!(statuses, vec![ERR_SUCCESS, ERR_ABORTED, ERR_SUCCESS]);
    assert_eq!(ctx.cmd_id, 3);
}

#[test]
fn apply_reads_is_gated_by_the_command_flags() {
    let mut ctx = context();
    let p = make_pool(&mut ctx, 8).unwrap();

    let mut ungated = Command::new(1, |ctx: &mut Context| apply_reads(ctx));
    ungated.reads = vec![Observation::inline(p, 0, bytes::Bytes::from_static(&[9, 9]))];
    // No HAS_READS flag: the observation must not land.
    let statuses = run_batch(&mut ctx, vec![ungated]);
    assert_eq!(statuses, vec![ERR_SUCCESS]);
    let read = optic_runtime::read_pool_data(&mut ctx, p, 0, 2).unwrap();
    assert_eq!(&read.bytes()[..], &[0, 0]);

    let mut gated = Command::new(2, |ctx: &mut Context| apply_reads(ctx));
    gated.flags = CmdFlags::HAS_READS;
    gated.reads = vec![Observation::inline(p, 0, bytes::Bytes::from_static(&[9, 9]))];
    run_batch(&mut ctx, vec![gated]);
    let read = optic_runtime::read_pool_data(&mut ctx, p, 0, 2).unwrap();
    assert_eq!(&read.bytes()[..], &[9, 9]);
}

#[test]
fn apply_writes_lands_after_the_body() {
    let mut ctx = context();
    let p = make_pool(&mut ctx, 8).unwrap();

    let mut cmd = Command::new(1, |ctx: &mut Context| {
        // Command body runs against pre-write state.
        let pool = ctx_pool(ctx);
        let read = optic_runtime::read_pool_data(ctx, pool, 0, 1)?;
        assert_eq!(read.bytes()[0], 0);
        apply_writes(ctx)
    });
    cmd.flags = CmdFlags::HAS_WRITES;
    cmd.writes = vec![Observation::inline(p, 0, bytes::Bytes::from_static(&[4]))];
    cmd.args = Some(Box::new(p));

    run_batch(&mut ctx, vec![cmd]);
    let read = optic_runtime::read_pool_data(&mut ctx, p, 0, 1).unwrap();
    assert_eq!(read.bytes()[0], 4);
}

/// Pulls the pool id smuggled through the command arguments.
fn ctx_pool(ctx: &Context) -> optic_memory::PoolId {
    *ctx.args
        .as_ref()
        .and_then(|a| a.downcast_ref::<optic_memory::PoolId>())
        .expect("command arguments carry the pool id")
}

#[test]
fn externs_dispatch_by_name() {
    let mut ctx = context();
    ctx.env_as_mut::<ShadowEnv>()
        .externs_mut()
        .register("index_limits", |_arena, args, res| {
            let sizeof_index = *args.downcast_ref::<u32>().unwrap();
            let out = res.downcast_mut::<u64>().unwrap();
            *out = match sizeof_index {
                1 => u8::MAX as u64,
                2 => u16::MAX as u64,
                4 => u32::MAX as u64,
                other => optic_memory::fatal!("unhandled index size {other}"),
            };
            Ok(())
        });

    let mut limit = 0u64;
    call_extern(&mut ctx, "index_limits", &4u32, &mut limit).unwrap();
    assert_eq!(limit, u32::MAX as u64);
}

#[test]
#[should_panic(expected = "unhandled index size")]
fn unhandled_index_size_is_fatal() {
    let mut ctx = context();
    ctx.env_as_mut::<ShadowEnv>()
        .externs_mut()
        .register("index_limits", |_arena, args, _res| {
            let sizeof_index = *args.downcast_ref::<u32>().unwrap();
            match sizeof_index {
                1 | 2 | 4 => Ok(()),
                other => optic_memory::fatal!("unhandled index size {other}"),
            }
        });

    let mut out = ();
    call_extern(&mut ctx, "index_limits", &3u32, &mut out).unwrap();
}

#[test]
#[should_panic(expected = "no handler for extern")]
fn missing_extern_handler_is_fatal() {
    let mut ctx = context();
    let mut out = ();
    call_extern(&mut ctx, "unregistered", &(), &mut out).unwrap();
}

#[test]
fn slice_reference_tracks_the_pool() {
    let mut ctx = context();
    let p = make_pool(&mut ctx, 8).unwrap();
    let slice = Slice::new(p, 0, 0, 8, 8);

    slice.on_reference(&mut ctx);
    assert_eq!(ctx.env_as::<ShadowEnv>().memory().get_pool(p).ref_count(), 2);
    slice.on_release(&mut ctx);
    slice.on_release(&mut ctx);
    assert!(!ctx.env_as::<ShadowEnv>().memory().contains(p));

    // Application-pool slices are not ref counted; this must be a no-op.
    let app = Slice::default();
    app.on_reference(&mut ctx);
    app.on_release(&mut ctx);
}
