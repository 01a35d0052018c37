use std::any::Any;
use std::collections::HashMap;

use optic_arena::Arena;
use optic_memory::Observation;
use tracing::{debug, warn};

use crate::context::Context;
use crate::error::{Result, RuntimeError};
use crate::{ERR_ABORTED, ERR_SUCCESS};

bitflags::bitflags! {
    /// Per-command flags; gate the observation application callbacks.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct CmdFlags: u32 {
        const HAS_READS = 0x1;
        const HAS_WRITES = 0x2;
    }
}

pub type CommandBody = Box<dyn FnOnce(&mut Context) -> Result<()>>;

/// One captured command, ready to execute against a context.
pub struct Command {
    pub id: u64,
    pub thread: u64,
    pub location: u32,
    pub flags: CmdFlags,
    /// Read observations, applied when the body calls
    /// [`crate::apply_reads`].
    pub reads: Vec<Observation>,
    /// Write observations, applied when the body calls
    /// [`crate::apply_writes`].
    pub writes: Vec<Observation>,
    /// Command arguments; opaque to the runtime.
    pub args: Option<Box<dyn Any>>,
    pub body: CommandBody,
}

impl Command {
    pub fn new(id: u64, body: impl FnOnce(&mut Context) -> Result<()> + 'static) -> Self {
        Self {
            id,
            thread: 0,
            location: 0,
            flags: CmdFlags::empty(),
            reads: Vec::new(),
            writes: Vec::new(),
            args: None,
            body: Box::new(body),
        }
    }
}

/// Runs `commands` in program order, recording one status code per command.
///
/// An aborting command unwinds here, is recorded as [`ERR_ABORTED`] and
/// execution moves on to the next command.
pub fn run_batch(ctx: &mut Context, commands: Vec<Command>) -> Vec<u32> {
    let mut statuses = Vec::with_capacity(commands.len());
    for (idx, cmd) in commands.into_iter().enumerate() {
        ctx.cmd_id = cmd.id;
        ctx.cmd_idx = idx as u64;
        ctx.thread = cmd.thread;
        ctx.location = cmd.location;
        ctx.cmd_flags = cmd.flags;
        ctx.args = cmd.args;
        ctx.pending_reads = cmd.reads;
        ctx.pending_writes = cmd.writes;

        let status = match (cmd.body)(ctx) {
            Ok(()) => ERR_SUCCESS,
            Err(RuntimeError::Aborted) => {
                debug!(cmd = cmd.id, "command aborted");
                ERR_ABORTED
            }
            Err(err) => {
                warn!(cmd = cmd.id, %err, "command failed");
                ERR_ABORTED
            }
        };
        statuses.push(status);
    }
    statuses
}

pub type ExternFn = fn(&Arena, &dyn Any, &mut dyn Any) -> Result<()>;

/// Named extern handlers; the dispatch target of `call_extern`.
#[derive(Default)]
pub struct ExternRegistry {
    handlers: HashMap<&'static str, ExternFn>,
}

impl ExternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, handler: ExternFn) {
        self.handlers.insert(name, handler);
    }

    /// Dispatches `name`. A missing handler is fatal.
    pub fn call(
        &self,
        arena: &Arena,
        name: &str,
        args: &dyn Any,
        res: &mut dyn Any,
    ) -> Result<()> {
        match self.handlers.get(name) {
            Some(handler) => handler(arena, args, res),
            None => optic_memory::fatal!("no handler for extern '{name}'"),
        }
    }
}
