use std::any::Any;

use optic_arena::Arena;
use optic_memory::Observation;

use crate::env::RuntimeEnv;
use crate::exec::CmdFlags;

/// Per-command execution record.
///
/// The context is the first parameter to every runtime callback and is
/// opaque to generated command code. Environment-specific state (pool
/// stores, extern handlers, the content store) travels in `env`, which keeps
/// the callback table itself stateless and shareable.
pub struct Context {
    /// Context identifier; treated as user data.
    pub id: u32,
    /// API source location of the current command.
    pub location: u32,
    /// Identifier of the current command.
    pub cmd_id: u64,
    /// Index of the current command within its batch.
    pub cmd_idx: u64,
    /// Thread the command was captured on.
    pub thread: u64,
    /// Flags of the current command.
    pub cmd_flags: CmdFlags,
    /// Arena for all allocations made on behalf of this context.
    pub arena: Arena,
    /// Global API state; opaque to the runtime.
    pub globals: Option<Box<dyn Any>>,
    /// Arguments of the currently executing command; opaque to the runtime.
    pub args: Option<Box<dyn Any>>,
    /// Read observations tagged to the current command.
    pub pending_reads: Vec<Observation>,
    /// Write observations tagged to the current command.
    pub pending_writes: Vec<Observation>,
    env: Box<dyn RuntimeEnv>,
}

impl Context {
    pub fn new(arena: Arena, env: Box<dyn RuntimeEnv>) -> Self {
        Self {
            id: 0,
            location: 0,
            cmd_id: 0,
            cmd_idx: 0,
            thread: 0,
            cmd_flags: CmdFlags::empty(),
            arena,
            globals: None,
            args: None,
            pending_reads: Vec::new(),
            pending_writes: Vec::new(),
            env,
        }
    }

    pub fn env(&self) -> &dyn RuntimeEnv {
        self.env.as_ref()
    }

    pub fn env_mut(&mut self) -> &mut dyn RuntimeEnv {
        self.env.as_mut()
    }

    /// The environment downcast to its concrete type.
    pub fn env_as<E: RuntimeEnv>(&self) -> &E {
        match self.env.as_any().downcast_ref::<E>() {
            Some(e) => e,
            None => optic_memory::fatal!("context environment has an unexpected type"),
        }
    }

    pub fn env_as_mut<E: RuntimeEnv>(&mut self) -> &mut E {
        match self.env.as_any_mut().downcast_mut::<E>() {
            Some(e) => e,
            None => optic_memory::fatal!("context environment has an unexpected type"),
        }
    }
}
