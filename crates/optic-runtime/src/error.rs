use optic_memory::MemoryError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The command gave up; the batch runner records the failure and moves
    /// on to the next command.
    #[error("command aborted")]
    Aborted,

    #[error("host memory access out of range: addr={addr:#x} len={len}")]
    HostAccess { addr: u64, len: u64 },

    #[error(transparent)]
    Memory(#[from] MemoryError),
}
