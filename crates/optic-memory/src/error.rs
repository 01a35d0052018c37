use thiserror::Error;

pub type Result<T> = std::result::Result<T, MemoryError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("integer overflow while computing pool offsets")]
    OffsetOverflow,

    #[error("size {size} does not fit in usize")]
    SizeTooLarge { size: u64 },

    #[error("resource segment at [{start:#x}, {end:#x}) has no resolved bytes")]
    UnresolvedResource { start: u64, end: u64 },
}
