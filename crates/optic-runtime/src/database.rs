use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use sha2::{Digest, Sha256};

/// Size in bytes of a content id.
pub const DATABASE_ID_SIZE: usize = 20;

/// Content id: the leading 20 bytes of the SHA-256 digest of the stored
/// data. Identical data always yields the identical id.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatabaseId([u8; DATABASE_ID_SIZE]);

impl DatabaseId {
    pub fn of(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut id = [0u8; DATABASE_ID_SIZE];
        id.copy_from_slice(&digest[..DATABASE_ID_SIZE]);
        Self(id)
    }

    pub fn as_bytes(&self) -> &[u8; DATABASE_ID_SIZE] {
        &self.0
    }
}

impl fmt::Debug for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// In-memory content-addressed store.
#[derive(Default)]
pub struct ContentStore {
    entries: HashMap<DatabaseId, Bytes>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` and returns its id. Storing identical data twice is
    /// idempotent.
    pub fn store(&mut self, data: &[u8]) -> DatabaseId {
        let id = DatabaseId::of(data);
        self.entries
            .entry(id)
            .or_insert_with(|| Bytes::copy_from_slice(data));
        id
    }

    pub fn get(&self, id: &DatabaseId) -> Option<&Bytes> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
