use bytes::Bytes;

use crate::registry::PoolId;

/// Payload of an [`Observation`]: the bytes themselves, or a reference into
/// the resource stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObservationData {
    Inline(Bytes),
    Resource { size: u64, res_index: i64 },
}

/// A record describing observed bytes of a pool, emitted to the encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observation {
    pub pool: PoolId,
    pub base: u64,
    pub data: ObservationData,
}

impl Observation {
    pub fn inline(pool: PoolId, base: u64, bytes: Bytes) -> Self {
        Self {
            pool,
            base,
            data: ObservationData::Inline(bytes),
        }
    }

    pub fn resource(pool: PoolId, base: u64, size: u64, res_index: i64) -> Self {
        Self {
            pool,
            base,
            data: ObservationData::Resource { size, res_index },
        }
    }

    /// Length in bytes of the observed range.
    pub fn len(&self) -> u64 {
        match &self.data {
            ObservationData::Inline(b) => b.len() as u64,
            ObservationData::Resource { size, .. } => *size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
