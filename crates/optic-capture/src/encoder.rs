use optic_memory::Observation;
use optic_runtime::{DataAccess, Slice};

/// The external serialization collaborator.
///
/// The runtime does not define the wire format; it hands the encoder typed
/// records and resource payloads and lets it write them out.
pub trait Encoder {
    /// Marks the start of a fresh global-state group.
    fn begin_global_state(&mut self);

    /// Encodes a slice record.
    fn encode_slice(&mut self, slice: &Slice);

    /// Encodes a memory observation record.
    fn encode_observation(&mut self, observation: &Observation);

    /// Sends `data` into the resource stream, returning its index.
    fn send_resource(&mut self, data: &[u8]) -> i64;
}

/// Wraps an encoder with per-command observation recording.
///
/// Command execution tags its memory accesses here; the executor drains
/// them into the command's read/write observation lists.
pub struct CallObserver {
    encoder: Box<dyn Encoder>,
    reads: Vec<Observation>,
    writes: Vec<Observation>,
}

impl CallObserver {
    pub fn new(encoder: Box<dyn Encoder>) -> Self {
        Self {
            encoder,
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    pub fn encoder_mut(&mut self) -> &mut dyn Encoder {
        self.encoder.as_mut()
    }

    /// Records an observation under the given access mode.
    pub fn observe(&mut self, access: DataAccess, observation: Observation) {
        if access.contains(DataAccess::READ) {
            self.reads.push(observation.clone());
        }
        if access.contains(DataAccess::WRITE) {
            self.writes.push(observation);
        }
    }

    /// Drains the recorded read observations.
    pub fn take_reads(&mut self) -> Vec<Observation> {
        std::mem::take(&mut self.reads)
    }

    /// Drains the recorded write observations.
    pub fn take_writes(&mut self) -> Vec<Observation> {
        std::mem::take(&mut self.writes)
    }
}
