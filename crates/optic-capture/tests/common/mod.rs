//! Shared test scaffolding: a recording encoder and a ready-made capture
//! context.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use optic_arena::Arena;
use optic_capture::{BufferHostMemory, CaptureEnv, Encoder};
use optic_memory::Observation;
use optic_runtime::{install_callbacks, Callbacks, Context, Slice};

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    GlobalState,
    Slice(Slice),
    Observation(Observation),
}

#[derive(Clone, Default)]
pub struct Recording {
    pub events: Rc<RefCell<Vec<Event>>>,
    pub resources: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl Recording {
    pub fn observations(&self) -> Vec<Observation> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Observation(o) => Some(o.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Encoder that records everything it is handed.
pub struct RecordingEncoder {
    recording: Recording,
}

impl RecordingEncoder {
    pub fn new(recording: Recording) -> Self {
        Self { recording }
    }
}

impl Encoder for RecordingEncoder {
    fn begin_global_state(&mut self) {
        self.recording.events.borrow_mut().push(Event::GlobalState);
    }

    fn encode_slice(&mut self, slice: &Slice) {
        self.recording.events.borrow_mut().push(Event::Slice(*slice));
    }

    fn encode_observation(&mut self, observation: &Observation) {
        self.recording
            .events
            .borrow_mut()
            .push(Event::Observation(observation.clone()));
    }

    fn send_resource(&mut self, data: &[u8]) -> i64 {
        let mut resources = self.recording.resources.borrow_mut();
        resources.push(data.to_vec());
        (resources.len() - 1) as i64
    }
}

pub const HOST_BASE: u64 = 0x1000;

/// A context over a fresh capture environment with the capture callback
/// table installed.
pub fn capture_context() -> Context {
    install_callbacks(Callbacks::capture());
    let host = BufferHostMemory::new(HOST_BASE, vec![0u8; 256]);
    Context::new(Arena::new(), Box::new(CaptureEnv::new(Box::new(host))))
}
