//! In-process capture path and state serialization.
//!
//! During capture, pools are plain arena-backed buffers and pool 0 is the
//! application's own address space (behind the audited [`HostMemory`] seam).
//! At state-capture boundaries the [`StateSerializer`] walks encoded slices,
//! detects first-time pool references and emits one initial
//! [`optic_memory::Observation`] per pool:
//!
//! - [`HostMemory`]: host address-space seam for application-pool accesses
//! - [`CaptureEnv`]: flat-pool capture environment
//! - [`Encoder`]: external serialization collaborator
//! - [`CallObserver`]: per-command observation recording around an encoder
//! - [`StateSerializer`]: first-seen-pool observation logic

mod encoder;
mod host;
mod serializer;
mod spy;

pub use encoder::{CallObserver, Encoder};
pub use host::{BufferHostMemory, HostMemory};
pub use serializer::{SerializerOptions, StateSerializer};
pub use spy::CaptureEnv;
