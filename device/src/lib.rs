//! Accelerator device abstraction for the zarya runtime.
//!
//! This crate owns everything the scheduler consumes from a device:
//! - **Capability trait**: [`Accelerator`], implemented once per backend and
//!   dispatched through a type-erased [`DeviceHandle`].
//! - **Events**: [`Event`], a state machine over one asynchronous device
//!   operation with blocking wait, status polling and optional profiling.
//! - **Event pool**: [`EventPool`], the bounded, reusable slot registry
//!   backing per-queue event bookkeeping.
//! - **Registry**: [`DeviceRegistry`], cached device handles plus factory
//!   registration per backend kind.
//!
//! The in-process [`HostDevice`] is the only built-in backend; accelerator
//! backends register factories at startup and are otherwise external.

pub mod accel;
pub mod error;
pub mod event;
pub mod host;
pub mod pool;
pub mod registry;
pub mod spec;

#[cfg(test)]
pub mod test;

pub use accel::{Accelerator, Allocation, DeviceHandle, EventToken, KernelHandle};
pub use error::{Error, Result};
pub use event::{ElementType, Event, EventKind, EventStatus, ProfileQuery};
pub use host::HostDevice;
pub use pool::{DEFAULT_EVENT_WINDOW, EventPool};
pub use registry::{DeviceRegistry, get_device, registry};
pub use spec::DeviceSpec;
