//! Capability interface over accelerator backends.
//!
//! Each backend implements [`Accelerator`] once; the runtime stores
//! type-erased [`DeviceHandle`]s in its Device Table and never inspects the
//! concrete backend type at a call site. Enqueue operations return an
//! [`EventToken`] that the handle wraps into an [`Event`] bound to the
//! issuing queue.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::event::{ElementType, Event, EventKind, EventStatus, ProfileQuery};
use crate::spec::DeviceSpec;

/// Handle to a device-side buffer allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub id: u64,
    pub bytes: usize,
}

/// Opaque compiled-kernel handle.
///
/// Produced by the kernel compiler outside this crate and consumed by
/// [`Accelerator::enqueue_kernel`]. The scheduler never inspects the binary.
#[derive(Debug, Clone)]
pub struct KernelHandle {
    name: Arc<str>,
    binary: Arc<[u8]>,
    parallel: bool,
}

impl KernelHandle {
    pub fn new(name: impl Into<Arc<str>>, binary: impl Into<Arc<[u8]>>, parallel: bool) -> Self {
        Self { name: name.into(), binary: binary.into(), parallel }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binary(&self) -> &[u8] {
        &self.binary
    }

    /// Whether launches of this kernel are tagged as parallel events.
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }
}

/// A freshly enqueued operation, before it is wrapped into an [`Event`].
#[derive(Debug, Clone, Copy)]
pub struct EventToken {
    pub slot: usize,
    pub handle: u64,
    pub kind: EventKind,
}

/// Capability interface implemented once per backend.
///
/// One instance drives one device and its command queue. Operations enqueued
/// through the same instance execute in submission order; instances are
/// unordered with respect to each other unless a marker or barrier event is
/// waited on.
pub trait Accelerator: Send + Sync + fmt::Debug {
    fn spec(&self) -> &DeviceSpec;

    /// Human-readable device name for logs and diagnostic dumps.
    fn name(&self) -> &str;

    /// Whether enqueued operations record profiling timestamps.
    fn profiling_enabled(&self) -> bool;

    fn allocate(&self, bytes: usize) -> Result<Allocation>;
    fn release(&self, allocation: Allocation) -> Result<()>;

    fn enqueue_kernel(&self, kernel: &KernelHandle, args: &[Allocation]) -> Result<EventToken>;
    fn enqueue_write(&self, dst: Allocation, src: &[u8], element: ElementType) -> Result<EventToken>;
    fn enqueue_read(&self, src: Allocation, dst: &mut [u8], element: ElementType) -> Result<EventToken>;
    fn enqueue_marker(&self) -> Result<EventToken>;
    fn enqueue_barrier(&self) -> Result<EventToken>;

    /// Push any batched work towards the device.
    fn flush(&self);

    /// Block the calling thread until every listed event handle has signalled
    /// completion, or fail on a driver-reported fault.
    fn wait_for_events(&self, handles: &[u64]) -> Result<()>;

    fn event_status(&self, handle: u64) -> Result<EventStatus>;

    /// Profiling timestamp in nanoseconds, or -1 when profiling is disabled.
    fn profiling_timestamp(&self, handle: u64, query: ProfileQuery) -> Result<i64>;

    fn release_event(&self, token: EventToken) -> Result<()>;
}

/// Cloneable, type-erased handle to an [`Accelerator`].
///
/// This is what the runtime's Device Table stores. The backend is selected
/// once, when the handle is created, and every operation dispatches through
/// the trait object. Equality is over the device spec.
#[derive(Clone)]
pub struct DeviceHandle {
    inner: Arc<dyn Accelerator>,
}

impl DeviceHandle {
    pub fn new(accelerator: Arc<dyn Accelerator>) -> Self {
        Self { inner: accelerator }
    }

    pub fn spec(&self) -> &DeviceSpec {
        self.inner.spec()
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn profiling_enabled(&self) -> bool {
        self.inner.profiling_enabled()
    }

    pub fn allocate(&self, bytes: usize) -> Result<Allocation> {
        self.inner.allocate(bytes)
    }

    pub fn release(&self, allocation: Allocation) -> Result<()> {
        self.inner.release(allocation)
    }

    pub fn enqueue_kernel(&self, kernel: &KernelHandle, args: &[Allocation]) -> Result<Event> {
        let token = self.inner.enqueue_kernel(kernel, args)?;
        Ok(Event::new(token, Arc::clone(&self.inner)))
    }

    pub fn enqueue_write(&self, dst: Allocation, src: &[u8], element: ElementType) -> Result<Event> {
        let token = self.inner.enqueue_write(dst, src, element)?;
        Ok(Event::new(token, Arc::clone(&self.inner)))
    }

    pub fn enqueue_read(&self, src: Allocation, dst: &mut [u8], element: ElementType) -> Result<Event> {
        let token = self.inner.enqueue_read(src, dst, element)?;
        Ok(Event::new(token, Arc::clone(&self.inner)))
    }

    pub fn enqueue_marker(&self) -> Result<Event> {
        let token = self.inner.enqueue_marker()?;
        Ok(Event::new(token, Arc::clone(&self.inner)))
    }

    pub fn enqueue_barrier(&self) -> Result<Event> {
        let token = self.inner.enqueue_barrier()?;
        Ok(Event::new(token, Arc::clone(&self.inner)))
    }

    pub fn flush(&self) {
        self.inner.flush();
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle").field("spec", self.spec()).field("name", &self.name()).finish()
    }
}

impl PartialEq for DeviceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.spec() == other.spec()
    }
}

impl Eq for DeviceHandle {}
