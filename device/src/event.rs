//! Event state machine over asynchronous device operations.
//!
//! Every enqueued operation (kernel launch, transfer, marker) yields an
//! [`Event`]. The driver moves it through Queued -> Submitted -> Running ->
//! Complete; Error and Unknown are terminal faults reachable from any
//! non-terminal state. Completion is monotonic, so a Complete status is
//! cached and later queries never touch the driver again.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use crate::accel::{Accelerator, EventToken};
use crate::error::{DriverFaultSnafu, Result};

/// Element type of a transfer, used to tag read/write events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    U8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl ElementType {
    pub fn bytes(self) -> usize {
        match self {
            ElementType::U8 => 1,
            ElementType::I16 => 2,
            ElementType::I32 | ElementType::F32 => 4,
            ElementType::I64 | ElementType::F64 => 8,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::U8 => "u8",
            ElementType::I16 => "i16",
            ElementType::I32 => "i32",
            ElementType::I64 => "i64",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// What one event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    SerialKernel,
    ParallelKernel,
    Write(ElementType),
    Read(ElementType),
    SyncMarker,
    SyncBarrier,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::SerialKernel => f.write_str("kernel (serial)"),
            EventKind::ParallelKernel => f.write_str("kernel (parallel)"),
            EventKind::Write(element) => write!(f, "write[{element}]"),
            EventKind::Read(element) => write!(f, "read[{element}]"),
            EventKind::SyncMarker => f.write_str("sync (marker)"),
            EventKind::SyncBarrier => f.write_str("sync (barrier)"),
        }
    }
}

/// Execution status reported by the device driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Queued,
    Submitted,
    Running,
    Complete,
    Error,
    Unknown,
}

impl EventStatus {
    /// Terminal fault states; fatal for the operation.
    pub fn is_fault(self) -> bool {
        matches!(self, EventStatus::Error | EventStatus::Unknown)
    }
}

/// Profiling timestamp selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileQuery {
    Queued,
    Submitted,
    Start,
    End,
}

/// One asynchronous device operation.
///
/// Device event slots come from a bounded, reusable pool, so an event must be
/// explicitly returned with [`Event::release`] once its result has been
/// consumed. Events are owned by their issuing queue and are not `Clone`.
pub struct Event {
    slot: usize,
    handle: u64,
    kind: EventKind,
    cached: Cell<Option<EventStatus>>,
    queue: Arc<dyn Accelerator>,
}

impl Event {
    pub(crate) fn new(token: EventToken, queue: Arc<dyn Accelerator>) -> Self {
        Self { slot: token.slot, handle: token.handle, kind: token.kind, cached: Cell::new(None), queue }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Driver-side event handle.
    pub fn handle(&self) -> u64 {
        self.handle
    }

    /// Slot in the issuing queue's event pool.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Descriptive tag carried into fault reports and logs.
    pub fn name(&self) -> String {
        format!("{}: 0x{:x}", self.kind, self.handle)
    }

    /// Current status.
    ///
    /// A cached Complete short-circuits without a driver call; any other
    /// cached value is stale by definition and the driver is queried again.
    pub fn status(&self) -> Result<EventStatus> {
        if self.cached.get() == Some(EventStatus::Complete) {
            return Ok(EventStatus::Complete);
        }
        let status = self.queue.event_status(self.handle)?;
        self.cached.set(Some(status));
        Ok(status)
    }

    /// Block the calling thread until the operation completes.
    ///
    /// A Submitted operation may sit in a queue the driver has not pushed to
    /// the device yet; flushing first guarantees forward progress before the
    /// blocking wait. Error and Unknown are fatal for the operation and are
    /// reported, not retried.
    pub fn wait(&self) -> Result<()> {
        match self.status()? {
            EventStatus::Complete => Ok(()),
            EventStatus::Submitted => {
                self.queue.flush();
                self.wait_passive()
            }
            EventStatus::Queued | EventStatus::Running => self.wait_passive(),
            EventStatus::Error | EventStatus::Unknown => DriverFaultSnafu { event: self.name() }.fail(),
        }
    }

    fn wait_passive(&self) -> Result<()> {
        self.queue.wait_for_events(&[self.handle])?;
        self.cached.set(Some(EventStatus::Complete));
        Ok(())
    }

    fn timestamp(&self, query: ProfileQuery) -> Result<i64> {
        self.queue.profiling_timestamp(self.handle, query)
    }

    /// Nanoseconds at which the operation entered the queue, or -1 when
    /// profiling is disabled.
    pub fn queued_time(&self) -> Result<i64> {
        self.timestamp(ProfileQuery::Queued)
    }

    pub fn submit_time(&self) -> Result<i64> {
        self.timestamp(ProfileQuery::Submitted)
    }

    pub fn start_time(&self) -> Result<i64> {
        self.timestamp(ProfileQuery::Start)
    }

    pub fn end_time(&self) -> Result<i64> {
        self.timestamp(ProfileQuery::End)
    }

    /// end - start. Meaningful only when profiling was enabled for the run.
    pub fn elapsed_time(&self) -> Result<i64> {
        Ok(self.end_time()? - self.start_time()?)
    }

    /// start - queued: how long the driver sat on the operation before
    /// starting it.
    pub fn dispatch_latency(&self) -> Result<i64> {
        Ok(self.start_time()? - self.queued_time()?)
    }

    /// Return the event slot to the issuing queue's bounded pool.
    pub fn release(self) -> Result<()> {
        let token = EventToken { slot: self.slot, handle: self.handle, kind: self.kind };
        self.queue.release_event(token)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("handle", &self.handle)
            .field("slot", &self.slot)
            .field("cached", &self.cached.get())
            .finish()
    }
}
