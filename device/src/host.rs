//! In-process host backend.
//!
//! The host device is a zero-latency queue: operations complete at enqueue
//! time, which makes it deterministic for tests and useful as a reference
//! backend. Timestamps are nanoseconds from the device epoch when profiling
//! is enabled, -1 otherwise. Real accelerator backends attach through
//! [`DeviceRegistry::register_factory`](crate::registry::DeviceRegistry::register_factory).

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;
use snafu::{OptionExt, ensure};

use crate::accel::{Accelerator, Allocation, EventToken, KernelHandle};
use crate::error::{
    DriverFaultSnafu, Result, SizeMismatchSnafu, UnknownAllocationSnafu, UnknownEventSnafu,
};
use crate::event::{ElementType, EventKind, EventStatus, ProfileQuery};
use crate::pool::{DEFAULT_EVENT_WINDOW, EventPool};
use crate::spec::DeviceSpec;

#[derive(Debug, Clone, Copy)]
struct EventRecord {
    status: EventStatus,
    queued: i64,
    submitted: i64,
    start: i64,
    end: i64,
}

#[derive(Debug)]
struct HostState {
    allocations: HashMap<u64, Box<[u8]>>,
    next_allocation: u64,
    pool: EventPool,
    records: HashMap<u64, EventRecord>,
}

/// The built-in in-process device.
#[derive(Debug)]
pub struct HostDevice {
    spec: DeviceSpec,
    name: String,
    profiling: bool,
    epoch: Instant,
    state: Mutex<HostState>,
}

impl HostDevice {
    pub fn new(spec: DeviceSpec) -> Self {
        Self::with_profiling(spec, false)
    }

    pub fn with_profiling(spec: DeviceSpec, profiling: bool) -> Self {
        let name = format!("{spec} (in-process)");
        Self {
            spec,
            name,
            profiling,
            epoch: Instant::now(),
            state: Mutex::new(HostState {
                allocations: HashMap::new(),
                next_allocation: 1,
                pool: EventPool::new(DEFAULT_EVENT_WINDOW),
                records: HashMap::new(),
            }),
        }
    }

    fn now(&self) -> i64 {
        if self.profiling { self.epoch.elapsed().as_nanos() as i64 } else { -1 }
    }

    fn record(
        &self,
        state: &mut HostState,
        kind: EventKind,
        queued: i64,
        start: i64,
        end: i64,
    ) -> Result<EventToken> {
        let (slot, handle) = state.pool.register(kind)?;
        state
            .records
            .insert(handle, EventRecord { status: EventStatus::Complete, queued, submitted: queued, start, end });
        Ok(EventToken { slot, handle, kind })
    }
}

impl Accelerator for HostDevice {
    fn spec(&self) -> &DeviceSpec {
        &self.spec
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn profiling_enabled(&self) -> bool {
        self.profiling
    }

    fn allocate(&self, bytes: usize) -> Result<Allocation> {
        let mut state = self.state.lock();
        let id = state.next_allocation;
        state.next_allocation += 1;
        state.allocations.insert(id, vec![0u8; bytes].into_boxed_slice());
        Ok(Allocation { id, bytes })
    }

    fn release(&self, allocation: Allocation) -> Result<()> {
        let mut state = self.state.lock();
        state.allocations.remove(&allocation.id).context(UnknownAllocationSnafu { id: allocation.id })?;
        Ok(())
    }

    fn enqueue_kernel(&self, kernel: &KernelHandle, args: &[Allocation]) -> Result<EventToken> {
        let mut state = self.state.lock();
        let queued = self.now();
        for arg in args {
            ensure!(state.allocations.contains_key(&arg.id), UnknownAllocationSnafu { id: arg.id });
        }
        // The host backend accounts for the launch; kernel bodies are
        // compiled and executed by collaborators outside this crate.
        let start = self.now();
        let end = self.now();
        let kind = if kernel.is_parallel() { EventKind::ParallelKernel } else { EventKind::SerialKernel };
        tracing::trace!(kernel = kernel.name(), args = args.len(), "host kernel launch");
        self.record(&mut state, kind, queued, start, end)
    }

    fn enqueue_write(&self, dst: Allocation, src: &[u8], element: ElementType) -> Result<EventToken> {
        let mut state = self.state.lock();
        let queued = self.now();
        let start = self.now();
        let buffer = state.allocations.get_mut(&dst.id).context(UnknownAllocationSnafu { id: dst.id })?;
        ensure!(src.len() <= buffer.len(), SizeMismatchSnafu { expected: buffer.len(), actual: src.len() });
        buffer[..src.len()].copy_from_slice(src);
        let end = self.now();
        self.record(&mut state, EventKind::Write(element), queued, start, end)
    }

    fn enqueue_read(&self, src: Allocation, dst: &mut [u8], element: ElementType) -> Result<EventToken> {
        let mut state = self.state.lock();
        let queued = self.now();
        let start = self.now();
        let buffer = state.allocations.get(&src.id).context(UnknownAllocationSnafu { id: src.id })?;
        ensure!(dst.len() <= buffer.len(), SizeMismatchSnafu { expected: buffer.len(), actual: dst.len() });
        dst.copy_from_slice(&buffer[..dst.len()]);
        let end = self.now();
        self.record(&mut state, EventKind::Read(element), queued, start, end)
    }

    fn enqueue_marker(&self) -> Result<EventToken> {
        let mut state = self.state.lock();
        let now = self.now();
        self.record(&mut state, EventKind::SyncMarker, now, now, now)
    }

    fn enqueue_barrier(&self) -> Result<EventToken> {
        let mut state = self.state.lock();
        let now = self.now();
        self.record(&mut state, EventKind::SyncBarrier, now, now, now)
    }

    fn flush(&self) {
        // Nothing is batched; every operation completed at enqueue.
    }

    fn wait_for_events(&self, handles: &[u64]) -> Result<()> {
        let state = self.state.lock();
        for &handle in handles {
            let record = state.records.get(&handle).context(UnknownEventSnafu { handle })?;
            if record.status.is_fault() {
                return DriverFaultSnafu { event: format!("0x{handle:x}") }.fail();
            }
        }
        Ok(())
    }

    fn event_status(&self, handle: u64) -> Result<EventStatus> {
        let state = self.state.lock();
        let record = state.records.get(&handle).context(UnknownEventSnafu { handle })?;
        Ok(record.status)
    }

    fn profiling_timestamp(&self, handle: u64, query: ProfileQuery) -> Result<i64> {
        if !self.profiling {
            return Ok(-1);
        }
        let state = self.state.lock();
        let record = state.records.get(&handle).context(UnknownEventSnafu { handle })?;
        Ok(match query {
            ProfileQuery::Queued => record.queued,
            ProfileQuery::Submitted => record.submitted,
            ProfileQuery::Start => record.start,
            ProfileQuery::End => record.end,
        })
    }

    fn release_event(&self, token: EventToken) -> Result<()> {
        let mut state = self.state.lock();
        state.records.remove(&token.handle).context(UnknownEventSnafu { handle: token.handle })?;
        state.pool.release(token.slot);
        Ok(())
    }
}
