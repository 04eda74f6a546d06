//! Per-run driver over an assigned execution context.
//!
//! Execution walks the task list in order. For each task it consults the
//! buffer state table to decide which arguments must be staged to the
//! assigned device, launches the kernel, waits for completion and updates
//! residency so later tasks (and [`ExecutionContext::sync`]) see where the
//! valid copies live. Errors propagate; nothing is retried.

use std::rc::Rc;

use snafu::ResultExt;
use zarya_device::{Allocation, DeviceHandle};

use crate::buffer::Buffer;
use crate::context::ExecutionContext;
use crate::error::{DeviceSnafu, Result, UnknownTaskSnafu};
use crate::profiler::Metric;
use crate::task::{Access, TaskArg};

impl ExecutionContext {
    /// Execute every task once, in list order.
    pub fn run(&mut self) -> Result<()> {
        for index in 0..self.tasks().len() {
            self.run_task(index)?;
        }
        Ok(())
    }

    fn run_task(&mut self, index: usize) -> Result<()> {
        let device = self.device_for_task(index)?.clone();
        let task = match self.task_at(index) {
            Some(task) => task.clone(),
            None => return UnknownTaskSnafu { index }.fail(),
        };

        let mut allocations = Vec::with_capacity(task.args().len());
        for (arg, access) in task.args().iter().zip(task.access().iter().copied()) {
            match arg {
                // Scalars ride with the launch; only buffers occupy device
                // memory.
                TaskArg::Constant(_) => {}
                TaskArg::Buffer(buffer) => {
                    let allocation = self.stage_buffer(buffer, access, &device)?;
                    allocations.push(allocation);
                }
            }
        }

        let event = device.enqueue_kernel(task.kernel(), &allocations).context(DeviceSnafu)?;
        event.wait().context(DeviceSnafu)?;

        if self.profiler().is_enabled() {
            let queued = event.queued_time().context(DeviceSnafu)?;
            let submitted = event.submit_time().context(DeviceSnafu)?;
            let elapsed = event.elapsed_time().context(DeviceSnafu)?;
            let dispatch = event.dispatch_latency().context(DeviceSnafu)?;
            let profiler = self.profiler_mut();
            profiler.add_timer(Metric::KernelQueuedTime, submitted - queued);
            profiler.add_timer(Metric::KernelDispatchLatency, dispatch);
            profiler.add_timer(Metric::KernelElapsedTime, elapsed);
        }

        // The executing device now holds the authoritative copy of every
        // written argument; all other device copies are stale.
        for (buffer, access) in task.buffer_params() {
            if access.is_write() {
                let buffer = Rc::clone(buffer);
                self.get_object_state(&buffer).mark_written(device.spec());
            }
        }

        tracing::debug!(task = task.id(), device = %device.spec(), "task completed");
        event.release().context(DeviceSnafu)
    }

    /// Make a buffer argument resident on `device`, uploading host bytes when
    /// the argument is read and the device copy is absent or streaming is
    /// requested.
    fn stage_buffer(
        &mut self,
        buffer: &Rc<Buffer>,
        access: Access,
        device: &DeviceHandle,
    ) -> Result<Allocation> {
        let (present, existing, streamed) = {
            let state = self.get_object_state(buffer);
            let streamed = state.is_stream_in() || state.is_force_stream_in();
            match state.residency(device.spec()) {
                Some(residency) => (residency.present, residency.allocation, streamed),
                None => (false, None, streamed),
            }
        };

        let allocation = match existing {
            Some(allocation) => allocation,
            None => device.allocate(buffer.size_bytes()).context(DeviceSnafu)?,
        };

        let upload = access.is_read() && (!present || streamed);
        if upload {
            let event = {
                let host = buffer.data();
                device.enqueue_write(allocation, &host[..], buffer.element()).context(DeviceSnafu)?
            };
            event.wait().context(DeviceSnafu)?;

            if self.profiler().is_enabled() {
                let elapsed = event.elapsed_time().context(DeviceSnafu)?;
                let profiler = self.profiler_mut();
                profiler.add_timer(Metric::CopyInTime, elapsed);
                profiler.add_bytes(Metric::CopyInBytes, allocation.bytes as u64);
            }
            event.release().context(DeviceSnafu)?;
        }

        let state = self.get_object_state(buffer);
        let residency = state.residency_mut(device.spec());
        residency.present = true;
        residency.allocation = Some(allocation);
        if upload {
            // A fresh upload matches the host copy.
            residency.dirty = false;
        }
        Ok(allocation)
    }
}
