//! Execution contexts: building, device assignment, snapshots.
//!
//! The lifecycle is explicit in the types:
//!
//! ```text
//! TaskGraph (mutable)  --assign_to_devices-->  ExecutionContext (assigned)
//!                                                    |  snapshot()
//!                                                    v
//!                                              ExecutionContext (deep copy)
//! ```
//!
//! [`TaskGraph`] collects tasks, constants and buffers. `assign_to_devices`
//! consumes it, runs independence analysis once and fixes the task-to-device
//! mapping; there is no way to re-assign an assigned context, which makes
//! assignment idempotent by construction. [`ExecutionContext::snapshot`]
//! produces a deep copy sharing no mutable container with its source, so a
//! scheduled plan can be executed repeatedly (with buffers swapped in via
//! [`ExecutionContext::replace_object_state`]) while the original stays
//! untouched.

use std::fmt::Write as _;
use std::rc::Rc;

use snafu::{OptionExt, ResultExt};
use zarya_device::{DeviceHandle, DeviceSpec};

use crate::analyzer::tasks_independent;
use crate::buffer::Buffer;
use crate::error::{
    DeviceSnafu, MissingDeviceSnafu, PlacementConflictSnafu, ReplacementKindMismatchSnafu, Result,
    UnassignedTaskSnafu, UnknownBufferSnafu,
};
use crate::profiler::{Metric, Profiler};
use crate::state::LocalState;
use crate::table::{ConstantTable, ObjectStateTable};
use crate::task::{Task, TaskArg};

/// Mutable registration phase of an execution context.
pub struct TaskGraph {
    name: String,
    tasks: Vec<Task>,
    constants: ConstantTable,
    objects: ObjectStateTable,
    next_task: usize,
    profiler: Profiler,
}

impl TaskGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_profiler(name, Profiler::disabled())
    }

    pub fn with_profiler(name: impl Into<String>, profiler: Profiler) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
            constants: ConstantTable::new(),
            objects: ObjectStateTable::new(),
            next_task: 0,
            profiler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a task, deduplicating by identifier.
    ///
    /// The task's buffer arguments register into the object table as a side
    /// effect, so a freshly added task is immediately visible to state
    /// lookups and sync.
    pub fn add_task(&mut self, task: Task) -> usize {
        if let Some(index) = self.tasks.iter().position(|existing| existing.id() == task.id()) {
            return index;
        }
        for arg in task.args() {
            self.insert_variable(arg);
        }
        self.tasks.push(task);
        self.tasks.len() - 1
    }

    /// Monotonic counter for generating task identifiers.
    pub fn next_task_index(&mut self) -> usize {
        let index = self.next_task;
        self.next_task += 1;
        index
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Register a constant or buffer argument.
    ///
    /// Constants deduplicate by value equality and return the constant-table
    /// index; buffers register by identity and return the object-table
    /// index. The two tables are disjoint index spaces.
    pub fn insert_variable(&mut self, arg: &TaskArg) -> usize {
        match arg {
            TaskArg::Constant(value) => self.constants.insert(*value),
            TaskArg::Buffer(buffer) => self.objects.register(buffer),
        }
    }

    /// Local state for a buffer, registering it on first sight.
    pub fn get_object_state(&mut self, buffer: &Rc<Buffer>) -> &mut LocalState {
        self.objects.state_for(buffer)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn constants(&self) -> &ConstantTable {
        &self.constants
    }

    pub fn objects(&self) -> &ObjectStateTable {
        &self.objects
    }

    /// One-shot device assignment.
    ///
    /// Runs independence analysis over the task list, then either places
    /// every task on its requested device (independent graph) or forces the
    /// whole graph onto the first task's device (dependent graph). Tasks
    /// without an explicit request run on the default host device.
    pub fn assign_to_devices(self) -> Result<ExecutionContext> {
        let TaskGraph { name, tasks, constants, objects, next_task, profiler } = self;

        let independent = tasks_independent(&tasks);
        let mut devices: Vec<Option<DeviceHandle>> = Vec::new();
        let mut task_to_device: Vec<Option<usize>> = vec![None; tasks.len()];

        if independent {
            for (index, task) in tasks.iter().enumerate() {
                let device = effective_device(task)?;
                let slot = place_device(&mut devices, device.clone(), task.preferred_slot());
                tracing::debug!(task = task.id(), device = %device.spec(), slot, "assigning task to device");
                task_to_device[index] = Some(slot);
            }
        } else {
            // Buffer hazards between tasks: fall back to the first task's
            // device for the whole graph.
            let fallback = effective_device(&tasks[0])?;
            for task in &tasks {
                if let Some(requested) = task.device() {
                    if requested.spec().base_type() != fallback.spec().base_type() {
                        return PlacementConflictSnafu {
                            task: task.id(),
                            requested: requested.spec().clone(),
                            assigned: fallback.spec().clone(),
                        }
                        .fail();
                    }
                }
            }
            tracing::debug!(device = %fallback.spec(), tasks = tasks.len(), "dependent graph pinned to one device");
            devices = vec![Some(fallback)];
            task_to_device = vec![Some(0); tasks.len()];
        }

        Ok(ExecutionContext {
            name,
            tasks,
            constants,
            objects,
            devices,
            task_to_device,
            next_task,
            independent,
            profiler,
        })
    }
}

fn effective_device(task: &Task) -> Result<DeviceHandle> {
    match task.device() {
        Some(device) => Ok(device.clone()),
        None => zarya_device::registry::host().context(DeviceSnafu),
    }
}

/// Slot of `device` in the table, inserting it at the preferred slot (or the
/// first free one after it) when absent.
fn place_device(devices: &mut Vec<Option<DeviceHandle>>, device: DeviceHandle, preferred: usize) -> usize {
    if let Some(slot) = devices.iter().position(|entry| entry.as_ref() == Some(&device)) {
        return slot;
    }
    let mut slot = preferred;
    while matches!(devices.get(slot), Some(Some(_))) {
        slot += 1;
    }
    if slot >= devices.len() {
        devices.resize(slot + 1, None);
    }
    devices[slot] = Some(device);
    slot
}

/// Assigned execution context.
///
/// Produced by [`TaskGraph::assign_to_devices`]; the device mapping is fixed
/// for the context's lifetime. Buffer rebinding via
/// [`replace_object_state`](Self::replace_object_state) and host write-back
/// via [`sync`](Self::sync) stay available so the context (or a snapshot)
/// can drive repeated executions.
#[derive(Debug)]
pub struct ExecutionContext {
    name: String,
    tasks: Vec<Task>,
    constants: ConstantTable,
    objects: ObjectStateTable,
    devices: Vec<Option<DeviceHandle>>,
    task_to_device: Vec<Option<usize>>,
    next_task: usize,
    independent: bool,
    profiler: Profiler,
}

impl ExecutionContext {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Result of the independence analysis run at assignment.
    pub fn is_independent(&self) -> bool {
        self.independent
    }

    /// Value of the task counter at assignment time; carried into snapshots
    /// so id generation can resume from a copy.
    pub fn task_counter(&self) -> usize {
        self.next_task
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task_at(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    /// Look up a task by identifier.
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    /// Replace a task in place (after recompilation). Tables and the device
    /// mapping are untouched; prior snapshots are unaffected.
    pub fn set_task(&mut self, index: usize, task: Task) {
        if index < self.tasks.len() {
            self.tasks[index] = task;
        }
    }

    pub fn constants(&self) -> &ConstantTable {
        &self.constants
    }

    pub fn objects(&self) -> &ObjectStateTable {
        &self.objects
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    pub(crate) fn profiler_mut(&mut self) -> &mut Profiler {
        &mut self.profiler
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn device(&self, slot: usize) -> Option<&DeviceHandle> {
        self.devices.get(slot).and_then(|entry| entry.as_ref())
    }

    /// Device slot executing a task.
    pub fn device_index_for_task(&self, index: usize) -> Option<usize> {
        self.task_to_device.get(index).copied().flatten()
    }

    pub fn device_for_task(&self, index: usize) -> Result<&DeviceHandle> {
        let slot = self
            .task_to_device
            .get(index)
            .copied()
            .flatten()
            .context(UnassignedTaskSnafu { index })?;
        self.device(slot).context(UnassignedTaskSnafu { index })
    }

    fn device_by_spec(&self, spec: &DeviceSpec) -> Option<&DeviceHandle> {
        self.devices.iter().flatten().find(|device| device.spec() == spec)
    }

    /// Local state for a buffer, registering it on first sight.
    pub fn get_object_state(&mut self, buffer: &Rc<Buffer>) -> &mut LocalState {
        self.objects.state_for(buffer)
    }

    /// Rebind a logical argument slot to a different physical buffer.
    ///
    /// The new buffer takes the old one's table index and inherits its
    /// streaming flags; residency starts fresh.
    pub fn replace_object_state(&mut self, old: &Rc<Buffer>, new: &Rc<Buffer>) -> Result<&mut LocalState> {
        let index = self.objects.replace(old, new)?;
        self.objects.state_mut(index).context(UnknownBufferSnafu { id: new.id() })
    }

    /// Replace a registered constant or buffer, keeping its index.
    pub fn replace_variable(&mut self, old: &TaskArg, new: &TaskArg) -> Result<usize> {
        match (old, new) {
            (TaskArg::Constant(old), TaskArg::Constant(new)) => self.constants.replace(*old, *new),
            (TaskArg::Buffer(old), TaskArg::Buffer(new)) => self.objects.replace(old, new),
            _ => ReplacementKindMismatchSnafu.fail(),
        }
    }

    /// Write dirty or stream-out buffers back to the host.
    ///
    /// Every pending copy is waited on and its event released. With
    /// profiling enabled, elapsed time and byte counts accumulate under the
    /// copy-out-sync metrics; with profiling disabled no metric is touched
    /// and the event is simply discarded after the transfer completes.
    pub fn sync(&mut self) -> Result<()> {
        for index in 0..self.objects.len() {
            let buffer = match self.objects.buffer(index) {
                Some(buffer) => Rc::clone(buffer),
                None => continue,
            };
            let pending: Vec<_> = match self.objects.state(index) {
                Some(state) => state
                    .pending_write_backs()
                    .filter_map(|(spec, residency)| {
                        residency.allocation.map(|allocation| (spec.clone(), allocation))
                    })
                    .collect(),
                None => continue,
            };

            for (spec, allocation) in pending {
                let device = self
                    .device_by_spec(&spec)
                    .context(MissingDeviceSnafu { device: spec.clone() })?
                    .clone();

                let event = {
                    let mut host = buffer.data_mut();
                    device
                        .enqueue_read(allocation, &mut host[..], buffer.element())
                        .context(DeviceSnafu)?
                };
                event.wait().context(DeviceSnafu)?;

                if self.profiler.is_enabled() {
                    let elapsed = event.elapsed_time().context(DeviceSnafu)?;
                    self.profiler.add_timer(Metric::CopyOutTimeSync, elapsed);
                    self.profiler.add_bytes(Metric::CopyOutBytesSync, allocation.bytes as u64);
                }
                event.release().context(DeviceSnafu)?;

                if let Some(state) = self.objects.state_mut(index) {
                    state.clear_dirty(&spec);
                }
            }
        }
        Ok(())
    }

    /// Deep copy for repeated execution.
    ///
    /// The snapshot shares no mutable container with its source: later
    /// `set_task` or replace calls on either side leave the other untouched.
    /// Buffer payloads stay shared (they are the user's data); identity maps,
    /// states and tables are copied.
    pub fn snapshot(&self) -> ExecutionContext {
        ExecutionContext {
            name: self.name.clone(),
            tasks: self.tasks.clone(),
            constants: self.constants.clone(),
            objects: self.objects.clone(),
            devices: self.devices.clone(),
            task_to_device: self.task_to_device.clone(),
            next_task: self.next_task,
            independent: self.independent,
            profiler: self.profiler.clone(),
        }
    }

    /// Render the device, constant, object and task tables for debugging.
    pub fn dump_meta(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "-----------------------------------");
        let _ = writeln!(out, "context: {}", self.name);

        let _ = writeln!(out, "device table:");
        for (slot, device) in self.devices.iter().enumerate() {
            match device {
                Some(device) => {
                    let _ = writeln!(out, "  [{slot}]: {}", device.name());
                }
                None => {
                    let _ = writeln!(out, "  [{slot}]: <empty>");
                }
            }
        }

        let _ = writeln!(out, "constant table:");
        for (index, value) in self.constants.iter().enumerate() {
            let _ = writeln!(out, "  [{index}]: {value}");
        }

        let _ = writeln!(out, "object table:");
        for index in 0..self.objects.len() {
            if let Some(buffer) = self.objects.buffer(index) {
                let _ = writeln!(
                    out,
                    "  [{index}]: {} ({} x {}, {} bytes)",
                    buffer.id(),
                    buffer.len(),
                    buffer.element(),
                    buffer.size_bytes()
                );
            }
        }

        let _ = writeln!(out, "task table:");
        for (index, task) in self.tasks.iter().enumerate() {
            match self.device_index_for_task(index) {
                Some(slot) => {
                    let _ = writeln!(out, "  [{index}]: {} -> device [{slot}]", task.id());
                }
                None => {
                    let _ = writeln!(out, "  [{index}]: {} -> unassigned", task.id());
                }
            }
        }
        let _ = writeln!(out, "-----------------------------------");
        out
    }
}
