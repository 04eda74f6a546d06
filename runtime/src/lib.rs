//! Task scheduling core for the zarya runtime.
//!
//! A [`TaskGraph`] collects data-parallel tasks with declared buffer
//! arguments and access modes. One-shot device assignment runs a static
//! independence analysis over the graph and produces an
//! [`ExecutionContext`]: independent graphs spread across the devices the
//! tasks requested, dependent graphs fall back to a single device. The
//! context tracks which device holds a valid copy of every buffer, drives
//! kernel launches and transfers through events, writes results back on
//! [`ExecutionContext::sync`], and can be snapshotted for repeated execution.

pub mod analyzer;
pub mod buffer;
pub mod context;
pub mod error;
pub mod profiler;
pub mod state;
pub mod table;
pub mod task;

mod executor;

#[cfg(test)]
pub mod test;

pub use analyzer::{pair_dependent, tasks_independent};
pub use buffer::{Buffer, BufferId};
pub use context::{ExecutionContext, TaskGraph};
pub use error::{Error, Result};
pub use profiler::{Metric, Profiler};
pub use state::{DeviceResidency, LocalState};
pub use table::{ConstantTable, ObjectStateTable};
pub use task::{Access, ConstValue, Task, TaskArg};
