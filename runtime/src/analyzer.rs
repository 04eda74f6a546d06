//! Static independence analysis over a task list.
//!
//! The check is conservative: it inspects only buffer identity and declared
//! access modes, never argument values or written ranges, so two tasks that
//! write disjoint regions of one buffer still count as dependent.

use crate::buffer::BufferId;
use crate::task::Task;

/// True iff no pair of distinct tasks shares a buffer that either of them
/// writes.
///
/// O(n^2) over the task list; task counts are small. Device assignment runs
/// this once, and callers may re-run it after structural changes.
pub fn tasks_independent(tasks: &[Task]) -> bool {
    for (i, task) in tasks.iter().enumerate() {
        for other in &tasks[i + 1..] {
            if task.id() == other.id() {
                continue;
            }
            if pair_dependent(task, other) {
                return false;
            }
        }
    }
    true
}

/// A pair is dependent when the tasks share at least one buffer argument and
/// either side accesses a shared buffer with a write mode.
pub fn pair_dependent(a: &Task, b: &Task) -> bool {
    writes_shared_buffer(a, b) || writes_shared_buffer(b, a)
}

fn writes_shared_buffer(writer: &Task, other: &Task) -> bool {
    writer
        .buffer_params()
        .any(|(buffer, access)| access.is_write() && references(other, buffer.id()))
}

fn references(task: &Task, id: BufferId) -> bool {
    task.buffer_params().any(|(buffer, _)| buffer.id() == id)
}
