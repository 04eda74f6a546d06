use std::rc::Rc;
use std::sync::Arc;

use zarya_device::{DeviceHandle, DeviceSpec, ElementType, HostDevice, KernelHandle};

use crate::buffer::Buffer;
use crate::context::TaskGraph;
use crate::error::Error;
use crate::task::{Access, ConstValue, Task, TaskArg};

fn kernel(name: &str) -> KernelHandle {
    KernelHandle::new(name, vec![0u8; 8], false)
}

fn host(device_id: usize) -> DeviceHandle {
    DeviceHandle::new(Arc::new(HostDevice::new(DeviceSpec::Host { device_id })))
}

/// An out-of-tree backend for placement tests; spec says CUDA, the
/// implementation is the in-process device.
fn foreign_accelerator() -> DeviceHandle {
    DeviceHandle::new(Arc::new(HostDevice::new(DeviceSpec::Cuda { device_id: 0 })))
}

fn buffer() -> Rc<Buffer> {
    Buffer::new(ElementType::F32, 4)
}

#[test]
fn dependent_graph_is_pinned_to_first_tasks_device() {
    let b = buffer();
    let t0 = Task::new("t0", kernel("t0")).arg(TaskArg::buffer(&b), Access::WriteOnly).on_device(host(0));
    let t1 = Task::new("t1", kernel("t1"))
        .arg(TaskArg::buffer(&b), Access::ReadOnly)
        .on_device(host(1))
        .prefer_slot(1);

    let mut graph = TaskGraph::new("pinned");
    graph.add_task(t0);
    graph.add_task(t1);

    let ctx = graph.assign_to_devices().unwrap();
    assert!(!ctx.is_independent());
    assert_eq!(ctx.device_count(), 1);
    assert_eq!(ctx.device_index_for_task(0), Some(0));
    assert_eq!(ctx.device_index_for_task(1), Some(0));
    assert_eq!(ctx.device(0).unwrap().spec(), &DeviceSpec::Host { device_id: 0 });
}

#[test]
fn independent_graph_honors_per_task_placement() {
    let b = buffer();
    let c = buffer();
    let t0 = Task::new("t0", kernel("t0")).arg(TaskArg::buffer(&b), Access::WriteOnly).on_device(host(0));
    let t1 = Task::new("t1", kernel("t1"))
        .arg(TaskArg::buffer(&c), Access::WriteOnly)
        .on_device(host(1))
        .prefer_slot(1);

    let mut graph = TaskGraph::new("spread");
    graph.add_task(t0);
    graph.add_task(t1);

    let ctx = graph.assign_to_devices().unwrap();
    assert!(ctx.is_independent());
    assert_eq!(ctx.device_index_for_task(0), Some(0));
    assert_eq!(ctx.device_index_for_task(1), Some(1));
    assert_eq!(ctx.device(1).unwrap().spec(), &DeviceSpec::Host { device_id: 1 });
}

#[test]
fn tasks_without_placement_use_the_default_host_device() {
    let b = buffer();
    let t0 = Task::new("t0", kernel("t0")).arg(TaskArg::buffer(&b), Access::ReadWrite);

    let mut graph = TaskGraph::new("default");
    graph.add_task(t0);

    let ctx = graph.assign_to_devices().unwrap();
    assert_eq!(ctx.device_for_task(0).unwrap().spec(), &DeviceSpec::Host { device_id: 0 });
}

#[test]
fn occupied_preferred_slot_falls_through_to_the_next_free_one() {
    let b = buffer();
    let c = buffer();
    let t0 = Task::new("t0", kernel("t0")).arg(TaskArg::buffer(&b), Access::WriteOnly).on_device(host(0));
    let t1 = Task::new("t1", kernel("t1")).arg(TaskArg::buffer(&c), Access::WriteOnly).on_device(host(1));

    let mut graph = TaskGraph::new("collide");
    graph.add_task(t0);
    graph.add_task(t1);

    let ctx = graph.assign_to_devices().unwrap();
    // Both tasks preferred slot 0; the second device must not evict the
    // first.
    assert_eq!(ctx.device_index_for_task(0), Some(0));
    assert_eq!(ctx.device_index_for_task(1), Some(1));
    assert_eq!(ctx.device(0).unwrap().spec(), &DeviceSpec::Host { device_id: 0 });
}

#[test]
fn cross_backend_request_in_a_dependent_graph_is_a_conflict() {
    let b = buffer();
    let t0 = Task::new("t0", kernel("t0")).arg(TaskArg::buffer(&b), Access::WriteOnly).on_device(host(0));
    let t1 = Task::new("t1", kernel("t1"))
        .arg(TaskArg::buffer(&b), Access::ReadOnly)
        .on_device(foreign_accelerator());

    let mut graph = TaskGraph::new("conflict");
    graph.add_task(t0);
    graph.add_task(t1);

    let err = graph.assign_to_devices().unwrap_err();
    assert!(matches!(err, Error::PlacementConflict { .. }), "got {err:?}");
}

#[test]
fn same_backend_request_is_coalesced_silently() {
    let b = buffer();
    let t0 = Task::new("t0", kernel("t0")).arg(TaskArg::buffer(&b), Access::WriteOnly).on_device(host(0));
    let t1 = Task::new("t1", kernel("t1")).arg(TaskArg::buffer(&b), Access::ReadOnly).on_device(host(3));

    let mut graph = TaskGraph::new("coalesce");
    graph.add_task(t0);
    graph.add_task(t1);

    let ctx = graph.assign_to_devices().unwrap();
    assert_eq!(ctx.device_count(), 1);
    assert_eq!(ctx.device_index_for_task(1), Some(0));
}

#[test]
fn add_task_deduplicates_by_identifier() {
    let b = buffer();
    let mut graph = TaskGraph::new("dedup");

    let first = graph.add_task(Task::new("t0", kernel("t0")).arg(TaskArg::buffer(&b), Access::ReadOnly));
    let again = graph.add_task(Task::new("t0", kernel("t0")));
    assert_eq!(first, again);
    assert_eq!(graph.task_count(), 1);
}

#[test]
fn insert_variable_deduplicates_equal_scalars() {
    let mut graph = TaskGraph::new("constants");

    let first = graph.insert_variable(&TaskArg::constant(ConstValue::Int(42)));
    let again = graph.insert_variable(&TaskArg::constant(ConstValue::Int(42)));
    let other = graph.insert_variable(&TaskArg::constant(ConstValue::Int(7)));

    assert_eq!(first, again);
    assert_ne!(first, other);

    let pi = graph.insert_variable(&TaskArg::constant(ConstValue::Float(3.25)));
    let pi_again = graph.insert_variable(&TaskArg::constant(ConstValue::Float(3.25)));
    assert_eq!(pi, pi_again);
}

#[test]
fn replace_object_state_keeps_index_and_streaming_flags() {
    let b = buffer();
    let t0 = Task::new("t0", kernel("t0")).arg(TaskArg::buffer(&b), Access::ReadWrite);

    let mut graph = TaskGraph::new("replace");
    graph.add_task(t0);
    let mut ctx = graph.assign_to_devices().unwrap();

    {
        let state = ctx.get_object_state(&b);
        state.set_stream_in(true);
        state.set_force_stream_in(true);
        state.set_stream_out(true);
    }
    let old_index = ctx.objects().lookup(b.id()).unwrap();

    let replacement = buffer();
    let state = ctx.replace_object_state(&b, &replacement).unwrap();
    assert!(state.is_stream_in());
    assert!(state.is_force_stream_in());
    assert!(state.is_stream_out());

    assert_eq!(ctx.objects().lookup(replacement.id()), Some(old_index));
    assert_eq!(ctx.objects().lookup(b.id()), None);
}

#[test]
fn replace_variable_swaps_constants_in_place() {
    let b = buffer();
    let mut graph = TaskGraph::new("swap");
    let index = graph.insert_variable(&TaskArg::constant(ConstValue::Int(7)));
    graph.add_task(Task::new("t0", kernel("t0")).arg(TaskArg::buffer(&b), Access::ReadWrite));
    let mut ctx = graph.assign_to_devices().unwrap();

    let replaced = ctx
        .replace_variable(&TaskArg::constant(ConstValue::Int(7)), &TaskArg::constant(ConstValue::Int(9)))
        .unwrap();
    assert_eq!(replaced, index);
    assert_eq!(ctx.constants().get(index), Some(ConstValue::Int(9)));
}

#[test]
fn replace_of_unknown_values_fails() {
    let b = buffer();
    let mut graph = TaskGraph::new("unknown");
    graph.add_task(Task::new("t0", kernel("t0")).arg(TaskArg::buffer(&b), Access::ReadWrite));
    let mut ctx = graph.assign_to_devices().unwrap();

    let stranger = buffer();
    let err = ctx.replace_object_state(&stranger, &buffer()).unwrap_err();
    assert!(matches!(err, Error::UnknownBuffer { .. }), "got {err:?}");

    let err = ctx
        .replace_variable(&TaskArg::constant(ConstValue::Int(1)), &TaskArg::constant(ConstValue::Int(2)))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownConstant), "got {err:?}");

    let err = ctx
        .replace_variable(&TaskArg::constant(ConstValue::Int(1)), &TaskArg::buffer(&b))
        .unwrap_err();
    assert!(matches!(err, Error::ReplacementKindMismatch), "got {err:?}");
}

#[test]
fn snapshot_is_isolated_from_source_mutation() {
    let b = buffer();
    let mut graph = TaskGraph::new("snapshot");
    graph.add_task(Task::new("t0", kernel("t0")).arg(TaskArg::buffer(&b), Access::ReadWrite));
    let mut ctx = graph.assign_to_devices().unwrap();

    let snapshot = ctx.snapshot();

    ctx.set_task(0, Task::new("patched", kernel("patched")));
    assert_eq!(ctx.task_at(0).unwrap().id(), "patched");
    assert_eq!(snapshot.task_at(0).unwrap().id(), "t0");

    // Table mutations do not leak either way.
    let replacement = buffer();
    ctx.replace_object_state(&b, &replacement).unwrap();
    assert!(snapshot.objects().lookup(b.id()).is_some());
    assert!(snapshot.objects().lookup(replacement.id()).is_none());
}

#[test]
fn device_lookup_for_unassigned_index_fails() {
    let graph = TaskGraph::new("empty");
    let ctx = graph.assign_to_devices().unwrap();

    let err = ctx.device_for_task(5).unwrap_err();
    assert!(matches!(err, Error::UnassignedTask { index: 5 }), "got {err:?}");
}

#[test]
fn dump_meta_renders_all_four_tables() {
    let b = buffer();
    let mut graph = TaskGraph::new("dump");
    graph.insert_variable(&TaskArg::constant(ConstValue::Int(42)));
    graph.add_task(Task::new("t0", kernel("t0")).arg(TaskArg::buffer(&b), Access::ReadWrite).on_device(host(0)));
    let ctx = graph.assign_to_devices().unwrap();

    let dump = ctx.dump_meta();
    assert!(dump.contains("device table:"));
    assert!(dump.contains("constant table:"));
    assert!(dump.contains("object table:"));
    assert!(dump.contains("task table:"));
    assert!(dump.contains("42"));
    assert!(dump.contains("t0 -> device [0]"));
}

#[test]
fn task_lookup_by_identifier() {
    let b = buffer();
    let mut graph = TaskGraph::new("lookup");
    graph.add_task(Task::new("t0", kernel("t0")).arg(TaskArg::buffer(&b), Access::ReadWrite));
    let ctx = graph.assign_to_devices().unwrap();

    assert!(ctx.task("t0").is_some());
    assert!(ctx.task("missing").is_none());
}

#[test]
fn next_task_index_is_monotonic() {
    let mut graph = TaskGraph::new("counter");
    assert_eq!(graph.next_task_index(), 0);
    assert_eq!(graph.next_task_index(), 1);
    assert_eq!(graph.next_task_index(), 2);
}
