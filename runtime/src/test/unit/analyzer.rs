use std::rc::Rc;

use test_case::test_case;
use zarya_device::{ElementType, KernelHandle};

use crate::analyzer::{pair_dependent, tasks_independent};
use crate::buffer::Buffer;
use crate::task::{Access, ConstValue, Task, TaskArg};

fn kernel(name: &str) -> KernelHandle {
    KernelHandle::new(name, vec![0u8; 8], true)
}

fn task(id: &str, params: &[(&Rc<Buffer>, Access)]) -> Task {
    let mut task = Task::new(id, kernel(id));
    for (buffer, access) in params {
        task = task.arg(TaskArg::buffer(buffer), *access);
    }
    task
}

#[test]
fn disjoint_buffers_are_independent() {
    let b = Buffer::new(ElementType::F32, 4);
    let c = Buffer::new(ElementType::F32, 4);

    let t0 = task("t0", &[(&b, Access::WriteOnly)]);
    let t1 = task("t1", &[(&c, Access::WriteOnly)]);

    assert!(tasks_independent(&[t0, t1]));
}

#[test_case(Access::WriteOnly; "write_only")]
#[test_case(Access::ReadWrite; "read_write")]
fn shared_buffer_with_writer_is_dependent(mode: Access) {
    let b = Buffer::new(ElementType::F32, 4);

    let writer = task("t0", &[(&b, mode)]);
    let reader = task("t1", &[(&b, Access::ReadOnly)]);

    assert!(pair_dependent(&writer, &reader));
    assert!(pair_dependent(&reader, &writer), "dependence is symmetric over the pair");
    assert!(!tasks_independent(&[writer, reader]));
}

#[test]
fn shared_read_only_buffer_is_independent() {
    let b = Buffer::new(ElementType::I32, 16);

    let t0 = task("t0", &[(&b, Access::ReadOnly)]);
    let t1 = task("t1", &[(&b, Access::ReadOnly)]);

    assert!(tasks_independent(&[t0, t1]));
}

#[test]
fn same_identifier_never_forms_a_pair() {
    // Two entries with one identifier are the same logical task; a self-pair
    // cannot make the graph dependent.
    let b = Buffer::new(ElementType::F32, 4);

    let first = task("t0", &[(&b, Access::WriteOnly)]);
    let second = task("t0", &[(&b, Access::ReadWrite)]);

    assert!(tasks_independent(&[first, second]));
}

#[test]
fn constants_never_induce_dependence() {
    let answer = TaskArg::constant(ConstValue::Int(42));

    let t0 = Task::new("t0", kernel("t0")).arg(answer.clone(), Access::WriteOnly);
    let t1 = Task::new("t1", kernel("t1")).arg(answer, Access::ReadWrite);

    assert!(tasks_independent(&[t0, t1]));
}

#[test]
fn empty_and_singleton_graphs_are_independent() {
    let b = Buffer::new(ElementType::F32, 4);

    assert!(tasks_independent(&[]));
    assert!(tasks_independent(&[task("t0", &[(&b, Access::ReadWrite)])]));
}

#[test]
fn dependence_found_across_longer_argument_lists() {
    let a = Buffer::new(ElementType::F32, 4);
    let b = Buffer::new(ElementType::F32, 4);
    let c = Buffer::new(ElementType::F32, 4);

    let t0 = task("t0", &[(&a, Access::ReadOnly), (&b, Access::ReadOnly), (&c, Access::WriteOnly)]);
    let t1 = task("t1", &[(&c, Access::ReadOnly), (&a, Access::ReadOnly)]);

    assert!(!tasks_independent(&[t0, t1]));
}
