use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use zarya_device::{DeviceHandle, KernelHandle};

use crate::buffer::{Buffer, BufferId};

/// Declared access mode of one task argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Access {
    pub fn is_write(self) -> bool {
        matches!(self, Access::WriteOnly | Access::ReadWrite)
    }

    pub fn is_read(self) -> bool {
        matches!(self, Access::ReadOnly | Access::ReadWrite)
    }
}

/// Immutable scalar argument, deduplicated by value.
///
/// Floats compare by bit pattern so deduplication is a real equivalence
/// (NaN payloads included) and the table never aliases distinct values.
#[derive(Debug, Clone, Copy)]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl PartialEq for ConstValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConstValue::Bool(a), ConstValue::Bool(b)) => a == b,
            (ConstValue::Int(a), ConstValue::Int(b)) => a == b,
            (ConstValue::UInt(a), ConstValue::UInt(b)) => a == b,
            (ConstValue::Float(a), ConstValue::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for ConstValue {}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(v) => write!(f, "{v}"),
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::UInt(v) => write!(f, "{v}"),
            ConstValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// One argument reference: a deduplicated constant or a tracked buffer.
#[derive(Debug, Clone)]
pub enum TaskArg {
    Constant(ConstValue),
    Buffer(Rc<Buffer>),
}

impl TaskArg {
    pub fn buffer(buffer: &Rc<Buffer>) -> Self {
        TaskArg::Buffer(Rc::clone(buffer))
    }

    pub fn constant(value: ConstValue) -> Self {
        TaskArg::Constant(value)
    }

    pub fn buffer_id(&self) -> Option<BufferId> {
        match self {
            TaskArg::Buffer(buffer) => Some(buffer.id()),
            TaskArg::Constant(_) => None,
        }
    }
}

/// One data-parallel unit of work.
///
/// A task declares its arguments and their access modes up front; the
/// analyzer and the executor only ever look at those declarations, never at
/// argument values. The compiled kernel is opaque here. Which device slot
/// runs the task lives in the execution context's task-to-device map, fixed
/// once by device assignment.
#[derive(Debug, Clone)]
pub struct Task {
    id: String,
    kernel: KernelHandle,
    args: SmallVec<[TaskArg; 8]>,
    access: SmallVec<[Access; 8]>,
    device: Option<DeviceHandle>,
    preferred_slot: usize,
}

impl Task {
    pub fn new(id: impl Into<String>, kernel: KernelHandle) -> Self {
        Self {
            id: id.into(),
            kernel,
            args: SmallVec::new(),
            access: SmallVec::new(),
            device: None,
            preferred_slot: 0,
        }
    }

    /// Append one argument with its access mode.
    pub fn arg(mut self, arg: TaskArg, access: Access) -> Self {
        self.args.push(arg);
        self.access.push(access);
        self
    }

    /// Request execution on a specific device.
    pub fn on_device(mut self, device: DeviceHandle) -> Self {
        self.device = Some(device);
        self
    }

    /// Device-table slot to use when this task's device is first registered.
    pub fn prefer_slot(mut self, slot: usize) -> Self {
        self.preferred_slot = slot;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kernel(&self) -> &KernelHandle {
        &self.kernel
    }

    pub fn args(&self) -> &[TaskArg] {
        &self.args
    }

    pub fn access(&self) -> &[Access] {
        &self.access
    }

    /// Explicitly requested device, if any.
    pub fn device(&self) -> Option<&DeviceHandle> {
        self.device.as_ref()
    }

    pub fn preferred_slot(&self) -> usize {
        self.preferred_slot
    }

    /// Buffer arguments paired with their access modes.
    pub fn buffer_params(&self) -> impl Iterator<Item = (&Rc<Buffer>, Access)> {
        self.args.iter().zip(self.access.iter().copied()).filter_map(|(arg, access)| match arg {
            TaskArg::Buffer(buffer) => Some((buffer, access)),
            TaskArg::Constant(_) => None,
        })
    }
}
