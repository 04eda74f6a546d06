//! Error types for the scheduling core.

use snafu::Snafu;

use crate::buffer::BufferId;

/// Result type for runtime operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Device-layer failure: allocation, transfer or driver fault.
    #[snafu(display("device error: {source}"))]
    Device { source: zarya_device::Error },

    /// A dependent task graph is pinned to one device; an explicit request
    /// for a different backend cannot be honored.
    #[snafu(display("task {task} requested {requested} but the dependent graph is pinned to {assigned}"))]
    PlacementConflict {
        task: String,
        requested: zarya_device::DeviceSpec,
        assigned: zarya_device::DeviceSpec,
    },

    /// Task index has no populated device slot.
    #[snafu(display("task {index} has no assigned device"))]
    UnassignedTask { index: usize },

    /// Task index is out of range for the context.
    #[snafu(display("no task at index {index}"))]
    UnknownTask { index: usize },

    /// Constant replacement referenced a value that was never inserted.
    #[snafu(display("constant not registered"))]
    UnknownConstant,

    /// Buffer operation referenced a buffer that was never registered.
    #[snafu(display("buffer {id} not registered"))]
    UnknownBuffer { id: BufferId },

    /// Replacement must keep the argument kind: constant for constant,
    /// buffer for buffer.
    #[snafu(display("cannot replace a constant with a buffer or vice versa"))]
    ReplacementKindMismatch,

    /// A buffer is recorded as resident on a device the context no longer
    /// holds.
    #[snafu(display("no registered device for {device}"))]
    MissingDevice { device: zarya_device::DeviceSpec },
}
