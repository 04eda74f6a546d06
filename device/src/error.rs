use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Device string does not name a known backend.
    #[snafu(display("invalid device: {device}"))]
    InvalidDevice { device: String },

    /// Backend is known but no factory is registered for it.
    #[snafu(display("no backend registered for device type {device}"))]
    UnsupportedDevice { device: String },

    #[snafu(display("size mismatch: expected at most {expected}, got {actual}"))]
    SizeMismatch { expected: usize, actual: usize },

    /// Device-side allocation handle is not live.
    #[snafu(display("unknown allocation: {id}"))]
    UnknownAllocation { id: u64 },

    /// Event handle is not live on the issuing queue.
    #[snafu(display("unknown event: 0x{handle:x}"))]
    UnknownEvent { handle: u64 },

    /// The bounded event-slot pool has no free slot.
    #[snafu(display("event pool exhausted: all {capacity} slots in use"))]
    EventPoolExhausted { capacity: usize },

    /// The driver reported a fault while waiting on or querying an event.
    /// Fatal for that operation; never retried.
    #[snafu(display("driver fault on event: {event}"))]
    DriverFault { event: String },
}
