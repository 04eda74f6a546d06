//! Per-buffer residency and streaming state.

use std::collections::HashMap;

use zarya_device::{Allocation, DeviceSpec};

/// Residency of one buffer on one device.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceResidency {
    /// Device holds a valid copy.
    pub present: bool,
    /// Device copy is newer than the host copy.
    pub dirty: bool,
    /// Device-side allocation backing the copy.
    pub allocation: Option<Allocation>,
}

impl DeviceResidency {
    pub fn bytes(&self) -> usize {
        self.allocation.map(|allocation| allocation.bytes).unwrap_or(0)
    }
}

/// Per-buffer, per-context record: streaming intent plus residency on every
/// device that has seen the buffer.
#[derive(Debug, Clone, Default)]
pub struct LocalState {
    stream_in: bool,
    force_stream_in: bool,
    stream_out: bool,
    residency: HashMap<DeviceSpec, DeviceResidency>,
}

impl LocalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stream_in(&self) -> bool {
        self.stream_in
    }

    pub fn set_stream_in(&mut self, stream_in: bool) {
        self.stream_in = stream_in;
    }

    pub fn is_force_stream_in(&self) -> bool {
        self.force_stream_in
    }

    pub fn set_force_stream_in(&mut self, force: bool) {
        self.force_stream_in = force;
    }

    pub fn is_stream_out(&self) -> bool {
        self.stream_out
    }

    pub fn set_stream_out(&mut self, stream_out: bool) {
        self.stream_out = stream_out;
    }

    /// Copy streaming intent from another state.
    ///
    /// Residency is not copied: the receiving buffer has never been
    /// transferred, whatever its predecessor's device copies looked like.
    pub fn copy_streaming_from(&mut self, other: &LocalState) {
        self.stream_in = other.stream_in;
        self.force_stream_in = other.force_stream_in;
        self.stream_out = other.stream_out;
    }

    pub fn residency(&self, device: &DeviceSpec) -> Option<&DeviceResidency> {
        self.residency.get(device)
    }

    pub fn residency_mut(&mut self, device: &DeviceSpec) -> &mut DeviceResidency {
        self.residency.entry(device.clone()).or_default()
    }

    /// Record a device-side write: the copy there is authoritative and
    /// dirty, every other device copy is stale.
    pub fn mark_written(&mut self, device: &DeviceSpec) {
        for (spec, residency) in &mut self.residency {
            if spec != device {
                residency.present = false;
            }
        }
        let residency = self.residency.entry(device.clone()).or_default();
        residency.present = true;
        residency.dirty = true;
    }

    pub fn clear_dirty(&mut self, device: &DeviceSpec) {
        if let Some(residency) = self.residency.get_mut(device) {
            residency.dirty = false;
        }
    }

    /// Device copies that must be written back to the host on sync: present
    /// and either dirty or covered by a stream-out request.
    pub fn pending_write_backs(&self) -> impl Iterator<Item = (&DeviceSpec, &DeviceResidency)> {
        let stream_out = self.stream_out;
        self.residency
            .iter()
            .filter(move |(_, residency)| residency.present && (residency.dirty || stream_out))
    }
}
