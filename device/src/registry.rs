//! Device registry: cached handles plus per-backend factories.
//!
//! The registry maps a [`DeviceSpec`] to a live [`DeviceHandle`], creating
//! devices on demand through a factory registered for the backend kind. The
//! host factory is built in; accelerator backends register theirs at startup.
//! Lookups for unknown backends fail fast, before any task registration can
//! reference the device.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::accel::DeviceHandle;
use crate::error::{Result, UnsupportedDeviceSnafu};
use crate::host::HostDevice;
use crate::spec::DeviceSpec;

/// Factory that builds a [`DeviceHandle`] for one backend kind.
pub type DeviceFactory = Arc<dyn Fn(&DeviceSpec) -> Result<DeviceHandle> + Send + Sync>;

pub struct DeviceRegistry {
    devices: RwLock<HashMap<DeviceSpec, DeviceHandle>>,
    factories: RwLock<HashMap<String, DeviceFactory>>,
}

impl DeviceRegistry {
    /// Create a registry with the built-in host factory registered.
    pub fn new() -> Self {
        let registry = Self { devices: RwLock::new(HashMap::new()), factories: RwLock::new(HashMap::new()) };
        registry.register_factory(
            "HOST",
            Arc::new(|spec| Ok(DeviceHandle::new(Arc::new(HostDevice::new(spec.clone()))))),
        );
        registry
    }

    /// Register a factory for a backend kind ("HOST", "CUDA", ...).
    ///
    /// The kind string is case-insensitive. Registering over an existing kind
    /// replaces its factory; cached devices are unaffected.
    pub fn register_factory(&self, device_type: &str, factory: DeviceFactory) {
        self.factories.write().insert(device_type.to_uppercase(), factory);
    }

    /// Get or create the device for a specification.
    pub fn get(&self, spec: &DeviceSpec) -> Result<DeviceHandle> {
        // Fast path: read lock
        if let Some(device) = self.devices.read().get(spec) {
            return Ok(device.clone());
        }

        // Slow path: write lock to create
        let mut devices = self.devices.write();

        // Double-check after acquiring the write lock
        if let Some(device) = devices.get(spec) {
            return Ok(device.clone());
        }

        let device_type = spec.base_type();
        let factory = self
            .factories
            .read()
            .get(device_type)
            .cloned()
            .ok_or_else(|| UnsupportedDeviceSnafu { device: device_type }.build())?;

        let device = factory(spec)?;
        tracing::debug!(device = %spec, "device created");
        devices.insert(spec.clone(), device.clone());
        Ok(device)
    }

    /// Get a device by parsing a device string.
    pub fn get_device(&self, device: &str) -> Result<DeviceHandle> {
        let spec = DeviceSpec::parse(device)?;
        self.get(&spec)
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global device registry instance.
static REGISTRY: Lazy<DeviceRegistry> = Lazy::new(DeviceRegistry::new);

/// Get the global device registry.
pub fn registry() -> &'static DeviceRegistry {
    &REGISTRY
}

/// Convenience function to get a device by string.
pub fn get_device(device: &str) -> Result<DeviceHandle> {
    registry().get_device(device)
}

/// Convenience function to get the default host device.
pub fn host() -> Result<DeviceHandle> {
    registry().get(&DeviceSpec::host())
}
