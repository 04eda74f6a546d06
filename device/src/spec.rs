use std::fmt;

use crate::error::{InvalidDeviceSnafu, Result};

/// Identity of an accelerator device: backend kind plus device index.
///
/// Equality and hashing are over both fields, so `host:0` and `host:1` are
/// distinct devices with independent command queues.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceSpec {
    Host { device_id: usize },
    Cuda { device_id: usize },
}

impl DeviceSpec {
    /// The default target: host device 0.
    pub fn host() -> Self {
        DeviceSpec::Host { device_id: 0 }
    }

    /// Backend kind without the device index.
    ///
    /// Used for factory lookup; all instances of one backend share a factory.
    pub fn base_type(&self) -> &'static str {
        match self {
            DeviceSpec::Host { .. } => "HOST",
            DeviceSpec::Cuda { .. } => "CUDA",
        }
    }

    pub fn device_id(&self) -> usize {
        match self {
            DeviceSpec::Host { device_id } | DeviceSpec::Cuda { device_id } => *device_id,
        }
    }

    /// Parse a device string into a [`DeviceSpec`].
    ///
    /// Examples:
    /// - "host" -> Host { device_id: 0 }
    /// - "HOST:1" -> Host { device_id: 1 }
    /// - "cuda:2" -> Cuda { device_id: 2 }
    ///
    /// An unknown backend or malformed index fails with
    /// [`Error::InvalidDevice`](crate::Error::InvalidDevice) before any
    /// device state is touched.
    pub fn parse(s: &str) -> Result<Self> {
        let upper = s.to_uppercase();
        let mut parts = upper.split(':');
        let base = parts.next().unwrap_or("");
        let device_id = match parts.next() {
            Some(id) => match id.parse::<usize>() {
                Ok(id) => id,
                Err(_) => return InvalidDeviceSnafu { device: s }.fail(),
            },
            None => 0,
        };

        match base {
            "HOST" | "CPU" => Ok(DeviceSpec::Host { device_id }),
            "CUDA" | "GPU" => Ok(DeviceSpec::Cuda { device_id }),
            _ => InvalidDeviceSnafu { device: s }.fail(),
        }
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSpec::Host { device_id } => write!(f, "host:{device_id}"),
            DeviceSpec::Cuda { device_id } => write!(f, "cuda:{device_id}"),
        }
    }
}
