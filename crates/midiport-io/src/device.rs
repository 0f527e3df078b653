//! Device discovery and backend lookup by name.
//!
//! Providers are registered once at setup time; lookups take a read shard lock
//! on the map and never contend with each other.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::backend::LoopbackProvider;
use crate::config::{Direction, PortConfig};
use crate::error::{PortError, Result};
use crate::port::Port;

/// A device a provider can open.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    /// Name of the provider that lists this device.
    pub backend: String,
    pub is_input: bool,
    pub is_output: bool,
}

impl Device {
    pub fn new(
        name: impl Into<String>,
        backend: impl Into<String>,
        is_input: bool,
        is_output: bool,
    ) -> Self {
        Self {
            name: name.into(),
            backend: backend.into(),
            is_input,
            is_output,
        }
    }

    /// Widest direction the device supports.
    pub fn direction(&self) -> Option<Direction> {
        Direction::from_capabilities(self.is_input, self.is_output)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.backend)
    }
}

/// A family of backends: enumerates its devices and opens ports on them.
pub trait BackendProvider: Send + Sync {
    fn name(&self) -> &str;

    fn devices(&self) -> Vec<Device>;

    /// Builds and opens a port on `device`.
    fn open(&self, device: &str, config: PortConfig) -> Result<Port>;
}

#[derive(Clone, Default)]
pub struct BackendRegistry {
    providers: Arc<DashMap<String, Arc<dyn BackendProvider>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the loopback provider and, with the `midi-io` feature, the
    /// system provider.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(LoopbackProvider);
        #[cfg(feature = "midi-io")]
        registry.register(crate::backend::MidirProvider);
        registry
    }

    /// Adds `provider`, replacing one registered under the same name.
    pub fn register(&self, provider: impl BackendProvider + 'static) {
        let name = provider.name().to_string();
        tracing::debug!("Registered MIDI backend '{}'", name);
        self.providers.insert(name, Arc::new(provider));
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.providers.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn BackendProvider>> {
        self.providers
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| PortError::UnknownBackend(name.to_string()))
    }

    /// Registered provider names, sorted.
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Devices of every provider, grouped by provider name.
    pub fn devices(&self) -> Vec<Device> {
        let mut providers: Vec<Arc<dyn BackendProvider>> =
            self.providers.iter().map(|e| Arc::clone(e.value())).collect();
        providers.sort_by(|a, b| a.name().cmp(b.name()));
        providers.iter().flat_map(|p| p.devices()).collect()
    }

    pub fn open(&self, device: &Device, config: PortConfig) -> Result<Port> {
        self.get(&device.backend)?.open(&device.name, config)
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("providers", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_backend() {
        let registry = BackendRegistry::new();
        let err = registry.get("coremidi").err().unwrap();
        insta::assert_snapshot!(err.to_string(), @"unknown backend 'coremidi'");
    }

    #[test]
    fn test_defaults_include_loopback() {
        let registry = BackendRegistry::with_defaults();
        assert!(registry.available().contains(&"loopback".to_string()));
        let loopback = registry
            .devices()
            .into_iter()
            .find(|d| d.backend == "loopback")
            .unwrap();
        assert_eq!(loopback.direction(), Some(Direction::Both));
        insta::assert_snapshot!(loopback.to_string(), @"loopback (loopback)");
    }

    #[test]
    fn test_open_through_registry() {
        let registry = BackendRegistry::with_defaults();
        let device = Device::new("loopback", "loopback", true, true);
        let port = registry.open(&device, PortConfig::default()).unwrap();
        assert!(port.is_open());
        assert_eq!(port.name(), "loopback");
    }

    #[test]
    fn test_unregister() {
        let registry = BackendRegistry::with_defaults();
        assert!(registry.unregister("loopback"));
        assert!(!registry.unregister("loopback"));
        assert!(registry.get("loopback").is_err());
    }
}
