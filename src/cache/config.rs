//! Cache configuration.

use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_TTL_SECONDS: u64 = 300;
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Reads bypass the cache entirely when disabled.
    pub enabled: bool,
    pub sweep_interval: Duration,
    pub default_ttl_seconds: u64,
    /// Per-namespace TTL overrides.
    pub ttl_seconds: BTreeMap<String, u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            default_ttl_seconds: DEFAULT_TTL_SECONDS,
            ttl_seconds: BTreeMap::from([("carousel".to_string(), 600)]),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            sweep_interval: Duration::from_secs(u64::from(settings.sweep_interval_seconds.get())),
            default_ttl_seconds: u64::from(settings.default_ttl_seconds.get()),
            ttl_seconds: settings
                .ttl_seconds
                .iter()
                .map(|(namespace, ttl)| (namespace.clone(), u64::from(ttl.get())))
                .collect(),
        }
    }
}

impl CacheConfig {
    pub fn ttl_for(&self, namespace: &str) -> u64 {
        self.ttl_seconds
            .get(namespace)
            .copied()
            .unwrap_or(self.default_ttl_seconds)
    }
}
