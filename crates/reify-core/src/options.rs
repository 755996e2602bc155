//! Runtime configuration

use crate::error::{RuntimeError, RuntimeResult};

/// Environment variable overriding [`RuntimeOptions::type_cache_capacity`]
pub const ENV_TYPE_CACHE_CAPACITY: &str = "REIFY_TYPE_CACHE_CAPACITY";
/// Environment variable overriding [`RuntimeOptions::proxy_sweep_interval`]
pub const ENV_PROXY_SWEEP_INTERVAL: &str = "REIFY_PROXY_SWEEP_INTERVAL";
/// Environment variable overriding [`RuntimeOptions::array_covariance`]
pub const ENV_ARRAY_COVARIANCE: &str = "REIFY_ARRAY_COVARIANCE";

/// Options for a [`TypeSystem`](crate::TypeSystem)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// Initial capacity of the type identity map
    pub type_cache_capacity: usize,

    /// Proxy publications between sweeps of dead weak slots (0 disables automatic sweeps)
    pub proxy_sweep_interval: usize,

    /// Treat undeclared variance as covariant in array-implied interface checks
    pub array_covariance: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            type_cache_capacity: 256,
            proxy_sweep_interval: 128,
            array_covariance: true,
        }
    }
}

impl RuntimeOptions {
    /// Set the initial type cache capacity
    pub fn with_type_cache_capacity(mut self, capacity: usize) -> Self {
        self.type_cache_capacity = capacity;
        self
    }

    /// Set the proxy sweep interval
    pub fn with_proxy_sweep_interval(mut self, interval: usize) -> Self {
        self.proxy_sweep_interval = interval;
        self
    }

    /// Enable or disable array-implied covariance
    pub fn with_array_covariance(mut self, enabled: bool) -> Self {
        self.array_covariance = enabled;
        self
    }

    /// Defaults overridden by `REIFY_*` environment variables
    pub fn from_env() -> RuntimeResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> RuntimeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        if let Some(raw) = lookup(ENV_TYPE_CACHE_CAPACITY) {
            options.type_cache_capacity = parse_usize(ENV_TYPE_CACHE_CAPACITY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_PROXY_SWEEP_INTERVAL) {
            options.proxy_sweep_interval = parse_usize(ENV_PROXY_SWEEP_INTERVAL, &raw)?;
        }
        if let Some(raw) = lookup(ENV_ARRAY_COVARIANCE) {
            options.array_covariance = parse_bool(ENV_ARRAY_COVARIANCE, &raw)?;
        }
        Ok(options)
    }
}

fn parse_usize(name: &str, raw: &str) -> RuntimeResult<usize> {
    raw.trim().parse().map_err(|_| {
        RuntimeError::InvalidArgument(format!("{} must be a non-negative integer, got '{}'", name, raw))
    })
}

fn parse_bool(name: &str, raw: &str) -> RuntimeResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(RuntimeError::InvalidArgument(format!(
            "{} must be a boolean, got '{}'",
            name, raw
        ))),
    }
}
