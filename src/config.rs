//! Engine configuration.
//!
//! The engine keeps no process-wide mutable state; everything that would be
//! a global (allocation ceiling, container defaults) lives in an explicit
//! [`EngineConfig`] passed to the objects that need it.

use serde::de::Error;
use serde::{Deserialize, Serialize};

/// Ceiling on any single engine allocation, in bytes.
///
/// Matches the largest single allocation the reference host platform
/// permits (1 GiB − 1).
pub const DEFAULT_ALLOC_CEILING: usize = 0x3FFF_FFFF;

/// Capacity a box array falls back to when none is requested.
pub const DEFAULT_INITIAL_CAPACITY: usize = 64;

/// Execution context for engine instances.
///
/// Easily serializable and loadable from JSON while keeping complexity
/// minimal.
///
/// # Example
///
/// ```rust
/// use tessel::EngineConfig;
///
/// let config = EngineConfig::default();
///
/// let json = r#"{
///     "alloc_ceiling_bytes": 1048576,
///     "initial_array_capacity": 16
/// }"#;
/// let config: EngineConfig = EngineConfig::from_json(json).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Largest single allocation the engine may make, in bytes.
    #[serde(default = "EngineConfig::default_alloc_ceiling")]
    pub alloc_ceiling_bytes: usize,

    /// Initial capacity used for box arrays created without one.
    #[serde(default = "EngineConfig::default_initial_capacity")]
    pub initial_array_capacity: usize,
}

impl EngineConfig {
    const fn default_alloc_ceiling() -> usize {
        DEFAULT_ALLOC_CEILING
    }

    const fn default_initial_capacity() -> usize {
        DEFAULT_INITIAL_CAPACITY
    }

    pub fn with_alloc_ceiling(mut self, bytes: usize) -> Self {
        self.alloc_ceiling_bytes = bytes;
        self
    }

    pub fn with_initial_array_capacity(mut self, capacity: usize) -> Self {
        self.initial_array_capacity = capacity;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.alloc_ceiling_bytes == 0 {
            return Err("Allocation ceiling must be greater than zero".to_string());
        }
        if self.initial_array_capacity == 0 {
            return Err("Initial array capacity must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: EngineConfig = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            alloc_ceiling_bytes: Self::default_alloc_ceiling(),
            initial_array_capacity: Self::default_initial_capacity(),
        }
    }
}
