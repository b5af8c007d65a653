//! Configuration module

use crate::error::{BenchError, Result};
use crate::types::AccessOrder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the JSON config file
pub const CONFIG_ENV: &str = "COUPLING_BENCH_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/bench.json";

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Coupling library session settings
    pub coupling: CouplingConfig,

    /// Fixture settings
    pub fixture: FixtureConfig,

    /// Timing settings
    pub measurement: MeasurementConfig,

    /// Which variants run
    pub selection: SelectionConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Which coupling implementation the harness talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    InMemory,
    Native,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CouplingConfig {
    pub backend: Backend,
    pub participant: String,
    /// Handed to the coupling library untouched
    pub config_file: Option<PathBuf>,
    pub rank: u32,
    pub size: u32,
    pub mesh: String,
    pub scalar_data: String,
    pub vector_data: String,
    /// Expose the combined name+write call (in-memory backend only)
    pub write_by_name: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    pub entity_count: usize,
    pub seed: u64,
    pub sentinel: f64,
    pub access_order: AccessOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementConfig {
    /// A measured batch runs at least this long
    pub min_time_ms: u64,
    pub max_iterations: u64,
    pub warmup_iterations: u64,
    pub repetitions: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Regex matched against variant names
    pub filter: Option<String>,
    /// When non-empty, only these variants run
    pub enabled: Vec<String>,
    pub disabled: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json_output: bool,
}

impl Default for CouplingConfig {
    fn default() -> Self {
        Self {
            backend: Backend::InMemory,
            participant: "A".to_string(),
            config_file: None,
            rank: 0,
            size: 1,
            mesh: "MeshA".to_string(),
            scalar_data: "Scalar".to_string(),
            vector_data: "Vector".to_string(),
            write_by_name: false,
        }
    }
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            entity_count: 1_000_000,
            seed: 0x5eed,
            sentinel: 3.14159,
            access_order: AccessOrder::Sequential,
        }
    }
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            min_time_ms: 500,
            max_iterations: 1_000_000_000,
            warmup_iterations: 1,
            repetitions: 1,
        }
    }
}

impl MeasurementConfig {
    pub fn min_time(&self) -> Duration {
        Duration::from_millis(self.min_time_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_output: false,
        }
    }
}

impl BenchConfig {
    /// Load config from the file named in the environment, or the default path
    pub fn from_env() -> Result<Self> {
        let config_path =
            std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        if Path::new(&config_path).exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BenchConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings that would make timings meaningless
    pub fn validate(&self) -> Result<()> {
        if self.fixture.entity_count == 0 {
            return Err(BenchError::InvalidConfig(
                "fixture.entity_count must be > 0".into(),
            ));
        }
        if self.fixture.entity_count > i32::MAX as usize {
            return Err(BenchError::InvalidConfig(format!(
                "fixture.entity_count {} exceeds the vertex id range",
                self.fixture.entity_count
            )));
        }
        if self.measurement.min_time_ms == 0 {
            return Err(BenchError::InvalidConfig(
                "measurement.min_time_ms must be > 0".into(),
            ));
        }
        if self.measurement.max_iterations == 0 || self.measurement.repetitions == 0 {
            return Err(BenchError::InvalidConfig(
                "measurement.max_iterations and measurement.repetitions must be > 0".into(),
            ));
        }
        if self.coupling.rank >= self.coupling.size {
            return Err(BenchError::InvalidConfig(format!(
                "coupling.rank {} out of range for size {}",
                self.coupling.rank, self.coupling.size
            )));
        }
        Ok(())
    }
}
