//! Configuration for QFEA simulation runs.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (with QFEA_ prefix)
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::evolution::InitialState;
use crate::trotter::TrotterOrder;

/// Complete simulation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Resource limits
    #[serde(default)]
    pub limits: ResourceLimits,

    /// Pauli decomposition settings
    #[serde(default)]
    pub decomposition: DecompositionConfig,

    /// Trotter synthesis defaults
    #[serde(default)]
    pub trotter: TrotterConfig,

    /// State-vector evolution settings
    #[serde(default)]
    pub evolution: EvolutionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Resource limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Hard qubit ceiling; bounds state-vector memory at 16·2^n bytes
    #[serde(default = "default_max_qubits")]
    pub max_qubits: u32,

    /// Default Pauli term budget
    #[serde(default = "default_max_pauli_terms")]
    pub max_pauli_terms: usize,

    /// Wall-clock budget for one evolution run, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Worker threads for the decomposition split (0 = rayon global pool)
    #[serde(default = "default_parallel_jobs")]
    pub parallel_jobs: usize,
}

/// Pauli decomposition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompositionConfig {
    /// Coefficients with magnitude below this are dropped
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Allowed |M_ij − conj(M_ji)| before a matrix is rejected
    #[serde(default = "default_hermiticity_tolerance")]
    pub hermiticity_tolerance: f64,
}

/// Trotter synthesis defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrotterConfig {
    /// Repetitions when the caller does not specify any
    #[serde(default = "default_trotter_steps")]
    pub default_steps: u32,

    /// Product-formula order when the caller does not specify one
    #[serde(default)]
    pub default_order: TrotterOrder,

    /// Error-bound threshold above which second order is suggested
    #[serde(default = "default_accuracy_threshold")]
    pub accuracy_threshold: f64,
}

/// State-vector evolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// State used when the caller supplies none: `uniform`, `ground` or
    /// `{ basis: <index> }`
    #[serde(default, with = "serde_yaml_ng::with::singleton_map")]
    pub initial_state: InitialState,

    /// Largest tolerated imaginary part of ⟨H⟩, relative to max(1, |⟨H⟩|)
    #[serde(default = "default_imaginary_tolerance")]
    pub imaginary_tolerance: f64,

    /// Basis states reported in the final-state summary
    #[serde(default = "default_top_states")]
    pub top_states: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "console" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_max_qubits() -> u32 {
    20
}

fn default_max_pauli_terms() -> usize {
    1000
}

fn default_timeout() -> u64 {
    3600 // 1 hour
}

fn default_parallel_jobs() -> usize {
    4
}

fn default_tolerance() -> f64 {
    1e-10
}

fn default_hermiticity_tolerance() -> f64 {
    1e-9
}

fn default_trotter_steps() -> u32 {
    10
}

fn default_accuracy_threshold() -> f64 {
    1e-2
}

fn default_imaginary_tolerance() -> f64 {
    1e-8
}

fn default_top_states() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "console".to_string()
}

impl Default for ResourceLimits {
    fn default() -> Self {
        ResourceLimits {
            max_qubits: default_max_qubits(),
            max_pauli_terms: default_max_pauli_terms(),
            timeout_seconds: default_timeout(),
            parallel_jobs: default_parallel_jobs(),
        }
    }
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        DecompositionConfig {
            tolerance: default_tolerance(),
            hermiticity_tolerance: default_hermiticity_tolerance(),
        }
    }
}

impl Default for TrotterConfig {
    fn default() -> Self {
        TrotterConfig {
            default_steps: default_trotter_steps(),
            default_order: TrotterOrder::default(),
            accuracy_threshold: default_accuracy_threshold(),
        }
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        EvolutionConfig {
            initial_state: InitialState::default(),
            imaginary_tolerance: default_imaginary_tolerance(),
            top_states: default_top_states(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(format!("{}: {e}", path.as_ref().display())))?;

        let config: SimulationConfig = serde_yaml_ng::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with the following precedence:
    /// 1. Load from file if provided
    /// 2. Apply environment variable overrides
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => SimulationConfig::default(),
        };

        let config = config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// Merge `QFEA_*` environment variables into this configuration.
    pub fn merge_env(self) -> Self {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    /// Merge overrides from an arbitrary variable source.
    ///
    /// Only variables that are present override the current values;
    /// unparsable numbers are ignored.
    pub fn merge_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        // Limits
        if let Some(v) = var("QFEA_MAX_QUBITS").and_then(|v| v.parse().ok()) {
            self.limits.max_qubits = v;
        }
        if let Some(v) = var("QFEA_MAX_PAULI_TERMS").and_then(|v| v.parse().ok()) {
            self.limits.max_pauli_terms = v;
        }
        if let Some(v) = var("QFEA_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.limits.timeout_seconds = v;
        }
        if let Some(v) = var("QFEA_PARALLEL_JOBS").and_then(|v| v.parse().ok()) {
            self.limits.parallel_jobs = v;
        }

        // Decomposition
        if let Some(v) = var("QFEA_TOLERANCE").and_then(|v| v.parse().ok()) {
            self.decomposition.tolerance = v;
        }

        // Trotter
        if let Some(v) = var("QFEA_TROTTER_STEPS").and_then(|v| v.parse().ok()) {
            self.trotter.default_steps = v;
        }

        // Logging
        if let Some(v) = var("QFEA_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = var("QFEA_LOG_FORMAT") {
            self.logging.format = v;
        }

        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_qubits == 0 || self.limits.max_qubits > 30 {
            return Err(ConfigError::ValidationError(format!(
                "max_qubits must be in 1..=30, got {}",
                self.limits.max_qubits
            )));
        }

        if self.limits.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }

        for (name, value) in [
            ("tolerance", self.decomposition.tolerance),
            ("hermiticity_tolerance", self.decomposition.hermiticity_tolerance),
            ("imaginary_tolerance", self.evolution.imaginary_tolerance),
            ("accuracy_threshold", self.trotter.accuracy_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }

        if self.trotter.default_steps == 0 {
            return Err(ConfigError::ValidationError(
                "default_steps must be at least 1".to_string(),
            ));
        }

        if let InitialState::Basis(i) = self.evolution.initial_state {
            if i >= (1usize << self.limits.max_qubits) {
                return Err(ConfigError::ValidationError(format!(
                    "initial basis state {i} is outside a {}-qubit register",
                    self.limits.max_qubits
                )));
            }
        }

        // Validate log level
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {other}"
                )));
            }
        }

        // Validate log format
        match self.logging.format.as_str() {
            "console" | "json" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {other}"
                )));
            }
        }

        Ok(())
    }

    /// Evolution wall-clock budget.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.limits.timeout_seconds)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
