use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::ParameterError;
use crate::registration::transform::TransformKind;
use crate::tracking::coil_stream::MAX_COILS;

/// Persisted per-catheter configuration. Display fields (color, opacity,
/// radius) ride along for the host panel but play no role in the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatheterConfig {
    pub name: String,
    /// Distance of each coil slot from the tip, in mm, ascending.
    pub coil_positions: Vec<f64>,
    pub active_coils: Vec<bool>,
    /// Tip-to-base coil numbering when true, base-to-tip otherwise.
    pub tip_first: bool,
    /// Per-axis sign convention of the tracker frame (each entry ±1).
    pub axis_directions: [f64; 3],
    pub color: [f64; 3],
    pub opacity: f64,
    pub radius: f64,
    /// How far beyond the most distal coil the tip is extrapolated, in mm.
    pub tip_length: f64,
    /// Stabilizer cutoff frequency in Hz, passed through to the external
    /// filter; the filter itself lives outside this crate.
    pub cutoff_frequency: f64,
}

impl Default for CatheterConfig {
    fn default() -> Self {
        CatheterConfig {
            name: "catheter".to_string(),
            coil_positions: (0..MAX_COILS).map(|i| 5.0 + 10.0 * i as f64).collect(),
            active_coils: vec![true; MAX_COILS],
            tip_first: true,
            axis_directions: [1.0, 1.0, 1.0],
            color: [1.0, 0.8, 0.1],
            opacity: 1.0,
            radius: 1.0,
            tip_length: 5.0,
            cutoff_frequency: 7.5,
        }
    }
}

impl CatheterConfig {
    /// Checks the structural invariants of the coil layout.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.coil_positions.len() != MAX_COILS {
            return Err(ParameterError::new("coil_positions"));
        }
        if self.active_coils.len() != MAX_COILS {
            return Err(ParameterError::new("active_coils"));
        }
        if self.axis_directions.iter().any(|d| d.abs() != 1.0) {
            return Err(ParameterError::new("axis_directions"));
        }
        if self
            .coil_positions
            .windows(2)
            .any(|w| w[1] < w[0])
        {
            return Err(ParameterError::new("coil_positions"));
        }
        Ok(())
    }

    /// Replaces invalid fields with their defaults, logging what was
    /// dropped. Configuration errors are never fatal.
    pub fn sanitized(mut self) -> Self {
        let defaults = CatheterConfig::default();
        if self.coil_positions.len() != MAX_COILS
            || self.coil_positions.windows(2).any(|w| w[1] < w[0])
        {
            warn!(
                "catheter '{}': invalid coil_positions, using defaults",
                self.name
            );
            self.coil_positions = defaults.coil_positions.clone();
        }
        if self.active_coils.len() != MAX_COILS {
            warn!(
                "catheter '{}': invalid active_coils, using defaults",
                self.name
            );
            self.active_coils = defaults.active_coils.clone();
        }
        for d in self.axis_directions.iter_mut() {
            if d.abs() != 1.0 {
                warn!("catheter '{}': axis direction not ±1, using +1", self.name);
                *d = 1.0;
            }
        }
        if self.tip_length < 0.0 {
            warn!("catheter '{}': negative tip_length, using default", self.name);
            self.tip_length = defaults.tip_length;
        }
        self
    }
}

/// Registration gates and fit selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    pub kind: TransformKind,
    /// Fiducial ring capacity; bounds fit cost and biases toward recent
    /// geometry.
    pub buffer_capacity: usize,
    /// Maximum allowed skew between the two curves' timestamps, seconds.
    pub max_time_difference: f64,
    /// Minimum advance on at least one curve between accepted collections,
    /// seconds.
    pub min_interval: f64,
    /// Sample count that must be exceeded before a fit runs.
    pub min_num_fiducials: usize,
    pub auto_update: bool,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        RegistrationConfig {
            kind: TransformKind::Rigid,
            buffer_capacity: 24,
            max_time_difference: 0.1,
            min_interval: 1.0,
            min_num_fiducials: 10,
            auto_update: false,
        }
    }
}

/// Everything the plugin persists between sessions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub catheters: Vec<CatheterConfig>,
    pub registration: RegistrationConfig,
}

pub fn load_session_config<P: AsRef<Path>>(path: P) -> Result<SessionConfig> {
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {:?}", path.as_ref()))?;
    let config: SessionConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse config file {:?}", path.as_ref()))?;
    Ok(config)
}

/// Load with recovery: a missing or malformed file is logged
/// and replaced by defaults so the update loop keeps running.
pub fn load_session_config_or_default<P: AsRef<Path>>(path: P) -> SessionConfig {
    match load_session_config(&path) {
        Ok(config) => SessionConfig {
            catheters: config
                .catheters
                .into_iter()
                .map(CatheterConfig::sanitized)
                .collect(),
            registration: config.registration,
        },
        Err(e) => {
            warn!("using default session config: {:#}", e);
            SessionConfig::default()
        }
    }
}

pub fn save_session_config<P: AsRef<Path>>(path: P, config: &SessionConfig) -> Result<()> {
    let text = toml::to_string_pretty(config).context("failed to serialize session config")?;
    fs::write(&path, text)
        .with_context(|| format!("failed to write config file {:?}", path.as_ref()))?;
    Ok(())
}
