//! # Settings Module
//!
//! ## Purpose
//! Numerical settings of the flash solver: tolerances, iteration caps, stability test
//! parameters, search bounds and the log level. A `FlashSettings` value is part of the
//! identity of a cached solver, so two solvers built with different settings never share
//! a cache entry.
//!
//! ## Key Features
//! - **Defaults everywhere**: every field and section carries `#[serde(default)]`, so a
//!   configuration file only lists what it changes
//! - **Persistence**: JSON load and save, with a fallback to defaults for a missing or
//!   broken file
//!
//! ## Configuration Format
//! ```json
//! {
//!   "tolerances": { "inner": 1e-10, "outer": 1e-8 },
//!   "stability": { "dedup_tolerance": 1e-4 },
//!   "rachford_rice_method": "Halley",
//!   "max_phases": 3,
//!   "log_level": "debug"
//! }
//! ```
//!
//! ## Usage
//! ```rust
//! use KiFlash::settings::FlashSettings;
//!
//! let settings = FlashSettings::load_or_default("flash_settings.json");
//! assert!(settings.max_phases >= 2);
//! ```
use crate::Flash::rachford_rice::RachfordRiceMethod;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// max |ln K| change between successive substitutions
    pub inner: f64,
    /// relative residual of the outer H/S/V/VF equation
    pub outer: f64,
    pub rachford_rice: f64,
    /// max-abs composition difference below which two phases are the same
    pub trivial: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            inner: 1e-10,
            outer: 1e-8,
            rachford_rice: 1e-12,
            trivial: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterationLimits {
    pub inner: usize,
    pub outer: usize,
    pub rachford_rice: usize,
}

impl Default for IterationLimits {
    fn default() -> Self {
        Self {
            inner: 2000,
            outer: 100,
            rachford_rice: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilitySettings {
    /// per trial
    pub max_iterations: usize,
    /// max |Δ ln W| of a converged trial
    pub tolerance: f64,
    /// a stationary point is unstable when `tm < -tpd_tolerance`
    pub tpd_tolerance: f64,
    pub dedup_tolerance: f64,
    /// mole fraction of the dominant compound in a near-pure trial
    pub pure_trial_fraction: f64,
}

impl Default for StabilitySettings {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            tolerance: 1e-10,
            tpd_tolerance: 1e-8,
            dedup_tolerance: 1e-4,
            pure_trial_fraction: 0.999,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashSettings {
    pub tolerances: Tolerances,
    pub iterations: IterationLimits,
    pub stability: StabilitySettings,
    pub rachford_rice_method: RachfordRiceMethod,
    /// upper limit of coexisting phases, further capped by the number of compounds + 1
    pub max_phases: usize,
    /// starting point of temperature searches, K
    pub initial_temperature: f64,
    /// starting point of pressure searches, Pa
    pub initial_pressure: f64,
    pub temperature_bounds: [f64; 2],
    pub pressure_bounds: [f64; 2],
    pub log_level: String,
}

impl Default for FlashSettings {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            iterations: IterationLimits::default(),
            stability: StabilitySettings::default(),
            rachford_rice_method: RachfordRiceMethod::default(),
            max_phases: 3,
            initial_temperature: 298.15,
            initial_pressure: 101325.0,
            temperature_bounds: [1.0, 1.0e4],
            pressure_bounds: [1.0, 1.0e9],
            log_level: "info".to_string(),
        }
    }
}

impl FlashSettings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Loads the file, or returns the defaults when it is missing or cannot be parsed.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path.as_ref()) {
            Ok(settings) => settings,
            Err(e) => {
                if path.as_ref().exists() {
                    warn!("{}; using default flash settings", e);
                }
                Self::default()
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// phase limit for a mixture of `n` compounds
    pub fn phase_limit(&self, n: usize) -> usize {
        self.max_phases.clamp(1, n + 1)
    }
}
