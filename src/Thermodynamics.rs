//! Phase models: fugacity coefficients and molar properties of one candidate phase
//! built from the correlation sets of its compounds.
//!
//! Units are SI throughout: K, Pa, J/mol, J/(mol K), m³/mol.
//!
//! # Examples
//! ```
//! use KiFlash::Correlations::correlation_set::{CorrelationSet, PropertyKind};
//! use KiFlash::Thermodynamics::compound::{Compound, CompoundConstants, Mixture};
//! use KiFlash::Thermodynamics::phase_model_api::PhaseModel;
//! use KiFlash::Thermodynamics::thermo_model::ThermoModel;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let benzene = CorrelationSet::from_serde(json!({
//!     "VaporPressure": [{"form": "AntoineMmHg", "coeffs": [6.90565, 1211.033, -52.36],
//!                        "T_min": 280.0, "T_max": 377.0}]
//! })).unwrap();
//! let toluene = CorrelationSet::from_serde(json!({
//!     "VaporPressure": [{"form": "AntoineMmHg", "coeffs": [6.95464, 1344.8, -53.668],
//!                        "T_min": 280.0, "T_max": 410.0}]
//! })).unwrap();
//! let mixture = Arc::new(Mixture::new(vec![
//!     Arc::new(Compound::new("benzene", CompoundConstants::default(), benzene)),
//!     Arc::new(Compound::new("toluene", CompoundConstants::default(), toluene)),
//! ]).unwrap());
//! let models = ThermoModel::Ideal.build(mixture).unwrap();
//! let ln_phi = models.liquid.ln_fugacity_coefficients(365.0, 101325.0, &[0.5, 0.5]).unwrap();
//! // Raoult: φ_i = Psat_i / P
//! assert!(ln_phi[0] > 0.0 && ln_phi[1] < 0.0);
//! ```

/// Gas constant, J/(mol K)
pub const R: f64 = 8.314462618;
/// reference temperature of formation enthalpies and absolute entropies, K
pub const T_REF: f64 = 298.15;
/// reference pressure of ideal-gas entropies, Pa
pub const P_REF: f64 = 101325.0;

/// activity-coefficient models: ideal solution, NRTL, Wilson, UNIQUAC
pub mod activity;
/// compounds (constants + correlation set) and ordered mixtures
pub mod compound;
/// Peng-Robinson equation of state
pub mod cubic;
/// gamma-phi liquid: activity coefficients times vapor pressure
pub mod gamma_phi;
/// ideal-gas phase
pub mod ideal_gas;
/// common trait of all phase models, domain errors and validation helpers
pub mod phase_model_api;
/// phase kind and phase state
pub mod phase_state;
/// pure solid phase of one compound
pub mod solid;
/// model configuration and construction of the vapor/liquid/solid model bundle
pub mod thermo_model;

#[cfg(test)]
mod phase_model_tests;
#[cfg(test)]
pub(crate) mod test_compounds;
