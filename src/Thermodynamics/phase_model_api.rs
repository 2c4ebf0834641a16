use super::compound::Mixture;
use super::cubic::CubicPhase;
use super::gamma_phi::GammaPhiLiquid;
use super::ideal_gas::IdealGasPhase;
use super::phase_state::PhaseKind;
use super::solid::PureSolidPhase;
use crate::Correlations::correlation_api::CorrelationError;
use crate::Correlations::correlation_set::PropertyKind;
use enum_dispatch::enum_dispatch;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelDomainError {
    #[error("invalid temperature {0} K")]
    InvalidTemperature(f64),
    #[error("invalid pressure {0} Pa")]
    InvalidPressure(f64),
    #[error("composition has {got} entries, the mixture has {expected} compounds")]
    CompositionLength { expected: usize, got: usize },
    #[error("invalid composition: {0}")]
    InvalidComposition(String),
    #[error("compound {0} appears twice in the mixture")]
    DuplicateCompound(String),
    #[error("compound {compound} lacks the constant {constant}")]
    MissingConstant { compound: String, constant: String },
    #[error("compound {compound} has no {property:?} correlation")]
    MissingCorrelation {
        compound: String,
        property: PropertyKind,
    },
    #[error("T = {T} K is above Tc = {Tc} K of {compound}; the activity-coefficient liquid is undefined")]
    Supercritical { compound: String, T: f64, Tc: f64 },
    #[error("parameter {name} has shape {got:?}, expected {expected:?}")]
    ParameterShape {
        name: String,
        expected: (usize, usize),
        got: (usize, usize),
    },
    #[error("no admissible cubic root at T = {T} K, P = {P} Pa")]
    NoCubicRoot { T: f64, P: f64 },
    #[error(transparent)]
    Correlation(#[from] CorrelationError),
}

/////////////////////////////////////////VALIDATION//////////////////////////////////////////////////////

pub fn validate_temperature(T: f64) -> Result<(), ModelDomainError> {
    if !(T > 0.0) || !T.is_finite() {
        return Err(ModelDomainError::InvalidTemperature(T));
    }
    Ok(())
}

pub fn validate_pressure(P: f64) -> Result<(), ModelDomainError> {
    if !(P > 0.0) || !P.is_finite() {
        return Err(ModelDomainError::InvalidPressure(P));
    }
    Ok(())
}

/// Length must match, entries must be finite and non-negative, the sum must be 1 to 1e-8.
pub fn validate_composition(mixture: &Mixture, x: &[f64]) -> Result<(), ModelDomainError> {
    if x.len() != mixture.len() {
        return Err(ModelDomainError::CompositionLength {
            expected: mixture.len(),
            got: x.len(),
        });
    }
    if let Some(bad) = x.iter().find(|xi| !(**xi >= 0.0) || !xi.is_finite()) {
        return Err(ModelDomainError::InvalidComposition(format!(
            "mole fraction {} is negative or not finite",
            bad
        )));
    }
    let sum: f64 = x.iter().sum();
    if (sum - 1.0).abs() > 1e-8 {
        return Err(ModelDomainError::InvalidComposition(format!(
            "mole fractions sum to {}",
            sum
        )));
    }
    Ok(())
}

pub fn validate_state(mixture: &Mixture, T: f64, P: f64, x: &[f64]) -> Result<(), ModelDomainError> {
    validate_temperature(T)?;
    validate_pressure(P)?;
    validate_composition(mixture, x)
}

/// Thermodynamic functions of one phase. All methods are pure in `(T, P, x)`; `x` is
/// ordered like [`PhaseModel::mixture`].
#[enum_dispatch]
pub trait PhaseModel {
    fn kind(&self) -> PhaseKind;
    fn mixture(&self) -> &Mixture;
    fn ln_fugacity_coefficients(&self, T: f64, P: f64, x: &[f64]) -> Result<Vec<f64>, ModelDomainError>;
    /// J/mol
    fn molar_enthalpy(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError>;
    /// J/(mol K)
    fn molar_entropy(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError>;
    /// m³/mol
    fn molar_volume(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError>;

    fn molar_gibbs(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError> {
        Ok(self.molar_enthalpy(T, P, x)? - T * self.molar_entropy(T, P, x)?)
    }

    fn fugacity_coefficients_map(
        &self,
        T: f64,
        P: f64,
        x: &[f64],
    ) -> Result<HashMap<String, f64>, ModelDomainError> {
        let ln_phi = self.ln_fugacity_coefficients(T, P, x)?;
        Ok(self
            .mixture()
            .names()
            .iter()
            .cloned()
            .zip(ln_phi.into_iter().map(f64::exp))
            .collect())
    }
}

#[derive(Debug, Clone)]
#[enum_dispatch(PhaseModel)]
pub enum PhaseModelEnum {
    IdealGas(IdealGasPhase),
    GammaPhiLiquid(GammaPhiLiquid),
    Cubic(CubicPhase),
    PureSolid(PureSolidPhase),
}
