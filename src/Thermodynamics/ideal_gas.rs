use super::R;
use super::compound::Mixture;
use super::phase_model_api::{ModelDomainError, PhaseModel, validate_state};
use super::phase_state::PhaseKind;
use crate::Utils::numerics::xlnx;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct IdealGasPhase {
    mixture: Arc<Mixture>,
}

impl IdealGasPhase {
    pub fn new(mixture: Arc<Mixture>) -> Self {
        Self { mixture }
    }
}

/// `Σ y_i H_i^ig(T)`
pub(crate) fn ideal_gas_mixture_enthalpy(
    mixture: &Mixture,
    T: f64,
    y: &[f64],
) -> Result<f64, ModelDomainError> {
    let mut H = 0.0;
    for (c, yi) in mixture.compounds().iter().zip(y) {
        if *yi > 0.0 {
            H += yi * c.ideal_gas_enthalpy(T)?;
        }
    }
    Ok(H)
}

/// `Σ y_i S_i^ig(T, P) - R Σ y ln y`
pub(crate) fn ideal_gas_mixture_entropy(
    mixture: &Mixture,
    T: f64,
    P: f64,
    y: &[f64],
) -> Result<f64, ModelDomainError> {
    let mut S = 0.0;
    for (c, yi) in mixture.compounds().iter().zip(y) {
        if *yi > 0.0 {
            S += yi * c.ideal_gas_entropy(T, P)? - R * xlnx(*yi);
        }
    }
    Ok(S)
}

impl PhaseModel for IdealGasPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Vapor
    }
    fn mixture(&self) -> &Mixture {
        &self.mixture
    }
    fn ln_fugacity_coefficients(&self, T: f64, P: f64, x: &[f64]) -> Result<Vec<f64>, ModelDomainError> {
        validate_state(&self.mixture, T, P, x)?;
        Ok(vec![0.0; x.len()])
    }
    fn molar_enthalpy(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError> {
        validate_state(&self.mixture, T, P, x)?;
        ideal_gas_mixture_enthalpy(&self.mixture, T, x)
    }
    fn molar_entropy(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError> {
        validate_state(&self.mixture, T, P, x)?;
        ideal_gas_mixture_entropy(&self.mixture, T, P, x)
    }
    fn molar_volume(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError> {
        validate_state(&self.mixture, T, P, x)?;
        Ok(R * T / P)
    }
}
