use super::compound::Mixture;
use super::phase_model_api::{ModelDomainError, PhaseModel, validate_state};
use super::phase_state::PhaseKind;
use super::{P_REF, R};
use crate::Correlations::correlation_set::PropertyKind;
use std::sync::Arc;

/// Pure solid of one compound of the mixture. The fugacity follows from the (subcooled)
/// liquid vapor pressure and the heat of fusion at the melting point; every other
/// compound has an infinite fugacity coefficient in it.
#[derive(Debug, Clone)]
pub struct PureSolidPhase {
    mixture: Arc<Mixture>,
    index: usize,
    Tm: f64,
    Hfus: f64,
}

impl PureSolidPhase {
    pub fn new(mixture: Arc<Mixture>, index: usize) -> Result<Self, ModelDomainError> {
        let c = mixture.compound(index);
        let Tm = c.constants.Tm.ok_or_else(|| ModelDomainError::MissingConstant {
            compound: c.name.clone(),
            constant: "Tm".to_string(),
        })?;
        let Hfus = c.constants.Hfus.ok_or_else(|| ModelDomainError::MissingConstant {
            compound: c.name.clone(),
            constant: "Hfus".to_string(),
        })?;
        for kind in [PropertyKind::SolidDensity, PropertyKind::VaporPressure] {
            if !c.has(kind) {
                return Err(ModelDomainError::MissingCorrelation {
                    compound: c.name.clone(),
                    property: kind,
                });
            }
        }
        Ok(Self {
            mixture,
            index,
            Tm,
            Hfus,
        })
    }

    /// position of the solid-forming compound in the mixture
    pub fn index(&self) -> usize {
        self.index
    }

    /// ln φ of the pure solid
    pub fn ln_phi_pure(&self, T: f64, P: f64) -> Result<f64, ModelDomainError> {
        let Psat = self.mixture.compound(self.index).vapor_pressure(T)?;
        Ok((Psat / P).ln() - self.Hfus / R * (1.0 / T - 1.0 / self.Tm))
    }
}

impl PhaseModel for PureSolidPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Solid
    }
    fn mixture(&self) -> &Mixture {
        &self.mixture
    }

    fn ln_fugacity_coefficients(&self, T: f64, P: f64, x: &[f64]) -> Result<Vec<f64>, ModelDomainError> {
        validate_state(&self.mixture, T, P, x)?;
        let mut ln_phi = vec![f64::INFINITY; x.len()];
        ln_phi[self.index] = self.ln_phi_pure(T, P)?;
        Ok(ln_phi)
    }

    fn molar_enthalpy(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError> {
        validate_state(&self.mixture, T, P, x)?;
        let c = self.mixture.compound(self.index);
        Ok(c.ideal_gas_enthalpy(T)? - c.heat_of_vaporization(T)? - self.Hfus)
    }

    fn molar_entropy(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError> {
        validate_state(&self.mixture, T, P, x)?;
        let c = self.mixture.compound(self.index);
        let Psat = c.vapor_pressure(T)?;
        Ok(c.ideal_gas_entropy(T, P_REF)? - R * (Psat / P_REF).ln()
            - c.heat_of_vaporization(T)? / T
            - self.Hfus / self.Tm)
    }

    fn molar_volume(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError> {
        validate_state(&self.mixture, T, P, x)?;
        let rho = self
            .mixture
            .compound(self.index)
            .property(PropertyKind::SolidDensity, T)?;
        Ok(1.0 / rho)
    }
}
