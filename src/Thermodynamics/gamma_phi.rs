//! Liquid described by an activity-coefficient model on top of pure-component vapor
//! pressures: `f_i = x_i γ_i Psat_i` with an optional Poynting correction.
//! Enthalpy and entropy are referenced to the ideal gas through the heat of vaporization.
use super::R;
use super::activity::{ActivityCoefficients, ActivityModel, ideal_mixing_entropy};
use super::compound::Mixture;
use super::phase_model_api::{ModelDomainError, PhaseModel, validate_state};
use super::phase_state::PhaseKind;
use super::P_REF;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct GammaPhiLiquid {
    mixture: Arc<Mixture>,
    activity: ActivityModel,
    poynting: bool,
}

impl GammaPhiLiquid {
    pub fn new(mixture: Arc<Mixture>, activity: ActivityModel, poynting: bool) -> Result<Self, ModelDomainError> {
        activity.validate(mixture.len())?;
        Ok(Self {
            mixture,
            activity,
            poynting,
        })
    }

    pub fn activity(&self) -> &ActivityModel {
        &self.activity
    }

    /// every compound present in the liquid must be subcritical
    fn check_subcritical(&self, T: f64, x: &[f64]) -> Result<(), ModelDomainError> {
        for (c, xi) in self.mixture.compounds().iter().zip(x) {
            if *xi > 0.0 {
                if let Some(Tc) = c.constants.Tc {
                    if T > Tc {
                        return Err(ModelDomainError::Supercritical {
                            compound: c.name.clone(),
                            T,
                            Tc,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn ln_activity_coefficients(&self, T: f64, x: &[f64]) -> Vec<f64> {
        self.activity.ln_gammas(T, x)
    }
}

impl PhaseModel for GammaPhiLiquid {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Liquid
    }
    fn mixture(&self) -> &Mixture {
        &self.mixture
    }

    fn ln_fugacity_coefficients(&self, T: f64, P: f64, x: &[f64]) -> Result<Vec<f64>, ModelDomainError> {
        validate_state(&self.mixture, T, P, x)?;
        self.check_subcritical(T, x)?;
        let ln_gamma = self.activity.ln_gammas(T, x);
        let mut ln_phi = Vec::with_capacity(x.len());
        for (i, c) in self.mixture.compounds().iter().enumerate() {
            let Psat = c.vapor_pressure(T)?;
            let mut v = ln_gamma[i] + Psat.ln() - P.ln();
            if self.poynting {
                v += c.liquid_molar_volume(T)? * (P - Psat) / (R * T);
            }
            ln_phi.push(v);
        }
        Ok(ln_phi)
    }

    fn molar_enthalpy(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError> {
        validate_state(&self.mixture, T, P, x)?;
        self.check_subcritical(T, x)?;
        let mut H = 0.0;
        for (c, xi) in self.mixture.compounds().iter().zip(x) {
            if *xi > 0.0 {
                H += xi * (c.ideal_gas_enthalpy(T)? - c.heat_of_vaporization(T)?);
            }
        }
        Ok(H + self.activity.excess_enthalpy(T, x))
    }

    fn molar_entropy(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError> {
        validate_state(&self.mixture, T, P, x)?;
        self.check_subcritical(T, x)?;
        let mut S = 0.0;
        for (c, xi) in self.mixture.compounds().iter().zip(x) {
            if *xi > 0.0 {
                let Psat = c.vapor_pressure(T)?;
                S += xi
                    * (c.ideal_gas_entropy(T, P_REF)? - R * (Psat / P_REF).ln()
                        - c.heat_of_vaporization(T)? / T);
            }
        }
        let HE = self.activity.excess_enthalpy(T, x);
        let GE = R * T * self.activity.ge_over_RT(T, x);
        Ok(S + ideal_mixing_entropy(x) + (HE - GE) / T)
    }

    fn molar_volume(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError> {
        validate_state(&self.mixture, T, P, x)?;
        let mut V = 0.0;
        for (c, xi) in self.mixture.compounds().iter().zip(x) {
            if *xi > 0.0 {
                V += xi * c.liquid_molar_volume(T)?;
            }
        }
        Ok(V)
    }
}
