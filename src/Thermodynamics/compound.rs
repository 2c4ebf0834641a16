use super::phase_model_api::ModelDomainError;
use super::phase_state::PhaseKind;
use super::{P_REF, R, T_REF};
use crate::Correlations::correlation_api::CorrelationError;
use crate::Correlations::correlation_set::{CorrelationSet, PropertyKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Scalar pure-component data. Every constant is optional; models that need one report
/// [`ModelDomainError::MissingConstant`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompoundConstants {
    pub Tc: Option<f64>,
    /// Pa
    pub Pc: Option<f64>,
    pub omega: Option<f64>,
    /// normal boiling point, K
    pub Tb: Option<f64>,
    /// melting point, K
    pub Tm: Option<f64>,
    /// heat of fusion at Tm, J/mol
    pub Hfus: Option<f64>,
    /// g/mol
    pub molar_mass: Option<f64>,
    /// ideal-gas enthalpy at 298.15 K, J/mol
    #[serde(default)]
    pub Hf: f64,
    /// ideal-gas absolute entropy at 298.15 K and 101325 Pa, J/(mol K)
    #[serde(default)]
    pub S0: f64,
}

#[derive(Debug, Clone)]
pub struct Compound {
    pub name: String,
    pub constants: CompoundConstants,
    pub correlations: Arc<CorrelationSet>,
}

impl Compound {
    pub fn new(name: &str, constants: CompoundConstants, correlations: CorrelationSet) -> Self {
        Self {
            name: name.to_string(),
            constants,
            correlations: Arc::new(correlations),
        }
    }

    /// shares an already built correlation set
    pub fn with_shared_set(
        name: &str,
        constants: CompoundConstants,
        correlations: Arc<CorrelationSet>,
    ) -> Self {
        Self {
            name: name.to_string(),
            constants,
            correlations,
        }
    }

    fn constant(&self, value: Option<f64>, constant: &str) -> Result<f64, ModelDomainError> {
        value.ok_or_else(|| ModelDomainError::MissingConstant {
            compound: self.name.clone(),
            constant: constant.to_string(),
        })
    }

    pub fn Tc(&self) -> Result<f64, ModelDomainError> {
        self.constant(self.constants.Tc, "Tc")
    }
    pub fn Pc(&self) -> Result<f64, ModelDomainError> {
        self.constant(self.constants.Pc, "Pc")
    }
    pub fn omega(&self) -> Result<f64, ModelDomainError> {
        self.constant(self.constants.omega, "omega")
    }

    fn attach_name(&self, err: CorrelationError) -> ModelDomainError {
        match err {
            CorrelationError::MissingProperty(property) => ModelDomainError::MissingCorrelation {
                compound: self.name.clone(),
                property,
            },
            other => ModelDomainError::Correlation(other),
        }
    }

    pub fn has(&self, kind: PropertyKind) -> bool {
        self.correlations.has(kind)
    }

    pub fn property(&self, kind: PropertyKind, T: f64) -> Result<f64, ModelDomainError> {
        self.correlations.get(kind, T).map_err(|e| self.attach_name(e))
    }

    pub fn vapor_pressure(&self, T: f64) -> Result<f64, ModelDomainError> {
        self.property(PropertyKind::VaporPressure, T)
    }

    /// d ln Psat / dT
    pub fn dln_vapor_pressure_dT(&self, T: f64) -> Result<f64, ModelDomainError> {
        let dP = self
            .correlations
            .derivative(PropertyKind::VaporPressure, T)
            .map_err(|e| self.attach_name(e))?;
        Ok(dP / self.vapor_pressure(T)?)
    }

    /// `Hf + ∫ Cp_ig dT` from 298.15 K
    pub fn ideal_gas_enthalpy(&self, T: f64) -> Result<f64, ModelDomainError> {
        let dH = self
            .correlations
            .integrate(PropertyKind::GasHeatCapacity, T_REF, T)
            .map_err(|e| self.attach_name(e))?;
        Ok(self.constants.Hf + dH)
    }

    /// `S0 + ∫ Cp_ig/T dT - R ln(P/P_ref)`
    pub fn ideal_gas_entropy(&self, T: f64, P: f64) -> Result<f64, ModelDomainError> {
        let dS = self
            .correlations
            .integrate_over_T(PropertyKind::GasHeatCapacity, T_REF, T)
            .map_err(|e| self.attach_name(e))?;
        Ok(self.constants.S0 + dS - R * (P / P_REF).ln())
    }

    /// From the heat of vaporization correlation when present, otherwise Clausius-Clapeyron
    /// on the vapor pressure curve.
    pub fn heat_of_vaporization(&self, T: f64) -> Result<f64, ModelDomainError> {
        if self.has(PropertyKind::HeatOfVaporization) {
            return self.property(PropertyKind::HeatOfVaporization, T);
        }
        Ok(R * T * T * self.dln_vapor_pressure_dT(T)?)
    }

    /// From the liquid density correlation when present, otherwise the Rackett equation.
    /// Without a density correlation the compound needs `Tc`, `Pc` and `omega`, also for
    /// an ideal (Raoult) liquid, since every flash result reports phase volumes.
    pub fn liquid_molar_volume(&self, T: f64) -> Result<f64, ModelDomainError> {
        if self.has(PropertyKind::LiquidDensity) {
            return Ok(1.0 / self.property(PropertyKind::LiquidDensity, T)?);
        }
        let (Tc, Pc, omega) = (self.Tc()?, self.Pc()?, self.omega()?);
        let z_ra = 0.29056 - 0.08775 * omega;
        let Tr = (T / Tc).min(1.0);
        Ok(R * Tc / Pc * z_ra.powf(1.0 + (1.0 - Tr).powf(2.0 / 7.0)))
    }

    /// capability query of the pure-solid model
    pub fn solid_capable(&self) -> bool {
        self.has(PropertyKind::SolidDensity)
            && self.has(PropertyKind::VaporPressure)
            && self.constants.Tm.is_some()
            && self.constants.Hfus.is_some()
    }

    /// Rough phase of the pure compound at (T, P): solid below Tm, gas at or above Tc,
    /// then vapor pressure against P, then the normal boiling point near 1 atm.
    /// `None` when the available data cannot tell.
    pub fn identify_phase(&self, T: f64, P: f64) -> Option<PhaseKind> {
        if let Some(Tm) = self.constants.Tm {
            if T <= Tm {
                return Some(PhaseKind::Solid);
            }
        }
        if let Some(Tc) = self.constants.Tc {
            if T >= Tc {
                return Some(PhaseKind::Vapor);
            }
        }
        if let Ok(Psat) = self.vapor_pressure(T) {
            return if P <= Psat {
                Some(PhaseKind::Vapor)
            } else {
                Some(PhaseKind::Liquid)
            };
        }
        let Tb = self.constants.Tb?;
        if P > 9e4 && P < 1.1e5 {
            if T < Tb {
                Some(PhaseKind::Liquid)
            } else {
                Some(PhaseKind::Vapor)
            }
        } else if P >= 1.1e5 && T <= Tb {
            Some(PhaseKind::Liquid)
        } else {
            None
        }
    }
}

/// Ordered compounds; the order is the index order of every composition vector.
#[derive(Debug, Clone)]
pub struct Mixture {
    compounds: Vec<Arc<Compound>>,
    names: Vec<String>,
}

impl Mixture {
    pub fn new(compounds: Vec<Arc<Compound>>) -> Result<Self, ModelDomainError> {
        if compounds.is_empty() {
            return Err(ModelDomainError::InvalidComposition(
                "a mixture needs at least one compound".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for c in &compounds {
            if !seen.insert(c.name.clone()) {
                return Err(ModelDomainError::DuplicateCompound(c.name.clone()));
            }
        }
        let names = compounds.iter().map(|c| c.name.clone()).collect();
        Ok(Self { compounds, names })
    }

    pub fn len(&self) -> usize {
        self.compounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty()
    }

    pub fn compounds(&self) -> &[Arc<Compound>] {
        &self.compounds
    }

    pub fn compound(&self, i: usize) -> &Compound {
        &self.compounds[i]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}
