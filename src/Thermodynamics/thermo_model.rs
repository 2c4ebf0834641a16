//! Model configuration and the bundle of phase models a flash works with.
use super::activity::{ActivityModel, IdealSolution};
use super::compound::Mixture;
use super::cubic::CubicPhase;
use super::gamma_phi::GammaPhiLiquid;
use super::ideal_gas::IdealGasPhase;
use super::phase_model_api::{ModelDomainError, PhaseModel, PhaseModelEnum};
use super::phase_state::PhaseKind;
use super::solid::PureSolidPhase;
use log::debug;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// serializable description of the thermodynamic model of a mixture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ThermoModel {
    /// ideal gas and Raoult's law liquid
    Ideal,
    /// ideal gas and an activity-coefficient liquid
    GammaPhi {
        activity: ActivityModel,
        #[serde(default)]
        poynting: bool,
    },
    /// Peng-Robinson for both fluid phases
    PengRobinson {
        #[serde(default)]
        kij: Option<DMatrix<f64>>,
    },
}

impl Default for ThermoModel {
    fn default() -> Self {
        ThermoModel::Ideal
    }
}

/// The phase models available to a flash: one vapor model, one liquid model (which may
/// give several liquid phases of different composition) and a pure solid for every
/// compound that supports it.
#[derive(Debug, Clone)]
pub struct PhaseModels {
    pub vapor: PhaseModelEnum,
    pub liquid: PhaseModelEnum,
    pub solids: Vec<PureSolidPhase>,
    mixture: Arc<Mixture>,
}

impl PhaseModels {
    pub fn mixture(&self) -> &Mixture {
        &self.mixture
    }

    pub fn fluid(&self, kind: PhaseKind) -> Option<&PhaseModelEnum> {
        match kind {
            PhaseKind::Vapor => Some(&self.vapor),
            PhaseKind::Liquid => Some(&self.liquid),
            PhaseKind::Solid => None,
        }
    }

    /// vapor first, then liquid
    pub fn fluids(&self) -> [&PhaseModelEnum; 2] {
        [&self.vapor, &self.liquid]
    }
}

impl ThermoModel {
    pub fn build(&self, mixture: Arc<Mixture>) -> Result<PhaseModels, ModelDomainError> {
        let (vapor, liquid): (PhaseModelEnum, PhaseModelEnum) = match self {
            ThermoModel::Ideal => (
                IdealGasPhase::new(mixture.clone()).into(),
                GammaPhiLiquid::new(mixture.clone(), IdealSolution.into(), false)?.into(),
            ),
            ThermoModel::GammaPhi { activity, poynting } => (
                IdealGasPhase::new(mixture.clone()).into(),
                GammaPhiLiquid::new(mixture.clone(), activity.clone(), *poynting)?.into(),
            ),
            ThermoModel::PengRobinson { kij } => (
                CubicPhase::new(mixture.clone(), PhaseKind::Vapor, kij.clone())?.into(),
                CubicPhase::new(mixture.clone(), PhaseKind::Liquid, kij.clone())?.into(),
            ),
        };
        let mut solids = Vec::new();
        for (i, c) in mixture.compounds().iter().enumerate() {
            if c.solid_capable() {
                solids.push(PureSolidPhase::new(mixture.clone(), i)?);
            } else {
                debug!("{} has no solid data, no solid phase model", c.name);
            }
        }
        debug!(
            "built {} model for {:?}: vapor {:?}, liquid {:?}, {} solid(s)",
            self.name(),
            mixture.names(),
            vapor.kind(),
            liquid.kind(),
            solids.len()
        );
        Ok(PhaseModels {
            vapor,
            liquid,
            solids,
            mixture,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ThermoModel::Ideal => "ideal",
            ThermoModel::GammaPhi { .. } => "gamma-phi",
            ThermoModel::PengRobinson { .. } => "Peng-Robinson",
        }
    }
}
