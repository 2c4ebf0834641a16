//! # Flash solver
//!
//! [`FlashSolver`] owns the phase models of one mixture and one model configuration and
//! answers any supported [`FlashSpec`]. Solvers are immutable after construction and can
//! be shared between threads (see [`ModelCache`](super::model_cache::ModelCache)).
//!
//! The TP flash is a small state machine:
//! ```text
//! Initial -> PhaseCountGuess -> StabilityCheck -> (stable) Converged -> Terminal(Success)
//!                    ^                 |
//!                    |            (unstable)
//!                    |                 v
//!                    +--- InnerEquilibriumIteration
//! ```
//! Every failure leads to `Terminal(Failure)`. The number of transitions is bounded.
//!
//! # Examples
//! ```
//! use KiFlash::Correlations::correlation_set::CorrelationSet;
//! use KiFlash::Flash::flash_api::FlashSpec;
//! use KiFlash::Flash::flash_solver::FlashSolver;
//! use KiFlash::Thermodynamics::compound::{Compound, CompoundConstants, Mixture};
//! use KiFlash::Thermodynamics::thermo_model::ThermoModel;
//! use KiFlash::settings::FlashSettings;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! // molar volumes need either a liquid density correlation or Tc, Pc and omega
//! let compound = |name: &str, A: f64, B: f64, C: f64, rho: f64| {
//!     let set = CorrelationSet::from_serde(json!({
//!         "VaporPressure": {"form": "AntoineMmHg", "coeffs": [A, B, C],
//!                           "T_min": 250.0, "T_max": 420.0},
//!         "GasHeatCapacity": {"form": "Polynomial", "coeffs": [100.0],
//!                             "T_min": 200.0, "T_max": 1500.0},
//!         "LiquidDensity": {"form": "Polynomial", "coeffs": [rho],
//!                           "T_min": 250.0, "T_max": 420.0}
//!     })).unwrap();
//!     Arc::new(Compound::new(name, CompoundConstants::default(), set))
//! };
//! let mixture = Arc::new(Mixture::new(vec![
//!     compound("benzene", 6.90565, 1211.033, -52.36, 10_500.0),
//!     compound("toluene", 6.95464, 1344.8, -53.668, 8_800.0),
//! ]).unwrap());
//! let solver = FlashSolver::new(mixture, ThermoModel::Ideal, FlashSettings::default()).unwrap();
//! let result = solver.flash(FlashSpec::TP { T: 368.0, P: 101325.0 }, &[0.5, 0.5]).unwrap();
//! assert_eq!(result.phase_count(), 2);
//! assert!((result.phases.iter().map(|p| p.fraction).sum::<f64>() - 1.0).abs() < 1e-12);
//! ```
use super::flash_api::{
    ConvergenceInfo, ConvergenceStage, FlashError, FlashResult, FlashSpec, FlashStage, Outcome,
    PhaseResult,
};
use super::inner_loop::{PhaseSlot, equilibrate, fluid_model, single_phase_guess};
use super::model_cache::ModelKey;
use super::outer_loop;
use super::stability::StabilityTester;
use crate::Thermodynamics::compound::Mixture;
use crate::Thermodynamics::phase_model_api::PhaseModel;
use crate::Thermodynamics::phase_state::PhaseKind;
use crate::Thermodynamics::thermo_model::{PhaseModels, ThermoModel};
use crate::settings::FlashSettings;
use log::{debug, info, warn};
use std::sync::Arc;

/// feed entries down to this are treated as zero
const FEED_NEGATIVE_TOL: f64 = 1e-12;
/// accepted deviation of the feed sum from one before renormalization
const FEED_SUM_TOL: f64 = 1e-6;

/// Tracks the TP flash stage and bounds the number of transitions.
struct StageTracker {
    stage: FlashStage,
    transitions: usize,
    limit: usize,
}

impl StageTracker {
    fn new(limit: usize) -> Self {
        Self {
            stage: FlashStage::Initial,
            transitions: 0,
            limit,
        }
    }

    fn advance(&mut self, next: FlashStage, residual: f64) -> Result<(), FlashError> {
        debug!("flash stage {:?} -> {:?}", self.stage, next);
        self.stage = next;
        self.transitions += 1;
        if self.transitions > self.limit && !matches!(next, FlashStage::Terminal(_)) {
            self.stage = FlashStage::Terminal(Outcome::Failure);
            return Err(FlashError::Convergence {
                stage: ConvergenceStage::Inner,
                iterations: self.transitions,
                residual,
            });
        }
        Ok(())
    }

    fn fail(&mut self, error: FlashError) -> FlashError {
        debug!("flash stage {:?} -> Terminal(Failure): {}", self.stage, error);
        self.stage = FlashStage::Terminal(Outcome::Failure);
        self.transitions += 1;
        error
    }
}

#[derive(Debug)]
pub struct FlashSolver {
    mixture: Arc<Mixture>,
    model: ThermoModel,
    models: PhaseModels,
    settings: FlashSettings,
    key: ModelKey,
}

impl FlashSolver {
    /// Builds the phase models. Fails when a compound lacks what the model needs.
    pub fn new(
        mixture: Arc<Mixture>,
        model: ThermoModel,
        settings: FlashSettings,
    ) -> Result<Self, FlashError> {
        let key = ModelKey::new(&mixture, &model, &settings)?;
        let models = model.build(mixture.clone())?;
        info!(
            "flash solver for {:?} with the {} model ({} solid phase model(s))",
            mixture.names(),
            model.name(),
            models.solids.len()
        );
        Ok(Self {
            mixture,
            model,
            models,
            settings,
            key,
        })
    }

    pub fn mixture(&self) -> &Mixture {
        &self.mixture
    }

    pub fn model(&self) -> &ThermoModel {
        &self.model
    }

    pub fn models(&self) -> &PhaseModels {
        &self.models
    }

    pub fn settings(&self) -> &FlashSettings {
        &self.settings
    }

    pub fn key(&self) -> &ModelKey {
        &self.key
    }

    /// Solves `spec` for the feed `z`.
    pub fn flash(&self, spec: FlashSpec, z: &[f64]) -> Result<FlashResult, FlashError> {
        spec.validate()?;
        let z = self.checked_feed(z)?;
        let result = match spec {
            FlashSpec::TP { T, P } => self.tp_flash(spec, T, P, &z),
            FlashSpec::TVF { .. } | FlashSpec::PVF { .. } => {
                outer_loop::solve_vapor_fraction(self, spec, &z)
            }
            _ => outer_loop::solve_state_function(self, spec, &z),
        }?;
        info!(
            "{} converged: {} phase(s) at T = {:.3} K, P = {:.1} Pa",
            spec,
            result.phase_count(),
            result.T,
            result.P
        );
        Ok(result)
    }

    pub fn flash_tp(&self, T: f64, P: f64, z: &[f64]) -> Result<FlashResult, FlashError> {
        self.flash(FlashSpec::TP { T, P }, z)
    }

    /// pressure at which the first bubble of vapor forms at `T`
    pub fn bubble_pressure(&self, T: f64, z: &[f64]) -> Result<f64, FlashError> {
        Ok(self.flash(FlashSpec::TVF { T, VF: 0.0 }, z)?.P)
    }

    /// pressure at which the first drop of liquid forms at `T`
    pub fn dew_pressure(&self, T: f64, z: &[f64]) -> Result<f64, FlashError> {
        Ok(self.flash(FlashSpec::TVF { T, VF: 1.0 }, z)?.P)
    }

    pub fn bubble_temperature(&self, P: f64, z: &[f64]) -> Result<f64, FlashError> {
        Ok(self.flash(FlashSpec::PVF { P, VF: 0.0 }, z)?.T)
    }

    pub fn dew_temperature(&self, P: f64, z: &[f64]) -> Result<f64, FlashError> {
        Ok(self.flash(FlashSpec::PVF { P, VF: 1.0 }, z)?.T)
    }

    /// Feed of the right length, entries non-negative (tiny negative values are zeroed),
    /// sum within 1e-6 of one. Returned normalized.
    pub(crate) fn checked_feed(&self, z: &[f64]) -> Result<Vec<f64>, FlashError> {
        let n = self.mixture.len();
        if z.len() != n {
            return Err(FlashError::InvalidComposition(format!(
                "feed has {} entries, the mixture has {} compounds",
                z.len(),
                n
            )));
        }
        if let Some(bad) = z.iter().find(|zi| !zi.is_finite() || **zi < -FEED_NEGATIVE_TOL) {
            return Err(FlashError::InvalidComposition(format!(
                "feed mole fraction {} is negative or not finite",
                bad
            )));
        }
        let mut z: Vec<f64> = z.iter().map(|zi| zi.max(0.0)).collect();
        let sum: f64 = z.iter().sum();
        if (sum - 1.0).abs() > FEED_SUM_TOL {
            return Err(FlashError::InvalidComposition(format!(
                "feed mole fractions sum to {}",
                sum
            )));
        }
        z.iter_mut().for_each(|zi| *zi /= sum);
        Ok(z)
    }

    /// TP flash of a checked feed; `spec` is the specification reported in the result.
    pub(crate) fn tp_flash(
        &self,
        spec: FlashSpec,
        T: f64,
        P: f64,
        z: &[f64],
    ) -> Result<FlashResult, FlashError> {
        let n = z.len();
        let names = self.mixture.names();
        let phase_limit = self.settings.phase_limit(n);
        let mut tracker = StageTracker::new(4 * (phase_limit + 2) + 8);
        let mut info = ConvergenceInfo::default();

        tracker.advance(FlashStage::PhaseCountGuess, 0.0)?;
        let kind = single_phase_guess(&self.models, T, P, z).map_err(|e| tracker.fail(e))?;
        debug!("single-phase guess at T = {}, P = {}: {}", T, P, kind);
        let mut phases = vec![PhaseSlot::new(kind, z.to_vec(), 1.0)];
        let tester = StabilityTester::new(&self.models, &self.settings.stability);

        loop {
            tracker.advance(FlashStage::StabilityCheck, info.residual)?;
            let states: Vec<_> = phases.iter().map(|p| p.state(T, P, names)).collect();
            let mut split = None;
            for k in 0..states.len() {
                let others: Vec<_> = states
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != k)
                    .map(|(_, s)| s.clone())
                    .collect();
                let report = tester.analyze(&states[k], &others).map_err(|e| tracker.fail(e))?;
                info.stability_inconclusive.extend(report.inconclusive);
                if let Some(point) = report.stationary_points.into_iter().next() {
                    split = Some(point);
                    break;
                }
            }
            let Some(point) = split else {
                break;
            };
            if phases.len() >= phase_limit {
                warn!(
                    "{} at T = {}, P = {}: phase limit {} reached with an unstable phase (tm = {:e})",
                    spec, T, P, phase_limit, point.tpd
                );
                info.phase_limit_reached = true;
                break;
            }
            debug!(
                "adding a {} phase from trial {} (tm = {:e})",
                point.kind, point.trial_index, point.tpd
            );
            tracker.advance(FlashStage::PhaseCountGuess, info.residual)?;
            phases.iter_mut().for_each(|p| p.beta *= 0.9);
            phases.push(PhaseSlot::new(point.kind, point.composition, 0.1));

            tracker.advance(FlashStage::InnerEquilibriumIteration, info.residual)?;
            let outcome = equilibrate(&self.models, &self.settings, T, P, z, phases)
                .map_err(|e| tracker.fail(e))?;
            info.inner_iterations += outcome.iterations;
            info.residual = outcome.residual;
            phases = outcome.phases;
        }

        tracker.advance(FlashStage::Converged, info.residual)?;
        let mut result = self
            .assemble(spec, T, P, z, &phases, info)
            .map_err(|e| tracker.fail(e))?;
        tracker.advance(FlashStage::Terminal(Outcome::Success), result.convergence.residual)?;
        result.convergence.stage_transitions = tracker.transitions;
        Ok(result)
    }

    /// Properties of every phase and of the mixture, phases sorted by kind and molar
    /// volume. Phases of zero fraction are kept.
    pub(crate) fn assemble(
        &self,
        spec: FlashSpec,
        T: f64,
        P: f64,
        z: &[f64],
        slots: &[PhaseSlot],
        mut convergence: ConvergenceInfo,
    ) -> Result<FlashResult, FlashError> {
        let names = self.mixture.names();
        let total: f64 = slots.iter().map(|s| s.beta).sum();
        let mut phases = Vec::with_capacity(slots.len());
        for slot in slots {
            let model = fluid_model(&self.models, slot.kind)?;
            phases.push(PhaseResult {
                state: slot.state(T, P, names),
                fraction: if total > 0.0 { slot.beta / total } else { slot.beta },
                ln_fugacity_coefficients: model.ln_fugacity_coefficients(T, P, &slot.x)?,
                H: model.molar_enthalpy(T, P, &slot.x)?,
                S: model.molar_entropy(T, P, &slot.x)?,
                V: model.molar_volume(T, P, &slot.x)?,
            });
        }
        phases.sort_by(|a, b| a.kind().cmp(&b.kind()).then(a.V.total_cmp(&b.V)));
        convergence.supersaturated_solids = self.supersaturated_solids(T, P, &phases);

        let H = phases.iter().map(|p| p.fraction * p.H).sum();
        let S = phases.iter().map(|p| p.fraction * p.S).sum();
        let V = phases.iter().map(|p| p.fraction * p.V).sum();
        debug!("{} at T = {}, P = {}: {} phase(s)", spec, T, P, phases.len());
        Ok(FlashResult {
            spec,
            T,
            P,
            z: z.to_vec(),
            names: names.to_vec(),
            phases,
            H,
            S,
            V,
            convergence,
        })
    }

    /// Compounds whose pure solid has a lower fugacity than in the fluid phases.
    fn supersaturated_solids(&self, T: f64, P: f64, phases: &[PhaseResult]) -> Vec<String> {
        let mut found = Vec::new();
        let Some(phase) = phases.iter().find(|p| p.kind() != PhaseKind::Solid) else {
            return found;
        };
        for solid in &self.models.solids {
            let i = solid.index();
            let x = phase.composition()[i];
            if x <= 0.0 {
                continue;
            }
            let ln_phi_solid = match solid.ln_phi_pure(T, P) {
                Ok(v) => v,
                Err(e) => {
                    debug!("solid check of {} skipped: {}", self.mixture.names()[i], e);
                    continue;
                }
            };
            if ln_phi_solid < x.ln() + phase.ln_fugacity_coefficients[i] {
                let name = self.mixture.names()[i].clone();
                warn!(
                    "{} is supersaturated at T = {}, P = {}: solid would precipitate",
                    name, T, P
                );
                found.push(name);
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Thermodynamics::test_compounds::{benzene, mixture, toluene};

    fn solver() -> FlashSolver {
        FlashSolver::new(
            mixture(vec![benzene(), toluene()]),
            ThermoModel::Ideal,
            FlashSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_feed_checks() {
        let s = solver();
        assert!(matches!(
            s.checked_feed(&[1.0]),
            Err(FlashError::InvalidComposition(_))
        ));
        assert!(matches!(
            s.checked_feed(&[1.2, -0.2]),
            Err(FlashError::InvalidComposition(_))
        ));
        assert!(matches!(
            s.checked_feed(&[0.5, 0.6]),
            Err(FlashError::InvalidComposition(_))
        ));
        let z = s.checked_feed(&[1.0 + 1e-13, -1e-13]).unwrap();
        assert_eq!(z[1], 0.0);
        assert!((z[0] - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_stage_limit() {
        let mut tracker = StageTracker::new(2);
        assert!(tracker.advance(FlashStage::PhaseCountGuess, 0.0).is_ok());
        assert!(tracker.advance(FlashStage::StabilityCheck, 0.0).is_ok());
        assert!(matches!(
            tracker.advance(FlashStage::PhaseCountGuess, 0.5),
            Err(FlashError::Convergence {
                stage: ConvergenceStage::Inner,
                ..
            })
        ));
        assert_eq!(tracker.stage, FlashStage::Terminal(Outcome::Failure));
    }

    #[test]
    fn test_subcooled_liquid_is_single_phase() {
        let s = solver();
        let r = s.flash_tp(300.0, 101325.0, &[0.4, 0.6]).unwrap();
        assert_eq!(r.phase_count(), 1);
        assert_eq!(r.phases[0].kind(), PhaseKind::Liquid);
        assert_eq!(r.phases[0].composition(), &[0.4, 0.6]);
        assert!(r.convergence.stage_transitions >= 4);
    }
}
