//! # Phase stability
//!
//! Tangent-plane distance analysis in Michelsen's modified form. With
//! `d_i = ln z_i + ln φ_i^ref(z)` and unnormalized trial mole numbers `W`,
//!
//! `tm(W) = 1 + Σ W_i (ln W_i + ln φ_i^trial(w) - d_i - 1)`
//!
//! is stationary where `ln W_i = d_i - ln φ_i^trial(w)`, which is iterated by successive
//! substitution. At a stationary point `tm = 1 - Σ W_i`; a negative value proves the
//! reference phase unstable and gives the composition of a new phase.
//!
//! The search is non-convex, so several seeds are run. [`TrialIterator`] yields them in a
//! fixed order: Wilson vapor-like `z·K`, Wilson liquid-like `z/K`, one near-pure liquid per
//! compound, one perturbation of the reference per compound.
use super::flash_api::{FlashError, StabilityInconclusive};
use super::k_values::estimate_k_values;
use crate::Thermodynamics::phase_model_api::PhaseModel;
use crate::Thermodynamics::phase_state::{PhaseKind, PhaseState};
use crate::Thermodynamics::thermo_model::PhaseModels;
use crate::Utils::numerics::clamp_normalize;
use crate::settings::StabilitySettings;
use log::{debug, warn};
use std::cmp::Ordering;

const PERTURBATION: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedKind {
    WilsonVapor,
    WilsonLiquid,
    NearPure(usize),
    Perturbation(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrialSeed {
    /// position in the seed sequence
    pub index: usize,
    pub seed: SeedKind,
    /// phase model the trial is evaluated with
    pub kind: PhaseKind,
    pub w: Vec<f64>,
}

/// Lazy, finite and restartable sequence of `2 + 2n` trial seeds.
#[derive(Debug, Clone)]
pub struct TrialIterator {
    z: Vec<f64>,
    K: Vec<f64>,
    reference_kind: PhaseKind,
    pure_fraction: f64,
    position: usize,
}

impl TrialIterator {
    pub fn new(z: &[f64], K: &[f64], reference_kind: PhaseKind, pure_fraction: f64) -> Self {
        Self {
            z: z.to_vec(),
            K: K.to_vec(),
            reference_kind,
            pure_fraction,
            position: 0,
        }
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }

    fn total(&self) -> usize {
        2 + 2 * self.z.len()
    }

    fn seed_at(&self, position: usize) -> Option<TrialSeed> {
        let n = self.z.len();
        let (seed, kind, mut w) = match position {
            0 => (
                SeedKind::WilsonVapor,
                PhaseKind::Vapor,
                self.z.iter().zip(&self.K).map(|(z, k)| z * k).collect::<Vec<f64>>(),
            ),
            1 => (
                SeedKind::WilsonLiquid,
                PhaseKind::Liquid,
                self.z.iter().zip(&self.K).map(|(z, k)| z / k).collect(),
            ),
            p if p < 2 + n => {
                let i = p - 2;
                let w = if n == 1 {
                    vec![1.0]
                } else {
                    let rest = (1.0 - self.pure_fraction) / (n - 1) as f64;
                    (0..n).map(|j| if j == i { self.pure_fraction } else { rest }).collect()
                };
                (SeedKind::NearPure(i), PhaseKind::Liquid, w)
            }
            p if p < 2 + 2 * n => {
                let i = p - 2 - n;
                let mut w = self.z.clone();
                w[i] += PERTURBATION;
                (SeedKind::Perturbation(i), self.reference_kind, w)
            }
            _ => return None,
        };
        clamp_normalize(&mut w);
        Some(TrialSeed {
            index: position,
            seed,
            kind,
            w,
        })
    }
}

impl Iterator for TrialIterator {
    type Item = TrialSeed;

    fn next(&mut self) -> Option<TrialSeed> {
        let seed = self.seed_at(self.position)?;
        self.position += 1;
        Some(seed)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total().saturating_sub(self.position);
        (left, Some(left))
    }
}

impl ExactSizeIterator for TrialIterator {}

#[derive(Debug, Clone, PartialEq)]
pub struct StationaryPoint {
    pub trial_index: usize,
    pub seed: SeedKind,
    pub kind: PhaseKind,
    /// normalized trial composition
    pub composition: Vec<f64>,
    /// modified tangent-plane distance `1 - Σ W`
    pub tpd: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum TrialOutcome {
    Stationary(StationaryPoint),
    Inconclusive(StabilityInconclusive),
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StabilityReport {
    /// no distinct stationary point with negative tangent-plane distance was found
    pub stable: bool,
    /// distinct negative stationary points, most negative first
    pub stationary_points: Vec<StationaryPoint>,
    pub inconclusive: Vec<StabilityInconclusive>,
    pub trials_run: usize,
}

impl StabilityReport {
    /// every trial converged or was rejected by its phase model
    pub fn is_conclusive(&self) -> bool {
        self.inconclusive.is_empty()
    }
}

pub struct StabilityTester<'a> {
    models: &'a PhaseModels,
    settings: &'a StabilitySettings,
}

impl<'a> StabilityTester<'a> {
    pub fn new(models: &'a PhaseModels, settings: &'a StabilitySettings) -> Self {
        Self { models, settings }
    }

    /// Seeds for `reference`; without usable K-value estimates every K is one.
    pub fn trials(&self, reference: &PhaseState) -> TrialIterator {
        let K = estimate_k_values(self.models.mixture(), reference.T, reference.P)
            .unwrap_or_else(|e| {
                debug!("no K-value estimate for stability seeds: {}", e);
                vec![1.0; reference.composition.len()]
            });
        TrialIterator::new(
            &reference.composition,
            &K,
            reference.kind,
            self.settings.pure_trial_fraction,
        )
    }

    pub fn is_stable(&self, reference: &PhaseState) -> Result<bool, FlashError> {
        Ok(self.analyze(reference, &[])?.stable)
    }

    /// compositions of the distinct phases that lower the Gibbs energy, if any
    pub fn find_split(&self, reference: &PhaseState) -> Result<Option<Vec<PhaseState>>, FlashError> {
        let report = self.analyze(reference, &[])?;
        if report.stable {
            return Ok(None);
        }
        Ok(Some(
            report
                .stationary_points
                .into_iter()
                .map(|p| {
                    PhaseState::new(p.kind, reference.T, reference.P, p.composition, &reference.names)
                })
                .collect(),
        ))
    }

    /// Runs every trial against `reference`. Stationary points that reproduce the
    /// reference or one of `existing` (same kind, compositions within the dedup tolerance)
    /// are trivial and dropped.
    pub fn analyze(
        &self,
        reference: &PhaseState,
        existing: &[PhaseState],
    ) -> Result<StabilityReport, FlashError> {
        let model = self.models.fluid(reference.kind).ok_or_else(|| {
            FlashError::UnsupportedSpecification("stability test of a solid phase".to_string())
        })?;
        let (T, P) = (reference.T, reference.P);
        let z = &reference.composition;
        let ln_phi_ref = model.ln_fugacity_coefficients(T, P, z)?;
        let d: Vec<Option<f64>> = z
            .iter()
            .zip(&ln_phi_ref)
            .map(|(zi, l)| if *zi > 0.0 { Some(zi.ln() + l) } else { None })
            .collect();

        let mut report = StabilityReport::default();
        let mut points = Vec::new();
        for seed in self.trials(reference) {
            report.trials_run += 1;
            match self.run_trial(&seed, &d, T, P) {
                TrialOutcome::Stationary(point) => points.push(point),
                TrialOutcome::Inconclusive(record) => {
                    warn!("{}", record);
                    report.inconclusive.push(record);
                }
                TrialOutcome::Skipped => {}
            }
        }

        let tol = self.settings.dedup_tolerance;
        let same = |kind: PhaseKind, a: &[f64], b: &PhaseState| {
            b.kind == kind && b.distance(a) < tol
        };
        let mut kept: Vec<StationaryPoint> = Vec::new();
        for point in points {
            if same(point.kind, &point.composition, reference)
                || existing.iter().any(|e| same(point.kind, &point.composition, e))
            {
                debug!("trial {} is trivial (tm = {:e})", point.trial_index, point.tpd);
                continue;
            }
            if point.tpd >= -self.settings.tpd_tolerance {
                continue;
            }
            let duplicate = kept.iter().any(|k| {
                k.kind == point.kind
                    && k.composition
                        .iter()
                        .zip(&point.composition)
                        .all(|(a, b)| (a - b).abs() < tol)
            });
            if !duplicate {
                kept.push(point);
            }
        }
        kept.sort_by(|a, b| match a.tpd.total_cmp(&b.tpd) {
            Ordering::Equal => a.trial_index.cmp(&b.trial_index),
            other => other,
        });
        report.stable = kept.is_empty();
        report.stationary_points = kept;
        debug!(
            "stability of {} at T = {}, P = {}: {} trials, {} negative stationary point(s)",
            reference.kind,
            T,
            P,
            report.trials_run,
            report.stationary_points.len()
        );
        Ok(report)
    }

    fn run_trial(&self, seed: &TrialSeed, d: &[Option<f64>], T: f64, P: f64) -> TrialOutcome {
        let Some(model) = self.models.fluid(seed.kind) else {
            return TrialOutcome::Skipped;
        };
        let mut ln_W: Vec<f64> = seed
            .w
            .iter()
            .zip(d)
            .map(|(w, di)| match di {
                Some(_) if *w > 0.0 => w.ln(),
                _ => f64::NEG_INFINITY,
            })
            .collect();
        let mut delta = f64::INFINITY;
        for it in 1..=self.settings.max_iterations {
            let mut w: Vec<f64> = ln_W.iter().map(|l| l.exp()).collect();
            clamp_normalize(&mut w);
            let ln_phi = match model.ln_fugacity_coefficients(T, P, &w) {
                Ok(v) => v,
                Err(e) => {
                    debug!("trial {} ({:?}) skipped: {}", seed.index, seed.seed, e);
                    return TrialOutcome::Skipped;
                }
            };
            delta = 0.0;
            for i in 0..w.len() {
                if let Some(di) = d[i] {
                    let next = di - ln_phi[i];
                    let change = if ln_W[i].is_finite() {
                        (next - ln_W[i]).abs()
                    } else {
                        f64::INFINITY
                    };
                    delta = f64::max(delta, change);
                    ln_W[i] = next;
                }
            }
            if ln_W.iter().any(|l| l.is_nan() || *l == f64::INFINITY) {
                debug!("trial {} ({:?}) diverged", seed.index, seed.seed);
                return TrialOutcome::Skipped;
            }
            if delta < self.settings.tolerance {
                let W: Vec<f64> = ln_W.iter().map(|l| l.exp()).collect();
                let tpd = 1.0 - W.iter().sum::<f64>();
                let mut composition = W;
                clamp_normalize(&mut composition);
                return TrialOutcome::Stationary(StationaryPoint {
                    trial_index: seed.index,
                    seed: seed.seed,
                    kind: seed.kind,
                    composition,
                    tpd,
                    iterations: it,
                });
            }
        }
        TrialOutcome::Inconclusive(StabilityInconclusive {
            trial_index: seed.index,
            trial_kind: seed.kind,
            iterations: self.settings.max_iterations,
            residual: delta,
        })
    }
}
