//! Phase split at fixed temperature and pressure: successive substitution on the
//! K-values `K_ik = φ_i^0 / φ_i^k` of every phase against the first one, with the phase
//! fractions from Rachford-Rice.
use super::flash_api::{ConvergenceStage, FlashError};
use super::rachford_rice::{self, solve_multiphase};
use crate::Thermodynamics::phase_model_api::{PhaseModel, PhaseModelEnum};
use crate::Thermodynamics::phase_state::{PhaseKind, PhaseState};
use crate::Thermodynamics::thermo_model::PhaseModels;
use crate::Utils::numerics::clamp_normalize;
use crate::settings::FlashSettings;
use log::{debug, trace};

/// phases whose fraction drops below this are removed
pub const MIN_PHASE_FRACTION: f64 = 1e-12;

/// a phase of the current split
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSlot {
    pub kind: PhaseKind,
    pub x: Vec<f64>,
    pub beta: f64,
}

impl PhaseSlot {
    pub fn new(kind: PhaseKind, x: Vec<f64>, beta: f64) -> Self {
        Self { kind, x, beta }
    }

    pub fn state(&self, T: f64, P: f64, names: &[String]) -> PhaseState {
        PhaseState::new(self.kind, T, P, self.x.clone(), names)
    }

    fn distance(&self, other: &PhaseSlot) -> f64 {
        self.x
            .iter()
            .zip(&other.x)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone)]
pub struct InnerOutcome {
    pub phases: Vec<PhaseSlot>,
    pub iterations: usize,
    /// max |Δ ln K| of the last step
    pub residual: f64,
}

pub(crate) fn fluid_model(models: &PhaseModels, kind: PhaseKind) -> Result<&PhaseModelEnum, FlashError> {
    models.fluid(kind).ok_or_else(|| {
        FlashError::UnsupportedSpecification("solid phases do not take part in the fluid split".to_string())
    })
}

/// The fluid model of lowest `Σ z ln φ`, i.e. of lowest Gibbs energy at the feed
/// composition. A model that rejects the state is skipped; the first error is returned
/// when none accepts it. Ties keep the vapor.
pub fn single_phase_guess(models: &PhaseModels, T: f64, P: f64, z: &[f64]) -> Result<PhaseKind, FlashError> {
    let mut best: Option<(PhaseKind, f64)> = None;
    let mut first_error = None;
    for m in models.fluids() {
        match m.ln_fugacity_coefficients(T, P, z) {
            Ok(ln_phi) => {
                let g: f64 = z
                    .iter()
                    .zip(&ln_phi)
                    .filter(|(zi, _)| **zi > 0.0)
                    .map(|(zi, l)| zi * l)
                    .sum();
                trace!("single phase {}: Σ z ln φ = {}", m.kind(), g);
                if best.map_or(true, |(_, b)| g < b) {
                    best = Some((m.kind(), g));
                }
            }
            Err(e) => {
                debug!("{} model rejects T = {}, P = {}: {}", m.kind(), T, P, e);
                first_error.get_or_insert(e);
            }
        }
    }
    match (best, first_error) {
        (Some((kind, _)), _) => Ok(kind),
        (None, Some(e)) => Err(e.into()),
        (None, None) => Err(FlashError::InvalidComposition("no fluid phase model".to_string())),
    }
}

/// drops phases below the minimum fraction and phases that coincide with an earlier one
/// of the same kind; returns true when anything was removed
fn remove_phases(phases: &mut Vec<PhaseSlot>, merge_tol: f64) -> bool {
    let before = phases.len();
    phases.retain(|p| p.beta >= MIN_PHASE_FRACTION);
    let mut k = 1;
    while k < phases.len() {
        let merged = (0..k).find(|j| phases[*j].kind == phases[k].kind && phases[*j].distance(&phases[k]) < merge_tol);
        if let Some(j) = merged {
            let gone = phases.remove(k);
            phases[j].beta += gone.beta;
            debug!("{} phase merged into phase {}", gone.kind, j);
        } else {
            k += 1;
        }
    }
    phases.len() != before
}

/// Successive substitution until the largest change of ln K falls below the inner
/// tolerance. Phases are removed on the way; a single remaining phase ends the loop.
pub fn equilibrate(
    models: &PhaseModels,
    settings: &FlashSettings,
    T: f64,
    P: f64,
    z: &[f64],
    mut phases: Vec<PhaseSlot>,
) -> Result<InnerOutcome, FlashError> {
    let n = z.len();
    let tol = settings.tolerances.inner;
    let merge_tol = settings.tolerances.trivial;
    let mut previous: Option<Vec<Vec<f64>>> = None;
    let mut residual = f64::INFINITY;
    for it in 1..=settings.iterations.inner {
        if remove_phases(&mut phases, merge_tol) {
            previous = None;
        }
        let m = phases.len();
        if m < 2 {
            if let Some(p) = phases.first_mut() {
                p.x = z.to_vec();
                p.beta = 1.0;
            }
            return Ok(InnerOutcome {
                phases,
                iterations: it,
                residual: 0.0,
            });
        }
        let ln_phi = phases
            .iter()
            .map(|p| fluid_model(models, p.kind)?.ln_fugacity_coefficients(T, P, &p.x).map_err(FlashError::from))
            .collect::<Result<Vec<Vec<f64>>, FlashError>>()?;
        let ln_K: Vec<Vec<f64>> = (1..m)
            .map(|k| (0..n).map(|i| ln_phi[0][i] - ln_phi[k][i]).collect())
            .collect();
        residual = match &previous {
            Some(prev) => prev
                .iter()
                .flatten()
                .zip(ln_K.iter().flatten())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max),
            None => f64::INFINITY,
        };
        let K: Vec<Vec<f64>> = ln_K.iter().map(|row| row.iter().map(|l| l.exp()).collect()).collect();

        if m == 2 {
            let rr = rachford_rice::solve(
                z,
                &K[0],
                settings.rachford_rice_method,
                settings.tolerances.rachford_rice,
                settings.iterations.rachford_rice,
            )?;
            phases[0].beta = 1.0 - rr.beta;
            phases[1].beta = rr.beta;
            phases[0].x = rr.x;
            phases[1].x = rr.y;
        } else {
            let beta0: Vec<f64> = phases[1..].iter().map(|p| p.beta).collect();
            let (beta, _) = solve_multiphase(
                z,
                &K,
                &beta0,
                settings.tolerances.rachford_rice,
                settings.iterations.rachford_rice,
            )?;
            let t: Vec<f64> = (0..n)
                .map(|i| 1.0 + (0..m - 1).map(|k| beta[k + 1] * (K[k][i] - 1.0)).sum::<f64>())
                .collect();
            let x0: Vec<f64> = (0..n).map(|i| z[i] / t[i]).collect();
            for k in 1..m {
                phases[k].x = (0..n).map(|i| K[k - 1][i] * x0[i]).collect();
            }
            phases[0].x = x0;
            for (p, b) in phases.iter_mut().zip(&beta) {
                p.beta = *b;
            }
        }
        for p in phases.iter_mut() {
            clamp_normalize(&mut p.x);
            p.beta = p.beta.clamp(0.0, 1.0);
        }
        trace!("inner iteration {}: Δ ln K = {:e}", it, residual);
        if residual < tol {
            remove_phases(&mut phases, merge_tol);
            return Ok(InnerOutcome {
                phases,
                iterations: it,
                residual,
            });
        }
        previous = Some(ln_K);
    }
    Err(FlashError::Convergence {
        stage: ConvergenceStage::Inner,
        iterations: settings.iterations.inner,
        residual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_removal_and_merge() {
        let mut phases = vec![
            PhaseSlot::new(PhaseKind::Liquid, vec![0.5, 0.5], 0.6),
            PhaseSlot::new(PhaseKind::Liquid, vec![0.5 + 1e-7, 0.5 - 1e-7], 0.4),
            PhaseSlot::new(PhaseKind::Vapor, vec![0.9, 0.1], 1e-14),
        ];
        assert!(remove_phases(&mut phases, 1e-4));
        assert_eq!(phases.len(), 1);
        assert_eq!(phases[0].beta, 1.0);
        assert!(!remove_phases(&mut phases, 1e-4));
    }
}
