//! # Rachford-Rice
//!
//! Vapor fraction `β` of a two-phase split from K-values:
//!
//! `f(β) = Σ z_i (K_i - 1) / (1 + β (K_i - 1)) = 0`, `x_i = z_i / (1 + β(K_i - 1))`, `y_i = K_i x_i`
//!
//! `f` decreases monotonically in β. When `f(0) <= 0` the feed is at or below its bubble
//! point and `β = 0`; when `f(1) >= 0` it is at or above its dew point and `β = 1`. Otherwise
//! the root is interior and every method below keeps its iterate inside the
//! Li-Johns-Ahmadi bounds clamped to [0, 1].
//!
//! For three or more phases [`solve_multiphase`] runs a damped Newton iteration on the
//! generalized equations with an LU factorization of the Jacobian.
use super::flash_api::{ConvergenceStage, FlashError};
use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RachfordRiceMethod {
    /// Newton steps inside a shrinking bracket, bisection when a step leaves it
    #[default]
    NewtonBisection,
    /// same safeguard with Halley steps
    Halley,
    /// transformed objective in the liquid mole fraction of the most volatile compound
    LiJohnsAhmadi,
    /// closed form for two compounds, Newton-bisection otherwise
    Analytical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RachfordRiceSolution {
    pub beta: f64,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub iterations: usize,
}

pub fn objective(z: &[f64], K: &[f64], beta: f64) -> f64 {
    z.iter()
        .zip(K)
        .map(|(zi, Ki)| zi * (Ki - 1.0) / (1.0 + beta * (Ki - 1.0)))
        .sum()
}

/// `(f, f', f'')`
pub fn objective_derivatives(z: &[f64], K: &[f64], beta: f64) -> (f64, f64, f64) {
    let mut f = 0.0;
    let mut df = 0.0;
    let mut d2f = 0.0;
    for (zi, Ki) in z.iter().zip(K) {
        let k1 = Ki - 1.0;
        let t = 1.0 / (1.0 + beta * k1);
        let term = zi * k1 * t;
        f += term;
        df -= term * k1 * t;
        d2f += 2.0 * term * k1 * k1 * t * t;
    }
    (f, df, d2f)
}

/// Li-Johns-Ahmadi bounds of the interior root, clamped to [0, 1].
pub fn bounds(z: &[f64], K: &[f64]) -> (f64, f64) {
    let mut k_min = f64::INFINITY;
    let mut k_max = f64::NEG_INFINITY;
    let mut z_of_k_max = 0.0;
    for (zi, Ki) in z.iter().zip(K) {
        if *zi <= 0.0 {
            continue;
        }
        if *Ki < k_min {
            k_min = *Ki;
        }
        if *Ki > k_max {
            k_max = *Ki;
            z_of_k_max = *zi;
        }
    }
    if !(k_min < 1.0 && k_max > 1.0) {
        return (0.0, 1.0);
    }
    let lo = ((k_max - k_min) * z_of_k_max - (1.0 - k_min)) / ((1.0 - k_min) * (k_max - 1.0));
    let hi = 1.0 / (1.0 - k_min);
    (lo.clamp(0.0, 1.0), hi.clamp(0.0, 1.0))
}

/// `β` of a binary in closed form; `None` when a K-value equals one.
pub fn analytical_binary(z: &[f64], K: &[f64]) -> Option<f64> {
    if z.len() != 2 {
        return None;
    }
    let (k1, k2) = (K[0] - 1.0, K[1] - 1.0);
    let denom = k1 * k2;
    if denom == 0.0 {
        return None;
    }
    Some(-(z[0] * k1 + z[1] * k2) / denom)
}

fn compositions(z: &[f64], K: &[f64], beta: f64) -> (Vec<f64>, Vec<f64>) {
    let x: Vec<f64> = z
        .iter()
        .zip(K)
        .map(|(zi, Ki)| zi / (1.0 + beta * (Ki - 1.0)))
        .collect();
    let y = x.iter().zip(K).map(|(xi, Ki)| Ki * xi).collect();
    (x, y)
}

fn solution(z: &[f64], K: &[f64], beta: f64, iterations: usize) -> RachfordRiceSolution {
    let beta = beta.clamp(0.0, 1.0);
    let (x, y) = compositions(z, K, beta);
    RachfordRiceSolution {
        beta,
        x,
        y,
        iterations,
    }
}

fn not_converged(iterations: usize, residual: f64) -> FlashError {
    FlashError::Convergence {
        stage: ConvergenceStage::RachfordRice,
        iterations,
        residual,
    }
}

/// A Newton-type step is kept when it lands inside `[lo, hi]` or within `tol` of an edge,
/// otherwise the bracket is bisected. The flag tells which one happened.
fn safeguarded(step_to: f64, lo: f64, hi: f64, tol: f64) -> (f64, bool) {
    if step_to.is_finite() && step_to > lo - tol && step_to < hi + tol {
        (step_to.clamp(lo, hi), false)
    } else {
        (0.5 * (lo + hi), true)
    }
}

/// Safeguarded Newton (or Halley) on `f(β)` inside `[lo, hi]`.
fn bracketed(
    z: &[f64],
    K: &[f64],
    mut lo: f64,
    mut hi: f64,
    halley: bool,
    tol: f64,
    max_iter: usize,
) -> Result<(f64, usize), FlashError> {
    // the LJA bounds are analytical, the solver trusts only signs
    if objective(z, K, lo) < 0.0 {
        lo = 0.0;
    }
    if objective(z, K, hi) > 0.0 {
        hi = 1.0;
    }
    let mut beta = 0.5 * (lo + hi);
    let mut f = 0.0;
    for it in 1..=max_iter {
        let (fv, df, d2f) = objective_derivatives(z, K, beta);
        f = fv;
        if f.abs() < tol * tol {
            return Ok((beta, it));
        }
        if f > 0.0 {
            lo = beta;
        } else {
            hi = beta;
        }
        let step = if halley {
            2.0 * f * df / (2.0 * df * df - f * d2f)
        } else {
            f / df
        };
        let (next, bisected) = safeguarded(beta - step, lo, hi, tol);
        let change = (next - beta).abs();
        beta = next;
        if hi - lo < tol || (!bisected && change < tol) {
            return Ok((beta, it));
        }
    }
    Err(not_converged(max_iter, f.abs()))
}

/// Li-Johns-Ahmadi: solves for the liquid mole fraction `x_1` of the compound with the
/// largest K and maps it back to `β`.
fn li_johns_ahmadi(z: &[f64], K: &[f64], tol: f64, max_iter: usize) -> Result<(f64, usize), FlashError> {
    let mut order: Vec<usize> = (0..z.len()).filter(|i| z[*i] > 0.0).collect();
    // stable sort on descending K keeps index order between equal K-values
    order.sort_by(|a, b| K[*b].total_cmp(&K[*a]));
    let first = order[0];
    let last = order[order.len() - 1];
    let (k1, z1, kn) = (K[first], z[first], K[last]);
    let t1 = (k1 - kn) / (kn - 1.0);
    let middle: Vec<(f64, f64, f64)> = order[1..order.len() - 1]
        .iter()
        .map(|i| {
            let (ki, zi) = (K[*i], z[*i]);
            // term = c x1 / (a + b x1)
            ((ki - 1.0) * z1, k1 - ki, (ki - kn) / (kn - 1.0) * zi * (k1 - 1.0))
        })
        .collect();
    let g = |x1: f64| -> (f64, f64) {
        let mut v = 1.0 + t1 * x1;
        let mut dv = t1;
        for (a, b, c) in &middle {
            let den = a + b * x1;
            v += c * x1 / den;
            dv += c * a / (den * den);
        }
        (v, dv)
    };
    let mut lo = ((1.0 - kn) / (k1 - kn) * z1).max(0.0);
    let mut hi = ((1.0 - kn) / (k1 - kn)).min(1.0);
    let (g_lo, _) = g(lo);
    let (g_hi, _) = g(hi);
    if g_lo * g_hi > 0.0 {
        debug!("Li-Johns-Ahmadi bracket lost, using Newton-bisection");
        let (blo, bhi) = bounds(z, K);
        return bracketed(z, K, blo, bhi, false, tol, max_iter);
    }
    let increasing = g_hi > g_lo;
    let mut x1 = 0.5 * (lo + hi);
    for it in 1..=max_iter {
        let (v, dv) = g(x1);
        if v.abs() < tol * tol {
            return Ok(((z1 - x1) / (x1 * (k1 - 1.0)), it));
        }
        if (v > 0.0) == increasing {
            hi = x1;
        } else {
            lo = x1;
        }
        let (next, bisected) = safeguarded(x1 - v / dv, lo, hi, tol * x1.max(tol));
        let change = (next - x1).abs();
        x1 = next;
        if hi - lo < tol * x1.max(tol) || (!bisected && change < tol * x1.max(tol)) {
            return Ok(((z1 - x1) / (x1 * (k1 - 1.0)), it));
        }
    }
    Err(not_converged(max_iter, g(x1).0.abs()))
}

/// Two-phase Rachford-Rice. The returned `β` is always within [0, 1].
pub fn solve(
    z: &[f64],
    K: &[f64],
    method: RachfordRiceMethod,
    tol: f64,
    max_iter: usize,
) -> Result<RachfordRiceSolution, FlashError> {
    if objective(z, K, 0.0) <= 0.0 {
        return Ok(solution(z, K, 0.0, 0));
    }
    if objective(z, K, 1.0) >= 0.0 {
        return Ok(solution(z, K, 1.0, 0));
    }
    let (lo, hi) = bounds(z, K);
    let (beta, iterations) = match method {
        RachfordRiceMethod::NewtonBisection => bracketed(z, K, lo, hi, false, tol, max_iter)?,
        RachfordRiceMethod::Halley => bracketed(z, K, lo, hi, true, tol, max_iter)?,
        RachfordRiceMethod::LiJohnsAhmadi => li_johns_ahmadi(z, K, tol, max_iter)?,
        RachfordRiceMethod::Analytical => match analytical_binary(z, K) {
            Some(beta) => (beta, 0),
            None => bracketed(z, K, lo, hi, false, tol, max_iter)?,
        },
    };
    Ok(solution(z, K, beta, iterations))
}

/// Multiphase Rachford-Rice with phase 0 as reference.
///
/// `K[k][i] = x_i^(k+1) / x_i^0` for the `m - 1` other phases, `beta0` holds the starting
/// fractions of those phases. Returns the fractions of all `m` phases, reference first.
/// Steps are halved until every `t_i = 1 + Σ_k β_k (K_ik - 1)` stays positive.
pub fn solve_multiphase(
    z: &[f64],
    K: &[Vec<f64>],
    beta0: &[f64],
    tol: f64,
    max_iter: usize,
) -> Result<(Vec<f64>, usize), FlashError> {
    let n = z.len();
    let m = K.len();
    let t_of = |beta: &[f64]| -> Vec<f64> {
        (0..n)
            .map(|i| 1.0 + (0..m).map(|k| beta[k] * (K[k][i] - 1.0)).sum::<f64>())
            .collect()
    };
    let mut beta = beta0.to_vec();
    let mut residual = f64::INFINITY;
    for it in 1..=max_iter {
        let t = t_of(&beta);
        let F = DVector::from_fn(m, |k, _| {
            (0..n).map(|i| z[i] * (K[k][i] - 1.0) / t[i]).sum::<f64>()
        });
        residual = F.amax();
        if residual < tol {
            return Ok((with_reference(beta), it));
        }
        let J = DMatrix::from_fn(m, m, |k, l| {
            -(0..n)
                .map(|i| z[i] * (K[k][i] - 1.0) * (K[l][i] - 1.0) / (t[i] * t[i]))
                .sum::<f64>()
        });
        let Some(step) = J.lu().solve(&(-F)) else {
            debug!("singular multiphase Rachford-Rice Jacobian at iteration {}", it);
            break;
        };
        let mut alpha = 1.0;
        let mut trial: Vec<f64> = beta.iter().zip(step.iter()).map(|(b, s)| b + s).collect();
        while t_of(&trial).iter().any(|ti| *ti <= 0.0) && alpha > 1e-10 {
            alpha *= 0.5;
            trial = beta.iter().zip(step.iter()).map(|(b, s)| b + alpha * s).collect();
        }
        for b in trial.iter_mut() {
            *b = b.clamp(0.0, 1.0);
        }
        let total: f64 = trial.iter().sum();
        if total > 1.0 {
            trial.iter_mut().for_each(|b| *b /= total);
        }
        let change = trial
            .iter()
            .zip(&beta)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        beta = trial;
        if change < tol {
            return Ok((with_reference(beta), it));
        }
    }
    Err(not_converged(max_iter, residual))
}

fn with_reference(beta: Vec<f64>) -> Vec<f64> {
    let rest: f64 = beta.iter().sum();
    let mut all = Vec::with_capacity(beta.len() + 1);
    all.push((1.0 - rest).max(0.0));
    all.extend(beta);
    all
}
