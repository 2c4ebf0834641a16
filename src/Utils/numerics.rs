//! Small numerical kernels: adaptive Simpson quadrature (the fallback integral of
//! correlations without a closed-form antiderivative), central differences and the
//! real roots of a monic cubic.
use std::f64::consts::PI;

const INITIAL_PANELS: usize = 8;
const MAX_DEPTH: usize = 40;

/// Integral of `f` over `[a, b]` to relative tolerance `rel_tol`.
/// `a > b` gives the negated integral, `a == b` gives zero.
pub fn integrate_adaptive<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64, rel_tol: f64) -> f64 {
    if a == b {
        return 0.0;
    }
    let (lo, hi, sign) = if a < b { (a, b, 1.0) } else { (b, a, -1.0) };
    let h = (hi - lo) / INITIAL_PANELS as f64;
    // coarse composite estimate fixes the absolute scale of the tolerance
    let mut panels = Vec::with_capacity(INITIAL_PANELS);
    let mut coarse = 0.0;
    for k in 0..INITIAL_PANELS {
        let x0 = lo + h * k as f64;
        let x1 = if k + 1 == INITIAL_PANELS { hi } else { x0 + h };
        let (f0, fm, f1) = (f(x0), f(0.5 * (x0 + x1)), f(x1));
        let whole = (x1 - x0) / 6.0 * (f0 + 4.0 * fm + f1);
        coarse += whole.abs();
        panels.push((x0, x1, f0, fm, f1, whole));
    }
    let abs_tol = (rel_tol * coarse).max(f64::MIN_POSITIVE) / INITIAL_PANELS as f64;
    let total: f64 = panels
        .into_iter()
        .map(|(x0, x1, f0, fm, f1, whole)| simpson_step(f, x0, x1, f0, fm, f1, whole, abs_tol, MAX_DEPTH))
        .sum();
    sign * total
}

#[allow(clippy::too_many_arguments)]
fn simpson_step<F: Fn(f64) -> f64>(
    f: &F,
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
    tol: f64,
    depth: usize,
) -> f64 {
    let m = 0.5 * (a + b);
    let lm = 0.5 * (a + m);
    let rm = 0.5 * (m + b);
    let flm = f(lm);
    let frm = f(rm);
    let left = (m - a) / 6.0 * (fa + 4.0 * flm + fm);
    let right = (b - m) / 6.0 * (fm + 4.0 * frm + fb);
    let delta = left + right - whole;
    if depth == 0 || delta.abs() <= 15.0 * tol || !delta.is_finite() {
        return left + right + delta / 15.0;
    }
    simpson_step(f, a, m, fa, flm, fm, left, 0.5 * tol, depth - 1)
        + simpson_step(f, m, b, fm, frm, fb, right, 0.5 * tol, depth - 1)
}

/// Central difference with a step relative to `x`. Errors of `f` are passed through.
pub fn central_difference<E, F>(f: F, x: f64, rel_step: f64) -> Result<f64, E>
where
    F: Fn(f64) -> Result<f64, E>,
{
    let h = rel_step * x.abs().max(1.0);
    Ok((f(x + h)? - f(x - h)?) / (2.0 * h))
}

/// Real roots of `z³ + c2 z² + c1 z + c0`, ascending, each polished by two Newton steps.
pub fn cubic_real_roots(c2: f64, c1: f64, c0: f64) -> Vec<f64> {
    let p = c1 - c2 * c2 / 3.0;
    let q = 2.0 * c2.powi(3) / 27.0 - c2 * c1 / 3.0 + c0;
    let shift = -c2 / 3.0;
    let disc = (0.5 * q).powi(2) + (p / 3.0).powi(3);
    let mut roots = if disc > 0.0 {
        let sq = disc.sqrt();
        vec![(-0.5 * q + sq).cbrt() + (-0.5 * q - sq).cbrt() + shift]
    } else if p.abs() < 1e-300 {
        vec![shift]
    } else {
        let r = (-p / 3.0).sqrt();
        let phi = ((-0.5 * q) / r.powi(3)).clamp(-1.0, 1.0).acos();
        (0..3)
            .map(|k| 2.0 * r * ((phi + 2.0 * PI * k as f64) / 3.0).cos() + shift)
            .collect()
    };
    for z in roots.iter_mut() {
        for _ in 0..2 {
            let f = ((*z + c2) * *z + c1) * *z + c0;
            let df = (3.0 * *z + 2.0 * c2) * *z + c1;
            if df.abs() > 1e-300 {
                *z -= f / df;
            }
        }
    }
    roots.sort_by(|a, b| a.total_cmp(b));
    roots
}

/// `x ln x` with the `x -> 0` limit
pub fn xlnx(x: f64) -> f64 {
    if x > 0.0 { x * x.ln() } else { 0.0 }
}

/// Clamps negative entries to zero and rescales to unit sum. A vector with no positive
/// entry is returned unchanged.
pub fn clamp_normalize(x: &mut [f64]) {
    for xi in x.iter_mut() {
        if !(*xi > 0.0) {
            *xi = 0.0;
        }
    }
    let s: f64 = x.iter().sum();
    if s > 0.0 {
        x.iter_mut().for_each(|xi| *xi /= s);
    }
}
