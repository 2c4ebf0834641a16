//! Outer loops around the TP flash.
//!
//! * `PH`, `PS`, `PV`: the temperature is searched, `TH`, `TS`, `TV`: the pressure. The
//!   root of `property(TP flash) - target` is bracketed by expanding from the initial
//!   guess, then refined by Newton steps with a finite-difference slope, falling back to
//!   bisection whenever a step leaves the bracket. A bracket that collapses on a jump of
//!   the property (a pure compound boiling) is resolved with the lever rule.
//! * `TVF`, `PVF`: successive substitution on the K-values of one liquid and one vapor
//!   phase, with a Newton step on ln P or T per iteration.
use super::flash_api::{ConvergenceInfo, ConvergenceStage, FlashError, FlashResult, FlashSpec};
use super::flash_solver::FlashSolver;
use super::inner_loop::{PhaseSlot, fluid_model};
use super::k_values::estimate_k_values;
use super::rachford_rice::objective;
use crate::Thermodynamics::phase_model_api::PhaseModel;
use crate::Thermodynamics::phase_state::PhaseKind;
use crate::Utils::numerics::clamp_normalize;
use log::{debug, trace};

/// bracket expansions per direction
const MAX_EXPANSIONS: usize = 60;
/// relative bracket width at which a jump of the property is assumed
const COLLAPSE_WIDTH: f64 = 1e-10;
/// relative step of the finite-difference slopes
const FD_STEP: f64 = 1e-6;
/// max |ln K| below which a vapor-fraction iteration has fallen onto the trivial solution
const TRIVIAL_LN_K: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Property {
    H,
    S,
    V,
}

impl Property {
    fn of(&self, r: &FlashResult) -> f64 {
        match self {
            Property::H => r.H,
            Property::S => r.S,
            Property::V => r.V,
        }
    }

    /// lower limit of the residual scale
    fn scale_floor(&self) -> f64 {
        match self {
            Property::H => 10.0,
            Property::S => 0.1,
            Property::V => 1e-6,
        }
    }
}

/// the searched variable, with the fixed one
#[derive(Debug, Clone, Copy, PartialEq)]
enum Unknown {
    Temperature { P: f64 },
    Pressure { T: f64 },
}

impl Unknown {
    fn state(&self, u: f64) -> (f64, f64) {
        match *self {
            Unknown::Temperature { P } => (u, P),
            Unknown::Pressure { T } => (T, u),
        }
    }
}

/// one evaluated point of the outer search
struct Point {
    u: f64,
    g: f64,
    result: FlashResult,
}

struct StateSearch<'a> {
    solver: &'a FlashSolver,
    spec: FlashSpec,
    z: &'a [f64],
    unknown: Unknown,
    property: Property,
    target: f64,
    scale: f64,
    bounds: [f64; 2],
    evaluations: usize,
}

impl StateSearch<'_> {
    fn eval(&mut self, u: f64) -> Result<Point, FlashError> {
        let (T, P) = self.unknown.state(u);
        self.evaluations += 1;
        let result = self.solver.tp_flash(self.spec, T, P, self.z)?;
        let g = self.property.of(&result) - self.target;
        trace!("{}: u = {}, residual {:e}", self.spec, u, g / self.scale);
        Ok(Point { u, g, result })
    }

    fn converged(&self, g: f64) -> bool {
        g.abs() <= self.solver.settings().tolerances.outer * self.scale
    }

    /// Expands alternately upward and downward from `start` until the residual changes
    /// sign. A direction ends at its bound or at the first failing flash.
    fn bracket(&mut self, start: Point) -> Result<(Point, Point), FlashError> {
        let factor = match self.unknown {
            Unknown::Temperature { .. } => 1.25,
            Unknown::Pressure { .. } => 4.0,
        };
        let [lo_bound, hi_bound] = self.bounds;
        let mut best = start.g.abs();
        let mut up = Some(Point {
            u: start.u,
            g: start.g,
            result: start.result.clone(),
        });
        let mut down = Some(start);
        for _ in 0..MAX_EXPANSIONS {
            if let Some(prev) = up.take() {
                if prev.u < hi_bound {
                    match self.eval((prev.u * factor).min(hi_bound)) {
                        Ok(p) if p.g.signum() != prev.g.signum() => return Ok((prev, p)),
                        Ok(p) => {
                            best = best.min(p.g.abs());
                            up = Some(p);
                        }
                        Err(e) => debug!("upward bracket search stopped: {}", e),
                    }
                }
            }
            if let Some(prev) = down.take() {
                if prev.u > lo_bound {
                    match self.eval((prev.u / factor).max(lo_bound)) {
                        Ok(p) if p.g.signum() != prev.g.signum() => return Ok((p, prev)),
                        Ok(p) => {
                            best = best.min(p.g.abs());
                            down = Some(p);
                        }
                        Err(e) => debug!("downward bracket search stopped: {}", e),
                    }
                }
            }
            if up.is_none() && down.is_none() {
                break;
            }
        }
        Err(FlashError::Convergence {
            stage: ConvergenceStage::Outer,
            iterations: self.evaluations,
            residual: best / self.scale,
        })
    }

    /// Phases of both sides of a collapsed bracket combined so that the property hits the
    /// target.
    fn lever_rule(&self, a: Point, b: Point) -> Result<FlashResult, FlashError> {
        let (pa, pb) = (a.g + self.target, b.g + self.target);
        let w = if (pb - pa).abs() > 0.0 {
            ((self.target - pa) / (pb - pa)).clamp(0.0, 1.0)
        } else {
            0.5
        };
        let (T, P) = self.unknown.state(0.5 * (a.u + b.u));
        debug!(
            "{}: property jump between {} and {}, lever rule weight {}",
            self.spec, a.u, b.u, w
        );
        let mut slots = Vec::new();
        for (r, weight) in [(&a.result, 1.0 - w), (&b.result, w)] {
            for p in &r.phases {
                slots.push(PhaseSlot::new(p.kind(), p.composition().to_vec(), p.fraction * weight));
            }
        }
        let mut convergence = b.result.convergence.clone();
        convergence.stability_inconclusive.extend(a.result.convergence.stability_inconclusive);
        let mut result = self.solver.assemble(self.spec, T, P, self.z, &slots, convergence)?;
        result.convergence.residual = (self.property.of(&result) - self.target) / self.scale;
        Ok(result)
    }

    fn finish(&self, point: Point, iterations: usize) -> FlashResult {
        let mut result = point.result;
        result.convergence.outer_iterations = iterations;
        result.convergence.residual = point.g / self.scale;
        debug!(
            "{} solved in {} outer iteration(s), {} TP flashes",
            self.spec, iterations, self.evaluations
        );
        result
    }
}

/// Flashes with a known T or P and a known H, S or V.
pub fn solve_state_function(
    solver: &FlashSolver,
    spec: FlashSpec,
    z: &[f64],
) -> Result<FlashResult, FlashError> {
    let settings = solver.settings();
    let (unknown, property, target) = match spec {
        FlashSpec::PH { P, H } => (Unknown::Temperature { P }, Property::H, H),
        FlashSpec::PS { P, S } => (Unknown::Temperature { P }, Property::S, S),
        FlashSpec::PV { P, V } => (Unknown::Temperature { P }, Property::V, V),
        FlashSpec::TH { T, H } => (Unknown::Pressure { T }, Property::H, H),
        FlashSpec::TS { T, S } => (Unknown::Pressure { T }, Property::S, S),
        FlashSpec::TV { T, V } => (Unknown::Pressure { T }, Property::V, V),
        other => {
            return Err(FlashError::UnsupportedSpecification(format!(
                "{} is not a state-function flash",
                other.name()
            )));
        }
    };
    let (bounds, start) = match unknown {
        Unknown::Temperature { .. } => (settings.temperature_bounds, settings.initial_temperature),
        Unknown::Pressure { .. } => (settings.pressure_bounds, settings.initial_pressure),
    };
    let mut search = StateSearch {
        solver,
        spec,
        z,
        unknown,
        property,
        target,
        scale: target.abs().max(property.scale_floor()),
        bounds,
        evaluations: 0,
    };
    let first = search.eval(start.clamp(bounds[0], bounds[1]))?;
    if search.converged(first.g) {
        return Ok(search.finish(first, 0));
    }
    let (mut a, mut b) = search.bracket(first)?;
    let mut u = a.u - a.g * (b.u - a.u) / (b.g - a.g);
    for it in 1..=settings.iterations.outer {
        if !(u > a.u && u < b.u) {
            u = 0.5 * (a.u + b.u);
        }
        let p = search.eval(u)?;
        if search.converged(p.g) {
            return Ok(search.finish(p, it));
        }
        let g = p.g;
        let slope = search
            .eval(u * (1.0 + FD_STEP))
            .map(|q| (q.g - g) / (u * FD_STEP))
            .ok();
        let width = b.u - a.u;
        if g.signum() == a.g.signum() {
            a = p;
        } else {
            b = p;
        }
        if b.u - a.u <= COLLAPSE_WIDTH * b.u {
            return search.lever_rule(a, b).map(|mut r| {
                r.convergence.outer_iterations = it;
                r
            });
        }
        // bisect when the last step did not halve the bracket
        u = match slope {
            Some(s) if s != 0.0 && s.is_finite() && b.u - a.u <= 0.5 * width => u - g / s,
            _ => 0.5 * (a.u + b.u),
        };
    }
    Err(FlashError::Convergence {
        stage: ConvergenceStage::Outer,
        iterations: settings.iterations.outer,
        residual: a.g.abs().min(b.g.abs()) / search.scale,
    })
}

/// Temperature or pressure at a given vapor fraction; `VF = 0` is the bubble point and
/// `VF = 1` the dew point. The result holds one liquid and one vapor phase, the incipient
/// one with zero fraction.
pub fn solve_vapor_fraction(
    solver: &FlashSolver,
    spec: FlashSpec,
    z: &[f64],
) -> Result<FlashResult, FlashError> {
    let settings = solver.settings();
    let (unknown, beta) = match spec {
        FlashSpec::TVF { T, VF } => (Unknown::Pressure { T }, VF),
        FlashSpec::PVF { P, VF } => (Unknown::Temperature { P }, VF),
        other => {
            return Err(FlashError::UnsupportedSpecification(format!(
                "{} is not a vapor-fraction flash",
                other.name()
            )));
        }
    };
    let models = solver.models();
    let liquid = fluid_model(models, PhaseKind::Liquid)?;
    let vapor = fluid_model(models, PhaseKind::Vapor)?;
    let active = z.iter().filter(|zi| **zi > 0.0).count();
    let bounds = match unknown {
        Unknown::Temperature { .. } => settings.temperature_bounds,
        Unknown::Pressure { .. } => settings.pressure_bounds,
    };

    let mut u = initial_estimate(solver, unknown, z, beta)?;
    let (T0, P0) = unknown.state(u);
    let mut K = estimate_k_values(solver.mixture(), T0, P0)?;
    let (mut x, mut y) = split(z, &K, beta);
    let mut previous: Option<Vec<f64>> = None;

    let ln_K_at = |u: f64, x: &[f64], y: &[f64]| -> Result<Vec<f64>, FlashError> {
        let (T, P) = unknown.state(u);
        let l = liquid.ln_fugacity_coefficients(T, P, x)?;
        let v = vapor.ln_fugacity_coefficients(T, P, y)?;
        Ok(l.iter().zip(&v).map(|(a, b)| a - b).collect())
    };

    for it in 1..=settings.iterations.inner {
        let ln_K = ln_K_at(u, &x, &y)?;
        K = ln_K.iter().map(|l| l.exp()).collect();
        let change = previous
            .as_ref()
            .map(|p| p.iter().zip(&ln_K).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max))
            .unwrap_or(f64::INFINITY);
        let f = objective(z, &K, beta);
        if active > 1 && ln_K.iter().all(|l| l.abs() < TRIVIAL_LN_K) {
            return Err(FlashError::Convergence {
                stage: ConvergenceStage::Outer,
                iterations: it,
                residual: f.abs(),
            });
        }
        (x, y) = split(z, &K, beta);
        let tol = settings.tolerances.outer;
        if f.abs() <= tol && change <= tol {
            let (T, P) = unknown.state(u);
            let slots = [
                PhaseSlot::new(PhaseKind::Vapor, y, beta),
                PhaseSlot::new(PhaseKind::Liquid, x, 1.0 - beta),
            ];
            let convergence = ConvergenceInfo {
                outer_iterations: it,
                residual: f.abs(),
                ..Default::default()
            };
            debug!("{} converged in {} iteration(s)", spec, it);
            return solver.assemble(spec, T, P, z, &slots, convergence);
        }
        previous = Some(ln_K);

        // Newton step on the unknown with compositions frozen
        let (v, h) = match unknown {
            Unknown::Pressure { .. } => (u.ln(), FD_STEP),
            Unknown::Temperature { .. } => (u, FD_STEP * u),
        };
        let to_u = |v: f64| match unknown {
            Unknown::Pressure { .. } => v.exp(),
            Unknown::Temperature { .. } => v,
        };
        let K_h: Vec<f64> = ln_K_at(to_u(v + h), &x, &y)?.iter().map(|l| l.exp()).collect();
        let slope = (objective(z, &K_h, beta) - f) / h;
        if slope == 0.0 || !slope.is_finite() {
            break;
        }
        let max_step = match unknown {
            Unknown::Pressure { .. } => 0.5,
            Unknown::Temperature { .. } => 0.05 * u,
        };
        let step = (-f / slope).clamp(-max_step, max_step);
        u = to_u(v + step).clamp(bounds[0], bounds[1]);
        trace!("{} iteration {}: u = {}, f = {:e}", spec, it, u, f);
    }
    Err(FlashError::Convergence {
        stage: ConvergenceStage::Outer,
        iterations: settings.iterations.inner,
        residual: objective(z, &K, beta).abs(),
    })
}

/// liquid and vapor compositions of the Rachford-Rice split at fraction `beta`
fn split(z: &[f64], K: &[f64], beta: f64) -> (Vec<f64>, Vec<f64>) {
    let mut x: Vec<f64> = z
        .iter()
        .zip(K)
        .map(|(zi, Ki)| zi / (1.0 + beta * (Ki - 1.0)))
        .collect();
    let mut y: Vec<f64> = x.iter().zip(K).map(|(xi, Ki)| xi * Ki).collect();
    clamp_normalize(&mut x);
    clamp_normalize(&mut y);
    (x, y)
}

/// Root of the Rachford-Rice objective with estimated K-values: the bracket is expanded
/// geometrically from the initial guess and bisected. Falls back to the initial guess when
/// no sign change is found.
fn initial_estimate(
    solver: &FlashSolver,
    unknown: Unknown,
    z: &[f64],
    beta: f64,
) -> Result<f64, FlashError> {
    let settings = solver.settings();
    let (start, bounds, factor) = match unknown {
        Unknown::Temperature { .. } => (settings.initial_temperature, settings.temperature_bounds, 1.1),
        Unknown::Pressure { .. } => (settings.initial_pressure, settings.pressure_bounds, 2.0),
    };
    let start = start.clamp(bounds[0], bounds[1]);
    let g = |u: f64| -> Option<f64> {
        let (T, P) = unknown.state(u);
        let K = estimate_k_values(solver.mixture(), T, P).ok()?;
        let f = objective(z, &K, beta);
        f.is_finite().then_some(f)
    };
    let Some(g0) = g(start) else {
        return Ok(start);
    };
    let mut bracket = None;
    let (mut up, mut down) = (start, start);
    for _ in 0..MAX_EXPANSIONS {
        let next_up = (up * factor).min(bounds[1]);
        if let Some(gu) = g(next_up) {
            if gu.signum() != g0.signum() {
                bracket = Some((up, next_up));
                break;
            }
        }
        up = next_up;
        let next_down = (down / factor).max(bounds[0]);
        if let Some(gd) = g(next_down) {
            if gd.signum() != g0.signum() {
                bracket = Some((next_down, down));
                break;
            }
        }
        down = next_down;
    }
    let Some((mut lo, mut hi)) = bracket else {
        debug!("no bracket for the K-value estimate; starting at {}", start);
        return Ok(start);
    };
    let sign_lo = g(lo).map_or(g0.signum(), f64::signum);
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        match g(mid) {
            Some(gm) if gm.signum() == sign_lo => lo = mid,
            Some(_) => hi = mid,
            None => break,
        }
        if hi - lo <= 1e-10 * hi {
            break;
        }
    }
    debug!("initial estimate from K-value correlations: {}", 0.5 * (lo + hi));
    Ok(0.5 * (lo + hi))
}
