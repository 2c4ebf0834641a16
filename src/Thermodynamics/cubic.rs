//! # Peng-Robinson phase
//!
//! `P = RT/(V - b) - a(T)/(V(V + b) + b(V - b))` with van der Waals one-fluid mixing
//! rules and an optional binary interaction matrix `k_ij`:
//!
//! - `a_i = 0.45724 R² Tc² / Pc · α_i(T)`, `α_i = (1 + κ_i(1 - √(T/Tc)))²`
//! - `κ = 0.37464 + 1.54226 ω - 0.26992 ω²`, `b_i = 0.07780 R Tc / Pc`
//! - `a = Σ Σ x_i x_j (1 - k_ij) √(a_i a_j)`, `b = Σ x_i b_i`
//!
//! The same parameters serve a vapor and a liquid instance, which only differ in the root
//! of the compressibility cubic they take: the largest for the vapor, the smallest one
//! above `B` for the liquid. Enthalpy and entropy are ideal-gas values plus departures.
use super::R;
use super::compound::Mixture;
use super::ideal_gas::{ideal_gas_mixture_enthalpy, ideal_gas_mixture_entropy};
use super::phase_model_api::{ModelDomainError, PhaseModel, validate_state};
use super::phase_state::PhaseKind;
use crate::Utils::numerics::cubic_real_roots;
use nalgebra::DMatrix;
use std::f64::consts::SQRT_2;
use std::sync::Arc;

const OMEGA_A: f64 = 0.45724;
const OMEGA_B: f64 = 0.07780;

#[derive(Debug, Clone)]
pub struct CubicPhase {
    mixture: Arc<Mixture>,
    kind: PhaseKind,
    ac: Vec<f64>,
    b: Vec<f64>,
    kappa: Vec<f64>,
    Tc: Vec<f64>,
    kij: DMatrix<f64>,
}

/// mixture parameters at one (T, x)
struct Mixing {
    a: f64,
    b: f64,
    da_dT: f64,
    /// `Σ_j x_j a_ij` for every i
    sum_a: Vec<f64>,
}

impl CubicPhase {
    /// `kind` must be vapor or liquid; `kij` defaults to zeros.
    pub fn new(
        mixture: Arc<Mixture>,
        kind: PhaseKind,
        kij: Option<DMatrix<f64>>,
    ) -> Result<Self, ModelDomainError> {
        let n = mixture.len();
        let mut ac = Vec::with_capacity(n);
        let mut b = Vec::with_capacity(n);
        let mut kappa = Vec::with_capacity(n);
        let mut Tc = Vec::with_capacity(n);
        for c in mixture.compounds() {
            let (tc, pc, omega) = (c.Tc()?, c.Pc()?, c.omega()?);
            ac.push(OMEGA_A * R * R * tc * tc / pc);
            b.push(OMEGA_B * R * tc / pc);
            kappa.push(0.37464 + 1.54226 * omega - 0.26992 * omega * omega);
            Tc.push(tc);
        }
        let kij = kij.unwrap_or_else(|| DMatrix::zeros(n, n));
        if kij.nrows() != n || kij.ncols() != n {
            return Err(ModelDomainError::ParameterShape {
                name: "kij".to_string(),
                expected: (n, n),
                got: (kij.nrows(), kij.ncols()),
            });
        }
        Ok(Self {
            mixture,
            kind,
            ac,
            b,
            kappa,
            Tc,
            kij,
        })
    }

    fn mixing(&self, T: f64, x: &[f64]) -> Mixing {
        let n = x.len();
        let mut a_i = Vec::with_capacity(n);
        let mut da_i = Vec::with_capacity(n);
        for i in 0..n {
            let sqrt_alpha = 1.0 + self.kappa[i] * (1.0 - (T / self.Tc[i]).sqrt());
            a_i.push(self.ac[i] * sqrt_alpha * sqrt_alpha);
            da_i.push(-self.ac[i] * self.kappa[i] * sqrt_alpha / (T * self.Tc[i]).sqrt());
        }
        let mut a = 0.0;
        let mut da_dT = 0.0;
        let mut sum_a = vec![0.0; n];
        for i in 0..n {
            for j in 0..n {
                let root = (a_i[i] * a_i[j]).sqrt();
                let a_ij = (1.0 - self.kij[(i, j)]) * root;
                let da_ij = if root > 0.0 {
                    (1.0 - self.kij[(i, j)]) * (da_i[i] * a_i[j] + a_i[i] * da_i[j]) / (2.0 * root)
                } else {
                    0.0
                };
                sum_a[i] += x[j] * a_ij;
                a += x[i] * x[j] * a_ij;
                da_dT += x[i] * x[j] * da_ij;
            }
        }
        let b = x.iter().zip(&self.b).map(|(xi, bi)| xi * bi).sum();
        Mixing { a, b, da_dT, sum_a }
    }

    /// compressibility factor of this phase's root
    fn compressibility(&self, T: f64, P: f64, m: &Mixing) -> Result<(f64, f64, f64), ModelDomainError> {
        let A = m.a * P / (R * R * T * T);
        let B = m.b * P / (R * T);
        let roots = cubic_real_roots(-(1.0 - B), A - 3.0 * B * B - 2.0 * B, -(A * B - B * B - B * B * B));
        let admissible = roots.into_iter().filter(|z| *z > B && z.is_finite());
        let Z = match self.kind {
            PhaseKind::Vapor => admissible.fold(None, |acc: Option<f64>, z| Some(acc.map_or(z, |a| a.max(z)))),
            _ => admissible.fold(None, |acc: Option<f64>, z| Some(acc.map_or(z, |a| a.min(z)))),
        };
        let Z = Z.ok_or(ModelDomainError::NoCubicRoot { T, P })?;
        Ok((Z, A, B))
    }

    fn log_term(Z: f64, B: f64) -> f64 {
        ((Z + (1.0 + SQRT_2) * B) / (Z + (1.0 - SQRT_2) * B)).ln()
    }

    pub fn compressibility_factor(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError> {
        validate_state(&self.mixture, T, P, x)?;
        let m = self.mixing(T, x);
        Ok(self.compressibility(T, P, &m)?.0)
    }

    /// `H - H_ig` at (T, P, x)
    pub fn enthalpy_departure(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError> {
        let m = self.mixing(T, x);
        let (Z, _, B) = self.compressibility(T, P, &m)?;
        Ok(R * T * (Z - 1.0) + (T * m.da_dT - m.a) / (2.0 * SQRT_2 * m.b) * Self::log_term(Z, B))
    }

    /// `S - S_ig(T, P)`
    pub fn entropy_departure(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError> {
        let m = self.mixing(T, x);
        let (Z, _, B) = self.compressibility(T, P, &m)?;
        Ok(R * (Z - B).ln() + m.da_dT / (2.0 * SQRT_2 * m.b) * Self::log_term(Z, B))
    }
}

impl PhaseModel for CubicPhase {
    fn kind(&self) -> PhaseKind {
        self.kind
    }
    fn mixture(&self) -> &Mixture {
        &self.mixture
    }

    fn ln_fugacity_coefficients(&self, T: f64, P: f64, x: &[f64]) -> Result<Vec<f64>, ModelDomainError> {
        validate_state(&self.mixture, T, P, x)?;
        let m = self.mixing(T, x);
        let (Z, A, B) = self.compressibility(T, P, &m)?;
        let log_term = Self::log_term(Z, B);
        let ln_ZB = (Z - B).ln();
        Ok((0..x.len())
            .map(|i| {
                let b_ratio = self.b[i] / m.b;
                b_ratio * (Z - 1.0)
                    - ln_ZB
                    - A / (2.0 * SQRT_2 * B) * (2.0 * m.sum_a[i] / m.a - b_ratio) * log_term
            })
            .collect())
    }

    fn molar_enthalpy(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError> {
        validate_state(&self.mixture, T, P, x)?;
        Ok(ideal_gas_mixture_enthalpy(&self.mixture, T, x)? + self.enthalpy_departure(T, P, x)?)
    }

    fn molar_entropy(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError> {
        validate_state(&self.mixture, T, P, x)?;
        Ok(ideal_gas_mixture_entropy(&self.mixture, T, P, x)? + self.entropy_departure(T, P, x)?)
    }

    fn molar_volume(&self, T: f64, P: f64, x: &[f64]) -> Result<f64, ModelDomainError> {
        validate_state(&self.mixture, T, P, x)?;
        let m = self.mixing(T, x);
        let (Z, _, _) = self.compressibility(T, P, &m)?;
        Ok(Z * R * T / P)
    }
}
