//! # Activity-coefficient models
//!
//! Excess Gibbs energy models for the liquid of a gamma-phi description.
//!
//! | model | interaction parameter | temperature dependence |
//! |-------|-----------------------|------------------------|
//! | [`IdealSolution`] | none | γ = 1 (Raoult) |
//! | [`Nrtl`] | τ_ij, α_ij | τ = A + B/T + E ln T + F T + G/T² + H T², α = c + d T |
//! | [`Wilson`] | Λ_ij | ln Λ = a + b/T + c ln T + d T |
//! | [`Uniquac`] | τ_ij, r_i, q_i | ln τ = a + b/T + c ln T + d T |
//!
//! Parameter matrices are `n × n`; optional temperature terms may be left as empty
//! `0 × 0` matrices, which count as zero. Models carry no compound data, so the same
//! parameter set works for any mixture of matching size.
use super::R;
use super::phase_model_api::ModelDomainError;
use crate::Utils::numerics::xlnx;
use enum_dispatch::enum_dispatch;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

fn empty() -> DMatrix<f64> {
    DMatrix::zeros(0, 0)
}

fn entry(m: &DMatrix<f64>, i: usize, j: usize) -> f64 {
    if m.nrows() == 0 { 0.0 } else { m[(i, j)] }
}

fn check_square(name: &str, m: &DMatrix<f64>, n: usize, optional: bool) -> Result<(), ModelDomainError> {
    if optional && m.nrows() == 0 && m.ncols() == 0 {
        return Ok(());
    }
    if m.nrows() != n || m.ncols() != n {
        return Err(ModelDomainError::ParameterShape {
            name: name.to_string(),
            expected: (n, n),
            got: (m.nrows(), m.ncols()),
        });
    }
    Ok(())
}

/// `ln p = a + b/T + c ln T + d T` element-wise
fn log_form(a: &DMatrix<f64>, b: &DMatrix<f64>, c: &DMatrix<f64>, d: &DMatrix<f64>, T: f64) -> DMatrix<f64> {
    let n = a.nrows();
    let lnT = T.ln();
    DMatrix::from_fn(n, n, |i, j| {
        (a[(i, j)] + entry(b, i, j) / T + entry(c, i, j) * lnT + entry(d, i, j) * T).exp()
    })
}

#[enum_dispatch]
pub trait ActivityCoefficients {
    fn model_name(&self) -> &'static str;
    /// checks parameter shapes against the number of compounds
    fn validate(&self, n: usize) -> Result<(), ModelDomainError>;
    fn ln_gammas(&self, T: f64, x: &[f64]) -> Vec<f64>;
    fn ge_over_RT(&self, T: f64, x: &[f64]) -> f64;
    /// `H^E = -R T² ∂(G^E/RT)/∂T`, J/mol
    fn excess_enthalpy(&self, T: f64, x: &[f64]) -> f64 {
        let h = 1e-4 * T;
        let d = (self.ge_over_RT(T + h, x) - self.ge_over_RT(T - h, x)) / (2.0 * h);
        -R * T * T * d
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[enum_dispatch(ActivityCoefficients)]
pub enum ActivityModel {
    Ideal(IdealSolution),
    NRTL(Nrtl),
    Wilson(Wilson),
    UNIQUAC(Uniquac),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdealSolution;

impl ActivityCoefficients for IdealSolution {
    fn model_name(&self) -> &'static str {
        "ideal"
    }
    fn validate(&self, _n: usize) -> Result<(), ModelDomainError> {
        Ok(())
    }
    fn ln_gammas(&self, _T: f64, x: &[f64]) -> Vec<f64> {
        vec![0.0; x.len()]
    }
    fn ge_over_RT(&self, _T: f64, _x: &[f64]) -> f64 {
        0.0
    }
    fn excess_enthalpy(&self, _T: f64, _x: &[f64]) -> f64 {
        0.0
    }
}

/////////////////////////////////////////NRTL//////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nrtl {
    pub tau_a: DMatrix<f64>,
    #[serde(default = "empty")]
    pub tau_b: DMatrix<f64>,
    #[serde(default = "empty")]
    pub tau_e: DMatrix<f64>,
    #[serde(default = "empty")]
    pub tau_f: DMatrix<f64>,
    #[serde(default = "empty")]
    pub tau_g: DMatrix<f64>,
    #[serde(default = "empty")]
    pub tau_h: DMatrix<f64>,
    pub alpha_c: DMatrix<f64>,
    #[serde(default = "empty")]
    pub alpha_d: DMatrix<f64>,
}

/// per-temperature NRTL matrices
struct NrtlState {
    tau: DMatrix<f64>,
    G: DMatrix<f64>,
    dtau: DMatrix<f64>,
    dG: DMatrix<f64>,
}

impl Nrtl {
    /// `τ = A + B/T`, constant α
    pub fn new(tau_a: DMatrix<f64>, tau_b: DMatrix<f64>, alpha: DMatrix<f64>) -> Self {
        Self {
            tau_a,
            tau_b,
            tau_e: empty(),
            tau_f: empty(),
            tau_g: empty(),
            tau_h: empty(),
            alpha_c: alpha,
            alpha_d: empty(),
        }
    }

    /// adds the `E ln T + F T + G/T² + H T²` terms of τ
    pub fn with_extended_tau(
        mut self,
        e: DMatrix<f64>,
        f: DMatrix<f64>,
        g: DMatrix<f64>,
        h: DMatrix<f64>,
    ) -> Self {
        self.tau_e = e;
        self.tau_f = f;
        self.tau_g = g;
        self.tau_h = h;
        self
    }

    pub fn with_alpha_slope(mut self, d: DMatrix<f64>) -> Self {
        self.alpha_d = d;
        self
    }

    fn state(&self, T: f64) -> NrtlState {
        let n = self.tau_a.nrows();
        let lnT = T.ln();
        let tau = DMatrix::from_fn(n, n, |i, j| {
            self.tau_a[(i, j)]
                + entry(&self.tau_b, i, j) / T
                + entry(&self.tau_e, i, j) * lnT
                + entry(&self.tau_f, i, j) * T
                + entry(&self.tau_g, i, j) / (T * T)
                + entry(&self.tau_h, i, j) * T * T
        });
        let dtau = DMatrix::from_fn(n, n, |i, j| {
            -entry(&self.tau_b, i, j) / (T * T) + entry(&self.tau_e, i, j) / T + entry(&self.tau_f, i, j)
                - 2.0 * entry(&self.tau_g, i, j) / T.powi(3)
                + 2.0 * entry(&self.tau_h, i, j) * T
        });
        let alpha = DMatrix::from_fn(n, n, |i, j| self.alpha_c[(i, j)] + entry(&self.alpha_d, i, j) * T);
        let G = DMatrix::from_fn(n, n, |i, j| (-alpha[(i, j)] * tau[(i, j)]).exp());
        let dG = DMatrix::from_fn(n, n, |i, j| {
            -G[(i, j)] * (entry(&self.alpha_d, i, j) * tau[(i, j)] + alpha[(i, j)] * dtau[(i, j)])
        });
        NrtlState { tau, G, dtau, dG }
    }

    /// `S_j = Σ_k x_k G_kj`, `C_j = Σ_k x_k τ_kj G_kj`
    fn sums(s: &NrtlState, x: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let n = x.len();
        let mut S = vec![0.0; n];
        let mut C = vec![0.0; n];
        for j in 0..n {
            for k in 0..n {
                S[j] += x[k] * s.G[(k, j)];
                C[j] += x[k] * s.tau[(k, j)] * s.G[(k, j)];
            }
        }
        (S, C)
    }
}

impl ActivityCoefficients for Nrtl {
    fn model_name(&self) -> &'static str {
        "NRTL"
    }
    fn validate(&self, n: usize) -> Result<(), ModelDomainError> {
        check_square("tau_a", &self.tau_a, n, false)?;
        check_square("tau_b", &self.tau_b, n, true)?;
        check_square("tau_e", &self.tau_e, n, true)?;
        check_square("tau_f", &self.tau_f, n, true)?;
        check_square("tau_g", &self.tau_g, n, true)?;
        check_square("tau_h", &self.tau_h, n, true)?;
        check_square("alpha_c", &self.alpha_c, n, false)?;
        check_square("alpha_d", &self.alpha_d, n, true)
    }
    fn ln_gammas(&self, T: f64, x: &[f64]) -> Vec<f64> {
        let s = self.state(T);
        let (S, C) = Self::sums(&s, x);
        let n = x.len();
        (0..n)
            .map(|i| {
                let mut v = C[i] / S[i];
                for j in 0..n {
                    v += x[j] * s.G[(i, j)] / S[j] * (s.tau[(i, j)] - C[j] / S[j]);
                }
                v
            })
            .collect()
    }
    fn ge_over_RT(&self, T: f64, x: &[f64]) -> f64 {
        let s = self.state(T);
        let (S, C) = Self::sums(&s, x);
        x.iter().enumerate().map(|(i, xi)| xi * C[i] / S[i]).sum()
    }
    fn excess_enthalpy(&self, T: f64, x: &[f64]) -> f64 {
        let s = self.state(T);
        let (S, C) = Self::sums(&s, x);
        let n = x.len();
        let mut d_ge = 0.0;
        for i in 0..n {
            let mut dS = 0.0;
            let mut dC = 0.0;
            for j in 0..n {
                dS += x[j] * s.dG[(j, i)];
                dC += x[j] * (s.dtau[(j, i)] * s.G[(j, i)] + s.tau[(j, i)] * s.dG[(j, i)]);
            }
            d_ge += x[i] * (dC * S[i] - C[i] * dS) / (S[i] * S[i]);
        }
        -R * T * T * d_ge
    }
}

/////////////////////////////////////////WILSON//////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wilson {
    pub a: DMatrix<f64>,
    #[serde(default = "empty")]
    pub b: DMatrix<f64>,
    #[serde(default = "empty")]
    pub c: DMatrix<f64>,
    #[serde(default = "empty")]
    pub d: DMatrix<f64>,
}

impl Wilson {
    /// `ln Λ = a + b/T`
    pub fn new(a: DMatrix<f64>, b: DMatrix<f64>) -> Self {
        Self {
            a,
            b,
            c: empty(),
            d: empty(),
        }
    }

    /// `Σ_j x_j Λ_ij` for every i
    fn row_sums(lambda: &DMatrix<f64>, x: &[f64]) -> Vec<f64> {
        (0..x.len())
            .map(|i| x.iter().enumerate().map(|(j, xj)| xj * lambda[(i, j)]).sum())
            .collect()
    }
}

impl ActivityCoefficients for Wilson {
    fn model_name(&self) -> &'static str {
        "Wilson"
    }
    fn validate(&self, n: usize) -> Result<(), ModelDomainError> {
        check_square("a", &self.a, n, false)?;
        check_square("b", &self.b, n, true)?;
        check_square("c", &self.c, n, true)?;
        check_square("d", &self.d, n, true)
    }
    fn ln_gammas(&self, T: f64, x: &[f64]) -> Vec<f64> {
        let lambda = log_form(&self.a, &self.b, &self.c, &self.d, T);
        let sums = Self::row_sums(&lambda, x);
        (0..x.len())
            .map(|i| {
                let tail: f64 = (0..x.len()).map(|k| x[k] * lambda[(k, i)] / sums[k]).sum();
                1.0 - sums[i].ln() - tail
            })
            .collect()
    }
    fn ge_over_RT(&self, T: f64, x: &[f64]) -> f64 {
        let lambda = log_form(&self.a, &self.b, &self.c, &self.d, T);
        let sums = Self::row_sums(&lambda, x);
        -x.iter().zip(&sums).map(|(xi, s)| if *xi > 0.0 { xi * s.ln() } else { 0.0 }).sum::<f64>()
    }
}

/////////////////////////////////////////UNIQUAC//////////////////////////////////////////////////////

const UNIQUAC_Z: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uniquac {
    pub a: DMatrix<f64>,
    #[serde(default = "empty")]
    pub b: DMatrix<f64>,
    #[serde(default = "empty")]
    pub c: DMatrix<f64>,
    #[serde(default = "empty")]
    pub d: DMatrix<f64>,
    /// volume parameters
    pub r: DVector<f64>,
    /// surface parameters
    pub q: DVector<f64>,
}

impl Uniquac {
    /// `ln τ = a + b/T`
    pub fn new(a: DMatrix<f64>, b: DMatrix<f64>, r: DVector<f64>, q: DVector<f64>) -> Self {
        Self {
            a,
            b,
            c: empty(),
            d: empty(),
            r,
            q,
        }
    }

    /// (φ_i/x_i, θ_i, S_i = Σ_j θ_j τ_ji)
    fn fractions(&self, tau: &DMatrix<f64>, x: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let n = x.len();
        let rx: f64 = (0..n).map(|i| self.r[i] * x[i]).sum();
        let qx: f64 = (0..n).map(|i| self.q[i] * x[i]).sum();
        let phi_over_x: Vec<f64> = (0..n).map(|i| self.r[i] / rx).collect();
        let theta: Vec<f64> = (0..n).map(|i| self.q[i] * x[i] / qx).collect();
        let S: Vec<f64> = (0..n)
            .map(|i| (0..n).map(|j| theta[j] * tau[(j, i)]).sum())
            .collect();
        (phi_over_x, theta, S)
    }
}

impl ActivityCoefficients for Uniquac {
    fn model_name(&self) -> &'static str {
        "UNIQUAC"
    }
    fn validate(&self, n: usize) -> Result<(), ModelDomainError> {
        check_square("a", &self.a, n, false)?;
        check_square("b", &self.b, n, true)?;
        check_square("c", &self.c, n, true)?;
        check_square("d", &self.d, n, true)?;
        for (name, v) in [("r", &self.r), ("q", &self.q)] {
            if v.len() != n || v.iter().any(|p| !(*p > 0.0)) {
                return Err(ModelDomainError::ParameterShape {
                    name: name.to_string(),
                    expected: (n, 1),
                    got: (v.len(), 1),
                });
            }
        }
        Ok(())
    }
    fn ln_gammas(&self, T: f64, x: &[f64]) -> Vec<f64> {
        let tau = log_form(&self.a, &self.b, &self.c, &self.d, T);
        let (phi_over_x, theta, S) = self.fractions(&tau, x);
        let qx: f64 = x.iter().enumerate().map(|(i, xi)| self.q[i] * xi).sum();
        (0..x.len())
            .map(|i| {
                let px = phi_over_x[i];
                // φ_i/θ_i without dividing by x_i
                let pt = px * qx / self.q[i];
                let combinatorial =
                    px.ln() + 1.0 - px - 0.5 * UNIQUAC_Z * self.q[i] * (pt.ln() + 1.0 - pt);
                let tail: f64 = (0..x.len()).map(|j| theta[j] * tau[(i, j)] / S[j]).sum();
                let residual = self.q[i] * (1.0 - S[i].ln() - tail);
                combinatorial + residual
            })
            .collect()
    }
    fn ge_over_RT(&self, T: f64, x: &[f64]) -> f64 {
        let tau = log_form(&self.a, &self.b, &self.c, &self.d, T);
        let (phi_over_x, _, S) = self.fractions(&tau, x);
        let qx: f64 = x.iter().enumerate().map(|(i, xi)| self.q[i] * xi).sum();
        let mut g = 0.0;
        for i in 0..x.len() {
            if x[i] > 0.0 {
                let theta_over_phi = self.q[i] / (qx * phi_over_x[i]);
                g += x[i] * phi_over_x[i].ln()
                    + 0.5 * UNIQUAC_Z * self.q[i] * x[i] * theta_over_phi.ln()
                    - self.q[i] * x[i] * S[i].ln();
            }
        }
        g
    }
}

/// `G^E` in J/mol
pub fn excess_gibbs(model: &ActivityModel, T: f64, x: &[f64]) -> f64 {
    R * T * model.ge_over_RT(T, x)
}

/// ideal mixing entropy term `-R Σ x ln x`
pub(crate) fn ideal_mixing_entropy(x: &[f64]) -> f64 {
    -R * x.iter().map(|xi| xlnx(*xi)).sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn nrtl_reference() -> Nrtl {
        Nrtl::new(
            DMatrix::from_row_slice(2, 2, &[0.0, -0.178, 1.963, 0.0]),
            empty(),
            DMatrix::from_row_slice(2, 2, &[0.0, 0.2974, 0.2974, 0.0]),
        )
    }

    #[test]
    fn test_nrtl_gammas() {
        let g = nrtl_reference().ln_gammas(300.0, &[0.252, 0.748]);
        assert_relative_eq!(g[0].exp(), 1.9363183763514304, max_relative = 1e-12);
        assert_relative_eq!(g[1].exp(), 1.1537609663170014, max_relative = 1e-12);
    }

    #[test]
    fn test_wilson_gammas() {
        let lambda = [1.0_f64, 0.154, 0.888, 1.0];
        let a = DMatrix::from_row_slice(2, 2, &lambda.map(f64::ln));
        let g = Wilson::new(a, empty()).ln_gammas(300.0, &[0.252, 0.748]);
        assert_relative_eq!(g[0].exp(), 1.8814926087178843, max_relative = 1e-12);
        assert_relative_eq!(g[1].exp(), 1.1655774931125487, max_relative = 1e-12);
    }

    #[test]
    fn test_uniquac_gammas() {
        let taus = [1.0_f64, 1.0919744384510301, 0.37452902779205477, 1.0];
        let model = Uniquac::new(
            DMatrix::from_row_slice(2, 2, &taus.map(f64::ln)),
            empty(),
            DVector::from_vec(vec![2.1055, 0.9200]),
            DVector::from_vec(vec![1.972, 1.400]),
        );
        let g = model.ln_gammas(300.0, &[0.252, 0.748]);
        assert_relative_eq!(g[0].exp(), 2.35875137797083, max_relative = 1e-12);
        assert_relative_eq!(g[1].exp(), 1.2442093415968987, max_relative = 1e-12);
    }

    /// Gibbs-Duhem: G^E/RT = Σ x_i ln γ_i for every model
    #[test]
    fn test_excess_gibbs_is_consistent_with_gammas() {
        let x = [0.3, 0.7];
        let models: Vec<ActivityModel> = vec![
            nrtl_reference().into(),
            Wilson::new(DMatrix::from_row_slice(2, 2, &[0.0, -1.2, 0.3, 0.0]), empty()).into(),
            Uniquac::new(
                DMatrix::from_row_slice(2, 2, &[0.0, 0.09, -0.98, 0.0]),
                empty(),
                DVector::from_vec(vec![2.1055, 0.92]),
                DVector::from_vec(vec![1.972, 1.4]),
            )
            .into(),
        ];
        for m in models {
            let g = m.ln_gammas(320.0, &x);
            let from_gammas: f64 = x.iter().zip(&g).map(|(xi, gi)| xi * gi).sum();
            assert_relative_eq!(m.ge_over_RT(320.0, &x), from_gammas, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_nrtl_analytical_excess_enthalpy() {
        let n = 2;
        let model = Nrtl::new(
            DMatrix::from_row_slice(n, n, &[0.0, -0.8, 2.1, 0.0]),
            DMatrix::from_row_slice(n, n, &[0.0, 310.0, -220.0, 0.0]),
            DMatrix::from_row_slice(n, n, &[0.0, 0.3, 0.3, 0.0]),
        )
        .with_extended_tau(
            DMatrix::from_row_slice(n, n, &[0.0, 0.01, -0.02, 0.0]),
            DMatrix::from_row_slice(n, n, &[0.0, 1e-4, 2e-4, 0.0]),
            DMatrix::from_row_slice(n, n, &[0.0, 1e3, -2e3, 0.0]),
            DMatrix::from_row_slice(n, n, &[0.0, 1e-7, 3e-7, 0.0]),
        )
        .with_alpha_slope(DMatrix::from_row_slice(n, n, &[0.0, 2e-4, 2e-4, 0.0]));
        let x = [0.4, 0.6];
        let T = 330.0;
        let h = 1e-3;
        let numeric = -R * T * T * (model.ge_over_RT(T + h, &x) - model.ge_over_RT(T - h, &x)) / (2.0 * h);
        assert_relative_eq!(model.excess_enthalpy(T, &x), numeric, max_relative = 1e-6);
    }

    #[test]
    fn test_shape_validation() {
        assert!(nrtl_reference().validate(2).is_ok());
        let err = nrtl_reference().validate(3).unwrap_err();
        assert!(matches!(err, ModelDomainError::ParameterShape { expected: (3, 3), got: (2, 2), .. }));
        let bad = Uniquac::new(
            DMatrix::zeros(2, 2),
            empty(),
            DVector::from_vec(vec![1.0]),
            DVector::from_vec(vec![1.0, 1.0]),
        );
        assert!(bad.validate(2).is_err());
        assert!(IdealSolution.validate(7).is_ok());
    }

    #[test]
    fn test_serde_roundtrip_of_model_config() {
        let model: ActivityModel = nrtl_reference().into();
        let text = serde_json::to_string(&model).unwrap();
        let back: ActivityModel = serde_json::from_str(&text).unwrap();
        assert_eq!(model, back);
        assert_eq!(back.model_name(), "NRTL");
        assert_relative_eq!(excess_gibbs(&IdealSolution.into(), 300.0, &[0.5, 0.5]), 0.0);
    }
}
