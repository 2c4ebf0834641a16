use super::correlation_api::{CorrelationCalculator, CorrelationError, check_coeff_count};

/// Power series `Σ a_k T^k`.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<f64>,
    /// coefficients of ∫f dT, index k multiplies T^k
    int_coeffs: Vec<f64>,
    /// coefficients of ∫f/T dT without the `a0 ln T` term
    int_over_T_coeffs: Vec<f64>,
}

impl Polynomial {
    pub fn new(coeffs: &[f64]) -> Result<Self, CorrelationError> {
        check_coeff_count("Polynomial", coeffs, 1, 16)?;
        let mut int_coeffs = vec![0.0; coeffs.len() + 1];
        let mut int_over_T_coeffs = vec![0.0; coeffs.len()];
        for (k, a) in coeffs.iter().enumerate() {
            int_coeffs[k + 1] = a / (k as f64 + 1.0);
            if k > 0 {
                int_over_T_coeffs[k] = a / k as f64;
            }
        }
        Ok(Self {
            coeffs: coeffs.to_vec(),
            int_coeffs,
            int_over_T_coeffs,
        })
    }
}

pub(crate) fn horner(coeffs: &[f64], t: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * t + c)
}

impl CorrelationCalculator for Polynomial {
    fn form_name(&self) -> String {
        "Polynomial".to_string()
    }
    fn coefficients(&self) -> Vec<f64> {
        self.coeffs.clone()
    }
    fn calculate(&self, T: f64) -> f64 {
        horner(&self.coeffs, T)
    }
    fn calculate_dT(&self, T: f64) -> f64 {
        self.coeffs
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .fold(0.0, |acc, (k, a)| acc * T + k as f64 * a)
    }
    fn integral(&self, T1: f64, T2: f64) -> Option<f64> {
        Some(horner(&self.int_coeffs, T2) - horner(&self.int_coeffs, T1))
    }
    fn integral_over_T(&self, T1: f64, T2: f64) -> Option<f64> {
        let series = horner(&self.int_over_T_coeffs, T2) - horner(&self.int_over_T_coeffs, T1);
        Some(self.coeffs[0] * (T2 / T1).ln() + series)
    }
}
