use super::correlation_api::{
    CorrelationCalculator, CorrelationError, NaturalScale, check_coeff_count,
};
use std::f64::consts::LN_10;

/// Antoine vapor pressure `P = unit · base^(A - B/(T + C))`, T in K, result in Pa
/// once `unit` converts the fitted pressure unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Antoine {
    a: f64,
    b: f64,
    c: f64,
    /// ln of the logarithm base: ln 10 or 1
    ln_base: f64,
    unit: f64,
}

impl Antoine {
    pub fn log10(coeffs: &[f64], unit: f64) -> Result<Self, CorrelationError> {
        Self::new(coeffs, LN_10, unit)
    }

    pub fn ln(coeffs: &[f64], unit: f64) -> Result<Self, CorrelationError> {
        Self::new(coeffs, 1.0, unit)
    }

    fn new(coeffs: &[f64], ln_base: f64, unit: f64) -> Result<Self, CorrelationError> {
        check_coeff_count("Antoine", coeffs, 2, 3)?;
        Ok(Self {
            a: coeffs[0],
            b: coeffs[1],
            c: coeffs.get(2).copied().unwrap_or(0.0),
            ln_base,
            unit,
        })
    }
}

impl CorrelationCalculator for Antoine {
    fn form_name(&self) -> String {
        "Antoine".to_string()
    }
    fn coefficients(&self) -> Vec<f64> {
        vec![self.a, self.b, self.c]
    }
    fn calculate(&self, T: f64) -> f64 {
        self.unit * (self.ln_base * (self.a - self.b / (T + self.c))).exp()
    }
    fn calculate_dT(&self, T: f64) -> f64 {
        self.calculate(T) * self.ln_base * self.b / (T + self.c).powi(2)
    }
    fn natural_scale(&self) -> NaturalScale {
        NaturalScale::LogInverseT
    }
}
