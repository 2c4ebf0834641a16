use super::correlation_api::{CorrelationCalculator, CorrelationError, check_coeff_count};
use crate::Thermodynamics::R;

// NASA 7-term heat capacity Cp/R = a1 + a2 T + a3 T^2 + a4 T^3 + a5 T^4.
// a6 and a7 (enthalpy/entropy integration constants) are accepted but the reference
// state comes from the compound, so they take no part in the integrals.
fn Cp(t: f64, a: &[f64; 5]) -> f64 {
    R * (a[0] + a[1] * t + a[2] * t.powi(2) + a[3] * t.powi(3) + a[4] * t.powi(4))
}
fn dh(t: f64, a: &[f64; 5]) -> f64 {
    R * t
        * (a[0]
            + a[1] * t / 2.0
            + a[2] * t.powi(2) / 3.0
            + a[3] * t.powi(3) / 4.0
            + a[4] * t.powi(4) / 5.0)
}
fn ds(t: f64, a: &[f64; 5]) -> f64 {
    R * (a[0] * t.ln()
        + a[1] * t
        + a[2] * t.powi(2) / 2.0
        + a[3] * t.powi(3) / 3.0
        + a[4] * t.powi(4) / 4.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct NASA7 {
    coeffs: Vec<f64>,
    cp: [f64; 5],
}

impl NASA7 {
    pub fn new(coeffs: &[f64]) -> Result<Self, CorrelationError> {
        check_coeff_count("NASA7", coeffs, 5, 7)?;
        if coeffs.len() == 6 {
            return Err(CorrelationError::InvalidCoefficients {
                form: "NASA7".to_string(),
                expected: "5 or 7".to_string(),
                got: 6,
            });
        }
        let cp = [coeffs[0], coeffs[1], coeffs[2], coeffs[3], coeffs[4]];
        Ok(Self {
            coeffs: coeffs.to_vec(),
            cp,
        })
    }
}

impl CorrelationCalculator for NASA7 {
    fn form_name(&self) -> String {
        "NASA7".to_string()
    }
    fn coefficients(&self) -> Vec<f64> {
        self.coeffs.clone()
    }
    fn calculate(&self, T: f64) -> f64 {
        Cp(T, &self.cp)
    }
    fn calculate_dT(&self, T: f64) -> f64 {
        let a = &self.cp;
        R * (a[1] + 2.0 * a[2] * T + 3.0 * a[3] * T.powi(2) + 4.0 * a[4] * T.powi(3))
    }
    fn integral(&self, T1: f64, T2: f64) -> Option<f64> {
        Some(dh(T2, &self.cp) - dh(T1, &self.cp))
    }
    fn integral_over_T(&self, T1: f64, T2: f64) -> Option<f64> {
        Some(ds(T2, &self.cp) - ds(T1, &self.cp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // CO, low-temperature block of the GRI-Mech data
    const CO: [f64; 7] = [
        3.57953347,
        -6.1035368e-4,
        1.01681433e-6,
        9.07005884e-10,
        -9.04424499e-13,
        -1.4344086e4,
        3.50840928,
    ];

    #[test]
    fn test_nasa7_cp() {
        let fit = NASA7::new(&CO).unwrap();
        let cp = fit.calculate(298.15);
        println!("Cp(CO, 298.15) = {}", cp);
        assert_relative_eq!(cp, 29.1, max_relative = 5e-3);
    }

    #[test]
    fn test_nasa7_rejects_six_coefficients() {
        let err = NASA7::new(&CO[..6]).unwrap_err();
        assert!(matches!(err, CorrelationError::InvalidCoefficients { got: 6, .. }));
    }
}
