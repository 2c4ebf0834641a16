use super::correlation_api::{CorrelationCalculator, CorrelationError, check_coeff_count};

/// NIST Shomate heat capacity, J/(mol K):
/// `Cp = A + B t + C t² + D t³ + E/t²` with `t = T/1000`.
/// The F, G, H terms of the NIST tables may be supplied and are kept for reference only.
#[derive(Debug, Clone, PartialEq)]
pub struct Shomate {
    coeffs: Vec<f64>,
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
}

impl Shomate {
    pub fn new(coeffs: &[f64]) -> Result<Self, CorrelationError> {
        check_coeff_count("Shomate", coeffs, 5, 8)?;
        Ok(Self {
            coeffs: coeffs.to_vec(),
            a: coeffs[0],
            b: coeffs[1],
            c: coeffs[2],
            d: coeffs[3],
            e: coeffs[4],
        })
    }

    fn dh(&self, T: f64) -> f64 {
        let t = T / 1000.0;
        1000.0
            * (self.a * t + self.b * t.powi(2) / 2.0 + self.c * t.powi(3) / 3.0
                + self.d * t.powi(4) / 4.0
                - self.e / t)
    }

    fn ds(&self, T: f64) -> f64 {
        let t = T / 1000.0;
        self.a * t.ln() + self.b * t + self.c * t.powi(2) / 2.0 + self.d * t.powi(3) / 3.0
            - self.e / (2.0 * t.powi(2))
    }
}

impl CorrelationCalculator for Shomate {
    fn form_name(&self) -> String {
        "Shomate".to_string()
    }
    fn coefficients(&self) -> Vec<f64> {
        self.coeffs.clone()
    }
    fn calculate(&self, T: f64) -> f64 {
        let t = T / 1000.0;
        self.a + self.b * t + self.c * t.powi(2) + self.d * t.powi(3) + self.e / t.powi(2)
    }
    fn calculate_dT(&self, T: f64) -> f64 {
        let t = T / 1000.0;
        (self.b + 2.0 * self.c * t + 3.0 * self.d * t.powi(2) - 2.0 * self.e / t.powi(3)) / 1000.0
    }
    fn integral(&self, T1: f64, T2: f64) -> Option<f64> {
        Some(self.dh(T2) - self.dh(T1))
    }
    fn integral_over_T(&self, T1: f64, T2: f64) -> Option<f64> {
        Some(self.ds(T2) - self.ds(T1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // N2, 100 - 500 K block of the NIST webbook
    const N2: [f64; 8] = [28.98641, 1.853978, -9.647459, 16.63537, 0.000117, -8.671914, 226.4168, 0.0];

    #[test]
    fn test_shomate_n2() {
        let fit = Shomate::new(&N2).unwrap();
        assert_relative_eq!(fit.calculate(298.15), 29.12, max_relative = 2e-3);
        // H(400) - H(298.15) from the webbook table is 2.97 kJ/mol
        assert_relative_eq!(fit.integral(298.15, 400.0).unwrap(), 2971.0, max_relative = 2e-3);
    }
}
