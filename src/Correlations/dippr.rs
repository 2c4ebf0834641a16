//! DIPPR-style equations. Coefficients follow the DIPPR ordering A, B, C, D, E; trailing
//! coefficients may be omitted and are then zero. Equation 106 takes the critical
//! temperature as its first coefficient: `[Tc, A, B, C, D, E]`.
use super::correlation_api::{
    CorrelationCalculator, CorrelationError, NaturalScale, check_coeff_count,
};
use super::polynomial::{Polynomial, horner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DipprEquation {
    /// A + B T + C T² + D T³ + E T⁴
    Eq100,
    /// exp(A + B/T + C ln T + D T^E)
    Eq101,
    /// A T^B / (1 + C/T + D/T²)
    Eq102,
    /// A + B/T + C/T³ + D/T⁸ + E/T⁹
    Eq104,
    /// A / B^(1 + (1 - T/C)^D)
    Eq105,
    /// A (1 - Tr)^(B + C Tr + D Tr² + E Tr³)
    Eq106,
    /// Aly-Lee: A + B ((C/T)/sinh(C/T))² + D ((E/T)/cosh(E/T))²
    Eq107,
}

impl DipprEquation {
    fn number(&self) -> u16 {
        match self {
            DipprEquation::Eq100 => 100,
            DipprEquation::Eq101 => 101,
            DipprEquation::Eq102 => 102,
            DipprEquation::Eq104 => 104,
            DipprEquation::Eq105 => 105,
            DipprEquation::Eq106 => 106,
            DipprEquation::Eq107 => 107,
        }
    }

    fn coeff_bounds(&self) -> (usize, usize) {
        match self {
            DipprEquation::Eq100 => (1, 5),
            DipprEquation::Eq101 => (2, 5),
            DipprEquation::Eq102 => (2, 4),
            DipprEquation::Eq104 => (1, 5),
            DipprEquation::Eq105 => (4, 4),
            DipprEquation::Eq106 => (3, 6),
            DipprEquation::Eq107 => (5, 5),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dippr {
    equation: DipprEquation,
    coeffs: Vec<f64>,
    /// zero-padded to the full length of the equation
    c: Vec<f64>,
    /// closed-form integrals of equation 100
    poly: Option<Polynomial>,
}

impl Dippr {
    pub fn new(equation: DipprEquation, coeffs: &[f64]) -> Result<Self, CorrelationError> {
        let (min, max) = equation.coeff_bounds();
        let form = format!("DIPPR{}", equation.number());
        check_coeff_count(&form, coeffs, min, max)?;
        let mut c = coeffs.to_vec();
        c.resize(max, 0.0);
        if equation == DipprEquation::Eq106 && !(c[0] > 0.0) {
            return Err(CorrelationError::InvalidCoefficients {
                form,
                expected: "positive Tc as first coefficient".to_string(),
                got: coeffs.len(),
            });
        }
        let poly = match equation {
            DipprEquation::Eq100 => Some(Polynomial::new(&c)?),
            _ => None,
        };
        Ok(Self {
            equation,
            coeffs: coeffs.to_vec(),
            c,
            poly,
        })
    }
}

fn ln_sinh(u: f64) -> f64 {
    u + (-(-2.0 * u).exp()).ln_1p() - std::f64::consts::LN_2
}
fn ln_cosh(u: f64) -> f64 {
    u + (-2.0 * u).exp().ln_1p() - std::f64::consts::LN_2
}

impl CorrelationCalculator for Dippr {
    fn form_name(&self) -> String {
        format!("DIPPR{}", self.equation.number())
    }
    fn coefficients(&self) -> Vec<f64> {
        self.coeffs.clone()
    }
    fn calculate(&self, T: f64) -> f64 {
        let c = &self.c;
        match self.equation {
            DipprEquation::Eq100 => horner(c, T),
            DipprEquation::Eq101 => (c[0] + c[1] / T + c[2] * T.ln() + c[3] * T.powf(c[4])).exp(),
            DipprEquation::Eq102 => c[0] * T.powf(c[1]) / (1.0 + c[2] / T + c[3] / T.powi(2)),
            DipprEquation::Eq104 => {
                c[0] + c[1] / T + c[2] / T.powi(3) + c[3] / T.powi(8) + c[4] / T.powi(9)
            }
            DipprEquation::Eq105 => c[0] / c[1].powf(1.0 + (1.0 - T / c[2]).powf(c[3])),
            DipprEquation::Eq106 => {
                let Tr = T / c[0];
                let tau = (1.0 - Tr).max(0.0);
                c[1] * tau.powf(c[2] + c[3] * Tr + c[4] * Tr.powi(2) + c[5] * Tr.powi(3))
            }
            DipprEquation::Eq107 => {
                let x = c[2] / T;
                let y = c[4] / T;
                let sinh_term = if x.abs() < 1e-12 { 1.0 } else { x / x.sinh() };
                let cosh_term = y / y.cosh();
                c[0] + c[1] * sinh_term.powi(2) + c[3] * cosh_term.powi(2)
            }
        }
    }
    fn calculate_dT(&self, T: f64) -> f64 {
        let c = &self.c;
        match self.equation {
            DipprEquation::Eq101 => {
                let dlnf = -c[1] / T.powi(2) + c[2] / T + c[3] * c[4] * T.powf(c[4] - 1.0);
                self.calculate(T) * dlnf
            }
            DipprEquation::Eq104 => {
                -c[1] / T.powi(2)
                    - 3.0 * c[2] / T.powi(4)
                    - 8.0 * c[3] / T.powi(9)
                    - 9.0 * c[4] / T.powi(10)
            }
            DipprEquation::Eq100 => match &self.poly {
                Some(p) => p.calculate_dT(T),
                None => 0.0,
            },
            _ => {
                let h = 1e-6 * T.abs().max(1.0);
                (self.calculate(T + h) - self.calculate(T - h)) / (2.0 * h)
            }
        }
    }
    fn integral(&self, T1: f64, T2: f64) -> Option<f64> {
        let c = &self.c;
        match self.equation {
            DipprEquation::Eq100 => self.poly.as_ref().and_then(|p| p.integral(T1, T2)),
            DipprEquation::Eq104 => {
                let F = |t: f64| {
                    c[0] * t + c[1] * t.ln()
                        - c[2] / (2.0 * t.powi(2))
                        - c[3] / (7.0 * t.powi(7))
                        - c[4] / (8.0 * t.powi(8))
                };
                Some(F(T2) - F(T1))
            }
            DipprEquation::Eq107 => {
                let F = |t: f64| {
                    let mut v = c[0] * t - c[3] * c[4] * (c[4] / t).tanh();
                    if c[2] != 0.0 {
                        v += c[1] * c[2] / (c[2] / t).tanh();
                    }
                    v
                };
                Some(F(T2) - F(T1))
            }
            _ => None,
        }
    }
    fn integral_over_T(&self, T1: f64, T2: f64) -> Option<f64> {
        let c = &self.c;
        match self.equation {
            DipprEquation::Eq100 => self.poly.as_ref().and_then(|p| p.integral_over_T(T1, T2)),
            DipprEquation::Eq104 => {
                let G = |t: f64| {
                    c[0] * t.ln()
                        - c[1] / t
                        - c[2] / (3.0 * t.powi(3))
                        - c[3] / (8.0 * t.powi(8))
                        - c[4] / (9.0 * t.powi(9))
                };
                Some(G(T2) - G(T1))
            }
            DipprEquation::Eq107 => {
                let G = |t: f64| {
                    let mut v = c[0] * t.ln();
                    if c[2] != 0.0 {
                        let x = c[2] / t;
                        v += c[1] * (x / x.tanh() - ln_sinh(x));
                    }
                    let y = c[4] / t;
                    v - c[3] * (y * y.tanh() - ln_cosh(y))
                };
                Some(G(T2) - G(T1))
            }
            _ => None,
        }
    }
    fn natural_scale(&self) -> NaturalScale {
        match self.equation {
            DipprEquation::Eq101 => NaturalScale::LogInverseT,
            _ => NaturalScale::Linear,
        }
    }
}
