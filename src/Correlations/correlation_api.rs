use super::antoine::Antoine;
use super::correlation_set::PropertyKind;
use super::dippr::{Dippr, DipprEquation};
use super::nasa7::NASA7;
use super::polynomial::Polynomial;
use super::shomate::Shomate;
use enum_dispatch::enum_dispatch;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CorrelationError {
    #[error("temperature {T} K is outside the valid range [{T_min}, {T_max}] K of a {form} correlation")]
    OutOfRange {
        form: String,
        T: f64,
        T_min: f64,
        T_max: f64,
    },
    #[error("invalid temperature {0} K")]
    InvalidTemperature(f64),
    #[error("{form} correlation expects {expected} coefficients, got {got}")]
    InvalidCoefficients {
        form: String,
        expected: String,
        got: usize,
    },
    #[error("invalid valid-range [{T_min}, {T_max}] K")]
    InvalidRange { T_min: f64, T_max: f64 },
    #[error("unknown correlation form: {0}")]
    UnknownForm(String),
    #[error("no correlation registered for {0:?}")]
    MissingProperty(PropertyKind),
    #[error("failed to deserialize correlation data: {0}")]
    Deserialization(String),
    #[error("{form} correlation produced a non-finite value at {T} K")]
    NonFinite { form: String, T: f64 },
}

impl From<serde_json::Error> for CorrelationError {
    fn from(err: serde_json::Error) -> Self {
        CorrelationError::Deserialization(err.to_string())
    }
}

/// Variable in which out-of-range extrapolation is linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaturalScale {
    /// value against T
    Linear,
    /// ln(value) against 1/T, the Clausius-Clapeyron form of vapor-pressure-like data
    LogInverseT,
}

/// Evaluation contract shared by all fit families. Methods work on the raw formula and
/// know nothing about the valid range; range handling lives in
/// [`Correlation`](super::correlation::Correlation).
#[enum_dispatch]
pub trait CorrelationCalculator {
    fn form_name(&self) -> String;
    fn coefficients(&self) -> Vec<f64>;
    fn calculate(&self, T: f64) -> f64;
    /// first derivative; numerical unless a family overrides it
    fn calculate_dT(&self, T: f64) -> f64 {
        let h = 1e-6 * T.abs().max(1.0);
        (self.calculate(T + h) - self.calculate(T - h)) / (2.0 * h)
    }
    /// closed-form ∫f dT over [T1, T2], `None` when the family has none
    fn integral(&self, _T1: f64, _T2: f64) -> Option<f64> {
        None
    }
    /// closed-form ∫f/T dT over [T1, T2], `None` when the family has none
    fn integral_over_T(&self, _T1: f64, _T2: f64) -> Option<f64> {
        None
    }
    fn natural_scale(&self) -> NaturalScale {
        NaturalScale::Linear
    }
}

#[derive(Clone, Debug, PartialEq)]
#[enum_dispatch(CorrelationCalculator)]
pub enum CorrelationEnum {
    Polynomial(Polynomial),
    NASA7(NASA7),
    Shomate(Shomate),
    Dippr(Dippr),
    Antoine(Antoine),
}

/////////////////////////////////////////FACTORY METHODS//////////////////////////////////////////////////////

/// Builds a fit family from its record name, e.g. `"NASA7"`, `"DIPPR101"`, `"AntoineMmHg"`.
pub fn create_correlation_by_name(
    form: &str,
    coeffs: &[f64],
) -> Result<CorrelationEnum, CorrelationError> {
    let fit = match form {
        "Polynomial" | "poly" => CorrelationEnum::Polynomial(Polynomial::new(coeffs)?),
        "NASA7" | "NASA" => CorrelationEnum::NASA7(NASA7::new(coeffs)?),
        "Shomate" | "NIST" => CorrelationEnum::Shomate(Shomate::new(coeffs)?),
        "DIPPR100" => CorrelationEnum::Dippr(Dippr::new(DipprEquation::Eq100, coeffs)?),
        "DIPPR101" => CorrelationEnum::Dippr(Dippr::new(DipprEquation::Eq101, coeffs)?),
        "DIPPR102" => CorrelationEnum::Dippr(Dippr::new(DipprEquation::Eq102, coeffs)?),
        "DIPPR104" => CorrelationEnum::Dippr(Dippr::new(DipprEquation::Eq104, coeffs)?),
        "DIPPR105" => CorrelationEnum::Dippr(Dippr::new(DipprEquation::Eq105, coeffs)?),
        "DIPPR106" => CorrelationEnum::Dippr(Dippr::new(DipprEquation::Eq106, coeffs)?),
        "DIPPR107" => CorrelationEnum::Dippr(Dippr::new(DipprEquation::Eq107, coeffs)?),
        "Antoine" => CorrelationEnum::Antoine(Antoine::log10(coeffs, 1.0)?),
        "AntoineLn" => CorrelationEnum::Antoine(Antoine::ln(coeffs, 1.0)?),
        "AntoineKPa" => CorrelationEnum::Antoine(Antoine::log10(coeffs, 1e3)?),
        "AntoineBar" => CorrelationEnum::Antoine(Antoine::log10(coeffs, 1e5)?),
        "AntoineMmHg" => CorrelationEnum::Antoine(Antoine::log10(coeffs, 133.322_368_421)?),
        _ => return Err(CorrelationError::UnknownForm(form.to_string())),
    };
    Ok(fit)
}

/// coefficient-count check shared by the family constructors
pub(crate) fn check_coeff_count(
    form: &str,
    coeffs: &[f64],
    min: usize,
    max: usize,
) -> Result<(), CorrelationError> {
    let n = coeffs.len();
    if n < min || n > max || coeffs.iter().any(|c| !c.is_finite()) {
        let expected = if min == max {
            format!("{}", min)
        } else {
            format!("{}..={}", min, max)
        };
        return Err(CorrelationError::InvalidCoefficients {
            form: form.to_string(),
            expected,
            got: n,
        });
    }
    Ok(())
}
