//! # Correlation
//!
//! A fit family together with the temperature window it was fitted on.
//!
//! Inside `[T_min, T_max]` a correlation evaluates its formula and, where the family has
//! one, its closed-form integrals. Outside the window the [`ExtrapolationPolicy`] decides:
//! `Forbid` reports [`CorrelationError::OutOfRange`], `Linear` continues the curve along
//! the tangent at the nearest bound in the family's natural variable
//! (see [`NaturalScale`]). Integrals crossing a bound are split into the in-range part and
//! the extrapolated parts.
//!
//! Correlations arrive from a data collaborator as already-parsed JSON records:
//! ```json
//! {"form": "DIPPR101", "coeffs": [73.649, -7258.2, -7.3037, 4.1653e-6, 2.0],
//!  "T_min": 273.16, "T_max": 647.1, "policy": "Linear", "priority": "Reference",
//!  "source": "DIPPR"}
//! ```
use super::correlation_api::{
    CorrelationCalculator, CorrelationEnum, CorrelationError, NaturalScale,
    create_correlation_by_name,
};
use crate::Utils::numerics::integrate_adaptive;
use log::trace;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const QUADRATURE_TOL: f64 = 1e-11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtrapolationPolicy {
    Forbid,
    #[default]
    Linear,
}

/// Preference class of a correlation. Lower classes are tried first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum CorrelationPriority {
    /// fitted to high-fidelity reference data
    Reference,
    #[default]
    Priority,
    /// wide-range, low-fidelity fallback
    Permitted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRecord {
    pub form: String,
    pub coeffs: Vec<f64>,
    pub T_min: f64,
    pub T_max: f64,
    #[serde(default)]
    pub policy: ExtrapolationPolicy,
    #[serde(default)]
    pub priority: CorrelationPriority,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    pub fit: CorrelationEnum,
    pub T_min: f64,
    pub T_max: f64,
    pub policy: ExtrapolationPolicy,
    pub priority: CorrelationPriority,
    pub source: String,
}

#[derive(Clone, Copy)]
enum Kernel {
    Plain,
    OverT,
}

impl Correlation {
    pub fn new(fit: CorrelationEnum, T_min: f64, T_max: f64) -> Result<Self, CorrelationError> {
        if !(T_min > 0.0) || !(T_max > T_min) || !T_max.is_finite() {
            return Err(CorrelationError::InvalidRange { T_min, T_max });
        }
        Ok(Self {
            fit,
            T_min,
            T_max,
            policy: ExtrapolationPolicy::default(),
            priority: CorrelationPriority::default(),
            source: String::new(),
        })
    }

    pub fn with_policy(mut self, policy: ExtrapolationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_priority(mut self, priority: CorrelationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn from_record(record: CorrelationRecord) -> Result<Self, CorrelationError> {
        let fit = create_correlation_by_name(&record.form, &record.coeffs)?;
        Ok(Self::new(fit, record.T_min, record.T_max)?
            .with_policy(record.policy)
            .with_priority(record.priority)
            .with_source(&record.source))
    }

    pub fn from_serde(serde: Value) -> Result<Self, CorrelationError> {
        let record: CorrelationRecord = serde_json::from_value(serde)?;
        Self::from_record(record)
    }

    pub fn form_name(&self) -> String {
        self.fit.form_name()
    }

    pub fn covers(&self, T: f64) -> bool {
        T >= self.T_min && T <= self.T_max
    }

    pub fn distance_to_range(&self, T: f64) -> f64 {
        if T < self.T_min {
            self.T_min - T
        } else if T > self.T_max {
            T - self.T_max
        } else {
            0.0
        }
    }

    fn check_temperature(T: f64) -> Result<(), CorrelationError> {
        if T > 0.0 && T.is_finite() {
            Ok(())
        } else {
            Err(CorrelationError::InvalidTemperature(T))
        }
    }

    fn out_of_range(&self, T: f64) -> CorrelationError {
        CorrelationError::OutOfRange {
            form: self.form_name(),
            T,
            T_min: self.T_min,
            T_max: self.T_max,
        }
    }

    fn finite(&self, value: f64, T: f64) -> Result<f64, CorrelationError> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(CorrelationError::NonFinite {
                form: self.form_name(),
                T,
            })
        }
    }

    fn edge(&self, T: f64) -> f64 {
        if T < self.T_min { self.T_min } else { self.T_max }
    }

    /// value of the extrapolation from the bound nearest to `T`
    fn extrapolate(&self, T: f64) -> f64 {
        let Te = self.edge(T);
        let fe = self.fit.calculate(Te);
        let de = self.fit.calculate_dT(Te);
        match self.fit.natural_scale() {
            NaturalScale::Linear => fe + de * (T - Te),
            NaturalScale::LogInverseT => {
                // d ln f / d(1/T) at the bound
                let slope = -Te * Te * de / fe;
                fe * (slope * (1.0 / T - 1.0 / Te)).exp()
            }
        }
    }

    pub fn evaluate(&self, T: f64) -> Result<f64, CorrelationError> {
        Self::check_temperature(T)?;
        if self.covers(T) {
            return self.finite(self.fit.calculate(T), T);
        }
        match self.policy {
            ExtrapolationPolicy::Forbid => Err(self.out_of_range(T)),
            ExtrapolationPolicy::Linear => self.finite(self.extrapolate(T), T),
        }
    }

    pub fn derivative(&self, T: f64) -> Result<f64, CorrelationError> {
        Self::check_temperature(T)?;
        if self.covers(T) {
            return self.finite(self.fit.calculate_dT(T), T);
        }
        match self.policy {
            ExtrapolationPolicy::Forbid => Err(self.out_of_range(T)),
            ExtrapolationPolicy::Linear => {
                let Te = self.edge(T);
                let de = self.fit.calculate_dT(Te);
                let d = match self.fit.natural_scale() {
                    NaturalScale::Linear => de,
                    NaturalScale::LogInverseT => {
                        let fe = self.fit.calculate(Te);
                        let slope = -Te * Te * de / fe;
                        -self.extrapolate(T) * slope / (T * T)
                    }
                };
                self.finite(d, T)
            }
        }
    }

    /// ∫ f dT from `T_low` to `T_high`
    pub fn integrate(&self, T_low: f64, T_high: f64) -> Result<f64, CorrelationError> {
        self.integrate_with(T_low, T_high, Kernel::Plain)
    }

    /// ∫ f/T dT from `T_low` to `T_high`
    pub fn integrate_over_T(&self, T_low: f64, T_high: f64) -> Result<f64, CorrelationError> {
        self.integrate_with(T_low, T_high, Kernel::OverT)
    }

    fn integrate_with(&self, T1: f64, T2: f64, kernel: Kernel) -> Result<f64, CorrelationError> {
        Self::check_temperature(T1)?;
        Self::check_temperature(T2)?;
        if T1 == T2 {
            return Ok(0.0);
        }
        let (lo, hi, sign) = if T1 < T2 { (T1, T2, 1.0) } else { (T2, T1, -1.0) };
        if self.policy == ExtrapolationPolicy::Forbid {
            if lo < self.T_min {
                return Err(self.out_of_range(lo));
            }
            if hi > self.T_max {
                return Err(self.out_of_range(hi));
            }
        }
        let mut total = 0.0;
        if lo < self.T_min {
            total += self.extrapolated_integral(lo, hi.min(self.T_min), kernel);
        }
        let (a, b) = (lo.max(self.T_min), hi.min(self.T_max));
        if b > a {
            total += self.in_range_integral(a, b, kernel);
        }
        if hi > self.T_max {
            total += self.extrapolated_integral(lo.max(self.T_max), hi, kernel);
        }
        self.finite(sign * total, hi)
    }

    fn in_range_integral(&self, a: f64, b: f64, kernel: Kernel) -> f64 {
        let closed = match kernel {
            Kernel::Plain => self.fit.integral(a, b),
            Kernel::OverT => self.fit.integral_over_T(a, b),
        };
        match closed {
            Some(value) => value,
            None => {
                trace!("{}: numerical quadrature over [{}, {}]", self.form_name(), a, b);
                match kernel {
                    Kernel::Plain => integrate_adaptive(&|t| self.fit.calculate(t), a, b, QUADRATURE_TOL),
                    Kernel::OverT => {
                        integrate_adaptive(&|t| self.fit.calculate(t) / t, a, b, QUADRATURE_TOL)
                    }
                }
            }
        }
    }

    fn extrapolated_integral(&self, a: f64, b: f64, kernel: Kernel) -> f64 {
        let Te = if b <= self.T_min { self.T_min } else { self.T_max };
        match self.fit.natural_scale() {
            NaturalScale::Linear => {
                let fe = self.fit.calculate(Te);
                let de = self.fit.calculate_dT(Te);
                match kernel {
                    Kernel::Plain => {
                        fe * (b - a) + 0.5 * de * ((b - Te).powi(2) - (a - Te).powi(2))
                    }
                    Kernel::OverT => (fe - de * Te) * (b / a).ln() + de * (b - a),
                }
            }
            NaturalScale::LogInverseT => match kernel {
                Kernel::Plain => integrate_adaptive(&|t| self.extrapolate(t), a, b, QUADRATURE_TOL),
                Kernel::OverT => {
                    integrate_adaptive(&|t| self.extrapolate(t) / t, a, b, QUADRATURE_TOL)
                }
            },
        }
    }
}
