//! # Flash API
//!
//! Specification pairs, results and errors of the flash solver.
//!
//! | spec | known | solved for |
//! |------|-------|------------|
//! | `TP` | T, P | phase split |
//! | `PH`, `PS`, `PV` | P and H, S or V | T |
//! | `TH`, `TS`, `TV` | T and H, S or V | P |
//! | `TVF`, `PVF` | T or P and the vapor fraction | P or T |
use crate::Thermodynamics::phase_model_api::ModelDomainError;
use crate::Thermodynamics::phase_state::{PhaseKind, PhaseState};
use std::fmt;
use thiserror::Error;

/// One known state variable. Units: K, Pa, J/mol, J/(mol K), m³/mol; `VF` is the molar
/// vapor fraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateVar {
    T(f64),
    P(f64),
    H(f64),
    S(f64),
    V(f64),
    VF(f64),
}

impl StateVar {
    fn tag(&self) -> &'static str {
        match self {
            StateVar::T(_) => "T",
            StateVar::P(_) => "P",
            StateVar::H(_) => "H",
            StateVar::S(_) => "S",
            StateVar::V(_) => "V",
            StateVar::VF(_) => "VF",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlashSpec {
    TP { T: f64, P: f64 },
    PH { P: f64, H: f64 },
    PS { P: f64, S: f64 },
    PV { P: f64, V: f64 },
    TH { T: f64, H: f64 },
    TS { T: f64, S: f64 },
    TV { T: f64, V: f64 },
    TVF { T: f64, VF: f64 },
    PVF { P: f64, VF: f64 },
}

impl FlashSpec {
    /// Maps any two of {T, P, H, S, V, VF} onto a specification, in either order, and
    /// checks the values.
    pub fn from_pair(a: StateVar, b: StateVar) -> Result<Self, FlashError> {
        use StateVar::*;
        if a.tag() == b.tag() {
            return Err(FlashError::InvalidSpecification(format!(
                "{} given twice",
                a.tag()
            )));
        }
        let spec = match (a, b) {
            (T(t), P(p)) | (P(p), T(t)) => FlashSpec::TP { T: t, P: p },
            (P(p), H(h)) | (H(h), P(p)) => FlashSpec::PH { P: p, H: h },
            (P(p), S(s)) | (S(s), P(p)) => FlashSpec::PS { P: p, S: s },
            (P(p), V(v)) | (V(v), P(p)) => FlashSpec::PV { P: p, V: v },
            (T(t), H(h)) | (H(h), T(t)) => FlashSpec::TH { T: t, H: h },
            (T(t), S(s)) | (S(s), T(t)) => FlashSpec::TS { T: t, S: s },
            (T(t), V(v)) | (V(v), T(t)) => FlashSpec::TV { T: t, V: v },
            (T(t), VF(f)) | (VF(f), T(t)) => FlashSpec::TVF { T: t, VF: f },
            (P(p), VF(f)) | (VF(f), P(p)) => FlashSpec::PVF { P: p, VF: f },
            _ => {
                return Err(FlashError::UnsupportedSpecification(format!(
                    "{}-{} flash",
                    a.tag(),
                    b.tag()
                )));
            }
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn name(&self) -> &'static str {
        match self {
            FlashSpec::TP { .. } => "TP",
            FlashSpec::PH { .. } => "PH",
            FlashSpec::PS { .. } => "PS",
            FlashSpec::PV { .. } => "PV",
            FlashSpec::TH { .. } => "TH",
            FlashSpec::TS { .. } => "TS",
            FlashSpec::TV { .. } => "TV",
            FlashSpec::TVF { .. } => "TVF",
            FlashSpec::PVF { .. } => "PVF",
        }
    }

    /// the two specified values in the order of the name
    pub fn values(&self) -> (f64, f64) {
        match *self {
            FlashSpec::TP { T, P } => (T, P),
            FlashSpec::PH { P, H } => (P, H),
            FlashSpec::PS { P, S } => (P, S),
            FlashSpec::PV { P, V } => (P, V),
            FlashSpec::TH { T, H } => (T, H),
            FlashSpec::TS { T, S } => (T, S),
            FlashSpec::TV { T, V } => (T, V),
            FlashSpec::TVF { T, VF } => (T, VF),
            FlashSpec::PVF { P, VF } => (P, VF),
        }
    }

    /// Non-physical values: non-finite numbers, T, P or V not positive, VF outside [0, 1].
    pub fn validate(&self) -> Result<(), FlashError> {
        let (a, b) = self.values();
        if !a.is_finite() || !b.is_finite() {
            return Err(FlashError::InvalidSpecification(format!(
                "{} flash with non-finite value ({}, {})",
                self.name(),
                a,
                b
            )));
        }
        let positive = |v: f64, what: &str| {
            if v > 0.0 {
                Ok(())
            } else {
                Err(FlashError::InvalidSpecification(format!("{} = {} must be positive", what, v)))
            }
        };
        match *self {
            FlashSpec::TP { T, P } => {
                positive(T, "T")?;
                positive(P, "P")
            }
            FlashSpec::PH { P, .. } | FlashSpec::PS { P, .. } => positive(P, "P"),
            FlashSpec::TH { T, .. } | FlashSpec::TS { T, .. } => positive(T, "T"),
            FlashSpec::PV { P, V } => {
                positive(P, "P")?;
                positive(V, "V")
            }
            FlashSpec::TV { T, V } => {
                positive(T, "T")?;
                positive(V, "V")
            }
            FlashSpec::TVF { T: x, VF } | FlashSpec::PVF { P: x, VF } => {
                positive(x, if matches!(self, FlashSpec::TVF { .. }) { "T" } else { "P" })?;
                if (0.0..=1.0).contains(&VF) {
                    Ok(())
                } else {
                    Err(FlashError::InvalidSpecification(format!(
                        "vapor fraction {} outside [0, 1]",
                        VF
                    )))
                }
            }
        }
    }

    /// exact bit pattern, used as a cache key
    pub fn key_bits(&self) -> (&'static str, u64, u64) {
        let (a, b) = self.values();
        (self.name(), a.to_bits(), b.to_bits())
    }
}

impl fmt::Display for FlashSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (a, b) = self.values();
        write!(f, "{} flash ({}, {})", self.name(), a, b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStage {
    Inner,
    Outer,
    RachfordRice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// states of the TP flash state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashStage {
    Initial,
    PhaseCountGuess,
    InnerEquilibriumIteration,
    StabilityCheck,
    Converged,
    Terminal(Outcome),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FlashError {
    #[error("{stage:?} iteration failed after {iterations} iterations, residual {residual:e}")]
    Convergence {
        stage: ConvergenceStage,
        iterations: usize,
        residual: f64,
    },
    #[error(transparent)]
    Model(#[from] ModelDomainError),
    #[error("invalid specification: {0}")]
    InvalidSpecification(String),
    #[error("unsupported specification: {0}")]
    UnsupportedSpecification(String),
    #[error("invalid composition: {0}")]
    InvalidComposition(String),
    #[error("cannot serialize model configuration: {0}")]
    Serialization(String),
}

/// A stability trial that ran out of iterations. Recorded, never fatal.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("stability trial {trial_index} ({trial_kind}) inconclusive after {iterations} iterations, residual {residual:e}")]
pub struct StabilityInconclusive {
    pub trial_index: usize,
    pub trial_kind: PhaseKind,
    pub iterations: usize,
    pub residual: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseResult {
    pub state: PhaseState,
    /// molar phase fraction
    pub fraction: f64,
    pub ln_fugacity_coefficients: Vec<f64>,
    /// J/mol
    pub H: f64,
    /// J/(mol K)
    pub S: f64,
    /// m³/mol
    pub V: f64,
}

impl PhaseResult {
    pub fn kind(&self) -> PhaseKind {
        self.state.kind
    }

    pub fn composition(&self) -> &[f64] {
        &self.state.composition
    }

    /// `ln f_i = ln x_i + ln φ_i + ln P`
    pub fn ln_fugacities(&self) -> Vec<f64> {
        self.state
            .composition
            .iter()
            .zip(&self.ln_fugacity_coefficients)
            .map(|(x, l)| x.ln() + l + self.state.P.ln())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvergenceInfo {
    /// successive substitution steps of the last TP flash
    pub inner_iterations: usize,
    pub outer_iterations: usize,
    /// last inner (max |Δ ln K|) or outer (scaled) residual
    pub residual: f64,
    pub stage_transitions: usize,
    pub stability_inconclusive: Vec<StabilityInconclusive>,
    pub phase_limit_reached: bool,
    /// compounds whose pure solid would be more stable than their fluid state
    pub supersaturated_solids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlashResult {
    pub spec: FlashSpec,
    pub T: f64,
    pub P: f64,
    pub z: Vec<f64>,
    pub names: Vec<String>,
    /// sorted by kind (vapor, liquid, solid), then by molar volume
    pub phases: Vec<PhaseResult>,
    pub H: f64,
    pub S: f64,
    pub V: f64,
    pub convergence: ConvergenceInfo,
}

impl FlashResult {
    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    pub fn phases_of(&self, kind: PhaseKind) -> impl Iterator<Item = &PhaseResult> {
        self.phases.iter().filter(move |p| p.kind() == kind)
    }

    /// total fraction of vapor phases
    pub fn vapor_fraction(&self) -> f64 {
        self.phases_of(PhaseKind::Vapor).map(|p| p.fraction).sum()
    }

    /// `Σ_k β_k x_ik`, equal to the feed at convergence
    pub fn overall_composition(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.z.len()];
        for p in &self.phases {
            for (t, x) in total.iter_mut().zip(p.composition()) {
                *t += p.fraction * x;
            }
        }
        total
    }

    /// largest violation of the component mass balance
    pub fn mass_balance_error(&self) -> f64 {
        self.overall_composition()
            .iter()
            .zip(&self.z)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}
