use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhaseKind {
    Vapor,
    Liquid,
    Solid,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PhaseKind::Vapor => "vapor",
            PhaseKind::Liquid => "liquid",
            PhaseKind::Solid => "solid",
        };
        write!(f, "{}", name)
    }
}

/// Temperature, pressure, phase kind and mole fractions ordered like the mixture.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseState {
    pub kind: PhaseKind,
    pub T: f64,
    pub P: f64,
    pub composition: Vec<f64>,
    pub names: Vec<String>,
}

impl PhaseState {
    pub fn new(kind: PhaseKind, T: f64, P: f64, composition: Vec<f64>, names: &[String]) -> Self {
        Self {
            kind,
            T,
            P,
            composition,
            names: names.to_vec(),
        }
    }

    pub fn composition_map(&self) -> HashMap<String, f64> {
        self.names
            .iter()
            .cloned()
            .zip(self.composition.iter().copied())
            .collect()
    }

    pub fn mole_fraction(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.composition[i])
    }

    /// largest absolute difference of mole fractions
    pub fn distance(&self, other: &[f64]) -> f64 {
        self.composition
            .iter()
            .zip(other)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}
