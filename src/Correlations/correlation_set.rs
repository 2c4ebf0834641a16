//! # Correlation Set
//!
//! All property correlations of one compound, ranked per property kind.
//!
//! ## Ranking
//! Candidates are kept sorted by [`CorrelationPriority`] (`Reference`, then `Priority`,
//! then `Permitted`); inside one class the registration order is preserved, so the
//! first-registered correlation wins a tie.
//!
//! ## Selection
//! - point evaluation at T: the first ranked candidate whose range covers T; otherwise the
//!   candidate with the nearest range (rank breaks ties), which then extrapolates or fails
//!   according to its own policy;
//! - integrals over [T1, T2]: the first ranked candidate covering the whole interval,
//!   otherwise the candidate selected at the upper bound.
//!
//! Exactly one correlation is used for any single evaluation, so piecewise data never
//! mixes fits inside one integral.
//!
//! ```
//! use KiFlash::Correlations::correlation_set::{CorrelationSet, PropertyKind};
//! use serde_json::json;
//! let set = CorrelationSet::from_serde(json!({
//!     "GasHeatCapacity": [
//!         {"form": "Polynomial", "coeffs": [29.0, 0.002], "T_min": 200.0, "T_max": 1000.0,
//!          "priority": "Reference"}
//!     ]
//! })).unwrap();
//! assert!(set.has(PropertyKind::GasHeatCapacity));
//! assert!(!set.has(PropertyKind::SolidDensity));
//! let dH = set.integrate(PropertyKind::GasHeatCapacity, 300.0, 400.0).unwrap();
//! assert!((dH - (2900.0 + 0.001 * (400.0f64.powi(2) - 300.0f64.powi(2)))).abs() < 1e-9);
//! ```
use super::correlation::{Correlation, CorrelationPriority};
use super::correlation_api::CorrelationError;
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyKind {
    /// Pa
    VaporPressure,
    /// ideal gas, J/(mol K)
    GasHeatCapacity,
    LiquidHeatCapacity,
    SolidHeatCapacity,
    /// mol/m³
    LiquidDensity,
    SolidDensity,
    /// J/mol
    HeatOfVaporization,
    /// Pa s
    GasViscosity,
    LiquidViscosity,
    /// W/(m K)
    GasThermalConductivity,
    LiquidThermalConductivity,
}

#[derive(Debug, Clone, Default)]
pub struct CorrelationSet {
    correlations: HashMap<PropertyKind, Vec<Correlation>>,
}

impl CorrelationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a candidate behind every candidate of the same or better priority.
    pub fn add(&mut self, kind: PropertyKind, correlation: Correlation) {
        let list = self.correlations.entry(kind).or_default();
        let position = list
            .iter()
            .position(|c| c.priority > correlation.priority)
            .unwrap_or(list.len());
        list.insert(position, correlation);
    }

    pub fn with(mut self, kind: PropertyKind, correlation: Correlation) -> Self {
        self.add(kind, correlation);
        self
    }

    /// Parses `{"<PropertyKind>": [record, ...], ...}`. Records are registered in array
    /// order; object keys are visited in sorted order.
    pub fn from_serde(serde: Value) -> Result<Self, CorrelationError> {
        let map = match serde {
            Value::Object(map) => map,
            other => {
                return Err(CorrelationError::Deserialization(format!(
                    "expected an object keyed by property kind, got {}",
                    other
                )));
            }
        };
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        let mut set = Self::new();
        for key in keys {
            let kind: PropertyKind = serde_json::from_value(Value::String(key.clone()))?;
            let records = match &map[key] {
                Value::Array(records) => records.clone(),
                single => vec![single.clone()],
            };
            for record in records {
                set.add(kind, Correlation::from_serde(record)?);
            }
        }
        Ok(set)
    }

    /// capability query
    pub fn has(&self, kind: PropertyKind) -> bool {
        self.correlations.get(&kind).is_some_and(|l| !l.is_empty())
    }

    pub fn candidates(&self, kind: PropertyKind) -> &[Correlation] {
        self.correlations.get(&kind).map(|l| l.as_slice()).unwrap_or(&[])
    }

    fn ranked(&self, kind: PropertyKind) -> Result<&[Correlation], CorrelationError> {
        let list = self.candidates(kind);
        if list.is_empty() {
            return Err(CorrelationError::MissingProperty(kind));
        }
        Ok(list)
    }

    pub fn select(&self, kind: PropertyKind, T: f64) -> Result<&Correlation, CorrelationError> {
        let list = self.ranked(kind)?;
        if let Some(c) = list.iter().find(|c| c.covers(T)) {
            return Ok(c);
        }
        // min_by keeps the first of equal elements, i.e. the better-ranked one
        list.iter()
            .min_by(|a, b| a.distance_to_range(T).total_cmp(&b.distance_to_range(T)))
            .ok_or(CorrelationError::MissingProperty(kind))
    }

    pub fn select_for_interval(
        &self,
        kind: PropertyKind,
        T1: f64,
        T2: f64,
    ) -> Result<&Correlation, CorrelationError> {
        let list = self.ranked(kind)?;
        let (lo, hi) = if T1 < T2 { (T1, T2) } else { (T2, T1) };
        match list.iter().find(|c| c.covers(lo) && c.covers(hi)) {
            Some(c) => Ok(c),
            None => self.select(kind, hi),
        }
    }

    pub fn get(&self, kind: PropertyKind, T: f64) -> Result<f64, CorrelationError> {
        self.select(kind, T)?.evaluate(T)
    }

    pub fn derivative(&self, kind: PropertyKind, T: f64) -> Result<f64, CorrelationError> {
        self.select(kind, T)?.derivative(T)
    }

    pub fn integrate(&self, kind: PropertyKind, T1: f64, T2: f64) -> Result<f64, CorrelationError> {
        self.select_for_interval(kind, T1, T2)?.integrate(T1, T2)
    }

    pub fn integrate_over_T(
        &self,
        kind: PropertyKind,
        T1: f64,
        T2: f64,
    ) -> Result<f64, CorrelationError> {
        self.select_for_interval(kind, T1, T2)?.integrate_over_T(T1, T2)
    }

    /// per kind: the priority classes of the registered candidates, in rank order
    pub fn search_summary(&self) -> Vec<(PropertyKind, Vec<CorrelationPriority>)> {
        let mut summary: Vec<(PropertyKind, Vec<CorrelationPriority>)> = self
            .correlations
            .iter()
            .map(|(kind, list)| (*kind, list.iter().map(|c| c.priority).collect()))
            .collect();
        summary.sort_by_key(|(kind, _)| *kind);
        summary
    }

    /// One row per candidate in rank order: property, rank, form, range, priority, source.
    pub fn search_summary_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(row!["property", "rank", "form", "T range, K", "priority", "source"]);
        let mut kinds: Vec<&PropertyKind> = self.correlations.keys().collect();
        kinds.sort();
        for kind in kinds {
            for (rank, c) in self.correlations[kind].iter().enumerate() {
                table.add_row(row![
                    format!("{:?}", kind),
                    rank + 1,
                    c.form_name(),
                    format!("{} - {}", c.T_min, c.T_max),
                    format!("{:?}", c.priority),
                    c.source
                ]);
            }
        }
        table
    }

    pub fn print_search_summary(&self) {
        self.search_summary_table().printstd();
    }
}
