//! Compound data shared by the phase model and flash test suites.
use super::compound::{Compound, CompoundConstants, Mixture};
use crate::Correlations::correlation_set::CorrelationSet;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn benzene() -> Compound {
    let set = CorrelationSet::from_serde(json!({
        "VaporPressure": {"form": "AntoineMmHg", "coeffs": [6.90565, 1211.033, -52.36],
                          "T_min": 280.0, "T_max": 377.0},
        "GasHeatCapacity": {"form": "Polynomial", "coeffs": [-33.92, 0.4739, -3.017e-4, 7.13e-8],
                            "T_min": 200.0, "T_max": 1500.0}
    }))
    .unwrap();
    let constants = CompoundConstants {
        Tc: Some(562.05),
        Pc: Some(4.895e6),
        omega: Some(0.210),
        Tb: Some(353.2),
        molar_mass: Some(78.11),
        Hf: 82_930.0,
        S0: 269.2,
        ..Default::default()
    };
    Compound::new("benzene", constants, set)
}

pub(crate) fn toluene() -> Compound {
    let set = CorrelationSet::from_serde(json!({
        "VaporPressure": {"form": "AntoineMmHg", "coeffs": [6.95464, 1344.8, -53.668],
                          "T_min": 280.0, "T_max": 410.0},
        "GasHeatCapacity": {"form": "Polynomial", "coeffs": [-24.35, 0.5125, -2.765e-4, 4.911e-8],
                            "T_min": 200.0, "T_max": 1500.0}
    }))
    .unwrap();
    let constants = CompoundConstants {
        Tc: Some(591.75),
        Pc: Some(4.108e6),
        omega: Some(0.264),
        Tb: Some(383.8),
        molar_mass: Some(92.14),
        Hf: 50_170.0,
        S0: 320.7,
        ..Default::default()
    };
    Compound::new("toluene", constants, set)
}

pub(crate) fn propane() -> Compound {
    let set = CorrelationSet::from_serde(json!({
        "GasHeatCapacity": {"form": "Polynomial", "coeffs": [-4.224, 0.3063, -1.586e-4, 3.215e-8],
                            "T_min": 200.0, "T_max": 1500.0}
    }))
    .unwrap();
    let constants = CompoundConstants {
        Tc: Some(369.83),
        Pc: Some(4.248e6),
        omega: Some(0.152),
        Hf: -104_680.0,
        S0: 270.3,
        ..Default::default()
    };
    Compound::new("propane", constants, set)
}

pub(crate) fn n_butane() -> Compound {
    let set = CorrelationSet::from_serde(json!({
        "GasHeatCapacity": {"form": "Polynomial", "coeffs": [9.487, 0.3313, -1.108e-4, -2.822e-9],
                            "T_min": 200.0, "T_max": 1500.0}
    }))
    .unwrap();
    let constants = CompoundConstants {
        Tc: Some(425.12),
        Pc: Some(3.796e6),
        omega: Some(0.200),
        Hf: -125_790.0,
        S0: 310.0,
        ..Default::default()
    };
    Compound::new("n-butane", constants, set)
}

/// water with solid data, for the pure-solid model
pub(crate) fn water() -> Compound {
    let set = CorrelationSet::from_serde(json!({
        "VaporPressure": {"form": "AntoineMmHg", "coeffs": [8.07131, 1730.63, -39.724],
                          "T_min": 274.0, "T_max": 373.0},
        "GasHeatCapacity": {"form": "Polynomial", "coeffs": [33.46, 6.88e-3, 7.604e-6, -3.593e-9],
                            "T_min": 200.0, "T_max": 1500.0},
        "LiquidDensity": {"form": "Polynomial", "coeffs": [55_300.0], "T_min": 273.0, "T_max": 373.0},
        "SolidDensity": {"form": "Polynomial", "coeffs": [50_900.0], "T_min": 200.0, "T_max": 273.15}
    }))
    .unwrap();
    let constants = CompoundConstants {
        Tc: Some(647.1),
        Pc: Some(22.064e6),
        omega: Some(0.345),
        Tb: Some(373.15),
        Tm: Some(273.15),
        Hfus: Some(6010.0),
        molar_mass: Some(18.015),
        Hf: -241_826.0,
        S0: 188.8,
    };
    Compound::new("water", constants, set)
}

/// Two fictitious liquids with a symmetric NRTL miscibility gap (`τ = 3`, `α = 0.2`).
pub(crate) fn lle_pair() -> (Compound, Compound) {
    let a = CorrelationSet::from_serde(json!({
        "VaporPressure": {"form": "AntoineLn", "coeffs": [23.454, 4500.0], "T_min": 250.0, "T_max": 450.0},
        "GasHeatCapacity": {"form": "Polynomial", "coeffs": [80.0], "T_min": 200.0, "T_max": 1000.0}
    }))
    .unwrap();
    let b = CorrelationSet::from_serde(json!({
        "VaporPressure": {"form": "AntoineLn", "coeffs": [23.617, 4800.0], "T_min": 250.0, "T_max": 450.0},
        "GasHeatCapacity": {"form": "Polynomial", "coeffs": [95.0], "T_min": 200.0, "T_max": 1000.0}
    }))
    .unwrap();
    let constants = |Tc: f64| CompoundConstants {
        Tc: Some(Tc),
        Pc: Some(4.0e6),
        omega: Some(0.25),
        ..Default::default()
    };
    (
        Compound::new("A", constants(560.0), a),
        Compound::new("B", constants(590.0), b),
    )
}

/// A volatile liquid fully miscible with both members of [`lle_pair`].
pub(crate) fn light_solvent() -> Compound {
    let set = CorrelationSet::from_serde(json!({
        "VaporPressure": {"form": "AntoineLn", "coeffs": [21.51, 3500.0], "T_min": 250.0, "T_max": 450.0},
        "GasHeatCapacity": {"form": "Polynomial", "coeffs": [70.0], "T_min": 200.0, "T_max": 1000.0}
    }))
    .unwrap();
    let constants = CompoundConstants {
        Tc: Some(510.0),
        Pc: Some(4.0e6),
        omega: Some(0.25),
        ..Default::default()
    };
    Compound::new("C", constants, set)
}

pub(crate) fn mixture(compounds: Vec<Compound>) -> Arc<Mixture> {
    Arc::new(Mixture::new(compounds.into_iter().map(Arc::new).collect()).unwrap())
}
