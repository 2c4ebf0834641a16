#[allow(non_snake_case)]
pub mod Correlations;
#[allow(non_snake_case)]
pub mod Flash;
#[allow(non_snake_case)]
pub mod Thermodynamics;
#[allow(non_snake_case)]
pub mod Utils;
pub mod settings;
