use crate::Thermodynamics::compound::Mixture;
use crate::Thermodynamics::phase_model_api::ModelDomainError;

/// Wilson's composition-independent K-value estimate, `K = Pc/P exp(5.37(1 + ω)(1 - Tc/T))`.
pub fn wilson_k_value(T: f64, P: f64, Tc: f64, Pc: f64, omega: f64) -> f64 {
    Pc / P * (5.37 * (1.0 + omega) * (1.0 - Tc / T)).exp()
}

/// K-value estimates for every compound: Wilson when the critical constants are known,
/// otherwise `Psat/P`.
pub fn estimate_k_values(mixture: &Mixture, T: f64, P: f64) -> Result<Vec<f64>, ModelDomainError> {
    mixture
        .compounds()
        .iter()
        .map(|c| match (c.constants.Tc, c.constants.Pc, c.constants.omega) {
            (Some(Tc), Some(Pc), Some(omega)) => Ok(wilson_k_value(T, P, Tc, Pc, omega)),
            _ => Ok(c.vapor_pressure(T)? / P),
        })
        .collect()
}
