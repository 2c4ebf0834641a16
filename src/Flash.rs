//! # Flash calculations
//!
//! Phase equilibrium of a mixture at a given pair of state variables. A flash starts from
//! the single phase of lowest Gibbs energy, tests it with the tangent-plane distance
//! criterion and splits it until every phase is stable, then reports the phase amounts,
//! compositions and properties.
//!
//! Entry point: [`flash_solver::FlashSolver`]. Shared solvers and memoized results:
//! [`model_cache::ModelCache`].

/// specification pairs, results, errors
pub mod flash_api;
/// prettytable output of flash results
pub mod flash_output;
/// TP flash state machine, bubble and dew helpers
pub mod flash_solver;
/// successive substitution of the phase split at fixed T and P
pub mod inner_loop;
/// Wilson K-value estimates
pub mod k_values;
/// solver and result cache
pub mod model_cache;
/// H, S, V and vapor-fraction specifications around the TP flash
pub mod outer_loop;
/// two-phase and multiphase Rachford-Rice
pub mod rachford_rice;
/// tangent-plane stability analysis
pub mod stability;

#[cfg(test)]
mod flash_tests;
