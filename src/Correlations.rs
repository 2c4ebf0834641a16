/// fit family of Antoine vapor pressure equations
pub mod antoine;
/// a fit family with its temperature window, extrapolation policy and priority
pub mod correlation;
/// common trait of all fit families, enum dispatch, errors and the factory by name
pub mod correlation_api;
/// ranked correlations of one compound per property kind
pub mod correlation_set;
/// DIPPR equations 100-107
pub mod dippr;
/// NASA 7-coefficient heat capacity polynomials
pub mod nasa7;
/// plain power series
pub mod polynomial;
/// NIST Shomate heat capacity
pub mod shomate;
