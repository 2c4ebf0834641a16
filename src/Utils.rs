/// logger initialization on top of simplelog
pub mod logger;
/// quadrature, finite differences and cubic roots shared by correlations and phase models
pub mod numerics;
