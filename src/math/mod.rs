//! Numerical kernels: the Gauss–Jordan sweep used by stepwise selection.

pub mod sweep;

pub use sweep::*;
