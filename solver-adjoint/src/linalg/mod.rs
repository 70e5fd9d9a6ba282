//! Linear algebra layer.
//!
//! Sparse matrix operations, adjoint KKT system building, and factorization backends.

pub mod sparse;
pub mod kkt;
pub mod backend;
