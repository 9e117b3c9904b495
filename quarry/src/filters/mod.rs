//! Filter normalizers for request parameters.
//!
//! Maps `field:operator:value` descriptors onto builder clauses according to
//! the kind of field being filtered.

pub mod normalizers;

pub use normalizers::*;
