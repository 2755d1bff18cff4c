//! cr-core: shared foundation for cloudyrun.
//!
//! Contains:
//! - numeric (Real, finiteness checks, engine number formatting)
//! - scaled (magnitude + log/linear keyword values)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod scaled;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use scaled::{Scale, ScaledValue};
