//! sp-core: numeric foundation for smithsim.
//!
//! Contains:
//! - numeric (Real + tolerances + float/step helpers)
//! - error (shared error types)

pub mod error;
pub mod numeric;

pub use error::{CoreError, CoreResult};
pub use numeric::*;
