//! Utility types and functions.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam and rotation helpers
//! - Tracing subscriber setup

mod error;
mod math;
pub mod logging;

pub use error::*;
pub use math::*;
