//! Lazy field evaluators.
//!
//! Evaluators form a DAG of shared read-and-transform nodes. Leaves read one
//! archive variable ([`ReadOp`]); composites derive values from their inputs
//! ([`EccTransform`], [`ScalarReadOp`], [`AverageOp`]). Inputs are held
//! through [`SharedEval`] handles and released when the last owner drops.
//!
//! Every evaluator is bound to the archive cursor it was built against. Using
//! it with another archive is reported as [`Error::StaleEvaluator`].
//!
//! [`Error::StaleEvaluator`]: crate::util::Error::StaleEvaluator

mod read;
mod transform;
mod scalar;
mod resolve;

use std::sync::Arc;

use crate::core::ResultArchive;
use crate::util::Result;

pub use read::ReadOp;
pub use transform::EccTransform;
pub use scalar::{AverageOp, AveragingOp, ScalarReadOp, ToScalar};
pub use resolve::{ResolveLog, Resolver};

/// A lazy, possibly composite, read-and-transform node.
pub trait Evaluator<T>: Send + Sync {
    /// Whether a value is available at the current cursor position.
    /// Cheap and side-effect free.
    fn has_data(&self, rdb: &dyn ResultArchive) -> bool;

    /// Force a re-read on the next [`evaluate`](Self::evaluate).
    /// Propagates to all inputs.
    fn invalidate(&self);

    /// Produce the value at the current position, `None` if unavailable.
    fn evaluate(&self, rdb: &dyn ResultArchive) -> Result<Option<T>>;
}

/// Shared-ownership evaluator handle.
pub type SharedEval<T> = Arc<dyn Evaluator<T>>;
