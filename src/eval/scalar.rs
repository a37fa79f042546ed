//! Scalar reduction and averaging evaluators used for fringes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{ResultArchive, Value};
use crate::eval::{Evaluator, SharedEval};
use crate::util::{DVec3, Error, Result};

/// Reduction of a raw value to a scalar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToScalar {
    /// Scalars pass through; vectors reduce to their length.
    #[default]
    None,
    Length,
    X,
    Y,
    Z,
    #[serde(rename = "Max abs component")]
    MaxAbsComponent,
}

impl ToScalar {
    pub fn apply(&self, v: DVec3) -> f64 {
        match self {
            Self::None | Self::Length => v.length(),
            Self::X => v.x,
            Self::Y => v.y,
            Self::Z => v.z,
            Self::MaxAbsComponent => v.abs().max_element(),
        }
    }
}

/// Combination of several scalar contributions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AveragingOp {
    /// No combination: the first contribution wins.
    None,
    #[default]
    Mean,
    Max,
    Min,
    #[serde(rename = "Absolute max")]
    AbsMax,
    #[serde(rename = "Absolute min")]
    AbsMin,
}

impl AveragingOp {
    /// Operator by display name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "None" => Self::None,
            "Mean" | "Average" => Self::Mean,
            "Max" => Self::Max,
            "Min" => Self::Min,
            "Absolute max" => Self::AbsMax,
            "Absolute min" => Self::AbsMin,
            _ => return None,
        })
    }

    /// Combine `values`, `None` when empty.
    pub fn combine(&self, values: &[f64]) -> Option<f64> {
        let first = *values.first()?;
        let rest = values.iter().copied();
        Some(match self {
            Self::None => first,
            Self::Mean => rest.sum::<f64>() / values.len() as f64,
            Self::Max => rest.fold(f64::NEG_INFINITY, f64::max),
            Self::Min => rest.fold(f64::INFINITY, f64::min),
            Self::AbsMax => rest.fold(first, |a, b| if b.abs() > a.abs() { b } else { a }),
            Self::AbsMin => rest.fold(first, |a, b| if b.abs() < a.abs() { b } else { a }),
        })
    }
}

// ============================================================================
// Evaluators
// ============================================================================

/// Reduces a raw value to a scalar.
pub struct ScalarReadOp {
    read: SharedEval<Value>,
    op: ToScalar,
}

impl ScalarReadOp {
    pub fn shared(read: SharedEval<Value>, op: ToScalar) -> SharedEval<f64> {
        Arc::new(Self { read, op })
    }
}

impl Evaluator<f64> for ScalarReadOp {
    fn has_data(&self, rdb: &dyn ResultArchive) -> bool {
        self.read.has_data(rdb)
    }

    fn invalidate(&self) {
        self.read.invalidate();
    }

    fn evaluate(&self, rdb: &dyn ResultArchive) -> Result<Option<f64>> {
        match self.read.evaluate(rdb)? {
            None => Ok(None),
            Some(Value::Scalar(v)) => Ok(Some(v)),
            Some(Value::Vec3(v)) => Ok(Some(self.op.apply(v))),
            Some(other) => Err(Error::TypeMismatch {
                expected: "SCALAR or VEC3".to_string(),
                actual: format!("{other:?}"),
            }),
        }
    }
}

/// Combines the available values of several inputs.
pub struct AverageOp {
    inputs: Vec<SharedEval<f64>>,
    op: AveragingOp,
}

impl AverageOp {
    pub fn new(inputs: Vec<SharedEval<f64>>, op: AveragingOp) -> Self {
        Self { inputs, op }
    }

    /// Shared handle; a single input is returned as is.
    pub fn shared(mut inputs: Vec<SharedEval<f64>>, op: AveragingOp) -> Option<SharedEval<f64>> {
        match inputs.len() {
            0 => None,
            1 => inputs.pop(),
            _ => Some(Arc::new(Self::new(inputs, op))),
        }
    }

    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }
}

impl Evaluator<f64> for AverageOp {
    fn has_data(&self, rdb: &dyn ResultArchive) -> bool {
        self.inputs.iter().any(|i| i.has_data(rdb))
    }

    fn invalidate(&self) {
        self.inputs.iter().for_each(|i| i.invalidate());
    }

    fn evaluate(&self, rdb: &dyn ResultArchive) -> Result<Option<f64>> {
        let mut values = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            if let Some(v) = input.evaluate(rdb)? {
                values.push(v);
            }
        }
        Ok(self.op.combine(&values))
    }
}
