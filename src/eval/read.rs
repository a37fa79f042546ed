//! Leaf evaluator reading one archive variable.

use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::{CursorId, FieldValue, ResultArchive, VariableRef};
use crate::eval::{Evaluator, SharedEval};
use crate::util::{Error, Result};

/// Reads a variable at the current cursor position.
///
/// The last value is kept together with the position stamp it was read at,
/// so repeated evaluation at one position reads the archive once.
pub struct ReadOp<T> {
    var: VariableRef,
    cursor: CursorId,
    cache: Mutex<Option<(u64, T)>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FieldValue> ReadOp<T> {
    /// Bind `var` to the cursor of `rdb`.
    pub fn new(rdb: &dyn ResultArchive, var: VariableRef) -> Self {
        Self {
            var,
            cursor: rdb.cursor_id(),
            cache: Mutex::new(None),
            _marker: PhantomData,
        }
    }

    /// Create a shared handle.
    pub fn shared(rdb: &dyn ResultArchive, var: VariableRef) -> SharedEval<T> {
        Arc::new(Self::new(rdb, var))
    }

    #[inline]
    pub fn variable(&self) -> VariableRef {
        self.var
    }

    fn check_cursor(&self, rdb: &dyn ResultArchive) -> Result<()> {
        let current = rdb.cursor_id();
        if current != self.cursor {
            return Err(Error::StaleEvaluator { built: self.cursor, current });
        }
        Ok(())
    }
}

impl<T: FieldValue> Evaluator<T> for ReadOp<T> {
    fn has_data(&self, rdb: &dyn ResultArchive) -> bool {
        rdb.cursor_id() == self.cursor && rdb.has_data(&self.var)
    }

    fn invalidate(&self) {
        *self.cache.lock() = None;
    }

    fn evaluate(&self, rdb: &dyn ResultArchive) -> Result<Option<T>> {
        self.check_cursor(rdb)?;

        let stamp = rdb.position_stamp();
        if let Some((at, value)) = *self.cache.lock() {
            if at == stamp {
                return Ok(Some(value));
            }
        }

        let Some(raw) = rdb.read(&self.var)? else {
            return Ok(None);
        };
        let value = T::from_value(raw).ok_or_else(|| Error::TypeMismatch {
            expected: self.var.shape.as_str().to_string(),
            actual: format!("{raw:?}"),
        })?;

        *self.cache.lock() = Some((stamp, value));
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemArchive;
    use crate::core::{ResultItem, Value};
    use crate::util::DVec3;

    fn archive() -> MemArchive {
        let item = ResultItem::Node { part: 1, node: 1 };
        let mut b = MemArchive::builder();
        b.set(0.0, item, "Translational deformation", Value::Vec3(DVec3::X));
        b.set(1.0, item, "Translational deformation", Value::Vec3(DVec3::Y));
        b.build()
    }

    #[test]
    fn test_read_follows_cursor() {
        let mut rdb = archive();
        let var = rdb.find_variable(&ResultItem::Node { part: 1, node: 1 }, "Translational deformation").unwrap();
        let op: ReadOp<DVec3> = ReadOp::new(&rdb, var);

        assert!(!op.has_data(&rdb));
        assert_eq!(op.evaluate(&rdb).unwrap(), None);

        rdb.position_at(0.0);
        assert!(op.has_data(&rdb));
        assert_eq!(op.evaluate(&rdb).unwrap(), Some(DVec3::X));

        rdb.advance();
        assert_eq!(op.evaluate(&rdb).unwrap(), Some(DVec3::Y));
        op.invalidate();
        assert_eq!(op.evaluate(&rdb).unwrap(), Some(DVec3::Y));
    }

    #[test]
    fn test_stale_cursor() {
        let rdb = archive();
        let other = archive();
        let var = rdb.find_variable(&ResultItem::Node { part: 1, node: 1 }, "Translational deformation").unwrap();
        let op: ReadOp<DVec3> = ReadOp::new(&rdb, var);
        assert!(!op.has_data(&other));
        assert!(matches!(op.evaluate(&other), Err(Error::StaleEvaluator { .. })));
    }

    #[test]
    fn test_type_mismatch() {
        let mut rdb = archive();
        let var = rdb.find_variable(&ResultItem::Node { part: 1, node: 1 }, "Translational deformation").unwrap();
        let op: ReadOp<f64> = ReadOp::new(&rdb, var);
        rdb.position_at(0.0);
        assert!(matches!(op.evaluate(&rdb), Err(Error::TypeMismatch { .. })));
    }
}
