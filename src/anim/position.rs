//! Position matrix reading of links and free triads.

use std::collections::HashMap;

use tracing::debug;

use crate::core::{EntityKey, ResultArchive};
use crate::eval::{Evaluator, Resolver, SharedEval};
use crate::sink::{FrameIndex, PresentationSink};
use crate::util::{DAffine3, Result};

/// Position matrix evaluators keyed by entity.
#[derive(Default)]
pub struct PositionTable {
    ops: HashMap<EntityKey, SharedEval<DAffine3>>,
}

impl PositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the position matrix of `key`. Returns whether one exists.
    pub fn init_entity(&mut self, rdb: &dyn ResultArchive, key: EntityKey) -> bool {
        let mut res = Resolver::new(rdb);
        match res.position(key) {
            Some(op) => {
                self.ops.insert(key, op);
                true
            }
            None => {
                debug!(entity = %key, "no position matrix");
                false
            }
        }
    }

    #[inline]
    pub fn contains(&self, key: EntityKey) -> bool {
        self.ops.contains_key(&key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Read the transform of `key` into `frame`.
    ///
    /// Returns `false` only when the entity has an evaluator without data
    /// at the current position.
    pub fn read(
        &self,
        rdb: &dyn ResultArchive,
        key: EntityKey,
        frame: FrameIndex,
        sink: &mut dyn PresentationSink,
    ) -> Result<bool> {
        let Some(op) = self.ops.get(&key) else {
            return Ok(true);
        };
        if !op.has_data(rdb) {
            return Ok(false);
        }
        if sink.has_transform(key, frame) {
            return Ok(true);
        }
        op.invalidate();
        match op.evaluate(rdb)? {
            Some(m) => {
                sink.set_transform(key, frame, m);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Current transform of `key` for export.
    pub fn value(&self, rdb: &dyn ResultArchive, key: EntityKey) -> Result<Option<DAffine3>> {
        match self.ops.get(&key) {
            Some(op) => op.evaluate(rdb),
            None => Ok(None),
        }
    }

    pub fn finish_entity(&mut self, key: EntityKey) {
        self.ops.remove(&key);
    }

    pub fn finish_all(&mut self) {
        self.ops.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemArchive;
    use crate::core::{EntityKind, ResultItem, Value};
    use crate::sink::FrameStore;
    use crate::util::DVec3;

    #[test]
    fn test_read_transform() {
        let triad = EntityKey::new(EntityKind::Triad, 3);
        let link = EntityKey::new(EntityKind::Link, 4);
        let m = DAffine3::from_translation(DVec3::new(1.0, 2.0, 3.0));
        let mut b = MemArchive::builder();
        b.set(0.0, ResultItem::Entity(triad), "Position matrix", Value::Transform(m));
        b.step(1.0);
        let mut rdb = b.build();

        let mut table = PositionTable::new();
        assert!(table.init_entity(&rdb, triad));
        assert!(!table.init_entity(&rdb, link));
        assert_eq!(table.len(), 1);

        let mut sink = FrameStore::new();
        rdb.position_at(0.0);
        let f0 = sink.add_frame(0.0);
        assert!(table.read(&rdb, triad, f0, &mut sink).unwrap());
        assert!(table.read(&rdb, triad, f0, &mut sink).unwrap());
        assert!(table.read(&rdb, link, f0, &mut sink).unwrap());
        assert_eq!(sink.transform_calls, 1);
        assert_eq!(sink.frame(f0).unwrap().transforms[&triad], m);

        rdb.advance();
        let f1 = sink.add_frame(1.0);
        assert!(!table.read(&rdb, triad, f1, &mut sink).unwrap());

        table.finish_entity(triad);
        assert!(table.is_empty());
    }
}
