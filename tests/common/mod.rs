//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashSet;

use rdb_anim::core::{
    CursorId, EntityId, EntityKey, EntityKind, NodeEntry, ResultArchive, ResultCategory, ResultItem, TimeSet, Value,
    VariableRef,
};
use rdb_anim::anim::AnalysisSettings;
use rdb_anim::model::{ElementType, FeMesh, Link};
use rdb_anim::prelude::*;
use rdb_anim::util::{DAffine3, DVec3};

pub const TRANSLATION: &str = "Translational deformation";
pub const POSITION: &str = "Position matrix";

pub fn link_key(id: EntityId) -> EntityKey {
    EntityKey::new(EntityKind::Link, id)
}

pub fn part_key(id: EntityId) -> EntityKey {
    EntityKey::new(EntityKind::Part, id)
}

pub fn shift(x: f64) -> Value {
    Value::Transform(DAffine3::from_translation(DVec3::new(x, 0.0, 0.0)))
}

/// Beam part with two nodes and two vertices.
pub fn beam_part(id: EntityId) -> Link {
    let mut b = FeMesh::builder();
    b.node(1, DVec3::ZERO).node(2, DVec3::X);
    b.element(1, ElementType::Beam2, 1, 1, &[1, 2]);
    b.auto_group_parts();
    Link::fe_part(id, b.build())
}

/// Two coplanar quads, elements 10 and 11.
pub fn quad_part(id: EntityId) -> Link {
    let mut b = FeMesh::builder();
    for (i, (x, y)) in [(0., 0.), (1., 0.), (2., 0.), (0., 1.), (1., 1.), (2., 1.)].into_iter().enumerate() {
        b.node(i as i32 + 1, DVec3::new(x, y, 0.0));
    }
    b.element(10, ElementType::Quad4, 1, 1, &[1, 2, 5, 4]);
    b.element(11, ElementType::Quad4, 1, 1, &[2, 3, 6, 5]);
    b.auto_group_parts();
    Link::fe_part(id, b.build())
}

/// Position matrices of `part` and node translations growing with time.
pub fn record_beam(b: &mut MemArchiveBuilder, part: EntityId, times: &[f64]) {
    b.nodes(part, [Some(1), Some(2)]);
    for &t in times {
        b.set(t, ResultItem::Entity(part_key(part)), POSITION, shift(t));
        b.set(t, ResultItem::Node { part, node: 1 }, TRANSLATION, Value::Vec3(DVec3::new(t, 0.0, 0.0)));
        b.set(t, ResultItem::Node { part, node: 2 }, TRANSLATION, Value::Vec3(DVec3::new(0.0, t, 0.0)));
        b.set(t, ResultItem::Top, "Time step number", Value::Scalar((t * 10.0).round()));
    }
}

pub fn analysis(start: f64, stop: f64) -> AnalysisSettings {
    AnalysisSettings { start, stop, ..Default::default() }
}

// ============================================================================
// Hosts
// ============================================================================

/// Host recording every message, cancelling after `limit` polls.
#[derive(Debug, Default)]
pub struct ScriptedHost {
    pub limit: Option<usize>,
    pub polls: usize,
    pub progress: Vec<f64>,
    pub lists: Vec<String>,
    pub notices: Vec<String>,
}

impl ScriptedHost {
    pub fn cancel_after(polls: usize) -> Self {
        Self { limit: Some(polls), ..Default::default() }
    }
}

impl ProgressHost for ScriptedHost {
    fn set_progress(&mut self, percent: f64) {
        self.progress.push(percent);
    }

    fn is_cancelled(&mut self) -> bool {
        self.polls += 1;
        self.limit.is_some_and(|n| self.polls > n)
    }

    fn list(&mut self, msg: &str) {
        self.lists.push(msg.to_string());
    }

    fn notice(&mut self, msg: &str) {
        self.notices.push(msg.to_string());
    }
}

// ============================================================================
// Fault injection
// ============================================================================

/// Archive wrapper whose reads of selected variables fail with
/// [`Error::OutOfMemory`].
pub struct FaultyArchive {
    inner: MemArchive,
    failing: HashSet<usize>,
}

impl FaultyArchive {
    /// Fail every read of `name` on `item`.
    pub fn new(inner: MemArchive, faults: &[(ResultItem, &str)]) -> Self {
        let failing = faults
            .iter()
            .filter_map(|(item, name)| inner.find_variable(item, name))
            .map(|v| v.key)
            .collect();
        Self { inner, failing }
    }
}

impl ResultArchive for FaultyArchive {
    fn cursor_id(&self) -> CursorId {
        self.inner.cursor_id()
    }

    fn reset_positioning(&mut self) {
        self.inner.reset_positioning()
    }

    fn position_at(&mut self, time: Chrono) -> Chrono {
        self.inner.position_at(time)
    }

    fn advance(&mut self) -> Chrono {
        self.inner.advance()
    }

    fn current_time(&self) -> Chrono {
        self.inner.current_time()
    }

    fn position_stamp(&self) -> u64 {
        self.inner.position_stamp()
    }

    fn last_written_time(&self) -> Option<Chrono> {
        self.inner.last_written_time()
    }

    fn keys(&self, category: ResultCategory) -> TimeSet {
        self.inner.keys(category)
    }

    fn find_variable(&self, item: &ResultItem, name: &str) -> Option<VariableRef> {
        self.inner.find_variable(item, name)
    }

    fn node_results(&self, part: EntityId) -> Option<Vec<NodeEntry>> {
        self.inner.node_results(part)
    }

    fn has_data(&self, var: &VariableRef) -> bool {
        self.inner.has_data(var)
    }

    fn read(&self, var: &VariableRef) -> Result<Option<Value>> {
        if self.failing.contains(&var.key) {
            return Err(Error::out_of_memory("injected"));
        }
        self.inner.read(var)
    }

    fn clear_precached_step(&mut self) {
        self.inner.clear_precached_step()
    }
}
