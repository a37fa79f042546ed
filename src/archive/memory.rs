//! In-memory result archive.
//!
//! Steps are kept sorted by time. A "written" watermark hides trailing steps
//! to emulate a solver that is still producing results.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::core::{
    CursorId, EntityId, NodeEntry, ResultArchive, ResultCategory, ResultItem, TimeSet, Value,
    ValueShape, VariableRef, VariableRole,
};
use crate::util::{Chrono, Error, Result, TIME_INVALID};

static NEXT_CURSOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Debug)]
struct VarSlot {
    shape: ValueShape,
    role: VariableRole,
}

#[derive(Clone, Debug, Default)]
struct Step {
    time: Chrono,
    values: HashMap<usize, Value>,
}

/// Result archive held entirely in memory.
#[derive(Debug)]
pub struct MemArchive {
    cursor: CursorId,
    vars: Vec<VarSlot>,
    lookup: HashMap<(ResultItem, String), usize>,
    steps: Vec<Step>,
    written: usize,
    track_last_written: bool,
    categories: HashMap<ResultCategory, TimeSet>,
    node_sets: HashMap<EntityId, Vec<NodeEntry>>,
    pos: Option<usize>,
    stamp: u64,
    precache: Option<ResultCategory>,
}

impl MemArchive {
    /// Start building an archive.
    pub fn builder() -> MemArchiveBuilder {
        MemArchiveBuilder::default()
    }

    /// Total number of recorded steps, written or not.
    #[inline]
    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }

    /// Number of steps visible to readers.
    #[inline]
    pub fn num_written(&self) -> usize {
        self.written
    }

    /// Move the written watermark (clamped to the recorded steps).
    pub fn set_written(&mut self, n: usize) {
        self.written = n.min(self.steps.len());
        if let Some(p) = self.pos {
            if p >= self.written {
                self.pos = None;
            }
        }
    }

    /// Category currently pre-read, if any.
    #[inline]
    pub fn precache_category(&self) -> Option<ResultCategory> {
        self.precache
    }

    fn visible(&self) -> &[Step] {
        &self.steps[..self.written]
    }

    fn current(&self) -> Option<&Step> {
        self.pos.and_then(|p| self.visible().get(p))
    }
}

impl ResultArchive for MemArchive {
    fn cursor_id(&self) -> CursorId {
        self.cursor
    }

    fn reset_positioning(&mut self) {
        self.pos = None;
        self.stamp += 1;
    }

    fn position_at(&mut self, time: Chrono) -> Chrono {
        if time.is_nan() {
            self.pos = None;
            return TIME_INVALID;
        }
        let idx = self.visible().partition_point(|s| s.time < time);
        if idx < self.written {
            self.pos = Some(idx);
            self.stamp += 1;
            self.steps[idx].time
        } else {
            self.pos = None;
            TIME_INVALID
        }
    }

    fn advance(&mut self) -> Chrono {
        match self.pos {
            Some(p) if p + 1 < self.written => {
                self.pos = Some(p + 1);
                self.stamp += 1;
                self.steps[p + 1].time
            }
            _ => TIME_INVALID,
        }
    }

    fn current_time(&self) -> Chrono {
        self.current().map_or(TIME_INVALID, |s| s.time)
    }

    fn position_stamp(&self) -> u64 {
        self.stamp
    }

    fn last_written_time(&self) -> Option<Chrono> {
        if !self.track_last_written {
            return None;
        }
        Some(self.visible().last().map_or(f64::NEG_INFINITY, |s| s.time))
    }

    fn keys(&self, category: ResultCategory) -> TimeSet {
        self.categories.get(&category).cloned().unwrap_or_default()
    }

    fn find_variable(&self, item: &ResultItem, name: &str) -> Option<VariableRef> {
        let key = *self.lookup.get(&(*item, name.to_string()))?;
        let slot = &self.vars[key];
        Some(VariableRef { key, shape: slot.shape, role: slot.role })
    }

    fn node_results(&self, part: EntityId) -> Option<Vec<NodeEntry>> {
        self.node_sets.get(&part).cloned()
    }

    fn has_data(&self, var: &VariableRef) -> bool {
        self.current().is_some_and(|s| s.values.contains_key(&var.key))
    }

    fn read(&self, var: &VariableRef) -> Result<Option<Value>> {
        if var.key >= self.vars.len() {
            return Err(Error::InvalidArchive(format!("unknown variable key {}", var.key)));
        }
        Ok(self.current().and_then(|s| s.values.get(&var.key).copied()))
    }

    fn enable_precache(&mut self, category: ResultCategory) {
        debug!("pre-reading {} steps", category.as_str());
        self.precache = Some(category);
    }

    fn disable_precache(&mut self) {
        self.precache = None;
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`MemArchive`].
#[derive(Debug)]
pub struct MemArchiveBuilder {
    vars: Vec<VarSlot>,
    lookup: HashMap<(ResultItem, String), usize>,
    steps: Vec<Step>,
    written: Option<usize>,
    track_last_written: bool,
    categories: HashMap<ResultCategory, TimeSet>,
    node_sets: HashMap<EntityId, Vec<NodeEntry>>,
}

impl Default for MemArchiveBuilder {
    fn default() -> Self {
        Self {
            vars: Vec::new(),
            lookup: HashMap::new(),
            steps: Vec::new(),
            written: None,
            track_last_written: true,
            categories: HashMap::new(),
            node_sets: HashMap::new(),
        }
    }
}

impl MemArchiveBuilder {
    /// Declare a variable, returning its key. Re-declaring returns the same key.
    pub fn declare(&mut self, item: ResultItem, name: &str, shape: ValueShape) -> usize {
        if let Some(&key) = self.lookup.get(&(item, name.to_string())) {
            return key;
        }
        let key = self.vars.len();
        self.vars.push(VarSlot { shape, role: VariableRole::classify(name) });
        self.lookup.insert((item, name.to_string()), key);
        key
    }

    /// Add an empty step at `time` (no-op if it exists).
    pub fn step(&mut self, time: Chrono) -> &mut Self {
        self.step_index(time);
        self
    }

    /// Record `value` for a variable at `time`, declaring both as needed.
    pub fn set(&mut self, time: Chrono, item: ResultItem, name: &str, value: Value) -> &mut Self {
        let shape = match value {
            Value::Scalar(_) => ValueShape::Scalar,
            Value::Vec3(_) if VariableRole::classify(name) == VariableRole::Rotation => ValueShape::Rot3,
            Value::Vec3(_) => ValueShape::Vec3,
            Value::Transform(_) => ValueShape::Transform,
        };
        let key = self.declare(item, name, shape);
        let idx = self.step_index(time);
        self.steps[idx].values.insert(key, value);
        self
    }

    /// Declare the "Nodes" result set of an FE part.
    pub fn nodes(&mut self, part: EntityId, ids: impl IntoIterator<Item = Option<i32>>) -> &mut Self {
        let entries = ids.into_iter().map(|user_id| NodeEntry { user_id }).collect();
        self.node_sets.insert(part, entries);
        self
    }

    /// Register the recorded times of a category.
    pub fn keys(&mut self, category: ResultCategory, times: impl IntoIterator<Item = Chrono>) -> &mut Self {
        self.categories.insert(category, TimeSet::from_times(times));
        self
    }

    /// Only the first `n` steps are visible after building.
    pub fn written(&mut self, n: usize) -> &mut Self {
        self.written = Some(n);
        self
    }

    /// Build an archive that does not record a last-written time.
    pub fn without_last_written(&mut self) -> &mut Self {
        self.track_last_written = false;
        self
    }

    /// Finish building.
    pub fn build(&mut self) -> MemArchive {
        let steps = std::mem::take(&mut self.steps);
        let written = self.written.unwrap_or(steps.len()).min(steps.len());
        MemArchive {
            cursor: NEXT_CURSOR.fetch_add(1, Ordering::Relaxed),
            vars: std::mem::take(&mut self.vars),
            lookup: std::mem::take(&mut self.lookup),
            steps,
            written,
            track_last_written: self.track_last_written,
            categories: std::mem::take(&mut self.categories),
            node_sets: std::mem::take(&mut self.node_sets),
            pos: None,
            stamp: 0,
            precache: None,
        }
    }

    fn step_index(&mut self, time: Chrono) -> usize {
        let idx = self.steps.partition_point(|s| s.time < time);
        if self.steps.get(idx).is_none_or(|s| s.time != time) {
            self.steps.insert(idx, Step { time, values: HashMap::new() });
        }
        idx
    }
}
