//! Abstract read interface of a result archive.
//!
//! The archive owns a single cursor. Positioning and stepping failures are
//! reported through [`TIME_INVALID`](crate::util::TIME_INVALID) rather than
//! errors: they end the current read loop and every caller must check them.

use crate::core::{EntityId, ResultCategory, ResultItem, TimeSet, Value, VariableRef};
use crate::util::{Chrono, Result};

/// Identity of one archive cursor. Evaluators record it when built.
pub type CursorId = u64;

/// Entry of an FE part's per-node ("Nodes") result set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeEntry {
    /// Node user id, `None` for entries of unexpected type.
    pub user_id: Option<i32>,
}

// ============================================================================
// Archive Trait
// ============================================================================

/// Reader interface for a time-indexed result archive.
pub trait ResultArchive: Send {
    /// Unique id of this archive's cursor.
    fn cursor_id(&self) -> CursorId;

    /// Forget the current position.
    fn reset_positioning(&mut self);

    /// Seek to the closest recorded time at or after `time`.
    ///
    /// Returns the time obtained, or `TIME_INVALID` if there is none.
    fn position_at(&mut self, time: Chrono) -> Chrono;

    /// Move strictly forward to the next recorded time.
    ///
    /// Returns the new time, or `TIME_INVALID` at the end of the archive.
    fn advance(&mut self) -> Chrono;

    /// Time at the current position (`TIME_INVALID` when not positioned).
    fn current_time(&self) -> Chrono;

    /// Counter bumped on every successful reposition.
    fn position_stamp(&self) -> u64;

    /// Last time completely written by the solver, `None` if the archive
    /// does not record it.
    fn last_written_time(&self) -> Option<Chrono>;

    /// Recorded times of a result category (empty if not enumerable).
    fn keys(&self, category: ResultCategory) -> TimeSet;

    /// Look up a variable by owner item and name.
    fn find_variable(&self, item: &ResultItem, name: &str) -> Option<VariableRef>;

    /// Per-node result set of an FE part, `None` if the part has none.
    fn node_results(&self, part: EntityId) -> Option<Vec<NodeEntry>>;

    /// Whether `var` has a value at the current position. Side-effect free.
    fn has_data(&self, var: &VariableRef) -> bool;

    /// Read `var` at the current position.
    fn read(&self, var: &VariableRef) -> Result<Option<Value>>;

    /// Hint that a category will be read step by step.
    fn enable_precache(&mut self, _category: ResultCategory) {}

    /// Drop any pre-read step data and disable pre-reading.
    fn disable_precache(&mut self) {}

    /// Drop the pre-read data of the current step only.
    fn clear_precached_step(&mut self) {}
}
