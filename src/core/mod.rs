//! Core layer - archive read interface and fundamental types.
//!
//! This module provides:
//! - [`TimeSet`] - Ordered recorded times of a result category
//! - [`ResultItem`] / [`VariableRef`] / [`Value`] - Archive addressing and values
//! - [`ResultArchive`] - Abstract cursor-based archive reader
//! - [`ScratchPool`] - Cursor-scoped memo drained through a scope guard

mod time_set;
mod variable;
mod traits;
mod cache;

pub use time_set::{ResultCategory, TimeSet};
pub use variable::{
    EntityId, EntityKey, EntityKind, FieldValue, ResultItem, Value, ValueShape, VariableRef,
    VariableRole,
};
pub use traits::{CursorId, NodeEntry, ResultArchive};
pub use cache::{ScratchKey, ScratchPool, ScratchScope};
