//! Result archive implementations.
//!
//! - [`MemArchive`] - In-memory archive built with [`MemArchiveBuilder`]

mod memory;

pub use memory::{MemArchive, MemArchiveBuilder};
