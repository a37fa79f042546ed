//! # rdb-anim
//!
//! Time-series result extraction and per-frame assembly of transforms,
//! deformations and fringe colors from simulation result archives.
//!
//! ## Modules
//!
//! - [`util`] - Errors, math helpers, tracing setup
//! - [`core`] - Archive read interface, time sets, variables, scratch pool
//! - [`archive`] - In-memory archive
//! - [`model`] - FE meshes, links, triads
//! - [`eval`] - Lazy evaluator graph over archive values
//! - [`anim`] - Time window, stepping, deformation and fringe pipelines, drivers
//! - [`sink`] - Presentation sink interface and a recording sink
//! - [`export`] - Sequential export writers
//!
//! ## Example
//!
//! ```ignore
//! use rdb_anim::prelude::*;
//!
//! let mut creator = AnimationCreator::new(archive);
//! let mut frames = FrameStore::new();
//! let report = creator.load_animation(&model, &config, &mut frames, &mut NullProgress)?;
//! println!("{} steps, range {:?}", report.steps, report.fringe_range);
//! ```

pub mod util;
pub mod core;
pub mod archive;
pub mod model;
pub mod eval;
pub mod anim;
pub mod sink;
pub mod export;

// Re-export commonly used types
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Chrono, Error, Result};
    pub use crate::core::{EntityKey, EntityKind, ResultArchive, ResultCategory, ResultItem, Value};
    pub use crate::archive::{MemArchive, MemArchiveBuilder};
    pub use crate::model::{FeMesh, FePart, Link, LinkKind, Model, Triad};
    pub use crate::anim::{
        AnimationConfig, AnimationCreator, ExportReport, LoadReport, NullProgress, ProgressHost,
    };
    pub use crate::sink::{FrameStore, PresentationSink};
    pub use crate::export::{ExportOptions, ExportWriter, JsonExportWriter};
}
