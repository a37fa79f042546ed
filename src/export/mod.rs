//! Sequential export of animation results.
//!
//! - [`ExportWriter`] - Geometry and per-step attribute writer
//! - [`JsonExportWriter`] - JSON Lines writer

mod json;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::anim::FringeValues;
use crate::core::EntityId;
use crate::model::{Link, VertexId};
use crate::util::{Chrono, DAffine3, DVec3, Result};

pub use json::JsonExportWriter;

/// Visualization properties written once after the geometry.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ExportProperties {
    pub deformation: bool,
    pub fringe: bool,
    /// Legend range, when set explicitly.
    pub range: Option<(f64, f64)>,
    /// Fringe variable name.
    pub quantity: String,
}

/// Geometry of one link as written.
#[derive(Clone, Debug)]
pub struct LinkGeometry<'a> {
    pub link: &'a Link,
    /// Vertices written for an FE part, in output order. Empty for other links.
    pub vertices: Vec<VertexId>,
    /// Only corner nodes of higher-order elements are written.
    pub first_order: bool,
}

/// Export options of one run.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExportOptions {
    /// Reduce higher-order elements to their corner nodes.
    pub first_order: bool,
    /// Skip steps closer than this to the previous written step.
    pub time_increment: Option<f64>,
}

/// Sequential writer consuming geometry, then time steps.
///
/// Calls arrive in order: `write_geometry`, `write_properties`, then per
/// step `write_step` followed by that step's transforms, deformations and
/// fringes, and finally `close`.
pub trait ExportWriter {
    fn write_geometry(&mut self, links: &[LinkGeometry<'_>]) -> Result<()>;

    fn write_properties(&mut self, props: &ExportProperties) -> Result<()>;

    /// Start a step. `step` is the solver's time step number.
    fn write_step(&mut self, step: i64, time: Chrono) -> Result<()>;

    /// Position matrices of all links at the current step.
    fn write_transformations(&mut self, transforms: &BTreeMap<EntityId, DAffine3>) -> Result<()>;

    /// Displacements of one part in its geometry's vertex order.
    fn write_deformations(&mut self, part: EntityId, displacements: &[DVec3]) -> Result<()>;

    /// Fringe values of one part. `per_element` tells element values from
    /// nodal ones for flat lists.
    fn write_fringes(&mut self, part: EntityId, values: &FringeValues, per_element: bool) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}
