//! Presentation sink: receives per-frame transforms, deformations and colors.
//!
//! - [`PresentationSink`] - Interface driven by the animation pipeline
//! - [`FrameStore`] - In-memory sink recording frames and call counts

mod store;

use crate::anim::LegendMapping;
use crate::core::EntityKey;
use crate::util::{Chrono, DAffine3, DVec3};

pub use store::{ColorRecord, Frame, FrameStore};

/// Index of a frame in the sink.
pub type FrameIndex = usize;

/// How a color buffer maps onto a group part.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorLook {
    /// One value per face (or line).
    PerFace,
    /// One value per face vertex, faces concatenated.
    PerFaceVertex,
}

/// Render target of the animation.
///
/// Idempotence queries let the pipeline skip frames it already delivered.
pub trait PresentationSink {
    /// Frame for `time`, created if the time is new.
    fn add_frame(&mut self, time: Chrono) -> FrameIndex;

    fn has_transform(&self, entity: EntityKey, frame: FrameIndex) -> bool;

    fn set_transform(&mut self, entity: EntityKey, frame: FrameIndex, matrix: DAffine3);

    fn has_deformation(&self, entity: EntityKey, frame: FrameIndex) -> bool;

    /// Per-vertex displacements of an FE part.
    fn set_deformation(&mut self, entity: EntityKey, frame: FrameIndex, displacements: Vec<DVec3>);

    fn has_color(&self, entity: EntityKey, group: usize, frame: FrameIndex) -> bool;

    /// Fringe values of one group part.
    fn set_color_look(
        &mut self,
        entity: EntityKey,
        group: usize,
        frame: FrameIndex,
        look: ColorLook,
        values: Vec<f64>,
        legend: &LegendMapping,
    );

    /// Time interval covered by progressive playback.
    fn set_progress_interval(&mut self, _start: Chrono, _stop: Chrono) {}

    /// Show the frame at `time` during progressive playback.
    fn move_to_time(&mut self, _time: Chrono) {}

    /// Final legend after a run.
    fn set_legend(&mut self, _legend: LegendMapping) {}
}
