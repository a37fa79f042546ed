//! In-memory frame store.

use std::collections::HashMap;

use crate::anim::LegendMapping;
use crate::core::EntityKey;
use crate::sink::{ColorLook, FrameIndex, PresentationSink};
use crate::util::{Chrono, DAffine3, DVec3};

/// Color buffer of one group part in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorRecord {
    pub look: ColorLook,
    pub values: Vec<f64>,
}

/// One time-stamped snapshot.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    pub time: Chrono,
    pub transforms: HashMap<EntityKey, DAffine3>,
    pub deformations: HashMap<EntityKey, Vec<DVec3>>,
    pub colors: HashMap<(EntityKey, usize), ColorRecord>,
}

/// Sink that keeps every frame in memory and counts delivery calls.
#[derive(Debug, Default)]
pub struct FrameStore {
    frames: Vec<Frame>,
    by_time: HashMap<u64, FrameIndex>,
    legend: Option<LegendMapping>,
    progress_interval: Option<(Chrono, Chrono)>,
    current_time: Option<Chrono>,
    pub transform_calls: usize,
    pub deformation_calls: usize,
    pub color_calls: usize,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[inline]
    pub fn frame(&self, index: FrameIndex) -> Option<&Frame> {
        self.frames.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame times in creation order.
    pub fn times(&self) -> Vec<Chrono> {
        self.frames.iter().map(|f| f.time).collect()
    }

    /// Legend of the last color buffer or run.
    #[inline]
    pub fn legend(&self) -> Option<&LegendMapping> {
        self.legend.as_ref()
    }

    #[inline]
    pub fn progress_interval(&self) -> Option<(Chrono, Chrono)> {
        self.progress_interval
    }

    #[inline]
    pub fn current_time(&self) -> Option<Chrono> {
        self.current_time
    }

    fn frame_mut(&mut self, index: FrameIndex) -> Option<&mut Frame> {
        self.frames.get_mut(index)
    }
}

impl PresentationSink for FrameStore {
    fn add_frame(&mut self, time: Chrono) -> FrameIndex {
        if let Some(&index) = self.by_time.get(&time.to_bits()) {
            return index;
        }
        let index = self.frames.len();
        self.frames.push(Frame { time, ..Default::default() });
        self.by_time.insert(time.to_bits(), index);
        index
    }

    fn has_transform(&self, entity: EntityKey, frame: FrameIndex) -> bool {
        self.frame(frame).is_some_and(|f| f.transforms.contains_key(&entity))
    }

    fn set_transform(&mut self, entity: EntityKey, frame: FrameIndex, matrix: DAffine3) {
        self.transform_calls += 1;
        if let Some(f) = self.frame_mut(frame) {
            f.transforms.insert(entity, matrix);
        }
    }

    fn has_deformation(&self, entity: EntityKey, frame: FrameIndex) -> bool {
        self.frame(frame).is_some_and(|f| f.deformations.contains_key(&entity))
    }

    fn set_deformation(&mut self, entity: EntityKey, frame: FrameIndex, displacements: Vec<DVec3>) {
        self.deformation_calls += 1;
        if let Some(f) = self.frame_mut(frame) {
            f.deformations.insert(entity, displacements);
        }
    }

    fn has_color(&self, entity: EntityKey, group: usize, frame: FrameIndex) -> bool {
        self.frame(frame).is_some_and(|f| f.colors.contains_key(&(entity, group)))
    }

    fn set_color_look(
        &mut self,
        entity: EntityKey,
        group: usize,
        frame: FrameIndex,
        look: ColorLook,
        values: Vec<f64>,
        legend: &LegendMapping,
    ) {
        self.color_calls += 1;
        if self.legend.as_ref() != Some(legend) {
            self.legend = Some(legend.clone());
        }
        if let Some(f) = self.frame_mut(frame) {
            f.colors.insert((entity, group), ColorRecord { look, values });
        }
    }

    fn set_progress_interval(&mut self, start: Chrono, stop: Chrono) {
        self.progress_interval = Some((start, stop));
    }

    fn move_to_time(&mut self, time: Chrono) {
        self.current_time = Some(time);
    }

    fn set_legend(&mut self, legend: LegendMapping) {
        self.legend = Some(legend);
    }
}
