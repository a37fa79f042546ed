//! Per-frame fringe reading of one part.

use serde::Serialize;
use tracing::{debug, info_span, warn};

use crate::anim::fringe::{
    build_color_graph, build_export_fringe, ExportFringe, FaceColor, FringeGraph, FringeSetup,
    LegendMapping, SpecialValue,
};
use crate::anim::{AnimationConfig, ProgressHost};
use crate::core::{EntityKey, ResultArchive};
use crate::eval::{ResolveLog, SharedEval};
use crate::model::{FePart, VertexId};
use crate::sink::{ColorLook, FrameIndex, PresentationSink};
use crate::util::Result;

/// Missing value in a color buffer.
pub const NO_VALUE: f64 = f64::INFINITY;

/// Running min/max of fringe values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ValueRange {
    fn default() -> Self {
        Self { min: f64::INFINITY, max: f64::NEG_INFINITY }
    }
}

impl ValueRange {
    #[inline]
    pub fn include(&mut self, v: f64) {
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn merge(&mut self, other: &ValueRange) {
        if !other.is_empty() {
            self.include(other.min);
            self.include(other.max);
        }
    }

    /// `(min, max)` when anything was seen.
    pub fn as_option(&self) -> Option<(f64, f64)> {
        (!self.is_empty()).then_some((self.min, self.max))
    }
}

/// Export fringe values of one step.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FringeValues {
    /// One value per node or element.
    Flat(Vec<f64>),
    /// One list of corner values per element.
    ElementNodal(Vec<Vec<f64>>),
}

/// Fringe evaluators of one part for the duration of a run.
pub struct FringeTable {
    key: EntityKey,
    setup: FringeSetup,
    graph: FringeGraph,
    export: Option<ExportFringe>,
}

impl FringeTable {
    /// Build the fringe graph of `part`.
    ///
    /// With a vertex filter, export evaluators are built instead and the
    /// return value is the result arity (0 nodal, 1 element, 2 element-nodal).
    /// Otherwise it is the number of evaluators created. Resolution problems
    /// are listed on `host` and never fail the call.
    pub fn init(
        rdb: &dyn ResultArchive,
        key: EntityKey,
        part: &FePart,
        config: &AnimationConfig,
        filter: Option<&[VertexId]>,
        host: &mut dyn ProgressHost,
    ) -> (Self, usize) {
        let _span = info_span!("init_fringe", part = %key).entered();
        let setup = FringeSetup::resolve(&config.fringe, &part.mesh);

        let mut table = Self { key, setup, graph: FringeGraph::default(), export: None };
        let result = match filter {
            Some(vertices) => {
                let mut export = build_export_fringe(rdb, key.id, &part.mesh, &table.setup, vertices);
                report_unresolved(key, std::mem::take(&mut export.log), host);
                let arity = export.arity as usize;
                table.export = Some(export);
                arity
            }
            None => {
                table.graph = build_color_graph(
                    rdb,
                    key.id,
                    &part.mesh,
                    &table.setup,
                    config.load_face_fringe,
                    config.load_line_fringe,
                );
                report_unresolved(key, std::mem::take(&mut table.graph.log), host);
                table.graph.op_count
            }
        };
        debug!(result, "fringe reading initialized");
        (table, result)
    }

    #[inline]
    pub fn setup(&self) -> &FringeSetup {
        &self.setup
    }

    #[inline]
    pub fn special(&self) -> SpecialValue {
        self.setup.special
    }

    /// Whether any rendered face has a color evaluator.
    pub fn has_colors(&self) -> bool {
        self.graph.has_colors()
    }

    /// Force re-reads on the next evaluation.
    pub fn invalidate(&self) {
        for group in &self.graph.groups {
            for face in &group.faces {
                match face {
                    FaceColor::Face(op) => invalidate(op),
                    FaceColor::Vertices(ops) => ops.iter().for_each(invalidate),
                }
            }
        }
        if let Some(export) = &self.export {
            export.items.iter().flatten().for_each(invalidate);
        }
    }

    /// Read the color buffers of every group not yet delivered for `frame`.
    /// Returns the number of buffers delivered.
    pub fn read_frame(
        &self,
        rdb: &dyn ResultArchive,
        frame: FrameIndex,
        sink: &mut dyn PresentationSink,
        legend: &LegendMapping,
        range: &mut ValueRange,
    ) -> Result<usize> {
        let look = self.setup.granularity().look();
        let mut delivered = 0;

        for group in &self.graph.groups {
            if sink.has_color(self.key, group.group, frame) {
                continue;
            }

            let len = match look {
                ColorLook::PerFace => group.faces.len(),
                ColorLook::PerFaceVertex => group
                    .faces
                    .iter()
                    .map(|f| match f {
                        FaceColor::Face(_) => 1,
                        FaceColor::Vertices(v) => v.len(),
                    })
                    .sum(),
            };
            let mut values = Vec::new();
            values.try_reserve_exact(len)?;

            for face in &group.faces {
                match face {
                    FaceColor::Face(op) => values.push(self.value(rdb, op, range)?),
                    FaceColor::Vertices(ops) => {
                        for op in ops {
                            values.push(self.value(rdb, op, range)?);
                        }
                    }
                }
            }

            sink.set_color_look(self.key, group.group, frame, look, values, legend);
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Export values of the current step.
    pub fn read_values(&self, rdb: &dyn ResultArchive, range: &mut ValueRange) -> Result<FringeValues> {
        let Some(export) = &self.export else {
            return Ok(FringeValues::Flat(Vec::new()));
        };
        if export.arity == 2 {
            let mut out = Vec::new();
            out.try_reserve_exact(export.items.len())?;
            for item in &export.items {
                let mut corners = Vec::with_capacity(item.len());
                for op in item {
                    corners.push(self.value(rdb, op, range)?);
                }
                out.push(corners);
            }
            Ok(FringeValues::ElementNodal(out))
        } else {
            let mut out = Vec::new();
            out.try_reserve_exact(export.items.len())?;
            for item in &export.items {
                let op = item.first().cloned().flatten();
                out.push(self.value(rdb, &op, range)?);
            }
            Ok(FringeValues::Flat(out))
        }
    }

    fn value(&self, rdb: &dyn ResultArchive, op: &Option<SharedEval<f64>>, range: &mut ValueRange) -> Result<f64> {
        let Some(op) = op else {
            return Ok(NO_VALUE);
        };
        let Some(v) = op.evaluate(rdb)? else {
            return Ok(NO_VALUE);
        };
        if self.setup.special.is_special(v) {
            return Ok(self.setup.special.replacement);
        }
        if v.is_finite() {
            range.include(v);
        }
        Ok(v)
    }

    /// Release the graph.
    pub fn finish(&mut self) {
        self.graph = FringeGraph::default();
        self.export = None;
    }
}

fn report_unresolved(key: EntityKey, log: ResolveLog, host: &mut dyn ProgressHost) {
    if log.is_empty() {
        return;
    }
    warn!(part = %key, errors = log.total(), "unresolved fringe results");
    for line in log.lines() {
        host.list(&line);
    }
    host.list(&format!(" *** {key} will lack some fringe values due to the above error(s).\n"));
}

fn invalidate(op: &Option<SharedEval<f64>>) {
    if let Some(op) = op {
        op.invalidate();
    }
}
