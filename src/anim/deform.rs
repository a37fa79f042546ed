//! Per-vertex deformation of an FE part.

use std::collections::HashSet;

use tracing::{debug, info, info_span, warn};

use crate::anim::ProgressHost;
use crate::core::{EntityKey, ResultArchive};
use crate::eval::{EccTransform, Evaluator, Resolver, SharedEval};
use crate::model::{FePart, VertexId};
use crate::sink::{FrameIndex, PresentationSink};
use crate::util::{DVec3, Result};

/// Vertex to evaluator mapping of one part.
///
/// Vertices without data in a frame get zero displacement.
pub struct DeformationTable {
    key: EntityKey,
    vertex_count: usize,
    ops: Vec<Option<SharedEval<DVec3>>>,
    /// Export order of vertices, when built with a filter.
    order: Option<Vec<VertexId>>,
    missing_rotations: usize,
}

impl DeformationTable {
    /// Resolve a translation evaluator per vertex of `part`.
    ///
    /// A part without a "Nodes" result set contributes nothing. Archive
    /// entries without a user id, unknown nodes, higher-order nodes and
    /// vertices outside `filter` are skipped. Resolution problems are
    /// listed on `host` and never fail the call.
    pub fn init(
        rdb: &dyn ResultArchive,
        key: EntityKey,
        part: &FePart,
        filter: Option<&[VertexId]>,
        host: &mut dyn ProgressHost,
    ) -> Self {
        let _span = info_span!("init_deformation", part = %key).entered();
        let mesh = &part.mesh;
        let mut table = Self {
            key,
            vertex_count: mesh.vertex_count(),
            ops: vec![None; mesh.vertex_count()],
            order: filter.map(<[VertexId]>::to_vec),
            missing_rotations: 0,
        };

        let Some(entries) = rdb.node_results(key.id) else {
            debug!("no nodal results");
            return table;
        };

        let wanted: Option<HashSet<VertexId>> = filter.map(|f| f.iter().copied().collect());
        let mut res = Resolver::new(rdb);

        for entry in entries {
            let Some(node_id) = entry.user_id else { continue };
            let Some(vertex) = mesh.node(node_id).and_then(|n| n.vertex) else { continue };
            if wanted.as_ref().is_some_and(|w| !w.contains(&vertex)) {
                continue;
            }
            let Some(tra) = res.translation(key.id, node_id) else { continue };

            for edge in mesh.ecc_edges().iter().filter(|e| e.anchor == vertex) {
                let op = match res.rotation(key.id, node_id) {
                    Some(rot) => EccTransform::shared(tra.clone(), rot, edge.offset),
                    None => {
                        debug!(node = node_id, "no rotation, eccentric vertex follows its node");
                        table.missing_rotations += 1;
                        tra.clone()
                    }
                };
                if let Some(slot) = table.ops.get_mut(edge.eccentric) {
                    *slot = Some(op);
                }
            }
            table.ops[vertex] = Some(tra);
        }

        if table.missing_rotations > 0 {
            info!(count = table.missing_rotations, "eccentric vertices without rotation data");
        }

        let log = res.into_log();
        if !log.is_empty() {
            warn!(errors = log.total(), "unresolved deformation results");
            for line in log.lines() {
                host.list(&line);
            }
            host.list(&format!(" *** {key} will lack some deformations due to the above error(s).\n"));
        }

        debug!(ops = table.num_ops(), "deformation reading initialized");
        table
    }

    #[inline]
    pub fn key(&self) -> EntityKey {
        self.key
    }

    /// Number of vertices with an evaluator.
    pub fn num_ops(&self) -> usize {
        self.ops.iter().filter(|o| o.is_some()).count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_ops() == 0
    }

    /// Eccentric vertices that reuse their node's translation.
    #[inline]
    pub fn missing_rotations(&self) -> usize {
        self.missing_rotations
    }

    /// Force re-reads on the next evaluation.
    pub fn invalidate(&self) {
        self.ops.iter().flatten().for_each(|op| op.invalidate());
    }

    fn has_data(&self, rdb: &dyn ResultArchive) -> bool {
        self.ops.iter().flatten().any(|op| op.has_data(rdb))
    }

    /// Deliver the displacement buffer of `frame` unless the sink has it or
    /// no vertex has data yet. Returns whether a buffer was delivered.
    pub fn read_frame(
        &self,
        rdb: &dyn ResultArchive,
        frame: FrameIndex,
        sink: &mut dyn PresentationSink,
    ) -> Result<bool> {
        if sink.has_deformation(self.key, frame) || !self.has_data(rdb) {
            return Ok(false);
        }

        let mut buffer = Vec::new();
        buffer.try_reserve_exact(self.vertex_count)?;
        buffer.resize(self.vertex_count, DVec3::ZERO);
        for (slot, op) in buffer.iter_mut().zip(&self.ops) {
            if let Some(op) = op.as_ref().filter(|op| op.has_data(rdb)) {
                if let Some(d) = op.evaluate(rdb)? {
                    *slot = d;
                }
            }
        }

        sink.set_deformation(self.key, frame, buffer);
        Ok(true)
    }

    /// Displacements in filter order for export. Only vertices with an
    /// evaluator are listed; those without data at this step get zero.
    pub fn read_values(&self, rdb: &dyn ResultArchive) -> Result<Vec<DVec3>> {
        let order: Vec<VertexId> = match &self.order {
            Some(order) => order.clone(),
            None => (0..self.vertex_count).collect(),
        };
        let mut out = Vec::new();
        out.try_reserve_exact(order.len())?;
        for v in order {
            let Some(Some(op)) = self.ops.get(v) else { continue };
            out.push(op.evaluate(rdb)?.unwrap_or(DVec3::ZERO));
        }
        Ok(out)
    }

    /// Release all evaluators.
    pub fn finish(&mut self) {
        self.ops.clear();
        self.order = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::NullProgress;
    use crate::archive::MemArchive;
    use crate::core::{EntityKind, ResultItem, Value};
    use crate::model::{ElementType, FeMesh};
    use crate::sink::FrameStore;

    const KEY: EntityKey = EntityKey::new(EntityKind::Part, 1);

    fn beam_part(ecc: bool) -> FePart {
        let mut b = FeMesh::builder();
        b.node(1, DVec3::ZERO).node(2, DVec3::X).node(3, DVec3::Y);
        b.element(1, ElementType::Beam2, 1, 1, &[1, 2]);
        if ecc {
            b.ecc_vertex(2, DVec3::Z);
        }
        FePart { mesh: b.build(), fe_loaded: true }
    }

    fn tra(node: i32) -> ResultItem {
        ResultItem::Node { part: 1, node }
    }

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl ProgressHost for Recorder {
        fn list(&mut self, msg: &str) {
            self.0.push(msg.to_string());
        }
    }

    #[test]
    fn test_read_frame_zero_fills() {
        let mut b = MemArchive::builder();
        b.nodes(1, [Some(1), Some(2), None, Some(99)]);
        b.set(0.0, tra(1), "Translational deformation", Value::Vec3(DVec3::X));
        b.declare(tra(2), "Translational deformation", crate::core::ValueShape::Vec3);
        let mut rdb = b.build();

        let table = DeformationTable::init(&rdb, KEY, &beam_part(false), None, &mut NullProgress);
        assert_eq!(table.num_ops(), 2);

        let mut sink = FrameStore::new();
        let frame = sink.add_frame(0.0);
        assert!(!table.read_frame(&rdb, frame, &mut sink).unwrap());

        rdb.position_at(0.0);
        assert!(table.read_frame(&rdb, frame, &mut sink).unwrap());
        assert!(!table.read_frame(&rdb, frame, &mut sink).unwrap());
        assert_eq!(sink.deformation_calls, 1);
        assert_eq!(sink.frame(frame).unwrap().deformations[&KEY], vec![DVec3::X, DVec3::ZERO]);
    }

    #[test]
    fn test_no_nodes_set() {
        let rdb = MemArchive::builder().build();
        let table = DeformationTable::init(&rdb, KEY, &beam_part(false), None, &mut NullProgress);
        assert!(table.is_empty());
    }

    #[test]
    fn test_eccentric_vertex() {
        let mut b = MemArchive::builder();
        b.nodes(1, [Some(1), Some(2)]);
        b.set(0.0, tra(1), "Translational deformation", Value::Vec3(DVec3::ZERO));
        b.set(0.0, tra(2), "Translational deformation", Value::Vec3(DVec3::Y));
        b.set(0.0, tra(2), "Angular deformation", Value::Vec3(DVec3::ZERO));
        let mut rdb = b.build();

        let table = DeformationTable::init(&rdb, KEY, &beam_part(true), None, &mut NullProgress);
        assert_eq!(table.num_ops(), 3);
        assert_eq!(table.missing_rotations(), 0);
        rdb.position_at(0.0);
        let values = table.read_values(&rdb).unwrap();
        assert_eq!(values, vec![DVec3::ZERO, DVec3::Y, DVec3::Y]);
    }

    #[test]
    fn test_missing_rotation_reuses_translation() {
        let mut b = MemArchive::builder();
        b.nodes(1, [Some(2)]);
        b.set(0.0, tra(2), "Translational deformation", Value::Vec3(DVec3::Y));
        let rdb = b.build();
        let table = DeformationTable::init(&rdb, KEY, &beam_part(true), None, &mut NullProgress);
        assert_eq!(table.missing_rotations(), 1);
        assert_eq!(table.num_ops(), 2);
    }

    #[test]
    fn test_resolution_errors_listed() {
        let mut b = MemArchive::builder();
        b.nodes(1, [Some(1), Some(2)]);
        let rdb = b.build();
        let mut host = Recorder::default();
        let table = DeformationTable::init(&rdb, KEY, &beam_part(false), None, &mut host);
        assert!(table.is_empty());
        assert_eq!(host.0.len(), 2);
        assert!(host.0[0].ends_with("(2)."));
        assert!(host.0[1].contains("Part [1] will lack some deformations"));
    }

    #[test]
    fn test_filter_order() {
        let mut b = MemArchive::builder();
        b.nodes(1, [Some(1), Some(2)]);
        b.set(0.0, tra(1), "Translational deformation", Value::Vec3(DVec3::X));
        b.set(0.0, tra(2), "Translational deformation", Value::Vec3(DVec3::Y));
        let mut rdb = b.build();
        let table = DeformationTable::init(&rdb, KEY, &beam_part(false), Some(&[1][..]), &mut NullProgress);
        rdb.position_at(0.0);
        assert_eq!(table.read_values(&rdb).unwrap(), vec![DVec3::Y]);
    }
}
