//! Construction of color-transform graphs.
//!
//! Leaf evaluators read one node, element or element-node value and are
//! shared between faces through a scratch pool that only lives while one
//! part's graph is built.

use std::collections::HashSet;

use smallvec::SmallVec;
use tracing::debug;

use crate::anim::fringe::{FringeSetup, Granularity};
use crate::anim::{AveragingItem, ResultClass};
use crate::core::{EntityId, ResultArchive, ResultItem, ScratchKey, ScratchPool};
use crate::eval::{AverageOp, AveragingOp, ResolveLog, Resolver, ScalarReadOp, SharedEval};
use crate::model::{FeElement, FeMesh, GroupPartKind, RenderFace, VertexId};

/// Color evaluators of one rendered face.
#[derive(Clone)]
pub enum FaceColor {
    /// One value for the whole face.
    Face(Option<SharedEval<f64>>),
    /// One value per face vertex.
    Vertices(Vec<Option<SharedEval<f64>>>),
}

impl FaceColor {
    fn is_empty(&self) -> bool {
        match self {
            Self::Face(op) => op.is_none(),
            Self::Vertices(ops) => ops.iter().all(Option::is_none),
        }
    }
}

/// Color evaluators of one group part.
#[derive(Clone)]
pub struct GroupColors {
    /// Index into the mesh's group parts.
    pub group: usize,
    pub faces: Vec<FaceColor>,
}

/// Color-transform graph of one part.
#[derive(Clone, Default)]
pub struct FringeGraph {
    pub groups: Vec<GroupColors>,
    /// Evaluator instances created.
    pub op_count: usize,
    /// Results that could not be resolved.
    pub log: ResolveLog,
}

impl FringeGraph {
    /// Whether any face got an evaluator.
    pub fn has_colors(&self) -> bool {
        self.groups.iter().any(|g| g.faces.iter().any(|f| !f.is_empty()))
    }
}

/// Evaluators of export fringes in first-order node or element order.
#[derive(Clone, Default)]
pub struct ExportFringe {
    pub arity: u8,
    /// One entry per node or element; element-nodal entries hold one
    /// evaluator per corner node.
    pub items: Vec<SmallVec<[Option<SharedEval<f64>>; 8]>>,
    pub op_count: usize,
    pub log: ResolveLog,
}

type LeafPool = ScratchPool<ScratchKey, SharedEval<f64>>;

struct GraphBuilder<'a> {
    res: Resolver<'a>,
    part: EntityId,
    mesh: &'a FeMesh,
    setup: &'a FringeSetup,
    pool: &'a LeafPool,
    composites: usize,
}

impl<'a> GraphBuilder<'a> {
    fn leaf(&mut self, element: i32, node: i32) -> Option<SharedEval<f64>> {
        let (key, item) = match self.setup.result_class {
            ResultClass::Node => (ScratchKey::Node(node), ResultItem::Node { part: self.part, node }),
            ResultClass::Element => {
                (ScratchKey::Element(element), ResultItem::Element { part: self.part, element })
            }
            ResultClass::ElementNode => (
                ScratchKey::ElementNode { element, node },
                ResultItem::ElementNode { part: self.part, element, node },
            ),
        };
        let res = &mut self.res;
        let setup = self.setup;
        self.pool.get_or_try_insert(key, || {
            res.field(item, &setup.variable).map(|read| ScalarReadOp::shared(read, setup.to_scalar))
        })
    }

    fn combine(&mut self, inputs: Vec<SharedEval<f64>>, op: AveragingOp) -> Option<SharedEval<f64>> {
        if inputs.len() > 1 {
            self.composites += 1;
        }
        AverageOp::shared(inputs, op)
    }

    /// Owners of `face` that contribute: those in the preferred group, or
    /// all owners when none is.
    fn contributing_owners(&self, face: &RenderFace) -> SmallVec<[i32; 2]> {
        let preferred: SmallVec<[i32; 2]> =
            face.owners.iter().copied().filter(|&e| self.setup.in_preferred_group(e)).collect();
        if preferred.is_empty() { face.owners.clone() } else { preferred }
    }

    /// Combination over owners of per-owner values.
    fn over_owners(
        &mut self,
        owners: &[i32],
        mut value: impl FnMut(&mut Self, i32) -> Option<SharedEval<f64>>,
    ) -> Option<SharedEval<f64>> {
        let mut inputs = Vec::with_capacity(owners.len());
        for &e in owners {
            if let Some(op) = value(self, e) {
                inputs.push(op);
            }
        }
        let op = self.setup.multi_face_op;
        self.combine(inputs, op)
    }

    /// Value at `node` averaged over the elements sharing it.
    fn node_averaged(&mut self, reference: &FeElement, node: i32) -> Option<SharedEval<f64>> {
        if !self.setup.averages_at_nodes() {
            return self.leaf(reference.id, node);
        }
        let mesh = self.mesh;
        let mut inputs = Vec::new();
        for other in mesh.elements_of_node(node) {
            let accepted = other.id == reference.id
                || (self.setup.tie_break.accepts(mesh, reference, other)
                    && self.setup.in_preferred_group(other.id));
            if accepted {
                if let Some(op) = self.leaf(other.id, node) {
                    inputs.push(op);
                }
            }
        }
        let op = self.setup.averaging_op;
        self.combine(inputs, op)
    }

    /// Element value averaged over `nodes` of the element.
    fn element_averaged(&mut self, element: i32, nodes: &[i32]) -> Option<SharedEval<f64>> {
        let mut inputs = Vec::with_capacity(nodes.len());
        for &n in nodes {
            if let Some(op) = self.leaf(element, n) {
                inputs.push(op);
            }
        }
        let op = match self.setup.averaging_op {
            AveragingOp::None => AveragingOp::Mean,
            op => op,
        };
        self.combine(inputs, op)
    }

    fn face_color(&mut self, face: &RenderFace, granularity: Granularity) -> FaceColor {
        let mesh = self.mesh;
        let owners = self.contributing_owners(face);
        let reference = owners.first().and_then(|&e| mesh.element(e));

        match (self.setup.result_class, granularity) {
            (ResultClass::Node, _) => {
                let first = owners.first().copied().unwrap_or_default();
                FaceColor::Vertices(face.nodes.iter().map(|&n| self.leaf(first, n)).collect())
            }
            (ResultClass::Element, Granularity::PerFace) => {
                FaceColor::Face(self.over_owners(&owners, |b, e| b.leaf(e, 0)))
            }
            (ResultClass::ElementNode, Granularity::PerFace) => {
                let by_face = self.setup.averaging_item == AveragingItem::ElementFace;
                FaceColor::Face(self.over_owners(&owners, |b, e| {
                    let nodes: SmallVec<[i32; 8]> = if by_face {
                        face.nodes.iter().copied().collect()
                    } else {
                        mesh.element(e).map(|el| el.corners().into()).unwrap_or_default()
                    };
                    b.element_averaged(e, &nodes)
                }))
            }
            (_, _) => {
                let Some(reference) = reference else {
                    return FaceColor::Vertices(vec![None; face.nodes.len()]);
                };
                let vertices = face
                    .nodes
                    .iter()
                    .map(|&n| {
                        if self.setup.averages_at_nodes() {
                            self.node_averaged(reference, n)
                        } else {
                            self.over_owners(&owners, |b, e| b.leaf(e, n))
                        }
                    })
                    .collect();
                FaceColor::Vertices(vertices)
            }
        }
    }

    /// Value of `element` at its `corner`, averaged at the node when
    /// node averaging is active.
    fn corner_value(&mut self, element: &FeElement, corner: i32) -> Option<SharedEval<f64>> {
        if self.setup.averages_at_nodes() {
            self.node_averaged(element, corner)
        } else {
            self.leaf(element.id, corner)
        }
    }

    fn op_count(&self) -> usize {
        self.pool.created() + self.composites
    }
}

/// Build the color graph over the face and/or line group parts of a mesh.
pub fn build_color_graph(
    rdb: &dyn ResultArchive,
    part: EntityId,
    mesh: &FeMesh,
    setup: &FringeSetup,
    faces: bool,
    lines: bool,
) -> FringeGraph {
    let pool = LeafPool::new();
    let scope = pool.scope();
    let mut builder = GraphBuilder {
        res: Resolver::new(rdb),
        part,
        mesh,
        setup,
        pool: scope.pool(),
        composites: 0,
    };
    let granularity = setup.granularity();

    let mut graph = FringeGraph::default();
    for (index, group) in mesh.group_parts().iter().enumerate() {
        let wanted = match group.kind {
            GroupPartKind::SurfaceFaces => faces,
            GroupPartKind::SurfaceLines | GroupPartKind::OutlineLines => lines,
        };
        if !wanted {
            continue;
        }
        let colors = group.faces.iter().map(|f| builder.face_color(f, granularity)).collect();
        graph.groups.push(GroupColors { group: index, faces: colors });
    }

    graph.op_count = builder.op_count();
    graph.log = builder.res.into_log();
    debug!(part, ops = graph.op_count, groups = graph.groups.len(), "built color graph");
    graph
}

/// Build export evaluators at the output granularity: nodal values for
/// `vertices`, one value per element, or one value per element corner, in
/// element order.
pub fn build_export_fringe(
    rdb: &dyn ResultArchive,
    part: EntityId,
    mesh: &FeMesh,
    setup: &FringeSetup,
    vertices: &[VertexId],
) -> ExportFringe {
    let pool = LeafPool::new();
    let scope = pool.scope();
    let mut builder = GraphBuilder {
        res: Resolver::new(rdb),
        part,
        mesh,
        setup,
        pool: scope.pool(),
        composites: 0,
    };

    let granularity = setup.granularity();
    let items: Vec<SmallVec<[Option<SharedEval<f64>>; 8]>> = match granularity {
        Granularity::PerVertex => {
            let wanted: HashSet<VertexId> = vertices.iter().copied().collect();
            mesh.nodes()
                .iter()
                .filter(|n| n.vertex.is_some_and(|v| wanted.contains(&v)))
                .map(|n| std::iter::once(builder.leaf(0, n.id)).collect())
                .collect()
        }
        Granularity::PerFace => mesh
            .elements()
            .iter()
            .map(|e| {
                let op = match setup.result_class {
                    ResultClass::ElementNode => builder.element_averaged(e.id, e.corners()),
                    _ => builder.leaf(e.id, 0),
                };
                std::iter::once(op).collect()
            })
            .collect(),
        Granularity::PerFaceVertex => mesh
            .elements()
            .iter()
            .map(|e| e.corners().iter().map(|&n| builder.corner_value(e, n)).collect())
            .collect(),
    };

    let op_count = builder.op_count();
    ExportFringe { arity: granularity.arity(), items, op_count, log: builder.res.into_log() }
}
