//! Finite-element topology of a part.
//!
//! The mesh is read-only for the animation pipeline. Vertices are the
//! renderable points: every node used as an element corner gets one, and
//! eccentric vertices are appended for visualization offsets.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::util::DVec3;

/// Index of a renderable vertex.
pub type VertexId = usize;

/// Supported element topologies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    Beam2,
    Tri3,
    Tri6,
    Quad4,
    Quad8,
    Tet4,
    Tet10,
    Hex8,
    Hex20,
}

impl ElementType {
    /// Number of first-order (corner) nodes. Corners are listed first.
    pub fn corner_count(&self) -> usize {
        match self {
            Self::Beam2 => 2,
            Self::Tri3 | Self::Tri6 => 3,
            Self::Quad4 | Self::Quad8 | Self::Tet4 | Self::Tet10 => 4,
            Self::Hex8 | Self::Hex20 => 8,
        }
    }

    #[inline]
    pub fn is_shell(&self) -> bool {
        matches!(self, Self::Tri3 | Self::Tri6 | Self::Quad4 | Self::Quad8)
    }

    #[inline]
    pub fn is_line(&self) -> bool {
        matches!(self, Self::Beam2)
    }
}

/// FE node.
#[derive(Clone, Debug)]
pub struct FeNode {
    pub id: i32,
    pub position: DVec3,
    /// Vertex of this node, `None` for higher-order nodes.
    pub vertex: Option<VertexId>,
}

/// FE element.
#[derive(Clone, Debug)]
pub struct FeElement {
    pub id: i32,
    pub elm_type: ElementType,
    pub material: i32,
    pub property: i32,
    pub nodes: SmallVec<[i32; 8]>,
}

impl FeElement {
    /// Corner node ids.
    #[inline]
    pub fn corners(&self) -> &[i32] {
        let n = self.elm_type.corner_count().min(self.nodes.len());
        &self.nodes[..n]
    }
}

/// A rendered face or line segment.
#[derive(Clone, Debug, Default)]
pub struct RenderFace {
    /// Elements owning this face (several for shared faces).
    pub owners: SmallVec<[i32; 2]>,
    /// Node ids of the face vertices in drawing order.
    pub nodes: SmallVec<[i32; 4]>,
}

impl RenderFace {
    pub fn new(owners: &[i32], nodes: &[i32]) -> Self {
        Self { owners: owners.into(), nodes: nodes.into() }
    }
}

/// Kind of renderable sub-mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupPartKind {
    SurfaceFaces,
    SurfaceLines,
    OutlineLines,
}

impl GroupPartKind {
    #[inline]
    pub fn is_lines(&self) -> bool {
        !matches!(self, Self::SurfaceFaces)
    }
}

/// Renderable grouping of faces or lines.
#[derive(Clone, Debug)]
pub struct GroupPart {
    pub kind: GroupPartKind,
    pub faces: Vec<RenderFace>,
}

impl GroupPart {
    /// Total number of face vertices.
    pub fn vertex_count(&self) -> usize {
        self.faces.iter().map(|f| f.nodes.len()).sum()
    }
}

/// Visualization-only vertex offset from an anchor node.
#[derive(Clone, Copy, Debug)]
pub struct EccEdge {
    /// Vertex of the structural node.
    pub anchor: VertexId,
    /// The offset vertex.
    pub eccentric: VertexId,
    /// Offset vector from anchor to eccentric vertex.
    pub offset: DVec3,
}

/// Named user group of elements.
#[derive(Clone, Debug)]
pub struct ElementGroup {
    pub id: i32,
    pub name: String,
    pub elements: Vec<i32>,
}

impl ElementGroup {
    /// Display string, `[id] name`.
    pub fn info_string(&self) -> String {
        format!("[{}] {}", self.id, self.name)
    }
}

// ============================================================================
// Mesh
// ============================================================================

/// Topology of one FE part.
#[derive(Clone, Debug, Default)]
pub struct FeMesh {
    nodes: Vec<FeNode>,
    node_index: HashMap<i32, usize>,
    elements: Vec<FeElement>,
    element_index: HashMap<i32, usize>,
    node_elements: HashMap<i32, SmallVec<[usize; 4]>>,
    vertex_count: usize,
    ecc_edges: Vec<EccEdge>,
    group_parts: Vec<GroupPart>,
    groups: Vec<ElementGroup>,
}

impl FeMesh {
    pub fn builder() -> FeMeshBuilder {
        FeMeshBuilder::default()
    }

    #[inline]
    pub fn nodes(&self) -> &[FeNode] {
        &self.nodes
    }

    #[inline]
    pub fn node(&self, id: i32) -> Option<&FeNode> {
        self.node_index.get(&id).map(|&i| &self.nodes[i])
    }

    #[inline]
    pub fn elements(&self) -> &[FeElement] {
        &self.elements
    }

    #[inline]
    pub fn element(&self, id: i32) -> Option<&FeElement> {
        self.element_index.get(&id).map(|&i| &self.elements[i])
    }

    /// Elements referencing `node`.
    pub fn elements_of_node(&self, node: i32) -> impl Iterator<Item = &FeElement> + '_ {
        self.node_elements
            .get(&node)
            .into_iter()
            .flat_map(|v| v.iter().map(|&i| &self.elements[i]))
    }

    /// Number of renderable vertices, eccentric ones included.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    pub fn ecc_edges(&self) -> &[EccEdge] {
        &self.ecc_edges
    }

    #[inline]
    pub fn group_parts(&self) -> &[GroupPart] {
        &self.group_parts
    }

    #[inline]
    pub fn groups(&self) -> &[ElementGroup] {
        &self.groups
    }

    /// Find a group by its `[id] name` display string.
    pub fn group_by_info(&self, info: &str) -> Option<&ElementGroup> {
        self.groups.iter().find(|g| g.info_string() == info)
    }

    /// Vertices of first-order nodes in node order.
    pub fn first_order_vertices(&self) -> Vec<VertexId> {
        self.nodes.iter().filter_map(|n| n.vertex).collect()
    }

    /// Rest position of every vertex. Eccentric vertices sit at their
    /// anchor plus the offset.
    pub fn vertex_positions(&self) -> Vec<DVec3> {
        let mut out = vec![DVec3::ZERO; self.vertex_count];
        for n in &self.nodes {
            if let Some(v) = n.vertex {
                out[v] = n.position;
            }
        }
        for e in &self.ecc_edges {
            out[e.eccentric] = out[e.anchor] + e.offset;
        }
        out
    }

    /// Unit normal of a shell element from its first corners.
    pub fn shell_normal(&self, elem: &FeElement) -> Option<DVec3> {
        if !elem.elm_type.is_shell() {
            return None;
        }
        let c = elem.corners();
        let p = |i: usize| self.node(c[i]).map(|n| n.position);
        let (a, b, d) = (p(0)?, p(1)?, p(c.len() - 1)?);
        (b - a).cross(d - a).try_normalize()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Incremental [`FeMesh`] construction.
#[derive(Debug, Default)]
pub struct FeMeshBuilder {
    mesh: FeMesh,
}

impl FeMeshBuilder {
    /// Add a node. Vertices are assigned when the node becomes a corner.
    pub fn node(&mut self, id: i32, position: DVec3) -> &mut Self {
        let idx = self.mesh.nodes.len();
        self.mesh.nodes.push(FeNode { id, position, vertex: None });
        self.mesh.node_index.insert(id, idx);
        self
    }

    /// Add an element. Unknown node ids are kept but get no vertex.
    pub fn element(
        &mut self,
        id: i32,
        elm_type: ElementType,
        material: i32,
        property: i32,
        nodes: &[i32],
    ) -> &mut Self {
        let idx = self.mesh.elements.len();
        let elem = FeElement { id, elm_type, material, property, nodes: nodes.into() };
        for &n in elem.corners() {
            if let Some(&ni) = self.mesh.node_index.get(&n) {
                if self.mesh.nodes[ni].vertex.is_none() {
                    self.mesh.nodes[ni].vertex = Some(self.mesh.vertex_count);
                    self.mesh.vertex_count += 1;
                }
            }
        }
        for &n in &elem.nodes {
            self.mesh.node_elements.entry(n).or_default().push(idx);
        }
        self.mesh.elements.push(elem);
        self.mesh.element_index.insert(id, idx);
        self
    }

    /// Append an eccentric vertex offset from `anchor_node`'s vertex.
    pub fn ecc_vertex(&mut self, anchor_node: i32, offset: DVec3) -> Option<VertexId> {
        let anchor = self.mesh.node(anchor_node)?.vertex?;
        let eccentric = self.mesh.vertex_count;
        self.mesh.vertex_count += 1;
        self.mesh.ecc_edges.push(EccEdge { anchor, eccentric, offset });
        Some(eccentric)
    }

    pub fn group(&mut self, id: i32, name: &str, elements: &[i32]) -> &mut Self {
        self.mesh.groups.push(ElementGroup { id, name: name.to_string(), elements: elements.to_vec() });
        self
    }

    pub fn group_part(&mut self, kind: GroupPartKind, faces: Vec<RenderFace>) -> &mut Self {
        self.mesh.group_parts.push(GroupPart { kind, faces });
        self
    }

    /// Derive surface faces from shell elements and outline lines from
    /// line elements.
    pub fn auto_group_parts(&mut self) -> &mut Self {
        let mut faces = Vec::new();
        let mut lines = Vec::new();
        for e in &self.mesh.elements {
            if e.elm_type.is_shell() {
                faces.push(RenderFace::new(&[e.id], e.corners()));
            } else if e.elm_type.is_line() {
                lines.push(RenderFace::new(&[e.id], e.corners()));
            }
        }
        if !faces.is_empty() {
            self.group_part(GroupPartKind::SurfaceFaces, faces);
        }
        if !lines.is_empty() {
            self.group_part(GroupPartKind::OutlineLines, lines);
        }
        self
    }

    pub fn build(&mut self) -> FeMesh {
        std::mem::take(&mut self.mesh)
    }
}
