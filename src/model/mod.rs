//! Model graph consumed by the animation pipeline.
//!
//! - [`FeMesh`] - Nodes, elements, vertices and renderable groupings of a part
//! - [`Link`] / [`Triad`] / [`Model`] - Entities that own results

mod mesh;
mod entity;

pub use mesh::{
    EccEdge, ElementGroup, ElementType, FeElement, FeMesh, FeMeshBuilder, FeNode, GroupPart,
    GroupPartKind, RenderFace, VertexId,
};
pub use entity::{FePart, Link, LinkKind, Model, Triad};
