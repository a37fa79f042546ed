//! Result items, variable handles and stored values.

use crate::util::{DAffine3, DVec3};
use std::fmt;

/// Base identifier of a model entity.
pub type EntityId = i32;

/// Kind of entity that owns results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// Finite-element part.
    Part,
    /// Beam link.
    Beam,
    /// Any other link type.
    Link,
    /// Point entity.
    Triad,
}

impl EntityKind {
    /// Item name used by the archive.
    pub fn item_name(&self) -> &'static str {
        match self {
            Self::Part => "Part",
            Self::Beam => "Beam",
            Self::Link => "Link",
            Self::Triad => "Triad",
        }
    }
}

/// Kind + base id pair identifying an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityKey {
    pub const fn new(kind: EntityKind, id: EntityId) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.kind.item_name(), self.id)
    }
}

/// Archive location that owns variables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResultItem {
    /// Top-level (global) variables.
    Top,
    /// Entity-level variables (position matrix etc.).
    Entity(EntityKey),
    /// Nodal variables of an FE part.
    Node { part: EntityId, node: i32 },
    /// Element variables of an FE part.
    Element { part: EntityId, element: i32 },
    /// Element-nodal variables of an FE part.
    ElementNode { part: EntityId, element: i32, node: i32 },
}

/// Shape of a stored value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueShape {
    Scalar,
    Vec3,
    Rot3,
    Transform,
}

impl ValueShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scalar => "SCALAR",
            Self::Vec3 => "VEC3",
            Self::Rot3 => "ROT3",
            Self::Transform => "TMAT34",
        }
    }
}

/// A value read at the current cursor position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Scalar(f64),
    Vec3(DVec3),
    Transform(DAffine3),
}

impl Value {
    /// Scalar payload, if any.
    #[inline]
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    /// Vector payload, if any.
    #[inline]
    pub fn as_vec3(&self) -> Option<DVec3> {
        match self {
            Self::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    /// Transform payload, if any.
    #[inline]
    pub fn as_transform(&self) -> Option<DAffine3> {
        match self {
            Self::Transform(m) => Some(*m),
            _ => None,
        }
    }
}

/// Role of an archive variable, decided once when it is resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VariableRole {
    /// Nodal translational deformation.
    Translation,
    /// Nodal angular deformation.
    Rotation,
    /// Entity position matrix.
    Position,
    /// Global time step counter.
    StepNumber,
    /// Any user-selected field variable.
    Field,
}

impl VariableRole {
    /// Classify a variable by its archive name.
    pub fn classify(name: &str) -> Self {
        match name {
            "Translational deformation" => Self::Translation,
            "Angular deformation" => Self::Rotation,
            "Position matrix" => Self::Position,
            "Time step number" => Self::StepNumber,
            _ => Self::Field,
        }
    }

    /// Archive name of the variable for fixed roles.
    pub fn canonical_name(&self) -> Option<&'static str> {
        match self {
            Self::Translation => Some("Translational deformation"),
            Self::Rotation => Some("Angular deformation"),
            Self::Position => Some("Position matrix"),
            Self::StepNumber => Some("Time step number"),
            Self::Field => None,
        }
    }

    /// Shape the variable must have for fixed roles.
    pub fn expected_shape(&self) -> Option<ValueShape> {
        match self {
            Self::Translation => Some(ValueShape::Vec3),
            Self::Rotation => Some(ValueShape::Rot3),
            Self::Position => Some(ValueShape::Transform),
            Self::StepNumber => Some(ValueShape::Scalar),
            Self::Field => None,
        }
    }
}

/// Handle to a variable inside an archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VariableRef {
    /// Archive-internal key.
    pub key: usize,
    pub shape: ValueShape,
    pub role: VariableRole,
}

/// Typed view of a [`Value`].
pub trait FieldValue: Copy + Send + Sync + 'static {
    /// Convert from a stored value, `None` on shape mismatch.
    fn from_value(value: Value) -> Option<Self>;
}

impl FieldValue for f64 {
    #[inline]
    fn from_value(value: Value) -> Option<Self> {
        value.as_scalar()
    }
}

impl FieldValue for DVec3 {
    #[inline]
    fn from_value(value: Value) -> Option<Self> {
        value.as_vec3()
    }
}

impl FieldValue for DAffine3 {
    #[inline]
    fn from_value(value: Value) -> Option<Self> {
        value.as_transform()
    }
}

impl FieldValue for Value {
    #[inline]
    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [
            VariableRole::Translation,
            VariableRole::Rotation,
            VariableRole::Position,
            VariableRole::StepNumber,
        ] {
            let name = role.canonical_name().unwrap();
            assert_eq!(VariableRole::classify(name), role);
        }
        assert_eq!(VariableRole::classify("Von Mises stress"), VariableRole::Field);
        assert!(VariableRole::Field.expected_shape().is_none());
    }

    #[test]
    fn test_entity_key_display() {
        let key = EntityKey::new(EntityKind::Part, 12);
        assert_eq!(key.to_string(), "Part [12]");
    }

    #[test]
    fn test_value_accessors() {
        let v = Value::Scalar(2.5);
        assert_eq!(v.as_scalar(), Some(2.5));
        assert!(v.as_vec3().is_none());
        assert!(Value::Vec3(DVec3::X).as_transform().is_none());
    }
}
