//! Fringe setup resolved once per part and run.

use std::collections::HashSet;

use tracing::debug;

use crate::anim::{AveragingItem, FringeConfig, ResultClass};
use crate::eval::{AveragingOp, ToScalar};
use crate::model::{FeElement, FeMesh};
use crate::sink::ColorLook;

/// Generic "undefined" marker written by the solver.
pub const SPECIAL_VALUE: f64 = 1.0e20;

/// Remap of solver "undefined" markers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpecialValue {
    pub value: f64,
    pub replacement: f64,
}

impl SpecialValue {
    /// Replacement chosen by variable name. Damage quantities map their
    /// markers onto values that stay on the legend.
    pub fn for_variable(name: &str) -> Self {
        let replacement = match name {
            "Damage" => 1.0e-20,
            "Log Damage" => -20.0,
            "Log Life (repeats)" | "Log Life (equnits)" => 20.0,
            _ => SPECIAL_VALUE,
        };
        Self { value: SPECIAL_VALUE, replacement }
    }

    /// Relative comparison; stored values may be single precision.
    #[inline]
    pub fn is_special(&self, v: f64) -> bool {
        (v - self.value).abs() < self.value.abs() / 1.0e7
    }

    /// `v`, or the replacement when `v` is the marker.
    #[inline]
    pub fn remap(&self, v: f64) -> f64 {
        if self.is_special(v) { self.replacement } else { v }
    }
}

/// Output granularity of a fringe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Granularity {
    PerVertex,
    PerFace,
    PerFaceVertex,
}

impl Granularity {
    /// 0 nodal, 1 element, 2 element-nodal.
    pub fn arity(&self) -> u8 {
        match self {
            Self::PerVertex => 0,
            Self::PerFace => 1,
            Self::PerFaceVertex => 2,
        }
    }

    pub fn look(&self) -> ColorLook {
        match self {
            Self::PerFace => ColorLook::PerFace,
            Self::PerVertex | Self::PerFaceVertex => ColorLook::PerFaceVertex,
        }
    }
}

/// Predicates deciding which elements may be averaged together.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TieBreak {
    pub across_material: bool,
    pub across_property: bool,
    pub across_element_type: bool,
    /// Cosine of the maximum angle between averaged shell normals.
    pub min_normal_cos: f64,
}

impl TieBreak {
    /// Whether `other` may be averaged with `reference`.
    pub fn accepts(&self, mesh: &FeMesh, reference: &FeElement, other: &FeElement) -> bool {
        if reference.id == other.id {
            return true;
        }
        if !self.across_material && reference.material != other.material {
            return false;
        }
        if !self.across_property && reference.property != other.property {
            return false;
        }
        if !self.across_element_type && reference.elm_type != other.elm_type {
            return false;
        }
        match (mesh.shell_normal(reference), mesh.shell_normal(other)) {
            (Some(a), Some(b)) => a.dot(b) >= self.min_normal_cos,
            _ => true,
        }
    }
}

/// Immutable fringe configuration of one part.
#[derive(Clone, Debug)]
pub struct FringeSetup {
    pub result_class: ResultClass,
    pub variable: String,
    pub to_scalar: ToScalar,
    pub averaging_op: AveragingOp,
    pub averaging_item: AveragingItem,
    pub multi_face_op: AveragingOp,
    /// Members of the named element group preferred when averaging.
    pub preferred_group: Option<HashSet<i32>>,
    pub tie_break: TieBreak,
    pub special: SpecialValue,
}

impl FringeSetup {
    /// Resolve `config` against the groups of `mesh`.
    ///
    /// A multi-face averaging entry naming an existing `[id] name` group
    /// selects that group and forces the `Mean` operator.
    pub fn resolve(config: &FringeConfig, mesh: &FeMesh) -> Self {
        let policy = config.multi_face_averaging.trim();
        let (multi_face_op, preferred_group) = if policy.starts_with('[') {
            match mesh.group_by_info(policy) {
                Some(group) => {
                    debug!(group = policy, "averaging across element group");
                    (AveragingOp::Mean, Some(group.elements.iter().copied().collect()))
                }
                None => (AveragingOp::Mean, None),
            }
        } else {
            (AveragingOp::from_name(policy).unwrap_or_default(), None)
        };

        Self {
            result_class: config.result_class,
            variable: config.variable.clone(),
            to_scalar: config.to_scalar,
            averaging_op: config.averaging_op,
            averaging_item: config.averaging_item,
            multi_face_op,
            preferred_group,
            tie_break: TieBreak {
                across_material: config.average_across_material,
                across_property: config.average_across_property,
                across_element_type: config.average_across_element_type,
                min_normal_cos: config.max_membrane_angle.to_radians().cos(),
            },
            special: SpecialValue::for_variable(&config.variable),
        }
    }

    /// Granularity of the data handed to the sink.
    pub fn granularity(&self) -> Granularity {
        match (self.result_class, self.averaging_item) {
            (ResultClass::Node, _) => Granularity::PerVertex,
            (ResultClass::Element, AveragingItem::Node) => Granularity::PerFaceVertex,
            (ResultClass::Element, _) => Granularity::PerFace,
            (ResultClass::ElementNode, AveragingItem::Element | AveragingItem::ElementFace) => {
                Granularity::PerFace
            }
            (ResultClass::ElementNode, _) => Granularity::PerFaceVertex,
        }
    }

    /// Whether node averaging is active.
    #[inline]
    pub fn averages_at_nodes(&self) -> bool {
        self.averaging_item == AveragingItem::Node && self.averaging_op != AveragingOp::None
    }

    /// Whether `element` is in the preferred group (always true without one).
    #[inline]
    pub fn in_preferred_group(&self, element: i32) -> bool {
        self.preferred_group.as_ref().is_none_or(|g| g.contains(&element))
    }
}
