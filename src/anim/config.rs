//! Animation and analysis settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::eval::{AveragingOp, ToScalar};
use crate::util::Result;

/// Description tag that excludes blade beams from an animation.
pub const SKIP_BLADE_TAG: &str = "#skipBlade";

/// Time settings of the active analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub start: f64,
    pub stop: f64,
    pub time_increment: f64,
    /// Times closer than this are treated as equal.
    pub min_time_increment: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            start: 0.0,
            stop: 1.0,
            time_increment: 0.01,
            min_time_increment: 1.0e-7,
        }
    }
}

/// Class of a fringe result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultClass {
    #[default]
    Node,
    Element,
    #[serde(rename = "Element node")]
    ElementNode,
}

/// Domain over which fringe contributions are averaged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AveragingItem {
    #[default]
    None,
    Node,
    Element,
    #[serde(rename = "Element face")]
    ElementFace,
}

/// Fringe (contour) selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FringeConfig {
    pub result_class: ResultClass,
    pub variable: String,
    pub to_scalar: ToScalar,
    pub averaging_op: AveragingOp,
    pub averaging_item: AveragingItem,
    /// Maximum angle (degrees) between averaged shell normals.
    pub max_membrane_angle: f64,
    pub average_across_material: bool,
    pub average_across_property: bool,
    pub average_across_element_type: bool,
    /// Operator name, or `[id] name` of an element group.
    pub multi_face_averaging: String,
}

impl Default for FringeConfig {
    fn default() -> Self {
        Self {
            result_class: ResultClass::Node,
            variable: String::new(),
            to_scalar: ToScalar::None,
            averaging_op: AveragingOp::Mean,
            averaging_item: AveragingItem::None,
            max_membrane_angle: 30.0,
            average_across_material: false,
            average_across_property: false,
            average_across_element_type: false,
            multi_face_averaging: "Mean".to_string(),
        }
    }
}

/// Legend value mapping selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendConfig {
    /// Explicit range; `None` uses the range found while reading.
    pub range: Option<(f64, f64)>,
    pub value_mapping: String,
    pub color_mapping: String,
    pub tick_count: Option<usize>,
    pub tick_spacing: Option<f64>,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self {
            range: None,
            value_mapping: "Linear".to_string(),
            color_mapping: "Full color".to_string(),
            tick_count: Some(5),
            tick_spacing: None,
        }
    }
}

/// What to animate and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub modes_animation: bool,
    pub summary_animation: bool,
    /// Frame on the most frequently written results instead of the
    /// time history key set.
    pub most_frequent_framing: bool,
    pub load_deformation: bool,
    pub load_face_fringe: bool,
    pub load_line_fringe: bool,
    /// Explicit `[start, stop]`; `None` uses the analysis interval.
    pub time_range: Option<(f64, f64)>,
    pub description: String,
    pub fringe: FringeConfig,
    pub legend: LegendConfig,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            modes_animation: false,
            summary_animation: false,
            most_frequent_framing: false,
            load_deformation: true,
            load_face_fringe: false,
            load_line_fringe: false,
            time_range: None,
            description: String::new(),
            fringe: FringeConfig::default(),
            legend: LegendConfig::default(),
        }
    }
}

impl AnimationConfig {
    /// Whether any fringe data is loaded.
    #[inline]
    pub fn load_fringe(&self) -> bool {
        self.load_face_fringe || self.load_line_fringe
    }

    /// Whether blade beams are excluded.
    pub fn skip_blades(&self) -> bool {
        self.description.contains(SKIP_BLADE_TAG)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_partial_json() {
        let cfg = AnimationConfig::from_json(r#"{ "load_face_fringe": true, "fringe": { "variable": "Von Mises stress" } }"#).unwrap();
        assert!(cfg.load_fringe());
        assert!(cfg.load_deformation);
        assert_eq!(cfg.fringe.variable, "Von Mises stress");
        assert_eq!(cfg.fringe.averaging_op, AveragingOp::Mean);
        assert_eq!(cfg.fringe.multi_face_averaging, "Mean");
    }

    #[test]
    fn test_enum_names() {
        let cfg = AnimationConfig::from_json(
            r#"{ "fringe": { "result_class": "Element node", "to_scalar": "Max abs component", "averaging_item": "Element face" } }"#,
        )
        .unwrap();
        assert_eq!(cfg.fringe.result_class, ResultClass::ElementNode);
        assert_eq!(cfg.fringe.to_scalar, ToScalar::MaxAbsComponent);
        assert_eq!(cfg.fringe.averaging_item, AveragingItem::ElementFace);
    }

    #[test]
    fn test_skip_blades_and_roundtrip() {
        let cfg = AnimationConfig {
            description: "Rotor run #skipBlade".to_string(),
            time_range: Some((0.5, 2.0)),
            ..Default::default()
        };
        assert!(cfg.skip_blades());
        let back = AnimationConfig::from_json(&cfg.to_json().unwrap()).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.json");
        std::fs::write(&path, r#"{ "summary_animation": true }"#).unwrap();
        assert!(AnimationConfig::load(&path).unwrap().summary_animation);
        assert!(AnimationConfig::load(dir.path().join("missing.json")).is_err());
    }
}
