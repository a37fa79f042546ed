//! Fringe (contour) aggregation.
//!
//! - [`FringeSetup`] - Resolved averaging, tie-break and special-value rules
//! - [`build_color_graph`] - Per-face evaluator graph over group parts
//! - [`FringeTable`] - Per-frame reading into color buffers
//! - [`LegendMapping`] - Value to color mapping and ticks

mod setup;
mod creator;
mod reader;
mod legend;

pub use setup::{FringeSetup, Granularity, SpecialValue, TieBreak, SPECIAL_VALUE};
pub use creator::{build_color_graph, build_export_fringe, ExportFringe, FaceColor, FringeGraph, GroupColors};
pub use reader::{FringeTable, FringeValues, ValueRange, NO_VALUE};
pub use legend::{ColorMapping, LegendMapping, Tick, ValueMapping};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::{AnimationConfig, AveragingItem, FringeConfig, NullProgress, ResultClass};
    use crate::archive::MemArchive;
    use crate::core::{EntityKey, EntityKind, ResultArchive, ResultItem, Value};
    use crate::model::{ElementType, FeMesh, FePart};
    use crate::sink::{ColorLook, FrameStore, PresentationSink};
    use crate::util::DAffine3;
    use crate::util::DVec3;

    const PART: i32 = 1;

    /// Two coplanar quads sharing nodes 2 and 5.
    fn part() -> FePart {
        let mut b = FeMesh::builder();
        for (i, (x, y)) in [(0., 0.), (1., 0.), (2., 0.), (0., 1.), (1., 1.), (2., 1.)].into_iter().enumerate() {
            b.node(i as i32 + 1, DVec3::new(x, y, 0.0));
        }
        b.element(10, ElementType::Quad4, 1, 1, &[1, 2, 5, 4]);
        b.element(11, ElementType::Quad4, 1, 1, &[2, 3, 6, 5]);
        b.auto_group_parts();
        FePart { mesh: b.build(), fe_loaded: true }
    }

    fn config(fringe: FringeConfig) -> AnimationConfig {
        AnimationConfig { load_face_fringe: true, fringe, ..Default::default() }
    }

    fn key() -> EntityKey {
        EntityKey::new(EntityKind::Part, PART)
    }

    #[test]
    fn test_element_fringe_per_face() {
        let mut b = MemArchive::builder();
        b.set(0.0, ResultItem::Element { part: PART, element: 10 }, "Stress", Value::Scalar(3.0));
        b.set(0.0, ResultItem::Element { part: PART, element: 11 }, "Stress", Value::Scalar(SPECIAL_VALUE));
        let mut rdb = b.build();
        let cfg = config(FringeConfig { result_class: ResultClass::Element, variable: "Stress".into(), ..Default::default() });

        let (table, ops) = FringeTable::init(&rdb, key(), &part(), &cfg, None, &mut NullProgress);
        assert_eq!(ops, 2);
        assert!(table.has_colors());

        rdb.position_at(0.0);
        let mut sink = FrameStore::new();
        let frame = sink.add_frame(0.0);
        let mut range = ValueRange::default();
        let legend = LegendMapping::default();
        assert_eq!(table.read_frame(&rdb, frame, &mut sink, &legend, &mut range).unwrap(), 1);
        assert_eq!(table.read_frame(&rdb, frame, &mut sink, &legend, &mut range).unwrap(), 0);
        assert_eq!(sink.color_calls, 1);

        let rec = &sink.frame(frame).unwrap().colors[&(key(), 0)];
        assert_eq!(rec.look, ColorLook::PerFace);
        assert_eq!(rec.values, vec![3.0, SPECIAL_VALUE]);
        assert_eq!(range.as_option(), Some((3.0, 3.0)));
    }

    #[test]
    fn test_node_averaging_of_element_nodal_values() {
        let mut b = MemArchive::builder();
        for (elem, nodes, v) in [(10, [1, 2, 5, 4], 1.0), (11, [2, 3, 6, 5], 3.0)] {
            for n in nodes {
                b.set(0.0, ResultItem::ElementNode { part: PART, element: elem, node: n }, "Stress", Value::Scalar(v));
            }
        }
        let mut rdb = b.build();
        let cfg = config(FringeConfig {
            result_class: ResultClass::ElementNode,
            averaging_item: AveragingItem::Node,
            variable: "Stress".into(),
            ..Default::default()
        });

        let (table, _) = FringeTable::init(&rdb, key(), &part(), &cfg, None, &mut NullProgress);
        rdb.position_at(0.0);
        let mut sink = FrameStore::new();
        let frame = sink.add_frame(0.0);
        let mut range = ValueRange::default();
        table.read_frame(&rdb, frame, &mut sink, &LegendMapping::default(), &mut range).unwrap();

        let rec = &sink.frame(frame).unwrap().colors[&(key(), 0)];
        assert_eq!(rec.look, ColorLook::PerFaceVertex);
        // Face 10 corners 1,2,5,4: shared nodes 2 and 5 average to 2.0.
        assert_eq!(&rec.values[..4], &[1.0, 2.0, 2.0, 1.0]);
        assert_eq!(&rec.values[4..], &[2.0, 3.0, 3.0, 2.0]);
    }

    #[test]
    fn test_export_arity() {
        let mut b = MemArchive::builder();
        b.set(0.0, ResultItem::Node { part: PART, node: 2 }, "Pressure", Value::Scalar(7.0));
        let mut rdb = b.build();
        let part = part();
        let cfg = config(FringeConfig { variable: "Pressure".into(), ..Default::default() });
        let filter = part.mesh.first_order_vertices();

        let (table, arity) = FringeTable::init(&rdb, key(), &part, &cfg, Some(&filter), &mut NullProgress);
        assert_eq!(arity, 0);
        rdb.position_at(0.0);
        let mut range = ValueRange::default();
        let FringeValues::Flat(values) = table.read_values(&rdb, &mut range).unwrap() else {
            panic!("expected flat values");
        };
        assert_eq!(values.len(), 6);
        assert_eq!(values[1], 7.0);
        assert_eq!(values[0], NO_VALUE);
    }

    #[derive(Default)]
    struct Listing {
        lines: Vec<String>,
    }

    impl crate::anim::ProgressHost for Listing {
        fn list(&mut self, msg: &str) {
            self.lines.push(msg.to_string());
        }
    }

    fn corner_values() -> MemArchive {
        let mut b = MemArchive::builder();
        for (elem, values) in [(10, [1.0, 2.0, 3.0, 4.0]), (11, [3.0; 4])] {
            let nodes = if elem == 10 { [1, 2, 5, 4] } else { [2, 3, 6, 5] };
            for (n, v) in nodes.into_iter().zip(values) {
                b.set(0.0, ResultItem::ElementNode { part: PART, element: elem, node: n }, "Stress", Value::Scalar(v));
            }
        }
        b.build()
    }

    #[test]
    fn test_unresolved_fringe_is_listed() {
        let mut b = MemArchive::builder();
        for element in [10, 11] {
            b.set(0.0, ResultItem::Element { part: PART, element }, "Stress", Value::Transform(DAffine3::IDENTITY));
        }
        let rdb = b.build();
        let cfg = config(FringeConfig { result_class: ResultClass::Element, variable: "Stress".into(), ..Default::default() });

        let mut host = Listing::default();
        let (table, _) = FringeTable::init(&rdb, key(), &part(), &cfg, None, &mut host);
        assert!(!table.has_colors());
        assert_eq!(host.lines.len(), 2);
        assert!(host.lines[0].starts_with("  ** \"Stress\" is TMAT34"));
        assert!(host.lines[0].ends_with("(2)."));
        assert!(host.lines[1].contains("Part [1] will lack some fringe values"));

        let mut host = Listing::default();
        let filter = part().mesh.first_order_vertices();
        FringeTable::init(&rdb, key(), &part(), &cfg, Some(&filter), &mut host);
        assert_eq!(host.lines.len(), 2);
    }

    #[test]
    fn test_resolved_fringe_lists_nothing() {
        let rdb = corner_values();
        let cfg = config(FringeConfig { result_class: ResultClass::ElementNode, variable: "Stress".into(), ..Default::default() });
        let mut host = Listing::default();
        FringeTable::init(&rdb, key(), &part(), &cfg, None, &mut host);
        assert!(host.lines.is_empty());
    }

    #[test]
    fn test_export_element_averaged_corners() {
        let mut rdb = corner_values();
        let part = part();
        let cfg = config(FringeConfig {
            result_class: ResultClass::ElementNode,
            averaging_item: AveragingItem::Element,
            variable: "Stress".into(),
            ..Default::default()
        });
        let filter = part.mesh.first_order_vertices();

        let (table, arity) = FringeTable::init(&rdb, key(), &part, &cfg, Some(&filter), &mut NullProgress);
        assert_eq!(table.setup().granularity(), Granularity::PerFace);
        assert_eq!(arity, 1);
        rdb.position_at(0.0);
        let values = table.read_values(&rdb, &mut ValueRange::default()).unwrap();
        assert_eq!(values, FringeValues::Flat(vec![2.5, 3.0]));
    }

    #[test]
    fn test_export_node_averaged_element_values() {
        let mut b = MemArchive::builder();
        b.set(0.0, ResultItem::Element { part: PART, element: 10 }, "Stress", Value::Scalar(1.0));
        b.set(0.0, ResultItem::Element { part: PART, element: 11 }, "Stress", Value::Scalar(3.0));
        let mut rdb = b.build();
        let part = part();
        let cfg = config(FringeConfig {
            result_class: ResultClass::Element,
            averaging_item: AveragingItem::Node,
            variable: "Stress".into(),
            ..Default::default()
        });
        let filter = part.mesh.first_order_vertices();

        let (table, arity) = FringeTable::init(&rdb, key(), &part, &cfg, Some(&filter), &mut NullProgress);
        assert_eq!(arity, 2);
        rdb.position_at(0.0);
        let values = table.read_values(&rdb, &mut ValueRange::default()).unwrap();
        assert_eq!(
            values,
            FringeValues::ElementNodal(vec![vec![1.0, 2.0, 2.0, 1.0], vec![2.0, 3.0, 3.0, 2.0]])
        );
    }
}
