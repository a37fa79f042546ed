//! JSON Lines export writer.
//!
//! Every call writes one self-contained JSON record on its own line, tagged
//! by a `record` field. Non-finite values (missing fringe values) become `null`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::anim::FringeValues;
use crate::core::EntityId;
use crate::export::{ExportProperties, ExportWriter, LinkGeometry};
use crate::model::LinkKind;
use crate::util::{Chrono, DAffine3, DVec3, Error, Result};

#[derive(Serialize)]
struct ElementRecord {
    id: i32,
    #[serde(rename = "type")]
    elm_type: String,
    nodes: Vec<i32>,
}

#[derive(Serialize)]
struct LinkRecord<'a> {
    id: EntityId,
    kind: &'static str,
    description: &'a str,
    /// Rest positions of the written vertices.
    vertices: Vec<[f64; 3]>,
    elements: Vec<ElementRecord>,
}

#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Record<'a> {
    Geometry { links: Vec<LinkRecord<'a>> },
    Properties { properties: &'a ExportProperties },
    Step { step: i64, time: f64 },
    Transforms { matrices: BTreeMap<EntityId, [f64; 12]> },
    Deformations { part: EntityId, values: Vec<[f64; 3]> },
    Fringes { part: EntityId, per_element: bool, values: &'a FringeValues },
}

/// [`ExportWriter`] producing JSON Lines.
pub struct JsonExportWriter<W: Write> {
    out: W,
    records: usize,
    closed: bool,
}

impl JsonExportWriter<BufWriter<File>> {
    /// Create (or truncate) a file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Exporting to {}", path.display());
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> JsonExportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, records: 0, closed: false }
    }

    /// Records written so far.
    #[inline]
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, record: &Record<'_>) -> Result<()> {
        if self.closed {
            return Err(Error::export("writer is closed"));
        }
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }
}

fn link_record<'a>(geo: &LinkGeometry<'a>) -> LinkRecord<'a> {
    let link = geo.link;
    let (kind, mesh) = match &link.kind {
        LinkKind::FePart(p) => ("part", Some(&p.mesh)),
        LinkKind::Beam { .. } => ("beam", None),
        LinkKind::Generic => ("link", None),
    };

    let mut vertices = Vec::new();
    let mut elements = Vec::new();
    if let Some(mesh) = mesh {
        let positions = mesh.vertex_positions();
        vertices = geo
            .vertices
            .iter()
            .filter_map(|&v| positions.get(v))
            .map(|p| p.to_array())
            .collect();
        elements = mesh
            .elements()
            .iter()
            .map(|e| ElementRecord {
                id: e.id,
                elm_type: format!("{:?}", e.elm_type),
                nodes: if geo.first_order { e.corners().to_vec() } else { e.nodes.to_vec() },
            })
            .collect();
    }

    LinkRecord { id: link.id, kind, description: &link.description, vertices, elements }
}

impl<W: Write> ExportWriter for JsonExportWriter<W> {
    fn write_geometry(&mut self, links: &[LinkGeometry<'_>]) -> Result<()> {
        let links: Vec<LinkRecord<'_>> = links.iter().map(link_record).collect();
        debug!(links = links.len(), "writing geometry");
        self.emit(&Record::Geometry { links })
    }

    fn write_properties(&mut self, props: &ExportProperties) -> Result<()> {
        self.emit(&Record::Properties { properties: props })
    }

    fn write_step(&mut self, step: i64, time: Chrono) -> Result<()> {
        self.emit(&Record::Step { step, time })
    }

    fn write_transformations(&mut self, transforms: &BTreeMap<EntityId, DAffine3>) -> Result<()> {
        let matrices = transforms.iter().map(|(&id, m)| (id, m.to_cols_array())).collect();
        self.emit(&Record::Transforms { matrices })
    }

    fn write_deformations(&mut self, part: EntityId, displacements: &[DVec3]) -> Result<()> {
        let values = displacements.iter().map(|d| d.to_array()).collect();
        self.emit(&Record::Deformations { part, values })
    }

    fn write_fringes(&mut self, part: EntityId, values: &FringeValues, per_element: bool) -> Result<()> {
        self.emit(&Record::Fringes { part, per_element, values })
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.out.flush()?;
            self.closed = true;
            info!(records = self.records, "export complete");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementType, FeMesh, Link};

    fn lines(buf: &[u8]) -> Vec<serde_json::Value> {
        std::str::from_utf8(buf)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_records() {
        let mut b = FeMesh::builder();
        b.node(1, DVec3::ZERO).node(2, DVec3::X).node(3, DVec3::new(0.5, 0.0, 0.0));
        b.element(7, ElementType::Beam2, 1, 1, &[1, 2, 3]);
        let link = Link::fe_part(4, b.build());

        let mut w = JsonExportWriter::new(Vec::new());
        w.write_geometry(&[LinkGeometry { link: &link, vertices: vec![1, 0], first_order: true }]).unwrap();
        w.write_step(3, 0.5).unwrap();
        w.write_fringes(4, &FringeValues::Flat(vec![1.0, f64::INFINITY]), false).unwrap();
        w.close().unwrap();
        assert!(w.write_step(4, 0.6).is_err());
        assert_eq!(w.records(), 3);

        let recs = lines(&w.into_inner());
        assert_eq!(recs[0]["record"], "geometry");
        assert_eq!(recs[0]["links"][0]["vertices"][0][0], 1.0);
        assert_eq!(recs[0]["links"][0]["elements"][0]["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(recs[1]["step"], 3);
        assert!(recs[2]["values"][1].is_null());
    }

    #[test]
    fn test_transforms_by_id() {
        let mut w = JsonExportWriter::new(Vec::new());
        let mut m = BTreeMap::new();
        m.insert(2, DAffine3::from_translation(DVec3::new(1.0, 2.0, 3.0)));
        w.write_transformations(&m).unwrap();
        let recs = lines(&w.into_inner());
        assert_eq!(recs[0]["matrices"]["2"][9], 1.0);
        assert_eq!(recs[0]["matrices"]["2"][11], 3.0);
    }
}
