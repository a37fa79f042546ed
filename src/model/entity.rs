//! Simulatable entities and the model graph.

use crate::anim::AnalysisSettings;
use crate::core::{EntityId, EntityKey, EntityKind};
use crate::model::FeMesh;

/// Finite-element part payload of a link.
#[derive(Clone, Debug, Default)]
pub struct FePart {
    pub mesh: FeMesh,
    /// Whether the FE data is loaded (fringes and deformations need it).
    pub fe_loaded: bool,
}

/// What a link is.
#[derive(Clone, Debug)]
pub enum LinkKind {
    FePart(FePart),
    Beam { blade: bool },
    Generic,
}

/// Rigid or flexible body carrying a position matrix.
#[derive(Clone, Debug)]
pub struct Link {
    pub id: EntityId,
    pub description: String,
    pub suppressed: bool,
    pub kind: LinkKind,
}

impl Link {
    pub fn new(id: EntityId, kind: LinkKind) -> Self {
        Self { id, description: String::new(), suppressed: false, kind }
    }

    /// FE part with a mesh, loaded or not.
    pub fn fe_part(id: EntityId, mesh: FeMesh) -> Self {
        Self::new(id, LinkKind::FePart(FePart { mesh, fe_loaded: true }))
    }

    /// Result key of this link.
    pub fn key(&self) -> EntityKey {
        let kind = match self.kind {
            LinkKind::FePart(_) => EntityKind::Part,
            LinkKind::Beam { .. } => EntityKind::Beam,
            LinkKind::Generic => EntityKind::Link,
        };
        EntityKey::new(kind, self.id)
    }

    /// FE payload if this is a part with loaded FE data.
    pub fn loaded_part(&self) -> Option<&FePart> {
        match &self.kind {
            LinkKind::FePart(p) if p.fe_loaded => Some(p),
            _ => None,
        }
    }

    #[inline]
    pub fn is_fe_part(&self) -> bool {
        matches!(self.kind, LinkKind::FePart(_))
    }
}

/// Point entity.
#[derive(Clone, Debug)]
pub struct Triad {
    pub id: EntityId,
    /// Link the triad is attached to, if any.
    pub owner_link: Option<EntityId>,
}

impl Triad {
    pub fn key(&self) -> EntityKey {
        EntityKey::new(EntityKind::Triad, self.id)
    }
}

/// Model graph queried by the pipeline.
#[derive(Clone, Debug, Default)]
pub struct Model {
    pub links: Vec<Link>,
    pub triads: Vec<Triad>,
    pub analysis: AnalysisSettings,
}

impl Model {
    /// Links with results, FE parts first. Suppressed links are dropped,
    /// and blade beams too when `skip_blades` is set.
    pub fn links_with_results(&self, skip_blades: bool) -> Vec<&Link> {
        let keep = |l: &&Link| {
            !l.suppressed && !(skip_blades && matches!(l.kind, LinkKind::Beam { blade: true }))
        };
        let (mut parts, others): (Vec<&Link>, Vec<&Link>) =
            self.links.iter().filter(keep).partition(|l| l.is_fe_part());
        parts.extend(others);
        parts
    }

    /// Triads not owned by a link.
    pub fn triads_with_results(&self) -> Vec<&Triad> {
        self.triads.iter().filter(|t| t.owner_link.is_none()).collect()
    }

    pub fn link(&self, id: EntityId) -> Option<&Link> {
        self.links.iter().find(|l| l.id == id)
    }
}
