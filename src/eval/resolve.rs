//! Variable lookup with count-and-list diagnostics.

use crate::core::{
    EntityId, EntityKey, ResultArchive, ResultItem, Value, ValueShape, VariableRef, VariableRole,
};
use crate::eval::{ReadOp, SharedEval};
use crate::util::{DAffine3, DVec3};

/// Resolution problems counted per distinct message, in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct ResolveLog {
    entries: Vec<(String, usize)>,
}

impl ResolveLog {
    pub fn add(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        match self.entries.iter_mut().find(|(m, _)| *m == msg) {
            Some((_, n)) => *n += 1,
            None => self.entries.push((msg, 1)),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of problems.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    /// One `  ** message (count).` line per distinct problem.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(|(m, n)| format!("  ** {m} ({n})."))
    }
}

/// Builds leaf evaluators for one archive cursor.
pub struct Resolver<'a> {
    rdb: &'a dyn ResultArchive,
    log: ResolveLog,
}

impl<'a> Resolver<'a> {
    pub fn new(rdb: &'a dyn ResultArchive) -> Self {
        Self { rdb, log: ResolveLog::default() }
    }

    #[inline]
    pub fn archive(&self) -> &'a dyn ResultArchive {
        self.rdb
    }

    #[inline]
    pub fn log(&self) -> &ResolveLog {
        &self.log
    }

    pub fn into_log(self) -> ResolveLog {
        self.log
    }

    fn find_role(&mut self, item: &ResultItem, role: VariableRole, owner: &str) -> Option<VariableRef> {
        let name = role.canonical_name()?;
        let Some(var) = self.rdb.find_variable(item, name) else {
            self.log.add(format!("No \"{name}\" result for {owner}"));
            return None;
        };
        let expected = role.expected_shape()?;
        let compatible = var.shape == expected
            || (expected == ValueShape::Rot3 && var.shape == ValueShape::Vec3);
        if !compatible {
            self.log.add(format!(
                "\"{name}\" of {owner} is {} instead of {}",
                var.shape.as_str(),
                expected.as_str()
            ));
            return None;
        }
        Some(var)
    }

    /// Nodal translation, logged when missing.
    pub fn translation(&mut self, part: EntityId, node: i32) -> Option<SharedEval<DVec3>> {
        let item = ResultItem::Node { part, node };
        let var = self.find_role(&item, VariableRole::Translation, "node")?;
        Some(ReadOp::shared(self.rdb, var))
    }

    /// Nodal rotation. A missing rotation is not a resolution error.
    pub fn rotation(&mut self, part: EntityId, node: i32) -> Option<SharedEval<DVec3>> {
        let item = ResultItem::Node { part, node };
        let name = VariableRole::Rotation.canonical_name()?;
        let var = self.rdb.find_variable(&item, name)?;
        if !matches!(var.shape, ValueShape::Rot3 | ValueShape::Vec3) {
            self.log.add(format!("\"{name}\" of node is {} instead of ROT3", var.shape.as_str()));
            return None;
        }
        Some(ReadOp::shared(self.rdb, var))
    }

    /// Position matrix of an entity, logged when missing.
    pub fn position(&mut self, key: EntityKey) -> Option<SharedEval<DAffine3>> {
        let item = ResultItem::Entity(key);
        let owner = key.kind.item_name().to_lowercase();
        let var = self.find_role(&item, VariableRole::Position, &owner)?;
        Some(ReadOp::shared(self.rdb, var))
    }

    /// Raw value of a named field variable. Absence is common and not logged.
    pub fn field(&mut self, item: ResultItem, name: &str) -> Option<SharedEval<Value>> {
        let var = self.rdb.find_variable(&item, name)?;
        if var.shape == ValueShape::Transform {
            self.log.add(format!("\"{name}\" is {} and cannot be shown as a fringe", var.shape.as_str()));
            return None;
        }
        Some(ReadOp::shared(self.rdb, var))
    }

    /// Global time step counter.
    pub fn step_number(&mut self) -> Option<SharedEval<f64>> {
        let var = self.find_role(&ResultItem::Top, VariableRole::StepNumber, "the model")?;
        Some(ReadOp::shared(self.rdb, var))
    }
}
