//! Eccentric-vertex deformation.

use std::sync::Arc;

use crate::core::ResultArchive;
use crate::eval::{Evaluator, SharedEval};
use crate::util::{eccentric_offset, DVec3, Result};

/// Deformation of a point offset by `ecc` from a node with translation `tra`
/// and rotation vector `rot`: `tra + R(rot)*ecc - ecc`.
pub struct EccTransform {
    tra: SharedEval<DVec3>,
    rot: SharedEval<DVec3>,
    ecc: DVec3,
}

impl EccTransform {
    pub fn new(tra: SharedEval<DVec3>, rot: SharedEval<DVec3>, ecc: DVec3) -> Self {
        Self { tra, rot, ecc }
    }

    pub fn shared(tra: SharedEval<DVec3>, rot: SharedEval<DVec3>, ecc: DVec3) -> SharedEval<DVec3> {
        Arc::new(Self::new(tra, rot, ecc))
    }

    #[inline]
    pub fn eccentricity(&self) -> DVec3 {
        self.ecc
    }
}

impl Evaluator<DVec3> for EccTransform {
    fn has_data(&self, rdb: &dyn ResultArchive) -> bool {
        self.tra.has_data(rdb) && self.rot.has_data(rdb)
    }

    fn invalidate(&self) {
        self.tra.invalidate();
        self.rot.invalidate();
    }

    fn evaluate(&self, rdb: &dyn ResultArchive) -> Result<Option<DVec3>> {
        let (Some(tra), Some(rot)) = (self.tra.evaluate(rdb)?, self.rot.evaluate(rdb)?) else {
            return Ok(None);
        };
        Ok(Some(eccentric_offset(tra, rot, self.ecc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemArchive;
    use crate::core::{ResultItem, Value};
    use crate::eval::ReadOp;
    use std::f64::consts::FRAC_PI_2;

    const NODE: ResultItem = ResultItem::Node { part: 1, node: 1 };

    fn ecc_over(steps: &[(f64, DVec3, DVec3)]) -> (MemArchive, SharedEval<DVec3>) {
        let mut b = MemArchive::builder();
        for &(t, tra, rot) in steps {
            b.set(t, NODE, "Translational deformation", Value::Vec3(tra));
            b.set(t, NODE, "Angular deformation", Value::Vec3(rot));
        }
        let rdb = b.build();
        let tv = rdb.find_variable(&NODE, "Translational deformation").unwrap();
        let rv = rdb.find_variable(&NODE, "Angular deformation").unwrap();
        let op = EccTransform::shared(ReadOp::shared(&rdb, tv), ReadOp::shared(&rdb, rv), DVec3::X);
        (rdb, op)
    }

    #[test]
    fn test_zero_series_gives_zero() {
        let (mut rdb, op) = ecc_over(&[(0.0, DVec3::ZERO, DVec3::ZERO), (1.0, DVec3::ZERO, DVec3::ZERO)]);
        let mut t = rdb.position_at(0.0);
        while t.is_finite() {
            op.invalidate();
            assert_eq!(op.evaluate(&rdb).unwrap(), Some(DVec3::ZERO));
            t = rdb.advance();
        }
    }

    #[test]
    fn test_zero_rotation_follows_translation() {
        let tra = [DVec3::new(1.0, 2.0, 3.0), DVec3::new(-4.0, 0.5, 0.0)];
        let (mut rdb, op) = ecc_over(&[(0.0, tra[0], DVec3::ZERO), (1.0, tra[1], DVec3::ZERO)]);
        rdb.position_at(0.0);
        assert_eq!(op.evaluate(&rdb).unwrap(), Some(tra[0]));
        rdb.advance();
        op.invalidate();
        assert_eq!(op.evaluate(&rdb).unwrap(), Some(tra[1]));
    }

    #[test]
    fn test_quarter_turn_about_z() {
        let (mut rdb, op) = ecc_over(&[(0.0, DVec3::ZERO, DVec3::new(0.0, 0.0, FRAC_PI_2))]);
        rdb.position_at(0.0);
        let v = op.evaluate(&rdb).unwrap().unwrap();
        assert!((v - DVec3::new(-1.0, 1.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_needs_both_inputs() {
        let mut b = MemArchive::builder();
        b.set(0.0, NODE, "Translational deformation", Value::Vec3(DVec3::X));
        b.declare(NODE, "Angular deformation", crate::core::ValueShape::Rot3);
        let mut rdb = b.build();
        let tv = rdb.find_variable(&NODE, "Translational deformation").unwrap();
        let rv = rdb.find_variable(&NODE, "Angular deformation").unwrap();
        let op = EccTransform::new(ReadOp::shared(&rdb, tv), ReadOp::shared(&rdb, rv), DVec3::X);
        rdb.position_at(0.0);
        assert!(!op.has_data(&rdb));
        assert_eq!(op.evaluate(&rdb).unwrap(), None);
    }
}
