//! Math type re-exports and rotation helpers.
//!
//! Results are read in double precision, so only the `glam` f64 family is
//! re-exported here.

pub use glam::{DAffine3, DMat3, DVec3};

/// Chrono type - time value (seconds).
pub type Chrono = f64;

/// Time returned by failed positioning or stepping.
pub const TIME_INVALID: Chrono = f64::INFINITY;

/// Check whether a time returned by the archive can be read from.
#[inline]
pub fn is_valid_time(t: Chrono) -> bool {
    t.is_finite()
}

/// Skew-symmetric cross-product matrix of `v`.
#[inline]
fn skew(v: DVec3) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(0.0, v.z, -v.y),
        DVec3::new(-v.z, 0.0, v.x),
        DVec3::new(v.y, -v.x, 0.0),
    )
}

/// Rotation matrix from a rotation vector (axis times angle in radians).
///
/// Uses the Rodrigues form `I + a*K + b*K^2` with series expansions of the
/// coefficients below a small angle, so tiny rotations stay accurate and a
/// zero vector yields exactly the identity.
pub fn inc_rotation(rot: DVec3) -> DMat3 {
    let theta2 = rot.length_squared();
    if theta2 == 0.0 {
        return DMat3::IDENTITY;
    }

    let (a, b) = if theta2 < 1.0e-12 {
        (1.0 - theta2 / 6.0, 0.5 - theta2 / 24.0)
    } else {
        let theta = theta2.sqrt();
        (theta.sin() / theta, (1.0 - theta.cos()) / theta2)
    };

    let k = skew(rot);
    DMat3::IDENTITY + k * a + (k * k) * b
}

/// Offset of an eccentric point: `t + R(r)*e - e`.
#[inline]
pub fn eccentric_offset(tra: DVec3, rot: DVec3, ecc: DVec3) -> DVec3 {
    tra + inc_rotation(rot) * ecc - ecc
}
