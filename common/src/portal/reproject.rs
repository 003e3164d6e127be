//! Mapping poses from one side of a portal pair to the other.
//!
//! A portal faces out of its local +Z. Stepping into one portal means
//! walking against its normal while leaving the other means walking along
//! it, so every mapping includes a half turn about the portal's up axis.

use crate::util::{Dir, Plane};
use serde::{Deserialize, Serialize};
use vek::*;

/// Half turn about local +Y.
pub const HALF_TURN: Quaternion<f32> = Quaternion {
    x: 0.0,
    y: 1.0,
    z: 0.0,
    w: 0.0,
};

/// World placement of a portal surface.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortalPose {
    pub pos: Vec3<f32>,
    pub rot: Quaternion<f32>,
}

impl PortalPose {
    pub fn new(pos: Vec3<f32>, rot: Quaternion<f32>) -> Self {
        Self {
            pos,
            rot: rot.normalized(),
        }
    }

    /// Outward facing normal of the surface.
    pub fn normal(&self) -> Vec3<f32> { self.rot * Vec3::unit_z() }

    pub fn up(&self) -> Vec3<f32> { self.rot * Vec3::unit_y() }

    pub fn right(&self) -> Vec3<f32> { self.rot * Vec3::unit_x() }

    pub fn to_local(&self, p: Vec3<f32>) -> Vec3<f32> { self.rot.conjugate() * (p - self.pos) }

    pub fn to_world(&self, p: Vec3<f32>) -> Vec3<f32> { self.pos + self.rot * p }

    /// Plane through the surface, facing out.
    pub fn plane(&self) -> Plane {
        Plane::from_point_normal(
            self.pos,
            Dir::from_unnormalized(self.normal()).unwrap_or_default(),
        )
    }

    pub fn to_mat(&self) -> Mat4<f32> {
        Mat4::<f32>::translation_3d(self.pos) * Mat4::from(self.rot)
    }
}

impl Default for PortalPose {
    fn default() -> Self { Self::new(Vec3::zero(), Quaternion::identity()) }
}

/// Where `p`, seen relative to `inp`, ends up relative to `out`.
pub fn reproject_position(p: Vec3<f32>, inp: &PortalPose, out: &PortalPose) -> Vec3<f32> {
    out.to_world(HALF_TURN * inp.to_local(p))
}

pub fn reproject_rotation(
    q: Quaternion<f32>,
    inp: &PortalPose,
    out: &PortalPose,
) -> Quaternion<f32> {
    (relative_rotation(inp, out) * q).normalized()
}

/// The rotation carrying directions through the pair, used for velocities
/// and for re-basing interpolation samples.
pub fn relative_rotation(inp: &PortalPose, out: &PortalPose) -> Quaternion<f32> {
    (out.rot * HALF_TURN * inp.rot.conjugate()).normalized()
}
