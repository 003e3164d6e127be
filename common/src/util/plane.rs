use super::Dir;
use serde::{Deserialize, Serialize};
use vek::*;

/// Plane defined by its normal and the distance from the origin along it.
///
/// Points with a negative [`Plane::distance`] lie behind the plane; when the
/// plane is used for clipping those points are discarded.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Dir,
    /// Distance from origin in the direction of normal
    pub d: f32,
}

impl Plane {
    pub fn new(dir: Dir) -> Self { Self::from(dir) }

    /// Plane through `point` facing `normal`.
    pub fn from_point_normal(point: Vec3<f32>, normal: Dir) -> Self {
        Self {
            normal,
            d: normal.dot(point),
        }
    }

    pub fn distance(&self, to: Vec3<f32>) -> f32 { self.normal.dot(to) - self.d }

    pub fn projection(&self, v: Vec3<f32>) -> Vec3<f32> { v - *self.normal * self.distance(v) }

    /// Move the plane backwards along its normal, so that points up to
    /// `bias` behind the original plane are still kept.
    #[must_use]
    pub fn biased(self, bias: f32) -> Self {
        Self {
            normal: self.normal,
            d: self.d - bias,
        }
    }

    pub fn clips(&self, point: Vec3<f32>) -> bool { self.distance(point) < 0.0 }

    pub fn xz() -> Self { Plane::from(Dir::up()) }
}

impl From<Dir> for Plane {
    fn from(dir: Dir) -> Self {
        Plane {
            normal: dir,
            d: 0.0,
        }
    }
}
