use crate::phys::{BodyHandle, ColliderHandle};
use serde::{Deserialize, Serialize};
use specs::{Component, DenseVecStorage, VecStorage};
use vek::*;

// Position
#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pos(pub Vec3<f32>);

impl Component for Pos {
    type Storage = VecStorage<Self>;
}

// Velocity
#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vel(pub Vec3<f32>);

impl Component for Vel {
    type Storage = VecStorage<Self>;
}

// Orientation
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ori(pub Quaternion<f32>);

impl Default for Ori {
    fn default() -> Self { Self(Quaternion::identity()) }
}

impl Component for Ori {
    type Storage = VecStorage<Self>;
}

/// Rigid body and main collider backing an entity.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PhysicsBody {
    pub body: BodyHandle,
    pub collider: ColliderHandle,
}

impl Component for PhysicsBody {
    type Storage = DenseVecStorage<Self>;
}

/// Pose to draw this frame, blended between the last two physics steps.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Interpolated {
    pub pos: Vec3<f32>,
    pub ori: Quaternion<f32>,
}

impl Component for Interpolated {
    type Storage = VecStorage<Self>;
}
