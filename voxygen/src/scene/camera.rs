use crate::render::CameraView;
use common::portal::{reproject_position, reproject_rotation, PortalPose};
use std::{f32::consts::PI, ops::BitOr};
use treeculler::Frustum;
use vek::*;

pub const NEAR_PLANE: f32 = 0.05;
pub const FAR_PLANE: f32 = 1000.0;

/// Render layers a camera can see. Objects are drawn on exactly one layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Layers(u8);

impl Layers {
    pub const NONE: Self = Self(0);
    /// Static geometry and everything that is not the player.
    pub const SCENE: Self = Self(1);
    /// The player's own model.
    pub const PLAYER: Self = Self(1 << 1);
    /// Copies of the player coming out of a portal's partner.
    pub const PLAYER_DUPLICATE: Self = Self(1 << 2);

    /// What a camera sees at a recursion level. The viewer never sees their
    /// own model, and only sees its duplicates two portals deep or more.
    pub fn for_level(level: u8) -> Self {
        match level {
            0 => Self::SCENE,
            1 => Self::SCENE | Self::PLAYER,
            _ => Self::SCENE | Self::PLAYER | Self::PLAYER_DUPLICATE,
        }
    }

    pub fn contains(self, other: Self) -> bool { self.0 & other.0 == other.0 }

    pub fn intersects(self, other: Self) -> bool { self.0 & other.0 != 0 }
}

impl BitOr for Layers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self { Self(self.0 | rhs.0) }
}

/// First person camera. Looks along its local +Z like everything else in
/// the world.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Camera {
    pos: Vec3<f32>,
    ori: Quaternion<f32>,
    fov: f32,
    aspect: f32,
}

impl Camera {
    /// Create a new `Camera` with default parameters.
    pub fn new(aspect: f32, fov_deg: f32) -> Self {
        Self {
            pos: Vec3::zero(),
            ori: Quaternion::identity(),
            fov: fov_deg.to_radians(),
            aspect: sanitize_aspect(aspect),
        }
    }

    pub fn pos(&self) -> Vec3<f32> { self.pos }

    pub fn ori(&self) -> Quaternion<f32> { self.ori }

    pub fn set_pose(&mut self, pos: Vec3<f32>, ori: Quaternion<f32>) {
        self.pos = pos;
        self.ori = ori.normalized();
    }

    pub fn forward(&self) -> Vec3<f32> { self.ori * Vec3::unit_z() }

    pub fn fov(&self) -> f32 { self.fov }

    pub fn set_fov_deg(&mut self, fov_deg: f32) { self.fov = fov_deg.to_radians(); }

    /// Get the aspect ratio of the camera.
    pub fn aspect_ratio(&self) -> f32 { self.aspect }

    /// Set the aspect ratio of the camera.
    pub fn set_aspect_ratio(&mut self, aspect: f32) { self.aspect = sanitize_aspect(aspect); }

    /// The same camera seen through a portal: re-projected from `inp` to
    /// `out`.
    pub fn through(&self, inp: &PortalPose, out: &PortalPose) -> Self {
        Self {
            pos: reproject_position(self.pos, inp, out),
            ori: reproject_rotation(self.ori, inp, out),
            ..*self
        }
    }

    pub fn view_mat(&self) -> Mat4<f32> {
        // View space looks down -Z
        Mat4::rotation_y(PI) * Mat4::from(self.ori.conjugate()) * Mat4::translation_3d(-self.pos)
    }

    pub fn proj_mat(&self) -> Mat4<f32> {
        Mat4::perspective_rh_no(self.fov, self.aspect, NEAR_PLANE, FAR_PLANE)
    }

    pub fn view(&self) -> CameraView {
        CameraView {
            view_mat: self.view_mat(),
            proj_mat: self.proj_mat(),
            pos: self.pos,
        }
    }

    pub fn frustum(&self) -> Frustum<f32> {
        Frustum::from_modelview_projection((self.proj_mat() * self.view_mat()).into_col_arrays())
    }

    /// Whether `pose`'s front face can be seen from here.
    pub fn faces(&self, pose: &PortalPose) -> bool {
        (self.pos - pose.pos).dot(pose.normal()) > 0.0
    }
}

fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}
