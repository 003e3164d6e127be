use crate::util::slerp_quat;
use specs::{Component, VecStorage};
use vek::*;

/// The last two physics samples of a body's pose, used to render it
/// smoothly between steps.
///
/// `next` is always the engine's pose as of the latest step and `last` the
/// one before it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PhysicsInterpolator {
    last_pos: Vec3<f32>,
    next_pos: Vec3<f32>,
    last_ori: Quaternion<f32>,
    next_ori: Quaternion<f32>,
}

impl Component for PhysicsInterpolator {
    type Storage = VecStorage<Self>;
}

impl PhysicsInterpolator {
    pub fn new(pos: Vec3<f32>, ori: Quaternion<f32>) -> Self {
        Self {
            last_pos: pos,
            next_pos: pos,
            last_ori: ori,
            next_ori: ori,
        }
    }

    /// Record the pose the engine reached in the step that just ran.
    pub fn on_physics_step(&mut self, pos: Vec3<f32>, ori: Quaternion<f32>) {
        self.last_pos = self.next_pos;
        self.last_ori = self.next_ori;
        self.next_pos = pos;
        self.next_ori = ori;
    }

    pub fn last(&self) -> (Vec3<f32>, Quaternion<f32>) { (self.last_pos, self.last_ori) }

    pub fn next(&self) -> (Vec3<f32>, Quaternion<f32>) { (self.next_pos, self.next_ori) }

    pub fn render_pos(&self, alpha: f32) -> Vec3<f32> {
        Lerp::lerp(self.last_pos, self.next_pos, clamp_alpha(alpha))
    }

    pub fn render_ori(&self, alpha: f32) -> Quaternion<f32> {
        slerp_quat(self.last_ori, self.next_ori, clamp_alpha(alpha))
    }

    /// The pose to draw this frame. Does not touch the samples.
    pub fn render_transform(&self, alpha: f32) -> (Vec3<f32>, Quaternion<f32>) {
        (self.render_pos(alpha), self.render_ori(alpha))
    }

    /// Teleport: both samples snap to the new pose so nothing is blended
    /// across the jump.
    pub fn warp(&mut self, pos: Vec3<f32>, ori: Quaternion<f32>) { *self = Self::new(pos, ori); }

    /// Teleport through a portal. Both samples keep their offset from the
    /// pose being left (`from`), rotated by `delta` and re-based at `to`,
    /// so a body that is mid-blend keeps moving smoothly on the other side.
    pub fn warp_through(&mut self, from: Vec3<f32>, to: Vec3<f32>, delta: Quaternion<f32>) {
        let rebase = |pos: Vec3<f32>| to + delta * (pos - from);
        self.last_pos = rebase(self.last_pos);
        self.next_pos = rebase(self.next_pos);
        self.last_ori = (delta * self.last_ori).normalized();
        self.next_ori = (delta * self.next_ori).normalized();
    }
}

fn clamp_alpha(alpha: f32) -> f32 {
    if alpha.is_finite() {
        alpha.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
