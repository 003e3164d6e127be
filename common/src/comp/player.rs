use specs::{Component, HashMapStorage};
use std::f32::consts::FRAC_PI_2;
use vek::*;

pub const MAX_PITCH: f32 = FRAC_PI_2;

/// The first person character. Moved by the character controller rather
/// than by the solver, so it keeps its own fall velocity.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Player {
    /// Heading of the body around +Y, 0 looks along +Z.
    pub yaw: f32,
    /// Camera pitch, positive looks up.
    pub pitch: f32,
    pub fall_velocity: Vec3<f32>,
    pub grounded: bool,
}

impl Component for Player {
    type Storage = HashMapStorage<Self>;
}

impl Player {
    pub fn new(yaw: f32) -> Self {
        Self {
            yaw,
            ..Default::default()
        }
    }

    pub fn look(&mut self, yaw_delta: f32, pitch_delta: f32) {
        if yaw_delta.is_finite() {
            self.yaw = (self.yaw + yaw_delta).rem_euclid(std::f32::consts::TAU);
        }
        if pitch_delta.is_finite() {
            self.pitch = (self.pitch + pitch_delta).clamp(-MAX_PITCH, MAX_PITCH);
        }
    }

    pub fn body_ori(&self) -> Quaternion<f32> { Quaternion::rotation_y(self.yaw) }

    /// Where the camera looks, body heading plus pitch.
    pub fn view_ori(&self) -> Quaternion<f32> {
        // Positive pitch looks up, which is a negative turn about +X when
        // forward is +Z
        Quaternion::rotation_y(self.yaw) * Quaternion::rotation_x(-self.pitch)
    }

    pub fn forward(&self) -> Vec3<f32> { self.body_ori() * Vec3::unit_z() }

    /// Movement for one tick from the intended direction, in world space.
    pub fn walk(&self, inputs: &PlayerInputs, speed: f32, dt: f32) -> Vec3<f32> {
        let inputs = inputs.clamped();
        let forward = self.forward();
        let right = forward.cross(Vec3::unit_y());
        (forward * inputs.forward + right * inputs.lateral) * speed * dt
    }
}

/// Movement and look intent for a frame.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PlayerInputs {
    /// -1 back to 1 forward
    pub forward: f32,
    /// -1 left to 1 right
    pub lateral: f32,
    pub yaw_delta: f32,
    pub pitch_delta: f32,
}

impl PlayerInputs {
    pub fn clamped(&self) -> Self {
        let axis = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        Self {
            forward: axis(self.forward),
            lateral: axis(self.lateral),
            ..*self
        }
    }
}
