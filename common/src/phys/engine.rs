//! The boundary to the rigid body engine.
//!
//! Broad/narrow phase and the constraint solver live behind
//! [`PhysicsEngine`]; the rest of the crate only ever creates bodies and
//! colliders, steps the simulation and reads or writes poses through it.

use super::{CollisionGroups, PhysicsError};
use crate::portal::PortalId;
use serde::{Deserialize, Serialize};
use specs::Entity;
use vek::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColliderHandle(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BodyKind {
    Fixed,
    Dynamic,
    /// Moved by setting its next translation, pushes dynamic bodies but is
    /// never pushed itself.
    KinematicPositionBased,
}

/// What a rigid body stands for in the game. Set once when the body is
/// created so collision handling never has to guess.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BodyTag {
    Static,
    /// The sensor volume of a portal; collision events against it are routed
    /// to that portal.
    PortalSensor(PortalId),
    /// Something that may pass through portals.
    Traveller { entity: Entity, player: bool },
}

impl BodyTag {
    /// Whether collision events on colliders of this body are dispatched.
    pub fn listens(&self) -> bool { matches!(self, BodyTag::PortalSensor(_)) }

    pub fn traveller(&self) -> Option<Entity> {
        match self {
            BodyTag::Traveller { entity, .. } => Some(*entity),
            _ => None,
        }
    }

    pub fn is_player(&self) -> bool { matches!(self, BodyTag::Traveller { player: true, .. }) }
}

#[derive(Copy, Clone, Debug)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub translation: Vec3<f32>,
    pub rotation: Quaternion<f32>,
    pub linvel: Vec3<f32>,
    pub tag: BodyTag,
}

impl BodyDesc {
    fn new(kind: BodyKind, tag: BodyTag) -> Self {
        Self {
            kind,
            translation: Vec3::zero(),
            rotation: Quaternion::identity(),
            linvel: Vec3::zero(),
            tag,
        }
    }

    pub fn fixed(tag: BodyTag) -> Self { Self::new(BodyKind::Fixed, tag) }

    pub fn dynamic(tag: BodyTag) -> Self { Self::new(BodyKind::Dynamic, tag) }

    pub fn kinematic_position_based(tag: BodyTag) -> Self {
        Self::new(BodyKind::KinematicPositionBased, tag)
    }

    #[must_use]
    pub fn with_translation(mut self, translation: Vec3<f32>) -> Self {
        self.translation = translation;
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: Quaternion<f32>) -> Self {
        self.rotation = rotation;
        self
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Shape {
    Ball { radius: f32 },
    Cuboid { half_extents: Vec3<f32> },
    /// Upright along the local Y axis, `half_height` is half the length of
    /// the straight part.
    Capsule { half_height: f32, radius: f32 },
}

impl Shape {
    /// Radius of a sphere centred on the shape that contains it.
    pub fn bounding_radius(&self) -> f32 {
        match self {
            Shape::Ball { radius } => *radius,
            Shape::Cuboid { half_extents } => half_extents.magnitude(),
            Shape::Capsule {
                half_height,
                radius,
            } => half_height + radius,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct ColliderDesc {
    pub shape: Shape,
    /// Sensors report overlaps but never push anything.
    pub sensor: bool,
    /// Whether overlaps involving this collider produce collision events.
    pub active_events: bool,
    pub groups: CollisionGroups,
    /// Relative to the parent body, or in world space for parentless
    /// colliders.
    pub translation: Vec3<f32>,
    pub rotation: Quaternion<f32>,
}

impl ColliderDesc {
    fn new(shape: Shape) -> Self {
        Self {
            shape,
            sensor: false,
            active_events: false,
            groups: CollisionGroups::DEFAULT,
            translation: Vec3::zero(),
            rotation: Quaternion::identity(),
        }
    }

    pub fn ball(radius: f32) -> Self { Self::new(Shape::Ball { radius }) }

    pub fn cuboid(hx: f32, hy: f32, hz: f32) -> Self {
        Self::new(Shape::Cuboid {
            half_extents: Vec3::new(hx, hy, hz),
        })
    }

    pub fn capsule(half_height: f32, radius: f32) -> Self {
        Self::new(Shape::Capsule {
            half_height,
            radius,
        })
    }

    #[must_use]
    pub fn sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    #[must_use]
    pub fn active_events(mut self, active: bool) -> Self {
        self.active_events = active;
        self
    }

    #[must_use]
    pub fn groups(mut self, groups: CollisionGroups) -> Self {
        self.groups = groups;
        self
    }

    #[must_use]
    pub fn translation(mut self, translation: Vec3<f32>) -> Self {
        self.translation = translation;
        self
    }

    #[must_use]
    pub fn rotation(mut self, rotation: Quaternion<f32>) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Two colliders started or stopped overlapping during a step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CollisionEvent {
    pub collider1: ColliderHandle,
    pub collider2: ColliderHandle,
    pub started: bool,
}

/// Result of a character controller move.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CharacterMovement {
    /// The part of the desired movement that could be performed.
    pub translation: Vec3<f32>,
    pub grounded: bool,
}

pub trait PhysicsEngine {
    fn gravity(&self) -> Vec3<f32>;

    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;

    fn create_collider(
        &mut self,
        desc: ColliderDesc,
        parent: Option<BodyHandle>,
    ) -> Result<ColliderHandle, PhysicsError>;

    /// Advance the simulation by `dt`, pushing overlap changes to `events`.
    fn step(&mut self, dt: f32, events: &mut Vec<CollisionEvent>) -> Result<(), PhysicsError>;

    fn collider_parent(&self, collider: ColliderHandle) -> Option<BodyHandle>;

    fn body_tag(&self, body: BodyHandle) -> Option<BodyTag>;

    /// The tag of the body owning `collider`, if it has one.
    fn collider_tag(&self, collider: ColliderHandle) -> Option<BodyTag> {
        self.collider_parent(collider)
            .and_then(|body| self.body_tag(body))
    }

    fn translation(&self, body: BodyHandle) -> Result<Vec3<f32>, PhysicsError>;

    fn rotation(&self, body: BodyHandle) -> Result<Quaternion<f32>, PhysicsError>;

    fn linvel(&self, body: BodyHandle) -> Result<Vec3<f32>, PhysicsError>;

    fn set_translation(&mut self, body: BodyHandle, pos: Vec3<f32>) -> Result<(), PhysicsError>;

    fn set_rotation(
        &mut self,
        body: BodyHandle,
        rot: Quaternion<f32>,
    ) -> Result<(), PhysicsError>;

    fn set_linvel(&mut self, body: BodyHandle, vel: Vec3<f32>) -> Result<(), PhysicsError>;

    /// Kinematic bodies reach this translation at the end of the next step.
    fn set_next_kinematic_translation(
        &mut self,
        body: BodyHandle,
        pos: Vec3<f32>,
    ) -> Result<(), PhysicsError>;

    fn collision_groups(&self, collider: ColliderHandle) -> Result<CollisionGroups, PhysicsError>;

    fn set_collision_groups(
        &mut self,
        collider: ColliderHandle,
        groups: CollisionGroups,
    ) -> Result<(), PhysicsError>;

    /// Place a collider. Relative to its parent body if it has one.
    fn set_collider_pose(
        &mut self,
        collider: ColliderHandle,
        translation: Vec3<f32>,
        rotation: Quaternion<f32>,
    ) -> Result<(), PhysicsError>;

    /// Resolve a desired movement of a character's collider against the
    /// solid geometry around it, sliding along whatever it hits. Colliders
    /// the character's groups exclude are passed through.
    fn move_character(
        &mut self,
        collider: ColliderHandle,
        desired: Vec3<f32>,
    ) -> Result<CharacterMovement, PhysicsError>;
}
