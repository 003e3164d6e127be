//! Physics seam: the engine abstraction, its rapier3d implementation, the
//! fixed-timestep scheduler that drives it, collision layers, and the
//! interpolation that smooths rendering between ticks.

pub mod engine;
mod error;
pub mod interpolation;
pub mod layers;
pub mod rapier;
pub mod world;

pub use engine::{
    BodyDesc, BodyHandle, BodyKind, BodyTag, CharacterMovement, ColliderDesc, ColliderHandle,
    CollisionEvent, PhysicsEngine, Shape,
};
pub use error::PhysicsError;
pub use interpolation::PhysicsInterpolator;
pub use layers::CollisionGroups;
pub use rapier::RapierEngine;
pub use world::{ColliderEvent, PhysicsWorld, TickHandler};
