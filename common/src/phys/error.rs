use super::{BodyHandle, ColliderHandle};
use std::fmt;
use vek::Vec3;

/// Engine invariant violations. None of these are recoverable mid-session,
/// they indicate a bug rather than bad data.
#[derive(Clone, Debug, PartialEq)]
pub enum PhysicsError {
    InvalidBody(BodyHandle),
    InvalidCollider(ColliderHandle),
    /// A body ended a step with a NaN or infinite state.
    NonFiniteBody {
        body: BodyHandle,
        translation: Vec3<f32>,
    },
}

impl fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBody(body) => write!(f, "no rigid body with handle {}", body.0),
            Self::InvalidCollider(collider) => {
                write!(f, "no collider with handle {}", collider.0)
            },
            Self::NonFiniteBody { body, translation } => write!(
                f,
                "rigid body {} has a non-finite state (translation {})",
                body.0, translation
            ),
        }
    }
}

impl std::error::Error for PhysicsError {}
