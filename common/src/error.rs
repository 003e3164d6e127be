use crate::{level::LevelError, phys::PhysicsError};
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// The level could not be built. Not recoverable for that level.
    Level(LevelError),
    /// The physics engine broke one of its invariants.
    Physics(PhysicsError),
    /// Every portal id is taken.
    TooManyPortals { count: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Level(e) => write!(f, "Invalid level: {}", e),
            Self::Physics(e) => write!(f, "Physics failure: {}", e),
            Self::TooManyPortals { count } => {
                write!(f, "Cannot add a portal to a set of {} portals", count)
            },
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Level(e) => Some(e),
            Self::Physics(e) => Some(e),
            Self::TooManyPortals { .. } => None,
        }
    }
}

impl From<LevelError> for Error {
    fn from(err: LevelError) -> Self { Self::Level(err) }
}

impl From<PhysicsError> for Error {
    fn from(err: PhysicsError) -> Self { Self::Physics(err) }
}
