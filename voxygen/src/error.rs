use crate::render::RenderError;
use std::fmt;

/// Represents any error that may be triggered by Aperture.
#[derive(Debug)]
pub enum Error {
    /// Building or stepping the game state failed.
    Common(common::Error),
    RenderError(RenderError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Common(err) => write!(f, "{}", err),
            Self::RenderError(err) => write!(f, "Render error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Common(err) => Some(err),
            Self::RenderError(err) => Some(err),
        }
    }
}

impl From<common::Error> for Error {
    fn from(err: common::Error) -> Self { Self::Common(err) }
}

impl From<common::level::LevelError> for Error {
    fn from(err: common::level::LevelError) -> Self { Self::Common(err.into()) }
}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Self { Self::RenderError(err) }
}
