use std::fmt;

/// Used to represent one of many possible errors that may be omitted by the
/// rendering subsystem.
#[derive(Debug)]
pub enum RenderError {
    /// The backend lost its device or surface.
    DeviceLost,
    /// The stencil buffer cannot hold another nesting level.
    StencilOverflow { level: u8 },
    CustomError(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceLost => write!(f, "Render device lost"),
            Self::StencilOverflow { level } => {
                write!(f, "Stencil buffer overflow at recursion level {}", level)
            },
            Self::CustomError(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for RenderError {}
