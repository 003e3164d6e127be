use serde::{Deserialize, Serialize};

/// `GraphicsSettings` contains settings related to the view and rendering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsSettings {
    /// Vertical field of view in degrees.
    pub fov: u16,
    /// How many portals deep the view recurses.
    pub max_recursion: u8,
    /// Skip portals outside the view frustum.
    pub frustum_culling: bool,
    pub resolution: [u16; 2],
}

impl Default for GraphicsSettings {
    fn default() -> Self {
        Self {
            fov: 70,
            max_recursion: 3,
            frustum_culling: true,
            resolution: [1280, 720],
        }
    }
}
