//! Level descriptions: the static planes, portals, props and lights a level
//! is built from.
//!
//! Levels are RON documents. Euler rotations are given in half turns, so
//! `(0.0, 1.0, 0.0)` turns something around to face -Z.

use crate::util::quat_from_half_turns;
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path};
use vek::*;

#[derive(Debug)]
pub enum LevelError {
    Io(std::io::Error),
    Parse(ron::error::SpannedError),
    /// Portals are paired in declaration order, so there must be an even
    /// number of them.
    UnpairedPortal { count: usize },
    /// A portal refers to a plane id that does not exist.
    DanglingObjectId { portal: usize, id: String },
    DuplicatePlaneId(String),
    InvalidDimensions { entity: String },
    NonFiniteTransform { entity: String },
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Could not read level file: {}", e),
            Self::Parse(e) => write!(f, "Could not parse level: {}", e),
            Self::UnpairedPortal { count } => write!(
                f,
                "Level declares {} portals, portals must come in pairs",
                count
            ),
            Self::DanglingObjectId { portal, id } => write!(
                f,
                "Portal {} is attached to object '{}' which does not exist",
                portal, id
            ),
            Self::DuplicatePlaneId(id) => write!(f, "Plane id '{}' is used more than once", id),
            Self::InvalidDimensions { entity } => {
                write!(f, "{} has non-positive or non-finite dimensions", entity)
            },
            Self::NonFiniteTransform { entity } => {
                write!(f, "{} has a non-finite position or rotation", entity)
            },
        }
    }
}

impl std::error::Error for LevelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LevelError {
    fn from(err: std::io::Error) -> Self { Self::Io(err) }
}

impl From<ron::error::SpannedError> for LevelError {
    fn from(err: ron::error::SpannedError) -> Self { Self::Parse(err) }
}

fn default_uv_scale() -> f32 { 1.0 }

fn default_radius() -> f32 { crate::consts::INTERACTABLE_DEFAULT_RADIUS }

fn default_intensity() -> f32 { 1.0 }

fn white() -> [f32; 3] { [1.0; 3] }

fn finite(v: &[f32]) -> bool { v.iter().all(|e| e.is_finite()) }

fn positive(v: f32) -> bool { v.is_finite() && v > 0.0 }

/// A rectangular piece of static geometry, lying in its local XY plane and
/// facing +Z.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaneData {
    /// Lets portals refer to the plane they are mounted on.
    #[serde(default)]
    pub id: Option<String>,
    pub width: f32,
    pub height: f32,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    #[serde(default = "default_uv_scale")]
    pub uv_scale: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortalData {
    pub width: f32,
    pub height: f32,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    /// Id of the plane the portal is mounted on.
    #[serde(default)]
    pub object_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractableData {
    #[serde(default)]
    pub position: Option<[f32; 3]>,
    #[serde(default)]
    pub rotation: Option<[f32; 3]>,
    #[serde(default = "default_radius")]
    pub radius: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LightData {
    Ambient {
        #[serde(default = "white")]
        colour: [f32; 3],
        #[serde(default = "default_intensity")]
        intensity: f32,
    },
    Directional {
        #[serde(default = "white")]
        colour: [f32; 3],
        #[serde(default = "default_intensity")]
        intensity: f32,
        direction: [f32; 3],
    },
    Point {
        #[serde(default = "white")]
        colour: [f32; 3],
        #[serde(default = "default_intensity")]
        intensity: f32,
        position: [f32; 3],
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnData {
    pub position: [f32; 3],
    /// Heading in half turns.
    #[serde(default)]
    pub yaw: f32,
}

impl Default for SpawnData {
    fn default() -> Self {
        Self {
            position: [0.0, 2.0, 0.0],
            yaw: 0.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelData {
    pub planes: Vec<PlaneData>,
    pub portals: Vec<PortalData>,
    pub interactables: Vec<InteractableData>,
    pub lights: Vec<LightData>,
    pub spawn: Option<SpawnData>,
}

impl PlaneData {
    pub fn pos(&self) -> Vec3<f32> { Vec3::from(self.position) }

    pub fn ori(&self) -> Quaternion<f32> { quat_from_half_turns(self.rotation) }
}

impl PortalData {
    pub fn pos(&self) -> Vec3<f32> { Vec3::from(self.position) }

    pub fn ori(&self) -> Quaternion<f32> { quat_from_half_turns(self.rotation) }
}

impl InteractableData {
    pub fn pos(&self) -> Vec3<f32> { self.position.map_or_else(Vec3::zero, Vec3::from) }

    pub fn ori(&self) -> Quaternion<f32> {
        self.rotation
            .map_or_else(Quaternion::identity, quat_from_half_turns)
    }
}

impl LevelData {
    /// Read and validate a level file.
    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let source = fs::read_to_string(path)?;
        Self::from_ron(&source)
    }

    /// Parse and validate a level.
    pub fn from_ron(source: &str) -> Result<Self, LevelError> {
        let level = ron::de::from_str::<Self>(source)?;
        level.validate()?;
        Ok(level)
    }

    pub fn spawn(&self) -> SpawnData { self.spawn.clone().unwrap_or_default() }

    /// Index of the plane with the given id.
    pub fn plane_index(&self, id: &str) -> Option<usize> {
        self.planes
            .iter()
            .position(|plane| plane.id.as_deref() == Some(id))
    }

    /// Check everything a level needs to be built. Errors name the offending
    /// entity.
    pub fn validate(&self) -> Result<(), LevelError> {
        let mut ids = HashSet::new();
        for (i, plane) in self.planes.iter().enumerate() {
            let entity = || match &plane.id {
                Some(id) => format!("Plane {} ('{}')", i, id),
                None => format!("Plane {}", i),
            };
            if !(positive(plane.width) && positive(plane.height) && plane.uv_scale.is_finite()) {
                return Err(LevelError::InvalidDimensions { entity: entity() });
            }
            if !(finite(&plane.position) && finite(&plane.rotation)) {
                return Err(LevelError::NonFiniteTransform { entity: entity() });
            }
            if let Some(id) = &plane.id {
                if !ids.insert(id.as_str()) {
                    return Err(LevelError::DuplicatePlaneId(id.clone()));
                }
            }
        }

        if self.portals.len() % 2 != 0 {
            return Err(LevelError::UnpairedPortal {
                count: self.portals.len(),
            });
        }
        for (i, portal) in self.portals.iter().enumerate() {
            let entity = || format!("Portal {}", i);
            if !(positive(portal.width) && positive(portal.height)) {
                return Err(LevelError::InvalidDimensions { entity: entity() });
            }
            if !(finite(&portal.position) && finite(&portal.rotation)) {
                return Err(LevelError::NonFiniteTransform { entity: entity() });
            }
            if let Some(id) = &portal.object_id {
                if !ids.contains(id.as_str()) {
                    return Err(LevelError::DanglingObjectId {
                        portal: i,
                        id: id.clone(),
                    });
                }
            }
        }

        for (i, interactable) in self.interactables.iter().enumerate() {
            let entity = || format!("Interactable {}", i);
            if !positive(interactable.radius) {
                return Err(LevelError::InvalidDimensions { entity: entity() });
            }
            let transform_ok = interactable.position.map_or(true, |p| finite(&p))
                && interactable.rotation.map_or(true, |r| finite(&r));
            if !transform_ok {
                return Err(LevelError::NonFiniteTransform { entity: entity() });
            }
        }

        if let Some(spawn) = &self.spawn {
            if !(finite(&spawn.position) && spawn.yaw.is_finite()) {
                return Err(LevelError::NonFiniteTransform {
                    entity: "Spawn".to_string(),
                });
            }
        }

        Ok(())
    }
}
