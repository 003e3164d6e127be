use serde::{Deserialize, Serialize};
use specs::{Component, VecStorage};
use vek::*;

/// How an entity is drawn.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Visual {
    Sphere { radius: f32, col: Rgb<f32> },
    /// The player's own model, only seen through portals.
    PlayerModel,
}

impl Component for Visual {
    type Storage = VecStorage<Self>;
}
