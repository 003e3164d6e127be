mod phys;
mod player;
mod visual;

// Reexports
pub use crate::{phys::PhysicsInterpolator, portal::PortalTraveller};
pub use phys::{Interpolated, Ori, PhysicsBody, Pos, Vel};
pub use player::{Player, PlayerInputs, MAX_PITCH};
pub use visual::Visual;

use specs::{World, WorldExt};

pub fn register_components(ecs: &mut World) {
    ecs.register::<Pos>();
    ecs.register::<Ori>();
    ecs.register::<Vel>();
    ecs.register::<PhysicsBody>();
    ecs.register::<PhysicsInterpolator>();
    ecs.register::<Interpolated>();
    ecs.register::<PortalTraveller>();
    ecs.register::<Player>();
    ecs.register::<Visual>();
}
