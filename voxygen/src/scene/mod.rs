pub mod camera;
pub mod portal;

pub use self::{
    camera::{Camera, Layers},
    portal::{PortalRenderer, RenderStats},
};

use common::{
    comp::{Interpolated, PortalTraveller, Visual},
    level::{LevelData, LightData},
    phys::PhysicsEngine,
    portal::{reproject_position, reproject_rotation, Portals},
    util::Plane,
    State,
};
use specs::{Entity, Join, LendJoin, WorldExt};
use vek::*;

/// A static level surface.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaneDraw {
    pub transform: Mat4<f32>,
    pub width: f32,
    pub height: f32,
    pub uv_scale: f32,
}

/// One draw of an entity's visual, with the clip planes that apply to this
/// draw only.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectDraw {
    pub entity: Entity,
    pub visual: Visual,
    pub pos: Vec3<f32>,
    pub ori: Quaternion<f32>,
    pub layer: Layers,
    /// `true` for copies drawn coming out of a portal's partner.
    pub duplicate: bool,
    pub clip_planes: Vec<Plane>,
}

impl ObjectDraw {
    pub fn transform(&self) -> Mat4<f32> {
        Mat4::<f32>::translation_3d(self.pos) * Mat4::from(self.ori)
    }

    /// Clip planes keep the point.
    pub fn keeps(&self, p: Vec3<f32>) -> bool {
        self.clip_planes.iter().all(|plane| plane.distance(p) >= 0.0)
    }
}

/// What there is to draw this frame.
pub struct Scene {
    planes: Vec<PlaneDraw>,
    lights: Vec<LightData>,
    objects: Vec<ObjectDraw>,
}

impl Scene {
    pub fn new(level: &LevelData) -> Self {
        let planes = level
            .planes
            .iter()
            .map(|plane| PlaneDraw {
                transform: Mat4::<f32>::translation_3d(plane.pos()) * Mat4::from(plane.ori()),
                width: plane.width,
                height: plane.height,
                uv_scale: plane.uv_scale,
            })
            .collect();

        Self {
            planes,
            lights: level.lights.clone(),
            objects: Vec::new(),
        }
    }

    pub fn planes(&self) -> &[PlaneDraw] { &self.planes }

    pub fn lights(&self) -> &[LightData] { &self.lights }

    pub fn objects(&self) -> &[ObjectDraw] { &self.objects }

    /// Rebuild the object draws from the state's render poses.
    pub fn maintain<E: PhysicsEngine>(&mut self, state: &State<E>) {
        self.objects.clear();
        let ecs = state.ecs();
        let player = state.player();
        let portals = state.portals();
        let travellers = ecs.read_storage::<PortalTraveller>();

        for (entity, visual, pose, traveller) in (
            &ecs.entities(),
            &ecs.read_storage::<Visual>(),
            &ecs.read_storage::<Interpolated>(),
            (&travellers).maybe(),
        )
            .join()
        {
            let is_player = entity == player;
            self.objects.push(ObjectDraw {
                entity,
                visual: *visual,
                pos: pose.pos,
                ori: pose.ori,
                layer: if is_player {
                    Layers::PLAYER
                } else {
                    Layers::SCENE
                },
                duplicate: false,
                clip_planes: traveller
                    .map(|t| portals.primary_clip_planes(t).collect())
                    .unwrap_or_default(),
            });

            if let Some(traveller) = traveller {
                push_duplicates(
                    &mut self.objects,
                    portals,
                    entity,
                    *visual,
                    pose,
                    traveller,
                    is_player,
                );
            }
        }
    }
}

/// One copy per portal the entity is standing in, seen coming out of the
/// partner and cut by the partner's plane.
fn push_duplicates(
    objects: &mut Vec<ObjectDraw>,
    portals: &Portals,
    entity: Entity,
    visual: Visual,
    pose: &Interpolated,
    traveller: &PortalTraveller,
    is_player: bool,
) {
    for membership in traveller.memberships() {
        let (Some(portal), Some(partner)) =
            (portals.get(membership.portal), portals.get(membership.partner))
        else {
            continue;
        };
        objects.push(ObjectDraw {
            entity,
            visual,
            pos: reproject_position(pose.pos, portal.pose(), partner.pose()),
            ori: reproject_rotation(pose.ori, portal.pose(), partner.pose()),
            layer: if is_player {
                Layers::PLAYER_DUPLICATE
            } else {
                Layers::SCENE
            },
            duplicate: true,
            clip_planes: vec![partner.clip_plane()],
        });
    }
}
