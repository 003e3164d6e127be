use aperture_common::{
    level::LevelData,
    phys::{
        BodyDesc, BodyHandle, BodyTag, ColliderDesc, ColliderEvent, ColliderHandle, PhysicsEngine,
        PhysicsError, RapierEngine, TickHandler,
    },
    portal::{PortalPose, Portalable, PortalTraveller, Portals, TravellerLookup},
    State,
};
use hashbrown::HashMap;
use rand::{rngs::StdRng, Rng, SeedableRng};
use specs::{Builder, Entity, World, WorldExt};
use vek::*;

pub const TICK_RATE: u32 = 30;
pub const DT: f32 = 1.0 / TICK_RATE as f32;
pub const EPSILON: f32 = 1e-4;

/// A room with a portal on the back wall and its partner on the front
/// wall, facing each other.
pub const FACING_ROOM: &str = r#"(
    planes: [
        (id: Some("floor"), width: 20.0, height: 20.0, position: (0.0, 0.0, 0.0), rotation: (-0.5, 0.0, 0.0)),
        (id: Some("back"), width: 20.0, height: 6.0, position: (0.0, 3.0, -5.0), rotation: (0.0, 0.0, 0.0)),
        (id: Some("front"), width: 20.0, height: 6.0, position: (0.0, 3.0, 5.0), rotation: (0.0, 1.0, 0.0)),
    ],
    portals: [
        (width: 2.0, height: 4.0, position: (0.0, 2.0, -4.95), rotation: (0.0, 0.0, 0.0), object_id: Some("back")),
        (width: 2.0, height: 4.0, position: (0.0, 2.0, 4.95), rotation: (0.0, 1.0, 0.0), object_id: Some("front")),
    ],
    spawn: Some((position: (6.0, 0.1, 0.0))),
)"#;

pub fn facing_room() -> LevelData {
    LevelData::from_ron(FACING_ROOM).expect("test level is valid")
}

pub fn setup() -> State<RapierEngine> {
    State::from_level(RapierEngine::default(), &facing_room(), TICK_RATE)
        .expect("test level builds")
}

/// Stand-in for a game object, moved kinematically at a fixed velocity.
pub struct TestTraveller {
    pub body: BodyHandle,
    pub collider: ColliderHandle,
    pub vel: Vec3<f32>,
    pub traveller: PortalTraveller,
    pub warps: Vec<(Vec3<f32>, Quaternion<f32>, Quaternion<f32>)>,
}

impl Portalable<RapierEngine> for TestTraveller {
    fn position(&self, engine: &RapierEngine) -> Result<Vec3<f32>, PhysicsError> {
        engine.translation(self.body)
    }

    fn rotation(&self, engine: &RapierEngine) -> Result<Quaternion<f32>, PhysicsError> {
        engine.rotation(self.body)
    }

    fn warp(
        &mut self,
        engine: &mut RapierEngine,
        pos: Vec3<f32>,
        rot: Quaternion<f32>,
        delta: Quaternion<f32>,
    ) -> Result<(), PhysicsError> {
        engine.set_translation(self.body, pos)?;
        engine.set_rotation(self.body, rot)?;
        self.vel = delta * self.vel;
        self.warps.push((pos, rot, delta));
        Ok(())
    }

    fn collider(&self) -> ColliderHandle { self.collider }

    fn traveller(&self) -> &PortalTraveller { &self.traveller }

    fn traveller_mut(&mut self) -> &mut PortalTraveller { &mut self.traveller }
}

#[derive(Default)]
pub struct Travellers(pub HashMap<Entity, TestTraveller>);

impl TravellerLookup<RapierEngine> for Travellers {
    fn with_traveller(
        &mut self,
        entity: Entity,
        f: &mut dyn FnMut(&mut dyn Portalable<RapierEngine>) -> Result<(), PhysicsError>,
    ) -> Result<(), PhysicsError> {
        match self.0.get_mut(&entity) {
            Some(traveller) => f(traveller),
            None => Ok(()),
        }
    }
}

/// Portals and kinematic travellers without the rest of the game.
pub struct PortalRig {
    pub ecs: World,
    pub portals: Portals,
    pub travellers: Travellers,
    pub warps_per_step: Vec<u32>,
}

impl PortalRig {
    pub fn new() -> Self {
        Self {
            ecs: World::new(),
            portals: Portals::new(),
            travellers: Travellers::default(),
            warps_per_step: Vec::new(),
        }
    }

    /// Portal A at the origin facing +Z, portal B at x = 10 facing -Z.
    pub fn linked_pair(&mut self, engine: &mut RapierEngine) -> (PortalPose, PortalPose) {
        let a = PortalPose::new(Vec3::zero(), Quaternion::identity());
        let b = PortalPose::new(
            Vec3::new(10.0, 0.0, 0.0),
            Quaternion::rotation_y(std::f32::consts::PI),
        );
        let ia = self.portals.add(engine, 2.0, 3.0, a).unwrap();
        let ib = self.portals.add(engine, 2.0, 3.0, b).unwrap();
        assert!(self.portals.link(ia, ib));
        (a, b)
    }

    pub fn add_traveller(
        &mut self,
        engine: &mut RapierEngine,
        pos: Vec3<f32>,
        radius: f32,
        vel: Vec3<f32>,
    ) -> Entity {
        let entity = self.ecs.create_entity().build();
        let body = engine.create_body(
            BodyDesc::kinematic_position_based(BodyTag::Traveller {
                entity,
                player: false,
            })
            .with_translation(pos),
        );
        let collider = engine
            .create_collider(ColliderDesc::ball(radius), Some(body))
            .unwrap();
        self.travellers.0.insert(entity, TestTraveller {
            body,
            collider,
            vel,
            traveller: PortalTraveller::default(),
            warps: Vec::new(),
        });
        entity
    }

    pub fn traveller(&self, entity: Entity) -> &TestTraveller { &self.travellers.0[&entity] }
}

impl TickHandler<RapierEngine> for PortalRig {
    type Error = PhysicsError;

    fn pre_step(&mut self, engine: &mut RapierEngine, dt: f32) -> Result<(), PhysicsError> {
        for traveller in self.travellers.0.values() {
            let pos = engine.translation(traveller.body)?;
            engine.set_next_kinematic_translation(traveller.body, pos + traveller.vel * dt)?;
        }
        Ok(())
    }

    fn on_collision(
        &mut self,
        engine: &mut RapierEngine,
        event: ColliderEvent,
    ) -> Result<(), PhysicsError> {
        self.portals
            .handle_collision(engine, event, &mut self.travellers)
    }

    fn post_step(&mut self, engine: &mut RapierEngine, _dt: f32) -> Result<(), PhysicsError> {
        let warps = self.portals.physics_update(engine, &mut self.travellers)?;
        self.warps_per_step.push(warps);
        Ok(())
    }
}

/// Seeded so failures reproduce.
pub fn seeded_rng(seed: u64) -> StdRng { StdRng::seed_from_u64(seed) }

pub fn random_vec3(rng: &mut impl Rng, scale: f32) -> Vec3<f32> {
    Vec3::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
    ) * scale
}

pub fn random_rotation(rng: &mut impl Rng) -> Quaternion<f32> {
    Vec4::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
    )
    .try_normalized()
    .map_or_else(Quaternion::identity, Quaternion::from_vec4)
}
