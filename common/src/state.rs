//! The game state: entities and their components, the physics world driving
//! them and the portals connecting the level.

use crate::{
    comp::{
        self, Interpolated, Ori, PhysicsBody, PhysicsInterpolator, Player, PlayerInputs, Pos,
        PortalTraveller, Vel, Visual,
    },
    consts::{
        PLANE_HALF_THICKNESS, PLAYER_EYE_HEIGHT, PLAYER_HEIGHT, PLAYER_MOVE_SPEED, PLAYER_RADIUS,
    },
    error::Error,
    level::LevelData,
    phys::{
        BodyDesc, BodyTag, ColliderDesc, ColliderEvent, ColliderHandle, PhysicsEngine,
        PhysicsError, PhysicsWorld, RapierEngine, TickHandler,
    },
    portal::{PortalId, PortalPose, Portalable, Portals, TravellerLookup},
    resources::{DeltaTime, TickAlpha, TickCount, Time},
    util::yaw_of,
};
use specs::{Builder, Entity, Join, ReadStorage, World as EcsWorld, WorldExt, WriteStorage};
use std::f32::consts::{PI, TAU};
use tracing::{debug, info};
use vek::*;

/// Everything simulated for one loaded level.
pub struct State<E: PhysicsEngine = RapierEngine> {
    ecs: EcsWorld,
    physics: PhysicsWorld<E>,
    portals: Portals,
    level: LevelData,
    planes: Vec<ColliderHandle>,
    player: Entity,
}

impl State<RapierEngine> {
    /// Build `level` on rapier3d at the default tick rate.
    pub fn new(level: &LevelData) -> Result<Self, Error> {
        Self::from_level(RapierEngine::default(), level, crate::consts::DEFAULT_TICK_RATE)
    }
}

impl<E: PhysicsEngine> State<E> {
    /// Build a level. Configuration errors are reported before anything is
    /// created.
    pub fn from_level(mut engine: E, level: &LevelData, tick_rate: u32) -> Result<Self, Error> {
        level.validate()?;

        let mut ecs = EcsWorld::new();
        comp::register_components(&mut ecs);
        ecs.insert(Time(0.0));
        ecs.insert(DeltaTime(0.0));
        ecs.insert(TickAlpha(0.0));
        ecs.insert(TickCount(0));

        let planes = level
            .planes
            .iter()
            .map(|plane| {
                let (hw, hh) = (plane.width / 2.0, plane.height / 2.0);
                engine.create_collider(
                    ColliderDesc::cuboid(hw, hh, PLANE_HALF_THICKNESS)
                        .translation(plane.pos())
                        .rotation(plane.ori()),
                    None,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut portals = Portals::new();
        for (i, data) in level.portals.iter().enumerate() {
            let id = portals.add(
                &mut engine,
                data.width,
                data.height,
                PortalPose::new(data.pos(), data.ori()),
            )?;
            let attached = data
                .object_id
                .as_deref()
                .and_then(|object| level.plane_index(object))
                .and_then(|idx| planes.get(idx).copied());
            portals.set_attached_object(&mut engine, id, attached)?;
            if i % 2 == 1 {
                portals.link(PortalId(id.0 - 1), id);
            }
        }

        let spawn = level.spawn();
        let player = create_player(
            &mut ecs,
            &mut engine,
            Vec3::from(spawn.position),
            spawn.yaw * PI,
        )?;

        let mut state = Self {
            ecs,
            physics: PhysicsWorld::with_tick_rate(engine, tick_rate),
            portals,
            level: level.clone(),
            planes,
            player,
        };
        for data in &level.interactables {
            state.spawn_interactable(data.pos(), data.ori(), data.radius)?;
        }

        info!(
            planes = level.planes.len(),
            portals = level.portals.len(),
            interactables = level.interactables.len(),
            "Level loaded"
        );
        Ok(state)
    }

    pub fn ecs(&self) -> &EcsWorld { &self.ecs }

    pub fn ecs_mut(&mut self) -> &mut EcsWorld { &mut self.ecs }

    pub fn physics(&self) -> &PhysicsWorld<E> { &self.physics }

    pub fn physics_mut(&mut self) -> &mut PhysicsWorld<E> { &mut self.physics }

    pub fn engine(&self) -> &E { self.physics.engine() }

    pub fn portals(&self) -> &Portals { &self.portals }

    pub fn level(&self) -> &LevelData { &self.level }

    /// Colliders of the level's static planes, in declaration order.
    pub fn plane_colliders(&self) -> &[ColliderHandle] { &self.planes }

    pub fn player(&self) -> Entity { self.player }

    pub fn set_paused(&mut self, paused: bool) { self.physics.set_paused(paused); }

    pub fn is_paused(&self) -> bool { self.physics.is_paused() }

    /// Get the current in-game tick time.
    pub fn get_time(&self) -> f64 { self.ecs.read_resource::<Time>().0 }

    pub fn tick_count(&self) -> u64 { self.ecs.read_resource::<TickCount>().0 }

    /// Eye position and view rotation of the player at the current render
    /// pose.
    pub fn player_view(&self) -> Option<(Vec3<f32>, Quaternion<f32>)> {
        let players = self.ecs.read_storage::<Player>();
        let interpolated = self.ecs.read_storage::<Interpolated>();
        let player = players.get(self.player)?;
        let pose = interpolated.get(self.player)?;
        Some((
            pose.pos + Vec3::unit_y() * PLAYER_EYE_HEIGHT,
            player.view_ori(),
        ))
    }

    /// Add a dynamic ball that can travel through portals.
    pub fn spawn_interactable(
        &mut self,
        pos: Vec3<f32>,
        ori: Quaternion<f32>,
        radius: f32,
    ) -> Result<Entity, Error> {
        let entity = self
            .ecs
            .create_entity()
            .with(Pos(pos))
            .with(Ori(ori))
            .with(Vel(Vec3::zero()))
            .with(PhysicsInterpolator::new(pos, ori))
            .with(Interpolated { pos, ori })
            .with(PortalTraveller::default())
            .with(Visual::Sphere {
                radius,
                col: Rgb::new(0.9, 0.4, 0.1),
            })
            .build();

        let engine = self.physics.engine_mut();
        let body = engine.create_body(
            BodyDesc::dynamic(BodyTag::Traveller {
                entity,
                player: false,
            })
            .with_translation(pos)
            .with_rotation(ori),
        );
        let collider = engine.create_collider(ColliderDesc::ball(radius), Some(body))?;
        let _ = self
            .ecs
            .write_storage()
            .insert(entity, PhysicsBody { body, collider });

        debug!(?entity, ?pos, "Spawned interactable");
        Ok(entity)
    }

    /// Teleport an entity, snapping its interpolation so nothing is blended
    /// across the jump.
    pub fn warp_entity(
        &mut self,
        entity: Entity,
        pos: Vec3<f32>,
        ori: Quaternion<f32>,
    ) -> Result<(), Error> {
        let Some(body) = self.ecs.read_storage::<PhysicsBody>().get(entity).copied() else {
            return Ok(());
        };
        let engine = self.physics.engine_mut();
        engine.set_translation(body.body, pos)?;
        engine.set_rotation(body.body, ori)?;
        engine.set_linvel(body.body, Vec3::zero())?;

        if let Some(interp) = self.ecs.write_storage::<PhysicsInterpolator>().get_mut(entity) {
            interp.warp(pos, ori);
        }
        if let Some(p) = self.ecs.write_storage::<Pos>().get_mut(entity) {
            p.0 = pos;
        }
        if let Some(o) = self.ecs.write_storage::<Ori>().get_mut(entity) {
            o.0 = ori;
        }
        if let Some(i) = self.ecs.write_storage::<Interpolated>().get_mut(entity) {
            *i = Interpolated { pos, ori };
        }
        Ok(())
    }

    /// Advance the simulation by a frame. Look input applies immediately,
    /// movement intent is used by every physics step of the frame. Returns
    /// the number of physics steps run.
    pub fn tick(&mut self, frame_dt: f32, inputs: &PlayerInputs) -> Result<u32, Error> {
        // Paused means no stepping and no input either
        if self.physics.is_paused() {
            return Ok(0);
        }

        if let Some(player) = self.ecs.write_storage::<Player>().get_mut(self.player) {
            player.look(inputs.yaw_delta, inputs.pitch_delta);
        }

        let mut systems = TickSystems {
            ecs: &self.ecs,
            portals: &mut self.portals,
            inputs: inputs.clamped(),
        };
        let steps = self.physics.advance(frame_dt, &mut systems)?;

        let dt = self.physics.tick_duration();
        let alpha = self.physics.interpolation_alpha();
        {
            let mut time = self.ecs.write_resource::<Time>();
            *time = time.add_seconds(steps as f64 * dt as f64);
        }
        self.ecs.write_resource::<TickCount>().0 += steps as u64;
        *self.ecs.write_resource::<DeltaTime>() = DeltaTime(dt);
        *self.ecs.write_resource::<TickAlpha>() = TickAlpha(alpha);

        let interpolators = self.ecs.read_storage::<PhysicsInterpolator>();
        let mut interpolated = self.ecs.write_storage::<Interpolated>();
        for (interp, render) in (&interpolators, &mut interpolated).join() {
            let (pos, ori) = interp.render_transform(alpha);
            *render = Interpolated { pos, ori };
        }

        Ok(steps)
    }
}

fn create_player<E: PhysicsEngine>(
    ecs: &mut EcsWorld,
    engine: &mut E,
    pos: Vec3<f32>,
    yaw: f32,
) -> Result<Entity, Error> {
    let player = Player::new(yaw);
    let ori = player.body_ori();
    let entity = ecs
        .create_entity()
        .with(Pos(pos))
        .with(Ori(ori))
        .with(Vel(Vec3::zero()))
        .with(PhysicsInterpolator::new(pos, ori))
        .with(Interpolated { pos, ori })
        .with(PortalTraveller::default())
        .with(Visual::PlayerModel)
        .with(player)
        .build();

    let body = engine.create_body(
        BodyDesc::kinematic_position_based(BodyTag::Traveller {
            entity,
            player: true,
        })
        .with_translation(pos)
        .with_rotation(ori),
    );
    // The body sits at the feet, the capsule stands on top of it
    let half_height = (PLAYER_HEIGHT / 2.0 - PLAYER_RADIUS).max(0.0);
    let collider = engine.create_collider(
        ColliderDesc::capsule(half_height, PLAYER_RADIUS)
            .translation(Vec3::unit_y() * (half_height + PLAYER_RADIUS)),
        Some(body),
    )?;
    let _ = ecs
        .write_storage()
        .insert(entity, PhysicsBody { body, collider });
    Ok(entity)
}

/// Per step game logic: the player controller before the engine step,
/// portal sensors during it, and crossing detection plus pose sync after.
struct TickSystems<'a> {
    ecs: &'a EcsWorld,
    portals: &'a mut Portals,
    inputs: PlayerInputs,
}

impl<'a, E: PhysicsEngine> TickHandler<E> for TickSystems<'a> {
    type Error = Error;

    fn pre_step(&mut self, engine: &mut E, dt: f32) -> Result<(), Error> {
        let mut players = self.ecs.write_storage::<Player>();
        let bodies = self.ecs.read_storage::<PhysicsBody>();

        for (player, body) in (&mut players, &bodies).join() {
            let mut movement = player.walk(&self.inputs, PLAYER_MOVE_SPEED, dt);
            if !player.grounded {
                player.fall_velocity += engine.gravity() * dt;
                movement += player.fall_velocity * dt;
            }

            let moved = engine.move_character(body.collider, movement)?;
            player.grounded = moved.grounded;
            if moved.grounded {
                player.fall_velocity = Vec3::zero();
            }

            let target = engine.translation(body.body)? + moved.translation;
            engine.set_next_kinematic_translation(body.body, target)?;
            engine.set_rotation(body.body, player.body_ori())?;
        }
        Ok(())
    }

    fn on_collision(&mut self, engine: &mut E, event: ColliderEvent) -> Result<(), Error> {
        let mut travellers = EcsTravellers::fetch(self.ecs);
        self.portals.handle_collision(engine, event, &mut travellers)?;
        Ok(())
    }

    fn post_step(&mut self, engine: &mut E, _dt: f32) -> Result<(), Error> {
        {
            let mut travellers = EcsTravellers::fetch(self.ecs);
            self.portals.physics_update(engine, &mut travellers)?;
        }

        let bodies = self.ecs.read_storage::<PhysicsBody>();
        let mut positions = self.ecs.write_storage::<Pos>();
        let mut orientations = self.ecs.write_storage::<Ori>();
        let mut velocities = self.ecs.write_storage::<Vel>();
        let mut interpolators = self.ecs.write_storage::<PhysicsInterpolator>();

        for (body, pos, ori, vel, interp) in (
            &bodies,
            &mut positions,
            &mut orientations,
            &mut velocities,
            &mut interpolators,
        )
            .join()
        {
            pos.0 = engine.translation(body.body)?;
            ori.0 = engine.rotation(body.body)?;
            vel.0 = engine.linvel(body.body)?;
            interp.on_physics_step(pos.0, ori.0);
        }
        Ok(())
    }
}

/// Travellers looked up through the ECS storages.
struct EcsTravellers<'a> {
    bodies: ReadStorage<'a, PhysicsBody>,
    travellers: WriteStorage<'a, PortalTraveller>,
    interpolators: WriteStorage<'a, PhysicsInterpolator>,
    players: WriteStorage<'a, Player>,
}

impl<'a> EcsTravellers<'a> {
    fn fetch(ecs: &'a EcsWorld) -> Self {
        Self {
            bodies: ecs.read_storage(),
            travellers: ecs.write_storage(),
            interpolators: ecs.write_storage(),
            players: ecs.write_storage(),
        }
    }
}

impl<'a, E: PhysicsEngine> TravellerLookup<E> for EcsTravellers<'a> {
    fn with_traveller(
        &mut self,
        entity: Entity,
        f: &mut dyn FnMut(&mut dyn Portalable<E>) -> Result<(), PhysicsError>,
    ) -> Result<(), PhysicsError> {
        let (Some(body), Some(traveller)) = (
            self.bodies.get(entity).copied(),
            self.travellers.get_mut(entity),
        ) else {
            return Ok(());
        };
        f(&mut TravellerMut {
            body,
            traveller,
            interpolator: self.interpolators.get_mut(entity),
            player: self.players.get_mut(entity),
        })
    }
}

/// Mutable view of one travelling entity.
struct TravellerMut<'a> {
    body: PhysicsBody,
    traveller: &'a mut PortalTraveller,
    interpolator: Option<&'a mut PhysicsInterpolator>,
    player: Option<&'a mut Player>,
}

impl<'a, E: PhysicsEngine> Portalable<E> for TravellerMut<'a> {
    fn position(&self, engine: &E) -> Result<Vec3<f32>, PhysicsError> {
        engine.translation(self.body.body)
    }

    fn rotation(&self, engine: &E) -> Result<Quaternion<f32>, PhysicsError> {
        engine.rotation(self.body.body)
    }

    fn warp(
        &mut self,
        engine: &mut E,
        pos: Vec3<f32>,
        rot: Quaternion<f32>,
        delta: Quaternion<f32>,
    ) -> Result<(), PhysicsError> {
        let body = self.body.body;
        let from = engine.translation(body)?;
        engine.set_translation(body, pos)?;
        // Keep moving the same way relative to the portal
        let vel = engine.linvel(body)?;
        engine.set_linvel(body, delta * vel)?;

        match self.player.as_deref_mut() {
            // The player stays upright, only the heading is carried over
            Some(player) => {
                player.yaw = (player.yaw + yaw_of(delta)).rem_euclid(TAU);
                player.fall_velocity = delta * player.fall_velocity;
                engine.set_rotation(body, player.body_ori())?;
            },
            None => engine.set_rotation(body, rot)?,
        }

        if let Some(interp) = self.interpolator.as_deref_mut() {
            interp.warp_through(from, pos, delta);
        }
        Ok(())
    }

    fn collider(&self) -> ColliderHandle { self.body.collider }

    fn traveller(&self) -> &PortalTraveller { self.traveller }

    fn traveller_mut(&mut self) -> &mut PortalTraveller { self.traveller }

    fn is_player(&self) -> bool { self.player.is_some() }
}
