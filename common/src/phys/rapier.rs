//! [`PhysicsEngine`] over rapier3d. Bodies and colliders live in rapier's
//! sets; the engine hands out its own dense handles and keeps the mapping in
//! side tables so the rest of the crate never sees a rapier type.

use super::{
    BodyDesc, BodyHandle, BodyKind, BodyTag, CharacterMovement, ColliderDesc, ColliderHandle,
    CollisionEvent, CollisionGroups, PhysicsEngine, PhysicsError, Shape,
};
use crate::consts::{CHARACTER_OFFSET, DEFAULT_TICK_RATE, GRAVITY};
use crossbeam_channel::Receiver;
use hashbrown::HashMap;
use rapier3d::{
    control::{CharacterLength, KinematicCharacterController},
    na,
    prelude as rp,
};
use tracing::trace;
use vek::*;

struct Body {
    handle: rp::RigidBodyHandle,
    tag: BodyTag,
}

struct Collider {
    handle: rp::ColliderHandle,
    parent: Option<BodyHandle>,
}

pub struct RapierEngine {
    gravity: Vec3<f32>,
    bodies: rp::RigidBodySet,
    colliders: rp::ColliderSet,
    params: rp::IntegrationParameters,
    pipeline: rp::PhysicsPipeline,
    islands: rp::IslandManager,
    broad_phase: rp::DefaultBroadPhase,
    narrow_phase: rp::NarrowPhase,
    impulse_joints: rp::ImpulseJointSet,
    multibody_joints: rp::MultibodyJointSet,
    ccd_solver: rp::CCDSolver,
    query_pipeline: rp::QueryPipeline,
    // Colliders were added or moved since the query pipeline last saw them
    query_dirty: bool,
    controller: KinematicCharacterController,
    events: rp::ChannelEventCollector,
    collision_recv: Receiver<rp::CollisionEvent>,
    contact_force_recv: Receiver<rp::ContactForceEvent>,

    body_table: Vec<Body>,
    collider_table: Vec<Collider>,
    collider_lookup: HashMap<rp::ColliderHandle, ColliderHandle>,
}

impl Default for RapierEngine {
    fn default() -> Self { Self::new(Vec3::new(0.0, -GRAVITY, 0.0)) }
}

impl RapierEngine {
    pub fn new(gravity: Vec3<f32>) -> Self {
        let (collision_send, collision_recv) = crossbeam_channel::unbounded();
        let (contact_force_send, contact_force_recv) = crossbeam_channel::unbounded();
        let controller = KinematicCharacterController {
            offset: CharacterLength::Absolute(CHARACTER_OFFSET),
            ..KinematicCharacterController::default()
        };
        let params = rp::IntegrationParameters {
            dt: 1.0 / DEFAULT_TICK_RATE as f32,
            ..rp::IntegrationParameters::default()
        };

        Self {
            gravity,
            bodies: rp::RigidBodySet::new(),
            colliders: rp::ColliderSet::new(),
            params,
            pipeline: rp::PhysicsPipeline::new(),
            islands: rp::IslandManager::new(),
            broad_phase: rp::DefaultBroadPhase::new(),
            narrow_phase: rp::NarrowPhase::new(),
            impulse_joints: rp::ImpulseJointSet::new(),
            multibody_joints: rp::MultibodyJointSet::new(),
            ccd_solver: rp::CCDSolver::new(),
            query_pipeline: rp::QueryPipeline::new(),
            query_dirty: false,
            controller,
            events: rp::ChannelEventCollector::new(collision_send, contact_force_send),
            collision_recv,
            contact_force_recv,
            body_table: Vec::new(),
            collider_table: Vec::new(),
            collider_lookup: HashMap::new(),
        }
    }

    pub fn body_count(&self) -> usize { self.body_table.len() }

    pub fn collider_count(&self) -> usize { self.collider_table.len() }

    /// Angular velocity of a body, in radians per second around each axis.
    pub fn angvel(&self, body: BodyHandle) -> Result<Vec3<f32>, PhysicsError> {
        Ok(from_na(self.body(body)?.angvel()))
    }

    fn body(&self, handle: BodyHandle) -> Result<&rp::RigidBody, PhysicsError> {
        self.body_table
            .get(handle.0 as usize)
            .and_then(|body| self.bodies.get(body.handle))
            .ok_or(PhysicsError::InvalidBody(handle))
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut rp::RigidBody, PhysicsError> {
        self.body_table
            .get(handle.0 as usize)
            .and_then(|body| self.bodies.get_mut(body.handle))
            .ok_or(PhysicsError::InvalidBody(handle))
    }

    fn collider(&self, handle: ColliderHandle) -> Result<&rp::Collider, PhysicsError> {
        self.collider_table
            .get(handle.0 as usize)
            .and_then(|collider| self.colliders.get(collider.handle))
            .ok_or(PhysicsError::InvalidCollider(handle))
    }

    fn collider_mut(&mut self, handle: ColliderHandle) -> Result<&mut rp::Collider, PhysicsError> {
        self.collider_table
            .get(handle.0 as usize)
            .and_then(|collider| self.colliders.get_mut(collider.handle))
            .ok_or(PhysicsError::InvalidCollider(handle))
    }

    fn check_finite(&self) -> Result<(), PhysicsError> {
        for (key, entry) in self.body_table.iter().enumerate() {
            let Some(body) = self.bodies.get(entry.handle) else {
                continue;
            };
            let translation = from_na(body.translation());
            let linvel = from_na(body.linvel());
            if !(translation.map(f32::is_finite).reduce_and()
                && linvel.map(f32::is_finite).reduce_and())
            {
                return Err(PhysicsError::NonFiniteBody {
                    body: BodyHandle(key as u32),
                    translation,
                });
            }
        }
        Ok(())
    }

    fn translate_event(&self, event: rp::CollisionEvent) -> Option<CollisionEvent> {
        let collider1 = *self.collider_lookup.get(&event.collider1())?;
        let collider2 = *self.collider_lookup.get(&event.collider2())?;
        Some(CollisionEvent {
            collider1: collider1.min(collider2),
            collider2: collider1.max(collider2),
            started: event.started(),
        })
    }
}

impl PhysicsEngine for RapierEngine {
    fn gravity(&self) -> Vec3<f32> { self.gravity }

    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let builder = match desc.kind {
            BodyKind::Fixed => rp::RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => rp::RigidBodyBuilder::dynamic(),
            BodyKind::KinematicPositionBased => rp::RigidBodyBuilder::kinematic_position_based(),
        };
        let body = builder
            .position(to_isometry(desc.translation, desc.rotation))
            .linvel(to_na(desc.linvel))
            .build();
        let handle = self.bodies.insert(body);
        self.body_table.push(Body {
            handle,
            tag: desc.tag,
        });
        BodyHandle(self.body_table.len() as u32 - 1)
    }

    fn create_collider(
        &mut self,
        desc: ColliderDesc,
        parent: Option<BodyHandle>,
    ) -> Result<ColliderHandle, PhysicsError> {
        let builder = match desc.shape {
            Shape::Ball { radius } => rp::ColliderBuilder::ball(radius),
            Shape::Cuboid { half_extents } => {
                rp::ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            },
            Shape::Capsule {
                half_height,
                radius,
            } => rp::ColliderBuilder::capsule_y(half_height, radius),
        };
        let mut builder = builder
            .sensor(desc.sensor)
            .collision_groups(to_interaction_groups(desc.groups))
            .position(to_isometry(desc.translation, desc.rotation));
        if desc.active_events {
            // Portal sensors sit on fixed bodies and have to notice kinematic
            // players as well as dynamic props
            builder = builder
                .active_events(rp::ActiveEvents::COLLISION_EVENTS)
                .active_collision_types(
                    rp::ActiveCollisionTypes::default()
                        | rp::ActiveCollisionTypes::KINEMATIC_FIXED,
                );
        }

        let handle = match parent {
            Some(parent) => {
                let body = self
                    .body_table
                    .get(parent.0 as usize)
                    .map(|body| body.handle)
                    .ok_or(PhysicsError::InvalidBody(parent))?;
                self.colliders
                    .insert_with_parent(builder.build(), body, &mut self.bodies)
            },
            None => self.colliders.insert(builder.build()),
        };

        let ours = ColliderHandle(self.collider_table.len() as u32);
        self.collider_table.push(Collider { handle, parent });
        self.collider_lookup.insert(handle, ours);
        self.query_dirty = true;
        Ok(ours)
    }

    fn step(&mut self, dt: f32, events: &mut Vec<CollisionEvent>) -> Result<(), PhysicsError> {
        // NaNs must never reach the broad phase
        self.check_finite()?;

        self.params.dt = dt;
        self.pipeline.step(
            &to_na(self.gravity),
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.events,
        );
        self.query_dirty = false;

        self.check_finite()?;

        let start = events.len();
        while let Ok(event) = self.collision_recv.try_recv() {
            match self.translate_event(event) {
                Some(event) => events.push(event),
                None => trace!(?event, "Collision event for an unknown collider"),
            }
        }
        // Stops first, so leaving one volume is seen before entering the next
        events[start..].sort_by_key(|event| (event.started, event.collider1, event.collider2));
        // Nothing listens for contact forces
        while self.contact_force_recv.try_recv().is_ok() {}

        Ok(())
    }

    fn collider_parent(&self, collider: ColliderHandle) -> Option<BodyHandle> {
        self.collider_table
            .get(collider.0 as usize)
            .and_then(|c| c.parent)
    }

    fn body_tag(&self, body: BodyHandle) -> Option<BodyTag> {
        self.body_table.get(body.0 as usize).map(|b| b.tag)
    }

    fn translation(&self, body: BodyHandle) -> Result<Vec3<f32>, PhysicsError> {
        Ok(from_na(self.body(body)?.translation()))
    }

    fn rotation(&self, body: BodyHandle) -> Result<Quaternion<f32>, PhysicsError> {
        Ok(from_rotation(self.body(body)?.rotation()))
    }

    fn linvel(&self, body: BodyHandle) -> Result<Vec3<f32>, PhysicsError> {
        Ok(from_na(self.body(body)?.linvel()))
    }

    fn set_translation(&mut self, body: BodyHandle, pos: Vec3<f32>) -> Result<(), PhysicsError> {
        self.body_mut(body)?.set_translation(to_na(pos), true);
        self.query_dirty = true;
        Ok(())
    }

    fn set_rotation(
        &mut self,
        body: BodyHandle,
        rot: Quaternion<f32>,
    ) -> Result<(), PhysicsError> {
        self.body_mut(body)?.set_rotation(to_rotation(rot), true);
        self.query_dirty = true;
        Ok(())
    }

    fn set_linvel(&mut self, body: BodyHandle, vel: Vec3<f32>) -> Result<(), PhysicsError> {
        self.body_mut(body)?.set_linvel(to_na(vel), true);
        Ok(())
    }

    fn set_next_kinematic_translation(
        &mut self,
        body: BodyHandle,
        pos: Vec3<f32>,
    ) -> Result<(), PhysicsError> {
        self.body_mut(body)?
            .set_next_kinematic_translation(to_na(pos));
        Ok(())
    }

    fn collision_groups(&self, collider: ColliderHandle) -> Result<CollisionGroups, PhysicsError> {
        Ok(from_interaction_groups(
            self.collider(collider)?.collision_groups(),
        ))
    }

    fn set_collision_groups(
        &mut self,
        collider: ColliderHandle,
        groups: CollisionGroups,
    ) -> Result<(), PhysicsError> {
        self.collider_mut(collider)?
            .set_collision_groups(to_interaction_groups(groups));
        Ok(())
    }

    fn set_collider_pose(
        &mut self,
        collider: ColliderHandle,
        translation: Vec3<f32>,
        rotation: Quaternion<f32>,
    ) -> Result<(), PhysicsError> {
        let pose = to_isometry(translation, rotation);
        let collider = self.collider_mut(collider)?;
        if collider.parent().is_some() {
            collider.set_position_wrt_parent(pose);
        } else {
            collider.set_position(pose);
        }
        self.query_dirty = true;
        Ok(())
    }

    fn move_character(
        &mut self,
        collider: ColliderHandle,
        desired: Vec3<f32>,
    ) -> Result<CharacterMovement, PhysicsError> {
        if self.query_dirty {
            self.query_pipeline.update(&self.colliders);
            self.query_dirty = false;
        }

        let handle = self
            .collider_table
            .get(collider.0 as usize)
            .map(|c| c.handle)
            .ok_or(PhysicsError::InvalidCollider(collider))?;
        let character = self.collider(collider)?;
        let mut filter = rp::QueryFilter::exclude_dynamic()
            .exclude_sensors()
            .exclude_collider(handle)
            .groups(character.collision_groups());
        // A teleported body only drags its colliders along on the next step,
        // so work from the body pose rather than the collider's
        let mut pose = *character.position();
        if let Some(body) = character.parent() {
            filter = filter.exclude_rigid_body(body);
            if let (Some(parent), Some(rel)) =
                (self.bodies.get(body), character.position_wrt_parent())
            {
                pose = parent.position() * rel;
            }
        }

        let movement = self.controller.move_shape(
            self.params.dt,
            &self.bodies,
            &self.colliders,
            &self.query_pipeline,
            character.shape(),
            &pose,
            to_na(desired),
            filter,
            |_| {},
        );

        Ok(CharacterMovement {
            translation: from_na(&movement.translation),
            grounded: movement.grounded,
        })
    }
}

fn to_na(v: Vec3<f32>) -> rp::Vector<f32> { rp::Vector::new(v.x, v.y, v.z) }

fn from_na(v: &rp::Vector<f32>) -> Vec3<f32> { Vec3::new(v.x, v.y, v.z) }

fn to_rotation(q: Quaternion<f32>) -> rp::Rotation<f32> {
    na::UnitQuaternion::new_normalize(na::Quaternion::new(q.w, q.x, q.y, q.z))
}

fn from_rotation(r: &rp::Rotation<f32>) -> Quaternion<f32> {
    Quaternion::from_xyzw(r.i, r.j, r.k, r.w)
}

fn to_isometry(translation: Vec3<f32>, rotation: Quaternion<f32>) -> rp::Isometry<f32> {
    rp::Isometry::from_parts(to_na(translation).into(), to_rotation(rotation))
}

fn to_interaction_groups(groups: CollisionGroups) -> rp::InteractionGroups {
    rp::InteractionGroups::new(
        rp::Group::from_bits_truncate(groups.membership() as u32),
        rp::Group::from_bits_truncate(groups.mask() as u32),
    )
}

fn from_interaction_groups(groups: rp::InteractionGroups) -> CollisionGroups {
    CollisionGroups::new(
        groups.memberships.bits() as u16,
        groups.filter.bits() as u16,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor(engine: &mut RapierEngine) -> ColliderHandle {
        let body = engine.create_body(BodyDesc::fixed(BodyTag::Static));
        engine
            .create_collider(ColliderDesc::cuboid(10.0, 0.5, 10.0), Some(body))
            .unwrap()
    }

    fn step(engine: &mut RapierEngine, n: usize) -> Vec<CollisionEvent> {
        let mut events = Vec::new();
        for _ in 0..n {
            engine.step(1.0 / 60.0, &mut events).unwrap();
        }
        events
    }

    #[test]
    fn ball_rests_on_floor() {
        let mut engine = RapierEngine::default();
        floor(&mut engine);
        let ball = engine.create_body(
            BodyDesc::dynamic(BodyTag::Static).with_translation(Vec3::new(0.0, 3.0, 0.0)),
        );
        engine
            .create_collider(ColliderDesc::ball(0.5), Some(ball))
            .unwrap();

        step(&mut engine, 240);

        let pos = engine.translation(ball).unwrap();
        assert!((pos.y - 1.0).abs() < 0.05, "ball at {:?}", pos);
        assert!(engine.linvel(ball).unwrap().y.abs() < 0.5);
    }

    #[test]
    fn rolling_ball_rotates() {
        let mut engine = RapierEngine::default();
        floor(&mut engine);
        let ball = engine.create_body(
            BodyDesc::dynamic(BodyTag::Static).with_translation(Vec3::new(0.0, 1.0, 0.0)),
        );
        engine
            .create_collider(ColliderDesc::ball(0.5), Some(ball))
            .unwrap();
        engine
            .set_linvel(ball, Vec3::new(3.0, 0.0, 0.0))
            .unwrap();

        let before = engine.rotation(ball).unwrap();
        step(&mut engine, 30);
        let after = engine.rotation(ball).unwrap();

        // Friction with the floor spins it around -Z
        assert!(engine.angvel(ball).unwrap().z < -0.1);
        assert!(before.dot(after).abs() < 0.999, "rotation {:?}", after);
    }

    #[test]
    fn masked_groups_pass_through() {
        let mut engine = RapierEngine::default();
        let floor = floor(&mut engine);
        engine
            .set_collision_groups(floor, CollisionGroups::PORTAL_ATTACHED)
            .unwrap();
        assert_eq!(
            engine.collision_groups(floor).unwrap(),
            CollisionGroups::PORTAL_ATTACHED
        );
        let ball = engine.create_body(
            BodyDesc::dynamic(BodyTag::Static).with_translation(Vec3::new(0.0, 1.0, 0.0)),
        );
        engine
            .create_collider(
                ColliderDesc::ball(0.5).groups(CollisionGroups::PORTAL_TRAVELLING),
                Some(ball),
            )
            .unwrap();

        step(&mut engine, 60);

        assert!(engine.translation(ball).unwrap().y < 0.0);
    }

    #[test]
    fn sensor_reports_start_and_stop() {
        let mut engine = RapierEngine::default();
        let sensor_body = engine.create_body(BodyDesc::fixed(BodyTag::Static));
        let sensor = engine
            .create_collider(
                ColliderDesc::cuboid(1.0, 1.0, 0.25)
                    .sensor(true)
                    .active_events(true),
                Some(sensor_body),
            )
            .unwrap();
        let mover = engine.create_body(
            BodyDesc::kinematic_position_based(BodyTag::Static)
                .with_translation(Vec3::new(0.0, 0.0, 3.0)),
        );
        let ball = engine
            .create_collider(ColliderDesc::ball(0.5), Some(mover))
            .unwrap();

        assert!(step(&mut engine, 1).is_empty());

        engine
            .set_next_kinematic_translation(mover, Vec3::zero())
            .unwrap();
        // Overlaps are detected at the start of the step after the move
        let mut events = step(&mut engine, 2);
        assert_eq!(events, vec![CollisionEvent {
            collider1: sensor,
            collider2: ball,
            started: true,
        }]);
        // Sensors never push
        assert_eq!(engine.translation(mover).unwrap(), Vec3::zero());

        assert!(step(&mut engine, 3).is_empty());

        engine
            .set_next_kinematic_translation(mover, Vec3::new(0.0, 0.0, -3.0))
            .unwrap();
        events = step(&mut engine, 2);
        assert_eq!(events.len(), 1);
        assert!(!events[0].started);
    }

    #[test]
    fn character_slides_and_grounds() {
        let mut engine = RapierEngine::default();
        floor(&mut engine);
        let wall_body = engine.create_body(
            BodyDesc::fixed(BodyTag::Static).with_translation(Vec3::new(2.0, 2.0, 0.0)),
        );
        engine
            .create_collider(ColliderDesc::cuboid(0.5, 2.0, 5.0), Some(wall_body))
            .unwrap();
        let player = engine.create_body(
            BodyDesc::kinematic_position_based(BodyTag::Static)
                .with_translation(Vec3::new(0.0, 0.5 + CHARACTER_OFFSET, 0.0)),
        );
        let collider = engine
            .create_collider(
                ColliderDesc::capsule(0.4, 0.5).translation(Vec3::unit_y() * 0.9),
                Some(player),
            )
            .unwrap();

        let fall = engine
            .move_character(collider, Vec3::new(0.0, -0.2, 0.0))
            .unwrap();
        assert!(fall.grounded);
        assert!(fall.translation.y > -0.05, "sank by {:?}", fall.translation);

        let blocked = engine
            .move_character(collider, Vec3::new(1.5, 0.0, 1.0))
            .unwrap();
        assert!(blocked.translation.x < 1.0);
        assert!(blocked.translation.z > 0.5);
    }

    #[test]
    fn character_passes_masked_walls() {
        let mut engine = RapierEngine::default();
        let wall_body = engine.create_body(
            BodyDesc::fixed(BodyTag::Static).with_translation(Vec3::new(2.0, 0.0, 0.0)),
        );
        let wall = engine
            .create_collider(ColliderDesc::cuboid(0.5, 2.0, 5.0), Some(wall_body))
            .unwrap();
        let player = engine.create_body(BodyDesc::kinematic_position_based(BodyTag::Static));
        let collider = engine
            .create_collider(
                ColliderDesc::capsule(0.4, 0.5).groups(CollisionGroups::PORTAL_TRAVELLING),
                Some(player),
            )
            .unwrap();

        let blocked = engine
            .move_character(collider, Vec3::new(2.0, 0.0, 0.0))
            .unwrap();
        assert!(blocked.translation.x < 1.5);

        engine
            .set_collision_groups(wall, CollisionGroups::PORTAL_ATTACHED)
            .unwrap();
        let through = engine
            .move_character(collider, Vec3::new(2.0, 0.0, 0.0))
            .unwrap();
        assert!((through.translation.x - 2.0).abs() < 1e-3);
    }

    #[test]
    fn non_finite_bodies_are_fatal() {
        let mut engine = RapierEngine::default();
        let body = engine.create_body(BodyDesc::dynamic(BodyTag::Static));
        engine
            .set_linvel(body, Vec3::new(f32::NAN, 0.0, 0.0))
            .unwrap();
        assert!(matches!(
            engine.step(0.1, &mut Vec::new()),
            Err(PhysicsError::NonFiniteBody { .. })
        ));
    }

    #[test]
    fn unknown_handles_are_errors() {
        let mut engine = RapierEngine::default();
        assert_eq!(
            engine.translation(BodyHandle(3)),
            Err(PhysicsError::InvalidBody(BodyHandle(3)))
        );
        assert_eq!(
            engine.create_collider(ColliderDesc::ball(1.0), Some(BodyHandle(0))),
            Err(PhysicsError::InvalidBody(BodyHandle(0)))
        );
        assert!(engine.collider_tag(ColliderHandle(0)).is_none());
    }
}
