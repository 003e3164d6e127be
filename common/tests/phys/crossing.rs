use crate::utils::{PortalRig, DT, EPSILON, TICK_RATE};
use aperture_common::{
    phys::{
        BodyDesc, BodyTag, ColliderDesc, ColliderEvent, CollisionGroups, PhysicsEngine,
        PhysicsWorld, RapierEngine,
    },
    portal::{PortalId, PortalPose, Portalable},
};
use approx::assert_relative_eq;
use specs::Entity;
use std::error::Error;
use vek::*;

fn world() -> PhysicsWorld<RapierEngine> {
    PhysicsWorld::with_tick_rate(RapierEngine::default(), TICK_RATE)
}

#[test]
fn straight_through_warps_once() -> Result<(), Box<dyn Error>> {
    let mut world = world();
    let mut rig = PortalRig::new();
    let (_, b) = rig.linked_pair(world.engine_mut());
    // Moves 0.1 per step, passing z = 0.05 and then z = -0.05
    let ball = rig.add_traveller(
        world.engine_mut(),
        Vec3::new(0.0, 0.0, 1.05),
        0.25,
        Vec3::new(0.0, 0.0, -0.1 / DT),
    );

    let mut crossed_on = None;
    for i in 0..30 {
        world.advance(DT, &mut rig)?;
        if crossed_on.is_none() && !rig.traveller(ball).warps.is_empty() {
            crossed_on = Some(i);
        }
    }

    let traveller = rig.traveller(ball);
    assert_eq!(traveller.warps.len(), 1);
    assert_eq!(rig.warps_per_step.iter().sum::<u32>(), 1);
    assert_eq!(crossed_on, Some(10));

    // Arrives 0.05 in front of B, which faces -Z
    let (pos, _, delta) = traveller.warps[0];
    assert_relative_eq!(pos, b.pos + Vec3::new(0.0, 0.0, -0.05), epsilon = EPSILON);
    assert_relative_eq!(delta * -Vec3::unit_z(), b.normal(), epsilon = EPSILON);
    // Still leaving B along its normal
    assert!(traveller.vel.dot(b.normal()) > 0.0);
    Ok(())
}

#[test]
fn exit_restores_groups() -> Result<(), Box<dyn Error>> {
    let mut world = world();
    let mut rig = PortalRig::new();
    rig.linked_pair(world.engine_mut());
    let ball = rig.add_traveller(
        world.engine_mut(),
        Vec3::new(0.0, 0.0, 1.05),
        0.25,
        Vec3::new(0.0, 0.0, -0.1 / DT),
    );
    let collider = rig.traveller(ball).collider();

    // Inside the sensor but not yet through
    for _ in 0..7 {
        world.advance(DT, &mut rig)?;
    }
    assert!(rig.traveller(ball).traveller().is_inside(PortalId(0)));
    assert_eq!(
        world.engine().collision_groups(collider)?,
        CollisionGroups::PORTAL_TRAVELLING
    );

    // Through, warped and clear of B's sensor
    for _ in 0..20 {
        world.advance(DT, &mut rig)?;
    }
    assert!(!rig.traveller(ball).traveller().is_inside_any());
    assert_eq!(
        world.engine().collision_groups(collider)?,
        CollisionGroups::DEFAULT
    );
    Ok(())
}

#[test]
fn frame_contact_is_not_an_entry() -> Result<(), Box<dyn Error>> {
    let mut world = world();
    let mut rig = PortalRig::new();
    rig.linked_pair(world.engine_mut());
    // Touching the right hand frame piece behind the opening, never the sensor
    let ball = rig.add_traveller(
        world.engine_mut(),
        Vec3::new(1.15, 0.0, -0.3),
        0.1,
        Vec3::new(0.0, 0.0, -0.3),
    );

    for _ in 0..10 {
        world.advance(DT, &mut rig)?;
    }

    assert!(!rig.traveller(ball).traveller().is_inside_any());
    assert!(rig.portals.iter().all(|portal| portal.travellers().is_empty()));
    assert!(rig.traveller(ball).warps.is_empty());
    Ok(())
}

#[test]
fn unlinked_portal_is_opaque_to_travellers() -> Result<(), Box<dyn Error>> {
    let mut world = world();
    let mut rig = PortalRig::new();
    rig.linked_pair(world.engine_mut());
    rig.portals.unlink(PortalId(0));
    let ball = rig.add_traveller(
        world.engine_mut(),
        Vec3::new(0.0, 0.0, 1.05),
        0.25,
        Vec3::new(0.0, 0.0, -0.1 / DT),
    );

    for _ in 0..15 {
        world.advance(DT, &mut rig)?;
    }

    assert!(rig.traveller(ball).warps.is_empty());
    assert!(!rig.traveller(ball).traveller().is_inside_any());
    Ok(())
}

#[test]
fn repeated_enter_and_stray_exit() -> Result<(), Box<dyn Error>> {
    let mut world = world();
    let mut rig = PortalRig::new();
    rig.linked_pair(world.engine_mut());
    let ball = rig.add_traveller(world.engine_mut(), Vec3::new(0.0, 0.0, 0.1), 0.25, Vec3::zero());

    let engine = world.engine_mut();
    let traveller = rig.travellers.0.get_mut(&ball).ok_or("no traveller")?;
    let portal = rig.portals.get_mut(PortalId(0)).ok_or("no portal")?;

    assert!(portal.on_enter(engine, ball, traveller)?);
    assert!(!portal.on_enter(engine, ball, traveller)?);
    assert_eq!(portal.travellers(), &[ball]);
    assert_eq!(traveller.traveller().count(), 1);

    assert!(portal.on_exit(engine, ball, traveller)?);
    assert!(!portal.on_exit(engine, ball, traveller)?);
    assert!(portal.travellers().is_empty());
    assert!(!traveller.traveller().is_inside_any());
    assert_eq!(
        engine.collision_groups(traveller.collider())?,
        CollisionGroups::DEFAULT
    );
    Ok(())
}

#[test]
fn clip_planes_follow_moved_portals() -> Result<(), Box<dyn Error>> {
    let mut world = world();
    let mut rig = PortalRig::new();
    rig.linked_pair(world.engine_mut());
    let ball = rig.add_traveller(world.engine_mut(), Vec3::new(0.0, 0.0, 0.1), 0.25, Vec3::zero());

    let engine = world.engine_mut();
    {
        let traveller = rig.travellers.0.get_mut(&ball).ok_or("no traveller")?;
        let portal = rig.portals.get_mut(PortalId(0)).ok_or("no portal")?;
        assert!(portal.on_enter(engine, ball, traveller)?);
    }
    let entered_plane = rig.portals.get(PortalId(0)).ok_or("no portal")?.clip_plane();

    // Both ends move while the ball is still inside
    rig.portals.set_pose(
        engine,
        PortalId(0),
        PortalPose::new(Vec3::new(0.0, 1.0, -2.0), Quaternion::rotation_y(0.5)),
    )?;
    rig.portals.set_pose(
        engine,
        PortalId(1),
        PortalPose::new(Vec3::new(8.0, 0.0, 3.0), Quaternion::rotation_y(2.0)),
    )?;

    let portal = rig.portals.get(PortalId(0)).ok_or("no portal")?;
    let partner = rig.portals.get(PortalId(1)).ok_or("no partner")?;
    let traveller = rig.traveller(ball).traveller();
    let primary = rig.portals.primary_clip_planes(traveller).collect::<Vec<_>>();
    assert_eq!(primary, vec![portal.clip_plane()]);
    assert_ne!(primary[0], entered_plane);

    let membership = traveller.memberships()[0];
    assert_eq!(
        rig.portals.duplicate_clip_plane(&membership),
        Some(partner.clip_plane())
    );
    Ok(())
}

/// Feed a sensor overlap change straight to the portals.
fn sensor_event(
    rig: &mut PortalRig,
    engine: &mut RapierEngine,
    portal: PortalId,
    traveller: Entity,
    started: bool,
) -> Result<(), Box<dyn Error>> {
    let event = ColliderEvent {
        collider: rig.portals.get(portal).ok_or("no portal")?.colliders().sensor,
        other: rig.traveller(traveller).collider,
        tag: BodyTag::PortalSensor(portal),
        started,
    };
    rig.portals
        .handle_collision(engine, event, &mut rig.travellers)?;
    Ok(())
}

#[test]
fn shared_wall_stays_open_while_any_portal_is_used() -> Result<(), Box<dyn Error>> {
    let mut world = world();
    let mut rig = PortalRig::new();
    let engine = world.engine_mut();

    // Two linked pairs, the first portal of each mounted on the same wall
    let wall_body = engine.create_body(BodyDesc::fixed(BodyTag::Static));
    let wall = engine.create_collider(ColliderDesc::cuboid(10.0, 3.0, 0.05), Some(wall_body))?;
    let mut ids = Vec::new();
    for x in [-3.0, 3.0, 20.0, 26.0] {
        let pose = PortalPose::new(Vec3::new(x, 0.0, 0.0), Quaternion::identity());
        ids.push(rig.portals.add(engine, 2.0, 3.0, pose)?);
    }
    rig.portals.link(ids[0], ids[2]);
    rig.portals.link(ids[1], ids[3]);
    rig.portals.set_attached_object(engine, ids[0], Some(wall))?;
    rig.portals.set_attached_object(engine, ids[1], Some(wall))?;

    let first = rig.add_traveller(engine, Vec3::new(-3.0, 0.0, 0.1), 0.25, Vec3::zero());
    let second = rig.add_traveller(engine, Vec3::new(3.0, 0.0, 0.1), 0.25, Vec3::zero());

    sensor_event(&mut rig, engine, ids[0], first, true)?;
    sensor_event(&mut rig, engine, ids[1], second, true)?;
    assert_eq!(
        engine.collision_groups(wall)?,
        CollisionGroups::PORTAL_ATTACHED
    );

    // The second portal is still in use
    sensor_event(&mut rig, engine, ids[0], first, false)?;
    assert!(rig.portals.attached_in_use(wall));
    assert_eq!(
        engine.collision_groups(wall)?,
        CollisionGroups::PORTAL_ATTACHED
    );

    sensor_event(&mut rig, engine, ids[1], second, false)?;
    assert_eq!(engine.collision_groups(wall)?, CollisionGroups::DEFAULT);

    // Moving a portal off a wall that is still in use keeps it open
    sensor_event(&mut rig, engine, ids[1], second, true)?;
    rig.portals.set_attached_object(engine, ids[0], None)?;
    assert_eq!(
        engine.collision_groups(wall)?,
        CollisionGroups::PORTAL_ATTACHED
    );
    Ok(())
}
