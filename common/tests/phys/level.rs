use crate::utils::{facing_room, setup, DT, TICK_RATE};
use aperture_common::{
    comp::{Interpolated, PhysicsBody, Player, PlayerInputs, Pos, PortalTraveller, Vel},
    level::{LevelData, LevelError},
    phys::{CollisionGroups, PhysicsEngine, RapierEngine},
    Error as CommonError, State,
};
use specs::{Entity, WorldExt};
use std::error::Error;
use vek::*;

/// A ball thrown at the back wall portal from 3 m away.
fn throw_ball(state: &mut State) -> Result<Entity, Box<dyn Error>> {
    let ball = state.spawn_interactable(Vec3::new(0.0, 2.0, -3.0), Quaternion::identity(), 0.5)?;
    let body = state
        .ecs()
        .read_storage::<PhysicsBody>()
        .get(ball)
        .copied()
        .ok_or("ball has no body")?;
    state
        .physics_mut()
        .engine_mut()
        .set_linvel(body.body, Vec3::new(0.0, 0.0, -6.0))?;
    Ok(ball)
}

fn tick(state: &mut State, ticks: usize) -> Result<(), Box<dyn Error>> {
    for _ in 0..ticks {
        state.tick(DT, &PlayerInputs::default())?;
    }
    Ok(())
}

#[test]
fn ball_comes_out_of_the_facing_portal() -> Result<(), Box<dyn Error>> {
    let mut state = setup();
    let ball = throw_ball(&mut state)?;

    tick(&mut state, 15)?;

    let pos = state.ecs().read_storage::<Pos>().get(ball).ok_or("no pos")?.0;
    let vel = state.ecs().read_storage::<Vel>().get(ball).ok_or("no vel")?.0;
    assert!(pos.z > 0.0 && pos.z < 4.95, "ball at {:?}", pos);
    assert!(pos.x.abs() < 1e-3);
    // Still flying away from the front wall
    assert!(vel.z < 0.0);

    // Clear of both sensors, everything collides normally again
    let travellers = state.ecs().read_storage::<PortalTraveller>();
    assert!(!travellers.get(ball).ok_or("no traveller")?.is_inside_any());
    for portal in state.portals().iter() {
        assert!(portal.travellers().is_empty());
        let wall = portal.attached_object().ok_or("portal not attached")?;
        assert_eq!(
            state.engine().collision_groups(wall)?,
            CollisionGroups::DEFAULT
        );
    }
    Ok(())
}

#[test]
fn render_pose_is_continuous_across_a_warp() -> Result<(), Box<dyn Error>> {
    let mut state = setup();
    let ball = throw_ball(&mut state)?;

    // The tenth step carries the ball through the back portal
    tick(&mut state, 10)?;
    let pos = state.ecs().read_storage::<Pos>().get(ball).ok_or("no pos")?.0;
    assert!(pos.z > 4.0, "not warped yet: {:?}", pos);

    // Half way to the next step the blend stays on the arrival side
    // instead of sweeping across the room
    assert_eq!(state.tick(DT * 0.5, &PlayerInputs::default())?, 0);
    let render = *state
        .ecs()
        .read_storage::<Interpolated>()
        .get(ball)
        .ok_or("no render pose")?;
    assert!(render.pos.z > 4.5, "render pose at {:?}", render.pos);
    assert!(render.pos.map(f32::is_finite).reduce_and());
    Ok(())
}

#[test]
fn player_lands_on_the_floor() -> Result<(), Box<dyn Error>> {
    let mut state = setup();
    tick(&mut state, TICK_RATE as usize)?;

    let player = state.player();
    let pos = state.ecs().read_storage::<Pos>().get(player).ok_or("no pos")?.0;
    let grounded = state
        .ecs()
        .read_storage::<Player>()
        .get(player)
        .ok_or("no player")?
        .grounded;
    assert!(grounded);
    assert!(pos.y > 0.0 && pos.y < 0.2, "player at {:?}", pos);
    assert_eq!(state.tick_count(), TICK_RATE as u64);
    Ok(())
}

#[test]
fn paused_state_ignores_time_and_input() -> Result<(), Box<dyn Error>> {
    let mut state = setup();
    state.set_paused(true);
    let inputs = PlayerInputs {
        forward: 1.0,
        yaw_delta: 1.0,
        ..Default::default()
    };

    assert_eq!(state.tick(0.2, &inputs)?, 0);
    assert_eq!(state.tick_count(), 0);
    let player = state.player();
    assert_eq!(
        state.ecs().read_storage::<Player>().get(player).map(|p| p.yaw),
        Some(0.0)
    );
    Ok(())
}

#[test]
fn broken_levels_are_rejected_before_building() {
    let mut level = facing_room();
    level.portals.pop();
    let result = State::from_level(RapierEngine::default(), &level, TICK_RATE);
    assert!(matches!(
        result,
        Err(CommonError::Level(LevelError::UnpairedPortal { count: 1 }))
    ));

    let mut level: LevelData = facing_room();
    level.portals[0].object_id = Some("ceiling".to_string());
    assert!(matches!(
        State::from_level(RapierEngine::default(), &level, TICK_RATE),
        Err(CommonError::Level(LevelError::DanglingObjectId { .. }))
    ));
}

#[test]
fn bundled_level_builds() -> Result<(), Box<dyn Error>> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("assets/levels/default.ron");
    let level = LevelData::load(&path)?;
    let mut state = State::new(&level)?;
    assert_eq!(state.portals().len(), 4);
    assert!(state.portals().iter().all(|p| p.partner().is_some()));
    tick(&mut state, 10)?;
    Ok(())
}
