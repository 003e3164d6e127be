use crate::utils::{DT, TICK_RATE};
use aperture_common::phys::{PhysicsError, PhysicsWorld, RapierEngine, TickHandler};
use std::error::Error;

#[derive(Default)]
struct Counter {
    pre: u32,
    post: u32,
}

impl TickHandler<RapierEngine> for Counter {
    type Error = PhysicsError;

    fn pre_step(&mut self, _: &mut RapierEngine, _: f32) -> Result<(), PhysicsError> {
        self.pre += 1;
        Ok(())
    }

    fn post_step(&mut self, _: &mut RapierEngine, _: f32) -> Result<(), PhysicsError> {
        self.post += 1;
        Ok(())
    }
}

fn run(frames: &[f32]) -> Result<(u32, u64), PhysicsError> {
    let mut world = PhysicsWorld::with_tick_rate(RapierEngine::default(), TICK_RATE);
    let mut counter = Counter::default();
    let mut reported = 0;
    for frame in frames {
        reported += world.advance(*frame, &mut counter)?;
    }
    assert_eq!(counter.pre, counter.post);
    assert_eq!(counter.pre, reported);
    Ok((reported, world.steps()))
}

#[test]
fn step_count_ignores_frame_chunking() -> Result<(), Box<dyn Error>> {
    const TICKS: usize = 7;

    let whole = [DT * TICKS as f32];
    let halves = vec![DT * 0.5; TICKS * 2];
    let uneven: Vec<f32> = (0..TICKS).flat_map(|_| [DT * 0.3, DT * 0.45, DT * 0.25]).collect();
    let tiny = vec![DT / 16.0; TICKS * 16];

    for frames in [&whole[..], &halves[..], &uneven[..], &tiny[..]] {
        let (steps, total) = run(frames)?;
        assert_eq!(steps, TICKS as u32);
        assert_eq!(total, TICKS as u64);
    }
    Ok(())
}

#[test]
fn long_frames_are_capped() -> Result<(), Box<dyn Error>> {
    // A one second hitch only simulates a quarter of a second
    let (steps, _) = run(&[1.0])?;
    assert_eq!(steps, 7);
    Ok(())
}

#[test]
fn interpolation_alpha_tracks_leftover_time() -> Result<(), Box<dyn Error>> {
    let mut world = PhysicsWorld::with_tick_rate(RapierEngine::default(), TICK_RATE);
    let mut counter = Counter::default();
    assert_eq!(world.interpolation_alpha(), 0.0);

    world.advance(DT * 1.5, &mut counter)?;
    approx::assert_relative_eq!(world.interpolation_alpha(), 0.5, epsilon = 1e-4);
    world.advance(DT * 0.25, &mut counter)?;
    approx::assert_relative_eq!(world.interpolation_alpha(), 0.75, epsilon = 1e-4);
    assert!(world.interpolation_alpha() < 1.0);
    Ok(())
}
