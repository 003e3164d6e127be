//! Fixed-timestep scheduling of the physics engine.
//!
//! Rendering runs at whatever rate the display allows while the simulation
//! always advances in steps of exactly one tick. Leftover frame time is
//! carried over in an accumulator and exposed as an interpolation factor.

use super::{BodyTag, ColliderHandle, CollisionEvent, PhysicsEngine, PhysicsError};
use crate::consts::{DEFAULT_TICK_RATE, MAX_FRAME_TIME};
use tracing::{debug, trace};

// Absorbs rounding of frame deltas that sum to a whole number of ticks
const ACCUMULATOR_EPSILON: f64 = 1e-6;

/// A collision start or stop, seen from one of the two colliders involved.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColliderEvent {
    /// The collider whose owner is listening.
    pub collider: ColliderHandle,
    pub other: ColliderHandle,
    /// Tag of the body owning `collider`.
    pub tag: BodyTag,
    pub started: bool,
}

/// Game logic driven at the fixed physics rate.
pub trait TickHandler<E: PhysicsEngine> {
    type Error: From<PhysicsError>;

    /// Runs before every engine step, this is where forces and kinematic
    /// targets are set.
    fn pre_step(&mut self, engine: &mut E, dt: f32) -> Result<(), Self::Error>;

    /// Called once per listening collider for every collision event of the
    /// step.
    fn on_collision(&mut self, _engine: &mut E, _event: ColliderEvent) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Runs after the step's collision events were dispatched.
    fn post_step(&mut self, _engine: &mut E, _dt: f32) -> Result<(), Self::Error> { Ok(()) }
}

impl<E, F> TickHandler<E> for F
where
    E: PhysicsEngine,
    F: FnMut(&mut E, f32) -> Result<(), PhysicsError>,
{
    type Error = PhysicsError;

    fn pre_step(&mut self, engine: &mut E, dt: f32) -> Result<(), PhysicsError> { self(engine, dt) }
}

pub struct PhysicsWorld<E> {
    engine: E,
    tick_rate: u32,
    dt: f64,
    accumulator: f64,
    paused: bool,
    events: Vec<CollisionEvent>,
    steps: u64,
}

impl<E: PhysicsEngine> PhysicsWorld<E> {
    pub fn new(engine: E) -> Self { Self::with_tick_rate(engine, DEFAULT_TICK_RATE) }

    pub fn with_tick_rate(engine: E, tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            engine,
            tick_rate,
            dt: 1.0 / tick_rate as f64,
            accumulator: 0.0,
            paused: false,
            events: Vec::new(),
            steps: 0,
        }
    }

    pub fn engine(&self) -> &E { &self.engine }

    pub fn engine_mut(&mut self) -> &mut E { &mut self.engine }

    pub fn tick_rate(&self) -> u32 { self.tick_rate }

    /// Length of one physics step in seconds.
    pub fn tick_duration(&self) -> f32 { self.dt as f32 }

    /// Simulation time not yet consumed by a step, always less than one
    /// tick after [`PhysicsWorld::advance`] returns.
    pub fn accumulator(&self) -> f32 { self.accumulator as f32 }

    /// Total number of steps run so far.
    pub fn steps(&self) -> u64 { self.steps }

    pub fn set_paused(&mut self, paused: bool) { self.paused = paused; }

    pub fn is_paused(&self) -> bool { self.paused }

    /// How far the render frame lies between the last two physics steps.
    pub fn interpolation_alpha(&self) -> f32 {
        if self.steps == 0 {
            0.0
        } else {
            (self.accumulator / self.dt) as f32
        }
    }

    /// Consume `frame_dt` seconds of wall clock time, running as many fixed
    /// steps as fit. Returns the number of steps run.
    pub fn advance<H: TickHandler<E>>(
        &mut self,
        frame_dt: f32,
        handler: &mut H,
    ) -> Result<u32, H::Error> {
        if self.paused {
            return Ok(0);
        }

        let frame_dt = if frame_dt.is_finite() {
            frame_dt.clamp(0.0, MAX_FRAME_TIME)
        } else {
            0.0
        };
        if frame_dt >= MAX_FRAME_TIME {
            debug!(?frame_dt, "Long frame, dropping simulation time");
        }
        self.accumulator += frame_dt as f64;

        let mut steps = 0;
        while self.accumulator >= self.dt - ACCUMULATOR_EPSILON {
            self.step(handler)?;
            self.accumulator = (self.accumulator - self.dt).max(0.0);
            steps += 1;
        }
        Ok(steps)
    }

    /// Run exactly one step regardless of the accumulator.
    pub fn step<H: TickHandler<E>>(&mut self, handler: &mut H) -> Result<(), H::Error> {
        let dt = self.dt as f32;
        handler.pre_step(&mut self.engine, dt)?;

        self.events.clear();
        self.engine.step(dt, &mut self.events)?;
        self.steps += 1;

        for event in self.events.drain(..) {
            trace!(?event, "Collision event");
            for (collider, other) in [
                (event.collider1, event.collider2),
                (event.collider2, event.collider1),
            ] {
                if let Some(tag) = self.engine.collider_tag(collider).filter(BodyTag::listens) {
                    handler.on_collision(&mut self.engine, ColliderEvent {
                        collider,
                        other,
                        tag,
                        started: event.started,
                    })?;
                }
            }
        }

        handler.post_step(&mut self.engine, dt)
    }
}
