use crate::{
    error::Error,
    render::RenderBackend,
    scene::{Camera, PortalRenderer, RenderStats, Scene},
    settings::{GameplaySettings, Settings},
};
use common::{comp::PlayerInputs, level::LevelData, State};
use tracing::{debug, info};
use vek::*;

/// Input as delivered by the window, before it becomes player intent.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Event {
    /// Movement axes, each in `[-1, 1]`.
    Move { forward: f32, lateral: f32 },
    /// Raw mouse motion.
    Look { dx: f32, dy: f32 },
    TogglePause,
    Resize(Vec2<u16>),
}

/// What a frame did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub steps: u32,
    pub render: RenderStats,
}

/// Playing a level: the simulation, its view and the player's intent.
pub struct SessionState {
    state: State,
    scene: Scene,
    camera: Camera,
    renderer: PortalRenderer,
    gameplay: GameplaySettings,
    inputs: PlayerInputs,
}

impl SessionState {
    pub fn new(level: &LevelData, settings: &Settings) -> Result<Self, Error> {
        let engine = common::phys::RapierEngine::default();
        let state = State::from_level(engine, level, settings.physics.tick_rate)?;
        let graphics = &settings.graphics;

        let mut camera = Camera::new(1.0, graphics.fov as f32);
        let mut renderer = PortalRenderer::new(graphics.max_recursion, graphics.frustum_culling);
        renderer.resize(Vec2::from(graphics.resolution), &mut camera);

        info!(
            max_recursion = renderer.max_recursion(),
            tick_rate = settings.physics.tick_rate,
            "Session started"
        );
        Ok(Self {
            scene: Scene::new(level),
            state,
            camera,
            renderer,
            gameplay: settings.gameplay.clone(),
            inputs: PlayerInputs::default(),
        })
    }

    pub fn state(&self) -> &State { &self.state }

    pub fn state_mut(&mut self) -> &mut State { &mut self.state }

    pub fn scene(&self) -> &Scene { &self.scene }

    pub fn camera(&self) -> &Camera { &self.camera }

    pub fn is_paused(&self) -> bool { self.state.is_paused() }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::TogglePause => {
                let paused = !self.state.is_paused();
                self.state.set_paused(paused);
                // Nothing held over from before the pause
                self.inputs = PlayerInputs::default();
                debug!(?paused, "Pause toggled");
            },
            Event::Resize(resolution) => self.renderer.resize(resolution, &mut self.camera),
            // Intent is not collected while paused
            _ if self.state.is_paused() => {},
            Event::Move { forward, lateral } => {
                self.inputs.forward = forward;
                self.inputs.lateral = lateral;
            },
            Event::Look { dx, dy } => {
                let (yaw, pitch) = self.gameplay.look_deltas(dx, dy);
                self.inputs.yaw_delta += yaw;
                self.inputs.pitch_delta += pitch;
            },
        }
    }

    /// Run one frame: simulate `dt` seconds, then draw.
    pub fn tick<B: RenderBackend>(
        &mut self,
        dt: f32,
        backend: &mut B,
    ) -> Result<FrameReport, Error> {
        let steps = self.state.tick(dt, &self.inputs)?;
        // Look is consumed once per frame, movement holds until changed
        self.inputs.yaw_delta = 0.0;
        self.inputs.pitch_delta = 0.0;

        self.scene.maintain(&self.state);
        if let Some((pos, ori)) = self.state.player_view() {
            self.camera.set_pose(pos, ori);
        }
        let render = self
            .renderer
            .render(backend, &self.scene, self.state.portals(), &self.camera)?;

        Ok(FrameReport { steps, render })
    }
}
