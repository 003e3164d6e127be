use super::{
    ClearFlags, DepthRange, FullscreenPass, PolygonOffset, PortalDraw, PortalPassKind,
    RenderBackend, RenderError, ScenePass, Silhouette, StencilState,
};
use common::portal::PortalId;
use hashbrown::HashMap;
use tracing::trace;

/// A command as issued to the backend.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Clear(ClearFlags),
    StencilTest(bool),
    Stencil(StencilState),
    PolygonOffset(Option<PolygonOffset>),
    DepthRange(DepthRange),
    Scene {
        level: u8,
        branch: Vec<PortalId>,
        objects: usize,
    },
    Portal {
        portal: PortalId,
        kind: PortalPassKind,
        branch: Vec<PortalId>,
        silhouette: Silhouette,
    },
    Fullscreen(FullscreenPass),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderCounters {
    pub frames: u32,
    /// Scene passes, indexed by recursion level.
    pub scene_passes: Vec<u32>,
    pub carves: u32,
    pub restores: u32,
    pub opaque_portals: u32,
    pub stencil_increments: u32,
    pub stencil_decrements: u32,
    /// Stencil regions touched by depth reset passes.
    pub depth_resets: u32,
    /// Scene passes whose stencil test rejects the very region they were
    /// issued for.
    pub stencil_mismatches: u32,
}

impl RenderCounters {
    pub fn scene_passes_at(&self, level: u8) -> u32 {
        self.scene_passes.get(level as usize).copied().unwrap_or(0)
    }

    /// Scene passes drawn through at least one portal.
    pub fn recursive_passes(&self) -> u32 { self.scene_passes.iter().skip(1).sum() }

    pub fn deepest_level(&self) -> Option<u8> {
        self.scene_passes
            .iter()
            .rposition(|n| *n > 0)
            .map(|level| level as u8)
    }
}

/// Backend that draws nothing. It keeps the command stream and simulates
/// the stencil buffer, one value per portal branch (the screen region seen
/// through that chain of portals).
pub struct RecordingBackend {
    record_commands: bool,
    commands: Vec<Command>,
    counters: RenderCounters,
    stencil_test: bool,
    stencil: StencilState,
    regions: HashMap<Vec<PortalId>, u8>,
}

impl Default for RecordingBackend {
    fn default() -> Self { Self::new() }
}

impl RecordingBackend {
    pub fn new() -> Self {
        let mut regions = HashMap::new();
        regions.insert(Vec::new(), 0);
        Self {
            record_commands: true,
            commands: Vec::new(),
            counters: RenderCounters::default(),
            stencil_test: false,
            stencil: StencilState::equal(0),
            regions,
        }
    }

    /// Keep the counters and stencil simulation but drop the command
    /// stream, for long headless runs.
    pub fn counting_only() -> Self {
        Self {
            record_commands: false,
            ..Self::new()
        }
    }

    pub fn commands(&self) -> &[Command] { &self.commands }

    pub fn take_commands(&mut self) -> Vec<Command> { std::mem::take(&mut self.commands) }

    pub fn counters(&self) -> &RenderCounters { &self.counters }

    pub fn reset_counters(&mut self) { self.counters = RenderCounters::default(); }

    /// Stencil value of the screen region seen through `branch`.
    pub fn stencil_value(&self, branch: &[PortalId]) -> u8 {
        // Regions never marked share the value of the region around them
        (0..=branch.len())
            .rev()
            .find_map(|len| self.regions.get(&branch[..len]))
            .copied()
            .unwrap_or(0)
    }

    /// Every region is back to the cleared value.
    pub fn stencil_balanced(&self) -> bool { self.regions.values().all(|v| *v == 0) }

    fn record(&mut self, command: Command) {
        if self.record_commands {
            self.commands.push(command);
        }
    }

    /// Run the stencil test and update for a draw covering `branch`. The
    /// draw covers every region nested inside it too, each of which is
    /// tested against its own value. Returns whether the test passed for
    /// `branch` itself.
    fn touch(&mut self, branch: &[PortalId]) -> bool {
        if !self.stencil_test {
            return true;
        }
        let passed = self.touch_region(branch, true);
        let nested: Vec<_> = self
            .regions
            .keys()
            .filter(|key| key.len() > branch.len() && key.starts_with(branch))
            .cloned()
            .collect();
        for key in nested {
            self.touch_region(&key, false);
        }
        passed
    }

    /// Stencil test and update for exactly one region.
    fn touch_region(&mut self, branch: &[PortalId], count: bool) -> bool {
        if !self.stencil_test {
            return true;
        }
        let value = self.stencil_value(branch);
        let passed = self.stencil.test(value);
        let op = if passed {
            self.stencil.pass
        } else {
            self.stencil.fail
        };
        let new = op.apply(value);
        if count && new > value {
            self.counters.stencil_increments += 1;
        } else if count && new < value {
            self.counters.stencil_decrements += 1;
        }
        if new != value || self.regions.contains_key(branch) {
            self.regions.insert(branch.to_vec(), new);
        }
        passed
    }
}

impl RenderBackend for RecordingBackend {
    fn clear(&mut self, flags: ClearFlags) -> Result<(), RenderError> {
        if flags.stencil {
            self.regions.clear();
            self.regions.insert(Vec::new(), 0);
            self.counters.frames += 1;
        }
        self.record(Command::Clear(flags));
        Ok(())
    }

    fn set_stencil_test(&mut self, enabled: bool) -> Result<(), RenderError> {
        self.stencil_test = enabled;
        self.record(Command::StencilTest(enabled));
        Ok(())
    }

    fn set_stencil(&mut self, state: StencilState) -> Result<(), RenderError> {
        self.stencil = state;
        self.record(Command::Stencil(state));
        Ok(())
    }

    fn set_polygon_offset(&mut self, offset: Option<PolygonOffset>) -> Result<(), RenderError> {
        self.record(Command::PolygonOffset(offset));
        Ok(())
    }

    fn set_depth_range(&mut self, range: DepthRange) -> Result<(), RenderError> {
        self.record(Command::DepthRange(range));
        Ok(())
    }

    fn draw_scene(&mut self, pass: &ScenePass) -> Result<(), RenderError> {
        let level = pass.level as usize;
        if self.counters.scene_passes.len() <= level {
            self.counters.scene_passes.resize(level + 1, 0);
        }
        self.counters.scene_passes[level] += 1;
        if !self.touch(pass.branch) {
            self.counters.stencil_mismatches += 1;
        }
        trace!(level, branch = ?pass.branch, "Scene pass");
        self.record(Command::Scene {
            level: pass.level,
            branch: pass.branch.to_vec(),
            objects: pass.objects.len(),
        });
        Ok(())
    }

    fn draw_portal(&mut self, draw: &PortalDraw) -> Result<(), RenderError> {
        match draw.kind {
            PortalPassKind::Carve => self.counters.carves += 1,
            PortalPassKind::Restore => self.counters.restores += 1,
            PortalPassKind::Opaque => self.counters.opaque_portals += 1,
        }
        self.touch(draw.branch);
        self.record(Command::Portal {
            portal: draw.portal,
            kind: draw.kind,
            branch: draw.branch.to_vec(),
            silhouette: draw.silhouette,
        });
        Ok(())
    }

    fn draw_fullscreen(&mut self, pass: FullscreenPass) -> Result<(), RenderError> {
        let mut branches: Vec<_> = self.regions.keys().cloned().collect();
        branches.sort();
        for branch in branches {
            if self.touch_region(&branch, true) {
                self.counters.depth_resets += 1;
            }
        }
        self.record(Command::Fullscreen(pass));
        Ok(())
    }
}
