//! The seam between the portal renderer and whatever draws pixels.
//!
//! Commands are issued in order and a backend must apply each state change
//! before the next draw returns. Every draw carries everything it needs
//! (camera, layers, clip planes) so nothing is captured between frames.

pub mod error;
mod recording;

// Reexports
pub use self::{
    error::RenderError,
    recording::{Command, RecordingBackend, RenderCounters},
};

use crate::scene::{camera::Layers, ObjectDraw, PlaneDraw};
use common::{portal::PortalId, util::Plane};
use vek::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StencilFunc {
    Always,
    Equal,
    NotEqual,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StencilOp {
    Keep,
    Zero,
    Incr,
    Decr,
}

impl StencilOp {
    pub fn apply(self, value: u8) -> u8 {
        match self {
            StencilOp::Keep => value,
            StencilOp::Zero => 0,
            StencilOp::Incr => value.saturating_add(1),
            StencilOp::Decr => value.saturating_sub(1),
        }
    }
}

/// Stencil test and update, as one state block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StencilState {
    pub func: StencilFunc,
    pub reference: u8,
    pub mask: u8,
    /// Stencil test failed.
    pub fail: StencilOp,
    /// Stencil test passed, depth test failed.
    pub zfail: StencilOp,
    pub pass: StencilOp,
}

impl StencilState {
    /// Only draw where the stencil equals `reference`, leave it untouched.
    pub fn equal(reference: u8) -> Self {
        Self {
            func: StencilFunc::Equal,
            reference,
            mask: 0xff,
            fail: StencilOp::Keep,
            zfail: StencilOp::Keep,
            pass: StencilOp::Keep,
        }
    }

    pub fn with_pass(mut self, pass: StencilOp) -> Self {
        self.pass = pass;
        self
    }

    pub fn with_zfail(mut self, zfail: StencilOp) -> Self {
        self.zfail = zfail;
        self
    }

    pub fn test(&self, value: u8) -> bool {
        match self.func {
            StencilFunc::Always => true,
            StencilFunc::Equal => value & self.mask == self.reference & self.mask,
            StencilFunc::NotEqual => value & self.mask != self.reference & self.mask,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PolygonOffset {
    pub factor: f32,
    pub units: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DepthRange {
    pub near: f32,
    pub far: f32,
}

impl DepthRange {
    pub const FAR: Self = Self {
        near: 1.0,
        far: 1.0,
    };
    pub const FULL: Self = Self {
        near: 0.0,
        far: 1.0,
    };
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClearFlags {
    pub colour: bool,
    pub depth: bool,
    pub stencil: bool,
}

impl ClearFlags {
    pub const ALL: Self = Self {
        colour: true,
        depth: true,
        stencil: true,
    };
}

/// Camera matrices for one pass.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CameraView {
    pub view_mat: Mat4<f32>,
    pub proj_mat: Mat4<f32>,
    pub pos: Vec3<f32>,
}

/// One pass over the scene through a chain of portals.
pub struct ScenePass<'a> {
    pub camera: CameraView,
    pub layers: Layers,
    /// Recursion level, 0 for the viewer's own camera.
    pub level: u8,
    /// Portals this pass is seen through, outermost first.
    pub branch: &'a [PortalId],
    /// Applied to everything in the pass.
    pub clip_planes: &'a [Plane],
    pub planes: &'a [PlaneDraw],
    /// Each object also carries its own clip planes.
    pub objects: &'a [ObjectDraw],
}

/// Shape written to mark a portal opening.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Silhouette {
    Quad,
    /// Open backed box behind the surface, used when the near plane would
    /// otherwise cut the quad.
    Box { depth: f32 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PortalPassKind {
    /// Mark the opening in the stencil buffer, colour writes off.
    Carve,
    /// Undo a carve. Writes the surface depth so later draws at the outer
    /// level are occluded by it.
    Restore,
    /// Unlinked portal, drawn as a flat surface.
    Opaque,
}

pub struct PortalDraw<'a> {
    pub portal: PortalId,
    pub kind: PortalPassKind,
    /// Branch including this portal, except for opaque draws.
    pub branch: &'a [PortalId],
    pub camera: CameraView,
    pub transform: Mat4<f32>,
    pub width: f32,
    pub height: f32,
    pub silhouette: Silhouette,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FullscreenPass {
    /// Writes depth only, resetting it inside the stencil region.
    DepthReset,
}

pub trait RenderBackend {
    fn clear(&mut self, flags: ClearFlags) -> Result<(), RenderError>;

    fn set_stencil_test(&mut self, enabled: bool) -> Result<(), RenderError>;

    fn set_stencil(&mut self, state: StencilState) -> Result<(), RenderError>;

    fn set_polygon_offset(&mut self, offset: Option<PolygonOffset>) -> Result<(), RenderError>;

    fn set_depth_range(&mut self, range: DepthRange) -> Result<(), RenderError>;

    fn draw_scene(&mut self, pass: &ScenePass) -> Result<(), RenderError>;

    fn draw_portal(&mut self, draw: &PortalDraw) -> Result<(), RenderError>;

    fn draw_fullscreen(&mut self, pass: FullscreenPass) -> Result<(), RenderError>;
}
