//! Recursive portal rendering.
//!
//! Every level of recursion owns one stencil value: the scene seen through
//! `n` portals is drawn where the stencil equals `n`. A portal opening is
//! carved by incrementing the stencil inside its silhouette, filled by
//! recursing with the camera moved through the portal, and then restored by
//! decrementing it again, so sibling portals always find the buffer as they
//! expect it.

use super::{Camera, Layers, Scene};
use crate::render::{
    CameraView, ClearFlags, DepthRange, FullscreenPass, PolygonOffset, PortalDraw,
    PortalPassKind, RenderBackend, RenderError, ScenePass, Silhouette, StencilOp, StencilState,
};
use common::{
    portal::{Portal, PortalId, Portals},
    util::Plane,
};
use tracing::trace;
use treeculler::{BVol, Frustum, AABB};
use vek::*;

pub const DEFAULT_MAX_RECURSION: u8 = 3;
/// Depth of the box drawn instead of the surface while the viewer stands in
/// a portal.
pub const PORTAL_BOX_DEPTH: f32 = 0.5;
const PORTAL_POLYGON_OFFSET: PolygonOffset = PolygonOffset {
    factor: -1.0,
    units: -1.0,
};

/// What happened while rendering one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderStats {
    /// Scene passes, indexed by recursion level.
    pub scene_passes: Vec<u32>,
    pub portals_drawn: u32,
    pub portals_back_facing: u32,
    pub portals_culled: u32,
    pub portals_opaque: u32,
}

impl RenderStats {
    fn scene_pass(&mut self, level: u8) {
        let level = level as usize;
        if self.scene_passes.len() <= level {
            self.scene_passes.resize(level + 1, 0);
        }
        self.scene_passes[level] += 1;
    }

    pub fn recursive_passes(&self) -> u32 { self.scene_passes.iter().skip(1).sum() }

    pub fn max_level(&self) -> u8 { self.scene_passes.len().saturating_sub(1) as u8 }
}

pub struct PortalRenderer {
    max_recursion: u8,
    frustum_culling: bool,
    resolution: Vec2<u16>,
}

impl PortalRenderer {
    pub fn new(max_recursion: u8, frustum_culling: bool) -> Self {
        Self {
            // The stencil buffer holds one value per level
            max_recursion: max_recursion.min(u8::MAX - 1),
            frustum_culling,
            resolution: Vec2::new(1280, 720),
        }
    }

    pub fn max_recursion(&self) -> u8 { self.max_recursion }

    pub fn set_max_recursion(&mut self, max_recursion: u8) {
        self.max_recursion = max_recursion.min(u8::MAX - 1);
    }

    pub fn set_frustum_culling(&mut self, enabled: bool) { self.frustum_culling = enabled; }

    pub fn resolution(&self) -> Vec2<u16> { self.resolution }

    /// Track the output size, keeping `camera`'s aspect ratio in step.
    pub fn resize(&mut self, resolution: Vec2<u16>, camera: &mut Camera) {
        self.resolution = resolution.map(|e| e.max(1));
        camera.set_aspect_ratio(self.resolution.x as f32 / self.resolution.y as f32);
    }

    /// Draw a frame of `scene` as seen by `camera`, through every visible
    /// portal down to the recursion limit.
    pub fn render<B: RenderBackend>(
        &self,
        backend: &mut B,
        scene: &Scene,
        portals: &Portals,
        camera: &Camera,
    ) -> Result<RenderStats, RenderError> {
        let mut stats = RenderStats::default();
        let mut branch = Vec::with_capacity(self.max_recursion as usize);

        backend.clear(ClearFlags::ALL)?;
        backend.set_stencil_test(true)?;
        self.render_level(
            &mut Frame {
                backend,
                scene,
                portals,
                stats: &mut stats,
                branch: &mut branch,
            },
            camera,
            0,
            None,
        )?;
        backend.set_stencil_test(false)?;
        Ok(stats)
    }

    fn render_level<B: RenderBackend>(
        &self,
        frame: &mut Frame<B>,
        camera: &Camera,
        level: u8,
        clip: Option<Plane>,
    ) -> Result<(), RenderError> {
        let view = camera.view();
        frame.backend.set_stencil(StencilState::equal(level))?;
        frame.backend.draw_scene(&ScenePass {
            camera: view,
            layers: Layers::for_level(level),
            level,
            branch: frame.branch,
            clip_planes: clip.as_slice(),
            planes: frame.scene.planes(),
            objects: frame.scene.objects(),
        })?;
        frame.stats.scene_pass(level);

        if level >= self.max_recursion {
            return Ok(());
        }

        let frustum = self.frustum_culling.then(|| camera.frustum());
        let portals = frame.portals;
        for portal in portals.iter() {
            let Some(partner) = portals.partner_of(portal.id()) else {
                // Nothing to see through, drawn as a plain surface
                frame.backend.set_stencil(StencilState::equal(level))?;
                frame.backend.draw_portal(&PortalDraw {
                    portal: portal.id(),
                    kind: PortalPassKind::Opaque,
                    branch: frame.branch,
                    camera: view,
                    transform: portal.pose().to_mat(),
                    width: portal.width(),
                    height: portal.height(),
                    silhouette: Silhouette::Quad,
                })?;
                frame.stats.portals_opaque += 1;
                continue;
            };

            // Standing in the portal, the near plane would cut the surface
            let boxed = level == 0 && portal.player_inside();
            if !boxed && !camera.faces(portal.pose()) {
                frame.stats.portals_back_facing += 1;
                continue;
            }
            if let Some(frustum) = &frustum {
                if !in_frustum(portal, frustum) {
                    frame.stats.portals_culled += 1;
                    continue;
                }
            }
            let silhouette = if boxed {
                Silhouette::Box {
                    depth: PORTAL_BOX_DEPTH,
                }
            } else {
                Silhouette::Quad
            };

            frame.branch.push(portal.id());
            let inner = level + 1;
            trace!(portal = %portal.id(), level = inner, "Entering portal");

            // Carve the opening
            frame
                .backend
                .set_stencil(StencilState::equal(level).with_pass(StencilOp::Incr))?;
            frame
                .backend
                .set_polygon_offset(Some(PORTAL_POLYGON_OFFSET))?;
            self.draw_portal(frame, portal, view, silhouette, PortalPassKind::Carve)?;
            frame.backend.set_polygon_offset(None)?;

            // Depth from this level means nothing inside the opening
            frame.backend.set_stencil(StencilState::equal(inner))?;
            frame.backend.set_depth_range(DepthRange::FAR)?;
            frame.backend.draw_fullscreen(FullscreenPass::DepthReset)?;
            frame.backend.set_depth_range(DepthRange::FULL)?;

            let portal_camera = camera.through(portal.pose(), partner.pose());
            self.render_level(frame, &portal_camera, inner, Some(partner.surface_plane()))?;

            // Hand the region back to this level, whatever is in front of
            // the surface
            frame.backend.set_stencil(
                StencilState::equal(inner)
                    .with_pass(StencilOp::Decr)
                    .with_zfail(StencilOp::Decr),
            )?;
            self.draw_portal(frame, portal, view, silhouette, PortalPassKind::Restore)?;
            frame.branch.pop();
            frame.stats.portals_drawn += 1;
        }
        Ok(())
    }

    fn draw_portal<B: RenderBackend>(
        &self,
        frame: &mut Frame<B>,
        portal: &Portal,
        camera: CameraView,
        silhouette: Silhouette,
        kind: PortalPassKind,
    ) -> Result<(), RenderError> {
        frame.backend.draw_portal(&PortalDraw {
            portal: portal.id(),
            kind,
            branch: frame.branch,
            camera,
            transform: portal.pose().to_mat(),
            width: portal.width(),
            height: portal.height(),
            silhouette,
        })
    }
}

impl Default for PortalRenderer {
    fn default() -> Self { Self::new(DEFAULT_MAX_RECURSION, true) }
}

/// Per frame borrows threaded through the recursion.
struct Frame<'a, B> {
    backend: &'a mut B,
    scene: &'a Scene,
    portals: &'a Portals,
    stats: &'a mut RenderStats,
    branch: &'a mut Vec<PortalId>,
}

fn in_frustum(portal: &Portal, frustum: &Frustum<f32>) -> bool {
    let pose = portal.pose();
    let (hw, hh) = (portal.width() / 2.0, portal.height() / 2.0);
    let corners = [
        pose.to_world(Vec3::new(-hw, -hh, 0.0)),
        pose.to_world(Vec3::new(hw, -hh, 0.0)),
        pose.to_world(Vec3::new(-hw, hh, 0.0)),
        pose.to_world(Vec3::new(hw, hh, 0.0)),
        pose.to_world(Vec3::new(0.0, 0.0, -PORTAL_BOX_DEPTH)),
    ];
    let (min, max) = corners.iter().fold(
        (Vec3::broadcast(f32::MAX), Vec3::broadcast(f32::MIN)),
        |(min, max), c| (Vec3::partial_min(min, *c), Vec3::partial_max(max, *c)),
    );
    let (visible, _) =
        AABB::new(min.into_array(), max.into_array()).coherent_test_against_frustum(frustum, 0);
    visible
}
