use super::{PortalId, PortalMembership, PortalPose, Portalable};
use crate::{
    consts::{
        PORTAL_CLIP_BIAS, PORTAL_FRAME_DEPTH, PORTAL_FRAME_HALF_THICKNESS,
        PORTAL_SENSOR_HALF_DEPTH,
    },
    phys::{
        BodyDesc, BodyHandle, BodyTag, ColliderDesc, ColliderHandle, CollisionGroups,
        PhysicsEngine, PhysicsError,
    },
    util::Plane,
};
use specs::Entity;
use tracing::debug;
use vek::*;

/// Physics objects making up a portal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PortalColliders {
    /// Fixed body carrying the sensor, tagged with the portal's id.
    pub body: BodyHandle,
    pub sensor: ColliderHandle,
    /// Right, left, top and bottom pieces of the frame around the opening.
    pub frame: [ColliderHandle; 4],
}

/// A single portal surface.
///
/// The pose is authoritative here; [`Portal::update_positions`] pushes it to
/// the sensor, the frame and the clipping plane whenever it changes.
#[derive(Clone, Debug)]
pub struct Portal {
    id: PortalId,
    width: f32,
    height: f32,
    pose: PortalPose,
    colliders: PortalColliders,
    attached: Option<ColliderHandle>,
    partner: Option<PortalId>,
    clip_plane: Plane,
    travellers: Vec<Entity>,
    player_inside: bool,
}

impl Portal {
    pub fn new<E: PhysicsEngine>(
        engine: &mut E,
        id: PortalId,
        width: f32,
        height: f32,
        pose: PortalPose,
    ) -> Result<Self, PhysicsError> {
        let (half_width, half_height) = (width / 2.0, height / 2.0);

        let body = engine.create_body(BodyDesc::fixed(BodyTag::PortalSensor(id)));
        let sensor = engine.create_collider(
            ColliderDesc::cuboid(half_width, half_height, PORTAL_SENSOR_HALF_DEPTH)
                .sensor(true)
                .active_events(true),
            Some(body),
        )?;

        let side = ColliderDesc::cuboid(
            PORTAL_FRAME_HALF_THICKNESS,
            half_height + PORTAL_FRAME_HALF_THICKNESS,
            PORTAL_FRAME_DEPTH,
        );
        let cap = ColliderDesc::cuboid(
            half_width + PORTAL_FRAME_HALF_THICKNESS,
            PORTAL_FRAME_HALF_THICKNESS,
            PORTAL_FRAME_DEPTH,
        );
        let frame = [
            engine.create_collider(side, None)?,
            engine.create_collider(side, None)?,
            engine.create_collider(cap, None)?,
            engine.create_collider(cap, None)?,
        ];

        let mut portal = Self {
            id,
            width,
            height,
            pose,
            colliders: PortalColliders {
                body,
                sensor,
                frame,
            },
            attached: None,
            partner: None,
            clip_plane: pose.plane(),
            travellers: Vec::new(),
            player_inside: false,
        };
        portal.update_positions(engine)?;
        Ok(portal)
    }

    pub fn id(&self) -> PortalId { self.id }

    pub fn width(&self) -> f32 { self.width }

    pub fn height(&self) -> f32 { self.height }

    pub fn pose(&self) -> &PortalPose { &self.pose }

    pub fn normal(&self) -> Vec3<f32> { self.pose.normal() }

    pub fn colliders(&self) -> &PortalColliders { &self.colliders }

    pub fn partner(&self) -> Option<PortalId> { self.partner }

    pub(super) fn set_partner(&mut self, partner: Option<PortalId>) { self.partner = partner; }

    pub fn attached_object(&self) -> Option<ColliderHandle> { self.attached }

    /// Plane through the surface facing out, moved slightly behind it so the
    /// surface itself is never clipped. Applied to things inside the portal.
    pub fn clip_plane(&self) -> Plane { self.clip_plane }

    /// Plane exactly through the surface, used to clip a view looking out of
    /// this portal.
    pub fn surface_plane(&self) -> Plane { self.pose.plane() }

    pub fn travellers(&self) -> &[Entity] { &self.travellers }

    pub fn is_travelling(&self, entity: Entity) -> bool { self.travellers.contains(&entity) }

    pub fn player_inside(&self) -> bool { self.player_inside }

    /// Whether `pos` has gone fully through, i.e. lies strictly behind the
    /// surface. Points exactly on it have not crossed yet.
    pub fn crossed(&self, pos: Vec3<f32>) -> bool {
        (pos - self.pose.pos).dot(self.normal()) < 0.0
    }

    pub fn set_pose<E: PhysicsEngine>(
        &mut self,
        engine: &mut E,
        pose: PortalPose,
    ) -> Result<(), PhysicsError> {
        self.pose = pose;
        self.update_positions(engine)
    }

    pub fn update_positions<E: PhysicsEngine>(
        &mut self,
        engine: &mut E,
    ) -> Result<(), PhysicsError> {
        let PortalPose { pos, rot } = self.pose;
        engine.set_translation(self.colliders.body, pos)?;
        engine.set_rotation(self.colliders.body, rot)?;

        let width_indent = self.pose.right() * (self.width / 2.0 + PORTAL_FRAME_HALF_THICKNESS);
        let height_indent = self.pose.up() * (self.height / 2.0 + PORTAL_FRAME_HALF_THICKNESS);
        // Sunk into whatever the portal is mounted on
        let depth = self.normal() * -PORTAL_FRAME_DEPTH;

        let [right, left, top, bottom] = self.colliders.frame;
        for (collider, offset) in [
            (right, width_indent),
            (left, -width_indent),
            (top, height_indent),
            (bottom, -height_indent),
        ] {
            engine.set_collider_pose(collider, pos + offset + depth, rot)?;
        }

        self.clip_plane = self.pose.plane().biased(PORTAL_CLIP_BIAS);
        Ok(())
    }

    /// Set the collider this portal is mounted on. Its collision groups are
    /// kept up to date by [`Portals`](super::Portals), which knows about
    /// every portal sharing it.
    pub(super) fn set_attached_object(&mut self, attached: Option<ColliderHandle>) {
        self.attached = attached;
    }

    /// Sensor overlap began. Returns whether the traveller was newly
    /// registered.
    pub fn on_enter<E: PhysicsEngine>(
        &mut self,
        engine: &mut E,
        entity: Entity,
        traveller: &mut dyn Portalable<E>,
    ) -> Result<bool, PhysicsError> {
        let Some(partner) = self.partner else {
            return Ok(false);
        };
        if self.is_travelling(entity) {
            return Ok(false);
        }

        debug!(portal = %self.id, ?entity, "Portal enter");
        traveller.entered_portal(PortalMembership {
            portal: self.id,
            partner,
        });
        engine.set_collision_groups(traveller.collider(), CollisionGroups::PORTAL_TRAVELLING)?;

        self.travellers.push(entity);
        self.player_inside |= traveller.is_player();
        Ok(true)
    }

    /// Sensor overlap ended. Stray exits for unknown travellers are ignored.
    pub fn on_exit<E: PhysicsEngine>(
        &mut self,
        engine: &mut E,
        entity: Entity,
        traveller: &mut dyn Portalable<E>,
    ) -> Result<bool, PhysicsError> {
        let Some(idx) = self.travellers.iter().position(|e| *e == entity) else {
            return Ok(false);
        };

        debug!(portal = %self.id, ?entity, "Portal exit");
        self.travellers.remove(idx);
        traveller.exited_portal(self.id);

        // Still straddling another portal, keep passing through walls
        if !traveller.is_inside_portal() {
            engine.set_collision_groups(traveller.collider(), CollisionGroups::DEFAULT)?;
        }
        if traveller.is_player() {
            self.player_inside = false;
        }
        Ok(true)
    }
}
