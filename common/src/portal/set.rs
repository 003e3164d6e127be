use super::{
    relative_rotation, reproject_position, reproject_rotation, Portal, PortalId,
    PortalMembership, PortalPose, PortalTraveller, Portalable,
};
use crate::{
    error::Error,
    phys::{
        BodyTag, ColliderEvent, ColliderHandle, CollisionGroups, PhysicsEngine, PhysicsError,
    },
    util::Plane,
};
use specs::Entity;
use tracing::debug;

/// Resolves the entity behind a traveller body to something
/// [`Portalable`].
pub trait TravellerLookup<E: PhysicsEngine> {
    /// Run `f` on the traveller for `entity`. Entities that cannot travel
    /// are skipped without calling `f`.
    fn with_traveller(
        &mut self,
        entity: Entity,
        f: &mut dyn FnMut(&mut dyn Portalable<E>) -> Result<(), PhysicsError>,
    ) -> Result<(), PhysicsError>;
}

/// Every portal in the level. Ids are indices into the set.
#[derive(Clone, Debug, Default)]
pub struct Portals {
    portals: Vec<Portal>,
}

impl Portals {
    pub fn new() -> Self { Self::default() }

    pub fn add<E: PhysicsEngine>(
        &mut self,
        engine: &mut E,
        width: f32,
        height: f32,
        pose: PortalPose,
    ) -> Result<PortalId, Error> {
        let id = PortalId::from_index(self.portals.len()).ok_or(Error::TooManyPortals {
            count: self.portals.len(),
        })?;
        self.portals.push(Portal::new(engine, id, width, height, pose)?);
        Ok(id)
    }

    pub fn get(&self, id: PortalId) -> Option<&Portal> { self.portals.get(id.index()) }

    pub fn get_mut(&mut self, id: PortalId) -> Option<&mut Portal> {
        self.portals.get_mut(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Portal> { self.portals.iter() }

    pub fn len(&self) -> usize { self.portals.len() }

    pub fn is_empty(&self) -> bool { self.portals.is_empty() }

    pub fn partner_of(&self, id: PortalId) -> Option<&Portal> {
        self.get(id)
            .and_then(|portal| portal.partner())
            .and_then(|partner| self.get(partner))
    }

    /// Link `a` and `b` to each other, dropping any previous links either
    /// of them had.
    pub fn link(&mut self, a: PortalId, b: PortalId) -> bool {
        if a == b || self.get(a).is_none() || self.get(b).is_none() {
            return false;
        }
        self.unlink(a);
        self.unlink(b);
        self.portals[a.index()].set_partner(Some(b));
        self.portals[b.index()].set_partner(Some(a));
        true
    }

    pub fn unlink(&mut self, id: PortalId) {
        let partner = self.get(id).and_then(|portal| portal.partner());
        for id in std::iter::once(id).chain(partner) {
            if let Some(portal) = self.get_mut(id) {
                portal.set_partner(None);
            }
        }
    }

    pub fn set_pose<E: PhysicsEngine>(
        &mut self,
        engine: &mut E,
        id: PortalId,
        pose: PortalPose,
    ) -> Result<(), PhysicsError> {
        match self.get_mut(id) {
            Some(portal) => portal.set_pose(engine, pose),
            None => Ok(()),
        }
    }

    /// Mount portal `id` on `attached`. The collider it was mounted on
    /// before gets its default collision groups back once no other portal
    /// on it has travellers.
    pub fn set_attached_object<E: PhysicsEngine>(
        &mut self,
        engine: &mut E,
        id: PortalId,
        attached: Option<ColliderHandle>,
    ) -> Result<(), PhysicsError> {
        let Some(portal) = self.get_mut(id) else {
            return Ok(());
        };
        let old = portal.attached_object();
        portal.set_attached_object(attached);
        for collider in old.into_iter().chain(attached) {
            self.sync_attached(engine, collider)?;
        }
        Ok(())
    }

    /// Whether any portal mounted on `collider` has something passing
    /// through it.
    pub fn attached_in_use(&self, collider: ColliderHandle) -> bool {
        self.portals.iter().any(|portal| {
            portal.attached_object() == Some(collider) && !portal.travellers().is_empty()
        })
    }

    /// Travellers pass through `collider` while any portal mounted on it is
    /// in use.
    fn sync_attached<E: PhysicsEngine>(
        &self,
        engine: &mut E,
        collider: ColliderHandle,
    ) -> Result<(), PhysicsError> {
        let groups = if self.attached_in_use(collider) {
            CollisionGroups::PORTAL_ATTACHED
        } else {
            CollisionGroups::DEFAULT
        };
        engine.set_collision_groups(collider, groups)
    }

    /// Planes hiding the parts of `traveller` that have already gone
    /// through, one per portal it is standing in.
    pub fn primary_clip_planes<'a>(
        &'a self,
        traveller: &'a PortalTraveller,
    ) -> impl Iterator<Item = Plane> + 'a {
        traveller
            .memberships()
            .iter()
            .filter_map(|membership| self.get(membership.portal))
            .map(|portal| portal.clip_plane())
    }

    /// Plane hiding the part of a duplicate that has not come out of the
    /// partner portal yet.
    pub fn duplicate_clip_plane(&self, membership: &PortalMembership) -> Option<Plane> {
        self.get(membership.partner).map(|partner| partner.clip_plane())
    }

    /// Route a collision event on a portal sensor to that portal. Events
    /// against anything that is not a traveller are ignored.
    pub fn handle_collision<E: PhysicsEngine, L: TravellerLookup<E>>(
        &mut self,
        engine: &mut E,
        event: ColliderEvent,
        lookup: &mut L,
    ) -> Result<(), PhysicsError> {
        let BodyTag::PortalSensor(id) = event.tag else {
            return Ok(());
        };
        let Some(entity) = engine
            .collider_tag(event.other)
            .and_then(|tag| tag.traveller())
        else {
            return Ok(());
        };
        let Some(portal) = self.portals.get_mut(id.index()) else {
            return Ok(());
        };

        lookup.with_traveller(entity, &mut |traveller| {
            if event.started {
                portal.on_enter(engine, entity, traveller)?;
            } else {
                portal.on_exit(engine, entity, traveller)?;
            }
            Ok(())
        })?;

        match self.get(id).and_then(|portal| portal.attached_object()) {
            Some(attached) => self.sync_attached(engine, attached),
            None => Ok(()),
        }
    }

    /// Warp every traveller that has gone fully through its portal. Returns
    /// the number of warps.
    pub fn physics_update<E: PhysicsEngine, L: TravellerLookup<E>>(
        &self,
        engine: &mut E,
        lookup: &mut L,
    ) -> Result<u32, PhysicsError> {
        let mut warps = 0;
        for portal in &self.portals {
            let Some(partner) = self.partner_of(portal.id()) else {
                continue;
            };
            let (inp, out) = (portal.pose(), partner.pose());

            for &entity in portal.travellers() {
                lookup.with_traveller(entity, &mut |traveller| {
                    let pos = traveller.position(engine)?;
                    if !portal.crossed(pos) {
                        return Ok(());
                    }

                    let rot = traveller.rotation(engine)?;
                    let new_pos = reproject_position(pos, inp, out);
                    debug!(
                        ?entity,
                        from = %portal.id(),
                        to = %partner.id(),
                        ?new_pos,
                        "Warping traveller"
                    );
                    traveller.warp(
                        engine,
                        new_pos,
                        reproject_rotation(rot, inp, out),
                        relative_rotation(inp, out),
                    )?;
                    warps += 1;
                    Ok(())
                })?;
            }
        }
        Ok(warps)
    }
}
