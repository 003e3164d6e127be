use super::PortalId;
use crate::phys::{ColliderHandle, PhysicsEngine, PhysicsError};
use specs::{Component, DenseVecStorage};
use vek::*;

/// One portal currently containing a traveller. Clip planes are looked up
/// through [`Portals`](super::Portals) so they follow the portals when
/// they move.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PortalMembership {
    pub portal: PortalId,
    /// Where the traveller's duplicate is coming out.
    pub partner: PortalId,
}

/// Which portals something is standing in. Overlapping several portals at
/// once (a doorway corner, two portals on adjacent walls) is allowed, each
/// counted once.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PortalTraveller {
    inside: Vec<PortalMembership>,
}

impl Component for PortalTraveller {
    type Storage = DenseVecStorage<Self>;
}

impl PortalTraveller {
    /// Returns `false` if `membership.portal` was already recorded.
    pub fn enter(&mut self, membership: PortalMembership) -> bool {
        if self.is_inside(membership.portal) {
            false
        } else {
            self.inside.push(membership);
            true
        }
    }

    /// Returns `false` if the traveller was not inside `portal`.
    pub fn exit(&mut self, portal: PortalId) -> bool {
        match self.inside.iter().position(|m| m.portal == portal) {
            Some(idx) => {
                self.inside.remove(idx);
                true
            },
            None => false,
        }
    }

    pub fn is_inside(&self, portal: PortalId) -> bool { self.inside.iter().any(|m| m.portal == portal) }

    pub fn is_inside_any(&self) -> bool { !self.inside.is_empty() }

    pub fn count(&self) -> usize { self.inside.len() }

    pub fn memberships(&self) -> &[PortalMembership] { &self.inside }
}

/// Anything that can be sent through a portal.
///
/// Implementors give access to their pose and membership bookkeeping, the
/// portal drives the rest.
pub trait Portalable<E: PhysicsEngine> {
    fn position(&self, engine: &E) -> Result<Vec3<f32>, PhysicsError>;

    fn rotation(&self, engine: &E) -> Result<Quaternion<f32>, PhysicsError>;

    /// Move to the other side of a portal pair. `delta` is the rotation
    /// carrying directions from the entry portal to the exit portal.
    fn warp(
        &mut self,
        engine: &mut E,
        pos: Vec3<f32>,
        rot: Quaternion<f32>,
        delta: Quaternion<f32>,
    ) -> Result<(), PhysicsError>;

    /// The collider moved between collision groups while inside a portal.
    fn collider(&self) -> ColliderHandle;

    fn traveller(&self) -> &PortalTraveller;

    fn traveller_mut(&mut self) -> &mut PortalTraveller;

    fn is_player(&self) -> bool { false }

    fn entered_portal(&mut self, membership: PortalMembership) -> bool {
        self.traveller_mut().enter(membership)
    }

    fn exited_portal(&mut self, portal: PortalId) -> bool { self.traveller_mut().exit(portal) }

    fn is_inside_portal(&self) -> bool { self.traveller().is_inside_any() }
}
