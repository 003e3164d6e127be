//! Portals: paired surfaces that connect two places in a level, both for
//! the camera and for anything physical passing through them.

mod entity;
pub mod reproject;
mod set;
mod traveller;

pub use entity::{Portal, PortalColliders};
pub use reproject::{
    relative_rotation, reproject_position, reproject_rotation, PortalPose, HALF_TURN,
};
pub use set::{Portals, TravellerLookup};
pub use traveller::{PortalMembership, PortalTraveller, Portalable};

use serde::{Deserialize, Serialize};

/// Index of a portal within its [`Portals`] set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortalId(pub u16);

impl PortalId {
    /// The id for the portal at `index`, if ids reach that far.
    pub fn from_index(index: usize) -> Option<Self> { u16::try_from(index).ok().map(Self) }

    pub fn index(self) -> usize { self.0 as usize }
}

impl std::fmt::Display for PortalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "portal #{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_do_not_wrap() {
        assert_eq!(PortalId::from_index(0), Some(PortalId(0)));
        assert_eq!(PortalId::from_index(65_535), Some(PortalId(u16::MAX)));
        assert_eq!(PortalId::from_index(65_536), None);
        assert_eq!(PortalId::from_index(usize::MAX), None);
    }
}
