//! Collision filtering.
//!
//! A collider's groups pack a 16 bit membership and a 16 bit mask into one
//! `u32`: `membership << 16 | mask`. Two colliders interact when each one's
//! membership intersects the other's mask.

use serde::{Deserialize, Serialize};

// bit 0
pub const NORMAL_GEOMETRY: u16 = 1;
// bit 1, the wall (or floor) a portal is currently embedded in
pub const PORTAL_ATTACHED_GEOMETRY: u16 = 1 << 1;
// bit 2, anything currently passing through a portal
pub const PORTAL_TRAVELLING_GEOMETRY: u16 = 1 << 2;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionGroups(pub u32);

impl CollisionGroups {
    /// Member of everything, interacts with everything.
    pub const DEFAULT: Self = Self::new(0xffff, 0xffff);
    /// Geometry a portal is attached to, while something is travelling
    /// through that portal.
    pub const PORTAL_ATTACHED: Self =
        Self::new(PORTAL_ATTACHED_GEOMETRY, !PORTAL_TRAVELLING_GEOMETRY);
    /// A body that is straddling a portal.
    pub const PORTAL_TRAVELLING: Self =
        Self::new(PORTAL_TRAVELLING_GEOMETRY, !PORTAL_ATTACHED_GEOMETRY);

    pub const fn new(membership: u16, mask: u16) -> Self {
        Self(((membership as u32) << 16) | (mask as u32 & 0xffff))
    }

    pub const fn membership(self) -> u16 { (self.0 >> 16) as u16 }

    pub const fn mask(self) -> u16 { (self.0 & 0xffff) as u16 }

    pub fn interacts_with(self, other: Self) -> bool {
        self.membership() & other.mask() != 0 && other.membership() & self.mask() != 0
    }
}

impl Default for CollisionGroups {
    fn default() -> Self { Self::DEFAULT }
}
