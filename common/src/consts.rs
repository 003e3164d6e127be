// Physics runs at a fixed rate, independent of the display refresh
pub const DEFAULT_TICK_RATE: u32 = 30;
// Longest frame the scheduler will try to catch up on (seconds), anything
// longer is dropped so a stall does not turn into a burst of steps
pub const MAX_FRAME_TIME: f32 = 0.25;

// m/s², along -Y
pub const GRAVITY: f32 = 9.81;

// Depth of the sensor volume on either side of a portal surface
pub const PORTAL_SENSOR_HALF_DEPTH: f32 = 0.25;
// Thickness of the collider frame around a portal opening
pub const PORTAL_FRAME_DEPTH: f32 = 0.2;
pub const PORTAL_FRAME_HALF_THICKNESS: f32 = 0.1;
// The portal clipping plane sits this far behind the surface so that the
// surface itself is never clipped
pub const PORTAL_CLIP_BIAS: f32 = 0.1;

// Static level geometry is a thin slab centred on the visual plane
pub const PLANE_HALF_THICKNESS: f32 = 0.05;

pub const PLAYER_RADIUS: f32 = 0.5;
// Feet to top of the head
pub const PLAYER_HEIGHT: f32 = 1.8;
pub const PLAYER_EYE_HEIGHT: f32 = 1.5;
pub const PLAYER_MOVE_SPEED: f32 = 10.0;
// Gap the character controller leaves between the player and its environment
pub const CHARACTER_OFFSET: f32 = 0.01;

pub const INTERACTABLE_DEFAULT_RADIUS: f32 = 0.5;
