pub mod dir;
pub mod plane;
mod quat;

pub use dir::Dir;
pub use plane::Plane;
pub use quat::{quat_from_half_turns, slerp_quat, yaw_of};
