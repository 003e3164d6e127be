#![deny(unsafe_code)]
#![allow(clippy::option_map_unit_fn)]

pub mod comp;
pub mod consts;
pub mod error;
pub mod level;
pub mod phys;
pub mod portal;
pub mod resources;
pub mod state;
pub mod util;

pub use error::Error;
pub use state::State;
