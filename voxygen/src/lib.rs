#![deny(unsafe_code)]

pub mod cli;
pub mod error;
pub mod logging;
pub mod render;
pub mod scene;
pub mod session;
pub mod settings;

// Reexports
pub use crate::error::Error;
