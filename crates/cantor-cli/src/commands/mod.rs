//! CLI command implementations.

pub mod common;
pub mod config;
pub mod inspect;
pub mod instruments;
#[cfg(feature = "playback")]
pub mod play;
pub mod show;
