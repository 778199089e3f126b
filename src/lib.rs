//! Pokémon costume booth
//!
//! Take a webcam photo, pick a Pokémon, and let an image-generation service
//! dress you up. The flow is a small Capture-Select-Generate state machine
//! ([`session`]) driven by the [`integration::Controller`] and rendered with
//! egui ([`ui`]).

pub mod camera;
pub mod catalog;
mod error;
pub mod generation;
pub mod integration;
pub mod session;
pub mod ui;

pub use error::{CostumeError, Result};
