//! Integration layer
//!
//! Wires the catalog, the session, the camera and the generation worker
//! together behind a single [`Controller`].

pub mod config;
pub mod controller;

pub use config::{AppConfig, CameraBackendKind, CameraConfig, WindowConfig};
pub use controller::{Controller, UiAction};
