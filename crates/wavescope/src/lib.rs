//! Wavescope: replay of simulation output
//!
//! Loads a project description, opens its probe, field and voxel data through
//! `wavescope_data`, and drives a [`render::RenderBackend`] frame by frame.

pub mod app;
pub mod cli;
pub mod config;
pub mod console;
pub mod render;
pub mod scene;
pub mod view;

pub use config::{ConfigError, ProjectConfig};
pub use render::{HeadlessRenderer, RenderBackend};
pub use scene::{Scene, SceneError, Trigger, Visibility};
pub use view::{InputSnapshot, ViewState};
