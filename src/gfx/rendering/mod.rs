//! Frame rendering
//!
//! [`Renderer`] draws a scene's meshes with the lit program; [`GuiRenderer`]
//! draws screen-space quads on top of it.

pub mod config;
pub mod gui;
pub mod renderer;

// Re-export main types
pub use config::RendererConfig;
pub use gui::{GuiElement, GuiRenderer};
pub use renderer::{FrameStats, RenderError, Renderer};
