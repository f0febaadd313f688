//! # Graphics Module
//!
//! Everything between parsed assets and pixels.
//!
//! ## Architecture Overview
//!
//! - **GPU interface** ([`context`]) - the [`GpuContext`] trait, typed handles
//!   and the [`BoundProgram`] / [`CullingGuard`] scopes
//! - **Backends** ([`backend`], [`recording`]) - a wgpu implementation and a
//!   call-recording one for tests and tooling
//! - **Resources** ([`resources`]) - meshes, materials, lights and textures,
//!   addressed through generational arenas
//! - **Scene** ([`scene`]) - the resource graph plus camera and lights
//! - **Rendering** ([`rendering`]) - the lit scene pass and the GUI pass
//! - **Camera** ([`camera`]) - orbit camera and projection helpers
//!
//! ## Usage
//!
//! ```no_run
//! use kiln::gfx::{
//!     backend::WgpuContext,
//!     camera::OrbitCamera,
//!     rendering::{GuiRenderer, Renderer, RendererConfig},
//!     scene::Scene,
//! };
//! use cgmath::Vector3;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut ctx = WgpuContext::new_headless(640, 480)?;
//! let mut scene = Scene::new(OrbitCamera::new(5.0, 0.3, 0.5, Vector3::new(0.0, 0.0, 0.0), 4.0 / 3.0));
//! scene.load_objects("cube.obj")?;
//! scene.upload(&mut ctx)?;
//!
//! let renderer = Renderer::new(&mut ctx, RendererConfig::default())?;
//! let gui = GuiRenderer::new(&mut ctx)?;
//! renderer.render_frame(&mut ctx, &scene, &gui)?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod camera;
pub mod context;
pub mod recording;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export main types for convenience
pub use context::{BoundProgram, CullingGuard, GpuContext, GpuError, UniformSink, UniformValue};
pub use rendering::{RenderError, Renderer, RendererConfig};
pub use scene::Scene;
