//! # kiln Prelude
//!
//! Commonly used types in one import:
//!
//! ```rust
//! use kiln::prelude::*;
//! ```

pub use crate::assets::{load_mtl, load_obj, AssetError, FlatMesh, MaterialRecord, ParseError};
pub use crate::gfx::{
    backend::WgpuContext,
    camera::{Camera, CameraConfig, OrbitCamera},
    context::{GpuContext, GpuError},
    recording::RecordingContext,
    rendering::{FrameStats, GuiElement, GuiRenderer, RenderError, Renderer, RendererConfig},
    resources::{Light, Material, MaterialId, Mesh, MeshId, PixelSurface, Texture, TextureId},
    scene::Scene,
};

// Re-export commonly used math types
pub use cgmath::{Matrix4, Point3, Vector3};
