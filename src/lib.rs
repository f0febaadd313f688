//! kiln 3D Engine
//!
//! A small real-time renderer: Wavefront `.obj` / `.mtl` assets, a lit scene
//! pass with up to eight lights and a GUI overlay, drawn through wgpu.

pub mod assets;
pub mod gfx;
pub mod prelude;
pub mod wgpu_utils;
