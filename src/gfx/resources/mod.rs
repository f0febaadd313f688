// src/gfx/resources/mod.rs
//! Scene resources
//!
//! Meshes, materials, lights and textures. Resources that reference each
//! other do so through arena [`Id`]s.

pub mod arena;
pub mod light;
pub mod material;
pub mod mesh;
pub mod texture;
pub mod vertex;

pub use arena::{Arena, Id};
pub use light::{Light, LightKind};
pub use material::Material;
pub use mesh::Mesh;
pub use texture::{PixelSurface, Texture, TextureError, TextureSource};
pub use vertex::{GuiVertex, Vertex};

pub type MeshId = Id<Mesh>;
pub type MaterialId = Id<Material>;
pub type TextureId = Id<Texture>;
