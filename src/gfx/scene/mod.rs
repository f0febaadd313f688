//! # Scene Management Module
//!
//! A [`Scene`] owns everything the renderer draws: meshes, materials and
//! textures in typed arenas, the light list and the camera.
//!
//! ```no_run
//! use kiln::gfx::{camera::OrbitCamera, scene::Scene};
//! use cgmath::Vector3;
//!
//! let mut scene = Scene::new(OrbitCamera::new(6.0, 0.4, 0.2, Vector3::new(0.0, 0.0, 0.0), 1.0));
//! let meshes = scene.load_objects("ship.obj").unwrap_or_default();
//! let materials = scene.load_material_library("ship.mtl").unwrap_or_default();
//! if let (Some(&mesh), Some(&material)) = (meshes.first(), materials.first()) {
//!     scene.assign_material(mesh, Some(material));
//! }
//! ```

pub mod scene;

// Re-export main types
pub use scene::{Scene, SceneStatistics};
