pub mod camera_utils;
pub mod orbit_camera;

// Re-export main types
pub use camera_utils::{Camera, CameraConfig, OPENGL_TO_WGPU_MATRIX};
pub use orbit_camera::{OrbitCamera, OrbitCameraBounds};
