use crate::gfx::{backend::uniform_layout::MAX_LIGHTS, resources::Material};

/// Renderer settings
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Lights past this many are skipped each frame.
    pub max_lights: usize,
    pub clear_color: [f32; 4],
    /// Used for meshes without a material, or whose material was removed.
    pub default_material: Material,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_lights: MAX_LIGHTS,
            clear_color: [0.1, 0.1, 0.12, 1.0],
            default_material: Material::default(),
        }
    }
}

impl RendererConfig {
    /// Caps the light count at what the shader's uniform array can hold.
    pub fn with_max_lights(mut self, max_lights: usize) -> Self {
        self.max_lights = max_lights.min(MAX_LIGHTS);
        self
    }

    pub fn with_clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }

    pub fn with_default_material(mut self, material: Material) -> Self {
        self.default_material = material;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_lights_never_exceeds_uniform_array() {
        assert_eq!(RendererConfig::default().max_lights, MAX_LIGHTS);
        assert_eq!(RendererConfig::default().with_max_lights(3).max_lights, 3);
        assert_eq!(
            RendererConfig::default().with_max_lights(MAX_LIGHTS + 4).max_lights,
            MAX_LIGHTS
        );
    }
}
