//! Material system for Phong-style lighting
//!
//! A [`Material`] is a plain value: colors, per-channel strength multipliers
//! and optional texture references. Meshes refer to materials by
//! [`MaterialId`](super::MaterialId); the renderer resolves the id every
//! frame and writes the `material.*` uniforms through [`Material::send_uniforms`].

use crate::{assets::MaterialRecord, gfx::context::UniformSink};

use super::TextureId;

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    name: Option<String>,
    ambient: [f32; 3],
    diffuse: [f32; 3],
    specular: [f32; 3],
    emit: [f32; 3],
    ambient_strength: f32,
    diffuse_strength: f32,
    specular_strength: f32,
    emit_strength: f32,
    specular_exponent: f32,
    alpha: f32,
    diffuse_texture: Option<TextureId>,
    specular_texture: Option<TextureId>,
}

impl Default for Material {
    fn default() -> Self {
        Self::from_record(&MaterialRecord::default())
    }
}

impl Material {
    /// Builds a material from a parsed library record. Strengths start at 1.
    ///
    /// Texture paths in the record are not loaded here; see
    /// [`Scene::load_material_library`](crate::gfx::scene::Scene::load_material_library).
    pub fn from_record(record: &MaterialRecord) -> Self {
        Self {
            name: record.name.clone(),
            ambient: record.ambient,
            diffuse: record.diffuse,
            specular: record.specular,
            emit: record.emissive,
            ambient_strength: 1.0,
            diffuse_strength: 1.0,
            specular_strength: 1.0,
            emit_strength: 1.0,
            specular_exponent: record.specular_exponent,
            alpha: record.opacity,
            diffuse_texture: None,
            specular_texture: None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn ambient(&self) -> [f32; 3] {
        self.ambient
    }

    pub fn diffuse(&self) -> [f32; 3] {
        self.diffuse
    }

    pub fn specular(&self) -> [f32; 3] {
        self.specular
    }

    pub fn emit(&self) -> [f32; 3] {
        self.emit
    }

    pub fn ambient_strength(&self) -> f32 {
        self.ambient_strength
    }

    pub fn diffuse_strength(&self) -> f32 {
        self.diffuse_strength
    }

    pub fn specular_strength(&self) -> f32 {
        self.specular_strength
    }

    pub fn emit_strength(&self) -> f32 {
        self.emit_strength
    }

    pub fn specular_exponent(&self) -> f32 {
        self.specular_exponent
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn diffuse_texture(&self) -> Option<TextureId> {
        self.diffuse_texture
    }

    pub fn specular_texture(&self) -> Option<TextureId> {
        self.specular_texture
    }

    pub fn set_ambient(&mut self, color: [f32; 3]) {
        self.ambient = color;
    }

    pub fn set_ambient_rgb(&mut self, r: f32, g: f32, b: f32) {
        self.set_ambient([r, g, b]);
    }

    pub fn set_diffuse(&mut self, color: [f32; 3]) {
        self.diffuse = color;
    }

    pub fn set_diffuse_rgb(&mut self, r: f32, g: f32, b: f32) {
        self.set_diffuse([r, g, b]);
    }

    pub fn set_specular(&mut self, color: [f32; 3]) {
        self.specular = color;
    }

    pub fn set_specular_rgb(&mut self, r: f32, g: f32, b: f32) {
        self.set_specular([r, g, b]);
    }

    pub fn set_emit(&mut self, color: [f32; 3]) {
        self.emit = color;
    }

    pub fn set_emit_rgb(&mut self, r: f32, g: f32, b: f32) {
        self.set_emit([r, g, b]);
    }

    pub fn set_ambient_strength(&mut self, strength: f32) {
        self.ambient_strength = strength;
    }

    pub fn set_diffuse_strength(&mut self, strength: f32) {
        self.diffuse_strength = strength;
    }

    pub fn set_specular_strength(&mut self, strength: f32) {
        self.specular_strength = strength;
    }

    pub fn set_emit_strength(&mut self, strength: f32) {
        self.emit_strength = strength;
    }

    pub fn set_specular_exponent(&mut self, exponent: f32) {
        self.specular_exponent = exponent;
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
    }

    pub fn set_diffuse_texture(&mut self, texture: Option<TextureId>) {
        self.diffuse_texture = texture;
    }

    pub fn set_specular_texture(&mut self, texture: Option<TextureId>) {
        self.specular_texture = texture;
    }

    /// Writes every `material.*` uniform. Texture bindings are the
    /// renderer's job since they need the texture arena.
    pub fn send_uniforms(&self, sink: &mut dyn UniformSink) {
        sink.set_uniform("material.ambient", self.ambient.into());
        sink.set_uniform("material.diffuse", self.diffuse.into());
        sink.set_uniform("material.specular", self.specular.into());
        sink.set_uniform("material.emit", self.emit.into());
        sink.set_uniform("material.ambientStrength", self.ambient_strength.into());
        sink.set_uniform("material.diffuseStrength", self.diffuse_strength.into());
        sink.set_uniform("material.specularStrength", self.specular_strength.into());
        sink.set_uniform("material.emitStrength", self.emit_strength.into());
        sink.set_uniform("material.specularExponent", self.specular_exponent.into());
        sink.set_uniform("material.alpha", self.alpha.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::context::UniformValue;

    #[derive(Default)]
    struct Sink(Vec<(String, UniformValue)>);

    impl UniformSink for Sink {
        fn set_uniform(&mut self, name: &str, value: UniformValue) {
            self.0.push((name.to_string(), value));
        }
    }

    #[test]
    fn test_from_record() {
        let record = MaterialRecord {
            name: Some("Hull".into()),
            diffuse: [0.6, 0.2, 0.2],
            opacity: 0.5,
            ..Default::default()
        };
        let material = Material::from_record(&record);
        assert_eq!(material.name(), Some("Hull"));
        assert_eq!(material.diffuse(), [0.6, 0.2, 0.2]);
        assert_eq!(material.alpha(), 0.5);
        assert_eq!(material.specular_strength(), 1.0);
        assert_eq!(material.diffuse_texture(), None);
    }

    #[test]
    fn test_rgb_setters_match_array_setters() {
        let mut a = Material::default();
        let mut b = Material::default();
        a.set_specular([0.1, 0.2, 0.3]);
        b.set_specular_rgb(0.1, 0.2, 0.3);
        a.set_emit([1.0, 0.0, 0.0]);
        b.set_emit_rgb(1.0, 0.0, 0.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_send_uniforms() {
        let mut material = Material::default();
        material.set_specular_strength(0.5);
        let mut sink = Sink::default();
        material.send_uniforms(&mut sink);

        assert_eq!(sink.0.len(), 10);
        assert!(sink.0.iter().all(|(name, _)| name.starts_with("material.")));
        assert!(sink.0.contains(&(
            "material.specularStrength".to_string(),
            UniformValue::Float(0.5)
        )));
    }
}
