//! CPU mirrors of the shader uniform blocks
//!
//! The structs below follow WGSL's uniform address space layout rules
//! field for field, so a block can be filled by name on the CPU and uploaded
//! as raw bytes. Name lookups resolve to a byte offset and an expected type;
//! a value of the wrong type is rejected rather than reinterpreted.

use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};

use crate::gfx::context::{ProgramKind, UniformValue};

/// Size of the `lights` array in the scene shader.
pub const MAX_LIGHTS: usize = 8;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct LightBlock {
    pub position: [f32; 3],
    pub kind: i32,
    pub color: [f32; 3],
    pub intensity: f32,
    pub direction: [f32; 3],
    pub attenuation: f32,
    pub cone_angle: f32,
    pub cast_shadow: i32,
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MaterialBlock {
    pub ambient: [f32; 3],
    pub ambient_strength: f32,
    pub diffuse: [f32; 3],
    pub diffuse_strength: f32,
    pub specular: [f32; 3],
    pub specular_strength: f32,
    pub emit: [f32; 3],
    pub emit_strength: f32,
    pub specular_exponent: f32,
    pub alpha: f32,
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SceneBlock {
    pub projection: [[f32; 4]; 4],
    pub modelview: [[f32; 4]; 4],
    pub camera_position: [f32; 3],
    pub light_count: i32,
    pub use_texture: i32,
    pub use_specular_texture: i32,
    _pad: [i32; 2],
    pub material: MaterialBlock,
    pub lights: [LightBlock; MAX_LIGHTS],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct GuiBlock {
    pub modelview: [[f32; 4]; 4],
    pub use_texture: i32,
    _pad: [i32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int,
    Float,
    Vec3,
    Mat4,
}

impl FieldType {
    fn accepts(self, value: &UniformValue) -> bool {
        matches!(
            (self, value),
            (FieldType::Int, UniformValue::Int(_))
                | (FieldType::Float, UniformValue::Float(_))
                | (FieldType::Vec3, UniformValue::Vec3(_))
                | (FieldType::Mat4, UniformValue::Mat4(_))
        )
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum UniformError {
    #[error("program has no uniform named `{0}`")]
    Unknown(String),
    #[error("uniform `{name}` expects {expected:?}, got {value:?}")]
    Type {
        name: String,
        expected: FieldType,
        value: UniformValue,
    },
}

/// Byte size of the uniform block used by programs of `kind`.
pub fn block_size(kind: ProgramKind) -> usize {
    match kind {
        ProgramKind::Lit => size_of::<SceneBlock>(),
        ProgramKind::Gui => size_of::<GuiBlock>(),
    }
}

/// Resolves a uniform name to its byte offset and type.
pub fn locate(kind: ProgramKind, name: &str) -> Option<(usize, FieldType)> {
    match kind {
        ProgramKind::Lit => locate_scene(name),
        ProgramKind::Gui => match name {
            "modelview" => Some((offset_of!(GuiBlock, modelview), FieldType::Mat4)),
            "useTexture" => Some((offset_of!(GuiBlock, use_texture), FieldType::Int)),
            _ => None,
        },
    }
}

fn locate_scene(name: &str) -> Option<(usize, FieldType)> {
    if let Some(field) = name.strip_prefix("material.") {
        let base = offset_of!(SceneBlock, material);
        return locate_material(field).map(|(offset, ty)| (base + offset, ty));
    }
    if let Some(rest) = name.strip_prefix("lights[") {
        let (index, field) = rest.split_once("].")?;
        let slot: usize = index.parse().ok()?;
        if slot >= MAX_LIGHTS {
            return None;
        }
        let base = offset_of!(SceneBlock, lights) + slot * size_of::<LightBlock>();
        return locate_light(field).map(|(offset, ty)| (base + offset, ty));
    }
    match name {
        "projection" => Some((offset_of!(SceneBlock, projection), FieldType::Mat4)),
        "modelview" => Some((offset_of!(SceneBlock, modelview), FieldType::Mat4)),
        "cameraPosition" => Some((offset_of!(SceneBlock, camera_position), FieldType::Vec3)),
        "lightCount" => Some((offset_of!(SceneBlock, light_count), FieldType::Int)),
        "useTexture" => Some((offset_of!(SceneBlock, use_texture), FieldType::Int)),
        "useSpecularTexture" => {
            Some((offset_of!(SceneBlock, use_specular_texture), FieldType::Int))
        }
        _ => None,
    }
}

fn locate_material(field: &str) -> Option<(usize, FieldType)> {
    let located = match field {
        "ambient" => (offset_of!(MaterialBlock, ambient), FieldType::Vec3),
        "diffuse" => (offset_of!(MaterialBlock, diffuse), FieldType::Vec3),
        "specular" => (offset_of!(MaterialBlock, specular), FieldType::Vec3),
        "emit" => (offset_of!(MaterialBlock, emit), FieldType::Vec3),
        "ambientStrength" => (offset_of!(MaterialBlock, ambient_strength), FieldType::Float),
        "diffuseStrength" => (offset_of!(MaterialBlock, diffuse_strength), FieldType::Float),
        "specularStrength" => (offset_of!(MaterialBlock, specular_strength), FieldType::Float),
        "emitStrength" => (offset_of!(MaterialBlock, emit_strength), FieldType::Float),
        "specularExponent" => (offset_of!(MaterialBlock, specular_exponent), FieldType::Float),
        "alpha" => (offset_of!(MaterialBlock, alpha), FieldType::Float),
        _ => return None,
    };
    Some(located)
}

fn locate_light(field: &str) -> Option<(usize, FieldType)> {
    let located = match field {
        "type" => (offset_of!(LightBlock, kind), FieldType::Int),
        "color" => (offset_of!(LightBlock, color), FieldType::Vec3),
        "intensity" => (offset_of!(LightBlock, intensity), FieldType::Float),
        "direction" => (offset_of!(LightBlock, direction), FieldType::Vec3),
        "position" => (offset_of!(LightBlock, position), FieldType::Vec3),
        "attenuation" => (offset_of!(LightBlock, attenuation), FieldType::Float),
        "coneAngle" => (offset_of!(LightBlock, cone_angle), FieldType::Float),
        "castShadow" => (offset_of!(LightBlock, cast_shadow), FieldType::Int),
        _ => return None,
    };
    Some(located)
}

/// Writes `value` into a staging block laid out for `kind`.
pub fn write(
    kind: ProgramKind,
    block: &mut [u8],
    name: &str,
    value: UniformValue,
) -> Result<(), UniformError> {
    let (offset, expected) =
        locate(kind, name).ok_or_else(|| UniformError::Unknown(name.to_string()))?;
    if !expected.accepts(&value) {
        return Err(UniformError::Type {
            name: name.to_string(),
            expected,
            value,
        });
    }

    let bytes: &[u8] = match &value {
        UniformValue::Int(v) => bytemuck::bytes_of(v),
        UniformValue::Float(v) => bytemuck::bytes_of(v),
        UniformValue::Vec2(v) => bytemuck::bytes_of(v),
        UniformValue::Vec3(v) => bytemuck::bytes_of(v),
        UniformValue::Mat4(v) => bytemuck::bytes_of(v),
    };
    block[offset..offset + bytes.len()].copy_from_slice(bytes);
    Ok(())
}
