//! The narrow GPU interface the engine renders through
//!
//! Every piece of GPU state (buffers, vertex arrays, textures, the bound
//! program, face culling) lives behind a [`GpuContext`] that is passed around
//! explicitly. Uniform writes and draw calls go through a [`BoundProgram`],
//! which can only be obtained by binding a program and unbinds it when
//! dropped. [`CullingGuard`] scopes a culling change the same way.

use std::ops::{Deref, DerefMut};

use cgmath::{Matrix4, Vector3};

/// Handle of a vertex buffer owned by exactly one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Handle of a vertex array (buffer + attribute layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Number of texture units a program can sample from.
pub const TEXTURE_UNITS: usize = 2;

/// Texture unit sampled for diffuse color.
pub const DIFFUSE_UNIT: u32 = 0;
/// Texture unit sampled for specular intensity.
pub const SPECULAR_UNIT: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("no program is bound")]
    NoProgramBound,
    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u32 },
    #[error("texture data is {actual} bytes, expected {expected}")]
    TextureSize { expected: usize, actual: usize },
    #[error("texture dimensions must be non-zero, got {width}x{height}")]
    EmptyTexture { width: u32, height: u32 },
    #[error("draw call failed: {0}")]
    Draw(String),
    #[error("no frame in progress")]
    NoFrame,
}

/// Attribute layout of a vertex array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLayout {
    /// position `vec3`, color `vec3`, texcoord `vec2`
    Scene,
    /// position `vec2`, texcoord `vec2`
    Gui,
}

impl VertexLayout {
    /// Size of one vertex in bytes.
    pub fn stride(self) -> usize {
        match self {
            VertexLayout::Scene => 8 * std::mem::size_of::<f32>(),
            VertexLayout::Gui => 4 * std::mem::size_of::<f32>(),
        }
    }
}

/// The shader programs a context provides. Compiling them is the backend's
/// business; the engine only binds them and sets uniforms by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Lit 3D geometry with material and light uniforms.
    Lit,
    /// Textured screen-space quads.
    Gui,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgba8,
    Rgb8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl TextureDesc {
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    pub fn check_extent(&self) -> Result<(), GpuError> {
        if self.width == 0 || self.height == 0 {
            return Err(GpuError::EmptyTexture {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Mat4([[f32; 4]; 4]),
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        UniformValue::Int(value)
    }
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        UniformValue::Int(value as i32)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        UniformValue::Float(value)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(value: [f32; 2]) -> Self {
        UniformValue::Vec2(value)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(value: [f32; 3]) -> Self {
        UniformValue::Vec3(value)
    }
}

impl From<Vector3<f32>> for UniformValue {
    fn from(value: Vector3<f32>) -> Self {
        UniformValue::Vec3(value.into())
    }
}

impl From<Matrix4<f32>> for UniformValue {
    fn from(value: Matrix4<f32>) -> Self {
        UniformValue::Mat4(value.into())
    }
}

/// Anything uniforms can be written into by name.
pub trait UniformSink {
    fn set_uniform(&mut self, name: &str, value: UniformValue);
}

/// Low-level GPU operations.
///
/// Engine code does not call `set_uniform`, `bind_texture` or `draw_arrays`
/// directly; it goes through [`BoundProgram`], which guarantees a program is
/// bound for the duration of those calls.
pub trait GpuContext {
    fn create_buffer(&mut self, data: &[u8]) -> Result<BufferHandle, GpuError>;
    fn delete_buffer(&mut self, buffer: BufferHandle);
    fn is_buffer(&self, buffer: BufferHandle) -> bool;

    fn create_vertex_array(
        &mut self,
        buffer: BufferHandle,
        layout: VertexLayout,
    ) -> Result<VertexArrayHandle, GpuError>;
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);
    fn is_vertex_array(&self, vertex_array: VertexArrayHandle) -> bool;

    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8])
        -> Result<TextureHandle, GpuError>;
    /// Replaces the contents of `texture`; `pixels` must match its size and format.
    fn update_texture(&mut self, texture: TextureHandle, pixels: &[u8]) -> Result<(), GpuError>;
    fn delete_texture(&mut self, texture: TextureHandle);
    /// Creates an empty texture usable as a color attachment.
    fn create_render_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, GpuError>;
    /// Uses `texture` as color attachment `index` of `framebuffer`.
    fn attach_to_framebuffer(
        &mut self,
        texture: TextureHandle,
        framebuffer: u32,
        index: u32,
    ) -> Result<(), GpuError>;

    fn create_program(&mut self, kind: ProgramKind) -> Result<ProgramHandle, GpuError>;
    fn use_program(&mut self, program: Option<ProgramHandle>);
    fn set_uniform(&mut self, name: &str, value: UniformValue);
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>);

    fn set_culling(&mut self, enabled: bool);
    fn culling_enabled(&self) -> bool;

    /// Color the default target is cleared to when a frame starts.
    fn set_clear_color(&mut self, _rgba: [f32; 4]) {}

    fn draw_arrays(
        &mut self,
        vertex_array: VertexArrayHandle,
        first: u32,
        count: u32,
    ) -> Result<(), GpuError>;

    /// Starts recording a frame. Contexts that draw immediately need not override.
    fn begin_frame(&mut self) -> Result<(), GpuError> {
        Ok(())
    }

    /// Submits everything recorded since [`GpuContext::begin_frame`].
    fn end_frame(&mut self) -> Result<(), GpuError> {
        Ok(())
    }
}

/// Proof that a program is bound. Unbinds the program (and its texture
/// units) when dropped.
pub struct BoundProgram<'a> {
    ctx: &'a mut dyn GpuContext,
    program: ProgramHandle,
}

impl<'a> BoundProgram<'a> {
    pub fn bind(ctx: &'a mut dyn GpuContext, program: ProgramHandle) -> Self {
        ctx.use_program(Some(program));
        Self { ctx, program }
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    pub fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        self.ctx.bind_texture(unit, texture);
    }

    pub fn draw(&mut self, vertex_array: VertexArrayHandle, count: u32) -> Result<(), GpuError> {
        self.ctx.draw_arrays(vertex_array, 0, count)
    }
}

impl UniformSink for BoundProgram<'_> {
    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.ctx.set_uniform(name, value);
    }
}

impl Drop for BoundProgram<'_> {
    fn drop(&mut self) {
        for unit in 0..TEXTURE_UNITS as u32 {
            self.ctx.bind_texture(unit, None);
        }
        self.ctx.use_program(None);
    }
}

/// Disables face culling until dropped, then restores the previous state.
pub struct CullingGuard<'a> {
    ctx: &'a mut dyn GpuContext,
    previous: bool,
}

impl<'a> CullingGuard<'a> {
    pub fn disable(ctx: &'a mut dyn GpuContext) -> Self {
        let previous = ctx.culling_enabled();
        ctx.set_culling(false);
        Self { ctx, previous }
    }
}

impl<'a> Deref for CullingGuard<'a> {
    type Target = dyn GpuContext + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.ctx
    }
}

impl<'a> DerefMut for CullingGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.ctx
    }
}

impl Drop for CullingGuard<'_> {
    fn drop(&mut self) {
        self.ctx.set_culling(self.previous);
    }
}
