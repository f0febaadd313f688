//! A [`GpuContext`] that records every call instead of talking to a GPU
//!
//! Used by the test-suite to check the binding protocol (which uniforms are
//! written, in which order, how many handles are alive) and handy for
//! dry-running a scene without a device.

use std::collections::HashMap;

use log::warn;

use super::context::{
    BufferHandle, GpuContext, GpuError, ProgramHandle, ProgramKind, TextureDesc, TextureHandle,
    UniformValue, VertexArrayHandle, VertexLayout, TEXTURE_UNITS,
};

#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    CreateBuffer(BufferHandle, usize),
    DeleteBuffer(BufferHandle),
    CreateVertexArray(VertexArrayHandle, BufferHandle, VertexLayout),
    DeleteVertexArray(VertexArrayHandle),
    CreateTexture(TextureHandle, TextureDesc),
    UpdateTexture(TextureHandle),
    DeleteTexture(TextureHandle),
    AttachToFramebuffer {
        texture: TextureHandle,
        framebuffer: u32,
        index: u32,
    },
    CreateProgram(ProgramHandle, ProgramKind),
    UseProgram(Option<ProgramHandle>),
    SetUniform(String, UniformValue),
    BindTexture(u32, Option<TextureHandle>),
    SetCulling(bool),
    Draw {
        vertex_array: VertexArrayHandle,
        first: u32,
        count: u32,
    },
    BeginFrame,
    EndFrame,
}

pub struct RecordingContext {
    calls: Vec<GpuCall>,
    next_id: u32,
    buffers: HashMap<u32, usize>,
    vertex_arrays: HashMap<u32, VertexLayout>,
    textures: HashMap<u32, TextureDesc>,
    programs: HashMap<u32, ProgramKind>,
    framebuffers: HashMap<(u32, u32), TextureHandle>,
    program: Option<ProgramHandle>,
    culling: bool,
    fail_draws: bool,
}

impl Default for RecordingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingContext {
    /// Creates a context with culling enabled, like a freshly set up renderer.
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            next_id: 1,
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            textures: HashMap::new(),
            programs: HashMap::new(),
            framebuffers: HashMap::new(),
            program: None,
            culling: true,
            fail_draws: false,
        }
    }

    /// Makes every subsequent draw call fail.
    pub fn set_fail_draws(&mut self, fail: bool) {
        self.fail_draws = fail;
    }

    pub fn calls(&self) -> &[GpuCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn bound_program(&self) -> Option<ProgramHandle> {
        self.program
    }

    pub fn is_attached(&self, framebuffer: u32, index: u32) -> bool {
        self.framebuffers.contains_key(&(framebuffer, index))
    }

    /// Names of every uniform written, in call order.
    pub fn uniform_names(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                GpuCall::SetUniform(name, _) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Last value written to `name`.
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.calls.iter().rev().find_map(|call| match call {
            GpuCall::SetUniform(n, value) if n == name => Some(*value),
            _ => None,
        })
    }

    /// `(vertex_array, first, count)` of every successful draw.
    pub fn draws(&self) -> Vec<(VertexArrayHandle, u32, u32)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                GpuCall::Draw {
                    vertex_array,
                    first,
                    count,
                } => Some((*vertex_array, *first, *count)),
                _ => None,
            })
            .collect()
    }

    fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl GpuContext for RecordingContext {
    fn create_buffer(&mut self, data: &[u8]) -> Result<BufferHandle, GpuError> {
        let handle = BufferHandle(self.next());
        self.buffers.insert(handle.0, data.len());
        self.calls.push(GpuCall::CreateBuffer(handle, data.len()));
        Ok(handle)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer.0);
        self.calls.push(GpuCall::DeleteBuffer(buffer));
    }

    fn is_buffer(&self, buffer: BufferHandle) -> bool {
        self.buffers.contains_key(&buffer.0)
    }

    fn create_vertex_array(
        &mut self,
        buffer: BufferHandle,
        layout: VertexLayout,
    ) -> Result<VertexArrayHandle, GpuError> {
        if !self.is_buffer(buffer) {
            return Err(GpuError::UnknownHandle {
                kind: "buffer",
                id: buffer.0,
            });
        }
        let handle = VertexArrayHandle(self.next());
        self.vertex_arrays.insert(handle.0, layout);
        self.calls
            .push(GpuCall::CreateVertexArray(handle, buffer, layout));
        Ok(handle)
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.vertex_arrays.remove(&vertex_array.0);
        self.calls.push(GpuCall::DeleteVertexArray(vertex_array));
    }

    fn is_vertex_array(&self, vertex_array: VertexArrayHandle) -> bool {
        self.vertex_arrays.contains_key(&vertex_array.0)
    }

    fn create_texture(
        &mut self,
        desc: &TextureDesc,
        pixels: &[u8],
    ) -> Result<TextureHandle, GpuError> {
        desc.check_extent()?;
        if pixels.len() != desc.byte_len() {
            return Err(GpuError::TextureSize {
                expected: desc.byte_len(),
                actual: pixels.len(),
            });
        }
        let handle = TextureHandle(self.next());
        self.textures.insert(handle.0, *desc);
        self.calls.push(GpuCall::CreateTexture(handle, *desc));
        Ok(handle)
    }

    fn update_texture(&mut self, texture: TextureHandle, pixels: &[u8]) -> Result<(), GpuError> {
        let desc = self
            .textures
            .get(&texture.0)
            .ok_or(GpuError::UnknownHandle {
                kind: "texture",
                id: texture.0,
            })?;
        if pixels.len() != desc.byte_len() {
            return Err(GpuError::TextureSize {
                expected: desc.byte_len(),
                actual: pixels.len(),
            });
        }
        self.calls.push(GpuCall::UpdateTexture(texture));
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture.0);
        self.framebuffers.retain(|_, attached| *attached != texture);
        self.calls.push(GpuCall::DeleteTexture(texture));
    }

    fn create_render_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, GpuError> {
        desc.check_extent()?;
        let handle = TextureHandle(self.next());
        self.textures.insert(handle.0, *desc);
        self.calls.push(GpuCall::CreateTexture(handle, *desc));
        Ok(handle)
    }

    fn attach_to_framebuffer(
        &mut self,
        texture: TextureHandle,
        framebuffer: u32,
        index: u32,
    ) -> Result<(), GpuError> {
        if !self.textures.contains_key(&texture.0) {
            return Err(GpuError::UnknownHandle {
                kind: "texture",
                id: texture.0,
            });
        }
        self.framebuffers.insert((framebuffer, index), texture);
        self.calls.push(GpuCall::AttachToFramebuffer {
            texture,
            framebuffer,
            index,
        });
        Ok(())
    }

    fn create_program(&mut self, kind: ProgramKind) -> Result<ProgramHandle, GpuError> {
        let handle = ProgramHandle(self.next());
        self.programs.insert(handle.0, kind);
        self.calls.push(GpuCall::CreateProgram(handle, kind));
        Ok(handle)
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.program = program;
        self.calls.push(GpuCall::UseProgram(program));
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        if self.program.is_none() {
            warn!("uniform `{}` set with no program bound", name);
        }
        self.calls
            .push(GpuCall::SetUniform(name.to_string(), value));
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        if unit as usize >= TEXTURE_UNITS {
            warn!("texture unit {} is out of range", unit);
            return;
        }
        self.calls.push(GpuCall::BindTexture(unit, texture));
    }

    fn set_culling(&mut self, enabled: bool) {
        self.culling = enabled;
        self.calls.push(GpuCall::SetCulling(enabled));
    }

    fn culling_enabled(&self) -> bool {
        self.culling
    }

    fn draw_arrays(
        &mut self,
        vertex_array: VertexArrayHandle,
        first: u32,
        count: u32,
    ) -> Result<(), GpuError> {
        if self.program.is_none() {
            return Err(GpuError::NoProgramBound);
        }
        if !self.is_vertex_array(vertex_array) {
            return Err(GpuError::UnknownHandle {
                kind: "vertex array",
                id: vertex_array.0,
            });
        }
        if self.fail_draws {
            return Err(GpuError::Draw("simulated failure".to_string()));
        }
        self.calls.push(GpuCall::Draw {
            vertex_array,
            first,
            count,
        });
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<(), GpuError> {
        self.calls.push(GpuCall::BeginFrame);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), GpuError> {
        self.calls.push(GpuCall::EndFrame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::context::{BoundProgram, CullingGuard, UniformSink};

    #[test]
    fn test_bound_program_unbinds_on_drop() {
        let mut ctx = RecordingContext::new();
        let program = ctx.create_program(ProgramKind::Lit).unwrap();
        {
            let mut bound = BoundProgram::bind(&mut ctx, program);
            bound.set_uniform("lightCount", UniformValue::Int(0));
        }
        assert_eq!(ctx.bound_program(), None);
        assert_eq!(ctx.uniform("lightCount"), Some(UniformValue::Int(0)));
    }

    #[test]
    fn test_culling_guard_restores_previous_state() {
        let mut ctx = RecordingContext::new();
        {
            let guard = CullingGuard::disable(&mut ctx);
            assert!(!guard.culling_enabled());
        }
        assert!(ctx.culling_enabled());

        ctx.set_culling(false);
        {
            let _guard = CullingGuard::disable(&mut ctx);
        }
        assert!(!ctx.culling_enabled());
    }

    #[test]
    fn test_draw_requires_known_vertex_array() {
        let mut ctx = RecordingContext::new();
        let program = ctx.create_program(ProgramKind::Lit).unwrap();
        let mut bound = BoundProgram::bind(&mut ctx, program);
        assert!(matches!(
            bound.draw(VertexArrayHandle(99), 3),
            Err(GpuError::UnknownHandle { .. })
        ));
    }
}
