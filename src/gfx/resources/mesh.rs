//! Mesh resources
//!
//! A [`Mesh`] owns a [`FlatMesh`] on the CPU side and, once loaded, exactly
//! one vertex buffer and one vertex array on the GPU side.

use log::debug;

use crate::{
    assets::FlatMesh,
    gfx::{
        context::{BoundProgram, BufferHandle, GpuContext, GpuError, VertexArrayHandle, VertexLayout},
        rendering::RenderError,
    },
};

use super::{vertex::Vertex, MaterialId, TextureId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GpuState {
    Unloaded,
    Loaded {
        buffer: BufferHandle,
        vertex_array: VertexArrayHandle,
    },
}

#[derive(Debug)]
pub struct Mesh {
    data: FlatMesh,
    state: GpuState,
    material: Option<MaterialId>,
    texture: Option<TextureId>,
}

impl Mesh {
    pub fn new(data: FlatMesh) -> Self {
        Self {
            data,
            state: GpuState::Unloaded,
            material: None,
            texture: None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.data.name()
    }

    pub fn data(&self) -> &FlatMesh {
        &self.data
    }

    /// Number of vertices handed to the draw call.
    pub fn vertex_count(&self) -> usize {
        self.data.vertex_count()
    }

    pub fn triangle_count(&self) -> usize {
        self.data.triangle_count()
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, GpuState::Loaded { .. })
    }

    pub fn vertex_array(&self) -> Option<VertexArrayHandle> {
        match self.state {
            GpuState::Loaded { vertex_array, .. } => Some(vertex_array),
            GpuState::Unloaded => None,
        }
    }

    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }

    pub fn set_material(&mut self, material: Option<MaterialId>) {
        self.material = material;
    }

    /// Texture used for diffuse color when the material has none.
    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub fn set_texture(&mut self, texture: Option<TextureId>) {
        self.texture = texture;
    }

    /// Uploads the geometry. Handles from a previous load are deleted first,
    /// so loading repeatedly never leaks GPU objects.
    pub fn load(&mut self, ctx: &mut dyn GpuContext) -> Result<(), GpuError> {
        self.unload(ctx);

        let vertices = Vertex::interleave(&self.data);
        let buffer = ctx.create_buffer(bytemuck::cast_slice(&vertices))?;
        let vertex_array = match ctx.create_vertex_array(buffer, VertexLayout::Scene) {
            Ok(vertex_array) => vertex_array,
            Err(err) => {
                ctx.delete_buffer(buffer);
                return Err(err);
            }
        };

        debug!(
            "mesh {:?} loaded: {} vertices in {:?}",
            self.name(),
            vertices.len(),
            buffer
        );
        self.state = GpuState::Loaded {
            buffer,
            vertex_array,
        };
        Ok(())
    }

    /// Releases the GPU handles, if any.
    pub fn unload(&mut self, ctx: &mut dyn GpuContext) {
        if let GpuState::Loaded {
            buffer,
            vertex_array,
        } = self.state
        {
            if ctx.is_vertex_array(vertex_array) {
                ctx.delete_vertex_array(vertex_array);
            }
            if ctx.is_buffer(buffer) {
                ctx.delete_buffer(buffer);
            }
        }
        self.state = GpuState::Unloaded;
    }

    /// Issues one draw of every vertex through the bound program.
    pub fn draw(&self, program: &mut BoundProgram) -> Result<(), RenderError> {
        let GpuState::Loaded { vertex_array, .. } = self.state else {
            return Err(RenderError::MeshNotLoaded {
                name: self.name().map(str::to_string),
            });
        };
        program.draw(vertex_array, self.vertex_count() as u32)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assets::parse_and_flatten,
        gfx::{context::ProgramKind, recording::RecordingContext},
    };

    fn triangle() -> Mesh {
        let mut meshes = parse_and_flatten("o tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        Mesh::new(meshes.remove(0))
    }

    #[test]
    fn test_load_twice_keeps_handle_count() {
        let mut ctx = RecordingContext::new();
        let mut mesh = triangle();

        mesh.load(&mut ctx).unwrap();
        assert_eq!((ctx.live_buffers(), ctx.live_vertex_arrays()), (1, 1));
        mesh.load(&mut ctx).unwrap();
        assert_eq!((ctx.live_buffers(), ctx.live_vertex_arrays()), (1, 1));

        mesh.unload(&mut ctx);
        assert_eq!((ctx.live_buffers(), ctx.live_vertex_arrays()), (0, 0));
        assert!(!mesh.is_loaded());
    }

    #[test]
    fn test_draw_unloaded_mesh_is_an_error() {
        let mut ctx = RecordingContext::new();
        let program = ctx.create_program(ProgramKind::Lit).unwrap();
        let mesh = triangle();
        let mut bound = BoundProgram::bind(&mut ctx, program);

        assert!(matches!(
            mesh.draw(&mut bound),
            Err(RenderError::MeshNotLoaded { name: Some(ref n) }) if n == "tri"
        ));
    }

    #[test]
    fn test_draw_uses_vertex_count() {
        let mut ctx = RecordingContext::new();
        let program = ctx.create_program(ProgramKind::Lit).unwrap();
        let mut mesh = triangle();
        mesh.load(&mut ctx).unwrap();
        let vertex_array = mesh.vertex_array().unwrap();

        {
            let mut bound = BoundProgram::bind(&mut ctx, program);
            mesh.draw(&mut bound).unwrap();
        }
        assert_eq!(ctx.draws(), vec![(vertex_array, 0, 3)]);
    }
}
