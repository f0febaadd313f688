use cgmath::{Matrix4, Vector3};
use log::debug;

use crate::gfx::{
    context::{
        BoundProgram, BufferHandle, CullingGuard, GpuContext, GpuError, ProgramHandle,
        ProgramKind, UniformSink, VertexArrayHandle, VertexLayout, DIFFUSE_UNIT,
    },
    resources::{Arena, GuiVertex, Texture, TextureId},
};

use super::renderer::RenderError;

/// A screen-space quad, in normalized device coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuiElement {
    /// Bottom-left corner.
    pub position: [f32; 2],
    pub size: [f32; 2],
    pub texture: Option<TextureId>,
}

impl GuiElement {
    pub fn new(position: [f32; 2], size: [f32; 2]) -> Self {
        Self {
            position,
            size,
            texture: None,
        }
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Maps the unit quad onto this element's rectangle.
    pub fn modelview(&self) -> Matrix4<f32> {
        let [x, y] = self.position;
        let [w, h] = self.size;
        Matrix4::from_translation(Vector3::new(x, y, 0.0)) * Matrix4::from_nonuniform_scale(w, h, 1.0)
    }
}

/// Draws GUI quads over the scene.
///
/// All elements share one unit quad; each draw only changes `modelview` and
/// the bound texture. Culling is off for the whole pass.
pub struct GuiRenderer {
    program: ProgramHandle,
    quad: Option<(BufferHandle, VertexArrayHandle)>,
    elements: Vec<GuiElement>,
}

impl GuiRenderer {
    pub fn new(ctx: &mut dyn GpuContext) -> Result<Self, GpuError> {
        let program = ctx.create_program(ProgramKind::Gui)?;
        Ok(Self {
            program,
            quad: None,
            elements: Vec::new(),
        })
    }

    /// Uploads the shared quad. Calling it again replaces the previous upload.
    pub fn load(&mut self, ctx: &mut dyn GpuContext) -> Result<(), GpuError> {
        self.unload(ctx);

        let quad = GuiVertex::unit_quad();
        let buffer = ctx.create_buffer(bytemuck::cast_slice(&quad))?;
        let vertex_array = match ctx.create_vertex_array(buffer, VertexLayout::Gui) {
            Ok(vertex_array) => vertex_array,
            Err(err) => {
                ctx.delete_buffer(buffer);
                return Err(err);
            }
        };
        self.quad = Some((buffer, vertex_array));
        Ok(())
    }

    pub fn unload(&mut self, ctx: &mut dyn GpuContext) {
        if let Some((buffer, vertex_array)) = self.quad.take() {
            if ctx.is_vertex_array(vertex_array) {
                ctx.delete_vertex_array(vertex_array);
            }
            if ctx.is_buffer(buffer) {
                ctx.delete_buffer(buffer);
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.quad.is_some()
    }

    pub fn add_element(&mut self, element: GuiElement) -> usize {
        self.elements.push(element);
        self.elements.len() - 1
    }

    pub fn elements(&self) -> &[GuiElement] {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut [GuiElement] {
        &mut self.elements
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Draws every element in order and returns how many were drawn.
    ///
    /// Culling is restored to its previous state on return, even when a draw
    /// fails halfway through.
    pub fn render(
        &self,
        ctx: &mut dyn GpuContext,
        textures: &Arena<Texture>,
    ) -> Result<usize, RenderError> {
        if self.elements.is_empty() {
            return Ok(0);
        }
        let (_, vertex_array) = self.quad.ok_or(RenderError::GuiNotLoaded)?;

        let mut culling = CullingGuard::disable(ctx);
        let mut program = BoundProgram::bind(&mut *culling, self.program);

        for element in &self.elements {
            let texture = element.texture.and_then(|id| textures.get(id));
            let handle = texture.and_then(Texture::handle);
            program.bind_texture(DIFFUSE_UNIT, handle);
            program.set_uniform("modelview", element.modelview().into());
            program.set_uniform("useTexture", handle.is_some().into());
            program.draw(vertex_array, GuiVertex::QUAD_VERTICES)?;
        }

        debug!("GUI pass drew {} element(s)", self.elements.len());
        Ok(self.elements.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::recording::{GpuCall, RecordingContext};
    use cgmath::Vector4;

    #[test]
    fn test_modelview_maps_unit_quad_to_rect() {
        let element = GuiElement::new([-1.0, 0.5], [0.5, 0.25]);
        let corner = element.modelview() * Vector4::new(1.0, 1.0, 0.0, 1.0);
        assert!((corner.x - -0.5).abs() < 1e-6);
        assert!((corner.y - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_load_twice_keeps_one_quad() {
        let mut ctx = RecordingContext::new();
        let mut gui = GuiRenderer::new(&mut ctx).unwrap();
        gui.load(&mut ctx).unwrap();
        gui.load(&mut ctx).unwrap();
        assert_eq!((ctx.live_buffers(), ctx.live_vertex_arrays()), (1, 1));

        gui.unload(&mut ctx);
        assert!(!gui.is_loaded());
        assert_eq!(ctx.live_buffers(), 0);
    }

    #[test]
    fn test_render_disables_then_restores_culling() {
        let mut ctx = RecordingContext::new();
        let mut gui = GuiRenderer::new(&mut ctx).unwrap();
        gui.load(&mut ctx).unwrap();
        gui.add_element(GuiElement::new([0.0, 0.0], [0.1, 0.1]));
        ctx.clear_calls();

        let drawn = gui.render(&mut ctx, &Arena::new()).unwrap();
        assert_eq!(drawn, 1);
        assert!(ctx.culling_enabled());
        assert_eq!(ctx.calls().first(), Some(&GpuCall::SetCulling(false)));
        assert_eq!(ctx.calls().last(), Some(&GpuCall::SetCulling(true)));
    }

    #[test]
    fn test_render_before_load_fails_without_touching_state() {
        let mut ctx = RecordingContext::new();
        let mut gui = GuiRenderer::new(&mut ctx).unwrap();
        gui.add_element(GuiElement::new([0.0, 0.0], [0.1, 0.1]));
        ctx.clear_calls();

        let err = gui.render(&mut ctx, &Arena::new()).unwrap_err();
        assert!(matches!(err, RenderError::GuiNotLoaded));
        assert!(ctx.calls().is_empty());
    }
}
