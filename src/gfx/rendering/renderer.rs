use log::{info, warn};

use crate::gfx::{
    camera::Camera,
    context::{
        BoundProgram, GpuContext, GpuError, ProgramHandle, ProgramKind, UniformSink,
        DIFFUSE_UNIT, SPECULAR_UNIT,
    },
    resources::{Texture, TextureError},
    scene::Scene,
};

use super::{config::RendererConfig, gui::GuiRenderer};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("mesh {name:?} was drawn before being loaded")]
    MeshNotLoaded { name: Option<String> },
    #[error("GUI quad was drawn before being loaded")]
    GuiNotLoaded,
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Texture(#[from] TextureError),
}

/// What one call to [`Renderer::render_frame`] drew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub meshes: usize,
    pub vertices: usize,
    pub lights: usize,
    pub gui_elements: usize,
}

/// Draws a [`Scene`] with the lit program
pub struct Renderer {
    program: ProgramHandle,
    config: RendererConfig,
}

impl Renderer {
    pub fn new(ctx: &mut dyn GpuContext, config: RendererConfig) -> Result<Self, RenderError> {
        let program = ctx.create_program(ProgramKind::Lit)?;
        ctx.set_clear_color(config.clear_color);
        info!(
            "Renderer ready: program {:?}, up to {} light(s)",
            program, config.max_lights
        );
        Ok(Self { program, config })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    /// Draws every mesh of `scene`, in insertion order.
    ///
    /// The program stays bound for the whole pass and is unbound before
    /// returning, on success and on error alike.
    pub fn render(
        &self,
        ctx: &mut dyn GpuContext,
        scene: &Scene,
    ) -> Result<FrameStats, RenderError> {
        let mut program = BoundProgram::bind(ctx, self.program);

        let camera = &scene.camera;
        let eye: [f32; 3] = camera.eye_position().into();
        program.set_uniform("projection", camera.projection_matrix().into());
        program.set_uniform("modelview", camera.view_matrix().into());
        program.set_uniform("cameraPosition", eye.into());

        let lights = scene.lights.len().min(self.config.max_lights);
        if scene.lights.len() > lights {
            warn!(
                "{} light(s) in scene, only the first {} are rendered",
                scene.lights.len(),
                lights
            );
        }
        for (slot, light) in scene.lights.iter().take(lights).enumerate() {
            light.send_uniforms(&mut program, slot);
        }
        program.set_uniform("lightCount", (lights as i32).into());

        let mut stats = FrameStats {
            lights,
            ..FrameStats::default()
        };
        for (_, mesh) in scene.meshes.iter() {
            let material = scene
                .material_for(mesh)
                .unwrap_or(&self.config.default_material);

            let diffuse = material
                .diffuse_texture()
                .or(mesh.texture())
                .and_then(|id| scene.textures.get(id));
            let specular = material
                .specular_texture()
                .and_then(|id| scene.textures.get(id));
            let use_texture = bind_unit(&mut program, DIFFUSE_UNIT, diffuse);
            let use_specular_texture = bind_unit(&mut program, SPECULAR_UNIT, specular);

            material.send_uniforms(&mut program);
            program.set_uniform("useTexture", use_texture.into());
            program.set_uniform("useSpecularTexture", use_specular_texture.into());

            mesh.draw(&mut program)?;
            stats.meshes += 1;
            stats.vertices += mesh.vertex_count();
        }

        drop(program);
        Ok(stats)
    }

    /// Runs the scene pass then the GUI pass inside one frame.
    pub fn render_frame(
        &self,
        ctx: &mut dyn GpuContext,
        scene: &Scene,
        gui: &GuiRenderer,
    ) -> Result<FrameStats, RenderError> {
        ctx.begin_frame()?;
        let mut stats = self.render(ctx, scene)?;
        stats.gui_elements = gui.render(ctx, &scene.textures)?;
        ctx.end_frame()?;
        Ok(stats)
    }
}

/// Binds `texture` to `unit`, or clears the unit. Returns whether the
/// shader should sample it.
fn bind_unit(program: &mut BoundProgram, unit: u32, texture: Option<&Texture>) -> bool {
    match texture {
        Some(texture) => {
            texture.bind(program, unit);
            texture.is_loaded()
        }
        None => {
            program.bind_texture(unit, None);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assets::parse_and_flatten,
        gfx::{
            camera::OrbitCamera,
            context::UniformValue,
            recording::{GpuCall, RecordingContext},
            resources::{Light, Material, PixelSurface},
        },
    };
    use cgmath::Vector3;

    fn scene_with_triangle() -> Scene {
        let mut scene = Scene::new(OrbitCamera::new(4.0, 0.0, 0.0, Vector3::new(0.0, 0.0, 0.0), 1.0));
        scene.add_flat_meshes(
            parse_and_flatten("o tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap(),
        );
        scene
    }

    #[test]
    fn test_camera_uniforms_precede_lights() {
        let mut ctx = RecordingContext::new();
        let mut scene = scene_with_triangle();
        scene.add_light(Light::point(Vector3::new(0.0, 2.0, 0.0), [1.0; 3], 1.0));
        scene.upload(&mut ctx).unwrap();
        let renderer = Renderer::new(&mut ctx, RendererConfig::default()).unwrap();

        ctx.clear_calls();
        let stats = renderer.render(&mut ctx, &scene).unwrap();
        assert_eq!(stats.meshes, 1);
        assert_eq!(stats.vertices, 3);

        let names = ctx.uniform_names();
        let position = |name: &str| names.iter().position(|n| *n == name).unwrap();
        assert!(position("projection") < position("lights[0].type"));
        assert!(position("cameraPosition") < position("lightCount"));
        assert!(position("lightCount") < position("material.ambient"));
        assert!(matches!(ctx.uniform("lightCount"), Some(UniformValue::Int(1))));
    }

    #[test]
    fn test_default_material_without_link() {
        let mut ctx = RecordingContext::new();
        let mut scene = scene_with_triangle();
        scene.upload(&mut ctx).unwrap();
        let mut fallback = Material::default();
        fallback.set_alpha(0.25);
        let renderer = Renderer::new(
            &mut ctx,
            RendererConfig::default().with_default_material(fallback),
        )
        .unwrap();

        renderer.render(&mut ctx, &scene).unwrap();
        assert!(matches!(ctx.uniform("material.alpha"), Some(UniformValue::Float(a)) if a == 0.25));
        assert!(matches!(ctx.uniform("useTexture"), Some(UniformValue::Int(0))));
    }

    #[test]
    fn test_mesh_texture_used_when_material_has_none() {
        let mut ctx = RecordingContext::new();
        let mut scene = scene_with_triangle();
        let texture = scene.add_texture(Texture::from_surface(PixelSurface::solid(1, 1, [255; 4])));
        let mesh_id = scene.meshes.iter().next().map(|(id, _)| id).unwrap();
        scene.meshes.get_mut(mesh_id).unwrap().set_texture(Some(texture));
        scene.upload(&mut ctx).unwrap();
        let handle = scene.textures.get(texture).unwrap().handle();

        let renderer = Renderer::new(&mut ctx, RendererConfig::default()).unwrap();
        ctx.clear_calls();
        renderer.render(&mut ctx, &scene).unwrap();

        assert!(ctx
            .calls()
            .contains(&GpuCall::BindTexture(DIFFUSE_UNIT, handle)));
        assert!(matches!(ctx.uniform("useTexture"), Some(UniformValue::Int(1))));
        assert_eq!(ctx.bound_program(), None);
    }

    #[test]
    fn test_unloaded_mesh_reports_and_unbinds() {
        let mut ctx = RecordingContext::new();
        let scene = scene_with_triangle();
        let renderer = Renderer::new(&mut ctx, RendererConfig::default()).unwrap();

        let err = renderer.render(&mut ctx, &scene).unwrap_err();
        assert!(matches!(err, RenderError::MeshNotLoaded { name: Some(ref n) } if n == "tri"));
        assert_eq!(ctx.bound_program(), None);
    }
}
