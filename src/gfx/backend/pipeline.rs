//! Render pipeline construction for the wgpu backend
//!
//! Each program kind is compiled into two pipelines that differ only in
//! their cull mode, so toggling culling between draws is a pipeline switch.

use wgpu::*;

use crate::gfx::{
    context::ProgramKind,
    resources::{GuiVertex, Vertex},
};

/// Format of the offscreen color target and of render-texture attachments.
pub const COLOR_FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;
pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

pub const SCENE_SHADER: &str = include_str!("scene.wgsl");
pub const GUI_SHADER: &str = include_str!("gui.wgsl");

/// Configuration for creating a render pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub cull_mode: Option<Face>,
    pub depth_write_enabled: bool,
    pub depth_compare: CompareFunction,
    pub blend: Option<BlendState>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label: "Default Pipeline".to_string(),
            cull_mode: Some(Face::Back),
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            blend: Some(BlendState::ALPHA_BLENDING),
        }
    }
}

impl PipelineConfig {
    /// Default render state for programs of `kind`.
    pub fn for_program(kind: ProgramKind) -> Self {
        match kind {
            ProgramKind::Lit => Self::default().with_label("Lit Pipeline"),
            // GUI quads draw over the scene regardless of depth.
            ProgramKind::Gui => Self {
                label: "GUI Pipeline".to_string(),
                depth_write_enabled: false,
                depth_compare: CompareFunction::Always,
                ..Self::default()
            },
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }
}

/// The culled and unculled pipelines of one program.
pub struct PipelinePair {
    pub culled: RenderPipeline,
    pub unculled: RenderPipeline,
}

impl PipelinePair {
    pub fn get(&self, culling: bool) -> &RenderPipeline {
        if culling {
            &self.culled
        } else {
            &self.unculled
        }
    }
}

pub fn create_pipelines(
    device: &Device,
    kind: ProgramKind,
    uniform_layout: &BindGroupLayout,
    texture_layout: &BindGroupLayout,
) -> PipelinePair {
    let (label, source) = match kind {
        ProgramKind::Lit => ("scene", SCENE_SHADER),
        ProgramKind::Gui => ("gui", GUI_SHADER),
    };
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some(label),
        source: ShaderSource::Wgsl(source.into()),
    });
    let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some(&format!("{} Layout", label)),
        bind_group_layouts: &[uniform_layout, texture_layout],
        push_constant_ranges: &[],
    });

    let config = PipelineConfig::for_program(kind);
    let culled = create_pipeline(device, kind, &shader, &layout, &config);
    let unculled = create_pipeline(
        device,
        kind,
        &shader,
        &layout,
        &config.clone().with_cull_mode(None),
    );

    PipelinePair { culled, unculled }
}

fn create_pipeline(
    device: &Device,
    kind: ProgramKind,
    shader: &ShaderModule,
    layout: &PipelineLayout,
    config: &PipelineConfig,
) -> RenderPipeline {
    let vertex_buffers = match kind {
        ProgramKind::Lit => [Vertex::desc()],
        ProgramKind::Gui => [GuiVertex::desc()],
    };

    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(&config.label),
        layout: Some(layout),
        vertex: VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &vertex_buffers,
            compilation_options: PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format: COLOR_FORMAT,
                blend: config.blend,
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: PipelineCompilationOptions::default(),
        }),
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            cull_mode: config.cull_mode,
            polygon_mode: PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: config.depth_write_enabled,
            depth_compare: config.depth_compare,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
