//! wgpu implementation of [`GpuContext`]
//!
//! Renders into an offscreen color target (or a texture attached to a
//! framebuffer). Uniforms are staged per program on the CPU; every draw call
//! snapshots the staged block into a dynamic uniform ring and records a
//! [`DrawCommand`]. [`GpuContext::end_frame`] uploads the snapshots and
//! replays the commands in a single render pass.

pub mod pipeline;
pub mod uniform_layout;

use std::collections::HashMap;

use anyhow::Context;
use log::{debug, info, warn};
use wgpu::util::DeviceExt;

use crate::{
    gfx::context::{
        BufferHandle, GpuContext, GpuError, PixelFormat, ProgramHandle, ProgramKind, TextureDesc,
        TextureHandle, UniformValue, VertexArrayHandle, VertexLayout, TEXTURE_UNITS,
    },
    wgpu_utils::{self, UniformRing},
};

use pipeline::{PipelinePair, COLOR_FORMAT, DEPTH_FORMAT};

const INITIAL_UNIFORM_CAPACITY: u64 = 64;

struct Program {
    kind: ProgramKind,
    staging: Vec<u8>,
    ring: UniformRing,
    uniform_layout: wgpu::BindGroupLayout,
    pipelines: PipelinePair,
}

struct VertexArray {
    buffer: u32,
    layout: VertexLayout,
}

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    desc: TextureDesc,
}

/// One recorded draw, replayed at the end of the frame.
#[derive(Debug, Clone, Copy)]
struct DrawCommand {
    program: u32,
    culling: bool,
    vertex_array: u32,
    first: u32,
    count: u32,
    uniform_offset: u32,
    textures: [Option<u32>; TEXTURE_UNITS],
}

pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,

    width: u32,
    height: u32,
    color: GpuTexture,
    depth: (wgpu::Texture, wgpu::TextureView),
    clear_color: wgpu::Color,

    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    white: GpuTexture,

    next_id: u32,
    buffers: HashMap<u32, wgpu::Buffer>,
    vertex_arrays: HashMap<u32, VertexArray>,
    textures: HashMap<u32, GpuTexture>,
    programs: HashMap<u32, Program>,
    attachments: HashMap<(u32, u32), u32>,

    framebuffer: Option<u32>,
    current_program: Option<u32>,
    bound_textures: [Option<u32>; TEXTURE_UNITS],
    culling: bool,
    frame: Option<Vec<DrawCommand>>,
}

impl WgpuContext {
    /// Creates a context on the default adapter with no surface.
    pub fn new_headless(width: u32, height: u32) -> anyhow::Result<Self> {
        pollster::block_on(Self::request(width, height))
    }

    async fn request(width: u32, height: u32) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to request a GPU adapter")?;
        info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("kiln device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to request a GPU device")?;

        Self::from_device(device, queue, width, height)
    }

    /// Wraps an existing device, e.g. one shared with a windowing layer.
    pub fn from_device(
        device: wgpu::Device,
        queue: wgpu::Queue,
        width: u32,
        height: u32,
    ) -> anyhow::Result<Self> {
        let target = TextureDesc {
            width,
            height,
            format: PixelFormat::Rgba8,
        };
        target.check_extent()?;

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
            entries: &[
                wgpu_utils::entry(0, wgpu_utils::texture_2d()),
                wgpu_utils::entry(1, wgpu_utils::texture_2d()),
                wgpu_utils::entry(
                    2,
                    wgpu_utils::sampler(wgpu::SamplerBindingType::Filtering),
                ),
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Texture Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let white_desc = TextureDesc {
            width: 1,
            height: 1,
            format: PixelFormat::Rgba8,
        };
        let white = upload_texture(&device, &queue, &white_desc, &[255; 4], "White Texture");
        let color = render_texture(&device, &target, "Color Target");
        let depth = depth_texture(&device, width, height);

        Ok(Self {
            device,
            queue,
            width,
            height,
            color,
            depth,
            clear_color: wgpu::Color::BLACK,
            texture_layout,
            sampler,
            white,
            next_id: 1,
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            textures: HashMap::new(),
            programs: HashMap::new(),
            attachments: HashMap::new(),
            framebuffer: None,
            current_program: None,
            bound_textures: [None; TEXTURE_UNITS],
            culling: true,
            frame: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Recreates the default color and depth targets.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        let target = TextureDesc {
            width,
            height,
            format: PixelFormat::Rgba8,
        };
        target.check_extent()?;
        self.width = width;
        self.height = height;
        self.color = render_texture(&self.device, &target, "Color Target");
        self.depth = depth_texture(&self.device, width, height);
        Ok(())
    }

    /// Draws subsequent frames into attachment 0 of `framebuffer`, or into
    /// the default target when `None`.
    pub fn bind_framebuffer(&mut self, framebuffer: Option<u32>) {
        self.framebuffer = framebuffer;
    }

    /// Reads back the default color target as tightly packed RGBA rows.
    pub fn read_pixels(&self) -> anyhow::Result<Vec<u8>> {
        let unpadded = 4 * self.width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_buffer"),
            size: padded as u64 * self.height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback_encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.color.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(self.height),
                },
            },
            extent(self.width, self.height),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging_buffer.slice(..);
        let (tx, rx) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::MaintainBase::Wait);

        futures::executor::block_on(rx)
            .context("readback was cancelled")?
            .context("failed to map the readback buffer")?;

        let mapped = slice.get_mapped_range();
        let pixels = mapped
            .chunks_exact(padded as usize)
            .flat_map(|row| &row[..unpadded as usize])
            .copied()
            .collect();
        drop(mapped);
        staging_buffer.unmap();
        Ok(pixels)
    }

    fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn texture_bind_group(&self, textures: [Option<u32>; TEXTURE_UNITS]) -> wgpu::BindGroup {
        let view = |slot: Option<u32>| {
            slot.and_then(|id| self.textures.get(&id))
                .map_or(&self.white.view, |texture| &texture.view)
        };
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Texture Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view(textures[0])),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view(textures[1])),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    fn target_size(&self) -> (u32, u32) {
        self.framebuffer_texture()
            .map_or((self.width, self.height), |t| (t.desc.width, t.desc.height))
    }

    fn framebuffer_texture(&self) -> Option<&GpuTexture> {
        let framebuffer = self.framebuffer?;
        let id = self.attachments.get(&(framebuffer, 0))?;
        self.textures.get(id)
    }

    fn submit(&mut self, draws: Vec<DrawCommand>) {
        for program in self.programs.values_mut() {
            program.ring.upload(&self.device, &self.queue);
        }

        let uniform_groups: HashMap<u32, wgpu::BindGroup> = self
            .programs
            .iter()
            .map(|(&id, program)| {
                let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Uniform Bind Group"),
                    layout: &program.uniform_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: program.ring.binding_resource(),
                    }],
                });
                (id, group)
            })
            .collect();

        let mut texture_groups = HashMap::new();
        for draw in &draws {
            if !texture_groups.contains_key(&draw.textures) {
                texture_groups.insert(draw.textures, self.texture_bind_group(draw.textures));
            }
        }

        let (width, height) = self.target_size();
        let depth_size = self.depth.0.size();
        if (depth_size.width, depth_size.height) != (width, height) {
            self.depth = depth_texture(&self.device, width, height);
        }
        let color_view = self
            .framebuffer_texture()
            .map_or(&self.color.view, |texture| &texture.view);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.1,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for draw in &draws {
                let Some(program) = self.programs.get(&draw.program) else {
                    warn!("program {} was deleted before submission", draw.program);
                    continue;
                };
                let Some(buffer) = self
                    .vertex_arrays
                    .get(&draw.vertex_array)
                    .and_then(|vao| self.buffers.get(&vao.buffer))
                else {
                    warn!(
                        "vertex array {} was deleted before submission",
                        draw.vertex_array
                    );
                    continue;
                };
                let (Some(uniforms), Some(textures)) = (
                    uniform_groups.get(&draw.program),
                    texture_groups.get(&draw.textures),
                ) else {
                    continue;
                };

                pass.set_pipeline(program.pipelines.get(draw.culling));
                pass.set_bind_group(0, uniforms, &[draw.uniform_offset]);
                pass.set_bind_group(1, textures, &[]);
                pass.set_vertex_buffer(0, buffer.slice(..));
                pass.draw(draw.first..draw.first + draw.count, 0..1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        debug!("submitted frame with {} draw(s)", draws.len());
    }
}

impl GpuContext for WgpuContext {
    fn create_buffer(&mut self, data: &[u8]) -> Result<BufferHandle, GpuError> {
        // Zero-sized buffers cannot be sliced for drawing.
        let contents = if data.is_empty() { &[0u8; 4][..] } else { data };
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents,
                usage: wgpu::BufferUsages::VERTEX,
            });
        let id = self.next();
        self.buffers.insert(id, buffer);
        Ok(BufferHandle(id))
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        // Dropping the handle frees the buffer once queued work is done.
        self.buffers.remove(&buffer.0);
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
        let id = self.next();
        self.vertex_arrays.insert(
            id,
            VertexArray {
                buffer: buffer.0,
                layout,
            },
        );
        Ok(VertexArrayHandle(id))
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.vertex_arrays.remove(&vertex_array.0);
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
        let texture = upload_texture(&self.device, &self.queue, desc, pixels, "Image Texture");
        let id = self.next();
        self.textures.insert(id, texture);
        Ok(TextureHandle(id))
    }

    fn update_texture(&mut self, texture: TextureHandle, pixels: &[u8]) -> Result<(), GpuError> {
        let target = self
            .textures
            .get(&texture.0)
            .ok_or(GpuError::UnknownHandle {
                kind: "texture",
                id: texture.0,
            })?;
        if pixels.len() != target.desc.byte_len() {
            return Err(GpuError::TextureSize {
                expected: target.desc.byte_len(),
                actual: pixels.len(),
            });
        }
        write_texture(&self.queue, target, pixels);
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture.0);
        self.attachments.retain(|_, attached| *attached != texture.0);
    }

    fn create_render_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, GpuError> {
        desc.check_extent()?;
        let texture = render_texture(&self.device, desc, "Render Texture");
        let id = self.next();
        self.textures.insert(id, texture);
        Ok(TextureHandle(id))
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
        if index != 0 {
            debug!(
                "texture {} attached at index {}; only attachment 0 is rendered",
                texture.0, index
            );
        }
        self.attachments.insert((framebuffer, index), texture.0);
        Ok(())
    }

    fn create_program(&mut self, kind: ProgramKind) -> Result<ProgramHandle, GpuError> {
        let block_size = uniform_layout::block_size(kind) as u64;
        let uniform_layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Uniform Bind Group Layout"),
                entries: &[wgpu_utils::entry(
                    0,
                    wgpu_utils::dynamic_uniform(block_size),
                )],
            });
        let pipelines = pipeline::create_pipelines(
            &self.device,
            kind,
            &uniform_layout,
            &self.texture_layout,
        );
        let ring = UniformRing::new(
            &self.device,
            &format!("{:?}", kind),
            block_size,
            INITIAL_UNIFORM_CAPACITY,
        );

        let id = self.next();
        self.programs.insert(
            id,
            Program {
                kind,
                staging: vec![0; block_size as usize],
                ring,
                uniform_layout,
                pipelines,
            },
        );
        Ok(ProgramHandle(id))
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.current_program = program.map(|p| p.0);
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        let Some(program) = self
            .current_program
            .and_then(|id| self.programs.get_mut(&id))
        else {
            warn!("uniform `{}` set with no program bound", name);
            return;
        };
        if let Err(err) = uniform_layout::write(program.kind, &mut program.staging, name, value) {
            warn!("{}", err);
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        match self.bound_textures.get_mut(unit as usize) {
            Some(slot) => *slot = texture.map(|t| t.0),
            None => warn!("texture unit {} is out of range", unit),
        }
    }

    fn set_culling(&mut self, enabled: bool) {
        self.culling = enabled;
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
        let program_id = self.current_program.ok_or(GpuError::NoProgramBound)?;
        let program = self
            .programs
            .get_mut(&program_id)
            .ok_or(GpuError::UnknownHandle {
                kind: "program",
                id: program_id,
            })?;
        let vao = self
            .vertex_arrays
            .get(&vertex_array.0)
            .ok_or(GpuError::UnknownHandle {
                kind: "vertex array",
                id: vertex_array.0,
            })?;

        let expected = match program.kind {
            ProgramKind::Lit => VertexLayout::Scene,
            ProgramKind::Gui => VertexLayout::Gui,
        };
        if vao.layout != expected {
            return Err(GpuError::Draw(format!(
                "{:?} program cannot draw a {:?} vertex array",
                program.kind, vao.layout
            )));
        }
        if count == 0 {
            return Ok(());
        }

        let uniform_offset = program.ring.push(&program.staging);
        let command = DrawCommand {
            program: program_id,
            culling: self.culling,
            vertex_array: vertex_array.0,
            first,
            count,
            uniform_offset,
            textures: self.bound_textures,
        };
        self.frame.get_or_insert_with(Vec::new).push(command);
        Ok(())
    }

    fn set_clear_color(&mut self, rgba: [f32; 4]) {
        let [r, g, b, a] = rgba.map(f64::from);
        self.clear_color = wgpu::Color { r, g, b, a };
    }

    fn begin_frame(&mut self) -> Result<(), GpuError> {
        for program in self.programs.values_mut() {
            program.ring.clear();
        }
        self.frame = Some(Vec::new());
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), GpuError> {
        let draws = self.frame.take().ok_or(GpuError::NoFrame)?;
        self.submit(draws);
        for program in self.programs.values_mut() {
            program.ring.clear();
        }
        Ok(())
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

fn depth_texture(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: extent(width, height),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn render_texture(device: &wgpu::Device, desc: &TextureDesc, label: &str) -> GpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: extent(desc.width, desc.height),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: COLOR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        texture,
        view,
        desc: TextureDesc {
            format: PixelFormat::Rgba8,
            ..*desc
        },
    }
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    desc: &TextureDesc,
    pixels: &[u8],
    label: &str,
) -> GpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: extent(desc.width, desc.height),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: COLOR_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let uploaded = GpuTexture {
        texture,
        view,
        desc: *desc,
    };
    write_texture(queue, &uploaded, pixels);
    uploaded
}

// wgpu has no 3-channel format; RGB data is widened to opaque RGBA.
fn write_texture(queue: &wgpu::Queue, target: &GpuTexture, pixels: &[u8]) {
    let rgba: Vec<u8>;
    let data = match target.desc.format {
        PixelFormat::Rgba8 => pixels,
        PixelFormat::Rgb8 => {
            rgba = pixels
                .chunks_exact(3)
                .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 255])
                .collect();
            &rgba
        }
    };

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &target.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * target.desc.width),
            rows_per_image: Some(target.desc.height),
        },
        extent(target.desc.width, target.desc.height),
    );
}
