//! Texture resources
//!
//! A [`Texture`] is backed by one of three sources: an image file decoded
//! with the `image` crate, a caller-owned [`PixelSurface`], or an empty
//! render target that gets attached to a framebuffer. Image rows are flipped
//! on upload by default so the first row of the file ends up at `v = 1`,
//! matching the texcoords `.obj` exporters write.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::gfx::context::{
    BoundProgram, GpuContext, GpuError, PixelFormat, TextureDesc, TextureHandle,
};

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to decode {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("pixel surface holds {actual} bytes, expected {expected}")]
    SurfaceSize { expected: usize, actual: usize },
    #[error("update is {actual:?}, texture is {expected:?}")]
    Mismatch {
        expected: TextureDesc,
        actual: TextureDesc,
    },
    #[error("texture is not loaded")]
    NotLoaded,
    #[error("render targets cannot be updated from pixels")]
    RenderTarget,
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// Tightly packed pixel rows, first row on top.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelSurface {
    desc: TextureDesc,
    pixels: Vec<u8>,
}

impl PixelSurface {
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Vec<u8>,
    ) -> Result<Self, TextureError> {
        let desc = TextureDesc {
            width,
            height,
            format,
        };
        if pixels.len() != desc.byte_len() {
            return Err(TextureError::SurfaceSize {
                expected: desc.byte_len(),
                actual: pixels.len(),
            });
        }
        Ok(Self { desc, pixels })
    }

    /// A surface filled with a single RGBA color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        Self {
            desc: TextureDesc {
                width,
                height,
                format: PixelFormat::Rgba8,
            },
            pixels: rgba.repeat(count),
        }
    }

    pub fn from_image(image: image::DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            desc: TextureDesc {
                width,
                height,
                format: PixelFormat::Rgba8,
            },
            pixels: rgba.into_raw(),
        }
    }

    pub fn desc(&self) -> TextureDesc {
        self.desc
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Copy with the row order reversed.
    pub fn flipped_vertically(&self) -> Self {
        let row = self.desc.width as usize * self.desc.format.bytes_per_pixel();
        let pixels = if row == 0 {
            Vec::new()
        } else {
            self.pixels.chunks_exact(row).rev().flatten().copied().collect()
        };
        Self {
            desc: self.desc,
            pixels,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TextureSource {
    File(PathBuf),
    Pixels(PixelSurface),
    RenderTarget { width: u32, height: u32 },
}

#[derive(Debug)]
pub struct Texture {
    source: TextureSource,
    flip: bool,
    handle: Option<TextureHandle>,
    desc: Option<TextureDesc>,
}

impl Texture {
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self::new(TextureSource::File(path.as_ref().to_path_buf()))
    }

    pub fn from_surface(surface: PixelSurface) -> Self {
        Self::new(TextureSource::Pixels(surface))
    }

    pub fn render_target(width: u32, height: u32) -> Self {
        Self::new(TextureSource::RenderTarget { width, height })
    }

    fn new(source: TextureSource) -> Self {
        Self {
            source,
            flip: true,
            handle: None,
            desc: None,
        }
    }

    /// Whether pixel data is flipped vertically on upload (default `true`).
    pub fn with_flip(mut self, flip: bool) -> Self {
        self.flip = flip;
        self
    }

    pub fn source(&self) -> &TextureSource {
        &self.source
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            TextureSource::File(path) => Some(path),
            _ => None,
        }
    }

    pub fn handle(&self) -> Option<TextureHandle> {
        self.handle
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    pub fn width(&self) -> u32 {
        self.desc.map_or(0, |d| d.width)
    }

    pub fn height(&self) -> u32 {
        self.desc.map_or(0, |d| d.height)
    }

    pub fn format(&self) -> Option<PixelFormat> {
        self.desc.map(|d| d.format)
    }

    /// Uploads the texture, releasing any handle from a previous load.
    pub fn load(&mut self, ctx: &mut dyn GpuContext) -> Result<(), TextureError> {
        self.unload(ctx);

        let (handle, desc) = match &self.source {
            TextureSource::File(path) => {
                let image = image::open(path).map_err(|source| TextureError::Image {
                    path: path.clone(),
                    source,
                })?;
                let surface = self.oriented(&PixelSurface::from_image(image));
                let handle = ctx.create_texture(&surface.desc(), surface.pixels())?;
                info!(
                    "Loaded texture {} ({}x{})",
                    path.display(),
                    surface.desc().width,
                    surface.desc().height
                );
                (handle, surface.desc())
            }
            TextureSource::Pixels(surface) => {
                let surface = self.oriented(surface);
                let handle = ctx.create_texture(&surface.desc(), surface.pixels())?;
                (handle, surface.desc())
            }
            TextureSource::RenderTarget { width, height } => {
                let desc = TextureDesc {
                    width: *width,
                    height: *height,
                    format: PixelFormat::Rgba8,
                };
                (ctx.create_render_texture(&desc)?, desc)
            }
        };

        debug!("texture {:?} created as {:?}", handle, desc);
        self.handle = Some(handle);
        self.desc = Some(desc);
        Ok(())
    }

    /// Replaces the pixels of a loaded texture.
    ///
    /// The surface must have the same dimensions and pixel format as the
    /// texture; anything else is rejected without touching the GPU.
    pub fn update(
        &mut self,
        ctx: &mut dyn GpuContext,
        surface: &PixelSurface,
    ) -> Result<(), TextureError> {
        if matches!(self.source, TextureSource::RenderTarget { .. }) {
            return Err(TextureError::RenderTarget);
        }
        let (Some(handle), Some(desc)) = (self.handle, self.desc) else {
            return Err(TextureError::NotLoaded);
        };
        if surface.desc() != desc {
            return Err(TextureError::Mismatch {
                expected: desc,
                actual: surface.desc(),
            });
        }

        let surface = self.oriented(surface);
        ctx.update_texture(handle, surface.pixels())?;
        Ok(())
    }

    /// Uses this texture as color attachment `index` of `framebuffer`.
    pub fn link_to_framebuffer(
        &self,
        ctx: &mut dyn GpuContext,
        framebuffer: u32,
        index: u32,
    ) -> Result<(), TextureError> {
        let handle = self.handle.ok_or(TextureError::NotLoaded)?;
        ctx.attach_to_framebuffer(handle, framebuffer, index)?;
        Ok(())
    }

    /// Binds to `unit` of the bound program. Unloaded textures bind nothing.
    pub fn bind(&self, program: &mut BoundProgram, unit: u32) {
        if self.handle.is_none() {
            warn!("binding a texture that was never loaded");
        }
        program.bind_texture(unit, self.handle);
    }

    pub fn unload(&mut self, ctx: &mut dyn GpuContext) {
        if let Some(handle) = self.handle.take() {
            ctx.delete_texture(handle);
        }
        self.desc = None;
    }

    fn oriented(&self, surface: &PixelSurface) -> PixelSurface {
        if self.flip {
            surface.flipped_vertically()
        } else {
            surface.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::recording::{GpuCall, RecordingContext};

    fn checker() -> PixelSurface {
        PixelSurface::new(
            1,
            2,
            PixelFormat::Rgba8,
            vec![255, 0, 0, 255, 0, 0, 255, 255],
        )
        .unwrap()
    }

    #[test]
    fn test_surface_length_is_checked() {
        assert!(matches!(
            PixelSurface::new(2, 2, PixelFormat::Rgb8, vec![0; 11]),
            Err(TextureError::SurfaceSize {
                expected: 12,
                actual: 11
            })
        ));
    }

    #[test]
    fn test_flip_reverses_rows() {
        let flipped = checker().flipped_vertically();
        assert_eq!(flipped.pixels(), &[0, 0, 255, 255, 255, 0, 0, 255]);
    }

    #[test]
    fn test_load_twice_keeps_one_handle() {
        let mut ctx = RecordingContext::new();
        let mut texture = Texture::from_surface(checker());
        texture.load(&mut ctx).unwrap();
        texture.load(&mut ctx).unwrap();

        assert_eq!(ctx.live_textures(), 1);
        assert_eq!((texture.width(), texture.height()), (1, 2));
    }

    #[test]
    fn test_update_rejects_mismatched_surface() {
        let mut ctx = RecordingContext::new();
        let mut texture = Texture::from_surface(checker());
        texture.load(&mut ctx).unwrap();

        let wrong_size = PixelSurface::solid(2, 2, [0, 0, 0, 255]);
        assert!(matches!(
            texture.update(&mut ctx, &wrong_size),
            Err(TextureError::Mismatch { .. })
        ));
        let wrong_format = PixelSurface::new(1, 2, PixelFormat::Rgb8, vec![0; 6]).unwrap();
        assert!(matches!(
            texture.update(&mut ctx, &wrong_format),
            Err(TextureError::Mismatch { .. })
        ));
        assert!(!ctx
            .calls()
            .iter()
            .any(|call| matches!(call, GpuCall::UpdateTexture(_))));

        texture.update(&mut ctx, &checker()).unwrap();
    }

    #[test]
    fn test_update_before_load() {
        let mut ctx = RecordingContext::new();
        let mut texture = Texture::from_surface(checker());
        assert!(matches!(
            texture.update(&mut ctx, &checker()),
            Err(TextureError::NotLoaded)
        ));
    }

    #[test]
    fn test_render_target_links_to_framebuffer() {
        let mut ctx = RecordingContext::new();
        let mut target = Texture::render_target(64, 32);
        assert!(matches!(
            target.link_to_framebuffer(&mut ctx, 1, 0),
            Err(TextureError::NotLoaded)
        ));

        target.load(&mut ctx).unwrap();
        target.link_to_framebuffer(&mut ctx, 1, 2).unwrap();
        assert!(ctx.is_attached(1, 2));
    }

    #[test]
    fn test_missing_file_is_an_image_error() {
        let mut ctx = RecordingContext::new();
        let mut texture = Texture::from_file("/nonexistent/kiln/texture.png");
        assert!(matches!(
            texture.load(&mut ctx),
            Err(TextureError::Image { .. })
        ));
        assert!(!texture.is_loaded());
    }
}
