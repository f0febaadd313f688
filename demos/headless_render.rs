//! Renders the demo scene offscreen and writes the frame to a PNG.
//!
//! ```text
//! cargo run --example headless_render -- out.png
//! ```

use anyhow::Context;
use kiln::{
    gfx::context::PixelFormat,
    prelude::*,
};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

fn asset(name: &str) -> String {
    format!("{}/demos/assets/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// 8x8 two-tone checker used for the GUI badge.
fn checker() -> anyhow::Result<PixelSurface> {
    let pixels = (0..8u32 * 8)
        .flat_map(|i| {
            let (x, y) = (i % 8, i / 8);
            if (x + y) % 2 == 0 {
                [240, 240, 240, 255]
            } else {
                [40, 90, 200, 255]
            }
        })
        .collect();
    Ok(PixelSurface::new(8, 8, PixelFormat::Rgba8, pixels)?)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "headless_render.png".to_string());

    let mut ctx = WgpuContext::new_headless(WIDTH, HEIGHT)?;

    let camera = OrbitCamera::new(
        6.0,
        0.45,
        0.6,
        Vector3::new(0.0, 0.5, 0.0),
        WIDTH as f32 / HEIGHT as f32,
    );
    let mut scene = Scene::new(camera);

    // Each object picks its material through `usemtl`.
    scene.load_obj_with_materials(asset("scene.obj"), asset("scene.mtl"))?;

    scene.add_light(Light::directional(
        Vector3::new(-0.4, -1.0, -0.3),
        [1.0, 0.97, 0.9],
        0.8,
    ));
    scene.add_light(Light::point(Vector3::new(1.5, 2.0, 1.5), [0.9, 0.6, 0.3], 1.5));
    scene.add_light(Light::spot(
        Vector3::new(-2.0, 3.0, 2.0),
        Vector3::new(0.6, -1.0, -0.6),
        25.0,
        [0.4, 0.6, 1.0],
        2.0,
    ));

    let badge = scene.add_texture(Texture::from_surface(checker()?));
    scene.upload(&mut ctx)?;

    let renderer = Renderer::new(&mut ctx, RendererConfig::default())?;
    let mut gui = GuiRenderer::new(&mut ctx)?;
    gui.load(&mut ctx)?;
    gui.add_element(GuiElement::new([-0.95, 0.7], [0.2, 0.25]).with_texture(badge));

    let stats = renderer.render_frame(&mut ctx, &scene, &gui)?;
    log::info!(
        "Drew {} mesh(es), {} vertices, {} light(s), {} GUI element(s)",
        stats.meshes,
        stats.vertices,
        stats.lights,
        stats.gui_elements
    );

    let pixels = ctx.read_pixels()?;
    image::save_buffer(&output, &pixels, WIDTH, HEIGHT, image::ColorType::Rgba8)
        .with_context(|| format!("failed to write {}", output))?;
    log::info!("Wrote {}", output);

    gui.unload(&mut ctx);
    scene.release(&mut ctx);
    Ok(())
}
