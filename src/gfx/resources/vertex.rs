//! # Vertex Data Structures
//!
//! GPU-compatible vertex formats for scene meshes and GUI quads. Both are
//! `#[repr(C)]` and `Pod` so vertex slices can be handed to the GPU with
//! [`bytemuck::cast_slice`].

use crate::assets::FlatMesh;

/// One corner of a scene triangle.
///
/// Matches [`VertexLayout::Scene`](crate::gfx::context::VertexLayout::Scene):
/// 32 bytes, position at location 0, color at 1, texcoord at 2.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    /// Returns the vertex buffer layout for wgpu rendering.
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    /// Interleaves the parallel arrays of a flat mesh.
    pub fn interleave(mesh: &FlatMesh) -> Vec<Vertex> {
        mesh.positions()
            .chunks_exact(3)
            .zip(mesh.colors().chunks_exact(3))
            .zip(mesh.texcoords().chunks_exact(2))
            .map(|((position, color), uv)| Vertex {
                position: [position[0], position[1], position[2]],
                color: [color[0], color[1], color[2]],
                tex_coords: [uv[0], uv[1]],
            })
            .collect()
    }
}

/// Screen-space vertex used by the GUI pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GuiVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

impl GuiVertex {
    /// Vertices in [`GuiVertex::unit_quad`].
    pub const QUAD_VERTICES: u32 = 6;

    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GuiVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    /// Two triangles covering the unit square `[0, 1]²`, texcoords flipped
    /// so the image's first row lands at the top.
    pub fn unit_quad() -> [GuiVertex; 6] {
        let corner = |x: f32, y: f32| GuiVertex {
            position: [x, y],
            tex_coords: [x, 1.0 - y],
        };
        [
            corner(0.0, 0.0),
            corner(1.0, 0.0),
            corner(1.0, 1.0),
            corner(0.0, 0.0),
            corner(1.0, 1.0),
            corner(0.0, 1.0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assets::parse_and_flatten, gfx::context::VertexLayout};

    #[test]
    fn test_sizes_match_layouts() {
        assert_eq!(std::mem::size_of::<Vertex>(), VertexLayout::Scene.stride());
        assert_eq!(std::mem::size_of::<GuiVertex>(), VertexLayout::Gui.stride());
    }

    #[test]
    fn test_interleave_keeps_corner_order() {
        let meshes =
            parse_and_flatten("v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.5 0.25\nf 1/1 2/1 3\n").unwrap();
        let vertices = Vertex::interleave(&meshes[0]);

        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(vertices[0].tex_coords, [0.5, 0.25]);
        assert_eq!(vertices[2].tex_coords, [0.0, 0.0]);
        assert!(vertices.iter().all(|v| v.color == [1.0, 1.0, 1.0]));
    }
}
