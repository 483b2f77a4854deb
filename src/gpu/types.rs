use bytemuck::{Pod, Zeroable};

/// Initial vertex capacity of the sprite buffer; it grows to fit the largest frame seen.
pub const INITIAL_SPRITE_VERTICES: usize = 6 * 4096;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct Globals {
    // Canvas size in pixels: (width, height)
    pub screen_size: [f32; 2],
    pub _pad: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SpriteVertex {
    // canvas pixels, y down
    pub position: [f32; 2],
    pub uv: [f32; 2],
    // straight alpha; the fragment stage premultiplies
    pub color: [f32; 4],
}

impl SpriteVertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}
