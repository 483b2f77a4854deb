use crate::render::Texture;

/// Uploads an RGBA8 sRGB texture. A buffer that does not match its size leaves the texture
/// transparent.
pub fn upload_texture_2d_srgb(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    tex: &Texture,
) -> (wgpu::Texture, wgpu::TextureView) {
    let size = wgpu::Extent3d {
        width: tex.width.max(1),
        height: tex.height.max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    if is_well_formed(tex) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            tex.rgba.as_slice(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * tex.width),
                rows_per_image: Some(tex.height),
            },
            size,
        );
    } else {
        log::warn!("texture `{label}` has a malformed pixel buffer, left blank");
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn is_well_formed(tex: &Texture) -> bool {
    tex.width > 0
        && tex.height > 0
        && tex.rgba.len() == (tex.width as usize) * (tex.height as usize) * 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_buffer_must_match_the_size() {
        assert!(is_well_formed(&Texture::solid(2, 3, [0; 4])));
        let mut short = Texture::solid(2, 3, [0; 4]);
        short.rgba.pop();
        assert!(!is_well_formed(&short));
        assert!(!is_well_formed(&Texture::solid(0, 0, [0; 4])));
    }
}
