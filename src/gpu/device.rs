use wgpu::util::DeviceExt;

use super::compositor::{ShaderDevice, ShaderSource};
use super::uniforms::UniformLayout;
use crate::error::CompositorError;

/// Offscreen surfaces are sampled by passes and copied into, so every pass shares this format.
pub const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Triangle-strip corners of the full-screen quad in clip space.
const QUAD: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

pub struct OffscreenSurface {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: (u32, u32),
}

impl OffscreenSurface {
    pub fn new(device: &wgpu::Device, label: &str, size: (u32, u32)) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.0.max(1),
                height: size.1.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SURFACE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        OffscreenSurface {
            texture,
            view,
            size: (size.0.max(1), size.1.max(1)),
        }
    }
}

pub struct PassContext {
    target: OffscreenSurface,
    quad: wgpu::Buffer,
    sampler: wgpu::Sampler,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
}

pub struct PassProgram {
    pipeline: wgpu::RenderPipeline,
    uniforms: wgpu::Buffer,
}

/// Checks WGSL the way the driver would and reports the diagnostic text on failure.
/// `entry` must exist in the module as an entry point of `stage`.
pub fn validate_wgsl(
    name: &str,
    source: &str,
    entry: &str,
    stage: naga::ShaderStage,
) -> Result<(), CompositorError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| CompositorError::Compile {
        name: name.to_string(),
        log: e.emit_to_string(source),
    })?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .map_err(|e| CompositorError::Compile {
        name: name.to_string(),
        log: e.emit_to_string(source),
    })?;
    if !module
        .entry_points
        .iter()
        .any(|ep| ep.name == entry && ep.stage == stage)
    {
        return Err(CompositorError::Link {
            name: name.to_string(),
            log: format!("no {stage:?} entry point `{entry}`"),
        });
    }
    check_bindings(name, &module)
}

/// Every resource a pass shader declares must sit in the compositor's fixed layout:
/// `@group(0)` with the sampler at 0, a 2D float texture at 1 and the `Params` uniform at 2.
fn check_bindings(name: &str, module: &naga::Module) -> Result<(), CompositorError> {
    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else {
            continue;
        };
        let inner = &module.types[var.ty].inner;
        let fits = binding.group == 0
            && match binding.binding {
                0 => matches!(inner, naga::TypeInner::Sampler { comparison: false }),
                1 => matches!(
                    inner,
                    naga::TypeInner::Image {
                        dim: naga::ImageDimension::D2,
                        arrayed: false,
                        class: naga::ImageClass::Sampled {
                            kind: naga::ScalarKind::Float,
                            multi: false,
                        },
                    }
                ),
                2 => var.space == naga::AddressSpace::Uniform,
                _ => false,
            };
        if !fits {
            return Err(CompositorError::Link {
                name: name.to_string(),
                log: format!(
                    "`{}` at @group({}) @binding({}) does not match the pass layout \
                     (0: sampler, 1: texture_2d<f32>, 2: uniform)",
                    var.name.as_deref().unwrap_or("?"),
                    binding.group,
                    binding.binding
                ),
            });
        }
    }
    Ok(())
}

/// Runs post-processing passes on the device the frame is drawn with.
pub struct WgpuShaderDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuShaderDevice {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        WgpuShaderDevice { device, queue }
    }
}

impl ShaderDevice for WgpuShaderDevice {
    type Context = PassContext;
    type Program = PassProgram;
    type Surface = OffscreenSurface;

    fn create_context(&mut self, size: (u32, u32)) -> Result<PassContext, CompositorError> {
        let target = OffscreenSurface::new(&self.device, "shader pass target", size);
        let quad = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("shader pass quad"),
                contents: bytemuck::cast_slice(&QUAD),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shader pass sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });
        let bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("shader pass layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                multisampled: false,
                                view_dimension: wgpu::TextureViewDimension::D2,
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 2,
                            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                    ],
                });
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("shader pass pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });
        Ok(PassContext {
            target,
            quad,
            sampler,
            bind_group_layout,
            pipeline_layout,
        })
    }

    fn compile(
        &mut self,
        context: &mut PassContext,
        name: &str,
        source: &ShaderSource,
        layout: &UniformLayout,
    ) -> Result<PassProgram, CompositorError> {
        validate_wgsl(name, &source.vertex, VERTEX_ENTRY, naga::ShaderStage::Vertex)?;
        validate_wgsl(name, &source.fragment, FRAGMENT_ENTRY, naga::ShaderStage::Fragment)?;

        // anything naga accepts but the pipeline layout does not is reported here instead of
        // reaching the device's uncaptured error handler
        let error_scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vertex = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{name} vertex")),
                source: wgpu::ShaderSource::Wgsl(source.vertex.as_str().into()),
            });
        let fragment = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{name} fragment")),
                source: wgpu::ShaderSource::Wgsl(source.fragment.as_str().into()),
            });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(name),
                layout: Some(&context.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex,
                    entry_point: Some(VERTEX_ENTRY),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                    }],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment,
                    entry_point: Some(FRAGMENT_ENTRY),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: SURFACE_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });
        if let Some(error) = pollster::block_on(error_scope.pop()) {
            return Err(CompositorError::Link {
                name: name.to_string(),
                log: error.to_string(),
            });
        }

        let uniforms = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("shader pass uniforms"),
            size: layout.size() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(PassProgram { pipeline, uniforms })
    }

    fn run_pass(
        &mut self,
        context: &mut PassContext,
        program: &PassProgram,
        uniforms: &[u8],
        input: &OffscreenSurface,
    ) -> Result<(), CompositorError> {
        self.queue.write_buffer(&program.uniforms, 0, uniforms);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shader pass bind group"),
            layout: &context.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Sampler(&context.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&input.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: program.uniforms.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("shader pass encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shader pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &context.target.view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            rpass.set_pipeline(&program.pipeline);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.set_vertex_buffer(0, context.quad.slice(..));
            rpass.draw(0..4, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn copy_output(
        &mut self,
        context: &mut PassContext,
        surface: &OffscreenSurface,
    ) -> Result<(), CompositorError> {
        if context.target.size != surface.size {
            return Err(CompositorError::NoContext(format!(
                "pass target is {:?} but the surface is {:?}",
                context.target.size, surface.size
            )));
        }
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("shader pass copy"),
            });
        encoder.copy_texture_to_texture(
            context.target.texture.as_image_copy(),
            surface.texture.as_image_copy(),
            wgpu::Extent3d {
                width: surface.size.0,
                height: surface.size.1,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn surface_size(&self, surface: &OffscreenSurface) -> (u32, u32) {
        surface.size
    }
}
