// SPDX-License-Identifier: GPL-3.0-only

//! wgpu implementation of [`GpuBackend`]
//!
//! Renders into an offscreen RGBA target the size of the preview. Each texture
//! gets its bind group at allocation time so drawing is a pipeline switch, one
//! uniform write and a four-vertex strip.

use super::backend::GpuBackend;
use super::shaders;
use super::transform::quad_projection;
use super::{ShaderVariant, TextureId, TextureTransform};
use crate::errors::DisplayError;
use crate::frame::RgbaBuffer;
use crate::gpu::{self, GpuDeviceInfo};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Uniform shared by both quad shaders
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadUniform {
    pub projection: [f32; 16],
    pub tex_transform: [f32; 16],
}

impl QuadUniform {
    pub fn new(transform: &TextureTransform) -> Self {
        Self {
            projection: quad_projection(),
            tex_transform: transform.matrix,
        }
    }
}

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

struct GpuTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    info: GpuDeviceInfo,
    target_view: wgpu::TextureView,
    target_size: (u32, u32),
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    plain_pipeline: wgpu::RenderPipeline,
    external_pipeline: wgpu::RenderPipeline,
    textures: HashMap<TextureId, GpuTexture>,
    next_id: u64,
    pending: Option<wgpu::CommandBuffer>,
    frames_presented: u64,
}

impl WgpuBackend {
    /// Create a device and both quad pipelines, rendering at `width`x`height`
    pub fn new(width: u32, height: u32) -> Result<Self, DisplayError> {
        let (device, queue, info) = pollster::block_on(gpu::create_display_device("openedge display"))?;

        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("openedge display target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("openedge quad bind group layout"),
            entries: &[
                // Frame texture
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                // Projection + texture transform
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("openedge quad sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("openedge quad uniform"),
            size: std::mem::size_of::<QuadUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(
            &uniform_buffer,
            0,
            bytemuck::bytes_of(&QuadUniform::new(&TextureTransform::IDENTITY)),
        );

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("openedge quad pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        // Shader problems surface as validation errors, not panics
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let plain_pipeline = create_quad_pipeline(&device, &pipeline_layout, ShaderVariant::Plain2d);
        let external_pipeline =
            create_quad_pipeline(&device, &pipeline_layout, ShaderVariant::External);
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(DisplayError::ShaderCompile(error.to_string()));
        }

        info!(
            adapter = %info.adapter_name,
            width,
            height,
            "wgpu display backend ready"
        );

        Ok(Self {
            device,
            queue,
            info,
            target_view,
            target_size: (width.max(1), height.max(1)),
            bind_group_layout,
            sampler,
            uniform_buffer,
            plain_pipeline,
            external_pipeline,
            textures: HashMap::new(),
            next_id: 0,
            pending: None,
            frames_presented: 0,
        })
    }

    pub fn device_info(&self) -> &GpuDeviceInfo {
        &self.info
    }

    pub fn target_size(&self) -> (u32, u32) {
        self.target_size
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

fn create_quad_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    variant: ShaderVariant,
) -> wgpu::RenderPipeline {
    let label = match variant {
        ShaderVariant::Plain2d => "openedge quad 2d",
        ShaderVariant::External => "openedge quad external",
    };
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(shaders::source(variant).into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: TARGET_FORMAT,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

impl GpuBackend for WgpuBackend {
    fn create_texture(&mut self, width: u32, height: u32) -> Result<TextureId, DisplayError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(DisplayError::InvalidBuffer(format!(
                "cannot allocate {}x{} texture (max {})",
                width, height, max
            )));
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("openedge frame texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("openedge frame bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        });

        self.next_id += 1;
        let id = TextureId(self.next_id);
        self.textures.insert(
            id,
            GpuTexture {
                texture,
                bind_group,
                width,
                height,
            },
        );
        debug!(texture = id.0, width, height, "GPU texture created");
        Ok(id)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if let Some(gpu_texture) = self.textures.remove(&texture) {
            gpu_texture.texture.destroy();
        }
    }

    fn upload(&mut self, texture: TextureId, image: &RgbaBuffer) -> Result<(), DisplayError> {
        let slot = self
            .textures
            .get(&texture)
            .ok_or(DisplayError::UnknownTexture(texture.0))?;
        let expected = slot.width as usize * slot.height as usize * 4;
        if image.width != slot.width || image.height != slot.height || image.data.len() != expected {
            return Err(DisplayError::InvalidBuffer(format!(
                "{}x{} image ({} bytes) into {}x{} texture",
                image.width,
                image.height,
                image.data.len(),
                slot.width,
                slot.height
            )));
        }

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &slot.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(slot.width * 4),
                rows_per_image: Some(slot.height),
            },
            wgpu::Extent3d {
                width: slot.width,
                height: slot.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn draw(
        &mut self,
        variant: ShaderVariant,
        texture: TextureId,
        transform: &TextureTransform,
    ) -> Result<(), DisplayError> {
        let slot = self
            .textures
            .get(&texture)
            .ok_or(DisplayError::UnknownTexture(texture.0))?;

        self.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&QuadUniform::new(transform)),
        );

        let pipeline = match variant {
            ShaderVariant::Plain2d => &self.plain_pipeline,
            ShaderVariant::External => &self.external_pipeline,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("openedge draw"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("openedge quad pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &slot.bind_group, &[]);
            render_pass.draw(0..4, 0..1);
        }

        if self.pending.replace(encoder.finish()).is_some() {
            warn!("Previous draw was never presented");
        }
        Ok(())
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        if let Some(commands) = self.pending.take() {
            self.queue.submit(Some(commands));
            self.frames_presented += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<QuadUniform>(), 128);
        let uniform = QuadUniform::new(&TextureTransform::from_rotation(90, false));
        let bytes = bytemuck::bytes_of(&uniform);
        let projection: &[f32] = bytemuck::cast_slice(&bytes[..64]);
        assert_eq!(projection, &quad_projection());
    }

    #[test]
    fn test_draws_on_real_gpu() {
        // Requires a GPU adapter; skipped on headless CI
        let mut backend = match WgpuBackend::new(8, 8) {
            Ok(backend) => backend,
            Err(DisplayError::AdapterUnavailable(e)) | Err(DisplayError::DeviceCreation(e)) => {
                println!("Skipping test (no GPU): {}", e);
                return;
            }
            Err(e) => panic!("unexpected display error: {}", e),
        };

        let texture = backend.create_texture(4, 4).unwrap();
        let image = RgbaBuffer::new(4, 4, vec![200; 64]);
        backend.upload(texture, &image).unwrap();
        backend
            .draw(ShaderVariant::External, texture, &TextureTransform::IDENTITY)
            .unwrap();
        backend.present().unwrap();
        assert_eq!(backend.frames_presented(), 1);

        assert!(matches!(
            backend.upload(texture, &RgbaBuffer::new(2, 2, vec![0; 16])),
            Err(DisplayError::InvalidBuffer(_))
        ));
        backend.destroy_texture(texture);
        assert!(matches!(
            backend.draw(ShaderVariant::Plain2d, texture, &TextureTransform::IDENTITY),
            Err(DisplayError::UnknownTexture(_))
        ));
    }
}
