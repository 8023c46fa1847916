//! Implementation of RenderContext for GraphicsContext.

use strata_test_utils::{
    DescriptorSetDescriptor, GpuBindGroupLayout, GpuBuffer, GpuDescriptorSet, GpuSampler,
    GpuTexture, RenderContext,
};
use wgpu::{BindGroupLayoutDescriptor, BufferDescriptor, SamplerDescriptor, TextureDescriptor};

use crate::context::GraphicsContext;

impl RenderContext for GraphicsContext {
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer {
        let buffer = self.device.create_buffer(desc);
        GpuBuffer::from_wgpu(buffer)
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        match buffer.as_wgpu() {
            Some(wgpu_buffer) => self.queue.write_buffer(wgpu_buffer, offset, data),
            None => tracing::warn!("Ignoring write to a buffer this context did not create"),
        }
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> GpuTexture {
        let texture = self.device.create_texture(desc);
        GpuTexture::from_wgpu(texture)
    }

    fn write_texture(&self, texture: &GpuTexture, data: &[u8]) {
        let Some(wgpu_texture) = texture.as_wgpu() else {
            tracing::warn!("Ignoring write to a texture this context did not create");
            return;
        };
        let (width, height) = texture.size();
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: wgpu_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn create_sampler(&self, desc: &SamplerDescriptor) -> GpuSampler {
        let sampler = self.device.create_sampler(desc);
        GpuSampler::from_wgpu(sampler)
    }

    fn create_bind_group_layout(&self, desc: &BindGroupLayoutDescriptor) -> GpuBindGroupLayout {
        let layout = self.device.create_bind_group_layout(desc);
        GpuBindGroupLayout::from_wgpu(layout)
    }

    /// Texture view at binding 0, sampler at binding 1. Both must be present.
    fn create_descriptor_set(&self, desc: &DescriptorSetDescriptor) -> Option<GpuDescriptorSet> {
        let layout = desc.layout.as_wgpu()?;
        let texture = desc.texture?.as_wgpu()?;
        let sampler = desc.sampler?.as_wgpu()?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: desc.label,
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        Some(GpuDescriptorSet::from_wgpu(bind_group))
    }

    fn destroy_descriptor_set(&self, set: GpuDescriptorSet) {
        // wgpu releases the bind group once the last handle is dropped.
        drop(set);
    }
}
