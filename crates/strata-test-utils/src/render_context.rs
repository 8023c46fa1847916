//! Trait abstracting the device collaborator.
//!
//! The batcher allocates and fills buffers, builds its fallback texture and sampler, and
//! allocates or releases descriptor sets. That is all this trait exposes.

use crate::gpu_types::*;
use wgpu::{BindGroupLayoutDescriptor, BufferDescriptor, SamplerDescriptor, TextureDescriptor};

/// Descriptor for a texture + sampler descriptor set.
///
/// Either resource may be absent; the device decides whether it can build a set without
/// it and returns `None` when it cannot.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorSetDescriptor<'a> {
    pub label: Option<&'a str>,
    pub layout: &'a GpuBindGroupLayout,
    pub texture: Option<&'a GpuTexture>,
    pub sampler: Option<&'a GpuSampler>,
}

/// Trait abstracting GPU resource creation and operations.
///
/// Methods take `&self` and return owned wrapper types, so a single context can be
/// shared behind an `Arc` and mocks can record calls through interior mutability.
///
/// # Example
///
/// ```rust,no_run
/// use strata_test_utils::RenderContext;
/// use wgpu::{BufferDescriptor, BufferUsages};
///
/// fn upload(ctx: &dyn RenderContext, data: &[u8]) {
///     let buffer = ctx.create_buffer(&BufferDescriptor {
///         label: None,
///         size: data.len() as u64,
///         usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
///         mapped_at_creation: false,
///     });
///     ctx.write_buffer(&buffer, 0, data);
/// }
/// ```
pub trait RenderContext: Send + Sync {
    /// Create a GPU buffer.
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer;

    /// Write data to a buffer.
    ///
    /// For real buffers, this maps to `queue.write_buffer()`. `data.len()` must be a
    /// multiple of `wgpu::COPY_BUFFER_ALIGNMENT`.
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]);

    /// Create a GPU texture.
    fn create_texture(&self, desc: &TextureDescriptor) -> GpuTexture;

    /// Fill mip level 0 of `texture` with tightly packed RGBA8 texels.
    fn write_texture(&self, texture: &GpuTexture, data: &[u8]);

    /// Create a texture sampler.
    fn create_sampler(&self, desc: &SamplerDescriptor) -> GpuSampler;

    /// Create a descriptor-set layout.
    fn create_bind_group_layout(&self, desc: &BindGroupLayoutDescriptor) -> GpuBindGroupLayout;

    /// Allocate a descriptor set binding a texture and sampler to `desc.layout`.
    fn create_descriptor_set(&self, desc: &DescriptorSetDescriptor) -> Option<GpuDescriptorSet>;

    /// Return a descriptor set to the device.
    fn destroy_descriptor_set(&self, set: GpuDescriptorSet);
}
