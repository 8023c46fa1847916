//! Mock implementation of RenderContext for testing.
//!
//! Records every operation without touching a GPU. Buffer writes are also applied to a
//! CPU-side shadow copy so tests can assert on uploaded bytes.

use crate::{
    gpu_types::*,
    render_context::{DescriptorSetDescriptor, RenderContext},
};
use parking_lot::Mutex;
use wgpu::*;

/// Records a GPU operation call for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    CreateBuffer {
        id: usize,
        size: u64,
        usage: BufferUsages,
    },
    WriteBuffer {
        buffer_id: usize,
        offset: u64,
        size: usize,
    },
    CreateTexture {
        width: u32,
        height: u32,
        format: TextureFormat,
    },
    WriteTexture {
        texture_id: usize,
        size: usize,
    },
    CreateSampler {
        label: Option<String>,
    },
    CreateBindGroupLayout {
        label: Option<String>,
    },
    CreateDescriptorSet {
        id: usize,
        texture: Option<usize>,
        sampler: Option<usize>,
    },
    DestroyDescriptorSet {
        id: usize,
    },
}

/// Mock implementation of RenderContext for testing.
///
/// # Interior Mutability
///
/// Methods take `&self` but record calls, so state lives behind `parking_lot::Mutex`,
/// which keeps the type `Send + Sync` as `RenderContext` requires.
///
/// # Example
///
/// ```rust
/// use strata_test_utils::{MockRenderContext, RenderContext};
/// use wgpu::*;
///
/// let mock = MockRenderContext::new();
///
/// let buffer = mock.create_buffer(&BufferDescriptor {
///     label: None,
///     size: 1024,
///     usage: BufferUsages::VERTEX,
///     mapped_at_creation: false,
/// });
///
/// assert!(buffer.is_mock());
/// assert_eq!(mock.count_buffer_creates(), 1);
/// ```
pub struct MockRenderContext {
    calls: Mutex<Vec<RenderCall>>,
    /// Shadow contents of every mock buffer, indexed by buffer id.
    buffers: Mutex<Vec<Vec<u8>>>,
    next_texture_id: Mutex<usize>,
    next_sampler_id: Mutex<usize>,
    next_layout_id: Mutex<usize>,
    next_descriptor_set_id: Mutex<usize>,
    /// When set, descriptor-set allocation fails.
    fail_descriptor_sets: Mutex<bool>,
}

impl MockRenderContext {
    /// Create a new mock render context.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            buffers: Mutex::new(Vec::new()),
            next_texture_id: Mutex::new(0),
            next_sampler_id: Mutex::new(0),
            next_layout_id: Mutex::new(0),
            next_descriptor_set_id: Mutex::new(0),
            fail_descriptor_sets: Mutex::new(false),
        }
    }

    /// Get a copy of all recorded calls (for test assertions).
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().clone()
    }

    fn count(&self, filter: impl Fn(&RenderCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| filter(call)).count()
    }

    pub fn count_buffer_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateBuffer { .. }))
    }

    pub fn count_buffer_writes(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::WriteBuffer { .. }))
    }

    pub fn count_texture_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateTexture { .. }))
    }

    pub fn count_sampler_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateSampler { .. }))
    }

    pub fn count_descriptor_set_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateDescriptorSet { .. }))
    }

    pub fn count_descriptor_set_destroys(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::DestroyDescriptorSet { .. }))
    }

    /// Bytes written so far into the mock buffer with the given id.
    pub fn buffer_contents(&self, buffer_id: usize) -> Option<Vec<u8>> {
        self.buffers.lock().get(buffer_id).cloned()
    }

    /// Make every following `create_descriptor_set` call return `None`.
    pub fn fail_descriptor_sets(&self, fail: bool) {
        *self.fail_descriptor_sets.lock() = fail;
    }

    /// Clear recorded calls (useful between test steps).
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Get total number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Default for MockRenderContext {
    fn default() -> Self {
        Self::new()
    }
}

fn next_id(counter: &Mutex<usize>) -> usize {
    let mut id = counter.lock();
    let current = *id;
    *id += 1;
    current
}

impl RenderContext for MockRenderContext {
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer {
        let mut buffers = self.buffers.lock();
        let id = buffers.len();
        buffers.push(vec![0; desc.size as usize]);

        self.calls.lock().push(RenderCall::CreateBuffer {
            id,
            size: desc.size,
            usage: desc.usage,
        });

        GpuBuffer::mock(id, desc.size)
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        let Some(buffer_id) = buffer.mock_id() else {
            return;
        };

        if let Some(contents) = self.buffers.lock().get_mut(buffer_id) {
            let start = offset as usize;
            let end = (start + data.len()).min(contents.len());
            if start < end {
                contents[start..end].copy_from_slice(&data[..end - start]);
            }
        }

        self.calls.lock().push(RenderCall::WriteBuffer {
            buffer_id,
            offset,
            size: data.len(),
        });
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> GpuTexture {
        let id = next_id(&self.next_texture_id);

        self.calls.lock().push(RenderCall::CreateTexture {
            width: desc.size.width,
            height: desc.size.height,
            format: desc.format,
        });

        GpuTexture::mock(id, desc.size.width, desc.size.height)
    }

    fn write_texture(&self, texture: &GpuTexture, data: &[u8]) {
        let Some(texture_id) = texture.mock_id() else {
            return;
        };

        self.calls.lock().push(RenderCall::WriteTexture {
            texture_id,
            size: data.len(),
        });
    }

    fn create_sampler(&self, desc: &SamplerDescriptor) -> GpuSampler {
        let id = next_id(&self.next_sampler_id);

        self.calls.lock().push(RenderCall::CreateSampler {
            label: desc.label.map(|s| s.to_string()),
        });

        GpuSampler::mock(id)
    }

    fn create_bind_group_layout(&self, desc: &BindGroupLayoutDescriptor) -> GpuBindGroupLayout {
        let id = next_id(&self.next_layout_id);

        self.calls.lock().push(RenderCall::CreateBindGroupLayout {
            label: desc.label.map(|s| s.to_string()),
        });

        GpuBindGroupLayout::mock(id)
    }

    fn create_descriptor_set(&self, desc: &DescriptorSetDescriptor) -> Option<GpuDescriptorSet> {
        if *self.fail_descriptor_sets.lock() {
            return None;
        }

        let id = next_id(&self.next_descriptor_set_id);

        self.calls.lock().push(RenderCall::CreateDescriptorSet {
            id,
            texture: desc.texture.and_then(GpuTexture::mock_id),
            sampler: desc.sampler.and_then(GpuSampler::mock_id),
        });

        Some(GpuDescriptorSet::mock(id))
    }

    fn destroy_descriptor_set(&self, set: GpuDescriptorSet) {
        if let Some(id) = set.mock_id() {
            self.calls.lock().push(RenderCall::DestroyDescriptorSet { id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex_buffer(mock: &MockRenderContext, size: u64) -> GpuBuffer {
        mock.create_buffer(&BufferDescriptor {
            label: Some("test_buffer"),
            size,
            usage: BufferUsages::VERTEX,
            mapped_at_creation: false,
        })
    }

    #[test]
    fn test_mock_buffer_creation() {
        let mock = MockRenderContext::new();
        let buffer = vertex_buffer(&mock, 1024);

        assert!(buffer.is_mock());
        assert_eq!(buffer.size(), 1024);
        assert_eq!(mock.count_buffer_creates(), 1);
    }

    #[test]
    fn test_mock_buffer_write_is_shadowed() {
        let mock = MockRenderContext::new();
        let buffer = vertex_buffer(&mock, 8);

        mock.write_buffer(&buffer, 4, &[1, 2, 3, 4]);

        assert_eq!(mock.count_buffer_writes(), 1);
        assert_eq!(mock.buffer_contents(0), Some(vec![0, 0, 0, 0, 1, 2, 3, 4]));
    }

    #[test]
    fn test_texture_write_is_recorded() {
        let mock = MockRenderContext::new();
        let texture = mock.create_texture(&TextureDescriptor {
            label: None,
            size: Extent3d {
                width: 2,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        mock.write_texture(&texture, &[255; 8]);

        assert_eq!(texture.size(), (2, 1));
        assert_eq!(mock.count_texture_creates(), 1);
        assert_eq!(
            mock.calls().last(),
            Some(&RenderCall::WriteTexture {
                texture_id: 0,
                size: 8
            })
        );
    }

    #[test]
    fn test_descriptor_sets_get_fresh_ids() {
        let mock = MockRenderContext::new();
        let layout = mock.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: None,
            entries: &[],
        });
        let desc = DescriptorSetDescriptor {
            label: None,
            layout: &layout,
            texture: None,
            sampler: None,
        };

        let a = mock.create_descriptor_set(&desc).and_then(|s| s.mock_id());
        let b = mock.create_descriptor_set(&desc).and_then(|s| s.mock_id());

        assert_eq!(a, Some(0));
        assert_eq!(b, Some(1));
        assert_eq!(mock.count_descriptor_set_creates(), 2);
    }

    #[test]
    fn test_failing_descriptor_sets() {
        let mock = MockRenderContext::new();
        let layout = mock.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: None,
            entries: &[],
        });
        mock.fail_descriptor_sets(true);

        let set = mock.create_descriptor_set(&DescriptorSetDescriptor {
            label: None,
            layout: &layout,
            texture: None,
            sampler: None,
        });

        assert!(set.is_none());
        assert_eq!(mock.count_descriptor_set_creates(), 0);
    }

    #[test]
    fn test_clear_calls() {
        let mock = MockRenderContext::new();
        vertex_buffer(&mock, 16);

        assert_eq!(mock.call_count(), 1);

        mock.clear_calls();
        assert_eq!(mock.call_count(), 0);
    }
}
