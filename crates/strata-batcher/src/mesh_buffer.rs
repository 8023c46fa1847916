//! Shared CPU-side vertex/index storage, grouped by accessor.
//!
//! A [`MeshBuffer`] keeps two write cursors, counted in whole vertices and whole indices.
//! Within a frame they only move forward; [`MeshBufferStore::reset_offsets`] puts them
//! back to zero once per frame. The storage itself persists across frames.
//!
//! Static draws are always written at the cursors. A dynamic producer that writes its own
//! geometry claims a range first with [`MeshBuffer::claim`], which moves the cursors past
//! it, so static packing later in the frame lands above. The spans written by static
//! draws are kept until the next reset so that an unclaimed dynamic range over them can
//! be refused.

use std::ops::Range;

use strata_core::alloc::HashMap;
use strata_core::profiling::{profile_function, profile_scope};
use strata_test_utils::{GpuBuffer, RenderContext};

use crate::config::OverflowPolicy;
use crate::entity::DynamicRange;
use crate::error::{BatchError, BatchResult};
use crate::vertex::{MAX_VERTICES_PER_BUFFER, VertexLayout};

/// Identifies a group of mesh buffers that draws write into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AccessorId(pub u16);

pub struct MeshBuffer {
    layout: VertexLayout,
    vertices: Vec<f32>,
    /// Always an even length so the used prefix can be padded to 4 bytes.
    indices: Vec<u16>,
    vertex_offset: u32,
    index_offset: u32,
    touched: bool,
    static_vertices: Vec<Range<u32>>,
    static_indices: Vec<Range<u32>>,
    vertex_gpu: Option<GpuBuffer>,
    index_gpu: Option<GpuBuffer>,
}

fn even(count: u32) -> u32 {
    count + (count & 1)
}

/// Append `span`, joining it to the last span when they touch.
fn push_span(spans: &mut Vec<Range<u32>>, span: Range<u32>) {
    if span.is_empty() {
        return;
    }
    match spans.last_mut() {
        Some(last) if last.end == span.start => last.end = span.end,
        _ => spans.push(span),
    }
}

fn overlaps(spans: &[Range<u32>], span: &Range<u32>) -> bool {
    !span.is_empty()
        && spans
            .iter()
            .any(|s| s.start < span.end && span.start < s.end)
}

/// New capacity for a buffer of `capacity` that must hold `required`: unchanged if it
/// fits, otherwise at least doubled.
fn grown(capacity: u32, required: u32) -> u32 {
    if required <= capacity {
        capacity
    } else {
        required.max(capacity.saturating_mul(2))
    }
}

impl MeshBuffer {
    pub fn new(layout: VertexLayout, vertex_capacity: u32, index_capacity: u32) -> Self {
        let vertex_capacity = vertex_capacity.min(MAX_VERTICES_PER_BUFFER);
        Self {
            layout,
            vertices: vec![0.0; vertex_capacity as usize * layout.stride() as usize],
            indices: vec![0; even(index_capacity) as usize],
            vertex_offset: 0,
            index_offset: 0,
            touched: false,
            static_vertices: Vec::new(),
            static_indices: Vec::new(),
            vertex_gpu: None,
            index_gpu: None,
        }
    }

    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    pub fn vertex_capacity(&self) -> u32 {
        (self.vertices.len() / self.layout.stride() as usize) as u32
    }

    pub fn index_capacity(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Next vertex a static draw is written to.
    pub fn vertex_offset(&self) -> u32 {
        self.vertex_offset
    }

    /// Next index a static draw is written to.
    pub fn index_offset(&self) -> u32 {
        self.index_offset
    }

    /// Whether anything was packed since the last reset.
    pub fn is_touched(&self) -> bool {
        self.touched
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Vertex records below the vertex cursor.
    pub fn used_vertices(&self) -> &[f32] {
        &self.vertices[..self.vertex_offset as usize * self.layout.stride() as usize]
    }

    /// Indices below the index cursor.
    pub fn used_indices(&self) -> &[u16] {
        &self.indices[..self.index_offset as usize]
    }

    /// Write whole vertex records starting at `first_vertex`. Offsets are not touched.
    pub fn write_vertices(&mut self, first_vertex: u32, data: &[f32]) -> BatchResult<()> {
        self.layout.vertex_count(data.len())?;
        let start = first_vertex as usize * self.layout.stride() as usize;
        let end = start + data.len();
        if end > self.vertices.len() {
            return Err(BatchError::OutOfBounds {
                end,
                len: self.vertices.len(),
            });
        }
        self.vertices[start..end].copy_from_slice(data);
        Ok(())
    }

    /// Write absolute indices starting at `first_index`. Offsets are not touched.
    pub fn write_indices(&mut self, first_index: u32, data: &[u16]) -> BatchResult<()> {
        let start = first_index as usize;
        let end = start + data.len();
        if end > self.indices.len() {
            return Err(BatchError::OutOfBounds {
                end,
                len: self.indices.len(),
            });
        }
        self.indices[start..end].copy_from_slice(data);
        Ok(())
    }

    /// Grow the storage to hold at least the given number of vertices and indices.
    pub fn ensure_capacity(&mut self, vertices: u32, indices: u32) -> BatchResult<()> {
        if vertices > MAX_VERTICES_PER_BUFFER {
            return Err(BatchError::CapacityExceeded {
                required: vertices as usize,
                capacity: MAX_VERTICES_PER_BUFFER as usize,
            });
        }
        if vertices > self.vertex_capacity() {
            let stride = self.layout.stride() as usize;
            self.vertices.resize(vertices as usize * stride, 0.0);
        }
        if indices > self.index_capacity() {
            self.indices.resize(even(indices) as usize, 0);
        }
        Ok(())
    }

    /// Make room for `vertex_count` more vertices and `index_count` more indices past the
    /// cursors, following `policy`.
    pub(crate) fn reserve(
        &mut self,
        vertex_count: u32,
        index_count: u32,
        policy: OverflowPolicy,
    ) -> BatchResult<()> {
        let vertex_end = self.vertex_offset + vertex_count;
        let index_end = self.index_offset + index_count;
        let vertex_capacity = self.vertex_capacity();
        let index_capacity = self.index_capacity();
        if vertex_end <= vertex_capacity && index_end <= index_capacity {
            return Ok(());
        }

        match policy {
            OverflowPolicy::Grow => {
                // Past the 16-bit limit the request itself is kept so ensure_capacity rejects it.
                let vertices = grown(vertex_capacity, vertex_end)
                    .min(MAX_VERTICES_PER_BUFFER)
                    .max(vertex_end);
                let indices = grown(index_capacity, index_end);
                tracing::debug!(
                    "Growing mesh buffer to {} vertices, {} indices",
                    vertices,
                    indices
                );
                self.ensure_capacity(vertices, indices)
            }
            OverflowPolicy::Drop if vertex_end > vertex_capacity => {
                Err(BatchError::CapacityExceeded {
                    required: vertex_end as usize,
                    capacity: vertex_capacity as usize,
                })
            }
            OverflowPolicy::Drop => Err(BatchError::CapacityExceeded {
                required: index_end as usize,
                capacity: index_capacity as usize,
            }),
        }
    }

    /// Reserve `vertex_count` vertices and `index_count` indices at the cursors for a
    /// producer to fill, growing the storage as `policy` allows.
    ///
    /// Claim after the frame's reset and before the walk; the returned range is what the
    /// producer's [`DrawInfo::new_dynamic`](crate::DrawInfo::new_dynamic) should carry.
    pub fn claim(
        &mut self,
        vertex_count: u32,
        index_count: u32,
        policy: OverflowPolicy,
    ) -> BatchResult<DynamicRange> {
        let vertex_start = self.vertex_offset;
        if vertex_start + vertex_count > MAX_VERTICES_PER_BUFFER {
            return Err(BatchError::IndexOverflow {
                base_vertex: vertex_start,
                vertex_count,
            });
        }
        self.reserve(vertex_count, index_count, policy)?;

        let range = DynamicRange {
            vertex_start,
            vertex_count,
            index_start: self.index_offset,
            index_count,
        };
        self.advance_to(
            vertex_start + vertex_count,
            range.index_start + index_count,
        );
        Ok(range)
    }

    /// Remember that a static draw wrote these vertices and indices this frame.
    pub(crate) fn record_static(&mut self, vertices: Range<u32>, indices: Range<u32>) {
        push_span(&mut self.static_vertices, vertices);
        push_span(&mut self.static_indices, indices);
    }

    /// Whether either range touches data a static draw wrote this frame.
    pub(crate) fn overlaps_static(&self, vertices: &Range<u32>, indices: &Range<u32>) -> bool {
        overlaps(&self.static_vertices, vertices) || overlaps(&self.static_indices, indices)
    }

    /// Mutable view of `count` vertex records starting at `first`. The range must fit.
    pub(crate) fn vertex_records_mut(&mut self, first: u32, count: u32) -> &mut [f32] {
        let stride = self.layout.stride() as usize;
        let start = first as usize * stride;
        &mut self.vertices[start..start + count as usize * stride]
    }

    /// Mutable view of `count` indices starting at `first`. The range must fit.
    pub(crate) fn index_slots_mut(&mut self, first: u32, count: u32) -> &mut [u16] {
        let start = first as usize;
        &mut self.indices[start..start + count as usize]
    }

    /// Move the cursors to the given ends, never backwards.
    pub(crate) fn advance_to(&mut self, vertex_end: u32, index_end: u32) {
        if vertex_end > self.vertex_offset {
            self.vertex_offset = vertex_end;
        }
        if index_end > self.index_offset {
            self.index_offset = index_end;
        }
        self.touched = true;
    }

    /// Zero both cursors. Storage and GPU buffers are kept.
    pub fn reset(&mut self) {
        self.vertex_offset = 0;
        self.index_offset = 0;
        self.touched = false;
        self.static_vertices.clear();
        self.static_indices.clear();
    }

    /// Push the used prefix of both arrays to the device. Returns whether anything was
    /// written.
    pub(crate) fn upload(&mut self, device: &dyn RenderContext, label: &str) -> bool {
        profile_function!();
        if !self.touched || self.index_offset == 0 {
            return false;
        }

        let vertex_bytes = self.used_vertices().len() as u64 * 4;
        // Pad to an even index count so the copy size is a multiple of 4 bytes.
        let index_count = even(self.index_offset);
        let index_bytes = index_count as u64 * 2;

        ensure_gpu_buffer(
            &mut self.vertex_gpu,
            device,
            vertex_bytes,
            wgpu::BufferUsages::VERTEX,
            || format!("{}_vertices", label),
        );
        ensure_gpu_buffer(
            &mut self.index_gpu,
            device,
            index_bytes,
            wgpu::BufferUsages::INDEX,
            || format!("{}_indices", label),
        );

        if let Some(buffer) = &self.vertex_gpu {
            device.write_buffer(buffer, 0, bytemuck::cast_slice(self.used_vertices()));
        }
        if let Some(buffer) = &self.index_gpu {
            let indices = &self.indices[..index_count as usize];
            device.write_buffer(buffer, 0, bytemuck::cast_slice(indices));
        }
        true
    }

    /// GPU vertex buffer, present after the first upload.
    pub fn gpu_vertex_buffer(&self) -> Option<&GpuBuffer> {
        self.vertex_gpu.as_ref()
    }

    pub fn gpu_index_buffer(&self) -> Option<&GpuBuffer> {
        self.index_gpu.as_ref()
    }
}

/// Ensure `slot` holds a buffer of at least `required` bytes, growing to the next power
/// of two.
fn ensure_gpu_buffer(
    slot: &mut Option<GpuBuffer>,
    device: &dyn RenderContext,
    required: u64,
    usage: wgpu::BufferUsages,
    label: impl FnOnce() -> String,
) {
    if slot.as_ref().is_some_and(|buffer| buffer.size() >= required) {
        return;
    }
    let size = required
        .next_power_of_two()
        .max(wgpu::COPY_BUFFER_ALIGNMENT);
    let label = label();
    tracing::debug!("Allocating GPU buffer '{}' ({} bytes)", label, size);
    *slot = Some(device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(&label),
        size,
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    }));
}

/// Mesh buffers of every accessor.
#[derive(Default)]
pub struct MeshBufferStore {
    accessors: HashMap<AccessorId, Vec<MeshBuffer>>,
}

impl MeshBufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the buffers of `accessor`, returning the ones they replace.
    pub fn sync(
        &mut self,
        accessor: AccessorId,
        buffers: Vec<MeshBuffer>,
    ) -> Option<Vec<MeshBuffer>> {
        self.accessors.insert(accessor, buffers)
    }

    /// Allocate `count` empty buffers for `accessor`.
    pub fn create(
        &mut self,
        accessor: AccessorId,
        count: u16,
        layout: VertexLayout,
        vertex_capacity: u32,
        index_capacity: u32,
    ) -> Option<Vec<MeshBuffer>> {
        let buffers = (0..count)
            .map(|_| MeshBuffer::new(layout, vertex_capacity, index_capacity))
            .collect();
        self.sync(accessor, buffers)
    }

    pub fn remove(&mut self, accessor: AccessorId) -> Option<Vec<MeshBuffer>> {
        self.accessors.remove(&accessor)
    }

    /// Every buffer of `accessor`, empty if none are registered.
    pub fn buffers(&self, accessor: AccessorId) -> &[MeshBuffer] {
        self.accessors
            .get(&accessor)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get(&self, accessor: AccessorId, buffer: u16) -> Option<&MeshBuffer> {
        self.accessors.get(&accessor)?.get(buffer as usize)
    }

    pub fn get_mut(&mut self, accessor: AccessorId, buffer: u16) -> Option<&mut MeshBuffer> {
        self.accessors.get_mut(&accessor)?.get_mut(buffer as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AccessorId, &[MeshBuffer])> {
        self.accessors
            .iter()
            .map(|(accessor, buffers)| (*accessor, buffers.as_slice()))
    }

    /// Zero the cursors of every buffer.
    pub fn reset_offsets(&mut self) {
        profile_function!();
        for buffer in self.accessors.values_mut().flatten() {
            buffer.reset();
        }
    }

    /// Upload every touched buffer. Returns how many were written.
    pub fn upload(&mut self, device: &dyn RenderContext, label: &str) -> usize {
        profile_function!();
        let mut uploaded = 0;
        for (accessor, buffers) in self.accessors.iter_mut() {
            profile_scope!("upload_accessor");
            for (index, buffer) in buffers.iter_mut().enumerate() {
                let name = format!("{}_{}_{}", label, accessor.0, index);
                if buffer.upload(device, &name) {
                    uploaded += 1;
                }
            }
        }
        uploaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_test_utils::MockRenderContext;

    fn buffer(vertices: u32, indices: u32) -> MeshBuffer {
        MeshBuffer::new(VertexLayout::default(), vertices, indices)
    }

    #[test]
    fn test_new_buffer_is_empty() {
        let mb = buffer(4, 5);
        assert_eq!(mb.vertex_capacity(), 4);
        assert_eq!(mb.index_capacity(), 6);
        assert_eq!(mb.vertex_offset(), 0);
        assert_eq!(mb.index_offset(), 0);
        assert!(!mb.is_touched());
        assert!(mb.used_vertices().is_empty());
    }

    #[test]
    fn test_advance_never_moves_backwards() {
        let mut mb = buffer(8, 12);
        mb.advance_to(4, 6);
        mb.advance_to(2, 3);
        assert_eq!(mb.vertex_offset(), 4);
        assert_eq!(mb.index_offset(), 6);

        mb.reset();
        assert_eq!(mb.vertex_offset(), 0);
        assert_eq!(mb.index_offset(), 0);
        assert_eq!(mb.vertex_capacity(), 8);
    }

    #[test]
    fn test_claim_moves_cursors_past_the_range() {
        let mut mb = buffer(4, 6);
        let first = mb.claim(4, 6, OverflowPolicy::Grow).unwrap();
        assert_eq!(
            first,
            DynamicRange {
                vertex_start: 0,
                vertex_count: 4,
                index_start: 0,
                index_count: 6,
            }
        );

        let second = mb.claim(2, 3, OverflowPolicy::Grow).unwrap();
        assert_eq!(second.vertex_start, 4);
        assert_eq!(second.index_start, 6);
        assert_eq!(mb.vertex_offset(), 6);
        assert_eq!(mb.index_offset(), 9);
        assert!(mb.vertex_capacity() >= 6);
    }

    #[test]
    fn test_claim_respects_drop_policy() {
        let mut mb = buffer(4, 6);
        assert!(mb.claim(5, 6, OverflowPolicy::Drop).is_err());
        assert_eq!(mb.vertex_offset(), 0);
        assert!(!mb.is_touched());
    }

    #[test]
    fn test_static_spans_join_and_clear_on_reset() {
        let mut mb = buffer(16, 24);
        mb.record_static(0..4, 0..6);
        mb.record_static(4..8, 6..12);
        mb.record_static(12..16, 18..24);

        assert!(mb.overlaps_static(&(6..10), &(30..31)));
        assert!(mb.overlaps_static(&(20..21), &(11..13)));
        assert!(!mb.overlaps_static(&(8..12), &(12..18)));
        assert!(!mb.overlaps_static(&(2..2), &(3..3)));

        mb.reset();
        assert!(!mb.overlaps_static(&(0..16), &(0..24)));
    }

    #[test]
    fn test_reserve_grows_at_least_double() {
        let mut mb = buffer(4, 6);
        mb.reserve(5, 6, OverflowPolicy::Grow).unwrap();
        assert_eq!(mb.vertex_capacity(), 8);
        assert_eq!(mb.index_capacity(), 6);

        mb.reserve(20, 20, OverflowPolicy::Grow).unwrap();
        assert_eq!(mb.vertex_capacity(), 20);
        assert_eq!(mb.index_capacity(), 20);
    }

    #[test]
    fn test_reserve_drop_policy() {
        let mut mb = buffer(4, 6);
        assert_eq!(
            mb.reserve(5, 6, OverflowPolicy::Drop),
            Err(BatchError::CapacityExceeded {
                required: 5,
                capacity: 4
            })
        );
        assert_eq!(mb.vertex_capacity(), 4);
    }

    #[test]
    fn test_grow_is_capped_by_index_range() {
        let mut mb = buffer(40_000, 6);
        mb.reserve(50_000, 6, OverflowPolicy::Grow).unwrap();
        assert_eq!(mb.vertex_capacity(), MAX_VERTICES_PER_BUFFER);
    }

    #[test]
    fn test_write_bounds() {
        let mut mb = buffer(2, 4);
        assert!(mb.write_vertices(1, &[1.0; 9]).is_ok());
        assert_eq!(
            mb.write_vertices(2, &[1.0; 9]),
            Err(BatchError::OutOfBounds { end: 27, len: 18 })
        );
        assert!(matches!(
            mb.write_vertices(0, &[1.0; 5]),
            Err(BatchError::InvalidLayout { .. })
        ));
        assert!(mb.write_indices(2, &[0, 1]).is_ok());
        assert!(mb.write_indices(3, &[0, 1]).is_err());
    }

    #[test]
    fn test_upload_skips_untouched() {
        let mock = MockRenderContext::new();
        let mut mb = buffer(4, 6);
        assert!(!mb.upload(&mock, "test"));
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_upload_pads_indices_and_reuses_buffers() {
        let mock = MockRenderContext::new();
        let mut mb = buffer(4, 6);
        mb.write_indices(0, &[0, 1, 2]).unwrap();
        mb.advance_to(3, 3);

        assert!(mb.upload(&mock, "test"));
        assert_eq!(mock.count_buffer_creates(), 2);
        assert_eq!(mb.gpu_index_buffer().map(GpuBuffer::size), Some(8));
        assert_eq!(mb.gpu_vertex_buffer().map(GpuBuffer::size), Some(128));

        // Second frame with the same usage writes without reallocating.
        mb.reset();
        mb.advance_to(3, 3);
        assert!(mb.upload(&mock, "test"));
        assert_eq!(mock.count_buffer_creates(), 2);
        assert_eq!(mock.count_buffer_writes(), 4);
    }

    #[test]
    fn test_store_lookup() {
        let mut store = MeshBufferStore::new();
        store.create(AccessorId(3), 2, VertexLayout::default(), 16, 24);

        assert_eq!(store.buffers(AccessorId(3)).len(), 2);
        assert!(store.get(AccessorId(3), 1).is_some());
        assert!(store.get(AccessorId(3), 2).is_none());
        assert!(store.buffers(AccessorId(4)).is_empty());
    }
}
