//! Writes draw geometry into mesh buffers.
//!
//! Static draws are copied record by record, their positions transformed by the node's
//! world matrix and their color slots overwritten. Dynamic draws were written by their
//! producer, so only the cursors move; a dynamic range over static data packed earlier
//! in the frame is refused.

use strata_core::math::{Mat4, Vec3};
use strata_core::profiling::profile_function;

use crate::color::Color32;
use crate::config::OverflowPolicy;
use crate::entity::{DrawKind, DrawInfo, DynamicRange};
use crate::error::{BatchError, BatchResult};
use crate::mesh_buffer::MeshBuffer;
use crate::vertex::{MAX_VERTICES_PER_BUFFER, VertexLayout};

/// Contiguous run of indices in a mesh buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexRange {
    pub start: u32,
    pub count: u32,
}

impl IndexRange {
    pub fn end(&self) -> u32 {
        self.start + self.count
    }
}

/// Result of packing one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packed {
    pub range: IndexRange,
    pub vertices_written: u32,
    pub indices_written: u32,
}

/// Per-entity values the packer bakes into vertex records.
#[derive(Debug, Clone, Copy)]
pub struct PackParams<'a> {
    pub world: &'a Mat4,
    pub color: Color32,
    /// Effective opacity, already multiplied down the hierarchy.
    pub opacity: f32,
    pub policy: OverflowPolicy,
}

/// Transform the position of every record in `source` and store it in `records`.
pub fn fill_vertex_buffers(
    records: &mut [f32],
    source: &[f32],
    layout: VertexLayout,
    world: &Mat4,
) {
    let stride = layout.stride() as usize;
    let p = layout.position_offset() as usize;
    for (dst, src) in records
        .chunks_exact_mut(stride)
        .zip(source.chunks_exact(stride))
    {
        let local = Vec3::new(src[p], src[p + 1], src[p + 2]);
        let world_pos = world.transform_point3(local);
        dst[p..p + 3].copy_from_slice(&world_pos.to_array());
    }
}

/// Write normalized r, g, b and `opacity` into the color slots of every record.
pub fn fill_colors(records: &mut [f32], layout: VertexLayout, color: Color32, opacity: f32) {
    let stride = layout.stride() as usize;
    let c = layout.color_offset() as usize;
    let [r, g, b] = color.normalized_rgb();
    for record in records.chunks_exact_mut(stride) {
        record[c..c + 4].copy_from_slice(&[r, g, b, opacity]);
    }
}

/// Copy `indices`, rebased onto `base_vertex`, at the index cursor and advance it.
///
/// Every local index must be below the draw's vertex count and `base_vertex` plus that
/// count must fit in 16 bits. [`pack`] checks both before calling this.
pub fn fill_index_buffers(
    buffer: &mut MeshBuffer,
    indices: &[u16],
    base_vertex: u32,
) -> IndexRange {
    let start = buffer.index_offset();
    let count = indices.len() as u32;
    for (dst, &local) in buffer
        .index_slots_mut(start, count)
        .iter_mut()
        .zip(indices)
    {
        *dst = (base_vertex + local as u32) as u16;
    }
    buffer.advance_to(buffer.vertex_offset(), start + count);
    IndexRange { start, count }
}

/// Account for geometry a producer wrote itself. The cursors only move if the range
/// ends past them, so touching the same range twice is harmless.
///
/// Fails with [`BatchError::RangeOverlap`] if a static draw wrote into the range this
/// frame, since the producer's data is gone.
pub fn set_index_range(
    buffer: &mut MeshBuffer,
    range: &DynamicRange,
) -> BatchResult<IndexRange> {
    let vertex_end = range.vertex_start as usize + range.vertex_count as usize;
    let vertex_capacity = buffer.vertex_capacity() as usize;
    if vertex_end > vertex_capacity {
        return Err(BatchError::OutOfBounds {
            end: vertex_end,
            len: vertex_capacity,
        });
    }
    let index_end = range.index_start as usize + range.index_count as usize;
    let index_capacity = buffer.index_capacity() as usize;
    if index_end > index_capacity {
        return Err(BatchError::OutOfBounds {
            end: index_end,
            len: index_capacity,
        });
    }

    let vertices = range.vertex_start..vertex_end as u32;
    let indices = range.index_start..index_end as u32;
    if buffer.overlaps_static(&vertices, &indices) {
        return Err(BatchError::RangeOverlap {
            vertex_start: range.vertex_start,
            index_start: range.index_start,
        });
    }

    buffer.advance_to(vertex_end as u32, index_end as u32);
    Ok(IndexRange {
        start: range.index_start,
        count: range.index_count,
    })
}

/// Pack a static draw: copy, transform, color, then append its indices.
pub fn pack_static(
    buffer: &mut MeshBuffer,
    vertices: &[f32],
    indices: &[u16],
    layout: VertexLayout,
    params: &PackParams<'_>,
) -> BatchResult<Packed> {
    let expected = buffer.layout().stride();
    if layout.stride() != expected {
        return Err(BatchError::LayoutMismatch {
            expected,
            actual: layout.stride(),
        });
    }

    let vertex_count = layout.vertex_count(vertices.len())?;
    if let Some(&max) = indices.iter().max()
        && max as u32 >= vertex_count
    {
        return Err(BatchError::OutOfBounds {
            end: max as usize + 1,
            len: vertex_count as usize,
        });
    }

    let base_vertex = buffer.vertex_offset();
    if base_vertex + vertex_count > MAX_VERTICES_PER_BUFFER {
        return Err(BatchError::IndexOverflow {
            base_vertex,
            vertex_count,
        });
    }

    let index_count = indices.len() as u32;
    buffer.reserve(vertex_count, index_count, params.policy)?;

    let records = buffer.vertex_records_mut(base_vertex, vertex_count);
    records.copy_from_slice(vertices);
    fill_vertex_buffers(records, vertices, layout, params.world);
    fill_colors(records, layout, params.color, params.opacity);
    buffer.advance_to(base_vertex + vertex_count, buffer.index_offset());

    let range = fill_index_buffers(buffer, indices, base_vertex);
    buffer.record_static(base_vertex..base_vertex + vertex_count, range.start..range.end());
    Ok(Packed {
        range,
        vertices_written: vertex_count,
        indices_written: index_count,
    })
}

/// Pack one draw into `buffer`. Sub-node draws carry no geometry and pack to an empty
/// range.
pub fn pack(
    buffer: &mut MeshBuffer,
    draw: &DrawInfo,
    params: &PackParams<'_>,
) -> BatchResult<Packed> {
    profile_function!();
    match &draw.kind {
        DrawKind::Static { vertices, indices } => {
            pack_static(buffer, vertices, indices, draw.layout, params)
        }
        DrawKind::Dynamic(range) => Ok(Packed {
            range: set_index_range(buffer, range)?,
            vertices_written: 0,
            indices_written: 0,
        }),
        DrawKind::SubNode(_) => Ok(Packed {
            range: IndexRange {
                start: buffer.index_offset(),
                count: 0,
            },
            vertices_written: 0,
            indices_written: 0,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_buffer::AccessorId;

    fn quad(x: f32) -> Vec<f32> {
        let mut v = Vec::new();
        for (px, py) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            v.extend_from_slice(&[x + px, py, 0.0, px, py, 0.5, 0.5, 0.5, 0.5]);
        }
        v
    }

    const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

    fn params(world: &Mat4) -> PackParams<'_> {
        PackParams {
            world,
            color: Color32::rgb(255, 0, 255),
            opacity: 0.25,
            policy: OverflowPolicy::Grow,
        }
    }

    #[test]
    fn test_static_pack_transforms_and_colors() {
        let mut buffer = MeshBuffer::new(VertexLayout::default(), 16, 16);
        let world = Mat4::from_translation(Vec3::new(10.0, 20.0, 0.0));

        let layout = VertexLayout::default();

        let packed =
            pack_static(&mut buffer, &quad(0.0), &QUAD_INDICES, layout, &params(&world)).unwrap();

        assert_eq!(packed.range, IndexRange { start: 0, count: 6 });
        let v = buffer.used_vertices();
        assert_eq!(v.len(), 36);
        // Second vertex: position moved, UV kept, color overwritten.
        assert_eq!(&v[9..18], &[11.0, 20.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.25]);
    }

    #[test]
    fn test_indices_are_rebased() {
        let mut buffer = MeshBuffer::new(VertexLayout::default(), 16, 16);
        let world = Mat4::IDENTITY;
        let layout = VertexLayout::default();

        pack_static(&mut buffer, &quad(0.0), &QUAD_INDICES, layout, &params(&world)).unwrap();
        let second =
            pack_static(&mut buffer, &quad(2.0), &QUAD_INDICES, layout, &params(&world)).unwrap();

        assert_eq!(second.range, IndexRange { start: 6, count: 6 });
        assert_eq!(&buffer.used_indices()[6..], &[4, 5, 6, 4, 6, 7]);
        assert_eq!(buffer.vertex_offset(), 8);
        assert_eq!(buffer.index_offset(), 12);
    }

    #[test]
    fn test_rejects_stride_mismatch() {
        let mut buffer = MeshBuffer::new(VertexLayout::default(), 16, 16);
        let narrow = VertexLayout::new(7, 0, 3).unwrap();
        let world = Mat4::IDENTITY;

        let err = pack_static(&mut buffer, &[0.0; 21], &[0, 1, 2], narrow, &params(&world));
        assert_eq!(
            err,
            Err(BatchError::LayoutMismatch {
                expected: 9,
                actual: 7
            })
        );
        assert_eq!(buffer.index_offset(), 0);
    }

    #[test]
    fn test_rejects_out_of_range_local_index() {
        let mut buffer = MeshBuffer::new(VertexLayout::default(), 16, 16);
        let world = Mat4::IDENTITY;

        let layout = VertexLayout::default();

        let err = pack_static(&mut buffer, &quad(0.0), &[0, 1, 4], layout, &params(&world));
        assert_eq!(err, Err(BatchError::OutOfBounds { end: 5, len: 4 }));
        assert!(!buffer.is_touched());
    }

    #[test]
    fn test_index_overflow() {
        let mut buffer = MeshBuffer::new(VertexLayout::default(), MAX_VERTICES_PER_BUFFER, 16);
        buffer.advance_to(MAX_VERTICES_PER_BUFFER - 2, 0);
        let world = Mat4::IDENTITY;

        let layout = VertexLayout::default();

        let err = pack_static(&mut buffer, &quad(0.0), &QUAD_INDICES, layout, &params(&world));
        assert_eq!(
            err,
            Err(BatchError::IndexOverflow {
                base_vertex: MAX_VERTICES_PER_BUFFER - 2,
                vertex_count: 4
            })
        );
    }

    #[test]
    fn test_dynamic_range_guard() {
        let mut buffer = MeshBuffer::new(VertexLayout::default(), 16, 24);
        let range = DynamicRange {
            vertex_start: 0,
            vertex_count: 8,
            index_start: 0,
            index_count: 12,
        };

        assert_eq!(
            set_index_range(&mut buffer, &range).unwrap(),
            IndexRange { start: 0, count: 12 }
        );
        // Re-applying the same range does not advance again.
        set_index_range(&mut buffer, &range).unwrap();
        assert_eq!(buffer.index_offset(), 12);
        assert_eq!(buffer.vertex_offset(), 8);
    }

    #[test]
    fn test_dynamic_range_over_static_data_is_refused() {
        let mut buffer = MeshBuffer::new(VertexLayout::default(), 16, 24);
        let world = Mat4::IDENTITY;
        let layout = VertexLayout::default();
        pack_static(&mut buffer, &quad(0.0), &QUAD_INDICES, layout, &params(&world)).unwrap();

        let under = DynamicRange {
            vertex_start: 0,
            vertex_count: 4,
            index_start: 0,
            index_count: 6,
        };
        assert_eq!(
            set_index_range(&mut buffer, &under),
            Err(BatchError::RangeOverlap {
                vertex_start: 0,
                index_start: 0
            })
        );
        assert_eq!(buffer.index_offset(), 6);

        // Above everything packed so far is fine.
        let above = DynamicRange {
            vertex_start: 4,
            vertex_count: 4,
            index_start: 6,
            index_count: 6,
        };
        assert!(set_index_range(&mut buffer, &above).is_ok());
        assert_eq!(buffer.vertex_offset(), 8);
    }

    #[test]
    fn test_claimed_range_stays_below_static_data() {
        let mut buffer = MeshBuffer::new(VertexLayout::default(), 16, 24);
        let claimed = buffer.claim(4, 6, OverflowPolicy::Grow).unwrap();
        let world = Mat4::IDENTITY;
        let layout = VertexLayout::default();

        let packed =
            pack_static(&mut buffer, &quad(0.0), &QUAD_INDICES, layout, &params(&world)).unwrap();
        assert_eq!(packed.range, IndexRange { start: 6, count: 6 });
        assert_eq!(
            set_index_range(&mut buffer, &claimed).unwrap(),
            IndexRange { start: 0, count: 6 }
        );
    }

    #[test]
    fn test_dynamic_range_out_of_bounds() {
        let mut buffer = MeshBuffer::new(VertexLayout::default(), 4, 6);
        let range = DynamicRange {
            vertex_start: 2,
            vertex_count: 4,
            index_start: 0,
            index_count: 6,
        };
        assert_eq!(
            set_index_range(&mut buffer, &range),
            Err(BatchError::OutOfBounds { end: 6, len: 4 })
        );
    }

    #[test]
    fn test_pack_dispatch_dynamic_writes_nothing() {
        let mut buffer = MeshBuffer::new(VertexLayout::default(), 8, 12);
        let draw = DrawInfo::new_dynamic(
            AccessorId(0),
            0,
            DynamicRange {
                vertex_start: 0,
                vertex_count: 4,
                index_start: 0,
                index_count: 6,
            },
        );
        let world = Mat4::IDENTITY;

        let packed = pack(&mut buffer, &draw, &params(&world)).unwrap();
        assert_eq!(packed.vertices_written, 0);
        assert_eq!(packed.range.count, 6);
        assert!(buffer.vertices().iter().all(|&f| f == 0.0));
    }
}
