//! Vertex record layout shared between geometry producers and the packer.

use crate::error::{BatchError, BatchResult};

/// Maximum number of vertices one mesh buffer can address with 16-bit indices.
pub const MAX_VERTICES_PER_BUFFER: u32 = u16::MAX as u32 + 1;

/// Describes where the packer finds positions and colors inside a vertex record.
///
/// All values are counted in `f32` slots. Position takes three consecutive slots
/// (x, y, z) and color takes four (r, g, b, opacity). Slots outside those two runs
/// belong to the producer (UVs and the like) and are copied through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    stride: u32,
    position: u32,
    color: u32,
}

impl VertexLayout {
    /// Position, UV, then color: `[x, y, z, u, v, r, g, b, a]`.
    pub const POSITION_UV_COLOR: VertexLayout = VertexLayout {
        stride: 9,
        position: 0,
        color: 5,
    };

    pub const POSITION_COUNT: u32 = 3;
    pub const COLOR_COUNT: u32 = 4;

    /// Create a layout, checking that both runs fit the stride without overlapping.
    pub fn new(stride: u32, position: u32, color: u32) -> BatchResult<Self> {
        if position + Self::POSITION_COUNT > stride {
            return Err(BatchError::InvalidLayout {
                reason: format!(
                    "position slots {}..{} exceed stride {}",
                    position,
                    position + Self::POSITION_COUNT,
                    stride
                ),
            });
        }
        if color + Self::COLOR_COUNT > stride {
            return Err(BatchError::InvalidLayout {
                reason: format!(
                    "color slots {}..{} exceed stride {}",
                    color,
                    color + Self::COLOR_COUNT,
                    stride
                ),
            });
        }
        let overlaps =
            position < color + Self::COLOR_COUNT && color < position + Self::POSITION_COUNT;
        if overlaps {
            return Err(BatchError::InvalidLayout {
                reason: format!("position slot {} overlaps color slot {}", position, color),
            });
        }
        Ok(Self {
            stride,
            position,
            color,
        })
    }

    /// Floats per vertex record.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Slot of the x component.
    pub fn position_offset(&self) -> u32 {
        self.position
    }

    /// Slot of the red component.
    pub fn color_offset(&self) -> u32 {
        self.color
    }

    /// Size of one vertex record in bytes.
    pub fn byte_stride(&self) -> u64 {
        self.stride as u64 * std::mem::size_of::<f32>() as u64
    }

    /// Number of whole records in `floats`, or an error if there is a partial record.
    pub fn vertex_count(&self, floats: usize) -> BatchResult<u32> {
        let stride = self.stride as usize;
        if floats % stride != 0 {
            return Err(BatchError::InvalidLayout {
                reason: format!("{} floats is not a multiple of stride {}", floats, stride),
            });
        }
        Ok((floats / stride) as u32)
    }
}

impl Default for VertexLayout {
    fn default() -> Self {
        Self::POSITION_UV_COLOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let layout = VertexLayout::default();
        assert_eq!(layout.stride(), 9);
        assert_eq!(layout.position_offset(), 0);
        assert_eq!(layout.color_offset(), 5);
        assert_eq!(layout.byte_stride(), 36);
    }

    #[test]
    fn test_compact_layout() {
        let layout = VertexLayout::new(7, 0, 3).unwrap();
        assert_eq!(layout.stride(), 7);
    }

    #[test]
    fn test_rejects_bad_layouts() {
        assert!(VertexLayout::new(6, 0, 3).is_err());
        assert!(VertexLayout::new(9, 7, 0).is_err());
        assert!(VertexLayout::new(9, 2, 4).is_err());
    }

    #[test]
    fn test_vertex_count() {
        let layout = VertexLayout::default();
        assert_eq!(layout.vertex_count(36).unwrap(), 4);
        assert!(matches!(
            layout.vertex_count(10),
            Err(BatchError::InvalidLayout { .. })
        ));
    }
}
