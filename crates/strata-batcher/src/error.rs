//! Error types for the batcher.

use std::fmt;

use crate::mesh_buffer::AccessorId;
use crate::scene::NodeId;

/// Errors reported by the batcher and its collaborators.
///
/// Per-draw errors never abort a frame: the frame controller drops the offending draw,
/// counts it in [`BatchStats2D`](crate::BatchStats2D) and keeps walking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// `update` or `upload_buffers` was called before a successful `initialize`.
    NotInitialized,

    /// `update` was called twice without a `reset` in between.
    FrameNotReset,

    /// A vertex layout does not fit its stride, or vertex data is not a whole number of records.
    InvalidLayout {
        /// Description of what is wrong with the layout.
        reason: String,
    },

    /// The batcher configuration cannot be used.
    InvalidConfig {
        /// Description of the offending setting.
        reason: String,
    },

    /// A draw uses a different vertex stride than the mesh buffer it targets.
    LayoutMismatch {
        /// Stride of the mesh buffer, in floats.
        expected: u32,
        /// Stride carried by the draw, in floats.
        actual: u32,
    },

    /// A mesh buffer is full and the overflow policy does not allow growing it.
    CapacityExceeded {
        /// Number of elements the write needed.
        required: usize,
        /// Number of elements the buffer can hold.
        capacity: usize,
    },

    /// Writing the draw would push a vertex index past the 16-bit range.
    IndexOverflow {
        /// First vertex the draw would be written to.
        base_vertex: u32,
        /// Number of vertices in the draw.
        vertex_count: u32,
    },

    /// A range or local index points outside the storage it refers to.
    OutOfBounds {
        /// Exclusive end of the offending range.
        end: usize,
        /// Length of the storage.
        len: usize,
    },

    /// A dynamic range covers geometry a static draw already packed this frame.
    RangeOverlap {
        /// First vertex of the dynamic range.
        vertex_start: u32,
        /// First index of the dynamic range.
        index_start: u32,
    },

    /// No mesh buffer is registered for the given accessor and buffer index.
    MissingMeshBuffer {
        accessor: AccessorId,
        buffer: u16,
    },

    /// A node handle refers to a node that was removed.
    StaleNode {
        node: NodeId,
    },

    /// Attaching the child would make a node its own ancestor.
    HierarchyCycle {
        parent: NodeId,
        child: NodeId,
    },
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::NotInitialized => {
                write!(f, "Batcher used before a successful initialize()")
            }
            BatchError::FrameNotReset => {
                write!(f, "update() called again without reset()")
            }
            BatchError::InvalidLayout { reason } => {
                write!(f, "Invalid vertex layout: {}", reason)
            }
            BatchError::InvalidConfig { reason } => {
                write!(f, "Invalid batcher configuration: {}", reason)
            }
            BatchError::LayoutMismatch { expected, actual } => {
                write!(
                    f,
                    "Vertex stride mismatch: buffer uses {} floats, draw uses {}",
                    expected, actual
                )
            }
            BatchError::CapacityExceeded { required, capacity } => {
                write!(
                    f,
                    "Mesh buffer capacity exceeded: need {}, have {}",
                    required, capacity
                )
            }
            BatchError::IndexOverflow {
                base_vertex,
                vertex_count,
            } => {
                write!(
                    f,
                    "16-bit index overflow: {} vertices at base {}",
                    vertex_count, base_vertex
                )
            }
            BatchError::OutOfBounds { end, len } => {
                write!(f, "Range end {} is out of bounds for length {}", end, len)
            }
            BatchError::RangeOverlap {
                vertex_start,
                index_start,
            } => {
                write!(
                    f,
                    "Dynamic range at vertex {} / index {} overlaps packed geometry",
                    vertex_start, index_start
                )
            }
            BatchError::MissingMeshBuffer { accessor, buffer } => {
                write!(f, "No mesh buffer {} for accessor {}", buffer, accessor.0)
            }
            BatchError::StaleNode { node } => {
                write!(f, "Node {:?} no longer exists", node)
            }
            BatchError::HierarchyCycle { parent, child } => {
                write!(
                    f,
                    "Cannot attach {:?} under {:?}: it is an ancestor",
                    child, parent
                )
            }
        }
    }
}

impl std::error::Error for BatchError {}

/// Result type for batcher operations.
pub type BatchResult<T> = Result<T, BatchError>;
