//! Batcher configuration.

use crate::error::{BatchError, BatchResult};
use crate::vertex::{MAX_VERTICES_PER_BUFFER, VertexLayout};

/// What to do when a static draw does not fit its mesh buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Enlarge the CPU storage (at least doubling), up to the 16-bit vertex limit.
    #[default]
    Grow,
    /// Reject the draw and log it.
    Drop,
}

/// Configuration for [`Batcher2d`](crate::Batcher2d).
///
/// # Example
///
/// ```
/// use strata_batcher::{BatcherConfig, OverflowPolicy};
///
/// let config = BatcherConfig::default()
///     .with_vertex_capacity(1024)
///     .with_overflow_policy(OverflowPolicy::Drop);
/// assert_eq!(config.initial_vertex_capacity, 1024);
/// ```
#[derive(Debug, Clone)]
pub struct BatcherConfig {
    /// Vertices per mesh buffer created by the batcher.
    pub initial_vertex_capacity: u32,
    /// Indices per mesh buffer created by the batcher.
    pub initial_index_capacity: u32,
    pub overflow_policy: OverflowPolicy,
    /// Layout of mesh buffers created by the batcher.
    pub vertex_layout: VertexLayout,
    /// Prefix for GPU object labels.
    pub label: String,
}

impl BatcherConfig {
    pub fn with_vertex_capacity(mut self, vertices: u32) -> Self {
        self.initial_vertex_capacity = vertices;
        self
    }

    pub fn with_index_capacity(mut self, indices: u32) -> Self {
        self.initial_index_capacity = indices;
        self
    }

    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    pub fn with_vertex_layout(mut self, layout: VertexLayout) -> Self {
        self.vertex_layout = layout;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub(crate) fn validate(&self) -> BatchResult<()> {
        let vertices = self.initial_vertex_capacity;
        if vertices == 0 || vertices > MAX_VERTICES_PER_BUFFER {
            return Err(BatchError::InvalidConfig {
                reason: format!(
                    "initial_vertex_capacity must be in 1..={}, got {}",
                    MAX_VERTICES_PER_BUFFER, vertices
                ),
            });
        }
        if self.initial_index_capacity == 0 {
            return Err(BatchError::InvalidConfig {
                reason: "initial_index_capacity must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            initial_vertex_capacity: 4096,
            initial_index_capacity: 6144,
            overflow_policy: OverflowPolicy::Grow,
            vertex_layout: VertexLayout::default(),
            label: "batcher2d".to_string(),
        }
    }
}
