//! Streaming greedy merge of draws into batches.
//!
//! Draws arrive in paint order. A draw extends the open batch when it has the same
//! identity and its indices start where the batch ends; anything else commits the open
//! batch and starts a new one. Draws are never reordered.

use strata_core::alloc::{RandomState, stable_hasher};
use strata_core::profiling::profile_function;

use crate::batch::{BatchId, BatchKey, BatchPool, BatchStats2D, DrawBatch2D};
use crate::config::OverflowPolicy;
use crate::entity::DrawInfo;
use crate::error::{BatchError, BatchResult};
use crate::mesh_buffer::MeshBufferStore;
use crate::packer::{self, PackParams};
use crate::walker::EntityFrame;

/// What [`BatchMerger::merge`] did with a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The open batch grew.
    Extended,
    /// A new batch was opened, committing the previous one.
    Opened,
    /// The draw had nothing to draw.
    Skipped,
}

/// Identity a draw is batched under.
pub fn batch_key(draw: &DrawInfo, frame: &EntityFrame<'_>) -> BatchKey {
    BatchKey {
        material: draw.material,
        texture: draw.texture,
        sampler: draw.sampler,
        stencil_stage: frame.stencil_stage,
        stencil_ref: frame.stencil_ref,
        accessor: draw.accessor,
        buffer: draw.buffer,
        layer: frame.layer,
    }
}

pub struct BatchMerger {
    pool: BatchPool,
    committed: Vec<BatchId>,
    open: Option<BatchId>,
    current_hash: Option<u64>,
    hasher: RandomState,
    stats: BatchStats2D,
}

impl BatchMerger {
    pub fn new() -> Self {
        Self {
            pool: BatchPool::new(),
            committed: Vec::new(),
            open: None,
            current_hash: None,
            hasher: stable_hasher(),
            stats: BatchStats2D::default(),
        }
    }

    /// Pack `draw` into its mesh buffer and fold it into the open batch or a new one.
    ///
    /// On error nothing was written and the open batch is unchanged.
    pub fn merge(
        &mut self,
        buffers: &mut MeshBufferStore,
        draw: &DrawInfo,
        frame: &EntityFrame<'_>,
        policy: OverflowPolicy,
    ) -> BatchResult<MergeOutcome> {
        profile_function!();
        if draw.mode().is_none() {
            return Ok(MergeOutcome::Skipped);
        }
        self.stats.draw_infos += 1;
        if draw.index_count() == 0 {
            tracing::trace!("Skipping empty draw of node {:?}", frame.node);
            self.stats.empty_draws += 1;
            return Ok(MergeOutcome::Skipped);
        }

        let key = batch_key(draw, frame);
        let hash = self.hasher.hash_one(key);

        let buffer = buffers
            .get_mut(draw.accessor, draw.buffer)
            .ok_or(BatchError::MissingMeshBuffer {
                accessor: draw.accessor,
                buffer: draw.buffer,
            })?;
        let packed = packer::pack(
            buffer,
            draw,
            &PackParams {
                world: frame.world,
                color: frame.entity.color,
                opacity: frame.opacity,
                policy,
            },
        )?;
        self.stats.vertices_written += packed.vertices_written;
        self.stats.indices_written += packed.indices_written;

        if let Some(id) = self.open
            && self.current_hash == Some(hash)
            && let Some(batch) = self.pool.get_mut(id)
            && batch.key() == &key
            && batch.index_range().end() == packed.range.start
        {
            batch.extend(packed.range.count);
            self.stats.merged_draws += 1;
            tracing::trace!("Extended batch to {} indices", batch.index_count());
            return Ok(MergeOutcome::Extended);
        }

        self.flush();
        self.open = Some(self.pool.acquire(key, hash, packed.range));
        self.current_hash = Some(hash);
        Ok(MergeOutcome::Opened)
    }

    /// Commit the open batch, if any.
    pub fn flush(&mut self) {
        let Some(id) = self.open.take() else {
            return;
        };
        self.current_hash = None;
        if let Some(batch) = self.pool.get(id) {
            tracing::debug!(
                "Committing batch {} ({} indices from {})",
                self.committed.len(),
                batch.index_count(),
                batch.index_start()
            );
        }
        self.committed.push(id);
        self.stats.batches += 1;
    }

    /// Recycle every batch and forget the open one.
    pub fn reset(&mut self) {
        self.pool.recycle_all();
        self.committed.clear();
        self.open = None;
        self.current_hash = None;
        self.stats = BatchStats2D::default();
    }

    /// Committed batches in paint order.
    pub fn batches(&self) -> impl Iterator<Item = &DrawBatch2D> {
        self.committed.iter().filter_map(|&id| self.pool.get(id))
    }

    pub(crate) fn for_each_batch_mut(&mut self, mut f: impl FnMut(&mut DrawBatch2D)) {
        for &id in &self.committed {
            if let Some(batch) = self.pool.get_mut(id) {
                f(batch);
            }
        }
    }

    /// The batch still accepting draws.
    pub fn open_batch(&self) -> Option<&DrawBatch2D> {
        self.open.and_then(|id| self.pool.get(id))
    }

    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub fn pool(&self) -> &BatchPool {
        &self.pool
    }

    pub fn stats(&self) -> &BatchStats2D {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut BatchStats2D {
        &mut self.stats
    }
}

impl Default for BatchMerger {
    fn default() -> Self {
        Self::new()
    }
}
