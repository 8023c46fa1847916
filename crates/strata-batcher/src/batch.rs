//! Committed draw units and the pool they are recycled through.

use strata_test_utils::GpuDescriptorSet;

use crate::mesh_buffer::AccessorId;
use crate::packer::IndexRange;
use crate::resources::{MaterialId, SamplerId, TextureId};

/// Stencil configuration a draw is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilStage {
    /// No stencil test.
    #[default]
    Disabled,
    /// The draw writes a mask and enters a new stencil level.
    EnterLevel,
    /// The draw is clipped by the mask of the current level.
    Enabled,
}

/// Everything two draws must share to end up in the same batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub material: MaterialId,
    pub texture: Option<TextureId>,
    pub sampler: Option<SamplerId>,
    pub stencil_stage: StencilStage,
    /// Stencil reference value, the mask nesting depth.
    pub stencil_ref: u8,
    pub accessor: AccessorId,
    pub buffer: u16,
    /// Visibility layer bits of the owning node.
    pub layer: u32,
}

/// A single GPU draw covering a contiguous index range with one binding state.
#[derive(Debug, Clone)]
pub struct DrawBatch2D {
    key: BatchKey,
    hash: u64,
    range: IndexRange,
    descriptor_set: Option<GpuDescriptorSet>,
}

impl DrawBatch2D {
    fn new(key: BatchKey, hash: u64, range: IndexRange) -> Self {
        Self {
            key,
            hash,
            range,
            descriptor_set: None,
        }
    }

    fn reinit(&mut self, key: BatchKey, hash: u64, range: IndexRange) {
        self.key = key;
        self.hash = hash;
        self.range = range;
        self.descriptor_set = None;
    }

    pub fn key(&self) -> &BatchKey {
        &self.key
    }

    /// Combined identity hash of the key.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn material(&self) -> MaterialId {
        self.key.material
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.key.texture
    }

    pub fn sampler(&self) -> Option<SamplerId> {
        self.key.sampler
    }

    pub fn stencil_stage(&self) -> StencilStage {
        self.key.stencil_stage
    }

    pub fn accessor(&self) -> AccessorId {
        self.key.accessor
    }

    pub fn buffer(&self) -> u16 {
        self.key.buffer
    }

    pub fn index_start(&self) -> u32 {
        self.range.start
    }

    pub fn index_count(&self) -> u32 {
        self.range.count
    }

    pub fn index_range(&self) -> IndexRange {
        self.range
    }

    /// Descriptor set bound for this batch, resolved at the end of `update`.
    pub fn descriptor_set(&self) -> Option<&GpuDescriptorSet> {
        self.descriptor_set.as_ref()
    }

    pub(crate) fn extend(&mut self, count: u32) {
        self.range.count += count;
    }

    pub(crate) fn set_descriptor_set(&mut self, set: Option<GpuDescriptorSet>) {
        self.descriptor_set = set;
    }
}

/// Stable reference to a batch acquired from a [`BatchPool`].
///
/// Ids carry the pool epoch they were acquired in, so an id kept across
/// [`BatchPool::recycle_all`] no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchId {
    index: u32,
    epoch: u32,
}

/// Arena of batch objects, recycled as a whole once per frame.
#[derive(Default)]
pub struct BatchPool {
    slots: Vec<DrawBatch2D>,
    live: Vec<bool>,
    free: Vec<u32>,
    epoch: u32,
}

impl BatchPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a batch from the free list, or grow the arena when it is empty.
    pub fn acquire(&mut self, key: BatchKey, hash: u64, range: IndexRange) -> BatchId {
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].reinit(key, hash, range);
                self.live[index as usize] = true;
                index
            }
            None => {
                self.slots.push(DrawBatch2D::new(key, hash, range));
                self.live.push(true);
                (self.slots.len() - 1) as u32
            }
        };
        BatchId {
            index,
            epoch: self.epoch,
        }
    }

    fn is_live(&self, id: BatchId) -> bool {
        id.epoch == self.epoch && self.live.get(id.index as usize).copied().unwrap_or(false)
    }

    pub fn get(&self, id: BatchId) -> Option<&DrawBatch2D> {
        if !self.is_live(id) {
            return None;
        }
        self.slots.get(id.index as usize)
    }

    pub fn get_mut(&mut self, id: BatchId) -> Option<&mut DrawBatch2D> {
        if !self.is_live(id) {
            return None;
        }
        self.slots.get_mut(id.index as usize)
    }

    /// Return every batch to the free list. Ids handed out before are invalidated.
    pub fn recycle_all(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.live.fill(false);
        self.free.clear();
        self.free.extend((0..self.slots.len() as u32).rev());
    }

    /// Number of batch objects ever allocated.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of batches acquired since the last recycle.
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

/// Statistics of the last filled frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats2D {
    /// Draw infos handed to the merger, sub-node draws excluded.
    pub draw_infos: u32,
    /// Draws that extended an open batch.
    pub merged_draws: u32,
    /// Draws rejected by the packer.
    pub dropped_draws: u32,
    /// Draws skipped because they have no indices.
    pub empty_draws: u32,
    /// Batches committed.
    pub batches: u32,
    pub vertices_written: u32,
    pub indices_written: u32,
    /// Descriptor sets allocated while resolving this frame's batches.
    pub descriptor_sets_allocated: u32,
    pub descriptor_cache_hits: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(material: u32) -> BatchKey {
        BatchKey {
            material: MaterialId(material),
            texture: None,
            sampler: None,
            stencil_stage: StencilStage::Disabled,
            stencil_ref: 0,
            accessor: AccessorId(0),
            buffer: 0,
            layer: 1,
        }
    }

    fn range(start: u32, count: u32) -> IndexRange {
        IndexRange { start, count }
    }

    #[test]
    fn test_acquire_and_get() {
        let mut pool = BatchPool::new();
        let id = pool.acquire(key(1), 42, range(0, 6));

        let batch = pool.get(id).unwrap();
        assert_eq!(batch.material(), MaterialId(1));
        assert_eq!(batch.hash(), 42);
        assert_eq!(batch.index_count(), 6);
    }

    #[test]
    fn test_recycle_reuses_objects() {
        let mut pool = BatchPool::new();
        let a = pool.acquire(key(1), 1, range(0, 6));
        pool.acquire(key(2), 2, range(6, 6));
        assert_eq!(pool.capacity(), 2);

        pool.recycle_all();
        assert_eq!(pool.live_count(), 0);
        assert!(pool.get(a).is_none());

        let c = pool.acquire(key(3), 3, range(0, 3));
        assert_eq!(pool.capacity(), 2);
        assert_eq!(pool.live_count(), 1);
        // Same slot as `a`, different epoch.
        assert_ne!(a, c);
        assert_eq!(pool.get(c).map(DrawBatch2D::material), Some(MaterialId(3)));
        assert!(pool.get(c).and_then(DrawBatch2D::descriptor_set).is_none());
    }

    #[test]
    fn test_extend() {
        let mut pool = BatchPool::new();
        let id = pool.acquire(key(1), 1, range(12, 6));
        pool.get_mut(id).unwrap().extend(4);
        assert_eq!(pool.get(id).unwrap().index_range(), range(12, 10));
    }
}
