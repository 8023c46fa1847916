//! Texture and sampler registry.
//!
//! The batcher never owns textures or samplers. It refers to them through generational
//! ids, so a lookup after the owner removed the resource yields `None` instead of a
//! dangling reference. Owners announce removals with a [`ResourceEvent`].

use strata_core::alloc::sparse_set::{IndexSlot, SparseSet};
use strata_test_utils::{GpuSampler, GpuTexture};

/// Handle to a texture registered in a [`ResourceRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(IndexSlot);

/// Handle to a sampler registered in a [`ResourceRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SamplerId(IndexSlot);

/// Identity of a material. Materials are owned elsewhere; only the identity takes part
/// in batching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MaterialId(pub u32);

/// Invalidation message sent by the owner of a texture or sampler when it is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceEvent {
    TextureDestroyed(TextureId),
    SamplerDestroyed(SamplerId),
}

/// Owner-side storage for textures and samplers referenced by draws.
#[derive(Default)]
pub struct ResourceRegistry {
    textures: SparseSet<GpuTexture>,
    samplers: SparseSet<GpuSampler>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_texture(&mut self, texture: GpuTexture) -> TextureId {
        TextureId(self.textures.push(texture))
    }

    pub fn register_sampler(&mut self, sampler: GpuSampler) -> SamplerId {
        SamplerId(self.samplers.push(sampler))
    }

    /// Look up a texture, `None` once it has been removed.
    pub fn texture(&self, id: TextureId) -> Option<&GpuTexture> {
        self.textures.try_get(id.0)
    }

    pub fn sampler(&self, id: SamplerId) -> Option<&GpuSampler> {
        self.samplers.try_get(id.0)
    }

    /// Remove a texture and return the event to forward to every batcher that may have
    /// cached a descriptor set for it.
    pub fn remove_texture(&mut self, id: TextureId) -> Option<(GpuTexture, ResourceEvent)> {
        self.textures
            .try_remove(id.0)
            .map(|texture| (texture, ResourceEvent::TextureDestroyed(id)))
    }

    pub fn remove_sampler(&mut self, id: SamplerId) -> Option<(GpuSampler, ResourceEvent)> {
        self.samplers
            .try_remove(id.0)
            .map(|sampler| (sampler, ResourceEvent::SamplerDestroyed(id)))
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn sampler_count(&self) -> usize {
        self.samplers.len()
    }
}
