//! Descriptor-set cache keyed by texture and sampler identity.
//!
//! Allocating descriptor sets is expensive, so batches with the same texture and sampler
//! share one. Entries live until the owner of the texture or sampler evicts them; there is
//! no size bound and no LRU.
//!
//! A missing texture or sampler is a valid half of the key. The set is then built with
//! the fallback from [`DescriptorBindings`], a 1x1 white texture or a nearest sampler, so
//! solid batches bind the same layout as textured ones.

use strata_core::alloc::HashMap;
use strata_core::profiling::profile_function;
use strata_test_utils::{
    DescriptorSetDescriptor, GpuBindGroupLayout, GpuDescriptorSet, GpuSampler, GpuTexture,
    RenderContext,
};

use crate::resources::{ResourceEvent, ResourceRegistry, SamplerId, TextureId};

/// Identity pair a descriptor set is cached under. Either half may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorKey {
    pub texture: Option<TextureId>,
    pub sampler: Option<SamplerId>,
}

impl DescriptorKey {
    pub fn new(texture: Option<TextureId>, sampler: Option<SamplerId>) -> Self {
        Self { texture, sampler }
    }
}

/// Device objects every descriptor set is built against.
pub struct DescriptorBindings {
    pub layout: GpuBindGroupLayout,
    /// Bound when a batch has no texture.
    pub fallback_texture: GpuTexture,
    /// Bound when a batch has no sampler.
    pub fallback_sampler: GpuSampler,
}

impl DescriptorBindings {
    /// Create the texture + sampler layout and the fallbacks on `device`.
    pub fn new(device: &dyn RenderContext, label: &str) -> Self {
        let layout_label = format!("{}_descriptor_layout", label);
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&layout_label),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let texture_label = format!("{}_fallback_texture", label);
        let fallback_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&texture_label),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        device.write_texture(&fallback_texture, &[255, 255, 255, 255]);

        let sampler_label = format!("{}_fallback_sampler", label);
        let fallback_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&sampler_label),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            layout,
            fallback_texture,
            fallback_sampler,
        }
    }
}

#[derive(Default)]
pub struct DescriptorSetCache {
    entries: HashMap<DescriptorKey, GpuDescriptorSet>,
    hits: u64,
    allocations: u64,
}

impl DescriptorSetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the descriptor set for `(texture, sampler)`, allocating it on first use.
    ///
    /// Yields `None` when the device cannot build the set, or when the texture or sampler
    /// is no longer registered. In the latter case any entry cached for the pair is
    /// evicted first.
    pub fn get_descriptor_set(
        &mut self,
        device: &dyn RenderContext,
        bindings: &DescriptorBindings,
        resources: &ResourceRegistry,
        texture: Option<TextureId>,
        sampler: Option<SamplerId>,
    ) -> Option<GpuDescriptorSet> {
        profile_function!();
        let key = DescriptorKey::new(texture, sampler);

        let gpu_texture = match texture {
            Some(id) => match resources.texture(id) {
                Some(texture) => Some(texture),
                None => {
                    tracing::warn!("Descriptor set requested for destroyed texture {:?}", id);
                    self.evict(device, &key);
                    return None;
                }
            },
            None => None,
        };
        let gpu_sampler = match sampler {
            Some(id) => match resources.sampler(id) {
                Some(sampler) => Some(sampler),
                None => {
                    tracing::warn!("Descriptor set requested for destroyed sampler {:?}", id);
                    self.evict(device, &key);
                    return None;
                }
            },
            None => None,
        };

        if let Some(set) = self.entries.get(&key) {
            self.hits += 1;
            return Some(set.clone());
        }

        let Some(set) = device.create_descriptor_set(&DescriptorSetDescriptor {
            label: Some("batcher2d_descriptor_set"),
            layout: &bindings.layout,
            texture: Some(gpu_texture.unwrap_or(&bindings.fallback_texture)),
            sampler: Some(gpu_sampler.unwrap_or(&bindings.fallback_sampler)),
        }) else {
            tracing::warn!("Device failed to allocate a descriptor set for {:?}", key);
            return None;
        };

        tracing::debug!("Allocated descriptor set for {:?}", key);
        self.allocations += 1;
        self.entries.insert(key, set.clone());
        Some(set)
    }

    fn evict(&mut self, device: &dyn RenderContext, key: &DescriptorKey) -> bool {
        match self.entries.remove(key) {
            Some(set) => {
                device.destroy_descriptor_set(set);
                true
            }
            None => false,
        }
    }

    /// Evict and destroy the entry for `(texture, sampler)`. Returns whether one existed.
    pub fn release_descriptor_set_cache(
        &mut self,
        device: &dyn RenderContext,
        texture: Option<TextureId>,
        sampler: Option<SamplerId>,
    ) -> bool {
        self.evict(device, &DescriptorKey::new(texture, sampler))
    }

    /// Evict every entry matching `filter`. Returns how many were evicted.
    fn evict_where(
        &mut self,
        device: &dyn RenderContext,
        filter: impl Fn(&DescriptorKey) -> bool,
    ) -> usize {
        let keys: Vec<DescriptorKey> = self
            .entries
            .keys()
            .filter(|key| filter(key))
            .copied()
            .collect();
        for key in &keys {
            self.evict(device, key);
        }
        keys.len()
    }

    /// Drop every entry that references a destroyed resource.
    pub fn handle_event(&mut self, device: &dyn RenderContext, event: &ResourceEvent) -> usize {
        let evicted = match *event {
            ResourceEvent::TextureDestroyed(id) => {
                self.evict_where(device, |key| key.texture == Some(id))
            }
            ResourceEvent::SamplerDestroyed(id) => {
                self.evict_where(device, |key| key.sampler == Some(id))
            }
        };
        if evicted > 0 {
            tracing::debug!("{:?} evicted {} descriptor sets", event, evicted);
        }
        evicted
    }

    /// Destroy every cached set.
    pub fn clear(&mut self, device: &dyn RenderContext) {
        for (_, set) in self.entries.drain() {
            device.destroy_descriptor_set(set);
        }
    }

    pub fn contains(&self, texture: Option<TextureId>, sampler: Option<SamplerId>) -> bool {
        self.entries.contains_key(&DescriptorKey::new(texture, sampler))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups served from the cache since creation.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Descriptor sets allocated since creation.
    pub fn allocations(&self) -> u64 {
        self.allocations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_test_utils::{MockRenderContext, RenderCall};

    struct Fixture {
        device: MockRenderContext,
        bindings: DescriptorBindings,
        resources: ResourceRegistry,
        texture: TextureId,
        sampler: SamplerId,
    }

    fn fixture() -> Fixture {
        let mut resources = ResourceRegistry::new();
        let texture = resources.register_texture(GpuTexture::mock(7, 16, 16));
        let sampler = resources.register_sampler(GpuSampler::mock(7));
        let device = MockRenderContext::new();
        Fixture {
            bindings: DescriptorBindings::new(&device, "test"),
            device,
            resources,
            texture,
            sampler,
        }
    }

    fn lookup(f: &Fixture, cache: &mut DescriptorSetCache) -> Option<usize> {
        cache
            .get_descriptor_set(
                &f.device,
                &f.bindings,
                &f.resources,
                Some(f.texture),
                Some(f.sampler),
            )
            .and_then(|set| set.mock_id())
    }

    #[test]
    fn test_same_pair_same_set() {
        let f = fixture();
        let mut cache = DescriptorSetCache::new();

        let first = lookup(&f, &mut cache);
        let second = lookup(&f, &mut cache);

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(f.device.count_descriptor_set_creates(), 1);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn test_release_allocates_fresh_set() {
        let f = fixture();
        let mut cache = DescriptorSetCache::new();

        let first = lookup(&f, &mut cache);
        assert!(cache.release_descriptor_set_cache(&f.device, Some(f.texture), Some(f.sampler)));
        let second = lookup(&f, &mut cache);

        assert_ne!(first, second);
        assert_eq!(f.device.count_descriptor_set_destroys(), 1);
        assert!(!cache.release_descriptor_set_cache(&f.device, None, None));
    }

    #[test]
    fn test_missing_halves_are_valid_keys() {
        let f = fixture();
        let mut cache = DescriptorSetCache::new();

        let untextured =
            cache.get_descriptor_set(&f.device, &f.bindings, &f.resources, None, None);
        assert!(untextured.is_some());
        assert!(cache.contains(None, None));
        assert_eq!(cache.len(), 1);

        // Served from the cache from then on.
        cache.get_descriptor_set(&f.device, &f.bindings, &f.resources, None, None);
        assert_eq!(cache.hits(), 1);
        assert_eq!(f.device.count_descriptor_set_creates(), 1);
    }

    #[test]
    fn test_absent_halves_bind_fallbacks() {
        let f = fixture();
        let mut cache = DescriptorSetCache::new();
        let fallback_texture = f.bindings.fallback_texture.mock_id();
        let fallback_sampler = f.bindings.fallback_sampler.mock_id();

        cache.get_descriptor_set(&f.device, &f.bindings, &f.resources, None, Some(f.sampler));
        cache.get_descriptor_set(&f.device, &f.bindings, &f.resources, Some(f.texture), None);

        let bound: Vec<_> = f
            .device
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                RenderCall::CreateDescriptorSet {
                    texture, sampler, ..
                } => Some((texture, sampler)),
                _ => None,
            })
            .collect();
        assert_eq!(
            bound,
            vec![(fallback_texture, Some(7)), (Some(7), fallback_sampler)]
        );
    }

    #[test]
    fn test_stale_texture_evicts_entry() {
        let mut f = fixture();
        let mut cache = DescriptorSetCache::new();
        lookup(&f, &mut cache);

        f.resources.remove_texture(f.texture);

        assert_eq!(lookup(&f, &mut cache), None);
        assert!(cache.is_empty());
        assert_eq!(f.device.count_descriptor_set_destroys(), 1);
    }

    #[test]
    fn test_destroy_event_evicts_every_match() {
        let mut f = fixture();
        let other_sampler = f.resources.register_sampler(GpuSampler::mock(1));
        let mut cache = DescriptorSetCache::new();

        lookup(&f, &mut cache);
        let (device, bindings, resources) = (&f.device, &f.bindings, &f.resources);
        let texture = Some(f.texture);
        cache.get_descriptor_set(device, bindings, resources, texture, Some(other_sampler));
        cache.get_descriptor_set(device, bindings, resources, None, Some(other_sampler));
        assert_eq!(cache.len(), 3);

        let evicted = cache.handle_event(&f.device, &ResourceEvent::TextureDestroyed(f.texture));
        assert_eq!(evicted, 2);
        assert!(cache.contains(None, Some(other_sampler)));
    }

    #[test]
    fn test_device_failure_is_not_cached() {
        let f = fixture();
        let mut cache = DescriptorSetCache::new();
        f.device.fail_descriptor_sets(true);

        assert_eq!(lookup(&f, &mut cache), None);
        assert!(cache.is_empty());

        f.device.fail_descriptor_sets(false);
        assert!(lookup(&f, &mut cache).is_some());
    }
}
