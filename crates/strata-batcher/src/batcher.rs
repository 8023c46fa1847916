//! Frame controller: the public face of the batcher.
//!
//! One frame is `reset` → `update` → `upload_buffers`. `update` walks the registered
//! roots, packs geometry and commits batches in paint order, then binds a descriptor set
//! to every batch. The mesh buffers and the descriptor-set cache outlive the frame; the
//! batches do not.

use std::sync::Arc;

use strata_core::profiling::profile_function;
use strata_test_utils::{GpuBindGroupLayout, GpuDescriptorSet, RenderContext};

use crate::batch::{BatchStats2D, DrawBatch2D};
use crate::config::{BatcherConfig, OverflowPolicy};
use crate::descriptor_cache::{DescriptorBindings, DescriptorSetCache};
use crate::entity::{DrawInfo, DynamicRange};
use crate::error::{BatchError, BatchResult};
use crate::merger::BatchMerger;
use crate::mesh_buffer::{AccessorId, MeshBuffer, MeshBufferStore};
use crate::resources::{ResourceEvent, ResourceRegistry, SamplerId, TextureId};
use crate::scene::{NodeId, SceneGraph};
use crate::walker::{DrawSink, EntityFrame, SceneWalker};

/// Where the batcher is in its frame cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramePhase {
    /// Reset (or fresh); `update` may run.
    #[default]
    Idle,
    /// Batches are committed and buffers filled.
    Filled,
    /// Buffers were pushed to the device.
    Uploaded,
}

/// Feeds walked draws into the merger. Failed draws are dropped and counted.
struct MergeSink<'a> {
    merger: &'a mut BatchMerger,
    buffers: &'a mut MeshBufferStore,
    policy: OverflowPolicy,
}

impl DrawSink for MergeSink<'_> {
    fn draw(&mut self, frame: &EntityFrame<'_>, draw: &DrawInfo) {
        if let Err(err) = self.merger.merge(self.buffers, draw, frame, self.policy) {
            tracing::warn!("Dropping draw of node {:?}: {}", frame.node, err);
            self.merger.stats_mut().dropped_draws += 1;
        }
    }

    fn end_root(&mut self, _root: NodeId) {
        self.merger.flush();
    }
}

/// Batches a scene's 2D draws into as few GPU draws as paint order allows.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use strata_batcher::{
///     Batcher2d, BatcherConfig, GraphicsContext, ResourceRegistry, SceneGraph,
/// };
///
/// let context = GraphicsContext::new_owned_sync().expect("no GPU");
/// let mut batcher = Batcher2d::new(context, BatcherConfig::default());
/// batcher.initialize().expect("device resources");
///
/// let mut scene = SceneGraph::new();
/// let root = scene.create_node();
/// batcher.add_root_node(root);
///
/// let resources = ResourceRegistry::new();
/// batcher.reset();
/// batcher.update(&scene, &resources).unwrap();
/// batcher.upload_buffers().unwrap();
/// ```
pub struct Batcher2d {
    device: Arc<dyn RenderContext>,
    config: BatcherConfig,
    roots: Vec<NodeId>,
    mesh_buffers: MeshBufferStore,
    merger: BatchMerger,
    walker: SceneWalker,
    descriptor_cache: DescriptorSetCache,
    /// Layout and fallbacks, present once initialized.
    bindings: Option<DescriptorBindings>,
    phase: FramePhase,
}

impl Batcher2d {
    pub fn new(device: Arc<dyn RenderContext>, config: BatcherConfig) -> Self {
        Self {
            device,
            config,
            roots: Vec::new(),
            mesh_buffers: MeshBufferStore::new(),
            merger: BatchMerger::new(),
            walker: SceneWalker::new(),
            descriptor_cache: DescriptorSetCache::new(),
            bindings: None,
            phase: FramePhase::Idle,
        }
    }

    /// Acquire device resources. Must succeed before the first `update`.
    pub fn initialize(&mut self) -> BatchResult<()> {
        profile_function!();
        self.config.validate()?;
        if self.bindings.is_some() {
            return Ok(());
        }

        self.bindings = Some(DescriptorBindings::new(
            self.device.as_ref(),
            &self.config.label,
        ));

        tracing::info!("Initialized 2D batcher '{}'", self.config.label);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.bindings.is_some()
    }

    /// Register a root for traversal. Returns `false` if it was already registered.
    pub fn add_root_node(&mut self, root: NodeId) -> bool {
        if self.roots.contains(&root) {
            return false;
        }
        self.roots.push(root);
        true
    }

    pub fn remove_root_node(&mut self, root: NodeId) -> bool {
        let before = self.roots.len();
        self.roots.retain(|&r| r != root);
        self.roots.len() != before
    }

    /// Registered roots in traversal order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Register the mesh buffers of `accessor`, returning the ones they replace.
    pub fn sync_mesh_buffers(
        &mut self,
        accessor: AccessorId,
        buffers: Vec<MeshBuffer>,
    ) -> Option<Vec<MeshBuffer>> {
        self.mesh_buffers.sync(accessor, buffers)
    }

    /// Allocate `count` mesh buffers for `accessor` with the configured layout and
    /// capacities.
    pub fn create_mesh_buffers(&mut self, accessor: AccessorId, count: u16) {
        self.mesh_buffers.create(
            accessor,
            count,
            self.config.vertex_layout,
            self.config.initial_vertex_capacity,
            self.config.initial_index_capacity,
        );
    }

    /// Every mesh buffer of `accessor`.
    pub fn mesh_buffers(&self, accessor: AccessorId) -> &[MeshBuffer] {
        self.mesh_buffers.buffers(accessor)
    }

    pub fn mesh_buffer(&self, accessor: AccessorId, buffer: u16) -> Option<&MeshBuffer> {
        self.mesh_buffers.get(accessor, buffer)
    }

    /// Mutable access for dynamic producers filling their ranges.
    pub fn mesh_buffer_mut(
        &mut self,
        accessor: AccessorId,
        buffer: u16,
    ) -> Option<&mut MeshBuffer> {
        self.mesh_buffers.get_mut(accessor, buffer)
    }

    /// Reserve room in a mesh buffer for a dynamic producer. Static draws packed by the
    /// next `update` land above the returned range.
    pub fn claim_dynamic_range(
        &mut self,
        accessor: AccessorId,
        buffer: u16,
        vertex_count: u32,
        index_count: u32,
    ) -> BatchResult<DynamicRange> {
        if self.phase != FramePhase::Idle {
            return Err(BatchError::FrameNotReset);
        }
        let policy = self.config.overflow_policy;
        self.mesh_buffers
            .get_mut(accessor, buffer)
            .ok_or(BatchError::MissingMeshBuffer { accessor, buffer })?
            .claim(vertex_count, index_count, policy)
    }

    /// Walk the registered roots and build this frame's batches.
    pub fn update(
        &mut self,
        scene: &SceneGraph,
        resources: &ResourceRegistry,
    ) -> BatchResult<()> {
        profile_function!();
        if self.bindings.is_none() {
            return Err(BatchError::NotInitialized);
        }
        if self.phase != FramePhase::Idle {
            return Err(BatchError::FrameNotReset);
        }

        let mut sink = MergeSink {
            merger: &mut self.merger,
            buffers: &mut self.mesh_buffers,
            policy: self.config.overflow_policy,
        };
        let walk = self.walker.walk(scene, &self.roots, &mut sink);
        self.merger.flush();

        self.resolve_descriptor_sets(resources);
        self.phase = FramePhase::Filled;

        let stats = self.merger.stats();
        tracing::debug!(
            "Frame filled: {} nodes, {} draws, {} batches, {} dropped",
            walk.nodes_visited,
            stats.draw_infos,
            stats.batches,
            stats.dropped_draws
        );
        Ok(())
    }

    fn resolve_descriptor_sets(&mut self, resources: &ResourceRegistry) {
        profile_function!();
        let Some(bindings) = self.bindings.as_ref() else {
            return;
        };
        let device = self.device.as_ref();
        let cache = &mut self.descriptor_cache;
        let hits = cache.hits();
        let allocations = cache.allocations();

        self.merger.for_each_batch_mut(|batch| {
            let set = cache.get_descriptor_set(
                device,
                bindings,
                resources,
                batch.texture(),
                batch.sampler(),
            );
            batch.set_descriptor_set(set);
        });

        let stats = self.merger.stats_mut();
        stats.descriptor_cache_hits = (cache.hits() - hits) as u32;
        stats.descriptor_sets_allocated = (cache.allocations() - allocations) as u32;
    }

    /// Push every touched mesh buffer to the device. Returns how many were uploaded.
    pub fn upload_buffers(&mut self) -> BatchResult<usize> {
        profile_function!();
        if self.bindings.is_none() {
            return Err(BatchError::NotInitialized);
        }
        if self.merger.is_empty() {
            return Ok(0);
        }

        let uploaded = self
            .mesh_buffers
            .upload(self.device.as_ref(), &self.config.label);
        self.phase = FramePhase::Uploaded;
        tracing::debug!("Uploaded {} mesh buffers", uploaded);
        Ok(uploaded)
    }

    /// Recycle all batches and rewind every mesh buffer. Valid in any phase.
    pub fn reset(&mut self) {
        profile_function!();
        self.merger.reset();
        self.mesh_buffers.reset_offsets();
        self.phase = FramePhase::Idle;
    }

    /// Descriptor set for `(texture, sampler)` with the batcher's layout.
    pub fn get_descriptor_set(
        &mut self,
        resources: &ResourceRegistry,
        texture: Option<TextureId>,
        sampler: Option<SamplerId>,
    ) -> BatchResult<Option<GpuDescriptorSet>> {
        let bindings = self.bindings.as_ref().ok_or(BatchError::NotInitialized)?;
        Ok(self.descriptor_cache.get_descriptor_set(
            self.device.as_ref(),
            bindings,
            resources,
            texture,
            sampler,
        ))
    }

    /// Evict the cached descriptor set for `(texture, sampler)`.
    ///
    /// Call before destroying either resource, or forward the matching
    /// [`ResourceEvent`] to [`Batcher2d::handle_resource_event`].
    pub fn release_descriptor_set_cache(
        &mut self,
        texture: Option<TextureId>,
        sampler: Option<SamplerId>,
    ) -> bool {
        self.descriptor_cache
            .release_descriptor_set_cache(self.device.as_ref(), texture, sampler)
    }

    /// Evict every cached descriptor set that references the destroyed resource.
    pub fn handle_resource_event(&mut self, event: &ResourceEvent) -> usize {
        self.descriptor_cache
            .handle_event(self.device.as_ref(), event)
    }

    /// Committed batches in paint order.
    pub fn batches(&self) -> impl Iterator<Item = &DrawBatch2D> {
        self.merger.batches()
    }

    pub fn batch_count(&self) -> usize {
        self.merger.len()
    }

    /// Statistics of the current frame.
    pub fn stats(&self) -> BatchStats2D {
        *self.merger.stats()
    }

    pub fn device(&self) -> &Arc<dyn RenderContext> {
        &self.device
    }

    pub fn descriptor_cache(&self) -> &DescriptorSetCache {
        &self.descriptor_cache
    }

    pub fn descriptor_set_layout(&self) -> Option<&GpuBindGroupLayout> {
        self.bindings.as_ref().map(|bindings| &bindings.layout)
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }
}

impl Drop for Batcher2d {
    fn drop(&mut self) {
        self.descriptor_cache.clear(self.device.as_ref());
    }
}
