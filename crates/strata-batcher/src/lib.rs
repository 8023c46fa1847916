//! Strata Batcher - paint-order preserving 2D draw batching
//!
//! Turns the drawables of a scene graph into as few GPU draws as possible without ever
//! reordering them:
//! - [`SceneWalker`] visits registered roots depth first, in sibling order
//! - [`BatchMerger`] extends the open batch while draws share material, texture, sampler,
//!   stencil state and mesh buffer, and commits it otherwise
//! - [`packer`] transforms and colors static geometry into shared [`MeshBuffer`]s
//! - [`DescriptorSetCache`] reuses one descriptor set per texture/sampler pair
//! - [`Batcher2d`] drives the frame cycle: `reset` → `update` → `upload_buffers`
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use strata_batcher::*;
//! use strata_test_utils::MockRenderContext;
//!
//! let device = Arc::new(MockRenderContext::new());
//! let mut batcher = Batcher2d::new(device, BatcherConfig::default());
//! batcher.initialize().unwrap();
//! batcher.create_mesh_buffers(AccessorId(0), 1);
//!
//! let quad = DrawInfo::new_static(AccessorId(0), 0, vec![0.0; 36], vec![0, 1, 2, 0, 2, 3]);
//! let mut scene = SceneGraph::new();
//! let root = scene.create_entity_node(RenderEntity::new().with_draw(quad));
//! batcher.add_root_node(root);
//!
//! batcher.reset();
//! batcher.update(&scene, &ResourceRegistry::new()).unwrap();
//! batcher.upload_buffers().unwrap();
//! assert_eq!(batcher.batch_count(), 1);
//! ```

pub mod batch;
pub mod batcher;
pub mod color;
pub mod config;
pub mod context;
mod context_impl;
pub mod descriptor_cache;
pub mod entity;
pub mod error;
pub mod merger;
pub mod mesh_buffer;
pub mod packer;
pub mod resources;
pub mod scene;
pub mod vertex;
pub mod walker;

pub use batch::{BatchId, BatchKey, BatchPool, BatchStats2D, DrawBatch2D, StencilStage};
pub use batcher::{Batcher2d, FramePhase};
pub use color::Color32;
pub use config::{BatcherConfig, OverflowPolicy};
pub use context::{GraphicsContext, GraphicsContextDescriptor, GraphicsError};
pub use descriptor_cache::{DescriptorBindings, DescriptorKey, DescriptorSetCache};
pub use entity::{DrawInfo, DrawKind, DrawMode, DynamicRange, RenderEntity};
pub use error::{BatchError, BatchResult};
pub use merger::{BatchMerger, MergeOutcome};
pub use mesh_buffer::{AccessorId, MeshBuffer, MeshBufferStore};
pub use packer::IndexRange;
pub use resources::{MaterialId, ResourceEvent, ResourceRegistry, SamplerId, TextureId};
pub use scene::{Node, NodeId, SceneGraph};
pub use vertex::{MAX_VERTICES_PER_BUFFER, VertexLayout};
pub use walker::{DrawSink, EntityFrame, SceneWalker, WalkStats};
