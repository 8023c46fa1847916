//! Depth-first scene traversal in paint order.
//!
//! The walker keeps no state between frames. Each call starts from the registered roots
//! and visits children in sibling order, handing every drawable draw to a [`DrawSink`].

use strata_core::math::Mat4;
use strata_core::profiling::profile_function;

use crate::batch::StencilStage;
use crate::entity::{DrawInfo, DrawKind, RenderEntity};
use crate::scene::{NodeId, SceneGraph};

/// Per-entity state the walker resolves before dispatching its draws.
#[derive(Debug, Clone, Copy)]
pub struct EntityFrame<'a> {
    pub node: NodeId,
    pub world: &'a Mat4,
    pub entity: &'a RenderEntity,
    /// Parent opacity times local opacity times color alpha.
    pub opacity: f32,
    pub stencil_stage: StencilStage,
    pub stencil_ref: u8,
    pub layer: u32,
}

/// Receives draws in paint order.
pub trait DrawSink {
    fn draw(&mut self, frame: &EntityFrame<'_>, draw: &DrawInfo);

    /// Called after the subtree of each root has been walked.
    fn end_root(&mut self, _root: NodeId) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub nodes_visited: u32,
    pub draws: u32,
    /// Removed roots, children and sub-nodes that were skipped.
    pub stale_handles: u32,
}

#[derive(Default)]
pub struct SceneWalker {
    /// Nodes on the current path, to catch sub-node references back up the tree.
    path: Vec<NodeId>,
}

impl SceneWalker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk every root in order.
    pub fn walk(
        &mut self,
        scene: &SceneGraph,
        roots: &[NodeId],
        sink: &mut dyn DrawSink,
    ) -> WalkStats {
        profile_function!();
        let mut stats = WalkStats::default();
        for &root in roots {
            if !scene.contains(root) {
                tracing::warn!("Skipping removed root node {:?}", root);
                stats.stale_handles += 1;
                continue;
            }
            self.walk_node(scene, root, 1.0, 0, sink, &mut stats);
            sink.end_root(root);
        }
        self.path.clear();
        stats
    }

    fn walk_node(
        &mut self,
        scene: &SceneGraph,
        id: NodeId,
        parent_opacity: f32,
        stencil_depth: u8,
        sink: &mut dyn DrawSink,
        stats: &mut WalkStats,
    ) {
        let Some(node) = scene.node(id) else {
            tracing::warn!("Skipping removed node {:?}", id);
            stats.stale_handles += 1;
            return;
        };
        if !node.is_active() {
            return;
        }
        if self.path.contains(&id) {
            tracing::warn!("Node {:?} references itself through a sub-node draw", id);
            return;
        }

        stats.nodes_visited += 1;
        self.path.push(id);

        let mut opacity = parent_opacity;
        let mut child_depth = stencil_depth;
        let mut descend = true;

        if let Some(entity) = node.entity() {
            opacity = parent_opacity * entity.opacity * entity.color.alpha_f32();
            descend = !entity.crossed;

            if entity.enabled {
                let (stencil_stage, stencil_ref) = if entity.mask {
                    child_depth = stencil_depth.saturating_add(1);
                    (StencilStage::EnterLevel, child_depth)
                } else if stencil_depth > 0 {
                    (StencilStage::Enabled, stencil_depth)
                } else {
                    (StencilStage::Disabled, 0)
                };

                let frame = EntityFrame {
                    node: id,
                    world: node.world_matrix(),
                    entity,
                    opacity,
                    stencil_stage,
                    stencil_ref,
                    layer: node.layer(),
                };

                for draw in &entity.draw_infos {
                    match draw.kind {
                        DrawKind::SubNode(sub) => {
                            self.walk_node(scene, sub, opacity, child_depth, sink, stats)
                        }
                        _ => {
                            stats.draws += 1;
                            sink.draw(&frame, draw);
                        }
                    }
                }
            }
        }

        if descend {
            for &child in node.children() {
                self.walk_node(scene, child, opacity, child_depth, sink, stats);
            }
        }

        self.path.pop();
    }
}
