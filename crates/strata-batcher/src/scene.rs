//! Minimal scene graph the walker traverses.
//!
//! Nodes live in a generational arena. A [`NodeId`] kept after its node was removed is
//! detected as stale rather than resolving to whatever reused the slot.

use strata_core::math::Mat4;
use strata_core::alloc::sparse_set::{IndexSlot, SparseSet};

use crate::entity::RenderEntity;
use crate::error::{BatchError, BatchResult};

/// Handle to a node in a [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(IndexSlot);

/// Visibility layer every node starts on.
pub const DEFAULT_LAYER: u32 = 1;

#[derive(Debug, Clone)]
pub struct Node {
    world: Mat4,
    active: bool,
    layer: u32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    entity: Option<RenderEntity>,
}

impl Node {
    fn new() -> Self {
        Self {
            world: Mat4::IDENTITY,
            active: true,
            layer: DEFAULT_LAYER,
            parent: None,
            children: Vec::new(),
            entity: None,
        }
    }

    /// World transform, maintained by the owner of the scene.
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Visibility layer bits.
    pub fn layer(&self) -> u32 {
        self.layer
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in paint order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn entity(&self) -> Option<&RenderEntity> {
        self.entity.as_ref()
    }
}

#[derive(Default)]
pub struct SceneGraph {
    nodes: SparseSet<Node>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached node with an identity transform.
    pub fn create_node(&mut self) -> NodeId {
        NodeId(self.nodes.push(Node::new()))
    }

    /// Create a node carrying `entity`.
    pub fn create_entity_node(&mut self, entity: RenderEntity) -> NodeId {
        let mut node = Node::new();
        node.entity = Some(entity);
        NodeId(self.nodes.push(node))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id.0)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.try_get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.try_get_mut(id.0)
    }

    fn live_mut(&mut self, id: NodeId) -> BatchResult<&mut Node> {
        self.nodes
            .try_get_mut(id.0)
            .ok_or(BatchError::StaleNode { node: id })
    }

    /// Children of `id` in paint order, empty for stale handles.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::children).unwrap_or(&[])
    }

    /// Append `child` as the last child of `parent`, detaching it from its old parent.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> BatchResult<()> {
        if !self.contains(parent) {
            return Err(BatchError::StaleNode { node: parent });
        }
        if !self.contains(child) {
            return Err(BatchError::StaleNode { node: child });
        }

        let mut ancestor = Some(parent);
        while let Some(id) = ancestor {
            if id == child {
                return Err(BatchError::HierarchyCycle { parent, child });
            }
            ancestor = self.node(id).and_then(Node::parent);
        }

        self.detach(child);
        self.live_mut(child)?.parent = Some(parent);
        self.live_mut(parent)?.children.push(child);
        Ok(())
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.node(child).and_then(Node::parent) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|&c| c != child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = None;
        }
    }

    /// Remove `id` and its whole subtree. Returns the number of nodes removed.
    pub fn remove_node(&mut self, id: NodeId) -> usize {
        if !self.contains(id) {
            return 0;
        }
        self.detach(id);

        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.try_remove(next.0) {
                stack.extend(node.children);
                removed += 1;
            }
        }
        removed
    }

    pub fn set_world_matrix(&mut self, id: NodeId, world: Mat4) -> BatchResult<()> {
        self.live_mut(id)?.world = world;
        Ok(())
    }

    pub fn set_active(&mut self, id: NodeId, active: bool) -> BatchResult<()> {
        self.live_mut(id)?.active = active;
        Ok(())
    }

    pub fn set_layer(&mut self, id: NodeId, layer: u32) -> BatchResult<()> {
        self.live_mut(id)?.layer = layer;
        Ok(())
    }

    /// Attach or clear the renderable state of a node, returning the previous one.
    pub fn set_entity(
        &mut self,
        id: NodeId,
        entity: Option<RenderEntity>,
    ) -> BatchResult<Option<RenderEntity>> {
        let node = self.live_mut(id)?;
        Ok(std::mem::replace(&mut node.entity, entity))
    }

    pub fn entity(&self, id: NodeId) -> Option<&RenderEntity> {
        self.node(id).and_then(Node::entity)
    }

    pub fn entity_mut(&mut self, id: NodeId) -> Option<&mut RenderEntity> {
        self.node_mut(id).and_then(|node| node.entity.as_mut())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_keep_insertion_order() {
        let mut scene = SceneGraph::new();
        let root = scene.create_node();
        let a = scene.create_node();
        let b = scene.create_node();
        let c = scene.create_node();

        scene.add_child(root, a).unwrap();
        scene.add_child(root, b).unwrap();
        scene.add_child(root, c).unwrap();

        assert_eq!(scene.children(root), &[a, b, c]);
        assert_eq!(scene.node(b).and_then(Node::parent), Some(root));
    }

    #[test]
    fn test_reparent_moves_child() {
        let mut scene = SceneGraph::new();
        let first = scene.create_node();
        let second = scene.create_node();
        let child = scene.create_node();

        scene.add_child(first, child).unwrap();
        scene.add_child(second, child).unwrap();

        assert!(scene.children(first).is_empty());
        assert_eq!(scene.children(second), &[child]);
    }

    #[test]
    fn test_rejects_cycles() {
        let mut scene = SceneGraph::new();
        let root = scene.create_node();
        let child = scene.create_node();
        scene.add_child(root, child).unwrap();

        assert_eq!(
            scene.add_child(child, root),
            Err(BatchError::HierarchyCycle {
                parent: child,
                child: root
            })
        );
        assert!(scene.add_child(root, root).is_err());
    }

    #[test]
    fn test_remove_subtree() {
        let mut scene = SceneGraph::new();
        let root = scene.create_node();
        let child = scene.create_node();
        let grandchild = scene.create_node();
        scene.add_child(root, child).unwrap();
        scene.add_child(child, grandchild).unwrap();

        assert_eq!(scene.remove_node(child), 2);
        assert!(scene.children(root).is_empty());
        assert!(!scene.contains(grandchild));
        assert_eq!(scene.len(), 1);

        assert_eq!(
            scene.set_active(child, false),
            Err(BatchError::StaleNode { node: child })
        );
        assert_eq!(scene.remove_node(child), 0);
    }

    #[test]
    fn test_entity_replacement() {
        let mut scene = SceneGraph::new();
        let node = scene.create_node();

        let previous = scene.set_entity(node, Some(RenderEntity::new())).unwrap();
        assert!(previous.is_none());

        scene.entity_mut(node).unwrap().opacity = 0.5;
        assert_eq!(scene.entity(node).map(|e| e.opacity), Some(0.5));
    }
}
