//! Renderable state attached to scene nodes.

use crate::color::Color32;
use crate::mesh_buffer::AccessorId;
use crate::resources::{MaterialId, SamplerId, TextureId};
use crate::scene::NodeId;
use crate::vertex::VertexLayout;

/// How a draw's geometry reaches its mesh buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    /// Local geometry is transformed and copied into the buffer every frame.
    Static,
    /// The producer already filled the buffer; only offsets are advanced.
    Dynamic,
}

/// Location of geometry a producer wrote into a mesh buffer itself.
///
/// Starts and counts are in whole vertices and whole indices. The indices are absolute
/// within the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DynamicRange {
    pub vertex_start: u32,
    pub vertex_count: u32,
    pub index_start: u32,
    pub index_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawKind {
    /// Vertex records in local space and 0-based indices into them.
    Static {
        vertices: Vec<f32>,
        indices: Vec<u16>,
    },
    Dynamic(DynamicRange),
    /// Walk another node in place of this draw.
    SubNode(NodeId),
}

/// One drawable's render request.
///
/// Draws are owned by their [`RenderEntity`], which in turn is owned by a scene node.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawInfo {
    pub kind: DrawKind,
    pub accessor: AccessorId,
    /// Index of the mesh buffer within the accessor.
    pub buffer: u16,
    pub material: MaterialId,
    pub texture: Option<TextureId>,
    pub sampler: Option<SamplerId>,
    /// Record layout of the vertex data, supplied by the producer.
    pub layout: VertexLayout,
}

impl DrawInfo {
    pub fn new_static(
        accessor: AccessorId,
        buffer: u16,
        vertices: Vec<f32>,
        indices: Vec<u16>,
    ) -> Self {
        Self::with_kind(DrawKind::Static { vertices, indices }, accessor, buffer)
    }

    pub fn new_dynamic(accessor: AccessorId, buffer: u16, range: DynamicRange) -> Self {
        Self::with_kind(DrawKind::Dynamic(range), accessor, buffer)
    }

    pub fn sub_node(node: NodeId) -> Self {
        Self::with_kind(DrawKind::SubNode(node), AccessorId::default(), 0)
    }

    fn with_kind(kind: DrawKind, accessor: AccessorId, buffer: u16) -> Self {
        Self {
            kind,
            accessor,
            buffer,
            material: MaterialId::default(),
            texture: None,
            sampler: None,
            layout: VertexLayout::default(),
        }
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = material;
        self
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_sampler(mut self, sampler: SamplerId) -> Self {
        self.sampler = Some(sampler);
        self
    }

    pub fn with_layout(mut self, layout: VertexLayout) -> Self {
        self.layout = layout;
        self
    }

    /// `None` for sub-node draws, which carry no geometry.
    pub fn mode(&self) -> Option<DrawMode> {
        match self.kind {
            DrawKind::Static { .. } => Some(DrawMode::Static),
            DrawKind::Dynamic(_) => Some(DrawMode::Dynamic),
            DrawKind::SubNode(_) => None,
        }
    }

    pub fn index_count(&self) -> u32 {
        match &self.kind {
            DrawKind::Static { indices, .. } => indices.len() as u32,
            DrawKind::Dynamic(range) => range.index_count,
            DrawKind::SubNode(_) => 0,
        }
    }

    /// Whole vertex records in the draw.
    pub fn vertex_count(&self) -> u32 {
        match &self.kind {
            DrawKind::Static { vertices, .. } => {
                (vertices.len() / self.layout.stride() as usize) as u32
            }
            DrawKind::Dynamic(range) => range.vertex_count,
            DrawKind::SubNode(_) => 0,
        }
    }
}

/// A node's renderable state.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderEntity {
    pub color: Color32,
    /// Opacity relative to the parent, in `0.0..=1.0`.
    pub opacity: f32,
    /// Disabled entities draw nothing; their children are still walked.
    pub enabled: bool,
    /// The entity writes a stencil mask that clips its subtree.
    pub mask: bool,
    /// The entity renders its own subtree, so the walker does not descend.
    pub crossed: bool,
    pub draw_infos: Vec<DrawInfo>,
}

impl RenderEntity {
    pub fn new() -> Self {
        Self {
            color: Color32::WHITE,
            opacity: 1.0,
            enabled: true,
            mask: false,
            crossed: false,
            draw_infos: Vec::new(),
        }
    }

    pub fn with_color(mut self, color: Color32) -> Self {
        self.color = color;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn with_draw(mut self, draw: DrawInfo) -> Self {
        self.draw_infos.push(draw);
        self
    }

    pub fn as_mask(mut self) -> Self {
        self.mask = true;
        self
    }

    pub fn as_crossed(mut self) -> Self {
        self.crossed = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl Default for RenderEntity {
    fn default() -> Self {
        Self::new()
    }
}
