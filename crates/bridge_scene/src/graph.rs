//! Renderer-facing scene graph interface.
//!
//! The renderer keeps a retained graph of nodes. Geometry, lights and
//! cameras are prototype nodes; instance groups are group nodes that carry a
//! placement transform and parent a shared prototype. The renderer may only
//! reorganize its internal state between edit scopes, so every mutation must
//! happen between [`SceneGraph::begin_edit`] and [`SceneGraph::end_edit`]
//! (see [`crate::ScopedEdit`]).

use bridge_core::{Category, ParamList};
use glam::Mat4;
use slotmap::new_key_type;

new_key_type! {
    /// Identifier of a renderer scene graph node.
    pub struct NodeId;
}

/// Kind of renderer node created for a host entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Plain transform group (root, instance groups, particle groups, empties).
    Group,
    Mesh,
    Light,
    LightFilter,
    Camera,
    Volume,
    Points,
    Material,
}

impl NodeKind {
    /// Node kind for a prototype of the given category.
    #[must_use]
    pub const fn for_category(category: Category) -> Self {
        match category {
            Category::Mesh => NodeKind::Mesh,
            Category::Light => NodeKind::Light,
            Category::LightFilter => NodeKind::LightFilter,
            Category::Camera => NodeKind::Camera,
            Category::ParticleSystem => NodeKind::Points,
            Category::Material => NodeKind::Material,
            Category::Empty => NodeKind::Group,
            Category::Volume => NodeKind::Volume,
        }
    }
}

/// Tri-state visibility of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// Follow the parent.
    #[default]
    Inherit,
    Hidden,
    Visible,
}

impl Visibility {
    /// `true` → hidden, `false` → visible.
    #[must_use]
    pub const fn from_hidden(hidden: bool) -> Self {
        if hidden { Visibility::Hidden } else { Visibility::Visible }
    }

    #[must_use]
    pub const fn is_hidden(self) -> bool {
        matches!(self, Visibility::Hidden)
    }
}

/// A shader reference with its parameters (integrators, filters, light shaders, bxdfs).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShaderDesc {
    /// Shader plugin name, e.g. `PxrPathTracer`.
    pub name: String,
    /// Handle the shader is registered under.
    pub handle: String,
    pub params: ParamList,
}

impl ShaderDesc {
    pub fn new(name: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: handle.into(),
            params: ParamList::new(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: ParamList) -> Self {
        self.params = params;
        self
    }
}

/// Transactional renderer scene graph.
///
/// Node handles stay valid until [`SceneGraph::delete_node`]. Calls on a
/// deleted node are ignored by implementations.
pub trait SceneGraph {
    // ========================================================================
    // Edit lifecycle
    // ========================================================================

    fn begin_edit(&mut self);
    fn end_edit(&mut self);
    fn is_editing(&self) -> bool;

    // ========================================================================
    // Topology
    // ========================================================================

    /// The scene root. Always alive.
    fn root(&self) -> NodeId;
    fn create_node(&mut self, kind: NodeKind, name: &str) -> NodeId;
    /// Deletes a node and detaches it from its parents. Children are detached, not deleted.
    fn delete_node(&mut self, node: NodeId);
    fn contains(&self, node: NodeId) -> bool;
    fn add_child(&mut self, parent: NodeId, child: NodeId);
    fn remove_child(&mut self, parent: NodeId, child: NodeId);
    fn remove_all_children(&mut self, parent: NodeId);

    // ========================================================================
    // Node state
    // ========================================================================

    /// One matrix per motion sample, in the order of `times`.
    fn set_transform(&mut self, node: NodeId, samples: &[Mat4], times: &[f32]);
    fn set_attributes(&mut self, node: NodeId, attrs: ParamList);
    fn attributes(&self, node: NodeId) -> Option<&ParamList>;
    fn set_primvars(&mut self, node: NodeId, primvars: ParamList);
    fn primvars(&self, node: NodeId) -> Option<&ParamList>;
    /// Times of the time-sampled primvars, normalized to start at zero.
    fn set_primvar_times(&mut self, node: NodeId, times: &[f32]);
    fn set_hidden(&mut self, node: NodeId, visibility: Visibility);
    fn hidden(&self, node: NodeId) -> Option<Visibility>;
    fn set_material(&mut self, node: NodeId, material: Option<NodeId>);
    fn set_shader(&mut self, node: NodeId, shader: ShaderDesc);

    // ========================================================================
    // Scene-wide state
    // ========================================================================

    fn set_options(&mut self, options: ParamList);
    fn options(&self) -> &ParamList;
    fn set_integrator(&mut self, integrator: ShaderDesc);
    fn set_sample_filters(&mut self, filters: Vec<ShaderDesc>);
    fn set_display_filters(&mut self, filters: Vec<ShaderDesc>);
    fn add_coordinate_system(&mut self, node: NodeId);
    fn remove_coordinate_system(&mut self, node: NodeId);
    fn invalidate_texture(&mut self, name: &str);
}
