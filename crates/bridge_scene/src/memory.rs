//! In-memory retained scene graph.
//!
//! `MemorySceneGraph` keeps the full renderer state in a slot map so that it
//! can be inspected after a sync pass. It also records edit bookkeeping
//! ([`EditStats`]), which makes it the reference backend for tests and for
//! headless sessions.

use bridge_core::ParamList;
use glam::Mat4;
use rustc_hash::FxHashSet;
use slotmap::SlotMap;

use crate::graph::{NodeId, NodeKind, SceneGraph, ShaderDesc, Visibility};

/// One retained node.
#[derive(Debug, Clone)]
pub struct MemoryNode {
    pub kind: NodeKind,
    pub name: String,
    /// Prototype nodes may be parented by many instance groups.
    pub parents: Vec<NodeId>,
    pub children: Vec<NodeId>,
    pub transform: Vec<Mat4>,
    pub motion_times: Vec<f32>,
    pub attributes: ParamList,
    pub primvars: ParamList,
    pub primvar_times: Vec<f32>,
    pub visibility: Visibility,
    pub material: Option<NodeId>,
    pub shader: Option<ShaderDesc>,
}

impl MemoryNode {
    fn new(kind: NodeKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_owned(),
            parents: Vec::new(),
            children: Vec::new(),
            transform: vec![Mat4::IDENTITY],
            motion_times: Vec::new(),
            attributes: ParamList::new(),
            primvars: ParamList::new(),
            primvar_times: Vec::new(),
            visibility: Visibility::Inherit,
            material: None,
            shader: None,
        }
    }
}

/// Edit-scope bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditStats {
    pub scopes_opened: usize,
    pub scopes_closed: usize,
    /// Mutating calls made while no edit was open.
    pub mutations_outside_edit: usize,
    /// Mutating calls made inside edits.
    pub mutations: usize,
}

pub struct MemorySceneGraph {
    nodes: SlotMap<NodeId, MemoryNode>,
    root: NodeId,
    editing: bool,
    stats: EditStats,

    options: ParamList,
    integrator: Option<ShaderDesc>,
    sample_filters: Vec<ShaderDesc>,
    display_filters: Vec<ShaderDesc>,
    coordinate_systems: FxHashSet<NodeId>,
    invalidated_textures: Vec<String>,
}

impl Default for MemorySceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySceneGraph {
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(MemoryNode::new(NodeKind::Group, "root"));
        Self {
            nodes,
            root,
            editing: false,
            stats: EditStats::default(),
            options: ParamList::new(),
            integrator: None,
            sample_filters: Vec::new(),
            display_filters: Vec::new(),
            coordinate_systems: FxHashSet::default(),
            invalidated_textures: Vec::new(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> EditStats {
        self.stats
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(id)
    }

    /// Live node count, root included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    /// First node with the given name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|(_, n)| n.name == name).map(|(id, _)| id)
    }

    /// Live nodes of one kind.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = (NodeId, &MemoryNode)> {
        self.nodes.iter().filter(move |(_, n)| n.kind == kind)
    }

    #[must_use]
    pub fn integrator(&self) -> Option<&ShaderDesc> {
        self.integrator.as_ref()
    }

    #[must_use]
    pub fn sample_filters(&self) -> &[ShaderDesc] {
        &self.sample_filters
    }

    #[must_use]
    pub fn display_filters(&self) -> &[ShaderDesc] {
        &self.display_filters
    }

    #[must_use]
    pub fn is_coordinate_system(&self, node: NodeId) -> bool {
        self.coordinate_systems.contains(&node)
    }

    #[must_use]
    pub fn invalidated_textures(&self) -> &[String] {
        &self.invalidated_textures
    }

    fn touch(&mut self, what: &str) {
        if self.editing {
            self.stats.mutations += 1;
        } else {
            self.stats.mutations_outside_edit += 1;
            log::warn!("Scene graph mutation '{what}' outside of an edit scope");
        }
    }

    fn detach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(p) = self.nodes.get_mut(parent)
            && let Some(pos) = p.children.iter().position(|&c| c == child)
        {
            p.children.remove(pos);
        }
        if let Some(c) = self.nodes.get_mut(child)
            && let Some(pos) = c.parents.iter().position(|&p| p == parent)
        {
            c.parents.remove(pos);
        }
    }
}

impl SceneGraph for MemorySceneGraph {
    fn begin_edit(&mut self) {
        if self.editing {
            log::warn!("begin_edit called while an edit is already open");
            return;
        }
        self.editing = true;
        self.stats.scopes_opened += 1;
    }

    fn end_edit(&mut self) {
        if !self.editing {
            log::warn!("end_edit called without an open edit");
            return;
        }
        self.editing = false;
        self.stats.scopes_closed += 1;
    }

    fn is_editing(&self) -> bool {
        self.editing
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn create_node(&mut self, kind: NodeKind, name: &str) -> NodeId {
        self.touch("create_node");
        self.nodes.insert(MemoryNode::new(kind, name))
    }

    fn delete_node(&mut self, node: NodeId) {
        self.touch("delete_node");
        if node == self.root {
            log::warn!("Refusing to delete the scene root");
            return;
        }
        let Some(removed) = self.nodes.remove(node) else {
            return;
        };
        for parent in removed.parents {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.children.retain(|&c| c != node);
            }
        }
        for child in removed.children {
            if let Some(c) = self.nodes.get_mut(child) {
                c.parents.retain(|&p| p != node);
            }
        }
        for (_, n) in &mut self.nodes {
            if n.material == Some(node) {
                n.material = None;
            }
        }
        self.coordinate_systems.remove(&node);
    }

    fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.touch("add_child");
        if parent == child || !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            log::warn!("add_child: invalid parent/child pair");
            return;
        }
        if let Some(p) = self.nodes.get_mut(parent) {
            if p.children.contains(&child) {
                return;
            }
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parents.push(parent);
        }
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        self.touch("remove_child");
        self.detach(parent, child);
    }

    fn remove_all_children(&mut self, parent: NodeId) {
        self.touch("remove_all_children");
        let children = match self.nodes.get_mut(parent) {
            Some(p) => std::mem::take(&mut p.children),
            None => return,
        };
        for child in children {
            if let Some(c) = self.nodes.get_mut(child) {
                c.parents.retain(|&p| p != parent);
            }
        }
    }

    fn set_transform(&mut self, node: NodeId, samples: &[Mat4], times: &[f32]) {
        self.touch("set_transform");
        if let Some(n) = self.nodes.get_mut(node) {
            n.transform = samples.to_vec();
            n.motion_times = times.to_vec();
        }
    }

    fn set_attributes(&mut self, node: NodeId, attrs: ParamList) {
        self.touch("set_attributes");
        if let Some(n) = self.nodes.get_mut(node) {
            n.attributes = attrs;
        }
    }

    fn attributes(&self, node: NodeId) -> Option<&ParamList> {
        self.nodes.get(node).map(|n| &n.attributes)
    }

    fn set_primvars(&mut self, node: NodeId, primvars: ParamList) {
        self.touch("set_primvars");
        if let Some(n) = self.nodes.get_mut(node) {
            n.primvars = primvars;
        }
    }

    fn primvars(&self, node: NodeId) -> Option<&ParamList> {
        self.nodes.get(node).map(|n| &n.primvars)
    }

    fn set_primvar_times(&mut self, node: NodeId, times: &[f32]) {
        self.touch("set_primvar_times");
        if let Some(n) = self.nodes.get_mut(node) {
            n.primvar_times = times.to_vec();
        }
    }

    fn set_hidden(&mut self, node: NodeId, visibility: Visibility) {
        self.touch("set_hidden");
        if let Some(n) = self.nodes.get_mut(node) {
            n.visibility = visibility;
        }
    }

    fn hidden(&self, node: NodeId) -> Option<Visibility> {
        self.nodes.get(node).map(|n| n.visibility)
    }

    fn set_material(&mut self, node: NodeId, material: Option<NodeId>) {
        self.touch("set_material");
        if let Some(n) = self.nodes.get_mut(node) {
            n.material = material;
        }
    }

    fn set_shader(&mut self, node: NodeId, shader: ShaderDesc) {
        self.touch("set_shader");
        if let Some(n) = self.nodes.get_mut(node) {
            n.shader = Some(shader);
        }
    }

    fn set_options(&mut self, options: ParamList) {
        self.touch("set_options");
        self.options = options;
    }

    fn options(&self) -> &ParamList {
        &self.options
    }

    fn set_integrator(&mut self, integrator: ShaderDesc) {
        self.touch("set_integrator");
        self.integrator = Some(integrator);
    }

    fn set_sample_filters(&mut self, filters: Vec<ShaderDesc>) {
        self.touch("set_sample_filters");
        self.sample_filters = filters;
    }

    fn set_display_filters(&mut self, filters: Vec<ShaderDesc>) {
        self.touch("set_display_filters");
        self.display_filters = filters;
    }

    fn add_coordinate_system(&mut self, node: NodeId) {
        self.touch("add_coordinate_system");
        if self.nodes.contains_key(node) {
            self.coordinate_systems.insert(node);
        }
    }

    fn remove_coordinate_system(&mut self, node: NodeId) {
        self.touch("remove_coordinate_system");
        self.coordinate_systems.remove(&node);
    }

    fn invalidate_texture(&mut self, name: &str) {
        self.touch("invalidate_texture");
        self.invalidated_textures.push(name.to_owned());
    }
}
