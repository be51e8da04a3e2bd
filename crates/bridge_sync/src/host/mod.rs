//! Host scene access.
//!
//! [`HostScene`] is the read-only view of the host application the engine
//! consumes during a pass. [`HostSnapshot`] is an owned implementation used
//! by headless sessions and tests.

pub mod model;
pub mod snapshot;

use bridge_core::HostHandle;

pub use model::{
    CameraSettings, DeformSample, HostCollection, HostMaterial, HostObject, InstanceDirective, LightLink, LightRole,
    LightSettings, MeshData, NodeTree, ObjectGroup, ObjectInstance, ObjectKind, ParticleRender, ParticleSettings,
    ParticleSystem, SceneSettings,
};
pub use snapshot::HostSnapshot;

/// Owner of a texture-bearing node, resolved from a `"owner|node"` id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureOwner {
    Material(HostHandle),
    NodeTree(HostHandle),
    World,
    Object(HostHandle),
}

/// Read-only view of the host at its current evaluation state.
pub trait HostScene {
    fn settings(&self) -> &crate::host::SceneSettings;

    /// Every object known to the host, view layer or not.
    fn objects(&self) -> &[HostObject];
    fn object(&self, handle: HostHandle) -> Option<&HostObject>;

    fn object_by_name(&self, name: &str) -> Option<&HostObject> {
        self.objects().iter().find(|o| o.name == name)
    }

    /// The flat instance enumeration.
    fn instances(&self) -> &[ObjectInstance];

    fn materials(&self) -> &[HostMaterial];
    fn material(&self, handle: HostHandle) -> Option<&HostMaterial>;
    fn collection(&self, handle: HostHandle) -> Option<&HostCollection>;
    fn particle_settings(&self, handle: HostHandle) -> Option<&ParticleSettings>;
    fn node_trees(&self) -> &[NodeTree];
    fn node_tree(&self, handle: HostHandle) -> Option<&NodeTree>;

    /// Objects of the active view layer.
    fn view_layer_objects(&self) -> Vec<HostHandle> {
        self.objects()
            .iter()
            .filter(|o| o.in_view_layer && !o.hide_viewport)
            .map(|o| o.handle)
            .collect()
    }

    /// Renderer lights (filters excluded), in host order.
    fn lights(&self) -> Vec<&HostObject> {
        self.objects()
            .iter()
            .filter(|o| o.in_view_layer && !o.hide_viewport)
            .filter(|o| o.light.as_ref().is_some_and(|l| l.role == LightRole::Light))
            .collect()
    }

    /// Light filters, in host order.
    fn light_filters(&self) -> Vec<&HostObject> {
        self.objects()
            .iter()
            .filter(|o| o.in_view_layer && !o.hide_viewport)
            .filter(|o| o.light.as_ref().is_some_and(|l| l.role == LightRole::Filter))
            .collect()
    }

    /// Resolves the owner part of a texture node id.
    fn texture_owner(&self, owner: &str) -> Option<TextureOwner> {
        if let Some(mat) = self.materials().iter().find(|m| m.name == owner) {
            return Some(TextureOwner::Material(mat.handle));
        }
        if let Some(tree) = self.node_trees().iter().find(|t| t.name == owner) {
            return Some(TextureOwner::NodeTree(tree.handle));
        }
        if owner == "World" {
            return Some(TextureOwner::World);
        }
        self.object_by_name(owner).map(|o| TextureOwner::Object(o.handle))
    }
}
