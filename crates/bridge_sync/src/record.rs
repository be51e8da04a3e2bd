//! Renderer-side records of exported host entities.

use std::collections::BTreeSet;

use bridge_core::{Category, HostHandle};
use bridge_scene::NodeId;
use rustc_hash::FxHashMap;

/// One placement of an object: an instance group node parenting the prototype.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRecord {
    pub key: String,
    pub group: NodeId,
    /// Structural parent the group is attached to.
    pub attached_to: NodeId,
    pub psys_settings: Option<HostHandle>,
    pub instancer: Option<HostHandle>,
}

/// Renderer state owned for one host object.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObjectRecord {
    pub db_name: String,
    pub category: Category,
    /// Prototype node (or the object's own node for non-instanced categories).
    pub node: NodeId,
    /// Current host handle. Lookup only.
    pub handle: HostHandle,
    pub instances: FxHashMap<String, InstanceRecord>,
    /// Objects placed through this one (particle, collection or node instancing).
    pub objects_instanced: BTreeSet<HostHandle>,
    pub is_hidden: bool,
    pub is_frame_sensitive: bool,
    /// Group node holding emitted particle systems.
    pub particle_group: Option<NodeId>,
    /// Lights using this light filter.
    pub lights: BTreeSet<HostHandle>,
    /// Emissive materials using this light filter.
    pub materials: BTreeSet<HostHandle>,
    /// Node the object's own node is attached to, for non-instanced categories.
    pub attached_to: Option<NodeId>,
    /// Depth-of-field focus object, for cameras.
    pub focus_object: Option<HostHandle>,
    pub motion_times: Vec<f32>,
}

impl SceneObjectRecord {
    pub fn new(db_name: impl Into<String>, category: Category, node: NodeId, handle: HostHandle) -> Self {
        Self {
            db_name: db_name.into(),
            category,
            node,
            handle,
            instances: FxHashMap::default(),
            objects_instanced: BTreeSet::new(),
            is_hidden: false,
            is_frame_sensitive: false,
            particle_group: None,
            lights: BTreeSet::new(),
            materials: BTreeSet::new(),
            attached_to: None,
            focus_object: None,
            motion_times: Vec::new(),
        }
    }

    /// Instance keys in sorted order.
    #[must_use]
    pub fn instance_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.instances.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRecord {
    pub db_name: String,
    pub node: NodeId,
    pub handle: HostHandle,
    pub has_meshlight: bool,
    pub is_frame_sensitive: bool,
}

/// An emitted particle system.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleRecord {
    pub db_name: String,
    pub node: NodeId,
    pub settings: HostHandle,
}

/// Every record the engine owns, keyed by current host handle.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    pub objects: FxHashMap<HostHandle, SceneObjectRecord>,
    pub materials: FxHashMap<HostHandle, MaterialRecord>,
    /// Emitted particle systems per object, keyed by particle settings.
    pub particles: FxHashMap<HostHandle, FxHashMap<HostHandle, ParticleRecord>>,
    pub cameras: BTreeSet<HostHandle>,
    pub main_camera: Option<HostHandle>,
    /// `identifier:id` → object name, for picking.
    pub object_ids: FxHashMap<i32, String>,
}

impl SceneRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn object(&self, handle: HostHandle) -> Option<&SceneObjectRecord> {
        self.objects.get(&handle)
    }

    #[must_use]
    pub fn object_by_name(&self, db_name: &str) -> Option<&SceneObjectRecord> {
        self.objects.values().find(|r| r.db_name == db_name)
    }

    #[must_use]
    pub fn material(&self, handle: HostHandle) -> Option<&MaterialRecord> {
        self.materials.get(&handle)
    }

    /// Whether any renderer light is exported.
    #[must_use]
    pub fn has_lights(&self) -> bool {
        self.objects.values().any(|r| r.category.is_light())
    }

    /// Total instance records across all objects.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.objects.values().map(|r| r.instances.len()).sum()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.materials.clear();
        self.particles.clear();
        self.cameras.clear();
        self.main_camera = None;
        self.object_ids.clear();
    }
}
