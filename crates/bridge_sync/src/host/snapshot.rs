use bridge_core::HostHandle;
use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::host::model::{
    HostCollection, HostMaterial, HostObject, InstanceDirective, NodeTree, ObjectInstance, ObjectKind,
    ParticleRender, ParticleSettings, SceneSettings,
};
use crate::host::HostScene;

/// Owned host state with a computed instance enumeration.
///
/// Every mutator re-evaluates the enumeration, so the snapshot always reads
/// like a freshly evaluated host depsgraph.
#[derive(Debug, Clone, Default)]
pub struct HostSnapshot {
    settings: SceneSettings,
    objects: Vec<HostObject>,
    object_index: FxHashMap<HostHandle, usize>,
    materials: Vec<HostMaterial>,
    collections: Vec<HostCollection>,
    particle_settings: Vec<ParticleSettings>,
    node_trees: Vec<NodeTree>,
    instances: Vec<ObjectInstance>,
}

impl HostSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces (by handle) an object.
    pub fn add_object(&mut self, object: HostObject) -> &mut Self {
        match self.object_index.get(&object.handle) {
            Some(&idx) => self.objects[idx] = object,
            None => {
                self.object_index.insert(object.handle, self.objects.len());
                self.objects.push(object);
            }
        }
        self.evaluate();
        self
    }

    /// Removes an object permanently.
    pub fn remove_object(&mut self, handle: HostHandle) -> Option<HostObject> {
        let idx = self.object_index.remove(&handle)?;
        let removed = self.objects.remove(idx);
        self.reindex();
        self.evaluate();
        Some(removed)
    }

    /// Mutates one object in place.
    pub fn edit_object(&mut self, handle: HostHandle, f: impl FnOnce(&mut HostObject)) -> bool {
        let Some(&idx) = self.object_index.get(&handle) else {
            return false;
        };
        f(&mut self.objects[idx]);
        self.evaluate();
        true
    }

    pub fn edit_settings(&mut self, f: impl FnOnce(&mut SceneSettings)) {
        f(&mut self.settings);
        self.evaluate();
    }

    /// Reissues an object's handle, as host undo/redo does. References held by
    /// other objects and collections follow the new handle.
    pub fn reissue_handle(&mut self, old: HostHandle, new: HostHandle) -> bool {
        let Some(idx) = self.object_index.remove(&old) else {
            return false;
        };
        self.objects[idx].handle = new;
        self.object_index.insert(new, idx);

        let swap = |h: &mut HostHandle| {
            if *h == old {
                *h = new;
            }
        };
        for obj in &mut self.objects {
            if let Some(p) = obj.parent.as_mut() {
                swap(p);
            }
            if let Some(light) = obj.light.as_mut() {
                light.filters.iter_mut().for_each(swap);
                light.portals.iter_mut().for_each(swap);
            }
            obj.lighting_excludesubset.iter_mut().for_each(swap);
            obj.lightfilter_subset.iter_mut().for_each(swap);
        }
        for coll in &mut self.collections {
            coll.all_objects.iter_mut().for_each(swap);
        }
        for psettings in &mut self.particle_settings {
            if let Some(h) = psettings.instance_object.as_mut() {
                swap(h);
            }
        }
        for group in &mut self.settings.object_groups {
            group.members.iter_mut().for_each(swap);
        }
        for link in &mut self.settings.light_links {
            swap(&mut link.light);
            link.members.iter_mut().for_each(swap);
        }
        if let Some(cam) = self.settings.camera.as_mut() {
            swap(cam);
        }
        self.evaluate();
        true
    }

    pub fn add_material(&mut self, material: HostMaterial) -> &mut Self {
        upsert(&mut self.materials, material, |m| m.handle);
        self
    }

    pub fn edit_material(&mut self, handle: HostHandle, f: impl FnOnce(&mut HostMaterial)) -> bool {
        match self.materials.iter_mut().find(|m| m.handle == handle) {
            Some(mat) => {
                f(mat);
                true
            }
            None => false,
        }
    }

    pub fn add_collection(&mut self, collection: HostCollection) -> &mut Self {
        upsert(&mut self.collections, collection, |c| c.handle);
        self.evaluate();
        self
    }

    pub fn add_particle_settings(&mut self, settings: ParticleSettings) -> &mut Self {
        upsert(&mut self.particle_settings, settings, |p| p.handle);
        self.evaluate();
        self
    }

    pub fn add_node_tree(&mut self, tree: NodeTree) -> &mut Self {
        upsert(&mut self.node_trees, tree, |t| t.handle);
        self.evaluate();
        self
    }

    fn reindex(&mut self) {
        self.object_index = self.objects.iter().enumerate().map(|(i, o)| (o.handle, i)).collect();
    }

    fn is_evaluated(&self, obj: &HostObject) -> bool {
        obj.in_view_layer && !obj.hide_viewport && (!self.settings.local_view || obj.in_local_view)
    }

    /// Recomputes the instance enumeration.
    fn evaluate(&mut self) {
        let mut instances = Vec::new();

        for obj in &self.objects {
            if !self.is_evaluated(obj) {
                continue;
            }
            if !obj.hidden {
                instances.push(ObjectInstance {
                    object: obj.handle,
                    parent: None,
                    persistent_id: [0, 0],
                    is_instance: false,
                    matrix_world: obj.matrix_world,
                    particle_settings: None,
                });
            }

            if obj.kind == ObjectKind::Empty
                && obj.is_instancer
                && let Some(coll) = obj.instance_collection.and_then(|h| self.find_collection(h))
            {
                for (i, member) in coll.all_objects.iter().enumerate() {
                    self.push_instance(&mut instances, obj, *member, [i as i32, 0], obj.matrix_world, None);
                }
            }

            for (psys_index, psys) in obj.particle_systems.iter().enumerate() {
                let Some(settings) = self.particle_settings.iter().find(|s| s.handle == psys.settings) else {
                    continue;
                };
                let targets: Vec<HostHandle> = match settings.render_as {
                    ParticleRender::Points => continue,
                    ParticleRender::Object => settings.instance_object.into_iter().collect(),
                    ParticleRender::Collection => settings
                        .instance_collection
                        .and_then(|h| self.find_collection(h))
                        .map(|c| c.all_objects.clone())
                        .unwrap_or_default(),
                };
                for (point_index, point) in psys.points.iter().enumerate() {
                    let placement = obj.matrix_world * Mat4::from_translation((*point).into());
                    for target in &targets {
                        self.push_instance(
                            &mut instances,
                            obj,
                            *target,
                            [point_index as i32, psys_index as i32],
                            placement,
                            Some(settings.handle),
                        );
                    }
                }
            }

            for (tree_index, tree_handle) in obj.node_modifiers.iter().enumerate() {
                let Some(tree) = self.node_trees.iter().find(|t| t.handle == *tree_handle) else {
                    continue;
                };
                for directive in &tree.directives {
                    let targets: Vec<HostHandle> = match directive {
                        InstanceDirective::Object(h) => vec![*h],
                        InstanceDirective::Collection(h) => {
                            self.find_collection(*h).map(|c| c.all_objects.clone()).unwrap_or_default()
                        }
                    };
                    for (i, target) in targets.iter().enumerate() {
                        self.push_instance(
                            &mut instances,
                            obj,
                            *target,
                            [i as i32, tree_index as i32 + 1000],
                            obj.matrix_world,
                            None,
                        );
                    }
                }
            }
        }

        self.instances = instances;
    }

    fn push_instance(
        &self,
        out: &mut Vec<ObjectInstance>,
        instancer: &HostObject,
        target: HostHandle,
        persistent_id: [i32; 2],
        placement: Mat4,
        particle_settings: Option<HostHandle>,
    ) {
        let Some(target_obj) = self.object_index.get(&target).map(|&i| &self.objects[i]) else {
            return;
        };
        if target_obj.hide_viewport {
            return;
        }
        out.push(ObjectInstance {
            object: target,
            parent: Some(instancer.handle),
            persistent_id,
            is_instance: true,
            matrix_world: placement * target_obj.matrix_world,
            particle_settings,
        });
    }

    fn find_collection(&self, handle: HostHandle) -> Option<&HostCollection> {
        self.collections.iter().find(|c| c.handle == handle)
    }
}

fn upsert<T>(items: &mut Vec<T>, item: T, key: impl Fn(&T) -> HostHandle) {
    let handle = key(&item);
    match items.iter_mut().find(|existing| key(existing) == handle) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

impl HostScene for HostSnapshot {
    fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    fn objects(&self) -> &[HostObject] {
        &self.objects
    }

    fn object(&self, handle: HostHandle) -> Option<&HostObject> {
        self.object_index.get(&handle).map(|&i| &self.objects[i])
    }

    fn instances(&self) -> &[ObjectInstance] {
        &self.instances
    }

    fn materials(&self) -> &[HostMaterial] {
        &self.materials
    }

    fn material(&self, handle: HostHandle) -> Option<&HostMaterial> {
        self.materials.iter().find(|m| m.handle == handle)
    }

    fn collection(&self, handle: HostHandle) -> Option<&HostCollection> {
        self.find_collection(handle)
    }

    fn particle_settings(&self, handle: HostHandle) -> Option<&ParticleSettings> {
        self.particle_settings.iter().find(|p| p.handle == handle)
    }

    fn node_trees(&self) -> &[NodeTree] {
        &self.node_trees
    }

    fn node_tree(&self, handle: HostHandle) -> Option<&NodeTree> {
        self.node_trees.iter().find(|t| t.handle == handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(raw: u64) -> HostHandle {
        HostHandle::new(raw)
    }

    #[test]
    fn direct_placements_skip_hidden_objects() {
        let mut host = HostSnapshot::new();
        host.add_object(HostObject::mesh(h(1), "Cube"));
        host.add_object(HostObject::mesh(h(2), "Sphere"));
        assert_eq!(host.instances().len(), 2);

        host.edit_object(h(2), |o| o.hidden = true);
        assert_eq!(host.instances().len(), 1);
        assert_eq!(host.instances()[0].object, h(1));
    }

    #[test]
    fn collection_instancer_places_members() {
        let mut host = HostSnapshot::new();
        host.add_object(HostObject::mesh(h(1), "Cube"));
        host.add_collection(HostCollection {
            handle: h(100),
            name: "Props".into(),
            all_objects: vec![h(1)],
        });
        let mut empty = HostObject::empty(h(2), "Instancer");
        empty.is_instancer = true;
        empty.instance_collection = Some(h(100));
        host.add_object(empty);

        let placed: Vec<_> = host.instances().iter().filter(|i| i.is_instance).collect();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].object, h(1));
        assert_eq!(placed[0].parent, Some(h(2)));
    }

    #[test]
    fn reissued_handle_follows_references() {
        let mut host = HostSnapshot::new();
        host.add_object(HostObject::empty(h(1), "Parent"));
        host.add_object(HostObject::mesh(h(2), "Child").with_parent(h(1)));

        assert!(host.reissue_handle(h(1), h(10)));
        assert!(host.object(h(1)).is_none());
        assert_eq!(host.object(h(10)).unwrap().name, "Parent");
        assert_eq!(host.object(h(2)).unwrap().parent, Some(h(10)));
    }

    #[test]
    fn texture_owner_lookup() {
        let mut host = HostSnapshot::new();
        host.add_material(HostMaterial::new(h(50), "Brick"));
        host.add_object(HostObject::mesh(h(1), "Wall"));
        assert_eq!(host.texture_owner("Brick"), Some(crate::host::TextureOwner::Material(h(50))));
        assert_eq!(host.texture_owner("Wall"), Some(crate::host::TextureOwner::Object(h(1))));
        assert_eq!(host.texture_owner("World"), Some(crate::host::TextureOwner::World));
        assert_eq!(host.texture_owner("Nope"), None);
    }
}
