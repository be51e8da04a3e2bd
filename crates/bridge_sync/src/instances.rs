//! Instance manager.
//!
//! Every placement of an instanced object (direct, collection, particle or
//! node-tree instancing) is an instance group node parenting the object's
//! shared prototype. Re-emission reconciles the recorded groups against the
//! host's current instance enumeration.

use std::collections::BTreeSet;

use bridge_core::{BridgeError, HostHandle, Result};
use bridge_scene::{NodeId, SceneGraph};
use rustc_hash::FxHashSet;

use crate::host::{HostObject, ObjectInstance};
use crate::naming::group_db_name;
use crate::record::{InstanceRecord, SceneRegistry};
use crate::translate::empty::parented_to_empty;
use crate::translate::{TranslateContext, TranslatorSet};

/// Re-emits the instances of every object in `objects`.
///
/// Failures are logged per object and do not stop the others.
pub fn reemit(
    cx: &mut TranslateContext<'_>,
    translators: &TranslatorSet,
    registry: &mut SceneRegistry,
    objects: &BTreeSet<HostHandle>,
) {
    for &handle in objects {
        if let Err(e) = reemit_object(cx, translators, registry, handle) {
            log::error!("Failed to re-emit instances: {e}");
        }
    }
}

/// Reconciles one object's instance groups with the host enumeration.
///
/// Stale groups are deleted first; live ones are updated in place or created.
pub fn reemit_object(
    cx: &mut TranslateContext<'_>,
    translators: &TranslatorSet,
    registry: &mut SceneRegistry,
    handle: HostHandle,
) -> Result<()> {
    let Some(record) = registry.objects.get(&handle) else {
        return Ok(());
    };
    if !record.category.is_instanced() {
        return Ok(());
    }
    let host = cx.host;
    if host.object(handle).is_none() {
        return Ok(());
    }

    let placements: Vec<(String, &ObjectInstance)> = host
        .instances()
        .iter()
        .filter(|inst| inst.object == handle)
        .map(|inst| (group_db_name(host, inst), inst))
        .collect();
    let live: FxHashSet<&str> = placements.iter().map(|(key, _)| key.as_str()).collect();

    let stale: Vec<String> = record
        .instances
        .keys()
        .filter(|key| !live.contains(key.as_str()))
        .cloned()
        .collect();
    if let Some(record) = registry.objects.get_mut(&handle) {
        for key in stale {
            if let Some(inst) = record.instances.remove(&key) {
                release_group(cx.graph, &inst);
            }
        }
    }

    for (key, inst) in placements {
        emit_instance(cx, translators, registry, inst, key)?;
    }
    Ok(())
}

/// Creates or updates the instance group of one placement.
fn emit_instance(
    cx: &mut TranslateContext<'_>,
    translators: &TranslatorSet,
    registry: &mut SceneRegistry,
    inst: &ObjectInstance,
    key: String,
) -> Result<()> {
    let host = cx.host;
    let Some(obj) = host.object(inst.object) else {
        return Err(BridgeError::MissingSource(inst.object.to_string()));
    };

    let (parent_node, matrix) = structural_parent(cx, registry, obj, inst);
    let material = placement_material(cx, registry, obj, inst);

    let Some(record) = registry.objects.get(&inst.object) else {
        return Ok(());
    };
    let prototype = record.node;
    let existing = record.instances.get(&key).map(|i| (i.group, i.attached_to));

    let group = match existing {
        Some((group, attached_to)) if cx.graph.contains(group) => {
            if attached_to != parent_node {
                cx.graph.remove_child(attached_to, group);
            }
            group
        }
        _ => translators.group.export(cx, &key),
    };

    translators.group.update_transform(cx, group, matrix);
    let id = translators.group.export_object_attributes(cx, obj, group, inst.persistent_id)?;
    cx.graph.set_material(group, material);
    cx.graph.add_child(group, prototype);
    cx.graph.add_child(parent_node, group);

    registry.object_ids.insert(id, obj.name.clone());
    if let Some(record) = registry.objects.get_mut(&inst.object) {
        record.instances.insert(
            key.clone(),
            InstanceRecord {
                key,
                group,
                attached_to: parent_node,
                psys_settings: inst.particle_settings,
                instancer: inst.parent,
            },
        );
    }
    if let Some(instancer) = inst.parent.and_then(|h| registry.objects.get_mut(&h)) {
        instancer.objects_instanced.insert(inst.object);
    }
    Ok(())
}

/// Node a placement attaches to, and the matrix relative to it.
fn structural_parent(
    cx: &TranslateContext<'_>,
    registry: &SceneRegistry,
    obj: &HostObject,
    inst: &ObjectInstance,
) -> (NodeId, glam::Mat4) {
    if !inst.is_instance
        && parented_to_empty(cx.host, obj)
        && let Some(parent) = obj.parent.and_then(|p| registry.objects.get(&p))
    {
        return (parent.node, obj.matrix_local);
    }
    (cx.graph.root(), inst.matrix_world)
}

/// Material bound to a placement: the particle settings' slot on the
/// instancer for particle instances, otherwise the object's first slot.
fn placement_material(
    cx: &TranslateContext<'_>,
    registry: &SceneRegistry,
    obj: &HostObject,
    inst: &ObjectInstance,
) -> Option<NodeId> {
    let slot_material = match inst.particle_settings.and_then(|h| cx.host.particle_settings(h)) {
        Some(settings) => inst
            .parent
            .and_then(|p| cx.host.object(p))
            .and_then(|emitter| emitter.materials.get(settings.material_slot).copied()),
        None => obj.materials.first().copied(),
    };
    slot_material.and_then(|h| registry.material(h)).map(|m| m.node)
}

fn release_group(graph: &mut dyn SceneGraph, inst: &InstanceRecord) {
    graph.remove_child(inst.attached_to, inst.group);
    graph.delete_node(inst.group);
}

/// Removes every instance group of an object. Unknown objects are a no-op.
pub fn clear(graph: &mut dyn SceneGraph, registry: &mut SceneRegistry, handle: HostHandle) {
    let Some(record) = registry.objects.get_mut(&handle) else {
        return;
    };
    for (_, inst) in record.instances.drain() {
        release_group(graph, &inst);
    }
}

/// Attaches the node of a non-instanced object (camera, light filter, empty)
/// to its structural parent and sets its transform relative to it.
///
/// The node nests under its parent empty only while that empty has a record;
/// otherwise it sits under the root with its world matrix.
pub fn attach_structural(cx: &mut TranslateContext<'_>, registry: &mut SceneRegistry, handle: HostHandle) {
    let Some(record) = registry.objects.get(&handle) else {
        return;
    };
    if record.category.is_instanced() {
        return;
    }
    let host = cx.host;
    let Some(obj) = host.object(handle) else {
        return;
    };
    let nested = obj
        .parent
        .filter(|_| parented_to_empty(host, obj))
        .and_then(|p| registry.objects.get(&p))
        .map(|p| p.node);
    let (parent, matrix) = match nested {
        Some(node) => (node, obj.matrix_local),
        None => (cx.graph.root(), obj.matrix_world),
    };

    let node = record.node;
    if record.attached_to != Some(parent) {
        if let Some(previous) = record.attached_to {
            cx.graph.remove_child(previous, node);
        }
        cx.graph.add_child(parent, node);
    }
    cx.graph.set_transform(node, &[matrix], &[]);
    if let Some(record) = registry.objects.get_mut(&handle) {
        record.attached_to = Some(parent);
    }
}

/// Clears the instances of every object using `material` and returns them
/// for re-emission. Used when a material's mesh-light state toggles.
pub fn detach_material_users(
    graph: &mut dyn SceneGraph,
    host_objects: &[HostObject],
    registry: &mut SceneRegistry,
    material: HostHandle,
) -> BTreeSet<HostHandle> {
    let users: BTreeSet<HostHandle> = host_objects
        .iter()
        .filter(|o| o.materials.contains(&material))
        .map(|o| o.handle)
        .filter(|h| registry.objects.contains_key(h))
        .collect();
    for &user in &users {
        clear(graph, registry, user);
    }
    users
}
