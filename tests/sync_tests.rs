//! Sync Driver Integration Tests
//!
//! Tests for:
//! - Identity: records survive host handle reissue
//! - Instancing: re-emission is idempotent, particle instancers
//! - Deletion: every renderer node of a deleted object is released
//! - Atomicity: every mutation happens inside an edit scope
//! - Visibility: hide/unhide, solo lights, default light
//! - Dependencies: light filters, emissive material toggles
//! - Routing: collection, node tree, camera, world and particle settings payloads
//! - Hierarchy: objects parented to empties nest under the empty's node

use glam::{Mat4, Vec3};
use scenebridge::core::{ParamValue, tokens};
use scenebridge::prelude::*;
use scenebridge::sync::host::{InstanceDirective, NodeTree, ParticleRender, ParticleSystem};
use scenebridge::{Payload, ShaderDesc};

fn h(raw: u64) -> HostHandle {
    HostHandle::new(raw)
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn start(host: &HostSnapshot) -> SceneSync<MemorySceneGraph> {
    init_logger();
    let mut sync = SceneSync::new(MemorySceneGraph::new(), SyncConfig::default());
    sync.start_interactive(host);
    sync
}

fn cube_scene() -> HostSnapshot {
    let mut host = HostSnapshot::new();
    host.add_material(HostMaterial::new(h(10), "Brick"));
    host.add_object(HostObject::mesh(h(1), "Cube").with_material(h(10)));
    host
}

fn assert_edits_balanced(sync: &SceneSync<MemorySceneGraph>) {
    let stats = sync.graph().stats();
    assert_eq!(stats.mutations_outside_edit, 0);
    assert_eq!(stats.scopes_opened, stats.scopes_closed);
    assert!(!sync.graph().is_editing());
}

fn light_filter_names(sync: &SceneSync<MemorySceneGraph>, light: HostHandle) -> Vec<String> {
    let node = sync.registry().object(light).unwrap().node;
    let shader = sync.graph().node(node).unwrap().shader.as_ref().unwrap();
    match shader.params.get(tokens::LIGHT_FILTER_PARAM) {
        Some(ParamValue::StringArray(names)) => names.clone(),
        other => panic!("unexpected lightFilter param: {other:?}"),
    }
}

fn keys(sync: &SceneSync<MemorySceneGraph>, handle: HostHandle) -> Vec<String> {
    sync.registry()
        .object(handle)
        .map(|r| r.instance_keys().into_iter().map(str::to_owned).collect())
        .unwrap_or_default()
}

fn shader_param(sync: &SceneSync<MemorySceneGraph>, node: scenebridge::NodeId, name: &str) -> Option<ParamValue> {
    sync.graph().node(node)?.shader.as_ref()?.params.get(name).cloned()
}

// ============================================================================
// Export
// ============================================================================

#[test]
fn export_builds_prototype_and_instance() {
    let host = cube_scene();
    let sync = start(&host);

    let record = sync.registry().object(h(1)).unwrap();
    assert_eq!(record.db_name, "Cube-MESH");
    assert_eq!(record.instance_keys(), vec!["Cube"]);

    let group = record.instances["Cube"].group;
    let material = sync.registry().material(h(10)).unwrap().node;
    assert_eq!(sync.graph().children(group), &[record.node]);
    assert_eq!(sync.graph().node(group).unwrap().material, Some(material));
    assert!(sync.graph().children(sync.graph().root()).contains(&group));
    assert_edits_balanced(&sync);
}

// ============================================================================
// Identity
// ============================================================================

#[test]
fn reissued_handle_keeps_record_by_name() {
    let mut host = cube_scene();
    let mut sync = start(&host);
    let prototype = sync.registry().object(h(1)).unwrap().node;
    let nodes = sync.graph().node_count();

    host.reissue_handle(h(1), h(101));
    sync.update_scene(&host, &[Notification::object(h(101)).transform()]);

    assert!(sync.registry().object(h(1)).is_none());
    let record = sync.registry().object(h(101)).unwrap();
    assert_eq!(record.node, prototype);
    assert_eq!(record.handle, h(101));
    assert_eq!(record.instance_keys(), vec!["Cube"]);
    assert_eq!(sync.graph().node_count(), nodes);
}

#[test]
fn reissued_handle_with_old_handle_is_rekeyed() {
    let mut host = cube_scene();
    let mut sync = start(&host);
    let nodes = sync.graph().node_count();

    host.reissue_handle(h(1), h(77));
    sync.update_scene(&host, &[Notification::object(h(77)).with_old(h(1)).geometry()]);

    assert!(sync.registry().object(h(77)).is_some());
    assert_eq!(sync.registry().objects.len(), 1);
    assert_eq!(sync.graph().node_count(), nodes);
}

// ============================================================================
// Instancing
// ============================================================================

fn particle_instancer_scene() -> HostSnapshot {
    let mut host = HostSnapshot::new();
    let mut scatter = ParticleSettings::new(h(21), "Scatter");
    scatter.render_as = ParticleRender::Object;
    scatter.instance_object = Some(h(3));
    host.add_particle_settings(scatter);
    host.add_object(HostObject::mesh(h(3), "Pebble"));

    let mut emitter = HostObject::mesh(h(1), "Emitter");
    emitter.particle_systems.push(ParticleSystem {
        name: "Scatter".into(),
        settings: h(21),
        points: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
    });
    host.add_object(emitter);
    host
}

#[test]
fn particle_instancer_places_target() {
    let host = particle_instancer_scene();
    let sync = start(&host);

    let pebble = sync.registry().object(h(3)).unwrap();
    assert_eq!(
        pebble.instance_keys(),
        vec!["Emitter|Pebble|Scatter|0|0", "Emitter|Pebble|Scatter|0|1", "Pebble"]
    );
    assert!(sync.registry().object(h(1)).unwrap().objects_instanced.contains(&h(3)));
}

#[test]
fn reemit_through_pass_is_idempotent() {
    let host = particle_instancer_scene();
    let mut sync = start(&host);
    let nodes = sync.graph().node_count();
    let keys: Vec<String> = sync
        .registry()
        .object(h(3))
        .unwrap()
        .instance_keys()
        .into_iter()
        .map(str::to_owned)
        .collect();

    sync.update_scene(&host, &[Notification::object(h(1)).transform()]);
    sync.update_scene(&host, &[Notification::object(h(1)).transform()]);

    let after: Vec<String> = sync
        .registry()
        .object(h(3))
        .unwrap()
        .instance_keys()
        .into_iter()
        .map(str::to_owned)
        .collect();
    assert_eq!(after, keys);
    assert_eq!(sync.graph().node_count(), nodes);
    assert_edits_balanced(&sync);
}

#[test]
fn emitter_particles_live_under_prototype() {
    let mut host = HostSnapshot::new();
    host.add_particle_settings(ParticleSettings::new(h(20), "Sparks"));
    let mut emitter = HostObject::mesh(h(1), "Emitter");
    emitter.particle_systems.push(ParticleSystem {
        name: "Sparks".into(),
        settings: h(20),
        points: vec![[0.0, 1.0, 0.0]],
    });
    host.add_object(emitter);
    let sync = start(&host);

    let record = sync.registry().object(h(1)).unwrap();
    let group = record.particle_group.unwrap();
    assert!(sync.graph().children(record.node).contains(&group));

    let points = sync.graph().find_by_name("Emitter-MESH|Sparks-PARTICLES").unwrap();
    assert!(sync.graph().children(group).contains(&points));
}

// ============================================================================
// Deletion
// ============================================================================

#[test]
fn deleted_object_releases_every_node() {
    let mut host = HostSnapshot::new();
    host.add_particle_settings(ParticleSettings::new(h(20), "Sparks"));
    let baseline = start(&host).graph().node_count();

    let mut emitter = HostObject::mesh(h(1), "Emitter");
    emitter.particle_systems.push(ParticleSystem {
        name: "Sparks".into(),
        settings: h(20),
        points: vec![[0.0, 1.0, 0.0]],
    });
    host.add_object(emitter);
    let mut sync = start(&host);
    assert!(sync.graph().node_count() > baseline);

    host.remove_object(h(1));
    sync.update_scene(&host, &[Notification::scene()]);

    assert!(sync.registry().object(h(1)).is_none());
    assert!(sync.graph().find_by_name("Emitter-MESH").is_none());
    assert!(sync.graph().find_by_name("Emitter-MESH|Sparks-PARTICLES").is_none());
    assert_eq!(sync.graph().node_count(), baseline);
    assert_edits_balanced(&sync);
}

#[test]
fn deleted_light_filter_updates_every_light() {
    let mut host = HostSnapshot::new();
    host.add_object(HostObject::light_filter(h(5), "Blocker", "PxrBlockerLightFilter"));
    for (raw, name) in [(1, "Key"), (2, "Fill")] {
        let mut light = HostObject::light(h(raw), name, "PxrRectLight");
        if let Some(settings) = light.light.as_mut() {
            settings.filters.push(h(5));
        }
        host.add_object(light);
    }
    let mut sync = start(&host);
    assert_eq!(light_filter_names(&sync, h(1)), vec!["Blocker-LIGHTFILTER"]);
    assert_eq!(light_filter_names(&sync, h(2)), vec!["Blocker-LIGHTFILTER"]);

    host.remove_object(h(5));
    sync.update_scene(&host, &[Notification::scene()]);

    assert!(sync.registry().object(h(5)).is_none());
    assert!(light_filter_names(&sync, h(1)).is_empty());
    assert!(light_filter_names(&sync, h(2)).is_empty());
}

// ============================================================================
// Atomicity
// ============================================================================

#[test]
fn failing_update_still_closes_edit() {
    let mut host = cube_scene();
    let mut sync = start(&host);

    host.edit_object(h(1), |o| o.mesh = None);
    sync.update_scene(&host, &[Notification::object(h(1)).geometry()]);

    assert!(sync.registry().object(h(1)).is_some());
    assert_edits_balanced(&sync);
}

#[test]
fn unsupported_type_change_keeps_record() {
    let mut host = cube_scene();
    let mut sync = start(&host);
    let prototype = sync.registry().object(h(1)).unwrap().node;

    host.edit_object(h(1), |o| o.kind = scenebridge::sync::host::ObjectKind::Volume);
    sync.update_scene(&host, &[Notification::object(h(1)).geometry()]);

    assert_eq!(sync.registry().object(h(1)).unwrap().node, prototype);
    assert_edits_balanced(&sync);
}

// ============================================================================
// Visibility
// ============================================================================

#[test]
fn hide_and_unhide_keeps_prototype() {
    let mut host = cube_scene();
    let mut sync = start(&host);
    let prototype = sync.registry().object(h(1)).unwrap().node;

    host.edit_object(h(1), |o| o.hidden = true);
    sync.update_scene(&host, &[Notification::object(h(1))]);
    let record = sync.registry().object(h(1)).unwrap();
    assert!(record.is_hidden);
    assert!(record.instances.is_empty());
    assert!(sync.graph().contains(prototype));

    host.edit_object(h(1), |o| o.hidden = false);
    sync.update_scene(&host, &[Notification::object(h(1))]);
    let record = sync.registry().object(h(1)).unwrap();
    assert!(!record.is_hidden);
    assert_eq!(record.node, prototype);
    assert_eq!(record.instance_keys(), vec!["Cube"]);
}

#[test]
fn default_light_returns_when_last_light_is_deleted() {
    let mut host = cube_scene();
    let mut sync = start(&host);
    let default_light = sync.default_light().unwrap();

    host.add_object(HostObject::light(h(2), "Key", "PxrRectLight"));
    sync.update_scene(&host, &[Notification::object(h(2))]);
    assert_eq!(sync.graph().hidden(default_light), Some(Visibility::Hidden));

    host.remove_object(h(2));
    sync.update_scene(&host, &[Notification::scene()]);
    assert_eq!(sync.graph().hidden(default_light), Some(Visibility::Visible));
}

#[test]
fn solo_and_unsolo_lights() {
    let mut host = HostSnapshot::new();
    let mut key = HostObject::light(h(1), "Key", "PxrRectLight");
    if let Some(settings) = key.light.as_mut() {
        settings.solo = true;
    }
    host.add_object(key);
    host.add_object(HostObject::light(h(2), "Fill", "PxrRectLight"));
    let mut sync = start(&host);
    let key_node = sync.registry().object(h(1)).unwrap().node;
    let fill_node = sync.registry().object(h(2)).unwrap().node;

    sync.update_solo_light(&host);
    assert_eq!(sync.graph().hidden(key_node), Some(Visibility::Visible));
    assert_eq!(sync.graph().hidden(fill_node), Some(Visibility::Hidden));

    sync.update_un_solo_light(&host);
    assert_eq!(sync.graph().hidden(key_node), Some(Visibility::Visible));
    assert_eq!(sync.graph().hidden(fill_node), Some(Visibility::Visible));
}

// ============================================================================
// Materials
// ============================================================================

#[test]
fn emissive_toggle_rebuilds_user_instances() {
    let mut host = cube_scene();
    let mut sync = start(&host);
    let before = sync.registry().object(h(1)).unwrap().instances["Cube"].group;

    host.edit_material(h(10), |m| m.emissive = true);
    sync.update_scene(&host, &[Notification::material(h(10))]);

    assert!(sync.registry().material(h(10)).unwrap().has_meshlight);
    let after = sync.registry().object(h(1)).unwrap().instances["Cube"].group;
    assert_ne!(before, after);
    assert!(!sync.graph().contains(before));
}

#[test]
fn new_material_is_exported_on_update() {
    let mut host = cube_scene();
    let mut sync = start(&host);

    host.add_material(HostMaterial::new(h(11), "Glass"));
    sync.update_scene(&host, &[Notification::material(h(11))]);
    assert!(sync.registry().material(h(11)).is_some());
    assert!(sync.graph().find_by_name("Glass-MATERIAL").is_some());
}

// ============================================================================
// Scene state
// ============================================================================

#[test]
fn frame_change_sets_option() {
    let mut host = cube_scene();
    let mut sync = start(&host);

    host.edit_settings(|s| s.frame = 12);
    sync.update_scene(&host, &[Notification::scene()]);
    assert_eq!(sync.graph().options().get(tokens::RI_FRAME), Some(&ParamValue::Int(12)));
}

#[test]
fn updates_are_ignored_after_stop() {
    let mut host = cube_scene();
    let mut sync = start(&host);
    sync.stop_interactive();
    let stats = sync.graph().stats();

    host.add_object(HostObject::mesh(h(2), "Sphere"));
    sync.update_scene(&host, &[Notification::object(h(2))]);
    sync.update_cropwindow([0.0, 1.0, 0.0, 1.0]);

    assert_eq!(sync.graph().stats(), stats);
    assert!(sync.graph().find_by_name("Sphere-MESH").is_none());
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn configured_properties_reach_renderer() -> anyhow::Result<()> {
    init_logger();
    let json = serde_json::json!({
        "settings": { "render_default_light": false },
        "object_properties": [
            { "name": "dice_rate", "type": "float", "primvar": "dice:micropolygonlength" },
            { "name": "shade_rate", "type": "float", "attribute": "shade:rate" }
        ]
    });
    let config = SyncConfig::from_json_str(&json.to_string())?;

    let mut host = HostSnapshot::new();
    let mut cube = HostObject::mesh(h(1), "Cube");
    cube.properties.set("dice_rate", 0.5_f32);
    cube.properties.set("shade_rate", 2.0_f32);
    host.add_object(cube);

    let mut sync = SceneSync::new(MemorySceneGraph::new(), config);
    sync.start_interactive(&host);

    let record = sync.registry().object(h(1)).ok_or_else(|| anyhow::anyhow!("cube not exported"))?;
    let primvars = sync.graph().primvars(record.node).ok_or_else(|| anyhow::anyhow!("no primvars"))?;
    assert_eq!(primvars.get("dice:micropolygonlength"), Some(&ParamValue::Float(0.5)));

    let group = record.instances["Cube"].group;
    let attrs = sync.graph().attributes(group).ok_or_else(|| anyhow::anyhow!("no attributes"))?;
    assert_eq!(attrs.get("shade:rate"), Some(&ParamValue::Float(2.0)));

    let default_light = sync.default_light().ok_or_else(|| anyhow::anyhow!("no default light"))?;
    assert_eq!(sync.graph().hidden(default_light), Some(Visibility::Hidden));
    Ok(())
}

// ============================================================================
// Light filter links
// ============================================================================

#[test]
fn filter_linked_after_export_is_dropped_on_delete() {
    let mut host = HostSnapshot::new();
    host.add_object(HostObject::light(h(1), "Key", "PxrRectLight"));
    host.add_object(HostObject::light_filter(h(5), "Blocker", "PxrBlockerLightFilter"));
    let mut sync = start(&host);
    assert!(light_filter_names(&sync, h(1)).is_empty());

    host.edit_object(h(1), |o| {
        if let Some(settings) = o.light.as_mut() {
            settings.filters.push(h(5));
        }
    });
    sync.update_light(&host, h(1));
    assert_eq!(light_filter_names(&sync, h(1)), vec!["Blocker-LIGHTFILTER"]);
    assert!(sync.registry().object(h(5)).unwrap().lights.contains(&h(1)));

    host.remove_object(h(5));
    sync.update_scene(&host, &[Notification::scene()]);
    assert!(sync.registry().object(h(5)).is_none());
    assert!(light_filter_names(&sync, h(1)).is_empty());
}

#[test]
fn unlinked_filter_forgets_light() {
    let mut host = HostSnapshot::new();
    let mut key = HostObject::light(h(1), "Key", "PxrRectLight");
    if let Some(settings) = key.light.as_mut() {
        settings.filters.push(h(5));
    }
    host.add_object(key);
    host.add_object(HostObject::light_filter(h(5), "Blocker", "PxrBlockerLightFilter"));
    let mut sync = start(&host);
    assert!(sync.registry().object(h(5)).unwrap().lights.contains(&h(1)));

    host.edit_object(h(1), |o| {
        if let Some(settings) = o.light.as_mut() {
            settings.filters.clear();
        }
    });
    sync.update_scene(&host, &[Notification::object(h(1)).geometry()]);
    assert!(sync.registry().object(h(5)).unwrap().lights.is_empty());
    assert!(light_filter_names(&sync, h(1)).is_empty());
}

#[test]
fn deleted_filter_updates_emissive_material() {
    let mut host = HostSnapshot::new();
    let mut glow = HostMaterial::new(h(10), "Glow");
    glow.emissive = true;
    glow.light_filters.push(h(5));
    host.add_material(glow);
    host.add_object(HostObject::mesh(h(1), "Panel").with_material(h(10)));
    host.add_object(HostObject::light_filter(h(5), "Blocker", "PxrBlockerLightFilter"));
    let mut sync = start(&host);

    let material = sync.registry().material(h(10)).unwrap().node;
    assert!(sync.registry().object(h(5)).unwrap().materials.contains(&h(10)));
    assert_eq!(
        shader_param(&sync, material, tokens::LIGHT_FILTER_PARAM),
        Some(ParamValue::StringArray(vec!["Blocker-LIGHTFILTER".into()]))
    );

    host.remove_object(h(5));
    sync.update_scene(&host, &[Notification::scene()]);
    assert_eq!(
        shader_param(&sync, material, tokens::LIGHT_FILTER_PARAM),
        Some(ParamValue::StringArray(Vec::new()))
    );
}

#[test]
fn update_light_reemits_unhidden_light() {
    let mut host = HostSnapshot::new();
    let mut key = HostObject::light(h(1), "Key", "PxrRectLight");
    key.hidden = true;
    host.add_object(key);
    let mut sync = start(&host);
    assert!(keys(&sync, h(1)).is_empty());

    host.edit_object(h(1), |o| o.hidden = false);
    sync.update_light(&host, h(1));
    assert_eq!(keys(&sync, h(1)), vec!["Key"]);
    let node = sync.registry().object(h(1)).unwrap().node;
    assert_eq!(sync.graph().hidden(node), Some(Visibility::Visible));
}

// ============================================================================
// Hierarchy
// ============================================================================

fn rig_scene() -> (HostSnapshot, Mat4) {
    let mut host = HostSnapshot::new();
    let rig_matrix = Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0));
    let local = Mat4::from_translation(Vec3::X);

    let mut arm = HostObject::empty(h(2), "Arm").with_parent(h(5));
    arm.matrix_local = local;
    arm.matrix_world = rig_matrix * local;
    host.add_object(arm);

    let mut lens = HostObject::camera(h(3), "Lens").with_parent(h(5));
    lens.matrix_local = local;
    lens.matrix_world = rig_matrix * local;
    host.add_object(lens);

    host.add_object(HostObject::empty(h(5), "Rig").with_matrix(rig_matrix));
    (host, local)
}

#[test]
fn children_nest_under_parent_empty() {
    let (host, local) = rig_scene();
    let sync = start(&host);

    let rig = sync.registry().object(h(5)).unwrap().node;
    for child in [h(2), h(3)] {
        let node = sync.registry().object(child).unwrap().node;
        let node = sync.graph().node(node).unwrap();
        assert_eq!(node.parents, vec![rig]);
        assert_eq!(node.transform, vec![local]);
    }
    assert_edits_balanced(&sync);
}

#[test]
fn deleted_parent_empty_moves_children_to_root() {
    let (mut host, _) = rig_scene();
    let mut sync = start(&host);

    host.remove_object(h(5));
    sync.update_scene(&host, &[Notification::scene()]);

    assert!(sync.registry().object(h(5)).is_none());
    let root = sync.graph().root();
    let arm = sync.registry().object(h(2)).unwrap().node;
    let world = host.object(h(2)).unwrap().matrix_world;
    assert_eq!(sync.graph().node(arm).unwrap().parents, vec![root]);
    assert_eq!(sync.graph().node(arm).unwrap().transform, vec![world]);
}

// ============================================================================
// Collections
// ============================================================================

fn scatter_scene() -> HostSnapshot {
    let mut host = HostSnapshot::new();
    host.add_object(HostObject::mesh(h(1), "Rock"));
    let mut pebble = HostObject::mesh(h(3), "Pebble");
    pebble.in_view_layer = false;
    host.add_object(pebble);
    host.add_collection(HostCollection {
        handle: h(50),
        name: "Rocks".into(),
        all_objects: vec![h(1), h(3)],
    });
    let mut scatter = HostObject::empty(h(2), "Scatter");
    scatter.is_instancer = true;
    scatter.instance_collection = Some(h(50));
    host.add_object(scatter);
    host
}

#[test]
fn collection_update_exports_new_members() {
    let host = scatter_scene();
    let mut sync = start(&host);
    assert!(sync.registry().object(h(3)).is_none());

    sync.update_scene(&host, &[Notification::collection(h(50))]);
    assert_eq!(keys(&sync, h(3)), vec!["Scatter|Pebble||0|1"]);
    assert_eq!(keys(&sync, h(1)), vec!["Rock", "Scatter|Rock||0|0"]);
}

#[test]
fn collection_update_is_skipped_when_instance_count_changes() {
    let mut host = scatter_scene();
    let mut sync = start(&host);

    host.add_object(HostObject::mesh(h(4), "Boulder"));
    sync.update_scene(&host, &[Notification::collection(h(50))]);
    assert!(sync.registry().object(h(3)).is_none());
    assert_eq!(keys(&sync, h(1)), vec!["Rock", "Scatter|Rock||0|0"]);
}

// ============================================================================
// Node trees
// ============================================================================

fn ground_scene() -> HostSnapshot {
    let mut host = HostSnapshot::new();
    host.add_object(HostObject::mesh(h(2), "Rock"));
    host.add_object(HostObject::mesh(h(3), "Stone"));
    host.add_node_tree(NodeTree {
        handle: h(70),
        name: "Scatter".into(),
        directives: vec![InstanceDirective::Object(h(2))],
    });
    let mut ground = HostObject::mesh(h(1), "Ground");
    ground.node_modifiers.push(h(70));
    host.add_object(ground);
    host
}

#[test]
fn node_tree_update_releases_previous_targets() {
    let mut host = ground_scene();
    let mut sync = start(&host);
    assert_eq!(keys(&sync, h(2)), vec!["Ground|Rock||1000|0", "Rock"]);

    host.add_node_tree(NodeTree {
        handle: h(70),
        name: "Scatter".into(),
        directives: vec![InstanceDirective::Object(h(3))],
    });
    sync.update_scene(&host, &[Notification::new(Payload::NodeTree(h(70)))]);

    assert_eq!(keys(&sync, h(2)), vec!["Rock"]);
    assert_eq!(keys(&sync, h(3)), vec!["Ground|Stone||1000|0", "Stone"]);
    assert_edits_balanced(&sync);
}

#[test]
fn object_payload_rescans_its_node_trees() {
    let mut host = ground_scene();
    host.add_collection(HostCollection {
        handle: h(50),
        name: "Rubble".into(),
        all_objects: vec![h(2), h(3)],
    });
    let mut sync = start(&host);

    host.add_node_tree(NodeTree {
        handle: h(70),
        name: "Scatter".into(),
        directives: vec![InstanceDirective::Collection(h(50))],
    });
    sync.update_scene(&host, &[Notification::new(Payload::Other(h(1)))]);

    assert_eq!(keys(&sync, h(2)), vec!["Ground|Rock||1000|0", "Rock"]);
    assert_eq!(keys(&sync, h(3)), vec!["Ground|Stone||1000|1", "Stone"]);
}

// ============================================================================
// Cameras, world and particle settings
// ============================================================================

#[test]
fn camera_payload_updates_camera_shader() {
    let mut host = cube_scene();
    host.add_object(HostObject::camera(h(4), "Shot"));
    host.add_object(HostObject::camera(h(5), "Witness"));
    host.edit_settings(|s| s.camera = Some(h(4)));
    let mut sync = start(&host);
    let node = sync.registry().object(h(4)).unwrap().node;
    let witness = sync.registry().object(h(5)).unwrap().node;

    host.edit_object(h(4), |o| {
        if let Some(camera) = o.camera.as_mut() {
            camera.fov = 60.0;
        }
    });
    sync.update_scene(&host, &[Notification::new(Payload::Camera(h(4)))]);
    assert_eq!(shader_param(&sync, node, "fov"), Some(ParamValue::Float(60.0)));

    // Viewport renders only follow the active camera.
    host.edit_object(h(5), |o| {
        if let Some(camera) = o.camera.as_mut() {
            camera.fov = 10.0;
        }
    });
    sync.update_scene(&host, &[Notification::new(Payload::Camera(h(5)))]);
    assert_ne!(shader_param(&sync, witness, "fov"), Some(ParamValue::Float(10.0)));

    host.edit_settings(|s| s.is_viewport_render = false);
    sync.update_scene(&host, &[Notification::new(Payload::Camera(h(5)))]);
    assert_eq!(shader_param(&sync, witness, "fov"), Some(ParamValue::Float(10.0)));
}

#[test]
fn focus_object_transform_updates_main_camera() {
    let mut host = cube_scene();
    let mut shot = HostObject::camera(h(4), "Shot");
    if let Some(camera) = shot.camera.as_mut() {
        camera.focus_object = Some(h(1));
    }
    host.add_object(shot);
    host.edit_settings(|s| s.camera = Some(h(4)));
    let mut sync = start(&host);
    let node = sync.registry().object(h(4)).unwrap().node;

    host.edit_object(h(4), |o| {
        if let Some(camera) = o.camera.as_mut() {
            camera.fov = 25.0;
        }
    });
    sync.update_scene(&host, &[Notification::object(h(1)).transform()]);
    assert_eq!(shader_param(&sync, node, "fov"), Some(ParamValue::Float(25.0)));
}

#[test]
fn world_payload_reexports_integrator() {
    let mut host = cube_scene();
    let mut sync = start(&host);

    host.edit_settings(|s| s.integrator = ShaderDesc::new("PxrVCM", "integrator"));
    sync.update_scene(&host, &[Notification::world()]);
    assert_eq!(sync.graph().integrator().map(|i| i.name.as_str()), Some("PxrVCM"));
}

#[test]
fn particle_settings_payload_updates_emitter() {
    let mut host = HostSnapshot::new();
    host.add_particle_settings(ParticleSettings::new(h(20), "Sparks"));
    let mut emitter = HostObject::mesh(h(1), "Emitter");
    emitter.particle_systems.push(ParticleSystem {
        name: "Sparks".into(),
        settings: h(20),
        points: vec![[0.0, 1.0, 0.0]],
    });
    host.add_object(emitter);
    let mut sync = start(&host);

    let mut sparks = ParticleSettings::new(h(20), "Sparks");
    sparks.width = 0.25;
    host.add_particle_settings(sparks);
    sync.update_scene(
        &host,
        &[
            Notification::object(h(1)).geometry(),
            Notification::new(Payload::ParticleSettings(h(20))),
        ],
    );

    let points = sync.graph().find_by_name("Emitter-MESH|Sparks-PARTICLES").unwrap();
    assert_eq!(
        sync.graph().primvars(points).and_then(|p| p.get("constantwidth")),
        Some(&ParamValue::Float(0.25))
    );
}

// ============================================================================
// Local view and portals
// ============================================================================

#[test]
fn local_view_enter_and_leave() {
    let mut host = HostSnapshot::new();
    let mut cube = HostObject::mesh(h(1), "Cube");
    cube.in_local_view = true;
    host.add_object(cube);
    host.add_object(HostObject::mesh(h(2), "Sphere"));
    host.add_object(HostObject::light(h(3), "Key", "PxrRectLight"));
    let mut sync = start(&host);
    let key = sync.registry().object(h(3)).unwrap().node;

    host.edit_settings(|s| s.local_view = true);
    sync.update_scene(&host, &[Notification::scene()]);
    assert_eq!(keys(&sync, h(1)), vec!["Cube"]);
    assert!(keys(&sync, h(2)).is_empty());
    assert!(sync.registry().object(h(2)).is_some());
    assert_eq!(sync.graph().hidden(key), Some(Visibility::Hidden));

    host.edit_settings(|s| s.local_view = false);
    sync.update_scene(&host, &[Notification::scene()]);
    assert_eq!(keys(&sync, h(2)), vec!["Sphere"]);
    assert_eq!(sync.graph().hidden(key), Some(Visibility::Visible));
    assert_edits_balanced(&sync);
}

#[test]
fn light_transform_updates_its_portals() {
    let mut host = HostSnapshot::new();
    let mut dome = HostObject::light(h(1), "Sky", "PxrDomeLight");
    if let Some(settings) = dome.light.as_mut() {
        settings.portals.push(h(2));
    }
    host.add_object(dome);
    host.add_object(HostObject::light(h(2), "Window", "PxrPortalLight"));
    let mut sync = start(&host);
    let portal = sync.registry().object(h(2)).unwrap().node;

    host.edit_object(h(2), |o| {
        if let Some(settings) = o.light.as_mut() {
            settings.params.set("intensity", 2.0_f32);
        }
    });
    sync.update_scene(&host, &[Notification::object(h(1)).transform()]);
    assert_eq!(shader_param(&sync, portal, "intensity"), Some(ParamValue::Float(2.0)));
}
