//! Sync driver.
//!
//! [`SceneSync`] owns the renderer scene graph and every record, and turns
//! batches of host notifications into scene graph edits. One call to
//! [`SceneSync::update_scene`] is one synchronization pass:
//!
//! 1. **Collecting**: notifications are walked newest first and routed into
//!    the pending change set (or applied directly for cheap updates).
//! 2. **Resolving**: candidates for "new object" go through identity
//!    resolution before they are accepted as new.
//! 3. **Applying**: new objects are exported, light filters first and
//!    parents before their children.
//! 4. **Reconciling**: deletions, particle re-evaluation and instance
//!    re-emission.
//!
//! Every pass runs inside a single [`ScopedEdit`], so the renderer never
//! observes a partially updated scene. Failures are logged against the
//! offending object and never abort the pass.

use std::collections::BTreeSet;
use std::mem;

use bridge_core::{BridgeError, Category, HostHandle, ParamValue, Result, SyncConfig, tokens};
use bridge_scene::{NodeId, NodeKind, SceneGraph, ScopedEdit, ShaderDesc, Visibility};
use rustc_hash::FxHashSet;

use crate::classifier::{ObjectFacts, ObjectRoute, classify_object};
use crate::host::{HostMaterial, HostObject, HostScene, InstanceDirective, ObjectKind, SceneSettings, TextureOwner};
use crate::instances;
use crate::naming::{db_name, material_db_name, object_db_name, particles_db_name};
use crate::notification::{Notification, Payload};
use crate::pending::PendingChangeSet;
use crate::record::SceneRegistry;
use crate::texture::{NoTextures, TextureMaker, TextureQueue};
use crate::translate::camera::viewport_resolution;
use crate::translate::light::live_filters;
use crate::translate::{
    CameraTranslator, LightFilterTranslator, LightTranslator, ObjectTranslator, TranslateContext, TranslatorSet,
};

const DEFAULT_LIGHT: &str = "__defaultLight";

/// Ask the command layer to re-tag the owner of a texture node, so the host
/// reports it as updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetagRequest {
    pub owner: TextureOwner,
    pub node: String,
}

/// Session state that survives between passes.
#[derive(Debug, Default)]
struct SyncState {
    registry: SceneRegistry,
    pending: PendingChangeSet,
    /// Host instance count seen by the previous pass.
    num_instances: usize,
    default_light: Option<NodeId>,
    view_layer: BTreeSet<HostHandle>,
    frame: i32,
    local_view: bool,
}

/// Incremental host-to-renderer synchronization session.
pub struct SceneSync<G: SceneGraph> {
    graph: G,
    config: SyncConfig,
    translators: TranslatorSet,
    textures: TextureQueue,
    interactive: bool,
    state: SyncState,
}

impl<G: SceneGraph> SceneSync<G> {
    pub fn new(graph: G, config: SyncConfig) -> Self {
        Self::with_texture_maker(graph, config, NoTextures)
    }

    pub fn with_texture_maker(graph: G, config: SyncConfig, maker: impl TextureMaker) -> Self {
        Self {
            graph,
            config,
            translators: TranslatorSet::with_defaults(),
            textures: TextureQueue::new(maker),
            interactive: false,
            state: SyncState::default(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn registry(&self) -> &SceneRegistry {
        &self.state.registry
    }

    /// Translators used by the session; register custom ones before starting.
    pub fn translators_mut(&mut self) -> &mut TranslatorSet {
        &mut self.translators
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn default_light(&self) -> Option<NodeId> {
        self.state.default_light
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Exports the whole host scene and activates the session.
    pub fn start_interactive(&mut self, host: &dyn HostScene) {
        if self.interactive {
            log::warn!("Interactive sync already running");
            return;
        }
        self.state = SyncState::default();
        self.interactive = true;
        self.with_pass(host, |pass| pass.export_scene());
        log::info!(
            "Started interactive sync: {} objects, {} materials",
            self.state.registry.objects.len(),
            self.state.registry.materials.len()
        );
    }

    /// Deactivates the session. The scene graph is left as is; every command
    /// becomes a no-op until the next [`SceneSync::start_interactive`].
    pub fn stop_interactive(&mut self) {
        if !self.interactive {
            return;
        }
        self.interactive = false;
        self.state.registry.clear();
        self.state.pending.clear();
        log::info!("Stopped interactive sync");
    }

    // ========================================================================
    // Passes
    // ========================================================================

    /// Runs one synchronization pass over a batch of host notifications.
    pub fn update_scene(&mut self, host: &dyn HostScene, notifications: &[Notification]) {
        if !self.interactive {
            return;
        }
        log::debug!("Start update scene");
        let completed = self.textures.drain_completed();
        self.with_pass(host, |pass| {
            for name in &completed {
                pass.cx.graph.invalidate_texture(name);
            }
            pass.run(notifications);
        });
        if self.config.settings.texture_make_on_update {
            self.textures.request_make_all();
        }
        log::debug!("End update scene");
    }

    /// Re-exports a material outside of a pass.
    pub fn update_material(&mut self, host: &dyn HostScene, material: HostHandle) {
        self.with_pass(host, |pass| {
            if !pass.st.registry.materials.contains_key(&material) {
                return;
            }
            if let Err(e) = pass.material_updated(material) {
                log::error!("Failed to update material {material}: {e}");
            }
            pass.reemit_instances();
        });
    }

    pub fn update_light(&mut self, host: &dyn HostScene, light: HostHandle) {
        self.with_pass(host, |pass| {
            let Some(obj) = pass.host().object(light) else {
                return;
            };
            let Some(record) = pass.st.registry.objects.get_mut(&light) else {
                return;
            };
            report(&obj.name, LightTranslator.update(&mut pass.cx, obj, record));
            pass.link_light_filters(light, obj);
            pass.update_light_visibility(light, obj);
            pass.reemit_instances();
        });
    }

    pub fn update_light_filter(&mut self, host: &dyn HostScene, filter: HostHandle) {
        self.with_pass(host, |pass| {
            let Some(obj) = pass.host().object(filter) else {
                return;
            };
            let Some(record) = pass.st.registry.objects.get_mut(&filter) else {
                return;
            };
            report(&obj.name, LightFilterTranslator.update(&mut pass.cx, obj, record));
            let users = (record.lights.clone(), record.materials.clone());
            pass.place_structural(filter);
            pass.update_filter_users(users);
        });
    }

    /// Shows only soloed lights.
    pub fn update_solo_light(&mut self, host: &dyn HostScene) {
        self.with_pass(host, |pass| {
            for light in pass.host().lights() {
                let Some(record) = pass.st.registry.objects.get(&light.handle) else {
                    continue;
                };
                let solo = light.light.as_ref().is_some_and(|l| l.solo);
                pass.cx.graph.set_hidden(record.node, Visibility::from_hidden(!solo));
            }
        });
    }

    /// Restores every light's own hidden state, keeping lights outside the
    /// local view hidden.
    pub fn update_un_solo_light(&mut self, host: &dyn HostScene) {
        self.with_pass(host, |pass| {
            let local_view = pass.host().settings().local_view;
            for light in pass.host().lights() {
                let Some(record) = pass.st.registry.objects.get(&light.handle) else {
                    continue;
                };
                let hidden = light.hidden || (local_view && !light.in_local_view);
                pass.cx.graph.set_hidden(record.node, Visibility::from_hidden(hidden));
            }
        });
    }

    /// Sets the crop window option (`[xmin, xmax, ymin, ymax]`).
    pub fn update_cropwindow(&mut self, crop: [f32; 4]) {
        self.edit(|graph| {
            let mut options = graph.options().clone();
            options.set(tokens::RI_CROPWINDOW, ParamValue::FloatArray(crop.to_vec()));
            graph.set_options(options);
        });
    }

    /// Re-exports the viewport camera.
    pub fn update_view(&mut self, host: &dyn HostScene) {
        self.with_pass(host, |pass| {
            if let Some(camera) = pass.host().settings().camera {
                pass.camera_updated(camera);
            }
        });
    }

    pub fn update_integrator(&mut self, host: &dyn HostScene) {
        self.with_pass(host, |pass| {
            let integrator = pass.host().settings().integrator.clone();
            pass.cx.graph.set_integrator(integrator);
        });
    }

    /// Re-exports the sample filters with the given channel selected.
    pub fn update_viewport_chan(&mut self, host: &dyn HostScene, channel: &str) {
        self.with_pass(host, |pass| pass.export_sample_filters(Some(channel)));
    }

    /// Resolves a texture node id (`"owner|node"`) to its owner.
    pub fn texture_updated(&self, host: &dyn HostScene, node_id: &str) -> Option<RetagRequest> {
        if !self.interactive {
            return None;
        }
        let (owner, node) = node_id.split_once('|')?;
        let owner = host.texture_owner(owner)?;
        Some(RetagRequest {
            owner,
            node: node.to_owned(),
        })
    }

    /// Invalidates renderer texture caches for the given texture names.
    pub fn flush_texture_cache(&mut self, textures: &[String]) {
        self.edit(|graph| {
            for name in textures {
                graph.invalidate_texture(name);
            }
        });
    }

    fn edit<R>(&mut self, f: impl FnOnce(&mut G) -> R) -> Option<R> {
        if !self.interactive {
            return None;
        }
        let mut scope = ScopedEdit::new(&mut self.graph);
        Some(f(&mut *scope))
    }

    fn with_pass<R>(&mut self, host: &dyn HostScene, f: impl FnOnce(&mut Pass<'_>) -> R) -> Option<R> {
        if !self.interactive {
            return None;
        }
        let mut scope = ScopedEdit::new(&mut self.graph);
        let mut pass = Pass {
            cx: TranslateContext::new(&mut *scope, host, &self.config),
            translators: &self.translators,
            st: &mut self.state,
            scanned_trees: FxHashSet::default(),
        };
        Some(f(&mut pass))
    }
}

fn report(name: &str, result: Result<()>) {
    if let Err(e) = result {
        log::error!("Failed to update '{name}': {e}");
    }
}

/// Light hidden state: its own hide flag, mute, local view and solo.
fn light_hidden(settings: &SceneSettings, obj: &HostObject) -> bool {
    let light = obj.light.as_ref();
    obj.hidden
        || light.is_some_and(|l| l.mute)
        || (settings.local_view && !obj.in_local_view)
        || (settings.solo_light && !light.is_some_and(|l| l.solo))
}

/// Number of host ancestors of an object. Parent cycles stop at a fixed depth.
fn parent_depth(host: &dyn HostScene, handle: HostHandle) -> usize {
    const MAX_DEPTH: usize = 64;
    std::iter::successors(host.object(handle).and_then(|o| o.parent), |p| {
        host.object(*p).and_then(|o| o.parent)
    })
    .take(MAX_DEPTH)
    .count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    /// The host has not finished tagging a new object; retry on the next pass.
    Abort,
}

/// Everything one pass works with, borrowed from the session.
struct Pass<'a> {
    cx: TranslateContext<'a>,
    translators: &'a TranslatorSet,
    st: &'a mut SyncState,
    /// Node trees already scanned in this pass. Trees can instance collections
    /// holding their own objects.
    scanned_trees: FxHashSet<HostHandle>,
}

impl<'a> Pass<'a> {
    fn host(&self) -> &'a dyn HostScene {
        self.cx.host
    }

    // ------------------------------------------------------------------------
    // Full export
    // ------------------------------------------------------------------------

    fn export_scene(&mut self) {
        let host = self.host();
        let settings = host.settings();

        self.export_options();
        self.export_world();

        let light = self.cx.graph.create_node(NodeKind::Light, DEFAULT_LIGHT);
        self.cx
            .graph
            .set_shader(light, ShaderDesc::new("PxrDistantLight", DEFAULT_LIGHT));
        let root = self.cx.graph.root();
        self.cx.graph.add_child(root, light);
        self.st.default_light = Some(light);

        for mat in host.materials() {
            report(&mat.name, self.export_material(mat));
        }

        let objects = host.view_layer_objects();
        self.st.pending.new_objects.extend(objects.iter().copied());
        self.add_objects();
        self.update_particle_systems();
        self.reemit_instances();

        self.st.num_instances = host.instances().len();
        self.st.view_layer = objects.into_iter().collect();
        self.st.frame = settings.frame;
        self.st.local_view = settings.local_view;
        self.st.pending.clear();
    }

    fn export_options(&mut self) {
        let settings = self.host().settings();
        let mut options = self.cx.graph.options().clone();
        options.set(tokens::RI_FRAME, settings.frame);
        options.set(
            tokens::RI_FORMAT_RESOLUTION,
            ParamValue::IntArray(viewport_resolution(settings, &self.cx.config.settings).to_vec()),
        );
        if self.cx.config.settings.motion_blur {
            options.set(tokens::RI_SHUTTER, ParamValue::FloatArray(vec![0.0, 1.0]));
        }
        self.cx.graph.set_options(options);
    }

    fn export_world(&mut self) {
        let settings = self.host().settings();
        self.cx.graph.set_integrator(settings.integrator.clone());
        self.export_sample_filters(None);
        self.cx.graph.set_display_filters(settings.display_filters.clone());
    }

    fn export_sample_filters(&mut self, channel: Option<&str>) {
        let mut filters = self.host().settings().sample_filters.clone();
        if let Some(channel) = channel {
            for filter in &mut filters {
                filter.params.set(tokens::SELECTED_CHANNEL, channel);
            }
        }
        self.cx.graph.set_sample_filters(filters);
    }

    fn export_material(&mut self, mat: &HostMaterial) -> Result<()> {
        let name = material_db_name(&mat.name);
        let record = self.translators.material.export(&mut self.cx, mat, &name)?;
        self.st.registry.materials.insert(mat.handle, record);
        self.link_material_filters(mat);
        Ok(())
    }

    /// Exports one object unless a record already exists for it.
    fn export_object(&mut self, handle: HostHandle) -> Result<()> {
        let host = self.host();
        let Some(obj) = host.object(handle) else {
            return Err(BridgeError::MissingSource(handle.to_string()));
        };
        let Some(category) = obj.category() else {
            return Ok(());
        };
        let translators = self.translators;
        let Some(translator) = translators.get(category) else {
            log::trace!("No translator for {category}, skipping '{}'", obj.name);
            return Ok(());
        };
        let name = db_name(&obj.name, category);
        if self.st.registry.resolve_object(handle, &name).is_some() {
            return Ok(());
        }

        let mut record = translator.export(&mut self.cx, obj, &name)?;
        if let Err(e) = translator.export_object_primvars(&mut self.cx, obj, &record) {
            self.cx.graph.delete_node(record.node);
            return Err(e);
        }
        record.is_hidden = obj.hidden;

        if category == Category::Camera {
            self.st.registry.cameras.insert(handle);
            if host.settings().camera == Some(handle) {
                self.st.registry.main_camera = Some(handle);
            }
        }

        log::debug!("Exported '{name}'");
        self.st.registry.objects.insert(handle, record);
        self.place_structural(handle);
        match category {
            Category::Light => {
                self.link_light_filters(handle, obj);
                self.update_light_visibility(handle, obj);
            }
            Category::LightFilter => self.collect_filter_users(handle),
            Category::Empty => self.place_children(handle),
            _ => {}
        }
        self.st.pending.update_particles.insert(handle);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Collecting
    // ------------------------------------------------------------------------

    fn run(&mut self, notifications: &[Notification]) {
        self.st.pending.clear();
        let previous = self.st.num_instances;
        let current = self.host().instances().len();
        self.st.pending.compare_instance_counts(previous, current);
        self.st.num_instances = current;
        log::trace!(
            "Collecting {} notifications (instances {previous} -> {current})",
            notifications.len()
        );

        for notification in notifications.iter().rev() {
            match notification.payload {
                Payload::Scene => self.scene_updated(),
                Payload::World => self.export_world(),
                Payload::Camera(camera) => self.camera_updated(camera),
                Payload::Material(material) => {
                    if let Err(e) = self.material_updated(material) {
                        log::error!("Failed to update material {material}: {e}");
                    }
                }
                Payload::Mesh(_) => {}
                Payload::ParticleSettings(settings) => self.st.pending.particle_settings = Some(settings),
                Payload::Object(handle) => {
                    if self.object_updated(notification, handle, previous) == Flow::Abort {
                        log::debug!("End update scene (deferred)");
                        return;
                    }
                }
                Payload::Collection(collection) => {
                    if !(self.st.pending.do_add || self.st.pending.do_delete) {
                        self.collection_updated(collection);
                    }
                }
                Payload::NodeTree(handle) | Payload::Other(handle) => self.node_tree_updated(handle),
            }
        }

        log::trace!("Reconciling");
        self.reconcile();
    }

    fn scene_updated(&mut self) {
        let host = self.host();
        let settings = host.settings();

        if settings.local_view != self.st.local_view {
            self.st.local_view = settings.local_view;
            log::debug!("Local view {}", if settings.local_view { "entered" } else { "left" });
            let handles: Vec<HostHandle> = self.st.registry.objects.keys().copied().collect();
            for handle in handles {
                let Some(obj) = host.object(handle) else {
                    continue;
                };
                if obj.skips_instancing() || obj.kind == ObjectKind::Light {
                    continue;
                }
                instances::clear(self.cx.graph, &mut self.st.registry, handle);
                self.st.pending.update_instances.insert(handle);
            }
            self.check_solo_light();
        }

        let current: BTreeSet<HostHandle> = host.view_layer_objects().into_iter().collect();
        if current != self.st.view_layer {
            let changed: Vec<HostHandle> = current.symmetric_difference(&self.st.view_layer).copied().collect();
            for handle in changed {
                self.st.pending.update_instances.insert(handle);
                self.st.pending.update_particles.insert(handle);
                instances::clear(self.cx.graph, &mut self.st.registry, handle);
                let Some(obj) = host.object(handle) else {
                    continue;
                };
                if current.contains(&handle)
                    && let Some(name) = object_db_name(obj)
                    && self.st.registry.resolve_object(handle, &name).is_none()
                {
                    self.st.pending.new_objects.insert(handle);
                }
                self.scan_node_instancing(obj);
            }
            self.st.view_layer = current;
        }

        if settings.frame != self.st.frame {
            log::debug!("Frame changed: {} -> {}", self.st.frame, settings.frame);
            self.st.frame = settings.frame;
            let mut options = self.cx.graph.options().clone();
            options.set(tokens::RI_FRAME, settings.frame);
            self.cx.graph.set_options(options);

            let materials: Vec<HostHandle> = self
                .st
                .registry
                .materials
                .iter()
                .filter(|(_, m)| m.is_frame_sensitive)
                .map(|(h, _)| *h)
                .collect();
            for handle in materials {
                if let Some(mat) = host.material(handle)
                    && let Some(record) = self.st.registry.materials.get_mut(&handle)
                {
                    report(&mat.name, self.translators.material.update(&mut self.cx, mat, record));
                }
            }

            let objects: Vec<HostHandle> = self
                .st
                .registry
                .objects
                .iter()
                .filter(|(_, r)| r.is_frame_sensitive)
                .map(|(h, _)| *h)
                .collect();
            for handle in objects {
                if let Some(obj) = host.object(handle) {
                    report(&obj.name, self.obj_geometry_updated(handle, obj));
                }
            }
        }
    }

    fn camera_updated(&mut self, camera: HostHandle) {
        let host = self.host();
        let settings = host.settings();
        let targets: Vec<HostHandle> = if settings.is_viewport_render {
            if settings.camera != Some(camera) {
                return;
            }
            self.st.registry.main_camera.into_iter().collect()
        } else {
            self.st.registry.cameras.iter().copied().filter(|c| *c == camera).collect()
        };

        for target in targets {
            let Some(obj) = host.object(target) else {
                continue;
            };
            let Some(record) = self.st.registry.objects.get_mut(&target) else {
                continue;
            };
            let result = if settings.is_viewport_render {
                CameraTranslator.update_viewport(&mut self.cx, obj, record)
            } else {
                CameraTranslator.update(&mut self.cx, obj, record)
            };
            report(&obj.name, result);
            self.place_structural(target);
        }
    }

    fn material_updated(&mut self, material: HostHandle) -> Result<()> {
        let host = self.host();
        let Some(mat) = host.material(material) else {
            return Ok(());
        };
        let name = material_db_name(&mat.name);
        let Some(record) = self.st.registry.resolve_material(material, &name) else {
            log::debug!("New material: {}", mat.name);
            return self.export_material(mat);
        };

        let had_meshlight = record.has_meshlight;
        self.translators.material.update(&mut self.cx, mat, record)?;
        let toggled = had_meshlight != record.has_meshlight;
        self.link_material_filters(mat);
        if toggled {
            log::debug!("Mesh light toggled on '{}'", mat.name);
            let users =
                instances::detach_material_users(self.cx.graph, host.objects(), &mut self.st.registry, material);
            self.st.pending.update_instances.extend(users);
        }
        Ok(())
    }

    fn object_updated(&mut self, notification: &Notification, handle: HostHandle, previous_count: usize) -> Flow {
        let host = self.host();
        if let Some(old) = notification.old {
            self.st.registry.rekey_object(old, handle);
        }
        let Some(obj) = host.object(handle) else {
            self.st.pending.do_delete = true;
            return Flow::Continue;
        };
        let Some(name) = object_db_name(obj) else {
            return Flow::Continue;
        };

        let Some(category) = self.st.registry.resolve_object(handle, &name).map(|r| r.category) else {
            if self.st.pending.do_add {
                return self.object_added(obj, previous_count);
            }
            return Flow::Continue;
        };

        if self.update_object_visibility(handle, obj) {
            return Flow::Continue;
        }

        let facts = ObjectFacts {
            category,
            is_main_camera: self.st.registry.main_camera == Some(handle),
            hidden: obj.hidden,
            has_particle_systems: !obj.particle_systems.is_empty(),
            has_stashed_particle_settings: self.st.pending.particle_settings.is_some(),
            num_instances_changed: self.st.pending.num_instances_changed,
        };
        for route in classify_object(notification.flags, &facts) {
            log::trace!("'{}' -> {route:?}", obj.name);
            self.apply_route(route, handle, obj);
        }
        if notification.is_updated_transform() {
            self.check_focus_object(handle);
        }
        Flow::Continue
    }

    fn object_added(&mut self, obj: &HostObject, previous_count: usize) -> Flow {
        if obj.hidden || obj.hide_viewport || !obj.in_view_layer {
            return Flow::Continue;
        }
        let handle = obj.handle;
        match obj.kind {
            ObjectKind::Camera => {
                self.st.pending.new_cameras.insert(handle);
                return Flow::Continue;
            }
            ObjectKind::Empty if obj.is_instancer => {
                report(&obj.name, self.update_empty(handle, obj));
                self.st.pending.new_objects.insert(handle);
                return Flow::Continue;
            }
            ObjectKind::Light if !obj.is_renderer_light() => return self.defer(obj, previous_count),
            ObjectKind::Empty if !obj.renderer_tagged => return self.defer(obj, previous_count),
            _ => {}
        }

        log::debug!("New object added: {}", obj.name);
        self.st.pending.new_objects.insert(handle);
        self.st.pending.update_instances.insert(handle);

        if obj.category() == Some(Category::LightFilter) {
            // Lights exported later in this pass reference the filter by name.
            report(&obj.name, self.export_object(handle));
            self.st.pending.new_objects.remove(&handle);
            self.st.pending.num_instances_changed = false;
        }
        Flow::Continue
    }

    fn defer(&mut self, obj: &HostObject, previous_count: usize) -> Flow {
        log::debug!("Deferring '{}' until the host has tagged its type", obj.name);
        self.st.num_instances = previous_count;
        Flow::Abort
    }

    fn apply_route(&mut self, route: ObjectRoute, handle: HostHandle, obj: &HostObject) {
        match route {
            ObjectRoute::CameraTransform | ObjectRoute::LightFilterTransform => self.place_structural(handle),
            ObjectRoute::EmptyUpdate => report(&obj.name, self.update_empty(handle, obj)),
            ObjectRoute::RebuildInstanced => {
                let instanced = self
                    .st
                    .registry
                    .objects
                    .get_mut(&handle)
                    .map(|r| mem::take(&mut r.objects_instanced))
                    .unwrap_or_default();
                for target in instanced {
                    instances::clear(self.cx.graph, &mut self.st.registry, target);
                    self.st.pending.update_instances.insert(target);
                }
            }
            ObjectRoute::Transform => {
                self.st.pending.update_particles.insert(handle);
                self.st.pending.update_instances.insert(handle);
                self.scan_node_instancing(obj);
                self.st.pending.do_delete = false;
                if obj.kind == ObjectKind::Light {
                    self.update_portals(obj);
                }
            }
            ObjectRoute::ParticleSettings => {
                self.st.pending.do_delete = false;
                if let Some(settings) = self.st.pending.particle_settings {
                    self.update_particle_settings(handle, obj, settings);
                }
            }
            ObjectRoute::Geometry { translate } => {
                self.st.pending.update_particles.insert(handle);
                if translate {
                    report(&obj.name, self.obj_geometry_updated(handle, obj));
                }
            }
            ObjectRoute::Skip => {}
        }
    }

    /// Applies hide state changes. Returns `true` when the visibility changed,
    /// in which case the rest of the notification is not processed.
    fn update_object_visibility(&mut self, handle: HostHandle, obj: &HostObject) -> bool {
        let Some(category) = self.st.registry.objects.get(&handle).map(|r| r.category) else {
            return false;
        };
        if category == Category::Light {
            return self.update_light_visibility(handle, obj);
        }

        let Some(record) = self.st.registry.objects.get_mut(&handle) else {
            return false;
        };
        if record.is_hidden == obj.hidden {
            return false;
        }
        record.is_hidden = obj.hidden;
        self.st.pending.do_delete = false;
        log::debug!("Visibility of '{}' changed (hidden: {})", obj.name, obj.hidden);

        if category == Category::Empty {
            report(&obj.name, self.update_empty(handle, obj));
        } else {
            self.st.pending.update_instances.insert(handle);
            instances::clear(self.cx.graph, &mut self.st.registry, handle);
            if !obj.particle_systems.is_empty() {
                self.st.pending.update_particles.insert(handle);
            }
        }
        true
    }

    fn update_light_visibility(&mut self, handle: HostHandle, obj: &HostObject) -> bool {
        let hidden = light_hidden(self.host().settings(), obj);
        let Some(record) = self.st.registry.objects.get_mut(&handle) else {
            return false;
        };
        let changed = record.is_hidden != hidden;
        record.is_hidden = hidden;
        self.cx.graph.set_hidden(record.node, Visibility::from_hidden(hidden));
        if !hidden && record.instances.is_empty() {
            self.st.pending.update_instances.insert(handle);
        }
        changed
    }

    fn check_solo_light(&mut self) {
        let host = self.host();
        for light in host.lights() {
            self.update_light_visibility(light.handle, light);
        }
    }

    fn update_empty(&mut self, handle: HostHandle, obj: &HostObject) -> Result<()> {
        let host = self.host();
        if obj.is_instancer {
            let Some(collection) = obj.instance_collection.and_then(|c| host.collection(c)) else {
                return Ok(());
            };
            for &member in &collection.all_objects {
                self.st.pending.update_instances.insert(member);
                self.st.pending.update_particles.insert(member);
                if self.st.pending.num_instances_changed {
                    if self.st.registry.objects.contains_key(&member) {
                        instances::clear(self.cx.graph, &mut self.st.registry, member);
                    } else {
                        self.st.pending.new_objects.insert(member);
                    }
                }
            }
            return Ok(());
        }

        let translators = self.translators;
        let Some(translator) = translators.get(Category::Empty) else {
            return Ok(());
        };
        let Some(record) = self.st.registry.objects.get_mut(&handle) else {
            return Ok(());
        };
        translator.update(&mut self.cx, obj, record)?;
        self.place_structural(handle);
        Ok(())
    }

    fn update_portals(&mut self, obj: &HostObject) {
        let host = self.host();
        let Some(light) = obj.light.as_ref() else {
            return;
        };
        for &portal in &light.portals {
            let Some(portal_obj) = host.object(portal) else {
                continue;
            };
            if let Some(record) = self.st.registry.objects.get_mut(&portal) {
                report(&portal_obj.name, LightTranslator.update(&mut self.cx, portal_obj, record));
                self.link_light_filters(portal, portal_obj);
            }
        }
    }

    /// Re-exports the main camera when `handle` is its focus object.
    fn check_focus_object(&mut self, handle: HostHandle) {
        let Some(camera) = self.st.registry.main_camera else {
            return;
        };
        let focus = self.st.registry.objects.get(&camera).and_then(|r| r.focus_object);
        if focus != Some(handle) {
            return;
        }
        let Some(cam_obj) = self.host().object(camera) else {
            return;
        };
        if let Some(record) = self.st.registry.objects.get_mut(&camera) {
            report(&cam_obj.name, CameraTranslator.update(&mut self.cx, cam_obj, record));
            self.place_structural(camera);
        }
    }

    fn obj_geometry_updated(&mut self, handle: HostHandle, obj: &HostObject) -> Result<()> {
        let Some(category) = obj.category() else {
            return Ok(());
        };
        let translators = self.translators;
        let Some(translator) = translators.get(category) else {
            return Ok(());
        };
        let Some(record) = self.st.registry.objects.get_mut(&handle) else {
            return Ok(());
        };
        if record.category != category {
            return Err(BridgeError::UnsupportedTypeChange {
                name: record.db_name.clone(),
                from: record.category,
                to: category,
            });
        }

        translator.update(&mut self.cx, obj, record)?;
        match category {
            Category::LightFilter => {
                let users = (record.lights.clone(), record.materials.clone());
                self.update_filter_users(users);
            }
            Category::Light => {
                self.link_light_filters(handle, obj);
                self.update_light_visibility(handle, obj);
            }
            Category::Camera => {}
            _ => {
                translator.export_object_primvars(&mut self.cx, obj, record)?;
                let visibility = if obj.show_instancer { Visibility::Inherit } else { Visibility::Hidden };
                self.cx.graph.set_hidden(record.node, visibility);
                // Material slots may have changed.
                self.st.pending.update_instances.insert(handle);
            }
        }
        if !category.is_instanced() {
            self.place_structural(handle);
        }
        Ok(())
    }

    /// Re-exports the filter references of the lights and emissive materials
    /// using a filter.
    fn update_filter_users(&mut self, (lights, materials): (BTreeSet<HostHandle>, BTreeSet<HostHandle>)) {
        let host = self.host();
        for light in lights {
            let Some(obj) = host.object(light) else {
                continue;
            };
            if let Some(record) = self.st.registry.objects.get(&light) {
                report(&obj.name, LightTranslator.update_light_filters(&mut self.cx, obj, record));
                self.link_light_filters(light, obj);
            }
        }
        for material in materials {
            let Some(mat) = host.material(material) else {
                continue;
            };
            if let Some(record) = self.st.registry.materials.get_mut(&material) {
                report(&mat.name, self.translators.material.update(&mut self.cx, mat, record));
                self.link_material_filters(mat);
            }
        }
    }

    /// Records `light` as a user of exactly the filters it references now.
    fn link_light_filters(&mut self, light: HostHandle, obj: &HostObject) {
        let filters = live_filters(&self.cx, obj);
        for (handle, record) in &mut self.st.registry.objects {
            if filters.contains(handle) {
                record.lights.insert(light);
            } else {
                record.lights.remove(&light);
            }
        }
    }

    /// Material counterpart of [`Pass::link_light_filters`]. Only emissive
    /// materials reference filters.
    fn link_material_filters(&mut self, mat: &HostMaterial) {
        for (handle, record) in &mut self.st.registry.objects {
            if mat.emissive && mat.light_filters.contains(handle) {
                record.materials.insert(mat.handle);
            } else {
                record.materials.remove(&mat.handle);
            }
        }
    }

    /// Collects the exported lights and materials that already reference a
    /// newly exported filter.
    fn collect_filter_users(&mut self, filter: HostHandle) {
        let host = self.host();
        let lights: BTreeSet<HostHandle> = host
            .objects()
            .iter()
            .filter(|o| o.category() == Some(Category::Light) && self.st.registry.objects.contains_key(&o.handle))
            .filter(|o| live_filters(&self.cx, o).contains(&filter))
            .map(|o| o.handle)
            .collect();
        let materials: BTreeSet<HostHandle> = host
            .materials()
            .iter()
            .filter(|m| m.emissive && m.light_filters.contains(&filter))
            .filter(|m| self.st.registry.materials.contains_key(&m.handle))
            .map(|m| m.handle)
            .collect();
        if let Some(record) = self.st.registry.objects.get_mut(&filter) {
            record.lights = lights;
            record.materials = materials;
        }
    }

    fn place_structural(&mut self, handle: HostHandle) {
        instances::attach_structural(&mut self.cx, &mut self.st.registry, handle);
    }

    /// Re-places the recorded objects parented to `parent`. Non-instanced
    /// nodes move at once; instanced ones are re-emitted.
    fn place_children(&mut self, parent: HostHandle) {
        let host = self.host();
        let children: Vec<(HostHandle, bool)> = self
            .st
            .registry
            .objects
            .iter()
            .filter(|(h, _)| host.object(**h).is_some_and(|o| o.parent == Some(parent)))
            .map(|(h, r)| (*h, r.category.is_instanced()))
            .collect();
        for (child, instanced) in children {
            if instanced {
                self.st.pending.update_instances.insert(child);
            } else {
                self.place_structural(child);
            }
        }
    }

    fn collection_updated(&mut self, collection: HostHandle) {
        let host = self.host();
        let Some(coll) = host.collection(collection) else {
            return;
        };
        log::debug!("Collection updated: {}", coll.name);
        for &member in &coll.all_objects {
            let Some(obj) = host.object(member) else {
                continue;
            };
            if obj.skips_instancing() {
                continue;
            }
            let Some(name) = object_db_name(obj) else {
                continue;
            };
            let Some(category) = self.st.registry.resolve_object(member, &name).map(|r| r.category) else {
                self.st.pending.new_objects.insert(member);
                self.st.pending.update_instances.insert(member);
                continue;
            };
            if category == Category::Light && host.settings().local_view && !obj.in_local_view {
                self.update_light_visibility(member, obj);
                continue;
            }
            self.st.pending.update_instances.insert(member);
            self.st.pending.update_particles.insert(member);
            self.scan_node_instancing(obj);
        }
    }

    fn node_tree_updated(&mut self, handle: HostHandle) {
        let host = self.host();
        if host.node_tree(handle).is_some() {
            self.scan_node_tree(handle);
        } else if let Some(obj) = host.object(handle) {
            self.scan_node_instancing(obj);
        }
    }

    /// Queues the targets of every node tree attached to `obj`.
    fn scan_node_instancing(&mut self, obj: &HostObject) {
        for &tree in &obj.node_modifiers {
            self.scan_node_tree(tree);
        }
    }

    /// Clears what the tree placed last time and queues its current targets.
    fn scan_node_tree(&mut self, tree: HostHandle) {
        let host = self.host();
        if !self.scanned_trees.insert(tree) {
            return;
        }

        let mut previous = BTreeSet::new();
        for obj in host.objects().iter().filter(|o| o.node_modifiers.contains(&tree)) {
            if let Some(record) = self.st.registry.objects.get_mut(&obj.handle) {
                previous.append(&mut record.objects_instanced);
            }
        }
        for target in previous {
            instances::clear(self.cx.graph, &mut self.st.registry, target);
            self.st.pending.update_instances.insert(target);
        }

        let Some(tree) = host.node_tree(tree) else {
            return;
        };
        log::debug!("Geometry node tree updated: {}", tree.name);
        for directive in &tree.directives {
            match *directive {
                InstanceDirective::Object(target) => {
                    instances::clear(self.cx.graph, &mut self.st.registry, target);
                    self.st.pending.update_particles.insert(target);
                    self.st.pending.update_instances.insert(target);
                }
                InstanceDirective::Collection(collection) => self.collection_updated(collection),
            }
        }
    }

    fn update_particle_settings(&mut self, handle: HostHandle, obj: &HostObject, settings: HostHandle) {
        let host = self.host();
        if obj.particle_systems.iter().any(|p| p.settings == settings)
            && let Some(psettings) = host.particle_settings(settings)
        {
            if psettings.is_instancer() {
                if let Some(target) = psettings.instance_object {
                    self.st.pending.update_instances.insert(target);
                }
                if let Some(coll) = psettings.instance_collection.and_then(|c| host.collection(c)) {
                    for &member in &coll.all_objects {
                        if !self.st.registry.objects.contains_key(&member) {
                            self.st.pending.new_objects.insert(member);
                        }
                        self.st.pending.update_instances.insert(member);
                    }
                }
            } else {
                self.st.pending.update_particles.insert(handle);
            }
        }

        let instanced: Vec<HostHandle> = self
            .st
            .registry
            .objects
            .get(&handle)
            .map(|r| r.objects_instanced.iter().copied().collect())
            .unwrap_or_default();
        for target in instanced {
            instances::clear(self.cx.graph, &mut self.st.registry, target);
            self.st.pending.update_instances.insert(target);
        }
    }

    // ------------------------------------------------------------------------
    // Applying / reconciling
    // ------------------------------------------------------------------------

    fn reconcile(&mut self) {
        if !self.st.pending.new_objects.is_empty() || !self.st.pending.new_cameras.is_empty() {
            self.add_objects();
        } else if self.st.pending.do_add {
            // The count grew but nothing new was found: something may have
            // been deleted or hidden at the same time.
            self.delete_objects();
        }
        if self.st.pending.do_delete {
            self.delete_objects();
        }

        self.update_particle_systems();
        if !self.st.pending.new_objects.is_empty() {
            // Particle instancers can reference objects exported only now.
            self.add_objects();
            self.update_particle_systems();
        }
        self.reemit_instances();

        if !self.st.pending.is_drained() {
            log::debug!("Dropping pending work that could not be resolved this pass");
            self.st.pending.clear();
        }
    }

    fn add_objects(&mut self) {
        let host = self.host();
        let new_objects = mem::take(&mut self.st.pending.new_objects);
        let new_cameras = mem::take(&mut self.st.pending.new_cameras);
        log::debug!("Adding {} new objects", new_objects.len() + new_cameras.len());

        let (filters, mut others): (Vec<HostHandle>, Vec<HostHandle>) = new_objects
            .into_iter()
            .partition(|h| host.object(*h).and_then(HostObject::category) == Some(Category::LightFilter));
        // Parents first, so children find their parent's node.
        others.sort_by_key(|h| parent_depth(host, *h));

        for handle in filters.into_iter().chain(others).chain(new_cameras) {
            match self.export_object(handle) {
                Ok(()) => {
                    self.st.pending.update_instances.insert(handle);
                }
                Err(e) => {
                    let name = host.object(handle).map_or_else(|| handle.to_string(), |o| o.name.clone());
                    log::error!("Failed to export '{name}': {e}");
                }
            }
        }
        self.update_default_light();
    }

    fn delete_objects(&mut self) {
        let host = self.host();
        log::debug!("Deleting objects");
        let mut handles: Vec<HostHandle> = self.st.registry.objects.keys().copied().collect();
        handles.sort_unstable();

        for handle in handles {
            let Some(db) = self.st.registry.objects.get(&handle).map(|r| r.db_name.clone()) else {
                continue;
            };
            // Stale handles are matched again by name before being treated as gone.
            let obj = host
                .object(handle)
                .or_else(|| host.objects().iter().find(|o| object_db_name(o).as_deref() == Some(db.as_str())));
            match obj {
                Some(obj) if obj.in_view_layer && !obj.hide_viewport => {
                    self.st.registry.rekey_object(handle, obj.handle);
                    self.update_object_visibility(obj.handle, obj);
                }
                _ => self.remove_object(handle),
            }
        }
        self.update_default_light();
    }

    fn remove_object(&mut self, handle: HostHandle) {
        instances::clear(self.cx.graph, &mut self.st.registry, handle);
        let Some(record) = self.st.registry.objects.remove(&handle) else {
            return;
        };
        if let Some(particles) = self.st.registry.particles.remove(&handle) {
            for particle in particles.into_values() {
                self.cx.graph.delete_node(particle.node);
            }
        }
        if let Some(group) = record.particle_group {
            self.cx.graph.delete_node(group);
        }
        self.cx.graph.delete_node(record.node);

        self.st.registry.cameras.remove(&handle);
        if self.st.registry.main_camera == Some(handle) {
            self.st.registry.main_camera = None;
        }
        for other in self.st.registry.objects.values_mut() {
            other.lights.remove(&handle);
            other.objects_instanced.remove(&handle);
        }
        log::debug!("Deleted '{}'", record.db_name);

        match record.category {
            Category::LightFilter => self.update_filter_users((record.lights, record.materials)),
            Category::Empty => self.place_children(handle),
            _ => {}
        }
    }

    fn update_particle_systems(&mut self) {
        let host = self.host();
        let objects = mem::take(&mut self.st.pending.update_particles);
        for handle in objects {
            let Some(obj) = host.object(handle) else {
                continue;
            };
            if obj.category() != Some(Category::Mesh) || !self.st.registry.objects.contains_key(&handle) {
                continue;
            }
            report(&obj.name, self.export_particles(handle, obj));
        }
    }

    /// Exports the emitter particle systems of `obj` under its particle group
    /// and queues the targets of its particle instancers.
    fn export_particles(&mut self, handle: HostHandle, obj: &HostObject) -> Result<()> {
        let host = self.host();
        let Some((prototype, name, group, instanced)) = self
            .st
            .registry
            .objects
            .get(&handle)
            .map(|r| (r.node, r.db_name.clone(), r.particle_group, r.objects_instanced.clone()))
        else {
            return Ok(());
        };

        for target in instanced {
            instances::clear(self.cx.graph, &mut self.st.registry, target);
            self.st.pending.update_instances.insert(target);
        }
        if let Some(group) = group {
            self.cx.graph.remove_all_children(group);
        }

        let emitters: FxHashSet<HostHandle> = obj
            .particle_systems
            .iter()
            .filter(|p| host.particle_settings(p.settings).is_some_and(|s| !s.is_instancer()))
            .map(|p| p.settings)
            .collect();
        if let Some(records) = self.st.registry.particles.get_mut(&handle) {
            records.retain(|settings, record| {
                let live = emitters.contains(settings);
                if !live {
                    self.cx.graph.delete_node(record.node);
                }
                live
            });
        }
        if obj.particle_systems.is_empty() {
            return Ok(());
        }

        let group = match group {
            Some(group) => group,
            None => {
                let group = self.translators.group.export(&mut self.cx, &format!("{name}|PARTICLES"));
                self.cx.graph.add_child(prototype, group);
                if let Some(record) = self.st.registry.objects.get_mut(&handle) {
                    record.particle_group = Some(group);
                }
                group
            }
        };

        for psys in &obj.particle_systems {
            let Some(settings) = host.particle_settings(psys.settings) else {
                continue;
            };
            if settings.is_instancer() {
                let targets: Vec<HostHandle> = match settings.instance_collection.and_then(|c| host.collection(c)) {
                    Some(coll) => coll.all_objects.clone(),
                    None => settings.instance_object.into_iter().collect(),
                };
                for target in targets {
                    self.st.pending.update_instances.insert(target);
                    if self.st.registry.objects.contains_key(&target) {
                        instances::clear(self.cx.graph, &mut self.st.registry, target);
                    } else {
                        self.st.pending.new_objects.insert(target);
                    }
                }
                continue;
            }

            let material = obj
                .materials
                .get(settings.material_slot)
                .and_then(|m| self.st.registry.materials.get(m))
                .map(|m| m.node);
            let records = self.st.registry.particles.entry(handle).or_default();
            let node = match records.get_mut(&psys.settings) {
                Some(record) => {
                    self.translators.particles.update(&mut self.cx, obj, psys, record)?;
                    record.node
                }
                None => {
                    let psys_name = particles_db_name(&name, &psys.name);
                    let record = self.translators.particles.export(&mut self.cx, obj, psys, &psys_name)?;
                    let node = record.node;
                    records.insert(psys.settings, record);
                    node
                }
            };
            self.cx.graph.set_material(node, material);
            self.cx.graph.add_child(group, node);
        }
        Ok(())
    }

    fn reemit_instances(&mut self) {
        let objects = mem::take(&mut self.st.pending.update_instances);
        if objects.is_empty() {
            return;
        }
        log::debug!("Re-emit instances for {} objects", objects.len());
        instances::reemit(&mut self.cx, self.translators, &mut self.st.registry, &objects);
    }

    fn update_default_light(&mut self) {
        let Some(node) = self.st.default_light else {
            return;
        };
        let hidden = !self.cx.config.settings.render_default_light || self.st.registry.has_lights();
        self.cx.graph.set_hidden(node, Visibility::from_hidden(hidden));
    }
}
