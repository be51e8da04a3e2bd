//! Per-category translators.
//!
//! A translator builds and updates the renderer representation of one
//! category of host entity. Translators are stateless; everything they
//! produce lives in the returned records and in the scene graph.
//!
//! ```rust,ignore
//! let translators = TranslatorSet::with_defaults();
//! let translator = translators.get(Category::Mesh).ok_or(...)?;
//! let mut record = translator.export(&mut cx, obj, "Cube-MESH")?;
//! translator.update(&mut cx, obj, &mut record)?;
//! ```

pub mod attributes;
pub mod camera;
pub mod empty;
pub mod group;
pub mod light;
pub mod light_filter;
pub mod material;
pub mod mesh;
pub mod particles;
pub mod volume;

use bridge_core::{Category, Result, SyncConfig};
use bridge_scene::{NodeId, SceneGraph};
use rustc_hash::FxHashMap;

use crate::host::{HostObject, HostScene};
use crate::record::SceneObjectRecord;

pub use camera::CameraTranslator;
pub use empty::EmptyTranslator;
pub use group::GroupTranslator;
pub use light::LightTranslator;
pub use light_filter::LightFilterTranslator;
pub use material::MaterialTranslator;
pub use mesh::MeshTranslator;
pub use particles::ParticlesTranslator;
pub use volume::VolumeTranslator;

/// Everything a translator may read or write during one call.
pub struct TranslateContext<'a> {
    pub graph: &'a mut dyn SceneGraph,
    pub host: &'a dyn HostScene,
    pub config: &'a SyncConfig,
}

impl<'a> TranslateContext<'a> {
    pub fn new(graph: &'a mut dyn SceneGraph, host: &'a dyn HostScene, config: &'a SyncConfig) -> Self {
        Self { graph, host, config }
    }
}

/// Translator contract for host objects.
pub trait ObjectTranslator {
    fn category(&self) -> Category;

    /// Creates the renderer node(s) and returns a fully populated record.
    fn export(&self, cx: &mut TranslateContext<'_>, obj: &HostObject, db_name: &str) -> Result<SceneObjectRecord>;

    /// Brings an existing record in line with the host object.
    fn update(&self, cx: &mut TranslateContext<'_>, obj: &HostObject, record: &mut SceneObjectRecord) -> Result<()>;

    /// Exports one deformation motion sample. Samples arrive in increasing
    /// time order; `record.motion_times` already holds the normalized times.
    fn export_deform_sample(
        &self,
        _cx: &mut TranslateContext<'_>,
        _record: &mut SceneObjectRecord,
        _obj: &HostObject,
        _time_sample: usize,
    ) -> Result<()> {
        Ok(())
    }

    fn export_object_primvars(
        &self,
        cx: &mut TranslateContext<'_>,
        obj: &HostObject,
        record: &SceneObjectRecord,
    ) -> Result<()> {
        attributes::export_object_primvars(cx, obj, record.node)
    }

    /// Exports object attributes onto `node` (an instance group, or the
    /// object's own node for non-instanced categories).
    fn export_object_attributes(&self, cx: &mut TranslateContext<'_>, obj: &HostObject, node: NodeId) -> Result<()> {
        attributes::export_object_attributes(cx, obj, node)
    }
}

/// Translators keyed by category, built once per session.
pub struct TranslatorSet {
    objects: FxHashMap<Category, Box<dyn ObjectTranslator>>,
    pub material: MaterialTranslator,
    pub particles: ParticlesTranslator,
    pub group: GroupTranslator,
}

impl TranslatorSet {
    /// An empty set. Object categories without a translator are skipped.
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: FxHashMap::default(),
            material: MaterialTranslator,
            particles: ParticlesTranslator,
            group: GroupTranslator,
        }
    }

    /// Translators for every built-in category.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut set = Self::new();
        set.register(Box::new(MeshTranslator));
        set.register(Box::new(LightTranslator));
        set.register(Box::new(LightFilterTranslator));
        set.register(Box::new(CameraTranslator));
        set.register(Box::new(EmptyTranslator));
        set.register(Box::new(VolumeTranslator));
        set
    }

    /// Registers (or replaces) the translator of its category.
    pub fn register(&mut self, translator: Box<dyn ObjectTranslator>) {
        self.objects.insert(translator.category(), translator);
    }

    #[must_use]
    pub fn get(&self, category: Category) -> Option<&dyn ObjectTranslator> {
        self.objects.get(&category).map(|t| t.as_ref())
    }
}

impl Default for TranslatorSet {
    fn default() -> Self {
        Self::with_defaults()
    }
}
