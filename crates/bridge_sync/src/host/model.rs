//! Host-side data as seen by the sync engine.
//!
//! These types are a plain-data mirror of what the host application exposes
//! at its current evaluation state. They are read only; the engine never
//! writes back to the host.

use bridge_core::{Category, HostHandle, ParamList};
use bridge_scene::ShaderDesc;
use glam::Mat4;

/// Host object type, before any renderer tagging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Mesh,
    Curve,
    Light,
    Camera,
    Empty,
    Volume,
    Armature,
}

/// Role of a renderer light object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LightRole {
    #[default]
    Light,
    Filter,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightSettings {
    pub role: LightRole,
    /// Whether the host light has been tagged as a renderer light yet.
    pub renderer_light: bool,
    /// Light (or light filter) shader plugin, e.g. `PxrRectLight`.
    pub shader: String,
    pub params: ParamList,
    pub mute: bool,
    pub solo: bool,
    /// Light filter objects attached to this light.
    pub filters: Vec<HostHandle>,
    /// Portal lights driven by this (dome) light.
    pub portals: Vec<HostHandle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    pub fov: f32,
    pub clip: (f32, f32),
    pub projection: String,
    /// Depth-of-field focus object.
    pub focus_object: Option<HostHandle>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov: 39.6,
            clip: (0.1, 1000.0),
            projection: "PxrPerspective".to_owned(),
            focus_object: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub points: Vec<[f32; 3]>,
    pub face_counts: Vec<i32>,
    pub face_indices: Vec<i32>,
}

/// One particle system slot on an object.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSystem {
    pub name: String,
    pub settings: HostHandle,
    pub points: Vec<[f32; 3]>,
}

/// A deformation motion sample: time offset and deformed points.
#[derive(Debug, Clone, PartialEq)]
pub struct DeformSample {
    pub time: f32,
    pub points: Vec<[f32; 3]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostObject {
    pub handle: HostHandle,
    pub name: String,
    pub kind: ObjectKind,
    pub parent: Option<HostHandle>,
    pub matrix_world: Mat4,
    pub matrix_local: Mat4,
    /// Viewport hide (`hide_get`). The object stays in the scene.
    pub hidden: bool,
    /// Disabled in viewports. Treated as deleted.
    pub hide_viewport: bool,
    /// Member of the active view layer.
    pub in_view_layer: bool,
    pub in_local_view: bool,
    pub show_instancer: bool,
    /// The host has finished tagging the object's renderer type. Freshly
    /// added objects may be reported before that happens.
    pub renderer_tagged: bool,
    pub is_instancer: bool,
    pub instance_collection: Option<HostHandle>,
    pub export_as_coordsys: bool,
    pub frame_sensitive: bool,
    pub materials: Vec<HostHandle>,
    pub particle_systems: Vec<ParticleSystem>,
    /// Geometry node trees attached as modifiers.
    pub node_modifiers: Vec<HostHandle>,
    /// Renderer properties, keyed by host property name.
    pub properties: ParamList,
    /// User attributes, exported as `user:<name>`.
    pub user_attributes: ParamList,
    pub color: Option<[f32; 3]>,
    pub lighting_excludesubset: Vec<HostHandle>,
    pub lightfilter_subset: Vec<HostHandle>,
    pub light: Option<LightSettings>,
    pub camera: Option<CameraSettings>,
    pub mesh: Option<MeshData>,
    pub deform_samples: Vec<DeformSample>,
}

impl HostObject {
    pub fn new(handle: HostHandle, name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            handle,
            name: name.into(),
            kind,
            parent: None,
            matrix_world: Mat4::IDENTITY,
            matrix_local: Mat4::IDENTITY,
            hidden: false,
            hide_viewport: false,
            in_view_layer: true,
            in_local_view: false,
            show_instancer: true,
            renderer_tagged: true,
            is_instancer: false,
            instance_collection: None,
            export_as_coordsys: false,
            frame_sensitive: false,
            materials: Vec::new(),
            particle_systems: Vec::new(),
            node_modifiers: Vec::new(),
            properties: ParamList::new(),
            user_attributes: ParamList::new(),
            color: None,
            lighting_excludesubset: Vec::new(),
            lightfilter_subset: Vec::new(),
            light: None,
            camera: None,
            mesh: None,
            deform_samples: Vec::new(),
        }
    }

    /// A triangle mesh object.
    pub fn mesh(handle: HostHandle, name: impl Into<String>) -> Self {
        let mut obj = Self::new(handle, name, ObjectKind::Mesh);
        obj.mesh = Some(MeshData {
            points: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            face_counts: vec![3],
            face_indices: vec![0, 1, 2],
        });
        obj
    }

    /// A renderer light with the given shader.
    pub fn light(handle: HostHandle, name: impl Into<String>, shader: &str) -> Self {
        let mut obj = Self::new(handle, name, ObjectKind::Light);
        obj.light = Some(LightSettings {
            renderer_light: true,
            shader: shader.to_owned(),
            ..LightSettings::default()
        });
        obj
    }

    pub fn light_filter(handle: HostHandle, name: impl Into<String>, shader: &str) -> Self {
        let mut obj = Self::new(handle, name, ObjectKind::Light);
        obj.light = Some(LightSettings {
            role: LightRole::Filter,
            renderer_light: true,
            shader: shader.to_owned(),
            ..LightSettings::default()
        });
        obj
    }

    pub fn camera(handle: HostHandle, name: impl Into<String>) -> Self {
        let mut obj = Self::new(handle, name, ObjectKind::Camera);
        obj.camera = Some(CameraSettings::default());
        obj
    }

    pub fn empty(handle: HostHandle, name: impl Into<String>) -> Self {
        Self::new(handle, name, ObjectKind::Empty)
    }

    #[must_use]
    pub fn with_parent(mut self, parent: HostHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn with_matrix(mut self, world: Mat4) -> Self {
        self.matrix_world = world;
        self.matrix_local = world;
        self
    }

    #[must_use]
    pub fn with_material(mut self, material: HostHandle) -> Self {
        self.materials.push(material);
        self
    }

    /// Renderer category, or `None` for host types the renderer does not draw.
    #[must_use]
    pub fn category(&self) -> Option<Category> {
        match self.kind {
            ObjectKind::Mesh | ObjectKind::Curve => Some(Category::Mesh),
            ObjectKind::Light => match self.light.as_ref().map(|l| l.role) {
                Some(LightRole::Filter) => Some(Category::LightFilter),
                _ => Some(Category::Light),
            },
            ObjectKind::Camera => Some(Category::Camera),
            ObjectKind::Empty => Some(Category::Empty),
            ObjectKind::Volume => Some(Category::Volume),
            ObjectKind::Armature => None,
        }
    }

    /// Host types that never own placements of their own.
    #[must_use]
    pub fn skips_instancing(&self) -> bool {
        matches!(self.kind, ObjectKind::Armature | ObjectKind::Curve | ObjectKind::Camera)
    }

    #[must_use]
    pub fn is_renderer_light(&self) -> bool {
        self.light.as_ref().is_some_and(|l| l.renderer_light)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostMaterial {
    pub handle: HostHandle,
    pub name: String,
    /// Bxdf plugin name.
    pub bxdf: String,
    pub params: ParamList,
    /// Contains emissive geometry (a mesh light).
    pub emissive: bool,
    pub frame_sensitive: bool,
    /// Light filters applied to the mesh light.
    pub light_filters: Vec<HostHandle>,
}

impl HostMaterial {
    pub fn new(handle: HostHandle, name: impl Into<String>) -> Self {
        Self {
            handle,
            name: name.into(),
            bxdf: "PxrSurface".to_owned(),
            params: ParamList::new(),
            emissive: false,
            frame_sensitive: false,
            light_filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostCollection {
    pub handle: HostHandle,
    pub name: String,
    /// Every object in the collection, nested collections included.
    pub all_objects: Vec<HostHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParticleRender {
    #[default]
    Points,
    Object,
    Collection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSettings {
    pub handle: HostHandle,
    pub name: String,
    pub render_as: ParticleRender,
    pub instance_object: Option<HostHandle>,
    pub instance_collection: Option<HostHandle>,
    /// Material slot on the emitter used for the particles.
    pub material_slot: usize,
    pub width: f32,
}

impl ParticleSettings {
    pub fn new(handle: HostHandle, name: impl Into<String>) -> Self {
        Self {
            handle,
            name: name.into(),
            render_as: ParticleRender::Points,
            instance_object: None,
            instance_collection: None,
            material_slot: 0,
            width: 0.05,
        }
    }

    #[must_use]
    pub fn is_instancer(&self) -> bool {
        matches!(self.render_as, ParticleRender::Object | ParticleRender::Collection)
    }
}

/// Instancing directive found in a geometry node tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceDirective {
    Object(HostHandle),
    Collection(HostHandle),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeTree {
    pub handle: HostHandle,
    pub name: String,
    pub directives: Vec<InstanceDirective>,
}

/// One placement reported by the host's instance enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInstance {
    /// The placed object (the instanced object for instances).
    pub object: HostHandle,
    /// The instancer, for instances.
    pub parent: Option<HostHandle>,
    pub persistent_id: [i32; 2],
    pub is_instance: bool,
    pub matrix_world: Mat4,
    /// Particle settings, for particle-instanced placements.
    pub particle_settings: Option<HostHandle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectGroup {
    pub name: String,
    pub members: Vec<HostHandle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightLink {
    pub light: HostHandle,
    pub members: Vec<HostHandle>,
}

/// Scene-wide state.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSettings {
    pub frame: i32,
    /// Scene camera object.
    pub camera: Option<HostHandle>,
    pub is_viewport_render: bool,
    pub local_view: bool,
    pub solo_light: bool,
    pub invert_light_linking: bool,
    pub object_groups: Vec<ObjectGroup>,
    pub light_links: Vec<LightLink>,
    /// Scene-level values of inheritable object properties.
    pub properties: ParamList,
    pub integrator: ShaderDesc,
    pub sample_filters: Vec<ShaderDesc>,
    pub display_filters: Vec<ShaderDesc>,
    pub resolution: (u32, u32),
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            frame: 1,
            camera: None,
            is_viewport_render: true,
            local_view: false,
            solo_light: false,
            invert_light_linking: false,
            object_groups: Vec::new(),
            light_links: Vec::new(),
            properties: ParamList::new(),
            integrator: ShaderDesc::new("PxrPathTracer", "integrator"),
            sample_filters: Vec::new(),
            display_filters: Vec::new(),
            resolution: (960, 540),
        }
    }
}
