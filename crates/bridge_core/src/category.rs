//! Host handles and object categories.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque reference to a host entity (object, material, collection, ...).
///
/// Handles are only valid until the host invalidates them (undo/redo reissues
/// every handle). They are therefore never used as durable identity; see the
/// stable database names computed in `bridge_sync::naming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostHandle(pub u64);

impl HostHandle {
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Renderer-side category of a host entity. Translators are registered per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Mesh,
    Light,
    LightFilter,
    Camera,
    ParticleSystem,
    Material,
    Empty,
    Volume,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Mesh,
        Category::Light,
        Category::LightFilter,
        Category::Camera,
        Category::ParticleSystem,
        Category::Material,
        Category::Empty,
        Category::Volume,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Mesh => "MESH",
            Category::Light => "LIGHT",
            Category::LightFilter => "LIGHTFILTER",
            Category::Camera => "CAMERA",
            Category::ParticleSystem => "PARTICLES",
            Category::Material => "MATERIAL",
            Category::Empty => "EMPTY",
            Category::Volume => "VOLUME",
        }
    }

    /// Whether objects of this category are placed in the scene through instance groups.
    ///
    /// Cameras, light filters and empties own a single node that carries the
    /// transform itself; materials and particle systems are never placed directly.
    #[must_use]
    pub const fn is_instanced(self) -> bool {
        matches!(self, Category::Mesh | Category::Light | Category::Volume)
    }

    /// Categories that count as scene lights for default-light bookkeeping.
    #[must_use]
    pub const fn is_light(self) -> bool {
        matches!(self, Category::Light)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
