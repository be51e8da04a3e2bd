//! Routing of object notifications.
//!
//! Classification is a pure function of the notification flags and a few
//! facts about the object, so routing decisions can be tested without a
//! host or a renderer.

use bridge_core::Category;
use smallvec::{SmallVec, smallvec};

use crate::notification::ChangeFlags;

/// Facts about an already exported object, gathered by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectFacts {
    pub category: Category,
    pub is_main_camera: bool,
    /// Hidden in the viewport.
    pub hidden: bool,
    pub has_particle_systems: bool,
    /// A particle-settings notification was seen earlier in this pass.
    pub has_stashed_particle_settings: bool,
    pub num_instances_changed: bool,
}

/// Handling path for one aspect of an object change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectRoute {
    /// Re-export the transform of a render camera.
    CameraTransform,
    LightFilterTransform,
    /// Re-export an empty (transform, coordinate system, instanced collection).
    EmptyUpdate,
    /// The instance count changed: drop what the object instances and re-emit.
    RebuildInstanced,
    /// Transform changed: re-emit instances, particles and node instancing.
    Transform,
    /// Correlate the stashed particle settings with this emitter.
    ParticleSettings,
    /// Geometry changed. `translate` is false when only particles need work.
    Geometry { translate: bool },
    Skip,
}

pub type Routes = SmallVec<[ObjectRoute; 2]>;

#[must_use]
pub fn classify_object(flags: ChangeFlags, facts: &ObjectFacts) -> Routes {
    let mut routes = Routes::new();

    if flags.contains(ChangeFlags::TRANSFORM) {
        match facts.category {
            Category::Camera if facts.is_main_camera => {}
            Category::Camera => routes.push(ObjectRoute::CameraTransform),
            Category::LightFilter => routes.push(ObjectRoute::LightFilterTransform),
            Category::Empty => routes.push(ObjectRoute::EmptyUpdate),
            _ if facts.num_instances_changed => routes.push(ObjectRoute::RebuildInstanced),
            _ => routes.push(ObjectRoute::Transform),
        }
    }

    if flags.contains(ChangeFlags::GEOMETRY) {
        let route = if facts.hidden {
            ObjectRoute::Skip
        } else if facts.has_particle_systems && facts.has_stashed_particle_settings {
            ObjectRoute::ParticleSettings
        } else {
            ObjectRoute::Geometry {
                translate: !facts.num_instances_changed,
            }
        };
        routes.push(route);
    }

    if routes.is_empty() {
        return smallvec![ObjectRoute::Skip];
    }
    routes
}
