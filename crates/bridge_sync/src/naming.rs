//! Stable database names.
//!
//! Names are derived from host content (object name plus category), never
//! from handles, so they survive handle reissue on undo/redo.

use bridge_core::{Category, HostHandle};
use xxhash_rust::xxh3::xxh3_64;

use crate::host::{HostObject, HostScene, ObjectInstance};

/// Replaces characters the renderer does not accept in node names.
#[must_use]
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect()
}

#[must_use]
pub fn db_name(name: &str, category: Category) -> String {
    format!("{}-{}", sanitize(name), category.as_str())
}

/// Database name of a host object, `None` for types without a category.
#[must_use]
pub fn object_db_name(obj: &HostObject) -> Option<String> {
    obj.category().map(|c| db_name(&obj.name, c))
}

#[must_use]
pub fn material_db_name(name: &str) -> String {
    db_name(name, Category::Material)
}

#[must_use]
pub fn particles_db_name(object_db_name: &str, psys_name: &str) -> String {
    format!("{object_db_name}|{}-{}", sanitize(psys_name), Category::ParticleSystem.as_str())
}

/// Instance-group key of a placement.
///
/// Instances are keyed by instancer, placed object, particle settings and
/// persistent id. Direct placements are keyed by the object's parent chain,
/// root first. Two placements with the same context always collide.
#[must_use]
pub fn group_db_name(host: &dyn HostScene, inst: &ObjectInstance) -> String {
    let name_of = |h: HostHandle| host.object(h).map_or_else(|| h.to_string(), |o| sanitize(&o.name));

    if inst.is_instance {
        let instancer = inst.parent.map(name_of).unwrap_or_default();
        let psys = inst
            .particle_settings
            .and_then(|h| host.particle_settings(h))
            .map(|p| sanitize(&p.name))
            .unwrap_or_default();
        return format!(
            "{instancer}|{}|{psys}|{}|{}",
            name_of(inst.object),
            inst.persistent_id[1],
            inst.persistent_id[0]
        );
    }

    let mut chain = vec![name_of(inst.object)];
    let mut cursor = host.object(inst.object).and_then(|o| o.parent);
    while let Some(parent) = cursor {
        // Guards against malformed cyclic parenting.
        if chain.len() > 256 {
            break;
        }
        chain.push(name_of(parent));
        cursor = host.object(parent).and_then(|o| o.parent);
    }
    chain.reverse();
    chain.join("|")
}

/// `identifier:id` of a placement: the host persistent id, or a hash of the
/// object name when the host reports none.
#[must_use]
pub fn object_id(persistent_id: [i32; 2], name: &str) -> i32 {
    if persistent_id[0] != 0 {
        return persistent_id[0];
    }
    (xxh3_64(name.as_bytes()) % 100_000_000) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostSnapshot;
    use glam::Mat4;

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize("Cube.001"), "Cube.001");
        assert_eq!(sanitize("My Light|x"), "My_Light_x");
    }

    #[test]
    fn db_names_carry_category() {
        assert_eq!(db_name("Key Light", Category::Light), "Key_Light-LIGHT");
        assert_eq!(material_db_name("Brick"), "Brick-MATERIAL");
    }

    #[test]
    fn group_key_uses_parent_chain() {
        let mut host = HostSnapshot::new();
        host.add_object(HostObject::empty(HostHandle::new(1), "Rig"));
        host.add_object(HostObject::mesh(HostHandle::new(2), "Arm").with_parent(HostHandle::new(1)));
        let inst = host
            .instances()
            .iter()
            .find(|i| i.object == HostHandle::new(2))
            .cloned()
            .unwrap();
        assert_eq!(group_db_name(&host, &inst), "Rig|Arm");
    }

    #[test]
    fn instance_keys_are_deterministic() {
        let host = HostSnapshot::new();
        let inst = ObjectInstance {
            object: HostHandle::new(7),
            parent: Some(HostHandle::new(8)),
            persistent_id: [3, 0],
            is_instance: true,
            matrix_world: Mat4::IDENTITY,
            particle_settings: None,
        };
        assert_eq!(group_db_name(&host, &inst), group_db_name(&host, &inst.clone()));
        assert_eq!(group_db_name(&host, &inst), "#8|#7||0|3");
    }

    #[test]
    fn object_id_falls_back_to_name_hash() {
        assert_eq!(object_id([42, 0], "Cube"), 42);
        let hashed = object_id([0, 0], "Cube");
        assert!((0..100_000_000).contains(&hashed));
        assert_eq!(hashed, object_id([0, 0], "Cube"));
    }
}
