//! Identity resolution across host handle reissue.
//!
//! The host invalidates every handle on undo/redo. A record whose handle no
//! longer matches is found again by its stable database name and re-keyed to
//! the new handle, keeping its node, instances and flags.

use bridge_core::HostHandle;

use crate::record::{MaterialRecord, SceneObjectRecord, SceneRegistry};

impl SceneRegistry {
    /// Resolves an object record by handle, falling back to a database name
    /// scan. A name match is re-keyed to `handle`. `None` means the object is
    /// genuinely new.
    pub fn resolve_object(&mut self, handle: HostHandle, db_name: &str) -> Option<&mut SceneObjectRecord> {
        if !self.objects.contains_key(&handle) {
            let stale = self
                .objects
                .iter()
                .find(|(_, r)| r.db_name == db_name)
                .map(|(k, _)| *k)?;
            self.rekey_object(stale, handle);
        }
        self.objects.get_mut(&handle)
    }

    /// Material counterpart of [`SceneRegistry::resolve_object`].
    pub fn resolve_material(&mut self, handle: HostHandle, db_name: &str) -> Option<&mut MaterialRecord> {
        if !self.materials.contains_key(&handle) {
            let stale = self
                .materials
                .iter()
                .find(|(_, r)| r.db_name == db_name)
                .map(|(k, _)| *k)?;
            if let Some(mut record) = self.materials.remove(&stale) {
                log::debug!("Re-keyed material '{}': {stale} -> {handle}", record.db_name);
                record.handle = handle;
                self.materials.insert(handle, record);
                for filter in self.objects.values_mut() {
                    if filter.materials.remove(&stale) {
                        filter.materials.insert(handle);
                    }
                }
            }
        }
        self.materials.get_mut(&handle)
    }

    /// Moves an object record (and every reference to its handle) to a new handle.
    pub fn rekey_object(&mut self, old: HostHandle, new: HostHandle) {
        if old == new {
            return;
        }
        if let Some(existing) = self.objects.get(&new) {
            // The old record stays under its handle; deletion reconciles it.
            log::warn!(
                "Not re-keying {old} to {new}: '{}' already owns that handle",
                existing.db_name
            );
            return;
        }
        let Some(mut record) = self.objects.remove(&old) else {
            return;
        };
        log::debug!("Re-keyed object '{}': {old} -> {new}", record.db_name);
        record.handle = new;
        self.objects.insert(new, record);

        if self.cameras.remove(&old) {
            self.cameras.insert(new);
        }
        if self.main_camera == Some(old) {
            self.main_camera = Some(new);
        }
        if let Some(psys) = self.particles.remove(&old) {
            self.particles.insert(new, psys);
        }
        for other in self.objects.values_mut() {
            if other.objects_instanced.remove(&old) {
                other.objects_instanced.insert(new);
            }
            if other.lights.remove(&old) {
                other.lights.insert(new);
            }
            if other.focus_object == Some(old) {
                other.focus_object = Some(new);
            }
            for inst in other.instances.values_mut() {
                if inst.instancer == Some(old) {
                    inst.instancer = Some(new);
                }
            }
        }
    }
}
