//! Transient per-pass bookkeeping.

use std::collections::BTreeSet;

use bridge_core::HostHandle;

/// What one synchronization pass still has to do after collecting notifications.
///
/// Cleared at the start of every pass and drained by its end. Ordered sets
/// keep the apply and reconcile phases deterministic.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingChangeSet {
    pub new_objects: BTreeSet<HostHandle>,
    pub new_cameras: BTreeSet<HostHandle>,
    /// Objects whose instances must be re-emitted.
    pub update_instances: BTreeSet<HostHandle>,
    /// Objects whose particle systems must be re-evaluated.
    pub update_particles: BTreeSet<HostHandle>,
    /// Deletion suspected (instance count dropped).
    pub do_delete: bool,
    /// Addition suspected (instance count grew).
    pub do_add: bool,
    pub num_instances_changed: bool,
    /// Particle settings seen in this pass, for correlation with object updates.
    pub particle_settings: Option<HostHandle>,
}

impl PendingChangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether every queue has been consumed.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.new_objects.is_empty()
            && self.new_cameras.is_empty()
            && self.update_instances.is_empty()
            && self.update_particles.is_empty()
    }

    /// Applies the instance-count heuristic against the previous pass.
    pub fn compare_instance_counts(&mut self, previous: usize, current: usize) {
        self.num_instances_changed = previous != current;
        self.do_delete = current < previous;
        self.do_add = current > previous;
    }
}
