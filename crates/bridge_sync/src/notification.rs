//! Host change notifications.

use bitflags::bitflags;
use bridge_core::HostHandle;

bitflags! {
    /// Which aspects of an entity changed.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ChangeFlags: u8 {
        const TRANSFORM = 1 << 0;
        const GEOMETRY  = 1 << 1;
        const SHADING   = 1 << 2;
    }
}

/// The entity a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Payload {
    Scene,
    World,
    /// Camera data of the given camera object.
    Camera(HostHandle),
    Material(HostHandle),
    Object(HostHandle),
    Mesh(HostHandle),
    ParticleSettings(HostHandle),
    Collection(HostHandle),
    NodeTree(HostHandle),
    Other(HostHandle),
}

/// One entry of the host's change stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Notification {
    pub payload: Payload,
    /// Handle the entity had before the host reissued it, if known.
    pub old: Option<HostHandle>,
    pub flags: ChangeFlags,
}

impl Notification {
    #[must_use]
    pub const fn new(payload: Payload) -> Self {
        Self {
            payload,
            old: None,
            flags: ChangeFlags::empty(),
        }
    }

    #[must_use]
    pub const fn scene() -> Self {
        Self::new(Payload::Scene)
    }

    #[must_use]
    pub const fn world() -> Self {
        Self::new(Payload::World)
    }

    #[must_use]
    pub const fn object(handle: HostHandle) -> Self {
        Self::new(Payload::Object(handle))
    }

    #[must_use]
    pub const fn material(handle: HostHandle) -> Self {
        Self::new(Payload::Material(handle))
    }

    #[must_use]
    pub const fn collection(handle: HostHandle) -> Self {
        Self::new(Payload::Collection(handle))
    }

    #[must_use]
    pub const fn transform(mut self) -> Self {
        self.flags = self.flags.union(ChangeFlags::TRANSFORM);
        self
    }

    #[must_use]
    pub const fn geometry(mut self) -> Self {
        self.flags = self.flags.union(ChangeFlags::GEOMETRY);
        self
    }

    #[must_use]
    pub const fn shading(mut self) -> Self {
        self.flags = self.flags.union(ChangeFlags::SHADING);
        self
    }

    #[must_use]
    pub const fn with_old(mut self, old: HostHandle) -> Self {
        self.old = Some(old);
        self
    }

    #[must_use]
    pub fn is_updated_transform(&self) -> bool {
        self.flags.contains(ChangeFlags::TRANSFORM)
    }

    #[must_use]
    pub fn is_updated_geometry(&self) -> bool {
        self.flags.contains(ChangeFlags::GEOMETRY)
    }
}
