#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! scenebridge keeps a retained renderer scene graph in step with a live,
//! editable host scene.
//!
//! ```rust,ignore
//! use scenebridge::prelude::*;
//!
//! let mut sync = SceneSync::new(MemorySceneGraph::new(), SyncConfig::default());
//! sync.start_interactive(&host);
//! // ... host edits ...
//! sync.update_scene(&host, &notifications);
//! ```

pub use bridge_core as core;
pub use bridge_scene as scene;
pub use bridge_sync as sync;

pub use bridge_core::{BridgeError, Category, HostHandle, ParamList, ParamValue, Result, SyncConfig, SyncSettings};
pub use bridge_scene::{MemorySceneGraph, NodeId, NodeKind, SceneGraph, ScopedEdit, ShaderDesc, Visibility};
pub use bridge_sync::{
    ChangeFlags, HostScene, HostSnapshot, Notification, Payload, RetagRequest, SceneSync, TextureMaker, TranslatorSet,
};

/// Everything needed to drive a session.
pub mod prelude {
    pub use bridge_core::{Category, HostHandle, SyncConfig};
    pub use bridge_scene::{MemorySceneGraph, SceneGraph, Visibility};
    pub use bridge_sync::host::{HostCollection, HostMaterial, HostObject, ParticleSettings};
    pub use bridge_sync::{HostScene, HostSnapshot, Notification, SceneSync};
}
