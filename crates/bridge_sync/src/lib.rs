//! Incremental host-to-renderer scene synchronization.
//!
//! - [`driver`]: the [`SceneSync`] session and its synchronization passes
//! - [`host`]: read-only host scene model
//! - [`notification`]: change notifications delivered by the host
//! - [`translate`]: per-category translators
//! - [`instances`]: instance group bookkeeping
//! - [`identity`]: record resolution across host handle reissues

pub mod classifier;
pub mod driver;
pub mod host;
pub mod identity;
pub mod instances;
pub mod naming;
pub mod notification;
pub mod pending;
pub mod record;
pub mod texture;
pub mod translate;

pub use driver::{RetagRequest, SceneSync};
pub use host::{HostScene, HostSnapshot, TextureOwner};
pub use notification::{ChangeFlags, Notification, Payload};
pub use pending::PendingChangeSet;
pub use record::{InstanceRecord, MaterialRecord, ParticleRecord, SceneObjectRecord, SceneRegistry};
pub use texture::{NoTextures, TextureMaker};
pub use translate::{ObjectTranslator, TranslateContext, TranslatorSet};
