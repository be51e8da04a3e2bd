//! Renderer scene graph for scenebridge.
//!
//! - [`SceneGraph`]: the transactional interface the sync engine drives
//! - [`ScopedEdit`]: RAII edit scope guard
//! - [`MemorySceneGraph`]: retained in-memory backend

pub mod edit;
pub mod graph;
pub mod memory;

pub use edit::ScopedEdit;
pub use graph::{NodeId, NodeKind, SceneGraph, ShaderDesc, Visibility};
pub use memory::{EditStats, MemoryNode, MemorySceneGraph};
