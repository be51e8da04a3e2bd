//! Core types shared by the scenebridge crates.
//!
//! - [`category`]: host handles and renderer categories
//! - [`params`]: renderer parameter values and type conversion
//! - [`config`]: property metadata tables and engine settings
//! - [`motion`]: motion-blur time sample normalization
//! - [`tokens`]: renderer attribute names
//! - [`errors`]: error types

pub mod category;
pub mod config;
pub mod errors;
pub mod motion;
pub mod params;
pub mod tokens;

pub use category::{Category, HostHandle};
pub use config::{
    CompareOp, Condition, ConditionValue, InheritRule, PropertyMeta, PropertyTable, SyncConfig, SyncSettings,
};
pub use errors::{BridgeError, ParamError, Result};
pub use motion::normalize_time_samples;
pub use params::{ParamList, ParamType, ParamValue};
