//! Sync configuration and property metadata tables.
//!
//! The property tables describe how host-side object properties map onto
//! renderer attributes and primvars. They are produced by an external
//! configuration layer, loaded once at startup, and only walked at runtime.
//!
//! ```json
//! {
//!   "settings": { "motion_blur": true },
//!   "object_properties": [
//!     { "name": "dice_rate", "type": "float", "primvar": "dice:micropolygonlength", "inherit": -1.0 },
//!     { "name": "trace_sets", "type": "string", "attribute": "trace:sets", "array_size": 2 },
//!     { "name": "shade_rate", "type": "float", "attribute": "shade:rate",
//!       "inherit": { "prop": "shade_mode", "op": "eq", "value": "inherit" } }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::params::{ParamList, ParamType, ParamValue};

// ---------------------------------------------------------------------------
// Inheritance rules
// ---------------------------------------------------------------------------

/// Comparison operator of a conditional inheritance rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
}

/// Literal a condition compares against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// `prop <op> value`, evaluated against the object's own properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub prop: String,
    pub op: CompareOp,
    pub value: ConditionValue,
}

impl Condition {
    /// Evaluates the condition. A missing property never satisfies it.
    #[must_use]
    pub fn evaluate(&self, props: &ParamList) -> bool {
        let Some(actual) = props.get(&self.prop) else {
            return false;
        };

        let ordering = match (&self.value, actual) {
            (ConditionValue::Text(expected), ParamValue::String(s)) => s.as_str().partial_cmp(expected.as_str()),
            (ConditionValue::Bool(expected), other) => other
                .as_f64()
                .and_then(|v| v.partial_cmp(&f64::from(u8::from(*expected)))),
            (ConditionValue::Number(expected), other) => other.as_f64().and_then(|v| v.partial_cmp(expected)),
            _ => None,
        };

        let Some(ordering) = ordering else {
            return matches!(self.op, CompareOp::Ne);
        };
        match self.op {
            CompareOp::Eq => ordering.is_eq(),
            CompareOp::Ne => ordering.is_ne(),
            CompareOp::Lt => ordering.is_lt(),
            CompareOp::Gt => ordering.is_gt(),
        }
    }
}

/// How an inheritable property decides that it should defer to its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InheritRule {
    /// The property inherits when its numeric value equals this sentinel.
    Value(f64),
    /// The property inherits when the condition holds.
    When(Condition),
}

impl InheritRule {
    /// Whether `value` (the property's current value) means "inherit".
    #[must_use]
    pub fn inherits(&self, value: &ParamValue, props: &ParamList) -> bool {
        match self {
            InheritRule::Value(sentinel) => value.as_f64().is_some_and(|v| (v - sentinel).abs() < f64::EPSILON),
            InheritRule::When(cond) => cond.evaluate(props),
        }
    }
}

// ---------------------------------------------------------------------------
// Property metadata
// ---------------------------------------------------------------------------

/// One row of the property-to-renderer-parameter table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMeta {
    /// Host property name.
    pub name: String,
    /// Renderer type the value is converted to.
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Primvar name, when the property is exported as a primvar.
    #[serde(default)]
    pub primvar: Option<String>,
    /// Attribute name, when the property is exported as an attribute.
    #[serde(default)]
    pub attribute: Option<String>,
    /// Fixed array length for array-valued parameters.
    #[serde(default)]
    pub array_size: Option<usize>,
    /// Inheritance rule for inheritable properties.
    #[serde(default)]
    pub inherit: Option<InheritRule>,
}

/// Ordered property table. Export walks it front to back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyTable {
    entries: Vec<PropertyMeta>,
}

impl PropertyTable {
    #[must_use]
    pub fn new(entries: Vec<PropertyMeta>) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyMeta> {
        self.entries.iter()
    }

    /// Rows routed to primvars.
    pub fn primvars(&self) -> impl Iterator<Item = (&PropertyMeta, &str)> {
        self.entries
            .iter()
            .filter_map(|m| m.primvar.as_deref().map(|name| (m, name)))
    }

    /// Rows routed to attributes.
    pub fn attributes(&self) -> impl Iterator<Item = (&PropertyMeta, &str)> {
        self.entries
            .iter()
            .filter_map(|m| m.attribute.as_deref().map(|name| (m, name)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Engine-level switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Export deformation motion samples for objects that provide them.
    pub motion_blur: bool,
    /// Show a default light when the scene has no lights of its own.
    pub render_default_light: bool,
    /// Viewport resolution multiplier for interactive camera updates.
    pub viewport_res_mult: f32,
    /// Request a non-blocking texture build after every scene update.
    pub texture_make_on_update: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            motion_blur: false,
            render_default_light: true,
            viewport_res_mult: 1.0,
            texture_make_on_update: true,
        }
    }
}

/// Everything loaded from configuration at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub settings: SyncSettings,
    pub object_properties: PropertyTable,
}

impl SyncConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        log::debug!(
            "Loaded sync config from {} ({} object properties)",
            path.as_ref().display(),
            config.object_properties.len()
        );
        Ok(config)
    }
}
