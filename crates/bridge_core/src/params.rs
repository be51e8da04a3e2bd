//! Renderer parameter values and type-directed conversion.
//!
//! Host properties arrive loosely typed (a boolean toggle may back an integer
//! renderer attribute, an array may be stored as a string literal). The
//! property tables name the renderer type each property must become, and
//! [`ParamType::convert`] performs that conversion.

use std::collections::BTreeMap;

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::errors::ParamError;

/// A single renderer parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    String(String),
    Color([f32; 3]),
    Point([f32; 3]),
    Vector([f32; 3]),
    Normal([f32; 3]),
    Matrix(Mat4),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    StringArray(Vec<String>),
    PointArray(Vec<[f32; 3]>),
}

impl ParamValue {
    /// Short name of the value's variant, used in error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::String(_) => "string",
            ParamValue::Color(_) => "color",
            ParamValue::Point(_) => "point",
            ParamValue::Vector(_) => "vector",
            ParamValue::Normal(_) => "normal",
            ParamValue::Matrix(_) => "matrix",
            ParamValue::IntArray(_) => "int[]",
            ParamValue::FloatArray(_) => "float[]",
            ParamValue::StringArray(_) => "string[]",
            ParamValue::PointArray(_) => "point[]",
        }
    }

    /// Numeric view of scalar values (booleans count as 0/1).
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Bool(b) => Some(f64::from(u8::from(*b))),
            ParamValue::Int(i) => Some(f64::from(*i)),
            ParamValue::Float(f) => Some(f64::from(*f)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Host-side truthiness: zero, `false`, empty strings and empty arrays are falsy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            ParamValue::Bool(b) => *b,
            ParamValue::Int(i) => *i != 0,
            ParamValue::Float(f) => *f != 0.0,
            ParamValue::String(s) => !s.is_empty(),
            ParamValue::IntArray(v) => !v.is_empty(),
            ParamValue::FloatArray(v) => !v.is_empty(),
            ParamValue::StringArray(v) => !v.is_empty(),
            ParamValue::PointArray(v) => !v.is_empty(),
            ParamValue::Color(_)
            | ParamValue::Point(_)
            | ParamValue::Vector(_)
            | ParamValue::Normal(_)
            | ParamValue::Matrix(_) => true,
        }
    }

    fn as_triple(&self) -> Option<[f32; 3]> {
        match self {
            ParamValue::Color(v)
            | ParamValue::Point(v)
            | ParamValue::Vector(v)
            | ParamValue::Normal(v) => Some(*v),
            ParamValue::FloatArray(v) if v.len() == 3 => Some([v[0], v[1], v[2]]),
            _ => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::String(v)
    }
}

/// Renderer parameter type named by the property metadata tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Int,
    Float,
    String,
    Color,
    Point,
    Vector,
    Normal,
    Matrix,
}

impl ParamType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::String => "string",
            ParamType::Color => "color",
            ParamType::Point => "point",
            ParamType::Vector => "vector",
            ParamType::Normal => "normal",
            ParamType::Matrix => "matrix",
        }
    }

    /// Converts a host value to this renderer type.
    ///
    /// With `array_len` set the result is an array of exactly that length. A
    /// string value starting with `[` is parsed as a JSON array literal first.
    pub fn convert(self, value: &ParamValue, array_len: Option<usize>) -> Result<ParamValue, ParamError> {
        match array_len {
            Some(len) => self.convert_array(value, len),
            None => self.convert_scalar(value),
        }
    }

    fn mismatch(self, value: &ParamValue) -> ParamError {
        ParamError::TypeMismatch {
            expected: self.as_str(),
            found: value.kind_name(),
        }
    }

    fn convert_scalar(self, value: &ParamValue) -> Result<ParamValue, ParamError> {
        match self {
            ParamType::Int => match value {
                ParamValue::Bool(b) => Ok(ParamValue::Int(i32::from(*b))),
                ParamValue::Int(i) => Ok(ParamValue::Int(*i)),
                ParamValue::Float(f) => Ok(ParamValue::Int(*f as i32)),
                _ => Err(self.mismatch(value)),
            },
            ParamType::Float => value
                .as_f64()
                .map(|f| ParamValue::Float(f as f32))
                .ok_or_else(|| self.mismatch(value)),
            ParamType::String => match value {
                ParamValue::String(s) => Ok(ParamValue::String(s.clone())),
                _ => Err(self.mismatch(value)),
            },
            ParamType::Color => value.as_triple().map(ParamValue::Color).ok_or_else(|| self.mismatch(value)),
            ParamType::Point => value.as_triple().map(ParamValue::Point).ok_or_else(|| self.mismatch(value)),
            ParamType::Vector => value.as_triple().map(ParamValue::Vector).ok_or_else(|| self.mismatch(value)),
            ParamType::Normal => value.as_triple().map(ParamValue::Normal).ok_or_else(|| self.mismatch(value)),
            ParamType::Matrix => match value {
                ParamValue::Matrix(m) => Ok(ParamValue::Matrix(*m)),
                ParamValue::FloatArray(v) if v.len() == 16 => {
                    let mut cols = [0.0_f32; 16];
                    cols.copy_from_slice(v);
                    Ok(ParamValue::Matrix(Mat4::from_cols_array(&cols)))
                }
                _ => Err(self.mismatch(value)),
            },
        }
    }

    fn convert_array(self, value: &ParamValue, len: usize) -> Result<ParamValue, ParamError> {
        if let ParamValue::String(literal) = value
            && literal.trim_start().starts_with('[')
        {
            let parsed = parse_array_literal(literal)?;
            return self.convert_array(&parsed, len);
        }

        let converted = match (self, value) {
            (ParamType::Int, ParamValue::IntArray(v)) => ParamValue::IntArray(v.clone()),
            (ParamType::Int, ParamValue::FloatArray(v)) => {
                ParamValue::IntArray(v.iter().map(|f| *f as i32).collect())
            }
            (ParamType::Float, ParamValue::FloatArray(v)) => ParamValue::FloatArray(v.clone()),
            (ParamType::Float, ParamValue::IntArray(v)) => {
                ParamValue::FloatArray(v.iter().map(|i| *i as f32).collect())
            }
            (ParamType::String, ParamValue::StringArray(v)) => ParamValue::StringArray(v.clone()),
            // A single scalar broadcast into a one-element array.
            (ParamType::Int | ParamType::Float | ParamType::String, scalar) if len == 1 => {
                match self.convert_scalar(scalar)? {
                    ParamValue::Int(i) => ParamValue::IntArray(vec![i]),
                    ParamValue::Float(f) => ParamValue::FloatArray(vec![f]),
                    ParamValue::String(s) => ParamValue::StringArray(vec![s]),
                    other => return Err(self.mismatch(&other)),
                }
            }
            _ => return Err(self.mismatch(value)),
        };

        let found = match &converted {
            ParamValue::IntArray(v) => v.len(),
            ParamValue::FloatArray(v) => v.len(),
            ParamValue::StringArray(v) => v.len(),
            _ => 0,
        };
        if found != len {
            return Err(ParamError::ArrayLength { expected: len, found });
        }
        Ok(converted)
    }
}

fn parse_array_literal(literal: &str) -> Result<ParamValue, ParamError> {
    let items: Vec<serde_json::Value> =
        serde_json::from_str(literal).map_err(|_| ParamError::Parse(literal.to_owned()))?;

    if items.iter().all(serde_json::Value::is_i64) {
        let ints = items
            .iter()
            .filter_map(serde_json::Value::as_i64)
            .map(|i| i32::try_from(i).map_err(|_| ParamError::Parse(literal.to_owned())))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(ParamValue::IntArray(ints));
    }
    if items.iter().all(serde_json::Value::is_number) {
        let floats = items.iter().filter_map(serde_json::Value::as_f64).map(|f| f as f32).collect();
        return Ok(ParamValue::FloatArray(floats));
    }
    if items.iter().all(serde_json::Value::is_string) {
        let strings = items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect();
        return Ok(ParamValue::StringArray(strings));
    }
    Err(ParamError::Parse(literal.to_owned()))
}

/// Ordered set of named parameters (attributes, primvars, options, shader params).
///
/// Ordering is by name so that two exports of the same state compare equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamList {
    values: BTreeMap<String, ParamValue>,
}

impl ParamList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.values.remove(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(ParamValue::as_str)
    }

    #[must_use]
    pub fn get_int(&self, name: &str) -> Option<i32> {
        match self.values.get(name) {
            Some(ParamValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copies every entry of `other` over this list.
    pub fn merge(&mut self, other: &ParamList) {
        for (k, v) in &other.values {
            self.values.insert(k.clone(), v.clone());
        }
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut list = ParamList::new();
        for (k, v) in iter {
            list.set(k, v);
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_converts_to_int() {
        let v = ParamType::Int.convert(&ParamValue::Bool(true), None).unwrap();
        assert_eq!(v, ParamValue::Int(1));
    }

    #[test]
    fn string_is_not_a_float() {
        let err = ParamType::Float.convert(&"abc".into(), None).unwrap_err();
        assert_eq!(
            err,
            ParamError::TypeMismatch {
                expected: "float",
                found: "string"
            }
        );
    }

    #[test]
    fn array_literal_is_parsed() {
        let v = ParamType::Float.convert(&"[1, 2.5, 3]".into(), Some(3)).unwrap();
        assert_eq!(v, ParamValue::FloatArray(vec![1.0, 2.5, 3.0]));
    }

    #[test]
    fn array_length_is_enforced() {
        let err = ParamType::Int
            .convert(&ParamValue::IntArray(vec![1, 2]), Some(3))
            .unwrap_err();
        assert_eq!(err, ParamError::ArrayLength { expected: 3, found: 2 });
    }

    #[test]
    fn bad_literal_reports_parse_error() {
        let err = ParamType::Int.convert(&"[1, 2".into(), Some(2)).unwrap_err();
        assert!(matches!(err, ParamError::Parse(_)));
    }

    #[test]
    fn float_triple_becomes_color() {
        let v = ParamType::Color
            .convert(&ParamValue::FloatArray(vec![0.1, 0.2, 0.3]), None)
            .unwrap();
        assert_eq!(v, ParamValue::Color([0.1, 0.2, 0.3]));
    }

    #[test]
    fn param_list_is_ordered_by_name() {
        let list: ParamList = [("b", 1), ("a", 2)].into_iter().collect();
        let names: Vec<_> = list.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn truthiness() {
        assert!(!ParamValue::Int(0).is_truthy());
        assert!(!ParamValue::String(String::new()).is_truthy());
        assert!(ParamValue::Float(0.5).is_truthy());
    }
}
