// Copyright (c) James Kassemi, SC, US. All rights reserved.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Correlation key of one GPS epoch: the shared `gps_unixtime` value in ms.
pub type EpochKey = i64;

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("field {name} missing")]
    Missing { name: String },
    #[error("field {name} is {actual}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Typed value of a single stream-element field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Int(i32),
    Long(i64),
    Double(f64),
    Float(f32),
    Byte(u8),
    Binary(Vec<u8>),
    Varchar(String),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Int(_) => "integer",
            FieldValue::Long(_) => "long",
            FieldValue::Double(_) => "double",
            FieldValue::Float(_) => "float",
            FieldValue::Byte(_) => "byte",
            FieldValue::Binary(_) => "binary",
            FieldValue::Varchar(_) => "varchar",
        }
    }
}

/// Immutable typed tuple flowing between virtual sensors.
///
/// Fields keep their insertion order; lookups are by name. Elements never
/// change after construction, so they can be handed between the producer
/// path and the eviction timer without copying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamElement {
    stream_name: String,
    fields: Vec<(String, FieldValue)>,
}

impl StreamElement {
    pub fn builder(stream_name: impl Into<String>) -> StreamElementBuilder {
        StreamElementBuilder {
            stream_name: stream_name.into(),
            fields: Vec::new(),
        }
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    fn required(&self, name: &str) -> Result<&FieldValue, FieldError> {
        self.get(name).ok_or_else(|| FieldError::Missing {
            name: name.to_string(),
        })
    }

    fn mismatch(name: &str, expected: &'static str, actual: &FieldValue) -> FieldError {
        FieldError::TypeMismatch {
            name: name.to_string(),
            expected,
            actual: actual.type_name(),
        }
    }

    pub fn int(&self, name: &str) -> Result<i32, FieldError> {
        match self.required(name)? {
            FieldValue::Int(v) => Ok(*v),
            other => Err(Self::mismatch(name, "integer", other)),
        }
    }

    pub fn long(&self, name: &str) -> Result<i64, FieldError> {
        match self.required(name)? {
            FieldValue::Long(v) => Ok(*v),
            other => Err(Self::mismatch(name, "long", other)),
        }
    }

    pub fn double(&self, name: &str) -> Result<f64, FieldError> {
        match self.required(name)? {
            FieldValue::Double(v) => Ok(*v),
            other => Err(Self::mismatch(name, "double", other)),
        }
    }

    pub fn float(&self, name: &str) -> Result<f32, FieldError> {
        match self.required(name)? {
            FieldValue::Float(v) => Ok(*v),
            other => Err(Self::mismatch(name, "float", other)),
        }
    }

    pub fn byte(&self, name: &str) -> Result<u8, FieldError> {
        match self.required(name)? {
            FieldValue::Byte(v) => Ok(*v),
            other => Err(Self::mismatch(name, "byte", other)),
        }
    }

    pub fn binary(&self, name: &str) -> Result<&[u8], FieldError> {
        match self.required(name)? {
            FieldValue::Binary(v) => Ok(v.as_slice()),
            other => Err(Self::mismatch(name, "binary", other)),
        }
    }

    pub fn varchar(&self, name: &str) -> Result<&str, FieldError> {
        match self.required(name)? {
            FieldValue::Varchar(v) => Ok(v.as_str()),
            other => Err(Self::mismatch(name, "varchar", other)),
        }
    }
}

pub struct StreamElementBuilder {
    stream_name: String,
    fields: Vec<(String, FieldValue)>,
}

impl StreamElementBuilder {
    pub fn field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    /// Copies a field from another element when present; absent fields are
    /// skipped rather than materialized as nulls.
    pub fn field_from(mut self, name: &str, source: &StreamElement) -> Self {
        if let Some(value) = source.get(name) {
            self.fields.push((name.to_string(), value.clone()));
        }
        self
    }

    pub fn build(self) -> StreamElement {
        StreamElement {
            stream_name: self.stream_name,
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors() {
        let element = StreamElement::builder("gps")
            .field("gps_unixtime", FieldValue::Long(1_000))
            .field("num_sv", FieldValue::Byte(3))
            .field("doppler", FieldValue::Double(-1.5))
            .build();
        assert_eq!(element.stream_name(), "gps");
        assert_eq!(element.long("gps_unixtime").unwrap(), 1_000);
        assert_eq!(element.byte("num_sv").unwrap(), 3);
        assert_eq!(element.double("doppler").unwrap(), -1.5);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let element = StreamElement::builder("gps")
            .field("GPS_UNIXTIME", FieldValue::Long(42))
            .build();
        assert_eq!(element.long("gps_unixtime").unwrap(), 42);
    }

    #[test]
    fn type_mismatch_is_reported() {
        let element = StreamElement::builder("gps")
            .field("num_sv", FieldValue::Long(3))
            .build();
        let err = element.byte("num_sv").unwrap_err();
        assert!(matches!(err, FieldError::TypeMismatch { .. }));
    }

    #[test]
    fn missing_field_is_reported() {
        let element = StreamElement::builder("gps").build();
        let err = element.long("gps_unixtime").unwrap_err();
        assert!(matches!(err, FieldError::Missing { .. }));
    }
}
