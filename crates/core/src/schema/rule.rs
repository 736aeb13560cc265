//! Field rule definitions for table schemas.

use crate::pattern_match::Pattern;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Declared type of a schema field. No coercion is applied when checking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    /// Arrays and maps.
    Object,
}

impl FieldType {
    /// Returns true if `value` (non-null) has this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => matches!(value, Value::String(_)),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => matches!(value, Value::Boolean(_)),
            FieldType::Object => matches!(value, Value::Array(_) | Value::Object(_)),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
        };
        f.write_str(name)
    }
}

/// Why a field failed its rule.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ValidationFailure {
    #[error("value is required")]
    Required,
    #[error("expected {expected}, found {found}")]
    Type {
        expected: FieldType,
        found: &'static str,
    },
    #[error("{actual} is below the minimum {min}")]
    Min { min: f64, actual: f64 },
    #[error("{actual} is above the maximum {max}")]
    Max { max: f64, actual: f64 },
    #[error("length {actual} differs from the required {expected}")]
    Length { expected: usize, actual: usize },
    #[error("value does not match pattern {pattern}")]
    Pattern { pattern: String },
}

fn default_indexed() -> bool {
    true
}

/// A `pattern` rule kept as written and compiled once. A source that does not
/// compile never matches.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
struct RulePattern {
    source: String,
    compiled: Option<Pattern>,
}

impl RulePattern {
    fn is_match(&self, text: &str) -> bool {
        self.compiled.as_ref().is_some_and(|p| p.is_match(text))
    }
}

impl From<String> for RulePattern {
    fn from(source: String) -> Self {
        let compiled = Pattern::compile(&source);
        Self { source, compiled }
    }
}

impl From<RulePattern> for String {
    fn from(pattern: RulePattern) -> Self {
        pattern.source
    }
}

impl PartialEq for RulePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Validation rule for a single field. Every check is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    field_type: Option<FieldType>,
    #[serde(default, skip_serializing_if = "core::ops::Not::not")]
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pattern: Option<RulePattern>,
    /// Whether auto-indexing covers this field.
    #[serde(default = "default_indexed")]
    indexed: bool,
}

impl Default for FieldRule {
    fn default() -> Self {
        Self {
            field_type: None,
            required: false,
            min: None,
            max: None,
            length: None,
            pattern: None,
            indexed: true,
        }
    }
}

impl FieldRule {
    /// Creates a rule with no checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a rule requiring the given type.
    pub fn of(field_type: FieldType) -> Self {
        Self {
            field_type: Some(field_type),
            ..Self::default()
        }
    }

    /// Shorthand for `FieldRule::of(FieldType::String)`.
    pub fn string() -> Self {
        Self::of(FieldType::String)
    }

    /// Shorthand for `FieldRule::of(FieldType::Number)`.
    pub fn number() -> Self {
        Self::of(FieldType::Number)
    }

    /// Shorthand for `FieldRule::of(FieldType::Boolean)`.
    pub fn boolean() -> Self {
        Self::of(FieldType::Boolean)
    }

    /// Marks the field as required (neither missing nor null).
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the inclusive numeric lower bound.
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Sets the inclusive numeric upper bound.
    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Requires the text form to have exactly `length` characters.
    pub fn length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Requires the text form to match a regular expression. The pattern is
    /// compiled here; one that fails to compile rejects every value.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(RulePattern::from(pattern.into()));
        self
    }

    /// Returns the pattern source, if any.
    #[inline]
    pub fn pattern_source(&self) -> Option<&str> {
        self.pattern.as_ref().map(|p| p.source.as_str())
    }

    /// Excludes the field from auto-indexing.
    pub fn not_indexed(mut self) -> Self {
        self.indexed = false;
        self
    }

    /// Returns the declared type.
    #[inline]
    pub fn field_type(&self) -> Option<FieldType> {
        self.field_type
    }

    /// Returns whether the field is required.
    #[inline]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Returns whether auto-indexing covers this field.
    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Checks a field value (`Null` for a missing field) against this rule.
    pub fn check(&self, value: &Value) -> core::result::Result<(), ValidationFailure> {
        if value.is_null() {
            return if self.required {
                Err(ValidationFailure::Required)
            } else {
                Ok(())
            };
        }

        if let Some(expected) = self.field_type {
            if !expected.accepts(value) {
                return Err(ValidationFailure::Type {
                    expected,
                    found: value.type_name(),
                });
            }
        }

        if let Some(actual) = value.as_f64() {
            if let Some(min) = self.min {
                if actual < min {
                    return Err(ValidationFailure::Min { min, actual });
                }
            }
            if let Some(max) = self.max {
                if actual > max {
                    return Err(ValidationFailure::Max { max, actual });
                }
            }
        }

        if self.length.is_none() && self.pattern.is_none() {
            return Ok(());
        }
        let text = value.to_text();

        if let Some(expected) = self.length {
            let actual = text.chars().count();
            if actual != expected {
                return Err(ValidationFailure::Length { expected, actual });
            }
        }

        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(&text) {
                return Err(ValidationFailure::Pattern {
                    pattern: pattern.source.clone(),
                });
            }
        }

        Ok(())
    }
}
