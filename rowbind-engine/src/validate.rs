//! Field constraint validation.
//!
//! The controller validates records before saving them and filter / SET
//! values before compiling them. [`Validator`] is the seam for plugging in
//! an external validator; [`ConstraintValidator`] enforces the constraints
//! declared in field annotations.

use regex_lite::Regex;
use rowbind_query::{Filters, Operator, Selector};
use rowbind_schema::{ColumnKind, Schema, SchemaField, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("static pattern")
});

/// Why a field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureCode {
    /// A value of the wrong kind for the column.
    Type,
    Req,
    Lenmin,
    Lenmax,
    Valmin,
    Valmax,
    Regexp,
    Email,
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::Type => "type",
            Self::Req => "req",
            Self::Lenmin => "lenmin",
            Self::Lenmax => "lenmax",
            Self::Valmin => "valmin",
            Self::Valmax => "valmax",
            Self::Regexp => "regexp",
            Self::Email => "email",
        };
        f.write_str(code)
    }
}

/// Field name → first failure found on it.
pub type Failures = BTreeMap<String, FailureCode>;

/// Checks values against a schema's field constraints.
pub trait Validator: Send + Sync {
    /// Validates the root values of a record about to be saved.
    fn validate_record(&self, schema: &Schema, values: &BTreeMap<String, Value>) -> Failures;

    /// Validates the values of a bulk update.
    fn validate_update(&self, schema: &Schema, values: &BTreeMap<String, Value>) -> Failures;

    /// Validates filter values.
    fn validate_filters(&self, schema: &Schema, filters: &Filters) -> Failures;
}

/// Enforces `req`, `lenmin`/`lenmax`, `valmin`/`valmax`, `regexp` and `email`.
///
/// Length, pattern and email checks skip empty strings; `req` is what
/// rejects those.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintValidator;

impl Validator for ConstraintValidator {
    fn validate_record(&self, schema: &Schema, values: &BTreeMap<String, Value>) -> Failures {
        let mut failures = Failures::new();
        for field in schema.data_fields() {
            let value = values.get(&field.name).cloned().unwrap_or_else(|| field.kind.zero());
            if let Some(code) = check_value(field, &value) {
                failures.insert(field.name.clone(), code);
            }
        }
        failures
    }

    fn validate_update(&self, schema: &Schema, values: &BTreeMap<String, Value>) -> Failures {
        let mut failures = Failures::new();
        for (name, value) in values {
            let Some(field) = schema.field(name) else { continue };
            if let Some(code) = check_value(field, value) {
                failures.insert(name.clone(), code);
            }
        }
        failures
    }

    fn validate_filters(&self, schema: &Schema, filters: &Filters) -> Failures {
        let mut failures = Failures::new();
        for (selector, value) in filters.entries() {
            // Malformed selectors are reported by the compiler.
            let Ok(selector) = Selector::parse(selector) else { continue };
            let Some(field) = schema.field(selector.field) else { continue };

            let code = match (selector.operator, value) {
                (Operator::Eq, Value::List(items)) => items
                    .iter()
                    .find_map(|item| check_kind(field.kind, item)),
                (Operator::Eq, scalar) => check_kind(field.kind, scalar)
                    .or_else(|| check_text(field, scalar)),
                (Operator::Regex | Operator::Like, Value::Text(_)) => None,
                (Operator::Regex | Operator::Like, _) => Some(FailureCode::Type),
                (Operator::BitAnd, Value::Int(_) | Value::UInt(_)) => None,
                (Operator::BitAnd, _) => Some(FailureCode::Type),
                (_, scalar) => check_kind(field.kind, scalar),
            };
            if let Some(code) = code {
                failures.entry(selector.field.to_string()).or_insert(code);
            }
        }
        failures
    }
}

fn check_value(field: &SchemaField, value: &Value) -> Option<FailureCode> {
    let annotations = &field.annotations;
    if let Some(code) = check_kind(field.kind, value) {
        return Some(code);
    }
    if annotations.required && value.is_zero() {
        return Some(FailureCode::Req);
    }
    if let Some(n) = value.as_f64() {
        if annotations.val_min.is_some_and(|min| n < min as f64) {
            return Some(FailureCode::Valmin);
        }
        if annotations.val_max.is_some_and(|max| n > max as f64) {
            return Some(FailureCode::Valmax);
        }
    }
    check_text(field, value)
}

fn check_text(field: &SchemaField, value: &Value) -> Option<FailureCode> {
    let Value::Text(text) = value else { return None };
    if text.is_empty() {
        return None;
    }
    let annotations = &field.annotations;
    let len = text.chars().count();
    if annotations.len_min.is_some_and(|min| len < min) {
        return Some(FailureCode::Lenmin);
    }
    if annotations.len_max.is_some_and(|max| len > max) {
        return Some(FailureCode::Lenmax);
    }
    if let Some(pattern) = &annotations.pattern {
        // Patterns are checked at registration; an invalid one fails closed.
        let matched = Regex::new(pattern).is_ok_and(|re| re.is_match(text));
        if !matched {
            return Some(FailureCode::Regexp);
        }
    }
    if annotations.email && !EMAIL.is_match(text) {
        return Some(FailureCode::Email);
    }
    None
}

fn check_kind(kind: ColumnKind, value: &Value) -> Option<FailureCode> {
    let ok = match (kind, value) {
        (ColumnKind::Int, Value::Int(_)) => true,
        (ColumnKind::Int, Value::UInt(v)) => i64::try_from(*v).is_ok(),
        (ColumnKind::UInt, Value::UInt(_)) => true,
        (ColumnKind::UInt, Value::Int(v)) => *v >= 0,
        (ColumnKind::Float, Value::Float(_) | Value::Int(_) | Value::UInt(_)) => true,
        (ColumnKind::Text, Value::Text(_)) => true,
        (ColumnKind::Bool, Value::Bool(_)) => true,
        (ColumnKind::Bool, Value::Int(v)) => *v == 0 || *v == 1,
        _ => false,
    };
    (!ok).then_some(FailureCode::Type)
}
