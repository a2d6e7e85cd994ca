//! Error types for schema derivation and value conversion.

use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while turning a record descriptor into a [`crate::Schema`].
///
/// All of these are fatal at registration time.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A directive in a field annotation could not be parsed.
    #[error("invalid directive '{directive}' on field {field}: {reason}")]
    InvalidDirective {
        field: String,
        directive: String,
        reason: String,
    },

    /// A `db_type` override is not a well-formed SQL type.
    #[error("invalid SQL type override '{sql_type}' on field {field}")]
    InvalidSqlType { field: String, sql_type: String },

    /// The record declares no `ID` field.
    #[error("record {0} has no ID field")]
    MissingId(String),

    /// A joined dependency has no matching `<Prefix>ID` field on the root.
    #[error("record {record} joins {prefix} but has no {prefix}ID field")]
    MissingJoinKey { record: String, prefix: String },

    /// A cascade rule targets a field the child record does not have.
    #[error("cascade from {parent} into {child} references unknown field {field}")]
    UnknownCascadeField {
        parent: String,
        child: String,
        field: String,
    },
}

/// Errors converting between [`crate::Value`] and concrete Rust types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("value out of range: {0}")]
    OutOfRange(String),

    #[error("value cannot be represented: {0}")]
    Unrepresentable(String),

    #[error("unknown field: {0}")]
    UnknownField(String),
}
