//! Error types for query compilation.

use thiserror::Error;

/// Result type for query compilation.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while compiling filters, order and SET clauses.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// A selector or raw `.Field` token names no known column.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// A `Field:op` selector uses an operator outside the supported set.
    #[error("unknown operator '{op}' in selector {selector}")]
    UnknownOperator { selector: String, op: String },

    /// A list value was given to an operator that takes a scalar.
    #[error("selector {0} does not accept a list value")]
    ListNotAllowed(String),

    /// The number of `?` tokens in a raw fragment differs from its values.
    #[error("raw filter has {placeholders} placeholders but {values} values")]
    RawArity { placeholders: usize, values: usize },

    /// The filter payload does not follow the wire format.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The primary key cannot be assigned through a bulk update.
    #[error("field {0} cannot be updated")]
    ImmutableField(String),

    /// A bulk update was requested without any values.
    #[error("update has no values to set")]
    EmptySet,
}
