//! Error types for the persistence engine.

use crate::validate::Failures;
use rowbind_query::QueryError;
use rowbind_schema::{SchemaError, ValueError};
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by [`crate::Controller`].
///
/// Runtime variants carry the operation tag (`"save"`, `"get"`, …) so a
/// failure deep inside a cascade still names the call that triggered it.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Schema derivation failed while registering a record type.
    #[error("registration of {record} failed: {source}")]
    Registration {
        record: String,
        #[source]
        source: SchemaError,
    },

    /// A record or filter failed its field constraints.
    #[error("{op}: validation failed for {}", field_list(.failures))]
    Validation { op: &'static str, failures: Failures },

    /// The database rejected a statement.
    #[error("{op}: query failed: {source}")]
    Query {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// A row could not be mapped back onto the record.
    #[error("{op}: scan failed: {source}")]
    Scan {
        op: &'static str,
        #[source]
        source: ValueError,
    },

    /// Filters, order or SET values could not be compiled.
    #[error("{op}: {source}")]
    Compile {
        op: &'static str,
        #[source]
        source: QueryError,
    },

    /// A cascade step failed after the parent statement succeeded.
    #[error("cascade {step} failed: {source}")]
    Cascade {
        step: String,
        #[source]
        source: Box<EngineError>,
    },

    /// The configuration file is unreadable or malformed.
    #[error("config error: {0}")]
    Config(String),
}

impl EngineError {
    /// Whether the failure was caused by caller input rather than the database.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Validation { .. } | Self::Compile { .. } => true,
            Self::Cascade { source, .. } => source.is_client_error(),
            _ => false,
        }
    }

    pub(crate) fn query(op: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Query { op, source }
    }

    pub(crate) fn compile(op: &'static str) -> impl FnOnce(QueryError) -> Self {
        move |source| Self::Compile { op, source }
    }

    pub(crate) fn scan(op: &'static str) -> impl FnOnce(ValueError) -> Self {
        move |source| Self::Scan { op, source }
    }
}

fn field_list(failures: &Failures) -> String {
    failures
        .iter()
        .map(|(field, code)| format!("{field} ({code})"))
        .collect::<Vec<_>>()
        .join(", ")
}
