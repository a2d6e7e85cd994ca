//! Record descriptors and schema derivation for rowbind.
//!
//! - [`Record`] / [`RecordDescriptor`]: explicit, builder-style description of
//!   a record type (fields, joined dependencies, cascading child relations)
//! - [`Schema`]: the derived table mapping: table name, column prefix,
//!   ordered columns, unique set, type overrides
//! - [`naming`]: snake_case columns, pluralized table names, SQL type map
//! - [`Value`]: dynamically typed field and parameter values
//!
//! A schema is derived once per record type and never changes afterwards;
//! the query layer caches statements that depend on its field order.

mod annotations;
mod descriptor;
mod error;
pub mod naming;
mod schema;
mod value;

pub use annotations::FieldAnnotations;
pub use descriptor::{
    CascadeAction, CascadeRule, ChildRelation, ColumnKind, Dependency, FieldDescriptor, FieldKind,
    Record, RecordDescriptor, RecordRef, DEFAULT_TAG, FLAGS_FIELD, ID_FIELD,
};
pub use error::{SchemaError, SchemaResult, ValueError};
pub use schema::{ChildLink, JoinDependency, JoinSource, ReflectOptions, Schema, SchemaField};
pub use value::{FromValue, Value};
