//! Struct-to-SQLite persistence for rowbind.
//!
//! A [`Controller`] owns a SQLite connection and a caller-supplied
//! [`SchemaRegistry`]. Record types are registered lazily on first use;
//! each operation concatenates the cached fixed statement with the
//! per-call fragment compiled by `rowbind-query`, binds the parameters in
//! placeholder order and executes it. Deletes cascade along the child
//! relations declared on the record, bounded by
//! [`EngineConfig::max_cascade_depth`].
//!
//! ```ignore
//! let ctl = Controller::open_in_memory(EngineConfig::default())?;
//! ctl.create_table::<User>()?;
//! let mut user = User { name: "ada".into(), ..Default::default() };
//! ctl.save(&mut user)?;
//! let adults = ctl.get::<User>(&GetQuery::new().filters(Filters::new().with("Age:>=", 18)))?;
//! ```

mod cascade;
mod config;
mod controller;
mod error;
mod registry;
mod sql;
mod validate;

pub use config::EngineConfig;
pub use controller::{Controller, GetQuery};
pub use error::{EngineError, EngineResult};
pub use registry::{RegisterOptions, RegistryEntry, SchemaRegistry};
pub use validate::{ConstraintValidator, FailureCode, Failures, Validator};

pub use rowbind_query::{CompiledQuery, Conjunction, Filters, QueryTemplates};
pub use rowbind_schema::{
    record_fields, CascadeRule, FieldDescriptor, Record, RecordDescriptor, Schema, Value,
};
