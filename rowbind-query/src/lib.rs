//! SQL generation for rowbind.
//!
//! Turns a [`rowbind_schema::Schema`] into fixed statements once
//! ([`QueryTemplates`]) and compiles per-call filters, order and pagination
//! into the dynamic fragments appended to them ([`QueryCompiler`]).
//!
//! # Placeholders
//!
//! Statements use `$1,$2,…` positional placeholders. Every dynamic
//! statement threads one [`ParamBinder`] through all of its fragments, so
//! the `N`th placeholder in the text always refers to the `N`th bound value.
//!
//! # Joins
//!
//! Records with dependencies read through `INNER JOIN`s; the root table is
//! aliased `t1` and dependencies `t2, t3, …` ([`JoinResolver`]).

mod binder;
mod compile;
mod error;
mod filter;
mod join;
mod order;
mod templates;

pub use binder::{placeholders, ParamBinder};
pub use compile::{CompiledQuery, QueryCompiler, SelectSpec, DEFAULT_LIMIT};
pub use error::{QueryError, QueryResult};
pub use filter::{
    Conjunction, FilterCompiler, Filters, Operator, RawFilter, Selector, RAW_CONJUNCTION_KEY,
    RAW_KEY,
};
pub use join::{ColumnResolver, JoinResolver, TableColumns, ROOT_ALIAS};
pub use order::{compile_limit, Direction};
pub use templates::QueryTemplates;
