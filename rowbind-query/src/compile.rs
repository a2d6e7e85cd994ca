//! Composition of fixed templates and dynamic fragments into executable
//! statements.

use crate::binder::ParamBinder;
use crate::error::QueryResult;
use crate::filter::{FilterCompiler, Filters};
use crate::join::{JoinResolver, TableColumns};
use crate::order::compile_limit;
use crate::templates::QueryTemplates;
use rowbind_schema::{Schema, Value};
use std::collections::BTreeMap;

/// Page size used when a caller passes `limit < 1`.
pub const DEFAULT_LIMIT: i64 = 10;

/// SQL text plus the values bound to `$1..$N`, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl CompiledQuery {
    fn new(sql: String, binder: ParamBinder) -> Self {
        Self {
            sql,
            params: binder.into_values(),
        }
    }
}

/// A SELECT request: filters plus ordering and pagination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectSpec {
    pub filters: Filters,
    /// Flat `[field, direction, …]` list.
    pub order: Vec<String>,
    /// When non-empty, only these fields may appear in `order`.
    pub allowed_order: Vec<String>,
    pub limit: i64,
    pub offset: i64,
}

impl SelectSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn order<S: AsRef<str>>(mut self, order: &[S]) -> Self {
        self.order = order.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn allow_order<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        self.allowed_order = fields.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Builds dynamic statements for one schema on top of its templates.
#[derive(Debug, Clone, Copy)]
pub struct QueryCompiler<'a> {
    schema: &'a Schema,
    templates: &'a QueryTemplates,
    strict: bool,
    default_limit: i64,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(schema: &'a Schema, templates: &'a QueryTemplates) -> Self {
        Self {
            schema,
            templates,
            strict: true,
            default_limit: DEFAULT_LIMIT,
        }
    }

    /// Whether unknown selectors are errors (default) or silently dropped.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn default_limit(mut self, default_limit: i64) -> Self {
        self.default_limit = default_limit;
        self
    }

    /// `SELECT … [WHERE …] [ORDER BY …] LIMIT n OFFSET m`.
    pub fn select(&self, request: &SelectSpec) -> QueryResult<CompiledQuery> {
        let resolver = JoinResolver::new(self.schema);
        let compiler = FilterCompiler::new(&resolver, self.strict);
        let mut binder = ParamBinder::new();

        let mut sql = self.templates.select_prefix.clone();
        push_where(&mut sql, &compiler.compile_where(&request.filters, &mut binder)?);
        let order = compiler.compile_order(&request.order, &request.allowed_order)?;
        if !order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }
        sql.push(' ');
        sql.push_str(&compile_limit(request.limit, request.offset, self.default_limit));
        Ok(CompiledQuery::new(sql, binder))
    }

    /// `SELECT COUNT(*) … [WHERE …]`.
    pub fn count(&self, filters: &Filters) -> QueryResult<CompiledQuery> {
        let resolver = JoinResolver::new(self.schema);
        let compiler = FilterCompiler::new(&resolver, self.strict);
        let mut binder = ParamBinder::new();

        let mut sql = self.templates.select_count_prefix.clone();
        push_where(&mut sql, &compiler.compile_where(filters, &mut binder)?);
        Ok(CompiledQuery::new(sql, binder))
    }

    /// `DELETE FROM … [WHERE …] RETURNING id`.
    pub fn delete(&self, filters: &Filters) -> QueryResult<CompiledQuery> {
        let resolver = TableColumns(self.schema);
        let compiler = FilterCompiler::new(&resolver, self.strict);
        let mut binder = ParamBinder::new();

        let mut sql = self.templates.delete_prefix.clone();
        push_where(&mut sql, &compiler.compile_where(filters, &mut binder)?);
        sql.push_str(" RETURNING ");
        sql.push_str(self.schema.id_column());
        Ok(CompiledQuery::new(sql, binder))
    }

    /// `UPDATE … SET … [WHERE …]`; WHERE placeholders continue after SET's.
    pub fn update(
        &self,
        values: &BTreeMap<String, Value>,
        filters: &Filters,
    ) -> QueryResult<CompiledQuery> {
        let resolver = TableColumns(self.schema);
        let compiler = FilterCompiler::new(&resolver, self.strict);
        let mut binder = ParamBinder::new();

        let mut sql = self.templates.update_prefix.clone();
        sql.push_str(&compiler.compile_set(values, &mut binder)?);
        push_where(&mut sql, &compiler.compile_where(filters, &mut binder)?);
        Ok(CompiledQuery::new(sql, binder))
    }

    /// `DELETE … WHERE <field> IN (ids) RETURNING id`, used by cascades.
    pub fn delete_in(&self, field: &str, ids: &[i64]) -> QueryResult<CompiledQuery> {
        self.delete(&Filters::new().eq(field, ids_value(ids)))
    }

    /// `UPDATE … SET <set_field>=v WHERE <field> IN (ids)`, used by cascades.
    pub fn set_in(
        &self,
        set_field: &str,
        value: &Value,
        field: &str,
        ids: &[i64],
    ) -> QueryResult<CompiledQuery> {
        let values = BTreeMap::from([(set_field.to_string(), value.clone())]);
        self.update(&values, &Filters::new().eq(field, ids_value(ids)))
    }
}

fn ids_value(ids: &[i64]) -> Value {
    Value::List(ids.iter().copied().map(Value::Int).collect())
}

fn push_where(sql: &mut String, clause: &str) {
    if !clause.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(clause);
    }
}
