//! Persistence operations over a SQLite connection.

use crate::cascade::Cascade;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::registry::{RegisterOptions, RegistryEntry, SchemaRegistry};
use crate::sql;
use crate::validate::{ConstraintValidator, Failures, Validator};
use rowbind_query::{CompiledQuery, Filters, QueryCompiler, QueryTemplates, SelectSpec};
use rowbind_schema::{Record, Schema, SchemaField, Value, ValueError};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// A `get` request: filters, order and pagination.
pub type GetQuery = SelectSpec;

/// Maps record types onto tables of one SQLite database.
///
/// The connection is shared behind a mutex; every operation holds it for
/// the duration of its statements, including any cascade it triggers.
pub struct Controller {
    conn: Arc<Mutex<Connection>>,
    registry: Arc<SchemaRegistry>,
    config: EngineConfig,
    validator: Arc<dyn Validator>,
}

impl Controller {
    /// Wraps an open connection.
    ///
    /// Table prefix and annotation tag come from `registry`; the remaining
    /// settings from `config`.
    pub fn new(
        conn: Connection,
        registry: Arc<SchemaRegistry>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        sql::register_regexp(&conn).map_err(EngineError::query("open"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            registry,
            config,
            validator: Arc::new(ConstraintValidator),
        })
    }

    /// Opens (or creates) a database file.
    pub fn open(path: impl AsRef<Path>, config: EngineConfig) -> EngineResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(EngineError::query("open"))?;
        info!(path = %path.display(), "opened database");
        Self::with_own_registry(conn, config)
    }

    /// Opens an in-memory database.
    pub fn open_in_memory(config: EngineConfig) -> EngineResult<Self> {
        let conn = Connection::open_in_memory().map_err(EngineError::query("open"))?;
        Self::with_own_registry(conn, config)
    }

    fn with_own_registry(conn: Connection, config: EngineConfig) -> EngineResult<Self> {
        let registry = Arc::new(SchemaRegistry::new(&config.table_prefix, &config.tag));
        Self::new(conn, registry, config)
    }

    /// Replaces the constraint validator.
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    // ── Registration and DDL ─────────────────────────────────────

    /// Registers `T` with default options, or returns its existing entry.
    pub fn register<T: Record>(&self) -> EngineResult<Arc<RegistryEntry>> {
        self.registry.get_or_register::<T>()
    }

    /// Registers `T` with explicit options; see [`SchemaRegistry::register_with`].
    pub fn register_with<T: Record>(
        &self,
        options: &RegisterOptions,
        overwrite: bool,
    ) -> EngineResult<Arc<RegistryEntry>> {
        self.registry.register_with::<T>(options, overwrite)
    }

    /// Creates the table of `T`. Fails if it already exists.
    pub fn create_table<T: Record>(&self) -> EngineResult<()> {
        let entry = self.register::<T>()?;
        let conn = self.conn();
        sql::execute(&conn, "create_table", &entry.templates.create_table, &[])?;
        info!(table = %entry.schema.table_name(), "created table");
        Ok(())
    }

    /// Drops the table of `T` if it exists.
    pub fn drop_table<T: Record>(&self) -> EngineResult<()> {
        let entry = self.register::<T>()?;
        let conn = self.conn();
        sql::execute(&conn, "drop_table", &entry.templates.drop_table, &[])?;
        info!(table = %entry.schema.table_name(), "dropped table");
        Ok(())
    }

    // ── Single-record operations ─────────────────────────────────

    /// Inserts a record with a zero ID (writing the generated ID back) or
    /// upserts one with a non-zero ID.
    pub fn save<T: Record>(&self, record: &mut T) -> EngineResult<()> {
        const OP: &str = "save";
        let entry = self.register::<T>()?;
        let schema = &entry.schema;

        let values: BTreeMap<String, Value> = schema
            .root_fields()
            .map(|f| {
                let value = record.field_value(&f.name).unwrap_or_else(|| f.kind.zero());
                (f.name.clone(), value)
            })
            .collect();
        check(OP, self.validator.validate_record(schema, &values))?;

        let conn = self.conn();
        let id = record.id();
        if id == 0 {
            let params = ordered(schema.data_fields(), &values);
            let statement = &entry.templates.insert;
            debug!(op = OP, sql = %statement, params = params.len(), "executing statement");
            let new_id: i64 = conn
                .query_row(statement, params_from_iter(sql::params(&params)), |row| row.get(0))
                .map_err(EngineError::query(OP))?;
            record.set_id(new_id).map_err(EngineError::scan(OP))?;
            debug!(table = %schema.table_name(), id = new_id, "inserted record");
        } else {
            let mut params = ordered(schema.root_fields(), &values);
            params.extend_from_within(..);
            sql::execute(&conn, OP, &entry.templates.upsert, &params)?;
            debug!(table = %schema.table_name(), id, "upserted record");
        }
        Ok(())
    }

    /// Loads the record with `id` into `record`.
    ///
    /// Returns whether a row was found; a missing row resets `record` to its
    /// default.
    pub fn load<T: Record>(&self, record: &mut T, id: i64) -> EngineResult<bool> {
        const OP: &str = "load";
        let entry = self.register::<T>()?;
        let schema = &entry.schema;
        let statement = &entry.templates.select_by_id;

        let conn = self.conn();
        debug!(op = OP, sql = %statement, params = 1, "executing statement");
        let row = conn
            .query_row(statement, [id], |row| read_row(schema, row))
            .optional()
            .map_err(EngineError::query(OP))?;

        *record = T::default();
        match row {
            Some(values) => {
                populate(schema, record, values).map_err(EngineError::scan(OP))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Deletes a stored record, cascades to its children and resets it to
    /// the default. A record with a zero ID is left alone.
    pub fn delete<T: Record>(&self, record: &mut T) -> EngineResult<()> {
        const OP: &str = "delete";
        let id = record.id();
        if id == 0 {
            return Ok(());
        }
        let entry = self.register::<T>()?;

        let conn = self.conn();
        let deleted = sql::execute(&conn, OP, &entry.templates.delete_by_id, &[Value::Int(id)])?;
        if deleted > 0 {
            self.cascade(&conn).run(&entry.schema, &[id])?;
        }
        *record = T::default();
        Ok(())
    }

    // ── Bulk operations ──────────────────────────────────────────

    /// Deletes every row matching `filters`, cascades, and returns the
    /// deleted IDs.
    pub fn delete_multiple<T: Record>(&self, filters: &Filters) -> EngineResult<Vec<i64>> {
        const OP: &str = "delete_multiple";
        let entry = self.register::<T>()?;
        check(OP, self.validator.validate_filters(&entry.schema, filters))?;
        let query = self
            .compiler(&entry)
            .delete(filters)
            .map_err(EngineError::compile(OP))?;

        let conn = self.conn();
        let ids = sql::returning_ids(&conn, OP, &query.sql, &query.params)?;
        self.cascade(&conn).run(&entry.schema, &ids)?;
        Ok(ids)
    }

    /// Sets `values` on every row matching `filters` and returns the number
    /// of rows changed. Updates do not cascade.
    pub fn update_multiple<T: Record>(
        &self,
        filters: &Filters,
        values: &BTreeMap<String, Value>,
    ) -> EngineResult<usize> {
        const OP: &str = "update_multiple";
        let entry = self.register::<T>()?;
        let mut failures = self.validator.validate_update(&entry.schema, values);
        failures.extend(self.validator.validate_filters(&entry.schema, filters));
        check(OP, failures)?;
        let query = self
            .compiler(&entry)
            .update(values, filters)
            .map_err(EngineError::compile(OP))?;

        let conn = self.conn();
        sql::execute(&conn, OP, &query.sql, &query.params)
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Returns the records matching `query`.
    pub fn get<T: Record>(&self, query: &GetQuery) -> EngineResult<Vec<T>> {
        self.get_with(query, |record: T| record)
    }

    /// Returns the records matching `query`, mapped through `transform`.
    pub fn get_with<T: Record, R>(
        &self,
        query: &GetQuery,
        mut transform: impl FnMut(T) -> R,
    ) -> EngineResult<Vec<R>> {
        const OP: &str = "get";
        let entry = self.register::<T>()?;
        let schema = &entry.schema;
        check(OP, self.validator.validate_filters(schema, &query.filters))?;
        let compiled = self
            .compiler(&entry)
            .select(query)
            .map_err(EngineError::compile(OP))?;

        let conn = self.conn();
        debug!(op = OP, sql = %compiled.sql, params = compiled.params.len(), "executing statement");
        let mut stmt = conn.prepare(&compiled.sql).map_err(EngineError::query(OP))?;
        let rows = stmt
            .query_map(params_from_iter(sql::params(&compiled.params)), |row| {
                read_row(schema, row)
            })
            .map_err(EngineError::query(OP))?;

        let mut out = Vec::new();
        for row in rows {
            let values = row.map_err(EngineError::query(OP))?;
            let mut record = T::default();
            populate(schema, &mut record, values).map_err(EngineError::scan(OP))?;
            out.push(transform(record));
        }
        Ok(out)
    }

    /// Counts the rows matching `filters`.
    pub fn get_count<T: Record>(&self, filters: &Filters) -> EngineResult<i64> {
        const OP: &str = "get_count";
        let entry = self.register::<T>()?;
        check(OP, self.validator.validate_filters(&entry.schema, filters))?;
        let query = self
            .compiler(&entry)
            .count(filters)
            .map_err(EngineError::compile(OP))?;

        let conn = self.conn();
        debug!(op = OP, sql = %query.sql, params = query.params.len(), "executing statement");
        conn.query_row(&query.sql, params_from_iter(sql::params(&query.params)), |row| {
            row.get(0)
        })
        .map_err(EngineError::query(OP))
    }

    // ── Generated SQL ────────────────────────────────────────────

    /// Schema derived for `T`.
    pub fn get_schema<T: Record>(&self) -> EngineResult<Schema> {
        Ok(self.register::<T>()?.schema.clone())
    }

    /// Fixed statements built for `T`.
    pub fn get_query_templates<T: Record>(&self) -> EngineResult<QueryTemplates> {
        Ok(self.register::<T>()?.templates.clone())
    }

    /// The SELECT `get` would run.
    pub fn get_query_select<T: Record>(&self, query: &GetQuery) -> EngineResult<CompiledQuery> {
        let entry = self.register::<T>()?;
        self.compiler(&entry)
            .select(query)
            .map_err(EngineError::compile("get"))
    }

    /// The COUNT `get_count` would run.
    pub fn get_query_count<T: Record>(&self, filters: &Filters) -> EngineResult<CompiledQuery> {
        let entry = self.register::<T>()?;
        self.compiler(&entry)
            .count(filters)
            .map_err(EngineError::compile("get_count"))
    }

    /// The DELETE `delete_multiple` would run, before cascades.
    pub fn get_query_delete<T: Record>(&self, filters: &Filters) -> EngineResult<CompiledQuery> {
        let entry = self.register::<T>()?;
        self.compiler(&entry)
            .delete(filters)
            .map_err(EngineError::compile("delete_multiple"))
    }

    /// The UPDATE `update_multiple` would run.
    pub fn get_query_update<T: Record>(
        &self,
        filters: &Filters,
        values: &BTreeMap<String, Value>,
    ) -> EngineResult<CompiledQuery> {
        let entry = self.register::<T>()?;
        self.compiler(&entry)
            .update(values, filters)
            .map_err(EngineError::compile("update_multiple"))
    }

    // ── Internals ────────────────────────────────────────────────

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn compiler<'a>(&self, entry: &'a RegistryEntry) -> QueryCompiler<'a> {
        QueryCompiler::new(&entry.schema, &entry.templates)
            .strict(self.config.strict_selectors)
            .default_limit(self.config.default_limit)
    }

    fn cascade<'a>(&'a self, conn: &'a Connection) -> Cascade<'a> {
        Cascade::new(conn, &self.registry, self.config.max_cascade_depth)
    }
}

fn check(op: &'static str, failures: Failures) -> EngineResult<()> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Validation { op, failures })
    }
}

fn ordered<'a>(
    fields: impl Iterator<Item = &'a SchemaField>,
    values: &BTreeMap<String, Value>,
) -> Vec<Value> {
    fields
        .filter_map(|f| values.get(&f.name).cloned())
        .collect()
}

/// Reads every projected column, in schema field order.
fn read_row(schema: &Schema, row: &Row<'_>) -> rusqlite::Result<Vec<Value>> {
    schema
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, field)| sql::read_column(row, idx, field.kind))
        .collect()
}

fn populate<T: Record>(
    schema: &Schema,
    record: &mut T,
    values: Vec<Value>,
) -> Result<(), ValueError> {
    for (field, value) in schema.fields().iter().zip(values) {
        record.set_field_value(&field.name, value)?;
    }
    Ok(())
}
