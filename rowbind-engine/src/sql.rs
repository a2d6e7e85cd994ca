//! Glue between rowbind values and rusqlite.

use crate::error::{EngineError, EngineResult};
use regex_lite::Regex;
use rowbind_schema::{ColumnKind, Value, ValueError};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, Row, ToSql};
use std::sync::Arc;
use tracing::debug;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Binds a [`Value`] as a statement parameter.
pub(crate) struct Param<'a>(pub &'a Value);

impl ToSql for Param<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self.0 {
            Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
            Value::Int(v) => SqlValue::Integer(*v),
            Value::UInt(v) => SqlValue::Integer(i64::try_from(*v).map_err(|e| {
                rusqlite::Error::ToSqlConversionFailure(Box::new(e))
            })?),
            Value::Float(v) => SqlValue::Real(*v),
            Value::Text(s) => return Ok(ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes()))),
            Value::List(_) => {
                return Err(rusqlite::Error::ToSqlConversionFailure(Box::new(
                    ValueError::Unrepresentable("list parameter".into()),
                )));
            }
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

/// Wraps bound values for `params_from_iter`.
pub(crate) fn params(values: &[Value]) -> impl Iterator<Item = Param<'_>> {
    values.iter().map(Param)
}

/// Executes a statement and returns the number of affected rows.
pub(crate) fn execute(
    conn: &Connection,
    op: &'static str,
    sql: &str,
    values: &[Value],
) -> EngineResult<usize> {
    debug!(op, sql, params = values.len(), "executing statement");
    conn.execute(sql, params_from_iter(params(values)))
        .map_err(EngineError::query(op))
}

/// Runs a statement ending in `RETURNING <id>` and collects the identifiers.
pub(crate) fn returning_ids(
    conn: &Connection,
    op: &'static str,
    sql: &str,
    values: &[Value],
) -> EngineResult<Vec<i64>> {
    debug!(op, sql, params = values.len(), "executing statement");
    let mut stmt = conn.prepare(sql).map_err(EngineError::query(op))?;
    let rows = stmt
        .query_map(params_from_iter(params(values)), |row| row.get(0))
        .map_err(EngineError::query(op))?;
    rows.collect::<rusqlite::Result<Vec<i64>>>()
        .map_err(EngineError::query(op))
}

/// Reads column `idx` as a value of `kind`.
pub(crate) fn read_column(row: &Row<'_>, idx: usize, kind: ColumnKind) -> rusqlite::Result<Value> {
    Ok(match kind {
        ColumnKind::Int => Value::Int(row.get(idx)?),
        ColumnKind::UInt => {
            let raw: i64 = row.get(idx)?;
            Value::UInt(u64::try_from(raw).map_err(|_| {
                rusqlite::Error::IntegralValueOutOfRange(idx, raw)
            })?)
        }
        ColumnKind::Float => Value::Float(row.get(idx)?),
        ColumnKind::Text => Value::Text(row.get(idx)?),
        ColumnKind::Bool => Value::Bool(row.get(idx)?),
    })
}

/// Registers `regexp(pattern, text)`, which backs `text REGEXP pattern`.
///
/// Compiled patterns are cached per statement through SQLite auxiliary data.
pub(crate) fn register_regexp(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let regex: Arc<Regex> = ctx.get_or_create_aux(0, |vr| -> Result<_, BoxError> {
                Ok(Regex::new(vr.as_str()?)?)
            })?;
            let matched = match ctx.get_raw(1) {
                ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                    .map(|text| regex.is_match(text))
                    .unwrap_or(false),
                _ => false,
            };
            Ok(matched)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regexp_function_matches() {
        let conn = Connection::open_in_memory().unwrap();
        register_regexp(&conn).unwrap();
        let hit: bool = conn
            .query_row("SELECT 'hello world' REGEXP '^hel+o'", [], |row| row.get(0))
            .unwrap();
        let miss: bool = conn
            .query_row("SELECT CAST(42 AS TEXT) REGEXP '^4[3-9]$'", [], |row| row.get(0))
            .unwrap();
        assert!(hit);
        assert!(!miss);
    }

    #[test]
    fn oversized_unsigned_values_do_not_bind() {
        let value = Value::UInt(u64::MAX);
        assert!(Param(&value).to_sql().is_err());
        let value = Value::UInt(7);
        assert!(matches!(
            Param(&value).to_sql().unwrap(),
            ToSqlOutput::Owned(SqlValue::Integer(7))
        ));
    }
}
