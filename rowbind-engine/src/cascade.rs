//! Parent→child cascades after deletes.

use crate::error::{EngineError, EngineResult};
use crate::registry::SchemaRegistry;
use crate::sql;
use rowbind_query::QueryCompiler;
use rowbind_schema::{CascadeAction, Schema};
use rusqlite::Connection;
use tracing::{debug, warn};

const OP: &str = "cascade";

/// Largest identifier list bound into one cascade statement. SQLite caps
/// bound variables per statement (32766 by default), so longer lists are
/// split into several statements.
const ID_BATCH: usize = 10_000;

/// Walks the child relations of a schema for a set of deleted identifiers.
///
/// Direct children sit at depth 1. A delete rule recurses into the deleted
/// children's own relations while `depth < max_depth`; there is no cycle
/// detection, so the depth bound also terminates self-referential graphs.
pub(crate) struct Cascade<'a> {
    conn: &'a Connection,
    registry: &'a SchemaRegistry,
    max_depth: u32,
}

impl<'a> Cascade<'a> {
    pub(crate) fn new(conn: &'a Connection, registry: &'a SchemaRegistry, max_depth: u32) -> Self {
        Self {
            conn,
            registry,
            max_depth,
        }
    }

    /// Applies every rule on `schema` to the children of `ids`.
    pub(crate) fn run(&self, schema: &Schema, ids: &[i64]) -> EngineResult<()> {
        if self.max_depth == 0 {
            return Ok(());
        }
        self.visit(schema, ids, 1)
    }

    fn visit(&self, schema: &Schema, ids: &[i64], depth: u32) -> EngineResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        for link in schema.children() {
            let step = format!("{}.{} (depth {depth})", schema.type_name(), link.field);
            let wrap = |source: EngineError| EngineError::Cascade {
                step: step.clone(),
                source: Box::new(source),
            };

            let child = self.registry.get_or_register_ref(link.record).map_err(wrap)?;
            let compiler = QueryCompiler::new(&child.schema, &child.templates);

            match &link.action {
                CascadeAction::Delete => {
                    let mut deleted = Vec::new();
                    for batch in ids.chunks(ID_BATCH) {
                        let query = compiler
                            .delete_in(&link.parent_id_field, batch)
                            .map_err(|e| wrap(EngineError::compile(OP)(e)))?;
                        deleted.extend(
                            sql::returning_ids(self.conn, OP, &query.sql, &query.params)
                                .map_err(wrap)?,
                        );
                    }
                    debug!(step = %step, deleted = deleted.len(), "cascade delete");

                    if depth < self.max_depth {
                        self.visit(&child.schema, &deleted, depth + 1)?;
                    } else if !deleted.is_empty() && !child.schema.children().is_empty() {
                        warn!(
                            step = %step,
                            max_depth = self.max_depth,
                            "cascade depth ceiling reached with rules left unvisited"
                        );
                    }
                }
                CascadeAction::SetField { field, value } => {
                    let mut updated = 0;
                    for batch in ids.chunks(ID_BATCH) {
                        let query = compiler
                            .set_in(field, value, &link.parent_id_field, batch)
                            .map_err(|e| wrap(EngineError::compile(OP)(e)))?;
                        updated += sql::execute(self.conn, OP, &query.sql, &query.params)
                            .map_err(wrap)?;
                    }
                    debug!(step = %step, updated, "cascade set field");
                }
            }
        }
        Ok(())
    }
}
