//! Fixed statements built once per schema.

use crate::binder::placeholders;
use crate::join::JoinResolver;
use rowbind_schema::{Schema, SchemaField};

/// The full set of fixed statements for one schema.
///
/// Column order in every statement is the schema's field order. Read
/// statements (`select_*`) are join-aware; write statements always address
/// the bare table and only its own columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplates {
    pub drop_table: String,
    pub create_table: String,
    /// Binds the data fields, returns the generated identifier.
    pub insert: String,
    /// Binds the root fields (ID first) twice.
    pub upsert: String,
    /// Binds the data fields followed by the identifier.
    pub update_by_id: String,
    pub select_by_id: String,
    pub delete_by_id: String,
    pub select_prefix: String,
    pub select_count_prefix: String,
    pub delete_prefix: String,
    /// `UPDATE table SET `; the SET list and WHERE clause are appended.
    pub update_prefix: String,
}

impl QueryTemplates {
    pub fn build(schema: &Schema) -> Self {
        let table = schema.table_name();
        let id_column = schema.id_column();
        let resolver = JoinResolver::new(schema);

        let data: Vec<&SchemaField> = schema.data_fields().collect();
        let root: Vec<&SchemaField> = schema.root_fields().collect();
        let data_columns = join_columns(&data);
        let root_columns = join_columns(&root);

        let mut definitions = vec![format!("{id_column} INTEGER PRIMARY KEY AUTOINCREMENT")];
        definitions.extend(data.iter().map(|f| f.column_definition()));

        let insert = if data.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES RETURNING {id_column}")
        } else {
            format!(
                "INSERT INTO {table}({data_columns}) VALUES ({}) RETURNING {id_column}",
                placeholders(1, data.len())
            )
        };

        // Second placeholder block continues after the INSERT's own block,
        // referencing the same values in the same order.
        let n = root.len();
        let upsert_set = root
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{}=${}", f.column, n + 1 + i))
            .collect::<Vec<_>>()
            .join(",");
        let upsert = format!(
            "INSERT INTO {table}({root_columns}) VALUES ({}) ON CONFLICT({id_column}) DO UPDATE SET {upsert_set}",
            placeholders(1, n)
        );

        let update_set = if data.is_empty() {
            format!("{id_column}={id_column}")
        } else {
            data.iter()
                .enumerate()
                .map(|(i, f)| format!("{}=${}", f.column, i + 1))
                .collect::<Vec<_>>()
                .join(",")
        };
        let update_by_id = format!(
            "UPDATE {table} SET {update_set} WHERE {id_column}=${}",
            data.len() + 1
        );

        let from = resolver.from_clause();
        let select_prefix = format!("SELECT {} FROM {from}", resolver.projection());
        let select_by_id = format!(
            "{select_prefix} WHERE {}=$1",
            resolver.column_ref(schema.id_field())
        );

        Self {
            drop_table: format!("DROP TABLE IF EXISTS {table}"),
            create_table: format!("CREATE TABLE {table} ({})", definitions.join(",")),
            insert,
            upsert,
            update_by_id,
            select_by_id,
            delete_by_id: format!("DELETE FROM {table} WHERE {id_column}=$1"),
            select_prefix,
            select_count_prefix: format!("SELECT COUNT(*) AS cnt FROM {from}"),
            delete_prefix: format!("DELETE FROM {table}"),
            update_prefix: format!("UPDATE {table} SET "),
        }
    }
}

fn join_columns(fields: &[&SchemaField]) -> String {
    fields
        .iter()
        .map(|f| f.column.as_str())
        .collect::<Vec<_>>()
        .join(",")
}
