//! Join aliasing and column resolution.

use rowbind_schema::{Schema, SchemaField};

/// Alias of the root table once any dependency is joined.
pub const ROOT_ALIAS: &str = "t1";

/// Maps a declared field name to the column reference used in SQL.
pub trait ColumnResolver {
    fn resolve(&self, field: &str) -> Option<String>;
}

/// Resolves columns for read statements, allocating join aliases.
///
/// Aliases `t2, t3, …` are handed out in the order joined fields first
/// appear in the schema. Without dependencies no aliasing happens and
/// column references are bare.
#[derive(Debug, Clone)]
pub struct JoinResolver<'a> {
    schema: &'a Schema,
    aliases: Vec<(&'a str, String)>,
}

impl<'a> JoinResolver<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        let mut aliases: Vec<(&'a str, String)> = Vec::new();
        for field in schema.fields() {
            let Some(join) = &field.join else { continue };
            if !aliases.iter().any(|(prefix, _)| *prefix == join.prefix) {
                let alias = format!("t{}", aliases.len() + 2);
                aliases.push((join.prefix.as_str(), alias));
            }
        }
        Self { schema, aliases }
    }

    pub fn is_aliased(&self) -> bool {
        self.schema.has_dependencies()
    }

    /// Alias allocated for a dependency prefix.
    pub fn alias(&self, prefix: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(p, _)| *p == prefix)
            .map(|(_, alias)| alias.as_str())
    }

    /// `FROM` target: `table` or `table t1 INNER JOIN … ON …`.
    pub fn from_clause(&self) -> String {
        if !self.is_aliased() {
            return self.schema.table_name().to_string();
        }
        let mut clause = format!("{} {ROOT_ALIAS}", self.schema.table_name());
        for (prefix, alias) in &self.aliases {
            let Some(dep) = self.schema.dependency(prefix) else {
                continue;
            };
            clause.push_str(&format!(
                " INNER JOIN {} {alias} ON {ROOT_ALIAS}.{} = {alias}.{}",
                dep.schema.table_name(),
                dep.key_column,
                dep.schema.id_column()
            ));
        }
        clause
    }

    /// Qualified (or bare) reference for a schema field.
    pub fn column_ref(&self, field: &SchemaField) -> String {
        match &field.join {
            Some(join) => match self.alias(&join.prefix) {
                Some(alias) => format!("{alias}.{}", field.column),
                None => field.column.clone(),
            },
            None if self.is_aliased() => format!("{ROOT_ALIAS}.{}", field.column),
            None => field.column.clone(),
        }
    }

    /// Comma-joined projection over every field in schema order.
    pub fn projection(&self) -> String {
        self.schema
            .fields()
            .iter()
            .map(|f| self.column_ref(f))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl ColumnResolver for JoinResolver<'_> {
    fn resolve(&self, field: &str) -> Option<String> {
        self.schema.field(field).map(|f| self.column_ref(f))
    }
}

/// Resolves columns for write statements: root fields only, bare names.
#[derive(Debug, Clone, Copy)]
pub struct TableColumns<'a>(pub &'a Schema);

impl ColumnResolver for TableColumns<'_> {
    fn resolve(&self, field: &str) -> Option<String> {
        self.0
            .root_fields()
            .find(|f| f.name == field)
            .map(|f| f.column.clone())
    }
}
