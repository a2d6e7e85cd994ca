//! Schema derivation from record descriptors.

use crate::annotations::FieldAnnotations;
use crate::descriptor::{
    CascadeAction, ColumnKind, FLAGS_FIELD, ID_FIELD, RecordDescriptor, RecordRef, DEFAULT_TAG,
};
use crate::error::{SchemaError, SchemaResult};
use crate::naming;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Where a joined field's value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinSource {
    /// Dependency prefix (`Foo` in `Foo_Bar`).
    pub prefix: String,
    /// Field of the dependency (`Bar` in `Foo_Bar`).
    pub field: String,
}

/// A column-backed field of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaField {
    pub name: String,
    pub kind: ColumnKind,
    pub column: String,
    pub sql_type: String,
    pub annotations: FieldAnnotations,
    /// Set for `Prefix_Field` members pulled in through a join.
    pub join: Option<JoinSource>,
}

impl SchemaField {
    pub fn is_id(&self) -> bool {
        self.join.is_none() && self.name == ID_FIELD
    }

    pub fn is_joined(&self) -> bool {
        self.join.is_some()
    }

    /// `column TYPE NOT NULL DEFAULT zero [UNIQUE]`, as used by CREATE TABLE.
    pub fn column_definition(&self) -> String {
        let mut def = format!(
            "{} {} NOT NULL DEFAULT {}",
            self.column,
            self.sql_type,
            naming::zero_literal(self.kind)
        );
        if self.annotations.unique {
            def.push_str(" UNIQUE");
        }
        def
    }
}

/// A dependency joined into read queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinDependency {
    pub prefix: String,
    /// Root column holding the dependency's identifier (`<prefix>_id`).
    pub key_column: String,
    pub schema: Schema,
}

/// A resolved child relation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildLink {
    pub field: String,
    #[serde(skip)]
    pub record: RecordRef,
    #[serde(skip)]
    pub action: CascadeAction,
    /// Child field referencing the parent identifier.
    pub parent_id_field: String,
}

/// Options for [`Schema::reflect`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReflectOptions<'a> {
    /// Namespace prepended to every derived table name.
    pub table_prefix: &'a str,
    /// Forces the table name instead of deriving it.
    pub table_name: Option<&'a str>,
    /// Schema whose annotations are inherited by fields without their own.
    pub base: Option<&'a Schema>,
    /// Annotation tag to read; defaults to [`DEFAULT_TAG`].
    pub tag: Option<&'a str>,
}

/// The relational mapping of one record type.
///
/// Field order is fixed here and drives column and placeholder order in
/// every generated statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    type_name: String,
    table_name: String,
    column_prefix: String,
    fields: Vec<SchemaField>,
    #[serde(skip)]
    id_index: usize,
    dependencies: Vec<JoinDependency>,
    children: Vec<ChildLink>,
}

impl Schema {
    /// Derives a schema from a descriptor.
    pub fn reflect(descriptor: &RecordDescriptor, options: &ReflectOptions<'_>) -> SchemaResult<Self> {
        let tag = options.tag.unwrap_or(DEFAULT_TAG);
        let type_name = descriptor.type_name.clone();
        let column_prefix = naming::column_prefix(&type_name);
        let table_name = options.table_name.map_or_else(
            || naming::table_name(options.table_prefix, &type_name),
            ToString::to_string,
        );

        let mut dependencies = Vec::with_capacity(descriptor.dependencies.len());
        for dep in &descriptor.dependencies {
            let dep_options = ReflectOptions {
                table_prefix: options.table_prefix,
                tag: options.tag,
                ..Default::default()
            };
            // Joins are one level deep; a dependency's own joins are not expanded.
            let mut dep_descriptor = dep.record.describe();
            dep_descriptor.dependencies.clear();
            let schema = Self::reflect(&dep_descriptor, &dep_options)?;
            dependencies.push(JoinDependency {
                prefix: dep.prefix.clone(),
                key_column: String::new(),
                schema,
            });
        }

        let mut fields = Vec::with_capacity(descriptor.fields.len());
        for field in &descriptor.fields {
            let Some(kind) = field.kind.column_kind() else {
                debug!(record = %type_name, field = %field.name, "skipping field of unsupported kind");
                continue;
            };

            if let Some((prefix, member)) = field.name.split_once('_') {
                let source = dependencies
                    .iter()
                    .find(|d| d.prefix == prefix)
                    .and_then(|d| d.schema.field(member).filter(|f| !f.is_joined()));
                let Some(source) = source else {
                    debug!(record = %type_name, field = %field.name, "skipping unresolvable joined field");
                    continue;
                };
                fields.push(SchemaField {
                    name: field.name.clone(),
                    kind: source.kind,
                    column: source.column.clone(),
                    sql_type: source.sql_type.clone(),
                    annotations: FieldAnnotations::default(),
                    join: Some(JoinSource {
                        prefix: prefix.into(),
                        field: member.into(),
                    }),
                });
                continue;
            }

            let annotations = match field.directives(tag) {
                Some(directives) => FieldAnnotations::parse(&field.name, directives)?,
                None => options
                    .base
                    .and_then(|base| base.field(&field.name))
                    .map(|f| f.annotations.clone())
                    .unwrap_or_default(),
            };

            let (column, sql_type) = if field.name == ID_FIELD {
                if annotations.sql_type.is_some() {
                    return Err(SchemaError::InvalidDirective {
                        field: field.name.clone(),
                        directive: "db_type".into(),
                        reason: "the primary key type cannot be overridden".into(),
                    });
                }
                (format!("{column_prefix}_id"), "INTEGER".to_string())
            } else if field.name == FLAGS_FIELD {
                (format!("{column_prefix}_flags"), "BIGINT".to_string())
            } else {
                let sql_type = annotations
                    .sql_type
                    .clone()
                    .unwrap_or_else(|| naming::sql_type(kind).to_string());
                (naming::to_snake_case(&field.name), sql_type)
            };

            fields.push(SchemaField {
                name: field.name.clone(),
                kind,
                column,
                sql_type,
                annotations,
                join: None,
            });
        }

        let Some(id_index) = fields.iter().position(SchemaField::is_id) else {
            return Err(SchemaError::MissingId(type_name));
        };

        for dep in &mut dependencies {
            let key_field = format!("{}ID", dep.prefix);
            let key = fields
                .iter()
                .find(|f| !f.is_joined() && f.name == key_field)
                .ok_or_else(|| SchemaError::MissingJoinKey {
                    record: type_name.clone(),
                    prefix: dep.prefix.clone(),
                })?;
            dep.key_column = key.column.clone();
        }

        let mut children = Vec::with_capacity(descriptor.children.len());
        for relation in &descriptor.children {
            let child = relation.record.describe();
            let parent_id_field = relation
                .rule
                .parent_id_field
                .clone()
                .unwrap_or_else(|| format!("{type_name}ID"));
            let mut referenced = vec![parent_id_field.as_str()];
            if let CascadeAction::SetField { field, .. } = &relation.rule.action {
                referenced.push(field);
            }
            for name in referenced {
                if child.find_field(name).is_none() {
                    return Err(SchemaError::UnknownCascadeField {
                        parent: type_name.clone(),
                        child: child.type_name.clone(),
                        field: name.into(),
                    });
                }
            }
            children.push(ChildLink {
                field: relation.field.clone(),
                record: relation.record,
                action: relation.rule.action.clone(),
                parent_id_field,
            });
        }

        Ok(Self {
            type_name,
            table_name,
            column_prefix,
            fields,
            id_index,
            dependencies,
            children,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn column_prefix(&self) -> &str {
        &self.column_prefix
    }

    /// All column-backed fields in definition order.
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Fields stored in this schema's own table.
    pub fn root_fields(&self) -> impl Iterator<Item = &SchemaField> {
        self.fields.iter().filter(|f| !f.is_joined())
    }

    /// Root fields except the primary key.
    pub fn data_fields(&self) -> impl Iterator<Item = &SchemaField> {
        self.root_fields().filter(|f| !f.is_id())
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn id_field(&self) -> &SchemaField {
        &self.fields[self.id_index]
    }

    pub fn id_column(&self) -> &str {
        &self.id_field().column
    }

    /// Names of fields annotated `uniq`.
    pub fn unique_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.annotations.unique)
            .map(|f| f.name.as_str())
    }

    /// Field name → overridden SQL type.
    pub fn overrides(&self) -> BTreeMap<&str, &str> {
        self.fields
            .iter()
            .filter_map(|f| {
                f.annotations
                    .sql_type
                    .as_deref()
                    .map(|t| (f.name.as_str(), t))
            })
            .collect()
    }

    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }

    pub fn dependencies(&self) -> &[JoinDependency] {
        &self.dependencies
    }

    pub fn dependency(&self, prefix: &str) -> Option<&JoinDependency> {
        self.dependencies.iter().find(|d| d.prefix == prefix)
    }

    pub fn children(&self) -> &[ChildLink] {
        &self.children
    }
}
