//! Explicit record descriptors.
//!
//! A record type describes itself once through [`Record::describe`]. The
//! descriptor lists fields in definition order, the dependencies joined into
//! read queries, and the child relations that cascade on delete.

use crate::error::ValueError;
use crate::value::Value;
use serde::Serialize;
use std::any::TypeId;
use std::fmt;

/// Annotation tag read by default during schema derivation.
pub const DEFAULT_TAG: &str = "sql";

/// Name of the primary key field.
pub const ID_FIELD: &str = "ID";

/// Name of the special-cased 64-bit flags field.
pub const FLAGS_FIELD: &str = "Flags";

/// The declared kind of a record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    UInt,
    Float,
    Text,
    Bool,
    /// Any other type (timestamps, nested structs, slices). Such fields never
    /// become columns.
    Unsupported(String),
}

impl FieldKind {
    /// Column kind for supported field kinds.
    pub fn column_kind(&self) -> Option<ColumnKind> {
        match self {
            Self::Int => Some(ColumnKind::Int),
            Self::UInt => Some(ColumnKind::UInt),
            Self::Float => Some(ColumnKind::Float),
            Self::Text => Some(ColumnKind::Text),
            Self::Bool => Some(ColumnKind::Bool),
            Self::Unsupported(_) => None,
        }
    }
}

/// Kinds that map onto a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Int,
    UInt,
    Float,
    Text,
    Bool,
}

impl ColumnKind {
    /// Zero value of this kind.
    pub fn zero(self) -> Value {
        match self {
            Self::Int => Value::Int(0),
            Self::UInt => Value::UInt(0),
            Self::Float => Value::Float(0.0),
            Self::Text => Value::Text(String::new()),
            Self::Bool => Value::Bool(false),
        }
    }
}

/// A single field of a record definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    /// Raw annotation directives, keyed by tag identifier.
    pub tags: Vec<(String, String)>,
}

impl FieldDescriptor {
    fn simple(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            tags: Vec::new(),
        }
    }

    /// Shorthand for a signed integer field.
    pub fn int(name: &str) -> Self {
        Self::simple(name, FieldKind::Int)
    }

    /// Shorthand for an unsigned integer field.
    pub fn uint(name: &str) -> Self {
        Self::simple(name, FieldKind::UInt)
    }

    /// Shorthand for a floating point field.
    pub fn float(name: &str) -> Self {
        Self::simple(name, FieldKind::Float)
    }

    /// Shorthand for a string field.
    pub fn text(name: &str) -> Self {
        Self::simple(name, FieldKind::Text)
    }

    /// Shorthand for a boolean field.
    pub fn bool(name: &str) -> Self {
        Self::simple(name, FieldKind::Bool)
    }

    /// A field whose type has no column mapping.
    pub fn unsupported(name: &str, type_name: &str) -> Self {
        Self::simple(name, FieldKind::Unsupported(type_name.into()))
    }

    /// Appends directives under the given tag.
    pub fn tag(mut self, tag: &str, directives: &str) -> Self {
        match self.tags.iter_mut().find(|(t, _)| t == tag) {
            Some((_, existing)) => {
                existing.push(' ');
                existing.push_str(directives);
            }
            None => self.tags.push((tag.into(), directives.into())),
        }
        self
    }

    fn directive(self, directive: &str) -> Self {
        self.tag(DEFAULT_TAG, directive)
    }

    fn quoted(key: &str, value: &str) -> String {
        if value.contains(char::is_whitespace) {
            format!("{key}:'{value}'")
        } else {
            format!("{key}:{value}")
        }
    }

    /// Marks the field unique.
    pub fn unique(self) -> Self {
        self.directive("uniq")
    }

    /// Marks the field required (non-zero) for validation.
    pub fn required(self) -> Self {
        self.directive("req")
    }

    /// Restricts the string length.
    pub fn len_range(self, min: usize, max: usize) -> Self {
        self.directive(&format!("lenmin:{min} lenmax:{max}"))
    }

    /// Restricts the numeric value.
    pub fn value_range(self, min: i64, max: i64) -> Self {
        self.directive(&format!("valmin:{min} valmax:{max}"))
    }

    /// Requires string values to match a pattern.
    pub fn pattern(self, pattern: &str) -> Self {
        let directive = Self::quoted("regexp", pattern);
        self.directive(&directive)
    }

    /// Requires string values to look like an email address.
    pub fn email(self) -> Self {
        self.directive("email")
    }

    /// Overrides the derived SQL column type.
    pub fn sql_type(self, sql_type: &str) -> Self {
        let directive = Self::quoted("db_type", sql_type);
        self.directive(&directive)
    }

    /// Directive string for a tag, if any.
    pub fn directives(&self, tag: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, d)| d.as_str())
    }
}

/// Type-erased handle to a [`Record`] implementation.
#[derive(Clone, Copy)]
pub struct RecordRef {
    type_id: TypeId,
    type_name: &'static str,
    describe: fn() -> RecordDescriptor,
}

impl RecordRef {
    /// Handle for record type `T`.
    pub fn of<T: Record>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            describe: T::describe,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type path, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn describe(&self) -> RecordDescriptor {
        (self.describe)()
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordRef").field(&self.type_name).finish()
    }
}

impl PartialEq for RecordRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

/// A record joined into read queries under a field-name prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub prefix: String,
    pub record: RecordRef,
}

/// What happens to child rows when their parent is deleted.
#[derive(Debug, Clone, PartialEq)]
pub enum CascadeAction {
    /// Delete the child rows, then recurse into their own rules.
    Delete,
    /// Set a child field to a fixed value (typically zeroing the parent reference).
    SetField { field: String, value: Value },
}

/// A cascade rule attached to a child relation.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeRule {
    pub action: CascadeAction,
    /// Child field holding the parent identifier. Defaults to `<ParentType>ID`.
    pub parent_id_field: Option<String>,
}

impl CascadeRule {
    /// Delete child rows.
    pub fn delete() -> Self {
        Self {
            action: CascadeAction::Delete,
            parent_id_field: None,
        }
    }

    /// Set a child field to `value`.
    pub fn set_field(field: &str, value: impl Into<Value>) -> Self {
        Self {
            action: CascadeAction::SetField {
                field: field.into(),
                value: value.into(),
            },
            parent_id_field: None,
        }
    }

    /// Uses a custom child field as the parent reference.
    pub fn via(mut self, parent_id_field: &str) -> Self {
        self.parent_id_field = Some(parent_id_field.into());
        self
    }
}

/// A slice-of-children field carrying a cascade rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildRelation {
    pub field: String,
    pub record: RecordRef,
    pub rule: CascadeRule,
}

/// The full description of a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDescriptor {
    pub type_name: String,
    pub fields: Vec<FieldDescriptor>,
    pub dependencies: Vec<Dependency>,
    pub children: Vec<ChildRelation>,
}

impl RecordDescriptor {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
            dependencies: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Appends a field. Definition order is preserved.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Declares a joined dependency exposed as `<prefix>_<Field>` members.
    pub fn join<D: Record>(mut self, prefix: &str) -> Self {
        self.dependencies.push(Dependency {
            prefix: prefix.into(),
            record: RecordRef::of::<D>(),
        });
        self
    }

    /// Declares a slice-of-children field with a cascade rule.
    pub fn children<C: Record>(mut self, field: &str, rule: CascadeRule) -> Self {
        self.children.push(ChildRelation {
            field: field.into(),
            record: RecordRef::of::<C>(),
            rule,
        });
        self
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A record type the engine can persist.
///
/// `Default` provides the zero value used when a load finds no row or a
/// delete completes.
pub trait Record: Default + 'static {
    /// Describes the record's fields, joins and child relations.
    fn describe() -> RecordDescriptor;

    /// Returns the current value of a field by its declared name.
    fn field_value(&self, name: &str) -> Option<Value>;

    /// Writes a field by its declared name.
    fn set_field_value(&mut self, name: &str, value: Value) -> Result<(), ValueError>;

    /// The primary key; zero means "not yet stored".
    fn id(&self) -> i64 {
        self.field_value(ID_FIELD)
            .and_then(|v| v.as_i64())
            .unwrap_or(0)
    }

    fn set_id(&mut self, id: i64) -> Result<(), ValueError> {
        self.set_field_value(ID_FIELD, Value::Int(id))
    }
}

/// Implements [`Record::field_value`] and [`Record::set_field_value`] for a
/// list of `struct_field => "DeclaredName"` pairs.
///
/// ```ignore
/// impl Record for User {
///     fn describe() -> RecordDescriptor { /* ... */ }
///     rowbind_schema::record_fields! { id => "ID", name => "Name" }
/// }
/// ```
#[macro_export]
macro_rules! record_fields {
    ($($field:ident => $name:literal),+ $(,)?) => {
        fn field_value(&self, name: &str) -> ::core::option::Option<$crate::Value> {
            match name {
                $($name => ::core::option::Option::Some(
                    $crate::Value::from(::core::clone::Clone::clone(&self.$field)),
                ),)+
                _ => ::core::option::Option::None,
            }
        }

        fn set_field_value(
            &mut self,
            name: &str,
            value: $crate::Value,
        ) -> ::core::result::Result<(), $crate::ValueError> {
            match name {
                $($name => {
                    self.$field = $crate::FromValue::from_value(value)?;
                    ::core::result::Result::Ok(())
                })+
                _ => ::core::result::Result::Err(
                    $crate::ValueError::UnknownField(::std::string::ToString::to_string(name)),
                ),
            }
        }
    };
}
