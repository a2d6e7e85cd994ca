//! Filter sets and WHERE / SET compilation.

use crate::binder::ParamBinder;
use crate::error::{QueryError, QueryResult};
use crate::join::ColumnResolver;
use regex_lite::{Captures, Regex};
use rowbind_schema::{Value, ID_FIELD};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

/// Reserved key holding the raw fragment: `[template, v1, …, vn]`.
pub const RAW_KEY: &str = "_raw";

/// Reserved key selecting how the raw fragment combines with field filters.
pub const RAW_CONJUNCTION_KEY: &str = "_rawConjuction";

/// A quoted SQL literal (left untouched) or a `.Field` token (capture 1).
static FIELD_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"'(?:[^']|'')*'|\.([A-Za-z][A-Za-z0-9_]*)").expect("static pattern")
});

/// Comparison operator of a `Field:op` selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// `~`: regular expression match on the column cast to text.
    Regex,
    /// `%`: SQL `LIKE`.
    Like,
    /// `&`: bitmask overlap.
    BitAnd,
}

impl Operator {
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "" | "=" => Some(Self::Eq),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Gte),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Lte),
            "~" => Some(Self::Regex),
            "%" => Some(Self::Like),
            "&" => Some(Self::BitAnd),
            _ => None,
        }
    }

    fn render(self, column: &str, placeholder: &str) -> String {
        match self {
            Self::Eq => format!("{column}={placeholder}"),
            Self::Gt => format!("{column}>{placeholder}"),
            Self::Gte => format!("{column}>={placeholder}"),
            Self::Lt => format!("{column}<{placeholder}"),
            Self::Lte => format!("{column}<={placeholder}"),
            Self::Regex => format!("CAST({column} AS TEXT) REGEXP {placeholder}"),
            Self::Like => format!("{column} LIKE {placeholder}"),
            Self::BitAnd => format!("({column} & {placeholder}) > 0"),
        }
    }
}

/// How the raw fragment joins the field-based clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Escape-hatch WHERE fragment with `.Field` and `?` tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFilter {
    pub template: String,
    pub values: Vec<Value>,
}

/// A parsed `Field` / `Field:op` selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selector<'a> {
    pub field: &'a str,
    pub operator: Operator,
}

impl<'a> Selector<'a> {
    pub fn parse(selector: &'a str) -> QueryResult<Self> {
        let (field, op) = selector.split_once(':').unwrap_or((selector, ""));
        let operator = Operator::parse(op).ok_or_else(|| QueryError::UnknownOperator {
            selector: selector.into(),
            op: op.into(),
        })?;
        Ok(Self { field, operator })
    }
}

/// A filter set: selector → value, plus an optional raw fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    entries: BTreeMap<String, Value>,
    raw: Option<RawFilter>,
    raw_conjunction: Conjunction,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a selector (`Field` or `Field:op`).
    pub fn with(mut self, selector: &str, value: impl Into<Value>) -> Self {
        self.entries.insert(selector.into(), value.into());
        self
    }

    /// Adds an equality filter.
    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.with(field, value)
    }

    /// Sets the raw fragment.
    pub fn raw(mut self, template: &str, values: Vec<Value>) -> Self {
        self.raw = Some(RawFilter {
            template: template.into(),
            values,
        });
        self
    }

    pub fn raw_conjunction(mut self, conjunction: Conjunction) -> Self {
        self.raw_conjunction = conjunction;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.raw.is_none()
    }

    pub fn entries(&self) -> &BTreeMap<String, Value> {
        &self.entries
    }

    pub fn raw_filter(&self) -> Option<&RawFilter> {
        self.raw.as_ref()
    }

    pub fn conjunction(&self) -> Conjunction {
        self.raw_conjunction
    }

    /// Parses the JSON wire format.
    ///
    /// ```json
    /// {"Price": 4444, "Age:>": 30, "_raw": [".Price > ? OR .ID IN (?)", 10, [1, 2]], "_rawConjuction": "OR"}
    /// ```
    pub fn from_json(json: &serde_json::Value) -> QueryResult<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| QueryError::InvalidFilter("expected an object".into()))?;

        let mut filters = Self::new();
        for (key, value) in object {
            match key.as_str() {
                RAW_KEY => {
                    let items = value.as_array().ok_or_else(|| {
                        QueryError::InvalidFilter(format!("{RAW_KEY} must be an array"))
                    })?;
                    let (template, rest) = items.split_first().ok_or_else(|| {
                        QueryError::InvalidFilter(format!("{RAW_KEY} is empty"))
                    })?;
                    let template = template.as_str().ok_or_else(|| {
                        QueryError::InvalidFilter(format!("{RAW_KEY} template must be a string"))
                    })?;
                    let values = rest
                        .iter()
                        .map(|v| {
                            Value::from_json(v).map_err(|e| QueryError::InvalidFilter(e.to_string()))
                        })
                        .collect::<QueryResult<Vec<_>>>()?;
                    filters = filters.raw(template, values);
                }
                RAW_CONJUNCTION_KEY => {
                    let conjunction = value
                        .as_str()
                        .and_then(Conjunction::parse)
                        .ok_or_else(|| {
                            QueryError::InvalidFilter(format!("{RAW_CONJUNCTION_KEY} must be AND or OR"))
                        })?;
                    filters = filters.raw_conjunction(conjunction);
                }
                selector => {
                    let value = Value::from_json(value).map_err(|e| {
                        QueryError::InvalidFilter(format!("{selector}: {e}"))
                    })?;
                    filters.entries.insert(selector.into(), value);
                }
            }
        }
        Ok(filters)
    }
}

/// Compiles [`Filters`] into SQL fragments against a column resolver.
///
/// In strict mode unknown selectors and unresolvable raw tokens are errors;
/// otherwise they are dropped (selectors) or left untouched (tokens).
#[derive(Clone, Copy)]
pub struct FilterCompiler<'a> {
    resolver: &'a dyn ColumnResolver,
    strict: bool,
}

impl<'a> FilterCompiler<'a> {
    pub fn new(resolver: &'a dyn ColumnResolver, strict: bool) -> Self {
        Self { resolver, strict }
    }

    /// Compiles the WHERE clause body (without the keyword). Empty filters
    /// yield an empty string.
    pub fn compile_where(&self, filters: &Filters, binder: &mut ParamBinder) -> QueryResult<String> {
        let fields = self.compile_fields(filters, binder)?;
        let raw = match &filters.raw {
            Some(raw) => Some(self.compile_raw(raw, binder)?),
            None => None,
        };

        Ok(match (fields.is_empty(), raw) {
            (_, None) => fields,
            (true, Some(raw)) => raw,
            (false, Some(raw)) => format!(
                "({fields}) {} ({raw})",
                filters.raw_conjunction.as_sql()
            ),
        })
    }

    fn compile_fields(&self, filters: &Filters, binder: &mut ParamBinder) -> QueryResult<String> {
        let mut resolved = Vec::with_capacity(filters.entries.len());
        for (key, value) in &filters.entries {
            let selector = Selector::parse(key)?;
            let Some(column) = self.resolve(selector.field)? else {
                continue;
            };
            resolved.push((column, key.as_str(), selector.operator, value));
        }
        // Placeholder order follows the resolved column name.
        resolved.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

        let mut parts = Vec::with_capacity(resolved.len());
        for (column, key, operator, value) in resolved {
            let part = match (operator, value) {
                (Operator::Eq, Value::List(_)) => {
                    format!("{column} IN ({})", binder.bind(value.clone()))
                }
                (_, Value::List(_)) => return Err(QueryError::ListNotAllowed(key.into())),
                (op, scalar) => op.render(&column, &binder.bind(scalar.clone())),
            };
            parts.push(part);
        }
        Ok(parts.join(" AND "))
    }

    fn compile_raw(&self, raw: &RawFilter, binder: &mut ParamBinder) -> QueryResult<String> {
        let mut unknown = None;
        let template = FIELD_TOKEN.replace_all(&raw.template, |caps: &Captures<'_>| {
            let Some(name) = caps.get(1).map(|m| m.as_str()) else {
                return caps[0].to_string();
            };
            match self.resolver.resolve(name) {
                Some(column) => column,
                None => {
                    if unknown.is_none() {
                        unknown = Some(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });
        if let Some(name) = unknown {
            if self.strict {
                return Err(QueryError::UnknownField(name));
            }
            debug!(field = %name, "leaving unresolved raw filter token");
        }

        let placeholders = quoted_chars(&template)
            .filter(|&(quoted, c)| c == '?' && !quoted)
            .count();
        if placeholders != raw.values.len() {
            return Err(QueryError::RawArity {
                placeholders,
                values: raw.values.len(),
            });
        }

        let mut values = raw.values.iter();
        let mut out = String::with_capacity(template.len() + placeholders * 2);
        for (quoted, c) in quoted_chars(&template) {
            if c == '?' && !quoted {
                if let Some(value) = values.next() {
                    out.push_str(&binder.bind(value.clone()));
                    continue;
                }
            }
            out.push(c);
        }
        Ok(out)
    }

    /// Compiles a bulk-update SET list (without the keyword).
    pub fn compile_set(
        &self,
        values: &BTreeMap<String, Value>,
        binder: &mut ParamBinder,
    ) -> QueryResult<String> {
        let mut resolved = Vec::with_capacity(values.len());
        for (field, value) in values {
            if field == ID_FIELD {
                return Err(QueryError::ImmutableField(field.clone()));
            }
            if matches!(value, Value::List(_)) {
                return Err(QueryError::ListNotAllowed(field.clone()));
            }
            let Some(column) = self.resolve(field)? else {
                continue;
            };
            resolved.push((column, value));
        }
        if resolved.is_empty() {
            return Err(QueryError::EmptySet);
        }
        resolved.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(resolved
            .into_iter()
            .map(|(column, value)| format!("{column}={}", binder.bind(value.clone())))
            .collect::<Vec<_>>()
            .join(","))
    }

    /// Resolves a field, honoring strictness. `Ok(None)` means "drop it".
    pub(crate) fn resolve(&self, field: &str) -> QueryResult<Option<String>> {
        match self.resolver.resolve(field) {
            Some(column) => Ok(Some(column)),
            None if self.strict => Err(QueryError::UnknownField(field.into())),
            None => {
                debug!(field = %field, "dropping unknown selector");
                Ok(None)
            }
        }
    }
}

/// Characters of `sql`, each flagged when it sits inside a `'…'` literal.
fn quoted_chars(sql: &str) -> impl Iterator<Item = (bool, char)> + '_ {
    let mut quoted = false;
    sql.chars().map(move |c| {
        if c == '\'' {
            quoted = !quoted;
            // Quote characters themselves count as part of the literal.
            return (true, c);
        }
        (quoted, c)
    })
}
