//! Field annotation directives.
//!
//! Directives are whitespace-separated `key` or `key:value` tokens. A value
//! containing whitespace is wrapped in single quotes, e.g.
//! `uniq lenmax:64 db_type:'DOUBLE PRECISION'`.

use crate::error::{SchemaError, SchemaResult};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static SQL_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*( [A-Za-z][A-Za-z0-9_]*)*(\(\d+( ?, ?\d+)?\))?$")
        .expect("static pattern")
});

/// Constraints and overrides collected from a field's directives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAnnotations {
    pub unique: bool,
    pub required: bool,
    pub len_min: Option<usize>,
    pub len_max: Option<usize>,
    pub val_min: Option<i64>,
    pub val_max: Option<i64>,
    pub pattern: Option<String>,
    pub email: bool,
    pub sql_type: Option<String>,
}

impl FieldAnnotations {
    /// Whether no directive was set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Parses a directive string for `field`.
    pub fn parse(field: &str, directives: &str) -> SchemaResult<Self> {
        let mut out = Self::default();
        for token in tokenize(field, directives)? {
            let (key, value) = match token.split_once(':') {
                Some((k, v)) => (k, Some(v)),
                None => (token.as_str(), None),
            };
            let invalid = |reason: &str| SchemaError::InvalidDirective {
                field: field.into(),
                directive: token.clone(),
                reason: reason.into(),
            };

            match (key, value) {
                ("uniq", None) => out.unique = true,
                ("req", None) => out.required = true,
                ("email", None) => out.email = true,
                ("lenmin", Some(v)) => {
                    out.len_min = Some(v.parse().map_err(|_| invalid("expected a length"))?);
                }
                ("lenmax", Some(v)) => {
                    out.len_max = Some(v.parse().map_err(|_| invalid("expected a length"))?);
                }
                ("valmin", Some(v)) => {
                    out.val_min = Some(v.parse().map_err(|_| invalid("expected an integer"))?);
                }
                ("valmax", Some(v)) => {
                    out.val_max = Some(v.parse().map_err(|_| invalid("expected an integer"))?);
                }
                ("regexp", Some(v)) => {
                    Regex::new(v).map_err(|e| invalid(&e.to_string()))?;
                    out.pattern = Some(v.to_string());
                }
                ("db_type", Some(v)) => {
                    if !SQL_TYPE.is_match(v) {
                        return Err(SchemaError::InvalidSqlType {
                            field: field.into(),
                            sql_type: v.into(),
                        });
                    }
                    out.sql_type = Some(v.to_string());
                }
                ("uniq" | "req" | "email", Some(_)) => return Err(invalid("takes no value")),
                ("lenmin" | "lenmax" | "valmin" | "valmax" | "regexp" | "db_type", None) => {
                    return Err(invalid("missing value"));
                }
                _ => return Err(invalid("unknown directive")),
            }
        }

        if let (Some(min), Some(max)) = (out.len_min, out.len_max) {
            if min > max {
                return Err(SchemaError::InvalidDirective {
                    field: field.into(),
                    directive: format!("lenmin:{min} lenmax:{max}"),
                    reason: "minimum exceeds maximum".into(),
                });
            }
        }
        if let (Some(min), Some(max)) = (out.val_min, out.val_max) {
            if min > max {
                return Err(SchemaError::InvalidDirective {
                    field: field.into(),
                    directive: format!("valmin:{min} valmax:{max}"),
                    reason: "minimum exceeds maximum".into(),
                });
            }
        }

        Ok(out)
    }
}

/// Splits a directive string, keeping quoted values intact.
fn tokenize(field: &str, directives: &str) -> SchemaResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in directives.chars() {
        match c {
            '\'' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if quoted {
        return Err(SchemaError::InvalidDirective {
            field: field.into(),
            directive: current,
            reason: "unterminated quote".into(),
        });
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}
