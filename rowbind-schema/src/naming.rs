//! Naming rules used during schema derivation.
//!
//! All functions here are pure: they map record/field identifiers to table
//! and column names, and field kinds to SQL column types.

use crate::descriptor::ColumnKind;

/// Converts a CamelCase identifier to snake_case.
///
/// A new word starts at an uppercase letter that follows a lowercase letter
/// or a digit, or at the last uppercase letter of an acronym run that is
/// followed by a lowercase letter. Acronyms such as `ID` therefore stay a
/// single word: `ProductCategoryID` becomes `product_category_id`.
///
/// Underscores already present in the input are kept.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let starts_word = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if starts_word && !out.ends_with('_') {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }

    out
}

/// Pluralizes an English noun: `y` → `ies`, trailing `s` → `es`, else `s`.
pub fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        format!("{stem}ies")
    } else if word.ends_with('s') {
        format!("{word}es")
    } else {
        format!("{word}s")
    }
}

/// Derives the table name for a record type: namespace prefix plus the
/// pluralized snake_case type name.
pub fn table_name(table_prefix: &str, type_name: &str) -> String {
    format!("{table_prefix}{}", pluralize(&to_snake_case(type_name)))
}

/// Column prefix used for the `ID` and `Flags` columns of a record type.
pub fn column_prefix(type_name: &str) -> String {
    to_snake_case(type_name)
}

/// Default SQL column type for a supported field kind.
pub fn sql_type(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Int | ColumnKind::UInt => "BIGINT",
        ColumnKind::Float => "DOUBLE PRECISION",
        ColumnKind::Text => "VARCHAR(255)",
        ColumnKind::Bool => "BOOLEAN",
    }
}

/// Literal zero value used in `DEFAULT` clauses.
pub fn zero_literal(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Int | ColumnKind::UInt | ColumnKind::Float => "0",
        ColumnKind::Text => "''",
        ColumnKind::Bool => "FALSE",
    }
}
