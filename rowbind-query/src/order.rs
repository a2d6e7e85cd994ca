//! ORDER BY and LIMIT/OFFSET fragments.

use crate::error::QueryResult;
use crate::filter::FilterCompiler;

/// Sort direction of an order pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    /// `desc` in any case is descending; anything else ascends.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FilterCompiler<'_> {
    /// Compiles a flat `[field, direction, …]` list into an ORDER BY body.
    ///
    /// Pairs keep their input order. A non-empty `allowed` list drops every
    /// pair whose field is not on it; a trailing field without a direction
    /// sorts ascending.
    pub fn compile_order(&self, order: &[String], allowed: &[String]) -> QueryResult<String> {
        let mut parts = Vec::with_capacity(order.len() / 2 + 1);
        for pair in order.chunks(2) {
            let field = pair[0].as_str();
            if !allowed.is_empty() && !allowed.iter().any(|a| a == field) {
                continue;
            }
            let direction = pair.get(1).map_or(Direction::Asc, |d| Direction::parse(d));
            let Some(column) = self.resolve(field)? else {
                continue;
            };
            parts.push(format!("{column} {}", direction.as_sql()));
        }
        Ok(parts.join(","))
    }
}

/// `LIMIT n OFFSET m`, with `limit < 1` replaced by `default_limit` and a
/// negative offset clamped to zero.
pub fn compile_limit(limit: i64, offset: i64, default_limit: i64) -> String {
    let limit = if limit < 1 { default_limit.max(1) } else { limit };
    format!("LIMIT {limit} OFFSET {}", offset.max(0))
}
