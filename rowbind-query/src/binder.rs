//! Positional placeholder bookkeeping.
//!
//! Every dynamically assembled statement threads a single [`ParamBinder`]
//! through each fragment it compiles (SET, then WHERE, then the raw
//! fragment). The binder hands out `$N` placeholders in ascending order and
//! records the bound values in the same order, so the statement text and the
//! parameter list can never drift apart.

use rowbind_schema::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct ParamBinder {
    next: usize,
    values: Vec<Value>,
}

impl Default for ParamBinder {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamBinder {
    /// A binder whose first placeholder is `$1`.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// A binder whose first placeholder is `$first`.
    pub fn starting_at(first: usize) -> Self {
        Self {
            next: first.max(1),
            values: Vec::new(),
        }
    }

    /// Binds one value and returns its placeholder.
    ///
    /// A list expands to one placeholder per element, comma-joined, in
    /// element order. An empty list yields `NULL` so that `IN (NULL)`
    /// matches nothing.
    pub fn bind(&mut self, value: Value) -> String {
        match value {
            Value::List(items) if items.is_empty() => "NULL".to_string(),
            Value::List(items) => items
                .into_iter()
                .map(|item| self.bind(item))
                .collect::<Vec<_>>()
                .join(","),
            scalar => {
                let placeholder = format!("${}", self.next);
                self.next += 1;
                self.values.push(scalar);
                placeholder
            }
        }
    }

    /// Binds every value and returns their comma-joined placeholders.
    pub fn bind_all(&mut self, values: impl IntoIterator<Item = Value>) -> String {
        values
            .into_iter()
            .map(|v| self.bind(v))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Index the next bound value will receive.
    pub fn next_index(&self) -> usize {
        self.next
    }

    /// Number of values bound so far.
    pub fn consumed(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// `$from,$from+1,…` for `count` placeholders.
pub fn placeholders(from: usize, count: usize) -> String {
    (from..from + count)
        .map(|n| format!("${n}"))
        .collect::<Vec<_>>()
        .join(",")
}
