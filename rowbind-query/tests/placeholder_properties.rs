//! Property-based tests for placeholder numbering.
//!
//! Whatever the filter shape, the compiled statement references `$1..$N` in
//! ascending text order and binds exactly N values.

mod common;

use common::{compiled, placeholder_indices, TestStruct};
use proptest::prelude::*;
use rowbind_query::{Filters, QueryCompiler, SelectSpec};
use rowbind_schema::Value;
use std::collections::BTreeMap;

const FIELDS: [&str; 6] = ["Flags", "Email", "EmailSecondary", "Age", "Price", "PostCode2"];
const OPERATORS: [&str; 8] = ["", ":>", ":>=", ":<", ":<=", ":~", ":%", ":&"];

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Int),
        (-1.0e6f64..1.0e6).prop_map(Value::Float),
        "[a-z0-9@.%$?]{0,12}".prop_map(Value::Text),
        any::<bool>().prop_map(Value::Bool),
    ]
}

fn entry_strategy() -> impl Strategy<Value = (String, Value)> {
    (0..FIELDS.len(), 0..OPERATORS.len(), prop::option::of(prop::collection::vec(any::<i64>(), 0..5)), scalar_strategy())
        .prop_map(|(f, o, list, scalar)| {
            let selector = format!("{}{}", FIELDS[f], OPERATORS[o]);
            // Lists are only valid with equality.
            let value = match list {
                Some(items) if o == 0 => Value::from(items),
                _ => scalar,
            };
            (selector, value)
        })
}

/// A raw fragment with one `?` per generated value.
fn raw_strategy() -> impl Strategy<Value = (String, Vec<Value>)> {
    prop::collection::vec(
        (
            0..FIELDS.len(),
            prop_oneof![
                scalar_strategy(),
                prop::collection::vec(any::<i64>(), 0..4).prop_map(Value::from),
            ],
        ),
        1..4,
    )
    .prop_map(|terms| {
        let template = terms
            .iter()
            .map(|(f, v)| match v {
                Value::List(_) => format!(".{} IN (?)", FIELDS[*f]),
                _ => format!(".{} = ?", FIELDS[*f]),
            })
            .collect::<Vec<_>>()
            .join(" OR ");
        (template, terms.into_iter().map(|(_, v)| v).collect())
    })
}

fn filters_strategy() -> impl Strategy<Value = Filters> {
    (
        prop::collection::vec(entry_strategy(), 0..6),
        prop::option::of(raw_strategy()),
        any::<bool>(),
    )
        .prop_map(|(entries, raw, or)| {
            let mut filters = entries
                .into_iter()
                .fold(Filters::new(), |f, (selector, value)| f.with(&selector, value));
            if let Some((template, values)) = raw {
                filters = filters.raw(&template, values);
            }
            if or {
                filters = filters.raw_conjunction(rowbind_query::Conjunction::Or);
            }
            filters
        })
}

fn set_strategy() -> impl Strategy<Value = BTreeMap<String, Value>> {
    prop::collection::btree_map(
        (0..FIELDS.len()).prop_map(|f| FIELDS[f].to_string()),
        scalar_strategy(),
        1..5,
    )
}

fn expected_indices(n: usize) -> Vec<usize> {
    (1..=n).collect()
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn select_placeholders_match_params(filters in filters_strategy(), limit in -3i64..100, offset in -3i64..100) {
        let (schema, templates) = compiled::<TestStruct>();
        let request = SelectSpec::new().filters(filters).limit(limit).offset(offset);
        let query = QueryCompiler::new(&schema, &templates).select(&request).unwrap();
        prop_assert_eq!(placeholder_indices(&query.sql), expected_indices(query.params.len()));
    }

    #[test]
    fn count_placeholders_match_params(filters in filters_strategy()) {
        let (schema, templates) = compiled::<TestStruct>();
        let query = QueryCompiler::new(&schema, &templates).count(&filters).unwrap();
        prop_assert_eq!(placeholder_indices(&query.sql), expected_indices(query.params.len()));
    }

    #[test]
    fn update_where_continues_set_numbering(values in set_strategy(), filters in filters_strategy()) {
        let (schema, templates) = compiled::<TestStruct>();
        let query = QueryCompiler::new(&schema, &templates).update(&values, &filters).unwrap();
        prop_assert_eq!(placeholder_indices(&query.sql), expected_indices(query.params.len()));
        prop_assert!(query.params.len() >= values.len());
    }

    #[test]
    fn cascade_in_lists_bind_every_id(ids in prop::collection::vec(1i64..10_000, 0..20)) {
        let (schema, templates) = compiled::<TestStruct>();
        let compiler = QueryCompiler::new(&schema, &templates);

        let delete = compiler.delete_in("Age", &ids).unwrap();
        prop_assert_eq!(delete.params.len(), ids.len());
        prop_assert_eq!(placeholder_indices(&delete.sql), expected_indices(ids.len()));

        let set = compiler.set_in("Flags", &Value::Int(0), "Age", &ids).unwrap();
        prop_assert_eq!(set.params.len(), ids.len() + 1);
        prop_assert_eq!(placeholder_indices(&set.sql), expected_indices(ids.len() + 1));
    }
}
