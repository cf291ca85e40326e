//! Collision-safe parameter merging

use std::sync::atomic::{AtomicU64, Ordering};

use super::substitution::rename_placeholder;
use crate::error::QueryError;
use crate::value::{Params, Value};

static IN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique prefix for the parameters of one `where_in` call.
pub(crate) fn next_in_prefix(field: &str) -> String {
    let n = IN_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}_in{}", param_name(field), n)
}

/// Parameter name derived from a column expression (`u.id` becomes `u_id`).
pub fn param_name(field: &str) -> String {
    let name: String = field
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.is_empty() {
        "p".to_string()
    } else {
        name
    }
}

/// Parameter name for `field` that is not yet bound in `taken`.
///
/// Distinct columns can map to the same name (`a.b` and `a_b`), so a taken
/// name gets a `_{k}` suffix.
pub(crate) fn unique_param_name(field: &str, taken: &Params) -> String {
    let name = param_name(field);
    if taken.contains_key(&name) {
        free_name(&name, taken, &[])
    } else {
        name
    }
}

/// Merge `incoming` into `target`.
///
/// A name already bound to an equal value is shared. A name bound to a
/// different value is renamed to `{name}_{k}` and rewritten in `sql`, the
/// text that references the incoming parameters.
pub(crate) fn merge_params(
    target: &mut Params,
    sql: &mut String,
    incoming: Params,
) -> Result<(), QueryError> {
    let incoming_names: Vec<String> = incoming.keys().cloned().collect();

    for (name, value) in incoming {
        match target.get(&name) {
            None => {
                target.insert(name, value);
            }
            Some(existing) if *existing == value => {}
            Some(_) => {
                let renamed = free_name(&name, target, &incoming_names);
                *sql = rename_placeholder(sql, &name, &renamed)?;
                target.insert(renamed, value);
            }
        }
    }

    Ok(())
}

/// Set a column value, replacing an earlier value for the same column.
pub(crate) fn set_column(columns: &mut Vec<(String, Value)>, field: &str, value: Value) {
    match columns.iter_mut().find(|(name, _)| name == field) {
        Some(entry) => entry.1 = value,
        None => columns.push((field.to_string(), value)),
    }
}

fn free_name(name: &str, target: &Params, reserved: &[String]) -> String {
    (1..)
        .map(|k| format!("{}_{}", name, k))
        .find(|candidate| !target.contains_key(candidate) && !reserved.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn test_equal_values_share_a_name() {
        let mut target = params! { "id" => 5 };
        let mut sql = "id = :id".to_string();
        merge_params(&mut target, &mut sql, params! { "id" => 5 }).unwrap();

        assert_eq!(sql, "id = :id");
        assert_eq!(target.len(), 1);
    }

    #[test]
    fn test_conflicting_value_is_renamed() {
        let mut target = params! { "id" => 5, "id_1" => 6 };
        let mut sql = "other.id = :id".to_string();
        merge_params(&mut target, &mut sql, params! { "id" => 9 }).unwrap();

        assert_eq!(sql, "other.id = :id_2");
        assert_eq!(target["id"], Value::Int(5));
        assert_eq!(target["id_2"], Value::Int(9));
    }

    #[test]
    fn test_renaming_avoids_incoming_names() {
        let mut target = params! { "a" => 1 };
        let mut sql = ":a + :a_1".to_string();
        merge_params(&mut target, &mut sql, params! { "a" => 2, "a_1" => 3 }).unwrap();

        assert_eq!(sql, ":a_2 + :a_1");
        assert_eq!(target["a_2"], Value::Int(2));
        assert_eq!(target["a_1"], Value::Int(3));
    }

    #[test]
    fn test_unique_param_name_skips_bound_names() {
        let taken = params! { "a_b" => 1, "a_b_1" => 2 };
        assert_eq!(unique_param_name("a.b", &taken), "a_b_2");
        assert_eq!(unique_param_name("c", &taken), "c");
    }

    #[test]
    fn test_in_prefixes_are_unique() {
        assert_ne!(next_in_prefix("id"), next_in_prefix("id"));
        assert!(next_in_prefix("u.id").starts_with("u_id_in"));
    }
}
