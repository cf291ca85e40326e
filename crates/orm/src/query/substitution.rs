//! Placeholder rewriting and the literal substitution pass

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, NoExpand, Regex};

use crate::error::QueryError;
use crate::literal::Literal;
use crate::value::{Params, Value};

/// `::` casts are matched first so they are never read as placeholders
static ANY_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"::|\[\[([A-Za-z0-9_]+)\]\]|:([A-Za-z0-9_]+)")
        .expect("placeholder pattern should compile")
});

fn placeholder_pattern(name: &str) -> Result<Regex, QueryError> {
    // `\b` keeps `:id` from matching inside `:identifier`.
    Regex::new(&format!(r":{}\b", regex::escape(name)))
        .map_err(|e| QueryError::InvalidParameter(format!("{}: {}", name, e)))
}

/// Rename a parameter inside SQL text, keeping the placeholder style.
pub(crate) fn rename_placeholder(sql: &str, from: &str, to: &str) -> Result<String, QueryError> {
    let pattern = placeholder_pattern(from)?;
    let replaced = pattern.replace_all(sql, NoExpand(&format!(":{}", to)));
    Ok(replaced.replace(&format!("[[{}]]", from), &format!("[[{}]]", to)))
}

/// Inline every literal parameter and drop it from the map.
///
/// Runs once per build, after all clauses are assembled. Placeholders are
/// matched against the assembled text only, so inlined literal text is
/// never scanned again.
pub fn process_literal(sql: &str, params: Params) -> Result<(String, Params), QueryError> {
    let mut literals: HashMap<String, Literal> = HashMap::new();
    let mut bound = Params::new();

    for (name, value) in params {
        match value {
            Value::Literal(literal) => {
                literals.insert(name, literal);
            }
            other => {
                bound.insert(name, other);
            }
        }
    }

    if literals.is_empty() {
        return Ok((sql.to_string(), bound));
    }

    let sql = ANY_PLACEHOLDER.replace_all(sql, |caps: &Captures| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .and_then(|name| literals.get(name.as_str()))
            .map_or_else(|| caps[0].to_string(), |literal| literal.as_str().to_string())
    });

    Ok((sql.into_owned(), bound))
}
