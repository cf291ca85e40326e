//! Query Builder WHERE clause accumulation

use super::params::{merge_params, next_in_prefix};
use crate::error::QueryError;
use crate::value::{Params, Value};

/// Ordered WHERE fragments with their merged parameters.
#[derive(Debug, Clone, Default)]
pub struct WhereClause {
    fragments: Vec<String>,
    params: Params,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter. Its parameters are merged without overwriting
    /// earlier ones; renamed parameters are rewritten in `filter`.
    pub fn add(&mut self, filter: &str, params: Params) -> Result<(), QueryError> {
        let filter = filter.trim();
        if filter.is_empty() {
            return Ok(());
        }
        let mut filter = filter.to_string();
        merge_params(&mut self.params, &mut filter, params)?;
        self.fragments.push(filter);
        Ok(())
    }

    /// `field IN (:p0, :p1, ...)`. An empty list adds nothing.
    pub fn add_in(&mut self, field: &str, values: Vec<Value>) -> Result<(), QueryError> {
        if values.is_empty() {
            return Ok(());
        }
        let prefix = next_in_prefix(field);
        let mut params = Params::new();
        let placeholders: Vec<String> = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let name = format!("{}_{}", prefix, i);
                let placeholder = format!(":{}", name);
                params.insert(name, value);
                placeholder
            })
            .collect();
        self.add(&format!("{} IN ({})", field, placeholders.join(", ")), params)
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Render the predicate list, user filters first, then `extra`
    /// (soft-delete) predicates. A single predicate renders bare; with
    /// several, each user filter is parenthesized.
    pub fn render(&self, extra: &[String]) -> Option<String> {
        let total = self.fragments.len() + extra.len();
        match total {
            0 => None,
            1 => self
                .fragments
                .first()
                .or_else(|| extra.first())
                .cloned(),
            _ => {
                let parts: Vec<String> = self
                    .fragments
                    .iter()
                    .map(|f| format!("({})", f))
                    .chain(extra.iter().cloned())
                    .collect();
                Some(parts.join(" AND "))
            }
        }
    }
}
