//! Recursive common table expressions

use super::params::merge_params;
use crate::error::QueryError;
use crate::value::Params;

#[derive(Debug, Clone)]
struct RecursiveColumn {
    name: String,
    base: String,
    step: String,
}

/// `WITH RECURSIVE name(cols) AS (SELECT base... UNION ALL SELECT step... FROM name ...)`
///
/// Every column carries the expression used in the anchor select and the
/// one used in the recursive select.
#[derive(Debug, Clone)]
pub struct Recursive {
    name: String,
    columns: Vec<RecursiveColumn>,
    base_table: Option<String>,
    base_filter: Option<(String, Params)>,
    join: Option<(String, String)>,
    step_filter: Option<(String, Params)>,
}

impl Recursive {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            base_table: None,
            base_filter: None,
            join: None,
            step_filter: None,
        }
    }

    /// Add a column with its anchor and recursive expressions.
    pub fn column(mut self, name: &str, base: &str, step: &str) -> Self {
        self.columns.push(RecursiveColumn {
            name: name.to_string(),
            base: base.to_string(),
            step: step.to_string(),
        });
        self
    }

    /// Table the anchor select reads from.
    pub fn base_from(mut self, table: &str) -> Self {
        self.base_table = Some(table.to_string());
        self
    }

    pub fn base_where(mut self, filter: &str, params: Params) -> Self {
        self.base_filter = Some((filter.to_string(), params));
        self
    }

    /// Join the recursive select against another table.
    pub fn step_join(mut self, table: &str, condition: &str) -> Self {
        self.join = Some((table.to_string(), condition.to_string()));
        self
    }

    /// Condition that keeps the recursion going.
    pub fn step_where(mut self, filter: &str, params: Params) -> Self {
        self.step_filter = Some((filter.to_string(), params));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn render(&self) -> Result<(String, Params), QueryError> {
        if self.columns.is_empty() {
            return Err(QueryError::MissingFields(format!(
                "recursive expression '{}' has no columns",
                self.name
            )));
        }

        let names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        let base: Vec<&str> = self.columns.iter().map(|c| c.base.as_str()).collect();
        let step: Vec<&str> = self.columns.iter().map(|c| c.step.as_str()).collect();

        let mut params = Params::new();
        let mut sql = format!(
            "WITH RECURSIVE {}({}) AS (SELECT {}",
            self.name,
            names.join(", "),
            base.join(", ")
        );

        if let Some(table) = &self.base_table {
            sql.push_str(" FROM ");
            sql.push_str(table);
        }
        if let Some((filter, filter_params)) = &self.base_filter {
            let mut filter = filter.clone();
            merge_params(&mut params, &mut filter, filter_params.clone())?;
            sql.push_str(" WHERE ");
            sql.push_str(&filter);
        }

        sql.push_str(&format!(" UNION ALL SELECT {} FROM {}", step.join(", "), self.name));

        if let Some((table, condition)) = &self.join {
            sql.push_str(&format!(" INNER JOIN {} ON {}", table, condition));
        }
        if let Some((filter, filter_params)) = &self.step_filter {
            let mut filter = filter.clone();
            merge_params(&mut params, &mut filter, filter_params.clone())?;
            sql.push_str(" WHERE ");
            sql.push_str(&filter);
        }

        sql.push(')');
        Ok((sql, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn test_counter_expression() {
        let cte = Recursive::new("cnt")
            .column("x", "1", "x + 1")
            .step_where("x < :max", params! { "max" => 10 });

        let (sql, params) = cte.render().unwrap();
        assert_eq!(
            sql,
            "WITH RECURSIVE cnt(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM cnt WHERE x < :max)"
        );
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_tree_walk_with_join() {
        let cte = Recursive::new("tree")
            .column("id", "id", "c.id")
            .column("depth", "0", "tree.depth + 1")
            .base_from("categories")
            .base_where("id = :id", params! { "id" => 1 })
            .step_join("categories c", "c.parent_id = tree.id")
            .step_where("tree.depth < :id", params! { "id" => 5 });

        let (sql, params) = cte.render().unwrap();
        assert_eq!(
            sql,
            "WITH RECURSIVE tree(id, depth) AS (SELECT id, 0 FROM categories WHERE id = :id \
             UNION ALL SELECT c.id, tree.depth + 1 FROM tree \
             INNER JOIN categories c ON c.parent_id = tree.id WHERE tree.depth < :id_1)"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_columns_are_required() {
        assert!(matches!(
            Recursive::new("empty").render(),
            Err(QueryError::MissingFields(_))
        ));
    }
}
