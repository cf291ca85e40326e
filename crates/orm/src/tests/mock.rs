//! In-memory executor for repository tests
//!
//! Records every statement it receives and answers SELECTs from a queue of
//! prepared result sets.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::dialect::{Dialect, SqlDialect};
use crate::error::OrmResult;
use crate::executor::{Executor, Row};
use crate::query::SqlStatement;
use crate::value::Value;

pub struct MockExecutor {
    dialect: SqlDialect,
    statements: Mutex<Vec<SqlStatement>>,
    results: Mutex<VecDeque<Vec<Row>>>,
    next_id: AtomicI64,
}

impl MockExecutor {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            statements: Mutex::new(Vec::new()),
            results: Mutex::new(VecDeque::new()),
            next_id: AtomicI64::new(100),
        }
    }

    /// Result set for the next SELECT; an empty queue answers with no rows
    pub fn queue_rows(&self, rows: Vec<Row>) {
        self.results.lock().unwrap().push_back(rows);
    }

    pub fn statements(&self) -> Vec<SqlStatement> {
        self.statements.lock().unwrap().clone()
    }

    pub fn sql(&self) -> Vec<String> {
        self.statements().into_iter().map(|s| s.sql).collect()
    }

    fn record(&self, statement: &SqlStatement) {
        self.statements.lock().unwrap().push(statement.clone());
    }
}

#[async_trait]
impl Executor for MockExecutor {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    async fn fetch_all(&self, statement: &SqlStatement) -> OrmResult<Vec<Row>> {
        self.record(statement);
        Ok(self.results.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn execute(&self, statement: &SqlStatement) -> OrmResult<u64> {
        self.record(statement);
        Ok(1)
    }

    async fn insert_and_get_id(&self, statement: &SqlStatement, _primary_key: &str) -> OrmResult<Value> {
        self.record(statement);
        Ok(Value::Int(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }
}
