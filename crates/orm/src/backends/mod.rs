//! Database backends
//!
//! Concrete [`Executor`](crate::executor::Executor) implementations.

pub mod postgres;

pub use postgres::PgExecutor;
