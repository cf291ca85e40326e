//! # micro-orm
//!
//! A micro ORM built around a composable SQL builder.
//!
//! - [`query`]: fluent SELECT / INSERT / UPDATE / DELETE / UNION builders
//!   producing named-parameter [`SqlStatement`]s
//! - [`mapper`]: entity to table mapping with per-field read and write
//!   transforms
//! - [`relationship`]: foreign-key graph that synthesizes JOINs between
//!   any two connected tables
//! - [`repository`]: CRUD orchestration over an async [`Executor`]
//! - [`observers`]: table change notifications

pub mod backends;
pub mod config;
pub mod dialect;
pub mod error;
pub mod event_error;
pub mod events;
pub mod executor;
pub mod literal;
pub mod mapper;
pub mod observers;
pub mod query;
pub mod relationship;
pub mod repository;
pub mod schema;
pub mod security;
pub mod value;

#[cfg(test)]
mod tests;

pub use backends::PgExecutor;
pub use config::{ConfigError, OrmConfig};
pub use dialect::{Dialect, SqlDialect};
pub use error::*;
pub use events::{Observer, ObserverData, ObserverEvent};
pub use executor::{Executor, Row};
pub use literal::{HexUuidLiteral, Literal};
pub use mapper::{FieldMapping, KeyGen, Mapper, MapperContext, MapperFunction};
pub use observers::OrmSubject;
pub use query::*;
pub use relationship::{DatabaseRelationship, Relationship};
pub use repository::{Repository, UpdateConstraint};
pub use schema::Schema;
pub use value::{Params, Value};
