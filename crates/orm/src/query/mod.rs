//! Query Builder Module - fluent, composable SQL statement builders
//!
//! Every builder produces an [`SqlStatement`] through [`Updatable::build`].
//! Placeholders use the `:name` form; parameters holding a
//! [`Literal`](crate::literal::Literal) are written into the text instead.

pub mod basic;
pub mod delete;
pub mod insert;
pub mod insert_bulk;
pub mod insert_select;
pub mod params;
pub mod raw;
pub mod recursive;
pub mod select;
pub mod substitution;
pub mod types;
pub mod union;
pub mod update;
pub mod where_clause;

pub use basic::{QueryBasic, SOFT_DELETE_COLUMN};
pub use delete::DeleteQuery;
pub use insert::InsertQuery;
pub use insert_bulk::InsertBulkQuery;
pub use insert_select::InsertSelectQuery;
pub use params::param_name;
pub use raw::QueryRaw;
pub use recursive::Recursive;
pub use select::Query;
pub use substitution::process_literal;
pub use types::{
    AnyQuery, JoinClause, JoinType, OrderDirection, SqlStatement, StatementKind, TableSource,
    Updatable,
};
pub use union::Union;
pub use update::UpdateQuery;
pub use where_clause::WhereClause;
