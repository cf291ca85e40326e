//! Cross-module tests for micro-orm
//!
//! Scenarios that combine mappers, the schema graph and the query builders
//! the way an application would.

use crate::backends::postgres::to_positional;
use crate::dialect::SqlDialect;
use crate::literal::Literal;
use crate::mapper::{FieldMapping, Mapper, MapperFunction};
use crate::params;
use crate::query::{
    InsertBulkQuery, InsertQuery, InsertSelectQuery, JoinType, Query, QueryBasic, Union,
    Updatable,
};
use crate::schema::Schema;
use crate::value::Value;

pub mod mock;

fn shop() -> Schema {
    let mut schema = Schema::new();
    schema
        .register(
            Mapper::new("User", "users", &["id"])
                .unwrap()
                .with_soft_delete()
                .with_child("orders", "user_id"),
        )
        .unwrap();
    schema
        .register(
            Mapper::new("Order", "orders", &["id"])
                .unwrap()
                .with_child("order_lines", "order_id"),
        )
        .unwrap();
    schema
        .register(Mapper::new("OrderLine", "order_lines", &["id"]).unwrap())
        .unwrap();
    schema
}

#[cfg(test)]
mod schema_query_tests {
    use super::*;

    #[test]
    fn test_path_query_with_filter_and_window() {
        let statement = shop()
            .get_query_instance(&["users", "order_lines"])
            .unwrap()
            .where_clause("order_lines.sku = :sku", params! { "sku" => "A-1" })
            .order_by("orders.id")
            .limit(0, 10)
            .build(Some(&SqlDialect::PostgreSQL))
            .unwrap();

        assert_eq!(
            statement.sql,
            "SELECT * FROM users \
             INNER JOIN orders ON users.id = orders.user_id \
             INNER JOIN order_lines ON orders.id = order_lines.order_id \
             WHERE (order_lines.sku = :sku) AND users.deleted_at IS NULL \
             ORDER BY orders.id ASC LIMIT 10"
        );
        assert_eq!(statement.params, params! { "sku" => "A-1" });
    }

    #[test]
    fn test_relationship_lookup_is_symmetric_through_schema() {
        let schema = shop();
        let forward = schema.get_relationship(&["users", "order_lines"]);
        assert_eq!(forward, vec!["orders,users", "order_lines,orders"]);

        let mut backward = schema.get_relationship(&["order_lines", "users"]);
        backward.reverse();
        assert_eq!(backward, forward);
    }

    #[test]
    fn test_unsafe_query_sees_deleted_rows() {
        let schema = shop();
        let query = schema.resolve(Query::new().table("users").unsafe_query());
        assert_eq!(query.build(None).unwrap().sql, "SELECT * FROM users");
    }

    #[test]
    fn test_soft_delete_applies_to_join_with_inline_alias() {
        let query = shop().resolve(
            Query::new()
                .table("orders")
                .join("users u", "u.id = orders.user_id"),
        );
        assert_eq!(
            query.build(None).unwrap().sql,
            "SELECT * FROM orders INNER JOIN users u ON u.id = orders.user_id \
             WHERE u.deleted_at IS NULL"
        );

        let query = shop().resolve(Query::new().table("users AS u").field("u.id"));
        assert_eq!(
            query.build(None).unwrap().sql,
            "SELECT u.id FROM users u WHERE u.deleted_at IS NULL"
        );
    }

    #[test]
    fn test_subquery_join_merges_colliding_params() {
        let recent = Query::new()
            .fields(&["user_id", "COUNT(*) AS total"])
            .table("orders")
            .where_clause("status = :status", params! { "status" => "paid" })
            .group_by("user_id");

        let statement = Query::new()
            .fields(&["u.id", "o.total"])
            .table_alias("users", "u")
            .join_query(JoinType::Left, recent, "o", Some("o.user_id = u.id"))
            .where_clause("u.status = :status", params! { "status" => "active" })
            .build(None)
            .unwrap();

        assert_eq!(
            statement.sql,
            "SELECT u.id, o.total FROM users u \
             LEFT JOIN (SELECT user_id, COUNT(*) AS total FROM orders WHERE status = :status GROUP BY user_id) o \
             ON o.user_id = u.id WHERE u.status = :status_1"
        );
        assert_eq!(statement.params["status"], Value::from("paid"));
        assert_eq!(statement.params["status_1"], Value::from("active"));

        let (sql, values) = to_positional(&statement.sql, &statement.params).unwrap();
        assert!(sql.ends_with("WHERE u.status = $2"));
        assert_eq!(values, vec![Value::from("paid"), Value::from("active")]);
    }
}

#[cfg(test)]
mod mapper_query_tests {
    use super::*;

    fn events() -> Mapper {
        Mapper::new("Event", "events", &["id"])
            .unwrap()
            .with_table_alias("e")
            .with_field(FieldMapping::new("id"))
            .with_field(FieldMapping::new("kind"))
            .with_field(
                FieldMapping::new("created")
                    .with_field_name("created_at")
                    .with_update_function(MapperFunction::Now),
            )
    }

    #[test]
    fn test_mapper_columns_feed_insert() {
        let mapper = events();
        let columns = mapper
            .to_columns(
                &params! { "id" => 1, "kind" => "login", "created" => Value::Null },
                Some(&SqlDialect::MySQL),
            )
            .unwrap();

        let statement = InsertQuery::new(mapper.table_name())
            .values(columns)
            .build(Some(&SqlDialect::MySQL))
            .unwrap();

        assert_eq!(
            statement.sql,
            "INSERT INTO events (created_at, id, kind) VALUES (CURRENT_TIMESTAMP, :id, :kind)"
        );
        assert_eq!(statement.params, params! { "id" => 1, "kind" => "login" });
    }

    #[test]
    fn test_union_of_mapper_queries_inlines_literals() {
        let mapper = events();
        let logins = QueryBasic::new()
            .fields_mapper(&mapper)
            .table_mapper(&mapper)
            .where_clause(
                "e.kind = :kind AND e.created_at < :cutoff",
                params! { "kind" => "login", "cutoff" => Literal::new("NOW()") },
            );
        let logouts = QueryBasic::new()
            .fields_mapper(&mapper)
            .table_mapper(&mapper)
            .where_clause("e.kind = :kind", params! { "kind" => "logout" });

        let statement = Union::new()
            .add(logins)
            .add(logouts)
            .order_by("id")
            .build(Some(&SqlDialect::PostgreSQL))
            .unwrap();

        let select = "SELECT e.id as id, e.kind as kind, e.created_at as created FROM events e";
        assert_eq!(
            statement.sql,
            format!(
                "{select} WHERE e.kind = :kind AND e.created_at < NOW() \
                 UNION {select} WHERE e.kind = :kind_1 ORDER BY id ASC"
            )
        );
        assert_eq!(statement.params, params! { "kind" => "login", "kind_1" => "logout" });
    }

    #[test]
    fn test_bulk_insert_from_mapped_rows() {
        let mapper = events();
        let rows = ["login", "logout"]
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                mapper
                    .to_columns(&params! { "id" => i as i64, "kind" => *kind }, None)
                    .unwrap()
            })
            .map(|mut columns| {
                columns.remove("created_at");
                columns
            });

        let statement = InsertBulkQuery::new("events", &["id", "kind"])
            .rows(rows)
            .build(None)
            .unwrap();

        assert_eq!(
            statement.sql,
            "INSERT INTO events (id, kind) VALUES (:p0_0, :p0_1), (:p1_0, :p1_1)"
        );
        assert_eq!(statement.params["p1_1"], Value::from("logout"));
    }

    #[test]
    fn test_archive_with_insert_select() {
        let source = Query::new()
            .fields(&["id", "kind"])
            .table("events")
            .where_in("id", [1, 2, 3]);

        let statement = InsertSelectQuery::new("events_archive", &["id", "kind"])
            .from_query(source)
            .build(None)
            .unwrap();

        assert!(statement
            .sql
            .starts_with("INSERT INTO events_archive (id, kind) SELECT id, kind FROM events WHERE id IN ("));
        assert_eq!(statement.params.len(), 3);
    }
}
