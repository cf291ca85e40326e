//! SQL Generation Performance Benchmarks
//!
//! Measures statement building, parameter merging and literal substitution

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use micro_orm::{
    params, DatabaseRelationship, FieldMapping, InsertBulkQuery, Literal, Mapper, Params, Query,
    QueryBasic, SqlDialect, Union, Updatable,
};

fn bench_basic_sql_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("basic_sql_generation");

    group.bench_function("simple_select", |b| {
        let query = Query::new().fields(&["id", "name", "email"]).table("users");

        b.iter(|| black_box(query.build(None)))
    });

    group.bench_function("select_with_where", |b| {
        let query = Query::new()
            .fields(&["id", "name", "email"])
            .table("users")
            .where_clause("active = :active", params! { "active" => true })
            .where_clause("created_at > :since", params! { "since" => "2023-01-01" });

        b.iter(|| black_box(query.build(None)))
    });

    group.bench_function("select_with_joins", |b| {
        let query = Query::new()
            .fields(&["u.id", "u.name", "p.title", "a.street"])
            .table_alias("users", "u")
            .join("profiles p", "p.user_id = u.id")
            .left_join("addresses a", "a.user_id = u.id")
            .where_clause("u.active = :active", params! { "active" => true })
            .order_by_desc("u.created_at")
            .limit(0, 50);

        b.iter(|| black_box(query.build(Some(&SqlDialect::PostgreSQL))))
    });

    group.finish();
}

fn bench_parameter_handling(c: &mut Criterion) {
    let mut group = c.benchmark_group("parameter_handling");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("where_in", size), size, |b, &size| {
            let ids: Vec<i64> = (0..size).collect();
            b.iter(|| {
                black_box(
                    Query::new()
                        .table("users")
                        .where_in("id", ids.iter().copied())
                        .build(None),
                )
            })
        });
    }

    group.bench_function("union_with_collisions", |b| {
        let members: Vec<QueryBasic> = (0..8)
            .map(|i| {
                QueryBasic::new()
                    .table("events")
                    .where_clause("kind = :kind", params! { "kind" => format!("kind_{}", i) })
            })
            .collect();

        b.iter(|| {
            let union = members
                .iter()
                .cloned()
                .fold(Union::new(), |union, member| union.add(member));
            black_box(union.build(None))
        })
    });

    group.bench_function("literal_substitution", |b| {
        let query = Query::new().table("sessions").where_clause(
            "expires_at < :now AND owner = :owner",
            params! { "now" => Literal::new("NOW()"), "owner" => "ann" },
        );

        b.iter(|| black_box(query.build(None)))
    });

    group.finish();
}

fn bench_bulk_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk_insert");

    for rows in [10, 100, 500].iter() {
        let batch: Vec<Params> = (0..*rows)
            .map(|i| params! { "name" => format!("user_{}", i), "age" => i })
            .collect();

        group.bench_with_input(BenchmarkId::new("parameterized", rows), &batch, |b, batch| {
            b.iter(|| {
                black_box(
                    InsertBulkQuery::new("users", &["name", "age"])
                        .rows(batch.clone())
                        .build(None),
                )
            })
        });

        group.bench_with_input(BenchmarkId::new("inline", rows), &batch, |b, batch| {
            b.iter(|| {
                black_box(
                    InsertBulkQuery::new("users", &["name", "age"])
                        .allow_inline_values()
                        .rows(batch.clone())
                        .build(None),
                )
            })
        });
    }

    group.finish();
}

fn bench_relationship_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("relationship_queries");

    let mut graph = DatabaseRelationship::new();
    let tables: Vec<String> = (0..20).map(|i| format!("t{:02}", i)).collect();
    for pair in tables.windows(2) {
        graph.add_relationship(&pair[0], &pair[1], &format!("{}_id", pair[0]), Some("id"));
    }

    group.bench_function("path_across_chain", |b| {
        b.iter(|| black_box(graph.get_relationship(&["t00", "t19"])))
    });

    group.bench_function("join_query_across_chain", |b| {
        b.iter(|| {
            black_box(
                graph
                    .get_query_instance(&["t00", "t19"])
                    .and_then(|query| query.build(None)),
            )
        })
    });

    let mapper = Mapper::new("User", "users", &["id"])
        .map(|m| {
            m.with_table_alias("u")
                .with_field(FieldMapping::new("id"))
                .with_field(FieldMapping::new("email").with_field_name("email_address"))
                .with_field(FieldMapping::new("created").with_field_name("created_at"))
        })
        .expect("valid mapper");

    group.bench_function("mapped_select", |b| {
        b.iter(|| {
            black_box(
                Query::new()
                    .fields_mapper(&mapper)
                    .table_mapper(&mapper)
                    .where_clause("u.id = :id", params! { "id" => 7 })
                    .build(Some(&SqlDialect::MySQL)),
            )
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_basic_sql_generation,
    bench_parameter_handling,
    bench_bulk_insert,
    bench_relationship_queries
);
criterion_main!(benches);
