//! Criterion benchmarks for registering SQL sources and invoking the resulting
//! operations against an in-memory SQLite database.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sql_operations::params;
use sql_operations::prelude::*;

const LOOKUP_SQL: &str = "
    -- fetch one user's name
    SELECT name
      FROM users
     WHERE id = :id
     LIMIT 1";

/// Resolve how many rows each batch iteration inserts.
fn batch_size() -> usize {
    std::env::var("BENCH_ROWS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(1000)
}

fn seeded_access(rows: i64) -> Result<DataAccess<SqliteBackend>, SqlOpError> {
    let db = DataAccess::new(SqliteBackend::open_in_memory()?)?;
    db.register_text(
        "create",
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
        false,
    )?;
    db.register_text("insert_user", "INSERT INTO users(name) VALUES (:name)", false)?;
    db.register_text("get_name", LOOKUP_SQL, false)?;
    db.call("create", ())?;

    let batch: Vec<ParamMap> = (0..rows)
        .map(|i| params! { "name" => format!("user{i}") })
        .collect();
    db.call("insert_user", batch)?;
    Ok(db)
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");
    for lazy in [false, true] {
        group.bench_with_input(BenchmarkId::new("register_text", lazy), &lazy, |b, &lazy| {
            let db = DataAccess::new(SqliteBackend::open_in_memory().expect("open sqlite"))
                .expect("data access");
            b.iter(|| {
                db.register_text("get_name", black_box(LOOKUP_SQL), lazy)
                    .expect("register");
            });
        });
    }
    group.finish();
}

fn bench_invocation(c: &mut Criterion) {
    let db = seeded_access(1000).expect("seed database");
    let mut group = c.benchmark_group("invocation");

    group.bench_function("single_value_lookup", |b| {
        let mut id = 0_i64;
        b.iter(|| {
            id = id % 1000 + 1;
            let out = db
                .call("get_name", params! { "id" => id })
                .expect("lookup");
            black_box(out);
        });
    });

    let rows = batch_size();
    group.throughput(Throughput::Elements(rows as u64));
    group.bench_with_input(BenchmarkId::new("batch_insert", rows), &rows, |b, &rows| {
        let batch: Vec<ParamMap> = (0..rows)
            .map(|i| params! { "name" => format!("bench{i}") })
            .collect();
        b.iter(|| {
            let out = db.call("insert_user", batch.clone()).expect("batch insert");
            black_box(out);
        });
    });
    group.finish();
}

criterion_group!(benches, bench_registration, bench_invocation);
criterion_main!(benches);
