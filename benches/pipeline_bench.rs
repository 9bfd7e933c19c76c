//! Benchmarks for the conversion pipeline.
//!
//! Tests:
//! - COPY → INSERT conversion throughput
//! - Cleanup pass throughput over converted INSERTs
//! - Full default pipeline

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pgdump2mysql::config::{BooleanConfig, Config, RoleConfig};
use pgdump2mysql::convert::convert_dump;
use pgdump2mysql::error::UnterminatedPolicy;
use pgdump2mysql::passes::{BooleanNormalizer, IdentifierCleaner, RoleRepair};
use pgdump2mysql::Pipeline;
use std::hint::black_box;

const ROLES: [&str; 4] = ["admin", "member", "owner", "guest"];

/// Generate a pg_dump-style dump with one COPY block per table
fn generate_postgres_dump(tables: usize, rows_per_table: usize) -> String {
    let mut data = String::new();

    data.push_str("--\n-- PostgreSQL database dump\n--\n");
    data.push_str("SET client_encoding = 'UTF8';\n");
    data.push_str("SET standard_conforming_strings = on;\n");
    data.push_str("SELECT pg_catalog.set_config('search_path', '', false);\n\n");

    for t in 0..tables {
        let table = if t == 0 {
            "\"user\"".to_string()
        } else {
            format!("table_{}", t)
        };
        data.push_str(&format!(
            "COPY public.{} (id, role, is_active, email, bio) FROM stdin;\n",
            table
        ));
        for r in 0..rows_per_table {
            let bio = if r % 3 == 0 {
                "\\N".to_string()
            } else {
                format!("It's row {}", r)
            };
            data.push_str(&format!(
                "{}\t{}\t{}\tuser{}@example.com\t{}\n",
                r,
                ROLES[r % ROLES.len()],
                if r % 2 == 0 { "t" } else { "f" },
                r,
                bio
            ));
        }
        data.push_str("\\.\n\n");
    }

    data
}

fn bench_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert");

    for rows in [100, 1_000, 10_000] {
        let dump = generate_postgres_dump(5, rows);
        group.throughput(Throughput::Bytes(dump.len() as u64));
        group.bench_with_input(BenchmarkId::new("copy_to_insert", rows), &dump, |b, dump| {
            b.iter(|| black_box(convert_dump(dump, UnterminatedPolicy::Flush)))
        });
    }

    group.finish();
}

fn bench_passes(c: &mut Criterion) {
    let mut group = c.benchmark_group("passes");

    let converted = convert_dump(&generate_postgres_dump(5, 2_000), UnterminatedPolicy::Flush).sql;
    group.throughput(Throughput::Bytes(converted.len() as u64));

    let cleaner = IdentifierCleaner::new(&["public".to_string()]).unwrap();
    group.bench_function("identifiers", |b| {
        b.iter(|| black_box(cleaner.clean(&converted)))
    });

    let cleaned = cleaner.clean(&converted).sql;

    let booleans = BooleanConfig::default();
    group.bench_function("booleans_infer", |b| {
        b.iter(|| black_box(BooleanNormalizer::new(&booleans).normalize(&cleaned)))
    });

    let roles = RoleRepair::new(&RoleConfig::default());
    group.bench_function("roles", |b| b.iter(|| black_box(roles.repair(&cleaned))));

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let pipeline = Pipeline::new(Config::default()).unwrap();

    for tables in [1, 10] {
        let dump = generate_postgres_dump(tables, 1_000);
        group.throughput(Throughput::Bytes(dump.len() as u64));
        group.bench_with_input(BenchmarkId::new("all_passes", tables), &dump, |b, dump| {
            b.iter(|| black_box(pipeline.run(dump)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_convert, bench_passes, bench_pipeline);
criterion_main!(benches);
