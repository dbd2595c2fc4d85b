use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sqlrepo::adapter::{OracleAdapter, PostgresAdapter, SqlServerAdapter};
use sqlrepo::{ColumnKind, EntityDescriptor, EntityMetadata, FieldDescriptor, Pager, Params, SqlAdapter, SqlBuilder};

const FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor {
        field: "id",
        column: "id",
        kind: ColumnKind::Key,
    },
    FieldDescriptor {
        field: "customer",
        column: "customer",
        kind: ColumnKind::Writable,
    },
    FieldDescriptor {
        field: "status",
        column: "status",
        kind: ColumnKind::Writable,
    },
    FieldDescriptor {
        field: "total",
        column: "total",
        kind: ColumnKind::Writable,
    },
    FieldDescriptor {
        field: "created_at",
        column: "created_at",
        kind: ColumnKind::Computed,
    },
];

const ORDER: EntityDescriptor = EntityDescriptor {
    type_name: "Order",
    table: None,
    fields: FIELDS,
};

/// A patch assigning `n` columns, filtered on `id`.
fn patch(n: usize) -> (Params, Params) {
    let data = (0..n).map(|i| (format!("col{i}"), i as i64)).collect();
    let filter = Params::new().with("id", 1);
    (data, filter)
}

fn bench_crud_statements(c: &mut Criterion) {
    let meta = EntityMetadata::from_descriptor(&ORDER);
    let adapters: [(&str, &dyn SqlAdapter); 3] = [
        ("sqlserver", &SqlServerAdapter),
        ("oracle", &OracleAdapter),
        ("postgres", &PostgresAdapter),
    ];

    let mut group = c.benchmark_group("sql_builder/crud");
    for (name, adapter) in adapters {
        let builder = SqlBuilder::new(adapter);
        group.bench_with_input(BenchmarkId::new("insert", name), &meta, |b, meta| {
            b.iter(|| {
                let (columns, parameters) = builder.build_insert(meta);
                black_box(adapter.insert_plan(meta.table(), &columns, &parameters, &["id"]));
            });
        });
        group.bench_with_input(BenchmarkId::new("update", name), &meta, |b, meta| {
            b.iter(|| black_box(builder.build_update(meta)));
        });
    }
    group.finish();
}

fn bench_partial_update(c: &mut Criterion) {
    let meta = EntityMetadata::from_descriptor(&ORDER);
    let builder = SqlBuilder::new(&PostgresAdapter);
    let mut group = c.benchmark_group("sql_builder/partial_update");

    for n in [1, 5, 20, 50] {
        let (data, filter) = patch(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &(data, filter), |b, (data, filter)| {
            b.iter(|| black_box(builder.build_partial_update(&meta, data, Some(filter), true)));
        });
    }

    group.finish();
}

fn bench_page_sql(c: &mut Criterion) {
    let pager = Pager::new("SELECT o.id, o.total FROM orders o JOIN customers c ON c.id = o.customer", 7, 50)
        .map(|p| p.filter("o.total > 100").order_by("o.id DESC"));
    let Ok(pager) = pager else {
        return;
    };
    let adapters: [(&str, &dyn SqlAdapter); 3] = [
        ("sqlserver", &SqlServerAdapter),
        ("oracle", &OracleAdapter),
        ("postgres", &PostgresAdapter),
    ];

    let mut group = c.benchmark_group("sql_builder/page_sql");
    for (name, adapter) in adapters {
        group.bench_function(name, |b| b.iter(|| black_box(pager.page_sql(adapter))));
    }
    group.finish();
}

criterion_group!(benches, bench_crud_statements, bench_partial_update, bench_page_sql);
criterion_main!(benches);
