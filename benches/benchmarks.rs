use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::sync::Arc;

use keepsake::storage::StorageArea;
use keepsake::{MemoryStorage, PersistOptions, PersistedStore, Store};
use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize, Deserialize)]
struct State {
    counter: usize,
    name: String,
}

fn initial() -> State {
    State {
        counter: 0,
        name: "test".to_string(),
    }
}

fn store_write_benchmark(c: &mut Criterion) {
    let store = Store::new(0usize);

    c.bench_function("store_write", |b| {
        let mut i = 0;
        b.iter(|| {
            store.set(black_box(i));
            i += 1;
        });
    });
}

fn persisted_load_benchmark(c: &mut Criterion) {
    let storage = MemoryStorage::new();
    storage
        .set_item("state", r#"{"counter":41,"name":"loaded"}"#)
        .unwrap();

    c.bench_function("persisted_load", |b| {
        b.iter(|| {
            let store = PersistedStore::new(
                PersistOptions::new("state", initial()),
                Arc::new(storage.clone()),
            )
            .unwrap();
            black_box(store.get().counter)
        });
    });
}

fn persisted_update_benchmark(c: &mut Criterion) {
    let storage = MemoryStorage::new();
    let store =
        PersistedStore::new(PersistOptions::new("state", initial()), Arc::new(storage)).unwrap();

    c.bench_function("persisted_update", |b| {
        let mut i = 0;
        b.iter(|| {
            store
                .update(|state| {
                    state.counter = black_box(i);
                })
                .unwrap();
            i += 1;
        });
    });
}

fn cross_context_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("cross_context");

    for followers in [1, 10, 100].iter() {
        let writer = MemoryStorage::new();
        let stores: Vec<_> = (0..*followers)
            .map(|_| {
                PersistedStore::new(
                    PersistOptions::new("state", initial()),
                    Arc::new(writer.context()),
                )
                .unwrap()
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(followers), followers, |b, _| {
            let mut i = 0;
            b.iter(|| {
                let raw = format!(r#"{{"counter":{},"name":"remote"}}"#, black_box(i));
                writer.set_item("state", &raw).unwrap();
                i += 1;
            });
        });
        drop(stores);
    }
    group.finish();
}

criterion_group!(
    benches,
    store_write_benchmark,
    persisted_load_benchmark,
    persisted_update_benchmark,
    cross_context_benchmark,
);
criterion_main!(benches);
