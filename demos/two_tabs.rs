//! Two contexts sharing one storage area stay in sync

use std::sync::Arc;

use keepsake::{MemoryStorage, PersistOptions, PersistedStore, Scope};

fn main() -> keepsake::Result<()> {
    println!("=== Two Tabs ===\n");

    let tab_a = MemoryStorage::new();
    let tab_b = tab_a.context();

    let counter_a = PersistedStore::new(PersistOptions::new("counter", 0i64), Arc::new(tab_a))?;

    // Tab B's store lives inside a scope, like a component that can unmount.
    let scope = Scope::new();
    let counter_b = scope.run(|| {
        PersistedStore::new(PersistOptions::new("counter", 0i64), Arc::new(tab_b.clone()))
    })?;
    let _sub = counter_b.subscribe(|n| println!("   [Tab B] counter = {n}"));

    println!("1. Tab A increments three times");
    for _ in 0..3 {
        counter_a.update(|n| *n += 1)?;
    }

    println!("\n2. Tab B resets");
    counter_b.clear()?;
    println!("   Tab A now sees {}", counter_a.get());

    println!("\n3. Tab B unmounts; further changes are not mirrored");
    scope.dispose();
    counter_a.set(100)?;
    println!("   Tab A = {}, Tab B = {}", counter_a.get(), counter_b.get());

    Ok(())
}
