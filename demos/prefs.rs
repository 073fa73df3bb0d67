//! Persisted preferences: load, modify, reload, clear

use std::sync::Arc;

use keepsake::storage::StorageArea;
use keepsake::{MemoryStorage, PersistOptions, PersistedStore};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Prefs {
    theme: String,
    font_size: u8,
    recent: Vec<String>,
}

impl Default for Prefs {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            font_size: 14,
            recent: Vec::new(),
        }
    }
}

fn open(storage: &MemoryStorage) -> keepsake::Result<PersistedStore<Prefs>> {
    PersistedStore::new(
        PersistOptions::new("prefs", Prefs::default()),
        Arc::new(storage.clone()),
    )
}

fn main() -> keepsake::Result<()> {
    println!("=== Persisted Preferences ===\n");

    let storage = MemoryStorage::new();

    println!("1. Opening with empty storage");
    let prefs = open(&storage)?;
    let _sub = prefs.subscribe(|p| {
        println!(
            "   [Prefs] theme={}, font_size={}, recent={:?}",
            p.theme, p.font_size, p.recent
        );
    });

    println!("\n2. Changing settings");
    prefs.update(|p| p.theme = "dark".to_string())?;
    prefs.update(|p| {
        p.font_size += 2;
        p.recent.push("notes.md".to_string());
    })?;
    println!("   stored: {:?}", storage.get_item("prefs")?);

    println!("\n3. Reopening (simulated restart)");
    let reopened = open(&storage)?;
    println!("   reloaded: {:?}", reopened.get());

    println!("\n4. Corrupting the stored value");
    storage.set_item("prefs", r#"{"theme": 42}"#)?;
    println!("   after corruption: {:?}", open(&storage)?.get());

    println!("\n5. Clearing");
    prefs.clear()?;
    println!("   stored: {:?}", storage.get_item("prefs")?);

    Ok(())
}
