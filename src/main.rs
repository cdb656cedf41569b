//! Tablestore inspection tool
//!
//! Usage: `tablestore-inspect <table-dir> [config.json]`
//!
//! Loads a saved table directory into a fresh repository and prints its
//! id, kind, size and reference tree.

// Use jemalloc as global allocator
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tablestore::progress::NullMonitor;
use tablestore::table::ExtensionRegistry;
use tablestore::{PersistenceEngine, TableRepository, TableStoreConfig};

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(dir) = args.next().map(PathBuf::from) else {
        eprintln!("usage: tablestore-inspect <table-dir> [config.json]");
        return ExitCode::from(2);
    };

    let config = match args.next() {
        Some(path) => match TableStoreConfig::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => TableStoreConfig::default(),
    };

    let engine = PersistenceEngine::new(config, Arc::new(ExtensionRegistry::with_builtins()));
    let repository = TableRepository::new();
    log::info!("Loading table from {}", dir.display());
    match engine.load(&dir, None, &NullMonitor, &repository) {
        Ok(handle) => {
            println!("Table {} ({})", handle.id(), handle.kind());
            println!("{}", handle.summary());
            println!("Tables loaded: {}", repository.len());
            print!("{}", handle.describe_tree());
            ExitCode::SUCCESS
        }
        Err(e) if e.is_extension_missing() => {
            eprintln!("error: {} (install the extension and retry)", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
