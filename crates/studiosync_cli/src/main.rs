//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `studiosync_core` linkage.
//! - Run one in-memory write/read cycle for quick local sanity checks.

use std::process::ExitCode;
use std::sync::Arc;

use studiosync_core::{SqliteStore, Student, SyncEngine};

fn main() -> ExitCode {
    println!("studiosync_core version={}", studiosync_core::core_version());

    match smoke_cycle() {
        Ok(count) => {
            println!("studiosync_core smoke=ok students={count}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("studiosync_core smoke=failed reason={message}");
            ExitCode::FAILURE
        }
    }
}

// Why: verify store, engine, and model wiring without touching disk.
fn smoke_cycle() -> Result<usize, String> {
    let store = SqliteStore::open_in_memory().map_err(|err| err.to_string())?;
    let engine = Arc::new(SyncEngine::new(Arc::new(store)).map_err(|err| err.to_string())?);

    engine
        .create_student(&Student::new("Hana", "Sato"))
        .map_err(|err| err.to_string())?;

    Ok(engine.students().len())
}
