//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `kanban_core` linkage and that a migrated store can be opened.
//! - Keep output deterministic for quick local sanity checks.

use std::process::ExitCode;

fn main() -> ExitCode {
    println!("kanban_core ping={}", kanban_core::ping());
    println!("kanban_core version={}", kanban_core::core_version());

    let store_status = match kanban_core::open_db_in_memory() {
        Ok(conn) => {
            let ready = kanban_core::SqliteBoardStore::try_new(&conn).map(|_| ());
            ready.map_err(|err| err.to_string())
        }
        Err(err) => Err(err.to_string()),
    };
    match store_status {
        Ok(()) => {
            println!("kanban_core store=ready");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("kanban_core store=error error={err}");
            ExitCode::FAILURE
        }
    }
}
