//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `clipboard_core` wiring.
//! - Print eagerly loaded workspaces from a database file, or from a fresh
//!   in-memory database when no path is given.
//!
//! Output carries ids and counts only; emails are never printed.

use clipboard_core::{ClipboardCore, CoreConfig, CoreError};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("clipboard_core ping={}", clipboard_core::ping());
    println!("clipboard_core version={}", clipboard_core::core_version());

    let config = match std::env::args_os().nth(1) {
        Some(path) => CoreConfig::with_db_path(path),
        None => CoreConfig::default(),
    };

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: CoreConfig) -> Result<(), CoreError> {
    let core = ClipboardCore::open(config)?;
    {
        let workspaces = core.workspace_service()?.list_workspaces(true)?;
        let clipboards = core.clipboard_service()?;
        println!("workspaces={}", workspaces.len());
        for workspace in &workspaces {
            let clipboard_count = clipboards.list_clipboards(workspace.id)?.len();
            println!(
                "workspace id={} owner={} members={} clipboards={}",
                workspace.id,
                workspace
                    .owner
                    .map_or_else(|| "-".to_string(), |id| id.to_string()),
                workspace.members.len(),
                clipboard_count
            );
        }
    }
    core.shutdown()
}
