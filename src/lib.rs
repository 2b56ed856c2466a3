//! Calc Desktop - desktop shell for the formula calculator backend
//!
//! Launches the backend as a child process, opens a window on the page it
//! serves and relays `calculate` requests from that page to the backend.

pub mod backend;
pub mod commands;
pub mod config;
pub mod lifecycle;

mod error;
mod state;

pub use config::ShellConfig;
pub use error::{Error, Result};
pub use state::AppState;

use std::sync::Arc;

use tauri::Manager;
use tracing_subscriber::EnvFilter;

use crate::backend::TracingSink;

/// `RUST_LOG` with the crate's own directives layered on top
fn log_filter() -> EnvFilter {
    let mut filter = EnvFilter::from_default_env();
    for directive in ["calc_desktop_lib=debug", "backend=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

fn init_tracing() {
    tracing_subscriber::fmt().with_env_filter(log_filter()).init();
}

/// Read the config from the app config directory, falling back to defaults
fn load_config<R: tauri::Runtime>(app: &tauri::App<R>) -> ShellConfig {
    let config_dir = match app.path().app_config_dir() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::warn!("No app config directory ({}), using defaults", e);
            return ShellConfig::default();
        }
    };

    ShellConfig::load_from_dir(&config_dir).unwrap_or_else(|e| {
        tracing::warn!("Ignoring unusable config: {}", e);
        ShellConfig::default()
    })
}

/// Initialize and run the Tauri application
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    init_tracing();

    tracing::info!("Starting Calc Desktop");

    tauri::Builder::default()
        .setup(|app| {
            let config = load_config(app);
            let state = AppState::new(config, Arc::new(TracingSink));

            // The output forwarders need the async runtime's context
            tauri::async_runtime::block_on(async {
                if let Err(e) = state.backend.spawn() {
                    tracing::error!("{}", e);
                }
            });

            app.manage(state);
            lifecycle::ensure_window(app.handle());

            tracing::info!("Application state initialized");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![commands::calculate::calculate])
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(lifecycle::handle_run_event);
}
