//! Application state management

use std::sync::Arc;

use crate::backend::{BackendClient, BackendSupervisor, OutputSink};
use crate::config::ShellConfig;

/// State shared by lifecycle callbacks and commands
pub struct AppState {
    /// Configuration loaded at startup
    pub config: ShellConfig,

    /// Sole owner of the backend child process
    pub backend: BackendSupervisor,

    /// HTTP relay used by the `calculate` command
    pub client: BackendClient,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: ShellConfig, sink: Arc<dyn OutputSink>) -> Self {
        let backend = BackendSupervisor::new(config.backend.clone(), sink);
        let client = BackendClient::new(config.backend.calculate_url());

        Self {
            config,
            backend,
            client,
        }
    }
}
