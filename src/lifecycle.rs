//! Window and exit lifecycle
//!
//! Keeps one window open while the app is in the foreground and ties the
//! backend's lifetime to the application's.

use tauri::{AppHandle, Manager, RunEvent, Runtime, WebviewUrl, WebviewWindowBuilder};

use crate::config::ShellConfig;
use crate::state::AppState;
use crate::{Error, Result};

/// Label of the display window, referenced by `capabilities/default.json`
pub const MAIN_WINDOW_LABEL: &str = "main";

/// What to do once the last window has closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// Stay alive in the background with the backend still running
    KeepRunning,
    /// Kill the backend and let the application exit
    TerminateAndExit,
}

/// macOS apps conventionally stay alive with no windows open
pub fn platform_keeps_apps_alive() -> bool {
    cfg!(target_os = "macos")
}

/// Apply the close policy once the last window is gone
pub fn on_all_windows_closed<R: Runtime>(app: &AppHandle<R>, keeps_alive: bool) -> CloseAction {
    if keeps_alive {
        let running = app
            .try_state::<AppState>()
            .map(|state| state.backend.is_running())
            .unwrap_or(false);
        tracing::debug!(
            "All windows closed, staying in background (backend running: {})",
            running
        );
        return CloseAction::KeepRunning;
    }

    tracing::info!("All windows closed, shutting down");
    terminate_backend(app);
    CloseAction::TerminateAndExit
}

/// Open the display window on the backend's URL
pub fn create_main_window<R, M>(manager: &M, config: &ShellConfig) -> Result<()>
where
    R: Runtime,
    M: Manager<R>,
{
    let base_url = config.backend.base_url();
    let url: tauri::Url = base_url
        .parse()
        .map_err(|e| Error::InvalidUrl(format!("{}: {}", base_url, e)))?;

    WebviewWindowBuilder::new(manager, MAIN_WINDOW_LABEL, WebviewUrl::External(url))
        .title(&config.window.title)
        .inner_size(config.window.width, config.window.height)
        .build()?;

    tracing::info!("Display window opened on {}", base_url);
    Ok(())
}

/// Create the display window unless one is already open
pub fn ensure_window<R: Runtime>(app: &AppHandle<R>) {
    if !app.webview_windows().is_empty() {
        return;
    }

    let Some(state) = app.try_state::<AppState>() else {
        tracing::warn!("Application state missing, cannot open a window");
        return;
    };

    if let Err(e) = create_main_window(app, &state.config) {
        tracing::error!("Failed to create display window: {}", e);
    }
}

/// Run-loop callback wiring window and exit events to the backend lifecycle
pub fn handle_run_event<R: Runtime>(app: &AppHandle<R>, event: RunEvent) {
    match event {
        // No exit code means the last window closed rather than an explicit exit
        RunEvent::ExitRequested { api, code: None, .. } => {
            let action = on_all_windows_closed(app, platform_keeps_apps_alive());
            if action == CloseAction::KeepRunning {
                api.prevent_exit();
            }
        }
        RunEvent::Exit => {
            terminate_backend(app);
        }
        #[cfg(target_os = "macos")]
        RunEvent::Reopen {
            has_visible_windows: false,
            ..
        } => ensure_window(app),
        _ => {}
    }
}

/// Returns `true` if this call killed the backend
fn terminate_backend<R: Runtime>(app: &AppHandle<R>) -> bool {
    let Some(state) = app.try_state::<AppState>() else {
        return false;
    };

    if let Some(pid) = state.backend.pid() {
        tracing::info!("Stopping backend (pid {})", pid);
    }
    state.backend.terminate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tauri::test::{mock_app, MockRuntime};
    use tauri::App;

    use crate::backend::TracingSink;

    #[cfg(unix)]
    fn app_with_sleeping_backend(runtime: &tokio::runtime::Runtime) -> App<MockRuntime> {
        let mut config = ShellConfig::default();
        config.backend.program = "sh".to_string();
        config.backend.args = vec!["-c".to_string(), "exec sleep 30".to_string()];

        let state = AppState::new(config, Arc::new(TracingSink));
        runtime.block_on(async { state.backend.spawn() }).unwrap();
        assert!(state.backend.is_running());

        let app = mock_app();
        app.manage(state);
        app
    }

    #[cfg(unix)]
    #[test]
    fn test_last_window_closed_kills_backend_once() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let app = app_with_sleeping_backend(&runtime);
        let handle = app.handle();

        assert_eq!(
            on_all_windows_closed(handle, false),
            CloseAction::TerminateAndExit
        );
        assert!(!handle.state::<AppState>().backend.is_running());

        // The exit that follows finds nothing left to kill
        handle_run_event(handle, RunEvent::Exit);
        assert!(!terminate_backend(handle));
    }

    #[cfg(unix)]
    #[test]
    fn test_background_platform_keeps_backend_alive() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let app = app_with_sleeping_backend(&runtime);
        let handle = app.handle();

        assert_eq!(on_all_windows_closed(handle, true), CloseAction::KeepRunning);
        assert!(handle.state::<AppState>().backend.is_running());

        handle_run_event(handle, RunEvent::Exit);
        assert!(!handle.state::<AppState>().backend.is_running());
        assert!(!terminate_backend(handle));
    }

    #[test]
    fn test_ensure_window_is_noop_with_open_window() {
        let app = mock_app();
        app.manage(AppState::new(ShellConfig::default(), Arc::new(TracingSink)));
        let handle = app.handle();

        WebviewWindowBuilder::new(handle, MAIN_WINDOW_LABEL, WebviewUrl::App("index.html".into()))
            .build()
            .unwrap();
        assert_eq!(handle.webview_windows().len(), 1);

        ensure_window(handle);
        assert_eq!(handle.webview_windows().len(), 1);
    }

    #[test]
    fn test_ensure_window_opens_one_window() {
        let app = mock_app();
        app.manage(AppState::new(ShellConfig::default(), Arc::new(TracingSink)));
        let handle = app.handle();

        ensure_window(handle);
        ensure_window(handle);

        let windows = handle.webview_windows();
        assert_eq!(windows.len(), 1);
        assert!(windows.contains_key(MAIN_WINDOW_LABEL));
    }

    #[test]
    fn test_missing_state_is_tolerated() {
        let app = mock_app();
        let handle = app.handle();

        ensure_window(handle);
        assert!(handle.webview_windows().is_empty());
        assert!(!terminate_backend(handle));
    }

    #[test]
    fn test_platform_policy_matches_target() {
        assert_eq!(platform_keeps_apps_alive(), cfg!(target_os = "macos"));
    }
}
