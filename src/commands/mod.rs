//! Tauri commands module
//!
//! `calculate` is the only command exposed to the webview.

pub mod calculate;
