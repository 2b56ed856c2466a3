//! Calculator backend
//!
//! The shell launches the backend as a child process and relays `calculate`
//! requests to it over local HTTP.

pub mod client;
mod process;

pub use client::{BackendClient, CalculateRequest};
pub use process::{BackendSupervisor, OutputSink, OutputStream, TracingSink};
