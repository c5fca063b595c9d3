//! VDDKFlow server and CLI plumbing
//!
//! `vddkflow serve` exposes the build pipeline of `vddkflow-core` over
//! HTTP, backed by OpenShift through `vddkflow-build`.

pub mod handlers;
pub mod plugin;
pub mod response;
pub mod server;

pub use response::ApiError;
pub use server::{AppState, openshift_service, router, serve};
