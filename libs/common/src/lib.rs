//! Shared service plumbing for the envsrv sensor collectors
//!
//! Provides the pieces every collector process needs before it touches a bus:
//! - logging (console + optional rolling file)
//! - startup bootstrap (banner, development `.env`, logging init)
//! - common command-line arguments
//! - shutdown signal handling
//! - hex helpers for raw frame diagnostics

pub mod bootstrap_args;
pub mod hex;
pub mod logging;
pub mod service_bootstrap;
pub mod shutdown;

pub use bootstrap_args::ServiceArgs;
pub use service_bootstrap::ServiceInfo;
