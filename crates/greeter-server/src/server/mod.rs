//! Server-side building blocks of the greeter.
//!
//! - [`config`] - CLI arguments and validated runtime configuration.
//! - [`service`] - gRPC entry point (`GreeterService`).
//! - [`pool`] - Worker pool and per-worker loop.
//! - [`streaming`] - Work requests and the per-stream greeting producer.
//! - [`telemetry`] - Logging, optional OpenTelemetry export and metrics.

pub mod config;
pub mod pool;
pub mod service;
pub mod streaming;
pub mod telemetry;
