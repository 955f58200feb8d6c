//! gRPC service implementation and worker coordination logic.
//!
//! ## Structure
//!
//! - [`handler`] - gRPC service entry point (`GreeterService`).

pub mod handler;
