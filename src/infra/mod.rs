//! Infrastructure: HTTP boundary, upstream clients, telemetry.

pub mod error;
pub mod http;
pub mod purge;
pub mod telemetry;
pub mod upstream;
