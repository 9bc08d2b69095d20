//! Cross-cutting plumbing shared by Leadflow services: configuration loading,
//! tracing setup, health probes, request ids, time.

pub mod clock;
pub mod config;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
