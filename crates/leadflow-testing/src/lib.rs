//! Test utilities for Leadflow services.
//!
//! Provides `FixedClock` and the JSON fixture loader.
//! For `#[cfg(test)]` blocks and integration tests only.

pub mod clock;
pub mod fixture;
