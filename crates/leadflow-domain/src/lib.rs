//! Domain types shared across Leadflow services.
//!
//! This crate contains only pure types with no framework dependencies.
//! Import in `usecase/` and `domain/` layers; never in `infra/` or `handlers/`.

pub mod call;
pub mod id;
pub mod pagination;
pub mod status;
