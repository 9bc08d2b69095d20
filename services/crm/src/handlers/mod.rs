pub mod actor;
pub mod orders;
pub mod rules;
