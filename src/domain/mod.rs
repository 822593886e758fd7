//! Domain layer types and invariants.

pub mod engagement;
pub mod posts;
