//! Application services: list view state machine and engagement widgets.

pub mod engagement;
pub mod error;
pub mod history;
pub mod listing;
pub mod parse;
pub mod scroll;
pub mod search;
pub mod sources;
