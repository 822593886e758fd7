//! HTML rendering of the post list.

pub mod views;
