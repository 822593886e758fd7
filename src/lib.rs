//! Marginalia: progressive enhancement for statically rendered blogs.
//!
//! Two halves share one crate:
//!
//! - a filter/paginate/render loop over a server-rendered post list, with
//!   month headings, year filters, paged or incremental windows and
//!   URL-backed history
//! - engagement widgets that pull Mastodon, Bluesky and webmention data
//!   through a TTL response cache over key-value storage

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
