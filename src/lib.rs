//! facciata — a multi-site rendering gateway for headless content APIs.
//!
//! Serves HTTP requests for independently-configured sites backed by a remote
//! content API: each request resolves to cached or freshly-fetched content
//! and produces a redirect, an error body, or rendered content. A per-site
//! coalescing queue keeps the response cache consistent with upstream edits
//! without purging on every mutation notification.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
