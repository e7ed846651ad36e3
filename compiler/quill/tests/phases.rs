// Test code uses unwrap/expect for clarity - panics provide good test failure messages
#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Engine tests organised by the phase a template goes through.
//!
//! # Organization
//!
//! - `check/` - parsing and validation as seen through the engine
//! - `render/` - rendering, error locations, host data
//! - `cache/` - loading, revalidation and negative caching
//! - `config/` - builder defaults and settings files
//! - `common/` - shared test utilities
//!
//! # Running Phase Tests
//!
//! ```bash
//! cargo test -p quill --test phases
//! cargo test -p quill --test phases cache
//! ```

#[path = "phases/common/mod.rs"]
mod common;

#[path = "phases/check/mod.rs"]
mod check;

#[path = "phases/render/mod.rs"]
mod render;

#[path = "phases/cache/mod.rs"]
mod cache;

#[path = "phases/config/mod.rs"]
mod config;
