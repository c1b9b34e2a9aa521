// src/config/mod.rs

//! Feed-list configuration.
//!
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a feed list from disk (`loader.rs`).
//! - Validate it (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_builtin};
pub use model::{DownloadSection, FeedConfig, FeedsFile, RawFeedsFile};
