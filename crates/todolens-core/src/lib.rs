//! Core types, configuration, and error handling for todolens.
//!
//! This crate provides the shared foundation used by all other todolens crates:
//! - [`LensError`]: unified error type using `thiserror`
//! - [`LensConfig`]: configuration loaded from `.todolens.toml`
//! - Shared types: [`CommitRef`], [`DiffEvent`], [`EventKind`], [`OutputFormat`]
//! - [`clock`]: epoch and human-readable timestamp conversions

pub mod clock;
mod config;
mod error;
mod types;

pub use config::{
    safe_handle, AggregateConfig, LensConfig, RunConfig, WalkConfig,
    DEFAULT_TOKEN_PATTERN,
};
pub use error::LensError;
pub use types::{CommitRef, DiffEvent, EventKind, OutputFormat};

/// A convenience `Result` type for todolens operations.
pub type Result<T> = std::result::Result<T, LensError>;
