//! Run output and cross-repository aggregation for todolens.
//!
//! - [`records`] writes the per-repository CSV files and commit lookup
//! - [`aggregate`] reads those files back across a registry of samples
//! - [`format`] renders run and aggregation results as text, JSON or Markdown

pub mod aggregate;
pub mod format;
pub mod records;
