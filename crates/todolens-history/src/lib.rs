//! Git history mining for TODO/FIXME lifecycles.
//!
//! Walks commit history through a [`mining::CommitSource`], scans every
//! changed file for TODO lines, merges them into [`tracker::TodoEntity`]
//! values keyed by their exact text, and derives per-TODO and per-repository
//! statistics once the walk is complete.

pub mod memory;
pub mod mining;
pub mod stats;
pub mod tracker;
pub mod walker;
