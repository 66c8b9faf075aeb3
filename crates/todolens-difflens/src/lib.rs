//! Diff section rendering and TODO-line scanning.
//!
//! A commit's change to one file is rendered as a *section*: the path, the
//! changed and context lines each prefixed with a two-character marker, and a
//! closing `---`. [`parser::SectionParser`] turns that text back into touched
//! paths and Added/Deleted TODO lines.

pub mod parser;
pub mod render;
