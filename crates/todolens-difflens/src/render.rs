//! Rendering of one changed file into the section text read by
//! [`SectionParser`](crate::parser::SectionParser).

use crate::parser::SECTION_END;

/// Accumulates the text of one file section.
///
/// Every body line is written as its origin character (`+`, `-` or a space),
/// one separating space and the line content without its line terminator.
///
/// # Examples
///
/// ```
/// use todolens_difflens::render::SectionWriter;
///
/// let mut section = SectionWriter::new("src/lib.rs");
/// section.push_line('+', "// TODO: docs\n");
/// section.push_line(' ', "fn f() {}\r\n");
/// assert_eq!(section.finish(), "src/lib.rs\n+ // TODO: docs\n  fn f() {}\n---");
/// ```
#[derive(Debug, Clone)]
pub struct SectionWriter {
    text: String,
}

impl SectionWriter {
    /// Start a section for `path`.
    pub fn new(path: &str) -> Self {
        let mut text = String::with_capacity(path.len() + 64);
        text.push_str(path);
        text.push('\n');
        Self { text }
    }

    /// Append a body line; origins other than `+`, `-` and space are ignored.
    pub fn push_line(&mut self, origin: char, content: &str) {
        if !matches!(origin, '+' | '-' | ' ') {
            return;
        }
        self.text.push(origin);
        self.text.push(' ');
        self.text.push_str(content.trim_end_matches(['\n', '\r']));
        self.text.push('\n');
    }

    /// Close the section and return its text.
    pub fn finish(mut self) -> String {
        self.text.push_str(SECTION_END);
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_section_has_header_and_end() {
        assert_eq!(SectionWriter::new("bin.png").finish(), "bin.png\n---");
    }

    #[test]
    fn unknown_origins_are_dropped() {
        let mut section = SectionWriter::new("a.rs");
        section.push_line('>', "\\ No newline at end of file");
        section.push_line('-', "old");
        assert_eq!(section.finish(), "a.rs\n- old\n---");
    }

    #[test]
    fn content_that_looks_like_the_end_is_marked() {
        let mut section = SectionWriter::new("notes.md");
        section.push_line('+', "---");
        assert_eq!(section.finish(), "notes.md\n+ ---\n---");
    }
}
