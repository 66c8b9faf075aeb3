use regex::Regex;
use todolens_core::EventKind;

/// Line that closes a file section.
pub const SECTION_END: &str = "---";

/// Width of the diff marker (`"+ "`, `"- "`, `"  "`) in front of every body line.
pub const MARKER_WIDTH: usize = 2;

/// One item produced while scanning rendered file sections.
///
/// # Examples
///
/// ```
/// use todolens_difflens::parser::SectionItem;
///
/// let item = SectionItem::FileEntered("src/lib.rs".into());
/// assert!(matches!(item, SectionItem::FileEntered(ref p) if p == "src/lib.rs"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionItem {
    /// A file section began; the path was touched by this commit.
    FileEntered(String),
    /// A changed line matched the token pattern.
    Marker(MarkerLine),
}

/// A changed line that matched the token pattern, before it is tied to a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerLine {
    /// `+ ` lines are added, `- ` lines are deleted.
    pub kind: EventKind,
    /// The line with its diff marker stripped.
    pub body: String,
    /// The line and the following `lines_after` lines, stripped, trimmed and space-joined.
    pub context: String,
    /// Path from the enclosing section header.
    pub path: String,
}

#[derive(Debug)]
enum State {
    BetweenFiles,
    InFile { path: String },
}

/// Scans rendered file sections and yields touched paths and TODO lines.
///
/// The text is a sequence of sections, each a path header, marked body lines
/// and a closing [`SECTION_END`]. The scan is a two-state machine: between
/// files the next non-blank line is taken as the path; inside a file every
/// line is checked against the token pattern until the closing line.
///
/// Only lines starting with exactly `"+ "` or `"- "` produce markers; other
/// matching lines are skipped. A section that never closes simply ends with
/// the input.
///
/// # Examples
///
/// ```
/// use regex::Regex;
/// use todolens_core::EventKind;
/// use todolens_difflens::parser::{SectionItem, SectionParser};
///
/// let pattern = Regex::new("(?i)TODO|FIXME").unwrap();
/// let text = "src/main.rs\n+ // TODO: handle errors\n+ run();\n  }\n---";
/// let items: Vec<_> = SectionParser::new(text, 1, &pattern).collect();
///
/// assert_eq!(items.len(), 2);
/// let SectionItem::Marker(marker) = &items[1] else { panic!("expected a marker") };
/// assert_eq!(marker.kind, EventKind::Added);
/// assert_eq!(marker.body, "// TODO: handle errors");
/// assert_eq!(marker.context, "// TODO: handle errors run();");
/// ```
#[derive(Debug)]
pub struct SectionParser<'a> {
    lines: Vec<&'a str>,
    cursor: usize,
    state: State,
    lines_after: usize,
    pattern: &'a Regex,
}

impl<'a> SectionParser<'a> {
    /// Create a parser over `text`, capturing `lines_after` lines of context.
    pub fn new(text: &'a str, lines_after: usize, pattern: &'a Regex) -> Self {
        Self {
            lines: text.split('\n').collect(),
            cursor: 0,
            state: State::BetweenFiles,
            lines_after,
            pattern,
        }
    }

    /// Context window starting at `index`, stopping early at the section end.
    fn context_at(&self, index: usize) -> String {
        let end = index
            .saturating_add(1)
            .saturating_add(self.lines_after)
            .min(self.lines.len());
        self.lines[index..end]
            .iter()
            .take_while(|line| **line != SECTION_END)
            .map(|line| strip_marker(line).trim())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Iterator for SectionParser<'_> {
    type Item = SectionItem;

    fn next(&mut self) -> Option<SectionItem> {
        loop {
            let index = self.cursor;
            let line = *self.lines.get(index)?;
            self.cursor += 1;

            match &self.state {
                State::BetweenFiles => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    self.state = State::InFile {
                        path: line.to_string(),
                    };
                    return Some(SectionItem::FileEntered(line.to_string()));
                }
                State::InFile { path } => {
                    if line == SECTION_END {
                        self.state = State::BetweenFiles;
                        continue;
                    }
                    if !self.pattern.is_match(line) {
                        continue;
                    }
                    let Some(kind) = marker_kind(line) else {
                        continue;
                    };
                    return Some(SectionItem::Marker(MarkerLine {
                        kind,
                        body: strip_marker(line).to_string(),
                        context: self.context_at(index),
                        path: path.clone(),
                    }));
                }
            }
        }
    }
}

/// Event kind for a changed line, requiring a marker followed by one space.
fn marker_kind(line: &str) -> Option<EventKind> {
    let mut chars = line.chars();
    let marker = chars.next()?;
    if chars.next() != Some(' ') {
        return None;
    }
    EventKind::from_marker(marker)
}

/// Drop the first [`MARKER_WIDTH`] characters of a line.
///
/// # Examples
///
/// ```
/// use todolens_difflens::parser::strip_marker;
///
/// assert_eq!(strip_marker("+ let x = 1;"), "let x = 1;");
/// assert_eq!(strip_marker("+"), "");
/// ```
pub fn strip_marker(line: &str) -> &str {
    let mut chars = line.chars();
    for _ in 0..MARKER_WIDTH {
        chars.next();
    }
    chars.as_str()
}
