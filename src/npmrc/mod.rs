//! Line-oriented `key = value` configuration files such as `.npmrc`.
//!
//! A file parses into an ordered [`ParsedConfig`]. Lines of the form
//! `key = value` become active entries; the same grammar behind a comment
//! marker becomes an inert entry; everything else is kept verbatim and is
//! never a merge target.

mod file;
mod merge;

pub(crate) use file::write_file_atomic;
pub use file::{RcError, RcFile};
pub use merge::MergeIntent;

/// A `key = value` line, active or commented out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLine {
    pub key: String,
    pub value: String,
    pub comment: bool,
}

impl ConfigLine {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            comment: false,
        }
    }

    /// The same key/value, marked inert.
    pub fn into_comment(self) -> Self {
        Self {
            comment: true,
            ..self
        }
    }

    fn render(&self, marker: char) -> String {
        if self.comment {
            format!("{marker} {} = {}", self.key, self.value)
        } else {
            format!("{} = {}", self.key, self.value)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Entry(ConfigLine),
    Verbatim(String),
}

impl Line {
    /// The entry on this line, if it has one.
    pub fn entry(&self) -> Option<&ConfigLine> {
        match self {
            Line::Entry(entry) => Some(entry),
            Line::Verbatim(_) => None,
        }
    }
}

/// Ordered lines of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedConfig {
    lines: Vec<Line>,
}

impl ParsedConfig {
    pub fn parse(text: &str, marker: char) -> Self {
        let lines = text.lines().map(|line| parse_line(line, marker)).collect();
        Self { lines }
    }

    /// Serialize, ending with a newline when there is any content.
    ///
    /// Entries render as `key = value` or `{marker} key = value`; verbatim
    /// lines are emitted unchanged.
    pub fn render(&self, marker: char) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Entry(entry) => out.push_str(&entry.render(marker)),
                Line::Verbatim(text) => out.push_str(text),
            }
            out.push('\n');
        }
        out
    }

    pub fn entries(&self) -> impl Iterator<Item = &ConfigLine> {
        self.lines.iter().filter_map(Line::entry)
    }

    /// Active value for `key`, the last one winning.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries()
            .filter(|entry| !entry.comment && entry.key == key)
            .last()
            .map(|entry| entry.value.as_str())
    }

    pub fn push(&mut self, entry: ConfigLine) {
        self.lines.push(Line::Entry(entry));
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl FromIterator<Line> for ParsedConfig {
    fn from_iter<I: IntoIterator<Item = Line>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ParsedConfig {
    type Item = Line;
    type IntoIter = std::vec::IntoIter<Line>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.into_iter()
    }
}

fn parse_line(line: &str, marker: char) -> Line {
    let trimmed = line.trim_start();
    let (body, comment) = match trimmed.strip_prefix(marker) {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };

    match split_key_value(body) {
        Some((key, value)) => Line::Entry(ConfigLine {
            key: key.to_string(),
            value: value.to_string(),
            comment,
        }),
        None => Line::Verbatim(line.to_string()),
    }
}

/// `key = value` with a non-empty, whitespace-free key.
fn split_key_value(body: &str) -> Option<(&str, &str)> {
    let (key, value) = body.split_once('=')?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key, value.trim()))
}
