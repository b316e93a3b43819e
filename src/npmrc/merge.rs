use super::{ConfigLine, Line, ParsedConfig};

/// How a new `key = value` fact is merged into an existing file.
///
/// Both policies are idempotent, leave lines with other keys where they
/// were, and end with exactly one active line for the key, placed last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeIntent {
    /// Drop every line for `key`, then append the new value.
    Replace { key: String, value: String },
    /// Drop lines for `key` that already hold `value`, comment out the
    /// remaining lines for `key`, then append the new value.
    CommentAndReplace { key: String, value: String },
}

impl MergeIntent {
    pub fn replace(key: impl Into<String>, value: impl Into<String>) -> Self {
        MergeIntent::Replace {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn comment_and_replace(key: impl Into<String>, value: impl Into<String>) -> Self {
        MergeIntent::CommentAndReplace {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn apply(&self, config: ParsedConfig) -> ParsedConfig {
        match self {
            MergeIntent::Replace { key, value } => {
                let mut merged: ParsedConfig = config
                    .into_iter()
                    .filter(|line| !line.entry().is_some_and(|entry| &entry.key == key))
                    .collect();
                merged.push(ConfigLine::new(key.clone(), value.clone()));
                merged
            }
            MergeIntent::CommentAndReplace { key, value } => {
                let mut merged: ParsedConfig = config
                    .into_iter()
                    .filter(|line| {
                        !line
                            .entry()
                            .is_some_and(|entry| &entry.key == key && &entry.value == value)
                    })
                    .map(|line| match line {
                        Line::Entry(entry) if &entry.key == key => Line::Entry(entry.into_comment()),
                        other => other,
                    })
                    .collect();
                merged.push(ConfigLine::new(key.clone(), value.clone()));
                merged
            }
        }
    }
}
