#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{str::FromStr, sync::LazyLock};

use anyhow::{Context, Result};
use fancy_regex::Regex;

use crate::{
    constants::{DEFAULT_MSG_PATTERN, ESCAPED_CRLF, ESCAPED_LF},
    message::Message,
};

/// Compiled form of [`DEFAULT_MSG_PATTERN`].
static DEFAULT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_MSG_PATTERN).expect("default service message regex"));

#[derive(Debug, Clone)]
/// Delimiter pattern used to find service messages in arbitrary output.
pub struct MessagePattern {
    /// The compiled pattern; every match is one message.
    regex: Regex,
}

impl MessagePattern {
    /// Compiles `pattern` into a message pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .with_context(|| format!("Invalid service message pattern: {pattern}"))?;
        Ok(Self { regex })
    }

    /// Returns the pattern source.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Lazily yields every message in `text`, in order of appearance.
    ///
    /// Escaped CR/LF pairs (`|r|n`) inside a message are collapsed to `|n` so
    /// that output captured on different platforms compares equal.
    pub fn extract<'a>(&'a self, text: &'a str) -> impl Iterator<Item = Message> + 'a {
        self.regex
            .find_iter(text)
            .filter_map(|found| match found {
                Ok(found) => Some(found),
                Err(e) => {
                    tracing::warn!("Skipped a service message candidate: {e}");
                    None
                }
            })
            .map(|found| {
                let message = Message::new(found.as_str().replace(ESCAPED_CRLF, ESCAPED_LF));
                tracing::debug!("Captured service message: {message}");
                message
            })
    }

    /// Collects every message in `text`.
    pub fn extract_all(&self, text: &str) -> Vec<Message> {
        self.extract(text).collect()
    }
}

impl Default for MessagePattern {
    fn default() -> Self {
        Self {
            regex: DEFAULT_REGEX.clone(),
        }
    }
}

impl FromStr for MessagePattern {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}
