#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use itertools::Itertools;

use crate::{
    constants::{REPORT_SEQ_DIR, SEQUENCE_FILES_ENCODING, SEQUENCE_JOINER},
    message::Message,
    normalize::Normalizer,
};

peg::parser! {
    /// Grammar for report sequence files.
    pub grammar sequence() for str {
        /// a single CR or LF
        rule line_end() = ['\r' | '\n']

        /// any two line-ending characters, or a lone one directly followed by
        /// a `!` and the opposite line-ending character
        rule separator()
            = line_end() line_end()
            / "\n" &"!\r"
            / "\r" &"!\n"

        /// everything up to the next separator
        rule segment() -> &'input str
            = $((!separator() [_])*)

        /// splits a whole file into segments
        pub rule segments() -> Vec<&'input str>
            = s:(segment() ** separator()) { s }
    }
}

/// Splits the contents of a report sequence file into messages.
///
/// Trailing empty segments are dropped, so an empty file or a file ending in
/// a line break yields no extra message.
pub fn split_sequence(text: &str) -> Result<Vec<String>> {
    let mut segments = sequence::segments(text).context("Could not split report sequence")?;
    while segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }
    Ok(segments.into_iter().map(str::to_string).collect())
}

/// Normalizes `messages` and joins them with CRLF.
pub fn join_sequence(messages: &[Message], normalizer: &Normalizer) -> String {
    normalizer
        .normalize_all(messages)
        .iter()
        .map(Message::as_str)
        .join(SEQUENCE_JOINER)
}

#[derive(Debug, Clone)]
/// Location of golden report sequences.
pub struct GoldenStore {
    /// Directory holding one file per sequence.
    dir: PathBuf,
}

impl GoldenStore {
    /// Creates a store for `<root>/<sequence_dir>`.
    pub fn new(root: impl AsRef<Path>, sequence_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join(sequence_dir),
        }
    }

    /// Returns the directory holding the sequences.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file a sequence named `name` lives in.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Whether a golden sequence named `name` has been recorded.
    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Loads the golden sequence named `name`.
    pub fn read_report_sequence(&self, name: &str) -> Result<Vec<String>> {
        let path = self.path_for(name);
        let text = std::fs::read_to_string(&path).with_context(|| {
            format!("Could not read {} as {SEQUENCE_FILES_ENCODING}", path.display())
        })?;
        split_sequence(&text).with_context(|| format!("Malformed sequence {}", path.display()))
    }

    /// Normalizes `messages` and saves them as the golden sequence `name`,
    /// returning the written path.
    pub fn write_report_sequence(
        &self,
        name: &str,
        messages: &[Message],
        normalizer: &Normalizer,
    ) -> Result<PathBuf> {
        let path = self.path_for(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }
        std::fs::write(&path, join_sequence(messages, normalizer))
            .with_context(|| format!("Could not write {}", path.display()))?;

        tracing::info!("Wrote {} messages to {}", messages.len(), path.display());
        Ok(path)
    }
}

impl Default for GoldenStore {
    fn default() -> Self {
        Self::new(".", REPORT_SEQ_DIR)
    }
}
