#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// A single service message captured from build output, e.g.
/// `##teamcity[testStarted name='foo']`.
pub struct Message(String);

/// Messages in the order they were emitted.
pub type MessageSequence = Vec<Message>;

impl Message {
    /// Wraps raw message text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Returns the message text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwraps the message text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Message {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl PartialEq<str> for Message {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Message {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<String> for Message {
    fn eq(&self, other: &String) -> bool {
        &self.0 == other
    }
}
