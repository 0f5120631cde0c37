#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

use crate::{
    constants::{
        ASSERT_STACKTRACE_PLACEHOLDER, CHECKOUT_DIR_PLACEHOLDER, DURATION_PLACEHOLDER,
        FLOW_ID_PLACEHOLDER, TIMESTAMP_PLACEHOLDER,
    },
    message::Message,
};

#[derive(Debug, Clone)]
/// A pattern/replacement pair that rewrites one kind of volatile detail into
/// a stable placeholder.
pub struct NormalizationRule {
    /// Pattern matching the volatile text.
    pattern:     Regex,
    /// Replacement, may refer to capture groups (`${1}`).
    replacement: String,
}

impl NormalizationRule {
    /// Creates a rule from a regular expression and its replacement.
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .with_context(|| format!("Invalid normalization pattern: {pattern}"))?;
        Ok(Self {
            pattern,
            replacement: replacement.into(),
        })
    }

    /// Creates a rule replacing every occurrence of `text` verbatim.
    ///
    /// `$` in the replacement is not expanded.
    pub fn literal(text: &str, replacement: impl Into<String>) -> Result<Self> {
        let replacement: String = replacement.into();
        Self::new(&regex::escape(text), replacement.replace('$', "$$"))
    }

    /// Returns the pattern source.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Returns the replacement string.
    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Applies this rule to `text`.
    pub fn apply(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, self.replacement.as_str())
            .into_owned()
    }
}

/// Builds the standard rule list, in application order.
///
/// Path separators are normalized before the checkout directory is replaced,
/// so a Windows checkout path matches its forward-slash form. The checkout
/// rule is left out when `checkout_dir` is `None` or empty.
pub fn default_rules(checkout_dir: Option<&Path>) -> Result<Vec<NormalizationRule>> {
    let mut rules = vec![
        NormalizationRule::new(r"flowId='\d+'", format!("flowId='{FLOW_ID_PLACEHOLDER}'"))?,
        NormalizationRule::new(
            r"timestamp='[^']*'",
            format!("timestamp='{TIMESTAMP_PLACEHOLDER}'"),
        )?,
        // drop up-to-date marks
        NormalizationRule::new(r"(name|compiler)='(.*?)( UP-TO-DATE)*'", "${1}='${2}'")?,
        NormalizationRule::new(r"duration='\d+'", format!("duration='{DURATION_PLACEHOLDER}'"))?,
        NormalizationRule::new(
            r"details='java\.lang\.AssertionError.*?[^|]'",
            format!("details='{ASSERT_STACKTRACE_PLACEHOLDER}'"),
        )?,
        NormalizationRule::literal("\\", "/")?,
    ];

    if let Some(dir) = checkout_dir {
        let dir = dir.display().to_string().replace('\\', "/");
        if !dir.is_empty() {
            rules.push(NormalizationRule::literal(&dir, CHECKOUT_DIR_PLACEHOLDER)?);
        }
    }

    Ok(rules)
}

#[derive(Debug, Clone, Default)]
/// Applies an ordered list of [`NormalizationRule`]s to messages.
///
/// Normalization is a pure function of the message and the rule list; later
/// rules see the output of earlier ones.
pub struct Normalizer {
    /// Rules in application order.
    rules: Vec<NormalizationRule>,
}

impl Normalizer {
    /// Creates a normalizer applying `rules` in order.
    pub fn new(rules: Vec<NormalizationRule>) -> Self {
        Self { rules }
    }

    /// Creates a normalizer with [`default_rules`].
    pub fn with_default_rules(checkout_dir: Option<&Path>) -> Result<Self> {
        Ok(Self::new(default_rules(checkout_dir)?))
    }

    /// Returns the rules in application order.
    pub fn rules(&self) -> &[NormalizationRule] {
        &self.rules
    }

    /// Returns a normalized copy of `message`.
    pub fn normalize(&self, message: &Message) -> Message {
        let text = self
            .rules
            .iter()
            .fold(message.as_str().to_string(), |text, rule| rule.apply(&text));
        Message::new(text)
    }

    /// Normalizes every message, keeping order.
    pub fn normalize_all(&self, messages: &[Message]) -> Vec<Message> {
        messages.iter().map(|m| self.normalize(m)).collect()
    }
}
