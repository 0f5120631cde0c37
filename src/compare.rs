#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use itertools::Itertools;
use similar::TextDiff;

use crate::{message::Message, normalize::Normalizer};

#[derive(Debug, thiserror::Error)]
/// A captured sequence that does not match its expectation.
pub enum ComparisonError {
    /// Captured and expected sequences have a different number of messages.
    #[error("Sequences differ in size ({actual} actual, {expected} expected). {report}")]
    SizeMismatch {
        /// Number of captured messages.
        actual:   usize,
        /// Number of expected messages.
        expected: usize,
        /// Both sequences rendered for diagnosis.
        report:   String,
    },
    /// An expected message has no counterpart among the captured ones.
    #[error("Could not find {message} in actual sequence: {report}")]
    Missing {
        /// The expected message that was not found.
        message: String,
        /// Remaining captured messages and the full expectation.
        report:  String,
    },
}

impl ComparisonError {
    /// Returns the rendered diagnostic report.
    pub fn report(&self) -> &str {
        match self {
            ComparisonError::SizeMismatch { report, .. } => report,
            ComparisonError::Missing { report, .. } => report,
        }
    }
}

/// Renders both sequences, one message per line.
pub fn render_sequences<A, E>(actual: &[A], expected: &[E]) -> String
where
    A: AsRef<str>,
    E: AsRef<str>,
{
    format!(
        "\nActual messages:\n{}\n\nExpected messages: {}",
        actual.iter().map(AsRef::as_ref).join("\n"),
        expected.iter().map(AsRef::as_ref).join("\n"),
    )
}

/// Line diff of both sequences after sorting, so that a single missing or
/// extra message stands out regardless of emission order.
fn sorted_diff(actual: &[Message], expected: &[String]) -> String {
    let mut actual_lines = actual.iter().map(Message::as_str).collect::<Vec<_>>();
    let mut expected_lines = expected.iter().map(String::as_str).collect::<Vec<_>>();
    actual_lines.sort_unstable();
    expected_lines.sort_unstable();

    let old = expected_lines.iter().map(|l| format!("{l}\n")).collect::<String>();
    let new = actual_lines.iter().map(|l| format!("{l}\n")).collect::<String>();

    TextDiff::from_lines(&old, &new)
        .unified_diff()
        .header("expected", "actual")
        .to_string()
}

/// Checks that `actual` holds exactly the `expected` messages, in any order.
///
/// Sizes are compared first. Captured messages are then normalized and every
/// expected message must consume one equal captured message, so duplicates
/// have to appear the same number of times on both sides.
pub fn assert_service_messages(
    actual: &[Message],
    expected: &[String],
    normalizer: &Normalizer,
) -> Result<(), ComparisonError> {
    if actual.len() != expected.len() {
        let normalized = normalizer.normalize_all(actual);
        let report = format!(
            "{}\n\nDifference (sorted, after normalization):\n{}",
            render_sequences(actual, expected),
            sorted_diff(&normalized, expected)
        );
        return Err(ComparisonError::SizeMismatch {
            actual: actual.len(),
            expected: expected.len(),
            report,
        });
    }

    let mut remaining = normalizer.normalize_all(actual);
    for expected_msg in expected {
        match remaining.iter().position(|m| m == expected_msg) {
            Some(index) => {
                remaining.remove(index);
            }
            None => {
                return Err(ComparisonError::Missing {
                    message: expected_msg.clone(),
                    report:  render_sequences(&remaining, expected),
                });
            }
        }
    }

    Ok(())
}
