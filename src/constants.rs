#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Default service message pattern: `##teamcity[` followed by a payload and
/// the first `]` that is not preceded by a `|`. The match never crosses a
/// line break.
pub const DEFAULT_MSG_PATTERN: &str = r"##teamcity\[(.*?)(?<!\|)\]";

/// Escaped CR/LF pair as it appears inside a service message payload.
pub const ESCAPED_CRLF: &str = "|r|n";

/// Escaped LF, what [`ESCAPED_CRLF`] collapses to during extraction.
pub const ESCAPED_LF: &str = "|n";

/// Line ending used to join messages in a report sequence file.
pub const SEQUENCE_JOINER: &str = "\r\n";

/// Encoding report sequence files are read and written with.
pub const SEQUENCE_FILES_ENCODING: &str = "utf-8";

/// Default directory (relative to the project root) holding report sequences.
pub const REPORT_SEQ_DIR: &str = "reportSequences";

/// Default directory (relative to the project root) holding build projects.
pub const PROJECTS_DIR: &str = "projects";

/// Default build tool looked up on `PATH`.
pub const DEFAULT_BUILD_TOOL: &str = "gradle";

/// Placeholder for `flowId` attributes.
pub const FLOW_ID_PLACEHOLDER: &str = "##Flow_ID##";

/// Placeholder for `timestamp` attributes.
pub const TIMESTAMP_PLACEHOLDER: &str = "##Timestamp##";

/// Placeholder for `duration` attributes.
pub const DURATION_PLACEHOLDER: &str = "##Duration##";

/// Placeholder for assertion stacktraces in `details` attributes.
pub const ASSERT_STACKTRACE_PLACEHOLDER: &str = "##Assert_Stacktrace##";

/// Placeholder for the absolute checkout directory.
pub const CHECKOUT_DIR_PLACEHOLDER: &str = "##Checkout_directory##";

/// Environment variable exported to the build tool with the requested
/// version, and read by [`crate::config`].
pub const BUILD_TOOL_VERSION_ENV: &str = "SMCHECK_BUILD_TOOL_VERSION";
