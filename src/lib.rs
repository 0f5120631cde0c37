//! # smcheck
//!
//! Captures the service messages a build tool prints, masks the parts that
//! change from run to run, and checks them against a recorded golden
//! sequence.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Comparing captured messages with expectations
pub mod compare;
/// Environment driven settings
pub mod config;
/// A module defining a bunch of constant values to be used throughout
pub mod constants;
/// Finding service messages in build output
pub mod extract;
/// Reading and writing golden report sequences
pub mod golden;
/// Running builds and checking them against golden sequences
pub mod harness;
/// The message value type
pub mod message;
/// Masking volatile message fields
pub mod normalize;
/// Spawning the build tool and collecting its output
pub mod process;
/// Receivers of build output
pub mod sink;

pub use compare::{ComparisonError, assert_service_messages};
pub use extract::MessagePattern;
pub use golden::GoldenStore;
pub use harness::{
    BuildLauncher, CheckReport, ProcessLauncher, ReplayLauncher, RunConfiguration, RunError,
    ServiceMessageChecker,
};
pub use message::{Message, MessageSequence};
pub use normalize::{NormalizationRule, Normalizer, default_rules};
pub use sink::{CollectMode, MessageCollector, MessageSink, RecordingSink, SinkCall, TracingSink};
