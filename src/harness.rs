#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use typed_builder::TypedBuilder;

use crate::{
    compare::{ComparisonError, assert_service_messages},
    config::Settings,
    constants::{BUILD_TOOL_VERSION_ENV, DEFAULT_MSG_PATTERN},
    extract::MessagePattern,
    golden::GoldenStore,
    normalize::Normalizer,
    process::{OutputLine, run_collect},
    sink::{CollectMode, MessageCollector, MessageSink, TracingSink},
};

#[derive(Debug, Clone, TypedBuilder)]
#[builder(doc)]
/// One build to run and the golden sequence it is checked against.
pub struct RunConfiguration {
    /// Project directory name, relative to the projects directory.
    #[builder(setter(into))]
    project:            String,
    /// Whitespace separated arguments handed to the build tool.
    #[builder(setter(into))]
    command:            String,
    /// File name of the golden sequence.
    #[builder(setter(into))]
    sequence_file_name: String,
    /// Build tool version; falls back to the launcher's default when unset.
    #[builder(default, setter(into, strip_option))]
    build_tool_version: Option<String>,
    /// Service message pattern.
    #[builder(default = DEFAULT_MSG_PATTERN.to_string(), setter(into))]
    pattern:            String,
}

impl RunConfiguration {
    /// Creates a configuration with the default message pattern.
    pub fn new(
        project: impl Into<String>,
        command: impl Into<String>,
        sequence_file_name: impl Into<String>,
    ) -> Self {
        Self::builder()
            .project(project)
            .command(command)
            .sequence_file_name(sequence_file_name)
            .build()
    }

    /// gets the `project` field
    pub fn project(&self) -> &str {
        &self.project
    }

    /// gets the `command` field
    pub fn command(&self) -> &str {
        &self.command
    }

    /// gets the `sequence_file_name` field
    pub fn sequence_file_name(&self) -> &str {
        &self.sequence_file_name
    }

    /// gets the `build_tool_version` field
    pub fn build_tool_version(&self) -> Option<&str> {
        self.build_tool_version.as_deref()
    }

    /// sets the `build_tool_version` field
    pub fn set_build_tool_version(mut self, version: impl Into<String>) -> Self {
        self.build_tool_version = Some(version.into());
        self
    }

    /// gets the `pattern` field
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// sets the `pattern` field
    pub fn set_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }
}

/// Runs a build and reports its output to a sink.
pub trait BuildLauncher {
    /// Runs the build described by `config` to completion, reporting every
    /// line of output to `sink`.
    fn launch(&self, config: &RunConfiguration, sink: &mut dyn MessageSink) -> Result<()>;
}

/// Launches the build tool as a child process.
///
/// Stdout lines become messages and stderr lines become warnings, in the
/// order they are read. A failing exit status is reported as an error.
pub struct ProcessLauncher {
    /// Runtime driving the child process.
    runtime:         tokio::runtime::Runtime,
    /// Build tool executable.
    build_tool:      OsString,
    /// Directory holding one sub-directory per project.
    projects_dir:    PathBuf,
    /// Version used when a configuration does not name one.
    default_version: Option<String>,
    /// Upper bound on a single run.
    timeout:         Option<Duration>,
}

impl ProcessLauncher {
    /// Creates a launcher for `build_tool`, running projects under
    /// `projects_dir`.
    pub fn new(build_tool: impl Into<OsString>, projects_dir: impl Into<PathBuf>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start the process runtime")?;
        Ok(Self {
            runtime,
            build_tool: build_tool.into(),
            projects_dir: projects_dir.into(),
            default_version: None,
            timeout: None,
        })
    }

    /// Creates a launcher from global settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut launcher = Self::new(settings.build_tool().clone(), settings.projects_dir())?;
        launcher.default_version = settings.build_tool_version().map(str::to_string);
        launcher.timeout = settings.timeout();
        Ok(launcher)
    }

    /// Directory the build for `project` runs in.
    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.projects_dir.join(project)
    }
}

impl BuildLauncher for ProcessLauncher {
    fn launch(&self, config: &RunConfiguration, sink: &mut dyn MessageSink) -> Result<()> {
        let cwd = self.project_dir(config.project());
        let args = config
            .command()
            .split_whitespace()
            .map(OsString::from)
            .collect::<Vec<_>>();

        let mut env = Vec::new();
        if let Some(version) = config
            .build_tool_version()
            .or(self.default_version.as_deref())
        {
            env.push((OsString::from(BUILD_TOOL_VERSION_ENV), OsString::from(version)));
        }

        tracing::info!(
            "Running `{} {}` in {}",
            self.build_tool.to_string_lossy(),
            config.command(),
            cwd.display()
        );
        let collected = self
            .runtime
            .block_on(run_collect(&self.build_tool, &args, Some(&cwd), &env, self.timeout))
            .with_context(|| format!("Could not run build for project {}", config.project()))?;

        for line in &collected.lines {
            match line {
                OutputLine::Stdout(text) => sink.message(text),
                OutputLine::Stderr(text) => sink.warning(text),
            }
        }
        if !collected.status.success() {
            sink.error(&format!("Process exited with {}", collected.status));
        }
        Ok(())
    }
}

/// Replays previously captured output as if a build had printed it.
#[derive(Debug, Clone, Default)]
pub struct ReplayLauncher {
    /// Captured output lines.
    lines: Vec<String>,
}

impl ReplayLauncher {
    /// Creates a launcher replaying `text` line by line.
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    /// Reads captured output from `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read captured output {}", path.display()))?;
        Ok(Self::new(&text))
    }
}

impl BuildLauncher for ReplayLauncher {
    fn launch(&self, _config: &RunConfiguration, sink: &mut dyn MessageSink) -> Result<()> {
        for line in &self.lines {
            sink.message(line);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
/// Why a checked run failed.
pub enum RunError {
    /// Captured messages do not match the golden sequence.
    #[error(transparent)]
    Mismatch(#[from] ComparisonError),
    /// The build runner reported an internal error while comparing.
    #[error("Unexpected internal error during the build: {message}")]
    InternalError {
        /// The first internal error reported.
        message: String,
    },
    /// No golden sequence existed, so one was written. This always fails the
    /// run so that the new sequence gets reviewed before it is trusted.
    #[error(
        "Wrote {count} messages to new sequence {}. Writing a report always causes test failure",
        .path.display()
    )]
    SequenceWritten {
        /// The written sequence file.
        path:  PathBuf,
        /// Number of messages written.
        count: usize,
    },
    /// Reading, writing or launching failed.
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Summary of a run that matched its golden sequence.
pub struct CheckReport {
    /// The golden sequence file.
    pub sequence: PathBuf,
    /// Number of messages matched.
    pub matched:  usize,
}

/// Runs builds and checks their service messages against golden sequences,
/// recording a sequence when none exists yet.
pub struct ServiceMessageChecker<'a> {
    /// Runs the build.
    launcher:   &'a dyn BuildLauncher,
    /// Golden sequences.
    store:      GoldenStore,
    /// Rules applied before comparing and writing.
    normalizer: Normalizer,
}

impl<'a> ServiceMessageChecker<'a> {
    /// Creates a checker.
    pub fn new(launcher: &'a dyn BuildLauncher, store: GoldenStore, normalizer: Normalizer) -> Self {
        Self {
            launcher,
            store,
            normalizer,
        }
    }

    /// Creates a checker using the store and rules derived from `settings`.
    pub fn from_settings(launcher: &'a dyn BuildLauncher, settings: &Settings) -> Result<Self> {
        Ok(Self::new(launcher, settings.golden_store(), settings.normalizer()?))
    }

    /// Returns the golden sequence store.
    pub fn store(&self) -> &GoldenStore {
        &self.store
    }

    /// Runs `config`, forwarding build output to `tracing`.
    pub fn run(&self, config: &RunConfiguration) -> Result<CheckReport, RunError> {
        self.run_with_sink(config, &mut TracingSink)
    }

    /// Runs `config`, forwarding build output to `sink`.
    ///
    /// With a golden sequence present, only regular output is scanned and
    /// the result is compared. Otherwise everything the build reports is
    /// scanned, written as the new golden sequence and the run fails.
    pub fn run_with_sink(
        &self,
        config: &RunConfiguration,
        sink: &mut dyn MessageSink,
    ) -> Result<CheckReport, RunError> {
        let pattern = MessagePattern::new(config.pattern())?;
        let name = config.sequence_file_name();
        let sequence = self.store.path_for(name);

        if self.store.exists(name) {
            tracing::info!("Checking service messages against {}", sequence.display());
            let mut collector = MessageCollector::new(sink, pattern, CollectMode::Compare);
            self.launcher.launch(config, &mut collector)?;

            if let Some(message) = collector.internal_errors().first() {
                return Err(RunError::InternalError {
                    message: message.clone(),
                });
            }

            let expected = self.store.read_report_sequence(name)?;
            assert_service_messages(collector.messages(), &expected, &self.normalizer)?;

            tracing::info!("All {} service messages matched", expected.len());
            Ok(CheckReport {
                sequence,
                matched: expected.len(),
            })
        } else {
            tracing::info!("No sequence at {}, recording one", sequence.display());
            let mut collector = MessageCollector::new(sink, pattern, CollectMode::Record);
            self.launcher.launch(config, &mut collector)?;

            let messages = collector.into_messages();
            let path = self
                .store
                .write_report_sequence(name, &messages, &self.normalizer)?;
            Err(RunError::SequenceWritten {
                path,
                count: messages.len(),
            })
        }
    }
}
