#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # smcheck
//!
//! Runs a build, captures the service messages it prints and compares them
//! with a golden sequence. When the golden sequence does not exist yet it is
//! recorded and the run fails, so that it gets reviewed before being trusted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use bpaf::*;
use colored::Colorize;
use dotenvy::dotenv;
use smcheck::{
    CheckReport, MessagePattern, ProcessLauncher, ReplayLauncher, RunConfiguration, RunError,
    ServiceMessageChecker, config,
};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Run a build and check its messages
    Check {
        /// Project directory name
        project:      String,
        /// Build tool arguments
        command:      String,
        /// Golden sequence file name
        sequence:     String,
        /// Message pattern override
        pattern:      Option<String>,
        /// Build tool version override
        tool_version: Option<String>,
    },
    /// Check messages in previously captured output
    Compare {
        /// Captured output file
        output:   PathBuf,
        /// Golden sequence file name
        sequence: String,
        /// Message pattern override
        pattern:  Option<String>,
    },
    /// Print the messages found in some output
    Extract {
        /// Input file, stdin when absent
        file:    Option<PathBuf>,
        /// Message pattern override
        pattern: Option<String>,
        /// Skip normalization
        raw:     bool,
        /// Print a JSON array instead of one message per line
        json:    bool,
    },
}

/// Parsed command line.
#[derive(Debug, Clone)]
struct Options {
    /// Log at debug level
    verbose: bool,
    /// Command to run
    cmd:     Cmd,
}

/// Parse the command line arguments and return the `Options`
fn options() -> Options {
    /// parses a message pattern override
    fn pattern() -> impl Parser<Option<String>> {
        long("pattern")
            .short('p')
            .help("Regular expression matching one service message")
            .argument::<String>("REGEX")
            .optional()
    }

    /// parses a golden sequence name
    fn sequence() -> impl Parser<String> {
        positional::<String>("SEQUENCE").help("File name of the golden sequence")
    }

    let check = {
        let project = positional::<String>("PROJECT").help("Project directory to build");
        let command = positional::<String>("COMMAND").help("Arguments for the build tool");
        let sequence = sequence();
        let pattern = pattern();
        let tool_version = long("tool-version")
            .help("Build tool version handed to the build")
            .argument::<String>("VERSION")
            .optional();
        construct!(Cmd::Check {
            pattern,
            tool_version,
            project,
            command,
            sequence
        })
    }
    .to_options()
    .command("check")
    .help("Run a build and check its service messages");

    let compare = {
        let pattern = pattern();
        let output = positional::<PathBuf>("OUTPUT").help("File holding captured build output");
        let sequence = sequence();
        construct!(Cmd::Compare {
            pattern,
            output,
            sequence
        })
    }
    .to_options()
    .command("compare")
    .help("Check service messages in captured build output");

    let extract = {
        let pattern = pattern();
        let raw = long("raw").help("Print messages without normalizing them").switch();
        let json = long("json").help("Print a JSON array").switch();
        let file = positional::<PathBuf>("FILE")
            .help("File to read, stdin when absent")
            .optional();
        construct!(Cmd::Extract {
            pattern,
            raw,
            json,
            file
        })
    }
    .to_options()
    .command("extract")
    .help("Print the service messages found in some output");

    let verbose = short('v')
        .long("verbose")
        .help("Log at debug level")
        .switch();
    let cmd = construct!([check, compare, extract]);

    construct!(Options { verbose, cmd })
        .to_options()
        .descr("Checks build service messages against golden sequences")
        .run()
}

/// Prints the outcome of a checked run, exiting with 1 on failure.
fn report(result: Result<CheckReport, RunError>) {
    match result {
        Ok(report) => {
            println!(
                "{} {} messages match {}",
                "OK".green().bold(),
                report.matched,
                report.sequence.display()
            );
        }
        Err(RunError::Io(e)) => {
            eprintln!("{} {:?}", "ERROR".red().bold(), e);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{} {}", "FAILED".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Builds a run configuration with optional overrides applied.
fn run_configuration(
    project: &str,
    command: &str,
    sequence: &str,
    pattern: Option<String>,
    tool_version: Option<String>,
) -> RunConfiguration {
    let mut cfg = RunConfiguration::new(project, command, sequence);
    if let Some(pattern) = pattern {
        cfg = cfg.set_pattern(pattern);
    }
    if let Some(version) = tool_version {
        cfg = cfg.set_build_tool_version(version);
    }
    cfg
}

fn main() -> Result<()> {
    dotenv().ok();

    let opts = options();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let level = if opts.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::registry()
        .with(fmt)
        .with(LevelFilter::from_level(level))
        .init();

    let settings = config::ensure_initialized()?;

    match opts.cmd {
        Cmd::Check {
            project,
            command,
            sequence,
            pattern,
            tool_version,
        } => {
            let launcher = ProcessLauncher::from_settings(&settings)?;
            let checker = ServiceMessageChecker::from_settings(&launcher, &settings)?;
            let cfg = run_configuration(&project, &command, &sequence, pattern, tool_version);
            report(checker.run(&cfg));
        }
        Cmd::Compare {
            output,
            sequence,
            pattern,
        } => {
            let launcher = ReplayLauncher::from_file(&output)?;
            let checker = ServiceMessageChecker::from_settings(&launcher, &settings)?;
            let cfg = run_configuration("", "", &sequence, pattern, None);
            report(checker.run(&cfg));
        }
        Cmd::Extract {
            file,
            pattern,
            raw,
            json,
        } => {
            let text = match &file {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("Could not read {}", path.display()))?,
                None => std::io::read_to_string(std::io::stdin()).context("Could not read stdin")?,
            };
            let pattern = match pattern {
                Some(p) => MessagePattern::new(&p)?,
                None => MessagePattern::default(),
            };

            let mut messages = pattern.extract_all(&text);
            if !raw {
                messages = settings.normalizer()?.normalize_all(&messages);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&messages)?);
            } else {
                for message in messages {
                    println!("{message}");
                }
            }
        }
    };

    Ok(())
}
