#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, OnceLock},
    time::Duration,
};

use anyhow::{Context, Result};
use typed_builder::TypedBuilder;
use which::which;

use crate::{
    constants::{BUILD_TOOL_VERSION_ENV, DEFAULT_BUILD_TOOL, PROJECTS_DIR, REPORT_SEQ_DIR},
    golden::GoldenStore,
    normalize::Normalizer,
};

#[derive(Debug, Clone, TypedBuilder)]
#[builder(doc)]
/// Where projects and golden sequences live, and how the build tool is run.
pub struct Settings {
    /// Root holding the sequence directory and, by default, the projects.
    #[builder(setter(into))]
    project_root:       PathBuf,
    /// Sequence directory, relative to `project_root`.
    #[builder(default = PathBuf::from(REPORT_SEQ_DIR), setter(into))]
    sequence_dir:       PathBuf,
    /// Directory holding one sub-directory per build project.
    #[builder(default, setter(into, strip_option))]
    projects_dir:       Option<PathBuf>,
    /// Build tool executable.
    #[builder(default = OsString::from(DEFAULT_BUILD_TOOL), setter(into))]
    build_tool:         OsString,
    /// Build tool version handed to the build, if any.
    #[builder(default, setter(into, strip_option))]
    build_tool_version: Option<String>,
    /// Checkout directory whose absolute path is masked in messages.
    #[builder(default, setter(into, strip_option))]
    checkout_dir:       Option<PathBuf>,
    /// Upper bound on a single build run.
    #[builder(default, setter(strip_option))]
    timeout:            Option<Duration>,
}

impl Settings {
    /// Reads settings from `SMCHECK_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let project_root = env_path("SMCHECK_PROJECT_ROOT").unwrap_or_else(|| PathBuf::from("."));
        let sequence_dir =
            env_path("SMCHECK_SEQUENCE_DIR").unwrap_or_else(|| PathBuf::from(REPORT_SEQ_DIR));

        let build_tool = env_string("SMCHECK_BUILD_TOOL")
            .unwrap_or_else(|| DEFAULT_BUILD_TOOL.to_string());
        let build_tool = which(&build_tool)
            .map(PathBuf::into_os_string)
            .unwrap_or_else(|_| OsString::from(build_tool));

        let checkout_dir = match env_path("SMCHECK_CHECKOUT_DIR") {
            Some(dir) => Some(
                std::path::absolute(&dir)
                    .with_context(|| format!("Cannot resolve checkout dir {}", dir.display()))?,
            ),
            None => None,
        };

        Ok(Self {
            project_root,
            sequence_dir,
            projects_dir: env_path("SMCHECK_PROJECTS_DIR"),
            build_tool,
            build_tool_version: env_string(BUILD_TOOL_VERSION_ENV),
            checkout_dir,
            timeout: read_timeout_secs("SMCHECK_TIMEOUT_SECS"),
        })
    }

    /// Returns the project root.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Returns the sequence directory, relative to the project root.
    pub fn sequence_dir(&self) -> &Path {
        &self.sequence_dir
    }

    /// Returns the directory holding build projects.
    pub fn projects_dir(&self) -> PathBuf {
        self.projects_dir
            .clone()
            .unwrap_or_else(|| self.project_root.join(PROJECTS_DIR))
    }

    /// Returns the build tool executable.
    pub fn build_tool(&self) -> &OsString {
        &self.build_tool
    }

    /// Returns the configured build tool version.
    pub fn build_tool_version(&self) -> Option<&str> {
        self.build_tool_version.as_deref()
    }

    /// Returns the checkout directory to mask, defaulting to the projects
    /// directory made absolute.
    pub fn checkout_dir(&self) -> Result<PathBuf> {
        match &self.checkout_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let dir = self.projects_dir();
                std::path::absolute(&dir)
                    .with_context(|| format!("Cannot resolve checkout dir {}", dir.display()))
            }
        }
    }

    /// Returns the run deadline, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Store for golden sequences under these settings.
    pub fn golden_store(&self) -> GoldenStore {
        GoldenStore::new(&self.project_root, &self.sequence_dir)
    }

    /// Normalizer with the default rules, masking [`Self::checkout_dir`].
    pub fn normalizer(&self) -> Result<Normalizer> {
        let checkout = self.checkout_dir()?;
        Normalizer::with_default_rules(Some(&checkout))
    }
}

/// Reads a non-blank environment variable.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Reads a non-blank environment variable as a path.
fn env_path(key: &str) -> Option<PathBuf> {
    env_string(key).map(PathBuf::from)
}

/// Parses an environment variable into a `Duration`; unset or unparsable
/// values mean no deadline.
fn read_timeout_secs(env: &str) -> Option<Duration> {
    env_string(env)
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Shared configuration handle used throughout the crate.
#[derive(Clone, Debug)]
pub struct ConfigHandle(Arc<Settings>);

impl std::ops::Deref for ConfigHandle {
    type Target = Settings;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Global storage for the lazily constructed settings.
static CONFIG_SLOT: OnceLock<Mutex<Option<Arc<Settings>>>> = OnceLock::new();

/// Returns the mutex guarding the global settings slot.
fn slot() -> &'static Mutex<Option<Arc<Settings>>> {
    CONFIG_SLOT.get_or_init(|| Mutex::new(None))
}

/// Ensure the global settings have been read and return a handle.
pub fn ensure_initialized() -> Result<ConfigHandle> {
    let mut guard = slot()
        .lock()
        .map_err(|_| anyhow::anyhow!("config slot poisoned"))?;
    if let Some(cfg) = guard.as_ref() {
        return Ok(ConfigHandle(Arc::clone(cfg)));
    }

    let cfg = Arc::new(Settings::from_env()?);
    *guard = Some(Arc::clone(&cfg));
    Ok(ConfigHandle(cfg))
}

/// Replaces the global settings, e.g. after command-line overrides.
pub fn install(settings: Settings) -> Result<ConfigHandle> {
    let mut guard = slot()
        .lock()
        .map_err(|_| anyhow::anyhow!("config slot poisoned"))?;
    let cfg = Arc::new(settings);
    *guard = Some(Arc::clone(&cfg));
    Ok(ConfigHandle(cfg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_follow_project_root() {
        let settings = Settings::builder().project_root("/work").build();
        assert_eq!(settings.projects_dir(), PathBuf::from("/work").join(PROJECTS_DIR));
        assert_eq!(settings.golden_store().dir(), Path::new("/work").join(REPORT_SEQ_DIR));
        assert_eq!(settings.build_tool(), &OsString::from(DEFAULT_BUILD_TOOL));
        assert!(settings.timeout().is_none());
    }

    #[test]
    fn explicit_checkout_dir_wins() {
        let settings = Settings::builder()
            .project_root("/work")
            .checkout_dir("/checkout")
            .build();
        assert_eq!(settings.checkout_dir().unwrap(), PathBuf::from("/checkout"));
    }

    #[test]
    fn settings_are_read_from_the_environment() {
        let vars = [
            ("SMCHECK_PROJECT_ROOT", "/work"),
            ("SMCHECK_SEQUENCE_DIR", "golden"),
            ("SMCHECK_PROJECTS_DIR", "/work/builds"),
            ("SMCHECK_BUILD_TOOL", "smcheck-missing-build-tool"),
            (BUILD_TOOL_VERSION_ENV, " 8.5 "),
            ("SMCHECK_CHECKOUT_DIR", "/checkout"),
            ("SMCHECK_TIMEOUT_SECS", "30"),
        ];
        // SAFETY: no other test in this binary reads `SMCHECK_*` variables.
        unsafe {
            for (key, value) in vars {
                std::env::set_var(key, value);
            }
        }

        let settings = Settings::from_env();

        unsafe {
            for (key, _) in vars {
                std::env::remove_var(key);
            }
        }

        let settings = settings.unwrap();
        assert_eq!(settings.project_root(), Path::new("/work"));
        assert_eq!(settings.golden_store().dir(), Path::new("/work/golden"));
        assert_eq!(settings.projects_dir(), PathBuf::from("/work/builds"));
        assert_eq!(settings.build_tool(), &OsString::from("smcheck-missing-build-tool"));
        assert_eq!(settings.build_tool_version(), Some("8.5"));
        assert_eq!(settings.checkout_dir().unwrap(), PathBuf::from("/checkout"));
        assert_eq!(settings.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn unset_timeout_means_no_deadline() {
        assert_eq!(read_timeout_secs("SMCHECK_TEST_UNSET_TIMEOUT"), None);
    }
}
