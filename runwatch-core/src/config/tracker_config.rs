// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::ConfigParseError;
use camino::{Utf8Path, Utf8PathBuf};
use config::{
    Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, Map, Source, Value,
    builder::DefaultState,
};
use serde::Deserialize;
use std::{collections::BTreeSet, time::Duration};
use tracing::warn;

/// Thresholds and display filters for a run.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TrackerConfig {
    #[serde(with = "humantime_serde")]
    timeout_warning: Duration,
    #[serde(with = "humantime_serde")]
    stuck_threshold: Duration,
    show_passing: bool,
    show_skip: bool,
    slow_limit: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            timeout_warning: Duration::from_secs(5),
            stuck_threshold: Duration::from_secs(30),
            show_passing: true,
            show_skip: true,
            slow_limit: 10,
        }
    }
}

impl TrackerConfig {
    /// The default config, as a TOML string.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// The config file looked up relative to the current directory if none is passed in.
    pub const CONFIG_PATH: &'static str = ".config/runwatch.toml";

    /// Environment configuration uses this prefix, plus a _.
    pub const ENVIRONMENT_PREFIX: &'static str = "RUNWATCH";

    // These RUNWATCH_ variables configure the command-line frontend, not the tracker.
    const IGNORED_ENVIRONMENT_KEYS: &'static [&'static str] = &["log", "verbose", "color"];

    /// Reads the config from the default config, the given file and the environment.
    ///
    /// If `file` is `None`, [`Self::CONFIG_PATH`] under `dir` is used if it exists.
    pub fn from_sources(dir: &Utf8Path, file: Option<&Utf8Path>) -> Result<Self, ConfigParseError> {
        Self::from_sources_with_env(
            dir,
            file,
            Environment::with_prefix(Self::ENVIRONMENT_PREFIX).try_parsing(true),
        )
    }

    fn from_sources_with_env(
        dir: &Utf8Path,
        file: Option<&Utf8Path>,
        env: Environment,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = dir.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config()
            .add_source(source)
            .add_source(KebabCaseEnvironment(env));
        Self::build_and_deserialize_config(&builder)
            .map_err(|err| ConfigParseError::new(Some(config_file), err))
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<Self, ConfigError> {
        let config = builder.build_cloned()?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config = Self::deserialize(ignored_de)?;

        for key in ignored
            .iter()
            .filter(|key| !Self::IGNORED_ENVIRONMENT_KEYS.contains(&key.as_str()))
        {
            warn!("ignoring unknown configuration key `{key}`");
        }

        Ok(config)
    }

    /// Completed tests that took longer than this are listed as slow.
    pub fn timeout_warning(&self) -> Duration {
        self.timeout_warning
    }

    /// Running tests older than this are flagged as possibly stuck. Advisory only.
    pub fn stuck_threshold(&self) -> Duration {
        self.stuck_threshold
    }

    /// Whether to show a line for each passing test.
    pub fn show_passing(&self) -> bool {
        self.show_passing
    }

    /// Whether to show a line for each skipped test.
    pub fn show_skip(&self) -> bool {
        self.show_skip
    }

    /// The maximum number of slow tests listed in the summary.
    pub fn slow_limit(&self) -> usize {
        self.slow_limit
    }

    /// Overrides [`Self::show_passing`].
    pub fn set_show_passing(&mut self, show_passing: bool) -> &mut Self {
        self.show_passing = show_passing;
        self
    }

    /// Overrides [`Self::show_skip`].
    pub fn set_show_skip(&mut self, show_skip: bool) -> &mut Self {
        self.show_skip = show_skip;
        self
    }

    /// Overrides [`Self::slow_limit`].
    pub fn set_slow_limit(&mut self, slow_limit: usize) -> &mut Self {
        self.slow_limit = slow_limit;
        self
    }
}

/// Environment variables with keys spelled the way the config file spells them.
///
/// `RUNWATCH_STUCK_THRESHOLD` becomes `stuck-threshold`, so it layers over the same key from a
/// config file instead of showing up next to it.
#[derive(Clone, Debug)]
struct KebabCaseEnvironment(Environment);

impl Source for KebabCaseEnvironment {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, ConfigError> {
        Ok(self
            .0
            .collect()?
            .into_iter()
            .map(|(key, value)| (key.replace('_', "-"), value))
            .collect())
    }
}

/// Returns the config file that [`TrackerConfig::from_sources`] would pick up from `dir`, if any.
pub fn discovered_config_file(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let path = dir.join(TrackerConfig::CONFIG_PATH);
    path.is_file().then_some(path)
}
