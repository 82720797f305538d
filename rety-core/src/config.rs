//! Configuration types for recording and replay

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, RetyError};
use crate::recorder::KeyTrigger;

/// Main configuration for rety
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RetyConfig {
    /// Recording configuration
    #[serde(default)]
    pub recorder: RecorderConfig,

    /// Replay configuration
    #[serde(default)]
    pub replay: ReplayConfig,
}

/// Recording-side options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecorderConfig {
    /// Idle gap that triggers a synthetic pause; `None` or zero disables
    #[serde(default = "default_pause_threshold", with = "humantime_serde")]
    pub pause_threshold: Option<Duration>,

    /// Longest pause that will be recorded
    #[serde(default, with = "humantime_serde")]
    pub pause_cap: Option<Duration>,

    /// Record pauses at all
    #[serde(default = "default_true")]
    pub record_pauses: bool,

    /// Keep every caret change instead of only the latest one
    #[serde(default)]
    pub preserve_caret_changes: bool,

    /// Keystrokes worth recording
    #[serde(default)]
    pub keys: Vec<KeyTrigger>,
}

fn default_pause_threshold() -> Option<Duration> {
    Some(Duration::from_secs(2))
}

fn default_true() -> bool {
    true
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            pause_threshold: default_pause_threshold(),
            pause_cap: None,
            record_pauses: true,
            preserve_caret_changes: false,
            keys: Vec::new(),
        }
    }
}

impl RecorderConfig {
    /// Builder: set the idle gap that records a pause
    pub fn with_pause_threshold(mut self, threshold: Option<Duration>) -> Self {
        self.pause_threshold = threshold;
        self
    }

    /// Builder: cap recorded pauses
    pub fn with_pause_cap(mut self, cap: Duration) -> Self {
        self.pause_cap = Some(cap);
        self
    }

    /// Builder: enable/disable pause recording
    pub fn with_record_pauses(mut self, record: bool) -> Self {
        self.record_pauses = record;
        self
    }

    /// Builder: keep every caret change
    pub fn with_preserve_caret_changes(mut self, preserve: bool) -> Self {
        self.preserve_caret_changes = preserve;
        self
    }

    /// Builder: add a key trigger
    pub fn with_key(mut self, trigger: KeyTrigger) -> Self {
        self.keys.push(trigger);
        self
    }

    /// Effective threshold, treating zero as disabled
    pub fn effective_pause_threshold(&self) -> Option<Duration> {
        self.pause_threshold.filter(|t| !t.is_zero())
    }
}

/// What replay does with a recorded pause
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PausePolicy {
    /// Wait for the recorded delay, then continue
    #[default]
    Delay,

    /// Stop draining until `resume()` is called
    Pause,

    /// Skip the pause without notifying
    Ignore,
}

/// Replay-side options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayConfig {
    /// Base delay between actions, jittered by ±15%
    #[serde(default = "default_delay", with = "humantime_serde")]
    pub delay: Duration,

    /// Policy for pause actions
    #[serde(default)]
    pub pauses: PausePolicy,

    /// Sweep the caret across selections instead of jumping
    #[serde(default)]
    pub animated_selection: bool,

    /// Time between sweep steps
    #[serde(default = "default_selection_step", with = "humantime_serde")]
    pub selection_step: Duration,

    /// Backoff before retrying a rejected edit primitive
    #[serde(default = "default_retry_backoff", with = "humantime_serde")]
    pub retry_backoff: Duration,
}

fn default_delay() -> Duration {
    Duration::from_millis(140)
}

fn default_selection_step() -> Duration {
    Duration::from_millis(15)
}

fn default_retry_backoff() -> Duration {
    Duration::from_millis(10)
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            delay: default_delay(),
            pauses: PausePolicy::Delay,
            animated_selection: false,
            selection_step: default_selection_step(),
            retry_backoff: default_retry_backoff(),
        }
    }
}

impl ReplayConfig {
    /// Builder: set the base inter-action delay
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Builder: set the pause policy
    pub fn with_pauses(mut self, pauses: PausePolicy) -> Self {
        self.pauses = pauses;
        self
    }

    /// Builder: enable/disable animated selection
    pub fn with_animated_selection(mut self, animated: bool) -> Self {
        self.animated_selection = animated;
        self
    }
}

impl RetyConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. Configuration file (rety.toml or path from RETY_CONFIG_PATH)
    /// 3. Environment variable overrides (`RETY_REPLAY__DELAY=80ms`)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file or an override is invalid.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Toml},
        };

        let mut figment = Figment::new().merge(Toml::file("rety.toml"));

        if let Ok(path) = std::env::var("RETY_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let figment = figment.merge(Env::prefixed("RETY_").ignore(&["config_path"]).split("__"));

        let config: RetyConfig = figment.extract().map_err(|e| {
            RetyError::Configuration(format!("Failed to load configuration: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// TOML and JSON files are recognized by extension; anything else is
    /// read as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Json, Toml},
        };

        let path = path.as_ref();
        if !path.exists() {
            return Err(RetyError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Figment::new().merge(Json::file(path)),
            _ => Figment::new().merge(Toml::file(path)),
        };

        let config: RetyConfig = figment.extract().map_err(|e| {
            RetyError::Configuration(format!("Failed to load configuration file: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.recorder.pause_cap.is_some_and(|cap| cap.is_zero()) {
            return Err(RetyError::Configuration(
                "recorder.pause_cap must be greater than zero".to_string(),
            ));
        }

        for trigger in &self.recorder.keys {
            if trigger.keys.is_empty() {
                return Err(RetyError::Configuration(
                    "recorder.keys entries must name at least one key".to_string(),
                ));
            }
        }

        Ok(())
    }
}
