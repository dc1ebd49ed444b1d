//! Layered runtime settings.
//!
//! Defaults are compiled in, optionally overridden by a TOML file and then
//! by `JOB_BUILDER__<SECTION>__<KEY>` environment variables.

use camino::Utf8Path;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "JOB_BUILDER";

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialised.
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    /// A value is out of range.
    #[error("invalid setting {key}: {reason}")]
    Invalid {
        /// Offending key.
        key: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// All runtime settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Page driver settings.
    pub automation: AutomationConfig,
    /// Job generation endpoint settings.
    pub generation: GenerationConfig,
}

/// Timeouts and hosts used by the page drivers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Base URL of the target application; deep links are built from it.
    pub app_base_url: Url,
    /// Best-effort wait after the navigator acts.
    pub navigation_confirm_timeout_ms: u64,
    /// Wait for the voice agent block.
    pub voice_agent_timeout_ms: u64,
    /// Wait for each modal-opening button and the dialog.
    pub modal_timeout_ms: u64,
    /// Cadence for condition polling.
    pub poll_interval_ms: u64,
    /// Pause after selecting the voice agent and clicking "Add Job".
    pub short_settle_ms: u64,
    /// Pause after clicking "Create New Job".
    pub long_settle_ms: u64,
    /// How long a run lease survives without renewal.
    pub lease_ttl_ms: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            app_base_url: default_app_base_url(),
            navigation_confirm_timeout_ms: 15_000,
            voice_agent_timeout_ms: 15_000,
            modal_timeout_ms: 10_000,
            poll_interval_ms: 250,
            short_settle_ms: 300,
            long_settle_ms: 500,
            lease_ttl_ms: 120_000,
        }
    }
}

#[expect(
    clippy::expect_used,
    reason = "compile-time constant URL is always valid"
)]
fn default_app_base_url() -> Url {
    Url::parse("https://my.quo.com").expect("default base URL parses")
}

impl AutomationConfig {
    /// Best-effort navigation confirmation timeout.
    #[must_use]
    pub const fn navigation_confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_confirm_timeout_ms)
    }

    /// Voice agent block timeout.
    #[must_use]
    pub const fn voice_agent_timeout(&self) -> Duration {
        Duration::from_millis(self.voice_agent_timeout_ms)
    }

    /// Modal step timeout.
    #[must_use]
    pub const fn modal_timeout(&self) -> Duration {
        Duration::from_millis(self.modal_timeout_ms)
    }

    /// Condition polling cadence.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Short UI settle delay.
    #[must_use]
    pub const fn short_settle(&self) -> Duration {
        Duration::from_millis(self.short_settle_ms)
    }

    /// Long UI settle delay.
    #[must_use]
    pub const fn long_settle(&self) -> Duration {
        Duration::from_millis(self.long_settle_ms)
    }

    /// Run lease time-to-live.
    #[must_use]
    pub fn lease_ttl(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::milliseconds(i64::try_from(self.lease_ttl_ms).unwrap_or(i64::MAX))
    }
}

/// Chat-completion endpoint parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Chat-completion URL.
    pub endpoint: String,
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout.
    pub request_timeout_ms: u64,
    /// Maximum characters of an error body kept in error messages.
    pub max_error_body_chars: usize,
    /// System message fixing the output contract.
    pub system_prompt: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_owned(),
            model: "gpt-4o-mini".to_owned(),
            temperature: 0.2,
            request_timeout_ms: 60_000,
            max_error_body_chars: 2000,
            system_prompt: "You analyze call transcripts and produce Sona job definitions. \
                            Output JSON only."
                .to_owned(),
        }
    }
}

impl GenerationConfig {
    /// Request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Settings {
    /// Loads settings from defaults, `file` (when given and present) and the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a source is malformed or a value is out
    /// of range.
    pub fn load(file: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(file, None)
    }

    /// Like [`Settings::load`], reading overrides from `env` instead of the
    /// process environment when given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a source is malformed or a value is out
    /// of range.
    pub fn load_with_env(
        file: Option<&Utf8Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(
                config::File::new(path.as_str(), config::FileFormat::Toml).required(false),
            );
        }
        let settings: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::Invalid {
                key: "generation.temperature",
                reason: format!("{} is outside 0.0..=2.0", self.generation.temperature),
            });
        }
        if self.automation.lease_ttl_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "automation.lease_ttl_ms",
                reason: "must be positive".to_owned(),
            });
        }
        if self.automation.app_base_url.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                key: "automation.app_base_url",
                reason: format!("{} cannot carry a path", self.automation.app_base_url),
            });
        }
        Ok(())
    }
}
