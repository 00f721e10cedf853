mod env;
mod types;


pub use types::*;

use std::path::Path;

use anyhow::Context;

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.resolve_secrets();
        Ok(config)
    }

    /// Check cross-field constraints that serde defaults cannot express.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.index
            .weights
            .validate()
            .context("invalid [index.weights]")?;
        anyhow::ensure!(
            (1..=studybuddy_index::query::MAX_TOP_K).contains(&self.index.top_k),
            "index.top_k must be between 1 and {}, got {}",
            studybuddy_index::query::MAX_TOP_K,
            self.index.top_k
        );
        anyhow::ensure!(
            self.index.retry.max_attempts > 0,
            "index.retry.max_attempts must be at least 1"
        );
        anyhow::ensure!(
            self.timeouts.answer_seconds > 0,
            "timeouts.answer_seconds must be positive"
        );
        anyhow::ensure!(!self.index.name.trim().is_empty(), "index.name is empty");
        Ok(())
    }

    /// Read API keys from the environment. `STUDYBUDDY_OPENAI_API_KEY` wins
    /// over `OPENAI_API_KEY`.
    pub(crate) fn resolve_secrets(&mut self) {
        let key = std::env::var("STUDYBUDDY_OPENAI_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());
        if let Some(key) = key {
            self.secrets.openai_api_key = Some(Secret::new(key));
        }
    }
}
