use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use studybuddy_index::{RetryPolicy, ScoringWeights};

/// Wrapper for sensitive strings with redacted Debug/Display.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

/// Chat backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// OpenAI-hosted chat completions, keyed by API key.
    Hosted,
    /// Local OpenAI-compatible server such as Ollama.
    Local,
}

impl BackendKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hosted => "hosted",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hosted" | "openai" => Ok(Self::Hosted),
            "local" | "ollama" => Ok(Self::Local),
            other => Err(format!("unknown backend '{other}', expected 'hosted' or 'local'")),
        }
    }
}

fn default_hosted_base_url() -> String {
    studybuddy_llm::openai::DEFAULT_BASE_URL.into()
}

fn default_hosted_model() -> String {
    studybuddy_llm::openai::DEFAULT_MODEL.into()
}

fn default_local_base_url() -> String {
    studybuddy_llm::local::DEFAULT_BASE_URL.into()
}

fn default_local_model() -> String {
    studybuddy_llm::local::DEFAULT_MODEL.into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HostedConfig {
    #[serde(default = "default_hosted_base_url")]
    pub base_url: String,
    #[serde(default = "default_hosted_model")]
    pub model: String,
}

impl Default for HostedConfig {
    fn default() -> Self {
        Self {
            base_url: default_hosted_base_url(),
            model: default_hosted_model(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LocalConfig {
    #[serde(default = "default_local_base_url")]
    pub base_url: String,
    #[serde(default = "default_local_model")]
    pub model: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            base_url: default_local_base_url(),
            model: default_local_model(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Unset until the user picks one; answering is refused meanwhile.
    #[serde(default)]
    pub backend: Option<BackendKind>,
    #[serde(default)]
    pub hosted: HostedConfig,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Embedding backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingKind {
    Ollama,
    Candle,
}

fn default_embedding_provider() -> EmbeddingKind {
    if cfg!(feature = "candle") {
        EmbeddingKind::Candle
    } else {
        EmbeddingKind::Ollama
    }
}

fn default_ollama_url() -> String {
    studybuddy_llm::embed::ollama::DEFAULT_BASE_URL.into()
}

fn default_max_seq_length() -> usize {
    128
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: EmbeddingKind,
    /// Falls back to the provider's default model when unset.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_max_seq_length")]
    pub max_seq_length: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            base_url: default_ollama_url(),
            max_seq_length: default_max_seq_length(),
        }
    }
}

impl EmbeddingConfig {
    #[must_use]
    pub fn model_name(&self) -> &str {
        if let Some(model) = &self.model {
            return model;
        }
        match self.provider {
            EmbeddingKind::Ollama => studybuddy_llm::embed::ollama::DEFAULT_MODEL,
            EmbeddingKind::Candle => "sentence-transformers/all-MiniLM-L12-v2",
        }
    }
}

fn default_index_url() -> String {
    "http://localhost:9200".into()
}

fn default_index_name() -> String {
    "az900_course_notes".into()
}

fn default_top_k() -> usize {
    5
}

fn default_corpus_path() -> String {
    "data/az900_notes.jsonl".into()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_url")]
    pub url: String,
    #[serde(default = "default_index_name")]
    pub name: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_corpus_path")]
    pub corpus_path: String,
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: default_index_url(),
            name: default_index_name(),
            top_k: default_top_k(),
            corpus_path: default_corpus_path(),
            weights: ScoringWeights::default(),
            retry: RetryPolicy::default(),
        }
    }
}

fn default_answer_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_answer_timeout")]
    pub answer_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            answer_seconds: default_answer_timeout(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ResolvedSecrets {
    pub openai_api_key: Option<Secret>,
}
