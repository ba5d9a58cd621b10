//! TOML configuration parsing and validation.
//!
//! The advisor reads a single TOML file (default `./config/advisor.toml`).
//! Every section except `[corpus]` may be omitted, in which case the
//! defaults below apply. API credentials are never read from this file;
//! `[llm].api_key_env` names the environment variable that holds them.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// CSV file with `Path` and `Content` columns.
    pub path: PathBuf,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

fn default_preview_chars() -> usize {
    400
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_candidate_k")]
    pub candidate_k: usize,
    #[serde(default = "default_max_selected")]
    pub max_selected: usize,
    #[serde(default = "default_fallback_count")]
    pub fallback_count: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_k: default_candidate_k(),
            max_selected: default_max_selected(),
            fallback_count: default_fallback_count(),
        }
    }
}

fn default_candidate_k() -> usize {
    20
}
fn default_max_selected() -> usize {
    4
}
fn default_fallback_count() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub selection_model: String,
    #[serde(default = "default_model")]
    pub answer_model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_answer_temperature")]
    pub answer_temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            selection_model: default_model(),
            answer_model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            answer_temperature: default_answer_temperature(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_answer_temperature() -> f32 {
    0.3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_question_chars")]
    pub max_question_chars: usize,
    /// Upper bound on a request body; larger bodies get a 413 advisory.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_question_chars: default_max_question_chars(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}
fn default_max_question_chars() -> usize {
    1000
}
fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

impl Config {
    /// All-defaults configuration pointing at the given corpus file.
    pub fn minimal(corpus_path: impl Into<PathBuf>) -> Self {
        Self {
            corpus: CorpusConfig {
                path: corpus_path.into(),
                preview_chars: default_preview_chars(),
            },
            retrieval: RetrievalConfig::default(),
            llm: LlmConfig::default(),
            server: ServerConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.corpus.preview_chars == 0 {
            anyhow::bail!("corpus.preview_chars must be > 0");
        }

        if self.retrieval.candidate_k == 0 {
            anyhow::bail!("retrieval.candidate_k must be >= 1");
        }
        if self.retrieval.max_selected == 0 {
            anyhow::bail!("retrieval.max_selected must be >= 1");
        }
        if self.retrieval.fallback_count == 0
            || self.retrieval.fallback_count > self.retrieval.max_selected
        {
            anyhow::bail!(
                "retrieval.fallback_count must be in [1, {}]",
                self.retrieval.max_selected
            );
        }

        if self.llm.timeout_secs == 0 {
            anyhow::bail!("llm.timeout_secs must be > 0");
        }
        if !(0.0..=2.0).contains(&self.llm.answer_temperature) {
            anyhow::bail!("llm.answer_temperature must be in [0.0, 2.0]");
        }

        if self.server.max_question_chars == 0 {
            anyhow::bail!("server.max_question_chars must be > 0");
        }
        if self.server.max_body_bytes == 0 {
            anyhow::bail!("server.max_body_bytes must be > 0");
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}
