//! The per-request question answering pipeline.
//!
//! ```text
//! question ─▶ clamp ─▶ DocumentIndex::load ─▶ prefilter::rank
//!          ─▶ selection::select   (model call 1: structured JSON)
//!          ─▶ context::assemble
//!          ─▶ answer::synthesize  (model call 2: free text)
//!          ─▶ answer::append_sources
//! ```
//!
//! The two model calls are sequential: the second consumes the first's
//! output. Nothing is retried. Requests share only the [`DocumentIndex`].

use std::sync::Arc;
use thiserror::Error;

use crate::answer;
use crate::config::Config;
use crate::context;
use crate::index::DocumentIndex;
use crate::llm::{CompletionClient, CompletionError, OpenAIClient};
use crate::models::Candidate;
use crate::prefilter;
use crate::selection::{self, SelectionLimits};
use crate::source::{CsvRowSource, RowSource};

/// Result of a request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Answer text with the source list already appended.
    Answered { advice: String, sources: Vec<String> },
    /// The question was empty after trimming.
    EmptyQuestion,
    /// The index produced no candidates.
    NoCandidates,
}

#[derive(Debug, Error)]
pub enum AdviceError {
    /// No usable credentials; carries the environment variable name.
    #[error("missing configuration: {0} is not set")]
    Configuration(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

enum Completion {
    Ready(Arc<dyn CompletionClient>),
    Unconfigured(String),
}

pub struct Advisor {
    config: Arc<Config>,
    index: DocumentIndex,
    completion: Completion,
}

impl Advisor {
    /// Build an advisor over the configured CSV and OpenAI-compatible API.
    ///
    /// Missing credentials do not fail construction; every request will
    /// report them instead.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let source: Arc<dyn RowSource> = Arc::new(CsvRowSource::new(&config.corpus.path));
        let completion = match OpenAIClient::from_config(&config.llm) {
            Ok(client) => Completion::Ready(Arc::new(client)),
            Err(CompletionError::MissingCredentials(var)) => {
                tracing::warn!(env = %var, "no API key configured; requests will fail");
                Completion::Unconfigured(var)
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self::build(config, source, completion))
    }

    /// Build an advisor from explicit collaborators.
    pub fn new(
        config: &Config,
        source: Arc<dyn RowSource>,
        client: Arc<dyn CompletionClient>,
    ) -> Self {
        Self::build(config, source, Completion::Ready(client))
    }

    fn build(config: &Config, source: Arc<dyn RowSource>, completion: Completion) -> Self {
        Self {
            config: Arc::new(config.clone()),
            index: DocumentIndex::new(source, config.corpus.preview_chars),
            completion,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &DocumentIndex {
        &self.index
    }

    /// Answer one question.
    pub async fn advise(&self, question: &str) -> Result<Outcome, AdviceError> {
        let question = clamp_question(question, self.config.server.max_question_chars);
        if question.is_empty() {
            return Ok(Outcome::EmptyQuestion);
        }

        let client = match &self.completion {
            Completion::Ready(client) => client.clone(),
            Completion::Unconfigured(var) => return Err(AdviceError::Configuration(var.clone())),
        };

        tracing::debug!(question = %question, "advice request");

        let candidates = self
            .rank_clamped(&question, self.config.retrieval.candidate_k)
            .await?;
        if candidates.is_empty() {
            tracing::info!("no prefilter candidates; corpus empty or unavailable");
            return Ok(Outcome::NoCandidates);
        }

        let limits = SelectionLimits {
            max_selected: self.config.retrieval.max_selected,
            fallback_count: self.config.retrieval.fallback_count,
        };
        let selected = selection::select(client.as_ref(), &question, &candidates, limits).await?;

        let ctx = context::assemble(&question, &selected);
        let text = answer::synthesize(client.as_ref(), &ctx).await?;

        tracing::info!(
            candidates = candidates.len(),
            selected = selected.len(),
            "answer generated"
        );

        Ok(Outcome::Answered {
            advice: answer::append_sources(&text, &selected),
            sources: selected.iter().map(|d| d.path.clone()).collect(),
        })
    }

    /// Prefilter candidates for a raw question, without model calls.
    pub async fn candidates(&self, question: &str, limit: usize) -> anyhow::Result<Vec<Candidate>> {
        let question = clamp_question(question, self.config.server.max_question_chars);
        self.rank_clamped(&question, limit).await
    }

    async fn rank_clamped(&self, question: &str, limit: usize) -> anyhow::Result<Vec<Candidate>> {
        let documents = self.index.load().await?;
        let candidates = prefilter::rank(documents, question, limit);
        tracing::debug!(
            documents = documents.len(),
            candidates = candidates.len(),
            "prefilter"
        );
        Ok(candidates)
    }
}

/// Trim, then keep at most `max_chars` characters.
///
/// Counting is by `char`, so the cut may fall inside a word.
pub fn clamp_question(question: &str, max_chars: usize) -> String {
    question.trim().chars().take(max_chars).collect()
}
