//! Answer synthesis and source attribution.
//!
//! The model writes the prose; the source list is appended afterwards by
//! [`append_sources`], so it always names exactly the documents that were
//! selected, in selection order.

use anyhow::Result;
use std::sync::Arc;

use crate::llm::CompletionClient;
use crate::models::Document;

pub const ANSWER_SYSTEM_PROMPT: &str = "\
You answer questions about a company's financial filings.
- Use only the filing excerpts supplied in the user message. Do not use outside knowledge.
- If the excerpts do not contain the answer, say so plainly.
- Write 4-7 short paragraphs. Do not use section headings.
- Weave in concrete figures, dates and named entities that appear in the excerpts.
- You may quote short phrases of at most 10 words.
- For evaluative questions, discuss tradeoffs and risks instead of giving personalized advice.
- Do not add a list of sources or citations; one is appended for you.";

/// Ask the model for an answer grounded in `context`.
pub async fn synthesize(client: &dyn CompletionClient, context: &str) -> Result<String> {
    let text = client.complete_text(ANSWER_SYSTEM_PROMPT, context).await?;
    Ok(text.trim().to_string())
}

/// Numbered, bold Markdown list of document paths.
pub fn format_sources(documents: &[Arc<Document>]) -> String {
    let lines = documents
        .iter()
        .enumerate()
        .map(|(i, d)| format!("{}. **{}**", i + 1, d.path))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Sources:\n{lines}")
}

pub fn append_sources(answer: &str, documents: &[Arc<Document>]) -> String {
    format!("{}\n\n{}", answer.trim_end(), format_sources(documents))
}
