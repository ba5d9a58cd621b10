//! Model-driven selection of the sections that ground an answer.
//!
//! The prefilter's candidates are shown to the model as a numbered listing
//! (1-based; the listing number is the only handle the model may use). The
//! model is asked for `{"selected_indices": [...], "reasons": {...}}`.
//!
//! Model output is untrusted input. [`parse_selection`] never fails: a body
//! that is not a JSON object, a `selected_indices` that is not an array,
//! non-integer elements and out-of-range numbers are all dropped. If
//! nothing usable survives, the top prefilter candidates are used instead
//! (see [`fallback_selection`]). Only a failure of the completion call
//! itself is an error.

use anyhow::Result;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::llm::CompletionClient;
use crate::models::{Candidate, Document, Selection};

/// Build the numbered listing and instructions for the selection call.
pub fn build_selection_prompt(query: &str, candidates: &[Candidate]) -> String {
    let listing = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "{}. {}\n   Preview: {}",
                i + 1,
                c.document.path,
                collapse_whitespace(&c.document.preview)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are selecting sections of financial filings that can answer a user's question.\n\
         \n\
         Question: {query}\n\
         \n\
         Candidate sections:\n\
         {listing}\n\
         \n\
         Rules:\n\
         - Pick the sections whose content contains facts directly relevant to the question.\n\
         - Prefer specific subsections over broad overviews.\n\
         - Select 3-4 sections only, by their listing number.\n\
         - Respond with JSON only, no prose, in exactly this shape:\n\
         {{\"selected_indices\": [1, 2, 3], \"reasons\": {{\"1\": \"short reason\"}}}}"
    )
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract valid listing positions from a raw model response.
///
/// Keeps integers in `[1, candidate_count]`, first occurrence only, at
/// most `max_selected` of them. Anything unparseable yields an empty
/// selection rather than an error.
pub fn parse_selection(body: &str, candidate_count: usize, max_selected: usize) -> Selection {
    let payload: Value = match serde_json::from_str(body.trim()) {
        Ok(v @ Value::Object(_)) => v,
        _ => return Selection::default(),
    };

    let raw = match payload.get("selected_indices") {
        Some(Value::Array(items)) => items,
        _ => return Selection::default(),
    };

    let mut seen = HashSet::new();
    let mut indices = Vec::new();
    for item in raw {
        let Some(n) = coerce_index(item) else {
            continue;
        };
        if n < 1 || n > candidate_count as i64 {
            continue;
        }
        let n = n as usize;
        if seen.insert(n) {
            indices.push(n);
            if indices.len() == max_selected {
                break;
            }
        }
    }

    let reasons = extract_reasons(payload.get("reasons"), &indices);

    Selection {
        indices,
        reasons,
        fallback: false,
    }
}

/// Numbers and numeric strings that denote a whole number.
fn coerce_index(item: &Value) -> Option<i64> {
    let n = match item {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole))?,
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole))?
        }
        _ => return None,
    };
    Some(n)
}

fn whole(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn extract_reasons(value: Option<&Value>, indices: &[usize]) -> HashMap<usize, String> {
    let Some(Value::Object(map)) = value else {
        return HashMap::new();
    };
    map.iter()
        .filter_map(|(k, v)| {
            let idx = k.trim().parse::<usize>().ok()?;
            let reason = v.as_str()?.trim();
            (indices.contains(&idx) && !reason.is_empty()).then(|| (idx, reason.to_string()))
        })
        .collect()
}

/// The first `fallback_count` listing positions, bounded by the pool size.
pub fn fallback_selection(candidate_count: usize, fallback_count: usize) -> Selection {
    Selection {
        indices: (1..=candidate_count.min(fallback_count)).collect(),
        reasons: HashMap::new(),
        fallback: true,
    }
}

/// Map listing positions to documents, unique by path, at most `max_selected`.
pub fn resolve_selection(
    selection: &Selection,
    candidates: &[Candidate],
    max_selected: usize,
) -> Vec<Arc<Document>> {
    let mut paths = HashSet::new();
    let mut docs = Vec::new();
    for &idx in &selection.indices {
        let Some(candidate) = idx.checked_sub(1).and_then(|i| candidates.get(i)) else {
            continue;
        };
        if paths.insert(candidate.document.path.as_str()) {
            docs.push(candidate.document.clone());
            if docs.len() == max_selected {
                break;
            }
        }
    }
    docs
}

/// Selection limits, taken from `[retrieval]`.
#[derive(Debug, Clone, Copy)]
pub struct SelectionLimits {
    pub max_selected: usize,
    pub fallback_count: usize,
}

/// Ask the model which candidates to keep and resolve them to documents.
///
/// Returns between 1 and `max_selected` documents for a non-empty
/// candidate list. Errors only when the completion call fails.
pub async fn select(
    client: &dyn CompletionClient,
    query: &str,
    candidates: &[Candidate],
    limits: SelectionLimits,
) -> Result<Vec<Arc<Document>>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let prompt = build_selection_prompt(query, candidates);
    let body = client.complete_json(&prompt).await?;

    let mut selection = parse_selection(&body, candidates.len(), limits.max_selected);
    if selection.indices.is_empty() {
        tracing::info!(
            candidates = candidates.len(),
            "selection response unusable, falling back to top prefilter candidates"
        );
        selection = fallback_selection(candidates.len(), limits.fallback_count);
    }
    tracing::debug!(
        indices = ?selection.indices,
        reasons = ?selection.reasons,
        fallback = selection.fallback,
        "selection"
    );

    Ok(resolve_selection(&selection, candidates, limits.max_selected))
}
