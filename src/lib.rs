//! # Filings Advisor
//!
//! Grounded question answering over a fixed corpus of financial filings.
//!
//! A question is answered in two model calls: one to pick the relevant
//! filing sections from a lexically prefiltered candidate list, and one to
//! write the answer from the full text of those sections. The source list
//! is appended by the pipeline, never by the model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌───────────┐   ┌───────────┐
//! │ CSV rows │──▶│   Index   │──▶│ Prefilter │──▶│ Selection │──▶ model (JSON)
//! └──────────┘   │ (memo'd)  │   └───────────┘   └─────┬─────┘
//!                └───────────┘                         ▼
//!                                ┌───────────┐   ┌───────────┐
//!                 model (text) ◀─│  Answer   │◀──│  Context  │
//!                                └─────┬─────┘   └───────────┘
//!                                      ▼
//!                              advice + Sources
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export OPENAI_API_KEY=...
//! advisor index                                  # load and summarize the corpus
//! advisor rank "segment revenue"                 # inspect prefilter candidates
//! advisor ask "What are the main revenue segments?"
//! advisor serve                                  # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`source`] | CSV and in-memory row sources |
//! | [`index`] | Memoized document index |
//! | [`prefilter`] | Lexical candidate ranking |
//! | [`llm`] | Completion client abstraction |
//! | [`selection`] | Model-driven selection with fallback |
//! | [`context`] | Grounding context assembly |
//! | [`answer`] | Answer synthesis and attribution |
//! | [`pipeline`] | End-to-end request handling |
//! | [`server`] | HTTP server |

pub mod answer;
pub mod config;
pub mod context;
pub mod index;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod prefilter;
pub mod selection;
pub mod server;
pub mod source;
