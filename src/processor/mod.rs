//! # Detail-Level Summarizer
//!
//! Shortens extracted text to a character budget chosen by a detail level.
//! Level 5 keeps the text as it is. Levels 1 to 4 ask the completion model for
//! a condensation in the same language, and fall back to truncating at a word
//! boundary when no model is configured or the call fails, times out or comes
//! back empty. Summarization never fails the pipeline.

mod config;
mod error;

pub use config::{ProcessorConfig, ProcessorConfigBuilder};
pub use error::ProcessError;

use std::fmt;

use rig::completion::{AssistantContent, CompletionModel};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Texts at or below this many characters are never shortened
pub const VERBATIM_THRESHOLD: usize = 400;

/// Smallest budget any level produces
pub const BUDGET_FLOOR: usize = 200;

/// How much of the source to keep, 1 (terse) to 5 (everything)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DetailLevel(u8);

impl DetailLevel {
    /// Keep the full text
    pub const FULL: DetailLevel = DetailLevel(5);

    pub fn new(level: u8) -> Result<Self, ProcessError> {
        if (1..=5).contains(&level) {
            Ok(Self(level))
        } else {
            Err(ProcessError::InvalidDetailLevel(level))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Fraction of the source length and ceiling, for levels below 5
    fn ratio_and_cap(self) -> Option<(f64, usize)> {
        match self.0 {
            1 => Some((0.15, 350)),
            2 => Some((0.30, 700)),
            3 => Some((0.45, 1000)),
            4 => Some((0.60, 1500)),
            _ => None,
        }
    }

    /// Character budget for a source of `source_chars` characters.
    ///
    /// `None` means the text is kept verbatim.
    pub fn budget(self, source_chars: usize) -> Option<usize> {
        if source_chars <= VERBATIM_THRESHOLD {
            return None;
        }
        let (ratio, cap) = self.ratio_and_cap()?;
        let proportional = (source_chars as f64 * ratio).floor() as usize;
        Some(proportional.min(cap).max(BUDGET_FLOOR))
    }
}

impl TryFrom<u8> for DetailLevel {
    type Error = ProcessError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<DetailLevel> for u8 {
    fn from(level: DetailLevel) -> Self {
        level.0
    }
}

impl Default for DetailLevel {
    fn default() -> Self {
        Self::FULL
    }
}

/// Which path produced a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMethod {
    Verbatim,
    Llm,
    Truncated,
}

impl fmt::Display for SummaryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SummaryMethod::Verbatim => "verbatim",
            SummaryMethod::Llm => "llm",
            SummaryMethod::Truncated => "truncated",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    pub method: SummaryMethod,
}

const SUMMARY_PREAMBLE: &str = "You condense web page text for a knowledge base. \
Write the condensed text in the same language as the input. Keep names, numbers, \
dates and contact details. Return only the condensed text, without headings or commentary.";

/// Condenses text with an optional completion model
#[derive(Debug, Clone)]
pub struct Summarizer<C: CompletionModel> {
    model: Option<C>,
    config: ProcessorConfig,
}

impl<C: CompletionModel> Summarizer<C> {
    pub fn new(model: Option<C>, config: ProcessorConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Summarize `text` at `level`; always produces a result
    #[instrument(skip(self, text, level), fields(chars = text.chars().count(), level = level.get()))]
    pub async fn summarize(&self, text: &str, level: DetailLevel) -> Summary {
        let Some(budget) = level.budget(text.chars().count()) else {
            return Summary {
                text: text.to_string(),
                method: SummaryMethod::Verbatim,
            };
        };

        let summary = match &self.model {
            Some(model) => match self.condense(model, text, budget).await {
                Ok(condensed) => Summary {
                    text: truncate_with_ellipsis(&condensed, budget),
                    method: SummaryMethod::Llm,
                },
                Err(e) => {
                    warn!(error = %e, "Summarization failed, truncating instead");
                    truncated(text, budget)
                }
            },
            None => truncated(text, budget),
        };

        debug!(method = %summary.method, budget, "Summarized text");
        summary
    }

    async fn condense(&self, model: &C, text: &str, budget: usize) -> Result<String, ProcessError> {
        let prompt = format!(
            "Condense the following text to at most {budget} characters.\n\n{text}"
        );
        let request = model
            .completion_request(prompt)
            .preamble(SUMMARY_PREAMBLE.to_string())
            .send();

        let response = tokio::time::timeout(self.config.summary_timeout, request)
            .await
            .map_err(|_| ProcessError::Timeout(self.config.summary_timeout))??;

        let condensed = response
            .choice
            .iter()
            .map(|c| match c {
                AssistantContent::Text(t) => t.text.clone(),
                _ => "".to_string(),
            })
            .collect::<Vec<String>>()
            .join("\n");

        let condensed = condensed.trim();
        if condensed.is_empty() {
            return Err(ProcessError::EmptyResponse);
        }
        Ok(condensed.to_string())
    }
}

fn truncated(text: &str, budget: usize) -> Summary {
    Summary {
        text: truncate_with_ellipsis(text, budget),
        method: SummaryMethod::Truncated,
    }
}

/// Cut `text` to at most `budget` characters, preferring a word boundary, ending in `…`
pub fn truncate_with_ellipsis(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    if budget == 0 {
        return String::new();
    }

    let keep: String = text.chars().take(budget - 1).collect();
    let cut = match keep.rfind(char::is_whitespace) {
        // Only back up to a word boundary if it keeps most of the text
        Some(idx) if keep[..idx].chars().count() >= (budget - 1) / 2 => &keep[..idx],
        _ => keep.as_str(),
    };

    let mut out = cut.trim_end().to_string();
    out.push('…');
    out
}
