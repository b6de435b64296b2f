//! Heuristic token estimation for prompt content.

use serde::{Deserialize, Serialize};

use crate::entity::{Confidence, TokenEstimate};

/// Substrings whose presence marks content as source code.
const CODE_MARKERS: &[&str] = &[
    "function", "const", "let", "var", "class", "import", "export", "def ", "return ", "{", "}",
    "()", "=>", ";",
];

/// Constants used by the token heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TokenEstimatorConfig {
    /// Lower bound tokens per word
    pub word_multiplier: f64,
    /// Upper bound tokens per character
    pub char_multiplier: f64,
    /// Applied to both bounds when content looks like code
    pub code_multiplier: f64,
    /// Estimates below this are `high` confidence
    pub high_confidence_below: u64,
    /// Estimates up to and including this are `medium` confidence
    pub medium_confidence_up_to: u64,
}

impl Default for TokenEstimatorConfig {
    fn default() -> Self {
        Self {
            word_multiplier: 0.75,
            char_multiplier: 0.25,
            code_multiplier: 1.3,
            high_confidence_below: 1000,
            medium_confidence_up_to: 5000,
        }
    }
}

impl TokenEstimatorConfig {
    /// Estimate the token count of `text`, detecting code automatically.
    pub fn estimate(&self, text: &str) -> TokenEstimate {
        self.estimate_with(text, looks_like_code(text))
    }

    pub fn estimate_with(&self, text: &str, is_code: bool) -> TokenEstimate {
        let words = text.split_whitespace().count() as f64;
        let chars = text.chars().count() as f64;

        let mut min = (self.word_multiplier * words).floor();
        let mut max = (self.char_multiplier * chars).floor();
        if is_code {
            min = (min * self.code_multiplier).floor();
            max = (max * self.code_multiplier).floor();
        }

        let min = min as u64;
        let max = max as u64;
        TokenEstimate {
            min,
            max,
            confidence: self.confidence_for(min.max(max)),
        }
    }

    fn confidence_for(&self, estimated: u64) -> Confidence {
        if estimated < self.high_confidence_below {
            Confidence::High
        } else if estimated <= self.medium_confidence_up_to {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// Cheap check for common code syntax.
pub fn looks_like_code(content: &str) -> bool {
    CODE_MARKERS.iter().any(|marker| content.contains(marker))
}
