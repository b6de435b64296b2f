// src/entity/prompt.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PromptType {
    #[default]
    Standard,
    #[serde(rename = "Zero Shot")]
    ZeroShot,
    #[serde(rename = "One Shot")]
    OneShot,
    #[serde(rename = "Few Shot")]
    FewShot,
}

impl std::fmt::Display for PromptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromptType::Standard => write!(f, "Standard"),
            PromptType::ZeroShot => write!(f, "Zero Shot"),
            PromptType::OneShot => write!(f, "One Shot"),
            PromptType::FewShot => write!(f, "Few Shot"),
        }
    }
}

impl std::str::FromStr for PromptType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect();
        match normalized.as_str() {
            "standard" => Ok(PromptType::Standard),
            "zeroshot" => Ok(PromptType::ZeroShot),
            "oneshot" => Ok(PromptType::OneShot),
            "fewshot" => Ok(PromptType::FewShot),
            _ => Err(format!("Invalid prompt type: {}", s)),
        }
    }
}

impl PromptType {
    pub const ALL: [PromptType; 4] = [
        PromptType::Standard,
        PromptType::ZeroShot,
        PromptType::OneShot,
        PromptType::FewShot,
    ];

    /// Starter text offered when a prompt of this type is being written.
    pub fn template(&self) -> &'static str {
        match self {
            PromptType::Standard => {
                "[Persona]\n\
                 Describe your persona here using only a concise, single sentence. \
                 (ex: You are a senior engineer focused on security and performance).\n\n\
                 ===\n\n\
                 [Your prompt content here]\n\n\
                 ===\n\n\
                 Let's think this through step by step."
            }
            PromptType::ZeroShot => {
                "[Persona]\n\
                 Describe your persona here using only a concise, single sentence. \
                 (ex: 'You are a technical writer who prioritizes clarity for beginners').\n\n\
                 ===\n\n\
                 [Task Description]\n\
                 Describe the task you want the AI to perform here.\n\n\
                 ===\n\n\
                 [Input/Context]\n\
                 Provide any input, context, or data the AI needs to complete the task.\n\n\
                 ===\n\n\
                 [Instructions]\n\
                 Specify any specific requirements, constraints, or formatting preferences.\n\n\
                 ===\n\n\
                 Let's think this through step by step."
            }
            PromptType::OneShot => {
                "[Persona]\n\
                 Describe your persona here using only a concise, single sentence. \
                 (ex: 'You are a systematic debugger who checks assumptions').\n\n\
                 ===\n\n\
                 [Task Description]\n\
                 Describe the task you want the AI to perform here.\n\n\
                 ===\n\n\
                 [Example]\n\
                 Input: [Your example input here]\n\
                 Output: [Your example output here]\n\n\
                 ===\n\n\
                 [Instructions]\n\
                 Now perform the same task on the following:\n\
                 [Your actual input to process]\n\n\
                 ===\n\n\
                 Let's think this through step by step."
            }
            PromptType::FewShot => {
                "[Persona]\n\
                 Describe your persona here using only a concise, single sentence. \
                 (ex: 'You are a solutions architect who considers scalability').\n\n\
                 ===\n\n\
                 [Task Description]\n\
                 Describe the task you want the AI to perform here.\n\n\
                 ===\n\n\
                 [Examples]\n\
                 Example 1:\n\
                 Input: [Your first example input]\n\
                 Output: [Your first example output]\n\n\
                 Example 2:\n\
                 Input: [Your second example input]\n\
                 Output: [Your second example output]\n\n\
                 Example 3:\n\
                 Input: [Your third example input]\n\
                 Output: [Your third example output]\n\n\
                 ===\n\n\
                 [Instructions]\n\
                 Now perform the same task on the following:\n\
                 [Your actual input to process]\n\n\
                 ===\n\n\
                 Let's think this through step by step."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEstimate {
    pub min: u64,
    pub max: u64,
    pub confidence: Confidence,
}

impl TokenEstimate {
    /// The single-number estimate, the larger of both bounds.
    pub fn estimated(&self) -> u64 {
        self.min.max(self.max)
    }
}

/// Model metadata attached to a version.
///
/// Keys this build does not know about are carried through `extra` so that
/// files written by other versions survive a load/save cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_estimate: Option<TokenEstimate>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A versioned prompt.
///
/// `title`, `content`, `prompt_type` and `metadata` mirror the default
/// version for readers of the flat legacy layout. They are recomputed with
/// [`PromptRecord::refresh_flat_cache`] whenever the default changes and are
/// never read as a source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRecord {
    pub id: String,
    #[serde(alias = "group")]
    pub category: String,
    #[serde(default)]
    pub rating: u8,
    pub versions: Vec<Version>,
    #[serde(alias = "defaultVersion")]
    pub default_version_number: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub prompt_type: PromptType,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Input for creating a prompt.
#[derive(Debug, Clone)]
pub struct NewPrompt {
    pub title: String,
    pub content: String,
    pub model: String,
    pub category: String,
    pub prompt_type: PromptType,
}
