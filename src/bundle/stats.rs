use serde::{Deserialize, Serialize};

use crate::entity::PromptRecord;

/// Summary numbers stored alongside an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_prompts: usize,
    /// Mean over rated prompts only, to two decimals
    pub average_rating: f64,
    pub most_used_model: Option<String>,
    /// Number of prompts with a rating
    pub total_ratings: usize,
}

pub fn compute_statistics(records: &[PromptRecord]) -> Statistics {
    let rated: Vec<u8> = records
        .iter()
        .map(|r| r.rating)
        .filter(|rating| *rating > 0)
        .collect();
    let average_rating = if rated.is_empty() {
        0.0
    } else {
        let sum: u32 = rated.iter().map(|r| u32::from(*r)).sum();
        round2(f64::from(sum) / rated.len() as f64)
    };

    // First-seen order breaks ties
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for record in records {
        let model = record
            .effective_default()
            .ok()
            .and_then(|v| v.metadata.as_ref())
            .and_then(|m| m.model.as_deref());
        if let Some(model) = model {
            match counts.iter_mut().find(|(name, _)| *name == model) {
                Some((_, count)) => *count += 1,
                None => counts.push((model, 1)),
            }
        }
    }

    let mut most_used: Option<(&str, usize)> = None;
    for (name, count) in counts {
        if most_used.map_or(true, |(_, best)| count > best) {
            most_used = Some((name, count));
        }
    }

    Statistics {
        total_prompts: records.len(),
        average_rating,
        most_used_model: most_used.map(|(name, _)| name.to_string()),
        total_ratings: rated.len(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
