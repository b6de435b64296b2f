use serde::{Deserialize, Serialize};

use crate::tokens::TokenEstimatorConfig;

/// Category assigned by migration to records that predate categories.
pub const DEFAULT_CATEGORY: &str = "Toolbox";

/// Format version written into export bundles and expected on import.
pub const EXPORT_FORMAT_VERSION: &str = "1.0.0";

/// Configuration for a prompt library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LibraryConfig {
    /// Category given to legacy records that have none
    pub default_category: String,
    /// Categories seeded into an empty library
    pub default_categories: Vec<String>,
    /// Bundle format version this build reads and writes
    pub export_format_version: String,
    pub tokens: TokenEstimatorConfig,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            default_category: DEFAULT_CATEGORY.to_string(),
            default_categories: vec![
                "General".to_string(),
                "Toolbox".to_string(),
                "Web-React".to_string(),
            ],
            export_format_version: EXPORT_FORMAT_VERSION.to_string(),
            tokens: TokenEstimatorConfig::default(),
        }
    }
}
