//! Content categories used for prompt classification.

use serde::{Deserialize, Serialize};

/// A category with the keywords that route prompts into it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    /// Stable identifier stored on task rows
    pub id: String,
    /// Display name
    pub name: String,
    /// Lowercase keywords matched against prompt words
    #[serde(default)]
    pub keywords: Vec<String>,
}
