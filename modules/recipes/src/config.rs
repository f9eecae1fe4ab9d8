use serde::{Deserialize, Serialize};

/// Configuration for the recipes module (`modules.recipes`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipesConfig {
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

impl Default for RecipesConfig {
    fn default() -> Self {
        Self {
            min_password_length: default_min_password_length(),
            max_name_length: default_max_name_length(),
        }
    }
}

fn default_min_password_length() -> usize {
    5
}

fn default_max_name_length() -> usize {
    255
}
