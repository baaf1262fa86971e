use serde::{Deserialize, Serialize};

/// How inline entries are pooled inside one inline group field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InlineScope {
    /// Every group of a field appends to one collection; the first group
    /// defines the table columns.
    #[default]
    PerField,
    /// Each group owns its own collection and columns.
    PerGroup,
}

/// Session behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormOptions {
    /// Reject schemas with error-severity issues (duplicate names or ids).
    #[serde(default = "default_true")]
    pub strict: bool,
    #[serde(default)]
    pub inline_scope: InlineScope,
    /// Run required/pattern/bounds checks before handing out a submission.
    #[serde(default = "default_true")]
    pub validate_on_submit: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            strict: true,
            inline_scope: InlineScope::PerField,
            validate_on_submit: true,
        }
    }
}

impl FormOptions {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            Ok(Self::default())
        } else {
            serde_json::from_str(raw)
        }
    }
}
