//! AI operation catalogue.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_INPUT_CHARS: usize = 10;
pub const EXPAND_MIN_INPUT_CHARS: usize = 5;
pub const DEFAULT_TONE: &str = "professional";
pub const DEFAULT_LANGUAGE: &str = "Spanish";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    Summarize,
    Improve,
    #[serde(rename = "key-points")]
    ExtractKeyPoints,
    ChangeTone,
    GenerateTags,
    Expand,
    Translate,
}

pub const ALL_OPERATION_KINDS: [OperationKind; 7] = [
    OperationKind::Summarize,
    OperationKind::Improve,
    OperationKind::ExtractKeyPoints,
    OperationKind::ChangeTone,
    OperationKind::GenerateTags,
    OperationKind::Expand,
    OperationKind::Translate,
];

impl OperationKind {
    /// Wire name; also the remote endpoint segment under `/ai/`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::Improve => "improve",
            Self::ExtractKeyPoints => "key-points",
            Self::ChangeTone => "change-tone",
            Self::GenerateTags => "generate-tags",
            Self::Expand => "expand",
            Self::Translate => "translate",
        }
    }

    /// Minimum trimmed character count of the input text.
    #[must_use]
    pub fn min_input_chars(self) -> usize {
        match self {
            Self::Expand => EXPAND_MIN_INPUT_CHARS,
            _ => DEFAULT_MIN_INPUT_CHARS,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Summarize => "Summarized",
            Self::Improve => "Improved",
            Self::ExtractKeyPoints => "Key Points Extracted",
            Self::ChangeTone => "Tone Changed",
            Self::GenerateTags => "Tags Generated",
            Self::Expand => "Idea Expanded",
            Self::Translate => "Translated",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown AI operation: {name}")]
pub struct OperationParseError {
    pub name: String,
}

impl FromStr for OperationKind {
    type Err = OperationParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "summarize" | "summary" => Ok(Self::Summarize),
            "improve" | "improve-writing" => Ok(Self::Improve),
            "key-points" | "keypoints" | "extract-key-points" => Ok(Self::ExtractKeyPoints),
            "change-tone" | "changetone" | "tone" => Ok(Self::ChangeTone),
            "generate-tags" | "generatetags" | "tags" => Ok(Self::GenerateTags),
            "expand" | "expand-idea" | "expandidea" => Ok(Self::Expand),
            "translate" => Ok(Self::Translate),
            _ => Err(OperationParseError {
                name: raw.trim().to_string(),
            }),
        }
    }
}

/// Caller-supplied parameters; blank values count as omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl OperationParams {
    #[must_use]
    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum AiOperation {
    Summarize,
    Improve,
    #[serde(rename = "key-points")]
    ExtractKeyPoints,
    ChangeTone {
        tone: String,
    },
    GenerateTags,
    Expand,
    Translate {
        language: String,
    },
}

impl AiOperation {
    #[must_use]
    pub fn resolve(kind: OperationKind, params: &OperationParams) -> Self {
        match kind {
            OperationKind::Summarize => Self::Summarize,
            OperationKind::Improve => Self::Improve,
            OperationKind::ExtractKeyPoints => Self::ExtractKeyPoints,
            OperationKind::ChangeTone => Self::ChangeTone {
                tone: non_blank(params.tone.as_deref()).unwrap_or(DEFAULT_TONE).to_string(),
            },
            OperationKind::GenerateTags => Self::GenerateTags,
            OperationKind::Expand => Self::Expand,
            OperationKind::Translate => Self::Translate {
                language: non_blank(params.language.as_deref())
                    .unwrap_or(DEFAULT_LANGUAGE)
                    .to_string(),
            },
        }
    }

    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Summarize => OperationKind::Summarize,
            Self::Improve => OperationKind::Improve,
            Self::ExtractKeyPoints => OperationKind::ExtractKeyPoints,
            Self::ChangeTone { .. } => OperationKind::ChangeTone,
            Self::GenerateTags => OperationKind::GenerateTags,
            Self::Expand => OperationKind::Expand,
            Self::Translate { .. } => OperationKind::Translate,
        }
    }

    /// Resolved parameters as sent to the remote backend.
    #[must_use]
    pub fn params(&self) -> OperationParams {
        match self {
            Self::ChangeTone { tone } => OperationParams::default().with_tone(tone.clone()),
            Self::Translate { language } => {
                OperationParams::default().with_language(language.clone())
            }
            _ => OperationParams::default(),
        }
    }
}

#[must_use]
pub fn input_chars(text: &str) -> usize {
    text.trim().chars().count()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
