//! Local placeholder generator used while the AI backend is unavailable.
//!
//! Output is deterministic and always starts with [`PLACEHOLDER_MARKER`], so
//! a caller can never mistake it for a real AI result.

use crate::operation::AiOperation;
use crate::prompt::MAX_TAGS;

pub const PLACEHOLDER_MARKER: &str = "[Demo mode]";
pub const SUMMARY_PREVIEW_CHARS: usize = 150;
const KEY_POINT_LIMIT: usize = 3;
const MIN_TAG_CHARS: usize = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderGenerator;

impl PlaceholderGenerator {
    #[must_use]
    pub fn generate(&self, operation: &AiOperation, text: &str) -> String {
        let body = match operation {
            AiOperation::Summarize => summary_preview(text),
            AiOperation::Improve => format!("Improved: {}", collapse_whitespace(text)),
            AiOperation::ExtractKeyPoints => key_points(text),
            AiOperation::ChangeTone { tone } => {
                format!("({tone} tone) {}", collapse_whitespace(text))
            }
            AiOperation::GenerateTags => tags(text),
            AiOperation::Expand => format!(
                "Expanded: {}\n\nConnect an AI backend to turn this idea into a full draft.",
                collapse_whitespace(text)
            ),
            AiOperation::Translate { language } => format!(
                "({language} translation unavailable offline) {}",
                collapse_whitespace(text)
            ),
        };
        format!("{PLACEHOLDER_MARKER} {body}")
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn summary_preview(text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    let preview = collapsed
        .chars()
        .take(SUMMARY_PREVIEW_CHARS)
        .collect::<String>();
    if preview.len() < collapsed.len() {
        format!("Summary: {preview}...")
    } else {
        format!("Summary: {preview}")
    }
}

fn key_points(text: &str) -> String {
    let sentences = text
        .split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .take(KEY_POINT_LIMIT)
        .map(|sentence| format!("• {sentence}"))
        .collect::<Vec<_>>();
    format!("Key points:\n{}", sentences.join("\n"))
}

fn tags(text: &str) -> String {
    let mut seen: Vec<String> = Vec::new();
    for word in text.split(|ch: char| !ch.is_alphanumeric()) {
        if word.chars().count() < MIN_TAG_CHARS {
            continue;
        }
        let tag = word.to_lowercase();
        if !seen.contains(&tag) {
            seen.push(tag);
        }
        if seen.len() == MAX_TAGS {
            break;
        }
    }
    let rendered = seen
        .iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("Tags: {rendered}")
}
