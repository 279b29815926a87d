//! Prompt construction, one rule per operation.

use crate::operation::AiOperation;

pub const MAX_TAGS: usize = 5;

#[must_use]
pub fn build_prompt(operation: &AiOperation, text: &str) -> String {
    let text = text.trim();
    match operation {
        AiOperation::Summarize => format!(
            "Summarize the following note in two or three sentences. \
             Keep the key facts and drop filler.\n\nNote:\n{text}"
        ),
        AiOperation::Improve => format!(
            "Improve the writing of the following note. Fix grammar, spelling and \
             clarity while keeping the author's meaning and voice. Return only the \
             revised note.\n\nNote:\n{text}"
        ),
        AiOperation::ExtractKeyPoints => format!(
            "Extract the key points of the following note as a short bulleted list, \
             one point per line starting with \"• \".\n\nNote:\n{text}"
        ),
        AiOperation::ChangeTone { tone } => format!(
            "Rewrite the following note in a {tone} tone. Keep the content the same \
             and return only the rewritten note.\n\nNote:\n{text}"
        ),
        AiOperation::GenerateTags => format!(
            "Suggest up to {MAX_TAGS} short hashtags for the following note. Return \
             them on one line separated by spaces, each starting with #.\n\nNote:\n{text}"
        ),
        AiOperation::Expand => format!(
            "Expand the following idea into a fuller note with supporting detail and \
             examples. Keep it under 300 words.\n\nIdea:\n{text}"
        ),
        AiOperation::Translate { language } => format!(
            "Translate the following note into {language}. Return only the \
             translation.\n\nNote:\n{text}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{ALL_OPERATION_KINDS, OperationParams};

    #[test]
    fn every_prompt_embeds_trimmed_text() {
        for kind in ALL_OPERATION_KINDS {
            let operation = AiOperation::resolve(kind, &OperationParams::default());
            let prompt = build_prompt(&operation, "  the meeting moved to friday  ");
            assert!(
                prompt.ends_with("\nthe meeting moved to friday"),
                "{kind}: {prompt}"
            );
        }
    }

    #[test]
    fn prompts_are_deterministic() {
        let operation = AiOperation::Summarize;
        assert_eq!(
            build_prompt(&operation, "same input text"),
            build_prompt(&operation, "same input text")
        );
    }

    #[test]
    fn tone_and_language_reach_the_prompt() {
        let tone = AiOperation::ChangeTone {
            tone: "casual".to_string(),
        };
        assert!(build_prompt(&tone, "hello there team").contains("in a casual tone"));

        let translate = AiOperation::Translate {
            language: "German".to_string(),
        };
        assert!(build_prompt(&translate, "hello there team").contains("into German"));
    }
}
