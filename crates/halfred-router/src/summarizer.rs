//! Summarization service seam.

use async_trait::async_trait;

use crate::error::RouterResult;
use crate::turn::ConversationTurn;

/// Compresses turns that fell out of the rolling window.
///
/// Implementations usually call a small language model with
/// [`summary_prompt`]. The returned text is merged with any existing summary
/// by the context manager; an empty string counts as a failure.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `turns`, oldest first.
    async fn summarize(&self, turns: &[ConversationTurn]) -> RouterResult<String>;
}

/// Render `turns` as `ROLE: content` lines.
#[must_use]
pub fn transcript(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.role().as_str().to_uppercase(), t.content()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt asking a model to summarize `turns`.
#[must_use]
pub fn summary_prompt(turns: &[ConversationTurn]) -> String {
    format!(
        "Summarize this conversation excerpt concisely, preserving:\n\
         - Key topics discussed\n\
         - Important decisions or conclusions\n\
         - User preferences mentioned\n\
         - Ongoing task context\n\
         \n\
         Conversation:\n\
         {}\n\
         \n\
         Summary (2-3 sentences):",
        transcript(turns)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::Role;

    #[test]
    fn test_transcript() {
        let turns = vec![
            ConversationTurn::new(Role::User, "hello"),
            ConversationTurn::new(Role::Assistant, "hi there"),
        ];
        assert_eq!(transcript(&turns), "USER: hello\nASSISTANT: hi there");
    }

    #[test]
    fn test_prompt_contains_transcript() {
        let turns = vec![ConversationTurn::new(Role::User, "remind me about milk")];
        let prompt = summary_prompt(&turns);
        assert!(prompt.contains("USER: remind me about milk"));
        assert!(prompt.ends_with("Summary (2-3 sentences):"));
    }
}
