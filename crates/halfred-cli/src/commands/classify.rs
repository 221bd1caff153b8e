//! CLI handlers for the `halfred classify` subcommand.

use anyhow::Result;
use halfred_safety::{Classification, Command, CommandClassifier};
use serde_json::json;

use super::OutputFormat;
use crate::theme::Theme;

/// Join trailing shell words back into one command line.
///
/// A single argument is taken verbatim, so `"cat notes.txt | sh"` keeps its
/// pipe. Several arguments are quoted as separate words.
pub(crate) fn shell_line(words: &[String]) -> Result<String> {
    match words {
        [single] => Ok(single.clone()),
        many => shlex::try_join(many.iter().map(String::as_str))
            .map_err(|e| anyhow::anyhow!("cannot quote command: {e}")),
    }
}

/// Render a classification.
pub(crate) fn render(command: &Command, classification: &Classification, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json!({
            "kind": command.kind(),
            "summary": command.summary(),
            "tier": classification.tier,
            "reason": classification.reason,
            "requires_confirmation": classification.requires_confirmation(),
        })
        .to_string(),
        OutputFormat::Pretty => {
            let mut out = format!("{}  {}", Theme::tier(classification.tier), command.summary());
            if let Some(reason) = &classification.reason {
                out.push('\n');
                out.push_str(&Theme::kv("  reason", reason));
            }
            if classification.requires_confirmation() {
                out.push('\n');
                out.push_str(&Theme::dimmed("  confirmation required"));
            }
            out
        },
    }
}

/// Classify `command` and print the result.
pub(crate) fn classify_command(
    classifier: &CommandClassifier,
    command: &Command,
    format: OutputFormat,
) {
    let classification = classifier.classify(command);
    println!("{}", render(command, &classification, format));
}
