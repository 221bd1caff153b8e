//! Terminal confirmation handler.
//!
//! Implements [`ConfirmationHandler`] for the CLI using `dialoguer`. The
//! rendered request is printed, then the user answers `y`, `n` or `a`.
//! End of input or an interrupted prompt counts as a denial.

use async_trait::async_trait;
use colored::Colorize;
use dialoguer::Input;
use dialoguer::theme::ColorfulTheme;
use halfred_safety::{
    ConfirmationDecision, ConfirmationHandler, ConfirmationRequest, RiskTier, SafetyError,
    SafetyResult,
};
use tracing::debug;

/// Parse one answer. `None` means ask again.
#[must_use]
pub fn parse_answer(answer: &str) -> Option<ConfirmationDecision> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(ConfirmationDecision::Approved),
        "n" | "no" => Some(ConfirmationDecision::denied("denied by user")),
        "a" | "abort" => Some(ConfirmationDecision::aborted("aborted by user")),
        "t" | "target" => Some(ConfirmationDecision::adjust_target()),
        _ => None,
    }
}

/// CLI implementation of the confirmation handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirmationHandler;

impl TerminalConfirmationHandler {
    /// Create a new terminal handler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn prompt_blocking(request: &ConfirmationRequest) -> ConfirmationDecision {
    let rendered = request.render();
    let colored = match request.classification.tier {
        RiskTier::Dangerous => rendered.red().bold().to_string(),
        RiskTier::Risky => rendered.yellow().to_string(),
        RiskTier::Safe => rendered,
    };
    eprintln!();
    eprintln!("{colored}");

    let theme = ColorfulTheme::default();
    loop {
        let answer: Result<String, _> = Input::with_theme(&theme)
            .with_prompt("Approve? [y]es / [n]o / [a]bort")
            .allow_empty(true)
            .interact_text();

        match answer {
            Ok(text) => match parse_answer(&text) {
                Some(decision) => return decision,
                None => eprintln!("{}", "Please answer y, n or a.".dimmed()),
            },
            Err(e) => {
                debug!(error = %e, "prompt closed, denying");
                return ConfirmationDecision::denied("no answer (input closed)");
            },
        }
    }
}

#[async_trait]
impl ConfirmationHandler for TerminalConfirmationHandler {
    async fn confirm(&self, request: &ConfirmationRequest) -> SafetyResult<ConfirmationDecision> {
        let request = request.clone();
        tokio::task::spawn_blocking(move || prompt_blocking(&request))
            .await
            .map_err(|e| SafetyError::ConfirmationUnavailable(e.to_string()))
    }

    fn is_available(&self) -> bool {
        std::io::IsTerminal::is_terminal(&std::io::stdin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answers() {
        assert_eq!(parse_answer("y"), Some(ConfirmationDecision::Approved));
        assert_eq!(parse_answer(" YES "), Some(ConfirmationDecision::Approved));
        assert!(matches!(
            parse_answer("n"),
            Some(ConfirmationDecision::Denied { .. })
        ));
        assert!(parse_answer("abort").unwrap().is_aborted());
        assert_eq!(parse_answer("t"), Some(ConfirmationDecision::adjust_target()));
    }

    #[test]
    fn test_unknown_answer_asks_again() {
        assert_eq!(parse_answer(""), None);
        assert_eq!(parse_answer("maybe"), None);
    }
}
