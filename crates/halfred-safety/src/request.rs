//! Confirmation request and decision types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::classifier::Classification;
use crate::command::Command;
use crate::tier::RiskTier;

/// Unique identifier for a confirmation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Create a new random request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "confirm:{}", self.0)
    }
}

/// Context captured to help the human decide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CapturedArtifact {
    /// A screenshot saved to disk.
    Screenshot {
        /// Where the image was written.
        path: PathBuf,
    },
    /// A rendered diff or new-file preview.
    Diff {
        /// The rendered text.
        text: String,
    },
    /// A screen region that was highlighted for the human.
    Highlight {
        /// The highlighted region.
        region: ScreenRegion,
    },
    /// Free-form note from a capture provider.
    Note {
        /// The note text.
        text: String,
    },
}

impl fmt::Display for CapturedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Screenshot { path } => write!(f, "[screenshot] {}", path.display()),
            Self::Highlight { region } => write!(f, "[highlighted] {region}"),
            Self::Diff { text } | Self::Note { text } => write!(f, "{text}"),
        }
    }
}

/// A rectangle on screen, in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRegion {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ScreenRegion {
    /// A `size` by `size` square centred on a point.
    #[must_use]
    pub fn around(x: i32, y: i32, size: u32) -> Self {
        let half = i32::try_from(size / 2).unwrap_or(i32::MAX);
        Self {
            x: x.saturating_sub(half),
            y: y.saturating_sub(half),
            width: size,
            height: size,
        }
    }
}

impl fmt::Display for ScreenRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} at ({}, {})", self.width, self.height, self.x, self.y)
    }
}

/// A request for a human decision on one command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    /// Request identifier.
    pub id: RequestId,
    /// The command awaiting a decision.
    pub command: Command,
    /// Why it needs one.
    pub classification: Classification,
    /// Whatever the capture providers managed to collect.
    pub captured: Vec<CapturedArtifact>,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
}

impl ConfirmationRequest {
    /// Create a request with no captured context.
    #[must_use]
    pub fn new(command: Command, classification: Classification) -> Self {
        Self {
            id: RequestId::new(),
            command,
            classification,
            captured: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Attach captured artifacts.
    #[must_use]
    pub fn with_captured(mut self, captured: Vec<CapturedArtifact>) -> Self {
        self.captured = captured;
        self
    }

    /// Render the prompt shown (or read aloud) to the human.
    #[must_use]
    pub fn render(&self) -> String {
        let rule = "=".repeat(60);
        let subject = match &self.command {
            Command::Shell { .. } => "COMMAND",
            Command::Filesystem(_) => "FILE OPERATION",
            Command::Automation(_) => "DESKTOP ACTION",
        };
        let tier = self.classification.tier;

        let mut lines = vec![
            rule.clone(),
            format!("{} {subject} REQUIRES CONFIRMATION", tier.label()),
        ];
        if tier == RiskTier::Dangerous {
            lines.push("WARNING: this may cause irreversible damage.".to_string());
        }
        lines.push(rule);
        lines.push(format!("Action:    {}", self.command.summary()));

        if let Command::Shell {
            command,
            working_directory,
            ..
        } = &self.command
        {
            if let Some(base) = base_command(command) {
                lines.push(format!("Command:   {base}"));
            }
            if let Some(dir) = working_directory {
                lines.push(format!("Directory: {}", dir.display()));
            }
        }

        lines.push(format!("Tier:      {}", tier.label()));
        if let Some(reason) = &self.classification.reason {
            lines.push(format!("Reason:    {reason}"));
        }
        if !self.captured.is_empty() {
            lines.push("--- Context ---".to_string());
            lines.extend(self.captured.iter().map(ToString::to_string));
        }
        lines.join("\n")
    }
}

impl fmt::Display for ConfirmationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// First word of a shell line, for display only.
fn base_command(line: &str) -> Option<String> {
    shlex::split(line)?.into_iter().next()
}

/// A human's answer to a confirmation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ConfirmationDecision {
    /// Run the command.
    Approved,
    /// Skip the command; the task continues.
    Denied {
        /// Why the command was skipped.
        reason: String,
    },
    /// Cancel the whole enclosing task.
    Aborted {
        /// Why the task was aborted.
        reason: String,
    },
}

impl ConfirmationDecision {
    /// Shorthand for a denial.
    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self::Denied {
            reason: reason.into(),
        }
    }

    /// Shorthand for an abort.
    #[must_use]
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted {
            reason: reason.into(),
        }
    }

    /// The denial used when the human asks for a different target.
    #[must_use]
    pub fn adjust_target() -> Self {
        Self::denied("user asked to adjust the target; refine coordinates and try again")
    }

    /// Whether the command may run.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Whether the enclosing task must be cancelled.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

impl fmt::Display for ConfirmationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => write!(f, "approved"),
            Self::Denied { reason } => write!(f, "denied: {reason}"),
            Self::Aborted { reason } => write!(f, "aborted: {reason}"),
        }
    }
}
