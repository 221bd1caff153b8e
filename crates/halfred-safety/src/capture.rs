//! Best-effort context capture for confirmation prompts.
//!
//! Providers return either an artifact or an explicit error. The gate logs
//! failures and carries on: a missing screenshot never blocks a prompt.

use async_trait::async_trait;
use std::fmt;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use crate::command::{Command, ProposedChange};
use crate::diff::{self, DEFAULT_MAX_DIFF_LINES};
use crate::error::{SafetyError, SafetyResult};
use crate::request::{CapturedArtifact, ScreenRegion};

/// Something that can collect context for a pending confirmation.
///
/// Screenshots come from the screen-capture tool server, so that provider
/// lives with the host application; [`DiffCapture`] ships here.
#[async_trait]
pub trait CaptureProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Whether this provider has anything to say about `command`.
    fn applies_to(&self, command: &Command) -> bool;

    /// Capture context for `command`.
    async fn capture(&self, command: &Command) -> SafetyResult<CapturedArtifact>;
}

/// Renders a diff of the file a write or edit would change.
#[derive(Debug, Clone)]
pub struct DiffCapture {
    max_lines: usize,
}

impl Default for DiffCapture {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_DIFF_LINES,
        }
    }
}

impl DiffCapture {
    /// Truncate diffs after `max_lines` lines.
    #[must_use]
    pub fn new(max_lines: usize) -> Self {
        Self { max_lines }
    }
}

#[async_trait]
impl CaptureProvider for DiffCapture {
    fn name(&self) -> &'static str {
        "diff"
    }

    fn applies_to(&self, command: &Command) -> bool {
        command.diff_target().is_some()
    }

    async fn capture(&self, command: &Command) -> SafetyResult<CapturedArtifact> {
        let Some((path, change)) = command.diff_target() else {
            return Err(SafetyError::Capture {
                provider: self.name(),
                message: "command has no content to diff".to_string(),
            });
        };

        let text = match tokio::fs::read_to_string(path).await {
            Ok(current) => {
                let proposed = change.apply(&current).map_err(|idx| SafetyError::Capture {
                    provider: self.name(),
                    message: format!("edit {idx} does not match the current contents of {path}"),
                })?;
                diff::unified_diff(path, &current, &proposed, self.max_lines)
            },
            Err(e) if e.kind() == ErrorKind::NotFound => match change {
                ProposedChange::Content(proposed) => diff::new_file_preview(path, proposed),
                ProposedChange::Edits(_) => {
                    return Err(SafetyError::Capture {
                        provider: self.name(),
                        message: format!("cannot preview edits to missing file {path}"),
                    });
                },
            },
            Err(e) => {
                return Err(SafetyError::Capture {
                    provider: self.name(),
                    message: format!("failed to read {path}: {e}"),
                });
            },
        };
        Ok(CapturedArtifact::Diff { text })
    }
}

/// Draws a temporary marker over a screen region.
///
/// Implemented by the host on top of its desktop automation server.
#[async_trait]
pub trait Highlighter: Send + Sync {
    /// Show a marker over `region` for `duration`.
    async fn highlight(&self, region: ScreenRegion, duration: Duration) -> SafetyResult<()>;
}

/// Default side of the highlighted square, in pixels.
pub const DEFAULT_HIGHLIGHT_SIZE: u32 = 50;

/// Default time the highlight stays visible.
pub const DEFAULT_HIGHLIGHT_DURATION: Duration = Duration::from_secs(2);

/// Highlights the target of a positioned desktop action before the prompt.
pub struct HighlightCapture {
    highlighter: Arc<dyn Highlighter>,
    size: u32,
    duration: Duration,
}

impl HighlightCapture {
    /// Highlight with the default size and duration.
    #[must_use]
    pub fn new(highlighter: Arc<dyn Highlighter>) -> Self {
        Self {
            highlighter,
            size: DEFAULT_HIGHLIGHT_SIZE,
            duration: DEFAULT_HIGHLIGHT_DURATION,
        }
    }

    /// Side of the highlighted square.
    #[must_use]
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// How long the marker stays up.
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    fn target(&self, command: &Command) -> Option<ScreenRegion> {
        match command {
            Command::Automation(action) => {
                Some(ScreenRegion::around(action.x?, action.y?, self.size))
            },
            _ => None,
        }
    }
}

impl fmt::Debug for HighlightCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HighlightCapture")
            .field("size", &self.size)
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CaptureProvider for HighlightCapture {
    fn name(&self) -> &'static str {
        "highlight"
    }

    fn applies_to(&self, command: &Command) -> bool {
        self.target(command).is_some()
    }

    async fn capture(&self, command: &Command) -> SafetyResult<CapturedArtifact> {
        let Some(region) = self.target(command) else {
            return Err(SafetyError::Capture {
                provider: self.name(),
                message: "command has no screen coordinates".to_string(),
            });
        };
        self.highlighter.highlight(region, self.duration).await?;
        Ok(CapturedArtifact::Highlight { region })
    }
}
