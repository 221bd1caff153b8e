//! Imperative command descriptors.
//!
//! A [`Command`] is what the assistant proposes to run. It is a plain data
//! value: nothing here touches the filesystem, the shell or the desktop.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{SafetyError, SafetyResult};

/// An imperative action proposed by the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// A shell command line.
    Shell {
        /// The raw command line.
        command: String,
        /// Directory the command would run in.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        working_directory: Option<PathBuf>,
        /// Execution timeout requested by the caller.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_secs: Option<u64>,
    },
    /// A filesystem operation.
    Filesystem(FilesystemCommand),
    /// A desktop automation action.
    Automation(AutomationAction),
}

impl Command {
    /// Shorthand for a shell command with no working directory or timeout.
    #[must_use]
    pub fn shell(command: impl Into<String>) -> Self {
        Self::Shell {
            command: command.into(),
            working_directory: None,
            timeout_secs: None,
        }
    }

    /// Short kind name, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Shell { .. } => "shell",
            Self::Filesystem(_) => "filesystem",
            Self::Automation(_) => "automation",
        }
    }

    /// One-line human readable description.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Shell { command, .. } => format!("Run shell command: {command}"),
            Self::Filesystem(fs) => fs.summary(),
            Self::Automation(action) => action.summary(),
        }
    }

    /// Path the command writes to, and what it would write, when a diff
    /// preview makes sense.
    #[must_use]
    pub fn diff_target(&self) -> Option<(&str, ProposedChange<'_>)> {
        match self {
            Self::Filesystem(fs) if fs.operation.wants_diff() => {
                let path = fs.paths.first()?;
                let change = match (&fs.content, fs.edits.as_slice()) {
                    (Some(content), _) => ProposedChange::Content(content),
                    (None, []) => return None,
                    (None, edits) => ProposedChange::Edits(edits),
                };
                Some((path.as_str(), change))
            },
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

/// Kind of filesystem operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FsOperation {
    /// Read file contents.
    Read,
    /// Write (or create) a file with new content.
    Write,
    /// Edit part of an existing file.
    Edit,
    /// Create a directory.
    CreateDirectory,
    /// Move or rename.
    Move,
    /// Delete.
    Delete,
    /// List a directory.
    List,
    /// Search for files.
    Search,
    /// Read file metadata.
    Metadata,
}

impl FsOperation {
    /// Map a filesystem tool-server operation name onto a kind.
    #[must_use]
    pub fn from_tool_name(name: &str) -> Option<Self> {
        let op = match name {
            "read_file" | "read_text_file" | "read_multiple_files" => Self::Read,
            "write_file" | "create_file" => Self::Write,
            "edit_file" => Self::Edit,
            "create_directory" => Self::CreateDirectory,
            "move_file" => Self::Move,
            "delete_file" | "remove_file" => Self::Delete,
            "list_directory" | "directory_tree" | "list_allowed_directories" => Self::List,
            "search_files" => Self::Search,
            "get_file_info" => Self::Metadata,
            _ => return None,
        };
        Some(op)
    }

    /// Whether this operation leaves the filesystem untouched.
    #[must_use]
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::Read | Self::List | Self::Search | Self::Metadata)
    }

    /// Whether a content diff should accompany the confirmation prompt.
    #[must_use]
    pub fn wants_diff(self) -> bool {
        matches!(self, Self::Write | Self::Edit)
    }

    /// Stable snake-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Edit => "edit",
            Self::CreateDirectory => "create_directory",
            Self::Move => "move",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Search => "search",
            Self::Metadata => "metadata",
        }
    }
}

impl fmt::Display for FsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One search-and-replace step of a partial file edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    /// Exact text to find.
    pub old_text: String,
    /// Replacement.
    pub new_text: String,
}

impl TextEdit {
    /// Create an edit.
    #[must_use]
    pub fn new(old_text: impl Into<String>, new_text: impl Into<String>) -> Self {
        Self {
            old_text: old_text.into(),
            new_text: new_text.into(),
        }
    }
}

/// What a write or edit would put on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposedChange<'a> {
    /// The whole new file.
    Content(&'a str),
    /// Replacements applied in order to the current file.
    Edits(&'a [TextEdit]),
}

impl ProposedChange<'_> {
    /// The file after the change, given what is on disk now.
    ///
    /// Each edit replaces the first occurrence of its `old_text` in the
    /// result of the previous one.
    ///
    /// # Errors
    ///
    /// Returns the 1-based index of the first edit whose `old_text` is not
    /// found.
    pub fn apply(&self, current: &str) -> Result<String, usize> {
        match self {
            Self::Content(content) => Ok((*content).to_string()),
            Self::Edits(edits) => {
                let mut text = current.to_string();
                for (idx, edit) in edits.iter().enumerate() {
                    if edit.old_text.is_empty() || !text.contains(&edit.old_text) {
                        return Err(idx.saturating_add(1));
                    }
                    text = text.replacen(&edit.old_text, &edit.new_text, 1);
                }
                Ok(text)
            },
        }
    }
}

/// A filesystem operation with its targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemCommand {
    /// What to do.
    pub operation: FsOperation,
    /// Target path(s). Moves list the source here.
    pub paths: Vec<String>,
    /// Proposed new content for writes and edits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Destination for moves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Partial edits, in order, for `edit_file`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edits: Vec<TextEdit>,
}

impl FilesystemCommand {
    /// Create an operation on a single path.
    #[must_use]
    pub fn new(operation: FsOperation, path: impl Into<String>) -> Self {
        Self {
            operation,
            paths: vec![path.into()],
            content: None,
            destination: None,
            edits: Vec::new(),
        }
    }

    /// Attach proposed content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Append a partial edit.
    #[must_use]
    pub fn with_edit(mut self, edit: TextEdit) -> Self {
        self.edits.push(edit);
        self
    }

    /// Attach a move destination.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    fn summary(&self) -> String {
        let targets = self.paths.join(", ");
        match (self.operation, &self.destination) {
            (FsOperation::Move, Some(dest)) => format!("Move {targets} to {dest}"),
            (op, _) => format!("Filesystem {op}: {targets}"),
        }
    }
}

impl From<FilesystemCommand> for Command {
    fn from(fs: FilesystemCommand) -> Self {
        Self::Filesystem(fs)
    }
}

/// Kind of desktop automation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutomationKind {
    /// Capture the screen.
    Screenshot,
    /// Query display geometry.
    ScreenInfo,
    /// Query windows.
    WindowQuery,
    /// Read a pixel color.
    PixelColor,
    /// Wait until an image appears on screen.
    WaitForImage,
    /// Single click.
    Click,
    /// Double click.
    DoubleClick,
    /// Type text.
    Type,
    /// Press a key combination.
    Hotkey,
    /// Focus or otherwise control a window.
    WindowFocus,
    /// Move the pointer.
    MouseMove,
}

impl AutomationKind {
    /// Parse a kind from its kebab-case name or the automation server's
    /// camel/snake-case action names.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let kind = match name {
            "screenshot" => Self::Screenshot,
            "screen-info" | "screenInfo" | "screen_info" => Self::ScreenInfo,
            "window-query" | "getWindows" | "getActiveWindow" | "get_windows" => {
                Self::WindowQuery
            },
            "pixel-color" | "colorAt" | "color_at" => Self::PixelColor,
            "wait-for-image" | "waitForImage" | "wait_for_image" => Self::WaitForImage,
            "click" => Self::Click,
            "double-click" | "double_click" | "doubleClick" => Self::DoubleClick,
            "type" => Self::Type,
            "hotkey" => Self::Hotkey,
            "window-focus" | "window_control" | "windowControl" => Self::WindowFocus,
            "mouse-move" | "move" | "mouseMove" => Self::MouseMove,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether this kind only observes the screen.
    #[must_use]
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            Self::Screenshot
                | Self::ScreenInfo
                | Self::WindowQuery
                | Self::PixelColor
                | Self::WaitForImage
        )
    }

    /// Stable kebab-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Screenshot => "screenshot",
            Self::ScreenInfo => "screen-info",
            Self::WindowQuery => "window-query",
            Self::PixelColor => "pixel-color",
            Self::WaitForImage => "wait-for-image",
            Self::Click => "click",
            Self::DoubleClick => "double-click",
            Self::Type => "type",
            Self::Hotkey => "hotkey",
            Self::WindowFocus => "window-focus",
            Self::MouseMove => "mouse-move",
        }
    }
}

impl fmt::Display for AutomationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A desktop automation action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationAction {
    /// What to do.
    pub kind: AutomationKind,
    /// Target x coordinate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    /// Target y coordinate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    /// Text to type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Key combination, e.g. `cmd+c`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkey: Option<String>,
    /// Target window or element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    /// What the agent says it is trying to do.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AutomationAction {
    /// Create an action with no arguments.
    #[must_use]
    pub fn new(kind: AutomationKind) -> Self {
        Self {
            kind,
            x: None,
            y: None,
            text: None,
            hotkey: None,
            window: None,
            description: None,
        }
    }

    /// Set target coordinates.
    #[must_use]
    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// Set text payload.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set key combination.
    #[must_use]
    pub fn with_hotkey(mut self, hotkey: impl Into<String>) -> Self {
        self.hotkey = Some(hotkey.into());
        self
    }

    /// Set target window.
    #[must_use]
    pub fn with_window(mut self, window: impl Into<String>) -> Self {
        self.window = Some(window.into());
        self
    }

    /// Set the agent's description of intent.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check the arguments the kind needs are present.
    ///
    /// This is separate from classification: a click without coordinates is
    /// still `Risky`, it just cannot be executed.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::InvalidArguments`] naming the missing argument.
    pub fn validate(&self) -> SafetyResult<()> {
        let missing = |what: &str| -> SafetyResult<()> {
            Err(SafetyError::InvalidArguments(format!(
                "{} requires {what}",
                self.kind
            )))
        };
        match self.kind {
            AutomationKind::Click | AutomationKind::DoubleClick | AutomationKind::MouseMove
                if self.x.is_none() || self.y.is_none() =>
            {
                missing("x and y coordinates")
            },
            AutomationKind::Type if self.text.as_deref().is_none_or(str::is_empty) => {
                missing("non-empty text")
            },
            AutomationKind::Hotkey if self.hotkey.as_deref().is_none_or(str::is_empty) => {
                missing("a key combination")
            },
            AutomationKind::WindowFocus if self.window.as_deref().is_none_or(str::is_empty) => {
                missing("a window title")
            },
            _ => Ok(()),
        }
    }

    fn summary(&self) -> String {
        let mut out = match self.kind {
            AutomationKind::Click | AutomationKind::DoubleClick | AutomationKind::MouseMove => {
                match (self.x, self.y) {
                    (Some(x), Some(y)) => format!("{} at ({x}, {y})", self.kind),
                    _ => self.kind.to_string(),
                }
            },
            AutomationKind::Type => {
                let len = self.text.as_deref().map_or(0, |t| t.chars().count());
                format!("type {len} characters")
            },
            AutomationKind::Hotkey => {
                format!("hotkey {}", self.hotkey.as_deref().unwrap_or("<none>"))
            },
            AutomationKind::WindowFocus => {
                format!("focus window {}", self.window.as_deref().unwrap_or("<none>"))
            },
            _ => self.kind.to_string(),
        };
        if let Some(desc) = &self.description {
            out.push_str(" - ");
            out.push_str(desc);
        }
        out
    }
}

impl From<AutomationAction> for Command {
    fn from(action: AutomationAction) -> Self {
        Self::Automation(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_operation_from_tool_name() {
        assert_eq!(FsOperation::from_tool_name("write_file"), Some(FsOperation::Write));
        assert_eq!(FsOperation::from_tool_name("create_file"), Some(FsOperation::Write));
        assert_eq!(FsOperation::from_tool_name("remove_file"), Some(FsOperation::Delete));
        assert_eq!(FsOperation::from_tool_name("directory_tree"), Some(FsOperation::List));
        assert_eq!(FsOperation::from_tool_name("format_disk"), None);
    }

    #[test]
    fn test_automation_kind_aliases() {
        assert_eq!(AutomationKind::parse("screenInfo"), Some(AutomationKind::ScreenInfo));
        assert_eq!(AutomationKind::parse("double_click"), Some(AutomationKind::DoubleClick));
        assert_eq!(AutomationKind::parse("window_control"), Some(AutomationKind::WindowFocus));
        assert_eq!(AutomationKind::parse("drag"), None);
    }

    #[test]
    fn test_automation_validation() {
        assert!(AutomationAction::new(AutomationKind::Click).validate().is_err());
        assert!(AutomationAction::new(AutomationKind::Click).at(10, 20).validate().is_ok());
        assert!(
            AutomationAction::new(AutomationKind::Type)
                .with_text("")
                .validate()
                .is_err()
        );
        assert!(AutomationAction::new(AutomationKind::Hotkey).validate().is_err());
        assert!(AutomationAction::new(AutomationKind::Screenshot).validate().is_ok());
    }

    #[test]
    fn test_diff_target_only_for_writes_with_content() {
        let write: Command = FilesystemCommand::new(FsOperation::Write, "/tmp/a.txt")
            .with_content("hello")
            .into();
        assert_eq!(
            write.diff_target(),
            Some(("/tmp/a.txt", ProposedChange::Content("hello")))
        );

        let delete: Command = FilesystemCommand::new(FsOperation::Delete, "/tmp/a.txt").into();
        assert_eq!(delete.diff_target(), None);

        let bare_write: Command = FilesystemCommand::new(FsOperation::Write, "/tmp/a.txt").into();
        assert_eq!(bare_write.diff_target(), None);

        let edit: Command = FilesystemCommand::new(FsOperation::Edit, "/tmp/a.txt")
            .with_edit(TextEdit::new("a", "b"))
            .into();
        assert!(matches!(
            edit.diff_target(),
            Some(("/tmp/a.txt", ProposedChange::Edits([_])))
        ));
    }

    #[test]
    fn test_edits_apply_in_order() {
        let edits = [TextEdit::new("one", "uno"), TextEdit::new("uno\ntwo", "dos")];
        let change = ProposedChange::Edits(&edits);
        assert_eq!(change.apply("one\ntwo\none\n").unwrap(), "dos\none\n");
        assert_eq!(change.apply("three\n"), Err(1));
        assert_eq!(ProposedChange::Edits(&[TextEdit::new("", "x")]).apply("a"), Err(1));
    }

    #[test]
    fn test_edits_use_camel_case_on_the_wire() {
        let edit: TextEdit =
            serde_json::from_str(r#"{"oldText":"a","newText":"b"}"#).unwrap();
        assert_eq!(edit, TextEdit::new("a", "b"));
    }

    #[test]
    fn test_command_serde_tagged() {
        let cmd = Command::shell("ls");
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "shell");
        assert_eq!(json["command"], "ls");
    }

    #[test]
    fn test_summaries() {
        let mv: Command = FilesystemCommand::new(FsOperation::Move, "a.txt")
            .with_destination("b.txt")
            .into();
        assert_eq!(mv.summary(), "Move a.txt to b.txt");

        let click: Command = AutomationAction::new(AutomationKind::Click)
            .at(5, 6)
            .with_description("press OK")
            .into();
        assert_eq!(click.summary(), "click at (5, 6) - press OK");
    }
}
