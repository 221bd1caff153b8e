//! Diff rendering for file write confirmations.

use similar::TextDiff;

/// Default number of diff lines shown before truncating.
pub const DEFAULT_MAX_DIFF_LINES: usize = 50;

/// Characters of a new file shown in its preview.
pub const NEW_FILE_PREVIEW_CHARS: usize = 500;

/// Render a unified diff between the current and proposed content.
///
/// Identical content renders `[No changes detected]`. Output longer than
/// `max_lines` lines is cut with a marker giving the full length.
#[must_use]
pub fn unified_diff(path: &str, current: &str, proposed: &str, max_lines: usize) -> String {
    if current == proposed {
        return "[No changes detected]".to_string();
    }
    let diff = TextDiff::from_lines(current, proposed);
    let rendered = diff
        .unified_diff()
        .context_radius(3)
        .header(&format!("{path} (current)"), &format!("{path} (proposed)"))
        .to_string();
    truncate_lines(&rendered, max_lines)
}

/// Render the preview shown when a write creates a new file.
#[must_use]
pub fn new_file_preview(path: &str, content: &str) -> String {
    let mut preview: String = content.chars().take(NEW_FILE_PREVIEW_CHARS).collect();
    if content.chars().count() > NEW_FILE_PREVIEW_CHARS {
        preview.push_str("...");
    }
    format!("[NEW FILE] {path}\n{preview}")
}

fn truncate_lines(text: &str, max_lines: usize) -> String {
    let total = text.lines().count();
    if total <= max_lines {
        return text.to_string();
    }
    let mut out: String = text
        .lines()
        .take(max_lines)
        .collect::<Vec<_>>()
        .join("\n");
    out.push_str(&format!("\n\n... [diff truncated, {total} total lines] ..."));
    out
}
