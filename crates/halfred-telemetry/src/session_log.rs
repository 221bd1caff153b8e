//! Per-session event log.
//!
//! Every event of one conversation session is appended as one JSON line to
//! `<dir>/session_<unix>_<short id>.jsonl` and flushed immediately, so a
//! crash loses nothing already recorded. [`SessionLog::close`] adds a
//! `session_end` event and writes a `.json` companion holding the session
//! metadata, every event, and a count per event type.
//!
//! Streamed assistant text is buffered and recorded as one
//! `assistant_text_complete` event when flushed. Tool calls are timed from
//! `tool_start` to the matching `tool_end`; ends pair with starts in order.
//!
//! Recording is best effort: a failed write is logged and the session goes
//! on. Only opening and closing the log report errors.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::context::SessionContext;
use crate::error::{TelemetryError, TelemetryResult};

/// Severity of a session event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    /// Normal activity.
    Info,
    /// Something went wrong.
    Error,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The session opened.
    SessionStart {
        /// Frontend that opened it.
        source: String,
        /// Host-supplied metadata (user, agent, mode).
        metadata: BTreeMap<String, String>,
    },
    /// The user said something.
    UserMessage {
        /// Transcribed text.
        content: String,
    },
    /// A complete assistant message.
    AssistantMessage {
        /// Message text.
        content: String,
    },
    /// Buffered streaming text, flushed as one event.
    AssistantTextComplete {
        /// The concatenated deltas.
        content: String,
        /// Characters in `content`.
        char_count: usize,
        /// Time from the first delta to the flush.
        duration_ms: u64,
    },
    /// A tool call started.
    ToolStart {
        /// Tool name.
        tool_name: String,
        /// Call arguments.
        arguments: Value,
    },
    /// A tool call finished.
    ToolEnd {
        /// Tool name, from the matching start.
        tool_name: String,
        /// Result text.
        output: String,
        /// Whether the call succeeded.
        success: bool,
        /// Time since the matching start, when there was one.
        duration_ms: Option<u64>,
    },
    /// A confirmation prompt was resolved.
    Confirmation {
        /// What was asked about.
        command: String,
        /// Risk tier of the command.
        tier: String,
        /// `approved`, `denied` or `aborted`.
        outcome: String,
        /// Denial or abort reason.
        reason: Option<String>,
    },
    /// An error during the session.
    Error {
        /// Error text.
        error: String,
        /// Where it happened.
        context: Option<String>,
    },
    /// The session closed.
    SessionEnd {
        /// Session length.
        duration_ms: u64,
        /// Events recorded before this one.
        total_events: usize,
    },
}

impl SessionEvent {
    /// Snake-case event type, as written to the log.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionStart { .. } => "session_start",
            Self::UserMessage { .. } => "user_message",
            Self::AssistantMessage { .. } => "assistant_message",
            Self::AssistantTextComplete { .. } => "assistant_text_complete",
            Self::ToolStart { .. } => "tool_start",
            Self::ToolEnd { .. } => "tool_end",
            Self::Confirmation { .. } => "confirmation",
            Self::Error { .. } => "error",
            Self::SessionEnd { .. } => "session_end",
        }
    }

    fn level(&self) -> EventLevel {
        match self {
            Self::Error { .. } | Self::ToolEnd { success: false, .. } => EventLevel::Error,
            _ => EventLevel::Info,
        }
    }
}

/// One line of the session log.
#[derive(Debug, Clone, Serialize)]
pub struct SessionLogEntry {
    /// Session the event belongs to.
    pub session_id: String,
    /// When it was recorded.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: EventLevel,
    /// The event, flattened into `event_type` and `data`.
    #[serde(flatten)]
    pub event: SessionEvent,
}

/// What [`SessionLog::close`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// The streamed JSON-lines file.
    pub events_path: PathBuf,
    /// The final summary document.
    pub summary_path: PathBuf,
    /// Events recorded, `session_end` included.
    pub total_events: usize,
    /// Count per event type.
    pub event_types: BTreeMap<String, usize>,
}

#[derive(Serialize)]
struct SummaryDocument<'a> {
    session_id: &'a str,
    metadata: SummaryMetadata<'a>,
    events: &'a [SessionLogEntry],
    summary: SummaryCounts<'a>,
}

#[derive(Serialize)]
struct SummaryMetadata<'a> {
    source: &'a str,
    started_at: DateTime<Utc>,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct SummaryCounts<'a> {
    total_events: usize,
    event_types: &'a BTreeMap<String, usize>,
}

struct Inner {
    writer: BufWriter<File>,
    events: Vec<SessionLogEntry>,
    text: String,
    text_started: Option<Instant>,
    open_tools: VecDeque<(String, Instant)>,
}

/// Append-only event log for one session.
///
/// Methods take `&self`, so the log can be shared behind an `Arc` and fed
/// from a chunk callback.
pub struct SessionLog {
    session_id: String,
    source: String,
    started_at: DateTime<Utc>,
    started: Instant,
    metadata: BTreeMap<String, String>,
    events_path: PathBuf,
    inner: Mutex<Inner>,
}

impl SessionLog {
    /// Create `dir` if needed, open the session's log file, and record
    /// `session_start`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be opened for appending.
    pub fn create(
        dir: impl AsRef<Path>,
        session: &SessionContext,
        metadata: BTreeMap<String, String>,
    ) -> TelemetryResult<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            TelemetryError::InitError(format!(
                "failed to create session log directory {}: {e}",
                dir.display()
            ))
        })?;

        let stem = format!(
            "session_{}_{}",
            session.started_at.timestamp(),
            session.short_id()
        );
        let events_path = dir.join(format!("{stem}.jsonl"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&events_path)?;

        let log = Self {
            session_id: session.session_id.to_string(),
            source: session.source.clone(),
            started_at: session.started_at,
            started: Instant::now(),
            metadata,
            events_path,
            inner: Mutex::new(Inner {
                writer: BufWriter::new(file),
                events: Vec::new(),
                text: String::new(),
                text_started: None,
                open_tools: VecDeque::new(),
            }),
        };
        log.record(SessionEvent::SessionStart {
            source: log.source.clone(),
            metadata: log.metadata.clone(),
        });
        info!(path = %log.events_path.display(), "session log opened");
        Ok(log)
    }

    /// The streamed JSON-lines file.
    #[must_use]
    pub fn events_path(&self) -> &Path {
        &self.events_path
    }

    /// Events recorded so far.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.lock().events.len()
    }

    /// Append one event.
    pub fn record(&self, event: SessionEvent) {
        let mut inner = self.lock();
        self.append(&mut inner, event);
    }

    /// Record a user utterance.
    pub fn user_message(&self, content: impl Into<String>) {
        self.record(SessionEvent::UserMessage {
            content: content.into(),
        });
    }

    /// Record a complete assistant message.
    pub fn assistant_message(&self, content: impl Into<String>) {
        self.record(SessionEvent::AssistantMessage {
            content: content.into(),
        });
    }

    /// Buffer a piece of streaming assistant text.
    pub fn text_delta(&self, delta: &str) {
        let mut inner = self.lock();
        if inner.text_started.is_none() {
            inner.text_started = Some(Instant::now());
        }
        inner.text.push_str(delta);
    }

    /// Record buffered streaming text as one event. Does nothing when the
    /// buffer is empty.
    pub fn flush_text(&self) {
        let mut inner = self.lock();
        self.flush_text_locked(&mut inner);
    }

    /// Record the start of a tool call.
    pub fn tool_start(&self, tool_name: impl Into<String>, arguments: Value) {
        let tool_name = tool_name.into();
        let mut inner = self.lock();
        inner.open_tools.push_back((tool_name.clone(), Instant::now()));
        self.append(&mut inner, SessionEvent::ToolStart { tool_name, arguments });
    }

    /// Record the end of the oldest open tool call.
    pub fn tool_end(&self, output: impl Into<String>, success: bool) {
        let mut inner = self.lock();
        let (tool_name, duration_ms) = match inner.open_tools.pop_front() {
            Some((name, started)) => (name, Some(millis(started))),
            None => ("unknown".to_string(), None),
        };
        self.append(
            &mut inner,
            SessionEvent::ToolEnd {
                tool_name,
                output: output.into(),
                success,
                duration_ms,
            },
        );
    }

    /// Record a resolved confirmation prompt.
    pub fn confirmation(
        &self,
        command: impl Into<String>,
        tier: impl Into<String>,
        outcome: impl Into<String>,
        reason: Option<String>,
    ) {
        self.record(SessionEvent::Confirmation {
            command: command.into(),
            tier: tier.into(),
            outcome: outcome.into(),
            reason,
        });
    }

    /// Record an error.
    pub fn error(&self, error: impl Into<String>, context: Option<&str>) {
        self.record(SessionEvent::Error {
            error: error.into(),
            context: context.map(str::to_string),
        });
    }

    /// Flush pending text, record `session_end`, and write the summary
    /// document next to the events file.
    ///
    /// # Errors
    ///
    /// Returns an error if the summary document cannot be written.
    pub fn close(self) -> TelemetryResult<SessionSummary> {
        let mut inner = self.inner.into_inner().unwrap_or_else(PoisonError::into_inner);
        flush_text_into(&self.session_id, &mut inner);
        let end = SessionEvent::SessionEnd {
            duration_ms: millis(self.started),
            total_events: inner.events.len(),
        };
        append_entry(&self.session_id, &mut inner, end);
        inner.writer.flush()?;

        let mut event_types = BTreeMap::new();
        for entry in &inner.events {
            let count = event_types
                .entry(entry.event.event_type().to_string())
                .or_insert(0usize);
            *count = count.saturating_add(1);
        }

        let document = SummaryDocument {
            session_id: &self.session_id,
            metadata: SummaryMetadata {
                source: &self.source,
                started_at: self.started_at,
                extra: &self.metadata,
            },
            events: &inner.events,
            summary: SummaryCounts {
                total_events: inner.events.len(),
                event_types: &event_types,
            },
        };
        let summary_path = self.events_path.with_extension("json");
        std::fs::write(&summary_path, serde_json::to_vec_pretty(&document)?)?;

        info!(
            path = %summary_path.display(),
            total_events = inner.events.len(),
            "session log closed"
        );
        Ok(SessionSummary {
            events_path: self.events_path,
            summary_path,
            total_events: inner.events.len(),
            event_types,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append(&self, inner: &mut Inner, event: SessionEvent) {
        // Pending text belongs before whatever comes next.
        if !matches!(event, SessionEvent::AssistantTextComplete { .. }) {
            self.flush_text_locked(inner);
        }
        append_entry(&self.session_id, inner, event);
    }

    fn flush_text_locked(&self, inner: &mut Inner) {
        flush_text_into(&self.session_id, inner);
    }
}

impl std::fmt::Debug for SessionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLog")
            .field("session_id", &self.session_id)
            .field("events_path", &self.events_path)
            .finish_non_exhaustive()
    }
}

fn flush_text_into(session_id: &str, inner: &mut Inner) {
    let Some(started) = inner.text_started.take() else {
        return;
    };
    let content = std::mem::take(&mut inner.text);
    if content.is_empty() {
        return;
    }
    let event = SessionEvent::AssistantTextComplete {
        char_count: content.chars().count(),
        duration_ms: millis(started),
        content,
    };
    append_entry(session_id, inner, event);
}

fn append_entry(session_id: &str, inner: &mut Inner, event: SessionEvent) {
    let entry = SessionLogEntry {
        session_id: session_id.to_string(),
        timestamp: Utc::now(),
        level: event.level(),
        event,
    };
    debug!(event_type = entry.event.event_type(), "session event");
    if let Err(e) = write_line(&mut inner.writer, &entry) {
        warn!(error = %e, event_type = entry.event.event_type(), "failed to write session event");
    }
    inner.events.push(entry);
}

fn write_line(writer: &mut BufWriter<File>, entry: &SessionLogEntry) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, entry).map_err(std::io::Error::other)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

fn millis(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
