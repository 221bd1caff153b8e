//! Backend executor seam and its streamed chunks.

use async_trait::async_trait;
use futures::stream::BoxStream;
use halfred_tools::ToolGuard;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RouterResult;
use crate::router::EscalationRequest;

/// Kind of a streamed backend chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// Incremental response text.
    TextDelta,
    /// A tool call started. Content is the tool name.
    ToolStart,
    /// A tool call finished. Content is a short result description.
    ToolEnd,
    /// Model reasoning, not spoken to the user.
    Reasoning,
    /// The task finished. Non-empty content is the full final response.
    Complete,
    /// A recoverable error the backend worked around.
    Error,
}

/// One chunk of a backend response stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendChunk {
    /// What this chunk carries.
    pub kind: ChunkKind,
    /// Text payload.
    pub content: String,
    /// Free-form extra data (tool arguments, token counts).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl BackendChunk {
    /// Create a chunk.
    #[must_use]
    pub fn new(kind: ChunkKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            metadata: None,
        }
    }

    /// A text delta.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(ChunkKind::TextDelta, content)
    }

    /// A tool start marker.
    #[must_use]
    pub fn tool_start(tool: impl Into<String>) -> Self {
        Self::new(ChunkKind::ToolStart, tool)
    }

    /// A tool end marker.
    #[must_use]
    pub fn tool_end(summary: impl Into<String>) -> Self {
        Self::new(ChunkKind::ToolEnd, summary)
    }

    /// The completion marker.
    #[must_use]
    pub fn complete(content: impl Into<String>) -> Self {
        Self::new(ChunkKind::Complete, content)
    }

    /// A recoverable error.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ChunkKind::Error, message)
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Stream of backend chunks.
pub type ChunkStream = BoxStream<'static, RouterResult<BackendChunk>>;

/// The capable backend ("supervisor") that runs escalated requests.
///
/// Every tool call that maps onto an imperative command must go through
/// `tools` before it runs. A [`ToolError::Aborted`](halfred_tools::ToolError)
/// from the guard should be returned as-is (it converts into
/// [`RouterError::Tool`](crate::RouterError)) so the driver can report the
/// task as aborted.
#[async_trait]
pub trait BackendExecutor: Send + Sync {
    /// Start executing `request`.
    async fn execute(&self, request: EscalationRequest, tools: ToolGuard)
    -> RouterResult<ChunkStream>;
}
