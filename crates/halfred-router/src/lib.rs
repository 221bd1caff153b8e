//! Halfred Router - two-tier escalation and conversation context.
//!
//! Every user turn goes through the [`EscalationRouter`]. It records the turn
//! in the [`ContextManager`], asks the external [`TurnJudge`] how to route it
//! and enforces the bookkeeping around that judgment: at most one
//! clarification per request, and a clarification counter that is reset at
//! the single point where a request resolves.
//!
//! Escalated requests are run by the [`EscalationDriver`] against a
//! [`BackendExecutor`]. The driver hands the backend a
//! [`ToolGuard`](halfred_tools::ToolGuard) so that every imperative tool call
//! is classified and confirmed before it runs.
//!
//! # Example
//!
//! ```
//! use halfred_router::{ContextConfig, ContextManager, ConversationTurn, RouterResult, Summarizer};
//! use std::sync::Arc;
//!
//! struct Truncate;
//!
//! #[async_trait::async_trait]
//! impl Summarizer for Truncate {
//!     async fn summarize(&self, turns: &[ConversationTurn]) -> RouterResult<String> {
//!         Ok(format!("{} earlier turns", turns.len()))
//!     }
//! }
//!
//! let context = ContextManager::new(ContextConfig::default(), Arc::new(Truncate));
//! assert_eq!(context.get_context().recent_turns.len(), 0);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod backend;
pub mod context;
pub mod driver;
mod error;
pub mod judge;
pub mod router;
pub mod summarizer;
pub mod turn;

pub use backend::{BackendChunk, BackendExecutor, ChunkKind, ChunkStream};
pub use context::{
    Compaction, ContextConfig, ContextManager, ConversationContext, DEFAULT_SUMMARIZATION_TIMEOUT,
    SessionMetadata,
};
pub use driver::{EscalationDriver, EscalationOutcome, RouterConfig};
pub use error::{RouterError, RouterResult};
pub use judge::{TurnJudge, Verdict};
pub use router::{EscalationRequest, EscalationRouter, RequestPhase, RouteDecision};
pub use summarizer::{Summarizer, summary_prompt, transcript};
pub use turn::{ChatMessage, ConversationTurn, Role};
