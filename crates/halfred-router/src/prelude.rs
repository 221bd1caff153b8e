//! Prelude module - commonly used types for convenient import.
//!
//! Use `use halfred_router::prelude::*;` to import all essential types.

pub use crate::{RouterError, RouterResult};

pub use crate::{
    ContextConfig, ContextManager, ConversationContext, EscalationRequest, EscalationRouter,
    RouteDecision,
};

pub use crate::{BackendChunk, BackendExecutor, EscalationDriver, EscalationOutcome, RouterConfig};

pub use crate::{ConversationTurn, Role, Summarizer, TurnJudge, Verdict};
