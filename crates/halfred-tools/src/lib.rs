//! Halfred Tools - the boundary between tool calls and the safety layer.
//!
//! The escalation backend talks to tool servers (shell, filesystem, desktop
//! automation, search, ...). Before any call runs, it is turned into a
//! [`Command`](halfred_safety::Command) where one applies and passed through
//! the [`ToolGuard`]. Calls that are not imperative (web search, reading the
//! clipboard) pass straight through.
//!
//! This crate also owns [`normalize_tool_schema`], applied once when a tool
//! is registered so that every schema handed to the realtime model is a
//! plain top-level object.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod guard;
mod invocation;
mod schema;

pub use error::{ToolError, ToolResult};
pub use guard::{ToolGuard, ToolVerdict};
pub use invocation::{NAMESPACE_SEPARATOR, ToolInvocation, command_for_tool};
pub use schema::{ToolDefinition, normalize_tool_schema};
