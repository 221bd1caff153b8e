//! Prelude module - commonly used types for convenient import.
//!
//! Use `use halfred_tools::prelude::*;` to import all essential types.

pub use crate::{ToolError, ToolResult};

pub use crate::{ToolDefinition, ToolGuard, ToolInvocation, ToolVerdict};

pub use crate::{command_for_tool, normalize_tool_schema};
