//! Halfred Telemetry - logging and tracing for the Halfred voice assistant.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats and targets
//! - A session context that opens one span per processed turn
//! - A per-session event log streamed to JSON lines
//!
//! # Example
//!
//! ```rust,no_run
//! use halfred_telemetry::{LogConfig, LogFormat, SessionContext, setup_logging};
//!
//! # fn main() -> Result<(), halfred_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("halfred_router=trace");
//! setup_logging(&config)?;
//!
//! let mut session = SessionContext::new("voice");
//! let turn = session.next_turn();
//! turn.span().in_scope(|| tracing::info!("handling turn"));
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;
mod session_log;

pub use context::{SessionContext, TurnContext};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
pub use session_log::{EventLevel, SessionEvent, SessionLog, SessionLogEntry, SessionSummary};
