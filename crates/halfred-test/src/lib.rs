//! Halfred Test - Shared test utilities for the Halfred crates.
//!
//! Mock collaborators (confirmation handlers, capture providers,
//! summarizers, turn judges, backend executors) and fixtures, used as a
//! dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! halfred-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use halfred_test::{MockConfirmationHandler, test_gate};
//! use halfred_safety::{Command, ConfirmationDecision};
//!
//! #[tokio::test]
//! async fn denied_commands_are_blocked() {
//!     let handler = MockConfirmationHandler::new()
//!         .with_decision(ConfirmationDecision::denied("no"));
//!     let gate = test_gate(handler.clone()).await;
//!     // ...
//!     assert_eq!(handler.request_count(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
