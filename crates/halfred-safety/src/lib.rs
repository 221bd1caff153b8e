//! Halfred Safety - risk classification and confirmation for imperative commands.
//!
//! Every imperative command the assistant wants to run (a shell line, a
//! filesystem mutation, a desktop automation action) is passed through the
//! [`CommandClassifier`] first. Commands classified above
//! [`RiskTier::Safe`] are routed through the [`ConfirmationGate`], which
//! captures supporting context (screenshots, diffs), presents a
//! [`ConfirmationRequest`] to the registered [`ConfirmationHandler`] and
//! only lets the command run on an explicit approval.
//!
//! # Guarantees
//!
//! - Classification is a pure function of the command text and the
//!   injected [`SafetyPolicy`]. It never errors: anything the classifier
//!   cannot understand is treated as at least [`RiskTier::Risky`].
//! - The gate fails closed. A missing handler, a handler error, a timeout
//!   or an interruption all end the flow as a denial.
//!
//! # Example
//!
//! ```
//! use halfred_safety::{Command, CommandClassifier, RiskTier};
//!
//! let classifier = CommandClassifier::default();
//!
//! let listing = classifier.classify(&Command::shell("ls -la"));
//! assert_eq!(listing.tier, RiskTier::Safe);
//!
//! let wipe = classifier.classify(&Command::shell("sudo rm -rf /"));
//! assert_eq!(wipe.tier, RiskTier::Dangerous);
//! assert!(wipe.reason.is_some());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod capture;
pub mod classifier;
pub mod command;
pub mod diff;
/// Error types and results for the safety layer.
pub mod error;
pub mod flow;
pub mod gate;
pub mod policy;
pub mod request;
mod shell;
pub mod tier;

pub use capture::{
    CaptureProvider, DEFAULT_HIGHLIGHT_DURATION, DEFAULT_HIGHLIGHT_SIZE, DiffCapture,
    HighlightCapture, Highlighter,
};
pub use classifier::{Classification, CommandClassifier, classify};
pub use command::{
    AutomationAction, AutomationKind, Command, FilesystemCommand, FsOperation, ProposedChange,
    TextEdit,
};
pub use error::{SafetyError, SafetyResult};
pub use flow::{ConfirmationFlow, FlowState};
pub use gate::{
    Approval, ConfirmationGate, ConfirmationHandler, DEFAULT_CAPTURE_TIMEOUT, GateConfig,
    GateOutcome, Guarded,
};
pub use policy::SafetyPolicy;
pub use request::{
    CapturedArtifact, ConfirmationDecision, ConfirmationRequest, RequestId, ScreenRegion,
};
pub use tier::RiskTier;
