//! Prelude module - commonly used types for convenient import.
//!
//! Use `use halfred_safety::prelude::*;` to import all essential types.

// Errors
pub use crate::{SafetyError, SafetyResult};

// Commands and classification
pub use crate::{Classification, Command, CommandClassifier, RiskTier, SafetyPolicy};
pub use crate::{AutomationAction, AutomationKind, FilesystemCommand, FsOperation, TextEdit};

// Confirmation flow
pub use crate::{
    Approval, CaptureProvider, ConfirmationDecision, ConfirmationGate, ConfirmationHandler,
    ConfirmationRequest, GateConfig, GateOutcome, Guarded,
};

// Capture providers
pub use crate::{DiffCapture, HighlightCapture, Highlighter};
