//! Prelude module - commonly used test types.
//!
//! Use `use halfred_test::prelude::*;` in test modules.

pub use crate::mocks::{
    FailingConfirmationHandler, MockBackend, MockCaptureProvider, MockConfirmationHandler,
    MockHighlighter, MockJudge, MockSummarizer, PendingConfirmationHandler,
};

pub use crate::fixtures::{
    test_automation, test_bash_call, test_context, test_escalation_request, test_fs, test_gate,
    test_search_call, test_shell,
};

pub use crate::harness::init_test_logging;
