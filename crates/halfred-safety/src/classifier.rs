//! The classification entry point.
//!
//! One function per [`Command`] variant, combined behind
//! [`CommandClassifier::classify`]. Classification is pure: no I/O, no
//! hidden state, identical input always yields identical output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::command::{AutomationAction, Command, FilesystemCommand, FsOperation};
use crate::policy::SafetyPolicy;
use crate::shell;
use crate::tier::RiskTier;

/// Tier plus the signal that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// The risk tier.
    pub tier: RiskTier,
    /// Why the tier is above `Safe`. Always `None` for `Safe`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Classification {
    /// A `Safe` classification.
    #[must_use]
    pub fn safe() -> Self {
        Self {
            tier: RiskTier::Safe,
            reason: None,
        }
    }

    /// A classification with a reason.
    #[must_use]
    pub fn new(tier: RiskTier, reason: impl Into<String>) -> Self {
        if tier == RiskTier::Safe {
            return Self::safe();
        }
        Self {
            tier,
            reason: Some(reason.into()),
        }
    }

    /// Whether the command needs confirmation before running.
    #[must_use]
    pub fn requires_confirmation(&self) -> bool {
        self.tier.requires_confirmation()
    }

    /// Split into `(tier, reason)`.
    #[must_use]
    pub fn into_parts(self) -> (RiskTier, Option<String>) {
        (self.tier, self.reason)
    }

    /// Raise to `tier` if strictly higher. Ties keep the earlier reason.
    pub(crate) fn raise(&mut self, tier: RiskTier, reason: impl Into<String>) {
        if tier > self.tier {
            *self = Self::new(tier, reason);
        }
    }

    /// Fold another classification in, keeping the maximum.
    pub(crate) fn merge(&mut self, other: Self) {
        if other.tier > self.tier {
            *self = other;
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {reason}", self.tier.label()),
            None => write!(f, "{}", self.tier.label()),
        }
    }
}

/// Stateless classifier over an injected [`SafetyPolicy`].
///
/// Cheap to clone and safe to share across tasks.
#[derive(Debug, Clone, Default)]
pub struct CommandClassifier {
    policy: Arc<SafetyPolicy>,
}

impl CommandClassifier {
    /// Create a classifier over `policy`.
    #[must_use]
    pub fn new(policy: SafetyPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    /// The policy in use.
    #[must_use]
    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    /// Classify a command.
    #[must_use]
    pub fn classify(&self, command: &Command) -> Classification {
        match command {
            Command::Shell { command, .. } => shell::classify_line(command, &self.policy),
            Command::Filesystem(fs) => classify_filesystem(fs),
            Command::Automation(action) => classify_automation(action),
        }
    }
}

static DEFAULT_CLASSIFIER: LazyLock<CommandClassifier> = LazyLock::new(CommandClassifier::default);

/// Classify with the default policy.
#[must_use]
pub fn classify(command: &Command) -> Classification {
    DEFAULT_CLASSIFIER.classify(command)
}

fn classify_filesystem(fs: &FilesystemCommand) -> Classification {
    let targets = fs.paths.join(", ");
    match fs.operation {
        FsOperation::Read | FsOperation::List | FsOperation::Search | FsOperation::Metadata => {
            Classification::safe()
        },
        FsOperation::Write | FsOperation::Edit => Classification::new(
            RiskTier::Risky,
            format!("file {} modifies {targets}", fs.operation),
        ),
        FsOperation::CreateDirectory => {
            Classification::new(RiskTier::Risky, format!("creates directory {targets}"))
        },
        FsOperation::Move => {
            let dest = fs.destination.as_deref().unwrap_or("<unspecified>");
            Classification::new(RiskTier::Risky, format!("moves {targets} to {dest}"))
        },
        FsOperation::Delete => Classification::new(RiskTier::Risky, format!("deletes {targets}")),
    }
}

fn classify_automation(action: &AutomationAction) -> Classification {
    if action.kind.is_read_only() {
        Classification::safe()
    } else {
        Classification::new(
            RiskTier::Risky,
            format!("desktop action `{}` changes screen state", action.kind),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::AutomationKind;

    fn fs(op: FsOperation, path: &str) -> Command {
        FilesystemCommand::new(op, path).into()
    }

    // ---- Filesystem ----

    #[test]
    fn test_read_only_fs_ops_are_safe() {
        for op in [
            FsOperation::Read,
            FsOperation::List,
            FsOperation::Search,
            FsOperation::Metadata,
        ] {
            assert_eq!(classify(&fs(op, "/etc/hosts")).tier, RiskTier::Safe);
        }
    }

    #[test]
    fn test_mutating_fs_ops_are_risky() {
        for op in [
            FsOperation::Write,
            FsOperation::Edit,
            FsOperation::CreateDirectory,
            FsOperation::Move,
            FsOperation::Delete,
        ] {
            let c = classify(&fs(op, "/tmp/a.txt"));
            assert_eq!(c.tier, RiskTier::Risky, "{op}");
            assert!(c.reason.is_some());
        }
    }

    #[test]
    fn test_delete_in_temp_dir_is_still_risky() {
        let c = classify(&fs(FsOperation::Delete, "/tmp/a.txt"));
        assert_eq!(c.tier, RiskTier::Risky);
        assert!(c.requires_confirmation());
    }

    // ---- Automation ----

    #[test]
    fn test_automation_tiers() {
        for kind in [
            AutomationKind::Screenshot,
            AutomationKind::ScreenInfo,
            AutomationKind::WindowQuery,
            AutomationKind::PixelColor,
            AutomationKind::WaitForImage,
        ] {
            let c = classify(&AutomationAction::new(kind).into());
            assert_eq!(c.tier, RiskTier::Safe, "{kind}");
        }
        for kind in [
            AutomationKind::Click,
            AutomationKind::DoubleClick,
            AutomationKind::Type,
            AutomationKind::Hotkey,
            AutomationKind::WindowFocus,
            AutomationKind::MouseMove,
        ] {
            let c = classify(&AutomationAction::new(kind).into());
            assert_eq!(c.tier, RiskTier::Risky, "{kind}");
        }
    }

    #[test]
    fn test_automation_has_no_coordinate_allow_list() {
        let a = classify(&AutomationAction::new(AutomationKind::Click).at(0, 0).into());
        let b = classify(&AutomationAction::new(AutomationKind::Click).at(500, 500).into());
        assert_eq!(a, b);
    }

    // ---- Policy injection ----

    #[test]
    fn test_custom_policy_extends_allow_list() {
        let classifier = CommandClassifier::new(SafetyPolicy::default().with_safe_commands(["git"]));
        assert_eq!(
            classifier.classify(&Command::shell("git status")).tier,
            RiskTier::Safe
        );
        assert_eq!(
            classify(&Command::shell("git status")).tier,
            RiskTier::Risky
        );
    }

    #[test]
    fn test_custom_dangerous_pattern() {
        let policy = SafetyPolicy::default()
            .with_dangerous_pattern(r"\bprod\b")
            .unwrap();
        let classifier = CommandClassifier::new(policy);
        let c = classifier.classify(&Command::shell("echo prod"));
        assert_eq!(c.tier, RiskTier::Dangerous);
    }

    // ---- Determinism ----

    #[test]
    fn test_classification_is_deterministic() {
        let classifier = CommandClassifier::default();
        for line in ["rm -rf /tmp/foo", "ls | sh", "echo 'oops", "frob"] {
            let first = classifier.classify(&Command::shell(line));
            for _ in 0..10 {
                assert_eq!(classifier.classify(&Command::shell(line)), first);
            }
        }
    }

    #[test]
    fn test_raise_keeps_first_reason_on_tie() {
        let mut c = Classification::safe();
        c.raise(RiskTier::Risky, "first");
        c.raise(RiskTier::Risky, "second");
        assert_eq!(c.reason.as_deref(), Some("first"));
        c.raise(RiskTier::Dangerous, "third");
        assert_eq!(c.reason.as_deref(), Some("third"));
    }

    #[test]
    fn test_display() {
        let c = Classification::new(RiskTier::Dangerous, "sudo invocation");
        assert_eq!(c.to_string(), "DANGEROUS: sudo invocation");
        assert_eq!(Classification::safe().to_string(), "SAFE");
    }
}
