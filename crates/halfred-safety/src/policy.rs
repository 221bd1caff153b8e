//! Safety policy - the command tables the classifier consults.
//!
//! A [`SafetyPolicy`] is an immutable value built once and injected into
//! the [`CommandClassifier`](crate::CommandClassifier). There is no global
//! mutable list: tests construct alternate policies freely.
//!
//! # Table Precedence
//!
//! 1. Configured dangerous regex patterns over the raw line -> `Dangerous`
//! 2. Privilege elevation words anywhere -> `Dangerous`
//! 3. Destructive executables, `rm` with recursive+force, `find -delete` -> `Dangerous`
//! 4. Mutation, network and package-manager executables -> `Risky`
//! 5. Allow-listed executables -> `Safe`
//! 6. Anything else -> `Risky`

use regex::Regex;
use std::collections::BTreeSet;

use crate::error::{SafetyError, SafetyResult};

/// Read-only and navigational commands that may auto-run.
pub const DEFAULT_SAFE_COMMANDS: &[&str] = &[
    "pwd", "cd", "ls", "tree", "find", "cat", "less", "more", "head", "tail", "grep", "egrep",
    "fgrep", "rg", "stat", "file", "du", "df", "wc", "whoami", "uname", "id", "hostname", "uptime",
    "date", "which", "type", "man", "help", "info", "echo", "printf", "true", "false", "sleep",
];

/// Words that elevate privilege wherever they appear.
pub const DEFAULT_PRIVILEGE_COMMANDS: &[&str] = &["sudo", "su", "doas"];

/// Executables that destroy data or take the machine down.
pub const DEFAULT_DESTRUCTIVE_COMMANDS: &[&str] = &[
    "dd", "mkfs", "fdisk", "parted", "shred", "shutdown", "reboot", "halt", "poweroff",
];

/// Executables that mutate local files or processes.
pub const DEFAULT_MUTATION_COMMANDS: &[&str] = &[
    "mkdir", "rmdir", "rm", "mv", "cp", "chmod", "chown", "touch", "ln", "tee", "kill", "killall",
    "pkill",
];

/// Executables that reach the network.
pub const DEFAULT_NETWORK_COMMANDS: &[&str] = &[
    "curl", "wget", "ssh", "scp", "sftp", "nc", "netcat", "rsync", "ftp", "telnet",
];

/// Package managers.
pub const DEFAULT_PACKAGE_MANAGERS: &[&str] =
    &["apt", "apt-get", "yum", "dnf", "pacman", "brew", "pip", "pip3", "npm"];

/// Interpreters that execute whatever is piped into them.
pub const DEFAULT_INTERPRETERS: &[&str] = &[
    "sh", "bash", "zsh", "dash", "ksh", "fish", "python", "python3", "perl", "ruby", "node",
];

/// System locations where output redirection is destructive.
pub const DEFAULT_PROTECTED_PATHS: &[&str] = &[
    "/etc", "/dev", "/boot", "/sys", "/proc", "/usr", "/bin", "/sbin", "/lib", "/System",
    "/Library",
];

/// Regex patterns over the raw command line that force `Dangerous`.
pub const DEFAULT_DANGEROUS_PATTERNS: &[&str] = &[
    // fork bomb
    r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
    r"chmod\s+(-[a-zA-Z]*R[a-zA-Z]*\s+)?0?777\s+/(\s|$)",
];

/// Immutable command tables consulted by the classifier.
#[derive(Debug, Clone)]
pub struct SafetyPolicy {
    /// Allow-listed executables (exact basename match).
    pub safe_commands: BTreeSet<String>,
    /// Privilege elevation words.
    pub privilege_commands: BTreeSet<String>,
    /// Destructive executables. `mkfs.*` variants match `mkfs`.
    pub destructive_commands: BTreeSet<String>,
    /// Local mutation executables.
    pub mutation_commands: BTreeSet<String>,
    /// Network executables.
    pub network_commands: BTreeSet<String>,
    /// Package managers.
    pub package_managers: BTreeSet<String>,
    /// Interpreters; piping into one is `Dangerous`.
    pub interpreters: BTreeSet<String>,
    /// Path prefixes where output redirection is `Dangerous`.
    pub protected_paths: Vec<String>,
    dangerous_patterns: Vec<Regex>,
}

fn to_set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        let dangerous_patterns = DEFAULT_DANGEROUS_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        Self {
            safe_commands: to_set(DEFAULT_SAFE_COMMANDS),
            privilege_commands: to_set(DEFAULT_PRIVILEGE_COMMANDS),
            destructive_commands: to_set(DEFAULT_DESTRUCTIVE_COMMANDS),
            mutation_commands: to_set(DEFAULT_MUTATION_COMMANDS),
            network_commands: to_set(DEFAULT_NETWORK_COMMANDS),
            package_managers: to_set(DEFAULT_PACKAGE_MANAGERS),
            interpreters: to_set(DEFAULT_INTERPRETERS),
            protected_paths: DEFAULT_PROTECTED_PATHS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            dangerous_patterns,
        }
    }
}

impl SafetyPolicy {
    /// Add executables to the allow-list.
    #[must_use]
    pub fn with_safe_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.safe_commands.extend(commands.into_iter().map(Into::into));
        self
    }

    /// Replace the protected path prefixes.
    #[must_use]
    pub fn with_protected_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Add a regex that forces `Dangerous` when it matches the raw line.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::InvalidPattern`] if the regex does not compile.
    pub fn with_dangerous_pattern(mut self, pattern: &str) -> SafetyResult<Self> {
        let regex = Regex::new(pattern).map_err(|source| SafetyError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.dangerous_patterns.push(regex);
        Ok(self)
    }

    /// Configured dangerous patterns.
    #[must_use]
    pub fn dangerous_patterns(&self) -> &[Regex] {
        &self.dangerous_patterns
    }

    /// First dangerous pattern matching `line`, if any.
    #[must_use]
    pub fn matching_pattern(&self, line: &str) -> Option<&Regex> {
        self.dangerous_patterns.iter().find(|re| re.is_match(line))
    }

    /// Whether `name` is an allow-listed executable.
    #[must_use]
    pub fn is_safe(&self, name: &str) -> bool {
        self.safe_commands.contains(name)
    }

    /// Whether `name` elevates privilege.
    #[must_use]
    pub fn is_privileged(&self, name: &str) -> bool {
        self.privilege_commands.contains(name)
    }

    /// Whether `name` is a destructive executable (including `mkfs.*`).
    #[must_use]
    pub fn is_destructive(&self, name: &str) -> bool {
        if self.destructive_commands.contains(name) {
            return true;
        }
        name.split_once('.')
            .is_some_and(|(head, _)| self.destructive_commands.contains(head))
    }

    /// Whether `name` is an interpreter.
    #[must_use]
    pub fn is_interpreter(&self, name: &str) -> bool {
        self.interpreters.contains(name)
    }

    /// Whether writing to `path` touches a protected location.
    #[must_use]
    pub fn is_protected_path(&self, path: &str) -> bool {
        self.protected_paths.iter().any(|prefix| {
            let prefix = prefix.trim_end_matches('/');
            path == prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}
