//! Document identity and load-phase domain types

use regex::Regex;
use std::sync::LazyLock;

/// Failure reasons containing this pattern (case-insensitive) are treated as
/// password challenges. Classification never depends on an exact string.
static PASSWORD_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)password").expect("Invalid password hint regex"));

/// The failure reason well-behaved workers emit for encrypted documents.
///
/// Informational only: classification matches the substring, not this string.
pub const PASSWORD_FAILURE_MESSAGE: &str = "Password required or incorrect password.";

/// Opaque locator for a document's bytes (local path or URL).
///
/// The challenge controller never parses it; only the CLI and the source
/// watcher inspect it, at the edges.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentSource(String);

impl DocumentSource {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interpret the locator as a local path, if it points at an existing file.
    ///
    /// Used by the watcher to decide whether there is anything to watch.
    pub fn as_local_path(&self) -> Option<std::path::PathBuf> {
        let path = std::path::PathBuf::from(&self.0);
        path.is_file().then_some(path)
    }
}

impl std::fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocumentSource {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DocumentSource {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Where a document load session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    /// A render attempt is in flight
    #[default]
    Loading,

    /// The worker wants a password; waiting on user input
    AwaitingPassword,

    /// The document rendered successfully
    Loaded,

    /// A non-password failure ended the session
    Failed,
}

impl LoadPhase {
    /// Short lowercase label for logs and event payloads
    pub fn label(&self) -> &'static str {
        match self {
            LoadPhase::Loading => "loading",
            LoadPhase::AwaitingPassword => "awaiting_password",
            LoadPhase::Loaded => "loaded",
            LoadPhase::Failed => "failed",
        }
    }

    /// No attempt in flight and no prompt pending.
    ///
    /// Settled phases are the only ones a source change may interrupt.
    pub fn is_settled(&self) -> bool {
        matches!(self, LoadPhase::Loaded | LoadPhase::Failed)
    }
}

impl std::fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A classified render failure.
///
/// Exactly two classifications exist; anything the password pattern does not
/// match is generic. No further taxonomy is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderFailure {
    /// The worker could not decrypt with the password given (or with none).
    /// The signal cannot distinguish "required" from "wrong".
    PasswordRequiredOrInvalid(String),

    /// Any non-password failure. Terminal for the session.
    Generic(String),
}

impl RenderFailure {
    /// Classify a worker failure reason by the case-insensitive "password"
    /// substring.
    pub fn classify(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if PASSWORD_HINT.is_match(&reason) {
            Self::PasswordRequiredOrInvalid(reason)
        } else {
            Self::Generic(reason)
        }
    }

    pub fn is_password(&self) -> bool {
        matches!(self, Self::PasswordRequiredOrInvalid(_))
    }

    /// The raw reason string reported by the worker
    pub fn reason(&self) -> &str {
        match self {
            Self::PasswordRequiredOrInvalid(reason) | Self::Generic(reason) => reason,
        }
    }
}

impl std::fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}
