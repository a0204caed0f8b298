use std::fmt;

use serde::Serialize;

use crate::registry::validation::Violation;

/// Structured error type for the command surface. Replaces stringly-typed
/// errors so every caller (HTTP, CLI, tests) can match on error codes instead
/// of parsing messages.
///
/// The first four variants are the closed taxonomy every invocation outcome
/// collapses into; the rest only occur outside the invocation path (startup,
/// config loading).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "code", content = "detail")]
pub enum CommandError {
    /// Command name absent from the registry.
    UnknownCommand { name: String },
    /// Input rejected by the schema. Carries one entry per violated field,
    /// never just the first.
    Validation { violations: Vec<Violation> },
    /// A mutating action was attempted with `allow_mutations` unset.
    PermissionDenied { action: String },
    /// The remote API rejected the call or the transport failed. The upstream
    /// message is preserved verbatim for operator diagnosis.
    Upstream { message: String },
    /// A handler panicked. The lint wall forbids panicking constructs in
    /// handler code, but the boundary still contains it.
    Internal { message: String },
    Settings { message: String },
    Io { message: String },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::UnknownCommand { name } => write!(f, "Unknown command: {name}"),
            CommandError::Validation { violations } => {
                write!(f, "Invalid parameters:")?;
                for v in violations {
                    // Violation's Display already omits an empty path.
                    write!(f, "\n  - {v}")?;
                }
                Ok(())
            }
            CommandError::PermissionDenied { action } => write!(
                f,
                "Permission denied: \"{action}\" mutates remote state and mutating \
                 operations are disabled (set allow_mutations to enable)"
            ),
            CommandError::Upstream { message } => write!(f, "Upstream API error: {message}"),
            CommandError::Internal { message } => write!(f, "Internal error: {message}"),
            CommandError::Settings { message } => write!(f, "Settings error: {message}"),
            CommandError::Io { message } => write!(f, "I/O error: {message}"),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<std::io::Error> for CommandError {
    fn from(e: std::io::Error) -> Self {
        CommandError::Io {
            message: e.to_string(),
        }
    }
}

impl From<crate::client::TransportError> for CommandError {
    fn from(e: crate::client::TransportError) -> Self {
        CommandError::Upstream {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_lists_every_violation() {
        let err = CommandError::Validation {
            violations: vec![
                Violation::new("node", "missing required field"),
                Violation::new("vmid", "expected integer, got string"),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("node: missing required field"));
        assert!(text.contains("vmid: expected integer, got string"));
    }

    #[test]
    fn root_violation_displays_without_an_empty_path() {
        let err = CommandError::Validation {
            violations: vec![Violation::new("", "expected object, got array")],
        };
        let text = err.to_string();
        assert!(text.contains("  - expected object, got array"));
        assert!(!text.contains("- :"));
    }

    #[test]
    fn permission_denied_names_the_action() {
        let err = CommandError::PermissionDenied {
            action: "vm.delete".into(),
        };
        assert!(err.to_string().contains("Permission denied"));
        assert!(err.to_string().contains("vm.delete"));
    }

    #[test]
    fn upstream_message_preserved_verbatim() {
        let err = CommandError::Upstream {
            message: "timeout".into(),
        };
        assert!(err.to_string().contains("timeout"));
    }
}
