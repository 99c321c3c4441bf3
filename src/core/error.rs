//! Error taxonomy for the engine.
//!
//! Every failure a user can trigger is returned as data, never thrown
//! across the public boundary. The `Display` impls provide the
//! locale-independent default rendering; command handlers own the final
//! user-facing phrasing (prefix, hints).

use thiserror::Error;

/// A recoverable engine error.
///
/// Variants carry the offending path, account name or detail text so a
/// caller can re-format the message without parsing strings.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FsError {
    /// Path or account does not exist.
    #[error("{0}: No such file or directory")]
    NotFound(String),

    /// A file appeared where a directory was required.
    #[error("{0}: Not a directory")]
    NotADirectory(String),

    /// A directory appeared where a file was required.
    #[error("{0}: Is a directory")]
    IsADirectory(String),

    /// Create collision (path or account already present).
    #[error("{0}: File exists")]
    AlreadyExists(String),

    /// Traversal, mode-bit or elevation failure.
    #[error("{0}: Permission denied")]
    PermissionDenied(String),

    /// Malformed user input (mode string, account name, glob, predicate).
    #[error("{0}")]
    InvalidArgument(String),

    /// Structurally forbidden operation (moving the root, deleting the
    /// superuser account, moving a directory into itself).
    #[error("{0}")]
    OperationNotPermitted(String),
}

impl FsError {
    /// True for the permission-denied kind.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, FsError::PermissionDenied(_))
    }

    /// True for the not-found kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_texts() {
        assert_eq!(
            FsError::NotFound("/tmp/x".into()).to_string(),
            "/tmp/x: No such file or directory"
        );
        assert_eq!(
            FsError::PermissionDenied("/etc/passwd".into()).to_string(),
            "/etc/passwd: Permission denied"
        );
        assert_eq!(
            FsError::InvalidArgument("invalid mode: 'g?rw'".into()).to_string(),
            "invalid mode: 'g?rw'"
        );
    }

    #[test]
    fn test_predicates() {
        assert!(FsError::PermissionDenied("x".into()).is_permission_denied());
        assert!(FsError::NotFound("x".into()).is_not_found());
        assert!(!FsError::NotFound("x".into()).is_permission_denied());
    }
}
