use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Template '{name}' not found at {}", path.display())]
    TemplateNotFound { name: String, path: PathBuf },

    #[error("Unresolved placeholder '{{{{{key}}}}}' in strict template rendering")]
    UnresolvedPlaceholder { key: String },

    #[error("Store error ({kind}): {message}")]
    Store {
        kind: StoreErrorKind,
        message: String,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage consistency error: {0}")]
    StorageConsistency(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not signed in: {0}")]
    Unauthenticated(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a store error, classifying it from the backend message
    pub fn store(message: impl Into<String>) -> Self {
        let message = message.into();
        Error::Store {
            kind: StoreErrorKind::classify(&message),
            message,
        }
    }

    /// Remedy to show the operator alongside the error, if one is known
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::Store { kind, .. } => Some(kind.suggestion()),
            Error::TemplateNotFound { .. } => {
                Some("Run 'blogkit init' to write the default templates, or set paths.templates_dir")
            }
            Error::Unauthenticated(_) => Some("Run 'blogkit login' first"),
            Error::Conflict(_) => Some("Reload the record and apply your changes again"),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigParse(err.to_string())
    }
}

/// Coarse classification of remote store failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    Network,
    Auth,
    Permission,
    Storage,
    Database,
    Unknown,
}

impl StoreErrorKind {
    /// Classify a backend error message by the keywords it carries.
    ///
    /// Order matters: a JWT failure mentioning "storage" is still an auth problem.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&["fetch failed", "network", "connection", "timed out", "dns"]) {
            StoreErrorKind::Network
        } else if has(&["jwt", "auth", "invalid login", "token"]) {
            StoreErrorKind::Auth
        } else if has(&["rls", "row-level security", "permission", "forbidden"]) {
            StoreErrorKind::Permission
        } else if has(&["bucket", "storage", "object"]) {
            StoreErrorKind::Storage
        } else if has(&["duplicate key", "constraint", "violates"]) {
            StoreErrorKind::Database
        } else {
            StoreErrorKind::Unknown
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            StoreErrorKind::Network => "NETWORK_ERROR",
            StoreErrorKind::Auth => "AUTH_ERROR",
            StoreErrorKind::Permission => "PERMISSION_ERROR",
            StoreErrorKind::Storage => "STORAGE_ERROR",
            StoreErrorKind::Database => "DATABASE_ERROR",
            StoreErrorKind::Unknown => "UNKNOWN_ERROR",
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            StoreErrorKind::Network => {
                "Check the network connection and that the store URL is reachable"
            }
            StoreErrorKind::Auth => "Sign in again with 'blogkit login'",
            StoreErrorKind::Permission => {
                "Check the table and bucket policies, or ask an administrator for access"
            }
            StoreErrorKind::Storage => "Check the storage bucket name and its permissions",
            StoreErrorKind::Database => {
                "Check the input; a unique constraint (such as the slug) was violated"
            }
            StoreErrorKind::Unknown => "See the log output for details",
        }
    }
}

impl std::fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_store_messages() {
        assert_eq!(
            StoreErrorKind::classify("TypeError: fetch failed"),
            StoreErrorKind::Network
        );
        assert_eq!(
            StoreErrorKind::classify("JWT expired"),
            StoreErrorKind::Auth
        );
        assert_eq!(
            StoreErrorKind::classify("new row violates row-level security policy"),
            StoreErrorKind::Permission
        );
        assert_eq!(
            StoreErrorKind::classify("Bucket not found"),
            StoreErrorKind::Storage
        );
        assert_eq!(
            StoreErrorKind::classify(
                "duplicate key value violates unique constraint \"posts_slug_key\""
            ),
            StoreErrorKind::Database
        );
        assert_eq!(
            StoreErrorKind::classify("something odd"),
            StoreErrorKind::Unknown
        );
    }

    #[test]
    fn test_store_error_carries_kind_and_suggestion() {
        let err = Error::store("Bucket not found");
        match &err {
            Error::Store { kind, .. } => assert_eq!(*kind, StoreErrorKind::Storage),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("STORAGE_ERROR"));
        assert!(err.suggestion().unwrap().contains("bucket"));
    }

    #[test]
    fn test_unresolved_placeholder_message() {
        let err = Error::UnresolvedPlaceholder {
            key: "title".to_string(),
        };
        assert!(err.to_string().contains("'{{title}}'"));
    }
}
