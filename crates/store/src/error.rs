// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

/// Errors that can occur during document store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store cannot be reached. Retryable.
    Unavailable(String),
    /// An update targeted a document that does not exist.
    NotFound { collection: String, key: String },
    /// A batch precondition did not hold; nothing was written.
    PreconditionFailed {
        collection: String,
        key: String,
        expected: Option<u64>,
        actual: Option<u64>,
    },
    /// The store is busy with a conflicting writer. Retryable.
    Contention(String),
    /// A document body could not be encoded or decoded.
    Serialization(String),
    /// A database error occurred.
    Database(String),
    /// Database migration failed.
    Migration(String),
    /// Initialization error.
    Initialization(String),
}

impl StoreError {
    /// Returns true if retrying the same operation later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Contention(_))
    }
}

fn describe_revision(revision: Option<u64>) -> String {
    revision.map_or_else(|| String::from("absent"), |r| format!("revision {r}"))
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "Store unavailable: {msg}"),
            Self::NotFound { collection, key } => {
                write!(f, "Document not found: {collection}/{key}")
            }
            Self::PreconditionFailed {
                collection,
                key,
                expected,
                actual,
            } => write!(
                f,
                "Precondition failed for {collection}/{key}: expected {}, found {}",
                describe_revision(*expected),
                describe_revision(*actual)
            ),
            Self::Contention(msg) => write!(f, "Store contention: {msg}"),
            Self::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            Self::Database(msg) => write!(f, "Database error: {msg}"),
            Self::Migration(msg) => write!(f, "Migration failed: {msg}"),
            Self::Initialization(msg) => write!(f, "Initialization error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::DatabaseError(_, ref info)
                if info.message().contains("locked") || info.message().contains("busy") =>
            {
                Self::Contention(err.to_string())
            }
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<diesel::ConnectionError> for StoreError {
    fn from(err: diesel::ConnectionError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
