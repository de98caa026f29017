use std::{error::Error as StdError, fmt};

/// Store operation, carried in errors and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Connect,
    EnsureSchema,
    Query,
    Append,
    Delete,
}

impl Operation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::EnsureSchema => "ensure_schema",
            Self::Query => "query",
            Self::Append => "append",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backing store could not be reached or prepared.
    #[error("history store unavailable ({operation}): {source}")]
    StoreUnavailable {
        operation: Operation,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// A read or write for one sender failed.
    #[error("history {operation} failed for {phone}: {source}")]
    Store {
        operation: Operation,
        phone: String,
        timestamp: Option<String>,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("invalid history table name: {table}")]
    InvalidTable { table: String },
}

impl Error {
    #[must_use]
    pub fn unavailable(
        operation: Operation,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::StoreUnavailable {
            operation,
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn store(
        operation: Operation,
        phone: impl Into<String>,
        timestamp: Option<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            operation,
            phone: phone.into(),
            timestamp,
            source: Box::new(source),
        }
    }

    /// Operation that failed, when known.
    #[must_use]
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::StoreUnavailable { operation, .. } | Self::Store { operation, .. } => {
                Some(*operation)
            },
            Self::InvalidTable { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
