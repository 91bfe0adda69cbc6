// src/error.rs

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A read or append against the remote source failed (network, status, auth).
    #[error("fetch from `{range}` failed: {message}")]
    Fetch {
        range: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A required submission field was blank.
    #[error("`{field}` must not be empty")]
    Validation { field: &'static str },

    /// The header row of a region lacks a column we depend on.
    #[error("range `{range}` has no `{column}` column")]
    MissingColumn { range: String, column: &'static str },
}

impl Error {
    pub fn fetch(range: &str, message: impl Into<String>) -> Self {
        Error::Fetch {
            range: range.to_string(),
            message: message.into(),
            source: None,
        }
    }

    pub fn fetch_with_source<E>(range: &str, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Fetch {
            range: range.to_string(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, Error::Fetch { .. })
    }
}
