//! Error types for datasolr.
//!
//! Every failure of a search maps onto one [`ErrorKind`];
//! [`ErrorKind::http_status`] gives the status a host would usually answer
//! with.

use std::collections::BTreeMap;
use std::fmt;

/// Result type alias for datasolr operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for datasolr operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Validation error with a single message for `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        Self::new(ErrorKind::Validation(errors))
    }

    /// Per-field messages, if this is a validation error.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match &self.kind {
            ErrorKind::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Suggested HTTP status for the host response.
    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// The request has unknown or malformed parameters.
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    /// The resource does not resolve to a known table or alias.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The access check refused the search.
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// The translated query is unsafe or inconsistent.
    #[error("Query error: {0}")]
    Query(String),

    /// The search engine failed or sent a malformed response.
    #[error("Search engine error: {0}")]
    Transport(String),

    /// The field catalog provider or the row executor failed.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// An operation was called out of order.
    #[error("Invalid state: {0}")]
    State(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ErrorKind {
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::Validation(_) => 400,
            ErrorKind::Authorization(_) => 403,
            ErrorKind::NotFound(_) => 404,
            ErrorKind::Query(_)
            | ErrorKind::Transport(_)
            | ErrorKind::Collaborator(_)
            | ErrorKind::State(_)
            | ErrorKind::Config(_) => 500,
        }
    }
}

/// Validation messages keyed by request field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Ok when no message was recorded.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::Validation(self)))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(", "))?;
        }
        Ok(())
    }
}

impl From<datasolr_query::Error> for Error {
    fn from(err: datasolr_query::Error) -> Self {
        use datasolr_query::ErrorKind as QueryErrorKind;

        let kind = match &err.kind {
            QueryErrorKind::Parse(message) => {
                let mut errors = ValidationErrors::new();
                errors.add("sort", message.clone());
                ErrorKind::Validation(errors)
            }
            QueryErrorKind::Query(message) => ErrorKind::Query(message.clone()),
            QueryErrorKind::Config(message) => ErrorKind::Config(message.clone()),
            QueryErrorKind::Client(message) => ErrorKind::Transport(message.clone()),
        };
        Error::with_source(kind, err)
    }
}

impl From<datasolr_client::Error> for Error {
    fn from(err: datasolr_client::Error) -> Self {
        datasolr_query::Error::from(err).into()
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Config(err.to_string()), err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::with_source(ErrorKind::Config(err.to_string()), err)
    }
}
