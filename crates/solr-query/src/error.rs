//! Error types for datasolr-query.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Returns true if the search engine failed or could not be reached.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind, ErrorKind::Client(_))
            && self
                .source
                .as_ref()
                .and_then(|s| s.downcast_ref::<datasolr_client::Error>())
                .is_some_and(datasolr_client::Error::is_transport)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// A sort statement could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),
    /// The request cannot be turned into a safe query.
    #[error("Query error: {0}")]
    Query(String),
    /// Unknown field mapper or similar setup problem.
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Client error: {0}")]
    Client(String),
}

impl From<datasolr_client::Error> for Error {
    fn from(err: datasolr_client::Error) -> Self {
        use datasolr_client::ErrorKind as ClientErrorKind;

        let kind = match &err.kind {
            ClientErrorKind::Query(_) => ErrorKind::Query(err.to_string()),
            ClientErrorKind::Config(_) | ClientErrorKind::InvalidUrl(_) => {
                ErrorKind::Config(err.to_string())
            }
            _ => ErrorKind::Client(err.to_string()),
        };
        Error { kind, source: Some(Box::new(err)) }
    }
}
