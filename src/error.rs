use thiserror::Error;

/// Errors that abort a scan before any per-set request is issued.
///
/// Per-set failures never show up here; they are folded into the
/// report as `size: null` entries instead.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The repository base URL given on the command line is not usable.
    #[error("invalid repository base URL {input:?}: {reason}")]
    Validation { input: String, reason: String },

    /// The ListSets request never produced a response.
    #[error("ListSets request to {url} failed: {source}")]
    DiscoveryTransport {
        url: String,
        #[source]
        source: TransportError,
    },

    /// The ListSets request came back with a non-success HTTP status.
    #[error("ListSets request to {url} returned HTTP {status}")]
    DiscoveryStatus { url: String, status: u16 },

    /// The ListSets response could not be read as a list of sets.
    #[error("ListSets response from {url} is not usable: {source}")]
    DiscoveryProtocol {
        url: String,
        #[source]
        source: InterpretError,
    },
}

/// A request that did not yield any HTTP response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("transport error: {0}")]
    Other(String),
}

/// A response body that could not be interpreted as OAI-PMH markup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpretError {
    #[error("malformed XML: {0}")]
    Malformed(String),
    #[error("completeListSize {0:?} is not a non-negative integer")]
    BadListSize(String),
    #[error("expected a <{0}> element")]
    Missing(String),
    #[error("OAI-PMH error {code}: {message}")]
    OaiError { code: String, message: String },
}
