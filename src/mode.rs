use clap::ValueEnum;

/// Metadata format requested when none is given.
pub const DEFAULT_METADATA_PREFIX: &str = "oai_dc";

/// How the transport should bound a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// Use the transport's configured finite timeout.
    TransportDefault,
    /// Wait for as long as the repository takes.
    Unbounded,
}

/// Which enumeration verb is used to size each set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OperationMode {
    /// `ListIdentifiers`: headers only, cheap.
    #[default]
    Identifiers,
    /// `ListRecords`: full metadata records, potentially very large.
    Records,
}

impl OperationMode {
    pub fn verb(self) -> &'static str {
        match self {
            OperationMode::Identifiers => "ListIdentifiers",
            OperationMode::Records => "ListRecords",
        }
    }

    /// Local name of the elements counted when no total is declared.
    pub fn item_tag(self) -> &'static str {
        match self {
            OperationMode::Identifiers => "header",
            OperationMode::Records => "record",
        }
    }

    pub fn timeout_policy(self) -> TimeoutPolicy {
        match self {
            OperationMode::Identifiers => TimeoutPolicy::TransportDefault,
            OperationMode::Records => TimeoutPolicy::Unbounded,
        }
    }
}
