//! Library crate for oai-set-scan: OAI-PMH set discovery and concurrent set sizing.
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod interpret;
pub mod mode;
pub mod request;
pub mod scanner;
pub mod transport;
pub mod types;
