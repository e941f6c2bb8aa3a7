use std::fmt;

use url::Url;

use crate::error::ScanError;

/// A validated OAI-PMH repository base URL.
///
/// The original string is kept verbatim so the report echoes exactly what
/// was passed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    raw: String,
}

impl Endpoint {
    /// Validate `input` as an absolute http(s) URL with a host.
    pub fn parse(input: &str) -> Result<Self, ScanError> {
        let raw = input.trim();
        let invalid = |reason: &str| ScanError::Validation {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        match url.host_str() {
            Some(h) if !h.is_empty() => {}
            _ => return Err(invalid("missing host")),
        }
        // Query parameters appended after a fragment would never be sent.
        if url.fragment().is_some() {
            return Err(invalid("fragment (#...) is not allowed"));
        }

        Ok(Self {
            raw: raw.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Separator to use before the first OAI-PMH query parameter.
    pub(crate) fn query_separator(&self) -> char {
        if self.raw.contains('?') {
            '&'
        } else {
            '?'
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
