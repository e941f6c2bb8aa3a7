use crate::endpoint::Endpoint;
use crate::error::ScanError;
use crate::mode::{OperationMode, TimeoutPolicy};

/// A fully built OAI-PMH GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Set this request enumerates; `None` for ListSets.
    pub set_spec: Option<String>,
    pub url: String,
    pub verb: &'static str,
    pub timeout: TimeoutPolicy,
}

/// `GET {endpoint}?verb=ListSets`
pub fn list_sets_request(endpoint: &Endpoint) -> RequestDescriptor {
    RequestDescriptor {
        set_spec: None,
        url: format!("{}{}verb=ListSets", endpoint, endpoint.query_separator()),
        verb: "ListSets",
        timeout: TimeoutPolicy::TransportDefault,
    }
}

/// `GET {endpoint}?verb={ListIdentifiers|ListRecords}&set={set}&metadataPrefix={prefix}[&from={from}]`
///
/// The set identifier and `from` are percent-encoded; the metadata prefix is
/// passed through as given.
pub fn enumeration_request(
    endpoint: &Endpoint,
    set_spec: &str,
    metadata_prefix: &str,
    from: Option<&str>,
    mode: OperationMode,
) -> RequestDescriptor {
    let mut url = format!(
        "{}{}verb={}&set={}&metadataPrefix={}",
        endpoint,
        endpoint.query_separator(),
        mode.verb(),
        urlencoding::encode(set_spec),
        metadata_prefix
    );
    if let Some(from) = from {
        url.push_str("&from=");
        url.push_str(&urlencoding::encode(from));
    }

    RequestDescriptor {
        set_spec: Some(set_spec.to_string()),
        url,
        verb: mode.verb(),
        timeout: mode.timeout_policy(),
    }
}

/// Check an OAI-PMH datestamp: `YYYY-MM-DD` or `YYYY-MM-DDThh:mm:ssZ`.
pub fn validate_datestamp(s: &str) -> Result<(), ScanError> {
    let bytes = s.as_bytes();
    let digits_at = |idx: &[usize]| idx.iter().all(|&i| bytes[i].is_ascii_digit());

    let day_ok = bytes.len() >= 10
        && digits_at(&[0, 1, 2, 3, 5, 6, 8, 9])
        && bytes[4] == b'-'
        && bytes[7] == b'-';
    let ok = match bytes.len() {
        10 => day_ok,
        20 => {
            day_ok
                && bytes[10] == b'T'
                && digits_at(&[11, 12, 14, 15, 17, 18])
                && bytes[13] == b':'
                && bytes[16] == b':'
                && bytes[19] == b'Z'
        }
        _ => false,
    };

    if ok {
        Ok(())
    } else {
        Err(ScanError::Validation {
            input: s.to_string(),
            reason: "from must be YYYY-MM-DD or YYYY-MM-DDThh:mm:ssZ".into(),
        })
    }
}
