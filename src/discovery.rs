use tracing::{debug, info};

use crate::endpoint::Endpoint;
use crate::error::ScanError;
use crate::interpret::parse_set_specs;
use crate::request::list_sets_request;
use crate::transport::Transport;
use crate::types::SetDescriptor;

/// Ask the repository which sets it has.
///
/// Only the first ListSets page is read. Any failure here is fatal to the
/// scan because there is nothing to fan out over.
pub async fn discover_sets<T>(transport: &T, endpoint: &Endpoint) -> Result<Vec<SetDescriptor>, ScanError>
where
    T: Transport + ?Sized,
{
    let request = list_sets_request(endpoint);
    debug!(url = %request.url, "discovering sets");

    let response = transport
        .fetch(&request)
        .await
        .map_err(|source| ScanError::DiscoveryTransport {
            url: request.url.clone(),
            source,
        })?;
    if !response.is_success() {
        return Err(ScanError::DiscoveryStatus {
            url: request.url,
            status: response.status,
        });
    }

    let specs = parse_set_specs(&response.body).map_err(|source| ScanError::DiscoveryProtocol {
        url: request.url.clone(),
        source,
    })?;
    info!(sets = specs.len(), "discovered sets");

    Ok(specs
        .into_iter()
        .map(|set_spec| SetDescriptor { set_spec })
        .collect())
}
