use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, info, warn};

use crate::discovery::discover_sets;
use crate::endpoint::Endpoint;
use crate::error::ScanError;
use crate::interpret::interpret_count;
use crate::mode::{OperationMode, DEFAULT_METADATA_PREFIX};
use crate::request::{enumeration_request, RequestDescriptor};
use crate::transport::{Transport, NO_RESPONSE_STATUS};
use crate::types::{assemble, summarize, Report, ScanOutcome, SetDescriptor};

/// Knobs for one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub mode: OperationMode,
    pub metadata_prefix: String,
    /// Lower datestamp bound sent as `from`.
    pub from: Option<String>,
    /// Cap on requests in flight at once; `None` fires them all together.
    pub concurrency: Option<usize>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            mode: OperationMode::default(),
            metadata_prefix: DEFAULT_METADATA_PREFIX.to_string(),
            from: None,
            concurrency: None,
        }
    }
}

/// Discover the repository's sets, size each one concurrently and build the report.
///
/// Only discovery failures are returned as errors; per-set failures end up in
/// the report as entries without a size.
pub async fn scan_repository<T>(
    transport: Arc<T>,
    endpoint: &Endpoint,
    options: &ScanOptions,
) -> Result<Report, ScanError>
where
    T: Transport + ?Sized + 'static,
{
    let sets = discover_sets(transport.as_ref(), endpoint).await?;
    let outcomes = scan(transport, endpoint, &sets, options).await;
    let summary = summarize(&outcomes);
    info!(
        sets = outcomes.len(),
        sized = summary.sized,
        unknown = summary.unknown,
        failed = summary.failed,
        "scan complete"
    );
    Ok(assemble(endpoint, &outcomes))
}

/// Issue one enumeration request per set concurrently and wait for all of them.
///
/// - Every set yields exactly one outcome, even if its task panics.
/// - A failing set never cancels its siblings.
/// - Outcomes come back in the order of `sets`, matched by set spec rather
///   than by completion order.
pub async fn scan<T>(
    transport: Arc<T>,
    endpoint: &Endpoint,
    sets: &[SetDescriptor],
    options: &ScanOptions,
) -> Vec<ScanOutcome>
where
    T: Transport + ?Sized + 'static,
{
    info!(sets = sets.len(), mode = ?options.mode, "scanning sets");

    let limiter = options
        .concurrency
        .map(|n| Arc::new(Semaphore::new(n.clamp(1, Semaphore::MAX_PERMITS))));
    let mut tasks = JoinSet::new();
    let mut in_flight: HashMap<task::Id, RequestDescriptor> = HashMap::with_capacity(sets.len());

    for set in sets {
        let request = enumeration_request(
            endpoint,
            &set.set_spec,
            &options.metadata_prefix,
            options.from.as_deref(),
            options.mode,
        );
        let transport = transport.clone();
        let limiter = limiter.clone();
        let mode = options.mode;
        let task_request = request.clone();

        let handle = tasks.spawn(async move {
            // held until the task completes
            let _permit = match limiter {
                Some(sem) => sem.acquire_owned().await.ok(),
                None => None,
            };
            fetch_and_interpret(transport.as_ref(), task_request, mode).await
        });
        in_flight.insert(handle.id(), request);
    }

    let mut finished: HashMap<String, ScanOutcome> = HashMap::with_capacity(sets.len());
    while let Some(joined) = tasks.join_next_with_id().await {
        let outcome = match joined {
            Ok((id, outcome)) => {
                in_flight.remove(&id);
                outcome
            }
            Err(err) => {
                let Some(request) = in_flight.remove(&err.id()) else {
                    continue;
                };
                warn!(url = %request.url, error = %err, "scan task did not complete");
                outcome_for(request, NO_RESPONSE_STATUS, None, true)
            }
        };
        finished.insert(outcome.set_spec.clone(), outcome);
    }

    sets.iter()
        .filter_map(|set| finished.remove(&set.set_spec))
        .collect()
}

async fn fetch_and_interpret<T>(transport: &T, request: RequestDescriptor, mode: OperationMode) -> ScanOutcome
where
    T: Transport + ?Sized,
{
    match transport.fetch(&request).await {
        Err(err) => {
            warn!(url = %request.url, error = %err, "request failed");
            outcome_for(request, NO_RESPONSE_STATUS, None, true)
        }
        Ok(resp) if !resp.is_success() => {
            warn!(url = %request.url, status = resp.status, "request returned an error status");
            outcome_for(request, resp.status, None, true)
        }
        Ok(resp) => match interpret_count(mode, &resp.body) {
            Ok(count) => {
                if count.is_none() {
                    debug!(url = %request.url, "response had nothing to count");
                }
                outcome_for(request, resp.status, count, false)
            }
            Err(err) => {
                warn!(url = %request.url, error = %err, "unreadable response");
                outcome_for(request, resp.status, None, true)
            }
        },
    }
}

fn outcome_for(request: RequestDescriptor, status_code: u16, count: Option<u64>, failed: bool) -> ScanOutcome {
    ScanOutcome {
        set_spec: request.set_spec.unwrap_or_default(),
        url: request.url,
        status_code,
        count,
        failed,
    }
}
