//! Debounced, cancellable dispatch of facility searches.
//!
//! The coordinator worker collapses bursts of [`QueryInput`]s (coordinate
//! jitter, rapid radius/filter edits) into one dispatch per quiet window,
//! always using the most recent input. Each dispatch runs under an explicit
//! deadline and is spawned on its own task so a slow response never blocks
//! a newer one; the generation token carried by every outcome lets the
//! repository discard whatever resolves late.

use std::sync::Arc;
use std::time::Duration;

use tokio::select;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::cache::FacilityCache;
use crate::error::FindError;
use crate::net::{self, FacilityBackend};
use crate::state::{QueryInput, SearchBatch, SearchOutcome};

/// Tuning for the coordinator worker. Production values come from
/// [`crate::config::Settings`]; tests shrink them.
#[derive(Clone, Copy, Debug)]
pub struct CoordinatorConfig {
    /// Quiet window that must elapse before a burst is dispatched.
    pub debounce: Duration,
    /// Overall deadline of one dispatch.
    pub request_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1_500),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Spawn the coordinator worker.
///
/// The worker loops: wait for one input, keep replacing it while more
/// arrive inside the debounce window, then dispatch the survivor on a
/// fresh task. Aborting the returned handle cancels the pending debounce
/// timer; dropping a dispatch future aborts its underlying request.
pub fn spawn_search_worker(
    backend: Arc<dyn FacilityBackend>,
    cache: FacilityCache,
    config: CoordinatorConfig,
    mut query_rx: mpsc::UnboundedReceiver<QueryInput>,
    outcome_tx: mpsc::UnboundedSender<SearchOutcome>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let mut latest = match query_rx.recv().await {
                Some(q) => q,
                None => break,
            };
            loop {
                select! {
                    next = query_rx.recv() => {
                        match next {
                            Some(q) => latest = q,
                            None => break,
                        }
                    }
                    () = sleep(config.debounce) => break,
                }
            }

            tracing::debug!(
                id = latest.id,
                radius_m = latest.radius_m,
                category = latest.category.as_config_key(),
                "dispatching facility search"
            );
            let backend = Arc::clone(&backend);
            let cache = cache.clone();
            let tx = outcome_tx.clone();
            let timeout = config.request_timeout;
            tokio::spawn(async move {
                let result = dispatch(backend.as_ref(), &cache, timeout, &latest).await;
                let _ = tx.send(SearchOutcome { id: latest.id, result });
            });
        }
    })
}

/// Run one search dispatch: live fetch under `timeout`, normalization,
/// cache overwrite on non-empty success, cache fallback on failure.
///
/// Never errors while the cache holds a snapshot; the stored set comes back
/// flagged `from_cache`. An empty cache lets the live error through.
pub async fn dispatch(
    backend: &dyn FacilityBackend,
    cache: &FacilityCache,
    timeout: Duration,
    query: &QueryInput,
) -> Result<SearchBatch, FindError> {
    let live = match tokio::time::timeout(timeout, backend.search(query)).await {
        Ok(result) => result,
        Err(_) => Err(FindError::NetworkTimeout),
    };

    match live {
        Ok(body) => {
            let facilities = net::normalize(body);
            if !facilities.is_empty() {
                cache.save(&facilities);
            }
            Ok(SearchBatch {
                facilities,
                from_cache: false,
            })
        }
        Err(err) => {
            tracing::warn!(
                id = query.id,
                error = %err,
                detail = err.detail().unwrap_or_default(),
                "live fetch failed, consulting cache"
            );
            let cached = cache.load();
            if cached.is_empty() {
                Err(err)
            } else {
                Ok(SearchBatch {
                    facilities: cached,
                    from_cache: true,
                })
            }
        }
    }
}
