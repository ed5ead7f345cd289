//! Continuous location acquisition with timeout and connectivity awareness.
//!
//! The device's geolocation capability sits behind the [`GeoSource`] seam:
//! production embedders wrap the platform watch API, the CLI uses
//! [`StaticSource`] with an explicitly supplied coordinate, and tests drive
//! a channel directly. The worker spawned by [`spawn_location_worker`]
//! enforces the overall acquisition timeout and forwards every later fix,
//! so consumers see a single stream of [`LocationEvent`]s.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::error::FindError;
use crate::state::Coordinate;

/// Knobs forwarded to the underlying device watch.
#[derive(Clone, Copy, Debug)]
pub struct WatchOptions {
    /// Prefer high-accuracy positioning.
    pub high_accuracy: bool,
    /// Maximum acceptable staleness of a delivered fix.
    pub maximum_age: Duration,
    /// Per-fix timeout of the underlying watch.
    pub fix_timeout: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            maximum_age: Duration::from_secs(15),
            fix_timeout: Duration::from_secs(8),
        }
    }
}

/// A running watch. Fixes arrive as `Ok(Coordinate)`; permission refusal
/// and other watch-level failures arrive as `Err`. Dropping the watch (or
/// the worker holding it) deregisters the underlying subscription because
/// the sender side observes the closed channel.
#[derive(Debug)]
pub struct GeoWatch {
    /// Stream of fixes and watch-level failures.
    pub fixes: mpsc::UnboundedReceiver<Result<Coordinate, FindError>>,
}

/// The device geolocation capability.
pub trait GeoSource: Send + Sync {
    /// Start a continuous watch, or report `LocationUnsupported` when the
    /// capability is absent.
    fn watch(&self, options: &WatchOptions) -> Result<GeoWatch, FindError>;
}

/// Source backed by one already-resolved coordinate. Used by the CLI and
/// as the manual-entry stub boundary: free-text geocoding happens outside
/// the core and arrives here as a finished coordinate.
#[derive(Clone, Copy, Debug)]
pub struct StaticSource {
    coord: Coordinate,
}

impl StaticSource {
    /// Create a source that delivers `coord` once.
    #[must_use]
    pub fn new(coord: Coordinate) -> Self {
        Self { coord }
    }
}

impl GeoSource for StaticSource {
    fn watch(&self, _options: &WatchOptions) -> Result<GeoWatch, FindError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Ok(self.coord));
        Ok(GeoWatch { fixes: rx })
    }
}

/// Source for environments without any geolocation capability.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnsupportedSource;

impl GeoSource for UnsupportedSource {
    fn watch(&self, _options: &WatchOptions) -> Result<GeoWatch, FindError> {
        Err(FindError::LocationUnsupported)
    }
}

/// Events emitted by the location worker.
#[derive(Clone, Debug, PartialEq)]
pub enum LocationEvent {
    /// A coordinate fix arrived.
    Fix(Coordinate),
    /// Acquisition failed; the variant says how.
    Failed(FindError),
}

/// Connectivity transitions reported by the embedding platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectivityEvent {
    /// Connectivity regained; triggers a refresh with the last known
    /// coordinate.
    Online,
    /// Connectivity lost; fetch failures become recoverable (cache + banner)
    /// instead of fatal.
    Offline,
}

/// Spawn the acquisition worker.
///
/// The first fix races `acquisition_timeout`: if nothing arrives in time a
/// `LocationTimeout` event is emitted, but the watch keeps running and a
/// late fix still lands (clearing the error downstream). Every subsequent
/// fix or watch failure is forwarded until the source stream ends.
pub fn spawn_location_worker(
    source: Arc<dyn GeoSource>,
    options: WatchOptions,
    acquisition_timeout: Duration,
    tx: mpsc::UnboundedSender<LocationEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut watch = match source.watch(&options) {
            Ok(watch) => watch,
            Err(e) => {
                let _ = tx.send(LocationEvent::Failed(e));
                return;
            }
        };

        // First fix races the overall acquisition window; the timer dies
        // with the first delivery.
        tokio::select! {
            first = watch.fixes.recv() => {
                match first {
                    Some(Ok(coord)) => {
                        let _ = tx.send(LocationEvent::Fix(coord));
                    }
                    Some(Err(e)) => {
                        let _ = tx.send(LocationEvent::Failed(e));
                    }
                    None => return,
                }
            }
            () = sleep(acquisition_timeout) => {
                let _ = tx.send(LocationEvent::Failed(FindError::LocationTimeout));
            }
        }

        while let Some(fix) = watch.fixes.recv().await {
            let event = match fix {
                Ok(coord) => LocationEvent::Fix(coord),
                Err(e) => LocationEvent::Failed(e),
            };
            if tx.send(event).is_err() {
                break;
            }
        }
    })
}
