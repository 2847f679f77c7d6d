//! The static network as one immutable, swappable unit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Config;
use crate::fetch::{HttpClient, RetryOptions};
use crate::osm::fetch_overpass_routes;
use crate::paths::{ResolvedPath, RoutePathBuilder};
use crate::schedule::{ScheduleError, ScheduleStore, load_schedule};
use crate::stats::PathStats;

/// Schedule and paths built together from one refresh.
#[derive(Debug, Clone)]
pub struct NetworkSnapshot {
    pub schedule: Arc<ScheduleStore>,
    pub paths: Arc<Vec<ResolvedPath>>,
    pub stats: PathStats,
    pub built_at: DateTime<Utc>,
}

/// Loads the schedule and OSM geometry concurrently, then builds paths.
///
/// # Errors
///
/// Fails only when the schedule cannot be loaded. OSM failures leave the
/// snapshot without OSM geometry.
#[tracing::instrument(skip_all)]
pub async fn build_snapshot<C: HttpClient + ?Sized>(
    client: &C,
    config: &Config,
    retry: &RetryOptions,
) -> Result<NetworkSnapshot, ScheduleError> {
    let (schedule, osm_paths) = tokio::join!(
        load_schedule(client, &config.static_urls, retry),
        fetch_overpass_routes(client, &config.overpass_url, &config.overpass_query, retry),
    );
    let schedule = schedule?;

    let build = RoutePathBuilder::with_osm_kinds(&config.osm_route_kinds)
        .build(&schedule, Some(&osm_paths));

    Ok(NetworkSnapshot {
        schedule: Arc::new(schedule),
        paths: Arc::new(build.paths),
        stats: build.stats,
        built_at: Utc::now(),
    })
}

/// Shared access to the latest snapshot.
///
/// Readers get an `Arc` to a complete snapshot; a refresh swaps the whole
/// snapshot at once.
#[derive(Debug, Clone)]
pub struct SnapshotHandle {
    tx: Arc<watch::Sender<Arc<NetworkSnapshot>>>,
}

impl SnapshotHandle {
    pub fn new(initial: NetworkSnapshot) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Arc<NetworkSnapshot> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<NetworkSnapshot>> {
        self.tx.subscribe()
    }

    pub fn replace(&self, snapshot: NetworkSnapshot) {
        self.tx.send_replace(Arc::new(snapshot));
    }

    /// Rebuilds and swaps in a new snapshot. On failure the current one stays.
    pub async fn refresh<C: HttpClient + ?Sized>(
        &self,
        client: &C,
        config: &Config,
        retry: &RetryOptions,
    ) -> Result<(), ScheduleError> {
        match build_snapshot(client, config, retry).await {
            Ok(snapshot) => {
                info!(
                    routes = snapshot.schedule.routes.len(),
                    paths = snapshot.paths.len(),
                    "Snapshot refreshed"
                );
                self.replace(snapshot);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Snapshot refresh failed, keeping previous snapshot");
                Err(e)
            }
        }
    }
}
