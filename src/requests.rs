// src/requests.rs

use chrono::{DateTime, Utc};
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering as AtomicOrdering},
        Arc, RwLock,
    },
    time::Duration,
};
use tokio::{
    sync::{oneshot, watch},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, instrument, warn};

use crate::{
    date_parser::parse_timestamp,
    error::Result,
    schema::{ColumnMap, REQUESTS_LAYOUT},
    source::TabularSource,
};

/// How often the request list is re-read from the source.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(30);

pub const PENDING: &str = "Pending";

/// One row of the requests region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub timestamp: String,
    pub song_title: String,
    pub requested_by: String,
    pub status: String,
    pub extra: BTreeMap<String, String>,
}

impl RequestRecord {
    /// Exact, case-sensitive match on "Pending".
    pub fn is_pending(&self) -> bool {
        self.status == PENDING
    }

    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// All requests of one load, in fetch order.
#[derive(Debug, Default)]
pub struct RequestsSnapshot {
    pub records: Vec<RequestRecord>,
}

impl RequestsSnapshot {
    pub fn from_rows(range: &str, rows: &[Vec<String>]) -> Result<Self> {
        let Some((headers, data)) = rows.split_first() else {
            return Ok(Self::default());
        };
        let map = ColumnMap::resolve(&REQUESTS_LAYOUT, range, headers)?;

        let records = data
            .iter()
            .map(|row| RequestRecord {
                timestamp: map.declared(row, 0),
                song_title: map.declared(row, 1),
                requested_by: map.declared(row, 2),
                status: map.declared(row, 3),
                extra: map.extra(row),
            })
            .collect();
        Ok(Self { records })
    }

    /// Pending requests, newest first.
    ///
    /// Ties keep fetch order. Requests whose timestamp does not parse go
    /// after every dated one, also in fetch order.
    pub fn pending_sorted_by_recency_desc(&self) -> Vec<&RequestRecord> {
        let mut pending: Vec<(Option<DateTime<Utc>>, &RequestRecord)> = self
            .records
            .iter()
            .filter(|r| r.is_pending())
            .map(|r| (r.parsed_timestamp(), r))
            .collect();

        pending.sort_by(|(a, _), (b, _)| match (a, b) {
            (Some(a), Some(b)) => b.cmp(a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        pending.into_iter().map(|(_, r)| r).collect()
    }
}

struct Applied {
    generation: u64,
    snapshot: Arc<RequestsSnapshot>,
}

/// Live view of the requests region.
///
/// Every `load` draws a ticket before going to the source. A finished load is
/// applied only when its ticket is newer than the applied one, so a slow
/// response can never overwrite what a later load already installed.
pub struct RequestLog {
    source: Arc<dyn TabularSource>,
    range: String,
    issued: AtomicU64,
    current: RwLock<Applied>,
    applied_tx: watch::Sender<u64>,
}

impl RequestLog {
    pub fn new(source: Arc<dyn TabularSource>, range: impl Into<String>) -> Self {
        let (applied_tx, _) = watch::channel(0);
        Self {
            source,
            range: range.into(),
            issued: AtomicU64::new(0),
            current: RwLock::new(Applied {
                generation: 0,
                snapshot: Arc::new(RequestsSnapshot::default()),
            }),
            applied_tx,
        }
    }

    /// Fetch the requests region and replace the snapshot wholesale.
    /// A failed fetch keeps the last good snapshot.
    #[instrument(level = "debug", skip(self), fields(range = %self.range))]
    pub async fn load(&self) -> Result<()> {
        let ticket = self.issued.fetch_add(1, AtomicOrdering::SeqCst) + 1;

        let rows = self.source.get(&self.range).await.map_err(|e| {
            warn!(ticket, error = %e, "requests fetch failed");
            e
        })?;
        let snapshot = RequestsSnapshot::from_rows(&self.range, &rows).map_err(|e| {
            warn!(ticket, error = %e, "requests rejected");
            e
        })?;
        let total = snapshot.records.len();

        {
            let mut current = self.current.write().unwrap();
            if ticket <= current.generation {
                debug!(ticket, applied = current.generation, "discarding stale requests load");
                return Ok(());
            }
            *current = Applied {
                generation: ticket,
                snapshot: Arc::new(snapshot),
            };
        }
        self.applied_tx.send_replace(ticket);

        info!(ticket, requests = total, "requests loaded");
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<RequestsSnapshot> {
        Arc::clone(&self.current.read().unwrap().snapshot)
    }

    /// Generation of the snapshot currently installed; 0 before the first load.
    pub fn generation(&self) -> u64 {
        self.current.read().unwrap().generation
    }

    /// Yields each newly applied generation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.applied_tx.subscribe()
    }

    /// Spawn the periodic reload. The first reload happens one
    /// [`REFRESH_INTERVAL`] after arming. Stops when the handle is stopped or
    /// dropped; a load already in flight is left to finish.
    pub fn start_refresh_loop(self: &Arc<Self>) -> RefreshHandle {
        let log = Arc::clone(self);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + REFRESH_INTERVAL, REFRESH_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        if let Err(e) = log.load().await {
                            warn!(error = %e, "periodic requests refresh failed");
                        }
                    }
                }
            }
            debug!("requests refresh loop stopped");
        });

        RefreshHandle {
            stop: stop_tx,
            task,
        }
    }
}

/// Owner of a running refresh loop.
pub struct RefreshHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Stop the loop and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "requests refresh loop ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
