//! Visit tracking with per-client deduplication.
//!
//! Tracking is best effort by contract: it must never add latency to the
//! request path and never surface failures into it. Request handlers call
//! [`VisitorTracker::track_if_new`], which does a synchronous dedup check
//! and a non-blocking enqueue; a background worker owns delivery and its
//! error handling, detached from any request's lifetime.
//!
//! Dedup is a bounded insertion-order set: when full, the oldest-inserted
//! client id is evicted (not LRU; a re-visit does not refresh position).

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use log::{debug, error, warn};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error_handling::{ErrorType, GateStats, InfoType};
use crate::gate::{Decision, Verdict};
use crate::request::RequestContext;

mod sink;

pub use sink::{NotificationSink, NullSink, WebhookSink};

/// One visit, described richly enough for a human-readable notification.
#[derive(Debug, Clone, Serialize)]
pub struct VisitEvent {
    /// Path the visitor requested.
    pub path: String,
    /// Client network address, if known.
    pub origin: Option<String>,
    /// Country display name from the resolver.
    pub country: Option<String>,
    /// ISO 3166-1 alpha-2 code the decision was based on.
    pub country_code: Option<String>,
    /// City, region, timezone, ISP: resolver best effort.
    pub city: Option<String>,
    /// Region or state name.
    pub region: Option<String>,
    /// IANA timezone.
    pub timezone: Option<String>,
    /// Internet service provider.
    pub isp: Option<String>,
    /// Whether the visitor looked like a VPN/proxy/datacenter exit.
    pub is_vpn: bool,
    /// Whether the gate redirected this visit to the blocked page.
    pub blocked: bool,
    /// Wall-clock time of the visit, milliseconds since Unix epoch.
    pub occurred_at_ms: i64,
}

impl VisitEvent {
    /// Builds an event from the request and the gate's decision on it.
    pub fn from_decision(ctx: &RequestContext, decision: &Decision) -> Self {
        let location = decision.location.as_ref();
        VisitEvent {
            path: ctx.path.clone(),
            origin: ctx.origin.clone(),
            country: location.and_then(|loc| loc.country.clone()),
            country_code: decision.country.clone(),
            city: location.and_then(|loc| loc.city.clone()),
            region: location.and_then(|loc| loc.region.clone()),
            timezone: location.and_then(|loc| loc.timezone.clone()),
            isp: location.and_then(|loc| loc.isp.clone()),
            is_vpn: location.map(|loc| loc.is_vpn()).unwrap_or(false),
            blocked: decision.verdict == Verdict::RedirectBlocked,
            occurred_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Bounded set of already-tracked client ids with insertion-order eviction.
struct SeenSet {
    ids: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl SeenSet {
    fn new(capacity: usize) -> Self {
        SeenSet {
            ids: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns `true` if the id was new and is now recorded.
    fn insert(&mut self, client_id: &str) -> bool {
        if self.ids.contains(client_id) {
            return false;
        }
        while self.ids.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.ids.remove(&oldest);
                }
                None => break,
            }
        }
        self.ids.insert(client_id.to_string());
        self.order.push_back(client_id.to_string());
        true
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Deduplicates visits per client id and dispatches notifications in the
/// background.
pub struct VisitorTracker {
    seen: Mutex<SeenSet>,
    tx: mpsc::Sender<VisitEvent>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<GateStats>,
}

impl VisitorTracker {
    /// Creates a tracker and spawns its dispatch worker.
    ///
    /// `capacity` bounds the dedup set; `queue_depth` bounds how many
    /// undelivered events may be in flight before new ones are dropped
    /// (dropped, not blocked on: the request path never waits).
    pub fn new(
        capacity: usize,
        queue_depth: usize,
        notification_sink: Arc<dyn NotificationSink>,
        stats: Arc<GateStats>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_depth);
        let cancel = CancellationToken::new();
        let worker = spawn_dispatch_worker(rx, notification_sink, cancel.clone(), Arc::clone(&stats));
        VisitorTracker {
            seen: Mutex::new(SeenSet::new(capacity)),
            tx,
            cancel,
            worker: Mutex::new(Some(worker)),
            stats,
        }
    }

    /// Records the client and queues the event, unless the client was
    /// already tracked in this process lifetime.
    ///
    /// Returns `true` when the client was new. Queue overflow still counts
    /// the client as tracked; only the notification is lost (and counted).
    pub fn track_if_new(&self, client_id: &str, event: VisitEvent) -> bool {
        let inserted = {
            let mut seen = match self.seen.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            seen.insert(client_id)
        };
        if !inserted {
            self.stats
                .increment_info(InfoType::DuplicateVisitorSuppressed);
            debug!("Visit by already-tracked client suppressed");
            return false;
        }

        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.stats.increment_error(ErrorType::NotificationQueueFull);
                warn!("Visit notification dropped: queue full");
                true
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Visit notification dropped: tracker is shut down");
                false
            }
        }
    }

    /// Number of distinct clients currently in the dedup set.
    pub fn tracked_count(&self) -> usize {
        match self.seen.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Stops the dispatch worker after letting it drain queued events.
    pub async fn close(&self) {
        self.cancel.cancel();
        let handle = {
            let mut guard = match self.worker.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.take()
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Visit dispatch worker ended abnormally: {e}");
            }
        }
    }
}

/// Runs delivery off the request path. The worker owns all dispatch error
/// handling: failures are logged and counted, never retried.
fn spawn_dispatch_worker(
    mut rx: mpsc::Receiver<VisitEvent>,
    notification_sink: Arc<dyn NotificationSink>,
    cancel: CancellationToken,
    stats: Arc<GateStats>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    // Drain what is already queued, then stop.
                    while let Ok(event) = rx.try_recv() {
                        dispatch_one(notification_sink.as_ref(), &event, &stats).await;
                    }
                    break;
                }
                received = rx.recv() => {
                    match received {
                        Some(event) => {
                            dispatch_one(notification_sink.as_ref(), &event, &stats).await
                        }
                        None => break,
                    }
                }
            }
        }
        debug!("Visit dispatch worker stopped");
    })
}

async fn dispatch_one(notification_sink: &dyn NotificationSink, event: &VisitEvent, stats: &GateStats) {
    match notification_sink.deliver(event).await {
        Ok(()) => {
            stats.increment_info(InfoType::VisitNotificationSent);
            debug!("Visit notification delivered for {}", event.path);
        }
        Err(e) => {
            stats.increment_error(ErrorType::NotificationDispatchError);
            error!("Visit notification failed (not retried): {e}");
        }
    }
}
