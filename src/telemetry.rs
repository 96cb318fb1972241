//! Fire-and-forget usage telemetry.
//!
//! Events are queued in memory and flushed to a pluggable sink on a timer or
//! when a batch accumulates, whichever comes first. Flush failures are logged
//! and silently dropped — telemetry never blocks, and never surfaces errors
//! to callers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const FLUSH_INTERVAL_SECS: u64 = 60;
const FLUSH_BATCH_SIZE: usize = 20;

// ─── Event type ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub event: String,
    pub ts: String,
}

impl TelemetryEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            ts: Utc::now().to_rfc3339(),
        }
    }
}

// ─── Sink contract ───────────────────────────────────────────────────────────

/// Receives flushed batches. Errors are logged by the flush task, never
/// propagated.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn flush(&self, batch: &[TelemetryEvent]) -> anyhow::Result<()>;
}

/// POSTs batches as JSON to a collection endpoint.
pub struct HttpSink {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }
}

#[async_trait]
impl TelemetrySink for HttpSink {
    async fn flush(&self, batch: &[TelemetryEvent]) -> anyhow::Result<()> {
        let payload = serde_json::json!({
            "platform": std::env::consts::OS,
            "version": env!("CARGO_PKG_VERSION"),
            "events": batch,
        });
        let resp = self.client.post(&self.endpoint).json(&payload).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("server returned {}", resp.status());
        }
        Ok(())
    }
}

/// Collects batches in memory. Used by tests and offline diagnostics.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().expect("telemetry lock poisoned").clone()
    }
}

#[async_trait]
impl TelemetrySink for MemorySink {
    async fn flush(&self, batch: &[TelemetryEvent]) -> anyhow::Result<()> {
        self.events
            .lock()
            .expect("telemetry lock poisoned")
            .extend_from_slice(batch);
        Ok(())
    }
}

// ─── Sender handle ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct TelemetrySender {
    tx: mpsc::Sender<TelemetryEvent>,
}

impl TelemetrySender {
    /// Queue an event for the next flush. Never blocks — drops silently if
    /// the queue is full or telemetry is disabled.
    pub fn send(&self, event: TelemetryEvent) {
        let _ = self.tx.try_send(event);
    }

    /// A sender whose events go nowhere. Used when telemetry is disabled.
    pub fn disabled() -> Self {
        let (tx, _) = mpsc::channel(1);
        Self { tx }
    }
}

// ─── Background flush task ───────────────────────────────────────────────────

/// Spawns the background flush task and returns a `TelemetrySender`.
///
/// The task flushes on a 60s timer or when 20 events accumulate.
pub fn spawn(sink: Arc<dyn TelemetrySink>) -> TelemetrySender {
    spawn_with_interval(sink, Duration::from_secs(FLUSH_INTERVAL_SECS))
}

/// Like [`spawn`] with a custom flush interval. Exposed for tests.
pub fn spawn_with_interval(
    sink: Arc<dyn TelemetrySink>,
    flush_interval: Duration,
) -> TelemetrySender {
    let (tx, mut rx) = mpsc::channel::<TelemetryEvent>(200);

    tokio::spawn(async move {
        let mut buffer: Vec<TelemetryEvent> = Vec::new();
        let mut interval = tokio::time::interval(flush_interval);
        interval.tick().await; // skip immediate tick

        loop {
            tokio::select! {
                Some(event) = rx.recv() => {
                    buffer.push(event);
                    if buffer.len() >= FLUSH_BATCH_SIZE {
                        flush(sink.as_ref(), &mut buffer).await;
                    }
                }
                _ = interval.tick() => {
                    if !buffer.is_empty() {
                        flush(sink.as_ref(), &mut buffer).await;
                    }
                }
                // Channel closed (owner shutting down)
                else => break,
            }
        }

        // Final flush on shutdown
        if !buffer.is_empty() {
            flush(sink.as_ref(), &mut buffer).await;
        }
    });

    TelemetrySender { tx }
}

async fn flush(sink: &dyn TelemetrySink, buffer: &mut Vec<TelemetryEvent>) {
    let events = std::mem::take(buffer);
    let count = events.len();
    match sink.flush(&events).await {
        Ok(()) => debug!("telemetry: flushed {count} events"),
        Err(e) => warn!("telemetry: flush failed: {e:#}"),
    }
}
