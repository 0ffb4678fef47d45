//! Batched asynchronous shipper for the ingestion backend.
//!
//! Records are queued from any thread without blocking. A dedicated
//! worker thread drives a current-thread tokio runtime that:
//! - flushes when `max_batch` records are pending, or every `linger`
//! - groups a flush by topic, one POST per topic
//! - retries transient failures with exponential backoff
//!
//! `close` drains the queue, ships what is left and joins the worker. A
//! full queue drops the record and counts it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use url::Url;

use crate::domain::errors::SinkError;

pub const DEFAULT_MAX_BATCH: usize = 512;
pub const DEFAULT_LINGER: Duration = Duration::from_millis(2000);
const DEFAULT_QUEUE_CAPACITY: usize = 16 * 1024;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RETRY_ELAPSED: Duration = Duration::from_secs(30);

/// One shipped log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestRecord {
    /// Unix seconds
    pub time: i64,
    pub contents: BTreeMap<String, String>,
}

/// Wire body of one POST.
#[derive(Debug, Serialize)]
struct IngestBatch<'a> {
    topic: &'a str,
    source: &'a str,
    logs: &'a [IngestRecord],
}

#[derive(Debug)]
struct QueuedRecord {
    topic: String,
    record: IngestRecord,
}

/// Connection and batching parameters.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Base endpoint, e.g. `https://ingest.example.com`
    pub endpoint: Url,
    pub project: String,
    pub log_store: String,
    pub source: String,
    pub access_key_id: String,
    pub access_key_secret: String,
    pub max_batch: usize,
    pub linger: Duration,
    pub queue_capacity: usize,
    pub request_timeout: Duration,
    pub max_retry_elapsed: Duration,
}

impl BatchConfig {
    pub fn new(endpoint: Url, project: impl Into<String>, log_store: impl Into<String>) -> Self {
        Self {
            endpoint,
            project: project.into(),
            log_store: log_store.into(),
            source: String::new(),
            access_key_id: String::new(),
            access_key_secret: String::new(),
            max_batch: DEFAULT_MAX_BATCH,
            linger: DEFAULT_LINGER,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retry_elapsed: DEFAULT_MAX_RETRY_ELAPSED,
        }
    }

    /// `<endpoint>/projects/<project>/logstores/<log_store>`
    pub fn ingest_url(&self) -> Result<Url, SinkError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| SinkError::InvalidArg {
                arg: "endpoint".to_string(),
                reason: format!("`{}` cannot carry a path", self.endpoint),
            })?
            .pop_if_empty()
            .extend(["projects", &self.project, "logstores", &self.log_store]);
        Ok(url)
    }
}

/// Counters for records that left the queue.
#[derive(Debug, Default)]
struct Counters {
    shipped: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time view of the sender counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// Accepted by the endpoint
    pub shipped: u64,
    /// Rejected or undeliverable after retries
    pub failed: u64,
    /// Discarded because the queue was full or closed
    pub dropped: u64,
}

/// Handle to the running shipper.
pub struct BatchSender {
    tx: mpsc::Sender<QueuedRecord>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl std::fmt::Debug for BatchSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchSender")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl BatchSender {
    /// Build the HTTP client and start the worker thread.
    pub fn start(config: BatchConfig) -> Result<Self, SinkError> {
        let url = config.ingest_url()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let counters = Arc::new(Counters::default());

        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let shipper = Shipper {
            client,
            url,
            source: config.source,
            access_key_id: config.access_key_id,
            access_key_secret: config.access_key_secret,
            max_retry_elapsed: config.max_retry_elapsed,
            counters: Arc::clone(&counters),
        };
        let max_batch = config.max_batch.max(1);
        let linger = config.linger.max(Duration::from_millis(1));

        let worker = std::thread::Builder::new()
            .name("log-ingest".to_string())
            .spawn(move || {
                // The HTTP stack emits its own tracing events; they must not
                // loop back into the logger this sender feeds.
                let _quiet = tracing::subscriber::set_default(tracing::subscriber::NoSubscriber::default());
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        eprintln!("log-ingest: cant start runtime: {err}");
                        return;
                    }
                };
                runtime.block_on(run_loop(rx, shutdown_rx, shipper, max_batch, linger));
            })?;

        Ok(Self {
            tx,
            shutdown: Mutex::new(Some(shutdown_tx)),
            worker: Mutex::new(Some(worker)),
            counters,
        })
    }

    /// Queue a record without blocking.
    pub fn send(&self, topic: impl Into<String>, record: IngestRecord) {
        let queued = QueuedRecord {
            topic: topic.into(),
            record,
        };
        if self.tx.try_send(queued).is_err() {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drain, ship and stop. Blocks until the worker exits; later calls
    /// return immediately.
    pub fn close(&self) {
        let shutdown = self
            .shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(shutdown) = shutdown {
            let _ = shutdown.send(());
        }
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            let _ = worker.join();
        }
    }

    pub fn stats(&self) -> SenderStats {
        SenderStats {
            shipped: self.counters.shipped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Drop for BatchSender {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_loop(
    mut rx: mpsc::Receiver<QueuedRecord>,
    mut shutdown_rx: oneshot::Receiver<()>,
    shipper: Shipper,
    max_batch: usize,
    linger: Duration,
) {
    let mut pending = Vec::with_capacity(max_batch);
    let mut ticker = tokio::time::interval(linger);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(record) => {
                    pending.push(record);
                    if pending.len() >= max_batch {
                        shipper.ship(std::mem::take(&mut pending)).await;
                    }
                }
                None => break,
            },
            _ = ticker.tick() => {
                if !pending.is_empty() {
                    shipper.ship(std::mem::take(&mut pending)).await;
                }
            }
            _ = &mut shutdown_rx => {
                rx.close();
                while let Some(record) = rx.recv().await {
                    pending.push(record);
                }
                break;
            }
        }
    }

    while !pending.is_empty() {
        let rest = pending.split_off(pending.len().min(max_batch));
        shipper.ship(std::mem::replace(&mut pending, rest)).await;
    }
}

struct Shipper {
    client: reqwest::Client,
    url: Url,
    source: String,
    access_key_id: String,
    access_key_secret: String,
    max_retry_elapsed: Duration,
    counters: Arc<Counters>,
}

impl Shipper {
    async fn ship(&self, records: Vec<QueuedRecord>) {
        let mut by_topic: BTreeMap<String, Vec<IngestRecord>> = BTreeMap::new();
        for queued in records {
            by_topic.entry(queued.topic).or_default().push(queued.record);
        }

        for (topic, logs) in by_topic {
            let batch = IngestBatch {
                topic: &topic,
                source: &self.source,
                logs: &logs,
            };
            let count = logs.len() as u64;
            match self.post(&batch).await {
                Ok(()) => {
                    self.counters.shipped.fetch_add(count, Ordering::Relaxed);
                }
                Err(err) => {
                    self.counters.failed.fetch_add(count, Ordering::Relaxed);
                    eprintln!("log-ingest: dropping {count} records for topic `{topic}`: {err}");
                }
            }
        }
    }

    async fn post(&self, batch: &IngestBatch<'_>) -> Result<(), reqwest::Error> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(50))
            .with_max_elapsed_time(Some(self.max_retry_elapsed))
            .build();

        backoff::future::retry(policy, move || async move {
            let response = self
                .client
                .post(self.url.clone())
                .basic_auth(&self.access_key_id, Some(&self.access_key_secret))
                .json(batch)
                .send()
                .await
                .map_err(backoff::Error::transient)?;

            match response.error_for_status() {
                Ok(_) => Ok(()),
                Err(err) if err.status().is_some_and(|s| s.is_client_error()) => {
                    Err(backoff::Error::permanent(err))
                }
                Err(err) => Err(backoff::Error::transient(err)),
            }
        })
        .await
    }
}
