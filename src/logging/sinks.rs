//! Log sink implementations

use async_trait::async_trait;
use reqwest::Client;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinSet;

use super::{LogEvent, LogMode, LogSink, Severity, SharedSink};
use crate::notifications::{Alert, AlertChannel, ChannelError, ChannelResult};
use crate::utils::truncate_text;

/// Background deliveries started by a sink, awaited on flush
#[derive(Default)]
struct Deliveries {
    tasks: Mutex<JoinSet<()>>,
}

impl Deliveries {
    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start `fut` on the current runtime without blocking the caller
    ///
    /// Outside a tokio runtime there is nothing to drive the future, so it is dropped.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no async runtime, skipping background log delivery");
            return;
        };

        let mut tasks = self.lock();
        // reap finished deliveries so a long-lived sink does not accumulate them
        while tasks.try_join_next().is_some() {}
        tasks.spawn_on(fut, &handle);
    }

    /// Number of deliveries not yet reaped
    fn pending(&self) -> usize {
        self.lock().len()
    }

    async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.lock());
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "log delivery task failed");
            }
        }
    }
}

/// Posts log lines to a log collection endpoint
#[derive(Clone)]
pub struct LogForwarder {
    url: String,
    client: Client,
}

impl LogForwarder {
    /// Create a forwarder for `url`
    pub fn new(url: impl Into<String>, timeout: Duration) -> ChannelResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Send `{log_data, log_mode}` to the endpoint
    pub async fn forward(&self, log_data: &str, severity: Severity) -> ChannelResult<()> {
        let payload = serde_json::json!({
            "log_data": log_data,
            "log_mode": severity.code(),
        });

        let response = self.client.post(&self.url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Status {
                status: status.as_u16(),
                body: truncate_text(&body, 200),
            });
        }
        Ok(())
    }
}

/// Production sink: tracing output, alert webhook, optional forwarding
pub struct TracingSink {
    mode: LogMode,
    alerts: Option<Arc<dyn AlertChannel>>,
    forwarder: Option<LogForwarder>,
    deliveries: Deliveries,
}

impl TracingSink {
    /// Create a sink that only writes to tracing
    pub fn new(mode: LogMode) -> Self {
        Self {
            mode,
            alerts: None,
            forwarder: None,
            deliveries: Deliveries::default(),
        }
    }

    /// Raise alerts for error-severity events through `channel`
    pub fn with_alerts(mut self, channel: Arc<dyn AlertChannel>) -> Self {
        self.alerts = Some(channel);
        self
    }

    /// Forward events to a log collection endpoint according to the mode
    pub fn with_forwarder(mut self, forwarder: LogForwarder) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    /// Configured log mode
    pub fn mode(&self) -> LogMode {
        self.mode
    }

    /// Deliveries started and not yet reaped
    pub fn pending_deliveries(&self) -> usize {
        self.deliveries.pending()
    }

    fn write_tracing(event: &LogEvent) {
        match event.severity {
            Severity::Error | Severity::Critical => tracing::error!(
                source = %event.source,
                operation = %event.operation,
                severity = event.severity.code(),
                "{}",
                event.long()
            ),
            Severity::Warning => tracing::warn!(
                source = %event.source,
                operation = %event.operation,
                "{}",
                event.short()
            ),
            Severity::Info => tracing::info!(
                source = %event.source,
                operation = %event.operation,
                "{}",
                event.short()
            ),
        }
    }
}

#[async_trait]
impl LogSink for TracingSink {
    fn emit(&self, event: LogEvent) {
        Self::write_tracing(&event);

        if event.severity.is_alerting() {
            if let Some(channel) = &self.alerts {
                let channel = Arc::clone(channel);
                let alert = Alert::new(event.severity, event.short())
                    .with_metadata("source", event.source.clone())
                    .with_metadata("operation", event.operation.clone());
                self.deliveries.spawn(async move {
                    let delivery = channel.send(&alert).await;
                    if !delivery.is_delivered() {
                        tracing::warn!(channel = channel.name(), %delivery, "alert was not delivered");
                    }
                });
            }
        }

        if let Some(forwarder) = &self.forwarder {
            if self.mode.forwards(event.severity) {
                let forwarder = forwarder.clone();
                let long = event.long();
                let severity = event.severity;
                self.deliveries.spawn(async move {
                    if let Err(e) = forwarder.forward(&long, severity).await {
                        tracing::error!(error = %e, "log forwarding failed");
                    }
                });
            }
        }
    }

    async fn flush(&self) {
        self.deliveries.flush().await;
    }
}

/// Sink that keeps every event in memory
///
/// Optionally tees events to another sink, so a run can be journaled while
/// still reaching the production outputs.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<LogEvent>>,
    inner: Option<SharedSink>,
}

impl MemorySink {
    /// Create an empty journal
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a journal that also forwards every event to `inner`
    pub fn tee(inner: SharedSink) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            inner: Some(inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of all recorded events
    pub fn events(&self) -> Vec<LogEvent> {
        self.lock().clone()
    }

    /// Events at a given severity
    pub fn with_severity(&self, severity: Severity) -> Vec<LogEvent> {
        self.lock()
            .iter()
            .filter(|e| e.severity == severity)
            .cloned()
            .collect()
    }

    /// Whether any event message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lock().iter().any(|e| e.message.contains(needle))
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[async_trait]
impl LogSink for MemorySink {
    fn emit(&self, event: LogEvent) {
        if let Some(inner) = &self.inner {
            inner.emit(event.clone());
        }
        self.lock().push(event);
    }

    async fn flush(&self) {
        if let Some(inner) = &self.inner {
            inner.flush().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::Delivery;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Channel that takes `delay` per alert and counts deliveries
    struct SlowChannel {
        delay: Duration,
        sent: AtomicUsize,
    }

    impl SlowChannel {
        fn new(delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                delay: Duration::from_millis(delay_ms),
                sent: AtomicUsize::new(0),
            })
        }

        fn sent(&self) -> usize {
            self.sent.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AlertChannel for SlowChannel {
        fn name(&self) -> &str {
            "slow"
        }

        async fn send(&self, _alert: &Alert) -> Delivery {
            tokio::time::sleep(self.delay).await;
            self.sent.fetch_add(1, Ordering::SeqCst);
            Delivery::Delivered { attempts: 1 }
        }
    }

    #[test]
    fn test_memory_sink_records() {
        let sink = MemorySink::new();
        sink.record("dhl", "login", "invalid_credentials", Severity::Info);
        sink.record("dhl", "scan", "HTTP 502", Severity::Error);

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.with_severity(Severity::Info).len(), 1);
        assert!(sink.contains("HTTP 502"));
        assert!(!sink.contains("timeout"));
    }

    #[test]
    fn test_memory_sink_tee() {
        let inner = Arc::new(MemorySink::new());
        let outer = MemorySink::tee(inner.clone());

        outer.record("workflow", "run", "DONE", Severity::Info);

        assert_eq!(outer.len(), 1);
        assert_eq!(inner.len(), 1);
    }

    #[tokio::test]
    async fn test_tracing_sink_alerts_only_on_errors() {
        let channel = SlowChannel::new(0);
        let sink = TracingSink::new(LogMode::Quiet).with_alerts(channel.clone());

        sink.record("dhl", "login", "rejected", Severity::Info);
        sink.record("dhl", "scan", "rejected", Severity::Warning);
        sink.record("dhl", "handin", "HTTP 500", Severity::Error);
        sink.record("index", "run", "panic", Severity::Critical);
        sink.flush().await;

        assert_eq!(channel.sent(), 2);
        assert_eq!(sink.pending_deliveries(), 0);
    }

    #[test]
    fn test_flush_delivers_before_runtime_shutdown() {
        let channel = SlowChannel::new(20);
        let sink = Arc::new(TracingSink::new(LogMode::Quiet).with_alerts(channel.clone()));

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on({
            let sink = Arc::clone(&sink);
            async move {
                sink.record("dhl", "hand_in", "batch refused", Severity::Error);
                sink.flush().await;
            }
        });
        drop(rt);

        assert_eq!(channel.sent(), 1);
    }

    #[tokio::test]
    async fn test_tee_flushes_inner_sink() {
        let channel = SlowChannel::new(20);
        let production: SharedSink =
            Arc::new(TracingSink::new(LogMode::Quiet).with_alerts(channel.clone()));
        let journal = MemorySink::tee(production);

        journal.record("dhl", "scan", "HTTP 502", Severity::Error);
        journal.flush().await;

        assert_eq!(channel.sent(), 1);
        assert_eq!(journal.len(), 1);
    }

    #[test]
    fn test_tracing_sink_without_runtime() {
        let channel = SlowChannel::new(0);
        let sink = TracingSink::new(LogMode::Verbose).with_alerts(channel.clone());

        sink.record("dhl", "scan", "HTTP 500", Severity::Error);

        assert_eq!(channel.sent(), 0);
        assert_eq!(sink.pending_deliveries(), 0);
        assert_eq!(sink.mode(), LogMode::Verbose);
    }
}
