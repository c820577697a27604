//! The single push channel: connect, read frames, route them, reconnect.

use std::sync::Arc;
use std::time::Duration;

use brigade_core::{InboundFrame, Notification, OutboundFrame, Payload, UiCategory};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::alerts::{AlertDispatcher, AlertRequest, ChannelHandle};
use crate::backoff::ReconnectPolicy;
use crate::registry::{handler, Handler, SubscriberRegistry, Subscription};
use crate::transport::{Channel, Connector};

pub const DEFAULT_URL: &str = "ws://localhost:8080/ws/notifications";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Clone, Debug)]
pub struct ChannelConfig {
    pub url: String,
    pub reconnect: ReconnectPolicy,
    pub heartbeat_interval: Duration,
    /// Capacity of the outbound frame queue lent to the alert dispatcher.
    pub outbound_queue: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_owned(),
            reconnect: ReconnectPolicy::default(),
            heartbeat_interval: Duration::from_secs(30),
            outbound_queue: 16,
        }
    }
}

struct Driver {
    cancel: CancellationToken,
    wake: Arc<Notify>,
    task: JoinHandle<()>,
}

struct Inner {
    config: ChannelConfig,
    connector: Arc<dyn Connector>,
    alerts: Arc<AlertDispatcher>,
    registry: Arc<SubscriberRegistry>,
    state: watch::Sender<ConnectionState>,
    driver: Mutex<Option<Driver>>,
}

enum SessionEnd {
    Cancelled,
    Lost(String),
}

/// Owner of the push channel. Cheap to clone; clones share one channel.
///
/// At most one driver task runs per manager, so there is never more than one
/// connection attempt or open channel. Call [`disconnect`](Self::disconnect)
/// before dropping the last clone; a running driver keeps itself alive.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    pub fn new(
        config: ChannelConfig,
        connector: Arc<dyn Connector>,
        alerts: Arc<AlertDispatcher>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                alerts,
                registry: Arc::new(SubscriberRegistry::new()),
                state,
                driver: Mutex::new(None),
            }),
        }
    }

    /// Start the channel if it is not already up.
    ///
    /// Initializes the alert outputs on the calling thread first, so opening
    /// audio never blocks the driver task. A no-op while connecting or
    /// connected. While waiting out a reconnect delay, retries immediately
    /// instead. Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let _ = self.inner.alerts.ensure_initialized();

        let mut driver = self.inner.driver.lock();
        if let Some(running) = driver.as_ref().filter(|d| !d.task.is_finished()) {
            if self.state() == ConnectionState::Disconnected {
                debug!("connect requested during backoff, retrying now");
                running.wake.notify_one();
            }
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("connect called outside a tokio runtime");
            return;
        };

        self.inner.set_state(ConnectionState::Connecting);
        let cancel = CancellationToken::new();
        let wake = Arc::new(Notify::new());
        let task = runtime.spawn(Arc::clone(&self.inner).drive(cancel.clone(), Arc::clone(&wake)));
        *driver = Some(Driver { cancel, wake, task });
    }

    /// Close the channel and cancel any pending reconnect.
    pub async fn disconnect(&self) {
        let driver = self.inner.driver.lock().take();
        if let Some(driver) = driver {
            driver.cancel.cancel();
            if let Err(e) = driver.task.await {
                if e.is_panic() {
                    warn!("connection driver panicked");
                }
            }
        }
        self.inner.alerts.detach_channel();
        self.inner.set_state(ConnectionState::Disconnected);
        info!(url = %self.inner.config.url, "channel disconnected");
    }

    /// Register `f` for `category`. Delivery stops when the returned
    /// [`Subscription`] is unsubscribed or dropped.
    pub fn subscribe<F>(&self, category: UiCategory, f: F) -> Subscription
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        self.inner.registry.subscribe(category, handler(f))
    }

    /// Register an existing handler. Subscribing the same handler twice to a
    /// category still delivers once.
    pub fn subscribe_handler(&self, category: UiCategory, handler: &Handler) -> Subscription {
        self.inner.registry.subscribe(category, Arc::clone(handler))
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.inner.registry
    }

    pub fn alerts(&self) -> &Arc<AlertDispatcher> {
        &self.inner.alerts
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.inner.config
    }
}

impl Inner {
    fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            debug!(state = ?next, "connection state changed");
        }
    }

    async fn drive(self: Arc<Self>, cancel: CancellationToken, wake: Arc<Notify>) {
        let url = self.config.url.as_str();
        let mut attempt: u32 = 0;

        loop {
            self.set_state(ConnectionState::Connecting);
            let opened = tokio::select! {
                _ = cancel.cancelled() => break,
                opened = self.connector.connect(url) => opened,
            };

            match opened {
                Ok(channel) => {
                    attempt = 0;
                    info!(url, "channel connected");
                    match self.run_session(channel, &cancel).await {
                        SessionEnd::Cancelled => break,
                        SessionEnd::Lost(reason) => warn!(url, %reason, "channel lost"),
                    }
                }
                Err(e) => warn!(url, attempt, error = %e, "channel connect failed"),
            }

            self.set_state(ConnectionState::Disconnected);
            let delay = self.config.reconnect.delay(attempt);
            attempt = attempt.saturating_add(1);
            info!(url, attempt, delay_ms = delay.as_millis() as u64, "scheduling reconnect");

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(delay) => {}
                _ = wake.notified() => {}
            }
        }

        self.set_state(ConnectionState::Disconnected);
        debug!(url, "connection driver stopped");
    }

    async fn run_session(&self, channel: Channel, cancel: &CancellationToken) -> SessionEnd {
        let Channel {
            mut sink,
            mut stream,
        } = channel;

        let (out_tx, mut out_rx) = mpsc::channel::<OutboundFrame>(self.config.outbound_queue.max(1));
        self.alerts.attach_channel(ChannelHandle::new(out_tx));
        self.set_state(ConnectionState::Connected);

        let mut heartbeat = interval(self.config.heartbeat_interval.max(Duration::from_millis(1)));
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately.
        heartbeat.tick().await;

        let end = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = sink.close().await;
                    break SessionEnd::Cancelled;
                }
                _ = heartbeat.tick() => {
                    trace!("sending heartbeat");
                    if let Err(e) = sink.send(OutboundFrame::Ping.to_text()).await {
                        break SessionEnd::Lost(e.to_string());
                    }
                }
                Some(frame) = out_rx.recv() => {
                    if let Err(e) = sink.send(frame.to_text()).await {
                        break SessionEnd::Lost(e.to_string());
                    }
                }
                next = stream.next() => match next {
                    Some(Ok(text)) => self.handle_frame(&text),
                    Some(Err(e)) => break SessionEnd::Lost(e.to_string()),
                    None => break SessionEnd::Lost("closed by peer".into()),
                },
            }
        };

        self.alerts.detach_channel();
        end
    }

    fn handle_frame(&self, text: &str) {
        match InboundFrame::parse(text) {
            Ok(InboundFrame::Notification(notification)) => self.route(&notification),
            Ok(InboundFrame::Connected { message }) => {
                info!(message = message.as_deref().unwrap_or(""), "server acknowledged channel");
            }
            Ok(InboundFrame::Pong) => trace!("pong"),
            Err(e) => warn!(error = %e, len = text.len(), "dropping malformed frame"),
        }
    }

    fn route(&self, notification: &Notification) {
        let kind = notification.kind.as_str();
        let _ = self.alerts.notify(AlertRequest::from_notification(notification));

        let categories = notification.ui_categories();
        if categories.is_empty() {
            if notification.kind.is_known() {
                debug!(kind, "notification has no ui route");
            } else {
                warn!(kind, "unrecognized notification type");
            }
            return;
        }

        for category in categories {
            let delivered = self.registry.dispatch(category, &notification.payload);
            debug!(kind, category = %category, delivered, "notification routed");
        }
    }
}
