use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use brigade_core::{Notification, OutboundFrame, Payload, Priority};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::backends::{AlertError, AudioOutput, DesktopNotifier, Permission};
use super::buffer::{Alert, AlertBuffer};
use super::tone::{ToneKind, SAMPLE_RATE};

#[derive(Clone, Debug)]
pub struct AlertConfig {
    pub sound_enabled: bool,
    pub desktop_enabled: bool,
    pub buffer_capacity: usize,
    /// How long a non-error alert stays in the buffer.
    pub display_window: Duration,
    /// Auto-dismiss delay for non-error desktop alerts.
    pub desktop_dismiss: Duration,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            desktop_enabled: true,
            buffer_capacity: 10,
            display_window: Duration::from_secs(10),
            desktop_dismiss: Duration::from_secs(5),
        }
    }
}

/// Input to [`AlertDispatcher::notify`].
#[derive(Clone, Debug, PartialEq)]
pub struct AlertRequest {
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub category: Option<String>,
    pub details: Option<Payload>,
}

impl AlertRequest {
    pub fn new(title: impl Into<String>, message: impl Into<String>, priority: Priority) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            priority,
            category: None,
            details: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_details(mut self, details: Payload) -> Self {
        self.details = Some(details);
        self
    }

    /// Build from a decoded notification, tagged with its notification type.
    ///
    /// Missing title falls back to `"Notification"`, missing message to empty.
    pub fn from_notification(notification: &Notification) -> Self {
        let mut request = Self::new(
            notification.title().unwrap_or("Notification"),
            notification.message().unwrap_or_default(),
            notification.priority(),
        );
        request.category = Some(notification.kind.as_str().to_owned());
        request.details = notification.details().cloned();
        request
    }
}

/// Outbound handle of the live channel, lent to the dispatcher for keep-alives.
#[derive(Clone, Debug)]
pub struct ChannelHandle {
    tx: mpsc::Sender<OutboundFrame>,
}

impl ChannelHandle {
    pub fn new(tx: mpsc::Sender<OutboundFrame>) -> Self {
        Self { tx }
    }

    /// Queue a ping without waiting. Returns `false` if the queue is full or closed.
    pub fn send_keepalive(&self) -> bool {
        self.tx.try_send(OutboundFrame::Ping).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[derive(Clone, Copy, Debug)]
struct Readiness {
    permission: Permission,
    audio_ready: bool,
}

/// Turns events into a tone, a desktop alert and a buffered [`Alert`].
///
/// Each of the three steps is attempted independently; failures and panics
/// are logged, never returned from [`notify`](Self::notify).
pub struct AlertDispatcher {
    config: AlertConfig,
    audio: Arc<dyn AudioOutput>,
    desktop: Arc<dyn DesktopNotifier>,
    ready: OnceLock<Readiness>,
    buffer: Arc<AlertBuffer>,
    channel: Mutex<Option<ChannelHandle>>,
}

impl AlertDispatcher {
    pub fn new(
        config: AlertConfig,
        audio: Arc<dyn AudioOutput>,
        desktop: Arc<dyn DesktopNotifier>,
    ) -> Self {
        let buffer = Arc::new(AlertBuffer::new(config.buffer_capacity, config.display_window));
        Self {
            config,
            audio,
            desktop,
            ready: OnceLock::new(),
            buffer,
            channel: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Request desktop permission and open audio. Runs once; later calls
    /// return the first outcome.
    ///
    /// May block while the audio device opens.
    /// [`ConnectionManager::connect`](crate::ConnectionManager::connect) runs
    /// it before the channel starts, so frame routing never waits on it.
    pub fn ensure_initialized(&self) -> Permission {
        self.readiness().permission
    }

    fn readiness(&self) -> Readiness {
        *self.ready.get_or_init(|| {
            let permission = if self.config.desktop_enabled {
                guarded("permission", || Ok(self.desktop.request_permission()))
                    .unwrap_or(Permission::Unsupported)
            } else {
                Permission::Unsupported
            };
            let audio_ready =
                self.config.sound_enabled && guarded("audio_open", || self.audio.open()).is_some();
            info!(?permission, audio_ready, "alert outputs initialized");
            Readiness {
                permission,
                audio_ready,
            }
        })
    }

    /// Play the cue for `kind`.
    pub fn play_tone(&self, kind: ToneKind) -> Result<(), AlertError> {
        if !self.readiness().audio_ready {
            return Err(AlertError::AudioUnavailable("audio output not initialized".into()));
        }
        self.audio.play(kind.render(), SAMPLE_RATE)
    }

    pub fn notify(&self, request: AlertRequest) -> Alert {
        let readiness = self.readiness();

        let mut alert = Alert::new(request.title, request.message, request.priority);
        alert.category = request.category;
        alert.details = request.details;

        if self.config.sound_enabled && readiness.audio_ready {
            let kind = ToneKind::from(alert.priority);
            let _ = guarded("tone", || self.play_tone(kind));
        }

        if self.config.desktop_enabled && readiness.permission.is_granted() {
            let dismiss_after = (!alert.is_sticky()).then_some(self.config.desktop_dismiss);
            let _ = guarded("desktop", || self.desktop.show(&alert, dismiss_after));
        }

        let pushed = catch_unwind(AssertUnwindSafe(|| self.buffer.push(alert.clone())));
        if pushed.is_err() {
            warn!(alert_id = %alert.id, "alert buffer push panicked");
        }

        debug!(
            alert_id = %alert.id,
            priority = alert.priority.as_str(),
            category = alert.category.as_deref().unwrap_or(""),
            "alert dispatched"
        );
        alert
    }

    pub fn buffer(&self) -> &Arc<AlertBuffer> {
        &self.buffer
    }

    pub fn attach_channel(&self, handle: ChannelHandle) {
        *self.channel.lock() = Some(handle);
    }

    pub fn detach_channel(&self) {
        *self.channel.lock() = None;
    }

    pub fn has_channel(&self) -> bool {
        self.channel.lock().as_ref().is_some_and(|h| !h.is_closed())
    }

    /// Send a ping over the attached channel, if any.
    pub fn send_keepalive(&self) -> bool {
        let handle = self.channel.lock().clone();
        handle.is_some_and(|h| h.send_keepalive())
    }
}

/// Run one alert step, logging failure or panic. `None` if the step did not succeed.
fn guarded<T>(step: &'static str, f: impl FnOnce() -> Result<T, AlertError>) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(v)) => Some(v),
        Ok(Err(e)) => {
            debug!(step, error = %e, "alert step skipped");
            None
        }
        Err(_) => {
            warn!(step, "alert step panicked");
            None
        }
    }
}
