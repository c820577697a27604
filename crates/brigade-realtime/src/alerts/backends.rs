//! Output seams for the alert dispatcher.

use std::time::Duration;

use tracing::{debug, info};

use super::buffer::Alert;

#[derive(Debug, Clone, thiserror::Error)]
pub enum AlertError {
    #[error("audio output unavailable: {0}")]
    AudioUnavailable(String),
    #[error("audio playback failed: {0}")]
    Playback(String),
    #[error("desktop alerts unavailable: {0}")]
    Desktop(String),
}

/// Audio sink for rendered tones.
pub trait AudioOutput: Send + Sync {
    /// Acquire the output device. Called once per dispatcher.
    fn open(&self) -> Result<(), AlertError>;

    /// Start playing mono samples. Must not block until playback ends.
    fn play(&self, samples: Vec<f32>, sample_rate: u32) -> Result<(), AlertError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Unsupported,
}

impl Permission {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Desktop-level alert surface.
pub trait DesktopNotifier: Send + Sync {
    fn request_permission(&self) -> Permission;

    /// Show `alert`. `dismiss_after` of `None` means it stays until the user closes it.
    fn show(&self, alert: &Alert, dismiss_after: Option<Duration>) -> Result<(), AlertError>;
}

/// Accepts and discards audio.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentAudio;

impl AudioOutput for SilentAudio {
    fn open(&self) -> Result<(), AlertError> {
        Ok(())
    }

    fn play(&self, samples: Vec<f32>, sample_rate: u32) -> Result<(), AlertError> {
        debug!(samples = samples.len(), sample_rate, "silent audio");
        Ok(())
    }
}

/// Writes desktop alerts to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl DesktopNotifier for LogNotifier {
    fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    fn show(&self, alert: &Alert, dismiss_after: Option<Duration>) -> Result<(), AlertError> {
        info!(
            alert_id = %alert.id,
            priority = alert.priority.as_str(),
            category = alert.category.as_deref().unwrap_or(""),
            dismiss_ms = dismiss_after.map(|d| d.as_millis() as u64),
            "{}: {}",
            alert.title,
            alert.message,
        );
        Ok(())
    }
}

/// Neither audio nor desktop alerts exist on this host.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unsupported;

impl AudioOutput for Unsupported {
    fn open(&self) -> Result<(), AlertError> {
        Err(AlertError::AudioUnavailable("no audio output on this host".into()))
    }

    fn play(&self, _samples: Vec<f32>, _sample_rate: u32) -> Result<(), AlertError> {
        Err(AlertError::AudioUnavailable("no audio output on this host".into()))
    }
}

impl DesktopNotifier for Unsupported {
    fn request_permission(&self) -> Permission {
        Permission::Unsupported
    }

    fn show(&self, _alert: &Alert, _dismiss_after: Option<Duration>) -> Result<(), AlertError> {
        Err(AlertError::Desktop("no desktop alert support".into()))
    }
}

#[cfg(feature = "speaker")]
pub use speaker::Speaker;

#[cfg(feature = "speaker")]
mod speaker {
    use std::sync::mpsc;
    use std::thread;

    use parking_lot::Mutex;
    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, Sink};
    use tracing::{debug, info, warn};

    use super::{AlertError, AudioOutput};

    struct Clip {
        samples: Vec<f32>,
        sample_rate: u32,
    }

    /// Plays tones on the default output device.
    ///
    /// The rodio stream is not `Send`, so it lives on a dedicated thread that
    /// receives rendered clips over a channel.
    #[derive(Default)]
    pub struct Speaker {
        tx: Mutex<Option<mpsc::Sender<Clip>>>,
    }

    impl Speaker {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl AudioOutput for Speaker {
        fn open(&self) -> Result<(), AlertError> {
            let mut slot = self.tx.lock();
            if slot.is_some() {
                return Ok(());
            }

            let (clip_tx, clip_rx) = mpsc::channel::<Clip>();
            let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);

            thread::Builder::new()
                .name("brigade-speaker".into())
                .spawn(move || {
                    let (_stream, handle) = match OutputStream::try_default() {
                        Ok(pair) => {
                            let _ = ready_tx.send(Ok(()));
                            pair
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e.to_string()));
                            return;
                        }
                    };
                    while let Ok(clip) = clip_rx.recv() {
                        match Sink::try_new(&handle) {
                            Ok(sink) => {
                                sink.append(SamplesBuffer::new(1, clip.sample_rate, clip.samples));
                                sink.detach();
                            }
                            Err(e) => warn!(error = %e, "failed to create audio sink"),
                        }
                    }
                    debug!("speaker thread exiting");
                })
                .map_err(|e| AlertError::AudioUnavailable(e.to_string()))?;

            match ready_rx.recv() {
                Ok(Ok(())) => {
                    info!("audio output initialized");
                    *slot = Some(clip_tx);
                    Ok(())
                }
                Ok(Err(reason)) => Err(AlertError::AudioUnavailable(reason)),
                Err(_) => Err(AlertError::AudioUnavailable("speaker thread exited".into())),
            }
        }

        fn play(&self, samples: Vec<f32>, sample_rate: u32) -> Result<(), AlertError> {
            let slot = self.tx.lock();
            let tx = slot
                .as_ref()
                .ok_or_else(|| AlertError::AudioUnavailable("speaker not opened".into()))?;
            tx.send(Clip { samples, sample_rate })
                .map_err(|_| AlertError::Playback("speaker thread exited".into()))
        }
    }

}
