//! Alert dispatch: audible cue, desktop alert, and the in-app alert buffer.

mod backends;
mod buffer;
mod dispatcher;
pub mod tone;

pub use backends::{
    AlertError, AudioOutput, DesktopNotifier, LogNotifier, Permission, SilentAudio, Unsupported,
};
#[cfg(feature = "speaker")]
pub use backends::Speaker;
pub use buffer::{Alert, AlertBuffer};
pub use dispatcher::{AlertConfig, AlertDispatcher, AlertRequest, ChannelHandle};
pub use tone::{Tone, ToneKind};
