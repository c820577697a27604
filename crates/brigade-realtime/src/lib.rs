//! Real-time layer of the brigade dashboard.
//!
//! ```text
//!  server ──frames──► ConnectionManager ──► AlertDispatcher (tone, desktop, buffer)
//!                        │   ▲ backoff
//!                        ▼   │
//!                  SubscriberRegistry ──► "call" handlers
//!                                     └─► "order" handlers
//! ```
//!
//! One [`ConnectionManager`] owns the single push channel. UI regions only
//! see [`SubscriberRegistry`] callbacks and the passive [`ConnectionState`].

pub mod alerts;
pub mod backoff;
pub mod connection;
pub mod mock;
pub mod registry;
pub mod transport;

pub use alerts::{
    Alert, AlertBuffer, AlertConfig, AlertDispatcher, AlertError, AlertRequest, AudioOutput,
    ChannelHandle, DesktopNotifier, LogNotifier, Permission, SilentAudio, ToneKind, Unsupported,
};
pub use backoff::ReconnectPolicy;
pub use connection::{ChannelConfig, ConnectionManager, ConnectionState};
pub use registry::{handler, Handler, SubscriberRegistry, Subscription};
pub use transport::{Channel, Connector, TransportError, WsConnector};

#[cfg(feature = "speaker")]
pub use alerts::Speaker;
