pub mod events;
pub mod ids;
pub mod wire;

pub use events::{Notification, NotificationKind, Payload, Priority, UiCategory};
pub use ids::{AlertId, WorkflowId};
pub use wire::{FrameError, InboundFrame, OutboundFrame};
