//! Push channel frame format.
//!
//! Inbound frames are JSON text tagged by `type`:
//! `{"type":"notification","notificationType":"call_completed","data":{...}}`,
//! `{"type":"connected"}` and `{"type":"pong"}`. The only outbound frame is the
//! keep-alive `{"type":"ping"}`.

use serde::{Deserialize, Serialize};

use crate::events::{Notification, NotificationKind, Payload};

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("notification frame without notificationType")]
    MissingNotificationType,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawFrame {
    Notification {
        #[serde(rename = "notificationType")]
        notification_type: Option<String>,
        #[serde(default)]
        data: Option<Payload>,
    },
    Connected {
        #[serde(default)]
        message: Option<String>,
    },
    Pong,
}

/// A decoded inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundFrame {
    Notification(Notification),
    Connected { message: Option<String> },
    Pong,
}

impl InboundFrame {
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let raw: RawFrame = serde_json::from_str(text)?;
        Ok(match raw {
            RawFrame::Notification {
                notification_type,
                data,
            } => {
                let kind = notification_type.ok_or(FrameError::MissingNotificationType)?;
                Self::Notification(Notification::new(
                    NotificationKind::parse(&kind),
                    data.unwrap_or_default(),
                ))
            }
            RawFrame::Connected { message } => Self::Connected { message },
            RawFrame::Pong => Self::Pong,
        })
    }
}

/// Frames the client sends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Ping,
}

impl OutboundFrame {
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_notification() {
        let frame = InboundFrame::parse(
            r#"{"type":"notification","notificationType":"call_completed","data":{"title":"Appel IA terminé","hasOrder":true},"timestamp":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        let InboundFrame::Notification(n) = frame else {
            panic!("expected notification");
        };
        assert_eq!(n.kind, NotificationKind::CallCompleted);
        assert!(n.has_order());
    }

    #[test]
    fn notification_without_data_has_empty_payload() {
        let frame =
            InboundFrame::parse(r#"{"type":"notification","notificationType":"new_client"}"#)
                .unwrap();
        assert_matches!(frame, InboundFrame::Notification(n) if n.payload.is_empty());
    }

    #[test]
    fn notification_without_kind_is_rejected() {
        let err = InboundFrame::parse(r#"{"type":"notification","data":{}}"#).unwrap_err();
        assert_matches!(err, FrameError::MissingNotificationType);
    }

    #[test]
    fn parses_connected_and_pong() {
        let connected = InboundFrame::parse(
            r#"{"type":"connected","message":"Connexion notification établie","timestamp":"t"}"#,
        )
        .unwrap();
        assert_matches!(connected, InboundFrame::Connected { message: Some(_) });

        let pong = InboundFrame::parse(r#"{"type":"pong","timestamp":"t"}"#).unwrap();
        assert_eq!(pong, InboundFrame::Pong);
    }

    #[test]
    fn rejects_garbage_and_unknown_types() {
        assert_matches!(InboundFrame::parse("not json"), Err(FrameError::Json(_)));
        assert_matches!(InboundFrame::parse(r#"{"type":"reboot"}"#), Err(FrameError::Json(_)));
        assert_matches!(
            InboundFrame::parse(r#"{"type":"notification","notificationType":"x","data":[1]}"#),
            Err(FrameError::Json(_))
        );
    }

    #[test]
    fn ping_serializes() {
        assert_eq!(OutboundFrame::Ping.to_text(), r#"{"type":"ping"}"#);
    }
}
