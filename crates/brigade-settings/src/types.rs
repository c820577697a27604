use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root settings document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrigadeSettings {
    pub channel: ChannelSettings,
    pub alerts: AlertSettings,
    pub workflow: WorkflowSettings,
    pub logging: LoggingSettings,
}

/// Push channel connection settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelSettings {
    /// WebSocket endpoint of the notification feed.
    pub url: String,
    pub reconnect_base_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
    pub heartbeat_interval_ms: u64,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/ws/notifications".into(),
            reconnect_base_delay_ms: 1_000,
            reconnect_max_delay_ms: 30_000,
            heartbeat_interval_ms: 30_000,
        }
    }
}

/// Sound/desktop alert settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertSettings {
    pub sound_enabled: bool,
    pub desktop_enabled: bool,
    /// Number of alerts kept for the in-app panel.
    pub buffer_capacity: usize,
    /// How long a non-error alert stays in the panel.
    pub display_window_ms: u64,
    /// How long a non-error desktop alert stays on screen.
    pub desktop_dismiss_ms: u64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            desktop_enabled: true,
            buffer_capacity: 10,
            display_window_ms: 10_000,
            desktop_dismiss_ms: 5_000,
        }
    }
}

/// Supplier order REST endpoint and polling budget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowSettings {
    pub api_base_url: String,
    /// Sent as `x-api-key` when present.
    pub api_key: Option<String>,
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
    pub request_timeout_ms: u64,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".into(),
            api_key: None,
            poll_interval_ms: 2_000,
            max_attempts: 60,
            request_timeout_ms: 15_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
    /// Per-module level overrides, e.g. `{"brigade_realtime": "debug"}`.
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            modules: BTreeMap::new(),
        }
    }
}

impl BrigadeSettings {
    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> crate::Result<()> {
        use crate::SettingsError::InvalidValue;

        let url = &self.channel.url;
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(InvalidValue(format!(
                "channel.url must be a ws:// or wss:// URL, got {url}"
            )));
        }
        if self.channel.reconnect_base_delay_ms == 0 {
            return Err(InvalidValue("channel.reconnectBaseDelayMs must be > 0".into()));
        }
        if self.channel.reconnect_max_delay_ms < self.channel.reconnect_base_delay_ms {
            return Err(InvalidValue(
                "channel.reconnectMaxDelayMs must be >= reconnectBaseDelayMs".into(),
            ));
        }
        if self.alerts.buffer_capacity == 0 {
            return Err(InvalidValue("alerts.bufferCapacity must be > 0".into()));
        }
        if self.workflow.max_attempts == 0 {
            return Err(InvalidValue("workflow.maxAttempts must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = BrigadeSettings::default();
        assert_eq!(s.channel.url, "ws://localhost:8080/ws/notifications");
        assert_eq!(s.channel.reconnect_base_delay_ms, 1_000);
        assert_eq!(s.channel.reconnect_max_delay_ms, 30_000);
        assert_eq!(s.channel.heartbeat_interval_ms, 30_000);
        assert_eq!(s.alerts.buffer_capacity, 10);
        assert_eq!(s.alerts.display_window_ms, 10_000);
        assert_eq!(s.workflow.poll_interval_ms, 2_000);
        assert_eq!(s.workflow.max_attempts, 60);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn camel_case_round_trip() {
        let json = serde_json::to_value(BrigadeSettings::default()).unwrap();
        assert!(json["channel"]["reconnectBaseDelayMs"].is_u64());
        assert!(json["workflow"]["apiBaseUrl"].is_string());
    }

    #[test]
    fn partial_document_fills_defaults() {
        let s: BrigadeSettings =
            serde_json::from_str(r#"{"workflow": {"maxAttempts": 5}}"#).unwrap();
        assert_eq!(s.workflow.max_attempts, 5);
        assert_eq!(s.workflow.poll_interval_ms, 2_000);
        assert_eq!(s.channel, ChannelSettings::default());
    }

    #[test]
    fn validate_rejects_http_channel_url() {
        let mut s = BrigadeSettings::default();
        s.channel.url = "http://localhost:8080".into();
        assert!(s.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_backoff() {
        let mut s = BrigadeSettings::default();
        s.channel.reconnect_max_delay_ms = 10;
        assert!(s.validate().is_err());
    }
}
