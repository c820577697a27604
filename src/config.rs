//! Settings to runtime configuration.

use std::time::Duration;

use brigade_realtime::{AlertConfig, ChannelConfig, ReconnectPolicy};
use brigade_settings::{AlertSettings, ChannelSettings, LoggingSettings, WorkflowSettings};
use brigade_telemetry::{parse_level, TelemetryConfig};
use brigade_workflow::{HttpSupplierOrderApi, PollerConfig, WorkflowError};
use tracing::Level;

pub fn channel_config(settings: &ChannelSettings) -> ChannelConfig {
    ChannelConfig {
        url: settings.url.clone(),
        reconnect: ReconnectPolicy::new(
            Duration::from_millis(settings.reconnect_base_delay_ms),
            Duration::from_millis(settings.reconnect_max_delay_ms),
        ),
        heartbeat_interval: Duration::from_millis(settings.heartbeat_interval_ms),
        ..ChannelConfig::default()
    }
}

pub fn alert_config(settings: &AlertSettings) -> AlertConfig {
    AlertConfig {
        sound_enabled: settings.sound_enabled,
        desktop_enabled: settings.desktop_enabled,
        buffer_capacity: settings.buffer_capacity,
        display_window: Duration::from_millis(settings.display_window_ms),
        desktop_dismiss: Duration::from_millis(settings.desktop_dismiss_ms),
    }
}

pub fn poller_config(settings: &WorkflowSettings) -> PollerConfig {
    PollerConfig {
        interval: Duration::from_millis(settings.poll_interval_ms),
        max_attempts: settings.max_attempts,
    }
}

pub fn order_api(settings: &WorkflowSettings) -> Result<HttpSupplierOrderApi, WorkflowError> {
    HttpSupplierOrderApi::new(
        settings.api_base_url.clone(),
        settings.api_key.clone(),
        Duration::from_millis(settings.request_timeout_ms),
    )
}

/// Telemetry config plus any level strings that could not be parsed.
pub fn telemetry_config(settings: &LoggingSettings) -> (TelemetryConfig, Vec<String>) {
    let mut rejected = Vec::new();
    let log_level = parse_level(&settings.level).unwrap_or_else(|| {
        rejected.push(settings.level.clone());
        Level::INFO
    });
    let module_levels = settings
        .modules
        .iter()
        .filter_map(|(module, level)| match parse_level(level) {
            Some(level) => Some((module.clone(), level)),
            None => {
                rejected.push(format!("{module}={level}"));
                None
            }
        })
        .collect();
    (
        TelemetryConfig {
            log_level,
            module_levels,
            json: settings.json,
        },
        rejected,
    )
}
