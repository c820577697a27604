//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`BrigadeSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply `BRIGADE_*` environment variable overrides (highest priority)
//! 4. Validate
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::BrigadeSettings;

/// Resolve the settings file path: `$BRIGADE_SETTINGS`, else `~/.brigade/settings.json`.
pub fn settings_path() -> PathBuf {
    if let Some(explicit) = read_env_string("BRIGADE_SETTINGS") {
        return PathBuf::from(explicit);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".brigade").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<BrigadeSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<BrigadeSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<BrigadeSettings> {
    let defaults = serde_json::to_value(BrigadeSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut BrigadeSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`. Invalid values are ignored with a warning.
pub fn apply_overrides(settings: &mut BrigadeSettings, lookup: impl Fn(&str) -> Option<String>) {
    let env = EnvReader { lookup };

    // ── Channel ─────────────────────────────────────────────────────
    if let Some(v) = env.string("BRIGADE_WS_URL") {
        settings.channel.url = v;
    }
    if let Some(v) = env.u64("BRIGADE_RECONNECT_BASE_MS", 1, 600_000) {
        settings.channel.reconnect_base_delay_ms = v;
    }
    if let Some(v) = env.u64("BRIGADE_RECONNECT_MAX_MS", 1, 3_600_000) {
        settings.channel.reconnect_max_delay_ms = v;
    }
    if let Some(v) = env.u64("BRIGADE_HEARTBEAT_MS", 1_000, 600_000) {
        settings.channel.heartbeat_interval_ms = v;
    }

    // ── Alerts ──────────────────────────────────────────────────────
    if let Some(v) = env.bool("BRIGADE_ALERT_SOUND") {
        settings.alerts.sound_enabled = v;
    }
    if let Some(v) = env.bool("BRIGADE_ALERT_DESKTOP") {
        settings.alerts.desktop_enabled = v;
    }

    // ── Workflow ────────────────────────────────────────────────────
    if let Some(v) = env.string("BRIGADE_API_URL") {
        settings.workflow.api_base_url = v;
    }
    if let Some(v) = env.string("BRIGADE_API_KEY") {
        settings.workflow.api_key = Some(v);
    }
    if let Some(v) = env.u64("BRIGADE_POLL_INTERVAL_MS", 100, 600_000) {
        settings.workflow.poll_interval_ms = v;
    }
    if let Some(v) = env.u64("BRIGADE_POLL_MAX_ATTEMPTS", 1, 100_000) {
        settings.workflow.max_attempts = v as u32;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("BRIGADE_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.bool("BRIGADE_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid integer env var, ignoring");
        }
        result
    }
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;
    use crate::errors::SettingsError;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"channel": {"url": "ws://a", "heartbeatIntervalMs": 30000}});
        let source = serde_json::json!({"channel": {"url": "ws://b"}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["channel"]["url"], "ws://b");
        assert_eq!(merged["channel"]["heartbeatIntervalMs"], 30000);
    }

    #[test]
    fn merge_skips_nulls_and_replaces_arrays() {
        let target = serde_json::json!({"a": 1, "list": [1, 2, 3]});
        let source = serde_json::json!({"a": null, "list": [9]});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["list"], serde_json::json!([9]));
    }

    // ── file layer ──────────────────────────────────────────────────

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_file_layer(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, BrigadeSettings::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(
            br#"{"channel": {"url": "wss://kitchen.example/ws/notifications"}, "alerts": {"soundEnabled": false}}"#,
        )
        .unwrap();

        let settings = load_file_layer(&path).unwrap();
        assert_eq!(settings.channel.url, "wss://kitchen.example/ws/notifications");
        assert_eq!(settings.channel.reconnect_base_delay_ms, 1_000);
        assert!(!settings.alerts.sound_enabled);
        assert!(settings.alerts.desktop_enabled);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_file_layer(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn env_overrides_apply() {
        let mut settings = BrigadeSettings::default();
        apply_overrides(
            &mut settings,
            lookup(&[
                ("BRIGADE_WS_URL", "ws://10.0.0.2:8080/ws/notifications"),
                ("BRIGADE_API_KEY", "secret"),
                ("BRIGADE_POLL_MAX_ATTEMPTS", "5"),
                ("BRIGADE_ALERT_SOUND", "off"),
                ("BRIGADE_LOG_JSON", "1"),
            ]),
        );
        assert_eq!(settings.channel.url, "ws://10.0.0.2:8080/ws/notifications");
        assert_eq!(settings.workflow.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.workflow.max_attempts, 5);
        assert!(!settings.alerts.sound_enabled);
        assert!(settings.logging.json);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut settings = BrigadeSettings::default();
        apply_overrides(
            &mut settings,
            lookup(&[
                ("BRIGADE_RECONNECT_BASE_MS", "0"),
                ("BRIGADE_HEARTBEAT_MS", "soon"),
                ("BRIGADE_ALERT_DESKTOP", "maybe"),
                ("BRIGADE_API_URL", ""),
            ]),
        );
        assert_eq!(settings, BrigadeSettings::default());
    }

    #[test]
    fn parse_bool_variants() {
        for v in ["true", "TRUE", "1", "yes", "On"] {
            assert_eq!(parse_bool(v), Some(true), "{v}");
        }
        for v in ["false", "0", "no", "OFF"] {
            assert_eq!(parse_bool(v), Some(false), "{v}");
        }
        assert_eq!(parse_bool("2"), None);
    }

    #[test]
    fn parse_u64_range_bounds() {
        assert_eq!(parse_u64_range("100", 100, 200), Some(100));
        assert_eq!(parse_u64_range("201", 100, 200), None);
        assert_eq!(parse_u64_range("-1", 0, 10), None);
    }
}
