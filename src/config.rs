use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    // 0 disables the background scanner
    pub scan_interval_secs: u64,

    pub alerts: AlertConfig,
    pub channels: ChannelSettings,
}

/// Thresholds the evaluators and dispatcher run with.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertConfig {
    pub reward_net_threshold: f64,
    pub reward_warning_hours: f64,
    pub reward_critical_hours: f64,

    pub position_warning_health: f64,
    pub position_critical_health: f64,

    pub governance_warning_hours: f64,
    pub governance_critical_hours: f64,

    pub dispatch_batch_limit: i64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            reward_net_threshold: 10.0,
            reward_warning_hours: 24.0,
            reward_critical_hours: 12.0,
            position_warning_health: 1.2,
            position_critical_health: 1.05,
            governance_warning_hours: 24.0,
            governance_critical_hours: 12.0,
            dispatch_batch_limit: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSettings {
    // None = every configured channel
    pub filter: Option<Vec<String>>,
    pub console_enabled: bool,
    pub webhook_url: Option<String>,
    pub webhook_token: Option<String>,
    pub delivery_timeout_secs: u64,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            filter: None,
            console_enabled: true,
            webhook_url: None,
            webhook_token: None,
            delivery_timeout_secs: 10,
        }
    }
}

impl ChannelSettings {
    pub fn allows(&self, channel: &str) -> bool {
        match &self.filter {
            None => true,
            Some(names) => names.iter().any(|n| n.eq_ignore_ascii_case(channel)),
        }
    }
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    Settings::from_lookup(|key| env::var(key).ok())
}

impl Settings {
    /// Builds settings from any key/value source. Bad values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        fn parsed<T: FromStr>(raw: Option<String>, default: T) -> T {
            raw.and_then(|s| s.parse::<T>().ok()).unwrap_or(default)
        }

        // thresholds and windows: finite and >= 0, else the default
        fn amount(raw: Option<String>, default: f64) -> f64 {
            raw.and_then(|s| s.parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(default)
        }

        let defaults = AlertConfig::default();
        let alerts = AlertConfig {
            reward_net_threshold: amount(get("REWARD_NET_THRESHOLD"), defaults.reward_net_threshold),
            reward_warning_hours: amount(get("REWARD_WARNING_HOURS"), defaults.reward_warning_hours),
            reward_critical_hours: amount(get("REWARD_CRITICAL_HOURS"), defaults.reward_critical_hours),
            position_warning_health: amount(
                get("POSITION_WARNING_HEALTH"),
                defaults.position_warning_health,
            ),
            position_critical_health: amount(
                get("POSITION_CRITICAL_HEALTH"),
                defaults.position_critical_health,
            ),
            governance_warning_hours: amount(
                get("GOVERNANCE_WARNING_HOURS"),
                defaults.governance_warning_hours,
            ),
            governance_critical_hours: amount(
                get("GOVERNANCE_CRITICAL_HOURS"),
                defaults.governance_critical_hours,
            ),
            dispatch_batch_limit: parsed::<i64>(get("DISPATCH_BATCH_LIMIT"), defaults.dispatch_batch_limit)
                .max(1),
        };

        let filter = get("ALERT_CHANNELS").map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        });

        let console_enabled = get("CONSOLE_CHANNEL_ENABLED")
            .map(|v| !(v.eq_ignore_ascii_case("false") || v == "0"))
            .unwrap_or(true);

        let channels = ChannelSettings {
            filter,
            console_enabled,
            webhook_url: get("ALERT_WEBHOOK_URL"),
            webhook_token: get("ALERT_WEBHOOK_TOKEN"),
            delivery_timeout_secs: parsed(get("DELIVERY_TIMEOUT_SECS"), 10u64).max(1),
        };

        Settings {
            mongodb_uri: get("MONGODB_URI").unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
            mongodb_db: get("MONGODB_DB").unwrap_or_else(|| "defiwatch".to_string()),
            host: get("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parsed(get("PORT"), 3000),
            scan_interval_secs: parsed(get("SCAN_INTERVAL_SECS"), 300),
            alerts,
            channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_nothing_set() {
        let s = settings(&[]);
        assert_eq!(s.alerts, AlertConfig::default());
        assert_eq!(s.channels, ChannelSettings::default());
        assert_eq!(s.port, 3000);
        assert_eq!(s.scan_interval_secs, 300);
    }

    #[test]
    fn overrides_and_bad_values() {
        let s = settings(&[
            ("REWARD_NET_THRESHOLD", "25.5"),
            ("POSITION_CRITICAL_HEALTH", "not-a-number"),
            ("DISPATCH_BATCH_LIMIT", "0"),
            ("ALERT_CHANNELS", " Webhook, ,console "),
            ("ALERT_WEBHOOK_URL", "https://hooks.example/x"),
            ("CONSOLE_CHANNEL_ENABLED", "false"),
        ]);

        assert_eq!(s.alerts.reward_net_threshold, 25.5);
        assert_eq!(s.alerts.position_critical_health, 1.05);
        assert_eq!(s.alerts.dispatch_batch_limit, 1);
        assert_eq!(
            s.channels.filter,
            Some(vec!["webhook".to_string(), "console".to_string()])
        );
        assert!(s.channels.allows("WEBHOOK"));
        assert!(!s.channels.allows("slack"));
        assert!(!s.channels.console_enabled);
        assert_eq!(s.channels.webhook_url.as_deref(), Some("https://hooks.example/x"));
    }

    #[test]
    fn non_finite_and_negative_numbers_use_defaults() {
        let s = settings(&[
            ("GOVERNANCE_WARNING_HOURS", "inf"),
            ("GOVERNANCE_CRITICAL_HOURS", "NaN"),
            ("REWARD_WARNING_HOURS", "-5"),
            ("POSITION_WARNING_HEALTH", "-inf"),
            ("REWARD_NET_THRESHOLD", "0"),
        ]);

        let defaults = AlertConfig::default();
        assert_eq!(s.alerts.governance_warning_hours, defaults.governance_warning_hours);
        assert_eq!(s.alerts.governance_critical_hours, defaults.governance_critical_hours);
        assert_eq!(s.alerts.reward_warning_hours, defaults.reward_warning_hours);
        assert_eq!(s.alerts.position_warning_health, defaults.position_warning_health);
        assert_eq!(s.alerts.reward_net_threshold, 0.0);
    }
}
