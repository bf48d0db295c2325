use log::info;
use std::{env, time::Duration};

const DEFAULT_API_BASE_URL: &str = "https://sms.turkmentv.gov.tm";
const DEFAULT_WS_BASE_URL: &str = "wss://sms.turkmentv.gov.tm";

/// The intermediary drops idle connections; the backend expects a ping
/// well inside its idle window.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub sync: SyncConfig,
}

/// Everything the live-tally synchronizer needs injected: where the push
/// channel lives and how its two timers are paced.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub ws_base_url: String,
    pub heartbeat_interval: Duration,
    pub reconnect_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ws_base_url: DEFAULT_WS_BASE_URL.to_owned(),
            heartbeat_interval: HEARTBEAT_INTERVAL,
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

impl SyncConfig {
    /// Address of the push channel scoped to one SMS short-code. Reconnects
    /// must reuse the exact same address.
    pub fn channel_url(&self, sms_number: &str) -> String {
        format!("{}/ws/voting?dst={}", self.ws_base_url, sms_number)
    }
}

impl Config {
    pub fn load() -> Self {
        Self {
            api_base_url: var_or("VOTE_API_URL", DEFAULT_API_BASE_URL),
            sync: SyncConfig {
                ws_base_url: var_or("VOTE_WS_URL", DEFAULT_WS_BASE_URL),
                ..SyncConfig::default()
            },
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{} not set, using default: {}", key, default);
        default.to_owned()
    })
}
