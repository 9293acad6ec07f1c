//! TOML-backed daemon configuration (§6). Every field is optional and
//! defaults to the constant of the same name in `consts`; the config
//! file itself is optional too (CLI flag), matching the teacher's
//! `Config::default()` fallback pattern.

use std::time::Duration;

use serde_derive::Deserialize;

use crate::consts;

#[derive(Deserialize, Default)]
pub struct Config {
    /// Equivalent to the reference `NetconfSocket <path>` directive.
    pub socket: Option<String>,
    pub activity_check_interval_secs: Option<u64>,
    pub activity_timeout_secs: Option<u64>,
    pub shutdown_join_deadline_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn socket_path(&self) -> &str {
        self.socket.as_deref().unwrap_or(consts::DEFAULT_SOCKET_PATH)
    }

    pub fn activity_check_interval(&self) -> Duration {
        self.activity_check_interval_secs.map(Duration::from_secs).unwrap_or(consts::ACTIVITY_CHECK_INTERVAL)
    }

    pub fn activity_timeout(&self) -> Duration {
        self.activity_timeout_secs.map(Duration::from_secs).unwrap_or(consts::ACTIVITY_TIMEOUT)
    }

    pub fn shutdown_join_deadline(&self) -> Duration {
        self.shutdown_join_deadline_secs.map(Duration::from_secs).unwrap_or(consts::SHUTDOWN_JOIN_DEADLINE)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_consts_when_file_is_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.socket_path(), consts::DEFAULT_SOCKET_PATH);
        assert_eq!(config.activity_timeout(), consts::ACTIVITY_TIMEOUT);
    }

    #[test]
    fn overrides_apply() {
        let config: Config = toml::from_str(
            "socket = \"/tmp/custom.sock\"\nactivity_timeout_secs = 60",
        )
        .unwrap();
        assert_eq!(config.socket_path(), "/tmp/custom.sock");
        assert_eq!(config.activity_timeout(), Duration::from_secs(60));
    }
}
