//! Startup settings read from the environment.

use crate::error::{Result, StoreError};
use crate::model::{derive_ws_url, normalize_api_url, ConnectionConfig, ConnectionMode};

pub const MODE_VAR: &str = "DASHBOARD_MODE";
pub const API_URL_VAR: &str = "DASHBOARD_API_URL";
pub const WS_URL_VAR: &str = "DASHBOARD_WS_URL";

/// Initial values for the stores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardSettings {
    pub connection: ConnectionConfig,
}

impl DashboardSettings {
    /// Overlay `DASHBOARD_*` environment variables on the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`DashboardSettings::from_env`], reading variables through `lookup`.
    ///
    /// Without an explicit WebSocket URL, one is derived from the API URL.
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut connection = ConnectionConfig::default();

        if let Some(mode) = var(MODE_VAR) {
            connection.mode = mode
                .parse::<ConnectionMode>()
                .map_err(|err| StoreError::Config {
                    key: MODE_VAR.to_string(),
                    message: err.to_string(),
                })?;
        }

        if let Some(api_url) = var(API_URL_VAR) {
            let api_url = normalize_api_url(&api_url);
            if api_url.contains(char::is_whitespace) {
                return Err(StoreError::Config {
                    key: API_URL_VAR.to_string(),
                    message: format!("url contains whitespace: {api_url:?}"),
                });
            }
            connection.ws_url = Some(derive_ws_url(&api_url));
            connection.api_url = api_url;
        }

        if let Some(ws_url) = var(WS_URL_VAR) {
            connection.ws_url = Some(ws_url.trim().to_string());
        }

        Ok(Self { connection })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let settings = DashboardSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, DashboardSettings::default());
    }

    #[test]
    fn test_api_url_derives_ws_url() {
        let settings = DashboardSettings::from_lookup(lookup(&[
            (MODE_VAR, "embedded"),
            (API_URL_VAR, "https://scanner.corp:8443"),
        ]))
        .unwrap();

        assert_eq!(settings.connection.mode, ConnectionMode::Embedded);
        assert_eq!(settings.connection.api_url, "https://scanner.corp:8443");
        assert_eq!(
            settings.connection.ws_url.as_deref(),
            Some("wss://scanner.corp:8443/ws")
        );
    }

    #[test]
    fn test_api_url_trailing_slash_dropped() {
        let settings =
            DashboardSettings::from_lookup(lookup(&[(API_URL_VAR, " http://scanner:8080/ ")]))
                .unwrap();

        assert_eq!(settings.connection.api_url, "http://scanner:8080");
        assert_eq!(settings.connection.ws_url.as_deref(), Some("ws://scanner:8080/ws"));
    }

    #[test]
    fn test_explicit_ws_url_wins() {
        let settings = DashboardSettings::from_lookup(lookup(&[
            (API_URL_VAR, "http://a:1"),
            (WS_URL_VAR, "ws://b:2/events"),
        ]))
        .unwrap();
        assert_eq!(settings.connection.ws_url.as_deref(), Some("ws://b:2/events"));
    }

    #[test]
    fn test_bad_mode_is_config_error() {
        let err = DashboardSettings::from_lookup(lookup(&[(MODE_VAR, "cloud")])).unwrap_err();
        assert_eq!(
            err,
            StoreError::Config {
                key: MODE_VAR.to_string(),
                message: "invalid connection mode: cloud".to_string(),
            }
        );
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let settings =
            DashboardSettings::from_lookup(lookup(&[(API_URL_VAR, "  "), (MODE_VAR, "")])).unwrap();
        assert_eq!(settings, DashboardSettings::default());
    }
}
