//! Backend link configuration and status.

use crate::clock::Clock;
use crate::computed::Derived;
use crate::model::{
    derive_ws_url, normalize_api_url, ConnectionConfig, ConnectionConfigPatch, ConnectionMode,
    ConnectionStatus,
};
use crate::signal::{ReadOnlySignal, Signal};
use chrono::{DateTime, Utc};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Holds the connection config and status cells, plus the status label view.
///
/// The label depends on the status and on a `now` cell refreshed by
/// [`ConnectionStore::tick`], so a "Last sync 2m ago" label ages only when the
/// caller ticks.
#[derive(Clone)]
pub struct ConnectionStore {
    config: Signal<ConnectionConfig>,
    status: Signal<ConnectionStatus>,
    now: Signal<DateTime<Utc>>,
    status_label: Derived<String>,
    clock: Rc<dyn Clock>,
}

impl ConnectionStore {
    pub fn new(config: ConnectionConfig, clock: Rc<dyn Clock>) -> Self {
        let config = Signal::new(config);
        let status = Signal::new(ConnectionStatus::default());
        let now = Signal::new(clock.now());
        let label = Derived::from2(&status, &now, |status, now| status_label(status, *now));

        Self {
            config,
            status,
            now,
            status_label: label,
            clock,
        }
    }

    pub fn config(&self) -> ReadOnlySignal<ConnectionConfig> {
        self.config.read_only()
    }

    pub fn status(&self) -> ReadOnlySignal<ConnectionStatus> {
        self.status.read_only()
    }

    pub fn status_label(&self) -> Derived<String> {
        self.status_label
    }

    /// Replace the whole config as given, `ws_url` included.
    pub fn replace_config(&self, config: ConnectionConfig) {
        debug!(mode = %config.mode, api_url = %config.api_url, "connection config replaced");
        self.config.set(config);
    }

    /// Shallow-merge fields into the config. `ws_url` is not re-derived.
    pub fn set_config(&self, patch: ConnectionConfigPatch) {
        trace!(?patch, "merging connection config");
        self.config.update(|config| config.merge(patch));
    }

    pub fn set_mode(&self, mode: ConnectionMode) {
        debug!(%mode, "connection mode changed");
        self.config.update(|config| config.mode = mode);
    }

    /// Set the API URL and point the WebSocket URL at its `/ws` endpoint.
    ///
    /// Surrounding whitespace and trailing slashes are dropped from the stored
    /// API URL, the same as from the derived WebSocket URL.
    pub fn set_api_url(&self, url: impl AsRef<str>) {
        let api_url = normalize_api_url(url.as_ref());
        let ws_url = derive_ws_url(&api_url);
        debug!(%api_url, %ws_url, "api url changed");
        self.config.update(|config| {
            config.api_url = api_url;
            config.ws_url = Some(ws_url);
        });
    }

    /// Leaves any recorded error in place.
    pub fn set_connected(&self, connected: bool) {
        debug!(connected, "connection state changed");
        self.status.update(|status| status.connected = connected);
    }

    /// Record or clear an error. `connected` is left as it is.
    pub fn set_error(&self, error: Option<String>) {
        match &error {
            Some(message) => debug!(%message, "connection error"),
            None => trace!("connection error cleared"),
        }
        self.status.update(|status| status.error = error);
    }

    /// Stamp a successful sync and clear any error.
    pub fn set_synced(&self) {
        let at = self.clock.now();
        trace!(%at, "synced");
        self.status.update(|status| {
            status.last_sync = Some(at);
            status.error = None;
        });
    }

    /// Refresh the label's notion of now from the clock.
    pub fn tick(&self) {
        self.now.set(self.clock.now());
    }

    /// Free every cell owned by the store.
    pub fn dispose(self) {
        self.status_label.dispose();
        self.now.dispose();
        self.status.dispose();
        self.config.dispose();
    }
}

impl fmt::Debug for ConnectionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionStore")
            .field("config", &self.config)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Human-readable connection state.
///
/// An error wins over everything, then a disconnected link. A connected link
/// reports how long ago it last synced once that exceeds a minute, in whole
/// minutes below an hour and whole hours above.
pub fn status_label(status: &ConnectionStatus, now: DateTime<Utc>) -> String {
    if let Some(error) = &status.error {
        return format!("Error: {error}");
    }
    if !status.connected {
        return "Disconnected".to_string();
    }
    let Some(last_sync) = status.last_sync else {
        return "Connected".to_string();
    };

    let elapsed = (now - last_sync).num_seconds();
    if elapsed < 60 {
        "Connected".to_string()
    } else if elapsed < 3600 {
        format!("Last sync {}m ago", elapsed / 60)
    } else {
        format!("Last sync {}h ago", elapsed / 3600)
    }
}
