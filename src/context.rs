//! Composition root owning one instance of each store.

use crate::clock::{Clock, SystemClock};
use crate::connection::ConnectionStore;
use crate::scans::ScanStore;
use crate::settings::DashboardSettings;
use std::rc::Rc;
use tracing::debug;

/// The dashboard's stores, built once and handed to whatever needs them.
///
/// Nothing here is global: create one context per app (or per test) and pass
/// it, or the individual stores, to the UI and transport layers.
///
/// ```rust,no_run
/// use dashboard_signals::prelude::*;
///
/// let app = AppContext::new();
/// let _sub = app.scans().scan_stats().subscribe(|stats| println!("{stats:?}"));
/// app.connection().set_api_url("https://scanner.local");
/// ```
#[derive(Debug, Clone)]
pub struct AppContext {
    connection: ConnectionStore,
    scans: ScanStore,
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AppContext {
    /// Default settings on the system clock.
    pub fn new() -> Self {
        Self::with_settings(DashboardSettings::default(), Rc::new(SystemClock))
    }

    pub fn with_clock(clock: Rc<dyn Clock>) -> Self {
        Self::with_settings(DashboardSettings::default(), clock)
    }

    pub fn with_settings(settings: DashboardSettings, clock: Rc<dyn Clock>) -> Self {
        debug!(
            mode = %settings.connection.mode,
            api_url = %settings.connection.api_url,
            "dashboard context created"
        );
        Self {
            connection: ConnectionStore::new(settings.connection, clock),
            scans: ScanStore::new(),
        }
    }

    pub fn connection(&self) -> &ConnectionStore {
        &self.connection
    }

    pub fn scans(&self) -> &ScanStore {
        &self.scans
    }

    /// Free every cell the stores own.
    pub fn dispose(self) {
        self.connection.dispose();
        self.scans.dispose();
    }
}
