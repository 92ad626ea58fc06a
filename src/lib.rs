//! # Dashboard Signals
//!
//! Reactive client-side state for a vulnerability-scanning dashboard.
//!
//! ## Features
//!
//! - **Copy-able handles**: `Signal`, `ReadOnlySignal` and `Derived` are `Copy`
//! - **Synchronous notification**: every write reaches every observer before it returns
//! - **Derived views**: eager projections over one or more sources, chainable
//! - **Stores**: `ConnectionStore` and `ScanStore`, owned by an explicit `AppContext`
//! - **Memory safe**: generational arena prevents use-after-free without unsafe code
//!
//! Everything is single-threaded. Handles are bound to the thread that
//! created them.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dashboard_signals::prelude::*;
//!
//! let app = AppContext::new();
//! let _sub = app
//!     .connection()
//!     .status_label()
//!     .subscribe(|label| println!("link: {label}"));
//!
//! app.connection().set_connected(true);
//! app.scans().add_scan(ScanRecord::new("scan-1", ScanStatus::Running));
//! assert_eq!(app.scans().active_scan_count().get(), 1);
//! ```

#![forbid(unsafe_code)]

mod clock;
mod computed;
mod connection;
mod context;
mod error;
mod model;
mod scans;
mod settings;
mod signal;
mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use computed::Derived;
pub use connection::{status_label, ConnectionStore};
pub use context::AppContext;
pub use error::{Result, StoreError};
pub use model::{
    derive_ws_url, ConnectionConfig, ConnectionConfigPatch, ConnectionMode, ConnectionStatus,
    ScanPatch, ScanRecord, ScanStatus, DEFAULT_API_URL,
};
pub use scans::{ScanCollectionState, ScanStats, ScanStore, RECENT_SCAN_LIMIT};
pub use settings::{DashboardSettings, API_URL_VAR, MODE_VAR, WS_URL_VAR};
pub use signal::{ReadOnlySignal, Readable, Signal, Subscription};
pub use storage::{live_signal_count, SignalId, SubscriberId};

// Re-export the prelude
pub mod prelude {
    pub use crate::{
        AppContext, ConnectionMode, Derived, ReadOnlySignal, Readable, ScanPatch, ScanRecord,
        ScanStatus, Signal, Subscription,
    };
}
