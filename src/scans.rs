//! Scan job collection with derived counts and statistics.

use crate::computed::Derived;
use crate::error::{Result, StoreError};
use crate::model::{ScanPatch, ScanRecord, ScanStatus};
use crate::signal::{ReadOnlySignal, Signal};
use std::fmt;
use tracing::{debug, trace};

/// How many scans [`ScanStore::recent_scans`] shows.
pub const RECENT_SCAN_LIMIT: usize = 10;

/// Everything the scan store holds.
///
/// `active_scans` is a materialized cache of the pending and running entries
/// of `scans`, in the same order. The store's mutators keep it in step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanCollectionState {
    pub scans: Vec<ScanRecord>,
    pub active_scans: Vec<ScanRecord>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ScanCollectionState {
    fn refresh_active(&mut self) {
        self.active_scans = active_subset(&self.scans);
    }
}

fn active_subset(scans: &[ScanRecord]) -> Vec<ScanRecord> {
    scans.iter().filter(|scan| scan.is_active()).cloned().collect()
}

fn with_status(scans: &[ScanRecord], status: ScanStatus) -> Vec<ScanRecord> {
    scans
        .iter()
        .filter(|scan| scan.status == status)
        .cloned()
        .collect()
}

/// Aggregates over every scan in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub total_vulnerabilities: u64,
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

impl ScanStats {
    /// Single pass over `scans`.
    pub fn collect(scans: &[ScanRecord]) -> Self {
        scans.iter().fold(Self::default(), |mut stats, scan| {
            stats.total += 1;
            match scan.status {
                ScanStatus::Pending | ScanStatus::Running => stats.active += 1,
                ScanStatus::Completed => stats.completed += 1,
                ScanStatus::Failed => stats.failed += 1,
                ScanStatus::Cancelled | ScanStatus::Unknown => {}
            }
            stats.total_vulnerabilities = stats
                .total_vulnerabilities
                .saturating_add(scan.total_vulnerabilities);
            stats.critical = stats.critical.saturating_add(scan.critical);
            stats.high = stats.high.saturating_add(scan.high);
            stats.medium = stats.medium.saturating_add(scan.medium);
            stats.low = stats.low.saturating_add(scan.low);
            stats
        })
    }
}

/// The scan collection plus its derived views.
///
/// All views hang off the single state cell, so each mutator triggers exactly
/// one recomputation of each view.
#[derive(Clone, Copy)]
pub struct ScanStore {
    state: Signal<ScanCollectionState>,
    active_scan_count: Derived<usize>,
    completed_scans: Derived<Vec<ScanRecord>>,
    failed_scans: Derived<Vec<ScanRecord>>,
    recent_scans: Derived<Vec<ScanRecord>>,
    scan_stats: Derived<ScanStats>,
}

impl Default for ScanStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanStore {
    pub fn new() -> Self {
        let state = Signal::new(ScanCollectionState::default());

        Self {
            state,
            active_scan_count: Derived::new(&state, |s| s.active_scans.len()),
            completed_scans: Derived::new(&state, |s| with_status(&s.scans, ScanStatus::Completed)),
            failed_scans: Derived::new(&state, |s| with_status(&s.scans, ScanStatus::Failed)),
            recent_scans: Derived::new(&state, |s| {
                s.scans.iter().take(RECENT_SCAN_LIMIT).cloned().collect()
            }),
            scan_stats: Derived::new(&state, |s| {
                let mut stats = ScanStats::collect(&s.scans);
                stats.active = s.active_scans.len();
                stats
            }),
        }
    }

    pub fn state(&self) -> ReadOnlySignal<ScanCollectionState> {
        self.state.read_only()
    }

    pub fn active_scan_count(&self) -> Derived<usize> {
        self.active_scan_count
    }

    pub fn completed_scans(&self) -> Derived<Vec<ScanRecord>> {
        self.completed_scans
    }

    pub fn failed_scans(&self) -> Derived<Vec<ScanRecord>> {
        self.failed_scans
    }

    /// The first [`RECENT_SCAN_LIMIT`] scans, newest first.
    pub fn recent_scans(&self) -> Derived<Vec<ScanRecord>> {
        self.recent_scans
    }

    pub fn scan_stats(&self) -> Derived<ScanStats> {
        self.scan_stats
    }

    /// Look up a scan by id.
    pub fn get_scan(&self, scan_id: &str) -> Option<ScanRecord> {
        self.state
            .with(|state| state.scans.iter().find(|scan| scan.scan_id == scan_id).cloned())
    }

    /// Replace the whole list. Clears `loading` and `error`.
    pub fn set_scans(&self, scans: Vec<ScanRecord>) {
        debug!(count = scans.len(), "scan list replaced");
        self.state.update(|state| {
            state.scans = scans;
            state.refresh_active();
            state.loading = false;
            state.error = None;
        });
    }

    /// Insert a scan at the front of the list.
    pub fn add_scan(&self, scan: ScanRecord) {
        debug!(scan_id = %scan.scan_id, status = %scan.status, "scan added");
        self.state.update(|state| {
            if scan.is_active() {
                state.active_scans.insert(0, scan.clone());
            }
            state.scans.insert(0, scan);
        });
    }

    /// Merge `patch` into the scan with the given id.
    ///
    /// If nothing matches, the state is untouched, no observer is notified and
    /// [`StoreError::ScanNotFound`] is returned. When duplicate ids exist, every
    /// match is patched.
    pub fn update_scan(&self, scan_id: &str, patch: ScanPatch) -> Result<()> {
        let found = self
            .state
            .with(|state| state.scans.iter().any(|scan| scan.scan_id == scan_id));
        if !found {
            debug!(%scan_id, "update for unknown scan ignored");
            return Err(StoreError::ScanNotFound(scan_id.to_string()));
        }

        trace!(%scan_id, ?patch, "scan updated");
        self.state.update(|state| {
            for scan in state.scans.iter_mut().filter(|scan| scan.scan_id == scan_id) {
                patch.clone().apply(scan);
            }
            state.refresh_active();
        });
        Ok(())
    }

    /// Remove every scan with the given id. Unknown ids are a no-op.
    pub fn remove_scan(&self, scan_id: &str) {
        debug!(%scan_id, "scan removed");
        self.state.update(|state| {
            state.scans.retain(|scan| scan.scan_id != scan_id);
            state.active_scans.retain(|scan| scan.scan_id != scan_id);
        });
    }

    pub fn set_loading(&self, loading: bool) {
        trace!(loading, "scan loading flag");
        self.state.update(|state| state.loading = loading);
    }

    /// Record or clear an error. Always ends loading.
    pub fn set_error(&self, error: Option<String>) {
        if let Some(message) = &error {
            debug!(%message, "scan store error");
        }
        self.state.update(|state| {
            state.error = error;
            state.loading = false;
        });
    }

    /// Back to the empty initial state.
    pub fn clear(&self) {
        debug!("scan store cleared");
        self.state.set(ScanCollectionState::default());
    }

    /// Free the state cell and every view.
    pub fn dispose(self) {
        self.active_scan_count.dispose();
        self.completed_scans.dispose();
        self.failed_scans.dispose();
        self.recent_scans.dispose();
        self.scan_stats.dispose();
        self.state.dispose();
    }
}

impl fmt::Debug for ScanStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanStore")
            .field("stats", &self.scan_stats.get())
            .finish_non_exhaustive()
    }
}
