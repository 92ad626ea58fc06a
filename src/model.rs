//! Records held by the stores, and the partial updates applied to them.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// How the dashboard reaches its backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Dashboard talks to a separately running API server.
    #[default]
    Standalone,
    /// Dashboard is served by the backend it talks to.
    Embedded,
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => f.write_str("standalone"),
            Self::Embedded => f.write_str("embedded"),
        }
    }
}

impl FromStr for ConnectionMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standalone" => Ok(Self::Standalone),
            "embedded" => Ok(Self::Embedded),
            other => Err(StoreError::InvalidMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub mode: ConnectionMode,
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::Standalone,
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: Some(derive_ws_url(DEFAULT_API_URL)),
        }
    }
}

impl ConnectionConfig {
    /// Shallow-merge the fields present in `patch`. `ws_url` is taken as given,
    /// never derived.
    pub fn merge(&mut self, patch: ConnectionConfigPatch) {
        if let Some(mode) = patch.mode {
            self.mode = mode;
        }
        if let Some(api_url) = patch.api_url {
            self.api_url = api_url;
        }
        if let Some(ws_url) = patch.ws_url {
            self.ws_url = ws_url;
        }
    }
}

/// Fields of a [`ConnectionConfig`] to overwrite.
///
/// `ws_url` is three-state: `None` leaves it alone, `Some(None)` clears it and
/// `Some(Some(url))` sets it. On the wire an absent `wsUrl` key is `None` and
/// an explicit `null` is `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionConfigPatch {
    pub mode: Option<ConnectionMode>,
    pub api_url: Option<String>,
    #[serde(
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub ws_url: Option<Option<String>>,
}

/// A field that is present deserializes to `Some`, even when it is `null`.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trim surrounding whitespace and trailing slashes from an API base URL.
pub fn normalize_api_url(api_url: &str) -> String {
    api_url.trim().trim_end_matches('/').to_string()
}

/// Build the WebSocket endpoint for an API base URL.
///
/// Only a leading `http://` or `https://` scheme is rewritten (to `ws://` or
/// `wss://`), so hosts that merely contain "http" are left alone. URLs without
/// one of those schemes keep their text. Trailing slashes are dropped before
/// `/ws` is appended.
pub fn derive_ws_url(api_url: &str) -> String {
    let trimmed = normalize_api_url(api_url);
    let trimmed = trimmed.as_str();

    let rewritten = if let Some(rest) = strip_scheme(trimmed, "https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = strip_scheme(trimmed, "http://") {
        format!("ws://{rest}")
    } else {
        trimmed.to_string()
    };

    format!("{rewritten}/ws")
}

fn strip_scheme<'a>(url: &'a str, scheme: &str) -> Option<&'a str> {
    let prefix = url.get(..scheme.len())?;
    prefix
        .eq_ignore_ascii_case(scheme)
        .then(|| &url[scheme.len()..])
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub connected: bool,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Lifecycle state of a scan job as reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl ScanStatus {
    /// Pending and running scans are active.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => Self::Unknown,
        })
    }
}

/// One scan job. Identity is `scan_id`; the store never deduplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub scan_id: String,
    #[serde(default)]
    pub status: ScanStatus,
    #[serde(default)]
    pub total_vulnerabilities: u64,
    #[serde(default)]
    pub critical: u64,
    #[serde(default)]
    pub high: u64,
    #[serde(default)]
    pub medium: u64,
    #[serde(default)]
    pub low: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_type: Option<String>,
    /// Percent complete, 0-100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScanRecord {
    pub fn new(scan_id: impl Into<String>, status: ScanStatus) -> Self {
        Self {
            scan_id: scan_id.into(),
            status,
            ..Self::default()
        }
    }

    /// Set the per-severity counts; the total is their sum, capped at `u64::MAX`.
    pub fn with_findings(mut self, critical: u64, high: u64, medium: u64, low: u64) -> Self {
        self.critical = critical;
        self.high = high;
        self.medium = medium;
        self.low = low;
        self.total_vulnerabilities = critical
            .saturating_add(high)
            .saturating_add(medium)
            .saturating_add(low);
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Fields of a [`ScanRecord`] to overwrite. `scan_id` is not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanPatch {
    pub status: Option<ScanStatus>,
    pub total_vulnerabilities: Option<u64>,
    pub critical: Option<u64>,
    pub high: Option<u64>,
    pub medium: Option<u64>,
    pub low: Option<u64>,
    pub target: Option<String>,
    pub scan_type: Option<String>,
    pub progress: Option<u8>,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScanPatch {
    pub fn status(status: ScanStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn apply(self, record: &mut ScanRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(total) = self.total_vulnerabilities {
            record.total_vulnerabilities = total;
        }
        if let Some(critical) = self.critical {
            record.critical = critical;
        }
        if let Some(high) = self.high {
            record.high = high;
        }
        if let Some(medium) = self.medium {
            record.medium = medium;
        }
        if let Some(low) = self.low {
            record.low = low;
        }
        if self.target.is_some() {
            record.target = self.target;
        }
        if self.scan_type.is_some() {
            record.scan_type = self.scan_type;
        }
        if self.progress.is_some() {
            record.progress = self.progress;
        }
        if self.created_at.is_some() {
            record.created_at = self.created_at;
        }
        if self.completed_at.is_some() {
            record.completed_at = self.completed_at;
        }
    }
}
