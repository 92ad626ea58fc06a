//! Console dashboard fed by a simulated transport.
//!
//! This example shows:
//! - Building the stores from `DASHBOARD_*` environment settings
//! - Rendering from derived views through subscriptions
//! - Feeding the stores from JSON events the way a WebSocket client would
//! - Draining a change stream from async code
//!
//! Run with: RUST_LOG=dashboard_signals=debug cargo run --example dashboard

use dashboard_signals::prelude::*;
use dashboard_signals::{DashboardSettings, ScanStats, SystemClock};
use futures::executor::block_on;
use futures::StreamExt;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Event {
    ScanCreated { scan: ScanRecord },
    ScanUpdated { scan_id: String, patch: ScanPatch },
    ScanDeleted { scan_id: String },
    Error { message: String },
}

const EVENTS: &[&str] = &[
    r#"{"type":"scan_created","scan":{"scan_id":"s-1","status":"running","target":"10.0.0.0/24"}}"#,
    r#"{"type":"scan_created","scan":{"scan_id":"s-2","status":"pending","target":"db.internal"}}"#,
    r#"{"type":"scan_updated","scan_id":"s-1","patch":{"status":"completed","total_vulnerabilities":7,"critical":1,"high":2,"medium":3,"low":1}}"#,
    r#"{"type":"scan_updated","scan_id":"s-9","patch":{"status":"failed"}}"#,
    r#"{"type":"scan_updated","scan_id":"s-2","patch":{"status":"failed"}}"#,
    r#"{"type":"scan_deleted","scan_id":"s-2"}"#,
    r#"{"type":"error","message":"websocket closed"}"#,
];

fn render_stats(stats: &ScanStats) {
    println!(
        "[scans] {} total, {} active, {} completed, {} failed | vulns {} (C{} H{} M{} L{})",
        stats.total,
        stats.active,
        stats.completed,
        stats.failed,
        stats.total_vulnerabilities,
        stats.critical,
        stats.high,
        stats.medium,
        stats.low,
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = DashboardSettings::from_env()?;
    let app = AppContext::with_settings(settings, Rc::new(SystemClock));
    let connection = app.connection();
    let scans = app.scans();

    let _label = connection
        .status_label()
        .subscribe(|label| println!("[link] {label}"));
    let _stats = scans.scan_stats().subscribe(render_stats);
    let labels = connection.status_label().changes();

    println!("[config] {:?}", connection.config().get());
    connection.set_connected(true);
    connection.set_synced();

    for raw in EVENTS {
        match serde_json::from_str::<Event>(raw)? {
            Event::ScanCreated { scan } => scans.add_scan(scan),
            Event::ScanUpdated { scan_id, patch } => {
                if let Err(err) = scans.update_scan(&scan_id, patch) {
                    println!("[transport] {err}");
                }
            }
            Event::ScanDeleted { scan_id } => scans.remove_scan(&scan_id),
            Event::Error { message } => {
                connection.set_error(Some(message));
                connection.set_connected(false);
            }
        }
    }

    let history: Vec<String> = block_on(labels.take(4).collect());
    println!("[history] {}", history.join(" -> "));

    for scan in scans.recent_scans().get() {
        println!("[recent] {} {} {:?}", scan.scan_id, scan.status, scan.target);
    }

    app.dispose();
    Ok(())
}
