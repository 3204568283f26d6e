//! Periodic read-only status reports of the whole pool.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::chef::sleep_with_stop;
use crate::config::KitchenConfig;
use crate::kitchen::{KitchenPool, ResourceSnapshot};

/// Render one status block in the reference kitchen's layout.
pub fn format_report(snapshots: &[ResourceSnapshot]) -> String {
    let mut out = String::new();
    out.push_str("======= Kitchen Resource Status Report =======\n");
    for snap in snapshots {
        let _ = writeln!(
            out,
            "{}: {} (Quality: {}%, Usage: {})",
            snap.resource, snap.state, snap.quality, snap.usage_count
        );
    }
    out.push_str("==============================================");
    out
}

/// Perpetual loop: sleep the interval, then snapshot the pool under the
/// pool-wide guard and emit the block to the log sink. Strictly read-only.
pub fn run_reporter(pool: &KitchenPool, config: &KitchenConfig, stop: &AtomicBool) {
    let interval = config.scaled(config.report_interval);
    loop {
        sleep_with_stop(stop, interval);
        if stop.load(Ordering::SeqCst) {
            return;
        }
        let snapshots = pool.with_pool_guard(|| pool.snapshot());
        tracing::info!("\n{}", format_report(&snapshots));
    }
}
