//! Simulation and benchmark runners wiring chefs, sweeper, and reporter.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::chef::Chef;
use crate::config::KitchenConfig;
use crate::kitchen::{KitchenPool, ResourceSnapshot};
use crate::reporter::run_reporter;
use crate::sweeper::MaintenanceSweeper;
use crate::types::ResourceType;

// Default wall-clock run lengths.
const DEMO_RUN_MS: u64 = 3000;
const BENCH_RUN_MS: u64 = 2000;
const BENCH_UNIT_MS: u64 = 10;

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    use libc::{RUSAGE_SELF, getrusage, rusage};
    let mut usage = rusage {
        ru_utime: libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        },
        ru_stime: libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        },
        ru_maxrss: 0,
        ru_ixrss: 0,
        ru_idrss: 0,
        ru_isrss: 0,
        ru_minflt: 0,
        ru_majflt: 0,
        ru_nswap: 0,
        ru_inblock: 0,
        ru_oublock: 0,
        ru_msgsnd: 0,
        ru_msgrcv: 0,
        ru_nsignals: 0,
        ru_nvcsw: 0,
        ru_nivcsw: 0,
    };
    let rc = unsafe { getrusage(RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return None;
    }
    let user = usage.ru_utime.tv_sec as f64 + (usage.ru_utime.tv_usec as f64 / 1_000_000.0);
    let sys = usage.ru_stime.tv_sec as f64 + (usage.ru_stime.tv_usec as f64 / 1_000_000.0);
    Some((user, sys))
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

/// Independent witness of the mutual-exclusion property: counters bumped
/// around acquire/release, outside the pool's own locking.
pub struct ExclusivityAudit {
    per_resource: [AtomicUsize; ResourceType::COUNT],
    held_total: AtomicUsize,
    max_held: AtomicUsize,
    violation: AtomicBool,
}

impl ExclusivityAudit {
    pub fn new() -> Self {
        Self {
            per_resource: std::array::from_fn(|_| AtomicUsize::new(0)),
            held_total: AtomicUsize::new(0),
            max_held: AtomicUsize::new(0),
            violation: AtomicBool::new(false),
        }
    }

    pub fn enter(&self, resource: ResourceType) {
        let holders = self.per_resource[resource.index()].fetch_add(1, Ordering::SeqCst) + 1;
        if holders > 1 {
            self.violation.store(true, Ordering::SeqCst);
        }
        let current = self.held_total.fetch_add(1, Ordering::SeqCst) + 1;
        let mut prev = self.max_held.load(Ordering::SeqCst);
        while current > prev {
            match self
                .max_held
                .compare_exchange(prev, current, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => break,
                Err(next) => prev = next,
            }
        }
    }

    pub fn exit(&self, resource: ResourceType) {
        let holders = self.per_resource[resource.index()].fetch_sub(1, Ordering::SeqCst);
        debug_assert!(holders > 0, "audit underflow for {resource}");
        let total = self.held_total.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(total > 0, "audit total underflow");
    }

    /// Highest number of resources held at once across the whole run.
    pub fn max_held(&self) -> usize {
        self.max_held.load(Ordering::SeqCst)
    }

    pub fn has_violation(&self) -> bool {
        self.violation.load(Ordering::SeqCst)
    }
}

/// Aggregated results of one bounded kitchen run.
struct KitchenOutcome {
    meals_per_chef: Vec<u64>,
    failures_per_chef: Vec<u64>,
    total_meals: u64,
    total_failures: u64,
    cleaned: u64,
    repaired: u64,
    max_held: usize,
    violation: bool,
    elapsed: Duration,
    cpu_user_s: Option<f64>,
    cpu_sys_s: Option<f64>,
    final_snapshots: Vec<ResourceSnapshot>,
}

/// Spawn the full cast, let it run for `run_for`, then stop and join.
fn run_kitchen(config: KitchenConfig, run_for: Duration) -> KitchenOutcome {
    let config = Arc::new(config);
    let pool = Arc::new(KitchenPool::new());
    let stop = Arc::new(AtomicBool::new(false));
    let audit = Arc::new(ExclusivityAudit::new());
    let sweeper = Arc::new(MaintenanceSweeper::new());

    let chefs: Vec<Arc<Chef>> = (0..config.chefs)
        .map(|id| Arc::new(Chef::from_config(id as u64, &config)))
        .collect();

    let cpu_start = cpu_times_seconds();
    let start = Instant::now();

    let mut chef_threads = Vec::new();
    for chef in &chefs {
        let chef = Arc::clone(chef);
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);
        let stop = Arc::clone(&stop);
        let audit = Arc::clone(&audit);
        let handle = thread::Builder::new()
            .name(format!("chef-{}", chef.id))
            .spawn(move || chef.run(&pool, &config, &stop, Some(audit.as_ref())))
            .expect("failed to spawn chef thread");
        chef_threads.push(handle);
    }

    let sweeper_thread = {
        let sweeper = Arc::clone(&sweeper);
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);
        let stop = Arc::clone(&stop);
        thread::Builder::new()
            .name("sweeper".to_string())
            .spawn(move || sweeper.run(&pool, &config, &stop))
            .expect("failed to spawn sweeper thread")
    };

    let reporter_thread = {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);
        let stop = Arc::clone(&stop);
        thread::Builder::new()
            .name("reporter".to_string())
            .spawn(move || run_reporter(&pool, &config, &stop))
            .expect("failed to spawn reporter thread")
    };

    thread::sleep(run_for);
    stop.store(true, Ordering::SeqCst);

    for handle in chef_threads {
        handle.join().expect("chef thread panicked");
    }
    sweeper_thread.join().expect("sweeper thread panicked");
    reporter_thread.join().expect("reporter thread panicked");

    let elapsed = start.elapsed();
    let (cpu_user_s, cpu_sys_s) = match (cpu_start, cpu_times_seconds()) {
        (Some((user_start, sys_start)), Some((user_end, sys_end))) => {
            (Some(user_end - user_start), Some(sys_end - sys_start))
        }
        _ => (None, None),
    };

    KitchenOutcome {
        meals_per_chef: chefs.iter().map(|chef| chef.successes()).collect(),
        failures_per_chef: chefs.iter().map(|chef| chef.failures()).collect(),
        total_meals: pool.total_meals_prepared(),
        total_failures: pool.total_failures(),
        cleaned: sweeper.cleaned(),
        repaired: sweeper.repaired(),
        max_held: audit.max_held(),
        violation: audit.has_violation(),
        elapsed,
        cpu_user_s,
        cpu_sys_s,
        final_snapshots: pool.snapshot(),
    }
}

/// Run the demo kitchen with scaled-down timings and print a summary.
pub fn run_demo(chefs: Option<usize>, run_ms: Option<u64>) {
    let mut config = KitchenConfig::demo();
    if let Some(chefs) = chefs {
        config.chefs = chefs;
    }
    let run_for = Duration::from_millis(run_ms.unwrap_or(DEMO_RUN_MS));
    tracing::info!(chefs = config.chefs, ?run_for, "demo start");

    let outcome = run_kitchen(config, run_for);

    println!("DEMO SUMMARY");
    println!(
        "meals_total={} failures_total={}",
        outcome.total_meals, outcome.total_failures
    );
    println!("meals_per_chef={:?}", outcome.meals_per_chef);
    println!("failures_per_chef={:?}", outcome.failures_per_chef);
    println!(
        "cleaned={} repaired={}",
        outcome.cleaned, outcome.repaired
    );
    println!("max_resources_held={}", outcome.max_held);
    println!("exclusivity_violation={}", outcome.violation);
    for snap in &outcome.final_snapshots {
        println!(
            "final: {}: {} (Quality: {}%, Usage: {})",
            snap.resource, snap.state, snap.quality, snap.usage_count
        );
    }
}

/// Run a throughput benchmark and print one CSV row.
pub fn run_bench(
    chefs: Option<usize>,
    run_ms: Option<u64>,
    unit_ms: Option<u64>,
    validate: bool,
) {
    let chefs = chefs.unwrap_or(10);
    let run_ms = run_ms.unwrap_or(BENCH_RUN_MS);
    let unit_ms = unit_ms.unwrap_or(BENCH_UNIT_MS);
    if chefs == 0 {
        eprintln!("bench error: chefs must be > 0");
        return;
    }
    if unit_ms == 0 {
        eprintln!("bench error: unit_ms must be > 0");
        return;
    }

    let config = KitchenConfig {
        chefs,
        time_unit: Duration::from_millis(unit_ms),
        ..KitchenConfig::default()
    };
    let outcome = run_kitchen(config, Duration::from_millis(run_ms));

    let elapsed_s = outcome.elapsed.as_secs_f64();
    let meals_per_s = if elapsed_s > 0.0 {
        outcome.total_meals as f64 / elapsed_s
    } else {
        0.0
    };
    let cpu_user = outcome
        .cpu_user_s
        .map(|v| format!("{v:.4}"))
        .unwrap_or_else(|| "NA".to_string());
    let cpu_sys = outcome
        .cpu_sys_s
        .map(|v| format!("{v:.4}"))
        .unwrap_or_else(|| "NA".to_string());

    println!(
        "chefs,run_ms,unit_ms,total_meals,meals_per_s,total_failures,cleaned,repaired,cpu_user_s,cpu_sys_s,max_held,exclusivity_violation"
    );
    println!(
        "{},{},{},{},{:.2},{},{},{},{},{},{},{}",
        chefs,
        run_ms,
        unit_ms,
        outcome.total_meals,
        meals_per_s,
        outcome.total_failures,
        outcome.cleaned,
        outcome.repaired,
        cpu_user,
        cpu_sys,
        outcome.max_held,
        outcome.violation
    );
    if validate && outcome.violation {
        eprintln!("# violation,resource_exclusivity");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_tracks_holders_and_flags_double_entry() {
        let audit = ExclusivityAudit::new();
        audit.enter(ResourceType::Stove);
        audit.enter(ResourceType::Knife);
        assert_eq!(audit.max_held(), 2);
        assert!(!audit.has_violation());

        audit.enter(ResourceType::Stove);
        assert!(audit.has_violation());

        audit.exit(ResourceType::Stove);
        audit.exit(ResourceType::Stove);
        audit.exit(ResourceType::Knife);
        // The violation stays latched for the end-of-run verdict.
        assert!(audit.has_violation());
    }

    #[test]
    fn contended_kitchen_makes_progress_without_violations() {
        // All ten reference chefs, with needs overlapping pairwise, against
        // the full pool. Canonical ordering must keep them deadlock-free and
        // making progress for the whole bounded run.
        let config = KitchenConfig {
            time_unit: Duration::from_millis(2),
            ..KitchenConfig::default()
        };
        let outcome = run_kitchen(config, Duration::from_millis(500));

        assert!(outcome.total_meals > 0, "no progress made");
        assert!(!outcome.violation);
        assert!(outcome.max_held >= 2, "a meal requires holding two resources");
        let per_chef: u64 = outcome.meals_per_chef.iter().sum();
        assert_eq!(per_chef, outcome.total_meals);
    }

    #[test]
    fn stopped_kitchen_leaves_nothing_in_use() {
        let config = KitchenConfig {
            chefs: 4,
            time_unit: Duration::from_millis(2),
            ..KitchenConfig::default()
        };
        let outcome = run_kitchen(config, Duration::from_millis(200));
        for snap in &outcome.final_snapshots {
            assert_ne!(
                snap.state,
                crate::types::ResourceState::InUse,
                "{} still held after join",
                snap.resource
            );
        }
    }
}
