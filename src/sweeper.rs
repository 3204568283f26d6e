//! Background maintenance: cleaning and repairing degraded resources.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::chef::sleep_with_stop;
use crate::config::KitchenConfig;
use crate::kitchen::KitchenPool;
use crate::types::{ResourceState, ResourceType};

/// The only component that moves a resource out of `NeedsCleaning`/`Broken`.
pub struct MaintenanceSweeper {
    cleaned: AtomicU64,
    repaired: AtomicU64,
}

impl MaintenanceSweeper {
    pub fn new() -> Self {
        Self {
            cleaned: AtomicU64::new(0),
            repaired: AtomicU64::new(0),
        }
    }

    /// One scan over the pool, servicing every flagged resource. Callers
    /// wrap this in the pool-wide guard so sweeps and status reports are
    /// serialized against each other.
    pub fn sweep(&self, pool: &KitchenPool, config: &KitchenConfig, stop: &AtomicBool) {
        for resource in ResourceType::ALL {
            if stop.load(Ordering::SeqCst) {
                return;
            }
            match pool.snapshot_of(resource).state {
                ResourceState::NeedsCleaning => {
                    if pool.clean(resource, config.scaled(config.cleaning_time)) {
                        self.cleaned.fetch_add(1, Ordering::SeqCst);
                        tracing::info!(%resource, "cleaned");
                    }
                }
                ResourceState::Broken => {
                    if pool.repair(resource, config.scaled(config.maintenance_time)) {
                        self.repaired.fetch_add(1, Ordering::SeqCst);
                        tracing::info!(%resource, "repaired");
                    }
                }
                _ => {}
            }
        }
    }

    /// Perpetual loop: sweep under the pool-wide guard, then sleep the
    /// interval, until `stop` is set.
    pub fn run(&self, pool: &KitchenPool, config: &KitchenConfig, stop: &AtomicBool) {
        let interval = config.scaled(config.sweep_interval);
        while !stop.load(Ordering::SeqCst) {
            pool.with_pool_guard(|| self.sweep(pool, config, stop));
            sleep_with_stop(stop, interval);
        }
    }

    pub fn cleaned(&self) -> u64 {
        self.cleaned.load(Ordering::SeqCst)
    }

    pub fn repaired(&self) -> u64 {
        self.repaired.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_config() -> KitchenConfig {
        KitchenConfig {
            time_unit: Duration::from_millis(1),
            ..KitchenConfig::default()
        }
    }

    fn dirty(pool: &KitchenPool, resource: ResourceType, usages: u32) {
        let claim = pool
            .acquire(resource, 42, Duration::from_millis(50))
            .expect("setup acquire");
        for _ in 0..usages {
            pool.record_usage(&claim);
        }
        pool.release(claim);
    }

    #[test]
    fn sweep_cleans_flagged_resources() {
        let pool = KitchenPool::new();
        let config = fast_config();
        let stop = AtomicBool::new(false);
        dirty(&pool, ResourceType::Knife, 3);

        let sweeper = MaintenanceSweeper::new();
        sweeper.sweep(&pool, &config, &stop);

        assert_eq!(sweeper.cleaned(), 1);
        assert_eq!(sweeper.repaired(), 0);
        assert_eq!(
            pool.snapshot_of(ResourceType::Knife).state,
            ResourceState::Available
        );
    }

    #[test]
    fn sweep_repairs_broken_resources() {
        let pool = KitchenPool::new();
        let config = fast_config();
        let stop = AtomicBool::new(false);
        dirty(&pool, ResourceType::Stove, 50);

        let sweeper = MaintenanceSweeper::new();
        sweeper.sweep(&pool, &config, &stop);

        assert_eq!(sweeper.repaired(), 1);
        let snap = pool.snapshot_of(ResourceType::Stove);
        assert_eq!(snap.state, ResourceState::Available);
        assert_eq!(snap.quality, 100);
        assert_eq!(snap.usage_count, 0);
    }

    #[test]
    fn sweep_skips_resources_still_held() {
        let pool = KitchenPool::new();
        let config = fast_config();
        let stop = AtomicBool::new(false);
        // Flag the knife dirty while a chef still holds it.
        let claim = pool
            .acquire(ResourceType::Knife, 7, Duration::from_millis(50))
            .expect("acquire");
        for _ in 0..3 {
            pool.record_usage(&claim);
        }

        let sweeper = MaintenanceSweeper::new();
        sweeper.sweep(&pool, &config, &stop);
        assert_eq!(sweeper.cleaned(), 0);
        assert_eq!(
            pool.snapshot_of(ResourceType::Knife).state,
            ResourceState::NeedsCleaning
        );

        // Once released, the next sweep services it.
        pool.release(claim);
        sweeper.sweep(&pool, &config, &stop);
        assert_eq!(sweeper.cleaned(), 1);
        assert_eq!(
            pool.snapshot_of(ResourceType::Knife).state,
            ResourceState::Available
        );
    }

    #[test]
    fn sweep_leaves_healthy_resources_alone() {
        let pool = KitchenPool::new();
        let config = fast_config();
        let stop = AtomicBool::new(false);

        let sweeper = MaintenanceSweeper::new();
        sweeper.sweep(&pool, &config, &stop);
        assert_eq!(sweeper.cleaned(), 0);
        assert_eq!(sweeper.repaired(), 0);
        for snap in pool.snapshot() {
            assert_eq!(snap.state, ResourceState::Available);
            assert_eq!(snap.quality, 100);
        }
    }
}
