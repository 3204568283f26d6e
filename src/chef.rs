//! Chef worker loop: ordered two-resource acquisition, cooking, wear, rest.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::KitchenConfig;
use crate::kitchen::KitchenPool;
use crate::sim::ExclusivityAudit;
use crate::types::{ChefId, ResourceType, Skill};

/// Polling slice for stop-aware sleeps.
const SLEEP_POLL: Duration = Duration::from_millis(10);

/// Sleep in small slices so a stop request interrupts promptly.
pub fn sleep_with_stop(stop: &AtomicBool, total: Duration) {
    let deadline = Instant::now() + total;
    while !stop.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(SLEEP_POLL));
    }
}

/// One chef agent and its lifetime counters.
///
/// Counters are mutated only by the owning agent; observers read them through
/// the accessor methods.
pub struct Chef {
    pub id: ChefId,
    /// Unordered pair of required resources from the assignment table.
    pub needs: (ResourceType, ResourceType),
    pub skill: Skill,
    success_count: AtomicU64,
    failure_count: AtomicU64,
}

impl Chef {
    pub fn new(id: ChefId, needs: (ResourceType, ResourceType), skill: Skill) -> Self {
        Self {
            id,
            needs,
            skill,
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
        }
    }

    /// Build a chef from the assignment table, drawing a random skill level.
    pub fn from_config(id: ChefId, config: &KitchenConfig) -> Self {
        let skill = Skill::random(&mut rand::thread_rng());
        Self::new(id, config.needs_for(id), skill)
    }

    pub fn successes(&self) -> u64 {
        self.success_count.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u64 {
        self.failure_count.load(Ordering::SeqCst)
    }

    /// Needed pair sorted into canonical order. Every chef acquiring in
    /// ascending `ResourceType` order rules out circular waits between any
    /// two chefs with overlapping needs.
    pub fn ordered_needs(&self) -> (ResourceType, ResourceType) {
        let (a, b) = self.needs;
        if a <= b { (a, b) } else { (b, a) }
    }

    /// Cooking duration in time units after the skill bonus, floored at one.
    fn cooking_units(&self, config: &KitchenConfig) -> u32 {
        config
            .cooking_time
            .saturating_sub(self.skill.time_bonus())
            .max(1)
    }

    /// Run the cook/rest loop until `stop` is set.
    ///
    /// Failures are never fatal: they are logged, counted, and followed by a
    /// cooldown, and nothing stays held across a retry.
    pub fn run(
        &self,
        pool: &KitchenPool,
        config: &KitchenConfig,
        stop: &AtomicBool,
        audit: Option<&ExclusivityAudit>,
    ) {
        let timeout = config.scaled(config.acquire_timeout);
        let cooldown = config.scaled(config.retry_cooldown);
        let rest = config.scaled(config.rest_time);
        let cooking = config.scaled(self.cooking_units(config));

        while !stop.load(Ordering::SeqCst) {
            let (first, second) = self.ordered_needs();

            let first_claim = match pool.acquire(first, self.id, timeout) {
                Ok(claim) => claim,
                Err(err) => {
                    tracing::info!(chef = self.id, resource = %first, %err, "acquire failed");
                    self.note_failure(pool);
                    sleep_with_stop(stop, cooldown);
                    continue;
                }
            };
            if let Some(audit) = audit {
                audit.enter(first);
            }
            tracing::info!(chef = self.id, resource = %first, "acquired");

            let second_claim = match pool.acquire(second, self.id, timeout) {
                Ok(claim) => claim,
                Err(err) => {
                    tracing::info!(chef = self.id, resource = %second, %err, "acquire failed");
                    // Hand back the first resource before retrying so a
                    // partial acquisition never starves the other chefs.
                    if let Some(audit) = audit {
                        audit.exit(first);
                    }
                    pool.release(first_claim);
                    self.note_failure(pool);
                    sleep_with_stop(stop, cooldown);
                    continue;
                }
            };
            if let Some(audit) = audit {
                audit.enter(second);
            }
            tracing::info!(chef = self.id, resource = %second, "acquired");

            tracing::info!(chef = self.id, skill = ?self.skill, "cooking");
            sleep_with_stop(stop, cooking);

            pool.record_usage(&first_claim);
            pool.record_usage(&second_claim);
            self.success_count.fetch_add(1, Ordering::SeqCst);
            pool.record_meal();
            tracing::info!(chef = self.id, "finished meal");

            if let Some(audit) = audit {
                audit.exit(second);
                audit.exit(first);
            }
            pool.release(second_claim);
            pool.release(first_claim);
            tracing::info!(chef = self.id, first = %first, second = %second, "released");

            tracing::info!(chef = self.id, "resting");
            sleep_with_stop(stop, rest);
        }
    }

    fn note_failure(&self, pool: &KitchenPool) {
        self.failure_count.fetch_add(1, Ordering::SeqCst);
        pool.record_failure();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceState;
    use std::sync::Arc;

    fn fast_config() -> KitchenConfig {
        KitchenConfig {
            time_unit: Duration::from_millis(2),
            ..KitchenConfig::default()
        }
    }

    #[test]
    fn needs_are_sorted_into_canonical_order() {
        // The table lists chef 0 as (Stove, Knife); Knife is the lower
        // ordinal and must come first.
        let chef = Chef::new(
            0,
            (ResourceType::Stove, ResourceType::Knife),
            Skill::Novice,
        );
        assert_eq!(
            chef.ordered_needs(),
            (ResourceType::Knife, ResourceType::Stove)
        );

        let already_sorted = Chef::new(
            1,
            (ResourceType::Knife, ResourceType::ChoppingBoard),
            Skill::Novice,
        );
        assert_eq!(
            already_sorted.ordered_needs(),
            (ResourceType::Knife, ResourceType::ChoppingBoard)
        );
    }

    #[test]
    fn skill_shortens_cooking_with_a_floor_of_one_unit() {
        let config = KitchenConfig::default();
        let novice = Chef::new(0, (ResourceType::Stove, ResourceType::Knife), Skill::Novice);
        let expert = Chef::new(1, (ResourceType::Stove, ResourceType::Knife), Skill::Expert);
        assert_eq!(novice.cooking_units(&config), 5);
        assert_eq!(expert.cooking_units(&config), 3);

        let short = KitchenConfig {
            cooking_time: 1,
            ..config
        };
        assert_eq!(expert.cooking_units(&short), 1);
    }

    #[test]
    fn a_full_cycle_counts_a_meal() {
        let pool = Arc::new(KitchenPool::new());
        let config = fast_config();
        let stop = Arc::new(AtomicBool::new(false));
        let chef = Arc::new(Chef::new(
            0,
            (ResourceType::Stove, ResourceType::Knife),
            Skill::Expert,
        ));

        let handle = {
            let pool = Arc::clone(&pool);
            let config = config.clone();
            let stop = Arc::clone(&stop);
            let chef = Arc::clone(&chef);
            thread::spawn(move || chef.run(&pool, &config, &stop, None))
        };

        thread::sleep(Duration::from_millis(150));
        stop.store(true, Ordering::SeqCst);
        handle.join().expect("chef thread panicked");

        assert!(chef.successes() >= 1);
        assert_eq!(pool.total_meals_prepared(), chef.successes());
        // Nothing stays held after shutdown.
        for snap in pool.snapshot() {
            assert_ne!(snap.state, ResourceState::InUse);
        }
    }

    #[test]
    fn failed_second_acquire_releases_the_first() {
        let pool = Arc::new(KitchenPool::new());
        let config = fast_config();
        let stop = Arc::new(AtomicBool::new(false));
        // Chef needs (Knife, Stove) in canonical order; the test occupies
        // Stove so every cycle fails on the second acquire.
        let blocker = pool
            .acquire(ResourceType::Stove, 99, Duration::from_millis(50))
            .expect("blocker acquire");
        let chef = Arc::new(Chef::new(
            0,
            (ResourceType::Stove, ResourceType::Knife),
            Skill::Novice,
        ));

        let handle = {
            let pool = Arc::clone(&pool);
            let config = config.clone();
            let stop = Arc::clone(&stop);
            let chef = Arc::clone(&chef);
            thread::spawn(move || chef.run(&pool, &config, &stop, None))
        };

        thread::sleep(Duration::from_millis(100));
        stop.store(true, Ordering::SeqCst);
        handle.join().expect("chef thread panicked");

        assert!(chef.failures() >= 1);
        assert_eq!(pool.total_failures(), chef.failures());
        assert_eq!(chef.successes(), 0);
        // The first resource was handed back on every failed cycle.
        assert_eq!(
            pool.snapshot_of(ResourceType::Knife).state,
            ResourceState::Available
        );
        // The blocker still owns the stove.
        assert_eq!(
            pool.snapshot_of(ResourceType::Stove).state,
            ResourceState::InUse
        );
        pool.release(blocker);
    }

    #[test]
    fn sleep_with_stop_returns_promptly_once_stopped() {
        let stop = AtomicBool::new(true);
        let start = Instant::now();
        sleep_with_stop(&stop, Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
