//! Exclusive, degradable kitchen resources and the pool that owns them.
//!
//! Each resource keeps its exclusivity token and its lifecycle metadata in a
//! single mutex-guarded cell, so the availability fast path and the bounded
//! wait for the token cannot race with each other. The pool-wide guard is a
//! separate coarse mutex used only by whole-pool passes (maintenance sweeps,
//! status snapshots); it never gates individual acquire/release.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::types::{ChefId, ResourceState, ResourceType};

/// Upper quality bound.
pub const MAX_QUALITY: i32 = 100;
/// Lower quality bound; reaching it breaks the resource.
pub const MIN_QUALITY: i32 = 0;

// Degradation policy knobs from the reference kitchen.
const WEAR_INTERVAL: u32 = 5;
const WEAR_PER_INTERVAL: i32 = 10;
const CLEANING_INTERVAL: u32 = 3;
const CLEAN_QUALITY_BONUS: i32 = 5;

/// Holder tag used by the maintenance sweeper while it services a resource,
/// kept far away from real chef ids.
pub const SWEEPER_HOLDER: ChefId = u64::MAX;

/// Why an acquisition attempt failed.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum AcquireError {
    /// The resource was not in the `Available` state at check time.
    #[error("{0} is unavailable")]
    Unavailable(ResourceType),
    /// The exclusivity token was not obtained within the timeout.
    #[error("timed out waiting for {0}")]
    TimedOut(ResourceType),
}

/// Proof of exclusive ownership of one resource, minted only by a successful
/// acquire. [`KitchenPool::release`] consumes it, so a double release does
/// not compile.
#[must_use = "an unreleased claim keeps the resource held"]
#[derive(Debug)]
pub struct Claim {
    resource: ResourceType,
    holder: ChefId,
}

impl Claim {
    /// The resource this claim holds.
    #[allow(dead_code)]
    pub fn resource(&self) -> ResourceType {
        self.resource
    }
}

/// Read-only view of one resource for reports and summaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceSnapshot {
    pub resource: ResourceType,
    pub state: ResourceState,
    pub quality: i32,
    pub usage_count: u32,
}

struct ResourceCell {
    holder: Option<ChefId>,
    state: ResourceState,
    quality: i32,
    usage_count: u32,
}

struct Resource {
    cell: Mutex<ResourceCell>,
    freed: Condvar,
}

impl Resource {
    fn new() -> Self {
        Self {
            cell: Mutex::new(ResourceCell {
                holder: None,
                state: ResourceState::Available,
                quality: MAX_QUALITY,
                usage_count: 0,
            }),
            freed: Condvar::new(),
        }
    }
}

/// Owns the six resources plus pool-wide counters and the coarse guard used
/// by whole-pool passes.
pub struct KitchenPool {
    resources: [Resource; ResourceType::COUNT],
    pool_guard: Mutex<()>,
    total_meals_prepared: AtomicU64,
    total_failures: AtomicU64,
}

impl KitchenPool {
    /// Create the fixed pool with every resource available at full quality.
    pub fn new() -> Self {
        Self {
            resources: std::array::from_fn(|_| Resource::new()),
            pool_guard: Mutex::new(()),
            total_meals_prepared: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
        }
    }

    /// Acquire exclusive use of a resource.
    ///
    /// A resource not in the `Available` state is rejected immediately with
    /// [`AcquireError::Unavailable`]; only the exclusivity token itself is
    /// waited for, bounded by `timeout`.
    pub fn acquire(
        &self,
        resource: ResourceType,
        chef: ChefId,
        timeout: Duration,
    ) -> Result<Claim, AcquireError> {
        let slot = &self.resources[resource.index()];
        let deadline = Instant::now() + timeout;
        let mut cell = slot.cell.lock().expect("resource mutex poisoned");

        // Fast path: never wait on the state check itself.
        if cell.state != ResourceState::Available {
            return Err(AcquireError::Unavailable(resource));
        }

        while cell.holder.is_some() {
            let now = Instant::now();
            if now >= deadline {
                return Err(AcquireError::TimedOut(resource));
            }
            let (guard, wait) = slot
                .freed
                .wait_timeout(cell, deadline - now)
                .expect("condvar wait failed");
            cell = guard;
            if wait.timed_out() && cell.holder.is_some() {
                return Err(AcquireError::TimedOut(resource));
            }
            // The previous holder may have left the resource flagged for the
            // sweeper; that makes it unavailable, not worth waiting for.
            if cell.state != ResourceState::Available {
                return Err(AcquireError::Unavailable(resource));
            }
        }

        cell.holder = Some(chef);
        cell.state = ResourceState::InUse;
        Ok(Claim {
            resource,
            holder: chef,
        })
    }

    /// Release a held resource, waking any bounded waiters.
    ///
    /// A `NeedsCleaning`/`Broken` flag set by [`Self::record_usage`] survives
    /// the release so the sweeper can observe it; only a plain `InUse`
    /// resource returns to `Available` here.
    pub fn release(&self, claim: Claim) {
        let Claim { resource, holder } = claim;
        let slot = &self.resources[resource.index()];
        let mut cell = slot.cell.lock().expect("resource mutex poisoned");
        match cell.holder {
            Some(owner) if owner == holder => {
                cell.holder = None;
                if cell.state == ResourceState::InUse {
                    cell.state = ResourceState::Available;
                }
                slot.freed.notify_all();
            }
            _ => {
                tracing::warn!(%resource, chef = holder, "release without matching hold");
                debug_assert!(false, "release without matching hold: {resource}");
            }
        }
    }

    /// Record one completed use of a held resource and apply wear.
    ///
    /// Policy, in fixed order: every 5th use costs 10 quality; every 3rd use
    /// flags `NeedsCleaning` unless the resource is already `Broken`; quality
    /// at or below zero clamps to zero and forces `Broken`. This never moves
    /// a resource toward `Available`.
    pub fn record_usage(&self, claim: &Claim) {
        let slot = &self.resources[claim.resource.index()];
        let mut cell = slot.cell.lock().expect("resource mutex poisoned");
        debug_assert_eq!(
            cell.holder,
            Some(claim.holder),
            "usage recorded by non-holder"
        );

        cell.usage_count += 1;
        if cell.usage_count % WEAR_INTERVAL == 0 {
            cell.quality -= WEAR_PER_INTERVAL;
        }
        if cell.usage_count % CLEANING_INTERVAL == 0 && cell.state != ResourceState::Broken {
            cell.state = ResourceState::NeedsCleaning;
        }
        if cell.quality <= MIN_QUALITY {
            cell.quality = MIN_QUALITY;
            cell.state = ResourceState::Broken;
        }
    }

    /// Sweeper-only: restore a `NeedsCleaning` resource.
    ///
    /// Takes the exclusivity token and holds it across the blocking delay so
    /// no acquire can slip in mid-clean. Skips resources that are still held
    /// (a chef between usage recording and release); the next sweep will see
    /// them. Returns whether a cleaning pass actually ran.
    pub fn clean(&self, resource: ResourceType, cleaning_time: Duration) -> bool {
        let slot = &self.resources[resource.index()];
        {
            let mut cell = slot.cell.lock().expect("resource mutex poisoned");
            if cell.state != ResourceState::NeedsCleaning || cell.holder.is_some() {
                return false;
            }
            cell.holder = Some(SWEEPER_HOLDER);
        }

        thread::sleep(cleaning_time);

        let mut cell = slot.cell.lock().expect("resource mutex poisoned");
        debug_assert_eq!(cell.holder, Some(SWEEPER_HOLDER), "clean lost its token");
        cell.state = ResourceState::Available;
        cell.quality = (cell.quality + CLEAN_QUALITY_BONUS).min(MAX_QUALITY);
        cell.holder = None;
        slot.freed.notify_all();
        true
    }

    /// Sweeper-only: repair a `Broken` resource back to full quality and a
    /// fresh usage count. Same token discipline as [`Self::clean`].
    pub fn repair(&self, resource: ResourceType, maintenance_time: Duration) -> bool {
        let slot = &self.resources[resource.index()];
        {
            let mut cell = slot.cell.lock().expect("resource mutex poisoned");
            if cell.state != ResourceState::Broken || cell.holder.is_some() {
                return false;
            }
            cell.holder = Some(SWEEPER_HOLDER);
        }

        thread::sleep(maintenance_time);

        let mut cell = slot.cell.lock().expect("resource mutex poisoned");
        debug_assert_eq!(cell.holder, Some(SWEEPER_HOLDER), "repair lost its token");
        cell.state = ResourceState::Available;
        cell.quality = MAX_QUALITY;
        cell.usage_count = 0;
        cell.holder = None;
        slot.freed.notify_all();
        true
    }

    /// Serialize a whole-pool pass (sweep or report) against other passes.
    pub fn with_pool_guard<T>(&self, pass: impl FnOnce() -> T) -> T {
        let _guard = self.pool_guard.lock().expect("pool guard poisoned");
        pass()
    }

    /// Read-only view of one resource.
    pub fn snapshot_of(&self, resource: ResourceType) -> ResourceSnapshot {
        let cell = self.resources[resource.index()]
            .cell
            .lock()
            .expect("resource mutex poisoned");
        ResourceSnapshot {
            resource,
            state: cell.state,
            quality: cell.quality,
            usage_count: cell.usage_count,
        }
    }

    /// Read-only view of the whole pool in canonical order.
    pub fn snapshot(&self) -> Vec<ResourceSnapshot> {
        ResourceType::ALL
            .iter()
            .map(|&resource| self.snapshot_of(resource))
            .collect()
    }

    /// Count one finished meal.
    pub fn record_meal(&self) {
        self.total_meals_prepared.fetch_add(1, Ordering::SeqCst);
    }

    /// Count one failed acquisition cycle.
    pub fn record_failure(&self) {
        self.total_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub fn total_meals_prepared(&self) -> u64 {
        self.total_meals_prepared.load(Ordering::SeqCst)
    }

    pub fn total_failures(&self) -> u64 {
        self.total_failures.load(Ordering::SeqCst)
    }

    /// Test-only hook to seed a held exclusivity token without an acquire,
    /// for exercising the bounded wait deterministically.
    #[cfg(test)]
    fn hold_token_for_test(&self, resource: ResourceType, holder: ChefId) {
        let mut cell = self.resources[resource.index()]
            .cell
            .lock()
            .expect("resource mutex poisoned");
        cell.holder = Some(holder);
    }
}
