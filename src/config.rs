//! Runtime configuration for the kitchen simulation.
//!
//! Every duration is a whole number of abstract time units scaled by
//! `time_unit`, so the full-scale reference timings (one unit = one second)
//! and the fast demo/test timings share one code path.

use std::time::Duration;

use crate::types::{ChefId, ResourceType};

/// Static chef-id to needed-resource-pair table from the reference kitchen.
/// Pairs are unordered; the chef loop sorts them into canonical order.
pub const DEFAULT_ASSIGNMENTS: [(ResourceType, ResourceType); 10] = [
    (ResourceType::Stove, ResourceType::Knife),
    (ResourceType::Knife, ResourceType::ChoppingBoard),
    (ResourceType::Stove, ResourceType::ChoppingBoard),
    (ResourceType::Knife, ResourceType::Stove),
    (ResourceType::ChoppingBoard, ResourceType::Knife),
    (ResourceType::Vegetables, ResourceType::Knife),
    (ResourceType::Vegetables, ResourceType::ChoppingBoard),
    (ResourceType::Vegetables, ResourceType::CookingPot),
    (ResourceType::CookingPot, ResourceType::Stove),
    (ResourceType::ChoppingBoard, ResourceType::Stove),
];

/// All tunables for one simulation run.
#[derive(Clone, Debug)]
pub struct KitchenConfig {
    /// Number of chef agents to spawn.
    pub chefs: usize,
    /// Length of one scaled time unit.
    pub time_unit: Duration,
    /// Base cooking duration in time units before the skill bonus.
    pub cooking_time: u32,
    /// Rest between successful meals, in time units.
    pub rest_time: u32,
    /// Blocking delay for one cleaning pass, in time units.
    pub cleaning_time: u32,
    /// Blocking delay for one repair pass, in time units.
    pub maintenance_time: u32,
    /// Bounded wait for the exclusivity token, in time units.
    pub acquire_timeout: u32,
    /// Cooldown after a failed acquisition, in time units.
    pub retry_cooldown: u32,
    /// Pause between maintenance sweeps, in time units.
    pub sweep_interval: u32,
    /// Pause between status reports, in time units.
    pub report_interval: u32,
    /// Chef id to unordered needed pair; ids beyond the table wrap cyclically.
    pub assignments: Vec<(ResourceType, ResourceType)>,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        Self {
            chefs: 10,
            time_unit: Duration::from_secs(1),
            cooking_time: 5,
            rest_time: 3,
            cleaning_time: 2,
            maintenance_time: 5,
            acquire_timeout: 10,
            retry_cooldown: 2,
            sweep_interval: 1,
            report_interval: 10,
            assignments: DEFAULT_ASSIGNMENTS.to_vec(),
        }
    }
}

impl KitchenConfig {
    /// Reference timings compressed to a 50ms unit for quick CLI feedback.
    pub fn demo() -> Self {
        Self {
            time_unit: Duration::from_millis(50),
            ..Self::default()
        }
    }

    /// Convert a number of time units into a wall-clock duration.
    pub fn scaled(&self, units: u32) -> Duration {
        self.time_unit * units
    }

    /// Needed pair for a chef id; ids beyond the table wrap cyclically.
    pub fn needs_for(&self, chef: ChefId) -> (ResourceType, ResourceType) {
        debug_assert!(!self.assignments.is_empty(), "empty assignment table");
        self.assignments[chef as usize % self.assignments.len()]
    }
}
