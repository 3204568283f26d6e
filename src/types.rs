//! Shared identifiers and kitchen domain enums used across the system.

use std::fmt;

/// Unique identifier for a chef thread.
pub type ChefId = u64;

/// The six contended kitchen resources; exactly one instance of each exists
/// in the pool. The declaration order is the canonical acquisition order used
/// for deadlock avoidance, and the ordinal doubles as the pool index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceType {
    Knife,
    Stove,
    ChoppingBoard,
    Vegetables,
    CookingPot,
    Spices,
}

impl ResourceType {
    /// Fixed pool size.
    pub const COUNT: usize = 6;

    /// All resource types in canonical order.
    pub const ALL: [ResourceType; Self::COUNT] = [
        ResourceType::Knife,
        ResourceType::Stove,
        ResourceType::ChoppingBoard,
        ResourceType::Vegetables,
        ResourceType::CookingPot,
        ResourceType::Spices,
    ];

    /// Index of this resource in the pool.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Human-readable name used in log events and status reports.
    pub fn name(self) -> &'static str {
        match self {
            ResourceType::Knife => "Knife",
            ResourceType::Stove => "Stove",
            ResourceType::ChoppingBoard => "Chopping Board",
            ResourceType::Vegetables => "Vegetables",
            ResourceType::CookingPot => "Cooking Pot",
            ResourceType::Spices => "Spices",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle state of a single resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceState {
    Available,
    InUse,
    NeedsCleaning,
    Broken,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceState::Available => "Available",
            ResourceState::InUse => "In Use",
            ResourceState::NeedsCleaning => "Needs Cleaning",
            ResourceState::Broken => "Broken",
        };
        f.write_str(label)
    }
}

/// Chef proficiency; a higher skill shortens the cooking time by its ordinal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Skill {
    Novice,
    Intermediate,
    Expert,
}

impl Skill {
    /// Number of time units this skill shaves off the base cooking time.
    pub fn time_bonus(self) -> u32 {
        self as u32
    }

    /// Draw a skill level from the given randomness source.
    pub fn random<R: rand::Rng>(rng: &mut R) -> Self {
        match rng.gen_range(0..3) {
            0 => Skill::Novice,
            1 => Skill::Intermediate,
            _ => Skill::Expert,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_puts_knife_before_stove() {
        assert!(ResourceType::Knife < ResourceType::Stove);
        assert!(ResourceType::Stove < ResourceType::ChoppingBoard);
    }

    #[test]
    fn indices_match_canonical_order() {
        for (expected, resource) in ResourceType::ALL.iter().enumerate() {
            assert_eq!(resource.index(), expected);
        }
    }

    #[test]
    fn display_names_match_reference_kitchen() {
        assert_eq!(ResourceType::ChoppingBoard.to_string(), "Chopping Board");
        assert_eq!(ResourceType::CookingPot.to_string(), "Cooking Pot");
        assert_eq!(ResourceState::NeedsCleaning.to_string(), "Needs Cleaning");
    }

    #[test]
    fn skill_bonus_follows_ordinal() {
        assert_eq!(Skill::Novice.time_bonus(), 0);
        assert_eq!(Skill::Intermediate.time_bonus(), 1);
        assert_eq!(Skill::Expert.time_bonus(), 2);
    }
}
