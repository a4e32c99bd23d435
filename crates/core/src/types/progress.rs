//! Reward progress for the loyalty program.
//!
//! A customer earns a reward every [`RewardProgress::GOAL`] visits. The pass
//! front field renders this as `"visits/goal"` (e.g. `"3/5"`), and the wallet
//! client re-renders it whenever the pass is refreshed.

use serde::{Deserialize, Serialize};

/// Progress toward the next loyalty reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardProgress {
    visits: u32,
}

impl RewardProgress {
    /// Visits required to earn a reward.
    pub const GOAL: u32 = 5;

    /// Create progress from a raw visit count.
    #[must_use]
    pub const fn new(visits: u32) -> Self {
        Self { visits }
    }

    /// Total recorded visits.
    #[must_use]
    pub const fn visits(&self) -> u32 {
        self.visits
    }

    /// Visits counted toward the current (unredeemed) reward cycle.
    #[must_use]
    pub const fn current_cycle(&self) -> u32 {
        self.visits % Self::GOAL
    }

    /// Whether the customer has just completed a reward cycle.
    #[must_use]
    pub const fn reward_earned(&self) -> bool {
        self.visits > 0 && self.visits.is_multiple_of(Self::GOAL)
    }
}

impl std::fmt::Display for RewardProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.visits, Self::GOAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        assert_eq!(RewardProgress::new(3).to_string(), "3/5");
        assert_eq!(RewardProgress::new(0).to_string(), "0/5");
        assert_eq!(RewardProgress::new(12).to_string(), "12/5");
    }

    #[test]
    fn test_reward_earned() {
        assert!(!RewardProgress::new(0).reward_earned());
        assert!(!RewardProgress::new(4).reward_earned());
        assert!(RewardProgress::new(5).reward_earned());
        assert!(RewardProgress::new(10).reward_earned());
        assert!(!RewardProgress::new(11).reward_earned());
    }

    #[test]
    fn test_current_cycle() {
        assert_eq!(RewardProgress::new(3).current_cycle(), 3);
        assert_eq!(RewardProgress::new(5).current_cycle(), 0);
        assert_eq!(RewardProgress::new(7).current_cycle(), 2);
    }
}
