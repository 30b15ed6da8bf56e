// src/badges.rs

use crate::config::LEVEL_XP_STEP;

/// A badge definition. The earned set is always computed from profile
/// counters, never stored, so new badges apply retroactively.
pub struct Badge {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub condition: fn(&BadgeFacts) -> bool,
}

/// The profile counters badge conditions are evaluated against.
#[derive(Debug, Default, Clone, Copy)]
pub struct BadgeFacts {
    pub xp: i64,
    pub streak: i64,
    pub exams_completed: i64,
}

pub const BADGES: &[Badge] = &[
    Badge {
        id: "first_win",
        name: "First Victory",
        description: "Complete your first simulation",
        condition: |f| f.exams_completed >= 1,
    },
    Badge {
        id: "streak_master",
        name: "Streak Master",
        description: "Reach a 7-day study streak",
        condition: |f| f.streak >= 7,
    },
    Badge {
        id: "dedicated_learner",
        name: "Dedicated Learner",
        description: "Reach level 5",
        condition: |f| level_for_xp(f.xp) >= 5,
    },
    Badge {
        id: "xp_hunter",
        name: "XP Hunter",
        description: "Earn 1000 total XP",
        condition: |f| f.xp >= 1000,
    },
    Badge {
        id: "exam_ready",
        name: "Exam Ready",
        description: "Complete 5 full simulations",
        condition: |f| f.exams_completed >= 5,
    },
];

/// Level grows linearly with XP; level 1 starts at 0 XP.
pub fn level_for_xp(xp: i64) -> i64 {
    xp / LEVEL_XP_STEP + 1
}

/// Ids of all badges whose condition holds for the given counters.
pub fn earned_badges(facts: &BadgeFacts) -> Vec<&'static str> {
    BADGES
        .iter()
        .filter(|b| (b.condition)(facts))
        .map(|b| b.id)
        .collect()
}
