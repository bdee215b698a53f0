//! Experience curve: reaching `level * xp_per_level` total experience
//! advances one level. Experience is cumulative and never consumed.

use crate::dig::types::UserRecord;

pub const DEFAULT_XP_PER_LEVEL: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelCurve {
    xp_per_level: u64,
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self::new(DEFAULT_XP_PER_LEVEL)
    }
}

impl LevelCurve {
    pub fn new(xp_per_level: u64) -> Self {
        Self { xp_per_level }
    }

    /// Total experience at which `user` advances past the current level.
    pub fn xp_to_next_level(&self, user: &UserRecord) -> u64 {
        u64::from(user.level).saturating_mul(self.xp_per_level)
    }

    /// Add experience and advance at most one level.
    ///
    /// A gain large enough to cross several thresholds still moves a single
    /// level; the next call picks up the remainder.
    pub fn add_experience(&self, user: &mut UserRecord, amount: u64) -> bool {
        user.experience = user.experience.saturating_add(amount);
        if user.experience >= self.xp_to_next_level(user) {
            user.level = user.level.saturating_add(1);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserRecord {
        UserRecord::new("1", "indy", "basic")
    }

    #[test]
    fn below_threshold_keeps_level() {
        let curve = LevelCurve::default();
        let mut u = user();
        assert!(!curve.add_experience(&mut u, 99));
        assert_eq!(u.level, 1);
        assert_eq!(u.experience, 99);
    }

    #[test]
    fn reaching_threshold_levels_up() {
        let curve = LevelCurve::default();
        let mut u = user();
        assert!(curve.add_experience(&mut u, 100));
        assert_eq!(u.level, 2);
        assert_eq!(curve.xp_to_next_level(&u), 200);
    }

    #[test]
    fn huge_gain_levels_once() {
        let curve = LevelCurve::default();
        let mut u = user();
        assert!(curve.add_experience(&mut u, 10_000));
        assert_eq!(u.level, 2);
        assert_eq!(u.experience, 10_000);
        // Carry-over applies one level per call.
        assert!(curve.add_experience(&mut u, 0));
        assert_eq!(u.level, 3);
    }

    #[test]
    fn experience_is_never_consumed() {
        let curve = LevelCurve::default();
        let mut u = user();
        curve.add_experience(&mut u, 60);
        curve.add_experience(&mut u, 60);
        assert_eq!(u.level, 2);
        assert_eq!(u.experience, 120);
        assert!(!curve.add_experience(&mut u, 79));
        assert!(curve.add_experience(&mut u, 1));
        assert_eq!(u.level, 3);
    }

    #[test]
    fn custom_factor() {
        let curve = LevelCurve::new(50);
        let mut u = user();
        assert!(curve.add_experience(&mut u, 50));
        assert_eq!(curve.xp_to_next_level(&u), 100);
    }
}
