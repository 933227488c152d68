//! Leaky-bucket conversion of dealt damage into rewards

use serde::{Deserialize, Serialize};

/// Reward currency fed by dealt damage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewardKind {
    /// Ammo packs (the purchase currency)
    Ammo,
    Experience,
}

impl RewardKind {
    fn index(self) -> usize {
        match self {
            RewardKind::Ammo => 0,
            RewardKind::Experience => 1,
        }
    }
}

/// Per-player damage dealt since the last grant, one bucket per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageAccumulator {
    remainder: [f64; 2],
}

impl DamageAccumulator {
    pub fn remainder(&self, kind: RewardKind) -> f64 {
        self.remainder[kind.index()]
    }
}

/// Thresholds for turning accumulated damage into reward units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardAccumulator {
    ammo_threshold: f64,
    experience_threshold: f64,
}

impl RewardAccumulator {
    /// A threshold of zero or less disables that kind
    pub fn new(ammo_threshold: f64, experience_threshold: f64) -> Self {
        RewardAccumulator {
            ammo_threshold,
            experience_threshold,
        }
    }

    pub fn threshold(&self, kind: RewardKind) -> f64 {
        match kind {
            RewardKind::Ammo => self.ammo_threshold,
            RewardKind::Experience => self.experience_threshold,
        }
    }

    /// Add dealt damage and return how many reward units it unlocked
    ///
    /// The bucket is only ever decremented by the threshold, so overflow
    /// carries into the next grant.
    pub fn add(&self, bucket: &mut DamageAccumulator, kind: RewardKind, amount: f64) -> u32 {
        let threshold = self.threshold(kind);
        if threshold <= 0.0 || !amount.is_finite() || amount <= 0.0 {
            return 0;
        }

        let remainder = &mut bucket.remainder[kind.index()];
        *remainder += amount;

        let mut units = 0;
        while *remainder >= threshold {
            *remainder -= threshold;
            units += 1;
        }
        units
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_carries_forward() {
        let rewards = RewardAccumulator::new(100.0, 50.0);
        let mut bucket = DamageAccumulator::default();

        assert_eq!(rewards.add(&mut bucket, RewardKind::Ammo, 250.0), 2);
        assert_eq!(bucket.remainder(RewardKind::Ammo), 50.0);

        // The carried 50 completes the next unit
        assert_eq!(rewards.add(&mut bucket, RewardKind::Ammo, 60.0), 1);
        assert_eq!(bucket.remainder(RewardKind::Ammo), 10.0);
    }

    #[test]
    fn test_kinds_are_independent() {
        let rewards = RewardAccumulator::new(100.0, 50.0);
        let mut bucket = DamageAccumulator::default();

        assert_eq!(rewards.add(&mut bucket, RewardKind::Experience, 120.0), 2);
        assert_eq!(bucket.remainder(RewardKind::Experience), 20.0);
        assert_eq!(bucket.remainder(RewardKind::Ammo), 0.0);
    }

    #[test]
    fn test_many_small_hits_match_floor_and_mod() {
        let rewards = RewardAccumulator::new(100.0, 100.0);
        let mut bucket = DamageAccumulator::default();
        let mut units = 0;
        for _ in 0..37 {
            units += rewards.add(&mut bucket, RewardKind::Ammo, 27.0);
        }
        // 37 * 27 = 999
        assert_eq!(units, 9);
        assert_eq!(bucket.remainder(RewardKind::Ammo), 99.0);
    }

    #[test]
    fn test_disabled_threshold_grants_nothing() {
        let rewards = RewardAccumulator::new(0.0, 100.0);
        let mut bucket = DamageAccumulator::default();
        assert_eq!(rewards.add(&mut bucket, RewardKind::Ammo, 1000.0), 0);
        assert_eq!(bucket.remainder(RewardKind::Ammo), 0.0);
    }
}
