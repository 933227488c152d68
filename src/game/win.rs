//! Win-condition validation

use crate::game::round::{RoundEndReason, RoundState};
use crate::game::state::{GameState, PopulationCounts};
use serde::{Deserialize, Serialize};

/// Result of a population check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WinOutcome {
    Continuing,
    HumansWin,
    ZombiesWin,
    /// Mode system disabled or nobody playing
    Inactive,
}

impl WinOutcome {
    /// Round end reason for a resolved outcome
    pub fn end_reason(self) -> Option<RoundEndReason> {
        match self {
            WinOutcome::HumansWin => Some(RoundEndReason::HumansWin),
            WinOutcome::ZombiesWin => Some(RoundEndReason::ZombiesWin),
            WinOutcome::Continuing | WinOutcome::Inactive => None,
        }
    }
}

/// Decide the outcome from population counts alone
///
/// `strict` checks also hold the result while the round has not begun.
/// A non-strict check resolves a winner only once one side is empty.
pub fn evaluate(
    enabled: bool,
    state: RoundState,
    counts: PopulationCounts,
    strict: bool,
) -> WinOutcome {
    if !enabled || counts.playing == 0 {
        return WinOutcome::Inactive;
    }
    if strict && state == RoundState::New && counts.alive > 1 {
        return WinOutcome::Continuing;
    }
    if counts.zombies > 0 && counts.humans > 0 {
        return WinOutcome::Continuing;
    }
    if counts.humans > 0 {
        WinOutcome::HumansWin
    } else {
        WinOutcome::ZombiesWin
    }
}

impl GameState {
    /// Inspect the current population without acting on the result
    pub fn validate_round(&self, strict: bool) -> WinOutcome {
        evaluate(
            self.tunables().enabled,
            self.round.state,
            self.population(),
            strict,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(humans: usize, zombies: usize) -> PopulationCounts {
        PopulationCounts {
            playing: humans + zombies,
            alive: humans + zombies,
            humans,
            zombies,
        }
    }

    #[test]
    fn test_both_sides_alive_continues() {
        for strict in [true, false] {
            assert_eq!(
                evaluate(true, RoundState::Active, counts(3, 2), strict),
                WinOutcome::Continuing
            );
        }
    }

    #[test]
    fn test_one_side_empty_has_a_winner() {
        assert_eq!(
            evaluate(true, RoundState::Active, counts(4, 0), true),
            WinOutcome::HumansWin
        );
        assert_eq!(
            evaluate(true, RoundState::Active, counts(0, 4), true),
            WinOutcome::ZombiesWin
        );
    }

    #[test]
    fn test_new_round_holds_only_when_strict() {
        assert_eq!(
            evaluate(true, RoundState::New, counts(5, 0), true),
            WinOutcome::Continuing
        );
        assert_eq!(
            evaluate(true, RoundState::New, counts(5, 0), false),
            WinOutcome::HumansWin
        );
        // A single player is not enough to hold the round open
        assert_eq!(
            evaluate(true, RoundState::New, counts(1, 0), true),
            WinOutcome::HumansWin
        );
    }

    #[test]
    fn test_inactive() {
        assert_eq!(
            evaluate(false, RoundState::Active, counts(1, 1), true),
            WinOutcome::Inactive
        );
        assert_eq!(
            evaluate(true, RoundState::Active, PopulationCounts::default(), true),
            WinOutcome::Inactive
        );
    }

    #[test]
    fn test_everyone_dead_counts_as_zombie_win() {
        let dead = PopulationCounts {
            playing: 3,
            ..PopulationCounts::default()
        };
        assert_eq!(
            evaluate(true, RoundState::Active, dead, true),
            WinOutcome::ZombiesWin
        );
    }
}
