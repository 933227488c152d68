//! Round state, faction transitions and the damage pipeline

/// Log a categorized event through the game's logger
///
/// Compiled out entirely without the `verbose-logging` feature.
macro_rules! log_event {
    ($state:expr, $level:ident, $category:expr, $($arg:tt)*) => {
        #[cfg(feature = "verbose-logging")]
        {
            $state.logger.event(
                $crate::game::VerbosityLevel::$level,
                $category,
                &format!($($arg)*),
            );
        }
        #[cfg(not(feature = "verbose-logging"))]
        {
            let _ = &$state;
        }
    };
}

pub mod assign;
pub mod damage;
pub mod lifecycle;
pub mod logger;
pub mod reward;
pub mod round;
pub mod scheduler;
pub mod selector;
pub mod state;
pub mod transition;
pub mod win;

pub use assign::zombie_target;
pub use damage::{BlockReason, DamageEvent, DamageOutcome, DamageType, HitGroup, WeaponProfile};
pub use lifecycle::PurchaseError;
pub use logger::{GameLogger, LogEntry, OutputFormat, OutputMode, VerbosityLevel};
pub use reward::{DamageAccumulator, RewardAccumulator, RewardKind};
pub use round::{RoundEndReason, RoundInfo, RoundState, TeamScores};
pub use scheduler::{Scheduler, Timer, TimerId, TimerKind, TimerOwner};
pub use selector::ModeSelector;
pub use state::{GameState, PopulationCounts, MAX_PLAYERS};
pub use transition::InfectionSource;
pub use win::WinOutcome;
