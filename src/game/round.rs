//! Round lifecycle: countdown, start, termination

use crate::core::{ModeId, SlotId, Team};
use crate::game::scheduler::{TimerId, TimerKind};
use crate::game::selector::ModeSelector;
use crate::game::state::GameState;
use crate::game::win::WinOutcome;
use crate::services::Cue;
use crate::{Result, ZmError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the current round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoundState {
    /// Waiting for the countdown (factions not assigned yet)
    #[default]
    New,
    Active,
    Ended,
}

impl RoundState {
    /// Whether `self -> to` is a legal step
    ///
    /// Any state may be reset to New by the engine's round prestart.
    pub fn can_transition_to(self, to: RoundState) -> bool {
        matches!(
            (self, to),
            (_, RoundState::New)
                | (RoundState::New, RoundState::Active)
                | (RoundState::Active, RoundState::Ended)
        )
    }
}

/// Why a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundEndReason {
    HumansWin,
    ZombiesWin,
    Draw,
}

impl fmt::Display for RoundEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundEndReason::HumansWin => write!(f, "humans win"),
            RoundEndReason::ZombiesWin => write!(f, "zombies win"),
            RoundEndReason::Draw => write!(f, "draw"),
        }
    }
}

/// Rounds won per side since the map started
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScores {
    pub humans: u32,
    pub zombies: u32,
}

#[derive(Debug, Clone, Default)]
pub struct RoundInfo {
    pub state: RoundState,
    /// Mode of the running round
    pub mode: Option<ModeId>,
    /// Mode of the previous round, never picked twice in a row
    pub last_mode: Option<ModeId>,
    /// Seconds left before the round starts
    pub countdown: Option<u32>,
    pub countdown_timer: Option<TimerId>,
    /// Rounds started since the map began
    pub number: u32,
    /// No zombie has been made yet this round
    pub first_zombie_pending: bool,
    pub scores: TeamScores,
}

impl GameState {
    fn set_round_state(&mut self, to: RoundState) -> Result<()> {
        let from = self.round.state;
        if !from.can_transition_to(to) {
            return Err(ZmError::IllegalTransition { from, to });
        }
        self.round.state = to;
        Ok(())
    }

    /// Reset for a new round and start the countdown
    ///
    /// Fails when there is no mode to run, since the round could never start.
    pub fn prestart(&mut self) -> Result<()> {
        if self.modes.is_empty() || self.modes.fallback().is_none() {
            log_event!(self, Minimal, "round", "No usable game modes; round cannot start");
            return Err(ZmError::NoModes);
        }

        self.stop_countdown();
        self.set_round_state(RoundState::New)?;

        for slot in self.players.ids() {
            self.cancel_player_timers(slot);
            if let Ok(player) = self.players.get_mut(slot) {
                // The engine respawns everyone for the new round
                player.alive = false;
                player.respawning = false;
                player.respawn_count = 0;
                player.respawns = 0;
                player.faction = Default::default();
                player.skill = Default::default();
            }
        }

        let seconds = self.tunables().countdown_seconds;
        self.round.mode = None;
        self.round.number += 1;
        self.round.first_zombie_pending = true;
        self.round.countdown = Some(seconds);
        self.round.countdown_timer =
            Some(self.scheduler.schedule_repeating(TimerKind::RoundTick, None, 1.0));

        log_event!(
            self,
            Normal,
            "round",
            "Round {} prestart, countdown {}s",
            self.round.number,
            seconds
        );
        Ok(())
    }

    /// One-second countdown tick while the round is New
    pub fn round_tick(&mut self) -> Result<()> {
        if self.round.state != RoundState::New {
            self.stop_countdown();
            return Ok(());
        }
        if self.alive_count() <= 1 {
            log_event!(self, Verbose, "round", "Waiting for players");
            return Ok(());
        }
        let Some(seconds) = self.round.countdown else {
            return Ok(());
        };

        let remaining = seconds.saturating_sub(1);
        self.round.countdown = Some(remaining);

        let (reminder_at, cue_from) = {
            let t = self.tunables();
            (t.countdown_reminder_at, t.countdown_cue_from)
        };
        if remaining > 0 && remaining == reminder_at {
            self.services.engine.emit_cue(Cue::CountdownReminder(remaining));
        }
        if remaining > 0 && remaining <= cue_from {
            self.services.engine.emit_cue(Cue::Countdown(remaining));
        }

        if remaining == 0 {
            self.start_round()?;
        }
        Ok(())
    }

    /// Pick a mode and begin the round
    pub fn start_round(&mut self) -> Result<ModeId> {
        if self.round.state != RoundState::New {
            return Err(ZmError::IllegalTransition {
                from: self.round.state,
                to: RoundState::Active,
            });
        }
        let alive = self.alive_count();
        let picked = {
            let mut rng = self.rng.borrow_mut();
            ModeSelector::select(&self.modes, alive, self.round.last_mode, &mut *rng)
        };
        let mode = picked.ok_or(ZmError::NoModes)?;
        self.begin_mode(mode, None)?;
        Ok(mode)
    }

    /// Start `mode` immediately, skipping the selection trial
    ///
    /// `selected` is made the survivor on survivor modes and the first
    /// zombie otherwise.
    pub fn force_start(&mut self, mode: ModeId, selected: Option<SlotId>) -> Result<()> {
        if self.modes.by_id(mode).is_none() {
            log_event!(self, Verbose, "round", "force_start with unknown mode {}", mode);
            return Err(ZmError::UnknownMode(mode.as_u32()));
        }
        if self.round.state != RoundState::New {
            return Err(ZmError::IllegalTransition {
                from: self.round.state,
                to: RoundState::Active,
            });
        }
        self.begin_mode(mode, selected)
    }

    fn begin_mode(&mut self, mode: ModeId, selected: Option<SlotId>) -> Result<()> {
        self.modes.close();
        self.stop_countdown();

        // Assigned while still New so the transitions' win checks hold
        self.assign_factions(mode, selected);

        self.set_round_state(RoundState::Active)?;
        self.round.mode = Some(mode);
        self.round.last_mode = Some(mode);

        if let Some(m) = self.modes.by_id(mode) {
            let name = m.def.name.to_string();
            let sound = m.def.sound.clone();
            self.services.engine.emit_cue(Cue::ModeStart { mode, sound });
            log_event!(self, Normal, "round", "Round {} started: {}", self.round.number, name);
        }
        self.services.notify_mode_started(mode);

        self.check_win(true);
        Ok(())
    }

    fn stop_countdown(&mut self) {
        if let Some(id) = self.round.countdown_timer.take() {
            self.scheduler.cancel(id);
        }
        self.round.countdown = None;
    }

    /// End the active round
    pub fn terminate(&mut self, reason: RoundEndReason) -> Result<()> {
        self.set_round_state(RoundState::Ended)?;
        self.stop_countdown();

        for slot in self.players.ids() {
            if let Ok(player) = self.players.get_mut(slot) {
                player.respawning = false;
                if let Some(id) = player.timers.respawn.take() {
                    self.scheduler.cancel(id);
                }
            }
        }

        match reason {
            RoundEndReason::HumansWin => {
                self.round.scores.humans += 1;
                let score = self.round.scores.humans;
                self.services.engine.set_team_score(Team::Human, score);
            }
            RoundEndReason::ZombiesWin => {
                self.round.scores.zombies += 1;
                let score = self.round.scores.zombies;
                self.services.engine.set_team_score(Team::Zombie, score);
            }
            RoundEndReason::Draw => {}
        }

        let delay = self.tunables().round_end_delay;
        self.services.engine.terminate_round(delay, reason);
        self.services.engine.emit_cue(Cue::RoundEnd(reason));
        self.services.notify_mode_ended(reason);

        log_event!(self, Minimal, "round", "Round {} ended: {}", self.round.number, reason);
        Ok(())
    }

    /// The engine's round timer ran out
    ///
    /// Humans holding out until the end win the round.
    pub fn on_round_time_expired(&mut self) -> Result<()> {
        if self.round.state != RoundState::Active {
            return Ok(());
        }
        let reason = if self.population().humans > 0 {
            RoundEndReason::HumansWin
        } else {
            RoundEndReason::ZombiesWin
        };
        self.terminate(reason)
    }

    /// Validate the population and end the round on a resolved outcome
    pub fn check_win(&mut self, strict: bool) -> WinOutcome {
        let outcome = self.validate_round(strict);
        if self.round.state == RoundState::Active {
            if let Some(reason) = outcome.end_reason() {
                if let Err(e) = self.terminate(reason) {
                    log_event!(self, Minimal, "round", "{}", e);
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        assert!(RoundState::New.can_transition_to(RoundState::Active));
        assert!(RoundState::Active.can_transition_to(RoundState::Ended));
        assert!(RoundState::Ended.can_transition_to(RoundState::New));
        assert!(RoundState::Active.can_transition_to(RoundState::New));

        assert!(!RoundState::New.can_transition_to(RoundState::Ended));
        assert!(!RoundState::Ended.can_transition_to(RoundState::Active));
        assert!(!RoundState::Active.can_transition_to(RoundState::Active));
    }
}
