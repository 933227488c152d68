//! Player lifecycle and timer bodies
//!
//! Slots are recycled across connections, so every path that ends an
//! occupant's life or stay cancels the timers it owns. Timer bodies
//! re-check the owner's connection serial before touching the record.

use crate::core::{ClassId, ClassKind, PlayerRecord, SlotId};
use crate::game::round::RoundState;
use crate::game::scheduler::{Timer, TimerKind};
use crate::game::state::GameState;
use crate::game::transition::InfectionSource;
use crate::Result;
use thiserror::Error;

/// Why a purchase was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PurchaseError {
    #[error("player is not connected")]
    InvalidPlayer,

    #[error("dead players cannot buy")]
    NotAlive,

    #[error("not enough currency: need {need}, have {have}")]
    InsufficientFunds { need: i32, have: i32 },

    #[error("purchase limit of {0} reached")]
    LimitReached(u32),
}

impl GameState {
    /// Take the lowest free slot for a new connection
    pub fn connect(&mut self, name: &str, is_bot: bool) -> Result<SlotId> {
        let serial = self.next_serial();
        let slot = self.players.acquire(PlayerRecord::new(name, is_bot, serial))?;
        log_event!(self, Normal, "lifecycle", "{} connected on slot {}", name, slot);
        Ok(slot)
    }

    /// Free a slot, cancelling everything its occupant owned
    pub fn disconnect(&mut self, slot: SlotId) -> bool {
        if !self.is_connected(slot) {
            return false;
        }
        self.cancel_player_timers(slot);
        if let Some(player) = self.players.release(slot) {
            log_event!(self, Normal, "lifecycle", "{} left slot {}", player.name, slot);
        }
        self.check_win(false);
        true
    }

    /// Bring a connected player into the world
    ///
    /// Players join as humans until the round is running; afterwards they
    /// come back as zombies when `respawn_as_zombie` is set.
    pub fn spawn(&mut self, slot: SlotId) -> bool {
        let Ok(player) = self.players.get_mut(slot) else {
            return false;
        };
        if player.alive {
            return false;
        }
        player.alive = true;
        let respawning = player.respawning;

        let as_zombie =
            self.round.state == RoundState::Active && self.tunables().respawn_as_zombie;
        if as_zombie {
            self.make_zombie(slot, InfectionSource::None, false, respawning);
        } else {
            self.make_human(slot, false, respawning);
        }

        // Complete the team switch the transition skipped
        if let Ok(player) = self.players.get_mut(slot) {
            if player.respawning {
                player.respawns += 1;
            }
            player.respawning = false;
            let team = player.faction.team();
            if player.team != team {
                player.team = team;
                self.services.engine.set_player_team(slot, team);
            }
        }
        true
    }

    /// The engine killed `victim`
    pub fn on_player_death(&mut self, victim: SlotId, attacker: Option<SlotId>) {
        if !self.is_alive(victim) {
            return;
        }
        self.cancel_player_timers(victim);
        if let Ok(player) = self.players.get_mut(victim) {
            player.alive = false;
            player.skill = Default::default();
        }

        let (currency, experience, delay) = {
            let t = self.tunables();
            (t.kill_currency_bonus, t.kill_experience_bonus, t.respawn_delay)
        };
        if let Some(killer) = attacker.filter(|&a| a != victim) {
            if let Ok(player) = self.players.get_mut(killer) {
                player.currency += currency;
                player.experience += experience;
            }
        }

        let respawns = self.round.state == RoundState::Active
            && self.current_mode().is_some_and(|m| m.allows_respawn())
            && delay > 0.0;
        if respawns {
            if let Some(owner) = self.owner_of(victim) {
                let timer = self
                    .scheduler
                    .schedule_once(TimerKind::Respawn, Some(owner), delay as f64);
                if let Ok(player) = self.players.get_mut(victim) {
                    player.respawning = true;
                    player.respawn_count += 1;
                    player.timers.respawn = Some(timer);
                }
            }
        }

        log_event!(self, Normal, "lifecycle", "Slot {} died (killer: {:?})", victim, attacker);
        self.services.notify_client_updated(victim, attacker);
        self.check_win(true);
    }

    /// Start the zombie class skill
    pub fn use_skill(&mut self, slot: SlotId) -> bool {
        let Some(player) = self.player(slot).filter(|p| p.alive && p.is_zombie()) else {
            return false;
        };
        if player.skill.in_use || player.skill.cooling_down {
            return false;
        }
        let Some(duration) = player
            .zombie_class
            .and_then(|id| self.services.config.class(id))
            .filter(|c| c.has_skill())
            .map(|c| c.skill_duration)
        else {
            return false;
        };
        let Some(owner) = self.owner_of(slot) else {
            return false;
        };

        let timer = self
            .scheduler
            .schedule_once(TimerKind::SkillEnd, Some(owner), duration as f64);
        if let Ok(player) = self.players.get_mut(slot) {
            player.skill.in_use = true;
            player.timers.skill = Some(timer);
        }
        log_event!(self, Verbose, "skill", "Slot {} used their skill", slot);
        true
    }

    /// Spend currency on an item
    ///
    /// `limit` caps how many of `item` can be bought per life (0 = no cap).
    pub fn purchase(
        &mut self,
        slot: SlotId,
        item: &str,
        cost: i32,
        limit: u32,
    ) -> std::result::Result<(), PurchaseError> {
        let player = self
            .players
            .get_mut(slot)
            .map_err(|_| PurchaseError::InvalidPlayer)?;
        if !player.alive {
            return Err(PurchaseError::NotAlive);
        }
        if player.currency < cost {
            return Err(PurchaseError::InsufficientFunds {
                need: cost,
                have: player.currency,
            });
        }
        let bought = player.purchases.get(item).copied().unwrap_or(0);
        if limit > 0 && bought >= limit {
            return Err(PurchaseError::LimitReached(limit));
        }

        player.currency -= cost;
        player.last_spent = cost;
        player.pending_purchase += cost;
        *player.purchases.entry(item.to_string()).or_insert(0) += 1;
        log_event!(self, Verbose, "purchase", "Slot {} bought {} for {}", slot, item, cost);
        Ok(())
    }

    /// Choose the class used on the next transition of that kind
    pub fn set_next_class(&mut self, slot: SlotId, class: ClassId) -> bool {
        let Some(kind) = self.services.config.class(class).map(|c| c.kind) else {
            return false;
        };
        let Ok(player) = self.players.get_mut(slot) else {
            return false;
        };
        match kind {
            ClassKind::Human => player.next_human_class = Some(class),
            ClassKind::Zombie => player.next_zombie_class = Some(class),
        }
        true
    }

    /// Advance the clock and run every timer due by `now`
    ///
    /// Timers scheduled while this frame runs wait for the next one.
    pub fn run_frame(&mut self, now: f64) {
        self.scheduler.advance(now);
        let horizon = self.scheduler.horizon();
        while let Some(timer) = self.scheduler.pop_due_before(horizon) {
            self.dispatch_timer(timer);
        }
    }

    fn dispatch_timer(&mut self, timer: Timer) {
        let slot = match timer.owner {
            Some(owner) => {
                let current = self.player(owner.slot).map(|p| p.serial);
                if current != Some(owner.serial) {
                    // The occupant that created this timer is gone
                    self.scheduler.cancel(timer.id);
                    log_event!(self, Verbose, "timer", "Dropped stale {:?} timer {}", timer.kind, timer.id);
                    return;
                }
                Some(owner.slot)
            }
            None => None,
        };

        match (timer.kind, slot) {
            (TimerKind::RoundTick, _) => {
                if let Err(e) = self.round_tick() {
                    log_event!(self, Minimal, "round", "{}", e);
                }
            }
            (TimerKind::Regen, Some(slot)) => self.regen_tick(slot),
            (TimerKind::SkillEnd, Some(slot)) => self.end_skill(slot),
            (TimerKind::SkillCountdown, Some(slot)) => {
                if let Ok(player) = self.players.get_mut(slot) {
                    player.timers.countdown = None;
                    player.skill.cooling_down = false;
                }
            }
            (TimerKind::HudRefresh, Some(slot)) => {
                if let Ok(player) = self.players.get_mut(slot) {
                    player.timers.hud = None;
                    self.services.engine.refresh_loadout(slot, &player.profile.loadout);
                }
            }
            (TimerKind::Moan, Some(slot)) => {
                if self.player(slot).is_some_and(|p| p.alive && p.is_zombie()) {
                    self.services.engine.emit_cue(crate::services::Cue::Moan(slot));
                }
            }
            (TimerKind::Respawn, Some(slot)) => {
                if let Ok(player) = self.players.get_mut(slot) {
                    player.timers.respawn = None;
                }
                if self.round.state == RoundState::Active {
                    self.spawn(slot);
                } else if let Ok(player) = self.players.get_mut(slot) {
                    player.respawning = false;
                }
            }
            (_, None) => {
                self.scheduler.cancel(timer.id);
            }
        }
    }

    fn regen_tick(&mut self, slot: SlotId) {
        let amount = self
            .player(slot)
            .filter(|p| p.alive && p.is_zombie())
            .and_then(|p| p.zombie_class)
            .and_then(|id| self.services.config.class(id))
            .map(|c| c.regen_amount);
        let Some(amount) = amount else {
            return;
        };
        let Ok(player) = self.players.get_mut(slot) else {
            return;
        };
        if player.profile.health >= player.profile.max_health {
            return;
        }
        player.profile.health = (player.profile.health + amount).min(player.profile.max_health);
        self.services.engine.apply_profile(slot, &player.profile);
    }

    fn end_skill(&mut self, slot: SlotId) {
        let countdown = self
            .player(slot)
            .and_then(|p| p.zombie_class)
            .and_then(|id| self.services.config.class(id))
            .map(|c| c.skill_countdown)
            .unwrap_or(0.0);
        let Some(owner) = self.owner_of(slot) else {
            return;
        };
        let cooldown = (countdown > 0.0).then(|| {
            self.scheduler
                .schedule_once(TimerKind::SkillCountdown, Some(owner), countdown as f64)
        });
        if let Ok(player) = self.players.get_mut(slot) {
            player.timers.skill = None;
            player.skill.in_use = false;
            player.skill.cooling_down = cooldown.is_some();
            player.timers.countdown = cooldown;
        }
        log_event!(self, Verbose, "skill", "Slot {} skill ended", slot);
    }
}
