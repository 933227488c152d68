//! Per-slot player record

use crate::core::{ClassId, Loadout, PlayerFaction, Team};
use crate::game::reward::DamageAccumulator;
use crate::game::scheduler::TimerId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Connection slot id (recycled across connects)
pub type SlotId = crate::core::EntityId<PlayerRecord>;

/// Combat stats applied to the player's body
///
/// Always rebuilt as a whole on a faction transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatProfile {
    pub health: i32,
    /// Ceiling for regeneration
    pub max_health: i32,
    pub speed: f32,
    pub gravity: f32,
    pub armor: i32,
    pub knockback: f32,
    pub model: String,
    pub loadout: Loadout,
}

impl Default for CombatProfile {
    fn default() -> Self {
        CombatProfile {
            health: 100,
            max_health: 100,
            speed: 1.0,
            gravity: 1.0,
            armor: 0,
            knockback: 1.0,
            model: String::new(),
            loadout: Loadout::new(),
        }
    }
}

/// Class skill usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillState {
    pub in_use: bool,
    pub cooling_down: bool,
}

/// Timers owned by one occupant of a slot
///
/// Every handle here must be cancelled before the record is reused or the
/// faction changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerTimers {
    pub skill: Option<TimerId>,
    pub countdown: Option<TimerId>,
    pub regen: Option<TimerId>,
    pub hud: Option<TimerId>,
    pub moan: Option<TimerId>,
    pub respawn: Option<TimerId>,
}

impl PlayerTimers {
    /// Take every live handle, leaving all fields empty
    pub fn drain(&mut self) -> SmallVec<[TimerId; 6]> {
        [
            self.skill.take(),
            self.countdown.take(),
            self.regen.take(),
            self.hud.take(),
            self.moan.take(),
            self.respawn.take(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        *self == PlayerTimers::default()
    }
}

/// Everything the core tracks about a connected player
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub name: String,
    /// Bumped on every connect so timers can tell occupants apart
    pub serial: u64,
    pub is_bot: bool,
    pub alive: bool,
    pub team: Team,
    pub faction: PlayerFaction,
    pub profile: CombatProfile,

    pub human_class: Option<ClassId>,
    pub zombie_class: Option<ClassId>,
    /// Class picked for the next transition (validated when applied)
    pub next_human_class: Option<ClassId>,
    pub next_zombie_class: Option<ClassId>,

    pub currency: i32,
    /// Amount of the most recent purchase, refunded on round-start infection
    pub last_spent: i32,
    pub experience: u32,
    pub pending_purchase: i32,
    /// Respawns queued during the current life
    pub respawn_count: u32,
    /// Respawns completed this round; survives the per-life reset
    pub respawns: u32,
    /// Purchases per item during the current life
    pub purchases: FxHashMap<String, u32>,
    /// A respawn is being processed for this player
    pub respawning: bool,

    pub skill: SkillState,
    pub timers: PlayerTimers,
    pub damage: DamageAccumulator,
}

impl PlayerRecord {
    pub fn new(name: impl Into<String>, is_bot: bool, serial: u64) -> Self {
        PlayerRecord {
            name: name.into(),
            serial,
            is_bot,
            alive: false,
            team: Team::Spectator,
            faction: PlayerFaction::Human,
            profile: CombatProfile::default(),
            human_class: None,
            zombie_class: None,
            next_human_class: None,
            next_zombie_class: None,
            currency: 0,
            last_spent: 0,
            experience: 0,
            pending_purchase: 0,
            respawn_count: 0,
            respawns: 0,
            purchases: FxHashMap::default(),
            respawning: false,
            skill: SkillState::default(),
            timers: PlayerTimers::default(),
            damage: DamageAccumulator::default(),
        }
    }

    /// On a team and therefore counted by the win check
    pub fn is_playing(&self) -> bool {
        self.team != Team::Spectator
    }

    pub fn is_zombie(&self) -> bool {
        self.faction.is_zombie()
    }

    pub fn is_human(&self) -> bool {
        self.faction.is_human()
    }

    /// Clear per-life counters on a genuine respawn
    pub fn reset_life_counters(&mut self) {
        self.pending_purchase = 0;
        self.respawn_count = 0;
        self.purchases.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_player_is_spectating() {
        let player = PlayerRecord::new("Alice", false, 1);
        assert!(!player.alive);
        assert!(!player.is_playing());
        assert!(player.is_human());
        assert!(player.timers.is_empty());
    }

    #[test]
    fn test_drain_timers_empties_handles() {
        let mut timers = PlayerTimers {
            regen: Some(TimerId::new(3)),
            moan: Some(TimerId::new(4)),
            ..PlayerTimers::default()
        };
        let drained = timers.drain();
        assert_eq!(drained.len(), 2);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_reset_life_counters() {
        let mut player = PlayerRecord::new("Bob", true, 1);
        player.pending_purchase = 30;
        player.respawn_count = 2;
        player.respawns = 3;
        player.purchases.insert("armor".to_string(), 1);
        player.reset_life_counters();
        assert_eq!(player.pending_purchase, 0);
        assert_eq!(player.respawn_count, 0);
        assert_eq!(player.respawns, 3);
        assert!(player.purchases.is_empty());
    }
}
