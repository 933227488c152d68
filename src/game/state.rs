//! Main game state structure

use crate::config::Tunables;
use crate::core::{Mode, ModeDefinition, ModeId, ModeRegistry, PlayerRecord, SlotArena, SlotId};
use crate::game::reward::RewardAccumulator;
use crate::game::round::RoundInfo;
use crate::game::scheduler::{Scheduler, TimerKind, TimerOwner};
use crate::game::{GameLogger, VerbosityLevel};
use crate::services::Services;
use crate::Result;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::cell::RefCell;

/// Maximum simultaneous connections
pub const MAX_PLAYERS: usize = 64;

/// Alive population split by base faction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulationCounts {
    /// Connected players on a team (alive or not)
    pub playing: usize,
    pub alive: usize,
    pub humans: usize,
    pub zombies: usize,
}

/// Complete game state
///
/// Owns the player arena, the mode table, the round, the timers and the
/// injected collaborators. Gameplay operations live in `impl GameState`
/// blocks spread over the `game` submodules.
pub struct GameState {
    pub players: SlotArena<PlayerRecord>,

    pub modes: ModeRegistry,

    pub round: RoundInfo,

    pub scheduler: Scheduler,

    pub rewards: RewardAccumulator,

    /// Random number generator for gameplay (seeded for deterministic runs)
    ///
    /// Wrapped in RefCell so read-only helpers can still draw from it.
    pub rng: RefCell<ChaCha12Rng>,

    /// Centralized logger for game events
    pub logger: GameLogger,

    pub services: Services,

    /// Next connection serial handed out by `connect`
    next_serial: u64,
}

impl GameState {
    pub fn new(services: Services) -> Self {
        Self::with_capacity(services, MAX_PLAYERS)
    }

    pub fn with_capacity(services: Services, capacity: usize) -> Self {
        let tunables = services.config.tunables();
        let rewards = RewardAccumulator::new(
            tunables.reward_ammo_threshold,
            tunables.reward_experience_threshold,
        );
        GameState {
            players: SlotArena::with_capacity(capacity),
            modes: ModeRegistry::new(),
            round: RoundInfo::default(),
            scheduler: Scheduler::new(),
            rewards,
            rng: RefCell::new(ChaCha12Rng::seed_from_u64(0)),
            logger: GameLogger::new(),
            services,
            next_serial: 1,
        }
    }

    /// Set the RNG seed for deterministic gameplay
    pub fn seed_rng(&mut self, seed: u64) {
        *self.rng.borrow_mut() = ChaCha12Rng::seed_from_u64(seed);
    }

    pub fn tunables(&self) -> &Tunables {
        self.services.config.tunables()
    }

    /// Register a mode, logging (not propagating as fatal) a rejection
    pub fn register_mode(&mut self, def: ModeDefinition) -> Result<ModeId> {
        let name = def.name.clone();
        match self.modes.register(def) {
            Ok(id) => {
                self.logger.event(
                    VerbosityLevel::Verbose,
                    "registry",
                    &format!("Registered mode \"{}\" as {}", name, id),
                );
                Ok(id)
            }
            Err(e) => {
                self.logger.event(VerbosityLevel::Minimal, "registry", &format!("{}", e));
                Err(e)
            }
        }
    }

    pub fn mode(&self, id: ModeId) -> Option<&Mode> {
        self.modes.by_id(id)
    }

    /// Mode of the current round, if one has started
    pub fn current_mode(&self) -> Option<&Mode> {
        self.round.mode.and_then(|id| self.modes.by_id(id))
    }

    pub(crate) fn next_serial(&mut self) -> u64 {
        let serial = self.next_serial;
        self.next_serial += 1;
        serial
    }

    pub fn player(&self, slot: SlotId) -> Option<&PlayerRecord> {
        self.players.get(slot).ok()
    }

    pub fn player_mut(&mut self, slot: SlotId) -> Option<&mut PlayerRecord> {
        self.players.get_mut(slot).ok()
    }

    pub fn is_connected(&self, slot: SlotId) -> bool {
        self.players.contains(slot)
    }

    pub fn is_alive(&self, slot: SlotId) -> bool {
        self.player(slot).is_some_and(|p| p.alive)
    }

    /// Alive, connected players in slot order
    pub fn alive_slots(&self) -> Vec<SlotId> {
        self.players
            .iter()
            .filter(|(_, p)| p.alive)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|(_, p)| p.alive).count()
    }

    pub fn population(&self) -> PopulationCounts {
        let mut counts = PopulationCounts::default();
        for (_, player) in self.players.iter() {
            if player.is_playing() {
                counts.playing += 1;
            }
            if !player.alive {
                continue;
            }
            counts.alive += 1;
            if player.is_zombie() {
                counts.zombies += 1;
            } else {
                counts.humans += 1;
            }
        }
        counts
    }

    /// Timer ownership tag for the current occupant of `slot`
    pub fn owner_of(&self, slot: SlotId) -> Option<TimerOwner> {
        self.player(slot).map(|p| TimerOwner {
            slot,
            serial: p.serial,
        })
    }

    /// Cancel and clear every timer owned by `slot`
    pub fn cancel_player_timers(&mut self, slot: SlotId) {
        let Some(player) = self.players.get_mut(slot).ok() else {
            return;
        };
        for id in player.timers.drain() {
            self.scheduler.cancel(id);
        }
    }

    /// Live timers of `kind` owned by `slot`
    pub fn owned_timer_count(&self, slot: SlotId, kind: TimerKind) -> usize {
        self.scheduler.count_owned(slot, kind)
    }
}

impl std::fmt::Debug for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameState")
            .field("players", &self.players.len())
            .field("modes", &self.modes.len())
            .field("round", &self.round)
            .field("timers", &self.scheduler.len())
            .finish()
    }
}
