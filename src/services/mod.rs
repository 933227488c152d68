//! Interfaces the core consumes from its host
//!
//! The core never parses host configuration, renders anything or talks to
//! the network. Everything it needs from outside goes through the traits
//! below, bundled into [`Services`] and injected into `GameState`. The
//! `sim` module provides in-process implementations for tests and the CLI.

use crate::config::Tunables;
use crate::core::{ClassDefinition, ClassId, ClassKind, CombatProfile, Loadout, ModeId, SlotId, Team};
use crate::game::{DamageType, RoundEndReason};
use smallvec::SmallVec;

/// Class and tunable lookups
pub trait ConfigStore {
    fn class(&self, id: ClassId) -> Option<&ClassDefinition>;

    /// Ids of every class of `kind`, in registration order
    fn classes(&self, kind: ClassKind) -> SmallVec<[ClassId; 8]>;

    fn tunables(&self) -> &Tunables;
}

/// Player privilege queries
pub trait AccessControl {
    fn is_in_group(&self, slot: SlotId, group: &str) -> bool;

    fn level(&self, slot: SlotId) -> u32;
}

/// Audible/visible round cues forwarded to the host
#[derive(Debug, Clone, PartialEq)]
pub enum Cue {
    /// Mode announcement with the mode's sound key
    ModeStart { mode: ModeId, sound: String },
    /// Early countdown reminder
    CountdownReminder(u32),
    /// Per-second countdown number
    Countdown(u32),
    /// Zombie idle sound
    Moan(SlotId),
    RoundEnd(RoundEndReason),
}

/// Host engine operations
pub trait Engine {
    fn terminate_round(&mut self, delay: f32, reason: RoundEndReason);

    fn set_team_score(&mut self, team: Team, score: u32);

    fn set_player_team(&mut self, slot: SlotId, team: Team);

    /// Push health, speed, gravity, armor and model onto the player's body
    fn apply_profile(&mut self, slot: SlotId, profile: &CombatProfile);

    fn apply_impulse(&mut self, slot: SlotId, impulse: [f32; 3]);

    /// Normalized view direction of a player
    fn aim_vector(&self, slot: SlotId) -> [f32; 3];

    fn refresh_loadout(&mut self, slot: SlotId, loadout: &Loadout);

    fn emit_cue(&mut self, cue: Cue);
}

/// Result of a veto-capable hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    Allow,
    /// Reject the proposed value; the core falls back to a default
    Deny,
    /// Use this value instead
    Override(ClassId),
}

/// Outbound notifications
///
/// All methods have empty defaults so observers only implement what they
/// care about.
pub trait RoundObserver {
    fn on_round_mode_started(&mut self, _mode: ModeId) {}

    fn on_round_mode_ended(&mut self, _reason: RoundEndReason) {}

    fn on_client_updated(&mut self, _client: SlotId, _attacker: Option<SlotId>) {}

    fn on_client_damaged(
        &mut self,
        _victim: SlotId,
        _attacker: Option<SlotId>,
        _amount: f32,
        _kind: DamageType,
    ) {
    }

    fn on_client_validate_class(&mut self, _client: SlotId, _class: ClassId) -> HookAction {
        HookAction::Allow
    }
}

/// Collaborators injected into the game
pub struct Services {
    pub config: Box<dyn ConfigStore>,
    pub access: Box<dyn AccessControl>,
    pub engine: Box<dyn Engine>,
    pub observers: Vec<Box<dyn RoundObserver>>,
}

impl Services {
    pub fn new(
        config: Box<dyn ConfigStore>,
        access: Box<dyn AccessControl>,
        engine: Box<dyn Engine>,
    ) -> Self {
        Services {
            config,
            access,
            engine,
            observers: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn RoundObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Ask every observer about a class pick
    ///
    /// The first non-`Allow` answer wins.
    pub fn validate_class(&mut self, client: SlotId, class: ClassId) -> HookAction {
        for observer in self.observers.iter_mut() {
            match observer.on_client_validate_class(client, class) {
                HookAction::Allow => continue,
                other => return other,
            }
        }
        HookAction::Allow
    }

    pub fn notify_mode_started(&mut self, mode: ModeId) {
        for observer in self.observers.iter_mut() {
            observer.on_round_mode_started(mode);
        }
    }

    pub fn notify_mode_ended(&mut self, reason: RoundEndReason) {
        for observer in self.observers.iter_mut() {
            observer.on_round_mode_ended(reason);
        }
    }

    pub fn notify_client_updated(&mut self, client: SlotId, attacker: Option<SlotId>) {
        for observer in self.observers.iter_mut() {
            observer.on_client_updated(client, attacker);
        }
    }

    pub fn notify_client_damaged(
        &mut self,
        victim: SlotId,
        attacker: Option<SlotId>,
        amount: f32,
        kind: DamageType,
    ) {
        for observer in self.observers.iter_mut() {
            observer.on_client_damaged(victim, attacker, amount, kind);
        }
    }
}
