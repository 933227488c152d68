//! In-process collaborators for tests, benches and the CLI
//!
//! Every fake hands out a cloneable handle sharing its state, so a caller
//! can keep a handle after boxing the fake into [`Services`] and inspect
//! what the core did.

pub mod driver;

pub use driver::{RoundSimulation, SimulationConfig, SimulationResult};

use crate::config::{ConfigFile, StaticConfig};
use crate::core::{ClassId, CombatProfile, Loadout, ModeId, SlotId, Team};
use crate::game::{DamageType, GameState, RoundEndReason};
use crate::services::{AccessControl, Cue, Engine, HookAction, RoundObserver, Services};
use crate::Result;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// One call the core made on the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    TerminateRound { delay: f32, reason: RoundEndReason },
    TeamScore { team: Team, score: u32 },
    PlayerTeam { slot: SlotId, team: Team },
    Profile { slot: SlotId, health: i32, armor: i32 },
    Impulse { slot: SlotId, impulse: [f32; 3] },
    RefreshLoadout { slot: SlotId, weapons: usize },
    Cue(Cue),
}

#[derive(Debug, Default)]
struct EngineState {
    calls: Vec<EngineCall>,
    aims: FxHashMap<SlotId, [f32; 3]>,
    profiles: FxHashMap<SlotId, CombatProfile>,
}

/// Engine fake that journals every call
#[derive(Debug, Clone, Default)]
pub struct SimEngine {
    state: Rc<RefCell<EngineState>>,
}

impl SimEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.borrow().calls.clone()
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::Cue(cue) => Some(cue.clone()),
                _ => None,
            })
            .collect()
    }

    /// Last profile pushed for a player
    pub fn profile(&self, slot: SlotId) -> Option<CombatProfile> {
        self.state.borrow().profiles.get(&slot).cloned()
    }

    pub fn set_aim(&self, slot: SlotId, aim: [f32; 3]) {
        self.state.borrow_mut().aims.insert(slot, aim);
    }

    pub fn clear(&self) {
        self.state.borrow_mut().calls.clear();
    }

    fn push(&self, call: EngineCall) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl Engine for SimEngine {
    fn terminate_round(&mut self, delay: f32, reason: RoundEndReason) {
        self.push(EngineCall::TerminateRound { delay, reason });
    }

    fn set_team_score(&mut self, team: Team, score: u32) {
        self.push(EngineCall::TeamScore { team, score });
    }

    fn set_player_team(&mut self, slot: SlotId, team: Team) {
        self.push(EngineCall::PlayerTeam { slot, team });
    }

    fn apply_profile(&mut self, slot: SlotId, profile: &CombatProfile) {
        self.push(EngineCall::Profile {
            slot,
            health: profile.health,
            armor: profile.armor,
        });
        self.state.borrow_mut().profiles.insert(slot, profile.clone());
    }

    fn apply_impulse(&mut self, slot: SlotId, impulse: [f32; 3]) {
        self.push(EngineCall::Impulse { slot, impulse });
    }

    fn aim_vector(&self, slot: SlotId) -> [f32; 3] {
        self.state
            .borrow()
            .aims
            .get(&slot)
            .copied()
            .unwrap_or([1.0, 0.0, 0.0])
    }

    fn refresh_loadout(&mut self, slot: SlotId, loadout: &Loadout) {
        self.push(EngineCall::RefreshLoadout {
            slot,
            weapons: loadout.len(),
        });
    }

    fn emit_cue(&mut self, cue: Cue) {
        self.push(EngineCall::Cue(cue));
    }
}

#[derive(Debug, Default)]
struct AccessState {
    levels: FxHashMap<SlotId, u32>,
    groups: FxHashMap<SlotId, Vec<String>>,
}

/// Level and group table keyed by slot
#[derive(Debug, Clone, Default)]
pub struct StaticAccess {
    state: Rc<RefCell<AccessState>>,
}

impl StaticAccess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_level(&self, slot: SlotId, level: u32) {
        self.state.borrow_mut().levels.insert(slot, level);
    }

    pub fn grant_group(&self, slot: SlotId, group: &str) {
        self.state
            .borrow_mut()
            .groups
            .entry(slot)
            .or_default()
            .push(group.to_string());
    }
}

impl AccessControl for StaticAccess {
    fn is_in_group(&self, slot: SlotId, group: &str) -> bool {
        self.state
            .borrow()
            .groups
            .get(&slot)
            .is_some_and(|groups| groups.iter().any(|g| g == group))
    }

    fn level(&self, slot: SlotId) -> u32 {
        self.state.borrow().levels.get(&slot).copied().unwrap_or(0)
    }
}

/// Notification seen by a [`RecordingObserver`]
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    ModeStarted(ModeId),
    ModeEnded(RoundEndReason),
    ClientUpdated {
        client: SlotId,
        attacker: Option<SlotId>,
    },
    ClientDamaged {
        victim: SlotId,
        attacker: Option<SlotId>,
        amount: f32,
        kind: DamageType,
    },
    ValidateClass {
        client: SlotId,
        class: ClassId,
    },
}

#[derive(Debug, Default)]
struct ObserverState {
    events: Vec<ObserverEvent>,
    /// Answer given when a class is validated; absent means Allow
    policy: FxHashMap<ClassId, HookAction>,
}

/// Observer that records notifications and answers class checks from a table
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    state: Rc<RefCell<ObserverState>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObserverEvent> {
        self.state.borrow().events.clone()
    }

    pub fn set_policy(&self, class: ClassId, action: HookAction) {
        self.state.borrow_mut().policy.insert(class, action);
    }

    /// Reason of the most recent round end
    pub fn last_round_end(&self) -> Option<RoundEndReason> {
        self.state.borrow().events.iter().rev().find_map(|e| match e {
            ObserverEvent::ModeEnded(reason) => Some(*reason),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.state.borrow_mut().events.clear();
    }

    fn push(&self, event: ObserverEvent) {
        self.state.borrow_mut().events.push(event);
    }
}

impl RoundObserver for RecordingObserver {
    fn on_round_mode_started(&mut self, mode: ModeId) {
        self.push(ObserverEvent::ModeStarted(mode));
    }

    fn on_round_mode_ended(&mut self, reason: RoundEndReason) {
        self.push(ObserverEvent::ModeEnded(reason));
    }

    fn on_client_updated(&mut self, client: SlotId, attacker: Option<SlotId>) {
        self.push(ObserverEvent::ClientUpdated { client, attacker });
    }

    fn on_client_damaged(
        &mut self,
        victim: SlotId,
        attacker: Option<SlotId>,
        amount: f32,
        kind: DamageType,
    ) {
        self.push(ObserverEvent::ClientDamaged {
            victim,
            attacker,
            amount,
            kind,
        });
    }

    fn on_client_validate_class(&mut self, client: SlotId, class: ClassId) -> HookAction {
        self.push(ObserverEvent::ValidateClass { client, class });
        self.state
            .borrow()
            .policy
            .get(&class)
            .copied()
            .unwrap_or(HookAction::Allow)
    }
}

/// A game wired to in-process fakes, with handles to inspect them
pub struct SimGame {
    pub game: GameState,
    pub engine: SimEngine,
    pub access: StaticAccess,
    pub observer: RecordingObserver,
}

/// Build a seeded game from a config file
///
/// Rejected modes are logged by the game and skipped.
pub fn build_game(file: &ConfigFile, seed: u64) -> Result<SimGame> {
    let config = StaticConfig::from_file(file)?;
    let engine = SimEngine::new();
    let access = StaticAccess::new();
    let observer = RecordingObserver::new();

    let services = Services::new(
        Box::new(config),
        Box::new(access.clone()),
        Box::new(engine.clone()),
    )
    .with_observer(Box::new(observer.clone()));

    let mut game = GameState::new(services);
    game.seed_rng(seed);
    for mode in &file.modes {
        let _ = game.register_mode(mode.clone());
    }

    Ok(SimGame {
        game,
        engine,
        access,
        observer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_game_registers_builtin_modes() {
        let file = ConfigFile::builtin();
        let sim = build_game(&file, 1).unwrap();
        assert_eq!(sim.game.modes.len(), file.modes.len());
        assert!(sim.game.modes.fallback().is_some());
    }

    #[test]
    fn test_engine_handle_shares_journal() {
        let engine = SimEngine::new();
        let mut boxed: Box<dyn Engine> = Box::new(engine.clone());
        boxed.set_team_score(Team::Human, 3);
        assert_eq!(
            engine.calls(),
            vec![EngineCall::TeamScore {
                team: Team::Human,
                score: 3
            }]
        );
    }

    #[test]
    fn test_observer_policy() {
        let mut observer = RecordingObserver::new();
        let class = ClassId::new(2);
        observer.set_policy(class, HookAction::Deny);
        assert_eq!(
            observer.on_client_validate_class(SlotId::new(0), class),
            HookAction::Deny
        );
        assert_eq!(
            observer.on_client_validate_class(SlotId::new(0), ClassId::new(1)),
            HookAction::Allow
        );
    }
}
