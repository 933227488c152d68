//! Round modes and the append-only mode registry

use crate::core::{EntityId, GameEntity, ModeName};
use crate::{Result, ZmError};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Maximum number of modes the table accepts
pub const MAX_MODES: usize = 32;

pub type ModeId = EntityId<Mode>;

bitflags::bitflags! {
    /// Behaviour switches of a mode
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ModeFlags: u8 {
        /// Zombie hits convert humans instead of damaging them
        const INFECTION = 0b0001;
        /// Dead players come back during the round
        const RESPAWN   = 0b0010;
        /// Humans are assigned the Survivor sub-role
        const SURVIVOR  = 0b0100;
        /// Zombies are assigned the Nemesis sub-role
        const NEMESIS   = 0b1000;
    }
}

/// Mode as supplied by a registrant (config file or plugin)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeDefinition {
    pub name: ModeName,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sound: String,
    /// 0 marks the fallback mode, N > 0 is a 1-in-N trial
    pub chance: u32,
    /// Alive count must be strictly greater than this
    #[serde(default)]
    pub min_players: usize,
    /// Share of alive players turned into zombies at round start
    pub ratio: f32,
    #[serde(default)]
    pub flags: ModeFlags,
}

impl ModeDefinition {
    pub fn new(
        name: impl Into<ModeName>,
        chance: u32,
        min_players: usize,
        ratio: f32,
        flags: ModeFlags,
    ) -> Self {
        ModeDefinition {
            name: name.into(),
            description: String::new(),
            sound: String::new(),
            chance,
            min_players,
            ratio,
            flags,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = sound.into();
        self
    }
}

/// A registered, immutable mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mode {
    pub id: ModeId,
    pub def: ModeDefinition,
}

impl Mode {
    pub fn chance(&self) -> u32 {
        self.def.chance
    }

    pub fn min_players(&self) -> usize {
        self.def.min_players
    }

    pub fn ratio(&self) -> f32 {
        self.def.ratio
    }

    pub fn is_fallback(&self) -> bool {
        self.def.chance == 0
    }

    pub fn is_infection(&self) -> bool {
        self.def.flags.contains(ModeFlags::INFECTION)
    }

    pub fn allows_respawn(&self) -> bool {
        self.def.flags.contains(ModeFlags::RESPAWN)
    }

    pub fn is_survivor(&self) -> bool {
        self.def.flags.contains(ModeFlags::SURVIVOR)
    }

    pub fn is_nemesis(&self) -> bool {
        self.def.flags.contains(ModeFlags::NEMESIS)
    }
}

impl GameEntity<Mode> for Mode {
    fn id(&self) -> ModeId {
        self.id
    }

    fn name(&self) -> &str {
        self.def.name.as_str()
    }
}

/// Append-only table of modes
///
/// Ids are assigned in registration order and never change. The table is
/// closed once the first round starts; later registrations are rejected.
#[derive(Debug, Clone, Default)]
pub struct ModeRegistry {
    modes: Vec<Mode>,
    by_name: FxHashMap<String, ModeId>,
    closed: bool,
}

impl ModeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, def: ModeDefinition) -> Result<ModeId> {
        if self.closed {
            return Err(ZmError::RegistrationClosed(format!("mode \"{}\"", def.name)));
        }
        if def.name.is_empty() {
            return Err(ZmError::Registration("mode name is empty".to_string()));
        }
        if self.modes.len() >= MAX_MODES {
            return Err(ZmError::Registration(format!(
                "mode table is full ({} entries), \"{}\" dropped",
                MAX_MODES, def.name
            )));
        }
        let key = def.name.as_str().to_lowercase();
        if self.by_name.contains_key(&key) {
            return Err(ZmError::Registration(format!(
                "mode \"{}\" is already registered",
                def.name
            )));
        }
        // The fallback must be able to run at any population
        if def.chance == 0 && def.min_players > 0 {
            return Err(ZmError::Registration(format!(
                "fallback mode \"{}\" cannot require {} players",
                def.name, def.min_players
            )));
        }
        if !(0.0..=1.0).contains(&def.ratio) {
            return Err(ZmError::Registration(format!(
                "mode \"{}\" has ratio {} outside 0..=1",
                def.name, def.ratio
            )));
        }

        let id = ModeId::new(self.modes.len() as u32);
        self.by_name.insert(key, id);
        self.modes.push(Mode { id, def });
        Ok(id)
    }

    pub fn by_id(&self, id: ModeId) -> Option<&Mode> {
        self.modes.get(id.index())
    }

    /// Case-insensitive lookup by name
    pub fn by_name(&self, name: &str) -> Option<ModeId> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    /// First registered mode with `chance == 0`
    pub fn fallback(&self) -> Option<&Mode> {
        self.modes.iter().find(|m| m.is_fallback())
    }

    /// Modes in registration order
    pub fn iter(&self) -> std::slice::Iter<'_, Mode> {
        self.modes.iter()
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infection(name: &str, chance: u32) -> ModeDefinition {
        ModeDefinition::new(name, chance, 0, 0.1, ModeFlags::INFECTION | ModeFlags::RESPAWN)
    }

    #[test]
    fn test_register_assigns_dense_ids() {
        let mut registry = ModeRegistry::new();
        let a = registry.register(infection("normal", 0)).unwrap();
        let b = registry.register(infection("multi", 20)).unwrap();
        assert_eq!(a.as_u32(), 0);
        assert_eq!(b.as_u32(), 1);
        assert_eq!(registry.by_name("MULTI"), Some(b));
        assert_eq!(registry.by_id(a).unwrap().name(), "normal");
        assert!(registry.by_id(ModeId::new(9)).is_none());
        assert!(registry.by_name("swarm").is_none());
    }

    #[test]
    fn test_rejects_empty_and_duplicate_names() {
        let mut registry = ModeRegistry::new();
        assert!(matches!(
            registry.register(infection("", 0)),
            Err(ZmError::Registration(_))
        ));
        registry.register(infection("normal", 0)).unwrap();
        assert!(matches!(
            registry.register(infection("Normal", 5)),
            Err(ZmError::Registration(_))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_rejects_full_table() {
        let mut registry = ModeRegistry::new();
        for i in 0..MAX_MODES {
            registry.register(infection(&format!("mode{}", i), 1)).unwrap();
        }
        assert!(registry.register(infection("overflow", 1)).is_err());
        assert_eq!(registry.len(), MAX_MODES);
    }

    #[test]
    fn test_fallback_with_minimum_is_rejected() {
        let mut registry = ModeRegistry::new();
        let def = ModeDefinition::new("normal", 0, 5, 0.1, ModeFlags::INFECTION);
        assert!(matches!(registry.register(def), Err(ZmError::Registration(_))));
        assert!(registry.fallback().is_none());
    }

    #[test]
    fn test_closed_registry_rejects() {
        let mut registry = ModeRegistry::new();
        registry.register(infection("normal", 0)).unwrap();
        registry.close();
        assert!(matches!(
            registry.register(infection("late", 3)),
            Err(ZmError::RegistrationClosed(_))
        ));
    }

    #[test]
    fn test_fallback_and_flags() {
        let mut registry = ModeRegistry::new();
        registry.register(infection("multi", 20)).unwrap();
        let normal = registry.register(infection("normal", 0)).unwrap();
        let fallback = registry.fallback().unwrap();
        assert_eq!(fallback.id, normal);
        assert!(fallback.is_infection());
        assert!(fallback.allows_respawn());
        assert!(!fallback.is_survivor());
        assert!(!fallback.is_nemesis());
    }
}
