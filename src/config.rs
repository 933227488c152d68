//! Gameplay tunables and the JSON config file
//!
//! The core itself only reads `Tunables` and class definitions through the
//! `ConfigStore` trait. This module is the reference store: a JSON document
//! with tunables, classes and modes, loaded with serde_json.

use crate::core::{ClassDefinition, ClassId, ClassKind, ClassRegistry, ModeDefinition, ModeFlags};
use crate::game::HitGroup;
use crate::services::ConfigStore;
use crate::{Result, ZmError};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::path::Path;

/// Gameplay switches and constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    /// Master switch; when off the win check reports Inactive
    pub enabled: bool,

    // Countdown
    pub countdown_seconds: u32,
    pub countdown_reminder_at: u32,
    pub countdown_cue_from: u32,
    pub round_end_delay: f32,

    // Infection rewards for the attacker
    pub infect_health_bonus: i32,
    pub infect_currency_bonus: i32,
    pub infect_experience_bonus: u32,

    // Kill rewards
    pub kill_currency_bonus: i32,
    pub kill_experience_bonus: u32,

    // Leveling
    pub leveling: bool,
    pub level_health_ratio: f32,
    pub level_speed_ratio: f32,
    pub level_gravity_ratio: f32,
    pub level_damage_ratio: f32,

    /// Extra health per alive player for the first zombie of a round
    pub first_zombie_health_per_player: i32,

    // Nemesis
    pub nemesis_health_per_player: i32,
    pub nemesis_speed: f32,
    pub nemesis_gravity: f32,
    pub nemesis_knockback: f32,
    pub nemesis_model: String,
    pub nemesis_loadout: Vec<String>,

    // Survivor
    pub survivor_health_per_player: i32,
    pub survivor_speed: f32,
    pub survivor_gravity: f32,
    pub survivor_armor: i32,
    pub survivor_model: String,
    pub survivor_loadout: Vec<String>,

    // Infection rules
    /// The last alive human may be infected
    pub last_human_infection: bool,
    /// Armor soaks infection hits before the human turns
    pub armor_protect: bool,

    // Knockback
    pub hitgroups: bool,
    pub hitgroup_knockback: BTreeMap<HitGroup, f32>,

    // Damage rewards
    pub reward_ammo_threshold: f64,
    pub reward_experience_threshold: f64,
    pub reward_ammo_amount: i32,
    pub reward_experience_amount: u32,

    // Respawn
    pub respawn_delay: f32,
    pub respawn_as_zombie: bool,

    /// Seconds between zombie moans (0 disables)
    pub moan_interval: f32,
}

impl Default for Tunables {
    fn default() -> Self {
        Tunables {
            enabled: true,
            countdown_seconds: 20,
            countdown_reminder_at: 18,
            countdown_cue_from: 10,
            round_end_delay: 5.0,
            infect_health_bonus: 100,
            infect_currency_bonus: 1,
            infect_experience_bonus: 2,
            kill_currency_bonus: 1,
            kill_experience_bonus: 1,
            leveling: true,
            level_health_ratio: 10.0,
            level_speed_ratio: 0.01,
            level_gravity_ratio: -0.01,
            level_damage_ratio: 0.05,
            first_zombie_health_per_player: 100,
            nemesis_health_per_player: 2500,
            nemesis_speed: 1.25,
            nemesis_gravity: 0.5,
            nemesis_knockback: 0.25,
            nemesis_model: "models/zombie/nemesis".to_string(),
            nemesis_loadout: vec!["weapon_knife".to_string()],
            survivor_health_per_player: 150,
            survivor_speed: 1.1,
            survivor_gravity: 1.0,
            survivor_armor: 100,
            survivor_model: "models/human/survivor".to_string(),
            survivor_loadout: vec!["weapon_m249".to_string(), "weapon_knife".to_string()],
            last_human_infection: false,
            armor_protect: true,
            hitgroups: true,
            hitgroup_knockback: BTreeMap::new(),
            reward_ammo_threshold: 500.0,
            reward_experience_threshold: 1000.0,
            reward_ammo_amount: 1,
            reward_experience_amount: 1,
            respawn_delay: 5.0,
            respawn_as_zombie: true,
            moan_interval: 30.0,
        }
    }
}

impl Tunables {
    /// Knockback multiplier for a hit location (1.0 when disabled or unset)
    pub fn hitgroup_coefficient(&self, group: HitGroup) -> f32 {
        if !self.hitgroups {
            return 1.0;
        }
        self.hitgroup_knockback.get(&group).copied().unwrap_or(1.0)
    }
}

/// On-disk config document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub tunables: Tunables,
    #[serde(default)]
    pub classes: Vec<ClassDefinition>,
    #[serde(default)]
    pub modes: Vec<ModeDefinition>,
}

impl ConfigFile {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Built-in classes and modes used when no file is given
    pub fn builtin() -> Self {
        let classes = vec![
            ClassDefinition::new("Soldier", ClassKind::Human, 100)
                .with_armor(50)
                .with_model("models/human/soldier")
                .with_loadout(&["weapon_ak47", "weapon_deagle", "weapon_knife"]),
            ClassDefinition::new("Sniper", ClassKind::Human, 90)
                .with_gate(5, None)
                .with_movement(1.05, 1.0)
                .with_model("models/human/sniper")
                .with_loadout(&["weapon_awp", "weapon_knife"]),
            ClassDefinition::new("Classic", ClassKind::Zombie, 2000)
                .with_regen(2.0, 50)
                .with_skill(5.0, 30.0)
                .with_model("models/zombie/classic")
                .with_loadout(&["weapon_knife"]),
            ClassDefinition::new("Fast", ClassKind::Zombie, 1400)
                .with_movement(1.25, 0.9)
                .with_knockback(1.5)
                .with_skill(3.0, 20.0)
                .with_model("models/zombie/fast")
                .with_loadout(&["weapon_knife"]),
            ClassDefinition::new("Tank", ClassKind::Zombie, 3500)
                .with_movement(0.85, 1.1)
                .with_knockback(0.5)
                .with_gate(10, Some("vip"))
                .with_model("models/zombie/tank")
                .with_loadout(&["weapon_knife"]),
        ];

        let infection = ModeFlags::INFECTION | ModeFlags::RESPAWN;
        let modes = vec![
            ModeDefinition::new("normal", 0, 0, 0.0, infection)
                .with_description("A single zombie starts the outbreak")
                .with_sound("round/normal"),
            ModeDefinition::new("multi", 20, 2, 0.15, infection)
                .with_description("Several zombies start the outbreak")
                .with_sound("round/multi"),
            ModeDefinition::new("swarm", 25, 4, 0.5, ModeFlags::RESPAWN)
                .with_description("Half the server turns at once")
                .with_sound("round/swarm"),
            ModeDefinition::new("nemesis", 30, 4, 0.0, ModeFlags::NEMESIS)
                .with_description("One nemesis against everyone")
                .with_sound("round/nemesis"),
            ModeDefinition::new("survivor", 30, 4, 0.9, ModeFlags::SURVIVOR | ModeFlags::RESPAWN)
                .with_description("One survivor against the horde")
                .with_sound("round/survivor"),
            ModeDefinition::new("armageddon", 50, 8, 0.5, ModeFlags::SURVIVOR | ModeFlags::NEMESIS)
                .with_description("Survivors against nemeses")
                .with_sound("round/armageddon"),
        ];

        ConfigFile {
            tunables: Tunables::default(),
            classes,
            modes,
        }
    }
}

/// `ConfigStore` backed by an in-memory class table
#[derive(Debug, Clone)]
pub struct StaticConfig {
    classes: ClassRegistry,
    tunables: Tunables,
}

impl StaticConfig {
    pub fn new(tunables: Tunables) -> Self {
        StaticConfig {
            classes: ClassRegistry::new(),
            tunables,
        }
    }

    /// Register every class of the file
    ///
    /// A rejected class is reported as an error; classes are part of the
    /// static setup, so there is nothing sensible to continue with.
    pub fn from_file(file: &ConfigFile) -> Result<Self> {
        let mut config = StaticConfig::new(file.tunables.clone());
        for class in &file.classes {
            config.register_class(class.clone())?;
        }
        Ok(config)
    }

    pub fn register_class(&mut self, def: ClassDefinition) -> Result<ClassId> {
        self.classes.register(def)
    }

    pub fn classes_table(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn tunables_mut(&mut self) -> &mut Tunables {
        &mut self.tunables
    }
}

impl ConfigStore for StaticConfig {
    fn class(&self, id: ClassId) -> Option<&ClassDefinition> {
        self.classes.get(id)
    }

    fn classes(&self, kind: ClassKind) -> SmallVec<[ClassId; 8]> {
        self.classes.of_kind(kind).map(|c| c.id).collect()
    }

    fn tunables(&self) -> &Tunables {
        &self.tunables
    }
}

/// Load a config file, or the built-in one when `path` is `None`
pub fn load_or_builtin(path: Option<&Path>) -> Result<ConfigFile> {
    match path {
        Some(p) if !p.exists() => Err(ZmError::InvalidAction(format!(
            "config file {} does not exist",
            p.display()
        ))),
        Some(p) => ConfigFile::load(p),
        None => Ok(ConfigFile::builtin()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_tunables_use_defaults() {
        let json = r#"{ "tunables": { "countdown_seconds": 5, "last_human_infection": true } }"#;
        let file = ConfigFile::from_json_str(json).unwrap();
        assert_eq!(file.tunables.countdown_seconds, 5);
        assert!(file.tunables.last_human_infection);
        assert_eq!(file.tunables.round_end_delay, 5.0);
        assert!(file.classes.is_empty());
    }

    #[test]
    fn test_builtin_round_trips_through_json() {
        let file = ConfigFile::builtin();
        let json = file.to_json_string().unwrap();
        let back = ConfigFile::from_json_str(&json).unwrap();
        assert_eq!(back.modes, file.modes);
        assert_eq!(back.classes.len(), file.classes.len());
        assert_eq!(back.tunables, file.tunables);
    }

    #[test]
    fn test_static_config_lists_classes_by_kind() {
        let config = StaticConfig::from_file(&ConfigFile::builtin()).unwrap();
        assert_eq!(config.classes(ClassKind::Human).len(), 2);
        assert_eq!(config.classes(ClassKind::Zombie).len(), 3);
        let first = config.classes(ClassKind::Zombie)[0];
        assert_eq!(config.class(first).unwrap().name.as_str(), "Classic");
    }

    #[test]
    fn test_hitgroup_coefficient() {
        let mut tunables = Tunables::default();
        tunables.hitgroup_knockback.insert(HitGroup::Head, 2.0);
        assert_eq!(tunables.hitgroup_coefficient(HitGroup::Head), 2.0);
        assert_eq!(tunables.hitgroup_coefficient(HitGroup::Chest), 1.0);
        tunables.hitgroups = false;
        assert_eq!(tunables.hitgroup_coefficient(HitGroup::Head), 1.0);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_or_builtin(Some(Path::new("/nonexistent/zmod.json")));
        assert!(result.is_err());
        assert!(load_or_builtin(None).is_ok());
    }
}
