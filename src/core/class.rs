//! Player classes (stat templates) and their registry

use crate::core::{ClassName, EntityId, GameEntity, WeaponName};
use crate::{Result, ZmError};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Maximum number of classes the table accepts
pub const MAX_CLASSES: usize = 64;

pub type ClassId = EntityId<ClassDefinition>;

/// Weapons granted on a faction transition
pub type Loadout = SmallVec<[WeaponName; 4]>;

/// Which faction a class belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassKind {
    Human,
    Zombie,
}

/// Stat template for a human or zombie class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDefinition {
    /// Assigned by the registry; ignored on input
    #[serde(skip, default = "unassigned")]
    pub id: ClassId,
    pub name: ClassName,
    pub kind: ClassKind,
    pub health: i32,
    #[serde(default = "one")]
    pub speed: f32,
    #[serde(default = "one")]
    pub gravity: f32,
    #[serde(default)]
    pub armor: i32,
    #[serde(default = "one")]
    pub knockback: f32,
    /// Seconds between regen ticks (0 disables)
    #[serde(default)]
    pub regen_interval: f32,
    /// Health restored per regen tick (0 disables)
    #[serde(default)]
    pub regen_amount: i32,
    /// Seconds the class skill stays active (0 means no skill)
    #[serde(default)]
    pub skill_duration: f32,
    /// Seconds before the skill can be used again
    #[serde(default)]
    pub skill_countdown: f32,
    /// Minimum player level to pick the class
    #[serde(default)]
    pub level: u32,
    /// Access group required to pick the class
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub loadout: Loadout,
}

fn one() -> f32 {
    1.0
}

fn unassigned() -> ClassId {
    ClassId::new(u32::MAX)
}

impl ClassDefinition {
    pub fn new(name: impl Into<ClassName>, kind: ClassKind, health: i32) -> Self {
        ClassDefinition {
            id: unassigned(),
            name: name.into(),
            kind,
            health,
            speed: 1.0,
            gravity: 1.0,
            armor: 0,
            knockback: 1.0,
            regen_interval: 0.0,
            regen_amount: 0,
            skill_duration: 0.0,
            skill_countdown: 0.0,
            level: 0,
            group: None,
            model: String::new(),
            loadout: Loadout::new(),
        }
    }

    pub fn with_movement(mut self, speed: f32, gravity: f32) -> Self {
        self.speed = speed;
        self.gravity = gravity;
        self
    }

    pub fn with_armor(mut self, armor: i32) -> Self {
        self.armor = armor;
        self
    }

    pub fn with_knockback(mut self, knockback: f32) -> Self {
        self.knockback = knockback;
        self
    }

    pub fn with_regen(mut self, interval: f32, amount: i32) -> Self {
        self.regen_interval = interval;
        self.regen_amount = amount;
        self
    }

    pub fn with_skill(mut self, duration: f32, countdown: f32) -> Self {
        self.skill_duration = duration;
        self.skill_countdown = countdown;
        self
    }

    pub fn with_gate(mut self, level: u32, group: Option<&str>) -> Self {
        self.level = level;
        self.group = group.map(str::to_string);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_loadout(mut self, weapons: &[&str]) -> Self {
        self.loadout = weapons.iter().map(|w| WeaponName::from(*w)).collect();
        self
    }

    pub fn has_regen(&self) -> bool {
        self.regen_interval > 0.0 && self.regen_amount > 0
    }

    pub fn has_skill(&self) -> bool {
        self.skill_duration > 0.0
    }
}

impl GameEntity<ClassDefinition> for ClassDefinition {
    fn id(&self) -> ClassId {
        self.id
    }

    fn name(&self) -> &str {
        self.name.as_str()
    }
}

/// Append-only class table, keyed by id and case-insensitive name
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: Vec<ClassDefinition>,
    by_name: FxHashMap<String, ClassId>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, mut def: ClassDefinition) -> Result<ClassId> {
        if def.name.is_empty() {
            return Err(ZmError::Registration("class name is empty".to_string()));
        }
        if self.classes.len() >= MAX_CLASSES {
            return Err(ZmError::Registration(format!(
                "class table is full ({} entries), \"{}\" dropped",
                MAX_CLASSES, def.name
            )));
        }
        let key = def.name.as_str().to_lowercase();
        if self.by_name.contains_key(&key) {
            return Err(ZmError::Registration(format!(
                "class \"{}\" is already registered",
                def.name
            )));
        }

        let id = ClassId::new(self.classes.len() as u32);
        def.id = id;
        self.by_name.insert(key, id);
        self.classes.push(def);
        Ok(id)
    }

    pub fn get(&self, id: ClassId) -> Option<&ClassDefinition> {
        self.classes.get(id.index())
    }

    pub fn by_name(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    /// Classes of one kind, in registration order
    pub fn of_kind(&self, kind: ClassKind) -> impl Iterator<Item = &ClassDefinition> {
        self.classes.iter().filter(move |c| c.kind == kind)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClassDefinition> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
