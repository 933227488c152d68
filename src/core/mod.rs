//! Core game types and entities

pub mod class;
pub mod entity;
pub mod faction;
pub mod mode;
pub mod player;
pub mod types;

pub use class::{ClassDefinition, ClassId, ClassKind, ClassRegistry, Loadout};
pub use entity::{EntityId, GameEntity, SlotArena};
pub use faction::{Faction, PlayerFaction, SubRole, Team};
pub use mode::{Mode, ModeDefinition, ModeFlags, ModeId, ModeRegistry};
pub use player::{CombatProfile, PlayerRecord, PlayerTimers, SkillState, SlotId};
pub use types::{ClassName, ModeName, WeaponName};
