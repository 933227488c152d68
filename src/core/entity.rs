//! Typed integer ids and the fixed-capacity slot arena

use crate::{Result, ZmError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Simple integer ID tagged with the kind of thing it names
///
/// The tag keeps a `ModeId` from being passed where a `ClassId` is expected.
/// Ids are dense and assigned in registration / slot order.
#[derive(Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct EntityId<T> {
    raw: u32,
    #[serde(skip)]
    _marker: PhantomData<fn() -> T>,
}

impl<T> EntityId<T> {
    pub const fn new(raw: u32) -> Self {
        EntityId {
            raw,
            _marker: PhantomData,
        }
    }

    pub fn as_u32(&self) -> u32 {
        self.raw
    }

    pub fn index(&self) -> usize {
        self.raw as usize
    }
}

// Manual impls: derives would put bounds on `T`, which is only a tag.
impl<T> Clone for EntityId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for EntityId<T> {}

impl<T> PartialEq for EntityId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for EntityId<T> {}

impl<T> PartialOrd for EntityId<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for EntityId<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T> Hash for EntityId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for EntityId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.raw)
    }
}

impl<T> fmt::Display for EntityId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Base trait for registered game entities
pub trait GameEntity<T> {
    fn id(&self) -> EntityId<T>;
    fn name(&self) -> &str;
}

/// Fixed-capacity arena of reusable slots
///
/// Slot ids are recycled: when a slot is released and acquired again the
/// same id names a different occupant. Anything that outlives an occupant
/// (timers, deferred work) must be cancelled on release.
#[derive(Debug, Clone)]
pub struct SlotArena<T> {
    slots: Vec<Option<T>>,
}

impl<T> SlotArena<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        SlotArena { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Occupy the lowest free slot
    pub fn acquire(&mut self, value: T) -> Result<EntityId<T>> {
        let capacity = self.capacity();
        let idx = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(ZmError::ServerFull(capacity))?;
        self.slots[idx] = Some(value);
        Ok(EntityId::new(idx as u32))
    }

    /// Free a slot, returning its previous occupant
    pub fn release(&mut self, id: EntityId<T>) -> Option<T> {
        self.slots.get_mut(id.index()).and_then(Option::take)
    }

    pub fn get(&self, id: EntityId<T>) -> Result<&T> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(ZmError::InvalidSlot(id.as_u32()))
    }

    pub fn get_mut(&mut self, id: EntityId<T>) -> Result<&mut T> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(ZmError::InvalidSlot(id.as_u32()))
    }

    pub fn contains(&self, id: EntityId<T>) -> bool {
        matches!(self.slots.get(id.index()), Some(Some(_)))
    }

    /// Iterate over occupied slots in slot order
    pub fn iter(&self) -> impl Iterator<Item = (EntityId<T>, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|v| (EntityId::new(idx as u32), v)))
    }

    pub fn ids(&self) -> Vec<EntityId<T>> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
