//! Cooperative timer scheduler
//!
//! The host calls [`Scheduler::pop_due`] between frames; each due timer is
//! handed out one at a time so a timer body that cancels another timer
//! prevents it from firing in the same frame. Timer ids are never reused.

use crate::core::{EntityId, SlotId};

pub type TimerId = EntityId<Timer>;

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// One-second round countdown tick (global)
    RoundTick,
    /// Zombie health regeneration
    Regen,
    /// End of an active class skill
    SkillEnd,
    /// End of the skill cooldown
    SkillCountdown,
    /// Deferred ammo/weapon HUD refresh after a transition
    HudRefresh,
    /// Zombie idle sound
    Moan,
    /// Bring a dead player back
    Respawn,
}

/// Slot occupant a timer belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerOwner {
    pub slot: SlotId,
    /// Connection serial of the occupant that created the timer
    pub serial: u64,
}

#[derive(Debug, Clone)]
pub struct Timer {
    pub id: TimerId,
    pub kind: TimerKind,
    pub owner: Option<TimerOwner>,
    pub due: f64,
    /// Zero for one-shot timers
    pub interval: f64,
}

impl Timer {
    pub fn is_repeating(&self) -> bool {
        self.interval > 0.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    timers: Vec<Timer>,
    next_id: u32,
    now: f64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time of the last pump
    pub fn now(&self) -> f64 {
        self.now
    }

    fn insert(&mut self, kind: TimerKind, owner: Option<TimerOwner>, due: f64, interval: f64) -> TimerId {
        let id = TimerId::new(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            kind,
            owner,
            due,
            interval,
        });
        id
    }

    /// Fire once after `delay` seconds (0 fires on the next pump)
    pub fn schedule_once(&mut self, kind: TimerKind, owner: Option<TimerOwner>, delay: f64) -> TimerId {
        let due = self.now + delay.max(0.0);
        self.insert(kind, owner, due, 0.0)
    }

    /// Fire every `interval` seconds until cancelled
    ///
    /// A non-positive interval degrades to a one-shot timer.
    pub fn schedule_repeating(
        &mut self,
        kind: TimerKind,
        owner: Option<TimerOwner>,
        interval: f64,
    ) -> TimerId {
        let interval = interval.max(0.0);
        let due = self.now + interval;
        self.insert(kind, owner, due, interval)
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    pub fn get(&self, id: TimerId) -> Option<&Timer> {
        self.timers.iter().find(|t| t.id == id)
    }

    /// Number of live timers of `kind` owned by `slot`
    pub fn count_owned(&self, slot: SlotId, kind: TimerKind) -> usize {
        self.timers
            .iter()
            .filter(|t| t.kind == kind && t.owner.is_some_and(|o| o.slot == slot))
            .count()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Advance the clock to `now`
    pub fn advance(&mut self, now: f64) {
        if now > self.now {
            self.now = now;
        }
    }

    /// Id the next scheduled timer will receive
    ///
    /// Used as a pump horizon: timers created while a frame is being
    /// dispatched get an id at or above it and wait for the next frame.
    pub fn horizon(&self) -> TimerId {
        TimerId::new(self.next_id)
    }

    /// Take the earliest timer due at the current time
    ///
    /// Repeating timers are re-armed before being returned; one-shot timers
    /// are removed. Ties are broken by creation order.
    pub fn pop_due(&mut self) -> Option<Timer> {
        self.pop_due_before(TimerId::new(u32::MAX))
    }

    /// Like [`Scheduler::pop_due`], ignoring timers created at or after `horizon`
    pub fn pop_due_before(&mut self, horizon: TimerId) -> Option<Timer> {
        let now = self.now;
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now && t.id < horizon)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.id.cmp(&b.id)))
            .map(|(idx, _)| idx)?;

        if self.timers[idx].is_repeating() {
            let fired = self.timers[idx].clone();
            self.timers[idx].due += fired.interval;
            Some(fired)
        } else {
            Some(self.timers.remove(idx))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(slot: u32) -> Option<TimerOwner> {
        Some(TimerOwner {
            slot: SlotId::new(slot),
            serial: 1,
        })
    }

    #[test]
    fn test_one_shot_fires_once() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.schedule_once(TimerKind::Respawn, owner(0), 2.0);

        scheduler.advance(1.0);
        assert!(scheduler.pop_due().is_none());

        scheduler.advance(2.0);
        let fired = scheduler.pop_due().unwrap();
        assert_eq!(fired.id, id);
        assert!(scheduler.pop_due().is_none());
        assert!(!scheduler.is_active(id));
    }

    #[test]
    fn test_repeating_rearms() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.schedule_repeating(TimerKind::Regen, owner(1), 1.0);

        scheduler.advance(3.5);
        let mut fired = 0;
        while let Some(timer) = scheduler.pop_due() {
            assert_eq!(timer.id, id);
            fired += 1;
        }
        assert_eq!(fired, 3);
        assert!(scheduler.is_active(id));
        assert_eq!(scheduler.get(id).unwrap().due, 4.0);
    }

    #[test]
    fn test_cancel_and_count() {
        let mut scheduler = Scheduler::new();
        let a = scheduler.schedule_repeating(TimerKind::Regen, owner(1), 1.0);
        scheduler.schedule_repeating(TimerKind::Moan, owner(1), 5.0);
        assert_eq!(scheduler.count_owned(SlotId::new(1), TimerKind::Regen), 1);

        assert!(scheduler.cancel(a));
        assert!(!scheduler.cancel(a));
        assert_eq!(scheduler.count_owned(SlotId::new(1), TimerKind::Regen), 0);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_due_order_breaks_ties_by_creation() {
        let mut scheduler = Scheduler::new();
        let first = scheduler.schedule_once(TimerKind::HudRefresh, owner(0), 0.0);
        let second = scheduler.schedule_once(TimerKind::HudRefresh, owner(1), 0.0);
        let third = scheduler.schedule_once(TimerKind::Respawn, owner(2), 0.0);
        scheduler.advance(0.0);
        assert_eq!(scheduler.pop_due().unwrap().id, first);
        assert_eq!(scheduler.pop_due().unwrap().id, second);
        assert_eq!(scheduler.pop_due().unwrap().id, third);
    }

    #[test]
    fn test_horizon_defers_timers_created_mid_pump() {
        let mut scheduler = Scheduler::new();
        let before = scheduler.schedule_once(TimerKind::Moan, owner(0), 0.0);
        let horizon = scheduler.horizon();
        let after = scheduler.schedule_once(TimerKind::HudRefresh, owner(0), 0.0);

        assert_eq!(scheduler.pop_due_before(horizon).unwrap().id, before);
        assert!(scheduler.pop_due_before(horizon).is_none());
        assert_eq!(scheduler.pop_due().unwrap().id, after);
    }
}
