//! Turning a selected mode into per-player factions

use crate::core::{ModeId, SlotId};
use crate::game::state::GameState;
use crate::game::transition::InfectionSource;
use rand::Rng;

/// Number of zombies to create at round start
///
/// `ceil(alive * ratio)`, never everyone and never nobody.
pub fn zombie_target(alive: usize, ratio: f32) -> usize {
    if alive == 0 {
        return 0;
    }
    // Tolerate f32 ratios that land a hair above an integer product
    let raw = (alive as f64 * ratio.clamp(0.0, 1.0) as f64 - 1e-6).ceil();
    let mut target = raw.max(0.0) as usize;
    if target >= alive {
        target = alive - 1;
    }
    if target == 0 {
        target = 1;
    }
    target
}

impl GameState {
    fn take_random(&self, pool: &mut Vec<SlotId>) -> Option<SlotId> {
        if pool.is_empty() {
            return None;
        }
        let idx = self.rng.borrow_mut().gen_range(0..pool.len());
        Some(pool.swap_remove(idx))
    }

    fn take_selected(pool: &mut Vec<SlotId>, selected: &mut Option<SlotId>) -> Option<SlotId> {
        let slot = selected.take()?;
        let idx = pool.iter().position(|&s| s == slot)?;
        Some(pool.swap_remove(idx))
    }

    /// Assign round-start factions for `mode` to every alive player
    ///
    /// `selected`, when alive, is the survivor on survivor modes and the
    /// first zombie otherwise.
    pub fn assign_factions(&mut self, mode: ModeId, selected: Option<SlotId>) {
        let Some(mode) = self.modes.by_id(mode).cloned() else {
            return;
        };
        let mut pool = self.alive_slots();
        let alive = pool.len();
        if alive == 0 {
            return;
        }

        let target = zombie_target(alive, mode.ratio());
        let survivors = mode.is_survivor();
        let nemesis = mode.is_nemesis();
        let mut selected = selected;

        log_event!(
            self,
            Verbose,
            "assign",
            "Assigning {} of {} alive players as zombies ({})",
            target,
            alive,
            mode.def.name
        );

        if survivors {
            let survivor = Self::take_selected(&mut pool, &mut selected)
                .or_else(|| self.take_random(&mut pool));
            if let Some(slot) = survivor {
                self.make_human(slot, true, false);
            }
        }

        for _ in 0..target {
            let pick = Self::take_selected(&mut pool, &mut selected)
                .or_else(|| self.take_random(&mut pool));
            let Some(slot) = pick else {
                break;
            };
            self.make_zombie(slot, InfectionSource::Server, nemesis, false);
        }

        for slot in pool {
            self.make_human(slot, survivors, false);
        }
    }
}
