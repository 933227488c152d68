//! Per-player faction transitions
//!
//! A transition always rebuilds the whole combat profile from the class (or
//! sub-role constants) and the player's level; nothing is patched in place
//! except armor, which humans carry over.

use crate::config::Tunables;
use crate::core::{
    ClassDefinition, ClassId, ClassKind, CombatProfile, Loadout, PlayerFaction, SlotId, WeaponName,
};
use crate::game::scheduler::TimerKind;
use crate::game::state::GameState;
use crate::services::HookAction;
use rand::seq::SliceRandom;

/// Who caused a zombie transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfectionSource {
    /// Infected by another player, who is rewarded
    Player(SlotId),
    /// Picked at round start; the victim is refunded their last purchase
    Server,
    /// Respawn or admin command
    None,
}

impl InfectionSource {
    pub fn attacker(self) -> Option<SlotId> {
        match self {
            InfectionSource::Player(slot) => Some(slot),
            InfectionSource::Server | InfectionSource::None => None,
        }
    }
}

fn loadout_of(weapons: &[String]) -> Loadout {
    weapons.iter().map(|w| WeaponName::new(w.as_str())).collect()
}

/// Linear level bonus; zero when leveling is off
fn level_bonus(tunables: &Tunables, level: u32, ratio: f32) -> f32 {
    if tunables.leveling {
        level as f32 * ratio
    } else {
        0.0
    }
}

fn class_profile(class: Option<&ClassDefinition>) -> CombatProfile {
    match class {
        Some(class) => CombatProfile {
            health: class.health,
            max_health: class.health,
            speed: class.speed,
            gravity: class.gravity,
            armor: class.armor,
            knockback: class.knockback,
            model: class.model.clone(),
            loadout: class.loadout.clone(),
        },
        None => CombatProfile::default(),
    }
}

impl GameState {
    fn class_allowed(&self, slot: SlotId, class: &ClassDefinition, kind: ClassKind) -> bool {
        if class.kind != kind {
            return false;
        }
        if self.services.access.level(slot) < class.level {
            return false;
        }
        match &class.group {
            Some(group) => self.services.access.is_in_group(slot, group),
            None => true,
        }
    }

    fn first_allowed_class(
        &self,
        slot: SlotId,
        kind: ClassKind,
        except: Option<ClassId>,
    ) -> Option<ClassId> {
        let config = &self.services.config;
        config.classes(kind).into_iter().find(|&id| {
            Some(id) != except
                && config
                    .class(id)
                    .is_some_and(|c| self.class_allowed(slot, c, kind))
        })
    }

    /// Pick the class a transition will use
    ///
    /// Bots get a random allowed class. Players get their pending pick (or
    /// current class) when it still passes the level and group gates, and
    /// the first allowed class otherwise. Observers are asked about the
    /// pick: a denial moves on to the next allowed class, which is asked
    /// again, and an override picks any class of the right kind. `None`
    /// when every allowed class is denied.
    pub(crate) fn resolve_class(&mut self, slot: SlotId, kind: ClassKind) -> Option<ClassId> {
        let player = self.player(slot)?;
        let (is_bot, requested) = match kind {
            ClassKind::Human => (player.is_bot, player.next_human_class.or(player.human_class)),
            ClassKind::Zombie => (player.is_bot, player.next_zombie_class.or(player.zombie_class)),
        };

        let allowed = |id: ClassId| {
            self.services
                .config
                .class(id)
                .is_some_and(|c| self.class_allowed(slot, c, kind))
        };

        let proposed = if is_bot {
            let candidates: Vec<ClassId> = self
                .services
                .config
                .classes(kind)
                .into_iter()
                .filter(|&id| allowed(id))
                .collect();
            let mut rng = self.rng.borrow_mut();
            let pick = candidates.choose(&mut *rng).copied();
            pick
        } else {
            requested
                .filter(|&id| allowed(id))
                .or_else(|| self.first_allowed_class(slot, kind, None))
        };
        let proposed = proposed?;

        let mut candidates = vec![proposed];
        candidates.extend(
            self.services
                .config
                .classes(kind)
                .into_iter()
                .filter(|&id| id != proposed && allowed(id)),
        );

        for candidate in candidates {
            match self.services.validate_class(slot, candidate) {
                HookAction::Allow => return Some(candidate),
                HookAction::Override(id) => {
                    let valid = self.services.config.class(id).is_some_and(|c| c.kind == kind);
                    return Some(if valid { id } else { candidate });
                }
                HookAction::Deny => {
                    log_event!(self, Verbose, "transition", "Class {} denied for {}", candidate, slot);
                }
            }
        }
        log_event!(self, Verbose, "transition", "Every {:?} class denied for {}", kind, slot);
        None
    }

    fn zombie_profile(
        &self,
        class: Option<ClassId>,
        nemesis: bool,
        first_zombie: bool,
        alive: usize,
        level: u32,
    ) -> CombatProfile {
        let t = self.tunables();
        if nemesis {
            let health = alive as i32 * t.nemesis_health_per_player;
            return CombatProfile {
                health,
                max_health: health,
                speed: t.nemesis_speed,
                gravity: t.nemesis_gravity,
                armor: 0,
                knockback: t.nemesis_knockback,
                model: t.nemesis_model.clone(),
                loadout: loadout_of(&t.nemesis_loadout),
            };
        }

        let mut profile = class_profile(class.and_then(|id| self.services.config.class(id)));
        // The first-zombie bonus replaces the level bonus
        if first_zombie {
            profile.health += alive as i32 * t.first_zombie_health_per_player;
        } else {
            profile.health += level_bonus(t, level, t.level_health_ratio) as i32;
        }
        profile.max_health = profile.health;
        profile.speed += level_bonus(t, level, t.level_speed_ratio);
        profile.gravity += level_bonus(t, level, t.level_gravity_ratio);
        profile
    }

    fn human_profile(
        &self,
        class: Option<ClassId>,
        survivor: bool,
        alive: usize,
        level: u32,
        current_armor: i32,
    ) -> CombatProfile {
        let t = self.tunables();
        let mut profile = if survivor {
            let health = alive as i32 * t.survivor_health_per_player;
            CombatProfile {
                health,
                max_health: health,
                speed: t.survivor_speed,
                gravity: t.survivor_gravity,
                armor: t.survivor_armor,
                knockback: 1.0,
                model: t.survivor_model.clone(),
                loadout: loadout_of(&t.survivor_loadout),
            }
        } else {
            let mut profile = class_profile(class.and_then(|id| self.services.config.class(id)));
            profile.health += level_bonus(t, level, t.level_health_ratio) as i32;
            profile.max_health = profile.health;
            profile.speed += level_bonus(t, level, t.level_speed_ratio);
            profile.gravity += level_bonus(t, level, t.level_gravity_ratio);
            profile
        };
        profile.armor = profile.armor.max(current_armor);
        profile
    }

    /// Reward the infecting player, or refund a round-start pick
    fn grant_infection_rewards(&mut self, victim: SlotId, source: InfectionSource) {
        let t = self.services.config.tunables();
        let (health, currency, experience) = (
            t.infect_health_bonus,
            t.infect_currency_bonus,
            t.infect_experience_bonus,
        );
        match source {
            InfectionSource::Player(attacker) if attacker != victim => {
                let Ok(player) = self.players.get_mut(attacker) else {
                    return;
                };
                player.profile.health += health;
                player.currency += currency;
                player.experience += experience;
                self.services.engine.apply_profile(attacker, &player.profile);
            }
            InfectionSource::Server => {
                if let Ok(player) = self.players.get_mut(victim) {
                    player.currency += player.last_spent;
                    player.last_spent = 0;
                }
            }
            InfectionSource::Player(_) | InfectionSource::None => {}
        }
    }

    /// Apply the rebuilt profile and restart the per-faction timers
    fn finish_transition(
        &mut self,
        slot: SlotId,
        faction: PlayerFaction,
        profile: CombatProfile,
        respawn: bool,
    ) {
        let Some(owner) = self.owner_of(slot) else {
            return;
        };
        let Ok(player) = self.players.get_mut(slot) else {
            return;
        };
        player.faction = faction;
        player.skill = Default::default();
        player.profile = profile;
        if respawn {
            player.reset_life_counters();
        }

        // An in-flight respawn sets the team itself once it completes
        let team = faction.team();
        if !player.respawning && player.team != team {
            player.team = team;
            self.services.engine.set_player_team(slot, team);
        }
        self.services.engine.apply_profile(slot, &player.profile);

        player.timers.hud = Some(self.scheduler.schedule_once(TimerKind::HudRefresh, Some(owner), 0.0));
    }

    /// Turn `victim` into a zombie (or nemesis)
    ///
    /// Returns false when the victim is not connected and alive.
    pub fn make_zombie(
        &mut self,
        victim: SlotId,
        source: InfectionSource,
        nemesis: bool,
        respawn: bool,
    ) -> bool {
        if !self.is_alive(victim) {
            return false;
        }

        self.grant_infection_rewards(victim, source);
        self.cancel_player_timers(victim);

        let first_zombie = self.round.first_zombie_pending && !nemesis;
        self.round.first_zombie_pending = false;

        let class = if nemesis {
            None
        } else {
            self.resolve_class(victim, ClassKind::Zombie)
        };
        let alive = self.alive_count();
        let level = self.services.access.level(victim);
        let profile = self.zombie_profile(class, nemesis, first_zombie, alive, level);

        if let Ok(player) = self.players.get_mut(victim) {
            if class.is_some() {
                player.zombie_class = class;
            }
        }
        self.finish_transition(victim, PlayerFaction::zombie(nemesis), profile, respawn);

        let Some(owner) = self.owner_of(victim) else {
            return false;
        };
        let regen = class
            .and_then(|id| self.services.config.class(id))
            .filter(|c| c.has_regen())
            .map(|c| c.regen_interval);
        let moan_interval = self.tunables().moan_interval;
        let regen_timer =
            regen.map(|interval| self.scheduler.schedule_repeating(TimerKind::Regen, Some(owner), interval as f64));
        let moan_timer = (moan_interval > 0.0).then(|| {
            self.scheduler
                .schedule_repeating(TimerKind::Moan, Some(owner), moan_interval as f64)
        });
        if let Ok(player) = self.players.get_mut(victim) {
            player.timers.regen = regen_timer;
            player.timers.moan = moan_timer;
        }

        let attacker = source.attacker();
        log_event!(
            self,
            Normal,
            "transition",
            "{} became a {}{}",
            self.player(victim).map(|p| p.name.as_str()).unwrap_or("?"),
            PlayerFaction::zombie(nemesis),
            match attacker.and_then(|a| self.player(a)) {
                Some(a) => format!(" (infected by {})", a.name),
                None => String::new(),
            }
        );

        self.services.notify_client_updated(victim, attacker);
        self.check_win(true);
        true
    }

    /// Turn `victim` into a human (or survivor)
    ///
    /// Returns false when the victim is not connected and alive.
    pub fn make_human(&mut self, victim: SlotId, survivor: bool, respawn: bool) -> bool {
        let Some(current_armor) = self.player(victim).filter(|p| p.alive).map(|p| p.profile.armor)
        else {
            return false;
        };

        self.cancel_player_timers(victim);

        let class = if survivor {
            None
        } else {
            self.resolve_class(victim, ClassKind::Human)
        };
        let alive = self.alive_count();
        let level = self.services.access.level(victim);
        let profile = self.human_profile(class, survivor, alive, level, current_armor);

        if let Ok(player) = self.players.get_mut(victim) {
            if class.is_some() {
                player.human_class = class;
            }
        }
        self.finish_transition(victim, PlayerFaction::human(survivor), profile, respawn);

        log_event!(
            self,
            Normal,
            "transition",
            "{} became a {}",
            self.player(victim).map(|p| p.name.as_str()).unwrap_or("?"),
            PlayerFaction::human(survivor)
        );

        self.services.notify_client_updated(victim, None);
        self.check_win(true);
        true
    }
}
