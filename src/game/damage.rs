//! Damage interception: infection, armor absorption, knockback, rewards

use crate::core::SlotId;
use crate::game::reward::RewardKind;
use crate::game::round::RoundState;
use crate::game::state::GameState;
use crate::game::transition::InfectionSource;
use serde::{Deserialize, Serialize};

/// Body part hit by an attack
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum HitGroup {
    #[default]
    Generic,
    Head,
    Chest,
    Stomach,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    #[default]
    Bullet,
    Melee,
    Explosion,
    Other,
}

/// Multipliers of the weapon that dealt the hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    pub damage: f32,
    pub knockback: f32,
}

impl Default for WeaponProfile {
    fn default() -> Self {
        WeaponProfile {
            damage: 1.0,
            knockback: 1.0,
        }
    }
}

/// A single hit as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    pub victim: SlotId,
    pub attacker: Option<SlotId>,
    pub amount: f32,
    pub kind: DamageType,
    pub hitgroup: HitGroup,
    pub weapon: WeaponProfile,
}

impl DamageEvent {
    pub fn new(victim: SlotId, attacker: Option<SlotId>, amount: f32) -> Self {
        DamageEvent {
            victim,
            attacker,
            amount,
            kind: DamageType::default(),
            hitgroup: HitGroup::default(),
            weapon: WeaponProfile::default(),
        }
    }

    pub fn with_kind(mut self, kind: DamageType) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_hitgroup(mut self, hitgroup: HitGroup) -> Self {
        self.hitgroup = hitgroup;
        self
    }

    pub fn with_weapon(mut self, weapon: WeaponProfile) -> Self {
        self.weapon = weapon;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockReason {
    RoundInactive,
    InvalidVictim,
    InvalidAttacker,
    SameFaction,
}

/// What the hook did with a hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// Nothing was applied
    Blocked(BlockReason),
    /// The victim was turned into a zombie instead of taking damage
    Infected,
    /// Armor soaked the infection hit
    Absorbed { armor: i32 },
    /// Health was lowered directly; the engine must not apply the hit again
    Applied { health: i32 },
    /// The hit kills; the engine's own kill path should apply `damage`
    Lethal { damage: f32 },
}

impl DamageOutcome {
    pub fn is_blocked(&self) -> bool {
        matches!(self, DamageOutcome::Blocked(_))
    }
}

/// NaN, infinities and negatives count as no damage
fn finite_non_negative(v: f32) -> f32 {
    if v.is_finite() {
        v.max(0.0)
    } else {
        0.0
    }
}

fn scale(v: [f32; 3], by: f32) -> [f32; 3] {
    [v[0] * by, v[1] * by, v[2] * by]
}

impl GameState {
    /// Feed dealt damage into the attacker's reward buckets
    fn accumulate_damage_rewards(&mut self, attacker: SlotId, damage: f32) {
        let (ammo_amount, exp_amount) = {
            let t = self.services.config.tunables();
            (t.reward_ammo_amount, t.reward_experience_amount)
        };
        let rewards = self.rewards;
        let Ok(player) = self.players.get_mut(attacker) else {
            return;
        };
        let ammo = rewards.add(&mut player.damage, RewardKind::Ammo, damage as f64);
        let experience = rewards.add(&mut player.damage, RewardKind::Experience, damage as f64);
        player.currency += ammo as i32 * ammo_amount;
        player.experience += experience * exp_amount;

        if ammo > 0 || experience > 0 {
            log_event!(
                self,
                Verbose,
                "reward",
                "Slot {} earned {} ammo and {} experience units",
                attacker,
                ammo,
                experience
            );
        }
    }

    /// Run one hit through the infection pipeline
    pub fn on_take_damage(&mut self, event: &DamageEvent) -> DamageOutcome {
        if self.round.state != RoundState::Active {
            return DamageOutcome::Blocked(BlockReason::RoundInactive);
        }
        let Some(victim) = self.player(event.victim).filter(|p| p.alive) else {
            return DamageOutcome::Blocked(BlockReason::InvalidVictim);
        };
        let Some(attacker_slot) = event.attacker else {
            return DamageOutcome::Blocked(BlockReason::InvalidAttacker);
        };
        let Some(attacker) = self.player(attacker_slot).filter(|p| p.alive) else {
            return DamageOutcome::Blocked(BlockReason::InvalidAttacker);
        };
        if attacker_slot == event.victim || attacker.faction.base() == victim.faction.base() {
            return DamageOutcome::Blocked(BlockReason::SameFaction);
        }

        let attacker_is_zombie = attacker.is_zombie();
        let victim_knockback = victim.profile.knockback;
        let victim_armor = victim.profile.armor;
        let victim_health = victim.profile.health;

        let t = self.tunables();
        let knockback =
            victim_knockback * t.hitgroup_coefficient(event.hitgroup) * event.weapon.knockback;
        let mut damage = finite_non_negative(event.amount) * finite_non_negative(event.weapon.damage);
        if t.leveling {
            let level = self.services.access.level(attacker_slot);
            damage *= 1.0 + level as f32 * t.level_damage_ratio;
        }
        let damage = finite_non_negative(damage);
        let last_human_infection = t.last_human_infection;
        let armor_protect = t.armor_protect;

        let infection_mode = self.current_mode().is_some_and(|m| m.is_infection());

        if attacker_is_zombie && infection_mode {
            let last_human = self.population().humans == 1;
            if last_human && !last_human_infection {
                log_event!(self, Verbose, "damage", "Last human {} cannot be infected", event.victim);
            } else if armor_protect && victim_armor > 0 {
                let armor = victim_armor.saturating_sub(damage.round() as i32).max(0);
                if let Ok(player) = self.players.get_mut(event.victim) {
                    player.profile.armor = armor;
                    self.services.engine.apply_profile(event.victim, &player.profile);
                }
                self.accumulate_damage_rewards(attacker_slot, damage);
                self.services
                    .notify_client_damaged(event.victim, event.attacker, damage, event.kind);
                return DamageOutcome::Absorbed { armor };
            } else {
                self.accumulate_damage_rewards(attacker_slot, damage);
                self.services
                    .notify_client_damaged(event.victim, event.attacker, damage, event.kind);
                self.make_zombie(event.victim, InfectionSource::Player(attacker_slot), false, false);
                return DamageOutcome::Infected;
            }
        } else if !attacker_is_zombie {
            let aim = self.services.engine.aim_vector(attacker_slot);
            self.services
                .engine
                .apply_impulse(event.victim, scale(aim, damage * knockback));
        }

        self.accumulate_damage_rewards(attacker_slot, damage);
        self.services
            .notify_client_damaged(event.victim, event.attacker, damage, event.kind);

        let remaining = victim_health.saturating_sub(damage.round() as i32);
        if remaining <= 0 {
            log_event!(self, Verbose, "damage", "Lethal hit on {} for {:.1}", event.victim, damage);
            return DamageOutcome::Lethal { damage };
        }
        if let Ok(player) = self.players.get_mut(event.victim) {
            player.profile.health = remaining;
            self.services.engine.apply_profile(event.victim, &player.profile);
        }
        DamageOutcome::Applied { health: remaining }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let event = DamageEvent::new(SlotId::new(1), Some(SlotId::new(2)), 30.0)
            .with_hitgroup(HitGroup::Head)
            .with_kind(DamageType::Melee);
        assert_eq!(event.hitgroup, HitGroup::Head);
        assert_eq!(event.kind, DamageType::Melee);
        assert_eq!(event.weapon, WeaponProfile::default());
    }

    #[test]
    fn test_malformed_amounts_clamp_to_zero() {
        assert_eq!(finite_non_negative(f32::NAN), 0.0);
        assert_eq!(finite_non_negative(f32::INFINITY), 0.0);
        assert_eq!(finite_non_negative(-3.5), 0.0);
        assert_eq!(finite_non_negative(12.5), 12.5);
    }

    #[test]
    fn test_hitgroups_serialize_as_map_keys() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(HitGroup::Head, 2.0f32);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"Head":2.0}"#);
    }
}
