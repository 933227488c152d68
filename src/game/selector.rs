//! Mode selection for the next round

use crate::core::{ModeId, ModeRegistry};
use rand::Rng;

/// Picks the mode of the next round
pub struct ModeSelector;

impl ModeSelector {
    /// Run one selection pass
    ///
    /// Every mode other than `last` with a non-zero chance gets a 1-in-chance
    /// trial and is accepted when the trial passes and `alive` exceeds its
    /// minimum. The pass does not stop at the first acceptance: the last
    /// accepted mode in registration order wins. With no acceptance the
    /// fallback mode is returned, even when it was also the last mode; the
    /// registry refuses a fallback with a player minimum.
    pub fn select<R: Rng + ?Sized>(
        registry: &ModeRegistry,
        alive: usize,
        last: Option<ModeId>,
        rng: &mut R,
    ) -> Option<ModeId> {
        let mut selected = None;
        for mode in registry.iter() {
            if Some(mode.id) == last || mode.is_fallback() {
                continue;
            }
            // Trial first so the rng stream does not depend on eligibility
            let hit = rng.gen_ratio(1, mode.chance());
            if hit && alive > mode.min_players() {
                selected = Some(mode.id);
            }
        }
        selected.or_else(|| registry.fallback().map(|m| m.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ModeDefinition, ModeFlags};
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn registry() -> ModeRegistry {
        let mut registry = ModeRegistry::new();
        registry
            .register(ModeDefinition::new("normal", 0, 0, 0.0, ModeFlags::INFECTION))
            .unwrap();
        registry
            .register(ModeDefinition::new("a", 1, 2, 0.5, ModeFlags::INFECTION))
            .unwrap();
        registry
            .register(ModeDefinition::new("b", 1, 4, 0.5, ModeFlags::INFECTION))
            .unwrap();
        registry
    }

    #[test]
    fn test_last_accepted_mode_wins() {
        let registry = registry();
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        // chance 1 always passes; both are eligible with 10 alive
        let picked = ModeSelector::select(&registry, 10, None, &mut rng);
        assert_eq!(picked, registry.by_name("b"));
    }

    #[test]
    fn test_min_players_is_strict() {
        let registry = registry();
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        // b needs more than 4 alive
        let picked = ModeSelector::select(&registry, 4, None, &mut rng);
        assert_eq!(picked, registry.by_name("a"));
        let picked = ModeSelector::select(&registry, 2, None, &mut rng);
        assert_eq!(picked, registry.by_name("normal"));
    }

    #[test]
    fn test_no_immediate_repeat() {
        let registry = registry();
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        let b = registry.by_name("b");
        let picked = ModeSelector::select(&registry, 10, b, &mut rng);
        assert_eq!(picked, registry.by_name("a"));
    }

    #[test]
    fn test_fallback_may_repeat() {
        let registry = registry();
        let normal = registry.by_name("normal");
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let picked = ModeSelector::select(&registry, 1, normal, &mut rng);
        assert_eq!(picked, normal);
    }

    #[test]
    fn test_random_selection_respects_constraints() {
        let mut registry = ModeRegistry::new();
        registry
            .register(ModeDefinition::new("normal", 0, 0, 0.0, ModeFlags::INFECTION))
            .unwrap();
        for (name, chance, min) in [("x", 3, 3), ("y", 5, 6), ("z", 2, 12)] {
            registry
                .register(ModeDefinition::new(name, chance, min, 0.3, ModeFlags::INFECTION))
                .unwrap();
        }

        let mut rng = ChaCha12Rng::seed_from_u64(42);
        let mut last = None;
        for alive in (0..20).cycle().take(500) {
            let picked = ModeSelector::select(&registry, alive, last, &mut rng).unwrap();
            let mode = registry.by_id(picked).unwrap();
            if !mode.is_fallback() {
                assert!(alive > mode.min_players());
                assert_ne!(Some(picked), last);
            }
            last = Some(picked);
        }
    }
}
