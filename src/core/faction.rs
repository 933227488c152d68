//! Factions and sub-roles

use serde::{Deserialize, Serialize};
use std::fmt;

/// Base side of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Human,
    Zombie,
}

/// Special role layered on top of a base faction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubRole {
    /// Only valid on a Zombie
    Nemesis,
    /// Only valid on a Human
    Survivor,
}

/// Complete faction of a connected player
///
/// A sub-role can only be expressed together with its matching base
/// faction, so "Nemesis human" is not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayerFaction {
    #[default]
    Human,
    Survivor,
    Zombie,
    Nemesis,
}

impl PlayerFaction {
    pub fn base(&self) -> Faction {
        match self {
            PlayerFaction::Human | PlayerFaction::Survivor => Faction::Human,
            PlayerFaction::Zombie | PlayerFaction::Nemesis => Faction::Zombie,
        }
    }

    pub fn sub_role(&self) -> Option<SubRole> {
        match self {
            PlayerFaction::Survivor => Some(SubRole::Survivor),
            PlayerFaction::Nemesis => Some(SubRole::Nemesis),
            PlayerFaction::Human | PlayerFaction::Zombie => None,
        }
    }

    pub fn is_zombie(&self) -> bool {
        self.base() == Faction::Zombie
    }

    pub fn is_human(&self) -> bool {
        self.base() == Faction::Human
    }

    pub fn zombie(nemesis: bool) -> Self {
        if nemesis {
            PlayerFaction::Nemesis
        } else {
            PlayerFaction::Zombie
        }
    }

    pub fn human(survivor: bool) -> Self {
        if survivor {
            PlayerFaction::Survivor
        } else {
            PlayerFaction::Human
        }
    }

    /// Engine team the faction plays on
    pub fn team(&self) -> Team {
        match self.base() {
            Faction::Human => Team::Human,
            Faction::Zombie => Team::Zombie,
        }
    }
}

impl fmt::Display for PlayerFaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerFaction::Human => "human",
            PlayerFaction::Survivor => "survivor",
            PlayerFaction::Zombie => "zombie",
            PlayerFaction::Nemesis => "nemesis",
        };
        write!(f, "{}", name)
    }
}

/// Engine-side team a player is placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Spectator,
    Human,
    Zombie,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_role_implies_base() {
        assert_eq!(PlayerFaction::Nemesis.base(), Faction::Zombie);
        assert_eq!(PlayerFaction::Survivor.base(), Faction::Human);
        assert_eq!(PlayerFaction::Nemesis.sub_role(), Some(SubRole::Nemesis));
        assert_eq!(PlayerFaction::Zombie.sub_role(), None);
    }

    #[test]
    fn test_constructors() {
        assert_eq!(PlayerFaction::zombie(true), PlayerFaction::Nemesis);
        assert_eq!(PlayerFaction::zombie(false), PlayerFaction::Zombie);
        assert_eq!(PlayerFaction::human(true), PlayerFaction::Survivor);
        assert_eq!(PlayerFaction::Survivor.team(), Team::Human);
    }
}
