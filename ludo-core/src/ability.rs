//! The six-faced ability die rolled alongside the numbered die.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    Shield,
    PlusOne,
    BackForth,
    Sword,
    GoldToken,
    None,
}

/// Face order of the ability die (index = face).
pub const ABILITY_DIE_FACES: [Ability; 6] = [
    Ability::Shield,
    Ability::PlusOne,
    Ability::BackForth,
    Ability::Sword,
    Ability::GoldToken,
    Ability::None,
];

impl Ability {
    pub fn from_face(face: u8) -> Option<Ability> {
        ABILITY_DIE_FACES.get(face as usize).copied()
    }

    /// True for abilities the roller activates with an explicit choice.
    ///
    /// Shield takes effect at roll time and `None` does nothing.
    pub fn is_activatable(self) -> bool {
        matches!(
            self,
            Ability::PlusOne | Ability::BackForth | Ability::Sword | Ability::GoldToken
        )
    }

    pub fn description(self) -> &'static str {
        match self {
            Ability::Shield => {
                "SHIELD: if another player lands on you, you can prevent being sent back to start."
            }
            Ability::PlusOne => "+1: add 1 to your numbered die roll.",
            Ability::BackForth => "SWAP: move forward or backward.",
            Ability::Sword => {
                "SABOTAGE: move an opponent's piece backward by your dice roll value."
            }
            Ability::GoldToken => "SHORTCUT: move a piece from start to your entry space.",
            Ability::None => "NEUTRAL: no special ability this turn.",
        }
    }
}
