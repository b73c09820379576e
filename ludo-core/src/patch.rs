//! Typed merge-patches over the replicated top-level fields of `GameState`.
//!
//! A field left at `None` means "unchanged". Nullable fields (`dice`, `ability`,
//! `pending_action`) are doubly optional so an explicit `null` can clear them.

use serde::{Deserialize, Serialize};

use crate::ability::Ability;
use crate::state::{DiceRoll, GamePhase, GameState, PendingAction, Player, PlayerId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<Vec<Player>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<GamePhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_player: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub dice: Option<Option<DiceRoll>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub ability: Option<Option<Ability>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "nullable")]
    pub pending_action: Option<Option<PendingAction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winners: Option<Vec<PlayerId>>,
}

impl SessionPatch {
    /// Patch carrying every field of `state`.
    pub fn full(state: &GameState) -> Self {
        Self {
            players: Some(state.players.clone()),
            phase: Some(state.phase),
            current_player: Some(state.current_player),
            dice: Some(state.dice),
            ability: Some(state.ability),
            pending_action: Some(state.pending.clone()),
            winners: Some(state.winners.clone()),
        }
    }

    /// Fields of `after` that differ from `before`.
    pub fn diff(before: &GameState, after: &GameState) -> Self {
        fn changed<T: PartialEq + Clone>(a: &T, b: &T) -> Option<T> {
            (a != b).then(|| b.clone())
        }
        Self {
            players: changed(&before.players, &after.players),
            phase: changed(&before.phase, &after.phase),
            current_player: changed(&before.current_player, &after.current_player),
            dice: changed(&before.dice, &after.dice),
            ability: changed(&before.ability, &after.ability),
            pending_action: changed(&before.pending, &after.pending),
            winners: changed(&before.winners, &after.winners),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == SessionPatch::default()
    }

    /// Fold `later` into `self`; fields present in `later` win.
    pub fn merge(&mut self, later: SessionPatch) {
        if later.players.is_some() {
            self.players = later.players;
        }
        if later.phase.is_some() {
            self.phase = later.phase;
        }
        if later.current_player.is_some() {
            self.current_player = later.current_player;
        }
        if later.dice.is_some() {
            self.dice = later.dice;
        }
        if later.ability.is_some() {
            self.ability = later.ability;
        }
        if later.pending_action.is_some() {
            self.pending_action = later.pending_action;
        }
        if later.winners.is_some() {
            self.winners = later.winners;
        }
    }
}

/// Overwrite every field of `state` that is present in `patch`.
pub fn apply_patch(state: &mut GameState, patch: &SessionPatch) {
    if let Some(players) = &patch.players {
        state.players = players.clone();
    }
    if let Some(phase) = patch.phase {
        state.phase = phase;
    }
    if let Some(current) = patch.current_player {
        state.current_player = current;
    }
    if let Some(dice) = patch.dice {
        state.dice = dice;
    }
    if let Some(ability) = patch.ability {
        state.ability = ability;
    }
    if let Some(pending) = &patch.pending_action {
        state.pending = pending.clone();
    }
    if let Some(winners) = &patch.winners {
        state.winners = winners.clone();
    }
}

/// Serde adapter mapping a present JSON value (including `null`) to `Some(_)`.
mod nullable {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
