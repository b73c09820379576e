//! Computer player: a pure decision from the current state.

use ludo_core::config::BotConfig;
use ludo_core::rules::{self, Contact};
use ludo_core::{
    Ability, BoardLayout, GamePhase, GameState, PendingAction, PieceId, PieceState, PlayerId,
    PlayerInput,
};

/// One input the bot wants to give, expressed in the same vocabulary as a human's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotIntent {
    Roll,
    UseAbility(Ability),
    DiscardAbility,
    Move { piece: PieceId, delta: i32 },
    Skip,
    AnswerShield { defender: PlayerId, accept: bool },
}

impl BotIntent {
    /// How long a paced bot waits before giving this input.
    pub fn delay_ms(self, cfg: &BotConfig) -> u64 {
        match self {
            BotIntent::Roll => cfg.roll_delay_ms,
            BotIntent::AnswerShield { .. } => cfg.defense_delay_ms,
            _ => cfg.move_delay_ms,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BotIntent::Roll => "roll",
            BotIntent::UseAbility(_) => "ability",
            BotIntent::DiscardAbility => "discard_ability",
            BotIntent::Move { .. } => "move",
            BotIntent::Skip => "skip",
            BotIntent::AnswerShield { .. } => "shield",
        }
    }
}

/// Pick the next input for whoever the game is waiting on.
///
/// Order of preference on a move: gold token while a piece waits in start, then a capture,
/// then leaving start on a 1 or 6, then the first legal move. Shields are always raised.
pub fn decide(state: &GameState, board: &BoardLayout) -> Option<BotIntent> {
    if state.phase != GamePhase::Playing {
        return None;
    }
    let me = state.current_player;
    match state.pending.as_ref()? {
        PendingAction::Roll => Some(BotIntent::Roll),
        PendingAction::ShieldDefense { defender_id, .. } => Some(BotIntent::AnswerShield {
            defender: *defender_id,
            accept: true,
        }),
        PendingAction::UseAbility { .. } => Some(BotIntent::DiscardAbility),
        PendingAction::Move { valid_moves, .. } => {
            if state.ability == Some(Ability::GoldToken)
                && rules::gold_token_move(board, &state.players, me).is_some()
            {
                return Some(BotIntent::UseAbility(Ability::GoldToken));
            }

            let legal = rules::legal_moves(board, &state.players, me, valid_moves);
            let Some(&(first_piece, first_delta)) = legal.first() else {
                return Some(BotIntent::Skip);
            };

            let captures = legal.iter().copied().find(|&(piece, delta)| {
                rules::apply_move(board, &state.players, piece, delta)
                    .is_some_and(|out| out.contact != Contact::Empty)
            });
            let exits = legal.iter().copied().find(|&(piece, delta)| {
                (delta == 1 || delta == 6)
                    && state.piece(piece).is_some_and(|p| p.state == PieceState::Start)
            });

            let (piece, delta) = captures.or(exits).unwrap_or((first_piece, first_delta));
            Some(BotIntent::Move { piece, delta })
        }
        PendingAction::Initializing | PendingAction::GameOver => None,
    }
}

/// Give `intent` through the ordinary input path.
pub fn apply_intent<P: PlayerInput + ?Sized>(
    input: &mut P,
    intent: BotIntent,
) -> Result<(), P::Error> {
    match intent {
        BotIntent::Roll => input.roll(),
        BotIntent::UseAbility(ability) => input.use_ability(ability),
        BotIntent::DiscardAbility => input.discard_ability(),
        BotIntent::Move { piece, delta } => input.select_move(piece, delta),
        BotIntent::Skip => input.skip(),
        BotIntent::AnswerShield { defender, accept } => input.answer_shield(defender, accept),
    }
}
