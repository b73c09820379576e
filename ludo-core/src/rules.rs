//! Move validation and resolution.
//!
//! Pure functions over the players' pieces and the static layout. Nothing here knows
//! whose turn it is; the turn controller commits what these functions compute.

use crate::board::{
    home_position, home_step, is_main_circuit, wrap, BoardLayout, HOME_PATH_SIZE,
    MAIN_CIRCUIT_SIZE,
};
use crate::state::{Piece, PieceId, PieceState, Player, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn of(delta: i32) -> Direction {
        if delta < 0 {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }
}

/// What the moving piece does to an opposing piece on its final cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    Empty,
    /// Unshielded opponent: sent back to start.
    Capture { piece: PieceId, owner: PlayerId },
    /// Shielded opponent: the defender must decide before anything else resolves.
    Shielded { piece: PieceId, defender: PlayerId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub piece: PieceId,
    /// Final position after any warp.
    pub new_position: i32,
    pub new_state: PieceState,
    /// Cell the piece landed on before warp redirection.
    pub landing: i32,
    pub warped: bool,
    pub landed_on_bonus: bool,
    pub contact: Contact,
}

fn all_pieces(players: &[Player]) -> impl Iterator<Item = &Piece> {
    players.iter().flat_map(|p| p.pieces.iter())
}

fn find_piece(players: &[Player], id: PieceId) -> Option<&Piece> {
    all_pieces(players).find(|p| p.id == id)
}

/// Any piece other than `except` standing on `position`.
pub fn occupant(players: &[Player], position: i32, except: PieceId) -> Option<&Piece> {
    all_pieces(players).find(|p| p.id != except && p.position == position)
}

fn own_blocked(players: &[Player], owner: PlayerId, position: i32, except: PieceId) -> bool {
    all_pieces(players).any(|p| p.id != except && p.owner == owner && p.position == position)
}

/// Destination (before warps) of `piece` moved by `delta`, if the delta is reachable at all.
fn destination(board: &BoardLayout, piece: &Piece, delta: i32) -> Option<(i32, PieceState)> {
    match Direction::of(delta) {
        Direction::Forward => forward_destination(board, piece, delta),
        Direction::Backward => match piece.state {
            PieceState::InPlay => Some((wrap(piece.position + delta), PieceState::InPlay)),
            PieceState::Start | PieceState::Home => None,
        },
    }
}

fn forward_destination(
    board: &BoardLayout,
    piece: &Piece,
    steps: i32,
) -> Option<(i32, PieceState)> {
    match piece.state {
        PieceState::Start => {
            (steps == 1 || steps == 6).then(|| (board.start_entry(piece.owner), PieceState::InPlay))
        }
        PieceState::Home => {
            let target = home_step(piece.position)? + steps;
            (target <= HOME_PATH_SIZE)
                .then(|| (home_position(piece.owner, target), PieceState::Home))
        }
        PieceState::InPlay => {
            let to_entry = wrap(board.home_entry(piece.owner) - piece.position);
            if steps > to_entry {
                let past = steps - to_entry;
                (past <= HOME_PATH_SIZE)
                    .then(|| (home_position(piece.owner, past), PieceState::Home))
            } else {
                Some((wrap(piece.position + steps), PieceState::InPlay))
            }
        }
    }
}

/// Resolve moving `piece_id` by `delta` (negative = backward), or `None` if illegal.
///
/// Side effects are reported in resolution order: position/state, one warp hop, then
/// contact with an opposing piece on the final cell.
pub fn apply_move(
    board: &BoardLayout,
    players: &[Player],
    piece_id: PieceId,
    delta: i32,
) -> Option<MoveOutcome> {
    if delta == 0 || delta.unsigned_abs() >= MAIN_CIRCUIT_SIZE as u32 {
        return None;
    }
    let piece = find_piece(players, piece_id)?;
    let (landing, new_state) = destination(board, piece, delta)?;

    if !is_main_circuit(landing) {
        if occupant(players, landing, piece.id).is_some() {
            return None;
        }
        return Some(MoveOutcome {
            piece: piece.id,
            new_position: landing,
            new_state,
            landing,
            warped: false,
            landed_on_bonus: false,
            contact: Contact::Empty,
        });
    }

    let warp = board.warp_target(landing);
    let new_position = warp.unwrap_or(landing);
    if own_blocked(players, piece.owner, landing, piece.id)
        || own_blocked(players, piece.owner, new_position, piece.id)
    {
        return None;
    }

    let enemy = all_pieces(players).find(|p| p.position == new_position && p.owner != piece.owner);
    let contact = match enemy {
        None => Contact::Empty,
        Some(enemy) => {
            let shielded = players
                .iter()
                .any(|pl| pl.id == enemy.owner && pl.has_shield);
            if shielded {
                Contact::Shielded {
                    piece: enemy.id,
                    defender: enemy.owner,
                }
            } else {
                Contact::Capture {
                    piece: enemy.id,
                    owner: enemy.owner,
                }
            }
        }
    };

    Some(MoveOutcome {
        piece: piece.id,
        new_position,
        new_state,
        landing,
        warped: warp.is_some(),
        landed_on_bonus: board.is_go_again(landing),
        contact,
    })
}

pub fn is_legal_move(
    board: &BoardLayout,
    players: &[Player],
    piece_id: PieceId,
    delta: i32,
) -> bool {
    apply_move(board, players, piece_id, delta).is_some()
}

/// Every `(piece, delta)` pair of `owner` that is legal for one of `deltas`.
pub fn legal_moves(
    board: &BoardLayout,
    players: &[Player],
    owner: PlayerId,
    deltas: &[i32],
) -> Vec<(PieceId, i32)> {
    let Some(player) = players.iter().find(|p| p.id == owner) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for piece in &player.pieces {
        for &delta in deltas {
            if is_legal_move(board, players, piece.id, delta) {
                out.push((piece.id, delta));
            }
        }
    }
    out
}

/// Gold token: the first start piece of `owner` and the enemy it would displace.
pub fn gold_token_move(
    board: &BoardLayout,
    players: &[Player],
    owner: PlayerId,
) -> Option<(PieceId, i32, Option<PieceId>)> {
    let player = players.iter().find(|p| p.id == owner)?;
    let piece = player.pieces.iter().find(|p| p.state == PieceState::Start)?;
    let entry = board.start_entry(owner);
    if own_blocked(players, owner, entry, piece.id) {
        return None;
    }
    let enemy = all_pieces(players)
        .find(|p| p.position == entry && p.owner != owner)
        .map(|p| p.id);
    Some((piece.id, entry, enemy))
}

/// Where a sword strike by `attacker` pushes `target`, if it is a valid victim.
///
/// Only opposing pieces on the circuit can be struck, and the cell they are pushed onto
/// must be empty.
pub fn sword_target(
    players: &[Player],
    attacker: PlayerId,
    target: PieceId,
    steps: i32,
) -> Option<i32> {
    let piece = find_piece(players, target)?;
    if piece.owner == attacker || piece.state != PieceState::InPlay || steps <= 0 {
        return None;
    }
    let dest = wrap(piece.position - steps);
    occupant(players, dest, piece.id).is_none().then_some(dest)
}

/// Cell a shield-repelled attacker retreats to: `steps` back from `from`, continuing
/// backwards past occupied cells. `None` if the whole circuit is taken.
pub fn retreat_position(
    players: &[Player],
    piece_id: PieceId,
    from: i32,
    steps: i32,
) -> Option<i32> {
    let mut pos = wrap(from - steps.max(0));
    for _ in 0..MAIN_CIRCUIT_SIZE {
        if occupant(players, pos, piece_id).is_none() {
            return Some(pos);
        }
        pos = wrap(pos - 1);
    }
    None
}
