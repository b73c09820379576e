//! Hosting and joining online games.
//!
//! The host always sits in seat 1. Joiners take the first free seat of 2, 3, 4; seats still
//! empty when the host starts are filled with computer players run by the host.

use std::sync::Arc;

use ludo_core::board::seat_config;
use ludo_core::{GameSetup, Player, PlayerId, SeatSetup, TurnContext};
use thiserror::Error;

use crate::adapter::{SyncError, SyncedGame};
use crate::store::{Session, SessionStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("game not found")]
    GameNotFound,
    #[error("lobby full")]
    LobbyFull,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Where the local participant sits in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbySeat {
    pub code: String,
    pub seat: PlayerId,
}

/// Codes are entered by hand; compare them case-insensitively.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

pub fn host_lobby(
    store: &dyn SessionStore,
    name: &str,
    avatar_url: Option<String>,
) -> Result<LobbySeat, StoreError> {
    let seat = PlayerId::HOST;
    let mut host = Player::lobby(seat, name, seat_config(seat).color);
    host.avatar_url = avatar_url;
    let code = store.create(host)?;
    Ok(LobbySeat { code, seat })
}

/// First seat of 2, 3, 4 not taken in `session`.
pub fn free_seat(session: &Session) -> Option<PlayerId> {
    PlayerId::ALL
        .into_iter()
        .skip(1)
        .find(|id| session.players.iter().all(|p| p.id != *id))
}

/// Claim the first free seat. Neither failure touches the session.
pub fn claim_seat(
    store: &dyn SessionStore,
    code: &str,
    name: &str,
    avatar_url: Option<String>,
) -> Result<LobbySeat, JoinError> {
    let code = normalize_code(code);
    let session = store.get(&code)?.ok_or(JoinError::GameNotFound)?;
    let seat = free_seat(&session).ok_or(JoinError::LobbyFull)?;

    let mut me = Player::lobby(seat, name, seat_config(seat).color);
    me.avatar_url = avatar_url;
    if !store.join(&code, me)? {
        return Err(JoinError::GameNotFound);
    }
    Ok(LobbySeat { code, seat })
}

/// Seats from the lobby roster; empty seats become computers.
pub fn lobby_setup(session: &Session) -> GameSetup {
    let mut setup = GameSetup::default();
    for id in PlayerId::ALL {
        *setup.seat_mut(id) = match session.players.iter().find(|p| p.id == id) {
            Some(p) => SeatSetup {
                name: Some(p.name.clone()),
                color: Some(p.color.clone()),
                avatar_url: p.avatar_url.clone(),
                is_computer: p.is_computer,
            },
            None => SeatSetup {
                name: Some(format!("CPU {id}")),
                is_computer: true,
                ..SeatSetup::default()
            },
        };
    }
    setup
}

pub fn fetch_lobby_setup(store: &dyn SessionStore, code: &str) -> Result<GameSetup, JoinError> {
    let session = store.get(code)?.ok_or(JoinError::GameNotFound)?;
    Ok(lobby_setup(&session))
}

/// Host side: initialize the game from `setup` and publish the full state.
pub fn start_hosted_game(
    store: Arc<dyn SessionStore>,
    lobby: &LobbySeat,
    setup: &GameSetup,
    ctx: TurnContext,
) -> Result<SyncedGame, SyncError> {
    let mut game = SyncedGame::online(store, &lobby.code, lobby.seat, ctx)?;
    game.start(setup)?;
    Ok(game)
}

/// Joiner side: follow the session as a replica of seat `lobby.seat`.
///
/// `ctx` rolls the dice whenever this seat is the one acting.
pub fn follow_game(
    store: Arc<dyn SessionStore>,
    lobby: &LobbySeat,
    ctx: TurnContext,
) -> Result<SyncedGame, SyncError> {
    let mut game = SyncedGame::online(store, &lobby.code, lobby.seat, ctx)?;
    game.pump();
    Ok(game)
}
