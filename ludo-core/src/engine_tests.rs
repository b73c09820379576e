use crate::ability::Ability;
use crate::board::START_POSITION;
use crate::chance::TurnContext;
use crate::engine::{Engine, GameSetup, Rejected};
use crate::state::{
    DiceRoll, GamePhase, GameState, PendingAction, PieceId, PieceState, Player, PlayerId,
};

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;

fn pid(n: u8) -> PlayerId {
    PlayerId::new(n).unwrap()
}

fn playing(current: u8) -> GameState {
    let mut s = GameState::landing();
    s.phase = GamePhase::Playing;
    s.players = PlayerId::ALL.into_iter().map(Player::with_default_identity).collect();
    s.current_player = pid(current);
    s.pending = Some(PendingAction::Roll);
    s
}

fn place(s: &mut GameState, piece: PieceId, position: i32) {
    let p = s.piece_mut(piece).unwrap();
    p.position = position;
    p.state = if position < 0 {
        PieceState::Start
    } else if position >= 100 {
        PieceState::Home
    } else {
        PieceState::InPlay
    };
}

fn engine(s: GameState, rolls: &[(u8, Ability)]) -> Engine {
    Engine::with_state(s, TurnContext::new_scripted(rolls.iter().copied()))
}

fn pos(e: &Engine, piece: PieceId) -> i32 {
    e.state().piece(piece).unwrap().position
}

fn assert_invariants(s: &GameState) {
    for a in s.pieces() {
        if a.state == PieceState::Start {
            assert_eq!(a.position, START_POSITION);
            continue;
        }
        for b in s.pieces() {
            if a.id != b.id && a.owner == b.owner {
                assert_ne!(a.position, b.position, "own pieces {} and {} share a cell", a.id, b.id);
            }
        }
    }
    let mut seen = s.winners.clone();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), s.winners.len(), "duplicate winner");
    assert_eq!(s.phase == GamePhase::GameOver, s.winners.len() == 3);
}

#[test]
fn start_piece_exits_on_six_and_keeps_the_turn() {
    let mut e = engine(playing(1), &[(6, Ability::None)]);
    e.roll().unwrap();
    assert_eq!(
        e.state().pending,
        Some(PendingAction::move_with(vec![6]))
    );
    e.select_piece(0).unwrap();

    let p = e.state().piece(0).unwrap();
    assert_eq!(p.state, PieceState::InPlay);
    assert_eq!(p.position, 6);
    assert_eq!(e.state().current_player, pid(1));
    assert_eq!(e.state().pending, Some(PendingAction::Roll));
}

#[test]
fn no_exit_without_one_or_six_then_skip_passes_turn() {
    let mut e = engine(playing(1), &[(3, Ability::None)]);
    e.roll().unwrap();
    assert!(!e.has_valid_moves());

    let before = e.state().clone();
    assert_eq!(e.select_piece(0), Err(Rejected::IllegalMove));
    assert_eq!(e.state(), &before);

    e.skip().unwrap();
    assert_eq!(e.state().current_player, pid(2));
    assert_eq!(e.state().pending, Some(PendingAction::Roll));
    assert_eq!(e.state().dice, None);
    assert_eq!(e.state().ability, None);
}

#[test]
fn skip_is_rejected_while_a_move_exists() {
    let mut s = playing(1);
    place(&mut s, 0, 12);
    let mut e = engine(s, &[(3, Ability::None)]);
    e.roll().unwrap();
    assert_eq!(e.skip(), Err(Rejected::MovesAvailable));
    assert_eq!(e.legal_moves(), vec![(0, 3)]);
}

#[test]
fn overshooting_home_entry_enters_home_path() {
    let mut s = playing(1);
    place(&mut s, 0, 2);
    let mut e = engine(s, &[(3, Ability::None)]);
    e.roll().unwrap();
    e.select_piece(0).unwrap();

    let p = e.state().piece(0).unwrap();
    assert_eq!(p.position, 101);
    assert_eq!(p.state, PieceState::Home);
    assert_eq!(e.state().current_player, pid(2));
}

#[test]
fn unshielded_capture_sends_defender_to_start_and_passes_turn() {
    let mut s = playing(1);
    place(&mut s, 0, 1);
    place(&mut s, 4, 3);
    let mut e = engine(s, &[(2, Ability::None)]);
    e.roll().unwrap();
    e.select_piece(0).unwrap();

    let victim = e.state().piece(4).unwrap();
    assert_eq!(victim.state, PieceState::Start);
    assert_eq!(victim.position, START_POSITION);
    assert_eq!(pos(&e, 0), 3);
    assert_eq!(e.state().pieces().filter(|p| p.position == 3).count(), 1);
    assert_eq!(e.state().current_player, pid(2));
}

#[test]
fn capture_on_natural_six_keeps_the_turn() {
    let mut s = playing(1);
    place(&mut s, 0, 11);
    place(&mut s, 4, 17);
    let mut e = engine(s, &[(6, Ability::None)]);
    e.roll().unwrap();
    e.select_move(0, 6).unwrap();

    assert_eq!(e.state().piece(4).unwrap().state, PieceState::Start);
    assert_eq!(e.state().current_player, pid(1));
    assert_eq!(e.state().pending, Some(PendingAction::Roll));
}

#[test]
fn shield_defense_declined_captures_and_consumes_shield() {
    let mut s = playing(1);
    place(&mut s, 0, 1);
    place(&mut s, 4, 3);
    s.player_mut(pid(2)).unwrap().has_shield = true;
    let mut e = engine(s, &[(2, Ability::None)]);
    e.roll().unwrap();
    e.select_piece(0).unwrap();

    assert_eq!(
        e.state().pending,
        Some(PendingAction::ShieldDefense {
            attacker_id: pid(1),
            defender_id: pid(2),
            position: 3,
        })
    );
    assert_eq!(e.state().current_player, pid(1));
    assert_eq!(e.answer_shield(pid(1), false), Err(Rejected::NotDefender(pid(1))));

    e.answer_shield(pid(2), false).unwrap();
    assert_eq!(e.state().piece(4).unwrap().state, PieceState::Start);
    assert_eq!(pos(&e, 0), 3);
    assert!(!e.state().player(pid(2)).unwrap().has_shield);
    assert_eq!(e.state().current_player, pid(2));
}

#[test]
fn shield_defense_accepted_pushes_attacker_back() {
    let mut s = playing(1);
    place(&mut s, 0, 1);
    place(&mut s, 4, 3);
    s.player_mut(pid(2)).unwrap().has_shield = true;
    let mut e = engine(s, &[(2, Ability::None)]);
    e.roll().unwrap();
    e.select_piece(0).unwrap();
    e.answer_shield(pid(2), true).unwrap();

    assert_eq!(pos(&e, 0), 1);
    assert_eq!(pos(&e, 4), 3);
    assert_eq!(e.state().piece(4).unwrap().state, PieceState::InPlay);
    assert!(!e.state().player(pid(2)).unwrap().has_shield);
    assert_eq!(e.state().current_player, pid(2));
}

#[test]
fn roll_resets_only_the_rollers_shield() {
    let mut s = playing(1);
    s.player_mut(pid(1)).unwrap().has_shield = true;
    s.player_mut(pid(3)).unwrap().has_shield = true;
    let mut e = engine(s, &[(3, Ability::None), (3, Ability::Shield)]);

    e.roll().unwrap();
    assert!(!e.state().player(pid(1)).unwrap().has_shield);
    assert!(e.state().player(pid(3)).unwrap().has_shield);

    e.skip().unwrap();
    e.roll().unwrap();
    assert!(e.state().player(pid(2)).unwrap().has_shield);
}

#[test]
fn warp_is_a_single_hop() {
    let mut s = playing(2);
    place(&mut s, 4, 1);
    let mut e = engine(s, &[(3, Ability::None)]);
    e.roll().unwrap();
    e.select_piece(4).unwrap();

    // 4 warps to 24, which is itself a warp back to 4.
    assert_eq!(pos(&e, 4), 24);
    assert_eq!(e.state().current_player, pid(3));
}

#[test]
fn landing_on_go_again_cell_grants_a_roll() {
    let mut s = playing(1);
    place(&mut s, 0, 8);
    let mut e = engine(s, &[(2, Ability::None)]);
    e.roll().unwrap();
    e.select_piece(0).unwrap();
    assert_eq!(pos(&e, 0), 10);
    assert_eq!(e.state().current_player, pid(1));
    assert_eq!(e.state().pending, Some(PendingAction::Roll));
}

#[test]
fn own_piece_blocks_destination() {
    let mut s = playing(1);
    place(&mut s, 0, 8);
    place(&mut s, 1, 11);
    let mut e = engine(s, &[(3, Ability::None)]);
    e.roll().unwrap();
    assert_eq!(e.legal_moves(), vec![(1, 3)]);
    assert_eq!(e.select_piece(0), Err(Rejected::IllegalMove));
}

#[test]
fn plus_one_raises_value_but_not_the_natural_die() {
    let mut s = playing(1);
    place(&mut s, 0, 12);
    let mut e = engine(s, &[(5, Ability::PlusOne)]);
    e.roll().unwrap();
    e.use_ability(Ability::PlusOne).unwrap();

    assert_eq!(e.state().dice, Some(DiceRoll { natural: 5, modifier: 1 }));
    assert_eq!(e.state().ability, None);
    assert_eq!(e.state().pending, Some(PendingAction::move_with(vec![6])));

    e.select_piece(0).unwrap();
    assert_eq!(pos(&e, 0), 18);
    // 5 + 1 is not a natural six.
    assert_eq!(e.state().current_player, pid(2));
}

#[test]
fn ability_must_match_the_rolled_face() {
    let mut s = playing(1);
    place(&mut s, 0, 12);
    let mut e = engine(s, &[(2, Ability::PlusOne)]);
    e.roll().unwrap();
    assert_eq!(
        e.use_ability(Ability::Sword),
        Err(Rejected::AbilityUnavailable(Ability::Sword))
    );
    e.use_ability(Ability::PlusOne).unwrap();
    assert_eq!(
        e.use_ability(Ability::PlusOne),
        Err(Rejected::AbilityUnavailable(Ability::PlusOne))
    );
}

#[test]
fn back_forth_asks_for_direction() {
    let mut s = playing(1);
    place(&mut s, 0, 13);
    let mut e = engine(s, &[(2, Ability::BackForth)]);
    e.roll().unwrap();
    e.use_ability(Ability::BackForth).unwrap();
    e.select_piece(0).unwrap();

    assert_eq!(
        e.state().pending,
        Some(PendingAction::Move {
            selected_piece_id: Some(0),
            valid_moves: vec![2, -2],
        })
    );
    assert_eq!(e.select_move(0, 5), Err(Rejected::NotAValidMove(5)));
    e.select_move(0, -2).unwrap();
    assert_eq!(pos(&e, 0), 11);
}

#[test]
fn sword_pushes_opponent_back_and_ends_turn_even_on_six() {
    let mut s = playing(1);
    place(&mut s, 4, 20);
    let mut e = engine(s, &[(6, Ability::Sword)]);
    e.roll().unwrap();
    e.use_ability(Ability::Sword).unwrap();
    assert_eq!(
        e.state().pending,
        Some(PendingAction::UseAbility {
            ability: Ability::Sword
        })
    );

    assert_eq!(e.select_piece(0), Err(Rejected::IllegalMove));
    e.select_piece(4).unwrap();
    assert_eq!(pos(&e, 4), 14);
    assert_eq!(e.state().current_player, pid(2));
    assert_eq!(e.state().dice, None);
}

#[test]
fn sword_without_target_is_rejected() {
    let mut e = engine(playing(1), &[(4, Ability::Sword)]);
    e.roll().unwrap();
    assert_eq!(
        e.use_ability(Ability::Sword),
        Err(Rejected::NoTarget(Ability::Sword))
    );
}

#[test]
fn discard_from_sword_prompt_returns_to_move() {
    let mut s = playing(1);
    place(&mut s, 0, 12);
    place(&mut s, 4, 20);
    let mut e = engine(s, &[(3, Ability::Sword)]);
    e.roll().unwrap();
    e.use_ability(Ability::Sword).unwrap();
    e.discard_ability().unwrap();
    assert_eq!(e.state().pending, Some(PendingAction::move_with(vec![3])));
    assert_eq!(e.state().ability, None);
    assert_eq!(e.discard_ability(), Err(Rejected::WrongPending("move")));
}

#[test]
fn gold_token_enters_at_start_and_displaces_enemy() {
    let mut s = playing(1);
    place(&mut s, 4, 6);
    let mut e = engine(s, &[(2, Ability::GoldToken)]);
    e.roll().unwrap();
    e.use_ability(Ability::GoldToken).unwrap();

    assert_eq!(pos(&e, 0), 6);
    assert_eq!(e.state().piece(0).unwrap().state, PieceState::InPlay);
    assert_eq!(e.state().piece(4).unwrap().state, PieceState::Start);
    assert_eq!(e.state().pending, Some(PendingAction::move_with(vec![2])));
}

#[test]
fn wrong_pending_and_wrong_owner_leave_state_untouched() {
    let mut e = engine(playing(1), &[(6, Ability::None)]);
    let before = e.state().clone();
    assert_eq!(e.select_piece(0), Err(Rejected::WrongPending("roll")));
    assert_eq!(e.state(), &before);

    e.roll().unwrap();
    let before = e.state().clone();
    assert_eq!(
        e.select_piece(4),
        Err(Rejected::NotOwner {
            piece: 4,
            player: pid(1)
        })
    );
    assert_eq!(e.select_piece(99), Err(Rejected::UnknownPiece(99)));
    assert_eq!(e.roll(), Err(Rejected::WrongPending("move")));
    assert_eq!(e.state(), &before);
}

#[test]
fn finishing_on_six_keeps_the_bonus_roll() {
    let mut s = playing(1);
    place(&mut s, 0, 2);
    place(&mut s, 1, 101);
    place(&mut s, 2, 102);
    place(&mut s, 3, 103);
    let mut e = engine(s, &[(6, Ability::None), (3, Ability::None)]);
    e.roll().unwrap();
    e.select_piece(0).unwrap();

    assert_eq!(pos(&e, 0), 104);
    assert_eq!(e.state().winners, vec![pid(1)]);
    assert_eq!(e.state().current_player, pid(1));
    assert_eq!(e.state().pending, Some(PendingAction::Roll));
    assert_eq!(e.state().phase, GamePhase::Playing);

    // Nothing left to move: the bonus roll is skipped and the turn moves on.
    e.roll().unwrap();
    assert!(!e.has_valid_moves());
    e.skip().unwrap();
    assert_eq!(e.state().current_player, pid(2));
    assert_eq!(e.state().pending, Some(PendingAction::Roll));
}

#[test]
fn turn_order_skips_finished_players() {
    let mut s = playing(1);
    s.winners = vec![pid(2)];
    let mut e = engine(s, &[(3, Ability::None)]);
    e.roll().unwrap();
    e.skip().unwrap();
    assert_eq!(e.state().current_player, pid(3));
}

#[test]
fn third_winner_ends_the_game_and_ranks_the_rest_by_id() {
    let mut s = playing(1);
    for (owner, first_piece) in [(2, 4), (4, 12)] {
        for step in 0..4 {
            place(&mut s, first_piece + step as PieceId, 100 * owner + step + 1);
        }
    }
    s.winners = vec![pid(2), pid(4)];
    place(&mut s, 0, 2);
    place(&mut s, 1, 102);
    place(&mut s, 2, 103);
    place(&mut s, 3, 104);
    let mut e = engine(s, &[(3, Ability::None)]);
    e.roll().unwrap();
    e.select_piece(0).unwrap();

    assert_eq!(e.state().winners, vec![pid(2), pid(4), pid(1)]);
    assert_eq!(e.state().phase, GamePhase::GameOver);
    assert_eq!(e.state().pending, Some(PendingAction::GameOver));
    assert_eq!(e.standings(), vec![pid(2), pid(4), pid(1), pid(3)]);
    assert_eq!(e.roll(), Err(Rejected::NotPlaying));
}

#[test]
fn setup_initialize_and_reset() {
    let mut e = Engine::new(TurnContext::new_deterministic(5));
    assert_eq!(e.state().phase, GamePhase::Landing);
    e.begin_setup().unwrap();
    assert_eq!(e.begin_setup(), Err(Rejected::WrongPhase(GamePhase::Setup)));

    let patch = e.initialize(&GameSetup::single_player()).unwrap();
    assert_eq!(patch.phase, Some(GamePhase::Playing));
    let s = e.state();
    assert_eq!(s.players.len(), 4);
    assert!(s.pieces().all(|p| p.state == PieceState::Start));
    assert!(!s.player(pid(1)).unwrap().is_computer);
    assert!(s.players.iter().skip(1).all(|p| p.is_computer));
    assert_eq!(s.pending, Some(PendingAction::Roll));
    assert_eq!(
        e.initialize(&GameSetup::default()),
        Err(Rejected::WrongPhase(GamePhase::Playing))
    );

    let patch = e.reset();
    assert_eq!(patch.phase, Some(GamePhase::Landing));
    assert_eq!(e.state(), &GameState::landing());
}

#[test]
fn roll_patch_carries_only_changed_fields() {
    let mut e = engine(playing(1), &[(4, Ability::None)]);
    let patch = e.roll().unwrap();
    assert_eq!(patch.dice, Some(Some(DiceRoll::natural(4))));
    assert_eq!(patch.ability, Some(Some(Ability::None)));
    assert_eq!(patch.pending_action, Some(Some(PendingAction::move_with(vec![4]))));
    assert_eq!(patch.players, None);
    assert_eq!(patch.current_player, None);
}

fn random_playout(seed: u64) -> (GameState, usize) {
    let mut e = Engine::with_state(playing(1), TurnContext::new_deterministic(seed));
    let mut chooser = ChaCha8Rng::seed_from_u64(seed ^ 0xA5A5);

    for step in 0..200_000usize {
        assert_invariants(e.state());
        if e.state().is_over() {
            return (e.state().clone(), step);
        }
        match e.state().pending.clone() {
            Some(PendingAction::Roll) => {
                e.roll().unwrap();
            }
            Some(PendingAction::Move { .. }) => {
                if let Some(a) = e.state().ability.filter(|a| a.is_activatable()) {
                    if chooser.gen_bool(0.5) {
                        // May be rejected (no target); the next pass moves instead.
                        let _ = e.use_ability(a);
                        continue;
                    }
                }
                let moves = e.legal_moves();
                if moves.is_empty() {
                    e.skip().unwrap();
                } else {
                    let (piece, delta) = moves[chooser.gen_range(0..moves.len())];
                    e.select_move(piece, delta).unwrap();
                }
            }
            Some(PendingAction::UseAbility { .. }) => {
                let current = e.state().current_player;
                let targets: Vec<PieceId> = e
                    .state()
                    .pieces()
                    .filter(|p| p.owner != current)
                    .map(|p| p.id)
                    .collect();
                let target = targets[chooser.gen_range(0..targets.len())];
                if e.select_piece(target).is_err() {
                    e.discard_ability().unwrap();
                }
            }
            Some(PendingAction::ShieldDefense { defender_id, .. }) => {
                e.answer_shield(defender_id, chooser.gen_bool(0.5)).unwrap();
            }
            other => panic!("unexpected pending action {other:?}"),
        }
    }
    panic!("playout did not terminate");
}

#[test]
fn random_playouts_terminate_with_invariants_held() {
    for seed in [1u64, 2, 3, 99] {
        let (end, _) = random_playout(seed);
        assert_eq!(end.winners.len(), 3);
        assert_eq!(end.pending, Some(PendingAction::GameOver));
    }
}

#[test]
fn deterministic_chance_replays_identically() {
    let (a, steps_a) = random_playout(1234);
    let (b, steps_b) = random_playout(1234);
    assert_eq!(a, b);
    assert_eq!(steps_a, steps_b);
}
