//! Draw detection: material, repetition, fifty-move rule.

use crate::board::{Game, Position};

fn pos(fen: &str) -> Position {
    Position::parse(fen).unwrap()
}

#[test]
fn test_insufficient_material() {
    assert!(pos("4k3/8/8/8/8/8/8/4K3 w - - 0 1").has_insufficient_material());
    assert!(pos("4k3/8/8/8/8/8/8/4KN2 w - - 0 1").has_insufficient_material());
    assert!(pos("4k3/8/8/8/8/8/8/4KB2 w - - 0 1").has_insufficient_material());
    // Same-coloured bishops on both sides
    assert!(pos("3bk3/8/8/8/8/8/8/2B1K3 w - - 0 1").has_insufficient_material());
}

#[test]
fn test_sufficient_material() {
    assert!(!pos("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1").has_insufficient_material());
    assert!(!pos("4k3/8/8/8/8/8/8/3RK3 w - - 0 1").has_insufficient_material());
    assert!(!pos("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").has_insufficient_material());
    assert!(!pos("4k3/8/8/8/8/8/8/2NNK3 w - - 0 1").has_insufficient_material());
    // Opposite-coloured bishops can still mate with help
    assert!(!pos("2b1k3/8/8/8/8/8/8/2B1K3 w - - 0 1").has_insufficient_material());
}

#[test]
fn test_fifty_move_rule() {
    let mut game = Game::from_position(pos("4k3/8/8/8/8/8/8/3RK3 w - - 99 80"));
    assert!(!game.is_draw());
    let m = game.position().parse_legal_move("e1e2").unwrap();
    game.push(m);
    assert_eq!(game.position().halfmove_clock(), 100);
    assert!(game.is_draw());
}

#[test]
fn test_capture_resets_fifty_move_count() {
    let game = Game::from_position(pos("4k3/8/8/3p4/8/8/8/3RK3 w - - 99 80"));
    let mut game = game;
    let m = game.position().parse_legal_move("d1d5").unwrap();
    game.push(m);
    assert_eq!(game.position().halfmove_clock(), 0);
    assert!(!game.is_draw());
}
