//! Targeted move generation cases.

use crate::board::{Move, MoveGen, MoveList, Position};

fn pos(fen: &str) -> Position {
    Position::parse(fen).unwrap()
}

fn moves_of(position: &Position) -> Vec<String> {
    position
        .legal_moves()
        .iter()
        .map(|m| m.to_string())
        .collect()
}

#[test]
fn test_startpos_move_count() {
    let p = Position::startpos();
    assert_eq!(p.legal_moves().len(), 20);
}

#[test]
fn test_double_check_only_king_moves() {
    // Queen on d8 and bishop on g7 give double check; only the three safe
    // king steps answer it
    let p = pos("3q3k/6b1/8/8/3K4/2P1P3/8/8 w - - 0 1");
    let legal = moves_of(&p);
    assert_eq!(legal.len(), 3);
    for m in ["d4c5", "d4c4", "d4e4"] {
        assert!(legal.contains(&m.to_string()), "missing {m}");
    }
}

#[test]
fn test_pinned_knight_cannot_move() {
    // Knight e4 sits between the e8 rook and the e1 king
    let p = pos("4r2k/8/8/8/4N3/8/8/4K3 w - - 0 1");
    let legal = moves_of(&p);
    assert!(!legal.iter().any(|m| m.starts_with("e4")), "knight is pinned");
}

#[test]
fn test_pinned_bishop_slides_along_pin_ray() {
    // Bishop d2 is pinned by the a5 bishop on the a5-e1 diagonal; it may
    // slide along that diagonal, up to and including the pinner
    let p = pos("7k/8/8/b7/8/8/3B4/4K3 w - - 0 1");
    let legal = moves_of(&p);
    assert!(legal.contains(&"d2c3".to_string()));
    assert!(legal.contains(&"d2b4".to_string()));
    assert!(legal.contains(&"d2a5".to_string()), "capturing the pinner");
    assert!(!legal.contains(&"d2e3".to_string()), "off the pin ray");
    assert!(!legal.contains(&"d2c1".to_string()), "off the pin ray");
}

#[test]
fn test_en_passant_clearance_pin() {
    // Lone capturer: taking en passant clears both pawns off the fifth
    // rank and exposes the king to the h5 rook
    let p = pos("8/8/8/KPp4r/8/8/8/7k w - c6 0 1");
    let legal = moves_of(&p);
    assert!(!legal.contains(&"b5c6".to_string()), "clearance pin");
    assert!(legal.contains(&"b5b6".to_string()));
}

#[test]
fn test_en_passant_two_capturers_are_safe() {
    // With capturers on both sides, whichever one takes leaves the other
    // behind as a blocker
    let p = pos("8/8/8/KPpP3r/8/8/8/7k w - c6 0 1");
    let legal = moves_of(&p);
    assert!(legal.contains(&"b5c6".to_string()));
    assert!(legal.contains(&"d5c6".to_string()));
}

#[test]
fn test_en_passant_lone_capturer_far_from_king() {
    let p = pos("8/8/8/K2pP2r/8/8/8/7k w - d6 0 1");
    let legal = moves_of(&p);
    assert!(!legal.contains(&"e5d6".to_string()), "rank clearance pin");
    assert!(legal.contains(&"e5e6".to_string()));
}

#[test]
fn test_castling_through_attack_blocked() {
    // Black rook on f8 covers f1: no h-side castle, a-side still fine
    let p = pos("4kr2/8/8/8/8/8/8/R3K2R w KQ - 0 1");
    let legal = moves_of(&p);
    assert!(!legal.contains(&"e1g1".to_string()));
    assert!(legal.contains(&"e1c1".to_string()));
}

#[test]
fn test_castling_blocked_by_piece() {
    let p = pos("4k3/8/8/8/8/8/8/R2QK2R w KQ - 0 1");
    let legal = moves_of(&p);
    assert!(legal.contains(&"e1g1".to_string()));
    assert!(!legal.contains(&"e1c1".to_string()), "queen blocks the a-side");
}

#[test]
fn test_no_castling_while_in_check() {
    let p = pos("4k3/8/8/8/8/8/4r3/R3K2R w KQ - 0 1");
    let legal = moves_of(&p);
    assert!(!legal.contains(&"e1g1".to_string()));
    assert!(!legal.contains(&"e1c1".to_string()));
}

#[test]
fn test_frc_castle_exposes_king_on_vacated_rook_square() {
    // Chess960 shape: castling rook on b1, enemy rook on a1. After the
    // a-side castle (Kc1, Rd1) the a1 rook would check through the
    // vacated b1 square, so the castle must not be generated.
    let p = pos("4k3/8/8/8/8/8/8/rR2K3 w B - 0 1");
    let legal = moves_of(&p);
    assert!(!legal.iter().any(|m| m == "e1b1" || m == "e1c1"));
}

#[test]
fn test_king_cannot_step_back_along_checker_ray() {
    // Rook checks along the rank; the king may not retreat along it
    let p = pos("7k/8/8/8/r3K3/8/8/8 w - - 0 1");
    let legal = moves_of(&p);
    assert!(!legal.contains(&"e4f4".to_string()));
    assert!(legal.contains(&"e4e5".to_string()));
    assert!(legal.contains(&"e4d5".to_string()));
}

#[test]
fn test_block_and_capture_responses_to_check() {
    // Bishop checks from b4 along b4-c3-d2-e1; the knight can interpose
    // on either square, the rook cannot help, castling is off
    let p = pos("4k3/8/8/8/1b6/8/8/RN2K3 w Q - 0 1");
    let legal = moves_of(&p);
    assert!(legal.contains(&"b1c3".to_string()));
    assert!(legal.contains(&"b1d2".to_string()));
    assert!(!legal.contains(&"b1a3".to_string()), "does not address the check");
    assert!(!legal.iter().any(|m| m == "e1c1" || m == "e1a1"));
    assert!(legal.contains(&"e1e2".to_string()));
}

#[test]
fn test_stalemate_has_no_moves() {
    let p = pos("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
    assert!(p.legal_moves().is_empty());
    assert!(!p.in_check());
}

#[test]
fn test_checkmate_has_no_moves() {
    let p = pos("6kR/6P1/6K1/8/8/8/8/8 b - - 0 1");
    assert!(p.legal_moves().is_empty());
    assert!(p.in_check());
}

#[test]
fn test_promotion_generates_all_four_pieces() {
    let p = pos("8/P6k/8/8/8/8/8/K7 w - - 0 1");
    let legal = moves_of(&p);
    for m in ["a7a8q", "a7a8n", "a7a8r", "a7a8b"] {
        assert!(legal.contains(&m.to_string()), "missing {m}");
    }
}

#[test]
fn test_move_text_round_trip() {
    let fens = [
        Position::STARTPOS_FEN,
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1",
        "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
    ];
    for fen in fens {
        let p = pos(fen);
        for &m in p.legal_moves().iter() {
            let parsed = p.parse_legal_move(&m.to_string()).unwrap();
            assert_eq!(parsed, m, "{fen}: {m} round trip");
        }
    }
}

#[test]
fn test_is_legal_agrees_with_generation() {
    let fens = [
        Position::STARTPOS_FEN,
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
        "n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1",
        "2r1kr2/8/8/8/8/8/8/1R2K1R1 w GBfc - 0 1",
        "3q3k/6b1/8/8/3K4/2P1P3/8/8 w - - 0 1",
    ];
    for fen in fens {
        let p = pos(fen);
        let mut moves = MoveList::new();
        let gen = MoveGen::new(&p);
        gen.generate(&mut moves);
        for &m in moves.iter() {
            assert!(gen.is_legal(m), "{fen}: generated {m} fails is_legal");
        }
        // Exhaustively: any accepted 16-bit pattern must be a generated move
        for raw in 0..=u16::MAX {
            let m = Move::from_u16(raw);
            if gen.is_legal(m) {
                assert!(
                    moves.contains(m),
                    "{fen}: is_legal accepts alien move {m} ({raw:#x})"
                );
            }
        }
    }
}
