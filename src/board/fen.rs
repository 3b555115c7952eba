//! FEN parsing and formatting.
//!
//! Standard six-field FEN. The castling field accepts K/Q/k/q as well as
//! file letters A-H / a-h naming the rook's file directly (Chess960).

use super::error::ParseError;
use super::position::{Position, RookInfo};
use super::types::{Color, Move, MoveFlags, PieceId, PieceType, Square};

fn parse_u16(s: &str) -> Option<u16> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl Position {
    /// Parse a full six-field FEN string.
    pub fn parse(fen: &str) -> Result<Position, ParseError> {
        let mut fields = fen.split_whitespace();
        let board = fields.next().ok_or(ParseError::InvalidLength)?;
        let color = fields.next().ok_or(ParseError::InvalidLength)?;
        let castling = fields.next().ok_or(ParseError::InvalidLength)?;
        let enpassant = fields.next().ok_or(ParseError::InvalidLength)?;
        let halfmove = fields.next().ok_or(ParseError::InvalidLength)?;
        let fullmove = fields.next().ok_or(ParseError::InvalidLength)?;
        if fields.next().is_some() {
            return Err(ParseError::InvalidLength);
        }
        Position::parse_fields(board, color, castling, enpassant, halfmove, fullmove)
    }

    /// Parse the six FEN fields separately (as the UCI `position fen`
    /// command hands them over).
    pub fn parse_fields(
        board_str: &str,
        color_str: &str,
        castle_str: &str,
        enpassant_str: &str,
        halfmove_str: &str,
        fullmove_str: &str,
    ) -> Result<Position, ParseError> {
        let mut position = Position::new_empty();

        // Board: ranks from the 8th down, piece IDs handed out in reading
        // order with ID 0 reserved for each king.
        {
            let mut place_index = 0usize;
            let mut next_id = [1u8, 1u8];
            for ch in board_str.chars() {
                if place_index > 64 {
                    return Err(ParseError::InvalidLength);
                }
                let file = (place_index % 8) as u8;
                let rank = 7 - (place_index / 8).min(7) as u8;
                let sq = Square::from_file_and_rank(file, rank);
                if ch == '/' {
                    if file != 0 || place_index == 0 {
                        return Err(ParseError::InvalidChar);
                    }
                } else if ('1'..='8').contains(&ch) {
                    let spaces = ch as usize - '0' as usize;
                    if place_index >= 64 || file as usize + spaces > 8 {
                        return Err(ParseError::InvalidChar);
                    }
                    place_index += spaces;
                } else if place_index >= 64 {
                    return Err(ParseError::InvalidLength);
                } else if let Some((ptype, color)) = PieceType::parse(ch) {
                    if ptype == PieceType::King {
                        if position.piece_list_sq(color).get(PieceId::king()).is_valid() {
                            return Err(ParseError::TooManyKings);
                        }
                        position.place_parsed_piece(sq, color, ptype, PieceId::king());
                    } else {
                        let id = next_id[color.index()];
                        if id >= 16 {
                            return Err(ParseError::TooManyPieces);
                        }
                        position.place_parsed_piece(sq, color, ptype, PieceId::new(id));
                        next_id[color.index()] += 1;
                    }
                    place_index += 1;
                } else {
                    return Err(ParseError::InvalidChar);
                }
            }
            if place_index != 64 {
                return Err(ParseError::InvalidLength);
            }
            for color in [Color::White, Color::Black] {
                if !position.piece_list_sq(color).get(PieceId::king()).is_valid() {
                    return Err(ParseError::InvalidBoard);
                }
            }
        }

        // Side to move
        let stm = match color_str {
            "w" => Color::White,
            "b" => Color::Black,
            s if s.len() != 1 => return Err(ParseError::InvalidLength),
            _ => return Err(ParseError::InvalidChar),
        };

        // Castling rights
        let mut rook_info = RookInfo::none();
        if castle_str != "-" {
            for ch in castle_str.chars() {
                let (color, letter) = if ch.is_ascii_uppercase() {
                    (Color::White, ch.to_ascii_lowercase())
                } else {
                    (Color::Black, ch)
                };
                let king_sq = position.piece_list_sq(color).get(PieceId::king());
                if king_sq.rank() != color.back_rank() {
                    return Err(ParseError::InvalidBoard);
                }
                let rook_file = match letter {
                    'a'..='h' => Some(letter as u8 - b'a'),
                    // Classical letters scan outward-in for the rook
                    'k' | 'q' => None,
                    _ => return Err(ParseError::InvalidChar),
                };
                let file = match rook_file {
                    Some(file) => file,
                    None => {
                        let (mut file, step): (i8, i8) =
                            if letter == 'q' { (0, 1) } else { (7, -1) };
                        loop {
                            if !(0..8).contains(&file) {
                                return Err(ParseError::InvalidBoard);
                            }
                            let sq = Square::from_file_and_rank(file as u8, color.back_rank());
                            let place = position.board().read(sq);
                            if place.is_empty() {
                                file += step;
                                continue;
                            }
                            break;
                        }
                        file as u8
                    }
                };
                let rook_sq = Square::from_file_and_rank(file, color.back_rank());
                let place = position.board().read(rook_sq);
                if place.is_empty() || place.color() != color || place.ptype() != PieceType::Rook {
                    return Err(ParseError::InvalidBoard);
                }
                if file < king_sq.file() {
                    rook_info.set_aside(color, rook_sq);
                } else if file > king_sq.file() {
                    rook_info.set_hside(color, rook_sq);
                } else {
                    return Err(ParseError::InvalidBoard);
                }
            }
        }

        // En passant square
        let enpassant = if enpassant_str == "-" {
            Square::invalid()
        } else {
            enpassant_str.parse::<Square>()?
        };

        // Clocks
        let halfmove_clock = match parse_u16(halfmove_str) {
            Some(clock) if clock <= 200 => clock,
            _ => return Err(ParseError::OutOfRange),
        };
        let ply = match parse_u16(fullmove_str) {
            Some(fullmove) if (1..10000).contains(&fullmove) => {
                (fullmove - 1) * 2 + stm.index() as u16
            }
            _ => return Err(ParseError::OutOfRange),
        };

        position.set_state(rook_info, enpassant, stm, halfmove_clock, ply);
        position.rebuild_attacks();
        position.rebuild_accumulators();
        position.set_hash_from_scratch();

        if !position.validate() {
            return Err(ParseError::InvalidBoard);
        }
        Ok(position)
    }
}

impl Position {
    /// Parse long-algebraic move text against this position. Castling is
    /// accepted both as the classical king hop (`e1g1`) and as
    /// king-takes-rook (`e1h1`), whichever the GUI speaks.
    pub fn parse_move(&self, s: &str) -> Result<Move, ParseError> {
        if !s.is_ascii() {
            return Err(ParseError::InvalidChar);
        }
        if s.len() != 4 && s.len() != 5 {
            return Err(ParseError::InvalidLength);
        }
        let from: Square = s[0..2].parse()?;
        let to: Square = s[2..4].parse()?;

        let src = self.board().read(from);
        let dest = self.board().read(to);
        if src.is_empty() || src.color() != self.stm() {
            return Err(ParseError::ColorViolation);
        }
        let ptype = src.ptype();
        let capture = !dest.is_empty() && dest.color() != self.stm();

        if s.len() == 4 {
            if ptype == PieceType::Pawn {
                if self.enpassant() == to {
                    return Ok(Move::make(from, to, MoveFlags::EnPassant));
                }
                if from.index().abs_diff(to.index()) == 16 {
                    return Ok(Move::make(from, to, MoveFlags::DoublePush));
                }
            }
            if ptype == PieceType::King {
                let rook_info = self.rook_info();
                if to == rook_info.aside(self.stm()) {
                    return Ok(Move::make(from, to, MoveFlags::CastleAside));
                }
                if to == rook_info.hside(self.stm()) {
                    return Ok(Move::make(from, to, MoveFlags::CastleHside));
                }
                if from.file() == 4 && to.file() == 2 && rook_info.aside(self.stm()).is_valid() {
                    return Ok(Move::make(
                        from,
                        rook_info.aside(self.stm()),
                        MoveFlags::CastleAside,
                    ));
                }
                if from.file() == 4 && to.file() == 6 && rook_info.hside(self.stm()).is_valid() {
                    return Ok(Move::make(
                        from,
                        rook_info.hside(self.stm()),
                        MoveFlags::CastleHside,
                    ));
                }
            }
            let flags = if capture {
                MoveFlags::Capture
            } else {
                MoveFlags::Normal
            };
            return Ok(Move::make(from, to, flags));
        }

        // Castling reads as king-captures-own-rook, so only reject
        // friendly targets for genuine promotions.
        if !dest.is_empty() && dest.color() == self.stm() {
            return Err(ParseError::ColorViolation);
        }
        let flags = match (s.as_bytes()[4], capture) {
            (b'q', false) => MoveFlags::PromoQueen,
            (b'n', false) => MoveFlags::PromoKnight,
            (b'r', false) => MoveFlags::PromoRook,
            (b'b', false) => MoveFlags::PromoBishop,
            (b'q', true) => MoveFlags::CapPromoQueen,
            (b'n', true) => MoveFlags::CapPromoKnight,
            (b'r', true) => MoveFlags::CapPromoRook,
            (b'b', true) => MoveFlags::CapPromoBishop,
            _ => return Err(ParseError::InvalidChar),
        };
        Ok(Move::make(from, to, flags))
    }

    /// Parse and validate against the legal move set.
    pub fn parse_legal_move(&self, s: &str) -> Result<Move, ParseError> {
        let m = self.parse_move(s)?;
        if self.is_legal(m) {
            Ok(m)
        } else {
            Err(ParseError::IllegalMove)
        }
    }
}

/// Format a position as a six-field FEN string.
#[must_use]
pub fn format_fen(position: &Position) -> String {
    let mut out = String::new();

    for rank in (0..8).rev() {
        let mut blanks = 0;
        for file in 0..8 {
            let place = position.board().read(Square::from_file_and_rank(file, rank));
            if place.is_empty() {
                blanks += 1;
            } else {
                if blanks > 0 {
                    out.push_str(&blanks.to_string());
                    blanks = 0;
                }
                out.push(place.to_char());
            }
        }
        if blanks > 0 {
            out.push_str(&blanks.to_string());
        }
        if rank > 0 {
            out.push('/');
        }
    }

    out.push(' ');
    out.push(position.stm().to_char());
    out.push(' ');

    let rook_info = position.rook_info();
    if rook_info.is_clear() {
        out.push('-');
    } else {
        // Classical corner rooks print as KQkq, others by file letter
        for color in [Color::White, Color::Black] {
            let (base, kside, qside) = if color == Color::White {
                (b'A', 'K', 'Q')
            } else {
                (b'a', 'k', 'q')
            };
            let hside = rook_info.hside(color);
            if hside.is_valid() {
                out.push(if hside.file() == 7 {
                    kside
                } else {
                    (base + hside.file()) as char
                });
            }
            let aside = rook_info.aside(color);
            if aside.is_valid() {
                out.push(if aside.file() == 0 {
                    qside
                } else {
                    (base + aside.file()) as char
                });
            }
        }
    }

    out.push(' ');
    if position.enpassant().is_valid() {
        out.push_str(&position.enpassant().to_string());
    } else {
        out.push('-');
    }

    out.push_str(&format!(
        " {} {}",
        position.halfmove_clock(),
        position.full_move_counter()
    ));
    out
}

/// Render the board as a diagram for the `d` command.
#[must_use]
pub fn pretty_print(position: &Position) -> String {
    let mut out = String::new();
    for rank in (0..8).rev() {
        out.push_str("  +---+---+---+---+---+---+---+---+\n");
        out.push_str(&format!("{} |", rank + 1));
        for file in 0..8 {
            let place = position.board().read(Square::from_file_and_rank(file, rank));
            if place.is_empty() {
                out.push_str("   |");
            } else {
                out.push_str(&format!(" {} |", place.to_char()));
            }
        }
        out.push('\n');
    }
    out.push_str("  +---+---+---+---+---+---+---+---+\n");
    out.push_str("    a   b   c   d   e   f   g   h\n");
    out
}
