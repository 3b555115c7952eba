//! Principal variation line.

use std::fmt;

use crate::board::Move;

pub const MAX_PLY: usize = 128;

/// A fixed-capacity move sequence, rebuilt bottom-up as the search
/// improves alpha.
#[derive(Clone, Copy)]
pub struct Line {
    moves: [Move; MAX_PLY],
    len: usize,
}

impl Line {
    #[must_use]
    pub const fn new() -> Line {
        Line {
            moves: [Move::NONE; MAX_PLY],
            len: 0,
        }
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn first(&self) -> Option<Move> {
        if self.len > 0 {
            Some(self.moves[0])
        } else {
            None
        }
    }

    #[must_use]
    pub fn moves(&self) -> &[Move] {
        &self.moves[..self.len]
    }

    /// Replace with the single move `m`.
    pub fn set(&mut self, m: Move) {
        self.moves[0] = m;
        self.len = 1;
    }

    /// Replace with `m` followed by the child's line.
    pub fn set_with_child(&mut self, m: Move, child: &Line) {
        self.moves[0] = m;
        let take = child.len.min(MAX_PLY - 1);
        self.moves[1..=take].copy_from_slice(&child.moves[..take]);
        self.len = take + 1;
    }
}

impl Default for Line {
    fn default() -> Self {
        Line::new()
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, m) in self.moves().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{m}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{MoveFlags, Square};

    fn mv(from: &str, to: &str) -> Move {
        Move::make(
            from.parse::<Square>().unwrap(),
            to.parse::<Square>().unwrap(),
            MoveFlags::Normal,
        )
    }

    #[test]
    fn test_build_from_child() {
        let mut child = Line::new();
        child.set(mv("e7", "e5"));
        let mut parent = Line::new();
        parent.set_with_child(mv("e2", "e4"), &child);
        assert_eq!(parent.len(), 2);
        assert_eq!(parent.to_string(), "e2e4 e7e5");
        assert_eq!(parent.first(), Some(mv("e2", "e4")));
    }
}
