//! The game record: parallel stacks of positions, moves, and hashes.

use super::position::Position;
use super::types::Move;

/// Positions played so far plus the moves between them. The hash stack
/// feeds repetition detection; the waterline marks where the search root
/// begins, separating game history from search-tree history.
#[derive(Clone)]
pub struct Game {
    position_stack: Vec<Position>,
    move_stack: Vec<Move>,
    hash_stack: Vec<u64>,
    hash_waterline: usize,
}

impl Game {
    #[must_use]
    pub fn startpos() -> Game {
        Game::from_position(Position::startpos())
    }

    #[must_use]
    pub fn from_position(position: Position) -> Game {
        let hash = position.hash();
        Game {
            position_stack: vec![position],
            move_stack: Vec::new(),
            hash_stack: vec![hash],
            hash_waterline: 0,
        }
    }

    pub fn reset(&mut self) {
        self.set_position(Position::startpos());
    }

    pub fn set_position(&mut self, position: Position) {
        self.position_stack.clear();
        self.move_stack.clear();
        self.hash_stack.clear();
        self.hash_stack.push(position.hash());
        self.position_stack.push(position);
        self.hash_waterline = 0;
    }

    /// The current (tail) position.
    #[inline]
    #[must_use]
    pub fn position(&self) -> &Position {
        self.position_stack.last().expect("game stack is never empty")
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> u64 {
        *self.hash_stack.last().expect("game stack is never empty")
    }

    #[must_use]
    pub fn move_stack(&self) -> &[Move] {
        &self.move_stack
    }

    #[must_use]
    pub fn hash_stack(&self) -> &[u64] {
        &self.hash_stack
    }

    #[must_use]
    pub fn hash_waterline(&self) -> usize {
        self.hash_waterline
    }

    /// Mark the current depth as the search root.
    pub fn set_hash_waterline(&mut self) {
        self.hash_waterline = self.hash_stack.len();
    }

    /// Apply a legal move, deriving and pushing the child position.
    pub fn push(&mut self, m: Move) {
        let next = self.position().make(m);
        self.hash_stack.push(next.hash());
        self.position_stack.push(next);
        self.move_stack.push(m);
    }

    /// Take back the last move. No-op at the root.
    pub fn pop(&mut self) {
        if self.position_stack.len() > 1 {
            self.position_stack.pop();
            self.move_stack.pop();
            self.hash_stack.pop();
        }
    }

    /// True threefold repetition over the whole game record.
    #[must_use]
    pub fn is_threefold_repetition(&self) -> bool {
        let current = self.hash();
        self.hash_stack.iter().filter(|&&h| h == current).count() >= 3
    }

    /// Draw state of the current position as it stands in the game.
    #[must_use]
    pub fn is_draw(&self) -> bool {
        self.position().halfmove_clock() >= 100
            || self.position().has_insufficient_material()
            || self.is_threefold_repetition()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut game = Game::startpos();
        let start_hash = game.hash();
        let m = game.position().parse_legal_move("e2e4").unwrap();
        game.push(m);
        assert_ne!(game.hash(), start_hash);
        assert_eq!(game.move_stack().len(), 1);
        game.pop();
        assert_eq!(game.hash(), start_hash);
        assert!(game.move_stack().is_empty());
    }

    #[test]
    fn test_threefold_detection() {
        let mut game = Game::startpos();
        for mv in [
            "g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8",
        ] {
            assert!(!game.is_threefold_repetition());
            let m = game.position().parse_legal_move(mv).unwrap();
            game.push(m);
        }
        // Startpos has now occurred three times
        assert!(game.is_threefold_repetition());
        assert!(game.is_draw());
    }
}
