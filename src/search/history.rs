//! Quiet-move history heuristic.

use crate::board::Move;

const BONUS_SCALE: i32 = 100;
const BONUS_CONST: i32 = -30;
const BONUS_MAX: i32 = 10000;
const HISTORY_CLAMP: i32 = 16384;

/// A 64x64 from/to table of signed 16-bit scores with gravity-style
/// updates: each bonus is damped in proportion to the current value, so
/// scores saturate instead of running away.
pub struct History {
    quiet: [[i16; 64]; 64],
}

impl History {
    #[must_use]
    pub fn new() -> History {
        History {
            quiet: [[0; 64]; 64],
        }
    }

    pub fn clear(&mut self) {
        self.quiet = [[0; 64]; 64];
    }

    #[inline]
    #[must_use]
    pub fn get(&self, m: Move) -> i32 {
        i32::from(self.quiet[m.from().index()][m.to().index()])
    }

    /// Reward (+1) or punish (-1) a quiet move seen at `depth`.
    pub fn update_quiet(&mut self, sign: i32, m: Move, depth: i32) {
        debug_assert!(sign == 1 || sign == -1);
        debug_assert!(!m.is_capture());
        let bonus = (depth * BONUS_SCALE + BONUS_CONST).min(BONUS_MAX);
        let entry = &mut self.quiet[m.from().index()][m.to().index()];
        let h = i32::from(*entry);
        *entry = (h + sign * bonus - h * bonus / HISTORY_CLAMP) as i16;
    }
}

impl Default for History {
    fn default() -> Self {
        History::new()
    }
}
