//! Search termination control.
//!
//! Soft limits end iterative deepening at the next depth boundary; hard
//! limits abort the running depth, whose partial result is discarded.
//! Hard time is only compared every 1024 nodes to keep the clock off the
//! hot path.

use std::time::{Duration, Instant};

use crate::board::Color;

/// Interval (in nodes) between hard-limit clock checks.
pub const NODE_CHECK_MASK: u64 = 1023;

#[derive(Clone, Copy, Debug)]
pub enum ControlKind {
    /// Search until told to stop.
    None,
    /// Wall-clock budget.
    Time { hard: Duration, soft: Duration },
    /// Node budget (hard per move, soft per depth).
    Nodes { hard: u64, soft: u64 },
    /// Any combination of time, node, and depth limits.
    All {
        hard_time: Option<Duration>,
        soft_time: Option<Duration>,
        hard_nodes: Option<u64>,
        soft_nodes: Option<u64>,
        depth: Option<i32>,
    },
}

#[derive(Clone, Copy, Debug)]
pub struct SearchControl {
    pub start_time: Instant,
    pub kind: ControlKind,
}

impl SearchControl {
    #[must_use]
    pub fn infinite(start_time: Instant) -> SearchControl {
        SearchControl {
            start_time,
            kind: ControlKind::None,
        }
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Checked between depths: should iterative deepening stop here?
    #[must_use]
    pub fn check_soft(&self, nodes: u64, completed_depth: i32) -> bool {
        match self.kind {
            ControlKind::None => false,
            ControlKind::Time { soft, .. } => soft <= self.elapsed(),
            ControlKind::Nodes { soft, .. } => soft <= nodes,
            ControlKind::All {
                soft_time,
                soft_nodes,
                depth,
                ..
            } => {
                soft_time.is_some_and(|t| t <= self.elapsed())
                    || soft_nodes.is_some_and(|n| n <= nodes)
                    || depth.is_some_and(|d| d <= completed_depth)
            }
        }
    }

    /// Checked inside the tree (at 1024-node granularity for the clock):
    /// should the current depth abort?
    #[must_use]
    pub fn check_hard(&self, nodes: u64) -> bool {
        match self.kind {
            ControlKind::None => false,
            ControlKind::Time { hard, .. } => {
                nodes & NODE_CHECK_MASK == 0 && hard <= self.elapsed()
            }
            ControlKind::Nodes { hard, .. } => hard <= nodes,
            ControlKind::All {
                hard_time,
                hard_nodes,
                ..
            } => {
                hard_nodes.is_some_and(|n| n <= nodes)
                    || (nodes & NODE_CHECK_MASK == 0
                        && hard_time.is_some_and(|t| t <= self.elapsed()))
            }
        }
    }
}

/// Raw `go` limits as parsed off the wire.
#[derive(Clone, Copy, Debug, Default)]
pub struct SearchLimits {
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movestogo: Option<u64>,
    pub movetime: Option<u64>,
    pub depth: Option<i32>,
    pub nodes: Option<u64>,
    pub infinite: bool,
}

impl SearchLimits {
    #[must_use]
    pub fn has_time(&self) -> bool {
        self.wtime.is_some() || self.btime.is_some() || self.movetime.is_some()
    }

    #[must_use]
    pub fn has_other(&self) -> bool {
        self.depth.is_some() || self.nodes.is_some()
    }

    /// Allocate (hard, soft) time for this move.
    #[must_use]
    pub fn calc_time(&self, active: Color) -> (Duration, Duration) {
        const MARGIN_MS: u64 = 100;

        let remaining = match active {
            Color::White => self.wtime,
            Color::Black => self.btime,
        };
        let increment = match active {
            Color::White => self.winc,
            Color::Black => self.binc,
        }
        .unwrap_or(0);
        let movestogo = self.movestogo.unwrap_or(20).max(1);

        let mut safe = remaining.unwrap_or(0).saturating_sub(MARGIN_MS);

        if let Some(movetime) = self.movetime {
            if remaining.is_none() && self.winc.is_none() && self.binc.is_none() {
                return (
                    Duration::from_millis(movetime),
                    Duration::from_millis(movetime),
                );
            }
            safe = safe.min(movetime);
        }

        let hard = (safe / movestogo * 7 + increment / 3).min(safe);
        let soft = (safe / movestogo + increment / 3).min(safe);
        (Duration::from_millis(hard), Duration::from_millis(soft))
    }

    /// Build the control for these limits.
    #[must_use]
    pub fn to_control(&self, start_time: Instant, active: Color) -> SearchControl {
        let kind = if self.infinite || (!self.has_time() && !self.has_other()) {
            ControlKind::None
        } else if self.has_time() && !self.has_other() {
            let (hard, soft) = self.calc_time(active);
            ControlKind::Time { hard, soft }
        } else if !self.has_time() && self.depth.is_none() {
            // Pure node budget
            let nodes = self.nodes.unwrap_or(u64::MAX);
            ControlKind::Nodes {
                hard: nodes,
                soft: nodes,
            }
        } else {
            let (hard_time, soft_time) = if self.has_time() {
                let (hard, soft) = self.calc_time(active);
                (Some(hard), Some(soft))
            } else {
                (None, None)
            };
            ControlKind::All {
                hard_time,
                soft_time,
                hard_nodes: self.nodes,
                soft_nodes: self.nodes,
                depth: self.depth,
            }
        };
        SearchControl { start_time, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_formula() {
        // 60s remaining, 1s increment, default 20 moves to go
        let limits = SearchLimits {
            wtime: Some(60_000),
            winc: Some(1_000),
            ..Default::default()
        };
        let (hard, soft) = limits.calc_time(Color::White);
        // safe = 59_900; hard = 59_900/20*7 + 333 = 20_965 + 298? -> integer math
        assert_eq!(hard, Duration::from_millis(59_900 / 20 * 7 + 1_000 / 3));
        assert_eq!(soft, Duration::from_millis(59_900 / 20 + 1_000 / 3));
        assert!(soft < hard);
    }

    #[test]
    fn test_movetime_only() {
        let limits = SearchLimits {
            movetime: Some(5_000),
            ..Default::default()
        };
        let (hard, soft) = limits.calc_time(Color::Black);
        assert_eq!(hard, Duration::from_millis(5_000));
        assert_eq!(soft, Duration::from_millis(5_000));
    }

    #[test]
    fn test_movetime_clamps_remaining() {
        let limits = SearchLimits {
            btime: Some(60_000),
            movetime: Some(200),
            ..Default::default()
        };
        let (hard, soft) = limits.calc_time(Color::Black);
        assert!(hard <= Duration::from_millis(200));
        assert!(soft <= Duration::from_millis(200));
    }

    #[test]
    fn test_zero_time_never_negative() {
        let limits = SearchLimits {
            wtime: Some(50),
            ..Default::default()
        };
        let (hard, soft) = limits.calc_time(Color::White);
        assert_eq!(hard, Duration::ZERO);
        assert_eq!(soft, Duration::ZERO);
    }

    #[test]
    fn test_depth_limit_is_soft() {
        let limits = SearchLimits {
            depth: Some(5),
            ..Default::default()
        };
        let control = limits.to_control(Instant::now(), Color::White);
        assert!(!control.check_soft(0, 4));
        assert!(control.check_soft(0, 5));
        assert!(!control.check_hard(1024));
    }

    #[test]
    fn test_node_budget() {
        let limits = SearchLimits {
            nodes: Some(10_000),
            ..Default::default()
        };
        let control = limits.to_control(Instant::now(), Color::White);
        assert!(!control.check_hard(9_999));
        assert!(control.check_hard(10_000));
        assert!(control.check_soft(10_000, 1));
    }
}
