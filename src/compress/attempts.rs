//! Scale/quality table walked by iterative refinement.
//!
//! The table is plain data ordered from mildest to most aggressive. Where the
//! walk begins is decided by [`StartHeuristic`] from the ratio between the
//! current size and the target, so large gaps don't waste passes on attempts
//! that cannot possibly close them.

use crate::config::defaults::{
    DEFAULT_AGGRESSIVE_RATIO, DEFAULT_AGGRESSIVE_START, DEFAULT_MODERATE_RATIO,
    DEFAULT_MODERATE_START,
};

/// One candidate re-encoding configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionAttempt {
    /// Linear scale applied to both image dimensions, in (0, 1]
    pub scale: f64,
    /// JPEG quality, 1-100
    pub quality: u8,
}

impl CompressionAttempt {
    pub const fn new(scale: f64, quality: u8) -> Self {
        Self { scale, quality }
    }

    pub fn is_valid(&self) -> bool {
        self.scale > 0.0 && self.scale <= 1.0 && (1..=100).contains(&self.quality)
    }
}

/// Full-scale re-encodes at falling quality, then shrinking scale down to a quarter.
pub const DEFAULT_ATTEMPTS: [CompressionAttempt; 22] = [
    CompressionAttempt::new(1.0, 95),
    CompressionAttempt::new(1.0, 90),
    CompressionAttempt::new(1.0, 85),
    CompressionAttempt::new(1.0, 80),
    CompressionAttempt::new(1.0, 75),
    CompressionAttempt::new(1.0, 70),
    CompressionAttempt::new(0.9, 70),
    CompressionAttempt::new(0.85, 70),
    CompressionAttempt::new(0.8, 70),
    CompressionAttempt::new(0.8, 65),
    CompressionAttempt::new(0.8, 60),
    CompressionAttempt::new(0.75, 60),
    CompressionAttempt::new(0.7, 60),
    CompressionAttempt::new(0.65, 60),
    CompressionAttempt::new(0.6, 60),
    CompressionAttempt::new(0.55, 55),
    CompressionAttempt::new(0.5, 50),
    CompressionAttempt::new(0.45, 50),
    CompressionAttempt::new(0.4, 50),
    CompressionAttempt::new(0.35, 45),
    CompressionAttempt::new(0.3, 40),
    CompressionAttempt::new(0.25, 40),
];

/// Chooses the first attempt index from `current_size / target_size`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartHeuristic {
    pub aggressive_ratio: f64,
    pub aggressive_start: usize,
    pub moderate_ratio: f64,
    pub moderate_start: usize,
}

impl Default for StartHeuristic {
    fn default() -> Self {
        Self {
            aggressive_ratio: DEFAULT_AGGRESSIVE_RATIO,
            aggressive_start: DEFAULT_AGGRESSIVE_START,
            moderate_ratio: DEFAULT_MODERATE_RATIO,
            moderate_start: DEFAULT_MODERATE_START,
        }
    }
}

impl StartHeuristic {
    /// Index into a table of `table_len` attempts. Always in bounds for a
    /// non-empty table; a zero target counts as an infinite ratio.
    pub fn start_index(&self, current_size: u64, target_size: u64, table_len: usize) -> usize {
        if table_len == 0 {
            return 0;
        }

        let ratio = if target_size == 0 {
            f64::INFINITY
        } else {
            current_size as f64 / target_size as f64
        };

        let index = if ratio > self.aggressive_ratio {
            self.aggressive_start
        } else if ratio > self.moderate_ratio {
            self.moderate_start
        } else {
            0
        };

        index.min(table_len - 1)
    }
}
