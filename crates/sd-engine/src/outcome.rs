//! Outcome acquisition
//!
//! Where a spin's symbols come from. Live sessions ask an external
//! settlement service through [`OutcomeSource`] and poll it every tick;
//! demo sessions (and the live timeout fallback) draw weighted-random
//! symbols from [`LocalOutcomes`]. Either way the symbols are committed
//! before any reel is allowed to land.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use sd_stage::{SpinMode, SymbolKind};

use crate::error::OutcomeError;
use crate::reel::{REEL_COUNT, ROW_COUNT};
use crate::symbols::SymbolRegistry;

/// Column-major symbol grid, `grid[reel][row]`.
pub type OutcomeGrid = [[SymbolKind; ROW_COUNT]; REEL_COUNT];

/// One winning line as reported by the settlement service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerWinLine {
    pub symbol: SymbolKind,
    pub matched_reels: u8,
    pub involved_wild: bool,
    pub win_amount: f64,
    /// Anchor cell, (reel, row)
    pub position: (u8, u8),
}

/// Full settlement payload for one spin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerOutcome {
    pub grid: OutcomeGrid,
    #[serde(default)]
    pub win_lines: Vec<ServerWinLine>,
    pub total_win: f64,
    pub scatter_triggered: bool,
}

impl ServerOutcome {
    /// Parse a settlement payload. Shape errors surface as
    /// [`OutcomeError::Malformed`] so the caller can take the fallback path.
    pub fn from_json(json: &str) -> Result<Self, OutcomeError> {
        serde_json::from_str(json).map_err(|e| OutcomeError::Malformed(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, OutcomeError> {
        serde_json::to_string(self).map_err(|e| OutcomeError::Malformed(e.to_string()))
    }
}

/// One poll of an in-flight outcome request.
#[derive(Debug)]
pub enum OutcomePoll {
    /// Nothing yet, keep the gate up
    Pending,
    Ready(ServerOutcome),
    Failed(OutcomeError),
}

/// A provider of authoritative spin outcomes, polled cooperatively from
/// the session tick. Implementations must tolerate `poll` being called
/// repeatedly after resolving.
pub trait OutcomeSource {
    /// Start a request for the next spin's outcome.
    fn request(&mut self, bet: f64, mode: SpinMode, now_ms: f64);

    /// Check on the in-flight request.
    fn poll(&mut self, now_ms: f64) -> OutcomePoll;
}

/// Weighted-random local outcome generator. Deterministic under a fixed
/// seed, which is what the tests lean on.
#[derive(Debug)]
pub struct LocalOutcomes {
    registry: SymbolRegistry,
    rng: StdRng,
}

impl LocalOutcomes {
    pub fn new(registry: SymbolRegistry) -> Self {
        Self {
            registry,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(registry: SymbolRegistry, seed: u64) -> Self {
        Self {
            registry,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Reseed mid-session (replay support).
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Draw a full 5x3 grid using base or bonus spawn weights.
    pub fn draw_grid(&mut self, mode: SpinMode) -> OutcomeGrid {
        let bonus = mode.is_free();
        std::array::from_fn(|_| self.registry.draw_column(&mut self.rng, bonus))
    }

}
