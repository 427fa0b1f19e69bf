//! Reel and spin-session state
//!
//! One [`ReelState`] per physical reel. The scheduler is the only writer;
//! everyone else reads snapshots taken after the all-stopped barrier.

use serde::{Deserialize, Serialize};

use sd_stage::{SpinMode, SymbolKind};

/// Physical reels on this cabinet
pub const REEL_COUNT: usize = 5;
/// Visible rows per reel
pub const ROW_COUNT: usize = 3;

/// Lifecycle of a single reel within one spin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReelPhase {
    /// Not part of an active spin
    Idle,
    /// In the spin loop, stop not yet due
    Spinning,
    /// Held in anticipation; blocks every higher reel
    Tensioned,
    /// Running the minimum stopping sequence
    Stopping,
    /// Landed; `visible` is final
    Stopped,
}

impl ReelPhase {
    /// Has this reel landed?
    pub fn is_stopped(&self) -> bool {
        matches!(self, ReelPhase::Stopped)
    }
}

/// State of one reel, owned and mutated exclusively by the scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReelState {
    /// Reel index, 0 = leftmost
    pub index: u8,
    /// Symbols currently presented (top/middle/bottom)
    pub visible: [SymbolKind; 3],
    /// The committed outcome, set before the stop sequence begins.
    /// Empty until the spin's outcome is known (live gating).
    pub pending_result: Vec<SymbolKind>,
    /// Current phase
    pub phase: ReelPhase,
    /// When this reel may leave `Spinning` (session clock, ms)
    pub scheduled_stop_ms: f64,
    /// When the current `Stopping` sequence started (ms)
    pub stopping_since_ms: f64,
    /// When the current tension hold releases (ms)
    pub tension_until_ms: f64,
    /// Flagged at spin start: this reel will tension once lower reels land
    pub tension_pending: bool,
}

impl ReelState {
    /// Fresh idle reel
    pub fn new(index: u8) -> Self {
        Self {
            index,
            visible: [SymbolKind::Ten; 3],
            pending_result: Vec::new(),
            phase: ReelPhase::Idle,
            scheduled_stop_ms: 0.0,
            stopping_since_ms: 0.0,
            tension_until_ms: 0.0,
            tension_pending: false,
        }
    }

    /// Does the committed outcome for this reel contain a scatter?
    pub fn commits_scatter(&self) -> bool {
        self.pending_result.contains(&SymbolKind::Scatter)
    }

    /// Has an outcome been committed for this reel?
    pub fn has_outcome(&self) -> bool {
        self.pending_result.len() == ROW_COUNT
    }
}

/// One spin attempt — created at spin start, finalized when settled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinSession {
    /// Base-game or feature spin
    pub mode: SpinMode,
    /// Bet this spin was placed at
    pub bet: f64,
    /// The five reels
    pub reels: [ReelState; REEL_COUNT],
    /// Player pressed stop after the lockout window
    pub stop_requested_early: bool,
    /// Session clock at spin start (ms)
    pub started_ms: f64,
}

impl SpinSession {
    /// New spin session with idle reels
    pub fn new(mode: SpinMode, bet: f64, started_ms: f64) -> Self {
        Self {
            mode,
            bet,
            reels: std::array::from_fn(|i| ReelState::new(i as u8)),
            stop_requested_early: false,
            started_ms,
        }
    }

    /// All reels landed?
    pub fn all_stopped(&self) -> bool {
        self.reels.iter().all(|r| r.phase.is_stopped())
    }

    /// Any reel holding tension?
    pub fn any_tensioned(&self) -> bool {
        self.reels.iter().any(|r| r.phase == ReelPhase::Tensioned)
    }

    /// Has every reel received its committed outcome?
    pub fn outcome_committed(&self) -> bool {
        self.reels.iter().all(|r| r.has_outcome())
    }

    /// Read-only snapshot of the landed grid. Only meaningful after
    /// [`all_stopped`](Self::all_stopped) — the win engine must not look
    /// earlier.
    pub fn grid(&self) -> GridSnapshot {
        GridSnapshot {
            columns: std::array::from_fn(|i| self.reels[i].visible),
        }
    }
}

/// Immutable 5×3 grid of landed symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    /// Column-major: `columns[reel][row]`
    pub columns: [[SymbolKind; ROW_COUNT]; REEL_COUNT],
}

impl GridSnapshot {
    /// Build from explicit columns (tests, authoritative payloads)
    pub fn from_columns(columns: [[SymbolKind; ROW_COUNT]; REEL_COUNT]) -> Self {
        Self { columns }
    }

    /// Symbols on one reel
    pub fn column(&self, reel: usize) -> &[SymbolKind; ROW_COUNT] {
        &self.columns[reel]
    }

    /// Symbol at (reel, row)
    pub fn at(&self, reel: usize, row: usize) -> SymbolKind {
        self.columns[reel][row]
    }

    /// All positions of a kind, as (reel, row)
    pub fn positions_of(&self, kind: SymbolKind) -> Vec<(u8, u8)> {
        let mut out = Vec::new();
        for (reel, col) in self.columns.iter().enumerate() {
            for (row, &s) in col.iter().enumerate() {
                if s == kind {
                    out.push((reel as u8, row as u8));
                }
            }
        }
        out
    }

    /// How many cells on a reel hold a kind
    pub fn count_on_reel(&self, reel: usize, kind: SymbolKind) -> usize {
        self.columns[reel].iter().filter(|&&s| s == kind).count()
    }
}
