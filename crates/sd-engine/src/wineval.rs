//! Win evaluation
//!
//! Pure grid-to-payout computation. Two mutually exclusive modes per spin:
//! local ways-pay evaluation (demo and live fallback) and authoritative
//! conversion of a settlement win list (live). Neither touches any state
//! outside its inputs.

use serde::{Deserialize, Serialize};

use sd_stage::SymbolKind;

use crate::outcome::ServerWinLine;
use crate::reel::{GridSnapshot, REEL_COUNT, ROW_COUNT};
use crate::symbols::SymbolRegistry;

/// Payout ladder for consecutive wilds anchored on reel 0, indexed by
/// chain length. Wilds pay on their own from two reels up, unlike
/// ordinary symbols.
pub const WILD_ONLY_PAYS: [(usize, f64); 4] = [(2, 10.0), (3, 500.0), (4, 3000.0), (5, 10000.0)];

/// Scatter trigger geometry: the trigger needs a scatter on each of these
/// reels and exactly this many scatters on the whole grid.
pub const SCATTER_TRIGGER_REELS: [usize; 3] = [2, 3, 4];
pub const SCATTER_TRIGGER_COUNT: usize = 3;

/// One display-worthy winning combination. Built fresh per evaluation and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinCombination {
    pub symbol: SymbolKind,
    /// Consecutive reels matched, starting at reel 0
    pub matched_reels: u8,
    /// A wild substituted somewhere in the chain
    pub involved_wild: bool,
    pub payout: f64,
    /// Anchor cell for win presentation, (reel, row)
    pub display_position: (u8, u8),
}

/// Everything a single spin's evaluation produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WinResult {
    pub total: f64,
    pub combinations: Vec<WinCombination>,
    pub has_scatter_trigger: bool,
    pub has_wild_only: bool,
}

impl WinResult {
    pub fn is_win(&self) -> bool {
        self.total > 0.0
    }

    /// Convert an authoritative settlement win list. No local payout math
    /// happens here; amounts are summed as received.
    pub fn from_authoritative(lines: &[ServerWinLine], scatter_triggered: bool) -> Self {
        let combinations: Vec<WinCombination> = lines
            .iter()
            .map(|line| WinCombination {
                symbol: line.symbol,
                matched_reels: line.matched_reels,
                involved_wild: line.involved_wild,
                payout: line.win_amount,
                display_position: line.position,
            })
            .collect();
        let total = combinations.iter().map(|c| c.payout).sum();
        let has_wild_only = combinations.iter().any(|c| c.symbol == SymbolKind::Wild);
        Self {
            total,
            combinations,
            has_scatter_trigger: scatter_triggered,
            has_wild_only,
        }
    }
}

/// Local ways-pay evaluator over a stopped grid.
#[derive(Debug, Clone)]
pub struct WinEvaluator {
    registry: SymbolRegistry,
}

impl WinEvaluator {
    pub fn new(registry: SymbolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SymbolRegistry {
        &self.registry
    }

    /// Evaluate a full grid at the given bet.
    ///
    /// Every non-wild, non-scatter symbol instance on reel 0 anchors its
    /// own chain; chains through later reels multiply by the number of
    /// qualifying symbols per reel (ways). A symbol chain and a wild-only
    /// chain may share grid cells and both score.
    pub fn evaluate(&self, grid: &GridSnapshot, bet: f64) -> WinResult {
        let mut result = WinResult::default();

        for row in 0..ROW_COUNT {
            let anchor = grid.at(0, row);
            if !anchor.is_chain_base() {
                continue;
            }
            if let Some(combo) = self.evaluate_chain(grid, anchor, row as u8, bet) {
                result.total += combo.payout;
                result.combinations.push(combo);
            }
        }

        if let Some(combo) = self.evaluate_wild_only(grid, bet) {
            result.total += combo.payout;
            result.has_wild_only = true;
            result.combinations.push(combo);
        }

        result.has_scatter_trigger = Self::scatter_triggered(grid);
        result
    }

    /// Scatter trigger: exactly three scatters grid-wide, one on each of
    /// reels 2, 3 and 4. Pays nothing directly; it signals the feature.
    pub fn scatter_triggered(grid: &GridSnapshot) -> bool {
        let total: usize = (0..REEL_COUNT)
            .map(|r| grid.count_on_reel(r, SymbolKind::Scatter))
            .sum();
        total == SCATTER_TRIGGER_COUNT
            && SCATTER_TRIGGER_REELS
                .iter()
                .all(|&r| grid.count_on_reel(r, SymbolKind::Scatter) > 0)
    }

    /// Extend one anchored chain reel-by-reel. A reel continues the chain
    /// if it holds the base symbol or a substituting wild; the way count
    /// multiplies across reels.
    fn evaluate_chain(
        &self,
        grid: &GridSnapshot,
        base: SymbolKind,
        anchor_row: u8,
        bet: f64,
    ) -> Option<WinCombination> {
        let def = self.registry.get(base);

        let mut length = 1usize;
        let mut ways = 1u32;
        let mut involved_wild = false;
        for reel in 1..REEL_COUNT {
            let same = grid.count_on_reel(reel, base) as u32;
            let wilds = if def.wild_can_substitute {
                grid.count_on_reel(reel, SymbolKind::Wild) as u32
            } else {
                0
            };
            if same + wilds == 0 {
                break;
            }
            if wilds > 0 {
                involved_wild = true;
            }
            length += 1;
            ways *= same + wilds;
        }

        let pay = def.pay_for(length as u8);
        if pay <= 0.0 {
            return None;
        }
        Some(WinCombination {
            symbol: base,
            matched_reels: length as u8,
            involved_wild,
            payout: pay * ways as f64 * bet,
            display_position: (0, anchor_row),
        })
    }

    /// Wild-only ladder: consecutive reels holding at least one wild,
    /// anchored at reel 0, paid from a fixed table independent of any
    /// symbol's own payouts.
    fn evaluate_wild_only(&self, grid: &GridSnapshot, bet: f64) -> Option<WinCombination> {
        let mut length = 0usize;
        for reel in 0..REEL_COUNT {
            if grid.count_on_reel(reel, SymbolKind::Wild) == 0 {
                break;
            }
            length += 1;
        }

        let pay = WILD_ONLY_PAYS
            .iter()
            .find(|(len, _)| *len == length)
            .map(|(_, pay)| *pay)?;

        let anchor_row = grid
            .positions_of(SymbolKind::Wild)
            .iter()
            .find(|(reel, _)| *reel == 0)
            .map(|(_, row)| *row)
            .unwrap_or(0);

        Some(WinCombination {
            symbol: SymbolKind::Wild,
            matched_reels: length as u8,
            involved_wild: true,
            payout: pay * bet,
            display_position: (0, anchor_row),
        })
    }
}
