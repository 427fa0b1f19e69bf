//! Symbol definitions and the static symbol registry

use rand::Rng;
use serde::{Deserialize, Serialize};

use sd_stage::SymbolKind;

/// Immutable payout/spawn data for one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolDefinition {
    /// Which symbol this describes
    pub kind: SymbolKind,
    /// Pay values for 3, 4, 5 of a kind (index 0 = 3oak)
    pub payout: [f64; 3],
    /// Can a Wild stand in for this symbol in a chain?
    pub wild_can_substitute: bool,
    /// Spawn weight in the base game
    pub base_weight: u32,
    /// Spawn weight during free spins
    pub bonus_weight: u32,
    /// One of the four interchangeable mask symbols
    pub is_mask: bool,
}

impl SymbolDefinition {
    /// Pay value for a chain length, 0 for anything below 3
    pub fn pay_for(&self, matched_reels: u8) -> f64 {
        if matched_reels < 3 {
            return 0.0;
        }
        let idx = ((matched_reels - 3) as usize).min(2);
        self.payout[idx]
    }
}

/// Process-wide read-only symbol registry
///
/// Built once at session construction and shared by reference; nothing
/// mutates it afterwards.
#[derive(Debug, Clone)]
pub struct SymbolRegistry {
    definitions: Vec<SymbolDefinition>,
}

impl SymbolRegistry {
    /// The production symbol set for this game
    pub fn standard() -> Self {
        let def = |kind: SymbolKind, payout: [f64; 3], weight: (u32, u32)| SymbolDefinition {
            kind,
            payout,
            wild_can_substitute: kind.is_chain_base(),
            base_weight: weight.0,
            bonus_weight: weight.1,
            is_mask: kind.is_mask(),
        };

        let definitions = vec![
            // Ranked card symbols, lowest to highest
            def(SymbolKind::Ten, [5.0, 25.0, 100.0], (12, 12)),
            def(SymbolKind::Jack, [5.0, 25.0, 100.0], (12, 12)),
            def(SymbolKind::Queen, [10.0, 50.0, 125.0], (10, 10)),
            def(SymbolKind::King, [10.0, 50.0, 125.0], (10, 10)),
            // Masks pay like ranked symbols but higher
            def(SymbolKind::MaskA, [25.0, 125.0, 750.0], (6, 8)),
            def(SymbolKind::MaskB, [25.0, 125.0, 750.0], (6, 8)),
            def(SymbolKind::MaskC, [30.0, 200.0, 1000.0], (5, 7)),
            def(SymbolKind::MaskD, [30.0, 200.0, 1000.0], (5, 7)),
            // Wild pays only through the wild-only ladder; Scatter never pays
            // directly, it triggers the feature
            SymbolDefinition {
                kind: SymbolKind::Wild,
                payout: [0.0, 0.0, 0.0],
                wild_can_substitute: false,
                base_weight: 3,
                bonus_weight: 4,
                is_mask: false,
            },
            SymbolDefinition {
                kind: SymbolKind::Scatter,
                payout: [0.0, 0.0, 0.0],
                wild_can_substitute: false,
                base_weight: 2,
                bonus_weight: 2,
                is_mask: false,
            },
        ];

        Self { definitions }
    }

    /// Look up a symbol definition
    pub fn get(&self, kind: SymbolKind) -> &SymbolDefinition {
        // Registry always holds every kind; standard() is exhaustive.
        self.definitions
            .iter()
            .find(|d| d.kind == kind)
            .unwrap_or(&self.definitions[0])
    }

    /// All definitions
    pub fn definitions(&self) -> &[SymbolDefinition] {
        &self.definitions
    }

    /// Draw one symbol using base or bonus spawn weights
    pub fn draw<R: Rng>(&self, rng: &mut R, bonus: bool) -> SymbolKind {
        let weight_of = |d: &SymbolDefinition| {
            if bonus {
                d.bonus_weight
            } else {
                d.base_weight
            }
        };

        let total: u32 = self.definitions.iter().map(weight_of).sum();
        if total == 0 {
            return SymbolKind::Ten;
        }

        let mut roll = rng.gen_range(0..total);
        for d in &self.definitions {
            let w = weight_of(d);
            if roll < w {
                return d.kind;
            }
            roll -= w;
        }
        // Unreachable while weights sum correctly
        SymbolKind::Ten
    }

    /// Draw a full reel column (top/middle/bottom)
    pub fn draw_column<R: Rng>(&self, rng: &mut R, bonus: bool) -> [SymbolKind; 3] {
        [
            self.draw(rng, bonus),
            self.draw(rng, bonus),
            self.draw(rng, bonus),
        ]
    }
}

impl Default for SymbolRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
