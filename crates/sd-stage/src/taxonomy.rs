//! Shared game taxonomy — symbol kinds and spin modes
//!
//! These types are the contract between the engine and the host: the host
//! maps a [`SymbolKind`] to a sprite, the engine maps it to a payout row.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A string did not name a known symbol kind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown symbol kind: {0}")]
pub struct ParseSymbolError(pub String);

/// Every symbol that can appear on a reel
///
/// Ranked card symbols pay from their own table, the four mask symbols
/// behave identically to ranked symbols for payout purposes (they are the
/// payload of a presentation-side transformation effect), Wild substitutes,
/// and Scatter triggers the free-spin feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SymbolKind {
    Ten = 0,
    Jack = 1,
    Queen = 2,
    King = 3,
    /// Substitutes for any symbol with `wild_can_substitute`
    Wild = 4,
    /// Feature trigger — pays by reel membership, not left-to-right
    Scatter = 5,
    MaskA = 6,
    MaskB = 7,
    MaskC = 8,
    MaskD = 9,
}

impl SymbolKind {
    /// All kinds, in payout-table order
    pub const ALL: [SymbolKind; 10] = [
        SymbolKind::Ten,
        SymbolKind::Jack,
        SymbolKind::Queen,
        SymbolKind::King,
        SymbolKind::Wild,
        SymbolKind::Scatter,
        SymbolKind::MaskA,
        SymbolKind::MaskB,
        SymbolKind::MaskC,
        SymbolKind::MaskD,
    ];

    /// Is this one of the four interchangeable mask symbols?
    pub fn is_mask(&self) -> bool {
        matches!(
            self,
            SymbolKind::MaskA | SymbolKind::MaskB | SymbolKind::MaskC | SymbolKind::MaskD
        )
    }

    /// Is this a ranked or mask symbol (i.e. eligible to base a pay chain)?
    pub fn is_chain_base(&self) -> bool {
        !matches!(self, SymbolKind::Wild | SymbolKind::Scatter)
    }

    /// Short display name (host-side debugging, log lines)
    pub fn name(&self) -> &'static str {
        match self {
            SymbolKind::Ten => "TEN",
            SymbolKind::Jack => "JACK",
            SymbolKind::Queen => "QUEEN",
            SymbolKind::King => "KING",
            SymbolKind::Wild => "WILD",
            SymbolKind::Scatter => "SCATTER",
            SymbolKind::MaskA => "MASK_A",
            SymbolKind::MaskB => "MASK_B",
            SymbolKind::MaskC => "MASK_C",
            SymbolKind::MaskD => "MASK_D",
        }
    }
}

impl FromStr for SymbolKind {
    type Err = ParseSymbolError;

    /// Accepts the snake_case wire names and the display names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        SymbolKind::ALL
            .iter()
            .find(|k| k.name().to_ascii_lowercase() == normalized)
            .copied()
            .or_else(|| match normalized.as_str() {
                "ten" => Some(SymbolKind::Ten),
                "jack" => Some(SymbolKind::Jack),
                "queen" => Some(SymbolKind::Queen),
                "king" => Some(SymbolKind::King),
                "wild" => Some(SymbolKind::Wild),
                "scatter" => Some(SymbolKind::Scatter),
                _ => None,
            })
            .ok_or_else(|| ParseSymbolError(s.to_string()))
    }
}

/// Which game the current spin belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinMode {
    /// Regular paid spin
    Base,
    /// Spin inside the free-spin feature (no bet deducted)
    FreeSpin,
}

impl SpinMode {
    pub fn is_free(&self) -> bool {
        matches!(self, SpinMode::FreeSpin)
    }
}
