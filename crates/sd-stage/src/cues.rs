//! Sound and animation cue identifiers
//!
//! The engine decides *when* something should be heard or animated; the host
//! decides *what* asset that maps to. Cues are therefore plain identifiers
//! with no parameters beyond what the moment itself carries.

use serde::{Deserialize, Serialize};

/// Fire-and-forget sound cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
    /// Spin button accepted, reels launching
    SpinStart,
    /// Single reel landed
    ReelStop,
    /// Scatter landed on a reel
    ScatterLand,
    /// Tension loop while a reel is held in anticipation
    TensionLoop,
    /// Tension resolved (reel released)
    TensionEnd,
    /// Any win presented
    WinPresent,
    /// Win counter ticking
    RollupLoop,
    /// Win counter finished
    RollupEnd,
    /// Free-spin feature entered
    FeatureEnter,
    /// One more free spin starting
    FeatureSpin,
    /// Extra spins awarded mid-feature
    FeatureRetrigger,
    /// Feature settled, back to base game
    FeatureExit,
    /// Stop request rejected inside the lockout window
    StopDenied,
}

/// Symbol animation cues, played on a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationCue {
    /// Symbol is part of a paying combination
    SymbolWin,
    /// Scatter teasing before the trigger completes
    ScatterTease,
    /// Wild highlighted while substituting
    WildPulse,
}

/// Host text fields the engine pushes amounts into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountField {
    /// Player balance
    Balance,
    /// Current spin win (rollup target)
    Win,
    /// Selected bet
    Bet,
    /// Accumulated feature total
    FeatureTotal,
}
