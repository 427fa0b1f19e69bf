//! Engine error taxonomy
//!
//! Every class here is handled inside the component that detects it; none of
//! them aborts a session. The worst user-visible outcome is a repaired
//! default or a spin that resolves on the fallback path.

use sd_stage::SpinMode;

/// Malformed static configuration, repaired locally (padding/defaulting)
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("delay profile has {got} entries, expected {expected}")]
    DelayProfileLength { expected: usize, got: usize },

    #[error("bet table is empty")]
    EmptyBetTable,

    #[error("invalid config JSON: {0}")]
    Json(String),
}

/// External settlement call failed or never answered
#[derive(Debug, Clone, thiserror::Error)]
pub enum OutcomeError {
    #[error("no settlement response within {waited_ms:.0}ms")]
    Timeout { waited_ms: f64 },

    #[error("settlement transport failed: {0}")]
    Transport(String),

    #[error("settlement payload malformed: {0}")]
    Malformed(String),
}

/// Caller used a component in a state where the call has no meaning.
/// Always a logged no-op, never propagated past the component.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StateMisuse {
    #[error("spin requested while a spin is already in flight")]
    SpinInFlight,

    #[error("spin requested during {0:?} feature phase")]
    SpinDuringFeature(SpinMode),

    #[error("stop requested with no active spin")]
    StopWithoutSpin,

    #[error("stop requested inside the lockout window")]
    StopLockedOut,

    #[error("bet change refused while reels are in motion")]
    BetChangeWhileSpinning,
}

/// Why a spin could not start
#[derive(Debug, Clone, thiserror::Error)]
pub enum SpinError {
    #[error("insufficient balance for bet")]
    InsufficientBalance,

    #[error(transparent)]
    Misuse(#[from] StateMisuse),
}
