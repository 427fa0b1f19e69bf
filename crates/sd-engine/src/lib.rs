//! # sd-engine — SpinDrive outcome & session-orchestration engine
//!
//! The engine behind a five-reel, three-row slot: decides when each reel's
//! spin becomes "stopped", evaluates the landed grid for ways-pay wins with
//! wild substitution, and drives the free-spin feature with its escalating
//! multiplier and accumulated settlement.
//!
//! ## Architecture
//!
//! ```text
//! SymbolRegistry (static data)
//!       │
//!       ▼
//! ReelState[5]  ◄──────────────┐
//!       │                      │
//!       ▼                      │
//! ReelStopScheduler ───────────┘ (tension feedback)
//!       │ (landed grid)
//!       ▼
//! WinEvaluator ──► WinResult
//!       │
//!       ▼
//! FreeSpinOrchestrator ──► BetLedger (settlement)
//! ```
//!
//! Everything runs on a single cooperative tick: the host calls
//! [`GameSession::tick`] with the session clock and consumes the returned
//! [`sd_stage::DirectiveEvent`] batch. There is no internal threading and no
//! frame loop; "waiting" is a reel or rollup whose condition is not yet true.

pub mod config;
pub mod error;
pub mod freespins;
pub mod ledger;
pub mod outcome;
pub mod reel;
pub mod scheduler;
pub mod session;
pub mod symbols;
pub mod wineval;

pub use config::*;
pub use error::*;
pub use freespins::*;
pub use ledger::*;
pub use outcome::*;
pub use reel::*;
pub use scheduler::*;
pub use session::*;
pub use symbols::*;
pub use wineval::*;
