//! # sd-stage — SpinDrive host directive vocabulary
//!
//! The engine core never renders, animates, or plays audio. Everything the
//! presentation layer needs to do is expressed as a timestamped [`Directive`]:
//! "present these symbols on reel 2", "start anticipation on reel 4",
//! "show 1998.75 in the balance field", "play the tension loop".
//!
//! A Directive is NOT an animation and NOT an internal engine event.
//! It is the semantic meaning of a moment that the host must surface.
//!
//! ```text
//! sd-engine ──► Vec<DirectiveEvent> ──► host presentation layer
//! ```

pub mod cues;
pub mod directive;
pub mod taxonomy;
pub mod trace;

pub use cues::*;
pub use directive::*;
pub use taxonomy::*;
pub use trace::*;
