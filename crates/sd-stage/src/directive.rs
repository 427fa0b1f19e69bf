//! Directive — the canonical engine-to-host instruction stream
//!
//! Directives are emitted in batches from the engine tick and are ordered by
//! `timestamp_ms`. The host may replay, buffer, or drop them; the engine
//! never depends on feedback from a directive.

use serde::{Deserialize, Serialize};

use crate::cues::{AmountField, AnimationCue, SoundCue};
use crate::taxonomy::SymbolKind;

/// A single instruction to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Directive {
    // ═══════════════════════════════════════════════════════════════════════
    // SPIN LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════
    /// Spin accepted, all reels launching
    SpinStart,

    /// Reel entered its spinning loop
    ReelSpinning {
        /// Which reel (0-indexed)
        reel_index: u8,
    },

    /// Reel has landed; these symbols are now visible (top to bottom)
    PresentSymbols {
        reel_index: u8,
        symbols: Vec<SymbolKind>,
    },

    /// All reels landed, outcome is final
    AllReelsStopped,

    /// Spin fully finalized, controls re-enabled
    SpinEnd,

    // ═══════════════════════════════════════════════════════════════════════
    // TENSION / ANTICIPATION
    // ═══════════════════════════════════════════════════════════════════════
    /// Reel held in tension (slow spin, anticipation build)
    AnticipationOn {
        reel_index: u8,
        /// Why the reel is tensioned (e.g. "scatter")
        #[serde(default)]
        reason: Option<String>,
    },

    /// Tension resolved, reel released into its stop sequence
    AnticipationOff { reel_index: u8 },

    // ═══════════════════════════════════════════════════════════════════════
    // WIN PRESENTATION
    // ═══════════════════════════════════════════════════════════════════════
    /// Win celebration starting
    WinPresent {
        win_amount: f64,
        /// Number of paying combinations
        combination_count: u8,
    },

    /// Win counter starting (0 → target)
    RollupStart { target_amount: f64 },

    /// Win counter progress
    RollupTick {
        current_amount: f64,
        /// 0.0 - 1.0
        progress: f64,
    },

    /// Win counter finished
    RollupEnd { final_amount: f64 },

    // ═══════════════════════════════════════════════════════════════════════
    // FEATURE LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════
    /// Free-spin feature entered
    FeatureEnter {
        total_spins: u32,
        multiplier: f64,
    },

    /// One feature spin starting
    FeatureStep {
        /// 1-based spin index
        spin_index: u32,
        spins_remaining: u32,
        current_multiplier: f64,
    },

    /// Extra spins appended mid-feature
    FeatureRetrigger {
        additional_spins: u32,
        new_total: u32,
    },

    /// Feature settled
    FeatureExit { total_win: f64 },

    // ═══════════════════════════════════════════════════════════════════════
    // SIDE-EFFECT CALLS (fire-and-forget collaborators)
    // ═══════════════════════════════════════════════════════════════════════
    /// Play a sound; no feedback to the engine
    PlaySound { cue: SoundCue },

    /// Animate a symbol at a grid position; no feedback to the engine
    PlaySymbolAnimation {
        reel_index: u8,
        row: u8,
        cue: AnimationCue,
    },

    /// Push an amount into a host text field
    ShowAmount { field: AmountField, value: f64 },
}

impl Directive {
    /// Stable type name, mirrors the serde tag
    pub fn type_name(&self) -> &'static str {
        match self {
            Directive::SpinStart => "spin_start",
            Directive::ReelSpinning { .. } => "reel_spinning",
            Directive::PresentSymbols { .. } => "present_symbols",
            Directive::AllReelsStopped => "all_reels_stopped",
            Directive::SpinEnd => "spin_end",
            Directive::AnticipationOn { .. } => "anticipation_on",
            Directive::AnticipationOff { .. } => "anticipation_off",
            Directive::WinPresent { .. } => "win_present",
            Directive::RollupStart { .. } => "rollup_start",
            Directive::RollupTick { .. } => "rollup_tick",
            Directive::RollupEnd { .. } => "rollup_end",
            Directive::FeatureEnter { .. } => "feature_enter",
            Directive::FeatureStep { .. } => "feature_step",
            Directive::FeatureRetrigger { .. } => "feature_retrigger",
            Directive::FeatureExit { .. } => "feature_exit",
            Directive::PlaySound { .. } => "play_sound",
            Directive::PlaySymbolAnimation { .. } => "play_symbol_animation",
            Directive::ShowAmount { .. } => "show_amount",
        }
    }
}

/// A directive with its emission time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveEvent {
    /// The directive
    pub directive: Directive,
    /// Milliseconds on the session clock
    pub timestamp_ms: f64,
}

impl DirectiveEvent {
    /// Create a new directive event
    pub fn new(directive: Directive, timestamp_ms: f64) -> Self {
        Self {
            directive,
            timestamp_ms,
        }
    }

    /// Type name of the wrapped directive
    pub fn type_name(&self) -> &'static str {
        self.directive.type_name()
    }
}

/// Sort a directive batch into emission order (stable on equal timestamps)
pub fn sort_by_timestamp(events: &mut [DirectiveEvent]) {
    events.sort_by(|a, b| {
        a.timestamp_ms
            .partial_cmp(&b.timestamp_ms)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
