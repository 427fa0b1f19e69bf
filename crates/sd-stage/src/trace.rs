//! DirectiveTrace — the full directive timeline of one game round
//!
//! Hosts record the events coming out of the engine tick loop into a
//! trace for replay, diagnostics and conformance checks.

use serde::{Deserialize, Serialize};

use crate::directive::{Directive, DirectiveEvent};

/// A complete trace of directives for one spin or session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveTrace {
    /// Unique identifier for this trace
    pub trace_id: String,

    /// Optional session identifier
    #[serde(default)]
    pub session_id: Option<String>,

    /// Round number within the session
    #[serde(default)]
    pub round: Option<u64>,

    /// All events in chronological order
    pub events: Vec<DirectiveEvent>,

    /// Custom metadata
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl DirectiveTrace {
    /// Create a new empty trace
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            session_id: None,
            round: None,
            events: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Add an event to the trace
    pub fn push(&mut self, event: DirectiveEvent) {
        self.events.push(event);
    }

    /// Append a whole tick's worth of events
    pub fn extend(&mut self, events: impl IntoIterator<Item = DirectiveEvent>) {
        self.events.extend(events);
    }

    /// Set session ID
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set round number
    pub fn with_round(mut self, round: u64) -> Self {
        self.round = Some(round);
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Total duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        let first = self.events.first().map(|e| e.timestamp_ms).unwrap_or(0.0);
        let last = self.events.last().map(|e| e.timestamp_ms).unwrap_or(0.0);
        last - first
    }

    /// Get events by directive type name
    pub fn events_by_type(&self, type_name: &str) -> Vec<&DirectiveEvent> {
        self.events
            .iter()
            .filter(|e| e.directive.type_name() == type_name)
            .collect()
    }

    /// Check if the trace contains a specific directive type
    pub fn has_directive(&self, type_name: &str) -> bool {
        self.events
            .iter()
            .any(|e| e.directive.type_name() == type_name)
    }

    /// All symbol-presentation events, in landing order
    pub fn reel_presents(&self) -> Vec<&DirectiveEvent> {
        self.events_by_type("present_symbols")
    }

    /// Last reported win amount, if the round won anything
    pub fn total_win(&self) -> f64 {
        for event in self.events.iter().rev() {
            match &event.directive {
                Directive::FeatureExit { total_win } => return *total_win,
                Directive::RollupEnd { final_amount } => return *final_amount,
                Directive::WinPresent { win_amount, .. } => return *win_amount,
                _ => continue,
            }
        }
        0.0
    }

    /// Did this round trigger the free-spin feature?
    pub fn has_feature(&self) -> bool {
        self.has_directive("feature_enter")
    }

    /// Structural checks a well-formed round trace must pass.
    pub fn validate(&self) -> TraceValidation {
        let anticipation_on = self.events_by_type("anticipation_on").len();
        let anticipation_off = self.events_by_type("anticipation_off").len();
        TraceValidation {
            has_spin_start: self.has_directive("spin_start"),
            has_all_reels_stopped: self.has_directive("all_reels_stopped"),
            reel_present_count: self.reel_presents().len(),
            anticipation_balanced: anticipation_on == anticipation_off,
        }
    }
}

/// Outcome of [`DirectiveTrace::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceValidation {
    pub has_spin_start: bool,
    pub has_all_reels_stopped: bool,
    pub reel_present_count: usize,
    pub anticipation_balanced: bool,
}

impl TraceValidation {
    pub fn is_valid(&self) -> bool {
        self.has_spin_start
            && self.has_all_reels_stopped
            && self.reel_present_count >= 5
            && self.anticipation_balanced
    }
}
