//! Free-spin feature orchestration
//!
//! A strictly sequential driver: spin i fully completes (including the
//! ledger's win rollup, which the session gates on) before spin i+1 may
//! begin. The multiplier doubles after each completed spin up to a cap,
//! at most one retrigger batch is applied per feature run, and settlement
//! pays the accumulated total scaled by a presentation multiplier.

use serde::{Deserialize, Serialize};

use sd_stage::{Directive, DirectiveEvent, SoundCue};

use crate::config::{FreeSpinConfig, PlayMode, TimingConfig};

/// Where the feature currently sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeaturePhase {
    Idle,
    /// Award banner showing; first spin starts at `spin_at_ms`
    Awarded { spin_at_ms: f64 },
    /// A feature spin is in flight on the scheduler
    Spinning,
    /// Between spins; next spin starts at `spin_at_ms`
    AwaitingNext { spin_at_ms: f64 },
    /// Final amount computed, waiting to be paid out
    Settling { amount: f64 },
}

/// Mutable feature-run state. Written only by [`FreeSpinOrchestrator`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FreeSpinState {
    pub total_awarded: u32,
    /// 1-based index of the spin in flight (0 before the first spin)
    pub current_spin_index: u32,
    pub multiplier: f64,
    pub accumulated_win: f64,
    pub retrigger_used: bool,
}

/// What the session should do as a result of a feature tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureCommand {
    /// Launch the next feature spin (index already advanced)
    BeginSpin { spin_index: u32 },
    /// Pay this amount into the ledger; the feature is over
    Settle { amount: f64 },
}

#[derive(Debug)]
pub struct FreeSpinOrchestrator {
    config: FreeSpinConfig,
    phase: FeaturePhase,
    state: FreeSpinState,
}

impl FreeSpinOrchestrator {
    pub fn new(config: FreeSpinConfig) -> Self {
        Self {
            config,
            phase: FeaturePhase::Idle,
            state: FreeSpinState::default(),
        }
    }

    pub fn phase(&self) -> FeaturePhase {
        self.phase
    }

    pub fn state(&self) -> &FreeSpinState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.phase != FeaturePhase::Idle
    }

    /// Enter the feature from a base-game scatter trigger.
    ///
    /// Awarded count is a fixed constant in live mode and derived from the
    /// scatter count in demo mode (same constant in current tuning). The
    /// first spin starts after the award banner delay.
    pub fn begin(
        &mut self,
        scatter_count: u8,
        mode: PlayMode,
        timing: &TimingConfig,
        now_ms: f64,
    ) -> Vec<DirectiveEvent> {
        if self.is_active() {
            log::warn!("feature trigger ignored, a feature run is already active");
            return Vec::new();
        }

        self.state = FreeSpinState {
            total_awarded: self.config.awarded_for(scatter_count, mode),
            current_spin_index: 0,
            multiplier: 1.0,
            accumulated_win: 0.0,
            retrigger_used: false,
        };
        self.phase = FeaturePhase::Awarded {
            spin_at_ms: now_ms + timing.award_display_ms,
        };
        log::info!(
            "feature entered: {} spins awarded",
            self.state.total_awarded
        );

        vec![
            DirectiveEvent::new(
                Directive::FeatureEnter {
                    total_spins: self.state.total_awarded,
                    multiplier: self.state.multiplier,
                },
                now_ms,
            ),
            DirectiveEvent::new(
                Directive::PlaySound {
                    cue: SoundCue::FeatureEnter,
                },
                now_ms,
            ),
        ]
    }

    /// Advance the feature clock. The session must only call this while no
    /// reel is spinning and no rollup is counting, which is what keeps
    /// feature spins strictly sequential.
    pub fn tick(
        &mut self,
        now_ms: f64,
        events: &mut Vec<DirectiveEvent>,
    ) -> Option<FeatureCommand> {
        match self.phase {
            FeaturePhase::Awarded { spin_at_ms } | FeaturePhase::AwaitingNext { spin_at_ms } => {
                if now_ms < spin_at_ms {
                    return None;
                }
                self.state.current_spin_index += 1;
                self.phase = FeaturePhase::Spinning;
                events.push(DirectiveEvent::new(
                    Directive::FeatureStep {
                        spin_index: self.state.current_spin_index,
                        spins_remaining: self
                            .state
                            .total_awarded
                            .saturating_sub(self.state.current_spin_index),
                        current_multiplier: self.state.multiplier,
                    },
                    now_ms,
                ));
                events.push(DirectiveEvent::new(
                    Directive::PlaySound {
                        cue: SoundCue::FeatureSpin,
                    },
                    now_ms,
                ));
                Some(FeatureCommand::BeginSpin {
                    spin_index: self.state.current_spin_index,
                })
            }
            FeaturePhase::Settling { amount } => {
                self.phase = FeaturePhase::Idle;
                events.push(DirectiveEvent::new(
                    Directive::FeatureExit { total_win: amount },
                    now_ms,
                ));
                events.push(DirectiveEvent::new(
                    Directive::PlaySound {
                        cue: SoundCue::FeatureExit,
                    },
                    now_ms,
                ));
                log::info!("feature settled for {amount:.2}");
                Some(FeatureCommand::Settle { amount })
            }
            FeaturePhase::Idle | FeaturePhase::Spinning => None,
        }
    }

    /// Record the evaluated result of the spin in flight.
    ///
    /// Applies the current multiplier to the spin win, handles at most one
    /// retrigger batch, then either schedules the next spin (doubling the
    /// multiplier, capped) or stages settlement at the presentation
    /// multiplier.
    pub fn on_spin_evaluated(
        &mut self,
        spin_win: f64,
        scatter_triggered: bool,
        timing: &TimingConfig,
        now_ms: f64,
    ) -> Vec<DirectiveEvent> {
        let mut events = Vec::new();
        if self.phase != FeaturePhase::Spinning {
            log::warn!("feature spin result with no feature spin in flight");
            return events;
        }

        self.state.accumulated_win += spin_win * self.state.multiplier;

        if scatter_triggered {
            self.apply_retrigger(now_ms, &mut events);
        }

        if self.state.current_spin_index < self.state.total_awarded {
            self.state.multiplier =
                (self.state.multiplier * 2.0).min(self.config.max_multiplier);
            self.phase = FeaturePhase::AwaitingNext {
                spin_at_ms: now_ms + timing.inter_spin_delay_ms,
            };
        } else {
            let amount = self.state.accumulated_win * self.config.presentation_multiplier;
            self.phase = FeaturePhase::Settling { amount };
        }
        events
    }

    /// One retrigger batch per feature run, clamped to the total-spin cap.
    fn apply_retrigger(&mut self, now_ms: f64, events: &mut Vec<DirectiveEvent>) {
        if self.state.retrigger_used {
            log::debug!("retrigger ignored, batch already used this run");
            return;
        }
        if self.state.total_awarded >= self.config.max_total_spins {
            log::debug!("retrigger ignored, total spins already at cap");
            return;
        }

        let additional = self
            .config
            .retrigger_spins
            .min(self.config.max_total_spins - self.state.total_awarded);
        self.state.total_awarded += additional;
        self.state.retrigger_used = true;

        events.push(DirectiveEvent::new(
            Directive::FeatureRetrigger {
                additional_spins: additional,
                new_total: self.state.total_awarded,
            },
            now_ms,
        ));
        events.push(DirectiveEvent::new(
            Directive::PlaySound {
                cue: SoundCue::FeatureRetrigger,
            },
            now_ms,
        ));
    }
}
