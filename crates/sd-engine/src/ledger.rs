//! Bet and balance ledger
//!
//! Demo balances are locally authoritative; live balances only ever
//! reflect values confirmed by the settlement channel. The win rollup is
//! the counting animation between "win known" and "balance updated", and
//! [`BalancePush`] is the single cross-boundary mutation point: settlement
//! pushes land there and are applied exactly once, at rollup end, with the
//! last pushed value winning.

use std::sync::Arc;

use parking_lot::Mutex;

use sd_stage::{AmountField, Directive, DirectiveEvent, SoundCue};

use crate::config::{LedgerConfig, PlayMode, TimingConfig};

/// Cloneable handle the settlement channel uses to push confirmed
/// balances. Writes overwrite; the ledger drains it once per rollup.
#[derive(Debug, Clone, Default)]
pub struct BalancePush {
    cell: Arc<Mutex<Option<f64>>>,
}

impl BalancePush {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a confirmed balance. A later push before the ledger drains
    /// replaces this one.
    pub fn push(&self, balance: f64) {
        *self.cell.lock() = Some(balance);
    }

    pub fn is_pending(&self) -> bool {
        self.cell.lock().is_some()
    }

    fn take(&self) -> Option<f64> {
        self.cell.lock().take()
    }
}

/// An in-flight win-counting animation.
#[derive(Debug, Clone, Copy)]
struct Rollup {
    target: f64,
    started_ms: f64,
    duration_ms: f64,
}

/// Player-facing money state for one session.
#[derive(Debug)]
pub struct BetLedger {
    config: LedgerConfig,
    mode: PlayMode,
    balance: f64,
    current_bet_index: usize,
    rollup: Option<Rollup>,
    pending: BalancePush,
}

impl BetLedger {
    pub fn new(mut config: LedgerConfig, mode: PlayMode) -> Self {
        if let Some(err) = config.repair() {
            log::warn!("ledger config repaired: {err}");
        }
        let balance = match mode {
            PlayMode::Demo => config.demo_balance,
            // Live starts at zero until the first confirmed push
            PlayMode::Live => 0.0,
        };
        let current_bet_index = config.default_bet_index.min(config.bet_table.len() - 1);
        Self {
            config,
            mode,
            balance,
            current_bet_index,
            rollup: None,
            pending: BalancePush::new(),
        }
    }

    /// Handle for the settlement channel. Clones share the same cell.
    pub fn balance_push(&self) -> BalancePush {
        self.pending.clone()
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn current_bet(&self) -> f64 {
        self.config.bet_table[self.current_bet_index]
    }

    pub fn current_bet_index(&self) -> usize {
        self.current_bet_index
    }

    pub fn bet_table(&self) -> &[f64] {
        &self.config.bet_table
    }

    pub fn rollup_active(&self) -> bool {
        self.rollup.is_some()
    }

    pub fn can_place_bet(&self) -> bool {
        self.balance >= self.current_bet()
    }

    /// Clamp into the bet table. Guarding against mid-spin changes is the
    /// session's job; the ledger only keeps the index valid.
    pub fn set_bet_index(&mut self, index: usize, now_ms: f64) -> Vec<DirectiveEvent> {
        self.current_bet_index = index.min(self.config.bet_table.len() - 1);
        vec![DirectiveEvent::new(
            Directive::ShowAmount {
                field: AmountField::Bet,
                value: self.current_bet(),
            },
            now_ms,
        )]
    }

    /// Debit the current bet. Demo only; live debits are settled
    /// externally and arrive as confirmed balance pushes.
    pub fn deduct_bet(&mut self, now_ms: f64) -> Vec<DirectiveEvent> {
        if self.mode.is_live() {
            return Vec::new();
        }
        let bet = self.current_bet();
        if self.balance < bet {
            // can_place_bet gates this at the call site
            log::warn!("bet deduction skipped, balance {:.2} below bet {bet:.2}", self.balance);
            return Vec::new();
        }
        self.balance -= bet;
        vec![DirectiveEvent::new(
            Directive::ShowAmount {
                field: AmountField::Balance,
                value: self.balance,
            },
            now_ms,
        )]
    }

    /// Confirmed balance from the settlement channel.
    ///
    /// Mid-rollup the value parks in the pending cell so the visible
    /// balance never jumps ahead of the counter. Demo mode ignores pushes;
    /// the demo balance is locally authoritative.
    pub fn set_balance(&mut self, value: f64, now_ms: f64) -> Vec<DirectiveEvent> {
        if !self.mode.is_live() {
            log::debug!("balance push ignored in demo mode");
            return Vec::new();
        }
        if self.rollup.is_some() {
            self.pending.push(value);
            return Vec::new();
        }
        self.balance = value;
        vec![DirectiveEvent::new(
            Directive::ShowAmount {
                field: AmountField::Balance,
                value: self.balance,
            },
            now_ms,
        )]
    }

    /// Start the win-counting animation from 0 up to `amount`. The credit
    /// itself lands when the animation completes.
    pub fn add_win(
        &mut self,
        amount: f64,
        timing: &TimingConfig,
        now_ms: f64,
    ) -> Vec<DirectiveEvent> {
        if amount <= 0.0 {
            return Vec::new();
        }
        if let Some(rollup) = self.rollup {
            // Should not happen under the session's sequencing
            log::warn!(
                "rollup to {:.2} replaced by new win of {amount:.2}",
                rollup.target
            );
        }
        self.rollup = Some(Rollup {
            target: amount,
            started_ms: now_ms,
            duration_ms: timing.rollup_duration_ms(amount),
        });
        vec![
            DirectiveEvent::new(
                Directive::RollupStart {
                    target_amount: amount,
                },
                now_ms,
            ),
            DirectiveEvent::new(
                Directive::PlaySound {
                    cue: SoundCue::RollupLoop,
                },
                now_ms,
            ),
        ]
    }

    /// Advance the rollup. Emits interpolation ticks while counting and,
    /// on completion, credits the win (demo) or applies the last pending
    /// push (live), exactly once.
    pub fn tick(&mut self, now_ms: f64) -> Vec<DirectiveEvent> {
        let Some(rollup) = self.rollup else {
            return Vec::new();
        };

        let progress = if rollup.duration_ms <= 0.0 {
            1.0
        } else {
            ((now_ms - rollup.started_ms) / rollup.duration_ms).clamp(0.0, 1.0)
        };

        if progress < 1.0 {
            let current = rollup.target * progress;
            return vec![
                DirectiveEvent::new(
                    Directive::RollupTick { current_amount: current, progress },
                    now_ms,
                ),
                DirectiveEvent::new(
                    Directive::ShowAmount {
                        field: AmountField::Win,
                        value: current,
                    },
                    now_ms,
                ),
            ];
        }

        self.rollup = None;
        match self.mode {
            PlayMode::Demo => self.balance += rollup.target,
            PlayMode::Live => {
                if let Some(confirmed) = self.pending.take() {
                    self.balance = confirmed;
                }
            }
        }

        vec![
            DirectiveEvent::new(
                Directive::RollupEnd {
                    final_amount: rollup.target,
                },
                now_ms,
            ),
            DirectiveEvent::new(
                Directive::PlaySound {
                    cue: SoundCue::RollupEnd,
                },
                now_ms,
            ),
            DirectiveEvent::new(
                Directive::ShowAmount {
                    field: AmountField::Balance,
                    value: self.balance,
                },
                now_ms,
            ),
        ]
    }
}
