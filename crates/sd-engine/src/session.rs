//! Game session driver
//!
//! The host-facing surface. A [`GameSession`] owns one of everything
//! (scheduler, evaluator, orchestrator, ledger, outcome plumbing), wires
//! them together by construction, and exposes three entry points: `spin`,
//! `request_stop` and `tick`. The host calls `tick` once per frame and
//! renders the directives that come back; nothing in here blocks.

use serde::{Deserialize, Serialize};

use sd_stage::{
    sort_by_timestamp, AmountField, AnimationCue, Directive, DirectiveEvent, SoundCue, SpinMode,
    SymbolKind,
};

use crate::config::{EngineConfig, GameSpeed, PlayMode};
use crate::error::{OutcomeError, SpinError, StateMisuse};
use crate::freespins::{FeatureCommand, FreeSpinOrchestrator};
use crate::ledger::{BalancePush, BetLedger};
use crate::outcome::{LocalOutcomes, OutcomePoll, OutcomeSource, ServerOutcome};
use crate::reel::SpinSession;
use crate::scheduler::ReelStopScheduler;
use crate::symbols::SymbolRegistry;
use crate::wineval::{WinEvaluator, WinResult};

/// Running aggregates over one session, for diagnostics and tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub spins: u64,
    pub winning_spins: u64,
    pub total_bet: f64,
    pub total_won: f64,
    pub feature_triggers: u64,
}

impl SessionStats {
    fn record_spin(&mut self, bet: f64, won: f64) {
        self.spins += 1;
        self.total_bet += bet;
        self.total_won += won;
        if won > 0.0 {
            self.winning_spins += 1;
        }
    }

    /// Return-to-player over the session so far
    pub fn rtp(&self) -> f64 {
        if self.total_bet <= 0.0 {
            return 0.0;
        }
        self.total_won / self.total_bet
    }

    pub fn hit_rate(&self) -> f64 {
        if self.spins == 0 {
            return 0.0;
        }
        self.winning_spins as f64 / self.spins as f64
    }
}

/// One player session over the engine.
pub struct GameSession {
    config: EngineConfig,
    scheduler: ReelStopScheduler,
    evaluator: WinEvaluator,
    orchestrator: FreeSpinOrchestrator,
    ledger: BetLedger,
    local: LocalOutcomes,
    source: Option<Box<dyn OutcomeSource>>,
    spin: Option<SpinSession>,
    /// Host feedback queued for the next tick (e.g. a denied stop)
    queued: Vec<DirectiveEvent>,
    /// Settlement payload for the spin in flight (live, authoritative)
    authoritative: Option<ServerOutcome>,
    last_result: Option<WinResult>,
    stats: SessionStats,
}

impl GameSession {
    /// Demo session: local outcomes, locally authoritative balance.
    pub fn demo(config: EngineConfig) -> Self {
        Self::build(config, None)
    }

    /// Live session over an external settlement source.
    pub fn live(config: EngineConfig, source: Box<dyn OutcomeSource>) -> Self {
        Self::build(config, Some(source))
    }

    fn build(mut config: EngineConfig, source: Option<Box<dyn OutcomeSource>>) -> Self {
        config.repair();
        let registry = SymbolRegistry::standard();
        Self {
            scheduler: ReelStopScheduler::new(config.timing.clone(), config.mode),
            evaluator: WinEvaluator::new(registry.clone()),
            orchestrator: FreeSpinOrchestrator::new(config.free_spins.clone()),
            ledger: BetLedger::new(config.ledger.clone(), config.mode),
            local: LocalOutcomes::new(registry),
            source,
            spin: None,
            queued: Vec::new(),
            authoritative: None,
            last_result: None,
            stats: SessionStats::default(),
            config,
        }
    }

    /// Fix the local RNG seed (replay and tests).
    pub fn seed(&mut self, seed: u64) {
        self.local.reseed(seed);
    }

    pub fn mode(&self) -> PlayMode {
        self.config.mode
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn ledger(&self) -> &BetLedger {
        &self.ledger
    }

    /// Settlement-channel handle for confirmed balance pushes.
    pub fn balance_push(&self) -> BalancePush {
        self.ledger.balance_push()
    }

    pub fn last_result(&self) -> Option<&WinResult> {
        self.last_result.as_ref()
    }

    pub fn spin_in_flight(&self) -> bool {
        self.spin.is_some()
    }

    pub fn feature_active(&self) -> bool {
        self.orchestrator.is_active()
    }

    /// Switch the timing profile. Takes effect from the next spin.
    pub fn set_speed(&mut self, speed: GameSpeed) {
        self.config.timing = crate::config::TimingConfig::for_speed(speed);
        self.scheduler.set_timing(self.config.timing.clone());
    }

    /// Confirmed balance from the settlement channel. Parks mid-rollup,
    /// applies immediately otherwise; ignored in demo mode.
    pub fn set_balance(&mut self, value: f64, now_ms: f64) -> Vec<DirectiveEvent> {
        self.ledger.set_balance(value, now_ms)
    }

    /// Change the bet. Rejected while reels are in motion.
    pub fn set_bet_index(
        &mut self,
        index: usize,
        now_ms: f64,
    ) -> Result<Vec<DirectiveEvent>, StateMisuse> {
        if self.spin.is_some() {
            return Err(StateMisuse::BetChangeWhileSpinning);
        }
        Ok(self.ledger.set_bet_index(index, now_ms))
    }

    /// Player-initiated base-game spin.
    pub fn spin(&mut self, now_ms: f64) -> Result<Vec<DirectiveEvent>, SpinError> {
        if self.spin.is_some() || self.ledger.rollup_active() {
            return Err(StateMisuse::SpinInFlight.into());
        }
        if self.orchestrator.is_active() {
            return Err(StateMisuse::SpinDuringFeature(SpinMode::FreeSpin).into());
        }
        if !self.ledger.can_place_bet() {
            return Err(SpinError::InsufficientBalance);
        }

        let mut events = self.ledger.deduct_bet(now_ms);
        events.extend(self.launch(SpinMode::Base, now_ms));
        Ok(events)
    }

    /// Player-initiated "stop all reels". A rejection inside the lockout
    /// window queues the denial cue for the next tick.
    pub fn request_stop(&mut self, now_ms: f64) -> Result<(), StateMisuse> {
        let Some(spin) = self.spin.as_mut() else {
            return Err(StateMisuse::StopWithoutSpin);
        };
        let result = self.scheduler.request_stop(spin, now_ms);
        if matches!(result, Err(StateMisuse::StopLockedOut)) {
            self.queued.push(DirectiveEvent::new(
                Directive::PlaySound {
                    cue: SoundCue::StopDenied,
                },
                now_ms,
            ));
        }
        result
    }

    /// Advance the whole session one tick. Returns directives in timestamp
    /// order for the host to render.
    pub fn tick(&mut self, now_ms: f64) -> Vec<DirectiveEvent> {
        let mut events = std::mem::take(&mut self.queued);

        if self.spin.is_some() {
            self.poll_outcome(now_ms);
            if let Some(spin) = self.spin.as_mut() {
                events.extend(self.scheduler.tick(spin, now_ms));
                if spin.all_stopped() {
                    events.extend(self.finalize_spin(now_ms));
                }
            }
        }

        events.extend(self.ledger.tick(now_ms));

        // Feature sequencing: strictly one thing at a time. The next
        // feature step waits for reels and rollup both to be done.
        if self.spin.is_none() && !self.ledger.rollup_active() && self.orchestrator.is_active() {
            match self.orchestrator.tick(now_ms, &mut events) {
                Some(FeatureCommand::BeginSpin { .. }) => {
                    events.extend(self.launch(SpinMode::FreeSpin, now_ms));
                }
                Some(FeatureCommand::Settle { amount }) => {
                    self.stats.total_won += amount;
                    events.extend(self.ledger.add_win(amount, &self.config.timing, now_ms));
                    events.push(DirectiveEvent::new(
                        Directive::ShowAmount {
                            field: AmountField::FeatureTotal,
                            value: amount,
                        },
                        now_ms,
                    ));
                }
                None => {}
            }
        }

        sort_by_timestamp(&mut events);
        events
    }

    /// Begin a spin of either kind: commit or request the outcome, then
    /// hand the reels to the scheduler.
    fn launch(&mut self, mode: SpinMode, now_ms: f64) -> Vec<DirectiveEvent> {
        let bet = self.ledger.current_bet();
        let mut session = SpinSession::new(mode, bet, now_ms);
        self.authoritative = None;

        let mut events = vec![
            DirectiveEvent::new(Directive::SpinStart, now_ms),
            DirectiveEvent::new(
                Directive::PlaySound {
                    cue: SoundCue::SpinStart,
                },
                now_ms,
            ),
        ];

        match self.source.as_mut() {
            Some(source) if self.config.mode.is_live() => {
                source.request(bet, mode, now_ms);
            }
            _ => {
                let grid = self.local.draw_grid(mode);
                self.scheduler.commit_outcome(&mut session, grid);
            }
        }

        events.extend(self.scheduler.begin_spin(&mut session, now_ms));
        self.spin = Some(session);
        events
    }

    /// Drive the live gate: deliver a settlement payload when it arrives,
    /// or fall back to local symbols on failure or timeout.
    fn poll_outcome(&mut self, now_ms: f64) {
        if !self.scheduler.awaiting_outcome() {
            return;
        }
        let Some(spin) = self.spin.as_mut() else {
            return;
        };

        if let Some(source) = self.source.as_mut() {
            match source.poll(now_ms) {
                OutcomePoll::Pending => {}
                OutcomePoll::Ready(outcome) => {
                    self.scheduler.commit_outcome(spin, outcome.grid);
                    self.authoritative = Some(outcome);
                    return;
                }
                OutcomePoll::Failed(err) => {
                    log::warn!("settlement request failed, using local symbols: {err}");
                    let grid = self.local.draw_grid(spin.mode);
                    self.scheduler.commit_outcome(spin, grid);
                    return;
                }
            }
        }

        if self.scheduler.outcome_timed_out(now_ms) {
            let err = OutcomeError::Timeout {
                waited_ms: self.scheduler.awaiting_elapsed_ms(now_ms),
            };
            log::warn!("using local symbols: {err}");
            let grid = self.local.draw_grid(spin.mode);
            self.scheduler.commit_outcome(spin, grid);
        }
    }

    /// All reels are down: evaluate, present, and route the result to the
    /// ledger or the feature orchestrator.
    fn finalize_spin(&mut self, now_ms: f64) -> Vec<DirectiveEvent> {
        let Some(spin) = self.spin.take() else {
            return Vec::new();
        };
        let mut events = Vec::new();

        let grid = spin.grid();

        // Authoritative mode: convert the settlement win list verbatim, no
        // local payout math. Local mode covers demo and the fallback path.
        let result = match self.authoritative.take() {
            Some(outcome) => {
                WinResult::from_authoritative(&outcome.win_lines, outcome.scatter_triggered)
            }
            None => self.evaluator.evaluate(&grid, spin.bet),
        };

        let scatter_count = (0..crate::reel::REEL_COUNT)
            .map(|r| grid.count_on_reel(r, SymbolKind::Scatter) as u8)
            .sum::<u8>();

        events.push(DirectiveEvent::new(Directive::SpinEnd, now_ms));

        match spin.mode {
            SpinMode::Base => {
                self.stats.record_spin(spin.bet, result.total);
                if result.is_win() {
                    events.push(DirectiveEvent::new(
                        Directive::WinPresent {
                            win_amount: result.total,
                            combination_count: result.combinations.len() as u8,
                        },
                        now_ms,
                    ));
                    events.push(DirectiveEvent::new(
                        Directive::PlaySound {
                            cue: SoundCue::WinPresent,
                        },
                        now_ms,
                    ));
                    events.extend(Self::win_animations(&result, &grid, now_ms));
                    events.extend(self.ledger.add_win(result.total, &self.config.timing, now_ms));
                }
                if result.has_scatter_trigger {
                    self.stats.feature_triggers += 1;
                    events.extend(self.orchestrator.begin(
                        scatter_count,
                        self.config.mode,
                        &self.config.timing,
                        now_ms,
                    ));
                }
            }
            SpinMode::FreeSpin => {
                self.stats.record_spin(0.0, 0.0);
                let multiplier = self.orchestrator.state().multiplier;
                if result.is_win() {
                    events.push(DirectiveEvent::new(
                        Directive::WinPresent {
                            win_amount: result.total * multiplier,
                            combination_count: result.combinations.len() as u8,
                        },
                        now_ms,
                    ));
                    events.extend(Self::win_animations(&result, &grid, now_ms));
                }
                events.extend(self.orchestrator.on_spin_evaluated(
                    result.total,
                    result.has_scatter_trigger,
                    &self.config.timing,
                    now_ms,
                ));
                events.push(DirectiveEvent::new(
                    Directive::ShowAmount {
                        field: AmountField::FeatureTotal,
                        value: self.orchestrator.state().accumulated_win,
                    },
                    now_ms,
                ));
            }
        }

        self.last_result = Some(result);
        events
    }

    /// Symbol animations for a winning grid: the anchor cell of each
    /// combination pulses, plus every wild that took part in one.
    fn win_animations(
        result: &WinResult,
        grid: &crate::reel::GridSnapshot,
        now_ms: f64,
    ) -> Vec<DirectiveEvent> {
        let mut events = Vec::new();
        for combo in &result.combinations {
            let (reel, row) = combo.display_position;
            events.push(DirectiveEvent::new(
                Directive::PlaySymbolAnimation {
                    reel_index: reel,
                    row,
                    cue: AnimationCue::SymbolWin,
                },
                now_ms,
            ));
        }
        if result.combinations.iter().any(|c| c.involved_wild) {
            for (reel, row) in grid.positions_of(SymbolKind::Wild) {
                events.push(DirectiveEvent::new(
                    Directive::PlaySymbolAnimation {
                        reel_index: reel,
                        row,
                        cue: AnimationCue::WildPulse,
                    },
                    now_ms,
                ));
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OutcomeError;
    use crate::outcome::{OutcomeGrid, ServerWinLine};
    use sd_stage::SymbolKind;

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn filler_grid() -> OutcomeGrid {
        [[SymbolKind::Ten, SymbolKind::Jack, SymbolKind::Queen]; 5]
    }

    /// Scripted settlement source for live-mode tests.
    struct Scripted {
        /// (delay_ms, payload); None means the request fails
        responses: Vec<(f64, Option<ServerOutcome>)>,
        requested_at: Option<f64>,
        index: usize,
    }

    impl Scripted {
        fn new(responses: Vec<(f64, Option<ServerOutcome>)>) -> Self {
            Self {
                responses,
                requested_at: None,
                index: 0,
            }
        }
    }

    impl OutcomeSource for Scripted {
        fn request(&mut self, _bet: f64, _mode: SpinMode, now_ms: f64) {
            self.requested_at = Some(now_ms);
        }

        fn poll(&mut self, now_ms: f64) -> OutcomePoll {
            let Some(at) = self.requested_at else {
                return OutcomePoll::Pending;
            };
            let Some((delay, payload)) = self.responses.get(self.index) else {
                return OutcomePoll::Pending;
            };
            if now_ms - at < *delay {
                return OutcomePoll::Pending;
            }
            self.requested_at = None;
            self.index += 1;
            match payload {
                Some(outcome) => OutcomePoll::Ready(outcome.clone()),
                None => OutcomePoll::Failed(OutcomeError::Transport("scripted".into())),
            }
        }
    }

    fn drive(session: &mut GameSession, now: &mut f64, until: f64) -> Vec<DirectiveEvent> {
        let mut events = Vec::new();
        while *now < until {
            *now += 50.0;
            events.extend(session.tick(*now));
        }
        events
    }

    /// Run until the session is fully idle (no spin, no rollup, no feature).
    fn settle(session: &mut GameSession, now: &mut f64) -> Vec<DirectiveEvent> {
        let mut events = Vec::new();
        let deadline = *now + 300_000.0;
        while session.spin_in_flight()
            || session.ledger().rollup_active()
            || session.feature_active()
        {
            *now += 50.0;
            events.extend(session.tick(*now));
            assert!(*now < deadline, "session never went idle");
        }
        events
    }

    #[test]
    fn test_demo_losing_spin_debits_bet() {
        let mut session = GameSession::demo(EngineConfig::demo());
        session.seed(3);
        session.set_bet_index(3, 0.0).unwrap(); // 1.25
        let mut now = 0.0;

        // Find a seed state that loses: spin until a zero-win result
        loop {
            let before = session.ledger().balance();
            session.spin(now).unwrap();
            settle(&mut session, &mut now);
            let result = session.last_result().unwrap();
            if !result.is_win() && !result.has_scatter_trigger {
                assert_eq!(session.ledger().balance(), before - 1.25);
                return;
            }
            now += 1000.0;
        }
    }

    #[test]
    fn test_spin_rejected_while_in_flight() {
        let mut session = GameSession::demo(EngineConfig::demo());
        session.spin(0.0).unwrap();
        assert!(matches!(
            session.spin(100.0),
            Err(SpinError::Misuse(StateMisuse::SpinInFlight))
        ));
    }

    #[test]
    fn test_bet_change_rejected_mid_spin() {
        let mut session = GameSession::demo(EngineConfig::demo());
        session.spin(0.0).unwrap();
        assert!(matches!(
            session.set_bet_index(0, 100.0),
            Err(StateMisuse::BetChangeWhileSpinning)
        ));
    }

    #[test]
    fn test_insufficient_balance_rejected() {
        let mut config = EngineConfig::demo();
        config.ledger.demo_balance = 0.10;
        let mut session = GameSession::demo(config);
        assert!(matches!(
            session.spin(0.0),
            Err(SpinError::InsufficientBalance)
        ));
    }

    #[test]
    fn test_live_authoritative_win_list_is_used_verbatim() {
        let outcome = ServerOutcome {
            grid: filler_grid(),
            win_lines: vec![ServerWinLine {
                symbol: SymbolKind::MaskC,
                matched_reels: 4,
                involved_wild: false,
                win_amount: 37.5,
                position: (0, 0),
            }],
            total_win: 37.5,
            scatter_triggered: false,
        };
        let mut session = GameSession::live(
            EngineConfig::live(),
            Box::new(Scripted::new(vec![(200.0, Some(outcome))])),
        );
        session.set_balance(500.0, 0.0);

        let mut now = 0.0;
        session.spin(now).unwrap();
        settle(&mut session, &mut now);

        // Local evaluation of this grid would pay differently; the total
        // must come from the settlement win list verbatim
        let result = session.last_result().unwrap();
        assert_eq!(result.total, 37.5);
        assert_eq!(result.combinations.len(), 1);
        assert_eq!(result.combinations[0].symbol, SymbolKind::MaskC);
    }

    #[test]
    fn test_win_present_carries_combination_count() {
        let outcome = ServerOutcome {
            grid: filler_grid(),
            win_lines: vec![
                ServerWinLine {
                    symbol: SymbolKind::MaskA,
                    matched_reels: 3,
                    involved_wild: false,
                    win_amount: 25.0,
                    position: (0, 0),
                },
                ServerWinLine {
                    symbol: SymbolKind::King,
                    matched_reels: 3,
                    involved_wild: false,
                    win_amount: 10.0,
                    position: (0, 1),
                },
            ],
            total_win: 35.0,
            scatter_triggered: false,
        };
        let mut session = GameSession::live(
            EngineConfig::live(),
            Box::new(Scripted::new(vec![(200.0, Some(outcome))])),
        );
        session.set_balance(500.0, 0.0);

        let mut now = 0.0;
        session.spin(now).unwrap();
        let events = settle(&mut session, &mut now);

        let present = events
            .iter()
            .find_map(|e| match e.directive {
                Directive::WinPresent {
                    win_amount,
                    combination_count,
                } => Some((win_amount, combination_count)),
                _ => None,
            })
            .expect("winning spin must present");
        assert_eq!(present, (35.0, 2u8));
    }

    #[test]
    fn test_live_timeout_falls_back_to_local_symbols() {
        init_logs();
        // A source that never answers
        let mut session = GameSession::live(
            EngineConfig::live(),
            Box::new(Scripted::new(vec![(f64::INFINITY, None)])),
        );
        session.seed(11);
        session.set_balance(100.0, 0.0);

        let mut now = 0.0;
        session.spin(now).unwrap();
        // Within the timeout nothing lands
        drive(&mut session, &mut now, 4000.0);
        assert!(session.spin_in_flight());

        settle(&mut session, &mut now);
        assert!(session.last_result().is_some());
    }

    #[test]
    fn test_scatter_trigger_runs_full_feature_and_settles() {
        let scatter_grid: OutcomeGrid = {
            let mut g = filler_grid();
            g[2][0] = SymbolKind::Scatter;
            g[3][1] = SymbolKind::Scatter;
            g[4][2] = SymbolKind::Scatter;
            g
        };
        // First spin triggers; every later request gets a dead grid
        let mut responses = vec![(
            100.0,
            Some(ServerOutcome {
                grid: scatter_grid,
                win_lines: Vec::new(),
                total_win: 0.0,
                scatter_triggered: true,
            }),
        )];
        for _ in 0..12 {
            responses.push((
                100.0,
                Some(ServerOutcome {
                    grid: filler_grid(),
                    win_lines: Vec::new(),
                    total_win: 0.0,
                    scatter_triggered: false,
                }),
            ));
        }
        let mut session =
            GameSession::live(EngineConfig::live(), Box::new(Scripted::new(responses)));
        session.set_balance(1000.0, 0.0);

        let mut now = 0.0;
        session.spin(now).unwrap();
        let events = settle(&mut session, &mut now);

        assert!(events
            .iter()
            .any(|e| matches!(e.directive, Directive::FeatureEnter { total_spins: 5, .. })));
        let steps: Vec<u32> = events
            .iter()
            .filter_map(|e| match e.directive {
                Directive::FeatureStep { spin_index, .. } => Some(spin_index),
                _ => None,
            })
            .collect();
        assert_eq!(steps, vec![1, 2, 3, 4, 5]);
        assert!(events
            .iter()
            .any(|e| matches!(e.directive, Directive::FeatureExit { .. })));
        assert!(!session.feature_active());
        assert_eq!(session.stats().feature_triggers, 1);
    }

    #[test]
    fn test_spin_rejected_during_feature() {
        let scatter_grid: OutcomeGrid = {
            let mut g = filler_grid();
            g[2][0] = SymbolKind::Scatter;
            g[3][1] = SymbolKind::Scatter;
            g[4][2] = SymbolKind::Scatter;
            g
        };
        let mut session = GameSession::live(
            EngineConfig::live(),
            Box::new(Scripted::new(vec![(
                100.0,
                Some(ServerOutcome {
                    grid: scatter_grid,
                    win_lines: Vec::new(),
                    total_win: 0.0,
                    scatter_triggered: true,
                }),
            )])),
        );
        session.set_balance(1000.0, 0.0);

        let mut now = 0.0;
        session.spin(now).unwrap();
        // Let the trigger land and the feature start
        drive(&mut session, &mut now, 20_000.0);
        assert!(session.feature_active());
        assert!(matches!(
            session.spin(now),
            Err(SpinError::Misuse(_))
        ));
    }

    #[test]
    fn test_stats_accumulate_over_spins() {
        let mut session = GameSession::demo(EngineConfig::demo());
        session.seed(99);
        let mut now = 0.0;
        for _ in 0..5 {
            if session.feature_active() {
                break;
            }
            session.spin(now).unwrap();
            settle(&mut session, &mut now);
            now += 500.0;
        }
        assert!(session.stats().spins >= 5 || session.stats().feature_triggers > 0);
        assert!(session.stats().total_bet > 0.0);
        assert!(session.stats().rtp() >= 0.0);
        assert!(session.stats().hit_rate() <= 1.0);
    }

    #[test]
    fn test_manual_stop_flows_through() {
        let mut session = GameSession::demo(EngineConfig::demo());
        let mut now = 0.0;
        session.spin(now).unwrap();

        // Inside the lockout window
        now = 500.0;
        assert!(matches!(
            session.request_stop(now),
            Err(StateMisuse::StopLockedOut)
        ));
        let next = session.tick(now + 50.0);
        assert!(next.iter().any(|e| matches!(
            e.directive,
            Directive::PlaySound {
                cue: SoundCue::StopDenied
            }
        )));

        // After the spin finishes a stop request has nothing to stop
        settle(&mut session, &mut now);
        assert!(matches!(
            session.request_stop(now),
            Err(StateMisuse::StopWithoutSpin)
        ));
    }
}
