//! Reel stop scheduler
//!
//! Converts a committed outcome grid into a wall-clock schedule of stop
//! events, lengthening that schedule when an early scatter calls for
//! tension. The source game did this with interleaved coroutine timers;
//! here every "wait" is explicit per-reel state evaluated by one
//! [`tick`](ReelStopScheduler::tick).
//!
//! Invariants:
//! - a reel leaves `Spinning` only when its stop time is due AND no
//!   lower-index reel is tensioned;
//! - in live mode nothing leaves `Spinning` until the outcome is committed,
//!   subject to the hard timeout the session resolves;
//! - stopping always runs the minimum stopping sequence, even on manual stop.

use sd_stage::{AnimationCue, Directive, DirectiveEvent, SoundCue, SymbolKind};

use crate::config::{PlayMode, TimingConfig};
use crate::error::StateMisuse;
use crate::reel::{ReelPhase, SpinSession, REEL_COUNT, ROW_COUNT};

/// Per-session reel stop scheduler. Sole writer of [`crate::reel::ReelState`].
#[derive(Debug)]
pub struct ReelStopScheduler {
    timing: TimingConfig,
    mode: PlayMode,
    /// Live gate: no stop condition may pass until the outcome arrives
    awaiting_outcome: bool,
    awaiting_since_ms: f64,
    /// Stop button disabled for the rest of the spin (lockout violation)
    stop_control_disabled: bool,
    /// AllReelsStopped emitted for this spin
    all_stopped_reported: bool,
}

impl ReelStopScheduler {
    pub fn new(timing: TimingConfig, mode: PlayMode) -> Self {
        Self {
            timing,
            mode,
            awaiting_outcome: false,
            awaiting_since_ms: 0.0,
            stop_control_disabled: false,
            all_stopped_reported: false,
        }
    }

    /// Replace the timing profile (game speed change between spins)
    pub fn set_timing(&mut self, timing: TimingConfig) {
        self.timing = timing;
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Is the live gate up?
    pub fn awaiting_outcome(&self) -> bool {
        self.awaiting_outcome
    }

    /// Has the live gate exceeded its hard timeout?
    pub fn outcome_timed_out(&self, now_ms: f64) -> bool {
        self.awaiting_outcome && now_ms - self.awaiting_since_ms >= self.timing.live_timeout_ms
    }

    /// How long the live gate has been up
    pub fn awaiting_elapsed_ms(&self, now_ms: f64) -> f64 {
        if self.awaiting_outcome {
            now_ms - self.awaiting_since_ms
        } else {
            0.0
        }
    }

    /// Is the manual stop control disabled for this spin?
    pub fn stop_control_disabled(&self) -> bool {
        self.stop_control_disabled
    }

    /// Launch all reels. The initial stop time of reel i is
    /// `start + base_spin + cumulative delays[0..=i]`.
    ///
    /// If the outcome is already committed on the session (demo mode, or a
    /// cached live payload) tension reels are flagged immediately; otherwise
    /// the live gate goes up until [`commit_outcome`](Self::commit_outcome).
    pub fn begin_spin(
        &mut self,
        session: &mut SpinSession,
        now_ms: f64,
    ) -> Vec<DirectiveEvent> {
        let mut events = Vec::with_capacity(REEL_COUNT);
        self.all_stopped_reported = false;
        self.stop_control_disabled = false;

        for reel in session.reels.iter_mut() {
            reel.phase = ReelPhase::Spinning;
            reel.scheduled_stop_ms = now_ms + self.timing.stop_offset_ms(reel.index as usize);
            reel.stopping_since_ms = 0.0;
            reel.tension_until_ms = 0.0;
            reel.tension_pending = false;
            events.push(DirectiveEvent::new(
                Directive::ReelSpinning {
                    reel_index: reel.index,
                },
                now_ms,
            ));
        }

        if session.outcome_committed() {
            self.flag_tension_reels(session);
            self.awaiting_outcome = false;
        } else if self.mode.is_live() {
            self.awaiting_outcome = true;
            self.awaiting_since_ms = now_ms;
        }

        events
    }

    /// Commit the outcome grid for every reel and drop the live gate.
    pub fn commit_outcome(
        &mut self,
        session: &mut SpinSession,
        grid: [[SymbolKind; ROW_COUNT]; REEL_COUNT],
    ) {
        for (reel, column) in session.reels.iter_mut().zip(grid.iter()) {
            reel.pending_result = column.to_vec();
        }
        self.awaiting_outcome = false;
        self.flag_tension_reels(session);
    }

    /// Manual "stop all" request.
    ///
    /// Inside the lockout window the request is rejected and the stop
    /// control stays disabled until the spin finalizes. Afterwards every
    /// pending wait condition collapses to "now" — but each reel still runs
    /// the minimum stopping sequence, and the live gate still applies.
    pub fn request_stop(
        &mut self,
        session: &mut SpinSession,
        now_ms: f64,
    ) -> Result<(), StateMisuse> {
        if session.all_stopped() {
            log::warn!("stop requested with no reel in motion");
            return Err(StateMisuse::StopWithoutSpin);
        }
        if self.stop_control_disabled {
            return Err(StateMisuse::StopLockedOut);
        }
        if now_ms - session.started_ms < self.timing.stop_lockout_ms {
            log::warn!(
                "stop request {:.0}ms after spin start rejected (lockout {:.0}ms)",
                now_ms - session.started_ms,
                self.timing.stop_lockout_ms
            );
            self.stop_control_disabled = true;
            return Err(StateMisuse::StopLockedOut);
        }

        session.stop_requested_early = true;
        for reel in session.reels.iter_mut() {
            reel.tension_pending = false;
            match reel.phase {
                ReelPhase::Spinning => reel.scheduled_stop_ms = now_ms,
                ReelPhase::Tensioned => reel.tension_until_ms = now_ms,
                _ => {}
            }
        }
        Ok(())
    }

    /// Advance every reel one tick. Reels are checked in ascending index
    /// order; a higher reel can never land past a tensioned lower reel.
    pub fn tick(&mut self, session: &mut SpinSession, now_ms: f64) -> Vec<DirectiveEvent> {
        let mut events = Vec::new();

        // Live gate: while waiting for the settlement outcome, every stop
        // condition evaluates false. The session resolves the timeout by
        // committing a fallback outcome.
        if self.awaiting_outcome {
            return events;
        }

        for i in 0..REEL_COUNT {
            match session.reels[i].phase {
                ReelPhase::Spinning => {
                    if self.try_promote_tension(session, i, now_ms, &mut events) {
                        continue;
                    }
                    let due = now_ms >= session.reels[i].scheduled_stop_ms;
                    let lower_tensioned = session.reels[..i]
                        .iter()
                        .any(|r| r.phase == ReelPhase::Tensioned);
                    if due && !lower_tensioned {
                        let reel = &mut session.reels[i];
                        reel.phase = ReelPhase::Stopping;
                        reel.stopping_since_ms = now_ms;
                    }
                }
                ReelPhase::Tensioned => {
                    if now_ms >= session.reels[i].tension_until_ms {
                        let reel = &mut session.reels[i];
                        reel.phase = ReelPhase::Stopping;
                        reel.stopping_since_ms = now_ms;
                        events.push(DirectiveEvent::new(
                            Directive::AnticipationOff {
                                reel_index: reel.index,
                            },
                            now_ms,
                        ));
                        events.push(DirectiveEvent::new(
                            Directive::PlaySound {
                                cue: SoundCue::TensionEnd,
                            },
                            now_ms,
                        ));
                    }
                }
                ReelPhase::Stopping => {
                    if now_ms >= session.reels[i].stopping_since_ms + self.timing.stopping_ms {
                        events.extend(self.land_reel(session, i, now_ms));
                    }
                }
                ReelPhase::Idle | ReelPhase::Stopped => {}
            }
        }

        if session.all_stopped() && !self.all_stopped_reported {
            self.all_stopped_reported = true;
            self.stop_control_disabled = false;
            events.push(DirectiveEvent::new(Directive::AllReelsStopped, now_ms));
        }

        events
    }

    /// Flag reels whose committed symbols complete the tension pattern: a
    /// scatter on this reel with enough scatters already committed below it.
    fn flag_tension_reels(&self, session: &mut SpinSession) {
        let trigger = self.timing.tension_trigger_scatters as usize;
        for i in 1..REEL_COUNT {
            if !session.reels[i].commits_scatter() {
                continue;
            }
            let below = session.reels[..i]
                .iter()
                .filter(|r| r.commits_scatter())
                .count();
            if below >= trigger {
                session.reels[i].tension_pending = true;
            }
        }
    }

    /// Promote a flagged reel into tension once every lower reel has
    /// landed (the confirming scatters are now visible). Entering tension
    /// pushes the stop time of every higher reel out by the tension delay.
    fn try_promote_tension(
        &self,
        session: &mut SpinSession,
        i: usize,
        now_ms: f64,
        events: &mut Vec<DirectiveEvent>,
    ) -> bool {
        if !session.reels[i].tension_pending {
            return false;
        }
        if !session.reels[..i].iter().all(|r| r.phase.is_stopped()) {
            return false;
        }

        {
            let reel = &mut session.reels[i];
            reel.tension_pending = false;
            reel.phase = ReelPhase::Tensioned;
            reel.tension_until_ms = now_ms + self.timing.tension_hold_ms;
        }
        for higher in session.reels[i + 1..].iter_mut() {
            higher.scheduled_stop_ms += self.timing.tension_extra_ms;
        }

        events.push(DirectiveEvent::new(
            Directive::AnticipationOn {
                reel_index: session.reels[i].index,
                reason: Some("scatter".to_string()),
            },
            now_ms,
        ));
        events.push(DirectiveEvent::new(
            Directive::PlaySound {
                cue: SoundCue::TensionLoop,
            },
            now_ms,
        ));
        true
    }

    /// Finish a reel's stopping sequence: publish the committed symbols.
    fn land_reel(
        &self,
        session: &mut SpinSession,
        i: usize,
        now_ms: f64,
    ) -> Vec<DirectiveEvent> {
        let reel = &mut session.reels[i];
        debug_assert!(reel.has_outcome(), "reel landed without a committed outcome");
        for (row, &sym) in reel.pending_result.iter().take(ROW_COUNT).enumerate() {
            reel.visible[row] = sym;
        }
        reel.phase = ReelPhase::Stopped;

        let mut events = vec![
            DirectiveEvent::new(
                Directive::PresentSymbols {
                    reel_index: reel.index,
                    symbols: reel.visible.to_vec(),
                },
                now_ms,
            ),
            DirectiveEvent::new(
                Directive::PlaySound {
                    cue: SoundCue::ReelStop,
                },
                now_ms,
            ),
        ];
        if reel.commits_scatter() {
            events.push(DirectiveEvent::new(
                Directive::PlaySound {
                    cue: SoundCue::ScatterLand,
                },
                now_ms,
            ));
            for (row, &sym) in reel.visible.iter().enumerate() {
                if sym == SymbolKind::Scatter {
                    events.push(DirectiveEvent::new(
                        Directive::PlaySymbolAnimation {
                            reel_index: reel.index,
                            row: row as u8,
                            cue: AnimationCue::ScatterTease,
                        },
                        now_ms,
                    ));
                }
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_stage::SpinMode;

    fn grid_of(base: SymbolKind, scatter_reels: &[usize]) -> [[SymbolKind; 3]; 5] {
        let mut grid = [[base; 3]; 5];
        for &r in scatter_reels {
            grid[r][1] = SymbolKind::Scatter;
        }
        grid
    }

    fn demo_scheduler() -> ReelStopScheduler {
        ReelStopScheduler::new(TimingConfig::normal(), PlayMode::Demo)
    }

    /// Run ticks at a fixed cadence until all reels stop or time runs out.
    fn run_to_stop(
        scheduler: &mut ReelStopScheduler,
        session: &mut SpinSession,
        mut now: f64,
        limit_ms: f64,
    ) -> (Vec<DirectiveEvent>, f64) {
        let mut all = Vec::new();
        let deadline = now + limit_ms;
        while !session.all_stopped() && now < deadline {
            now += 50.0;
            all.extend(scheduler.tick(session, now));
        }
        (all, now)
    }

    fn start_spin(
        scheduler: &mut ReelStopScheduler,
        grid: [[SymbolKind; 3]; 5],
    ) -> SpinSession {
        let mut session = SpinSession::new(SpinMode::Base, 1.0, 0.0);
        scheduler.commit_outcome(&mut session, grid);
        scheduler.begin_spin(&mut session, 0.0);
        (0..5).for_each(|i| assert_eq!(session.reels[i].phase, ReelPhase::Spinning));
        session
    }

    #[test]
    fn test_stop_times_monotonic_without_tension() {
        let mut scheduler = demo_scheduler();
        let session = start_spin(&mut scheduler, grid_of(SymbolKind::Ten, &[]));
        for i in 1..REEL_COUNT {
            assert!(
                session.reels[i].scheduled_stop_ms >= session.reels[i - 1].scheduled_stop_ms,
                "reel {i} scheduled before reel {}",
                i - 1
            );
        }
    }

    #[test]
    fn test_reels_stop_in_order_and_present_symbols() {
        let mut scheduler = demo_scheduler();
        let mut session = start_spin(&mut scheduler, grid_of(SymbolKind::King, &[]));

        let (events, _) = run_to_stop(&mut scheduler, &mut session, 0.0, 10_000.0);
        assert!(session.all_stopped());

        let presented: Vec<u8> = events
            .iter()
            .filter_map(|e| match &e.directive {
                Directive::PresentSymbols { reel_index, .. } => Some(*reel_index),
                _ => None,
            })
            .collect();
        assert_eq!(presented, vec![0, 1, 2, 3, 4]);
        assert_eq!(session.grid().at(3, 0), SymbolKind::King);
        assert!(events
            .iter()
            .any(|e| matches!(e.directive, Directive::AllReelsStopped)));
    }

    #[test]
    fn test_tension_flagged_for_third_scatter_reel() {
        let mut scheduler = demo_scheduler();
        let session = start_spin(&mut scheduler, grid_of(SymbolKind::Ten, &[2, 3, 4]));
        assert!(!session.reels[2].tension_pending);
        assert!(!session.reels[3].tension_pending);
        assert!(session.reels[4].tension_pending);
    }

    #[test]
    fn test_tension_blocks_higher_reel_until_release() {
        // Scatters on reels 1, 2, 3 -> reel 3 tensions after 2 confirm below
        let mut scheduler = demo_scheduler();
        let mut session = start_spin(&mut scheduler, grid_of(SymbolKind::Ten, &[1, 2, 3]));
        assert!(session.reels[3].tension_pending);

        let (events, _) = run_to_stop(&mut scheduler, &mut session, 0.0, 30_000.0);

        // While reel 3 held tension, reel 4 never reported stopped (P2)
        let mut reel3_released = false;
        for e in &events {
            match &e.directive {
                Directive::AnticipationOff { reel_index: 3 } => reel3_released = true,
                Directive::PresentSymbols { reel_index: 4, .. } => {
                    assert!(reel3_released, "reel 4 landed past a tensioned reel 3");
                }
                _ => {}
            }
        }
        assert!(reel3_released);
        assert!(session.all_stopped());

        // Tension pushed reel 4 beyond its plain schedule
        let plain = scheduler.timing.stop_offset_ms(4);
        assert!(session.reels[4].scheduled_stop_ms > plain);
    }

    #[test]
    fn test_tension_emits_anticipation_events() {
        let mut scheduler = demo_scheduler();
        let mut session = start_spin(&mut scheduler, grid_of(SymbolKind::Ten, &[2, 3, 4]));
        let (events, _) = run_to_stop(&mut scheduler, &mut session, 0.0, 30_000.0);

        assert!(events.iter().any(|e| matches!(
            e.directive,
            Directive::AnticipationOn { reel_index: 4, .. }
        )));
        assert!(events
            .iter()
            .any(|e| matches!(e.directive, Directive::AnticipationOff { reel_index: 4 })));
    }

    #[test]
    fn test_manual_stop_rejected_in_lockout_window() {
        let mut scheduler = demo_scheduler();
        let mut session = start_spin(&mut scheduler, grid_of(SymbolKind::Ten, &[]));

        let err = scheduler.request_stop(&mut session, 400.0);
        assert!(matches!(err, Err(StateMisuse::StopLockedOut)));
        assert!(scheduler.stop_control_disabled());
        assert!(!session.stop_requested_early);

        // Control re-enables once the spin finalizes naturally
        let (_, _) = run_to_stop(&mut scheduler, &mut session, 400.0, 10_000.0);
        assert!(session.all_stopped());
        assert!(!scheduler.stop_control_disabled());
    }

    #[test]
    fn test_manual_stop_short_circuits_but_keeps_min_sequence() {
        let mut scheduler = demo_scheduler();
        let mut session = start_spin(&mut scheduler, grid_of(SymbolKind::Ten, &[]));

        scheduler.request_stop(&mut session, 1200.0).unwrap();
        assert!(session.stop_requested_early);

        // One tick right after the request: reels enter Stopping, none may
        // already be Stopped (minimum stopping sequence).
        let events = scheduler.tick(&mut session, 1210.0);
        assert!(session
            .reels
            .iter()
            .all(|r| r.phase == ReelPhase::Stopping));
        assert!(events
            .iter()
            .all(|e| !matches!(e.directive, Directive::PresentSymbols { .. })));

        // After the stopping duration, everything lands
        let (_, now) = run_to_stop(&mut scheduler, &mut session, 1210.0, 2_000.0);
        assert!(session.all_stopped());
        assert!(now - 1210.0 >= scheduler.timing.stopping_ms);
    }

    #[test]
    fn test_manual_stop_cancels_pending_tension() {
        let mut scheduler = demo_scheduler();
        let mut session = start_spin(&mut scheduler, grid_of(SymbolKind::Ten, &[2, 3, 4]));
        assert!(session.reels[4].tension_pending);

        scheduler.request_stop(&mut session, 1500.0).unwrap();
        assert!(!session.reels[4].tension_pending);

        let (events, _) = run_to_stop(&mut scheduler, &mut session, 1500.0, 5_000.0);
        assert!(events
            .iter()
            .all(|e| !matches!(e.directive, Directive::AnticipationOn { .. })));
    }

    #[test]
    fn test_live_gate_blocks_all_stops() {
        let mut scheduler = ReelStopScheduler::new(TimingConfig::normal(), PlayMode::Live);
        let mut session = SpinSession::new(SpinMode::Base, 1.0, 0.0);
        scheduler.begin_spin(&mut session, 0.0);
        assert!(scheduler.awaiting_outcome());

        // Far past every schedule, still nothing may leave Spinning
        let events = scheduler.tick(&mut session, 60_000.0);
        assert!(events.is_empty());
        assert!(session
            .reels
            .iter()
            .all(|r| r.phase == ReelPhase::Spinning));
        assert!(scheduler.outcome_timed_out(60_000.0));

        // Committing (the session's fallback path) releases the gate
        scheduler.commit_outcome(&mut session, grid_of(SymbolKind::Queen, &[]));
        assert!(!scheduler.awaiting_outcome());
        let (_, _) = run_to_stop(&mut scheduler, &mut session, 60_000.0, 10_000.0);
        assert!(session.all_stopped());
        assert_eq!(session.grid().at(0, 0), SymbolKind::Queen);
    }
}
