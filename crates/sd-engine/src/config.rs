//! Engine configuration
//!
//! All tuning lives here: reel timing profiles, the free-spin ladder, the
//! bet table. Malformed values are repaired rather than rejected — a bad
//! delay array pads itself out and logs a warning; it never fails a spin.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::reel::REEL_COUNT;

/// Demo (locally simulated) vs Live (settlement-authoritative) play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    /// Balance and outcomes are fully local
    Demo,
    /// Outcomes and balance pushes come from the settlement service
    Live,
}

impl PlayMode {
    pub fn is_live(&self) -> bool {
        matches!(self, PlayMode::Live)
    }
}

/// Player-selectable game speed, selects a timing profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameSpeed {
    Normal,
    Fast,
}

impl Default for GameSpeed {
    fn default() -> Self {
        Self::Normal
    }
}

/// Wall-clock tuning for the reel stop schedule and win rollup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Which profile this came from
    pub speed: GameSpeed,

    /// Base spin duration before the first reel may stop (ms)
    pub base_spin_ms: f64,

    /// Extra delay each reel adds on top of the previous reel's stop (ms).
    /// Index 0 is reel 0; short arrays are repaired by padding.
    pub reel_delays_ms: Vec<f64>,

    /// Minimum stopping sequence duration — a reel never teleports (ms)
    pub stopping_ms: f64,

    /// Delay added to every higher reel when a reel enters tension (ms)
    pub tension_extra_ms: f64,

    /// How long a tensioned reel holds before releasing (ms)
    pub tension_hold_ms: f64,

    /// Confirmed scatters on lower reels required to tension a reel
    pub tension_trigger_scatters: u8,

    /// Manual stop requests inside this window are rejected (ms)
    pub stop_lockout_ms: f64,

    /// Hard timeout on the live settlement response (ms)
    pub live_timeout_ms: f64,

    /// Rollup speed (credits per second)
    pub rollup_speed: f64,
    /// Rollup duration clamp (ms)
    pub rollup_min_ms: f64,
    pub rollup_max_ms: f64,

    /// Pause on the feature award screen before spin 1 (ms)
    pub award_display_ms: f64,
    /// Pause between consecutive feature spins (ms)
    pub inter_spin_delay_ms: f64,
}

/// Default per-reel delay used when repairing a short profile (ms)
pub const DEFAULT_REEL_DELAY_MS: f64 = 250.0;

impl TimingConfig {
    /// Normal gameplay timing
    pub fn normal() -> Self {
        Self {
            speed: GameSpeed::Normal,
            base_spin_ms: 1400.0,
            reel_delays_ms: vec![0.0, 250.0, 250.0, 250.0, 250.0],
            stopping_ms: 180.0,
            tension_extra_ms: 1500.0,
            tension_hold_ms: 1600.0,
            tension_trigger_scatters: 2,
            stop_lockout_ms: 1000.0,
            live_timeout_ms: 5000.0,
            rollup_speed: 50.0,
            rollup_min_ms: 500.0,
            rollup_max_ms: 8000.0,
            award_display_ms: 2000.0,
            inter_spin_delay_ms: 800.0,
        }
    }

    /// Fast mode — shorter spins, same tension behavior
    pub fn fast() -> Self {
        Self {
            speed: GameSpeed::Fast,
            base_spin_ms: 700.0,
            reel_delays_ms: vec![0.0, 100.0, 100.0, 100.0, 100.0],
            stopping_ms: 120.0,
            tension_extra_ms: 900.0,
            tension_hold_ms: 1000.0,
            tension_trigger_scatters: 2,
            stop_lockout_ms: 1000.0,
            live_timeout_ms: 5000.0,
            rollup_speed: 150.0,
            rollup_min_ms: 300.0,
            rollup_max_ms: 4000.0,
            award_display_ms: 1200.0,
            inter_spin_delay_ms: 400.0,
        }
    }

    /// Profile for a speed setting
    pub fn for_speed(speed: GameSpeed) -> Self {
        match speed {
            GameSpeed::Normal => Self::normal(),
            GameSpeed::Fast => Self::fast(),
        }
    }

    /// Repair a malformed delay profile in place.
    ///
    /// Short arrays pad with the last known delay (or the documented default
    /// when empty), long arrays truncate. Returns the error that was
    /// repaired, if any, so callers can log it.
    pub fn repair(&mut self) -> Option<ConfigError> {
        let expected = REEL_COUNT;
        let got = self.reel_delays_ms.len();
        if got == expected {
            return None;
        }

        let err = ConfigError::DelayProfileLength { expected, got };
        let pad = self
            .reel_delays_ms
            .last()
            .copied()
            .unwrap_or(DEFAULT_REEL_DELAY_MS);
        self.reel_delays_ms.resize(expected, pad);
        Some(err)
    }

    /// Scheduled stop offset of a reel, relative to spin start (ms).
    /// Cumulative: reel i stops `base + sum(delays[0..=i])` after start.
    pub fn stop_offset_ms(&self, reel_index: usize) -> f64 {
        let cumulative: f64 = self
            .reel_delays_ms
            .iter()
            .take(reel_index + 1)
            .sum();
        self.base_spin_ms + cumulative
    }

    /// Rollup duration for an amount, clamped
    pub fn rollup_duration_ms(&self, amount: f64) -> f64 {
        if self.rollup_speed <= 0.0 {
            return self.rollup_min_ms;
        }
        (amount / self.rollup_speed * 1000.0).clamp(self.rollup_min_ms, self.rollup_max_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::normal()
    }
}

/// Free-spin feature tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeSpinConfig {
    /// Spins awarded on trigger
    pub awarded_spins: u32,
    /// Extra spins appended by the single allowed retrigger
    pub retrigger_spins: u32,
    /// Hard cap on total spins in one feature run
    pub max_total_spins: u32,
    /// Multiplier ladder cap (ladder doubles after every spin)
    pub max_multiplier: f64,
    /// Display-stage multiplier applied once at settlement
    pub presentation_multiplier: f64,
}

impl Default for FreeSpinConfig {
    fn default() -> Self {
        Self {
            awarded_spins: 5,
            retrigger_spins: 5,
            max_total_spins: 10,
            max_multiplier: 16.0,
            presentation_multiplier: 2.0,
        }
    }
}

impl FreeSpinConfig {
    /// Spins awarded for a trigger. Live uses the fixed constant; demo
    /// derives from scatter count, which with the current trigger shape
    /// (exactly 3 scatters) is the same constant.
    pub fn awarded_for(&self, scatter_count: u8, mode: PlayMode) -> u32 {
        match mode {
            PlayMode::Live => self.awarded_spins,
            PlayMode::Demo => {
                let _ = scatter_count;
                self.awarded_spins
            }
        }
    }
}

/// Bet table and demo balance tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Selectable bet amounts
    pub bet_table: Vec<f64>,
    /// Initial bet index (clamped)
    pub default_bet_index: usize,
    /// Starting balance in demo mode
    pub demo_balance: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            bet_table: vec![0.25, 0.50, 1.00, 1.25, 2.50, 5.00, 10.00],
            default_bet_index: 2,
            demo_balance: 2000.0,
        }
    }
}

impl LedgerConfig {
    /// Repair an empty bet table (a ledger with no bets is unusable)
    pub fn repair(&mut self) -> Option<ConfigError> {
        if !self.bet_table.is_empty() {
            return None;
        }
        self.bet_table = LedgerConfig::default().bet_table;
        Some(ConfigError::EmptyBetTable)
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Demo or live play
    pub mode: PlayMode,
    /// Reel/rollup timing
    pub timing: TimingConfig,
    /// Free-spin tuning
    pub free_spins: FreeSpinConfig,
    /// Bets and balance
    pub ledger: LedgerConfig,
}

impl EngineConfig {
    /// Demo configuration with normal timing
    pub fn demo() -> Self {
        Self {
            mode: PlayMode::Demo,
            timing: TimingConfig::normal(),
            free_spins: FreeSpinConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }

    /// Live configuration with normal timing
    pub fn live() -> Self {
        Self {
            mode: PlayMode::Live,
            ..Self::demo()
        }
    }

    /// Switch the timing profile, keeping everything else
    pub fn with_speed(mut self, speed: GameSpeed) -> Self {
        self.timing = TimingConfig::for_speed(speed);
        self
    }

    /// Repair every repairable section, logging each fix
    pub fn repair(&mut self) {
        if let Some(err) = self.timing.repair() {
            log::warn!("timing config repaired: {err}");
        }
        if let Some(err) = self.ledger.repair() {
            log::warn!("ledger config repaired: {err}");
        }
        if self.ledger.default_bet_index >= self.ledger.bet_table.len() {
            log::warn!(
                "default bet index {} out of range, clamping",
                self.ledger.default_bet_index
            );
            self.ledger.default_bet_index = self.ledger.bet_table.len() - 1;
        }
    }

    /// Export as pretty JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Import from JSON, repairing anything repairable
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.repair();
        Ok(config)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::demo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_offsets_monotonic() {
        let timing = TimingConfig::normal();
        for i in 1..REEL_COUNT {
            assert!(timing.stop_offset_ms(i) >= timing.stop_offset_ms(i - 1));
        }
    }

    #[test]
    fn test_delay_profile_repair_pads() {
        let mut timing = TimingConfig::normal();
        timing.reel_delays_ms = vec![0.0, 200.0];

        let err = timing.repair();
        assert!(matches!(
            err,
            Some(ConfigError::DelayProfileLength { expected: 5, got: 2 })
        ));
        assert_eq!(timing.reel_delays_ms, vec![0.0, 200.0, 200.0, 200.0, 200.0]);
    }

    #[test]
    fn test_delay_profile_repair_from_empty() {
        let mut timing = TimingConfig::normal();
        timing.reel_delays_ms = Vec::new();

        timing.repair();
        assert_eq!(timing.reel_delays_ms.len(), REEL_COUNT);
        assert!(timing
            .reel_delays_ms
            .iter()
            .all(|&d| d == DEFAULT_REEL_DELAY_MS));
    }

    #[test]
    fn test_delay_profile_repair_truncates() {
        let mut timing = TimingConfig::normal();
        timing.reel_delays_ms = vec![0.0; 9];

        timing.repair();
        assert_eq!(timing.reel_delays_ms.len(), REEL_COUNT);
    }

    #[test]
    fn test_rollup_duration_clamped() {
        let timing = TimingConfig::normal();
        assert_eq!(timing.rollup_duration_ms(0.1), timing.rollup_min_ms);
        assert_eq!(timing.rollup_duration_ms(1.0e9), timing.rollup_max_ms);
        let mid = timing.rollup_duration_ms(100.0);
        assert!(mid > timing.rollup_min_ms && mid < timing.rollup_max_ms);
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = EngineConfig::live().with_speed(GameSpeed::Fast);
        let json = config.to_json();
        let back = EngineConfig::from_json(&json).unwrap();
        assert_eq!(back.mode, PlayMode::Live);
        assert_eq!(back.timing.speed, GameSpeed::Fast);
    }

    #[test]
    fn test_from_json_repairs_bad_bet_index() {
        let mut config = EngineConfig::demo();
        config.ledger.default_bet_index = 99;
        let back = EngineConfig::from_json(&config.to_json()).unwrap();
        assert!(back.ledger.default_bet_index < back.ledger.bet_table.len());
    }
}
