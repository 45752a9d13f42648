/// table parameters shared by every solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokerConfig {
    pub n_players: usize,
    pub n_chips: Chips,
    pub ante: Chips,
    pub straddle: bool,
}

impl Default for PokerConfig {
    fn default() -> Self {
        Self {
            n_players: 2,
            n_chips: 10_000,
            ante: 0,
            straddle: false,
        }
    }
}

/// everything a solver needs to reconstruct its game: table
/// parameters, rake, the action abstraction, per-seat starting
/// ranges, dealt board cards, and the state to solve from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    pub poker: PokerConfig,
    pub rake: Rake,
    pub action_profile: Profile,
    pub init_ranges: Vec<Range>,
    pub init_board: Board,
    pub init_state: State,
}

impl SolverConfig {
    pub fn new(poker: PokerConfig, rake: Rake, action_profile: Profile) -> Result<Self> {
        let init_state = State::new(poker.n_players, poker.n_chips, poker.ante, poker.straddle);
        let init_ranges = vec![Range::full(); poker.n_players];
        let config = Self {
            poker,
            rake,
            action_profile,
            init_ranges,
            init_board: Board::empty(),
            init_state,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_board(mut self, board: Board) -> Result<Self> {
        for range in self.init_ranges.iter_mut() {
            range.remove_cards(board.mask());
        }
        self.init_board = board;
        self.validate()?;
        Ok(self)
    }
    pub fn with_ranges(mut self, ranges: Vec<Range>) -> Result<Self> {
        self.init_ranges = ranges;
        self.validate()?;
        Ok(self)
    }
    pub fn with_state(mut self, state: State) -> Result<Self> {
        self.init_state = state;
        self.validate()?;
        Ok(self)
    }

    /// starting stacks, for hand-level profit accounting
    pub fn stacks(&self) -> Vec<Chips> {
        vec![self.poker.n_chips; self.poker.n_players]
    }

    /// configuration errors are fatal and carry enough state to
    /// reconstruct the failure
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (2..=9).contains(&self.poker.n_players),
            "invalid player count: {}",
            self.poker.n_players
        );
        anyhow::ensure!(
            self.poker.n_chips >= 2 * crate::B_BLIND,
            "stacks of {} cannot cover the blinds",
            self.poker.n_chips
        );
        anyhow::ensure!(
            self.action_profile.n_players() == self.poker.n_players,
            "action profile seats {} != players {}",
            self.action_profile.n_players(),
            self.poker.n_players
        );
        self.action_profile.validate()?;
        anyhow::ensure!(
            self.init_ranges.len() == self.poker.n_players,
            "range count {} != players {}",
            self.init_ranges.len(),
            self.poker.n_players
        );
        anyhow::ensure!(
            !self.init_state.is_terminal(),
            "initial state is terminal:\n{}",
            self.init_state
        );
        let wanted = self.init_state.street().n_board_cards();
        anyhow::ensure!(
            self.init_board.n() == wanted,
            "board has {} cards but the {} needs {}",
            self.init_board.n(),
            self.init_state.street(),
            wanted
        );
        for (seat, range) in self.init_ranges.iter().enumerate() {
            let mut live = range.clone();
            live.remove_cards(self.init_board.mask());
            anyhow::ensure!(
                live.n_combos() > 0.0,
                "seat {} range is dead after card removal:\n{}",
                seat,
                self.init_state
            );
        }
        Ok(())
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        let poker = PokerConfig::default();
        let profile = Profile::heads_up(poker.n_chips);
        Self::new(poker, Rake::none(), profile).expect("default config is valid")
    }
}

/// linear-CFR discount schedule. `t / interval` stays in integer
/// arithmetic until the final cast so late-phase factors do not
/// drift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscountSchedule {
    pub discount_interval: i64,
    pub lcfr_thresh: i64,
}

impl DiscountSchedule {
    pub fn is_discount_step(&self, t: i64) -> bool {
        t > 0 && t < self.lcfr_thresh && t % self.discount_interval == 0
    }
    /// the next discount boundary, or past the horizon once the
    /// linear phase is over
    pub fn next_discount_step(&self, t: i64, horizon: i64) -> i64 {
        let next = (t / self.discount_interval + 1) * self.discount_interval;
        if next < self.lcfr_thresh {
            next
        } else {
            horizon + 1
        }
    }
    pub fn factor(&self, t: i64) -> f64 {
        let k = t / self.discount_interval;
        k as f64 / (k + 1) as f64
    }
}

/// human-readable blueprint schedule in minutes, converted to
/// iteration counts at a measured rate
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlueprintTimings {
    pub discount_interval_m: i64,
    pub lcfr_thresh_m: i64,
    pub preflop_threshold_m: i64,
    pub snapshot_threshold_m: i64,
    pub snapshot_interval_m: i64,
    pub prune_thresh_m: i64,
    pub log_interval_m: i64,
}

impl Default for BlueprintTimings {
    fn default() -> Self {
        Self {
            discount_interval_m: 10,
            lcfr_thresh_m: 400,
            preflop_threshold_m: 800,
            snapshot_threshold_m: 800,
            snapshot_interval_m: 200,
            prune_thresh_m: 200,
            log_interval_m: 1,
        }
    }
}

/// blueprint solver schedule, all in iteration counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintConfig {
    pub strategy_interval: i64,
    pub preflop_threshold: i64,
    pub snapshot_threshold: i64,
    pub snapshot_interval: i64,
    pub prune_thresh: i64,
    pub log_interval: i64,
    pub discount: DiscountSchedule,
}

impl BlueprintConfig {
    pub fn from_timings(timings: &BlueprintTimings, it_per_min: i64) -> Self {
        Self {
            strategy_interval: 10_000,
            preflop_threshold: timings.preflop_threshold_m * it_per_min,
            snapshot_threshold: timings.snapshot_threshold_m * it_per_min,
            snapshot_interval: timings.snapshot_interval_m * it_per_min,
            prune_thresh: timings.prune_thresh_m * it_per_min,
            log_interval: timings.log_interval_m * it_per_min,
            discount: DiscountSchedule {
                discount_interval: timings.discount_interval_m * it_per_min,
                lcfr_thresh: timings.lcfr_thresh_m * it_per_min,
            },
        }
    }

    pub fn is_snapshot_step(&self, t: i64, horizon: i64) -> bool {
        t == horizon
            || (t >= self.snapshot_threshold
                && (t - self.snapshot_threshold) % self.snapshot_interval == 0)
    }
    pub fn next_snapshot_step(&self, t: i64, horizon: i64) -> i64 {
        let next = if t < self.snapshot_threshold {
            self.snapshot_threshold
        } else {
            ((t - self.snapshot_threshold) / self.snapshot_interval + 1) * self.snapshot_interval
                + self.snapshot_threshold
        };
        next.min(horizon)
    }
    pub fn is_log_step(&self, t: i64) -> bool {
        t > 0 && t % self.log_interval == 0
    }

    /// coalesce the next event boundary: discount, snapshot, log,
    /// or the end of the run
    pub fn next_step(&self, t: i64, horizon: i64) -> i64 {
        let next_log = (t / self.log_interval + 1) * self.log_interval;
        self.discount
            .next_discount_step(t, horizon)
            .min(self.next_snapshot_step(t, horizon))
            .min(next_log)
            .min(horizon)
            .max(t + 1)
    }
}

impl Default for BlueprintConfig {
    fn default() -> Self {
        Self::from_timings(&BlueprintTimings::default(), 10_000_000)
    }
}

/// real-time schedule in seconds at a measured iteration rate
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RealTimeTimings {
    pub discount_interval_s: f64,
    pub lcfr_thresh_s: f64,
    pub log_interval_s: f64,
}

impl Default for RealTimeTimings {
    fn default() -> Self {
        Self {
            discount_interval_s: 0.5,
            lcfr_thresh_s: 15.0,
            log_interval_s: 1.0,
        }
    }
}

/// subgame solver schedule and leaf configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealTimeConfig {
    pub discount: DiscountSchedule,
    pub log_interval: i64,
    /// recursion stops at (terminal_round, terminal_bet_level);
    /// a terminal round of 4 never truncates
    pub terminal_round: u8,
    pub terminal_bet_level: u8,
    pub bias_profile: Profile,
}

impl RealTimeConfig {
    pub fn from_timings(timings: &RealTimeTimings, it_per_sec: i64, n_players: usize) -> Self {
        Self {
            discount: DiscountSchedule {
                discount_interval: (timings.discount_interval_s * it_per_sec as f64) as i64,
                lcfr_thresh: (timings.lcfr_thresh_s * it_per_sec as f64) as i64,
            },
            log_interval: (timings.log_interval_s * it_per_sec as f64) as i64,
            terminal_round: crate::N_STREETS as u8,
            terminal_bet_level: 0,
            bias_profile: Profile::bias(n_players),
        }
    }
    pub fn with_leaf(mut self, terminal_round: u8, terminal_bet_level: u8) -> Self {
        self.terminal_round = terminal_round;
        self.terminal_bet_level = terminal_bet_level;
        self
    }
    /// the subsolver stops recursing at configured depth and rolls
    /// the leaf out under the sampled blueprint instead
    pub fn is_leaf(&self, state: &State) -> bool {
        state.round() > self.terminal_round
            || (state.round() == self.terminal_round
                && state.bet_level() >= self.terminal_bet_level)
    }
    pub fn next_step(&self, t: i64, horizon: i64) -> i64 {
        let next_log = (t / self.log_interval + 1) * self.log_interval;
        self.discount
            .next_discount_step(t, horizon)
            .min(next_log)
            .min(horizon)
            .max(t + 1)
    }
}

use crate::cards::board::Board;
use crate::gameplay::profile::Profile;
use crate::gameplay::rake::Rake;
use crate::gameplay::range::Range;
use crate::gameplay::state::State;
use crate::Chips;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_factor_integer_arithmetic() {
        let schedule = DiscountSchedule {
            discount_interval: 100,
            lcfr_thresh: 1000,
        };
        assert!(schedule.factor(100) == 0.5);
        assert!(schedule.factor(199) == 0.5); // integer division first
        assert!(schedule.factor(200) == 2.0 / 3.0);
        assert!(schedule.is_discount_step(100));
        assert!(!schedule.is_discount_step(150));
        assert!(!schedule.is_discount_step(1000));
        assert!(schedule.next_discount_step(0, 10_000) == 100);
        assert!(schedule.next_discount_step(950, 10_000) == 10_001);
    }

    #[test]
    fn snapshot_boundaries() {
        let config = BlueprintConfig {
            strategy_interval: 10,
            preflop_threshold: 800,
            snapshot_threshold: 100,
            snapshot_interval: 50,
            prune_thresh: 200,
            log_interval: 25,
            discount: DiscountSchedule {
                discount_interval: 40,
                lcfr_thresh: 120,
            },
        };
        assert!(config.next_snapshot_step(0, 1000) == 100);
        assert!(config.next_snapshot_step(100, 1000) == 150);
        assert!(config.is_snapshot_step(100, 1000));
        assert!(config.is_snapshot_step(150, 1000));
        assert!(!config.is_snapshot_step(160, 1000));
        assert!(config.is_snapshot_step(1000, 1000)); // final snapshot
        // coalesced boundary is the nearest event
        assert!(config.next_step(0, 1000) == 25);
        assert!(config.next_step(25, 1000) == 40);
        assert!(config.next_step(90, 1000) == 100);
    }

    #[test]
    fn default_config_validates() {
        assert!(SolverConfig::default().validate().is_ok());
    }

    #[test]
    fn board_street_mismatch_is_fatal() {
        let config = SolverConfig::default();
        let board = Board::try_from("2h3h4c").unwrap();
        // preflop state with a flop board
        assert!(config.with_board(board).is_err());
    }
}
