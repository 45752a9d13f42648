/// weighted Welford update for streaming mean and variance.
/// importance-sampled estimators feed correlated draws through
/// here, so the weight bookkeeping is not optional.
pub fn update_stats(
    x: f64,
    w: f64,
    mean: &mut f64,
    w_sum: &mut f64,
    w_sum2: &mut f64,
    s: &mut f64,
) {
    *w_sum += w;
    *w_sum2 += w * w;
    let old = *mean;
    *mean = old + (w / *w_sum) * (x - old);
    *s += w * (x - old) * (x - *mean);
}

pub fn standard_deviation(s: f64, w_sum: f64) -> f64 {
    (s / w_sum).sqrt()
}

#[derive(Debug, Clone, Copy)]
pub struct ResultEV {
    pub ev: f64,
    pub std_dev: f64,
    pub std_err: f64,
    pub iterations: i64,
    pub milliseconds: i64,
}

impl std::fmt::Display for ResultEV {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "EV={:.2}, stdDev={:.2}, stdErr={:.2}, iterations={}, time={} ms",
            self.ev, self.std_dev, self.std_err, self.iterations, self.milliseconds
        )
    }
}

/// monte-carlo EV of a blueprint strategy from a given spot.
/// terminates on a standard-error target, an iteration cap, or a
/// wall-clock limit, whichever comes first; the predicate is only
/// checked between samples.
pub struct MonteCarloEV {
    min_it: i64,
    max_it: i64,
    std_err_target: f64,
    max_ms: f64,
    seed: u64,
}

impl Default for MonteCarloEV {
    fn default() -> Self {
        Self {
            min_it: 1000,
            max_it: i64::MAX,
            std_err_target: 0.0,
            max_ms: 3_600_000.0,
            seed: 0,
        }
    }
}

impl MonteCarloEV {
    pub fn min_iterations(mut self, n: i64) -> Self {
        self.min_it = n;
        self
    }
    pub fn max_iterations(mut self, n: i64) -> Self {
        self.max_it = n;
        self
    }
    pub fn std_err_target(mut self, target: f64) -> Self {
        self.std_err_target = target;
        self
    }
    pub fn time_limit_ms(mut self, max_ms: f64) -> Self {
        self.max_ms = max_ms;
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn should_terminate(&self, t: i64, std_err: f64, elapsed_ms: f64) -> bool {
        t >= self.min_it
            && (t >= self.max_it
                || (self.std_err_target > 0.0 && std_err < self.std_err_target)
                || elapsed_ms > self.max_ms)
    }

    /// EV for `hero` when everyone plays the lossless blueprint
    pub fn lossless(
        &self,
        blueprint: &LosslessBlueprint,
        state: &State,
        hero: usize,
        ranges: &[Range],
        init_board: &Board,
    ) -> Result<ResultEV> {
        self.run(
            blueprint.config(),
            state,
            hero,
            ranges,
            init_board,
            |state, board, hands, _indexers, rng| {
                blueprint.sample_action(state, board, &hands[state.active()], rng)
            },
        )
    }

    /// EV under the sampled blueprint with fixed per-seat biases
    pub fn sampled(
        &self,
        biases: &[Action],
        blueprint: &SampledBlueprint,
        state: &State,
        hero: usize,
        ranges: &[Range],
        init_board: &Board,
    ) -> Result<ResultEV> {
        let biases = biases.to_vec();
        self.run(
            blueprint.config(),
            state,
            hero,
            ranges,
            init_board,
            move |state, board, hands, indexers, rng| {
                let seat = state.active();
                blueprint.next_action(
                    state,
                    board,
                    &hands[seat],
                    biases[seat],
                    &mut indexers[seat],
                    rng,
                )
            },
        )
    }

    fn run(
        &self,
        config: &SolverConfig,
        init_state: &State,
        hero: usize,
        ranges: &[Range],
        init_board: &Board,
        mut next_action: impl FnMut(
            &State,
            &Board,
            &[Hand],
            &mut [CachedIndexer],
            &mut SmallRng,
        ) -> Action,
    ) -> Result<ResultEV> {
        validate_ev_inputs(init_state, hero, ranges, init_board)?;
        let stacks = config.stacks();
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut sampler = RoundSampler::new(ranges, init_board.mask(), &mut rng)?;
        let mut sample = sampler.sample(&mut rng)?;
        let (mut mean, mut w_sum, mut w_sum2, mut s) = (0.0, 0.0, 0.0, 0.0);
        let mut std_err = 0.0;
        let mut t = 0i64;
        let t_0 = std::time::Instant::now();
        loop {
            let elapsed = t_0.elapsed().as_millis() as f64;
            if self.should_terminate(t, std_err, elapsed) {
                break;
            }
            sampler.next_sample(&mut sample, &mut rng);
            let board = sample_board(init_board, sample.mask, &mut rng);
            let mut indexers = vec![CachedIndexer::new(); ranges.len()];
            let mut state = init_state.clone();
            while !state.is_terminal() && !state.players()[hero].has_folded() {
                let action = next_action(&state, &board, &sample.hands, &mut indexers, &mut rng);
                state = state.apply(action);
            }
            let u = utility(&state, hero, &board, &sample.hands, &stacks, &config.rake);
            update_stats(u as f64, sample.weight, &mut mean, &mut w_sum, &mut w_sum2, &mut s);
            std_err = (s / (w_sum * w_sum - w_sum2)).max(0.0).sqrt();
            t += 1;
            if t > 0 && t % 100_000 == 0 {
                log::debug!(
                    "t={:.1}M, EV={:.2}, stdErr={:.2}",
                    t as f64 / 1e6,
                    mean,
                    std_err
                );
            }
        }
        let result = ResultEV {
            ev: mean,
            std_dev: standard_deviation(s, w_sum),
            std_err,
            iterations: t,
            milliseconds: t_0.elapsed().as_millis() as i64,
        };
        log::info!("{}", result);
        Ok(result)
    }
}

fn validate_ev_inputs(
    state: &State,
    hero: usize,
    ranges: &[Range],
    board: &Board,
) -> Result<()> {
    anyhow::ensure!(
        state.active_players() == 2,
        "expected value needs exactly two remaining players:\n{}",
        state
    );
    anyhow::ensure!(hero < ranges.len(), "hero {} has no range", hero);
    anyhow::ensure!(
        board.n() <= crate::N_BOARD,
        "too many board cards: {}",
        board
    );
    anyhow::ensure!(
        board.n() >= state.street().n_board_cards(),
        "board not dealt up to the {}: {}",
        state.street(),
        board
    );
    Ok(())
}

fn villain_position(state: &State, hero: usize) -> usize {
    state
        .players()
        .iter()
        .enumerate()
        .position(|(p, player)| p != hero && !player.has_folded())
        .expect("a villain exists")
}

/// exact EV by enumerating rivers and both ranges; turn and river
/// spots only, where the remaining chance space is small
pub fn enumerate_ev(
    blueprint: &LosslessBlueprint,
    state: &State,
    hero: usize,
    ranges: &[Range],
    init_board: &Board,
) -> Result<f64> {
    validate_ev_inputs(state, hero, ranges, init_board)?;
    anyhow::ensure!(
        init_board.n() >= 4,
        "enumeration is turn and river only, got {} board cards",
        init_board.n()
    );
    let boards = match init_board.n() {
        5 => vec![*init_board],
        _ => (0..crate::N_CARDS as u8)
            .map(Card::from)
            .filter(|c| c.mask() & init_board.mask() == 0)
            .map(|c| {
                let mut board = *init_board;
                board.push(c);
                board
            })
            .collect(),
    };
    let villain = villain_position(state, hero);
    let stacks = blueprint.config().stacks();
    let mut ev = 0.0;
    let mut total = 0.0;
    let mut hands = vec![Hand::blank(); ranges.len()];
    for board in boards.iter() {
        for (hh, hw) in ranges[hero].hands() {
            if hh.collides(board.mask()) {
                continue;
            }
            for (vh, vw) in ranges[villain].hands() {
                if vh.collides(board.mask()) || vh.collides(hh.mask()) {
                    continue;
                }
                hands[hero] = hh;
                hands[villain] = vh;
                let weight = hw * vw;
                ev += weight * node_ev(blueprint, state, hero, &hands, board, &stacks);
                total += weight;
            }
        }
    }
    anyhow::ensure!(total > 0.0, "ranges are disjoint from the board");
    Ok(ev / total)
}

fn node_ev(
    blueprint: &LosslessBlueprint,
    state: &State,
    hero: usize,
    hands: &[Hand],
    board: &Board,
    stacks: &[Chips],
) -> f64 {
    if state.is_terminal() {
        return utility(state, hero, board, hands, stacks, &blueprint.config().rake) as f64;
    }
    let (actions, sigma) = blueprint.policy(state, board, &hands[state.active()]);
    actions
        .iter()
        .zip(sigma.iter())
        .map(|(action, p)| p * node_ev(blueprint, &state.apply(*action), hero, hands, board, stacks))
        .sum()
}

use crate::cards::board::Board;
use crate::cards::card::Card;
use crate::cards::hand::Hand;
use crate::clustering::indexer::CachedIndexer;
use crate::gameplay::action::Action;
use crate::gameplay::range::Range;
use crate::gameplay::state::utility;
use crate::gameplay::state::State;
use crate::mccfr::blueprint::LosslessBlueprint;
use crate::mccfr::blueprint::SampledBlueprint;
use crate::mccfr::config::SolverConfig;
use crate::sampling::round::sample_board;
use crate::sampling::round::RoundSampler;
use crate::Chips;
use anyhow::Result;
use rand::rngs::SmallRng;
use rand::SeedableRng;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welford_matches_closed_form() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let (mut mean, mut w_sum, mut w_sum2, mut s) = (0.0, 0.0, 0.0, 0.0);
        for x in xs {
            update_stats(x, 1.0, &mut mean, &mut w_sum, &mut w_sum2, &mut s);
        }
        assert!((mean - 2.5).abs() < 1e-12);
        // population variance with unit weights
        assert!((s / w_sum - 1.25).abs() < 1e-12);
    }

    #[test]
    fn weighted_mean_tilts() {
        let (mut mean, mut w_sum, mut w_sum2, mut s) = (0.0, 0.0, 0.0, 0.0);
        update_stats(0.0, 1.0, &mut mean, &mut w_sum, &mut w_sum2, &mut s);
        update_stats(10.0, 3.0, &mut mean, &mut w_sum, &mut w_sum2, &mut s);
        assert!((mean - 7.5).abs() < 1e-12);
    }

    #[test]
    fn ev_requires_heads_up() {
        let state = State::new(3, 10_000, 0, false);
        let ranges = vec![Range::full(), Range::full(), Range::full()];
        let board = Board::empty();
        assert!(validate_ev_inputs(&state, 0, &ranges, &board).is_err());
    }
}
