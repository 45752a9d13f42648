/// the real-time subgame solver.
///
/// extends the MCCFR traversal two ways: a bias preflight where
/// every unfolded seat's bias (fold/call/raise/none leaning) is an
/// action explored like any other, and a leaf evaluator that stops
/// recursing at a configured (street, bet level) and rolls the
/// subtree out under the sampled blueprint instead, with each
/// seat's sampled bias fixed. this searches for strategies robust
/// to a family of opponent continuations rather than one frozen
/// profile.
pub struct RealTimeSolver {
    config: SolverConfig,
    rt: RealTimeConfig,
    blueprint: Arc<SampledBlueprint>,
    lookup: Arc<dyn ClusterLookup>,
    regrets: TreeStorage<Regret>,
    ranges: Vec<Range>,
    stacks: Vec<Chips>,
    seed: u64,
    t: AtomicI64,
    status: AtomicU8,
    interrupt: AtomicBool,
}

impl RealTimeSolver {
    /// `config.init_state` is the subgame root; the solver enters
    /// the bias preflight ahead of it
    pub fn new(
        config: SolverConfig,
        rt: RealTimeConfig,
        blueprint: Arc<SampledBlueprint>,
        lookup: Arc<dyn ClusterLookup>,
    ) -> Result<Self> {
        config.validate()?;
        let mut config = config;
        config.init_state = config.init_state.with_bias_phase();
        let shape = {
            let lookup = lookup.clone();
            let profile = config.action_profile.clone();
            let biases = rt.bias_profile.clone();
            Arc::new(TreeConfig {
                clusters: Box::new(move |state: &State| lookup.n_clusters(state.street())),
                actions: Box::new(move |state: &State| {
                    if state.in_bias_phase() {
                        state.valid_actions(&biases)
                    } else {
                        state.valid_actions(&profile)
                    }
                }),
                width: None,
            })
        };
        let regrets = TreeStorage::new(&config.init_state, shape);
        let mut ranges = config.init_ranges.clone();
        for range in ranges.iter_mut() {
            range.remove_cards(config.init_board.mask());
        }
        let mut probe = SmallRng::seed_from_u64(0);
        RoundSampler::new(&ranges, config.init_board.mask(), &mut probe)?;
        let stacks = config.stacks();
        Ok(Self {
            config,
            rt,
            blueprint,
            lookup,
            regrets,
            ranges,
            stacks,
            seed: 0,
            t: AtomicI64::new(0),
            status: AtomicU8::new(SolverState::Undefined as u8),
            interrupt: AtomicBool::new(false),
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
    pub fn iteration(&self) -> i64 {
        self.t.load(Ordering::Acquire)
    }
    pub fn state(&self) -> SolverState {
        SolverState::from(self.status.load(Ordering::Acquire))
    }
    /// polled between iterations
    pub fn set_interrupt(&self) {
        self.interrupt.store(true, Ordering::Release);
    }

    pub fn solve(&self, t_plus: i64) -> Result<()> {
        let mut t = self.iteration();
        let horizon = t + t_plus;
        self.status
            .store(SolverState::Solving as u8, Ordering::Release);
        log::info!("real-time solve {} -> {}", t, horizon);
        while t < horizon {
            let boundary = self.rt.next_step(t, horizon);
            let outcome = (t..boundary).into_par_iter().try_for_each_init(
                || {
                    let mut rng = SmallRng::seed_from_u64(self.seed);
                    RoundSampler::new(&self.ranges, self.config.init_board.mask(), &mut rng)
                        .expect("sampler feasibility checked at construction")
                },
                |sampler, t| -> Result<()> {
                    if self.interrupt.load(Ordering::Acquire) {
                        anyhow::bail!("interrupt");
                    }
                    let ref mut rng = self.rng(t);
                    let sample = sampler.sample(rng)?;
                    let board = sample_board(&self.config.init_board, sample.mask, rng);
                    let traverser = (t % self.config.poker.n_players as i64) as usize;
                    let ref mut indexers =
                        vec![CachedIndexer::new(); self.config.poker.n_players];
                    self.traverse(
                        &self.regrets,
                        &self.config.init_state,
                        traverser,
                        &board,
                        &sample.hands,
                        indexers,
                        rng,
                    );
                    Ok(())
                },
            );
            if let Err(error) = outcome {
                if self.interrupt.load(Ordering::Acquire) {
                    self.status
                        .store(SolverState::Interrupt as u8, Ordering::Release);
                    log::warn!("real-time solve interrupted near t={}", t);
                    return Ok(());
                }
                return Err(error);
            }
            t = boundary;
            self.t.store(t, Ordering::Release);
            if self.rt.discount.is_discount_step(t) {
                let factor = self.rt.discount.factor(t);
                self.regrets.lcfr_discount(factor);
            }
            if t % self.rt.log_interval == 0 {
                log::debug!("real-time t={}", t);
            }
        }
        self.status
            .store(SolverState::Solved as u8, Ordering::Release);
        Ok(())
    }

    /// wall-clock variant: run batches until the budget elapses,
    /// the solver is interrupted, or the iteration cap is hit
    pub fn solve_for(&self, budget: std::time::Duration, cap: i64) -> Result<()> {
        let t_0 = std::time::Instant::now();
        let chunk = self.rt.discount.discount_interval.max(1);
        while t_0.elapsed() < budget && self.iteration() < cap {
            let step = chunk.min(cap - self.iteration());
            self.solve(step)?;
            if self.state() == SolverState::Interrupt {
                return Ok(());
            }
        }
        Ok(())
    }

    fn rng(&self, t: i64) -> SmallRng {
        let ref mut hasher = DefaultHasher::new();
        self.seed.hash(hasher);
        t.hash(hasher);
        SmallRng::seed_from_u64(hasher.finish())
    }

    fn is_terminal(&self, state: &State, traverser: usize) -> bool {
        state.is_terminal() || state.players()[traverser].has_folded()
    }
    /// depth bound: past the configured street and bet level the
    /// subtree is evaluated, not traversed
    fn is_leaf(&self, state: &State) -> bool {
        !state.in_bias_phase() && self.rt.is_leaf(state)
    }

    fn traverse(
        &self,
        node: &TreeStorage<Regret>,
        state: &State,
        traverser: usize,
        board: &Board,
        hands: &[Hand],
        indexers: &mut [CachedIndexer],
        rng: &mut SmallRng,
    ) -> f64 {
        if self.is_terminal(state, traverser) {
            return utility(state, traverser, board, hands, &self.stacks, &self.config.rake)
                as f64;
        }
        if self.is_leaf(state) {
            return self.rollout(state, traverser, board, hands, indexers, rng);
        }
        let actions = node.actions().to_vec();
        assert!(
            !actions.is_empty(),
            "empty action set at reachable node:\n{}",
            state
        );
        let active = state.active();
        let cluster = self.lookup.cluster(
            state.street(),
            &hands[active],
            board,
            &mut indexers[active],
        ) as usize;
        let row = node.row(cluster);
        let regrets = load_row::<Regret>(row);
        let sigma = regret_matching(&regrets);
        if active == traverser {
            let mut values = vec![0.0; actions.len()];
            for (index, action) in actions.iter().enumerate() {
                let next = state.apply(*action);
                let child = node.apply_index(index, &next);
                values[index] =
                    self.traverse(child, &next, traverser, board, hands, indexers, rng);
            }
            let ev = sigma
                .iter()
                .zip(values.iter())
                .map(|(s, u)| s * u)
                .sum::<f64>();
            for (index, cell) in row.iter().enumerate() {
                let delta = (values[index] - ev).round() as Regret;
                Regret::add(cell, delta);
                if Regret::load(cell) < crate::REGRET_FLOOR {
                    Regret::store(cell, crate::REGRET_FLOOR);
                }
            }
            ev
        } else {
            let index = sample_index(&sigma, rng);
            let next = state.apply(actions[index]);
            let child = node.apply_index(index, &next);
            self.traverse(child, &next, traverser, board, hands, indexers, rng)
        }
    }

    /// play the leaf out under the sampled blueprint, each seat
    /// biased as chosen in the preflight
    fn rollout(
        &self,
        state: &State,
        traverser: usize,
        board: &Board,
        hands: &[Hand],
        indexers: &mut [CachedIndexer],
        rng: &mut SmallRng,
    ) -> f64 {
        let mut here = state.clone();
        while !self.is_terminal(&here, traverser) {
            let seat = here.active();
            let bias = here
                .biases()
                .get(seat)
                .copied()
                .unwrap_or(Action::BiasNone);
            let action = self.blueprint.next_action(
                &here,
                board,
                &hands[seat],
                bias,
                &mut indexers[seat],
                rng,
            );
            here = here.apply(action);
        }
        utility(&here, traverser, board, hands, &self.stacks, &self.config.rake) as f64
    }

    /// instantaneous regret-matching strategy at a subgame infoset.
    /// queries route through the bias preflight along the unbiased
    /// continuation before following the real action suffix.
    pub fn frequency(&self, action: Action, state: &State, board: &Board, hand: &Hand) -> f64 {
        assert!(
            state.history().is_consistent(self.config.init_state.history()),
            "inconsistent histories:\nsolver: {}\nquery: {}",
            self.config.init_state.history(),
            state.history()
        );
        let preflight = self
            .config
            .init_state
            .biases()
            .iter()
            .filter(|b| **b == Action::Undefined)
            .map(|_| Action::BiasNone)
            .collect::<Vec<Action>>();
        let suffix = state
            .history()
            .slice(self.config.init_state.history().len());
        let path = preflight
            .into_iter()
            .chain(suffix.actions().iter().copied())
            .collect::<Vec<Action>>();
        let node = match self.regrets.descend(&path) {
            Some(node) => node,
            None => return 0.0,
        };
        let index = match node.action_index(action) {
            Some(index) => index,
            None => return 0.0,
        };
        let mut indexer = CachedIndexer::new();
        let cluster = self
            .lookup
            .cluster(state.street(), hand, board, &mut indexer) as usize;
        let regrets = load_row::<Regret>(node.row(cluster));
        regret_matching(&regrets)[index]
    }
}

/// a queryable mixed strategy for the acting seat
#[derive(Debug, Clone)]
pub struct Solution {
    pub actions: Vec<Action>,
    pub freq: Vec<f64>,
}

/// drives real-time play across one game: mirrors the table state,
/// narrows ranges as actions arrive, and re-roots a subgame solver
/// whenever a street completes. preflop decisions come straight
/// from the lossless blueprint; postflop decisions from the latest
/// re-solve.
pub struct Session {
    blueprint: Arc<LosslessBlueprint>,
    sampled: Arc<SampledBlueprint>,
    lookup: Arc<dyn ClusterLookup>,
    rt: RealTimeConfig,
    root_state: State,
    real_state: State,
    ranges: Vec<Range>,
    board: Board,
    solver: Option<RealTimeSolver>,
    budget: i64,
    game_idx: usize,
}

impl Session {
    pub fn new(
        blueprint: Arc<LosslessBlueprint>,
        sampled: Arc<SampledBlueprint>,
        lookup: Arc<dyn ClusterLookup>,
        rt: RealTimeConfig,
        budget: i64,
    ) -> Self {
        let init = blueprint.config().init_state.clone();
        let ranges = blueprint.config().init_ranges.clone();
        Self {
            blueprint,
            sampled,
            lookup,
            rt,
            root_state: init.clone(),
            real_state: init,
            ranges,
            board: Board::empty(),
            solver: None,
            budget,
            game_idx: 0,
        }
    }

    pub fn new_game(&mut self) {
        self.game_idx += 1;
        log::info!("new game idx={}", self.game_idx);
        self.root_state = self.blueprint.config().init_state.clone();
        self.real_state = self.root_state.clone();
        self.ranges = self.blueprint.config().init_ranges.clone();
        self.board = Board::empty();
        self.solver = None;
    }

    pub fn real_state(&self) -> &State {
        &self.real_state
    }
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// board updates must extend the known prefix
    pub fn update_board(&mut self, board: Board) -> Result<()> {
        anyhow::ensure!(
            board.n() > self.board.n(),
            "no new cards on updated board: {} -> {}",
            self.board,
            board
        );
        anyhow::ensure!(
            board.cards().starts_with(self.board.cards()),
            "inconsistent boards: {} -> {}",
            self.board,
            board
        );
        for range in self.ranges.iter_mut() {
            range.remove_cards(board.mask());
        }
        self.board = board;
        Ok(())
    }

    /// mirror an updated table state, cross-checking every field
    /// the two histories should agree on
    pub fn update_state(&mut self, state: &State) -> Result<()> {
        anyhow::ensure!(
            state.history().is_consistent(self.real_state.history()),
            "inconsistent action histories:\nreal: {}\nupdated: {}",
            self.real_state.history(),
            state.history()
        );
        anyhow::ensure!(
            state.history().len() > self.real_state.history().len(),
            "no new actions in updated state:\n{}",
            state
        );
        for action in &state.history().slice(self.real_state.history().len()) {
            self.apply_action(*action)?;
        }
        anyhow::ensure!(
            state.pot() == self.real_state.pot(),
            "pot mismatch: real={} updated={}",
            self.real_state.pot(),
            state.pot()
        );
        anyhow::ensure!(
            state.max_bet() == self.real_state.max_bet(),
            "max bet mismatch: real={} updated={}",
            self.real_state.max_bet(),
            state.max_bet()
        );
        anyhow::ensure!(
            state.bet_level() == self.real_state.bet_level(),
            "bet level mismatch: real={} updated={}",
            self.real_state.bet_level(),
            state.bet_level()
        );
        for (seat, (theirs, ours)) in state
            .players()
            .iter()
            .zip(self.real_state.players().iter())
            .enumerate()
        {
            anyhow::ensure!(
                theirs.chips() == ours.chips() && theirs.bet() == ours.bet(),
                "seat {} chip mismatch: real=({}, {}) updated=({}, {})",
                seat,
                ours.chips(),
                ours.bet(),
                theirs.chips(),
                theirs.bet()
            );
        }
        Ok(())
    }

    fn apply_action(&mut self, action: Action) -> Result<()> {
        log::info!("applying action: {}", action);
        self.narrow_range(action);
        let before = self.real_state.round();
        self.real_state = self.real_state.apply(action);
        let after = self.real_state.round();
        if after > before && !self.real_state.is_terminal() && after <= 3 {
            self.root_state = self.real_state.clone();
            self.resolve()?;
        }
        Ok(())
    }

    /// bayes-narrow the acting seat's range by the blueprint's
    /// probability of the observed action
    fn narrow_range(&mut self, action: Action) {
        if action.is_bias() {
            return;
        }
        let seat = self.real_state.active();
        let street_board = Board::from(self.board.street_cards(self.real_state.street()));
        let updates = self.ranges[seat]
            .hands()
            .map(|(hand, weight)| {
                let freq =
                    self.blueprint
                        .frequency(action, &self.real_state, &street_board, &hand);
                (hand, weight * freq)
            })
            .collect::<Vec<(Hand, f64)>>();
        for (hand, weight) in updates {
            self.ranges[seat].set_hand(&hand, weight);
        }
    }

    /// re-root the subgame at the new street and solve within the
    /// iteration budget
    fn resolve(&mut self) -> Result<()> {
        let street_board = Board::from(self.board.street_cards(self.root_state.street()));
        anyhow::ensure!(
            street_board.n() == self.root_state.street().n_board_cards(),
            "board not dealt up to the {}: {}",
            self.root_state.street(),
            self.board
        );
        let config = SolverConfig {
            poker: self.blueprint.config().poker.clone(),
            rake: self.blueprint.config().rake,
            action_profile: self.blueprint.config().action_profile.clone(),
            init_ranges: self.ranges.clone(),
            init_board: street_board,
            init_state: self.root_state.clone(),
        };
        let solver = RealTimeSolver::new(
            config,
            self.rt.clone(),
            self.sampled.clone(),
            self.lookup.clone(),
        )?;
        solver.solve(self.budget)?;
        self.solver = Some(solver);
        Ok(())
    }

    /// map an observed off-tree sizing onto the abstract menu
    /// before mirroring it
    pub fn translate_action<R: rand::Rng>(&self, action: Action, rng: &mut R) -> Action {
        let actions = self
            .real_state
            .valid_actions(&self.blueprint.config().action_profile);
        translate(action, &actions, &self.real_state, rng)
    }

    /// the current mixed strategy for the acting seat holding
    /// `hand`: blueprint preflop, latest re-solve postflop
    pub fn solution(&self, hand: &Hand) -> Solution {
        let state = &self.real_state;
        if state.is_terminal() {
            return Solution {
                actions: Vec::new(),
                freq: Vec::new(),
            };
        }
        let street_board = Board::from(self.board.street_cards(state.street()));
        let actions = state.valid_actions(&self.blueprint.config().action_profile);
        let freq = match &self.solver {
            Some(solver) if state.round() > 0 => actions
                .iter()
                .map(|a| solver.frequency(*a, state, &street_board, hand))
                .collect(),
            _ => actions
                .iter()
                .map(|a| self.blueprint.frequency(*a, state, &street_board, hand))
                .collect(),
        };
        Solution { actions, freq }
    }
}

use super::blueprint::LosslessBlueprint;
use super::blueprint::SampledBlueprint;
use super::config::RealTimeConfig;
use super::config::SolverConfig;
use super::solver::SolverState;
use super::strategy::load_row;
use super::strategy::regret_matching;
use super::strategy::sample_index;
use super::translate::translate;
use super::tree::TreeConfig;
use super::tree::TreeStorage;
use super::value::Value;
use crate::cards::board::Board;
use crate::cards::hand::Hand;
use crate::clustering::indexer::CachedIndexer;
use crate::clustering::lookup::ClusterLookup;
use crate::gameplay::action::Action;
use crate::gameplay::range::Range;
use crate::gameplay::state::utility;
use crate::gameplay::state::State;
use crate::sampling::round::sample_board;
use crate::sampling::round::RoundSampler;
use crate::Chips;
use crate::Regret;
use anyhow::Result;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::iter::IntoParallelIterator;
use rayon::iter::ParallelIterator;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;
use std::sync::Arc;
