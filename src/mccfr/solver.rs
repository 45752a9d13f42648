/// solver lifecycle, observable across threads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SolverState {
    Undefined = 0,
    Interrupt = 1,
    Solving = 2,
    Solved = 3,
}

impl From<u8> for SolverState {
    fn from(n: u8) -> Self {
        match n {
            0 => Self::Undefined,
            1 => Self::Interrupt,
            2 => Self::Solving,
            3 => Self::Solved,
            _ => panic!("no solver state for u8 {}", n),
        }
    }
}

/// external-sampling MCCFR blueprint trainer.
///
/// generic over the storage axis: `R` backs the regret tables and
/// `P` the average-strategy tables, either both trees (lazily
/// grown) or both flat (history-mapped). the mode axis is fixed:
/// this solver trains a blueprint; the real-time variant lives in
/// its own module.
///
/// the outer loop runs parallel traversal batches between event
/// boundaries coalesced by `BlueprintConfig::next_step`; workers
/// only ever touch storage through atomics, and discount/snapshot
/// phases run after the batch joins, so no worker observes a
/// partially discounted tree.
pub struct BlueprintSolver<R, P>
where
    R: Backing<Regret>,
    P: Backing<f32>,
{
    config: SolverConfig,
    schedule: BlueprintConfig,
    lookup: Arc<dyn ClusterLookup>,
    regrets: R,
    phi: P,
    ranges: Vec<Range>,
    stacks: Vec<Chips>,
    seed: u64,
    t: AtomicI64,
    status: AtomicU8,
    interrupt: AtomicBool,
    snapshot_dir: PathBuf,
}

/// blueprint over the lock-free tree backend
pub type TreeBlueprintSolver = BlueprintSolver<TreeStorage<Regret>, TreeStorage<f32>>;
/// blueprint over the dense history-mapped backend
pub type MappedBlueprintSolver = BlueprintSolver<FlatStorage<Regret>, FlatStorage<f32>>;

impl TreeBlueprintSolver {
    pub fn tree(
        config: SolverConfig,
        schedule: BlueprintConfig,
        lookup: Arc<dyn ClusterLookup>,
    ) -> Result<Self> {
        config.validate()?;
        let regrets = TreeStorage::new(&config.init_state, tree_config(&config, &lookup));
        let phi = TreeStorage::new(&config.init_state, tree_config(&config, &lookup));
        Self::compose(config, schedule, lookup, regrets, phi)
    }
}

impl MappedBlueprintSolver {
    /// requires a fully enumerable abstraction; the history map is
    /// built by exhaustive walk up front
    pub fn mapped(
        config: SolverConfig,
        schedule: BlueprintConfig,
        lookup: Arc<dyn ClusterLookup>,
    ) -> Result<Self> {
        config.validate()?;
        let map = Arc::new(HistoryMap::build(&config, lookup.as_ref(), 3));
        log::info!(
            "history map: {} histories, {} cells",
            map.len(),
            map.n_cells()
        );
        let profile = Arc::new(config.action_profile.clone());
        let regrets = FlatStorage::new(map.clone(), profile.clone());
        let phi = FlatStorage::new(map, profile);
        Self::compose(config, schedule, lookup, regrets, phi)
    }
}

/// shared tree-shape providers for regret and average tables
pub fn tree_config(config: &SolverConfig, lookup: &Arc<dyn ClusterLookup>) -> Arc<TreeConfig> {
    let lookup = lookup.clone();
    let profile = config.action_profile.clone();
    TreeConfig::new(
        move |state: &State| lookup.n_clusters(state.street()),
        move |state: &State| state.valid_actions(&profile),
    )
}

impl<R, P> BlueprintSolver<R, P>
where
    R: Backing<Regret>,
    P: Backing<f32>,
{
    fn compose(
        config: SolverConfig,
        schedule: BlueprintConfig,
        lookup: Arc<dyn ClusterLookup>,
        regrets: R,
        phi: P,
    ) -> Result<Self> {
        let mut ranges = config.init_ranges.clone();
        for range in ranges.iter_mut() {
            range.remove_cards(config.init_board.mask());
        }
        // fail fast on infeasible ranges rather than inside a batch
        let mut probe = SmallRng::seed_from_u64(0);
        RoundSampler::new(&ranges, config.init_board.mask(), &mut probe)?;
        let stacks = config.stacks();
        Ok(Self {
            config,
            schedule,
            lookup,
            regrets,
            phi,
            ranges,
            stacks,
            seed: 0,
            t: AtomicI64::new(0),
            status: AtomicU8::new(SolverState::Undefined as u8),
            interrupt: AtomicBool::new(false),
            snapshot_dir: PathBuf::from("snapshots"),
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
    pub fn with_snapshot_dir(mut self, dir: PathBuf) -> Self {
        self.snapshot_dir = dir;
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
    pub fn schedule(&self) -> &BlueprintConfig {
        &self.schedule
    }
    pub fn regrets(&self) -> &R {
        &self.regrets
    }
    pub fn phi(&self) -> &P {
        &self.phi
    }
    pub fn iteration(&self) -> i64 {
        self.t.load(Ordering::Acquire)
    }
    pub fn state(&self) -> SolverState {
        SolverState::from(self.status.load(Ordering::Acquire))
    }
    /// observed between batches; blueprint training does not
    /// cancel mid-batch
    pub fn set_interrupt(&self) {
        self.interrupt.store(true, Ordering::Release);
    }

    /// advance `t_plus` iterations from the current count, running
    /// parallel batches between event boundaries
    pub fn solve(&self, t_plus: i64) -> Result<()> {
        let mut t = self.iteration();
        let horizon = t + t_plus;
        self.status
            .store(SolverState::Solving as u8, Ordering::Release);
        log::info!("solving {} -> {} iterations", t, horizon);
        while t < horizon {
            if self.interrupt.load(Ordering::Acquire) {
                self.status
                    .store(SolverState::Interrupt as u8, Ordering::Release);
                log::warn!("interrupted at t={}", t);
                return Ok(());
            }
            let boundary = self.schedule.next_step(t, horizon);
            self.run_batch(t, boundary)?;
            t = boundary;
            self.t.store(t, Ordering::Release);
            if self.schedule.discount.is_discount_step(t) {
                let factor = self.schedule.discount.factor(t);
                self.regrets.discount(factor);
                self.phi.discount(factor);
                log::info!("t={} discounted by {:.4}", t, factor);
            }
            if self.schedule.is_snapshot_step(t, horizon) {
                self.snapshot()?;
            }
            if self.schedule.is_log_step(t) {
                log::info!("t={} ({:.1}%)", t, 100.0 * t as f64 / horizon as f64);
            }
        }
        self.status
            .store(SolverState::Solved as u8, Ordering::Release);
        Ok(())
    }

    /// one parallel batch of iterations; workers share storage
    /// through atomics only
    fn run_batch(&self, from: i64, to: i64) -> Result<()> {
        (from..to).into_par_iter().try_for_each_init(
            || {
                let mut rng = SmallRng::seed_from_u64(self.seed);
                RoundSampler::new(&self.ranges, self.config.init_board.mask(), &mut rng)
                    .expect("sampler feasibility checked at construction")
            },
            |sampler, t| -> Result<()> {
                let ref mut rng = self.rng(t);
                let sample = sampler.sample(rng)?;
                let board = sample_board(&self.config.init_board, sample.mask, rng);
                let traverser = (t % self.config.poker.n_players as i64) as usize;
                let ref state = self.config.init_state;
                let ref mut indexers =
                    vec![CachedIndexer::new(); self.config.poker.n_players];
                if t % self.schedule.strategy_interval == 0 {
                    // past the preflop threshold the preflop average
                    // is considered converged and freezes
                    let freeze_preflop = t >= self.schedule.preflop_threshold;
                    self.update_strategy(
                        self.regrets.root(),
                        self.phi.root(),
                        state,
                        traverser,
                        &board,
                        &sample.hands,
                        indexers,
                        rng,
                        freeze_preflop,
                    );
                }
                let prune = t >= self.schedule.prune_thresh
                    && rng.random::<Probability>() < crate::PRUNE_PROBABILITY;
                self.traverse(
                    self.regrets.root(),
                    state,
                    traverser,
                    &board,
                    &sample.hands,
                    indexers,
                    rng,
                    prune,
                );
                Ok(())
            },
        )
    }

    /// deterministic per-iteration generator hashed from the seed
    /// and the epoch, so single-worker runs reproduce exactly
    fn rng(&self, t: i64) -> SmallRng {
        let ref mut hasher = DefaultHasher::new();
        self.seed.hash(hasher);
        t.hash(hasher);
        SmallRng::seed_from_u64(hasher.finish())
    }

    fn is_terminal(&self, state: &State, traverser: usize) -> bool {
        state.is_terminal() || state.players()[traverser].has_folded()
    }

    /// external-sampling traversal for one traverser seat: explore
    /// every action at the traverser's nodes, sample one action
    /// from the current strategy everywhere else, and push the
    /// counterfactual differences into the regret cells.
    fn traverse<'a>(
        &'a self,
        node: R::Node<'a>,
        state: &State,
        traverser: usize,
        board: &Board,
        hands: &[Hand],
        indexers: &mut [CachedIndexer],
        rng: &mut SmallRng,
        prune: bool,
    ) -> f64 {
        if self.is_terminal(state, traverser) {
            return utility(state, traverser, board, hands, &self.stacks, &self.config.rake)
                as f64;
        }
        let actions = self.regrets.actions(node, state);
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
        let row = self.regrets.row(node, state, cluster);
        let regrets = load_row::<Regret>(row);
        let sigma = regret_matching(&regrets);
        if active == traverser {
            let mut values = vec![0.0; actions.len()];
            let mut visited = vec![false; actions.len()];
            for (index, action) in actions.iter().enumerate() {
                // negative-regret pruning, never on the river where
                // regret estimates are exact
                if prune && state.round() < 3 && regrets[index] < crate::REGRET_PRUNE {
                    continue;
                }
                let next = state.apply(*action);
                let child = self.regrets.advance(node, index, &next);
                values[index] =
                    self.traverse(child, &next, traverser, board, hands, indexers, rng, prune);
                visited[index] = true;
            }
            let ev = sigma
                .iter()
                .zip(values.iter())
                .zip(visited.iter())
                .filter(|(_, v)| **v)
                .map(|((s, u), _)| s * u)
                .sum::<f64>();
            for (index, cell) in row.iter().enumerate() {
                if !visited[index] {
                    continue;
                }
                let delta = (values[index] - ev).round() as Regret;
                Regret::add(cell, delta);
                // clamp the floor so long runs cannot underflow
                if Regret::load(cell) < crate::REGRET_FLOOR {
                    Regret::store(cell, crate::REGRET_FLOOR);
                }
            }
            ev
        } else {
            let index = sample_index(&sigma, rng);
            let next = state.apply(actions[index]);
            let child = self.regrets.advance(node, index, &next);
            self.traverse(child, &next, traverser, board, hands, indexers, rng, prune)
        }
    }

    /// average-strategy walk: at the traverser's nodes, push the
    /// current regret-matching strategy into φ and sample onward;
    /// sample opponents from their own strategies
    fn update_strategy<'a>(
        &'a self,
        rnode: R::Node<'a>,
        pnode: P::Node<'a>,
        state: &State,
        traverser: usize,
        board: &Board,
        hands: &[Hand],
        indexers: &mut [CachedIndexer],
        rng: &mut SmallRng,
        freeze_preflop: bool,
    ) {
        if self.is_terminal(state, traverser) {
            return;
        }
        let actions = self.regrets.actions(rnode, state);
        let active = state.active();
        let cluster = self.lookup.cluster(
            state.street(),
            &hands[active],
            board,
            &mut indexers[active],
        ) as usize;
        let regrets = load_row::<Regret>(self.regrets.row(rnode, state, cluster));
        let sigma = regret_matching(&regrets);
        if active == traverser && !(freeze_preflop && state.round() == 0) {
            let phi_row = self.phi.row(pnode, state, cluster);
            for (index, weight) in sigma.iter().enumerate() {
                f32::add(&phi_row[index], *weight as f32);
            }
        }
        let index = sample_index(&sigma, rng);
        let next = state.apply(actions[index]);
        let rchild = self.regrets.advance(rnode, index, &next);
        let pchild = self.phi.advance(pnode, index, &next);
        self.update_strategy(
            rchild,
            pchild,
            &next,
            traverser,
            board,
            hands,
            indexers,
            rng,
            freeze_preflop,
        );
    }

    /// the current strategy at an infoset: the normalized average
    /// when φ has mass, the instantaneous regret-matching strategy
    /// otherwise
    pub fn frequency(&self, action: Action, state: &State, board: &Board, hand: &Hand) -> f64 {
        assert!(
            state.history().is_consistent(self.config.init_state.history()),
            "inconsistent histories:\nsolver: {}\nquery: {}",
            self.config.init_state.history(),
            state.history()
        );
        let suffix = state
            .history()
            .slice(self.config.init_state.history().len());
        let mut here = self.config.init_state.clone();
        let mut rnode = self.regrets.root();
        let mut pnode = self.phi.root();
        for step in &suffix {
            let actions = self.regrets.actions(rnode, &here);
            let index = actions
                .iter()
                .position(|a| a == step)
                .unwrap_or_else(|| panic!("action {} off the abstraction", step));
            let next = here.apply(*step);
            rnode = self.regrets.advance(rnode, index, &next);
            pnode = self.phi.advance(pnode, index, &next);
            here = next;
        }
        let actions = self.regrets.actions(rnode, &here);
        let index = match actions.iter().position(|a| *a == action) {
            Some(index) => index,
            None => return 0.0,
        };
        let mut indexer = CachedIndexer::new();
        let cluster = self
            .lookup
            .cluster(here.street(), hand, board, &mut indexer) as usize;
        let mass = load_row::<f32>(self.phi.row(pnode, &here, cluster));
        match normalized(&mass) {
            Some(sigma) => sigma[index],
            None => {
                let regrets = load_row::<Regret>(self.regrets.row(rnode, &here, cluster));
                regret_matching(&regrets)[index]
            }
        }
    }

    /// persist the average strategy with the config it belongs to.
    /// failures bubble up; the solver stays in its current state
    /// and no tree mutation is lost.
    pub fn snapshot(&self) -> Result<()> {
        std::fs::create_dir_all(&self.snapshot_dir)?;
        let t = self.iteration();
        let path = self.snapshot_dir.join(format!("phi_{:012}.bin", t));
        let file = std::fs::File::create(&path)
            .with_context(|| format!("create snapshot {}", path.display()))?;
        let mut writer = std::io::BufWriter::new(file);
        write_snapshot_header(&mut writer, &self.config, t)?;
        self.phi.save(&mut writer)?;
        log::info!("snapshot t={} -> {}", t, path.display());
        Ok(())
    }
}

/// snapshot framing: magic, version, config as length-prefixed
/// JSON, then the iteration counter. the storage walk follows.
pub const SNAPSHOT_MAGIC: u32 = 0x504c_4250; // "PLBP"
pub const SNAPSHOT_VERSION: u16 = 1;

pub fn write_snapshot_header<W: Write>(
    writer: &mut W,
    config: &SolverConfig,
    t: i64,
) -> Result<()> {
    use byteorder::WriteBytesExt;
    use byteorder::BE;
    writer.write_u32::<BE>(SNAPSHOT_MAGIC)?;
    writer.write_u16::<BE>(SNAPSHOT_VERSION)?;
    let json = serde_json::to_vec(config)?;
    writer.write_u64::<BE>(json.len() as u64)?;
    writer.write_all(&json)?;
    writer.write_i64::<BE>(t)?;
    Ok(())
}

pub fn read_snapshot_header<R: Read>(reader: &mut R) -> Result<(SolverConfig, i64)> {
    use byteorder::ReadBytesExt;
    use byteorder::BE;
    let magic = reader.read_u32::<BE>()?;
    anyhow::ensure!(magic == SNAPSHOT_MAGIC, "bad snapshot magic {:#x}", magic);
    let version = reader.read_u16::<BE>()?;
    anyhow::ensure!(
        version == SNAPSHOT_VERSION,
        "unsupported snapshot version {}",
        version
    );
    let len = reader.read_u64::<BE>()? as usize;
    let mut json = vec![0u8; len];
    reader.read_exact(&mut json)?;
    let config = serde_json::from_slice(&json)?;
    let t = reader.read_i64::<BE>()?;
    Ok((config, t))
}

use super::config::BlueprintConfig;
use super::config::SolverConfig;
use super::flat::FlatStorage;
use super::flat::HistoryMap;
use super::storage::Backing;
use super::strategy::load_row;
use super::strategy::normalized;
use super::strategy::regret_matching;
use super::strategy::sample_index;
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
use crate::Probability;
use crate::Regret;
use anyhow::Context;
use anyhow::Result;
use rand::rngs::SmallRng;
use rand::Rng;
use rand::SeedableRng;
use rayon::iter::IntoParallelIterator;
use rayon::iter::ParallelIterator;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::io::Read;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::lookup::BlueprintLookup;
    use crate::gameplay::profile::Profile;
    use crate::gameplay::rake::Rake;
    use crate::mccfr::config::DiscountSchedule;
    use crate::mccfr::config::PokerConfig;

    fn tiny_config() -> SolverConfig {
        let poker = PokerConfig {
            n_players: 2,
            n_chips: 400,
            ante: 0,
            straddle: false,
        };
        let profile = Profile::minimal(2);
        SolverConfig::new(poker, Rake::none(), profile).unwrap()
    }

    fn tiny_schedule() -> BlueprintConfig {
        BlueprintConfig {
            strategy_interval: 4,
            preflop_threshold: 1 << 40,
            snapshot_threshold: 1 << 40,
            snapshot_interval: 1 << 40,
            prune_thresh: 1 << 40,
            log_interval: 1 << 40,
            discount: DiscountSchedule {
                discount_interval: 16,
                lcfr_thresh: 48,
            },
        }
    }

    fn lookup() -> Arc<dyn ClusterLookup> {
        Arc::new(BlueprintLookup::trivial())
    }

    fn snapshot_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pluribot-solver-{}", tag));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn single_threaded<T: Send>(run: impl FnOnce() -> T + Send) -> T {
        rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(run)
    }

    #[test]
    fn single_worker_fixed_seed_reproduces() {
        let build = || {
            TreeBlueprintSolver::tree(tiny_config(), tiny_schedule(), lookup())
                .unwrap()
                .with_seed(42)
                .with_snapshot_dir(snapshot_dir("determinism"))
        };
        let s1 = build();
        let s2 = build();
        single_threaded(|| s1.solve(64)).unwrap();
        single_threaded(|| s2.solve(64)).unwrap();
        assert!(s1.state() == SolverState::Solved);
        assert!(s1.regrets() == s2.regrets());
        assert!(s1.phi() == s2.phi());
        assert!(s1.iteration() == 64);
    }

    #[test]
    fn frequencies_form_distributions() {
        let solver = TreeBlueprintSolver::tree(tiny_config(), tiny_schedule(), lookup())
            .unwrap()
            .with_seed(7)
            .with_snapshot_dir(snapshot_dir("frequency"));
        single_threaded(|| solver.solve(128)).unwrap();
        let state = solver.config().init_state.clone();
        let board = Board::empty();
        let hand = Hand::try_from("AcKd").unwrap();
        let actions = state.valid_actions(&solver.config().action_profile);
        let total = actions
            .iter()
            .map(|a| solver.frequency(*a, &state, &board, &hand))
            .inspect(|f| assert!((0.0..=1.0).contains(f)))
            .sum::<f64>();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn mapped_backend_trains() {
        let solver = MappedBlueprintSolver::mapped(tiny_config(), tiny_schedule(), lookup())
            .unwrap()
            .with_seed(3)
            .with_snapshot_dir(snapshot_dir("mapped"));
        single_threaded(|| solver.solve(32)).unwrap();
        assert!(solver.state() == SolverState::Solved);
        let state = solver.config().init_state.clone();
        let board = Board::empty();
        let hand = Hand::try_from("QsQh").unwrap();
        let f = solver.frequency(Action::Call, &state, &board, &hand);
        assert!((0.0..=1.0).contains(&f));
    }

    #[test]
    fn interrupt_between_batches() {
        let solver = TreeBlueprintSolver::tree(tiny_config(), tiny_schedule(), lookup())
            .unwrap()
            .with_snapshot_dir(snapshot_dir("interrupt"));
        solver.set_interrupt();
        single_threaded(|| solver.solve(1 << 20)).unwrap();
        assert!(solver.state() == SolverState::Interrupt);
        assert!(solver.iteration() == 0);
    }

    #[test]
    fn snapshot_header_round_trip() {
        let config = tiny_config();
        let mut buffer = Vec::new();
        write_snapshot_header(&mut buffer, &config, 12345).unwrap();
        let (loaded, t) = read_snapshot_header(&mut buffer.as_slice()).unwrap();
        assert!(t == 12345);
        assert!(loaded == config);
    }
}
