/// the full-precision blueprint: averaged strategy mass over the
/// snapshots taken past the threshold, with the config they were
/// trained under. queries normalize per infoset, so summing
/// snapshots is averaging.
pub struct LosslessBlueprint {
    config: SolverConfig,
    t: i64,
    strategy: TreeStorage<f32>,
    lookup: Arc<dyn ClusterLookup>,
}

impl LosslessBlueprint {
    /// combine snapshots into the final artifact. configs must
    /// match; shapes graft where a later snapshot explored further.
    pub fn build(paths: &[PathBuf], lookup: Arc<dyn ClusterLookup>) -> Result<Self> {
        anyhow::ensure!(!paths.is_empty(), "no snapshots to build from");
        let (config, t, strategy) = Self::read(&paths[0], &lookup)?;
        for path in &paths[1..] {
            let (other_config, _, other) = Self::read(path, &lookup)?;
            anyhow::ensure!(
                other_config == config,
                "snapshot {} was trained under a different config",
                path.display()
            );
            strategy.absorb(&other);
        }
        log::info!("blueprint built from {} snapshots", paths.len());
        Ok(Self {
            config,
            t,
            strategy,
            lookup,
        })
    }

    fn read(
        path: &PathBuf,
        lookup: &Arc<dyn ClusterLookup>,
    ) -> Result<(SolverConfig, i64, TreeStorage<f32>)> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("open snapshot {}", path.display()))?;
        let mut reader = std::io::BufReader::new(file);
        let (config, t) = read_snapshot_header(&mut reader)?;
        let tree = TreeStorage::load(&mut reader, tree_config(&config, lookup))?;
        Ok((config, t, tree))
    }

    pub fn save(&self, path: &PathBuf) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("create blueprint {}", path.display()))?;
        let mut writer = std::io::BufWriter::new(file);
        write_snapshot_header(&mut writer, &self.config, self.t)?;
        self.strategy.save(&mut writer)?;
        Ok(())
    }
    pub fn load(path: &PathBuf, lookup: Arc<dyn ClusterLookup>) -> Result<Self> {
        let (config, t, strategy) = Self::read(path, &lookup)?;
        Ok(Self {
            config,
            t,
            strategy,
            lookup,
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
    pub fn strategy(&self) -> &TreeStorage<f32> {
        &self.strategy
    }
    pub fn iteration(&self) -> i64 {
        self.t
    }

    /// the averaged strategy at an infoset; uniform where the
    /// average never accumulated mass
    pub fn policy(&self, state: &State, board: &Board, hand: &Hand) -> (Vec<Action>, Vec<f64>) {
        let suffix = state
            .history()
            .slice(self.config.init_state.history().len());
        let path = suffix
            .actions()
            .iter()
            .copied()
            .filter(|a| !a.is_bias())
            .collect::<Vec<Action>>();
        let actions = state.valid_actions(&self.config.action_profile);
        match self.strategy.descend(&path) {
            None => {
                let uniform = vec![1.0 / actions.len() as f64; actions.len()];
                (actions, uniform)
            }
            Some(node) => {
                let mut indexer = CachedIndexer::new();
                let cluster =
                    self.lookup
                        .cluster(state.street(), hand, board, &mut indexer) as usize;
                let mass = load_row::<f32>(node.row(cluster));
                let sigma = normalized(&mass)
                    .unwrap_or_else(|| vec![1.0 / mass.len() as f64; mass.len()]);
                (node.actions().to_vec(), sigma)
            }
        }
    }

    pub fn frequency(&self, action: Action, state: &State, board: &Board, hand: &Hand) -> f64 {
        let (actions, sigma) = self.policy(state, board, hand);
        actions
            .iter()
            .position(|a| *a == action)
            .map(|i| sigma[i])
            .unwrap_or(0.0)
    }

    pub fn sample_action<R: Rng>(
        &self,
        state: &State,
        board: &Board,
        hand: &Hand,
        rng: &mut R,
    ) -> Action {
        let (actions, sigma) = self.policy(state, board, hand);
        actions[sample_index(&sigma, rng)]
    }
}

/// the sampled blueprint: every (infoset x bias offset) collapses
/// to a single byte indexing the node's local action set. built
/// once from the lossless blueprint and used for leaf rollouts in
/// real-time solving, where memory and lookup cost dominate.
pub struct SampledBlueprint {
    config: SolverConfig,
    strategy: TreeStorage<u8>,
    lookup: Arc<dyn ClusterLookup>,
}

impl SampledBlueprint {
    pub fn from_lossless(blueprint: &LosslessBlueprint, seed: u64) -> Self {
        let config = blueprint.config.clone();
        let lookup = blueprint.lookup.clone();
        let shape = {
            let lookup = lookup.clone();
            let profile = config.action_profile.clone();
            Arc::new(TreeConfig {
                clusters: Box::new(move |state: &State| lookup.n_clusters(state.street())),
                actions: Box::new(move |state: &State| state.valid_actions(&profile)),
                width: Some(crate::N_BIASES),
            })
        };
        let strategy = TreeStorage::new(&config.init_state, shape);
        let mut rng = SmallRng::seed_from_u64(seed);
        Self::compress(
            &blueprint.strategy,
            &strategy,
            &config.init_state,
            &mut rng,
        );
        Self {
            config,
            strategy,
            lookup,
        }
    }

    /// walk the lossless tree, sampling one action per bucket and
    /// bias from the bias-tilted average strategy
    fn compress(
        source: &TreeStorage<f32>,
        target: &TreeStorage<u8>,
        state: &State,
        rng: &mut SmallRng,
    ) {
        let actions = source.actions();
        for cluster in 0..source.n_clusters() {
            let mass = load_row::<f32>(source.row(cluster));
            let sigma = normalized(&mass)
                .unwrap_or_else(|| vec![1.0 / mass.len() as f64; mass.len()]);
            for (offset, bias) in Action::BIASES.iter().enumerate() {
                let tilted = Self::tilt(&sigma, actions, *bias);
                let choice = sample_index(&tilted, rng) as u8;
                u8::store(target.cell(cluster, offset), choice);
            }
        }
        for (index, action) in actions.iter().enumerate() {
            if let Some(child) = source.child(index) {
                let next = state.apply(*action);
                let mirror = target.apply_index(index, &next);
                Self::compress(child, mirror, &next, rng);
            }
        }
    }

    /// multiply the bias's action class and renormalize
    fn tilt(sigma: &[f64], actions: &[Action], bias: Action) -> Vec<f64> {
        let tilted = sigma
            .iter()
            .zip(actions.iter())
            .map(|(weight, action)| {
                let matched = match bias {
                    Action::BiasFold => *action == Action::Fold,
                    Action::BiasCall => *action == Action::Call,
                    Action::BiasRaise => action.is_aggro(),
                    _ => false,
                };
                if matched {
                    weight * crate::BIAS_FACTOR
                } else {
                    *weight
                }
            })
            .collect::<Vec<f64>>();
        let total = tilted.iter().sum::<f64>();
        tilted.into_iter().map(|w| w / total).collect()
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
    pub fn bias_offset(bias: Action) -> usize {
        Action::BIASES
            .iter()
            .position(|b| *b == bias)
            .unwrap_or(crate::N_BIASES - 1)
    }

    /// the blueprint's move for this seat under its bias; falls
    /// back to uniform off the explored tree
    pub fn next_action<R: Rng>(
        &self,
        state: &State,
        board: &Board,
        hand: &Hand,
        bias: Action,
        indexer: &mut CachedIndexer,
        rng: &mut R,
    ) -> Action {
        let suffix = state
            .history()
            .slice(self.config.init_state.history().len());
        let path = suffix
            .actions()
            .iter()
            .copied()
            .filter(|a| !a.is_bias())
            .collect::<Vec<Action>>();
        let actions = state.valid_actions(&self.config.action_profile);
        match self.strategy.descend(&path) {
            None => actions[rng.random_range(0..actions.len())],
            Some(node) => {
                let cluster =
                    self.lookup.cluster(state.street(), hand, board, indexer) as usize;
                let byte = u8::load(node.cell(cluster, Self::bias_offset(bias)));
                node.actions()
                    .get(byte as usize)
                    .copied()
                    .unwrap_or(actions[0])
            }
        }
    }
}

use super::config::SolverConfig;
use super::solver::read_snapshot_header;
use super::solver::tree_config;
use super::solver::write_snapshot_header;
use super::strategy::load_row;
use super::strategy::normalized;
use super::strategy::sample_index;
use super::tree::TreeConfig;
use super::tree::TreeStorage;
use super::value::Value;
use crate::cards::board::Board;
use crate::cards::hand::Hand;
use crate::clustering::indexer::CachedIndexer;
use crate::clustering::lookup::ClusterLookup;
use crate::gameplay::action::Action;
use crate::gameplay::state::State;
use anyhow::Context;
use anyhow::Result;
use rand::rngs::SmallRng;
use rand::Rng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::lookup::BlueprintLookup;
    use crate::gameplay::profile::Profile;
    use crate::gameplay::rake::Rake;
    use crate::mccfr::config::BlueprintConfig;
    use crate::mccfr::config::DiscountSchedule;
    use crate::mccfr::config::PokerConfig;
    use crate::mccfr::solver::TreeBlueprintSolver;

    fn trained_solver(dir: &str) -> TreeBlueprintSolver {
        let poker = PokerConfig {
            n_players: 2,
            n_chips: 400,
            ante: 0,
            straddle: false,
        };
        let config = SolverConfig::new(poker, Rake::none(), Profile::minimal(2)).unwrap();
        let schedule = BlueprintConfig {
            strategy_interval: 2,
            preflop_threshold: 1 << 40,
            snapshot_threshold: 32,
            snapshot_interval: 32,
            prune_thresh: 1 << 40,
            log_interval: 1 << 40,
            discount: DiscountSchedule {
                discount_interval: 16,
                lcfr_thresh: 48,
            },
        };
        let lookup: Arc<dyn ClusterLookup> = Arc::new(BlueprintLookup::trivial());
        let path = std::env::temp_dir().join(format!("pluribot-bp-{}", dir));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(&path).unwrap();
        TreeBlueprintSolver::tree(config, schedule, lookup)
            .unwrap()
            .with_seed(11)
            .with_snapshot_dir(path)
    }

    fn snapshots(dir: &std::path::Path) -> Vec<PathBuf> {
        let mut paths = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect::<Vec<PathBuf>>();
        paths.sort();
        paths
    }

    #[test]
    fn build_averages_snapshots() {
        let solver = trained_solver("build");
        rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(|| solver.solve(96))
            .unwrap();
        let dir = std::env::temp_dir().join("pluribot-bp-build");
        let paths = snapshots(&dir);
        assert!(paths.len() >= 2); // threshold, interval, and final
        let lookup: Arc<dyn ClusterLookup> = Arc::new(BlueprintLookup::trivial());
        let blueprint = LosslessBlueprint::build(&paths, lookup).unwrap();
        let state = blueprint.config().init_state.clone();
        let board = Board::empty();
        let hand = Hand::try_from("AcKd").unwrap();
        let (actions, sigma) = blueprint.policy(&state, &board, &hand);
        assert!(actions.len() == sigma.len());
        assert!((sigma.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sampled_blueprint_compresses() {
        let solver = trained_solver("sampled");
        rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(|| solver.solve(64))
            .unwrap();
        let dir = std::env::temp_dir().join("pluribot-bp-sampled");
        let paths = snapshots(&dir);
        let lookup: Arc<dyn ClusterLookup> = Arc::new(BlueprintLookup::trivial());
        let blueprint = LosslessBlueprint::build(&paths, lookup).unwrap();
        let sampled = SampledBlueprint::from_lossless(&blueprint, 5);
        let state = sampled.config().init_state.clone();
        let board = Board::empty();
        let hand = Hand::try_from("AcKd").unwrap();
        let mut indexer = CachedIndexer::new();
        let mut rng = SmallRng::seed_from_u64(0);
        for bias in Action::BIASES {
            let action = sampled.next_action(&state, &board, &hand, bias, &mut indexer, &mut rng);
            assert!(state
                .valid_actions(&sampled.config().action_profile)
                .contains(&action));
        }
    }

    #[test]
    fn bias_tilt_favors_matching_class() {
        let actions = vec![Action::Fold, Action::Call, Action::AllIn];
        let sigma = vec![1.0 / 3.0; 3];
        let tilted = SampledBlueprint::tilt(&sigma, &actions, Action::BiasFold);
        assert!(tilted[0] > tilted[1]);
        assert!((tilted.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        let none = SampledBlueprint::tilt(&sigma, &actions, Action::BiasNone);
        assert!((none[0] - none[2]).abs() < 1e-9);
    }
}
