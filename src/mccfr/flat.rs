/// dense index over every action history reachable under a
/// profile, built ahead of time by exhaustive enumeration.
///
/// only usable when the abstraction is enumerable up front (in
/// practice: preflop-only blueprints, where the dense layout wins
/// on cache locality); deep games explode combinatorially and take
/// the tree backend instead.
#[derive(Debug, Default)]
pub struct HistoryMap {
    offsets: HashMap<History, (u64, u32)>,
    n_cells: u64,
}

impl HistoryMap {
    /// walk every reachable decision node up to and including
    /// `max_round`, assigning each history a cell block of
    /// `n_clusters x n_actions`
    pub fn build(config: &SolverConfig, lookup: &dyn ClusterLookup, max_round: u8) -> Self {
        let mut map = Self::default();
        map.collect(&config.init_state, config, lookup, max_round);
        map
    }
    fn collect(
        &mut self,
        state: &State,
        config: &SolverConfig,
        lookup: &dyn ClusterLookup,
        max_round: u8,
    ) {
        if state.is_terminal() || state.round() > max_round {
            return;
        }
        let actions = state.valid_actions(&config.action_profile);
        let clusters = lookup.n_clusters(state.street()) as u64;
        self.offsets.insert(
            state.history().clone(),
            (self.n_cells, actions.len() as u32),
        );
        self.n_cells += clusters * actions.len() as u64;
        for action in actions {
            self.collect(&state.apply(action), config, lookup, max_round);
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
    pub fn n_cells(&self) -> u64 {
        self.n_cells
    }
    /// indexing an unknown history is an invariant violation
    pub fn offset(&self, history: &History) -> (u64, u32) {
        *self
            .offsets
            .get(history)
            .unwrap_or_else(|| panic!("unknown action history: {}", history))
    }
}

/// count distinct infosets reachable under the profile
pub fn count_infosets(config: &SolverConfig, lookup: &dyn ClusterLookup, max_round: u8) -> u64 {
    count(&config.init_state, config, lookup, max_round, true)
}
/// count distinct action sets reachable under the profile
pub fn count_actionsets(config: &SolverConfig, max_round: u8) -> u64 {
    count(
        &config.init_state,
        config,
        &BlueprintLookup::trivial(),
        max_round,
        false,
    )
}
fn count(
    state: &State,
    config: &SolverConfig,
    lookup: &dyn ClusterLookup,
    max_round: u8,
    infosets: bool,
) -> u64 {
    if state.is_terminal() || state.round() > max_round {
        return 0;
    }
    let here = if infosets {
        lookup.n_clusters(state.street()) as u64
    } else {
        1
    };
    here + state
        .valid_actions(&config.action_profile)
        .iter()
        .map(|a| count(&state.apply(*a), config, lookup, max_round, infosets))
        .sum::<u64>()
}

/// flat storage: one contiguous array of atomic cells addressed
/// through the history map. growth never happens at traversal
/// time, so the hot path is a hash lookup plus an offset.
pub struct FlatStorage<V: Value> {
    cells: Box<[V::Atomic]>,
    map: Arc<HistoryMap>,
    profile: Arc<Profile>,
}

impl<V: Value> FlatStorage<V> {
    pub fn new(map: Arc<HistoryMap>, profile: Arc<Profile>) -> Self {
        Self {
            cells: (0..map.n_cells()).map(|_| V::zero()).collect(),
            map,
            profile,
        }
    }
    pub fn map(&self) -> &HistoryMap {
        &self.map
    }
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }
    pub fn row_at(&self, state: &State, cluster: usize) -> &[V::Atomic] {
        let (offset, n_actions) = self.map.offset(state.history());
        let base = offset as usize + cluster * n_actions as usize;
        &self.cells[base..base + n_actions as usize]
    }

    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u64::<BE>(self.cells.len() as u64)?;
        for cell in self.cells.iter() {
            V::write(writer, V::load(cell))?;
        }
        Ok(())
    }
    pub fn load<R: Read>(
        reader: &mut R,
        map: Arc<HistoryMap>,
        profile: Arc<Profile>,
    ) -> Result<Self> {
        let n = reader.read_u64::<BE>()?;
        anyhow::ensure!(
            n == map.n_cells(),
            "flat storage holds {} cells but the history map wants {}",
            n,
            map.n_cells()
        );
        let this = Self::new(map, profile);
        for cell in this.cells.iter() {
            V::store(cell, V::read(reader)?);
        }
        Ok(this)
    }
}

impl<V: Value> Backing<V> for FlatStorage<V> {
    type Node<'a>
        = ()
    where
        Self: 'a;

    fn root<'a>(&'a self) -> Self::Node<'a> {}
    fn advance<'a>(&'a self, _: Self::Node<'a>, _: usize, _: &State) -> Self::Node<'a> {}
    fn actions<'a>(&'a self, _: Self::Node<'a>, state: &State) -> Vec<Action> {
        state.valid_actions(&self.profile)
    }
    fn row<'a>(&'a self, _: Self::Node<'a>, state: &State, cluster: usize) -> &'a [V::Atomic] {
        self.row_at(state, cluster)
    }
    fn discount(&self, factor: f64) {
        for cell in self.cells.iter() {
            V::scale(cell, factor);
        }
    }
    fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        FlatStorage::save(self, writer)
    }
}

use super::storage::Backing;
use super::value::Value;
use crate::clustering::lookup::BlueprintLookup;
use crate::clustering::lookup::ClusterLookup;
use crate::gameplay::action::Action;
use crate::gameplay::history::History;
use crate::gameplay::profile::Profile;
use crate::gameplay::state::State;
use crate::mccfr::config::SolverConfig;
use anyhow::Result;
use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;
use byteorder::BE;
use std::collections::HashMap;
use std::io::Read;
use std::io::Write;
use std::sync::Arc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mccfr::config::PokerConfig;
    use crate::gameplay::rake::Rake;

    fn preflop_setup() -> (SolverConfig, BlueprintLookup) {
        let poker = PokerConfig::default();
        let profile = Profile::heads_up(poker.n_chips);
        let config = SolverConfig::new(poker, Rake::none(), profile).unwrap();
        (config, BlueprintLookup::trivial())
    }

    #[test]
    fn preflop_map_is_enumerable() {
        let (config, lookup) = preflop_setup();
        let map = HistoryMap::build(&config, &lookup, 0);
        assert!(!map.is_empty());
        assert!(map.n_cells() > 0);
        // root is indexed at offset zero
        let (offset, n_actions) = map.offset(config.init_state.history());
        assert!(offset == 0);
        assert!(n_actions as usize == config.init_state.valid_actions(&config.action_profile).len());
    }

    #[test]
    fn counting_matches_map() {
        let (config, lookup) = preflop_setup();
        let map = HistoryMap::build(&config, &lookup, 0);
        assert!(count_actionsets(&config, 0) == map.len() as u64);
        assert!(count_infosets(&config, &lookup, 0) >= map.len() as u64);
    }

    #[test]
    fn rows_are_disjoint_per_cluster() {
        let (config, lookup) = preflop_setup();
        let map = Arc::new(HistoryMap::build(&config, &lookup, 0));
        let profile = Arc::new(config.action_profile.clone());
        let storage = FlatStorage::<i32>::new(map, profile);
        let state = &config.init_state;
        let r0 = storage.row_at(state, 0).as_ptr();
        let r1 = storage.row_at(state, 1).as_ptr();
        assert!(r0 != r1);
    }

    #[test]
    fn save_load_round_trip() {
        use crate::mccfr::value::Value;
        let (config, lookup) = preflop_setup();
        let map = Arc::new(HistoryMap::build(&config, &lookup, 0));
        let profile = Arc::new(config.action_profile.clone());
        let storage = FlatStorage::<i32>::new(map.clone(), profile.clone());
        i32::store(&storage.row_at(&config.init_state, 5)[1], 1234);
        let mut buffer = Vec::new();
        storage.save(&mut buffer).unwrap();
        let loaded = FlatStorage::<i32>::load(&mut buffer.as_slice(), map, profile).unwrap();
        assert!(i32::load(&loaded.row_at(&config.init_state, 5)[1]) == 1234);
    }
}
