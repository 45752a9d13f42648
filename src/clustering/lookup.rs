/// maps a canonical hand index to its strategic cluster.
///
/// tables are trained offline (OCHS features, k-means under the
/// EMD metric) and consumed read-only here; lookups are injected
/// into solvers behind `Arc` and shared across workers.
pub trait ClusterLookup: Send + Sync {
    fn n_clusters(&self, street: Street) -> usize;
    fn cluster(
        &self,
        street: Street,
        hand: &Hand,
        board: &Board,
        indexer: &mut CachedIndexer,
    ) -> u16;
}

/// the blueprint map: one flat table per street.
///
/// a street with no table loaded falls back to reducing the
/// canonical index modulo the cluster count. that stand-in keeps
/// tests and smoke runs self-contained; production training loads
/// the offline tables.
#[derive(Debug, Clone)]
pub struct BlueprintLookup {
    tables: [Vec<u16>; crate::N_STREETS],
    counts: [u16; crate::N_STREETS],
}

impl BlueprintLookup {
    pub fn trivial() -> Self {
        Self {
            tables: [Vec::new(), Vec::new(), Vec::new(), Vec::new()],
            counts: [
                crate::N_HOLE_CLUSTERS as u16,
                crate::N_BOARD_CLUSTERS as u16,
                crate::N_BOARD_CLUSTERS as u16,
                crate::N_BOARD_CLUSTERS as u16,
            ],
        }
    }
    pub fn with_table(mut self, street: Street, table: Vec<u16>, count: u16) -> Self {
        self.tables[street as usize] = table;
        self.counts[street as usize] = count;
        self
    }

    pub fn load(path: &std::path::Path) -> Result<Self> {
        use byteorder::ReadBytesExt;
        use byteorder::BE;
        let file = std::fs::File::open(path)
            .with_context(|| format!("open cluster table {}", path.display()))?;
        let mut reader = std::io::BufReader::new(file);
        let mut this = Self::trivial();
        for street in 0..crate::N_STREETS {
            this.counts[street] = reader.read_u16::<BE>()?;
            let len = reader.read_u64::<BE>()? as usize;
            let mut table = Vec::with_capacity(len);
            for _ in 0..len {
                table.push(reader.read_u16::<BE>()?);
            }
            this.tables[street] = table;
        }
        Ok(this)
    }

    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        use byteorder::WriteBytesExt;
        use byteorder::BE;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create cluster table {}", path.display()))?;
        let mut writer = std::io::BufWriter::new(file);
        for street in 0..crate::N_STREETS {
            writer.write_u16::<BE>(self.counts[street])?;
            writer.write_u64::<BE>(self.tables[street].len() as u64)?;
            for cluster in self.tables[street].iter() {
                writer.write_u16::<BE>(*cluster)?;
            }
        }
        Ok(())
    }
}

impl ClusterLookup for BlueprintLookup {
    fn n_clusters(&self, street: Street) -> usize {
        self.counts[street as usize] as usize
    }
    fn cluster(
        &self,
        street: Street,
        hand: &Hand,
        board: &Board,
        indexer: &mut CachedIndexer,
    ) -> u16 {
        let index = indexer.index(hand, board, street);
        let table = &self.tables[street as usize];
        if table.is_empty() {
            (index % self.counts[street as usize] as u64) as u16
        } else {
            table[index as usize]
        }
    }
}

/// the real-time map, partitioned by isomorphic flop class to
/// shrink the resident footprint: each class carries one sparse
/// table per street.
#[derive(Debug, Clone)]
pub struct RealTimeLookup {
    classes: Vec<[HashMap<u64, u16>; crate::N_STREETS]>,
    counts: [u16; crate::N_STREETS],
}

impl RealTimeLookup {
    pub fn trivial() -> Self {
        Self {
            classes: Vec::new(),
            counts: [
                crate::N_HOLE_CLUSTERS as u16,
                crate::N_BOARD_CLUSTERS as u16,
                crate::N_BOARD_CLUSTERS as u16,
                crate::N_BOARD_CLUSTERS as u16,
            ],
        }
    }
    pub fn insert(&mut self, class: usize, street: Street, index: u64, cluster: u16) {
        if self.classes.len() <= class {
            self.classes.resize_with(class + 1, Default::default);
        }
        self.classes[class][street as usize].insert(index, cluster);
    }
    /// flops partition into isomorphism classes; the stand-in
    /// reduces the flop's colex rank modulo the class count
    pub fn flop_class(board: &Board) -> usize {
        assert!(board.n() >= 3, "flop not dealt");
        let mask = board
            .street_cards(Street::Flop)
            .iter()
            .map(|c| c.mask())
            .fold(0u64, |m, c| m | c);
        (mask % crate::N_ISO_FLOPS as u64) as usize
    }
}

impl ClusterLookup for RealTimeLookup {
    fn n_clusters(&self, street: Street) -> usize {
        self.counts[street as usize] as usize
    }
    fn cluster(
        &self,
        street: Street,
        hand: &Hand,
        board: &Board,
        indexer: &mut CachedIndexer,
    ) -> u16 {
        let index = indexer.index(hand, board, street);
        let fallback = (index % self.counts[street as usize] as u64) as u16;
        if street == Street::Pref || board.n() < 3 {
            return fallback;
        }
        let class = Self::flop_class(board);
        self.classes
            .get(class)
            .and_then(|tables| tables[street as usize].get(&index))
            .copied()
            .unwrap_or(fallback)
    }
}

use super::indexer::CachedIndexer;
use crate::cards::board::Board;
use crate::cards::hand::Hand;
use crate::cards::street::Street;
use anyhow::Context;
use anyhow::Result;
use std::collections::HashMap;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::indexer::Indexer;

    #[test]
    fn trivial_lookup_in_range() {
        let lookup = BlueprintLookup::trivial();
        let board = Board::try_from("2h3h4c5d9s").unwrap();
        let hand = Hand::try_from("AcKd").unwrap();
        let mut indexer = CachedIndexer::new();
        for street in Street::all() {
            let cluster = lookup.cluster(*street, &hand, &board, &mut indexer);
            assert!((cluster as usize) < lookup.n_clusters(*street));
        }
    }

    #[test]
    fn table_roundtrip() {
        let dir = std::env::temp_dir().join("pluribot-lookup-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("clusters.bin");
        let table = (0..crate::N_COMBOS).map(|i| (i % 169) as u16).collect();
        let saved = BlueprintLookup::trivial().with_table(Street::Pref, table, 169);
        saved.save(&path).unwrap();
        let loaded = BlueprintLookup::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        let board = Board::empty();
        let hand = Hand::try_from("AcKd").unwrap();
        let mut i1 = CachedIndexer::new();
        let mut i2 = CachedIndexer::new();
        assert!(
            saved.cluster(Street::Pref, &hand, &board, &mut i1)
                == loaded.cluster(Street::Pref, &hand, &board, &mut i2)
        );
    }

    #[test]
    fn real_time_partition() {
        let mut lookup = RealTimeLookup::trivial();
        let board = Board::try_from("2h3h4c").unwrap();
        let hand = Hand::try_from("AcKd").unwrap();
        let mut indexer = CachedIndexer::new();
        let class = RealTimeLookup::flop_class(&board);
        let index = Indexer::index(&hand, &board, Street::Flop);
        lookup.insert(class, Street::Flop, index, 7);
        assert!(lookup.cluster(Street::Flop, &hand, &board, &mut indexer) == 7);
    }
}
