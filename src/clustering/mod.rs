pub mod emd;
pub mod indexer;
pub mod lookup;
pub mod ochs;
