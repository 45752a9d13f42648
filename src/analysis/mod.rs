pub mod ev;
pub mod simulate;
