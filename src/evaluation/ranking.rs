use crate::cards::rank::Rank;

/// a made hand's class, ordered weakest to strongest.
/// kicker cards break ties within a class.
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
pub enum Ranking {
    HighCard(Rank),        // 4 kickers
    OnePair(Rank),         // 3 kickers
    TwoPair(Rank, Rank),   // 1 kicker
    ThreeOAK(Rank),        // 2 kickers
    Straight(Rank),        // 0 kickers
    Flush(Rank),           // 0 kickers
    FullHouse(Rank, Rank), // 0 kickers
    FourOAK(Rank),         // 1 kicker
    StraightFlush(Rank),   // 0 kickers
}

impl Ranking {
    pub fn n_kickers(&self) -> usize {
        match self {
            Ranking::HighCard(_) => 4,
            Ranking::OnePair(_) => 3,
            Ranking::ThreeOAK(_) => 2,
            Ranking::FourOAK(_) | Ranking::TwoPair(_, _) => 1,
            _ => 0,
        }
    }
}

impl std::fmt::Display for Ranking {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Ranking::HighCard(r) => write!(f, "{} high", r),
            Ranking::OnePair(r) => write!(f, "pair of {}s", r),
            Ranking::TwoPair(hi, lo) => write!(f, "two pair {}s {}s", hi, lo),
            Ranking::ThreeOAK(r) => write!(f, "trip {}s", r),
            Ranking::Straight(r) => write!(f, "{} high straight", r),
            Ranking::Flush(r) => write!(f, "{} high flush", r),
            Ranking::FullHouse(t, p) => write!(f, "{}s full of {}s", t, p),
            Ranking::FourOAK(r) => write!(f, "quad {}s", r),
            Ranking::StraightFlush(r) => write!(f, "{} high straight flush", r),
        }
    }
}
