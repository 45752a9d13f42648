/// a discrete abstract action.
///
/// bet sizings are pot fractions held in hundredths so that
/// equality and hashing are exact: Bet(75) is a three-quarter
/// pot bet. structural actions and the bias tags used by the
/// real-time solver are disjoint from any sizing.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    Undefined,
    Fold,
    Call,
    Bet(u16),
    AllIn,
    BiasFold,
    BiasCall,
    BiasRaise,
    BiasNone,
}

impl Action {
    /// a bet sized as a fraction of the pot
    pub fn bet(fraction: f64) -> Self {
        assert!(fraction > 0.0, "bet fraction must be positive");
        Self::Bet((fraction * 100.0).round() as u16)
    }
    pub fn fraction(&self) -> Option<f64> {
        match self {
            Self::Bet(centi) => Some(*centi as f64 / 100.0),
            _ => None,
        }
    }
    pub fn is_bet(&self) -> bool {
        matches!(self, Self::Bet(_))
    }
    pub fn is_aggro(&self) -> bool {
        matches!(self, Self::Bet(_) | Self::AllIn)
    }
    pub fn is_bias(&self) -> bool {
        matches!(
            self,
            Self::BiasFold | Self::BiasCall | Self::BiasRaise | Self::BiasNone
        )
    }
    pub const BIASES: [Self; crate::N_BIASES] = [
        Self::BiasFold,
        Self::BiasCall,
        Self::BiasRaise,
        Self::BiasNone,
    ];
}

/// u32 isomorphism, for wire and snapshot encoding
impl From<Action> for u32 {
    fn from(a: Action) -> u32 {
        match a {
            Action::Undefined => 0,
            Action::Fold => 1,
            Action::Call => 2,
            Action::AllIn => 3,
            Action::BiasFold => 4,
            Action::BiasCall => 5,
            Action::BiasRaise => 6,
            Action::BiasNone => 7,
            Action::Bet(centi) => 8 | ((centi as u32) << 3),
        }
    }
}
impl From<u32> for Action {
    fn from(n: u32) -> Action {
        match n {
            0 => Action::Undefined,
            1 => Action::Fold,
            2 => Action::Call,
            3 => Action::AllIn,
            4 => Action::BiasFold,
            5 => Action::BiasCall,
            6 => Action::BiasRaise,
            7 => Action::BiasNone,
            n if n & 8 != 0 => Action::Bet((n >> 3) as u16),
            n => panic!("no action for u32 {}", n),
        }
    }
}

impl TryFrom<&str> for Action {
    type Error = anyhow::Error;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "fold" => Ok(Self::Fold),
            "check" | "call" => Ok(Self::Call),
            "allin" | "all-in" => Ok(Self::AllIn),
            s if s.starts_with("bet") => Ok(Self::Bet(s[3..].trim().parse::<u16>()?)),
            s => Err(anyhow::anyhow!("invalid action string: {}", s)),
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Fold => write!(f, "fold"),
            Self::Call => write!(f, "call"),
            Self::Bet(centi) => write!(f, "bet{}", centi),
            Self::AllIn => write!(f, "allin"),
            Self::BiasFold => write!(f, "bias-fold"),
            Self::BiasCall => write!(f, "bias-call"),
            Self::BiasRaise => write!(f, "bias-raise"),
            Self::BiasNone => write!(f, "bias-none"),
        }
    }
}

use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::fmt::Formatter;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bijective_u32() {
        assert!([
            Action::Undefined,
            Action::Fold,
            Action::Call,
            Action::AllIn,
            Action::Bet(33),
            Action::Bet(75),
            Action::Bet(200),
            Action::BiasFold,
            Action::BiasCall,
            Action::BiasRaise,
            Action::BiasNone,
        ]
        .into_iter()
        .all(|a| a == Action::from(u32::from(a))));
    }

    #[test]
    fn sizings_are_exact() {
        assert!(Action::bet(0.75) == Action::Bet(75));
        assert!(Action::bet(0.75) == Action::bet(0.75));
        assert!(Action::bet(0.75) != Action::bet(0.80));
        assert!(Action::Bet(75).fraction() == Some(0.75));
    }
}
