/// house rake: a percentage of the pot up to a cap,
/// charged only when the hand reaches the flop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rake {
    percent: f64,
    cap: f64,
}

impl Rake {
    pub fn new(percent: f64, cap: f64) -> Self {
        assert!((0.0..1.0).contains(&percent));
        assert!(cap >= 0.0);
        Self { percent, cap }
    }
    pub fn none() -> Self {
        Self {
            percent: 0.0,
            cap: 0.0,
        }
    }
    /// the pot net of rake
    pub fn payoff(&self, pot: Chips, round: u8) -> Chips {
        if round == 0 {
            pot
        } else {
            let raked = (pot as f64 * (1.0 - self.percent)).max(pot as f64 - self.cap);
            raked.round() as Chips
        }
    }
}

impl Default for Rake {
    fn default() -> Self {
        Self::none()
    }
}

use crate::Chips;
use serde::Deserialize;
use serde::Serialize;
