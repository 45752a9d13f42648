/// a seat's chips and betting state within one hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    chips: Chips,
    bet: Chips,
    folded: bool,
    acted: bool,
}

impl Player {
    pub fn new(chips: Chips) -> Self {
        assert!(chips > 0, "seats must be funded");
        Self {
            chips,
            bet: 0,
            folded: false,
            acted: false,
        }
    }
    pub fn chips(&self) -> Chips {
        self.chips
    }
    pub fn bet(&self) -> Chips {
        self.bet
    }
    pub fn has_folded(&self) -> bool {
        self.folded
    }
    pub fn has_acted(&self) -> bool {
        self.acted
    }
    pub fn is_all_in(&self) -> bool {
        !self.folded && self.chips == 0
    }
    /// still holds cards and chips to bet with
    pub fn can_act(&self) -> bool {
        !self.folded && self.chips > 0
    }

    /// move chips into the current bet, clamped at stack
    pub fn invest(&mut self, amount: Chips) -> Chips {
        let amount = amount.min(self.chips);
        self.chips -= amount;
        self.bet += amount;
        amount
    }
    /// antes and blinds are posted without counting as an act
    pub fn post(&mut self, amount: Chips) -> Chips {
        self.invest(amount)
    }
    pub fn act(&mut self) {
        self.acted = true;
    }
    pub fn fold(&mut self) {
        assert!(!self.folded);
        self.folded = true;
        self.acted = true;
    }
    pub fn next_street(&mut self) {
        self.bet = 0;
        self.acted = false;
    }
}

use crate::Chips;
use serde::Deserialize;
use serde::Serialize;
