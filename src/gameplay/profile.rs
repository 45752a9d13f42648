/// the action abstraction: for every (street, bet level, seat,
/// in/out of position) the discrete menu of abstract actions,
/// plus per-seat isolation sizings used against a limp.
///
/// bet levels index how many bets/raises are already in on the
/// street; lookups clamp to the deepest configured level so a
/// 5-bet reuses the 4-bet menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    n_players: usize,
    // [street][bet level][seat][in position]
    slots: [Vec<Vec<[Vec<Action>; 2]>>; 4],
    // [seat][in position]
    isos: Vec<[Vec<Action>; 2]>,
}

impl Profile {
    pub fn new(n_players: usize) -> Self {
        assert!(n_players >= 2, "need at least two seats");
        let levels = crate::MAX_BET_LEVEL as usize + 1;
        let slot = vec![vec![[Vec::new(), Vec::new()]; n_players]; levels];
        Self {
            n_players,
            slots: [slot.clone(), slot.clone(), slot.clone(), slot],
            isos: vec![[Vec::new(), Vec::new()]; n_players],
        }
    }
    pub fn n_players(&self) -> usize {
        self.n_players
    }

    /// configure one slot for both position variants
    pub fn set_actions(&mut self, actions: &[Action], street: u8, level: u8, seat: usize) {
        self.set_positional(actions, street, level, seat, false);
        self.set_positional(actions, street, level, seat, true);
    }
    pub fn set_positional(
        &mut self,
        actions: &[Action],
        street: u8,
        level: u8,
        seat: usize,
        in_position: bool,
    ) {
        self.slots[street as usize][level as usize][seat][in_position as usize] =
            actions.to_vec();
    }
    pub fn add_action(&mut self, action: Action, street: u8, level: u8, seat: usize) {
        for ipos in 0..2 {
            let slot = &mut self.slots[street as usize][level as usize][seat][ipos];
            if !slot.contains(&action) {
                slot.push(action);
            }
        }
    }
    pub fn set_iso_actions(&mut self, actions: &[Action], seat: usize, in_position: bool) {
        self.isos[seat][in_position as usize] = actions.to_vec();
    }
    pub fn set_iso_actions_all(&mut self, actions: &[Action], in_position: bool) {
        for seat in 0..self.n_players {
            self.set_iso_actions(actions, seat, in_position);
        }
    }

    /// the configured menu, clamped down to the deepest non-empty level
    pub fn actions_at(&self, street: u8, level: u8, seat: usize, in_position: bool) -> &[Action] {
        let street = street.min(3) as usize;
        let mut level = (level as usize).min(crate::MAX_BET_LEVEL as usize);
        loop {
            let slot = &self.slots[street][level][seat][in_position as usize];
            if !slot.is_empty() || level == 0 {
                return slot;
            }
            level -= 1;
        }
    }
    /// isolation menu versus a limp
    pub fn iso_actions(&self, seat: usize, in_position: bool) -> &[Action] {
        &self.isos[seat][in_position as usize]
    }

    /// a reachable decision slot must always offer check/call and,
    /// when any bet is configured, the all-in escape hatch
    pub fn validate(&self) -> Result<()> {
        for street in 0..4u8 {
            for level in 0..=crate::MAX_BET_LEVEL {
                for seat in 0..self.n_players {
                    for ipos in [false, true] {
                        let slot = self.actions_at(street, level, seat, ipos);
                        if slot.is_empty() {
                            continue;
                        }
                        anyhow::ensure!(
                            slot.contains(&Action::Call) || slot.iter().all(Action::is_bias),
                            "check/call missing at street={} level={} seat={}",
                            street,
                            level,
                            seat
                        );
                        anyhow::ensure!(
                            !slot.iter().any(Action::is_bet) || slot.contains(&Action::AllIn),
                            "bets without all-in at street={} level={} seat={}",
                            street,
                            level,
                            seat
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

/// fold + check/call + the listed sizings + all-in
fn action_vec(sizings: &[f64], can_fold: bool) -> Vec<Action> {
    let mut actions = Vec::new();
    if can_fold {
        actions.push(Action::Fold);
    }
    actions.push(Action::Call);
    for size in sizings {
        actions.push(Action::bet(*size));
    }
    actions.push(Action::AllIn);
    actions
}

/// an evenly spaced ladder of sizings, inclusive of both ends
fn action_range(start: f64, end: f64, step: f64, can_fold: bool) -> Vec<Action> {
    assert!(step > 0.02, "action range step is too small");
    assert!(start < end, "invalid action range");
    let mut sizings = Vec::new();
    let mut size = start;
    while size + 0.001 < end {
        sizings.push(size);
        size += step;
    }
    sizings.push(end);
    action_vec(&sizings, can_fold)
}

fn single_size(size: f64, can_fold: bool) -> Vec<Action> {
    action_vec(&[size], can_fold)
}

impl Profile {
    /// heads-up blueprint abstraction
    pub fn heads_up(stack: Chips) -> Self {
        let mut p = Self::new(2);
        // preflop open
        for seat in 0..2 {
            p.set_actions(&action_vec(&[0.75], true), 0, 1, seat);
        }
        p.set_iso_actions_all(&action_range(1.00, 2.00, 0.50, true), false);
        p.set_iso_actions_all(&action_range(1.00, 2.00, 0.50, true), true);
        // preflop 3-bet
        for seat in 0..2 {
            p.set_actions(&action_range(1.00, 2.00, 0.25, true), 0, 2, seat);
            if stack < 10_000 {
                p.add_action(Action::bet(0.75), 0, 2, seat);
            }
        }
        // preflop 4-bet+
        for seat in 0..2 {
            p.set_actions(&action_range(0.60, 1.00, 0.10, true), 0, 3, seat);
            if stack < 10_000 {
                p.add_action(Action::bet(0.50), 0, 3, seat);
            }
        }
        for seat in 0..2 {
            // flop
            p.set_actions(&action_vec(&[0.16, 0.33, 0.50, 0.75, 1.00], false), 1, 0, seat);
            p.set_actions(&action_vec(&[0.50, 0.75, 1.00, 1.50], true), 1, 1, seat);
            // turn
            p.set_actions(&action_vec(&[0.50, 1.00, 1.50], false), 2, 0, seat);
            p.set_actions(&action_vec(&[0.50, 1.00, 1.50], true), 2, 1, seat);
            if stack < 10_000 {
                p.add_action(Action::bet(0.33), 2, 0, seat);
            }
            // river
            p.set_actions(&action_vec(&[0.50, 1.00, 1.50], false), 3, 0, seat);
            p.set_actions(&action_vec(&[0.50, 1.00, 1.50], true), 3, 1, seat);
            if stack < 7_500 {
                p.add_action(Action::bet(0.33), 3, 0, seat);
            }
        }
        p
    }

    /// ring game blueprint abstraction
    pub fn ring(n_players: usize) -> Self {
        let mut p = Self::new(n_players);
        // preflop opens: bigger from the blinds, smaller from late seats
        for seat in 0..2.min(n_players) {
            p.set_actions(&single_size(0.80, true), 0, 1, seat);
        }
        for seat in 2..n_players {
            p.set_actions(&single_size(0.60, true), 0, 1, seat);
        }
        p.set_iso_actions_all(&action_range(1.00, 2.00, 0.50, true), false);
        p.set_iso_actions_all(&action_vec(&[1.00, 1.50], true), true);
        // preflop 3-bet
        for seat in 0..2.min(n_players) {
            p.set_positional(&action_range(0.90, 1.90, 0.20, true), 0, 2, seat, false);
            p.set_positional(&action_range(0.60, 1.80, 0.20, true), 0, 2, seat, true);
        }
        for seat in 2..n_players {
            p.set_positional(&action_range(0.90, 1.90, 0.20, true), 0, 2, seat, false);
            p.set_positional(&action_range(0.60, 1.20, 0.20, true), 0, 2, seat, true);
        }
        // preflop 4-bet+
        for seat in 0..n_players {
            p.set_actions(&action_range(0.50, 1.20, 0.10, true), 0, 3, seat);
        }
        for seat in 0..n_players {
            // flop
            p.set_actions(&action_vec(&[0.33, 0.50, 0.75, 1.00], false), 1, 0, seat);
            p.set_actions(&action_vec(&[0.50, 0.75, 1.00], true), 1, 1, seat);
            // turn
            p.set_actions(&action_vec(&[0.50, 1.00], false), 2, 0, seat);
            p.set_actions(&action_vec(&[1.00], true), 2, 1, seat);
            // river
            p.set_actions(&action_vec(&[0.50, 1.00], false), 3, 0, seat);
            p.set_actions(&action_vec(&[1.00], true), 3, 1, seat);
        }
        p
    }

    /// smallest playable abstraction: fold, call, or shove at
    /// every node. fully enumerable, so it suits the dense
    /// history-mapped storage and exhaustive walks.
    pub fn minimal(n_players: usize) -> Self {
        let mut p = Self::new(n_players);
        let menu = action_vec(&[], true);
        for street in 0..4u8 {
            for level in 0..=crate::MAX_BET_LEVEL {
                for seat in 0..n_players {
                    p.set_actions(&menu, street, level, seat);
                }
            }
        }
        for seat in 0..n_players {
            p.set_iso_actions(&menu, seat, false);
            p.set_iso_actions(&menu, seat, true);
        }
        p
    }

    /// bias pseudo-actions offered during the real-time preflight
    pub fn bias(n_players: usize) -> Self {
        let mut p = Self::new(n_players);
        for street in 0..4u8 {
            for level in 0..=crate::MAX_BET_LEVEL {
                for seat in 0..n_players {
                    p.set_actions(&Action::BIASES, street, level, seat);
                }
            }
        }
        p
    }
}

use super::action::Action;
use crate::Chips;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_to_deepest_level() {
        let p = Profile::heads_up(10_000);
        let four_bet = p.actions_at(0, 3, 0, false).to_vec();
        let five_bet = p.actions_at(0, 4, 0, false).to_vec();
        assert!(!four_bet.is_empty());
        assert!(four_bet == five_bet);
    }

    #[test]
    fn families_validate() {
        assert!(Profile::heads_up(10_000).validate().is_ok());
        assert!(Profile::heads_up(5_000).validate().is_ok());
        assert!(Profile::ring(6).validate().is_ok());
        assert!(Profile::bias(6).validate().is_ok());
    }

    #[test]
    fn first_to_act_cannot_fold() {
        let p = Profile::heads_up(10_000);
        let flop_lead = p.actions_at(1, 0, 0, false);
        assert!(!flop_lead.contains(&Action::Fold));
        assert!(flop_lead.contains(&Action::Call));
        assert!(flop_lead.contains(&Action::AllIn));
    }
}
