/// the full public state of one hand.
///
/// immutable: `apply` returns the successor state and the driver
/// assigns. seats are ordered small blind first (heads-up: big
/// blind first) with the button last, so the postflop order of
/// action is ascending seat index over unfolded seats.
///
/// `round` runs 0..=3 for the streets and reaches 4 at showdown;
/// a hand that ends by folding keeps its round and records the
/// winner instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    players: Vec<Player>,
    biases: Vec<Action>,
    history: History,
    pot: Chips,
    max_bet: Chips,
    active: u8,
    round: u8,
    bet_level: u8,
    winner: i8,
    straddle: bool,
}

impl State {
    pub fn new(n_players: usize, chips: Chips, ante: Chips, straddle: bool) -> Self {
        Self::with_stacks(&vec![chips; n_players], ante, straddle)
    }

    pub fn with_stacks(stacks: &[Chips], ante: Chips, straddle: bool) -> Self {
        let n = stacks.len();
        assert!(n >= 2, "need at least two seats");
        let mut this = Self {
            players: stacks.iter().map(|c| Player::new(*c)).collect(),
            biases: Vec::new(),
            history: History::new(),
            pot: 0,
            max_bet: 0,
            active: 0,
            round: 0,
            bet_level: 0,
            winner: -1,
            straddle: straddle && n > 2,
        };
        this.post_antes(ante);
        this.post_blinds();
        // stacks swallowed by the forced bets run out to showdown
        if this.betting_closed() {
            this.next_round();
        }
        this
    }

    fn post_antes(&mut self, ante: Chips) {
        for player in self.players.iter_mut() {
            self.pot += player.post(ante);
            player.next_street(); // antes are not live bets
        }
    }
    /// heads-up the button posts the small blind and acts first;
    /// ring games seat the small blind at 0 and open from UTG
    fn post_blinds(&mut self) {
        let n = self.players.len();
        let (sb, bb) = if n == 2 { (1, 0) } else { (0, 1) };
        self.pot += self.players[sb].post(crate::S_BLIND);
        self.pot += self.players[bb].post(crate::B_BLIND);
        self.max_bet = self.players[bb].bet();
        if self.straddle {
            self.pot += self.players[2].post(2 * crate::B_BLIND);
            self.max_bet = self.max_bet.max(self.players[2].bet());
        }
        self.bet_level = 1;
        self.active = match (n, self.straddle) {
            (2, _) => 1,
            (_, false) => 2 % n as u8,
            (_, true) => 3 % n as u8,
        };
    }

    //

    pub fn players(&self) -> &[Player] {
        &self.players
    }
    pub fn n_players(&self) -> usize {
        self.players.len()
    }
    pub fn history(&self) -> &History {
        &self.history
    }
    pub fn biases(&self) -> &[Action] {
        &self.biases
    }
    pub fn pot(&self) -> Chips {
        self.pot
    }
    pub fn max_bet(&self) -> Chips {
        self.max_bet
    }
    pub fn active(&self) -> usize {
        self.active as usize
    }
    pub fn round(&self) -> u8 {
        self.round
    }
    pub fn street(&self) -> Street {
        Street::from(self.round.min(3))
    }
    pub fn bet_level(&self) -> u8 {
        self.bet_level
    }
    pub fn winner(&self) -> i8 {
        self.winner
    }
    pub fn is_straddle(&self) -> bool {
        self.straddle
    }
    pub fn is_terminal(&self) -> bool {
        self.winner != -1 || self.round >= crate::N_STREETS as u8
    }
    pub fn active_players(&self) -> usize {
        self.players.iter().filter(|p| !p.has_folded()).count()
    }
    /// unfolded seats still not all-in this street: limpers, per
    /// the isolation-raise menu
    pub fn limpers(&self) -> usize {
        if self.round != 0 || self.bet_level != 1 {
            return 0;
        }
        let bb = if self.players.len() == 2 { 0 } else { 1 };
        self.players
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != bb && !(self.straddle && *i == 2))
            .filter(|(_, p)| !p.has_folded() && p.has_acted())
            .filter(|(_, p)| p.bet() > 0 && p.bet() == self.max_bet)
            .count()
    }
    /// last unfolded seat closes the action postflop
    pub fn is_in_position(&self, seat: usize) -> bool {
        self.players
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.has_folded())
            .map(|(i, _)| i)
            .max()
            == Some(seat)
    }

    //

    /// the chip total a sizing action would bring the actor's bet to.
    /// pot fractions are measured on the pot after the call is
    /// notionally paid.
    pub fn total_bet_size(&self, action: Action) -> Chips {
        let actor = &self.players[self.active as usize];
        match action {
            Action::Fold => actor.bet(),
            Action::Call => self.max_bet.min(actor.bet() + actor.chips()),
            Action::AllIn => actor.bet() + actor.chips(),
            Action::Bet(_) => {
                let f = action.fraction().expect("sizing action");
                let call = self.max_bet - actor.bet();
                let pot_after_call = self.pot + call;
                self.max_bet + (f * pot_after_call as f64).round() as Chips
            }
            _ => panic!("no chip total for {}", action),
        }
    }
    /// inverse of `total_bet_size` for sizings
    pub fn fractional_bet_size(&self, total: Chips) -> f64 {
        let actor = &self.players[self.active as usize];
        let call = self.max_bet - actor.bet();
        let pot_after_call = self.pot + call;
        (total - self.max_bet) as f64 / pot_after_call as f64
    }

    /// the legal abstract menu at this node: the profile's slot
    /// filtered for legality. bias nodes pass the bias menu through.
    pub fn valid_actions(&self, profile: &Profile) -> Vec<Action> {
        assert!(!self.is_terminal(), "no actions at terminal state");
        if self.in_bias_phase() {
            let seat = self.active as usize;
            return profile
                .actions_at(self.round, 0, seat, self.is_in_position(seat))
                .to_vec();
        }
        let seat = self.active as usize;
        let actor = &self.players[seat];
        let facing = self.max_bet > actor.bet();
        let to_call = self.max_bet - actor.bet();
        // calling would put the actor all-in: no raise is possible
        if to_call >= actor.chips() {
            return vec![Action::Fold, Action::Call];
        }
        // the betting war is capped: at the deepest level the menu
        // collapses to fold, call, or shove
        if self.bet_level >= crate::MAX_BET_LEVEL {
            return if facing {
                vec![Action::Fold, Action::Call, Action::AllIn]
            } else {
                vec![Action::Call, Action::AllIn]
            };
        }
        let slot = if self.round == 0 && self.bet_level == 1 && self.limpers() > 0 {
            profile.iso_actions(seat, self.is_in_position(seat))
        } else {
            profile.actions_at(self.round, self.bet_level, seat, self.is_in_position(seat))
        };
        let mut actions = Vec::with_capacity(slot.len());
        for action in slot {
            match action {
                Action::Fold if !facing => continue,
                Action::Bet(_) => {
                    let total = self.total_bet_size(*action);
                    if total <= self.max_bet {
                        continue; // would not raise
                    }
                    if total >= actor.bet() + actor.chips() {
                        continue; // collapses into all-in
                    }
                    actions.push(*action);
                }
                a => {
                    if !actions.contains(a) {
                        actions.push(*a)
                    }
                }
            }
        }
        actions
    }

    //

    #[must_use]
    pub fn apply(&self, action: Action) -> Self {
        assert!(!self.is_terminal(), "cannot act on terminal state");
        let mut next = self.clone();
        match action {
            Action::Fold => next.fold(),
            Action::Call => next.call(),
            Action::AllIn => next.all_in(),
            Action::Bet(_) => next.bet(self.total_bet_size(action)),
            a if a.is_bias() => next.assign_bias(a),
            a => panic!("cannot apply {}", a),
        }
        next.history.push(action);
        next
    }

    #[must_use]
    pub fn apply_history(&self, history: &History) -> Self {
        let mut state = self.clone();
        for action in history {
            state = state.apply(*action);
        }
        state
    }

    fn fold(&mut self) {
        self.players[self.active as usize].fold();
        let unfolded = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.has_folded())
            .map(|(i, _)| i)
            .collect::<Vec<usize>>();
        if unfolded.len() == 1 {
            self.winner = unfolded[0] as i8;
        } else {
            self.finish_action();
        }
    }
    fn call(&mut self) {
        let max_bet = self.max_bet;
        let actor = &mut self.players[self.active as usize];
        let to_call = max_bet - actor.bet();
        self.pot += actor.invest(to_call);
        actor.act();
        self.finish_action();
    }
    fn bet(&mut self, total: Chips) {
        let actor = &mut self.players[self.active as usize];
        let added = total - actor.bet();
        assert!(added > 0, "bet must add chips");
        if added >= actor.chips() {
            self.all_in();
        } else {
            self.pot += actor.invest(added);
            let raised = self.players[self.active as usize].bet();
            assert!(raised > self.max_bet, "bet must raise");
            self.max_bet = raised;
            self.bet_level = self.bet_level.saturating_add(1);
            self.players[self.active as usize].act();
            self.finish_action();
        }
    }
    /// an all-in is a bet that may or may not raise
    fn all_in(&mut self) {
        let actor = &mut self.players[self.active as usize];
        let chips = actor.chips();
        self.pot += actor.invest(chips);
        actor.act();
        let total = self.players[self.active as usize].bet();
        if total > self.max_bet {
            self.max_bet = total;
            self.bet_level = self.bet_level.saturating_add(1);
        }
        self.finish_action();
    }

    fn finish_action(&mut self) {
        if self.betting_closed() {
            self.next_round();
        } else {
            self.next_player();
        }
    }
    /// every unfolded seat is all-in or has acted and matched
    fn betting_closed(&self) -> bool {
        self.players
            .iter()
            .filter(|p| !p.has_folded())
            .all(|p| p.chips() == 0 || (p.has_acted() && p.bet() == self.max_bet))
    }
    fn next_player(&mut self) {
        let n = self.players.len() as u8;
        loop {
            self.active = (self.active + 1) % n;
            if self.players[self.active as usize].can_act() {
                return;
            }
        }
    }
    /// advance the street; all-in runouts skip straight to showdown
    fn next_round(&mut self) {
        loop {
            self.round += 1;
            if self.round >= crate::N_STREETS as u8 {
                return;
            }
            for player in self.players.iter_mut() {
                player.next_street();
            }
            self.max_bet = 0;
            self.bet_level = 0;
            if self.players.iter().filter(|p| p.can_act()).count() >= 2 {
                self.active = self.first_to_act();
                return;
            }
        }
    }
    /// postflop action opens at the first live seat from the blinds
    fn first_to_act(&self) -> u8 {
        self.players
            .iter()
            .position(|p| p.can_act())
            .expect("a live seat exists") as u8
    }

    //

    /// seed the real-time bias preflight: every unfolded seat owes
    /// a bias choice before normal play resumes
    #[must_use]
    pub fn with_bias_phase(&self) -> Self {
        assert!(!self.is_terminal());
        let mut next = self.clone();
        next.biases = next
            .players
            .iter()
            .map(|p| {
                if p.has_folded() {
                    Action::BiasNone
                } else {
                    Action::Undefined
                }
            })
            .collect();
        next.active = next.bias_actor().expect("an unfolded seat exists") as u8;
        next
    }
    pub fn in_bias_phase(&self) -> bool {
        self.biases.contains(&Action::Undefined)
    }
    fn bias_actor(&self) -> Option<usize> {
        self.biases.iter().position(|b| *b == Action::Undefined)
    }
    fn assign_bias(&mut self, bias: Action) {
        assert!(self.in_bias_phase(), "no bias owed");
        let seat = self.bias_actor().expect("bias phase active");
        assert!(seat == self.active as usize);
        self.biases[seat] = bias;
        match self.bias_actor() {
            Some(next) => self.active = next as u8,
            None => self.active = self.first_to_act(),
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        writeln!(
            f,
            "pot={} max_bet={} street={} level={} active={} winner={}",
            self.pot,
            self.max_bet,
            self.street(),
            self.bet_level,
            self.active,
            self.winner
        )?;
        for (i, p) in self.players.iter().enumerate() {
            writeln!(
                f,
                "  seat {}: chips={:>6} bet={:>6}{}",
                i,
                p.chips(),
                p.bet(),
                if p.has_folded() { " folded" } else { "" }
            )?;
        }
        write!(f, "  history: {}", self.history)
    }
}

/// chips won or lost by seat `i` over the whole hand, relative to
/// the given starting stacks, rake charged postflop only. the
/// zero-sum identity is Σ utilities + rake = 0.
pub fn utility(
    state: &State,
    i: usize,
    board: &Board,
    hands: &[Hand],
    stacks: &[Chips],
    rake: &Rake,
) -> Chips {
    assert!(state.is_terminal(), "utility of non-terminal state");
    let invested = stacks[i] - state.players[i].chips();
    if state.winner() != -1 {
        let raked = rake.payoff(state.pot(), state.round());
        let reward = if state.winner() as usize == i { raked } else { 0 };
        return reward - invested;
    }
    let claims = state
        .players
        .iter()
        .enumerate()
        .map(|(seat, p)| Claim {
            reward: 0,
            risked: stacks[seat] - p.chips(),
            folded: p.has_folded(),
            strength: Strength::from((&hands[seat], board)),
        })
        .collect::<Vec<Claim>>();
    let claims = settle(claims);
    let raked = rake.payoff(state.pot(), 3);
    if raked == state.pot() {
        return claims[i].reward - invested;
    }
    // scale rewards down to the raked pot, leftover chips by seat order
    let pot = state.pot() as i64;
    let mut rewards = claims
        .iter()
        .map(|c| (c.reward as i64 * raked as i64 / pot) as Chips)
        .collect::<Vec<Chips>>();
    let mut leftover = raked - rewards.iter().sum::<Chips>();
    for (seat, reward) in rewards.iter_mut().enumerate() {
        if leftover == 0 {
            break;
        }
        if claims[seat].reward > 0 {
            *reward += 1;
            leftover -= 1;
        }
    }
    rewards[i] - invested
}

/// unfolded seats holding the strongest showdown hand
pub fn winners(state: &State, hands: &[Hand], board: &Board) -> Vec<usize> {
    let best = state
        .players
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.has_folded())
        .map(|(i, _)| Strength::from((&hands[i], board)))
        .max()
        .expect("an unfolded seat exists");
    state
        .players
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.has_folded())
        .filter(|(i, _)| Strength::from((&hands[*i], board)) == best)
        .map(|(i, _)| i)
        .collect()
}

use super::action::Action;
use super::history::History;
use super::player::Player;
use super::profile::Profile;
use super::rake::Rake;
use super::showdown::settle;
use super::showdown::Claim;
use crate::cards::board::Board;
use crate::cards::hand::Hand;
use crate::cards::street::Street;
use crate::evaluation::strength::Strength;
use crate::Chips;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::fmt::Formatter;


#[cfg(test)]
mod tests {
    use super::*;

    fn conserved(state: &State, n_players: usize, chips: Chips) -> bool {
        state.players().iter().map(|p| p.chips()).sum::<Chips>() + state.pot()
            == chips * n_players as Chips
    }

    #[test]
    fn heads_up_check_down() {
        let mut state = State::new(2, 10_000, 0, false);
        assert!(state.active() == 1); // button opens preflop
        for _ in 0..8 {
            assert!(!state.is_terminal());
            state = state.apply(Action::Call);
            assert!(conserved(&state, 2, 10_000));
        }
        assert!(state.is_terminal());
        assert!(state.round() == 4);
        assert!(state.winner() == -1);
        assert!(state.pot() == 2 * crate::B_BLIND);

        let board = Board::try_from("2h3h4c5d9s").unwrap();
        let hands = vec![
            Hand::try_from("AcAd").unwrap(),
            Hand::try_from("KsKh").unwrap(),
        ];
        let stacks = vec![10_000, 10_000];
        let rake = Rake::none();
        let u0 = utility(&state, 0, &board, &hands, &stacks, &rake);
        let u1 = utility(&state, 1, &board, &hands, &stacks, &rake);
        assert!(u0 == crate::B_BLIND);
        assert!(u1 == -crate::B_BLIND);
        assert!(u0 + u1 == 0);
        assert!(winners(&state, &hands, &board) == vec![0]);
    }

    #[test]
    fn fold_to_preflop_shove() {
        let state = State::new(2, 10_000, 0, false);
        let state = state.apply(Action::AllIn);
        assert!(!state.is_terminal());
        let state = state.apply(Action::Fold);
        assert!(state.is_terminal());
        assert!(state.winner() == 1);
        assert!(state.round() == 0); // terminates before round advance

        let board = Board::empty();
        let hands = vec![Hand::blank(), Hand::blank()];
        let stacks = vec![10_000, 10_000];
        let rake = Rake::new(0.05, 300.0); // no rake preflop
        let u0 = utility(&state, 0, &board, &hands, &stacks, &rake);
        let u1 = utility(&state, 1, &board, &hands, &stacks, &rake);
        assert!(u1 == crate::B_BLIND);
        assert!(u0 == -crate::B_BLIND);
    }

    #[test]
    fn rake_shifts_the_sum_by_exactly_the_rake() {
        let mut state = State::new(2, 10_000, 0, false);
        for _ in 0..8 {
            state = state.apply(Action::Call);
        }
        let board = Board::try_from("2h3h4c5d9s").unwrap();
        let hands = vec![
            Hand::try_from("AcAd").unwrap(),
            Hand::try_from("KsKh").unwrap(),
        ];
        let stacks = vec![10_000, 10_000];
        let rake = Rake::new(0.05, 300.0);
        let u0 = utility(&state, 0, &board, &hands, &stacks, &rake);
        let u1 = utility(&state, 1, &board, &hands, &stacks, &rake);
        // pot 200 rakes 10 at showdown
        assert!(u0 + u1 == -10);
        assert!(u0 == 90);
    }

    #[test]
    fn history_replay_matches_stepwise() {
        let base = State::new(2, 10_000, 0, false);
        let replayed = base.apply_history(&History::from(vec![Action::Call; 8]));
        let mut stepped = base.clone();
        for _ in 0..8 {
            stepped = stepped.apply(Action::Call);
        }
        assert!(replayed == stepped);
        assert!(replayed.is_terminal());
    }

    #[test]
    fn first_to_act_postflop_cannot_fold() {
        let profile = Profile::heads_up(10_000);
        let mut state = State::new(2, 10_000, 0, false);
        state = state.apply(Action::Call);
        state = state.apply(Action::Call);
        assert!(state.round() == 1);
        assert!(state.bet_level() == 0);
        let actions = state.valid_actions(&profile);
        assert!(!actions.contains(&Action::Fold));
        assert!(actions.contains(&Action::Call));
        assert!(actions.contains(&Action::AllIn));
    }

    #[test]
    fn oversized_bet_collapses_to_all_in() {
        let profile = Profile::heads_up(10_000);
        let mut state = State::new(2, 130, 0, false);
        state = state.apply(Action::Call);
        state = state.apply(Action::Call);
        // stacks are 30 behind into a 200 pot: every sizing clamps
        let actions = state.valid_actions(&profile);
        assert!(!actions.iter().any(Action::is_bet));
        assert!(actions.contains(&Action::AllIn));
    }

    #[test]
    fn bet_sizing_is_pot_after_call() {
        let mut state = State::new(2, 10_000, 0, false);
        state = state.apply(Action::Call); // limp
        state = state.apply(Action::Bet(100)); // pot-sized raise over the limp
        assert!(state.max_bet() == 100 + 200);
        assert!(state.bet_level() == 2);
    }

    #[test]
    fn all_in_below_max_bet_does_not_raise() {
        // short stack calls all-in under the blind: level stays
        let mut state = State::with_stacks(&[10_000, 10_000, 60], 0, false);
        assert!(state.active() == 2);
        state = state.apply(Action::AllIn);
        assert!(state.bet_level() == 1);
        assert!(state.max_bet() == crate::B_BLIND);
    }

    #[test]
    fn side_pot_runout_reaches_showdown() {
        let mut state = State::with_stacks(&[10_000, 10_000, 500], 0, false);
        state = state.apply(Action::AllIn); // utg short stack
        state = state.apply(Action::AllIn); // sb covers
        state = state.apply(Action::Call); // bb calls
        assert!(state.is_terminal());
        assert!(state.round() == 4); // runout skips betting rounds
        let board = Board::try_from("2h3h4c5d9s").unwrap();
        let hands = vec![
            Hand::try_from("AcAd").unwrap(),
            Hand::try_from("KsKh").unwrap(),
            Hand::try_from("QsQh").unwrap(),
        ];
        let stacks = vec![10_000, 10_000, 500];
        let rake = Rake::none();
        let u: Vec<Chips> = (0..3)
            .map(|i| utility(&state, i, &board, &hands, &stacks, &rake))
            .collect();
        assert!(u.iter().sum::<Chips>() == 0);
        assert!(u[0] > 0); // aces win main and side pot
        assert!(u[2] == -500);
    }

    #[test]
    fn bias_phase_precedes_play() {
        let profile = Profile::bias(2);
        let state = State::new(2, 10_000, 0, false).with_bias_phase();
        assert!(state.in_bias_phase());
        let actions = state.valid_actions(&profile);
        assert!(actions == Action::BIASES.to_vec());
        let state = state.apply(Action::BiasCall);
        assert!(state.in_bias_phase());
        let state = state.apply(Action::BiasNone);
        assert!(!state.in_bias_phase());
        assert!(state.biases() == &[Action::BiasCall, Action::BiasNone]);
        assert!(state.active() == 0 || state.active() == 1);
    }

    #[test]
    fn limp_triggers_isolation_menu() {
        let profile = Profile::ring(3);
        let mut state = State::new(3, 10_000, 0, false);
        assert!(state.limpers() == 0);
        state = state.apply(Action::Call); // utg limps
        assert!(state.limpers() == 1);
        let iso = state.valid_actions(&profile);
        let expected = profile.iso_actions(state.active(), state.is_in_position(state.active()));
        assert!(iso.iter().all(|a| expected.contains(a)));
    }
}
