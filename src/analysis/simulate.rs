/// a seat at the table deciding from public state and its own
/// cards
pub trait Agent {
    fn act(&mut self, state: &State, board: &Board, hand: &Hand, rng: &mut SmallRng) -> Action;
}

/// uniform over the legal abstract menu
pub struct RandomAgent {
    profile: Profile,
}

impl RandomAgent {
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }
}

impl Agent for RandomAgent {
    fn act(&mut self, state: &State, _: &Board, _: &Hand, rng: &mut SmallRng) -> Action {
        let actions = state.valid_actions(&self.profile);
        actions[rng.random_range(0..actions.len())]
    }
}

/// plays the averaged blueprint strategy
pub struct BlueprintAgent {
    blueprint: Arc<LosslessBlueprint>,
}

impl BlueprintAgent {
    pub fn new(blueprint: Arc<LosslessBlueprint>) -> Self {
        Self { blueprint }
    }
}

impl Agent for BlueprintAgent {
    fn act(&mut self, state: &State, board: &Board, hand: &Hand, rng: &mut SmallRng) -> Action {
        let street_board = Board::from(board.street_cards(state.street()));
        self.blueprint.sample_action(state, &street_board, hand, rng)
    }
}

/// self-play harness: deal, let the agents battle, and settle.
/// returns each seat's cumulative winnings trajectory. every hand
/// asserts the zero-sum identity.
pub fn simulate(
    agents: &mut [Box<dyn Agent>],
    n_chips: Chips,
    ante: Chips,
    n_hands: usize,
    seed: u64,
) -> Vec<Vec<Chips>> {
    let n = agents.len();
    assert!(n >= 2, "need at least two agents");
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut deck = Deck::new();
    let mut results = vec![Vec::with_capacity(n_hands); n];
    let stacks = vec![n_chips; n];
    let rake = Rake::none();
    for _ in 0..n_hands {
        deck.shuffle(&mut rng);
        let hands = (0..n)
            .map(|_| Hand::from((deck.draw(), deck.draw())))
            .collect::<Vec<Hand>>();
        let mut board = Board::empty();
        for _ in 0..crate::N_BOARD {
            board.push(deck.draw());
        }
        let mut state = State::new(n, n_chips, ante, false);
        while !state.is_terminal() {
            let seat = state.active();
            let action = agents[seat].act(&state, &board, &hands[seat], &mut rng);
            state = state.apply(action);
        }
        let payoffs = (0..n)
            .map(|seat| utility(&state, seat, &board, &hands, &stacks, &rake))
            .collect::<Vec<Chips>>();
        assert!(
            payoffs.iter().sum::<Chips>() == 0,
            "winnings are not zero sum:\n{}",
            state
        );
        for (seat, payoff) in payoffs.iter().enumerate() {
            let last = results[seat].last().copied().unwrap_or(0);
            results[seat].push(last + payoff);
        }
    }
    results
}

use crate::cards::board::Board;
use crate::cards::deck::Deck;
use crate::cards::hand::Hand;
use crate::gameplay::action::Action;
use crate::gameplay::profile::Profile;
use crate::gameplay::rake::Rake;
use crate::gameplay::state::utility;
use crate::gameplay::state::State;
use crate::mccfr::blueprint::LosslessBlueprint;
use crate::Chips;
use rand::rngs::SmallRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::Arc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_self_play_is_zero_sum() {
        let mut agents: Vec<Box<dyn Agent>> = vec![
            Box::new(RandomAgent::new(Profile::minimal(2))),
            Box::new(RandomAgent::new(Profile::minimal(2))),
        ];
        let results = simulate(&mut agents, 1_000, 0, 200, 17);
        assert!(results.len() == 2);
        assert!(results[0].len() == 200);
        // cumulative totals mirror each other
        assert!(results[0].last().unwrap() + results[1].last().unwrap() == 0);
    }

    #[test]
    fn ring_self_play_conserves_chips() {
        let mut agents: Vec<Box<dyn Agent>> = (0..4)
            .map(|_| Box::new(RandomAgent::new(Profile::minimal(4))) as Box<dyn Agent>)
            .collect();
        let results = simulate(&mut agents, 2_000, 50, 50, 3);
        let total: Chips = results.iter().map(|r| *r.last().unwrap()).sum();
        assert!(total == 0);
    }
}
