/// pseudo-harmonic action translation.
///
/// a real bet lands between two abstract sizings A <= x <= B and
/// maps to A with probability (B - x)(1 + A) / ((B - A)(1 + x)),
/// the unique weighting that leaves a pseudo-harmonic bettor
/// indifferent. computed in f64: A and x are often close and the
/// numerator cancels badly in single precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Translation {
    pub below: Action,
    pub above: Action,
    pub p_below: Probability,
}

impl Translation {
    fn exact(action: Action) -> Self {
        Self {
            below: action,
            above: action,
            p_below: 1.0,
        }
    }
}

/// the node's sizing actions as (action, pot fraction), sorted;
/// the all-in converts through the state's stack and pot
pub fn translatable_actions(state: &State, actions: &[Action]) -> Vec<(Action, Probability)> {
    let mut sized = actions
        .iter()
        .filter_map(|a| match a {
            Action::AllIn => Some((
                *a,
                state.fractional_bet_size(state.total_bet_size(Action::AllIn)),
            )),
            Action::Bet(_) => Some((*a, a.fraction().expect("sizing"))),
            _ => None,
        })
        .collect::<Vec<(Action, Probability)>>();
    sized.sort_by(|a, b| a.1.partial_cmp(&b.1).expect("no NaN sizes"));
    sized
}

pub fn pseudo_harmonic(action: Action, actions: &[Action], state: &State) -> Translation {
    if action == Action::Fold {
        return Translation::exact(Action::Fold);
    }
    let x = match action {
        Action::AllIn => state.fractional_bet_size(state.total_bet_size(Action::AllIn)),
        Action::Bet(_) => action.fraction().expect("sizing"),
        a => return Translation::exact(a),
    };
    let sized = translatable_actions(state, actions);
    assert!(!sized.is_empty(), "no sizing actions to translate into");
    for (i, (candidate, size)) in sized.iter().enumerate() {
        if *size == x {
            return Translation::exact(*candidate);
        }
        if *size > x {
            if i == 0 {
                return Translation::exact(*candidate);
            }
            let (below, a) = sized[i - 1];
            let (above, b) = (*candidate, *size);
            let p_below = (b - x) * (1.0 + a) / ((b - a) * (1.0 + x));
            return Translation {
                below,
                above,
                p_below,
            };
        }
    }
    Translation::exact(sized[sized.len() - 1].0)
}

/// randomized translation of an off-tree action
pub fn translate<R: Rng>(
    action: Action,
    actions: &[Action],
    state: &State,
    rng: &mut R,
) -> Action {
    let result = pseudo_harmonic(action, actions, state);
    if rng.random::<Probability>() < result.p_below {
        result.below
    } else {
        result.above
    }
}

use crate::gameplay::action::Action;
use crate::gameplay::state::State;
use crate::Probability;
use rand::Rng;

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> State {
        State::new(2, 10_000, 0, false)
    }

    fn abstract_sizes() -> Vec<Action> {
        vec![
            Action::Fold,
            Action::Call,
            Action::Bet(50),
            Action::Bet(100),
            Action::Bet(200),
        ]
    }

    #[test]
    fn bracketing_probability() {
        let t = pseudo_harmonic(Action::Bet(75), &abstract_sizes(), &state());
        assert!(t.below == Action::Bet(50));
        assert!(t.above == Action::Bet(100));
        // (1.00 - 0.75)(1 + 0.50) / ((1.00 - 0.50)(1 + 0.75))
        assert!((t.p_below - 0.375 / 0.875).abs() < 1e-9);
    }

    #[test]
    fn exact_size_is_certain() {
        let t = pseudo_harmonic(Action::Bet(100), &abstract_sizes(), &state());
        assert!(t == Translation::exact(Action::Bet(100)));
    }

    #[test]
    fn clamping_at_the_edges() {
        let low = pseudo_harmonic(Action::Bet(10), &abstract_sizes(), &state());
        assert!(low == Translation::exact(Action::Bet(50)));
        let high = pseudo_harmonic(Action::Bet(999), &abstract_sizes(), &state());
        assert!(high == Translation::exact(Action::Bet(200)));
    }

    #[test]
    fn fold_maps_to_fold() {
        let t = pseudo_harmonic(Action::Fold, &abstract_sizes(), &state());
        assert!(t == Translation::exact(Action::Fold));
    }
}
