/// an ordered sequence of actions, used as a map key into
/// flat strategy storage and for cross-checking mirrored states.
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct History(Vec<Action>);

impl History {
    pub fn new() -> Self {
        Self(Vec::new())
    }
    pub fn push(&mut self, action: Action) {
        self.0.push(action);
    }
    pub fn get(&self, i: usize) -> Action {
        self.0[i]
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn actions(&self) -> &[Action] {
        &self.0
    }
    /// the suffix after an initial prefix of the given length
    pub fn slice(&self, from: usize) -> Self {
        assert!(from <= self.len(), "slice start beyond history");
        Self(self.0[from..].to_vec())
    }
    /// whether the given history is a prefix of this one
    pub fn is_consistent(&self, prefix: &Self) -> bool {
        self.len() >= prefix.len() && self.0[..prefix.len()] == prefix.0[..]
    }
}

impl From<Vec<Action>> for History {
    fn from(actions: Vec<Action>) -> Self {
        Self(actions)
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Display for History {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.0
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(" -> ")
        )
    }
}

use super::action::Action;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::fmt::Formatter;


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::Hash;
    use std::hash::Hasher;

    fn digest(h: &History) -> u64 {
        let mut hasher = DefaultHasher::new();
        h.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn equality_is_hash_equality() {
        let h1 = History::from(vec![Action::Call, Action::Bet(75), Action::Fold]);
        let h2 = History::from(vec![Action::Call, Action::Bet(75), Action::Fold]);
        let h3 = History::from(vec![Action::Call, Action::Bet(80), Action::Fold]);
        assert!(h1 == h2);
        assert!(digest(&h1) == digest(&h2));
        assert!(h1 != h3);
        assert!(digest(&h1) != digest(&h3));
    }

    #[test]
    fn slicing_suffixes() {
        let h = History::from(vec![Action::Call, Action::Call, Action::Bet(50)]);
        let suffix = h.slice(2);
        assert!(suffix.actions() == &[Action::Bet(50)]);
        assert!(h.is_consistent(&History::from(vec![Action::Call, Action::Call])));
        assert!(!h.is_consistent(&History::from(vec![Action::Fold])));
    }
}
