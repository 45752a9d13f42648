/// per-node shape providers, fixed at solver construction.
///
/// `clusters` gives the infoset bucket count for a node's street
/// and `actions` its abstract action menu. `width` overrides the
/// number of value columns per bucket; the sampled blueprint uses
/// it to store one byte per bias offset instead of per action.
pub struct TreeConfig {
    pub clusters: Box<dyn Fn(&State) -> usize + Send + Sync>,
    pub actions: Box<dyn Fn(&State) -> Vec<Action> + Send + Sync>,
    pub width: Option<usize>,
}

impl TreeConfig {
    pub fn new(
        clusters: impl Fn(&State) -> usize + Send + Sync + 'static,
        actions: impl Fn(&State) -> Vec<Action> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            clusters: Box::new(clusters),
            actions: Box::new(actions),
            width: None,
        })
    }
}

/// one node of the lazily grown, lock-free game tree.
///
/// a node owns `clusters x width` atomic value cells and one child
/// slot per abstract action. children are created on first
/// traversal: `OnceLock` serializes construction behind a per-edge
/// lock and publishes with release ordering, so a reader that
/// observes a child observes its action set and zeroed cells in
/// full. the action set and cluster count never change after
/// construction, which keeps the hot path wait-free once a subtree
/// exists.
///
/// a dense map keyed by action history would serialize all growth
/// behind one lock and allocate for unreached branches; the
/// per-edge scheme pays one pointer chase per step instead.
pub struct TreeStorage<V: Value> {
    actions: Vec<Action>,
    clusters: usize,
    width: usize,
    values: Box<[V::Atomic]>,
    children: Box<[OnceLock<Box<TreeStorage<V>>>]>,
    config: Arc<TreeConfig>,
}

impl<V: Value> TreeStorage<V> {
    pub fn new(state: &State, config: Arc<TreeConfig>) -> Self {
        let actions = (config.actions)(state);
        let clusters = (config.clusters)(state);
        let width = config.width.unwrap_or(actions.len());
        Self {
            values: (0..clusters * width).map(|_| V::zero()).collect(),
            children: (0..actions.len()).map(|_| OnceLock::new()).collect(),
            actions,
            clusters,
            width,
            config,
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
    pub fn n_clusters(&self) -> usize {
        self.clusters
    }
    pub fn width(&self) -> usize {
        self.width
    }
    pub fn action_index(&self, action: Action) -> Option<usize> {
        self.actions.iter().position(|a| *a == action)
    }

    /// the cells for one infoset bucket
    pub fn row(&self, cluster: usize) -> &[V::Atomic] {
        let base = cluster * self.width;
        &self.values[base..base + self.width]
    }
    pub fn cell(&self, cluster: usize, column: usize) -> &V::Atomic {
        assert!(column < self.width);
        &self.values[cluster * self.width + column]
    }

    /// descend one edge, creating the child on first visit.
    /// the successor state must be the result of applying this
    /// edge's action, and is only inspected on creation.
    pub fn apply_index(&self, index: usize, next: &State) -> &Self {
        self.children[index]
            .get_or_init(|| Box::new(Self::new(next, self.config.clone())))
    }
    pub fn apply(&self, action: Action, next: &State) -> &Self {
        let index = self
            .action_index(action)
            .unwrap_or_else(|| panic!("action {} not at this node", action));
        self.apply_index(index, next)
    }
    /// a child that has been visited, if any
    pub fn child(&self, index: usize) -> Option<&Self> {
        self.children[index].get().map(|b| b.as_ref())
    }
    /// follow a history of actions through visited children
    pub fn descend(&self, actions: &[Action]) -> Option<&Self> {
        let mut node = self;
        for action in actions {
            node = node.child(node.action_index(*action)?)?;
        }
        Some(node)
    }

    /// multiply every allocated cell by the linear-CFR factor.
    /// callers barrier traversals around this.
    pub fn lcfr_discount(&self, factor: f64) {
        for cell in self.values.iter() {
            V::scale(cell, factor);
        }
        for child in self.children.iter().filter_map(|c| c.get()) {
            child.lcfr_discount(factor);
        }
    }

    pub fn count_nodes(&self) -> usize {
        1 + self
            .children
            .iter()
            .filter_map(|c| c.get())
            .map(|c| c.count_nodes())
            .sum::<usize>()
    }

    /// preorder structural serialization: action set, shape, cells,
    /// then a presence flag per edge. traversal-safe because
    /// unvisited edges serialize as absent and visited subtrees are
    /// immutable in shape.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16::<BE>(self.actions.len() as u16)?;
        for action in self.actions.iter() {
            writer.write_u32::<BE>(u32::from(*action))?;
        }
        writer.write_u32::<BE>(self.clusters as u32)?;
        writer.write_u16::<BE>(self.width as u16)?;
        for cell in self.values.iter() {
            V::write(writer, V::load(cell))?;
        }
        for child in self.children.iter() {
            match child.get() {
                Some(child) => {
                    writer.write_u8(1)?;
                    child.save(writer)?;
                }
                None => writer.write_u8(0)?,
            }
        }
        Ok(())
    }

    pub fn load<R: Read>(reader: &mut R, config: Arc<TreeConfig>) -> Result<Self> {
        let n_actions = reader.read_u16::<BE>()? as usize;
        let mut actions = Vec::with_capacity(n_actions);
        for _ in 0..n_actions {
            actions.push(Action::from(reader.read_u32::<BE>()?));
        }
        let clusters = reader.read_u32::<BE>()? as usize;
        let width = reader.read_u16::<BE>()? as usize;
        let values = (0..clusters * width)
            .map(|_| V::zero())
            .collect::<Box<[V::Atomic]>>();
        for cell in values.iter() {
            V::store(cell, V::read(reader)?);
        }
        let children = (0..n_actions)
            .map(|_| OnceLock::new())
            .collect::<Box<[OnceLock<Box<TreeStorage<V>>>]>>();
        for child in children.iter() {
            if reader.read_u8()? == 1 {
                child
                    .set(Box::new(Self::load(reader, config.clone())?))
                    .ok()
                    .expect("fresh slot");
            }
        }
        Ok(Self {
            actions,
            clusters,
            width,
            values,
            children,
            config,
        })
    }

    /// absorb another tree cell-wise: sum where both allocated,
    /// graft where only the other has grown. used to average
    /// snapshots into a blueprint.
    pub fn absorb(&self, other: &Self) {
        assert!(self.actions == other.actions, "incompatible tree shapes");
        assert!(self.clusters == other.clusters);
        assert!(self.width == other.width);
        for (mine, theirs) in self.values.iter().zip(other.values.iter()) {
            V::add(mine, V::load(theirs));
        }
        for (index, child) in other.children.iter().enumerate() {
            if let Some(theirs) = child.get() {
                let mine = self.children[index].get_or_init(|| Box::new(theirs.copy_shape()));
                mine.absorb(theirs);
            }
        }
    }
    /// a zeroed node with the same shape
    fn copy_shape(&self) -> Self {
        Self {
            actions: self.actions.clone(),
            clusters: self.clusters,
            width: self.width,
            values: (0..self.clusters * self.width).map(|_| V::zero()).collect(),
            children: (0..self.actions.len()).map(|_| OnceLock::new()).collect(),
            config: self.config.clone(),
        }
    }
}

impl<V: Value> PartialEq for TreeStorage<V> {
    fn eq(&self, other: &Self) -> bool {
        self.actions == other.actions
            && self.clusters == other.clusters
            && self.width == other.width
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(a, b)| V::load(a) == V::load(b))
            && self
                .children
                .iter()
                .zip(other.children.iter())
                .all(|(a, b)| match (a.get(), b.get()) {
                    (None, None) => true,
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                })
    }
}

use super::value::Value;
use crate::gameplay::action::Action;
use crate::gameplay::state::State;
use anyhow::Result;
use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;
use byteorder::BE;
use std::io::Read;
use std::io::Write;
use std::sync::Arc;
use std::sync::OnceLock;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gameplay::profile::Profile;
    use crate::mccfr::value::Value;

    fn config() -> Arc<TreeConfig> {
        let profile = Profile::heads_up(10_000);
        TreeConfig::new(
            |state| if state.round() == 0 { 13 } else { 17 },
            move |state| state.valid_actions(&profile),
        )
    }

    fn grown_tree() -> TreeStorage<i32> {
        let state = State::new(2, 10_000, 0, false);
        let root = TreeStorage::<i32>::new(&state, config());
        let mut node = &root;
        let mut here = state;
        for _ in 0..4 {
            if here.is_terminal() {
                break;
            }
            let action = here.valid_actions(&Profile::heads_up(10_000))[1];
            let index = node.action_index(action).unwrap();
            let next = here.apply(action);
            node = node.apply_index(index, &next);
            i32::add(node.cell(3, 0), 42);
            here = next;
        }
        root
    }

    #[test]
    fn children_install_once() {
        let state = State::new(2, 10_000, 0, false);
        let root = TreeStorage::<i32>::new(&state, config());
        let next = state.apply(Action::Call);
        let index = root.action_index(Action::Call).unwrap();
        let a = root.apply_index(index, &next) as *const _;
        let b = root.apply_index(index, &next) as *const _;
        assert!(a == b);
        assert!(root.child(index).is_some());
        assert!(root.child(root.action_index(Action::Fold).unwrap()).is_none());
    }

    #[test]
    fn concurrent_install_publishes_initialized_nodes() {
        let state = State::new(2, 10_000, 0, false);
        let root = std::sync::Arc::new(TreeStorage::<i32>::new(&state, config()));
        let next = state.apply(Action::Call);
        let index = root.action_index(Action::Call).unwrap();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                let root = root.clone();
                let next = next.clone();
                scope.spawn(move || {
                    let child = root.apply_index(index, &next);
                    // fully initialized: consistent shape, zeroed cells
                    assert!(child.actions() == next.valid_actions(&Profile::heads_up(10_000)));
                    assert!(child.n_clusters() == 13);
                    assert!(child.row(0).iter().all(|c| i32::load(c) == 0));
                });
            }
        });
    }

    #[test]
    fn discount_scales_every_cell() {
        let tree = grown_tree();
        let probe = tree.child(1).unwrap();
        i32::store(probe.cell(3, 0), 1000);
        tree.lcfr_discount(0.8);
        assert!(i32::load(probe.cell(3, 0)) == 800);
    }

    #[test]
    fn serialization_round_trip() {
        let tree = grown_tree();
        let mut buffer = Vec::new();
        tree.save(&mut buffer).unwrap();
        let loaded = TreeStorage::<i32>::load(&mut buffer.as_slice(), config()).unwrap();
        assert!(tree == loaded);
    }

    #[test]
    fn absorb_sums_and_grafts() {
        let t1 = grown_tree();
        let t2 = grown_tree();
        let before = i32::load(t1.child(1).unwrap().cell(3, 0));
        t1.absorb(&t2);
        let after = i32::load(t1.child(1).unwrap().cell(3, 0));
        assert!(after == 2 * before);
    }
}
