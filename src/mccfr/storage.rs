/// the storage axis of the solver: how value cells are addressed.
///
/// the tree backend walks child pointers discovered lazily during
/// traversal; the flat backend indexes a dense prebuilt array
/// through an offline history map. traversal code is generic over
/// the two, composing with the mode axis (blueprint vs real-time)
/// at the driver instead of through inheritance.
pub trait Backing<V: Value>: Send + Sync {
    type Node<'a>: Copy
    where
        Self: 'a;

    fn root<'a>(&'a self) -> Self::Node<'a>;
    /// descend the edge at `index`; `next` is the successor state
    fn advance<'a>(&'a self, node: Self::Node<'a>, index: usize, next: &State) -> Self::Node<'a>;
    /// the abstract action set at this node
    fn actions<'a>(&'a self, node: Self::Node<'a>, state: &State) -> Vec<Action>;
    /// the value cells for one infoset bucket, one per action
    fn row<'a>(&'a self, node: Self::Node<'a>, state: &State, cluster: usize) -> &'a [V::Atomic];
    /// linear-CFR discount over every allocated cell
    fn discount(&self, factor: f64);
    /// structural serialization; the tree backend walks preorder
    fn save<W: Write>(&self, writer: &mut W) -> Result<()>;
}

impl<V: Value> Backing<V> for TreeStorage<V> {
    type Node<'a>
        = &'a TreeStorage<V>
    where
        Self: 'a;

    fn root<'a>(&'a self) -> Self::Node<'a> {
        self
    }
    fn advance<'a>(&'a self, node: Self::Node<'a>, index: usize, next: &State) -> Self::Node<'a> {
        node.apply_index(index, next)
    }
    fn actions<'a>(&'a self, node: Self::Node<'a>, _: &State) -> Vec<Action> {
        node.actions().to_vec()
    }
    fn row<'a>(&'a self, node: Self::Node<'a>, _: &State, cluster: usize) -> &'a [V::Atomic] {
        node.row(cluster)
    }
    fn discount(&self, factor: f64) {
        self.lcfr_discount(factor)
    }
    fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        TreeStorage::save(self, writer)
    }
}

use super::tree::TreeStorage;
use super::value::Value;
use crate::gameplay::action::Action;
use crate::gameplay::state::State;
use anyhow::Result;
use std::io::Write;
