//! The join graph (C2/C3 supporting structure): a tree whose root is the
//! population table and whose children are peripheral tables.
//!
//! Mapped as an arena + indices rather than a tree of owned `Box<Placeholder>`
//! nodes: the source's placeholder graph allows subfeatures to reference
//! sibling placeholders, which a strictly-owned tree cannot express without
//! either `Rc<RefCell<_>>` or unsafe aliasing. All nodes live in one `Vec`
//! owned by the [`Placeholder`] itself; children are stored as indices into
//! that `Vec`, so the structure is acyclic by construction (an index can only
//! point at a node already pushed).

use serde::{Deserialize, Serialize};

/// How a peripheral table relates to its parent row, affecting how many
/// matches are expected and whether `allow_lagged_targets` is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relationship {
    OneToOne,
    OneToMany,
    ManyToMany,
    ManyToManyPropositionalization,
}

/// A left/right join-key pair: `left` names a column on the parent table,
/// `right` names a column on this node's table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinKeyPair {
    pub left: String,
    pub right: String,
}

/// Time-stamp windowing configuration for one edge of the join graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeStampWindow {
    /// Timestamp column on the parent (population-side) table.
    pub left_ts: String,
    /// Timestamp column on this node's table.
    pub right_ts: String,
    /// Optional second parent-side column giving an exclusive upper bound on
    /// the peripheral timestamp (`right_ts < upper_ts`).
    pub upper_ts: Option<String>,
    /// Rows with `right_ts < left_ts_effective - memory` are excluded.
    pub memory: f64,
}

/// One node of the join graph: a peripheral table plus how it attaches to its
/// parent. The population root has no join keys or relationship (both are
/// only meaningful on an edge to a parent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceholderNode {
    /// Name resolved against a [`crate::schema::TableRegistry`] at fit/
    /// transform time; the Placeholder never holds a `DataFrame` itself.
    pub table_name: String,
    pub join_keys: Vec<JoinKeyPair>,
    pub time_stamp: Option<TimeStampWindow>,
    /// `population.ts_effective = population.ts - horizon`.
    pub horizon: f64,
    pub relationship: Relationship,
    pub allow_lagged_targets: bool,
    children: Vec<usize>,
}

impl PlaceholderNode {
    fn root(table_name: impl Into<String>) -> Self {
        PlaceholderNode {
            table_name: table_name.into(),
            join_keys: Vec::new(),
            time_stamp: None,
            horizon: 0.0,
            relationship: Relationship::OneToMany,
            allow_lagged_targets: false,
            children: Vec::new(),
        }
    }
}

/// A join graph: one population root plus an arena of peripheral nodes,
/// every non-root node reachable from the root by exactly one child edge
/// (deeper levels are "subfeatures": an inner sub-problem fit on that
/// branch's own target, whose numeric output becomes a peripheral feature of
/// the outer problem).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placeholder {
    nodes: Vec<PlaceholderNode>,
}

/// Index into a [`Placeholder`]'s node arena. `ROOT` always refers to the
/// population table.
pub type NodeId = usize;

/// The population root is always pushed first.
pub const ROOT: NodeId = 0;

impl Placeholder {
    /// Starts a new join graph rooted at `population_table`.
    #[must_use]
    pub fn new(population_table: impl Into<String>) -> Self {
        Placeholder {
            nodes: vec![PlaceholderNode::root(population_table)],
        }
    }

    /// Attaches a peripheral table as a child of `parent`, returning the new
    /// node's id.
    pub fn add_peripheral(
        &mut self,
        parent: NodeId,
        table_name: impl Into<String>,
        join_keys: Vec<JoinKeyPair>,
        time_stamp: Option<TimeStampWindow>,
        horizon: f64,
        relationship: Relationship,
        allow_lagged_targets: bool,
    ) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(PlaceholderNode {
            table_name: table_name.into(),
            join_keys,
            time_stamp,
            horizon,
            relationship,
            allow_lagged_targets,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &PlaceholderNode {
        &self.nodes[id]
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[usize] {
        &self.nodes[id].children
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// True if `id` has no children (a leaf peripheral table, not a
    /// subfeature root).
    #[must_use]
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id].children.is_empty()
    }

    /// Depth-first pre-order traversal starting at `id`, yielding every node
    /// reachable from it (including `id` itself).
    pub fn walk(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = vec![id];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(self.nodes[next].children.iter().rev());
            Some(next)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> Placeholder {
        let mut ph = Placeholder::new("customers");
        let orders = ph.add_peripheral(
            ROOT,
            "orders",
            vec![JoinKeyPair {
                left: "customer_id".into(),
                right: "customer_id".into(),
            }],
            None,
            0.0,
            Relationship::OneToMany,
            false,
        );
        ph.add_peripheral(
            orders,
            "order_items",
            vec![JoinKeyPair {
                left: "order_id".into(),
                right: "order_id".into(),
            }],
            None,
            0.0,
            Relationship::OneToMany,
            false,
        );
        ph
    }

    #[test]
    fn root_has_no_join_keys() {
        let ph = sample_graph();
        assert!(ph.node(ROOT).join_keys.is_empty());
        assert_eq!(ph.node(ROOT).table_name, "customers");
    }

    #[test]
    fn children_are_indexed_not_owned() {
        let ph = sample_graph();
        assert_eq!(ph.children(ROOT), &[1]);
        assert_eq!(ph.node(1).table_name, "orders");
        assert!(!ph.is_leaf(1));
        assert!(ph.is_leaf(2));
    }

    #[test]
    fn walk_visits_every_node_once() {
        let ph = sample_graph();
        let visited: Vec<_> = ph.walk(ROOT).collect();
        assert_eq!(visited.len(), 3);
        assert_eq!(visited[0], ROOT);
    }
}
