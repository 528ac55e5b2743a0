#![forbid(unsafe_code)]

//! The traversal structure a run walks: steps linked in declaration order.
//!
//! Nodes live in a `Vec` and link to their neighbours by index, so the chain
//! is owned outright by the run that built it.

use crate::model::Step;

/// Index of a node within its [`StepChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A step plus its position in the chain.
#[derive(Debug, Clone)]
pub struct StepNode {
    step: Step,
    step_no: usize,
    previous: Option<NodeId>,
    next: Option<NodeId>,
}

impl StepNode {
    /// The wrapped step.
    pub fn step(&self) -> &Step {
        &self.step
    }

    /// 1-based position.
    pub fn step_no(&self) -> usize {
        self.step_no
    }

    /// Preceding node, if any.
    pub fn previous(&self) -> Option<NodeId> {
        self.previous
    }

    /// Following node, if any.
    pub fn next(&self) -> Option<NodeId> {
        self.next
    }
}

/// Doubly linked steps, built once and never reordered.
#[derive(Debug, Clone)]
pub struct StepChain {
    nodes: Vec<StepNode>,
}

impl StepChain {
    /// Link `steps` in order. Returns `None` when `steps` is empty.
    pub fn build(steps: &[Step]) -> Option<Self> {
        if steps.is_empty() {
            return None;
        }
        let last = steps.len() - 1;
        let nodes = steps
            .iter()
            .enumerate()
            .map(|(i, step)| StepNode {
                step: step.clone(),
                step_no: i + 1,
                previous: i.checked_sub(1).map(NodeId),
                next: (i < last).then(|| NodeId(i + 1)),
            })
            .collect();
        Some(Self { nodes })
    }

    /// The first node.
    pub fn first(&self) -> NodeId {
        NodeId(0)
    }

    /// Look up a node.
    ///
    /// `NodeId`s are only handed out by this chain, so the index is always
    /// in range.
    pub fn node(&self, id: NodeId) -> &StepNode {
        &self.nodes[id.0]
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: an empty chain cannot be built.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes before `id`, nearest first.
    pub fn walk_back(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).previous, move |n| self.node(*n).previous)
    }
}
