//! Search labels and per-node Pareto bags.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{Criteria, Leg, Mode, NodeId};

pub(super) type LabelId = usize;

/// A partial journey ending at `node`.
#[derive(Debug, Clone)]
pub(super) struct Label {
    pub node: NodeId,
    pub cost: Criteria,
    /// Mode of the edge that reached `node`; `None` at the origin.
    pub last_mode: Option<Mode>,
    /// Arrival time at `node`.
    pub clock: DateTime<Utc>,
    pub parent: Option<LabelId>,
    /// Leg that reached `node`; `None` at the origin.
    pub leg: Option<Leg>,
}

impl Label {
    pub fn origin(node: NodeId, departure: DateTime<Utc>) -> Self {
        Self {
            node,
            cost: Criteria::ZERO,
            last_mode: None,
            clock: departure,
            parent: None,
            leg: None,
        }
    }

    /// True if every continuation of `other` is matched or beaten by the
    /// same continuation of `self`.
    ///
    /// Arriving by a different mode may cost one extra transfer on the next
    /// edge, so `self` needs a one-transfer margin unless its last mode is
    /// the same as `other`'s (or it has not boarded anything yet).
    fn covers(&self, other: &Label) -> bool {
        let margin = match (self.last_mode, other.last_mode) {
            (None, _) => 0,
            (Some(a), Some(b)) if a == b => 0,
            _ => 1,
        };
        self.cost.duration_mins <= other.cost.duration_mins
            && self.cost.fare <= other.cost.fare
            && self.cost.transfers + margin <= other.cost.transfers
    }
}

/// Owns every label created by one search, plus the non-dominated bag at
/// each node.
///
/// Labels are never removed from the arena, only marked dead, so parent
/// links stay valid for path reconstruction.
#[derive(Debug, Default)]
pub(super) struct LabelArena {
    labels: Vec<Label>,
    alive: Vec<bool>,
    bags: HashMap<NodeId, Vec<LabelId>>,
}

impl LabelArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: LabelId) -> &Label {
        &self.labels[id]
    }

    pub fn is_alive(&self, id: LabelId) -> bool {
        self.alive[id]
    }

    pub fn kill(&mut self, id: LabelId) {
        self.alive[id] = false;
    }

    /// Add a label to its node's bag unless an existing label there covers
    /// it. Existing labels the new one covers are killed.
    ///
    /// At a terminal node (one that is never expanded) plain weak dominance
    /// on the three criteria is used, since the last mode no longer matters.
    /// Equal labels keep the one inserted first.
    pub fn insert(&mut self, label: Label, terminal: bool) -> Option<LabelId> {
        let covers = |a: &Label, b: &Label| {
            if terminal {
                a.cost.covers(&b.cost)
            } else {
                a.covers(b)
            }
        };

        let bag = self.bags.entry(label.node).or_default();
        if bag.iter().any(|&id| covers(&self.labels[id], &label)) {
            return None;
        }

        let alive = &mut self.alive;
        let labels = &self.labels;
        bag.retain(|&id| {
            if covers(&label, &labels[id]) {
                alive[id] = false;
                false
            } else {
                true
            }
        });

        let id = self.labels.len();
        bag.push(id);
        self.labels.push(label);
        self.alive.push(true);
        Some(id)
    }

    /// Live labels at a node, in insertion order.
    pub fn bag(&self, node: NodeId) -> impl Iterator<Item = LabelId> + '_ {
        self.bags
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .copied()
    }

    /// True if a live label at `node` weakly dominates `cost`.
    pub fn bag_covers(&self, node: NodeId, cost: &Criteria) -> bool {
        self.bag(node).any(|id| self.labels[id].cost.covers(cost))
    }

    /// Legs from the origin to the label, in travel order.
    pub fn path(&self, id: LabelId) -> Vec<Leg> {
        let mut legs = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let label = &self.labels[current];
            if let Some(leg) = &label.leg {
                legs.push(leg.clone());
            }
            cursor = label.parent;
        }
        legs.reverse();
        legs
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }
}
