//! Infection tracing: who infected whom.
//!
//! Seeds become roots, every other infected person becomes an edge
//! to their infector, never-infected persons are left out.

use crate::{
    person::HealthState,
    population::Population,
    types::PersonId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceNode {
    /// A seed infection ("patient zero").
    Root { id: PersonId, state: HealthState },
    Edge {
        id: PersonId,
        infected_by: PersonId,
        state: HealthState,
    },
}

impl TraceNode {
    pub fn id(&self) -> PersonId {
        match self {
            Self::Root { id, .. } | Self::Edge { id, .. } => *id,
        }
    }

    pub fn state(&self) -> HealthState {
        match self {
            Self::Root { state, .. } | Self::Edge { state, .. } => *state,
        }
    }
}

/// Walk the table in id order and emit one node per ever-infected person.
pub fn transmission_tree(population: &Population) -> Vec<TraceNode> {
    population
        .persons()
        .iter()
        .filter_map(|p| match p.infected_by {
            None => None,
            Some(by) if by == p.id => Some(TraceNode::Root { id: p.id, state: p.current_state }),
            Some(by) => Some(TraceNode::Edge { id: p.id, infected_by: by, state: p.current_state }),
        })
        .collect()
}

/// Direct secondary cases per infector, including infectors with zero.
pub fn secondary_cases(nodes: &[TraceNode]) -> BTreeMap<PersonId, usize> {
    let mut counts: BTreeMap<PersonId, usize> = nodes.iter().map(|n| (n.id(), 0)).collect();
    for node in nodes {
        if let TraceNode::Edge { infected_by, .. } = node {
            *counts.entry(*infected_by).or_default() += 1;
        }
    }
    counts
}

/// Number of transmission steps from a root to `id`, or None if `id`
/// is not in the tree.
pub fn generation_of(nodes: &[TraceNode], id: PersonId) -> Option<usize> {
    let parents: BTreeMap<PersonId, Option<PersonId>> = nodes
        .iter()
        .map(|n| match n {
            TraceNode::Root { id, .. } => (*id, None),
            TraceNode::Edge { id, infected_by, .. } => (*id, Some(*infected_by)),
        })
        .collect();

    let mut current = id;
    let mut depth = 0;
    loop {
        match parents.get(&current)? {
            None => return Some(depth),
            Some(parent) => {
                current = *parent;
                depth += 1;
                if depth > parents.len() {
                    return None;
                }
            }
        }
    }
}

/// Count of nodes per health state, used for the tracing legend.
pub fn state_breakdown(nodes: &[TraceNode]) -> BTreeMap<&'static str, usize> {
    let mut out = BTreeMap::new();
    for node in nodes {
        let key = match (node, node.state()) {
            (TraceNode::Root { .. }, _)          => "first_infection",
            (_, HealthState::Recovered)          => "recovered",
            (_, HealthState::Dead)               => "dead",
            _                                    => "currently_infected",
        };
        *out.entry(key).or_insert(0) += 1;
    }
    out
}
