//! Node identifiers, per-request state, and the edge table.

use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

use crate::classifier::DomainLabel;
use crate::error::GraphError;
use crate::graph::transcript::Transcript;

/// A node in the dispatch graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Router,
    Fitness,
    Nutrition,
    Health,
    Tracking,
    Miscellaneous,
    Lookup,
    NutritionResume,
    Terminal,
}

impl NodeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Router => "router",
            Self::Fitness => "fitness",
            Self::Nutrition => "nutrition",
            Self::Health => "health",
            Self::Tracking => "tracking",
            Self::Miscellaneous => "miscellaneous",
            Self::Lookup => "lookup",
            Self::NutritionResume => "nutrition_resume",
            Self::Terminal => "terminal",
        }
    }

    /// Node that handles a classified domain.
    pub fn for_label(label: DomainLabel) -> Self {
        match label {
            DomainLabel::Fitness => Self::Fitness,
            DomainLabel::Nutrition => Self::Nutrition,
            DomainLabel::Health => Self::Health,
            DomainLabel::Tracking => Self::Tracking,
            DomainLabel::Miscellaneous => Self::Miscellaneous,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one run owns. Created per request and never shared.
#[derive(Debug, Clone)]
pub struct RequestState {
    pub request_id: Uuid,
    pub user_id: String,
    pub transcript: Transcript,
    /// Routing decision of the node that just ran.
    pub next: Option<NodeId>,
    /// Set when the miscellaneous node hands the message to a specialist.
    pub rerouted_from: Option<NodeId>,
    /// Nodes executed, in order. `terminal` is never recorded.
    pub visited: Vec<NodeId>,
}

impl RequestState {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id: user_id.into(),
            transcript: Transcript::seeded(message),
            next: None,
            rerouted_from: None,
            visited: Vec::new(),
        }
    }
}

/// Outgoing edge of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Edge {
    /// Always go to this node.
    Static(NodeId),
    /// Follow the node's routing decision, restricted to `targets`.
    Conditional {
        targets: Vec<NodeId>,
        default: Option<NodeId>,
    },
}

impl Edge {
    /// Resolve the next node given the routing decision a node made.
    pub fn resolve(&self, from: NodeId, decision: Option<NodeId>) -> Result<NodeId, GraphError> {
        match self {
            Self::Static(to) => match decision {
                Some(other) if other != *to => Err(GraphError::UndefinedTransition { from, to: other }),
                _ => Ok(*to),
            },
            Self::Conditional { targets, default } => {
                let to = decision
                    .or(*default)
                    .ok_or(GraphError::MissingRoute { node: from })?;
                if targets.contains(&to) {
                    Ok(to)
                } else {
                    Err(GraphError::UndefinedTransition { from, to })
                }
            }
        }
    }
}

/// Outgoing edge per node.
#[derive(Debug, Clone)]
pub struct EdgeTable {
    edges: HashMap<NodeId, Edge>,
}

impl EdgeTable {
    /// The wellness routing topology.
    pub fn wellness() -> Self {
        use NodeId::*;

        let edges = HashMap::from([
            (
                Router,
                Edge::Conditional {
                    targets: vec![Fitness, Nutrition, Health, Tracking, Miscellaneous],
                    // Unlabelled router output lands on the progress tracker.
                    default: Some(Tracking),
                },
            ),
            (
                Nutrition,
                Edge::Conditional {
                    targets: vec![Lookup, Terminal],
                    default: None,
                },
            ),
            (Lookup, Edge::Static(NutritionResume)),
            (NutritionResume, Edge::Static(Terminal)),
            (Fitness, Edge::Static(Terminal)),
            (Health, Edge::Static(Terminal)),
            (Tracking, Edge::Static(Terminal)),
            (
                Miscellaneous,
                Edge::Conditional {
                    targets: vec![Fitness, Nutrition, Health, Terminal],
                    default: Some(Terminal),
                },
            ),
        ]);
        Self { edges }
    }

    /// Replace one node's outgoing edge.
    pub fn with_edge(mut self, from: NodeId, edge: Edge) -> Self {
        self.edges.insert(from, edge);
        self
    }

    pub fn next(&self, from: NodeId, decision: Option<NodeId>) -> Result<NodeId, GraphError> {
        match self.edges.get(&from) {
            Some(edge) => edge.resolve(from, decision),
            None => Err(GraphError::MissingRoute { node: from }),
        }
    }
}

impl Default for EdgeTable {
    fn default() -> Self {
        Self::wellness()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_follows_label_or_defaults_to_tracking() {
        let table = EdgeTable::wellness();
        assert_eq!(
            table.next(NodeId::Router, Some(NodeId::Health)).unwrap(),
            NodeId::Health
        );
        assert_eq!(table.next(NodeId::Router, None).unwrap(), NodeId::Tracking);
    }

    #[test]
    fn nutrition_requires_decision() {
        let table = EdgeTable::wellness();
        assert!(matches!(
            table.next(NodeId::Nutrition, None),
            Err(GraphError::MissingRoute { node: NodeId::Nutrition })
        ));
        assert_eq!(
            table.next(NodeId::Nutrition, Some(NodeId::Lookup)).unwrap(),
            NodeId::Lookup
        );
    }

    #[test]
    fn static_edges_reject_contradicting_decisions() {
        let table = EdgeTable::wellness();
        assert_eq!(
            table.next(NodeId::Lookup, Some(NodeId::NutritionResume)).unwrap(),
            NodeId::NutritionResume
        );
        assert_eq!(table.next(NodeId::Fitness, None).unwrap(), NodeId::Terminal);
        assert!(matches!(
            table.next(NodeId::Lookup, Some(NodeId::Terminal)),
            Err(GraphError::UndefinedTransition {
                from: NodeId::Lookup,
                to: NodeId::Terminal
            })
        ));
    }

    #[test]
    fn miscellaneous_never_routes_back() {
        let table = EdgeTable::wellness();
        for target in [NodeId::Router, NodeId::Miscellaneous, NodeId::Tracking] {
            assert!(table.next(NodeId::Miscellaneous, Some(target)).is_err());
        }
        assert_eq!(table.next(NodeId::Miscellaneous, None).unwrap(), NodeId::Terminal);
    }

    #[test]
    fn terminal_has_no_edge() {
        assert!(EdgeTable::wellness().next(NodeId::Terminal, None).is_err());
    }

    #[test]
    fn labels_map_to_nodes() {
        assert_eq!(NodeId::for_label(DomainLabel::Miscellaneous), NodeId::Miscellaneous);
        assert_eq!(NodeId::NutritionResume.to_string(), "nutrition_resume");
    }
}
