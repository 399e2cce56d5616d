//! Mention graph builder.
//!
//! # Invariants
//! - Nodes are the identities of loaded notes; notes without identity are
//!   not nodes and their mentions produce no edges.
//! - One edge per valid mention occurrence, in note order then text order.
//! - Self-mentions are inert: an edge always joins two different notes.
//! - `send`/`receive` counts are derived from edges only.

use crate::mention::parser::{extract_mentions, mention_target};
use crate::model::note::NoteRecord;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One validated mention from `source` to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MentionEdge {
    pub source: String,
    pub target: String,
}

/// Directed mention graph over loaded notes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    pub nodes: BTreeSet<String>,
    pub edges: Vec<MentionEdge>,
}

/// Per-note directional mention counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkCounts {
    /// Valid outbound mention occurrences.
    pub send: usize,
    /// Valid inbound mention occurrences.
    pub receive: usize,
}

/// Builds the graph from the current note set.
pub fn build_graph(notes: &[NoteRecord]) -> Graph {
    let nodes: BTreeSet<String> = notes
        .iter()
        .filter_map(|note| note.identity().map(str::to_string))
        .collect();

    let mut edges = Vec::new();
    for note in notes {
        let Some(source) = note.identity() else {
            continue;
        };
        for raw in extract_mentions(&note.content) {
            let target = mention_target(&raw);
            if target != source && nodes.contains(target) {
                edges.push(MentionEdge {
                    source: source.to_string(),
                    target: target.to_string(),
                });
            }
        }
    }

    Graph { nodes, edges }
}

/// Counts outbound and inbound edges per node. Every node has an entry.
pub fn compute_counts(graph: &Graph) -> BTreeMap<String, LinkCounts> {
    let mut counts: BTreeMap<String, LinkCounts> = graph
        .nodes
        .iter()
        .map(|node| (node.clone(), LinkCounts::default()))
        .collect();
    for edge in &graph.edges {
        counts.entry(edge.source.clone()).or_default().send += 1;
        counts.entry(edge.target.clone()).or_default().receive += 1;
    }
    counts
}

/// Node entry of the visualization payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayloadNode {
    pub id: String,
    pub content: String,
}

/// Point-in-time snapshot handed to the visualization surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphPayload {
    pub nodes: Vec<PayloadNode>,
    pub links: Vec<MentionEdge>,
}

impl GraphPayload {
    /// Pairs graph nodes with the live content of the notes they came from.
    pub fn from_graph(notes: &[NoteRecord], graph: &Graph) -> Self {
        let mut nodes = Vec::with_capacity(graph.nodes.len());
        let mut seen = BTreeSet::new();
        for note in notes {
            if let Some(identity) = note.identity() {
                if graph.nodes.contains(identity) && seen.insert(identity) {
                    nodes.push(PayloadNode {
                        id: identity.to_string(),
                        content: note.content.clone(),
                    });
                }
            }
        }
        Self {
            nodes,
            links: graph.edges.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// One-way receiver of graph snapshots.
pub trait GraphSink {
    fn publish(&mut self, payload: &GraphPayload);
}
