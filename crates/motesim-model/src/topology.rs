//! Topology descriptions.

use crate::{ModelError, ModelResult};
use motesim_common::NodeId;
use std::collections::HashSet;
use std::str::FromStr;
use tracing::{debug, warn};

/// A directed radio link with its gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    /// Transmitting node.
    pub source: NodeId,
    /// Receiving node.
    pub destination: NodeId,
    /// Link gain (dB).
    pub gain: f64,
}

/// Parsed topology: known nodes in first-seen order and links in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    declared_count: u32,
    nodes: Vec<NodeId>,
    known: HashSet<NodeId>,
    links: Vec<Link>,
}

impl Topology {
    /// Parse a topology description.
    ///
    /// The first line holds the declared node count, which is kept for
    /// reference only. Each following non-blank line is
    /// `source destination gain`; extra fields are ignored.
    pub fn parse(description: &str) -> ModelResult<Topology> {
        let mut lines = description.lines().enumerate();

        let declared_count = match lines.next() {
            Some((_, first)) => first.trim().parse::<u32>().map_err(|_| {
                ModelError::topology(1, format!("expected node count, got {:?}", first.trim()))
            })?,
            None => return Err(ModelError::topology(1, "missing node count")),
        };

        let mut topology = Topology {
            declared_count,
            ..Topology::default()
        };

        for (index, line) in lines {
            let line_no = index + 1;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() < 3 {
                return Err(ModelError::topology(
                    line_no,
                    format!("expected 3 fields, got {}", fields.len()),
                ));
            }

            let source = parse_node(fields[0], line_no)?;
            let destination = parse_node(fields[1], line_no)?;
            let gain = fields[2]
                .parse::<f64>()
                .ok()
                .filter(|g| g.is_finite())
                .ok_or_else(|| {
                    ModelError::topology(line_no, format!("invalid gain {:?}", fields[2]))
                })?;

            topology.add_link(Link {
                source,
                destination,
                gain,
            });
        }

        if topology.nodes.len() != declared_count as usize {
            warn!(
                declared = declared_count,
                distinct = topology.nodes.len(),
                "declared node count differs from nodes seen in links"
            );
        }
        debug!(
            nodes = topology.nodes.len(),
            links = topology.links.len(),
            "parsed topology"
        );

        Ok(topology)
    }

    fn add_link(&mut self, link: Link) {
        self.note_node(link.source);
        self.note_node(link.destination);
        self.links.push(link);
    }

    fn note_node(&mut self, node: NodeId) {
        if self.known.insert(node) {
            self.nodes.push(node);
        }
    }

    /// Node count declared on the first line.
    pub fn declared_count(&self) -> u32 {
        self.declared_count
    }

    /// Known nodes in first-seen order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Links in file order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Check whether a node appeared in any link.
    pub fn contains(&self, node: NodeId) -> bool {
        self.known.contains(&node)
    }

    /// Number of distinct nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl FromStr for Topology {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topology::parse(s)
    }
}

fn parse_node(field: &str, line: usize) -> ModelResult<NodeId> {
    field
        .parse::<u32>()
        .map(NodeId::new)
        .map_err(|_| ModelError::topology(line, format!("invalid node id {:?}", field)))
}
