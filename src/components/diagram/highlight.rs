//! Highlight groups: analytics results turned into visual emphasis, drawn
//! beneath the normal graph.

use std::collections::HashMap;

use petgraph::stable_graph::NodeIndex;

use super::analytics;
use super::model::ArchGraph;

/// High-contrast palette for cycle highlights.
const CYCLE_COLORS: &[&str] = &[
	"#FF1493", "#00C000", "#00FFFF", "#FFD700", "#FF4500", "#9400D3", "#32CD32", "#1E90FF",
];

/// Softer palette for community groups.
const COMMUNITY_COLORS: &[&str] = &[
	"#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#B2BABB",
];

const INTERDEP_COLOR: &str = "#FF0000";

const CYCLE_WIDTH: f64 = 8.0;
const SINGLE_WIDTH: f64 = 10.0;
const GROUP_WIDTH: f64 = 10.0;
const INTERDEP_WIDTH: f64 = 8.0;

/// One set of emphasized nodes and edges, with its stroke styling.
#[derive(Clone, Debug)]
pub struct HighlightGroup {
	pub nodes: Vec<NodeIndex>,
	pub edges: Vec<(NodeIndex, NodeIndex)>,
	pub color: String,
	pub width: f64,
}

/// Which analytics view is currently highlighted. Toggling the active
/// selection again switches back to `Off`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HighlightSelection {
	#[default]
	Off,
	Cycles,
	Cycle(usize),
	Communities,
	Community(usize),
	Interdependence,
}

impl HighlightSelection {
	pub fn toggled(self, next: HighlightSelection) -> HighlightSelection {
		if self == next { HighlightSelection::Off } else { next }
	}

	/// Builds the highlight groups for this selection from the live graph.
	pub fn groups(self, g: &ArchGraph) -> Vec<HighlightGroup> {
		match self {
			HighlightSelection::Off => Vec::new(),
			HighlightSelection::Cycles => cycle_highlights(g),
			HighlightSelection::Cycle(i) => single_cycle_highlight(g, i),
			HighlightSelection::Communities => community_highlights(g),
			HighlightSelection::Community(i) => single_community_highlight(g, i),
			HighlightSelection::Interdependence => interdependence_highlight(g),
		}
	}
}

fn cycle_edges(path: &[NodeIndex]) -> Vec<(NodeIndex, NodeIndex)> {
	(0..path.len())
		.map(|j| (path[j], path[(j + 1) % path.len()]))
		.collect()
}

/// One group per simple cycle, colored round-robin from the palette.
pub fn cycle_highlights(g: &ArchGraph) -> Vec<HighlightGroup> {
	analytics::simple_cycles(g)
		.into_iter()
		.enumerate()
		.map(|(i, path)| HighlightGroup {
			edges: cycle_edges(&path),
			nodes: path,
			color: CYCLE_COLORS[i % CYCLE_COLORS.len()].to_string(),
			width: CYCLE_WIDTH,
		})
		.collect()
}

/// Only the cycle at `index`, keeping the color it has in the full view.
pub fn single_cycle_highlight(g: &ArchGraph, index: usize) -> Vec<HighlightGroup> {
	let cycles = analytics::simple_cycles(g);
	let Some(path) = cycles.into_iter().nth(index) else {
		return Vec::new();
	};
	vec![HighlightGroup {
		edges: cycle_edges(&path),
		nodes: path,
		color: CYCLE_COLORS[index % CYCLE_COLORS.len()].to_string(),
		width: SINGLE_WIDTH,
	}]
}

fn intra_edges(g: &ArchGraph, members: &[NodeIndex]) -> Vec<(NodeIndex, NodeIndex)> {
	let mut edges = Vec::new();
	for &u in members {
		for &v in members {
			if g.has_edge(u, v) {
				edges.push((u, v));
			}
		}
	}
	edges
}

/// One group per modularity community (largest first).
pub fn community_highlights(g: &ArchGraph) -> Vec<HighlightGroup> {
	analytics::communities(g)
		.into_iter()
		.enumerate()
		.map(|(i, members)| HighlightGroup {
			edges: intra_edges(g, &members),
			nodes: members,
			color: COMMUNITY_COLORS[i % COMMUNITY_COLORS.len()].to_string(),
			width: GROUP_WIDTH,
		})
		.collect()
}

pub fn single_community_highlight(g: &ArchGraph, index: usize) -> Vec<HighlightGroup> {
	let comms = analytics::communities(g);
	let Some(members) = comms.into_iter().nth(index) else {
		return Vec::new();
	};
	vec![HighlightGroup {
		edges: intra_edges(g, &members),
		nodes: members,
		color: COMMUNITY_COLORS[index % COMMUNITY_COLORS.len()].to_string(),
		width: GROUP_WIDTH,
	}]
}

/// Cross-agent coupling: at most one red group, empty when every edge stays
/// within a single agent.
pub fn interdependence_highlight(g: &ArchGraph) -> Vec<HighlightGroup> {
	let (edges, nodes) = analytics::interdependence(g);
	if edges.is_empty() {
		return Vec::new();
	}
	vec![HighlightGroup {
		nodes,
		edges,
		color: INTERDEP_COLOR.to_string(),
		width: INTERDEP_WIDTH,
	}]
}

/// Tracks how many highlight strokes have already been laid on each
/// undirected node pair during one render pass, and hands out perpendicular
/// offsets that alternate sides of the true edge line so the stack stays
/// balanced around it.
#[derive(Debug, Default)]
pub struct EdgeOffsets {
	counts: HashMap<(NodeIndex, NodeIndex), usize>,
}

impl EdgeOffsets {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn next(&mut self, a: NodeIndex, b: NodeIndex, width: f64) -> f64 {
		let key = (a.min(b), a.max(b));
		let k = self.counts.entry(key).or_insert(0);
		let offset = stroke_offset(*k, width);
		*k += 1;
		offset
	}
}

/// Offset of the k-th stroke on a shared pair: pairs of strokes flank the
/// edge line at growing distance.
fn stroke_offset(k: usize, width: f64) -> f64 {
	let magnitude = ((k / 2) as f64 + 0.5) * width;
	if k % 2 == 0 { -magnitude } else { magnitude }
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::diagram::model::{NodeInfo, NodeKind};

	fn node(g: &mut ArchGraph, kind: NodeKind) -> NodeIndex {
		g.add_node(NodeInfo::new(kind, 0.0, 0.0, None))
	}

	#[test]
	fn stroke_offsets_alternate_and_balance() {
		let w = 8.0;
		let offsets: Vec<f64> = (0..4).map(|k| stroke_offset(k, w)).collect();
		assert_eq!(offsets, vec![-4.0, 4.0, -12.0, 12.0]);
		assert!((offsets.iter().sum::<f64>()).abs() < 1e-9);
	}

	#[test]
	fn offsets_are_counted_per_undirected_pair() {
		let mut g = ArchGraph::new();
		let f = node(&mut g, NodeKind::Function);
		let r = node(&mut g, NodeKind::Resource);

		let mut offsets = EdgeOffsets::new();
		let first = offsets.next(f, r, 8.0);
		// The reverse direction stacks on the same pair.
		let second = offsets.next(r, f, 8.0);
		assert!((first + second).abs() < 1e-9);
		assert!(first < 0.0 && second > 0.0);
	}

	#[test]
	fn cycle_highlight_includes_wraparound_edge() {
		let mut g = ArchGraph::new();
		let f = node(&mut g, NodeKind::Function);
		let r = node(&mut g, NodeKind::Resource);
		g.connect(f, r).unwrap();
		g.connect(r, f).unwrap();

		let groups = cycle_highlights(&g);
		assert_eq!(groups.len(), 1);
		assert_eq!(groups[0].nodes.len(), 2);
		assert!(groups[0].edges.contains(&(f, r)));
		assert!(groups[0].edges.contains(&(r, f)));
	}

	#[test]
	fn single_cycle_out_of_range_is_empty() {
		let mut g = ArchGraph::new();
		let f = node(&mut g, NodeKind::Function);
		let r = node(&mut g, NodeKind::Resource);
		g.connect(f, r).unwrap();
		g.connect(r, f).unwrap();

		assert_eq!(single_cycle_highlight(&g, 0).len(), 1);
		assert!(single_cycle_highlight(&g, 5).is_empty());
	}

	#[test]
	fn toggle_is_idempotent() {
		let sel = HighlightSelection::Off;
		let on = sel.toggled(HighlightSelection::Cycles);
		assert_eq!(on, HighlightSelection::Cycles);
		let off = on.toggled(HighlightSelection::Cycles);
		assert_eq!(off, HighlightSelection::Off);
		// A different selection replaces rather than stacks.
		let other = on.toggled(HighlightSelection::Community(1));
		assert_eq!(other, HighlightSelection::Community(1));
	}

	#[test]
	fn interdependence_group_appears_only_with_cross_agent_edges() {
		let mut g = ArchGraph::new();
		let f = node(&mut g, NodeKind::Function);
		let r = node(&mut g, NodeKind::Resource);
		g.connect(f, r).unwrap();
		assert!(interdependence_highlight(&g).is_empty());

		g.node_mut(r).unwrap().agent = "Team B".to_string();
		let groups = interdependence_highlight(&g);
		assert_eq!(groups.len(), 1);
		assert_eq!(groups[0].edges, vec![(f, r)]);
		assert_eq!(groups[0].nodes.len(), 2);
	}
}
