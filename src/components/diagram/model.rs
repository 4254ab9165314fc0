//! Graph model: nodes, edges and agent ownership. No rendering knowledge.

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use thiserror::Error;

/// Permanent default agent. Always present, never deletable.
pub const UNASSIGNED: &str = "Unassigned";

const UNASSIGNED_COLOR: &str = "#ffffff";

/// The two node types. Edges must alternate between them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
	Function,
	Resource,
}

impl NodeKind {
	pub fn as_str(self) -> &'static str {
		match self {
			NodeKind::Function => "Function",
			NodeKind::Resource => "Resource",
		}
	}

	pub fn parse(s: &str) -> Option<NodeKind> {
		match s {
			"Function" => Some(NodeKind::Function),
			"Resource" => Some(NodeKind::Resource),
			_ => None,
		}
	}

	/// Label given to freshly added nodes.
	pub fn default_label(self) -> &'static str {
		match self {
			NodeKind::Function => "F",
			NodeKind::Resource => "R",
		}
	}
}

/// Per-node attributes. Position is world-space and authoritative in free
/// view; `layer` is an explicit assignment, resolved through the layer set
/// when absent.
#[derive(Clone, Debug)]
pub struct NodeInfo {
	pub kind: NodeKind,
	pub label: String,
	pub agent: String,
	pub x: f64,
	pub y: f64,
	pub layer: Option<String>,
}

impl NodeInfo {
	pub fn new(kind: NodeKind, x: f64, y: f64, layer: Option<String>) -> Self {
		Self {
			kind,
			label: kind.default_label().to_string(),
			agent: UNASSIGNED.to_string(),
			x,
			y,
			layer,
		}
	}
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GraphError {
	#[error("cannot connect {0} to {0}: connections must alternate (Func <-> Res)")]
	SameKind(&'static str),
	#[error("unknown node")]
	UnknownNode,
}

/// One architecture snapshot: a directed graph of functions and resources.
///
/// Node identity is the stable `NodeIndex` of the backing store; indices
/// survive unrelated removals, so snapshots taken for undo keep referring
/// to the same nodes. Cloning produces an independent deep copy.
#[derive(Clone, Debug, Default)]
pub struct ArchGraph {
	graph: StableDiGraph<NodeInfo, ()>,
}

impl ArchGraph {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_node(&mut self, info: NodeInfo) -> NodeIndex {
		self.graph.add_node(info)
	}

	/// Removes the node and every incident edge.
	pub fn remove_node(&mut self, idx: NodeIndex) {
		self.graph.remove_node(idx);
	}

	/// Adds the directed edge `a -> b` if it respects the bipartite
	/// constraint. Re-adding an existing edge is a no-op. On a violation
	/// the graph is left unchanged.
	pub fn connect(&mut self, a: NodeIndex, b: NodeIndex) -> Result<(), GraphError> {
		let (ka, kb) = match (self.graph.node_weight(a), self.graph.node_weight(b)) {
			(Some(na), Some(nb)) => (na.kind, nb.kind),
			_ => return Err(GraphError::UnknownNode),
		};
		if ka == kb {
			return Err(GraphError::SameKind(ka.as_str()));
		}
		if self.graph.find_edge(a, b).is_none() {
			self.graph.add_edge(a, b, ());
		}
		Ok(())
	}

	#[cfg(test)]
	pub(crate) fn connect_unchecked(&mut self, a: NodeIndex, b: NodeIndex) {
		if self.graph.find_edge(a, b).is_none() {
			self.graph.add_edge(a, b, ());
		}
	}

	pub fn disconnect(&mut self, a: NodeIndex, b: NodeIndex) {
		if let Some(e) = self.graph.find_edge(a, b) {
			self.graph.remove_edge(e);
		}
	}

	pub fn has_edge(&self, a: NodeIndex, b: NodeIndex) -> bool {
		self.graph.find_edge(a, b).is_some()
	}

	pub fn node(&self, idx: NodeIndex) -> Option<&NodeInfo> {
		self.graph.node_weight(idx)
	}

	pub fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut NodeInfo> {
		self.graph.node_weight_mut(idx)
	}

	pub fn contains(&self, idx: NodeIndex) -> bool {
		self.graph.contains_node(idx)
	}

	pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &NodeInfo)> {
		self.graph
			.node_indices()
			.filter_map(|i| self.graph.node_weight(i).map(|n| (i, n)))
	}

	pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
		self.graph.node_indices()
	}

	pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex)> + '_ {
		self.graph.edge_references().map(|e| (e.source(), e.target()))
	}

	pub fn successors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
		self.graph.neighbors_directed(idx, Direction::Outgoing)
	}

	pub fn node_count(&self) -> usize {
		self.graph.node_count()
	}

	pub fn edge_count(&self) -> usize {
		self.graph.edge_count()
	}

	pub fn in_degree(&self, idx: NodeIndex) -> usize {
		self.graph.neighbors_directed(idx, Direction::Incoming).count()
	}

	pub fn out_degree(&self, idx: NodeIndex) -> usize {
		self.graph.neighbors_directed(idx, Direction::Outgoing).count()
	}

	pub fn set_position(&mut self, idx: NodeIndex, x: f64, y: f64) {
		if let Some(n) = self.graph.node_weight_mut(idx) {
			n.x = x;
			n.y = y;
		}
	}

	/// Assigns `agent` to the node. Assigning to a Function cascades one
	/// hop to its direct successors; Resources do not cascade.
	pub fn assign_agent(&mut self, idx: NodeIndex, agent: &str) {
		let Some(kind) = self.graph.node_weight(idx).map(|n| n.kind) else {
			return;
		};
		if let Some(n) = self.graph.node_weight_mut(idx) {
			n.agent = agent.to_string();
		}
		if kind == NodeKind::Function {
			let succs: Vec<NodeIndex> = self.successors(idx).collect();
			for s in succs {
				if let Some(n) = self.graph.node_weight_mut(s) {
					n.agent = agent.to_string();
				}
			}
		}
	}

	/// Rewrites every node tagged `from` to `to`. Used on agent rename and
	/// delete.
	pub fn rewrite_agent(&mut self, from: &str, to: &str) {
		let indices: Vec<NodeIndex> = self.graph.node_indices().collect();
		for i in indices {
			if let Some(n) = self.graph.node_weight_mut(i) {
				if n.agent == from {
					n.agent = to.to_string();
				}
			}
		}
	}

	/// World-space bounding box over raw node positions.
	pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
		let mut it = self.nodes().map(|(_, n)| (n.x, n.y));
		let (x0, y0) = it.next()?;
		let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
		for (x, y) in it {
			min_x = min_x.min(x);
			min_y = min_y.min(y);
			max_x = max_x.max(x);
			max_y = max_y.max(y);
		}
		Some((min_x, min_y, max_x, max_y))
	}
}

/// Agent registry: ordered name -> color records.
#[derive(Clone, Debug)]
pub struct Agent {
	pub name: String,
	pub color: String,
}

#[derive(Clone, Debug)]
pub struct Agents {
	entries: Vec<Agent>,
}

impl Default for Agents {
	fn default() -> Self {
		Self {
			entries: vec![Agent {
				name: UNASSIGNED.to_string(),
				color: UNASSIGNED_COLOR.to_string(),
			}],
		}
	}
}

impl Agents {
	pub fn iter(&self) -> impl Iterator<Item = &Agent> {
		self.entries.iter()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.entries.iter().any(|a| a.name == name)
	}

	pub fn color_of(&self, name: &str) -> &str {
		self.entries
			.iter()
			.find(|a| a.name == name)
			.map(|a| a.color.as_str())
			.unwrap_or(UNASSIGNED_COLOR)
	}

	/// Registers a new agent. Returns false if the name is taken.
	pub fn add(&mut self, name: &str, color: &str) -> bool {
		if name.is_empty() || self.contains(name) {
			return false;
		}
		self.entries.push(Agent {
			name: name.to_string(),
			color: color.to_string(),
		});
		true
	}

	/// Renames/recolors an agent and rewrites every node referencing it.
	/// "Unassigned" cannot be renamed away; recoloring it is allowed.
	pub fn rename(&mut self, old: &str, new: &str, color: &str, graph: &mut ArchGraph) -> bool {
		if new.is_empty() || (old != new && self.contains(new)) {
			return false;
		}
		if old == UNASSIGNED && new != UNASSIGNED {
			return false;
		}
		let Some(entry) = self.entries.iter_mut().find(|a| a.name == old) else {
			return false;
		};
		entry.name = new.to_string();
		entry.color = color.to_string();
		if old != new {
			graph.rewrite_agent(old, new);
		}
		true
	}

	/// Deletes an agent, reverting its nodes to "Unassigned". Deleting
	/// "Unassigned" itself is refused.
	pub fn remove(&mut self, name: &str, graph: &mut ArchGraph) -> bool {
		if name == UNASSIGNED {
			return false;
		}
		let Some(pos) = self.entries.iter().position(|a| a.name == name) else {
			return false;
		};
		self.entries.remove(pos);
		graph.rewrite_agent(name, UNASSIGNED);
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn two_nodes(g: &mut ArchGraph) -> (NodeIndex, NodeIndex) {
		let f = g.add_node(NodeInfo::new(NodeKind::Function, 0.0, 0.0, None));
		let r = g.add_node(NodeInfo::new(NodeKind::Resource, 50.0, 0.0, None));
		(f, r)
	}

	#[test]
	fn connect_rejects_same_kind() {
		let mut g = ArchGraph::new();
		let f1 = g.add_node(NodeInfo::new(NodeKind::Function, 0.0, 0.0, None));
		let f2 = g.add_node(NodeInfo::new(NodeKind::Function, 10.0, 0.0, None));
		let r1 = g.add_node(NodeInfo::new(NodeKind::Resource, 20.0, 0.0, None));
		let r2 = g.add_node(NodeInfo::new(NodeKind::Resource, 30.0, 0.0, None));

		assert!(matches!(g.connect(f1, f2), Err(GraphError::SameKind(_))));
		assert!(matches!(g.connect(r1, r2), Err(GraphError::SameKind(_))));
		assert_eq!(g.edge_count(), 0);

		assert!(g.connect(f1, r1).is_ok());
		assert_eq!(g.edge_count(), 1);
	}

	#[test]
	fn connect_is_idempotent() {
		let mut g = ArchGraph::new();
		let (f, r) = two_nodes(&mut g);
		g.connect(f, r).unwrap();
		g.connect(f, r).unwrap();
		assert_eq!(g.edge_count(), 1);
	}

	#[test]
	fn remove_node_cascades_edges() {
		let mut g = ArchGraph::new();
		let (f, r) = two_nodes(&mut g);
		let f2 = g.add_node(NodeInfo::new(NodeKind::Function, 100.0, 0.0, None));
		g.connect(f, r).unwrap();
		g.connect(r, f2).unwrap();

		g.remove_node(r);
		assert_eq!(g.node_count(), 2);
		assert_eq!(g.edge_count(), 0);
	}

	#[test]
	fn agent_propagates_one_hop_from_functions() {
		let mut g = ArchGraph::new();
		let f = g.add_node(NodeInfo::new(NodeKind::Function, 0.0, 0.0, None));
		let r_out = g.add_node(NodeInfo::new(NodeKind::Resource, 10.0, 0.0, None));
		let r_in = g.add_node(NodeInfo::new(NodeKind::Resource, 20.0, 0.0, None));
		let f_two_hops = g.add_node(NodeInfo::new(NodeKind::Function, 30.0, 0.0, None));
		g.connect(f, r_out).unwrap();
		g.connect(r_in, f).unwrap();
		g.connect(r_out, f_two_hops).unwrap();

		g.assign_agent(f, "Team A");

		assert_eq!(g.node(f).unwrap().agent, "Team A");
		assert_eq!(g.node(r_out).unwrap().agent, "Team A");
		assert_eq!(g.node(r_in).unwrap().agent, UNASSIGNED);
		assert_eq!(g.node(f_two_hops).unwrap().agent, UNASSIGNED);
	}

	#[test]
	fn agent_does_not_propagate_from_resources() {
		let mut g = ArchGraph::new();
		let (f, r) = two_nodes(&mut g);
		g.connect(r, f).unwrap();

		g.assign_agent(r, "Team B");
		assert_eq!(g.node(r).unwrap().agent, "Team B");
		assert_eq!(g.node(f).unwrap().agent, UNASSIGNED);
	}

	#[test]
	fn agent_rename_rewrites_nodes() {
		let mut g = ArchGraph::new();
		let (f, _) = two_nodes(&mut g);
		let mut agents = Agents::default();
		agents.add("Ops", "#ff0000");
		g.assign_agent(f, "Ops");

		assert!(agents.rename("Ops", "Platform", "#00ff00", &mut g));
		assert_eq!(g.node(f).unwrap().agent, "Platform");
		assert_eq!(agents.color_of("Platform"), "#00ff00");
		assert!(!agents.contains("Ops"));
	}

	#[test]
	fn agent_delete_reverts_to_unassigned() {
		let mut g = ArchGraph::new();
		let (f, _) = two_nodes(&mut g);
		let mut agents = Agents::default();
		agents.add("Ops", "#ff0000");
		g.assign_agent(f, "Ops");

		assert!(agents.remove("Ops", &mut g));
		assert_eq!(g.node(f).unwrap().agent, UNASSIGNED);
	}

	#[test]
	fn unassigned_is_permanent() {
		let mut g = ArchGraph::new();
		let mut agents = Agents::default();
		assert!(!agents.remove(UNASSIGNED, &mut g));
		assert!(!agents.rename(UNASSIGNED, "Somebody", "#123456", &mut g));
		assert!(agents.contains(UNASSIGNED));
	}
}
