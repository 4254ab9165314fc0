//! Structural network files.
//!
//! The export carries semantic content only: stable node keys, a
//! kind/layer category per node, user labels, edge key pairs and
//! agent authority lists. Node identities are re-minted on import, so
//! files survive across sessions that number nodes differently.

use std::collections::HashMap;

use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::layers::LayerSet;
use super::model::{Agents, ArchGraph, NodeInfo, NodeKind, UNASSIGNED};

#[derive(Debug, Error)]
pub enum PersistError {
	#[error("{0}")]
	Json(#[from] serde_json::Error),
	#[error("node '{0}' has malformed category '{1}'")]
	BadCategory(String, String),
	#[error("duplicate node key '{0}'")]
	DuplicateKey(String),
	#[error("edge references unknown node '{0}'")]
	UnknownEdgeNode(String),
	#[error("edge '{0}' -> '{1}' violates the function/resource alternation")]
	InvalidEdge(String, String),
	#[error("agent '{0}' owns unknown node '{1}'")]
	UnknownOwnedNode(String, String),
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
	key: String,
	category: String,
	label: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pos: Option<(f64, f64)>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EdgeRecord {
	source: String,
	target: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AgentRecord {
	name: String,
	color: String,
	owns: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NetworkFile {
	nodes: Vec<NodeRecord>,
	edges: Vec<EdgeRecord>,
	agents: Vec<AgentRecord>,
}

fn key_of(idx: NodeIndex) -> String {
	format!("n{}", idx.index())
}

/// Serializes the graph with layers baked in, so the visual grouping
/// survives sessions whose layer table may resolve defaults differently.
pub fn export(graph: &ArchGraph, agents: &Agents, layers: &LayerSet) -> Result<String, PersistError> {
	let nodes = graph
		.nodes()
		.map(|(idx, n)| NodeRecord {
			key: key_of(idx),
			category: format!("{}/{}", n.kind.as_str(), layers.layer_of(n)),
			label: n.label.clone(),
			pos: Some((n.x, n.y)),
		})
		.collect();

	let edges = graph
		.edges()
		.map(|(a, b)| EdgeRecord {
			source: key_of(a),
			target: key_of(b),
		})
		.collect();

	let agents = agents
		.iter()
		.map(|agent| AgentRecord {
			name: agent.name.clone(),
			color: agent.color.clone(),
			owns: graph
				.nodes()
				.filter(|(_, n)| n.agent == agent.name)
				.map(|(idx, _)| key_of(idx))
				.collect(),
		})
		.collect();

	Ok(serde_json::to_string_pretty(&NetworkFile { nodes, edges, agents })?)
}

/// Rebuilds a graph and agent registry from a network file. Node ids are
/// re-minted sequentially; agent assignment comes from the authority
/// lists; nodes without a position are laid out left to right within
/// their layer. Any malformed structure fails the whole import; nothing
/// is partially constructed for the caller.
pub fn import(text: &str, layers: &LayerSet) -> Result<(ArchGraph, Agents), PersistError> {
	let file: NetworkFile = serde_json::from_str(text)?;

	let mut graph = ArchGraph::new();
	let mut by_key: HashMap<String, NodeIndex> = HashMap::new();
	let mut per_layer: HashMap<String, usize> = HashMap::new();

	for rec in &file.nodes {
		let Some((kind, layer)) = rec.category.split_once('/') else {
			return Err(PersistError::BadCategory(rec.key.clone(), rec.category.clone()));
		};
		let Some(kind) = NodeKind::parse(kind) else {
			return Err(PersistError::BadCategory(rec.key.clone(), rec.category.clone()));
		};

		let mut info = NodeInfo::new(kind, 0.0, 0.0, Some(layer.to_string()));
		info.label = rec.label.clone();
		match rec.pos {
			Some((x, y)) => {
				info.x = x;
				info.y = y;
			}
			None => {
				let resolved = layers.layer_of(&info).to_string();
				let slot = per_layer.entry(resolved.clone()).or_insert(0);
				info.x = 100.0 + (*slot as f64) * 120.0;
				info.y = layers.y_of(&resolved).unwrap_or(0.0);
				*slot += 1;
			}
		}

		let idx = graph.add_node(info);
		if by_key.insert(rec.key.clone(), idx).is_some() {
			return Err(PersistError::DuplicateKey(rec.key.clone()));
		}
	}

	for rec in &file.edges {
		let Some(&a) = by_key.get(&rec.source) else {
			return Err(PersistError::UnknownEdgeNode(rec.source.clone()));
		};
		let Some(&b) = by_key.get(&rec.target) else {
			return Err(PersistError::UnknownEdgeNode(rec.target.clone()));
		};
		if graph.connect(a, b).is_err() {
			return Err(PersistError::InvalidEdge(rec.source.clone(), rec.target.clone()));
		}
	}

	let mut agents = Agents::default();
	for rec in &file.agents {
		if rec.name != UNASSIGNED {
			agents.add(&rec.name, &rec.color);
		}
		for key in &rec.owns {
			let Some(&idx) = by_key.get(key) else {
				return Err(PersistError::UnknownOwnedNode(rec.name.clone(), key.clone()));
			};
			if let Some(n) = graph.node_mut(idx) {
				n.agent = rec.name.clone();
			}
		}
	}

	Ok((graph, agents))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> (ArchGraph, Agents, LayerSet) {
		let layers = LayerSet::default();
		let mut g = ArchGraph::new();
		let f = g.add_node(NodeInfo::new(NodeKind::Function, 10.0, 20.0, None));
		let r = g.add_node(NodeInfo::new(
			NodeKind::Resource,
			30.0,
			40.0,
			Some("Base Environment".to_string()),
		));
		let f2 = g.add_node(NodeInfo::new(
			NodeKind::Function,
			50.0,
			60.0,
			Some("Synchronicity Functions".to_string()),
		));
		g.node_mut(f).unwrap().label = "ingest".to_string();
		g.node_mut(r).unwrap().label = "queue".to_string();
		g.node_mut(f2).unwrap().label = "dispatch".to_string();
		g.connect(f, r).unwrap();
		g.connect(r, f2).unwrap();

		let mut agents = Agents::default();
		agents.add("Team A", "#ffaa00");
		agents.add("Team B", "#00aaff");
		g.node_mut(f).unwrap().agent = "Team A".to_string();
		g.node_mut(r).unwrap().agent = "Team A".to_string();
		g.node_mut(f2).unwrap().agent = "Team B".to_string();
		(g, agents, layers)
	}

	fn label_of(g: &ArchGraph, idx: NodeIndex) -> &str {
		&g.node(idx).unwrap().label
	}

	#[test]
	fn round_trip_preserves_structure() {
		let (g, agents, layers) = sample();
		let text = export(&g, &agents, &layers).unwrap();
		let (g2, agents2) = import(&text, &layers).unwrap();

		let mut labels: Vec<&str> = g2.nodes().map(|(_, n)| n.label.as_str()).collect();
		labels.sort();
		assert_eq!(labels, vec!["dispatch", "ingest", "queue"]);

		let mut edge_labels: Vec<(String, String)> = g2
			.edges()
			.map(|(a, b)| (label_of(&g2, a).to_string(), label_of(&g2, b).to_string()))
			.collect();
		edge_labels.sort();
		assert_eq!(
			edge_labels,
			vec![
				("ingest".to_string(), "queue".to_string()),
				("queue".to_string(), "dispatch".to_string()),
			]
		);

		for (_, n) in g2.nodes() {
			match n.label.as_str() {
				"ingest" => {
					assert_eq!(n.agent, "Team A");
					assert_eq!(n.layer.as_deref(), Some("Distributed Work"));
				}
				"queue" => {
					assert_eq!(n.agent, "Team A");
					assert_eq!(n.layer.as_deref(), Some("Base Environment"));
				}
				"dispatch" => {
					assert_eq!(n.agent, "Team B");
					assert_eq!(n.layer.as_deref(), Some("Synchronicity Functions"));
				}
				other => panic!("unexpected label {other}"),
			}
		}
		assert!(agents2.contains("Team A"));
		assert!(agents2.contains("Team B"));
		assert!(agents2.contains(UNASSIGNED));
	}

	#[test]
	fn import_synthesizes_missing_positions_within_layer() {
		let layers = LayerSet::default();
		let text = r#"{
			"nodes": [
				{"key": "a", "category": "Function/Distributed Work", "label": "one"},
				{"key": "b", "category": "Function/Distributed Work", "label": "two"},
				{"key": "c", "category": "Resource/Base Environment", "label": "three"}
			],
			"edges": [],
			"agents": []
		}"#;
		let (g, _) = import(text, &layers).unwrap();

		let mut work_xs: Vec<f64> = g
			.nodes()
			.filter(|(_, n)| n.layer.as_deref() == Some("Distributed Work"))
			.map(|(_, n)| n.x)
			.collect();
		work_xs.sort_by(f64::total_cmp);
		assert_eq!(work_xs, vec![100.0, 220.0]);
		for (_, n) in g.nodes() {
			let want_y = if n.kind == NodeKind::Function { 400.0 } else { 550.0 };
			assert_eq!(n.y, want_y);
		}
	}

	#[test]
	fn import_rejects_malformed_category() {
		let layers = LayerSet::default();
		let text = r#"{
			"nodes": [{"key": "a", "category": "Widget", "label": "x"}],
			"edges": [],
			"agents": []
		}"#;
		assert!(matches!(
			import(text, &layers),
			Err(PersistError::BadCategory(_, _))
		));
	}

	#[test]
	fn import_rejects_same_kind_edges() {
		let layers = LayerSet::default();
		let text = r#"{
			"nodes": [
				{"key": "a", "category": "Function/Distributed Work", "label": "x"},
				{"key": "b", "category": "Function/Distributed Work", "label": "y"}
			],
			"edges": [{"source": "a", "target": "b"}],
			"agents": []
		}"#;
		assert!(matches!(
			import(text, &layers),
			Err(PersistError::InvalidEdge(_, _))
		));
	}

	#[test]
	fn import_rejects_unknown_edge_endpoint() {
		let layers = LayerSet::default();
		let text = r#"{
			"nodes": [{"key": "a", "category": "Function/Distributed Work", "label": "x"}],
			"edges": [{"source": "a", "target": "ghost"}],
			"agents": []
		}"#;
		assert!(matches!(
			import(text, &layers),
			Err(PersistError::UnknownEdgeNode(_))
		));
	}

	#[test]
	fn import_rejects_garbage_input() {
		let layers = LayerSet::default();
		assert!(matches!(import("nope", &layers), Err(PersistError::Json(_))));
	}
}
