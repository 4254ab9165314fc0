//! Ordered horizontal layer bands used by the layered view mode.

use super::model::{NodeInfo, NodeKind};

#[derive(Clone, Debug)]
pub struct Layer {
	pub name: String,
	pub y: f64,
}

/// The layer table, ordered top to bottom. Global to the editing session,
/// not part of any one graph.
#[derive(Clone, Debug)]
pub struct LayerSet {
	layers: Vec<Layer>,
}

impl Default for LayerSet {
	fn default() -> Self {
		let layers = [
			("Synchronicity Functions", 100.0),
			("Coordination Grounding", 250.0),
			("Distributed Work", 400.0),
			("Base Environment", 550.0),
		];
		Self {
			layers: layers
				.into_iter()
				.map(|(name, y)| Layer {
					name: name.to_string(),
					y,
				})
				.collect(),
		}
	}
}

impl LayerSet {
	pub fn iter(&self) -> impl Iterator<Item = &Layer> {
		self.layers.iter()
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.layers.iter().map(|l| l.name.as_str())
	}

	pub fn is_valid(&self, name: &str) -> bool {
		self.layers.iter().any(|l| l.name == name)
	}

	pub fn y_of(&self, name: &str) -> Option<f64> {
		self.layers.iter().find(|l| l.name == name).map(|l| l.y)
	}

	/// Default layer for a node kind: Resources sit on the base layer,
	/// Functions on "Distributed Work".
	pub fn default_for(&self, kind: NodeKind) -> &str {
		match kind {
			NodeKind::Resource => self
				.layers
				.last()
				.map(|l| l.name.as_str())
				.unwrap_or_default(),
			NodeKind::Function => "Distributed Work",
		}
	}

	/// Resolves a node's layer: its explicit assignment when still valid,
	/// otherwise the kind default.
	pub fn layer_of<'a>(&'a self, node: &'a NodeInfo) -> &'a str {
		match &node.layer {
			Some(name) if self.is_valid(name) => name,
			_ => self.default_for(node.kind),
		}
	}

	/// The layer whose fixed Y is closest to `world_y`. Ties go to the
	/// earlier layer in declared order.
	pub fn nearest(&self, world_y: f64) -> Option<&Layer> {
		let mut best: Option<(&Layer, f64)> = None;
		for layer in &self.layers {
			let dist = (world_y - layer.y).abs();
			if best.is_none_or(|(_, d)| dist < d) {
				best = Some((layer, dist));
			}
		}
		best.map(|(l, _)| l)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn explicit_layer_wins_when_valid() {
		let layers = LayerSet::default();
		let mut node = NodeInfo::new(NodeKind::Function, 0.0, 0.0, None);
		node.layer = Some("Base Environment".to_string());
		assert_eq!(layers.layer_of(&node), "Base Environment");
	}

	#[test]
	fn stale_layer_falls_back_to_kind_default() {
		let layers = LayerSet::default();
		let mut func = NodeInfo::new(NodeKind::Function, 0.0, 0.0, None);
		func.layer = Some("Removed Layer".to_string());
		assert_eq!(layers.layer_of(&func), "Distributed Work");

		let res = NodeInfo::new(NodeKind::Resource, 0.0, 0.0, None);
		assert_eq!(layers.layer_of(&res), "Base Environment");
	}

	#[test]
	fn nearest_breaks_ties_toward_earlier_layer() {
		let layers = LayerSet::default();
		// 175 is equidistant from 100 and 250.
		assert_eq!(layers.nearest(175.0).unwrap().name, "Synchronicity Functions");
		assert_eq!(layers.nearest(260.0).unwrap().name, "Coordination Grounding");
		assert_eq!(layers.nearest(10_000.0).unwrap().name, "Base Environment");
	}

	#[test]
	fn y_lookup_matches_table() {
		let layers = LayerSet::default();
		assert_eq!(layers.y_of("Distributed Work"), Some(400.0));
		assert_eq!(layers.y_of("nope"), None);
	}
}
