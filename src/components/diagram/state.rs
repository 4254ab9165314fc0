//! Editing session state: modes, gestures, hit-testing and dispatch.

use petgraph::stable_graph::NodeIndex;

use super::highlight::{HighlightGroup, HighlightSelection};
use super::history::History;
use super::layers::LayerSet;
use super::model::{Agents, ArchGraph, NodeInfo, NodeKind, UNASSIGNED};
use super::persist::{self, PersistError};
use super::view::ViewTransform;

/// Node radius in world units.
pub const NODE_RADIUS: f64 = 20.0;
/// Pointer travel (screen px) before a press becomes a drag.
pub const DRAG_THRESHOLD: f64 = 5.0;
/// Screen-space distance for edge hit-testing in delete mode.
pub const EDGE_HIT_THRESHOLD: f64 = 8.0;

/// The six editing modes. Selecting a mode clears any in-progress
/// two-step gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
	Select,
	AddFunction,
	AddResource,
	Connect,
	Delete,
	AssignAgent,
}

impl Mode {
	pub fn label(self) -> &'static str {
		match self {
			Mode::Select => "Select",
			Mode::AddFunction => "Add Func",
			Mode::AddResource => "Add Res",
			Mode::Connect => "Connect",
			Mode::Delete => "Delete",
			Mode::AssignAgent => "Assign Agent",
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViewMode {
	#[default]
	Free,
	Layered,
}

/// Current pointer gesture. A press starts as a candidate; it only becomes
/// a drag once travel exceeds `DRAG_THRESHOLD`, so short press/release
/// pairs dispatch as clicks.
#[derive(Clone, Debug, Default)]
enum Gesture {
	#[default]
	Idle,
	NodePress {
		node: NodeIndex,
		start: (f64, f64),
		pre: ArchGraph,
		dragging: bool,
	},
	Background {
		start: (f64, f64),
		last: (f64, f64),
		dragging: bool,
	},
}

/// All session state for the primary editor panel.
pub struct EditorState {
	pub graph: ArchGraph,
	pub agents: Agents,
	pub current_agent: String,
	pub mode: Mode,
	pub view_mode: ViewMode,
	pub transform: ViewTransform,
	pub layers: LayerSet,
	pub history: History,
	/// Pending first endpoint of a two-click connect.
	pub pending_source: Option<NodeIndex>,
	pub inspected: Option<NodeIndex>,
	pub highlight: HighlightSelection,
	/// Named in-memory snapshots for the comparison view.
	pub stored: Vec<(String, ArchGraph)>,
	gesture: Gesture,
	notice: Option<String>,
}

impl Default for EditorState {
	fn default() -> Self {
		Self::new()
	}
}

impl EditorState {
	pub fn new() -> Self {
		Self {
			graph: ArchGraph::new(),
			agents: Agents::default(),
			current_agent: UNASSIGNED.to_string(),
			mode: Mode::Select,
			view_mode: ViewMode::Free,
			transform: ViewTransform::default(),
			layers: LayerSet::default(),
			history: History::new(),
			pending_source: None,
			inspected: None,
			highlight: HighlightSelection::default(),
			stored: Vec::new(),
			gesture: Gesture::Idle,
			notice: None,
		}
	}

	pub fn set_mode(&mut self, mode: Mode) {
		self.mode = mode;
		self.pending_source = None;
	}

	pub fn toggle_view(&mut self) {
		self.view_mode = match self.view_mode {
			ViewMode::Free => ViewMode::Layered,
			ViewMode::Layered => ViewMode::Free,
		};
	}

	/// One user-visible notification slot; the component drains it after
	/// each event.
	pub fn take_notice(&mut self) -> Option<String> {
		self.notice.take()
	}

	fn push_notice(&mut self, msg: impl Into<String>) {
		self.notice = Some(msg.into());
	}

	fn is_live_dragging(&self, idx: NodeIndex) -> bool {
		matches!(
			self.gesture,
			Gesture::NodePress { node, dragging: true, .. } if node == idx
		)
	}

	/// World position a node is drawn at: the stored position in free
	/// view, the layer's fixed Y in layered view. A node being actively
	/// dragged shows its raw position until release.
	pub fn draw_pos(&self, idx: NodeIndex) -> Option<(f64, f64)> {
		let node = self.graph.node(idx)?;
		match self.view_mode {
			ViewMode::Free => Some((node.x, node.y)),
			ViewMode::Layered if self.is_live_dragging(idx) => Some((node.x, node.y)),
			ViewMode::Layered => {
				let name = self.layers.layer_of(node);
				let y = self.layers.y_of(name).unwrap_or(node.y);
				Some((node.x, y))
			}
		}
	}

	/// First node whose drawn disc contains the screen point. The hit
	/// radius scales with zoom like the node itself.
	pub fn node_at(&self, sx: f64, sy: f64) -> Option<NodeIndex> {
		let r = NODE_RADIUS * self.transform.zoom;
		for idx in self.graph.node_indices() {
			let (wx, wy) = self.draw_pos(idx)?;
			let (nx, ny) = self.transform.to_screen(wx, wy);
			if (sx - nx).hypot(sy - ny) <= r {
				return Some(idx);
			}
		}
		None
	}

	/// First edge within `EDGE_HIT_THRESHOLD` screen px of the point.
	pub fn edge_at(&self, sx: f64, sy: f64) -> Option<(NodeIndex, NodeIndex)> {
		for (u, v) in self.graph.edges() {
			let (ux, uy) = self.draw_pos(u)?;
			let (vx, vy) = self.draw_pos(v)?;
			let (x1, y1) = self.transform.to_screen(ux, uy);
			let (x2, y2) = self.transform.to_screen(vx, vy);
			if point_segment_distance(sx, sy, x1, y1, x2, y2) < EDGE_HIT_THRESHOLD {
				return Some((u, v));
			}
		}
		None
	}

	pub fn pointer_down(&mut self, x: f64, y: f64) {
		if let Some(node) = self.node_at(x, y) {
			// Candidate drag: snapshot now, commit only if it promotes.
			self.gesture = Gesture::NodePress {
				node,
				start: (x, y),
				pre: self.graph.clone(),
				dragging: false,
			};
			return;
		}
		if self.mode == Mode::Delete {
			if let Some((u, v)) = self.edge_at(x, y) {
				self.history.record(self.graph.clone());
				self.graph.disconnect(u, v);
				return;
			}
		}
		self.inspected = None;
		self.gesture = Gesture::Background {
			start: (x, y),
			last: (x, y),
			dragging: false,
		};
	}

	pub fn pointer_move(&mut self, x: f64, y: f64) {
		match &mut self.gesture {
			Gesture::Idle => {}
			Gesture::NodePress { node, start, dragging, .. } => {
				if !*dragging && (x - start.0).hypot(y - start.1) > DRAG_THRESHOLD {
					*dragging = true;
				}
				if *dragging {
					let node = *node;
					let (wx, wy) = self.transform.to_world(x, y);
					self.graph.set_position(node, wx, wy);
				}
			}
			Gesture::Background { start, last, dragging } => {
				if !*dragging && (x - start.0).hypot(y - start.1) > DRAG_THRESHOLD {
					*dragging = true;
				}
				if *dragging {
					let (dx, dy) = (x - last.0, y - last.1);
					*last = (x, y);
					self.transform.pan_by(dx, dy);
				}
			}
		}
	}

	pub fn pointer_up(&mut self, x: f64, y: f64) {
		match std::mem::take(&mut self.gesture) {
			Gesture::Idle => {}
			Gesture::NodePress { node, pre, dragging: true, .. } => {
				// A whole drag is a single undo step, snapshotted at
				// gesture start.
				self.history.record(pre);
				if self.view_mode == ViewMode::Layered {
					let (wx, wy) = self.transform.to_world(x, y);
					if let Some(layer) = self.layers.nearest(wy) {
						let (name, ly) = (layer.name.clone(), layer.y);
						if let Some(n) = self.graph.node_mut(node) {
							n.layer = Some(name);
							n.x = wx;
							n.y = ly;
						}
					}
				}
			}
			Gesture::NodePress { node, dragging: false, .. } => {
				self.handle_click(node);
			}
			Gesture::Background { dragging: false, .. } => {
				if matches!(self.mode, Mode::AddFunction | Mode::AddResource) {
					self.history.record(self.graph.clone());
					let (wx, wy) = self.transform.to_world(x, y);
					self.add_node(wx, wy);
				}
			}
			Gesture::Background { dragging: true, .. } => {}
		}
	}

	/// Cancels any in-flight gesture without committing it.
	pub fn pointer_leave(&mut self) {
		self.gesture = Gesture::Idle;
	}

	pub fn wheel(&mut self, sx: f64, sy: f64, zoom_in: bool) {
		self.transform.zoom_at(sx, sy, zoom_in);
	}

	fn handle_click(&mut self, node: NodeIndex) {
		self.inspected = Some(node);
		match self.mode {
			Mode::Select | Mode::AddFunction | Mode::AddResource => {}
			Mode::Delete => {
				self.history.record(self.graph.clone());
				self.graph.remove_node(node);
				self.inspected = None;
			}
			Mode::Connect => match self.pending_source.take() {
				None => self.pending_source = Some(node),
				Some(src) if src != node => {
					let pre = self.graph.clone();
					match self.graph.connect(src, node) {
						Ok(()) => self.history.record(pre),
						Err(e) => self.push_notice(format!("Connection error: {e}")),
					}
				}
				Some(_) => {}
			},
			Mode::AssignAgent => {
				let differs = self
					.graph
					.node(node)
					.is_some_and(|n| n.agent != self.current_agent);
				if differs {
					self.history.record(self.graph.clone());
					let agent = self.current_agent.clone();
					self.graph.assign_agent(node, &agent);
				}
			}
		}
	}

	fn add_node(&mut self, wx: f64, wy: f64) {
		let kind = if self.mode == Mode::AddFunction {
			NodeKind::Function
		} else {
			NodeKind::Resource
		};
		let layer = self.layers.default_for(kind).to_string();
		self.graph.add_node(NodeInfo::new(kind, wx, wy, Some(layer)));
	}

	pub fn undo(&mut self) {
		if self.history.undo(&mut self.graph) {
			self.after_graph_swap();
		}
	}

	pub fn redo(&mut self) {
		if self.history.redo(&mut self.graph) {
			self.after_graph_swap();
		}
	}

	fn after_graph_swap(&mut self) {
		self.gesture = Gesture::Idle;
		self.pending_source = None;
		if let Some(i) = self.inspected {
			if !self.graph.contains(i) {
				self.inspected = None;
			}
		}
	}

	/// Relabels the inspected node.
	pub fn set_inspected_label(&mut self, label: &str) {
		let Some(idx) = self.inspected.filter(|&i| self.graph.contains(i)) else {
			return;
		};
		self.history.record(self.graph.clone());
		if let Some(n) = self.graph.node_mut(idx) {
			n.label = label.to_string();
		}
	}

	/// Moves the inspected node to an explicit layer.
	pub fn set_inspected_layer(&mut self, layer: &str) {
		let Some(idx) = self.inspected.filter(|&i| self.graph.contains(i)) else {
			return;
		};
		if !self.layers.is_valid(layer) {
			return;
		}
		self.history.record(self.graph.clone());
		if let Some(n) = self.graph.node_mut(idx) {
			n.layer = Some(layer.to_string());
		}
	}

	pub fn create_agent(&mut self, name: &str, color: &str) {
		if !self.agents.add(name, color) {
			self.push_notice(format!("Agent '{name}' already exists"));
		}
	}

	pub fn rename_agent(&mut self, old: &str, new: &str, color: &str) {
		self.history.record(self.graph.clone());
		if !self.agents.rename(old, new, color, &mut self.graph) {
			self.push_notice(format!("Cannot rename agent '{old}'"));
			return;
		}
		if self.current_agent == old {
			self.current_agent = new.to_string();
		}
	}

	pub fn delete_agent(&mut self, name: &str) {
		if name == UNASSIGNED {
			self.push_notice("Cannot delete 'Unassigned'");
			return;
		}
		self.history.record(self.graph.clone());
		self.agents.remove(name, &mut self.graph);
		if self.current_agent == name {
			self.current_agent = UNASSIGNED.to_string();
		}
	}

	pub fn toggle_highlight(&mut self, selection: HighlightSelection) {
		self.highlight = self.highlight.toggled(selection);
	}

	/// Highlight groups for the current selection, built fresh from the
	/// live graph so they can never go stale across a mutation.
	pub fn highlight_groups(&self) -> Vec<HighlightGroup> {
		self.highlight.groups(&self.graph)
	}

	/// Keeps a named deep copy for later comparison. Re-using a name
	/// replaces the old snapshot.
	pub fn store_architecture(&mut self, name: &str) {
		if name.is_empty() {
			return;
		}
		if let Some(slot) = self.stored.iter_mut().find(|(n, _)| n == name) {
			slot.1 = self.graph.clone();
		} else {
			self.stored.push((name.to_string(), self.graph.clone()));
		}
	}

	pub fn export_json(&self) -> Result<String, PersistError> {
		persist::export(&self.graph, &self.agents, &self.layers)
	}

	/// Replaces the live graph from a network file. The pre-load graph is
	/// snapshotted for undo before the attempt; on failure it stays live
	/// and the error is surfaced as a notice.
	pub fn load_json(&mut self, text: &str) {
		self.history.record(self.graph.clone());
		match persist::import(text, &self.layers) {
			Ok((graph, agents)) => {
				self.graph = graph;
				self.agents = agents;
				self.current_agent = UNASSIGNED.to_string();
				self.inspected = None;
				self.pending_source = None;
			}
			Err(e) => {
				log::warn!("network load failed: {e}");
				self.push_notice(format!("Load error: {e}"));
			}
		}
	}
}

fn point_segment_distance(px: f64, py: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
	let (dx, dy) = (x2 - x1, y2 - y1);
	if dx == 0.0 && dy == 0.0 {
		return (px - x1).hypot(py - y1);
	}
	let t = ((px - x1) * dx + (py - y1) * dy) / (dx * dx + dy * dy);
	let t = t.clamp(0.0, 1.0);
	(px - (x1 + t * dx)).hypot(py - (y1 + t * dy))
}
