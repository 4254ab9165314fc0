//! Side-by-side comparison of stored architecture snapshots.
//!
//! Each compared graph gets its own panel controller: an independent view
//! transform and a reduced drag/pan/zoom/click gesture set. All panels run
//! the same metric definitions so the table stays comparable, and input on
//! one panel never touches another panel's graph or view.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use petgraph::stable_graph::NodeIndex;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent};

use super::analytics::{self, GraphMetrics};
use super::highlight::{HighlightGroup, HighlightSelection};
use super::model::{Agents, ArchGraph};
use super::render;
use super::state::NODE_RADIUS;
use super::view::ViewTransform;

const PANEL_WIDTH: f64 = 440.0;
const PANEL_HEIGHT: f64 = 340.0;

#[derive(Clone, Debug, Default)]
enum PanelGesture {
	#[default]
	Idle,
	Node(NodeIndex),
	Pan {
		last: (f64, f64),
	},
}

/// View state and gestures for one compared graph copy.
pub struct PanelState {
	pub name: String,
	pub graph: ArchGraph,
	pub agents: Agents,
	pub transform: ViewTransform,
	pub highlights: Vec<HighlightGroup>,
	gesture: PanelGesture,
	initialized: bool,
}

impl PanelState {
	pub fn new(name: impl Into<String>, graph: ArchGraph, agents: Agents) -> Self {
		Self {
			name: name.into(),
			graph,
			agents,
			transform: ViewTransform::default(),
			highlights: Vec::new(),
			gesture: PanelGesture::Idle,
			initialized: false,
		}
	}

	/// Centers the view once, on the first layout pass.
	pub fn init_view(&mut self, width: f64, height: f64) {
		if self.initialized {
			return;
		}
		self.transform.center_on(&self.graph, width, height);
		self.initialized = true;
	}

	/// Rebuilds this panel's highlight groups from one shared selection.
	pub fn apply_highlight(&mut self, selection: HighlightSelection) {
		self.highlights = selection.groups(&self.graph);
	}

	pub fn node_at(&self, sx: f64, sy: f64) -> Option<NodeIndex> {
		let r = NODE_RADIUS * self.transform.zoom;
		for (idx, n) in self.graph.nodes() {
			let (nx, ny) = self.transform.to_screen(n.x, n.y);
			if (sx - nx).hypot(sy - ny) <= r {
				return Some(idx);
			}
		}
		None
	}

	/// Press: grab a node (reporting its label for cross-panel inspection)
	/// or start panning.
	pub fn pointer_down(&mut self, x: f64, y: f64) -> Option<String> {
		if let Some(idx) = self.node_at(x, y) {
			self.gesture = PanelGesture::Node(idx);
			return self.graph.node(idx).map(|n| n.label.clone());
		}
		self.gesture = PanelGesture::Pan { last: (x, y) };
		None
	}

	pub fn pointer_move(&mut self, x: f64, y: f64) {
		match &mut self.gesture {
			PanelGesture::Idle => {}
			PanelGesture::Node(idx) => {
				let idx = *idx;
				let (wx, wy) = self.transform.to_world(x, y);
				self.graph.set_position(idx, wx, wy);
			}
			PanelGesture::Pan { last } => {
				let (dx, dy) = (x - last.0, y - last.1);
				*last = (x, y);
				self.transform.pan_by(dx, dy);
			}
		}
	}

	pub fn pointer_up(&mut self) {
		self.gesture = PanelGesture::Idle;
	}

	pub fn wheel(&mut self, sx: f64, sy: f64, zoom_in: bool) {
		self.transform.zoom_at(sx, sy, zoom_in);
	}
}

fn fmt3(v: f64) -> String {
	format!("{v:.3}")
}

/// Comparison row for one network and one inspected label.
fn inspect_row(name: &str, graph: &ArchGraph, label: &str) -> Vec<String> {
	let found = graph.nodes().find(|(_, n)| n.label == label);
	match found {
		Some((idx, n)) => {
			let m = analytics::node_metrics(graph, idx);
			vec![
				name.to_string(),
				n.agent.clone(),
				m.in_degree.to_string(),
				m.out_degree.to_string(),
				fmt3(m.degree),
				fmt3(m.eigenvector),
			]
		}
		None => vec![
			name.to_string(),
			"(not found)".to_string(),
			"-".to_string(),
			"-".to_string(),
			"-".to_string(),
			"-".to_string(),
		],
	}
}

fn event_coords(canvas: &HtmlCanvasElement, client_x: i32, client_y: i32) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(client_x as f64 - rect.left(), client_y as f64 - rect.top())
}

/// One canvas per compared snapshot.
#[component]
fn ComparePanel(
	state: PanelState,
	selection: RwSignal<HighlightSelection>,
	inspected: RwSignal<Option<String>>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let title = state.name.clone();
	let state = Rc::new(RefCell::new(state));

	let redraw = {
		let state = state.clone();
		move || {
			let Some(canvas) = canvas_ref.get_untracked() else {
				return;
			};
			let canvas: HtmlCanvasElement = canvas.into();
			let Ok(Some(ctx)) = canvas.get_context("2d") else {
				return;
			};
			let Ok(ctx) = ctx.dyn_into::<CanvasRenderingContext2d>() else {
				return;
			};
			render::render_panel(&state.borrow(), &ctx, PANEL_WIDTH, PANEL_HEIGHT);
		}
	};

	{
		let state = state.clone();
		let redraw = redraw.clone();
		Effect::new(move |_| {
			let Some(canvas) = canvas_ref.get() else {
				return;
			};
			let canvas: HtmlCanvasElement = canvas.into();
			canvas.set_width(PANEL_WIDTH as u32);
			canvas.set_height(PANEL_HEIGHT as u32);
			{
				let mut s = state.borrow_mut();
				s.init_view(PANEL_WIDTH, PANEL_HEIGHT);
				s.apply_highlight(selection.get());
			}
			redraw();
		});
	}

	let state_md = state.clone();
	let redraw_md = redraw.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let (x, y) = event_coords(&canvas, ev.client_x(), ev.client_y());
		if let Some(label) = state_md.borrow_mut().pointer_down(x, y) {
			inspected.set(Some(label));
		}
		redraw_md();
	};

	let state_mm = state.clone();
	let redraw_mm = redraw.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let (x, y) = event_coords(&canvas, ev.client_x(), ev.client_y());
		state_mm.borrow_mut().pointer_move(x, y);
		redraw_mm();
	};

	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		state_mu.borrow_mut().pointer_up();
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		state_ml.borrow_mut().pointer_up();
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let (x, y) = event_coords(&canvas, ev.client_x(), ev.client_y());
		state_wh.borrow_mut().wheel(x, y, ev.delta_y() <= 0.0);
		redraw();
	};

	view! {
		<div class="compare-panel">
			<div class="compare-panel-title">{title}</div>
			<canvas
				node_ref=canvas_ref
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
			/>
		</div>
	}
}

/// The comparison overlay: metrics table, one panel per snapshot, shared
/// highlight toggles and a cross-panel node inspector.
#[component]
pub fn CompareView(
	graphs: Vec<(String, ArchGraph)>,
	agents: Agents,
	on_close: Callback<()>,
) -> impl IntoView {
	let inspected = RwSignal::new(Option::<String>::None);
	let selection = RwSignal::new(HighlightSelection::Off);

	let metric_rows: Vec<(&'static str, Vec<String>)> = {
		let metrics: Vec<GraphMetrics> =
			graphs.iter().map(|(_, g)| GraphMetrics::compute(g)).collect();
		vec![
			("Nodes", metrics.iter().map(|m| m.nodes.to_string()).collect()),
			("Edges", metrics.iter().map(|m| m.edges.to_string()).collect()),
			("Density", metrics.iter().map(|m| fmt3(m.density)).collect()),
			(
				"Avg Degree",
				metrics.iter().map(|m| format!("{:.2}", m.avg_degree)).collect(),
			),
			(
				"Avg Clustering",
				metrics.iter().map(|m| fmt3(m.avg_clustering)).collect(),
			),
		]
	};
	let names: Vec<String> = graphs.iter().map(|(n, _)| n.clone()).collect();

	let panels: Vec<PanelState> = graphs
		.iter()
		.map(|(name, g)| PanelState::new(name.clone(), g.clone(), agents.clone()))
		.collect();

	let inspect_graphs = graphs;
	let toggle = move |next: HighlightSelection| {
		selection.update(|sel| *sel = sel.toggled(next));
	};

	view! {
		<div class="compare-view">
			<div class="compare-toolbar">
				<span class="compare-title">"Comparative Analytics"</span>
				<button on:click=move |_| toggle(HighlightSelection::Cycles)>"Cycles"</button>
				<button on:click=move |_| toggle(HighlightSelection::Communities)>"Communities"</button>
				<button on:click=move |_| toggle(HighlightSelection::Interdependence)>"Interdependence"</button>
				<button on:click=move |_| on_close.run(())>"Close"</button>
			</div>
			<table class="compare-metrics">
				<thead>
					<tr>
						<th>"Metric"</th>
						{names.iter().map(|n| view! { <th>{n.clone()}</th> }).collect_view()}
					</tr>
				</thead>
				<tbody>
					{metric_rows
						.into_iter()
						.map(|(metric, values)| {
							view! {
								<tr>
									<td>{metric}</td>
									{values.into_iter().map(|v| view! { <td>{v}</td> }).collect_view()}
								</tr>
							}
						})
						.collect_view()}
				</tbody>
			</table>
			<div class="compare-panels">
				{panels
					.into_iter()
					.map(|p| view! { <ComparePanel state=p selection=selection inspected=inspected /> })
					.collect_view()}
			</div>
			<div class="compare-inspector">
				{move || match inspected.get() {
					None => view! { <p>"Click a node to inspect it across networks."</p> }.into_any(),
					Some(label) => {
						let rows: Vec<Vec<String>> = inspect_graphs
							.iter()
							.map(|(name, g)| inspect_row(name, g, &label))
							.collect();
						view! {
							<table>
								<thead>
									<tr>
										<th>"Network"</th>
										<th>"Agent"</th>
										<th>"In-Degree"</th>
										<th>"Out-Degree"</th>
										<th>"Degree Cent."</th>
										<th>"Eigenvector Cent."</th>
									</tr>
								</thead>
								<tbody>
									{rows
										.into_iter()
										.map(|cells| {
											view! {
												<tr>
													{cells
														.into_iter()
														.map(|c| view! { <td>{c}</td> })
														.collect_view()}
												</tr>
											}
										})
										.collect_view()}
								</tbody>
							</table>
						}
						.into_any()
					}
				}}
			</div>
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::diagram::model::{NodeInfo, NodeKind};

	fn panel_with_node() -> (PanelState, NodeIndex) {
		let mut g = ArchGraph::new();
		let f = g.add_node(NodeInfo::new(NodeKind::Function, 100.0, 100.0, None));
		g.node_mut(f).unwrap().label = "ingest".to_string();
		(PanelState::new("Current", g, Agents::default()), f)
	}

	#[test]
	fn press_on_node_reports_label_and_drags_it() {
		let (mut p, f) = panel_with_node();
		let label = p.pointer_down(100.0, 100.0);
		assert_eq!(label.as_deref(), Some("ingest"));
		p.pointer_move(150.0, 130.0);
		p.pointer_up();
		let n = p.graph.node(f).unwrap();
		assert_eq!((n.x, n.y), (150.0, 130.0));
	}

	#[test]
	fn press_on_background_pans_the_view_only() {
		let (mut p, f) = panel_with_node();
		assert!(p.pointer_down(300.0, 300.0).is_none());
		p.pointer_move(340.0, 320.0);
		p.pointer_up();
		assert_eq!(p.transform.offset_x, 40.0);
		assert_eq!(p.transform.offset_y, 20.0);
		let n = p.graph.node(f).unwrap();
		assert_eq!((n.x, n.y), (100.0, 100.0));
	}

	#[test]
	fn init_view_centers_once() {
		let (mut p, _) = panel_with_node();
		p.init_view(400.0, 300.0);
		let (ox, oy) = (p.transform.offset_x, p.transform.offset_y);
		p.transform.pan_by(25.0, 0.0);
		p.init_view(400.0, 300.0);
		assert_eq!(p.transform.offset_x, ox + 25.0);
		assert_eq!(p.transform.offset_y, oy);
	}

	#[test]
	fn applied_highlights_come_from_this_panels_graph() {
		let (mut p, f) = panel_with_node();
		let r = p
			.graph
			.add_node(NodeInfo::new(NodeKind::Resource, 200.0, 100.0, None));
		p.graph.connect(f, r).unwrap();
		p.graph.connect(r, f).unwrap();
		p.apply_highlight(HighlightSelection::Cycles);
		assert_eq!(p.highlights.len(), 1);
		p.apply_highlight(HighlightSelection::Off);
		assert!(p.highlights.is_empty());
	}

	#[test]
	fn inspect_row_reports_missing_nodes() {
		let (p, _) = panel_with_node();
		let row = inspect_row(&p.name, &p.graph, "ghost");
		assert_eq!(row[1], "(not found)");
		let row = inspect_row(&p.name, &p.graph, "ingest");
		assert_eq!(row[0], "Current");
		assert_eq!(row[1], "Unassigned");
	}
}
