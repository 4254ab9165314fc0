//! The editor component: canvas wiring, toolbar, dashboard and the
//! notification overlay.

use leptos::prelude::*;
use petgraph::stable_graph::NodeIndex;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent};

use super::analytics::{self, GraphMetrics};
use super::compare::CompareView;
use super::highlight::HighlightSelection;
use super::model::ArchGraph;
use super::render;
use super::state::{EditorState, Mode, ViewMode};

const STORAGE_KEY: &str = "jsat-canvas.network";

const MODES: &[Mode] = &[
	Mode::Select,
	Mode::AddFunction,
	Mode::AddResource,
	Mode::Connect,
	Mode::Delete,
	Mode::AssignAgent,
];

fn fmt3(v: f64) -> String {
	format!("{v:.3}")
}

fn canvas_context(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
	canvas
		.get_context("2d")
		.ok()
		.flatten()
		.and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
}

fn event_coords(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

fn local_storage() -> Option<web_sys::Storage> {
	web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

/// Interactive editor for one architecture diagram.
#[component]
pub fn DiagramEditor() -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state = StoredValue::new(EditorState::new());
	// Bumped after every event so the chrome re-reads the shared state.
	let version = RwSignal::new(0u32);
	let notice = RwSignal::new(Option::<String>::None);
	let show_compare = RwSignal::new(false);
	let agent_name = RwSignal::new(String::new());
	let agent_color = RwSignal::new("#cccccc".to_string());
	let store_name = RwSignal::new(String::new());

	// Redraw the canvas, surface any pending notice and nudge the chrome.
	let refresh = move || {
		if let Some(canvas) = canvas_ref.get_untracked() {
			let canvas: HtmlCanvasElement = canvas.into();
			if let Some(ctx) = canvas_context(&canvas) {
				let (w, h) = (canvas.width() as f64, canvas.height() as f64);
				state.with_value(|s| render::render_editor(s, &ctx, w, h));
			}
		}
		if let Some(msg) = state.try_update_value(|s| s.take_notice()).flatten() {
			notice.set(Some(msg));
		}
		version.update(|v| *v += 1);
	};

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let (w, h) = (
			canvas
				.parent_element()
				.map(|p| p.client_width() as f64)
				.unwrap_or(1000.0),
			canvas
				.parent_element()
				.map(|p| p.client_height() as f64)
				.unwrap_or(640.0),
		);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		state.update_value(|s| s.transform.center_on(&s.graph, w, h));
		refresh();
	});

	let on_mousedown = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let (x, y) = event_coords(&canvas, &ev);
		state.update_value(|s| s.pointer_down(x, y));
		refresh();
	};

	let on_mousemove = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let (x, y) = event_coords(&canvas, &ev);
		state.update_value(|s| s.pointer_move(x, y));
		refresh();
	};

	let on_mouseup = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let (x, y) = event_coords(&canvas, &ev);
		state.update_value(|s| s.pointer_up(x, y));
		refresh();
	};

	let on_mouseleave = move |_: MouseEvent| {
		state.update_value(|s| s.pointer_leave());
		refresh();
	};

	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let (x, y) = event_coords(&canvas, &ev);
		state.update_value(|s| s.wheel(x, y, ev.delta_y() <= 0.0));
		refresh();
	};

	let mode_buttons = move || {
		version.get();
		let current = state.with_value(|s| s.mode);
		MODES
			.iter()
			.map(|&mode| {
				let class = if mode == current { "mode active" } else { "mode" };
				view! {
					<button class=class on:click=move |_| {
						state.update_value(|s| s.set_mode(mode));
						refresh();
					}>{mode.label()}</button>
				}
			})
			.collect_view()
	};

	let view_label = move || {
		version.get();
		match state.with_value(|s| s.view_mode) {
			ViewMode::Free => "View: Free",
			ViewMode::Layered => "View: JSAT Layers",
		}
	};

	let highlight_buttons = move || {
		version.get();
		let (cycles, communities) = state.with_value(|s| {
			(
				analytics::simple_cycles(&s.graph).len(),
				analytics::communities(&s.graph).len(),
			)
		});
		let mk = |sel: HighlightSelection, label: String| {
			view! {
				<button on:click=move |_| {
					state.update_value(|s| s.toggle_highlight(sel));
					refresh();
				}>{label}</button>
			}
		};
		view! {
			<div class="highlight-row">
				{mk(HighlightSelection::Cycles, format!("Cycles ({cycles})"))}
				{(0..cycles)
					.map(|i| mk(HighlightSelection::Cycle(i), format!("#{i}")))
					.collect_view()}
			</div>
			<div class="highlight-row">
				{mk(HighlightSelection::Communities, format!("Communities ({communities})"))}
				{(0..communities)
					.map(|i| mk(HighlightSelection::Community(i), format!("#{i}")))
					.collect_view()}
			</div>
			<div class="highlight-row">
				{mk(HighlightSelection::Interdependence, "Interdependence".to_string())}
			</div>
		}
	};

	let on_save = move |_| {
		let result = state.with_value(|s| s.export_json());
		match result {
			Ok(json) => {
				let stored = local_storage().and_then(|s| s.set_item(STORAGE_KEY, &json).ok());
				if stored.is_none() {
					notice.set(Some("Save failed: storage unavailable".to_string()));
				}
			}
			Err(e) => notice.set(Some(format!("Save failed: {e}"))),
		}
	};

	let on_load = move |_| {
		let text = local_storage().and_then(|s| s.get_item(STORAGE_KEY).ok().flatten());
		match text {
			Some(text) => {
				state.update_value(|s| s.load_json(&text));
				refresh();
			}
			None => notice.set(Some("Load failed: no stored network".to_string())),
		}
	};

	let on_store = move |_| {
		let name = store_name.get_untracked();
		if name.is_empty() {
			notice.set(Some("Name the stored architecture first".to_string()));
			return;
		}
		state.update_value(|s| s.store_architecture(&name));
		store_name.set(String::new());
		refresh();
	};

	// Agent controls.
	let agent_options = move || {
		version.get();
		state.with_value(|s| {
			let current = s.current_agent.clone();
			s.agents
				.iter()
				.map(|a| {
					let name = a.name.clone();
					let selected = name == current;
					view! { <option value=name.clone() selected=selected>{name.clone()}</option> }
				})
				.collect_view()
		})
	};
	let on_agent_change = move |ev: web_sys::Event| {
		let agent = event_target_value(&ev);
		state.update_value(|s| s.current_agent = agent);
		refresh();
	};
	let on_new_agent = move |_| {
		let name = agent_name.get_untracked();
		let color = agent_color.get_untracked();
		state.update_value(|s| s.create_agent(&name, &color));
		agent_name.set(String::new());
		refresh();
	};
	// Rename applies the name/color fields to the currently selected agent.
	let on_rename_agent = move |_| {
		let new = agent_name.get_untracked();
		let color = agent_color.get_untracked();
		state.update_value(|s| {
			let old = s.current_agent.clone();
			s.rename_agent(&old, &new, &color);
		});
		agent_name.set(String::new());
		refresh();
	};
	let on_delete_agent = move |_| {
		state.update_value(|s| {
			let name = s.current_agent.clone();
			s.delete_agent(&name);
		});
		refresh();
	};

	// Nodes grouped by owning agent, in registry order.
	let agent_overview = move || {
		version.get();
		state.with_value(|s| {
			s.agents
				.iter()
				.map(|a| {
					let color = a.color.clone();
					let name = a.name.clone();
					let members: Vec<(NodeIndex, String)> = s
						.graph
						.nodes()
						.filter(|(_, n)| n.agent == a.name)
						.map(|(idx, n)| (idx, n.label.clone()))
						.collect();
					let body = if members.is_empty() {
						view! { <p class="agent-empty">"(Empty)"</p> }.into_any()
					} else {
						view! {
							<div class="agent-nodes">
								{members
									.into_iter()
									.map(|(idx, label)| {
										view! {
											<button class="agent-node" on:click=move |_| {
												state.update_value(|s| s.inspected = Some(idx));
												refresh();
											}>{format!("\u{2022} {label}")}</button>
										}
									})
									.collect_view()}
							</div>
						}
						.into_any()
					};
					view! {
						<div class="agent-group">
							<div class="agent-group-head">
								<span class="agent-swatch" style:background-color=color></span>
								<b>{name}</b>
							</div>
							{body}
						</div>
					}
				})
				.collect_view()
		})
	};

	// Inspector for the currently inspected node.
	let inspector = move || {
		version.get();
		let selected = state.with_value(|s| {
			let idx = s.inspected.filter(|&i| s.graph.contains(i))?;
			let node = s.graph.node(idx)?;
			let layer_names: Vec<String> = s.layers.names().map(str::to_string).collect();
			Some((
				idx.index(),
				node.label.clone(),
				s.layers.layer_of(node).to_string(),
				layer_names,
				analytics::node_metrics(&s.graph, idx),
			))
		});
		let Some((id, label, layer, layer_names, m)) = selected else {
			return view! { <p class="inspector-empty">"(Select a node to inspect)"</p> }.into_any();
		};
		view! {
			<div class="inspector">
				<div class="inspector-head">{format!("ID: {id} | Lbl: {label}")}</div>
				<label>
					"Label: "
					<input
						prop:value=label
						on:change=move |ev| {
							let label = event_target_value(&ev);
							state.update_value(|s| s.set_inspected_label(&label));
							refresh();
						}
					/>
				</label>
				<label>
					"Layer: "
					<select on:change=move |ev| {
						let layer = event_target_value(&ev);
						state.update_value(|s| s.set_inspected_layer(&layer));
						refresh();
					}>
						{layer_names
							.into_iter()
							.map(|name| {
								let selected = name == layer;
								view! {
									<option value=name.clone() selected=selected>{name.clone()}</option>
								}
							})
							.collect_view()}
					</select>
				</label>
				<pre class="inspector-metrics">{format!(
					"In-Degree:     {}\nOut-Degree:    {}\nDegree Cent.:  {}\nBetweenness:   {}\nCloseness:     {}\nEigenvector:   {}",
					m.in_degree,
					m.out_degree,
					fmt3(m.degree),
					fmt3(m.betweenness),
					fmt3(m.closeness),
					fmt3(m.eigenvector),
				)}</pre>
			</div>
		}
		.into_any()
	};

	let stats = move || {
		version.get();
		let m = state.with_value(|s| GraphMetrics::compute(&s.graph));
		format!(
			"Nodes: {} | Edges: {} | Density: {} | Avg Degree: {:.2} | Avg Clustering: {} | Cyclomatic: {} | Efficiency: {} | Avg Cycle Len: {:.2}",
			m.nodes,
			m.edges,
			fmt3(m.density),
			m.avg_degree,
			fmt3(m.avg_clustering),
			m.cyclomatic,
			fmt3(m.global_efficiency),
			m.avg_cycle_length,
		)
	};

	let status = move || {
		version.get();
		format!("Mode: {}", state.with_value(|s| s.mode.label()))
	};

	let compare_view = move || {
		show_compare.get().then(|| {
			let (graphs, agents) = state.with_value(|s| {
				let mut graphs: Vec<(String, ArchGraph)> =
					vec![("Current".to_string(), s.graph.clone())];
				graphs.extend(s.stored.iter().map(|(n, g)| (n.clone(), g.clone())));
				(graphs, s.agents.clone())
			});
			view! {
				<CompareView
					graphs=graphs
					agents=agents
					on_close=Callback::new(move |_| show_compare.set(false))
				/>
			}
		})
	};

	view! {
		<div class="diagram-editor">
			<div class="toolbar">
				<button
					disabled=move || {
						version.get();
						!state.with_value(|s| s.history.can_undo())
					}
					on:click=move |_| {
						state.update_value(|s| s.undo());
						refresh();
					}
				>"Undo"</button>
				<button
					disabled=move || {
						version.get();
						!state.with_value(|s| s.history.can_redo())
					}
					on:click=move |_| {
						state.update_value(|s| s.redo());
						refresh();
					}
				>"Redo"</button>
				<button on:click=move |_| {
					state.update_value(|s| s.toggle_view());
					refresh();
				}>{view_label}</button>
				{mode_buttons}
				<button on:click=on_save>"Save Network"</button>
				<button on:click=on_load>"Open Network"</button>
				<input
					placeholder="snapshot name"
					prop:value=store_name
					on:input=move |ev| store_name.set(event_target_value(&ev))
				/>
				<button on:click=on_store>"Store Architecture"</button>
				<button on:click=move |_| show_compare.set(true)>"Compare Architecture"</button>
			</div>
			<div class="workspace">
				<div class="canvas-holder">
					<canvas
						node_ref=canvas_ref
						class="diagram-canvas"
						on:mousedown=on_mousedown
						on:mousemove=on_mousemove
						on:mouseup=on_mouseup
						on:mouseleave=on_mouseleave
						on:wheel=on_wheel
					/>
				</div>
				<div class="dashboard">
					<h3>"Network Dashboard"</h3>
					{inspector}
					<div class="stats">{stats}</div>
					<div class="agent-controls">
						<label>
							"Current agent: "
							<select on:change=on_agent_change>{agent_options}</select>
						</label>
						<input
							placeholder="new agent"
							prop:value=agent_name
							on:input=move |ev| agent_name.set(event_target_value(&ev))
						/>
						<input
							prop:value=agent_color
							on:input=move |ev| agent_color.set(event_target_value(&ev))
						/>
						<button on:click=on_new_agent>"New Agent"</button>
						<button on:click=on_rename_agent>"Rename Agent"</button>
						<button on:click=on_delete_agent>"Delete Agent"</button>
					</div>
					<div class="agent-overview">
						<h4>"Agent Overview"</h4>
						{agent_overview}
					</div>
					{highlight_buttons}
				</div>
			</div>
			<div class="status-bar">{status}</div>
			{move || {
				notice.get().map(|msg| {
					view! {
						<div class="notice-overlay">
							<div class="notice">
								<p>{msg}</p>
								<button on:click=move |_| notice.set(None)>"Dismiss"</button>
							</div>
						</div>
					}
				})
			}}
			{compare_view}
		</div>
	}
}
