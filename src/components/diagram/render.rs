//! Canvas drawing: highlights underneath, then edges, then nodes.

use petgraph::stable_graph::NodeIndex;
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::compare::PanelState;
use super::highlight::{EdgeOffsets, HighlightGroup};
use super::model::{Agents, ArchGraph, NodeKind};
use super::state::{EditorState, NODE_RADIUS, ViewMode};
use super::view::ViewTransform;

type PosFn<'a> = dyn Fn(NodeIndex) -> Option<(f64, f64)> + 'a;

/// Full redraw of the primary editor panel.
pub fn render_editor(state: &EditorState, ctx: &CanvasRenderingContext2d, width: f64, height: f64) {
	ctx.set_fill_style_str("#ffffff");
	ctx.fill_rect(0.0, 0.0, width, height);

	if state.view_mode == ViewMode::Layered {
		draw_layer_guides(state, ctx, width);
	}

	let pos = |idx: NodeIndex| state.draw_pos(idx);
	let groups = state.highlight_groups();
	draw_highlight_groups(ctx, &groups, &state.transform, &pos);
	draw_edges(ctx, &state.graph, &state.transform, &pos);
	draw_nodes(
		ctx,
		&state.graph,
		&state.agents,
		&state.transform,
		&pos,
		state.pending_source,
		state.inspected,
		false,
	);
}

/// Redraw of one comparison panel. Panels always show raw positions.
pub fn render_panel(panel: &PanelState, ctx: &CanvasRenderingContext2d, width: f64, height: f64) {
	ctx.set_fill_style_str("#ffffff");
	ctx.fill_rect(0.0, 0.0, width, height);

	let pos = |idx: NodeIndex| panel.graph.node(idx).map(|n| (n.x, n.y));
	draw_highlight_groups(ctx, &panel.highlights, &panel.transform, &pos);
	draw_edges(ctx, &panel.graph, &panel.transform, &pos);
	draw_nodes(
		ctx,
		&panel.graph,
		&panel.agents,
		&panel.transform,
		&pos,
		None,
		None,
		true,
	);
}

fn draw_layer_guides(state: &EditorState, ctx: &CanvasRenderingContext2d, width: f64) {
	let dash = js_sys::Array::of2(&JsValue::from_f64(4.0), &JsValue::from_f64(4.0));
	let _ = ctx.set_line_dash(&dash);
	ctx.set_stroke_style_str("#dddddd");
	ctx.set_line_width(1.0);
	ctx.set_fill_style_str("#888888");
	ctx.set_font("italic 11px Arial");
	ctx.set_text_align("left");
	for layer in state.layers.iter() {
		let (_, sy) = state.transform.to_screen(0.0, layer.y);
		ctx.begin_path();
		ctx.move_to(0.0, sy);
		ctx.line_to(width, sy);
		ctx.stroke();
		let _ = ctx.fill_text(&layer.name, 10.0, sy - 10.0);
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

/// Halos and offset parallel strokes, drawn before the normal graph.
/// Strokes sharing an undirected node pair fan out to alternating sides.
fn draw_highlight_groups(
	ctx: &CanvasRenderingContext2d,
	groups: &[HighlightGroup],
	t: &ViewTransform,
	pos: &PosFn,
) {
	let mut offsets = EdgeOffsets::new();
	ctx.set_line_cap("round");
	for group in groups {
		let width = group.width * t.zoom;
		let halo = NODE_RADIUS * t.zoom + width / 2.0;

		ctx.set_fill_style_str(&group.color);
		for &n in &group.nodes {
			let Some((wx, wy)) = pos(n) else { continue };
			let (sx, sy) = t.to_screen(wx, wy);
			ctx.begin_path();
			let _ = ctx.arc(sx, sy, halo, 0.0, std::f64::consts::TAU);
			ctx.fill();
		}

		ctx.set_stroke_style_str(&group.color);
		ctx.set_line_width(width);
		for &(u, v) in &group.edges {
			let (Some((ux, uy)), Some((vx, vy))) = (pos(u), pos(v)) else {
				continue;
			};
			let (x1, y1) = t.to_screen(ux, uy);
			let (x2, y2) = t.to_screen(vx, vy);
			let (dx, dy) = (x2 - x1, y2 - y1);
			let len = dx.hypot(dy);
			if len < 1e-3 {
				continue;
			}
			let offset = offsets.next(u, v, width);
			let (ox, oy) = (-dy / len * offset, dx / len * offset);
			ctx.begin_path();
			ctx.move_to(x1 + ox, y1 + oy);
			ctx.line_to(x2 + ox, y2 + oy);
			ctx.stroke();
		}
	}
	ctx.set_line_cap("butt");
}

fn draw_edges(ctx: &CanvasRenderingContext2d, graph: &ArchGraph, t: &ViewTransform, pos: &PosFn) {
	let r = NODE_RADIUS * t.zoom;
	let arrow = 8.0 * t.zoom;
	ctx.set_stroke_style_str("#000000");
	ctx.set_fill_style_str("#000000");
	ctx.set_line_width(2.0 * t.zoom);
	for (u, v) in graph.edges() {
		let (Some((ux, uy)), Some((vx, vy))) = (pos(u), pos(v)) else {
			continue;
		};
		let (x1, y1) = t.to_screen(ux, uy);
		let (x2, y2) = t.to_screen(vx, vy);
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = dx.hypot(dy);
		if dist < 1e-3 {
			continue;
		}
		let (uxn, uyn) = (dx / dist, dy / dist);

		ctx.begin_path();
		ctx.move_to(x1, y1);
		ctx.line_to(x2 - uxn * (r + arrow), y2 - uyn * (r + arrow));
		ctx.stroke();

		// Arrowhead just outside the target node.
		let (tip_x, tip_y) = (x2 - uxn * (r + 2.0), y2 - uyn * (r + 2.0));
		let (back_x, back_y) = (tip_x - uxn * arrow, tip_y - uyn * arrow);
		let (px, py) = (-uyn * arrow * 0.5, uxn * arrow * 0.5);
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();
	}
}

#[allow(clippy::too_many_arguments)]
fn draw_nodes(
	ctx: &CanvasRenderingContext2d,
	graph: &ArchGraph,
	agents: &Agents,
	t: &ViewTransform,
	pos: &PosFn,
	selected: Option<NodeIndex>,
	inspected: Option<NodeIndex>,
	label_above: bool,
) {
	let r = NODE_RADIUS * t.zoom;
	ctx.set_text_align("center");
	for (idx, node) in graph.nodes() {
		let Some((wx, wy)) = pos(idx) else { continue };
		let (sx, sy) = t.to_screen(wx, wy);

		let (outline, outline_width) = if selected == Some(idx) {
			("#0000ff", 3.0)
		} else if inspected == Some(idx) {
			("#ffa500", 3.0)
		} else {
			("#000000", 1.0)
		};

		ctx.set_fill_style_str(agents.color_of(&node.agent));
		ctx.set_stroke_style_str(outline);
		ctx.set_line_width(outline_width);
		match node.kind {
			NodeKind::Function => {
				ctx.fill_rect(sx - r, sy - r, 2.0 * r, 2.0 * r);
				ctx.stroke_rect(sx - r, sy - r, 2.0 * r, 2.0 * r);
			}
			NodeKind::Resource => {
				ctx.begin_path();
				let _ = ctx.arc(sx, sy, r, 0.0, std::f64::consts::TAU);
				ctx.fill();
				ctx.stroke();
			}
		}

		let font_size = (10.0 * t.zoom).max(8.0);
		ctx.set_font(&format!("bold {font_size}px Arial"));
		ctx.set_fill_style_str("#000000");
		if label_above {
			ctx.set_text_baseline("bottom");
			let _ = ctx.fill_text(&node.label, sx, sy - r - 5.0 * t.zoom);
		} else {
			ctx.set_text_baseline("middle");
			let _ = ctx.fill_text(&node.label, sx, sy);
		}
	}
	ctx.set_text_baseline("alphabetic");
}
