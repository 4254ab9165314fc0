//! World <-> screen mapping for one rendered panel.

use super::model::ArchGraph;

/// Multiplicative zoom change per wheel tick.
pub const ZOOM_STEP: f64 = 1.1;

const MIN_ZOOM: f64 = 0.1;
const MAX_ZOOM: f64 = 10.0;

/// Pan/zoom state. `to_world` is the exact inverse of `to_screen`.
#[derive(Clone, Debug)]
pub struct ViewTransform {
	pub zoom: f64,
	pub offset_x: f64,
	pub offset_y: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			zoom: 1.0,
			offset_x: 0.0,
			offset_y: 0.0,
		}
	}
}

impl ViewTransform {
	pub fn to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
		(wx * self.zoom + self.offset_x, wy * self.zoom + self.offset_y)
	}

	pub fn to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
		((sx - self.offset_x) / self.zoom, (sy - self.offset_y) / self.zoom)
	}

	pub fn pan_by(&mut self, dx: f64, dy: f64) {
		self.offset_x += dx;
		self.offset_y += dy;
	}

	/// One wheel tick, anchored so the world point under the cursor stays
	/// put. Zoom is clamped to [0.1, 10.0].
	pub fn zoom_at(&mut self, sx: f64, sy: f64, zoom_in: bool) {
		let factor = if zoom_in { ZOOM_STEP } else { 1.0 / ZOOM_STEP };
		let new_zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = new_zoom / self.zoom;
		self.offset_x = sx - (sx - self.offset_x) * ratio;
		self.offset_y = sy - (sy - self.offset_y) * ratio;
		self.zoom = new_zoom;
	}

	/// Offsets the view so the bounding box of all node positions sits in
	/// the middle of a `width` x `height` viewport. No-op on an empty graph.
	pub fn center_on(&mut self, graph: &ArchGraph, width: f64, height: f64) {
		let Some((min_x, min_y, max_x, max_y)) = graph.bounds() else {
			return;
		};
		let cx = (min_x + max_x) / 2.0;
		let cy = (min_y + max_y) / 2.0;
		self.offset_x = width / 2.0 - cx * self.zoom;
		self.offset_y = height / 2.0 - cy * self.zoom;
	}
}
