//! Network analytics: cycles, communities, centrality, interdependence and
//! aggregate metrics.
//!
//! Every measure degrades to zero on degenerate input (empty graph,
//! disconnected graph, non-convergent iteration) instead of failing the
//! caller; a broken metric must never take the rest of the dashboard down
//! with it.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::stable_graph::NodeIndex;

use super::model::ArchGraph;

/// Power-iteration cap and tolerance for eigenvector centrality.
const EIGEN_MAX_ITER: usize = 100;
const EIGEN_TOL: f64 = 1e-4;

/// Dense adjacency scratch built once per computation.
struct Dense {
	nodes: Vec<NodeIndex>,
	out: Vec<Vec<usize>>,
	inn: Vec<Vec<usize>>,
	und: Vec<HashSet<usize>>,
}

impl Dense {
	fn build(g: &ArchGraph) -> Self {
		let mut nodes: Vec<NodeIndex> = g.node_indices().collect();
		nodes.sort();
		let pos: HashMap<NodeIndex, usize> =
			nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
		let n = nodes.len();
		let mut out = vec![Vec::new(); n];
		let mut inn = vec![Vec::new(); n];
		let mut und = vec![HashSet::new(); n];
		for (a, b) in g.edges() {
			let (i, j) = (pos[&a], pos[&b]);
			out[i].push(j);
			inn[j].push(i);
			if i != j {
				und[i].insert(j);
				und[j].insert(i);
			}
		}
		for adj in &mut out {
			adj.sort_unstable();
		}
		Self { nodes, out, inn, und }
	}

	fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Unique undirected node pairs with at least one edge between them.
	fn und_pairs(&self) -> HashSet<(usize, usize)> {
		let mut pairs = HashSet::new();
		for (i, adj) in self.und.iter().enumerate() {
			for &j in adj {
				pairs.insert((i.min(j), i.max(j)));
			}
		}
		pairs
	}
}

/// Enumerates all simple directed cycles, each as the ordered node walk
/// (the wraparound edge back to the first node is implied).
pub fn simple_cycles(g: &ArchGraph) -> Vec<Vec<NodeIndex>> {
	let d = Dense::build(g);
	let n = d.len();
	let mut cycles = Vec::new();
	let mut path = Vec::new();
	let mut on_path = vec![false; n];

	// Roots in ascending order; each cycle is found exactly once, rooted
	// at its smallest node.
	fn dfs(
		v: usize,
		root: usize,
		d: &Dense,
		path: &mut Vec<usize>,
		on_path: &mut Vec<bool>,
		cycles: &mut Vec<Vec<NodeIndex>>,
	) {
		for &w in &d.out[v] {
			if w == root {
				cycles.push(path.iter().map(|&i| d.nodes[i]).collect());
			} else if w > root && !on_path[w] {
				path.push(w);
				on_path[w] = true;
				dfs(w, root, d, path, on_path, cycles);
				path.pop();
				on_path[w] = false;
			}
		}
	}

	for root in 0..n {
		path.clear();
		path.push(root);
		on_path[root] = true;
		dfs(root, root, &d, &mut path, &mut on_path, &mut cycles);
		on_path[root] = false;
	}
	cycles
}

/// Greedy modularity communities over the undirected projection, sorted by
/// descending size for stable UI indexing.
pub fn communities(g: &ArchGraph) -> Vec<Vec<NodeIndex>> {
	let d = Dense::build(g);
	let n = d.len();
	if n == 0 {
		return Vec::new();
	}

	let pairs = d.und_pairs();
	let m = pairs.len() as f64;

	let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
	let mut alive = vec![true; n];
	let mut deg = vec![0.0_f64; n];
	let mut between: Vec<HashMap<usize, f64>> = vec![HashMap::new(); n];
	for &(i, j) in &pairs {
		deg[i] += 1.0;
		deg[j] += 1.0;
		*between[i].entry(j).or_insert(0.0) += 1.0;
		*between[j].entry(i).or_insert(0.0) += 1.0;
	}

	while m > 0.0 {
		// Best positive modularity gain among connected community pairs.
		let mut best: Option<(usize, usize, f64)> = None;
		for i in 0..n {
			if !alive[i] {
				continue;
			}
			for (&j, &cnt) in &between[i] {
				if j <= i || !alive[j] {
					continue;
				}
				let dq = cnt / m - deg[i] * deg[j] / (2.0 * m * m);
				if dq > 1e-12 && best.is_none_or(|(_, _, b)| dq > b) {
					best = Some((i, j, dq));
				}
			}
		}
		let Some((i, j, _)) = best else {
			break;
		};

		let moved = std::mem::take(&mut members[j]);
		members[i].extend(moved);
		deg[i] += deg[j];
		alive[j] = false;
		let links = std::mem::take(&mut between[j]);
		for (k, cnt) in links {
			between[k].remove(&j);
			if k != i {
				*between[i].entry(k).or_insert(0.0) += cnt;
				*between[k].entry(i).or_insert(0.0) += cnt;
			}
		}
		between[i].remove(&j);
	}

	let mut out: Vec<Vec<NodeIndex>> = (0..n)
		.filter(|&i| alive[i])
		.map(|i| {
			let mut c: Vec<NodeIndex> = members[i].iter().map(|&p| d.nodes[p]).collect();
			c.sort();
			c
		})
		.collect();
	out.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));
	out
}

/// Edges whose endpoints carry different agents, plus the touched nodes.
pub fn interdependence(g: &ArchGraph) -> (Vec<(NodeIndex, NodeIndex)>, Vec<NodeIndex>) {
	let mut edges = Vec::new();
	let mut nodes = HashSet::new();
	for (a, b) in g.edges() {
		let (Some(na), Some(nb)) = (g.node(a), g.node(b)) else {
			continue;
		};
		if na.agent != nb.agent {
			edges.push((a, b));
			nodes.insert(a);
			nodes.insert(b);
		}
	}
	let mut nodes: Vec<NodeIndex> = nodes.into_iter().collect();
	nodes.sort();
	(edges, nodes)
}

/// Centrality readout for a single node.
#[derive(Clone, Debug, Default)]
pub struct NodeMetrics {
	pub in_degree: usize,
	pub out_degree: usize,
	pub degree: f64,
	pub betweenness: f64,
	pub closeness: f64,
	pub eigenvector: f64,
}

pub fn node_metrics(g: &ArchGraph, idx: NodeIndex) -> NodeMetrics {
	if !g.contains(idx) {
		return NodeMetrics::default();
	}
	let d = Dense::build(g);
	let pos = d.nodes.iter().position(|&n| n == idx).unwrap_or(0);
	NodeMetrics {
		in_degree: g.in_degree(idx),
		out_degree: g.out_degree(idx),
		degree: degree_centrality(&d, pos),
		betweenness: betweenness(&d).get(pos).copied().unwrap_or(0.0),
		closeness: closeness(&d, pos),
		eigenvector: eigenvector(&d).get(pos).copied().unwrap_or(0.0),
	}
}

fn degree_centrality(d: &Dense, i: usize) -> f64 {
	let n = d.len();
	if n < 2 {
		return 0.0;
	}
	(d.out[i].len() + d.inn[i].len()) as f64 / (n - 1) as f64
}

/// Brandes shortest-path betweenness, unweighted, normalized over directed
/// node pairs.
fn betweenness(d: &Dense) -> Vec<f64> {
	let n = d.len();
	let mut cb = vec![0.0_f64; n];
	if n < 3 {
		return cb;
	}
	for s in 0..n {
		let mut stack = Vec::new();
		let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
		let mut sigma = vec![0.0_f64; n];
		let mut dist = vec![-1i64; n];
		sigma[s] = 1.0;
		dist[s] = 0;
		let mut queue = VecDeque::new();
		queue.push_back(s);
		while let Some(v) = queue.pop_front() {
			stack.push(v);
			for &w in &d.out[v] {
				if dist[w] < 0 {
					dist[w] = dist[v] + 1;
					queue.push_back(w);
				}
				if dist[w] == dist[v] + 1 {
					sigma[w] += sigma[v];
					preds[w].push(v);
				}
			}
		}
		let mut delta = vec![0.0_f64; n];
		while let Some(w) = stack.pop() {
			for &v in &preds[w] {
				delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
			}
			if w != s {
				cb[w] += delta[w];
			}
		}
	}
	let scale = 1.0 / ((n - 1) as f64 * (n - 2) as f64);
	for c in &mut cb {
		*c *= scale;
	}
	cb
}

/// Closeness over incoming distances, scaled by the fraction of the graph
/// that can reach the node.
fn closeness(d: &Dense, i: usize) -> f64 {
	let n = d.len();
	if n < 2 {
		return 0.0;
	}
	let dist = bfs(&d.inn, i);
	let mut sum = 0.0;
	let mut reached = 0.0;
	for dd in dist.into_iter().flatten() {
		sum += dd as f64;
		reached += 1.0;
	}
	if sum <= 0.0 {
		return 0.0;
	}
	let frac = (reached - 1.0) / (n - 1) as f64;
	(reached - 1.0) / sum * frac
}

/// Power iteration on incoming edges. Zero for every node when the
/// iteration fails to converge or the graph is degenerate.
fn eigenvector(d: &Dense) -> Vec<f64> {
	let n = d.len();
	if n == 0 {
		return Vec::new();
	}
	let mut x = vec![1.0 / n as f64; n];
	for _ in 0..EIGEN_MAX_ITER {
		let xlast = x.clone();
		for (v, adj) in d.out.iter().enumerate() {
			for &w in adj {
				x[w] += xlast[v];
			}
		}
		let norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
		let norm = if norm > 0.0 { norm } else { 1.0 };
		for v in &mut x {
			*v /= norm;
		}
		let diff: f64 = x.iter().zip(&xlast).map(|(a, b)| (a - b).abs()).sum();
		if diff < n as f64 * EIGEN_TOL {
			return x;
		}
	}
	vec![0.0; n]
}

fn bfs(adj: &[Vec<usize>], start: usize) -> Vec<Option<u32>> {
	let mut dist = vec![None; adj.len()];
	dist[start] = Some(0);
	let mut queue = VecDeque::new();
	queue.push_back(start);
	while let Some(v) = queue.pop_front() {
		let dv = dist[v].unwrap_or(0);
		for &w in &adj[v] {
			if dist[w].is_none() {
				dist[w] = Some(dv + 1);
				queue.push_back(w);
			}
		}
	}
	dist
}

fn bfs_sets(adj: &[HashSet<usize>], start: usize) -> Vec<Option<u32>> {
	let mut dist = vec![None; adj.len()];
	dist[start] = Some(0);
	let mut queue = VecDeque::new();
	queue.push_back(start);
	while let Some(v) = queue.pop_front() {
		let dv = dist[v].unwrap_or(0);
		for &w in &adj[v] {
			if dist[w].is_none() {
				dist[w] = Some(dv + 1);
				queue.push_back(w);
			}
		}
	}
	dist
}

/// Whole-graph statistics for the dashboard and the comparison table.
#[derive(Clone, Debug, Default)]
pub struct GraphMetrics {
	pub nodes: usize,
	pub edges: usize,
	pub density: f64,
	pub avg_degree: f64,
	pub avg_clustering: f64,
	pub cyclomatic: usize,
	pub global_efficiency: f64,
	pub avg_cycle_length: f64,
}

impl GraphMetrics {
	pub fn compute(g: &ArchGraph) -> Self {
		let d = Dense::build(g);
		let n = d.len();
		let e = g.edge_count();
		let mut metrics = GraphMetrics {
			nodes: n,
			edges: e,
			..Default::default()
		};
		if n == 0 {
			return metrics;
		}
		if n > 1 {
			metrics.density = e as f64 / (n * (n - 1)) as f64;
		}
		metrics.avg_degree = 2.0 * e as f64 / n as f64;
		metrics.avg_clustering = avg_clustering(&d);
		metrics.cyclomatic = (e + weak_components(&d)).saturating_sub(n);
		metrics.global_efficiency = global_efficiency(&d);
		let cycles = simple_cycles(g);
		if !cycles.is_empty() {
			metrics.avg_cycle_length =
				cycles.iter().map(|c| c.len() as f64).sum::<f64>() / cycles.len() as f64;
		}
		metrics
	}
}

fn avg_clustering(d: &Dense) -> f64 {
	let n = d.len();
	if n == 0 {
		return 0.0;
	}
	let mut total = 0.0;
	for adj in &d.und {
		let k = adj.len();
		if k < 2 {
			continue;
		}
		let mut links = 0;
		let neighbors: Vec<usize> = adj.iter().copied().collect();
		for (a, &u) in neighbors.iter().enumerate() {
			for &v in &neighbors[a + 1..] {
				if d.und[u].contains(&v) {
					links += 1;
				}
			}
		}
		total += 2.0 * links as f64 / (k * (k - 1)) as f64;
	}
	total / n as f64
}

fn weak_components(d: &Dense) -> usize {
	let n = d.len();
	let mut seen = vec![false; n];
	let mut count = 0;
	for s in 0..n {
		if seen[s] {
			continue;
		}
		count += 1;
		for (i, dd) in bfs_sets(&d.und, s).into_iter().enumerate() {
			if dd.is_some() {
				seen[i] = true;
			}
		}
	}
	count
}

fn global_efficiency(d: &Dense) -> f64 {
	let n = d.len();
	if n < 2 {
		return 0.0;
	}
	let mut sum = 0.0;
	for s in 0..n {
		for (t, dd) in bfs_sets(&d.und, s).into_iter().enumerate() {
			if t == s {
				continue;
			}
			if let Some(dist) = dd {
				sum += 1.0 / dist as f64;
			}
		}
	}
	sum / (n * (n - 1)) as f64
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::diagram::model::{NodeInfo, NodeKind};

	fn node(g: &mut ArchGraph, kind: NodeKind) -> NodeIndex {
		g.add_node(NodeInfo::new(kind, 0.0, 0.0, None))
	}

	#[test]
	fn triangle_has_exactly_one_cycle_of_length_three() {
		let mut g = ArchGraph::new();
		let a = node(&mut g, NodeKind::Function);
		let b = node(&mut g, NodeKind::Resource);
		let c = node(&mut g, NodeKind::Function);
		g.connect_unchecked(a, b);
		g.connect_unchecked(b, c);
		g.connect_unchecked(c, a);

		let cycles = simple_cycles(&g);
		assert_eq!(cycles.len(), 1);
		assert_eq!(cycles[0].len(), 3);

		let m = GraphMetrics::compute(&g);
		assert!((m.avg_cycle_length - 3.0).abs() < 1e-9);
		assert_eq!(m.cyclomatic, 1);
	}

	#[test]
	fn overlapping_two_cycles_are_both_found() {
		let mut g = ArchGraph::new();
		let f = node(&mut g, NodeKind::Function);
		let r1 = node(&mut g, NodeKind::Resource);
		let r2 = node(&mut g, NodeKind::Resource);
		g.connect(f, r1).unwrap();
		g.connect(r1, f).unwrap();
		g.connect(f, r2).unwrap();
		g.connect(r2, f).unwrap();

		let cycles = simple_cycles(&g);
		assert_eq!(cycles.len(), 2);
		assert!(cycles.iter().all(|c| c.len() == 2));
	}

	#[test]
	fn acyclic_graph_reports_no_cycles() {
		let mut g = ArchGraph::new();
		let f = node(&mut g, NodeKind::Function);
		let r = node(&mut g, NodeKind::Resource);
		g.connect(f, r).unwrap();
		assert!(simple_cycles(&g).is_empty());
		assert_eq!(GraphMetrics::compute(&g).avg_cycle_length, 0.0);
	}

	#[test]
	fn density_of_four_nodes_three_edges() {
		let mut g = ArchGraph::new();
		let f1 = node(&mut g, NodeKind::Function);
		let r1 = node(&mut g, NodeKind::Resource);
		let f2 = node(&mut g, NodeKind::Function);
		let r2 = node(&mut g, NodeKind::Resource);
		g.connect(f1, r1).unwrap();
		g.connect(r1, f2).unwrap();
		g.connect(f2, r2).unwrap();

		let m = GraphMetrics::compute(&g);
		assert!((m.density - 0.25).abs() < 1e-9);
	}

	#[test]
	fn metrics_on_empty_graph_are_zero() {
		let g = ArchGraph::new();
		let m = GraphMetrics::compute(&g);
		assert_eq!(m.nodes, 0);
		assert_eq!(m.edges, 0);
		assert_eq!(m.density, 0.0);
		assert_eq!(m.avg_clustering, 0.0);
		assert_eq!(m.global_efficiency, 0.0);
	}

	#[test]
	fn interdependence_empty_under_a_single_agent() {
		let mut g = ArchGraph::new();
		let f = node(&mut g, NodeKind::Function);
		let r = node(&mut g, NodeKind::Resource);
		g.connect(f, r).unwrap();

		let (edges, nodes) = interdependence(&g);
		assert!(edges.is_empty());
		assert!(nodes.is_empty());
	}

	#[test]
	fn one_cross_agent_edge_yields_edge_and_endpoints() {
		let mut g = ArchGraph::new();
		let f = node(&mut g, NodeKind::Function);
		let r = node(&mut g, NodeKind::Resource);
		let r2 = node(&mut g, NodeKind::Resource);
		g.connect(f, r).unwrap();
		g.connect(f, r2).unwrap();
		g.node_mut(r).unwrap().agent = "Team A".to_string();
		g.node_mut(f).unwrap().agent = "Team A".to_string();
		g.node_mut(r2).unwrap().agent = "Team B".to_string();

		let (edges, nodes) = interdependence(&g);
		assert_eq!(edges, vec![(f, r2)]);
		assert_eq!(nodes, vec![f, r2]);
	}

	#[test]
	fn communities_split_disconnected_pairs() {
		let mut g = ArchGraph::new();
		let f1 = node(&mut g, NodeKind::Function);
		let r1 = node(&mut g, NodeKind::Resource);
		let f2 = node(&mut g, NodeKind::Function);
		let r2 = node(&mut g, NodeKind::Resource);
		g.connect(f1, r1).unwrap();
		g.connect(r1, f1).unwrap();
		g.connect(f2, r2).unwrap();
		g.connect(r2, f2).unwrap();

		let comms = communities(&g);
		assert_eq!(comms.len(), 2);
		assert!(comms.iter().all(|c| c.len() == 2));
	}

	#[test]
	fn communities_sorted_by_descending_size() {
		let mut g = ArchGraph::new();
		let f1 = node(&mut g, NodeKind::Function);
		let r1 = node(&mut g, NodeKind::Resource);
		let f2 = node(&mut g, NodeKind::Function);
		let lone = node(&mut g, NodeKind::Resource);
		g.connect(f1, r1).unwrap();
		g.connect(r1, f2).unwrap();
		g.connect(f2, r1).unwrap();
		let _ = lone;

		let comms = communities(&g);
		assert!(!comms.is_empty());
		for pair in comms.windows(2) {
			assert!(pair[0].len() >= pair[1].len());
		}
		assert_eq!(comms[0].len(), 3);
	}

	#[test]
	fn path_centralities() {
		// a -> b -> c
		let mut g = ArchGraph::new();
		let a = node(&mut g, NodeKind::Function);
		let b = node(&mut g, NodeKind::Resource);
		let c = node(&mut g, NodeKind::Function);
		g.connect(a, b).unwrap();
		g.connect(b, c).unwrap();

		let mb = node_metrics(&g, b);
		assert_eq!(mb.in_degree, 1);
		assert_eq!(mb.out_degree, 1);
		assert!((mb.degree - 1.0).abs() < 1e-9);
		// Only the (a, c) pair routes through b; directed normalization
		// is (n-1)(n-2) = 2.
		assert!((mb.betweenness - 0.5).abs() < 1e-9);

		let mc = node_metrics(&g, c);
		// Both a and b reach c, at total distance 3.
		assert!((mc.closeness - 2.0 / 3.0).abs() < 1e-9);
		let ma = node_metrics(&g, a);
		assert_eq!(ma.closeness, 0.0);
	}

	#[test]
	fn eigenvector_balances_a_two_cycle() {
		let mut g = ArchGraph::new();
		let f = node(&mut g, NodeKind::Function);
		let r = node(&mut g, NodeKind::Resource);
		g.connect(f, r).unwrap();
		g.connect(r, f).unwrap();

		let mf = node_metrics(&g, f);
		let mr = node_metrics(&g, r);
		assert!((mf.eigenvector - mr.eigenvector).abs() < 1e-6);
		assert!((mf.eigenvector - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-3);
	}

	#[test]
	fn node_metrics_default_on_degenerate_graphs() {
		let mut g = ArchGraph::new();
		let lone = node(&mut g, NodeKind::Function);
		let m = node_metrics(&g, lone);
		assert_eq!(m.degree, 0.0);
		assert_eq!(m.betweenness, 0.0);
		assert_eq!(m.closeness, 0.0);
	}

	#[test]
	fn global_efficiency_of_one_edge_pair_is_one() {
		let mut g = ArchGraph::new();
		let f = node(&mut g, NodeKind::Function);
		let r = node(&mut g, NodeKind::Resource);
		g.connect(f, r).unwrap();
		let m = GraphMetrics::compute(&g);
		assert!((m.global_efficiency - 1.0).abs() < 1e-9);
	}

	#[test]
	fn clustering_of_an_undirected_triangle() {
		let mut g = ArchGraph::new();
		let a = node(&mut g, NodeKind::Function);
		let b = node(&mut g, NodeKind::Resource);
		let c = node(&mut g, NodeKind::Function);
		g.connect_unchecked(a, b);
		g.connect_unchecked(b, c);
		g.connect_unchecked(c, a);
		let m = GraphMetrics::compute(&g);
		assert!((m.avg_clustering - 1.0).abs() < 1e-9);
	}
}
