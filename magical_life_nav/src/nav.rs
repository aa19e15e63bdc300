// Navigation graph for one dimension.
//
// The graph is a sparse map from walkable tile coordinate to `NavNode`,
// each node holding its outgoing `PathLink`s. Links are directed; two
// walkable neighbors are joined by one link each way. Storage is an
// `FxHashMap` for near-constant lookups, and each node's links live in a
// `SmallVec` sized for the eight possible neighbors, sorted by
// `Direction::ALL` order.
//
// Invariants (checked by `is_consistent`):
// - a link's `from` is the node that stores it;
// - a link's `to` is 8-adjacent to `from` and present as a node (no
//   dangling links);
// - each node's links are sorted by direction with no duplicates.
//
// Mutation is crate-private. Only `maintenance.rs` edits the graph, so
// outside code never observes a node without its links or a link without
// its reciprocal.
//
// See also: `maintenance.rs` for the incremental edit protocol,
// `pathfinding.rs` for A* over this graph, `registry.rs` which owns one
// `NavGraph` per dimension.
//
// **Critical constraint: determinism.** Hash iteration order is never
// observable: `nodes()` sorts, and searches walk each node's link list,
// which is in canonical direction order regardless of edit history.

use crate::types::{Coord, Direction};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A directed, costed step between two adjacent walkable tiles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathLink {
    pub from: Coord,
    pub to: Coord,
    /// Traversal cost: base step cost × terrain cost of `to` × any corner
    /// penalty.
    pub cost: f32,
}

impl PathLink {
    pub fn new(from: Coord, to: Coord, cost: f32) -> Self {
        Self { from, to, cost }
    }

    /// Step direction, or `None` if the endpoints are not adjacent.
    pub fn direction(&self) -> Option<Direction> {
        Direction::between(self.from, self.to)
    }
}

/// Sort key for a node's link list.
fn slot(link: &PathLink) -> usize {
    link.direction().map_or(usize::MAX, Direction::index)
}

/// A walkable tile in the graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavNode {
    /// Terrain multiplier for entering this tile, cached from the world.
    pub terrain_cost: f32,
    links: SmallVec<[PathLink; 8]>,
}

impl NavNode {
    fn new(terrain_cost: f32) -> Self {
        Self {
            terrain_cost,
            links: SmallVec::new(),
        }
    }

    /// Outgoing links in direction order.
    pub fn links(&self) -> &[PathLink] {
        &self.links
    }
}

#[derive(Clone, Debug, Default)]
pub struct NavGraph {
    nodes: FxHashMap<Coord, NavNode>,
    link_count: usize,
    /// Corners of a box containing every node. Grows on insert and is only
    /// reset by `clear`, so it may be looser than the live node set.
    extent: Option<(Coord, Coord)>,
}

/// Graphs are equal when they hold the same nodes and links. `extent`
/// depends on edit history and is ignored.
impl PartialEq for NavGraph {
    fn eq(&self, other: &Self) -> bool {
        self.link_count == other.link_count && self.nodes == other.nodes
    }
}

impl NavGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff `coord` is a walkable, registered node.
    pub fn has_node(&self, coord: Coord) -> bool {
        self.nodes.contains_key(&coord)
    }

    pub fn node(&self, coord: Coord) -> Option<&NavNode> {
        self.nodes.get(&coord)
    }

    /// Outgoing links from `coord`. Empty if the node is absent.
    pub fn neighbors(&self, coord: Coord) -> &[PathLink] {
        match self.nodes.get(&coord) {
            Some(node) => &node.links,
            None => &[],
        }
    }

    /// The link `from -> to`, if present.
    pub fn link(&self, from: Coord, to: Coord) -> Option<&PathLink> {
        self.neighbors(from).iter().find(|l| l.to == to)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of directed links.
    pub fn link_count(&self) -> usize {
        self.link_count
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node coordinates, sorted row-major.
    pub fn nodes(&self) -> Vec<Coord> {
        let mut coords: Vec<Coord> = self.nodes.keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    /// Every link in the graph, grouped by sorted source node.
    pub fn links(&self) -> Vec<PathLink> {
        self.nodes()
            .into_iter()
            .flat_map(|c| self.neighbors(c).iter().copied())
            .collect()
    }

    /// Nearest node to `coord` within `max_radius` 8-way steps, or `None`.
    ///
    /// Searches square rings outward. Within a ring the candidate with the
    /// smallest straight-line distance wins, then the smallest `Coord`.
    /// Rings are clipped to the node extent and only those crossing it are
    /// visited, so the work is bounded by the extent's size whatever
    /// `max_radius` or `coord` are.
    pub fn nearest_node(&self, coord: Coord, max_radius: u32) -> Option<Coord> {
        if self.has_node(coord) {
            return Some(coord);
        }
        let (lo, hi) = self.extent?;
        let (cx, cy) = (i64::from(coord.x), i64::from(coord.y));
        let (lx, ly) = (i64::from(lo.x), i64::from(lo.y));
        let (hx, hy) = (i64::from(hi.x), i64::from(hi.y));
        let near = [lx - cx, cx - hx, ly - cy, cy - hy]
            .into_iter()
            .fold(1, i64::max);
        let far = [cx - lx, hx - cx, cy - ly, hy - cy]
            .into_iter()
            .map(i64::abs)
            .fold(0, i64::max);
        let r_max = i64::from(max_radius).min(far);
        for r in near..=r_max {
            let best = ring(coord, r, (lo, hi))
                .filter(|&c| self.has_node(c))
                .min_by_key(|&c| {
                    let dx = i128::from(c.x) - i128::from(coord.x);
                    let dy = i128::from(c.y) - i128::from(coord.y);
                    (dx * dx + dy * dy, c)
                });
            if best.is_some() {
                return best;
            }
        }
        None
    }

    /// Links whose `to` node is missing. Empty on a consistent graph.
    pub fn dangling_links(&self) -> Vec<PathLink> {
        self.links()
            .into_iter()
            .filter(|l| !self.has_node(l.to))
            .collect()
    }

    /// Check every structural invariant listed in the module header.
    pub fn is_consistent(&self) -> bool {
        let mut counted = 0;
        for (&coord, node) in &self.nodes {
            counted += node.links.len();
            let ordered = node.links.windows(2).all(|w| slot(&w[0]) < slot(&w[1]));
            let valid = node.links.iter().all(|l| {
                l.from == coord && l.direction().is_some() && self.has_node(l.to)
            });
            if !ordered || !valid {
                return false;
            }
        }
        counted == self.link_count
    }

    // -- Crate-private mutation, used by `maintenance.rs` --

    /// Add a node with no links, or refresh the terrain cost of an existing
    /// one. Returns `true` if the node is new.
    pub(crate) fn insert_node(&mut self, coord: Coord, terrain_cost: f32) -> bool {
        match self.nodes.get_mut(&coord) {
            Some(node) => {
                node.terrain_cost = terrain_cost;
                false
            }
            None => {
                self.nodes.insert(coord, NavNode::new(terrain_cost));
                self.extent = Some(match self.extent {
                    Some((lo, hi)) => (
                        Coord::new(lo.x.min(coord.x), lo.y.min(coord.y)),
                        Coord::new(hi.x.max(coord.x), hi.y.max(coord.y)),
                    ),
                    None => (coord, coord),
                });
                true
            }
        }
    }

    /// Remove a node and its outgoing links. Incoming links are the
    /// caller's responsibility.
    pub(crate) fn remove_node(&mut self, coord: Coord) -> Option<NavNode> {
        let node = self.nodes.remove(&coord)?;
        self.link_count -= node.links.len();
        Some(node)
    }

    /// Insert `link`, or update its cost if `from -> to` already exists.
    /// Returns `false` (and changes nothing) if the endpoints are not
    /// adjacent or either is not a node.
    pub(crate) fn insert_link(&mut self, link: PathLink) -> bool {
        if link.direction().is_none() || !self.has_node(link.to) {
            return false;
        }
        let Some(node) = self.nodes.get_mut(&link.from) else {
            return false;
        };
        let key = slot(&link);
        match node.links.binary_search_by_key(&key, slot) {
            Ok(i) => node.links[i].cost = link.cost,
            Err(i) => {
                node.links.insert(i, link);
                self.link_count += 1;
            }
        }
        true
    }

    /// Remove the link `from -> to`. No-op if absent. Returns whether a
    /// link was removed.
    pub(crate) fn remove_link(&mut self, from: Coord, to: Coord) -> bool {
        let Some(node) = self.nodes.get_mut(&from) else {
            return false;
        };
        match node.links.iter().position(|l| l.to == to) {
            Some(i) => {
                node.links.remove(i);
                self.link_count -= 1;
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.link_count = 0;
        self.extent = None;
    }
}

/// Coordinates at exactly Chebyshev distance `r` (> 0) from `center` that
/// lie inside the box `lo..=hi`.
fn ring(center: Coord, r: i64, (lo, hi): (Coord, Coord)) -> impl Iterator<Item = Coord> {
    let (cx, cy) = (i64::from(center.x), i64::from(center.y));
    let (lx, ly) = (i64::from(lo.x), i64::from(lo.y));
    let (hx, hy) = (i64::from(hi.x), i64::from(hi.y));
    let rows = [cy - r, cy + r]
        .into_iter()
        .filter(move |y| (ly..=hy).contains(y))
        .flat_map(move |y| ((cx - r).max(lx)..=(cx + r).min(hx)).map(move |x| (x, y)));
    let sides = [cx - r, cx + r]
        .into_iter()
        .filter(move |x| (lx..=hx).contains(x))
        .flat_map(move |x| ((cy - r + 1).max(ly)..=(cy + r - 1).min(hy)).map(move |y| (x, y)));
    // Everything kept lies inside the box, so it fits in `i32`.
    rows.chain(sides)
        .map(|(x, y)| Coord::new(x as i32, y as i32))
}
