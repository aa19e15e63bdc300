// A* route search over a `NavGraph`, and the `PathFinder` capability trait.
//
// The open set is a `BinaryHeap` turned into a min-heap by reversed
// ordering. Entries compare by f-score, then by insertion sequence number,
// so among equal f-scores the entry pushed first is expanded first. Scores
// and came-from data live in `FxHashMap`s keyed by `Coord`; they are only
// probed, never iterated, so hash order cannot leak into the result.
//
// The heuristic comes from `NavConfig::heuristic`. With terrain costs
// clamped to >= 1 and corner penalties >= 1, octile distance under the
// configured step costs never overestimates, and neither does Euclidean
// distance once `validate()` has checked the cost ratio. Both are
// consistent, so a node's first expansion is final.
//
// See also: `nav.rs` for the graph being searched, `registry.rs` which
// implements `PathFinder` and holds the read lock around `astar`.
//
// **Critical constraint: determinism.** A search is a pure function of the
// graph, the endpoints, and the config.

use crate::config::{Heuristic, NavConfig};
use crate::error::NavError;
use crate::maintenance::BuildStats;
use crate::nav::{NavGraph, PathLink};
use crate::source::TileSource;
use crate::types::{Coord, DimensionId};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::collections::hash_map::Entry;

/// An ordered sequence of links from an origin to a destination.
///
/// Empty when origin and destination coincide. Waypoints are the `to`
/// fields of the links; the origin itself is not repeated.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub links: Vec<PathLink>,
}

impl Route {
    pub fn total_cost(&self) -> f32 {
        self.links.iter().map(|l| l.cost).sum()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Where the route ends, or `None` for an empty route.
    pub fn destination(&self) -> Option<Coord> {
        self.links.last().map(|l| l.to)
    }

    pub fn waypoints(&self) -> impl Iterator<Item = Coord> + '_ {
        self.links.iter().map(|l| l.to)
    }
}

/// The four operations every pathfinding strategy offers the world and the
/// creature turn logic.
pub trait PathFinder {
    /// Build (or rebuild) the graph for `dimension` from every walkable tile
    /// in `source`. Must run before the dimension answers route queries.
    fn initialize(
        &self,
        dimension: DimensionId,
        source: &dyn TileSource,
    ) -> Result<BuildStats, NavError>;

    /// `coord` has become walkable in `source`.
    fn add_connections(
        &self,
        dimension: DimensionId,
        coord: Coord,
        source: &dyn TileSource,
    ) -> Result<bool, NavError>;

    /// `coord` is no longer walkable.
    fn remove_connections(&self, dimension: DimensionId, coord: Coord)
    -> Result<bool, NavError>;

    /// Cheapest route from `origin` to `destination`.
    fn get_route(
        &self,
        dimension: DimensionId,
        origin: Coord,
        destination: Coord,
    ) -> Result<Route, NavError>;
}

/// Entry in the A* open set (min-heap via reversed ordering).
struct OpenEntry {
    coord: Coord,
    f_score: f32,
    seq: u64,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: smallest f_score, then earliest push, is "greatest".
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Per-node search bookkeeping.
struct Visit {
    g_score: f32,
    came_from: Option<PathLink>,
    closed: bool,
}

/// Find the cheapest route from `origin` to `destination`.
///
/// Fails with `NodeUnreachable` if either endpoint is not a node or no path
/// joins them. Never mutates the graph.
pub fn astar(
    graph: &NavGraph,
    origin: Coord,
    destination: Coord,
    config: &NavConfig,
) -> Result<Route, NavError> {
    let unreachable = NavError::NodeUnreachable {
        origin,
        destination,
    };
    if !graph.has_node(origin) || !graph.has_node(destination) {
        return Err(unreachable);
    }
    if origin == destination {
        return Ok(Route::default());
    }

    let mut visits: FxHashMap<Coord, Visit> = FxHashMap::default();
    visits.insert(
        origin,
        Visit {
            g_score: 0.0,
            came_from: None,
            closed: false,
        },
    );

    let mut seq = 0u64;
    let mut open = BinaryHeap::new();
    open.push(OpenEntry {
        coord: origin,
        f_score: heuristic(origin, destination, config),
        seq,
    });

    while let Some(current) = open.pop() {
        if current.coord == destination {
            return Ok(reconstruct_route(&visits, origin, destination));
        }

        let Some(visit) = visits.get_mut(&current.coord) else {
            continue;
        };
        if visit.closed {
            continue;
        }
        visit.closed = true;
        let current_g = visit.g_score;

        for link in graph.neighbors(current.coord) {
            let tentative_g = current_g + link.cost;
            let improved = match visits.entry(link.to) {
                Entry::Occupied(mut entry) => {
                    let v = entry.get_mut();
                    if !v.closed && tentative_g < v.g_score {
                        v.g_score = tentative_g;
                        v.came_from = Some(*link);
                        true
                    } else {
                        false
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(Visit {
                        g_score: tentative_g,
                        came_from: Some(*link),
                        closed: false,
                    });
                    true
                }
            };
            if improved {
                seq += 1;
                open.push(OpenEntry {
                    coord: link.to,
                    f_score: tentative_g + heuristic(link.to, destination, config),
                    seq,
                });
            }
        }
    }

    Err(unreachable)
}

/// Lower bound on the cost from `from` to `to`.
fn heuristic(from: Coord, to: Coord, config: &NavConfig) -> f32 {
    match config.heuristic {
        Heuristic::Octile => {
            from.octile_distance(to, config.orthogonal_cost, config.diagonal_cost)
        }
        Heuristic::Euclidean => from.euclidean_distance(to) * config.orthogonal_cost,
        Heuristic::Zero => 0.0,
    }
}

/// Walk came-from links back from the destination.
fn reconstruct_route(
    visits: &FxHashMap<Coord, Visit>,
    origin: Coord,
    destination: Coord,
) -> Route {
    let mut links = Vec::new();
    let mut current = destination;
    while current != origin {
        match visits.get(&current).and_then(|v| v.came_from) {
            Some(link) => {
                links.push(link);
                current = link.from;
            }
            None => break,
        }
    }
    links.reverse();
    Route { links }
}
