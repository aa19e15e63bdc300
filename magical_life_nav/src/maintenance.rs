// Incremental maintenance of a `NavGraph`.
//
// The world calls `add_connections` when a tile becomes walkable and
// `remove_connections` when it stops being walkable. Each call touches only
// the tile, its 8 neighbors, and the diagonals that squeeze past it, so the
// graph never needs a full rescan after `initialize`.
//
// A link's presence and cost depend only on which tiles are nodes and on
// their cached terrain costs:
// - orthogonal `a -> b`: present iff both are nodes;
// - diagonal `a -> b`: present iff both are nodes and the corner policy
//   allows it given whether the two corner tiles are nodes.
// Every call re-derives all links that depend on the tile it touches,
// including diagonals that use it as a corner. The final graph is
// therefore a function of the final node set alone, which gives
// idempotence and call-order independence.
//
// See also: `nav.rs` for the graph and its invariants, `registry.rs` which
// takes the dimension's write lock around these calls.

use crate::config::{CornerCutting, NavConfig};
use crate::nav::{NavGraph, PathLink};
use crate::source::TileSource;
use crate::types::{Coord, Direction};
use rayon::prelude::*;

/// Finite terrain costs are clamped to at most this multiplier.
pub const MAX_TERRAIN_COST: f32 = 1.0e6;

/// Summary of a full graph build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub nodes: usize,
    pub links: usize,
}

/// Register `coord` as walkable and link it to every walkable neighbor in
/// both directions.
///
/// Calls for tiles that are not `passable` are ignored and return `false`.
/// Calling again on a connected tile leaves the graph unchanged, except
/// that link costs pick up a changed terrain cost.
pub fn add_connections<S: TileSource + ?Sized>(
    graph: &mut NavGraph,
    coord: Coord,
    source: &S,
    config: &NavConfig,
) -> bool {
    let Some(terrain_cost) = cached_terrain_cost(source, coord) else {
        tracing::warn!(%coord, "add_connections on a tile the world reports impassable; ignored");
        return false;
    };
    connect(graph, coord, terrain_cost, config);
    tracing::trace!(%coord, links = graph.neighbors(coord).len(), "connected tile");
    true
}

/// Remove `coord` and every link into or out of it. Returns `false` if it
/// was not a node.
pub fn remove_connections(graph: &mut NavGraph, coord: Coord, config: &NavConfig) -> bool {
    if !graph.has_node(coord) {
        return false;
    }
    // Incoming links can only come from the 8 neighbors.
    for neighbor in Direction::ALL.into_iter().filter_map(|d| coord.offset(d)) {
        graph.remove_link(neighbor, coord);
    }
    graph.remove_node(coord);
    refresh_corner_diagonals(graph, coord, config);
    tracing::trace!(%coord, "disconnected tile");
    true
}

/// Whether `coord` can be a node: walkable, with a terrain cost that is not
/// `+inf`.
pub fn passable<S: TileSource + ?Sized>(source: &S, coord: Coord) -> bool {
    cached_terrain_cost(source, coord).is_some()
}

/// The terrain multiplier the graph caches for `coord`, or `None` if the
/// tile is not passable. NaN and values below 1.0 read as 1.0; finite
/// values above `MAX_TERRAIN_COST` are clamped to it.
fn cached_terrain_cost<S: TileSource + ?Sized>(source: &S, coord: Coord) -> Option<f32> {
    if !source.is_walkable(coord) {
        return None;
    }
    let cost = source.terrain_cost(coord);
    if cost == f32::INFINITY {
        return None;
    }
    // `f32::max` also maps NaN to 1.0.
    Some(cost.max(1.0).min(MAX_TERRAIN_COST))
}

/// Discard the graph and rebuild it from every walkable tile in
/// `source.bounds()`.
///
/// Rows are scanned in parallel; connections are then applied one tile at
/// a time in row-major order.
pub fn initialize<S: TileSource + ?Sized>(
    graph: &mut NavGraph,
    source: &S,
    config: &NavConfig,
) -> BuildStats {
    graph.clear();
    let bounds = source.bounds();
    let rows: Vec<Vec<(Coord, f32)>> = bounds
        .rows()
        .into_par_iter()
        .map(|y| {
            bounds
                .columns()
                .map(|x| Coord::new(x, y))
                .filter_map(|c| cached_terrain_cost(source, c).map(|cost| (c, cost)))
                .collect()
        })
        .collect();

    for (coord, terrain_cost) in rows.into_iter().flatten() {
        connect(graph, coord, terrain_cost, config);
    }

    BuildStats {
        nodes: graph.node_count(),
        links: graph.link_count(),
    }
}

/// Insert `coord` with an already-clamped terrain cost and re-derive every
/// link that depends on it.
fn connect(graph: &mut NavGraph, coord: Coord, terrain_cost: f32, config: &NavConfig) {
    graph.insert_node(coord, terrain_cost);
    for dir in Direction::ALL {
        if coord.offset(dir).is_some_and(|n| graph.has_node(n)) {
            refresh_pair(graph, coord, dir, config);
        }
    }
    refresh_corner_diagonals(graph, coord, config);
}

/// Re-derive both links between `a` and `a.offset(dir)`.
fn refresh_pair(graph: &mut NavGraph, a: Coord, dir: Direction, config: &NavConfig) {
    let Some(b) = a.offset(dir) else {
        return;
    };
    for (from, to, step) in [(a, b, dir), (b, a, dir.opposite())] {
        match link_cost(graph, from, step, config) {
            Some(cost) => {
                graph.insert_link(PathLink::new(from, to, cost));
            }
            None => {
                graph.remove_link(from, to);
            }
        }
    }
}

/// Cost the link `from -> from.offset(dir)` should have, or `None` if it
/// should not exist.
fn link_cost(graph: &NavGraph, from: Coord, dir: Direction, config: &NavConfig) -> Option<f32> {
    let to = from.offset(dir)?;
    if !graph.has_node(from) {
        return None;
    }
    let terrain = graph.node(to)?.terrain_cost;
    let mut penalty = 1.0;
    if let Some((v, h)) = dir.corners() {
        let open = |d: Direction| from.offset(d).is_some_and(|p| graph.has_node(p));
        let corners_blocked = !open(v) && !open(h);
        if corners_blocked {
            match config.corner_cutting {
                CornerCutting::Allow => {}
                CornerCutting::Disallow => return None,
                CornerCutting::Penalize { multiplier } => penalty = multiplier,
            }
        }
    }
    Some(config.step_cost(dir.is_diagonal()) * terrain * penalty)
}

/// Re-derive the diagonals that pass `corner` as one of their two corner
/// tiles. Those are the diagonals between pairs of its orthogonal
/// neighbors, e.g. north-to-east.
fn refresh_corner_diagonals(graph: &mut NavGraph, corner: Coord, config: &NavConfig) {
    if config.corner_cutting == CornerCutting::Allow {
        return;
    }
    for diagonal in Direction::DIAGONALS {
        let Some((v, h)) = diagonal.corners() else {
            continue;
        };
        let (Some(p), Some(q)) = (corner.offset(v), corner.offset(h)) else {
            continue;
        };
        if !graph.has_node(p) || !graph.has_node(q) {
            continue;
        }
        if let Some(step) = Direction::between(p, q) {
            refresh_pair(graph, p, step, config);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::TileGrid;
    use std::f32::consts::SQRT_2;

    fn c(x: i32, y: i32) -> Coord {
        Coord::new(x, y)
    }

    fn config(corner_cutting: CornerCutting) -> NavConfig {
        NavConfig {
            corner_cutting,
            ..NavConfig::default()
        }
    }

    #[test]
    fn add_links_both_directions() {
        let grid = TileGrid::new_walkable(3, 3);
        let cfg = NavConfig::default();
        let mut graph = NavGraph::new();
        add_connections(&mut graph, c(1, 1), &grid, &cfg);
        add_connections(&mut graph, c(2, 1), &grid, &cfg);
        assert_eq!(graph.link(c(1, 1), c(2, 1)).unwrap().cost, 1.0);
        assert_eq!(graph.link(c(2, 1), c(1, 1)).unwrap().cost, 1.0);
        assert_eq!(graph.link_count(), 2);
    }

    #[test]
    fn add_ignores_unwalkable_tile() {
        let grid = TileGrid::new_blocked(3, 3);
        let mut graph = NavGraph::new();
        assert!(!add_connections(&mut graph, c(1, 1), &grid, &NavConfig::default()));
        assert!(graph.is_empty());
    }

    #[test]
    fn add_is_idempotent() {
        let grid = TileGrid::new_walkable(3, 3);
        let cfg = NavConfig::default();
        let mut graph = NavGraph::new();
        for coord in grid.walkable_tiles() {
            add_connections(&mut graph, coord, &grid, &cfg);
        }
        let once = graph.clone();
        add_connections(&mut graph, c(1, 1), &grid, &cfg);
        assert_eq!(graph, once);
    }

    #[test]
    fn full_grid_link_count() {
        let grid = TileGrid::new_walkable(3, 3);
        let mut graph = NavGraph::new();
        let stats = initialize(&mut graph, &grid, &NavConfig::default());
        // 12 orthogonal + 8 diagonal undirected edges, two links each.
        assert_eq!(stats, BuildStats { nodes: 9, links: 40 });
        assert!(graph.is_consistent());
    }

    #[test]
    fn remove_leaves_no_dangling_links() {
        let grid = TileGrid::new_walkable(3, 3);
        let cfg = NavConfig::default();
        let mut graph = NavGraph::new();
        initialize(&mut graph, &grid, &cfg);
        assert!(remove_connections(&mut graph, c(1, 1), &cfg));
        assert!(!graph.has_node(c(1, 1)));
        assert!(graph.dangling_links().is_empty());
        assert!(graph.is_consistent());
        for coord in graph.nodes() {
            assert!(graph.neighbors(coord).iter().all(|l| l.to != c(1, 1)));
        }
        // Removing again is a no-op.
        let after = graph.clone();
        assert!(!remove_connections(&mut graph, c(1, 1), &cfg));
        assert_eq!(graph, after);
    }

    #[test]
    fn diagonal_cost_is_sqrt2() {
        let grid = TileGrid::new_walkable(2, 2);
        let mut graph = NavGraph::new();
        initialize(&mut graph, &grid, &NavConfig::default());
        assert_eq!(graph.link(c(0, 0), c(1, 1)).unwrap().cost, SQRT_2);
    }

    #[test]
    fn terrain_scales_incoming_links() {
        let mut grid = TileGrid::new_walkable(2, 1);
        grid.set_terrain_cost(c(1, 0), 3.0);
        let cfg = NavConfig::default();
        let mut graph = NavGraph::new();
        initialize(&mut graph, &grid, &cfg);
        assert_eq!(graph.link(c(0, 0), c(1, 0)).unwrap().cost, 3.0);
        assert_eq!(graph.link(c(1, 0), c(0, 0)).unwrap().cost, 1.0);

        // Re-adding after a terrain change refreshes the cost.
        grid.set_terrain_cost(c(1, 0), 2.0);
        add_connections(&mut graph, c(1, 0), &grid, &cfg);
        assert_eq!(graph.link(c(0, 0), c(1, 0)).unwrap().cost, 2.0);
    }

    #[test]
    fn terrain_below_one_is_clamped() {
        let mut grid = TileGrid::new_walkable(2, 1);
        grid.set_terrain_cost(c(1, 0), 0.25);
        let mut graph = NavGraph::new();
        initialize(&mut graph, &grid, &NavConfig::default());
        assert_eq!(graph.link(c(0, 0), c(1, 0)).unwrap().cost, 1.0);
    }

    // Two tiles touching only at a corner:
    //   . #
    //   # .
    fn corner_grid() -> TileGrid {
        TileGrid::from_ascii(
            "
            .#
            #.
            ",
        )
    }

    #[test]
    fn corner_cutting_allow() {
        let mut graph = NavGraph::new();
        initialize(&mut graph, &corner_grid(), &config(CornerCutting::Allow));
        assert_eq!(graph.link(c(0, 0), c(1, 1)).unwrap().cost, SQRT_2);
    }

    #[test]
    fn corner_cutting_disallow() {
        let mut graph = NavGraph::new();
        initialize(&mut graph, &corner_grid(), &config(CornerCutting::Disallow));
        assert!(graph.link(c(0, 0), c(1, 1)).is_none());
        assert!(graph.link(c(1, 1), c(0, 0)).is_none());
        assert_eq!(graph.link_count(), 0);
    }

    #[test]
    fn corner_cutting_penalize() {
        let mut graph = NavGraph::new();
        let cfg = config(CornerCutting::Penalize { multiplier: 2.0 });
        initialize(&mut graph, &corner_grid(), &cfg);
        assert_eq!(graph.link(c(0, 0), c(1, 1)).unwrap().cost, SQRT_2 * 2.0);
    }

    #[test]
    fn opening_a_corner_restores_the_diagonal() {
        let mut grid = corner_grid();
        let cfg = config(CornerCutting::Disallow);
        let mut graph = NavGraph::new();
        initialize(&mut graph, &grid, &cfg);

        grid.set_walkable(c(1, 0), true);
        add_connections(&mut graph, c(1, 0), &grid, &cfg);
        assert!(graph.link(c(0, 0), c(1, 1)).is_some());
        assert!(graph.link(c(1, 1), c(0, 0)).is_some());

        // Closing it again removes the diagonal.
        grid.set_walkable(c(1, 0), false);
        remove_connections(&mut graph, c(1, 0), &cfg);
        assert!(graph.link(c(0, 0), c(1, 1)).is_none());
        assert!(graph.is_consistent());
    }

    #[test]
    fn penalty_lifts_when_corner_opens() {
        let mut grid = corner_grid();
        let cfg = config(CornerCutting::Penalize { multiplier: 4.0 });
        let mut graph = NavGraph::new();
        initialize(&mut graph, &grid, &cfg);
        grid.set_walkable(c(0, 1), true);
        add_connections(&mut graph, c(0, 1), &grid, &cfg);
        assert_eq!(graph.link(c(1, 1), c(0, 0)).unwrap().cost, SQRT_2);
    }

    #[test]
    fn initialize_rebuilds_from_scratch() {
        let mut grid = TileGrid::new_walkable(4, 4);
        let cfg = NavConfig::default();
        let mut graph = NavGraph::new();
        initialize(&mut graph, &grid, &cfg);
        grid.set_walkable(c(0, 0), false);
        let stats = initialize(&mut graph, &grid, &cfg);
        assert_eq!(stats.nodes, 15);
        assert!(!graph.has_node(c(0, 0)));
    }

    #[test]
    fn incremental_matches_bulk_build() {
        let grid = TileGrid::from_ascii(
            "
            ..#..
            .#...
            ...#.
            #....
            ",
        );
        let cfg = NavConfig::default();
        let mut bulk = NavGraph::new();
        initialize(&mut bulk, &grid, &cfg);

        let mut incremental = NavGraph::new();
        for coord in grid.walkable_tiles().into_iter().rev() {
            add_connections(&mut incremental, coord, &grid, &cfg);
        }
        assert_eq!(incremental, bulk);
    }

    #[test]
    fn infinite_terrain_is_impassable() {
        let mut grid = TileGrid::new_walkable(3, 1);
        grid.set_terrain_cost(c(1, 0), f32::INFINITY);
        let cfg = NavConfig::default();
        let mut graph = NavGraph::new();
        initialize(&mut graph, &grid, &cfg);
        assert!(!graph.has_node(c(1, 0)));
        assert!(!passable(&grid, c(1, 0)));
        assert!(!add_connections(&mut graph, c(1, 0), &grid, &cfg));
        assert!(!graph.has_node(c(1, 0)));
    }

    #[test]
    fn huge_terrain_is_clamped() {
        let mut grid = TileGrid::new_walkable(2, 1);
        grid.set_terrain_cost(c(1, 0), f32::MAX);
        let mut graph = NavGraph::new();
        initialize(&mut graph, &grid, &NavConfig::default());
        let cost = graph.link(c(0, 0), c(1, 0)).unwrap().cost;
        assert_eq!(cost, MAX_TERRAIN_COST);
        assert!(cost.is_finite());
    }

    #[test]
    fn tiles_at_coordinate_limits() {
        let bounds = crate::types::TileBounds::new(c(i32::MAX - 2, i32::MIN), 3, 2);
        let grid = TileGrid::new(bounds, crate::source::Tile::OPEN);
        let cfg = NavConfig::default();
        let mut graph = NavGraph::new();
        let stats = initialize(&mut graph, &grid, &cfg);
        assert_eq!(stats.nodes, 6);
        assert!(graph.is_consistent());
        let corner = c(i32::MAX, i32::MIN);
        assert_eq!(graph.neighbors(corner).len(), 3);

        assert!(remove_connections(&mut graph, corner, &cfg));
        assert!(graph.is_consistent());
        assert!(add_connections(&mut graph, corner, &grid, &cfg));
        let mut rebuilt = NavGraph::new();
        initialize(&mut rebuilt, &grid, &cfg);
        assert_eq!(graph, rebuilt);
    }
}
