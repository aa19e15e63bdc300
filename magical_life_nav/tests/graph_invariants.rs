// Property tests for the graph maintenance protocol.
//
// Random walkability masks on a small grid, driven through the public
// registry API, checking the structural guarantees the rest of the
// simulation leans on: no dangling links after any call, final state
// independent of call order, idempotent calls, and links in both
// directions between walkable neighbors. Every property runs under each
// corner-cutting policy.

use magical_life_nav::{
    Coord, CornerCutting, DimensionId, DimensionRegistry, Direction, NavConfig, NavGraph,
    PathFinder, TileGrid,
};
use proptest::prelude::*;

const SIZE: u32 = 6;
const TILES: usize = (SIZE * SIZE) as usize;
const DIM: DimensionId = DimensionId(7);
const REFERENCE: DimensionId = DimensionId(8);

fn coord_at(i: usize) -> Coord {
    Coord::new((i % SIZE as usize) as i32, (i / SIZE as usize) as i32)
}

fn grid_from(mask: &[bool], terrain: &[u8]) -> TileGrid {
    let mut grid = TileGrid::new_blocked(SIZE, SIZE);
    for (i, (&walkable, &cost)) in mask.iter().zip(terrain).enumerate() {
        grid.set_walkable(coord_at(i), walkable);
        grid.set_terrain_cost(coord_at(i), f32::from(cost));
    }
    grid
}

fn registry(corner_cutting: CornerCutting) -> DimensionRegistry {
    DimensionRegistry::new(NavConfig {
        corner_cutting,
        ..NavConfig::default()
    })
    .unwrap()
}

fn snapshot(reg: &DimensionRegistry, dimension: DimensionId) -> NavGraph {
    reg.handle(dimension).unwrap().inspect(NavGraph::clone)
}

/// Apply the world's truth for `coord` with the explicit add/remove calls.
fn apply(reg: &DimensionRegistry, grid: &TileGrid, coord: Coord, walkable: bool) {
    if walkable {
        reg.add_connections(DIM, coord, grid).unwrap();
    } else {
        reg.remove_connections(DIM, coord).unwrap();
    }
}

fn corner_policy() -> impl Strategy<Value = CornerCutting> {
    prop_oneof![
        Just(CornerCutting::Allow),
        Just(CornerCutting::Disallow),
        (1.0f32..4.0).prop_map(|multiplier| CornerCutting::Penalize { multiplier }),
    ]
}

fn mask() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(prop::bool::weighted(0.7), TILES)
}

fn terrain() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(1u8..4, TILES)
}

fn order() -> impl Strategy<Value = Vec<usize>> {
    Just((0..TILES).collect::<Vec<_>>()).prop_shuffle()
}

proptest! {
    /// Property: after every single maintenance call, no link points at a
    /// missing node and the graph's bookkeeping is intact.
    #[test]
    fn no_dangling_links_after_any_call(
        policy in corner_policy(),
        start in mask(),
        costs in terrain(),
        ops in prop::collection::vec((0..TILES, any::<bool>()), 1..80),
    ) {
        let reg = registry(policy);
        let mut grid = grid_from(&start, &costs);
        reg.initialize(DIM, &grid).unwrap();

        for (i, walkable) in ops {
            let coord = coord_at(i);
            grid.set_walkable(coord, walkable);
            apply(&reg, &grid, coord, walkable);
            let graph = snapshot(&reg, DIM);
            prop_assert!(graph.dangling_links().is_empty(), "dangling links after touching {}", coord);
            prop_assert!(graph.is_consistent());
            prop_assert_eq!(graph.has_node(coord), walkable);
        }
    }

    /// Property: moving from one walkability mask to another one tile at a
    /// time gives the same graph whatever the order, and that graph equals
    /// a fresh build of the target mask.
    #[test]
    fn maintenance_is_order_independent(
        policy in corner_policy(),
        before in mask(),
        after in mask(),
        costs in terrain(),
        order in order(),
    ) {
        let reg = registry(policy);
        reg.initialize(DIM, &grid_from(&before, &costs)).unwrap();
        let target = grid_from(&after, &costs);
        for &i in &order {
            apply(&reg, &target, coord_at(i), after[i]);
        }
        let shuffled = snapshot(&reg, DIM);

        reg.initialize(DIM, &grid_from(&before, &costs)).unwrap();
        for &i in order.iter().rev() {
            apply(&reg, &target, coord_at(i), after[i]);
        }
        let reversed = snapshot(&reg, DIM);

        reg.initialize(REFERENCE, &target).unwrap();
        let rebuilt = snapshot(&reg, REFERENCE);

        prop_assert_eq!(&shuffled, &reversed);
        prop_assert_eq!(&shuffled, &rebuilt);
    }

    /// Property: repeating a maintenance call changes nothing.
    #[test]
    fn maintenance_is_idempotent(
        policy in corner_policy(),
        start in mask(),
        costs in terrain(),
        i in 0..TILES,
    ) {
        let reg = registry(policy);
        let mut grid = grid_from(&start, &costs);
        reg.initialize(DIM, &grid).unwrap();
        let coord = coord_at(i);

        grid.set_walkable(coord, true);
        reg.add_connections(DIM, coord, &grid).unwrap();
        let once = snapshot(&reg, DIM);
        reg.add_connections(DIM, coord, &grid).unwrap();
        prop_assert_eq!(&snapshot(&reg, DIM), &once);

        grid.set_walkable(coord, false);
        prop_assert!(reg.remove_connections(DIM, coord).unwrap());
        let once = snapshot(&reg, DIM);
        prop_assert!(!reg.remove_connections(DIM, coord).unwrap());
        prop_assert_eq!(&snapshot(&reg, DIM), &once);
    }

    /// Property: every link has a reciprocal, and adjacent walkable tiles
    /// are linked whenever the corner policy permits it.
    #[test]
    fn links_are_symmetric(
        policy in corner_policy(),
        start in mask(),
        costs in terrain(),
    ) {
        let reg = registry(policy);
        let grid = grid_from(&start, &costs);
        reg.initialize(DIM, &grid).unwrap();
        let graph = snapshot(&reg, DIM);

        for link in graph.links() {
            prop_assert!(graph.link(link.to, link.from).is_some(), "no reciprocal for {:?}", link);
        }

        for i in 0..TILES {
            let a = coord_at(i);
            prop_assert_eq!(graph.has_node(a), start[i]);
            if !start[i] {
                continue;
            }
            for dir in Direction::ALL {
                let Some(b) = a.offset(dir).filter(|&b| graph.has_node(b)) else {
                    continue;
                };
                let open = |d: Direction| a.offset(d).is_some_and(|p| graph.has_node(p));
                let squeezed = dir.corners().is_some_and(|(v, h)| !open(v) && !open(h));
                let expected = !(squeezed && policy == CornerCutting::Disallow);
                prop_assert_eq!(graph.link(a, b).is_some(), expected, "{} -> {}", a, b);
            }
        }
    }
}
