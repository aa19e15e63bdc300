// The world-side contract: where walkability comes from.
//
// The pathfinder never owns tiles. The world module implements
// `TileSource` for each dimension so the graph can read walkability and
// terrain difficulty during `initialize` and `add_connections`. The trait is
// `Sync` because `initialize` scans rows in parallel.
//
// `TileGrid` is a dense in-memory implementation: a flat `Vec<Tile>`
// indexed by `x + y * width` relative to the grid's minimum corner. Reads
// outside the grid report an unwalkable tile; writes outside are no-ops.
// Tests, benches, and headless tools use it in place of the chunked world
// storage.

use crate::types::{Coord, TileBounds};

/// Read access to one dimension's tiles.
pub trait TileSource: Sync {
    /// Rectangle containing every tile that may be walkable.
    fn bounds(&self) -> TileBounds;

    fn is_walkable(&self, coord: Coord) -> bool;

    /// Movement cost multiplier for entering this tile. Values below 1.0
    /// are treated as 1.0 by the graph.
    fn terrain_cost(&self, _coord: Coord) -> f32 {
        1.0
    }
}

/// One cell of a `TileGrid`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tile {
    pub walkable: bool,
    pub terrain_cost: f32,
}

impl Tile {
    pub const BLOCKED: Tile = Tile {
        walkable: false,
        terrain_cost: 1.0,
    };
    pub const OPEN: Tile = Tile {
        walkable: true,
        terrain_cost: 1.0,
    };
}

/// Dense rectangular tile grid.
#[derive(Clone, Debug)]
pub struct TileGrid {
    bounds: TileBounds,
    tiles: Vec<Tile>,
}

impl TileGrid {
    pub fn new(bounds: TileBounds, fill: Tile) -> Self {
        Self {
            bounds,
            tiles: vec![fill; bounds.tile_count()],
        }
    }

    /// A `width`×`height` grid at the origin with every tile walkable.
    pub fn new_walkable(width: u32, height: u32) -> Self {
        Self::new(TileBounds::from_size(width, height), Tile::OPEN)
    }

    /// A `width`×`height` grid at the origin with every tile blocked.
    pub fn new_blocked(width: u32, height: u32) -> Self {
        Self::new(TileBounds::from_size(width, height), Tile::BLOCKED)
    }

    /// Parse a grid from rows of characters, top row first:
    /// `.` walkable, `#` blocked, `2`-`9` walkable with that terrain cost.
    /// Any other character is blocked. Short rows are padded with blocked
    /// tiles.
    pub fn from_ascii(rows: &str) -> Self {
        let lines: Vec<&str> = rows
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let mut grid = Self::new_blocked(width as u32, lines.len() as u32);
        for (y, line) in lines.iter().enumerate() {
            for (x, ch) in line.chars().enumerate() {
                let tile = match ch {
                    '.' => Tile::OPEN,
                    '2'..='9' => Tile {
                        walkable: true,
                        terrain_cost: ch.to_digit(10).map_or(1.0, |d| d as f32),
                    },
                    _ => Tile::BLOCKED,
                };
                grid.set(Coord::new(x as i32, y as i32), tile);
            }
        }
        grid
    }

    fn index(&self, coord: Coord) -> Option<usize> {
        if self.bounds.contains(coord) {
            let x = (i64::from(coord.x) - i64::from(self.bounds.min.x)) as usize;
            let y = (i64::from(coord.y) - i64::from(self.bounds.min.y)) as usize;
            Some(x + y * self.bounds.width as usize)
        } else {
            None
        }
    }

    /// Read a tile. Out-of-bounds coordinates read as `Tile::BLOCKED`.
    pub fn get(&self, coord: Coord) -> Tile {
        self.index(coord)
            .map(|i| self.tiles[i])
            .unwrap_or(Tile::BLOCKED)
    }

    /// Write a tile. No-op outside the grid.
    pub fn set(&mut self, coord: Coord, tile: Tile) {
        if let Some(i) = self.index(coord) {
            self.tiles[i] = tile;
        }
    }

    pub fn set_walkable(&mut self, coord: Coord, walkable: bool) {
        if let Some(i) = self.index(coord) {
            self.tiles[i].walkable = walkable;
        }
    }

    pub fn set_terrain_cost(&mut self, coord: Coord, terrain_cost: f32) {
        if let Some(i) = self.index(coord) {
            self.tiles[i].terrain_cost = terrain_cost;
        }
    }

    /// The chunk containing `coord` for square chunks of `chunk_size` tiles,
    /// in chunk-grid coordinates. Rounds toward negative infinity.
    pub fn chunk_of(coord: Coord, chunk_size: u32) -> Coord {
        let size = chunk_size.max(1) as i32;
        Coord::new(coord.x.div_euclid(size), coord.y.div_euclid(size))
    }

    /// All walkable coordinates in row-major order.
    pub fn walkable_tiles(&self) -> Vec<Coord> {
        self.bounds.iter().filter(|&c| self.get(c).walkable).collect()
    }
}

impl TileSource for TileGrid {
    fn bounds(&self) -> TileBounds {
        self.bounds
    }

    fn is_walkable(&self, coord: Coord) -> bool {
        self.get(coord).walkable
    }

    fn terrain_cost(&self, coord: Coord) -> f32 {
        self.get(coord).terrain_cost
    }
}
