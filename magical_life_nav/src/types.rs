// Core spatial types shared by the pathfinding core.
//
// Defines tile coordinates (`Coord`), the 8-way `Direction` model used for
// adjacency, dimension identifiers, and the rectangular `TileBounds` a
// world reports for its tiles. All types derive `Serialize`/`Deserialize`
// so callers can ship them across the network boundary unchanged.
//
// Coordinate convention (screen space, matching the tile renderer):
// - X: east  (positive) / west  (negative)
// - Y: south (positive) / north (negative)

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::RangeInclusive;

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A tile position inside one dimension.
///
/// Ordering is row-major (y first, then x). `NavGraph::nodes()` and the
/// tie-break order of `nearest_node` rely on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighboring coordinate one step in `dir`, or `None` if it would
    /// fall outside the `i32` coordinate space.
    pub fn offset(self, dir: Direction) -> Option<Self> {
        let (dx, dy) = dir.delta();
        Some(Self::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }

    /// Per-axis absolute differences, widened so extreme coordinates cannot
    /// overflow.
    fn abs_deltas(self, other: Self) -> (u64, u64) {
        (
            (i64::from(self.x) - i64::from(other.x)).unsigned_abs(),
            (i64::from(self.y) - i64::from(other.y)).unsigned_abs(),
        )
    }

    pub fn manhattan_distance(self, other: Self) -> u64 {
        let (dx, dy) = self.abs_deltas(other);
        dx + dy
    }

    /// King-move distance: the number of 8-way steps between two tiles.
    pub fn chebyshev_distance(self, other: Self) -> u64 {
        let (dx, dy) = self.abs_deltas(other);
        dx.max(dy)
    }

    /// Octile distance with the given per-step costs: straight steps for the
    /// long axis remainder, diagonal steps for the short axis.
    pub fn octile_distance(self, other: Self, orthogonal_cost: f32, diagonal_cost: f32) -> f32 {
        let (dx, dy) = self.abs_deltas(other);
        let (long, short) = if dx >= dy { (dx, dy) } else { (dy, dx) };
        (long - short) as f32 * orthogonal_cost + short as f32 * diagonal_cost
    }

    pub fn euclidean_distance(self, other: Self) -> f32 {
        let (dx, dy) = self.abs_deltas(other);
        let (dx, dy) = (dx as f64, dy as f64);
        (dx * dx + dy * dy).sqrt() as f32
    }
}

impl Ord for Coord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.y.cmp(&other.y).then_with(|| self.x.cmp(&other.x))
    }
}

impl PartialOrd for Coord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Coord {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

// ---------------------------------------------------------------------------
// Directions
// ---------------------------------------------------------------------------

/// The eight movement directions between adjacent tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Direction {
    /// Every direction, in declaration order. Node link lists are kept in
    /// this order.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::NorthWest,
        Direction::NorthEast,
        Direction::SouthWest,
        Direction::SouthEast,
    ];

    /// The four diagonal directions.
    pub const DIAGONALS: [Direction; 4] = [
        Direction::NorthWest,
        Direction::NorthEast,
        Direction::SouthWest,
        Direction::SouthEast,
    ];

    /// Coordinate delta for one step in this direction.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
            Direction::NorthEast => (1, -1),
            Direction::SouthWest => (-1, 1),
            Direction::SouthEast => (1, 1),
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::NorthWest => Direction::SouthEast,
            Direction::NorthEast => Direction::SouthWest,
            Direction::SouthWest => Direction::NorthEast,
            Direction::SouthEast => Direction::NorthWest,
        }
    }

    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::NorthWest
                | Direction::NorthEast
                | Direction::SouthWest
                | Direction::SouthEast
        )
    }

    /// The two orthogonal components of a diagonal (vertical first), or
    /// `None` for an orthogonal direction.
    ///
    /// Moving diagonally from `c` to `c.offset(d)` passes the corner tiles
    /// `c.offset(a)` and `c.offset(b)` where `(a, b) = d.corners()`.
    pub const fn corners(self) -> Option<(Direction, Direction)> {
        match self {
            Direction::NorthWest => Some((Direction::North, Direction::West)),
            Direction::NorthEast => Some((Direction::North, Direction::East)),
            Direction::SouthWest => Some((Direction::South, Direction::West)),
            Direction::SouthEast => Some((Direction::South, Direction::East)),
            _ => None,
        }
    }

    /// The direction of a single step from `from` to `to`, or `None` if the
    /// two coordinates are not 8-adjacent.
    pub fn between(from: Coord, to: Coord) -> Option<Self> {
        let dx = i64::from(to.x) - i64::from(from.x);
        let dy = i64::from(to.y) - i64::from(from.y);
        Self::ALL.into_iter().find(|d| {
            let (ex, ey) = d.delta();
            (i64::from(ex), i64::from(ey)) == (dx, dy)
        })
    }

    /// Position of this direction in `Direction::ALL`.
    pub const fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// Dimensions and bounds
// ---------------------------------------------------------------------------

/// Identifier for one independent world map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DimensionId(pub u32);

impl fmt::Display for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DimensionId({})", self.0)
    }
}

/// Axis-aligned rectangle of tiles: `min` inclusive, `width`×`height` tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileBounds {
    pub min: Coord,
    pub width: u32,
    pub height: u32,
}

impl TileBounds {
    pub const fn new(min: Coord, width: u32, height: u32) -> Self {
        Self { min, width, height }
    }

    /// Bounds starting at the origin.
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(Coord::new(0, 0), width, height)
    }

    pub fn contains(&self, coord: Coord) -> bool {
        let dx = i64::from(coord.x) - i64::from(self.min.x);
        let dy = i64::from(coord.y) - i64::from(self.min.y);
        (0..i64::from(self.width)).contains(&dx) && (0..i64::from(self.height)).contains(&dy)
    }

    /// Range of y values covered. Clipped at `i32::MAX`.
    pub fn rows(&self) -> RangeInclusive<i32> {
        axis(self.min.y, self.height)
    }

    /// Range of x values covered. Clipped at `i32::MAX`.
    pub fn columns(&self) -> RangeInclusive<i32> {
        axis(self.min.x, self.width)
    }

    pub fn tile_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Every coordinate in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = Coord> + '_ {
        self.rows()
            .flat_map(move |y| self.columns().map(move |x| Coord::new(x, y)))
    }
}

/// `len` values starting at `start`, computed in `i64` and clipped to `i32`.
fn axis(start: i32, len: u32) -> RangeInclusive<i32> {
    if len == 0 {
        return RangeInclusive::new(1, 0);
    }
    let end = i64::from(start) + i64::from(len) - 1;
    start..=i32::try_from(end).unwrap_or(i32::MAX)
}
