// magical_life_nav — pathfinding core for the Magical Life world.
//
// This crate owns the per-dimension navigation graphs, keeps them in step
// with tile walkability through small local edits, and answers route
// queries for creatures. It knows nothing about chunk storage, world
// generation, creatures, or networking: the world module describes tiles
// through the `TileSource` trait and calls in whenever walkability changes.
//
// Module overview:
// - `types.rs`:       Coord, Direction (8-way), DimensionId, TileBounds.
// - `config.rs`:      NavConfig — link costs, corner-cutting policy, heuristic.
// - `error.rs`:       NavError / ConfigError.
// - `source.rs`:      TileSource trait + TileGrid, a dense in-memory tile grid.
// - `nav.rs`:         PathLink, NavNode, NavGraph (sparse adjacency map).
// - `maintenance.rs`: add_connections / remove_connections / initialize.
// - `pathfinding.rs`: Route, A* search, and the PathFinder capability trait.
// - `registry.rs`:    DimensionRegistry — one locked graph per dimension.
//
// **Critical constraint: determinism.** Identical graph state and identical
// endpoints must produce identical routes on every machine in a multiplayer
// session. Node link lists are kept in canonical direction order and the
// search breaks ties by insertion order, so nothing depends on hash
// iteration order or on the order maintenance calls arrived in.

pub mod config;
pub mod error;
pub mod maintenance;
pub mod nav;
pub mod pathfinding;
pub mod registry;
pub mod source;
pub mod types;

pub use config::{CornerCutting, Heuristic, NavConfig};
pub use error::{ConfigError, NavError};
pub use maintenance::BuildStats;
pub use nav::{NavGraph, PathLink};
pub use pathfinding::{PathFinder, Route};
pub use registry::{DimensionRegistry, GraphHandle};
pub use source::{Tile, TileGrid, TileSource};
pub use types::{Coord, DimensionId, Direction, TileBounds};
