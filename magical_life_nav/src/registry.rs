// Registry of navigation graphs, one per dimension.
//
// The world module constructs a `DimensionRegistry` at world-load time and
// keeps it in the simulation context. Each dimension's graph sits behind
// its own `RwLock`, shared through a `GraphHandle`: route queries take the
// read lock, maintenance calls take the write lock, and work on one
// dimension never waits on another. The outer map lock is only held long
// enough to look up or insert a handle.
//
// Lifecycle of a dimension: `get_or_create` (or the first `initialize`)
// registers an empty graph; `initialize` fills it from the world's tiles
// and marks it ready; `add_connections` / `remove_connections` keep it in
// step afterwards. Calling `initialize` again rebuilds from scratch, which
// is what a regenerated dimension needs.
//
// Sequencing bugs (`UnknownDimension`, `NotInitialized`) are logged at
// error level here so the offending world call shows up even if the caller
// drops the result. `NodeUnreachable` is normal gameplay and only traced.
//
// Lock poisoning is recovered rather than propagated: every write section
// leaves the graph consistent before any step that could panic.

use crate::config::NavConfig;
use crate::error::{ConfigError, NavError};
use crate::maintenance::{self, BuildStats};
use crate::nav::NavGraph;
use crate::pathfinding::{self, PathFinder, Route};
use crate::source::TileSource;
use crate::types::{Coord, DimensionId};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One dimension's graph plus its initialization flag.
#[derive(Debug, Default)]
struct DimensionGraph {
    graph: NavGraph,
    initialized: bool,
}

/// Shared handle to one dimension's graph. Cloning is cheap.
#[derive(Clone, Debug)]
pub struct GraphHandle {
    dimension: DimensionId,
    inner: Arc<RwLock<DimensionGraph>>,
}

impl GraphHandle {
    fn new(dimension: DimensionId) -> Self {
        Self {
            dimension,
            inner: Arc::new(RwLock::new(DimensionGraph::default())),
        }
    }

    pub fn dimension(&self) -> DimensionId {
        self.dimension
    }

    pub fn is_initialized(&self) -> bool {
        self.read().initialized
    }

    /// Run `f` with read-only access to the graph.
    pub fn inspect<R>(&self, f: impl FnOnce(&NavGraph) -> R) -> R {
        f(&self.read().graph)
    }

    fn read(&self) -> RwLockReadGuard<'_, DimensionGraph> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DimensionGraph> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read lock on an initialized graph.
    fn read_ready(&self) -> Result<RwLockReadGuard<'_, DimensionGraph>, NavError> {
        let guard = self.read();
        if guard.initialized {
            Ok(guard)
        } else {
            Err(NavError::NotInitialized(self.dimension))
        }
    }

    /// Write lock on an initialized graph.
    fn write_ready(&self) -> Result<RwLockWriteGuard<'_, DimensionGraph>, NavError> {
        let guard = self.write();
        if guard.initialized {
            Ok(guard)
        } else {
            Err(NavError::NotInitialized(self.dimension))
        }
    }
}

#[derive(Debug)]
pub struct DimensionRegistry {
    config: NavConfig,
    dimensions: RwLock<FxHashMap<DimensionId, GraphHandle>>,
}

impl DimensionRegistry {
    /// An empty registry. Fails if `config` is invalid.
    pub fn new(config: NavConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            dimensions: RwLock::new(FxHashMap::default()),
        })
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    /// The handle for `dimension`, registering an empty, uninitialized
    /// graph on first access.
    pub fn get_or_create(&self, dimension: DimensionId) -> GraphHandle {
        if let Some(handle) = self.lookup(dimension) {
            return handle;
        }
        let mut dimensions = self
            .dimensions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        dimensions
            .entry(dimension)
            .or_insert_with(|| {
                tracing::debug!(%dimension, "created navigation graph");
                GraphHandle::new(dimension)
            })
            .clone()
    }

    /// The handle for an existing dimension.
    pub fn handle(&self, dimension: DimensionId) -> Result<GraphHandle, NavError> {
        self.lookup(dimension)
            .ok_or(NavError::UnknownDimension(dimension))
            .map_err(log_failure)
    }

    /// Registered dimension ids, sorted.
    pub fn dimensions(&self) -> Vec<DimensionId> {
        let mut ids: Vec<DimensionId> = self
            .dimensions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }

    fn lookup(&self, dimension: DimensionId) -> Option<GraphHandle> {
        self.dimensions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&dimension)
            .cloned()
    }

    /// Bring `coord` in line with the world: connect it if `source` reports
    /// it passable (walkable, terrain cost not `+inf`), disconnect it
    /// otherwise. Returns whether the node set changed.
    pub fn sync_tile(
        &self,
        dimension: DimensionId,
        coord: Coord,
        source: &dyn TileSource,
    ) -> Result<bool, NavError> {
        self.sync_tiles(dimension, [coord], source)
            .map(|changed| changed > 0)
    }

    /// `sync_tile` for a batch of coordinates under one write lock. Returns
    /// how many tiles joined or left the node set.
    pub fn sync_tiles(
        &self,
        dimension: DimensionId,
        coords: impl IntoIterator<Item = Coord>,
        source: &dyn TileSource,
    ) -> Result<usize, NavError> {
        let handle = self.handle(dimension)?;
        let mut guard = handle.write_ready().map_err(log_failure)?;
        let graph = &mut guard.graph;
        let mut changed = 0;
        for coord in coords {
            let was_node = graph.has_node(coord);
            if maintenance::passable(source, coord) {
                maintenance::add_connections(graph, coord, source, &self.config);
            } else {
                maintenance::remove_connections(graph, coord, &self.config);
            }
            if graph.has_node(coord) != was_node {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Answer a tick's worth of route queries under one read lock. Each
    /// request gets its own result; only dimension errors fail the batch.
    pub fn get_routes(
        &self,
        dimension: DimensionId,
        requests: &[(Coord, Coord)],
    ) -> Result<Vec<Result<Route, NavError>>, NavError> {
        let handle = self.handle(dimension)?;
        let guard = handle.read_ready().map_err(log_failure)?;
        let graph = &guard.graph;
        Ok(requests
            .par_iter()
            .map(|&(origin, destination)| {
                pathfinding::astar(graph, origin, destination, &self.config)
            })
            .collect())
    }

    /// Nearest walkable node to `coord` within `max_radius` steps.
    pub fn nearest_node(
        &self,
        dimension: DimensionId,
        coord: Coord,
        max_radius: u32,
    ) -> Result<Option<Coord>, NavError> {
        let handle = self.handle(dimension)?;
        let guard = handle.read_ready().map_err(log_failure)?;
        Ok(guard.graph.nearest_node(coord, max_radius))
    }
}

impl PathFinder for DimensionRegistry {
    fn initialize(
        &self,
        dimension: DimensionId,
        source: &dyn TileSource,
    ) -> Result<BuildStats, NavError> {
        let handle = self.get_or_create(dimension);
        let mut guard = handle.write();
        // Stays false if the build panics; queries then fail NotInitialized.
        guard.initialized = false;
        let stats = maintenance::initialize(&mut guard.graph, source, &self.config);
        guard.initialized = true;
        tracing::info!(
            %dimension,
            nodes = stats.nodes,
            links = stats.links,
            "initialized navigation graph"
        );
        Ok(stats)
    }

    fn add_connections(
        &self,
        dimension: DimensionId,
        coord: Coord,
        source: &dyn TileSource,
    ) -> Result<bool, NavError> {
        let handle = self.handle(dimension)?;
        let mut guard = handle.write_ready().map_err(log_failure)?;
        Ok(maintenance::add_connections(
            &mut guard.graph,
            coord,
            source,
            &self.config,
        ))
    }

    fn remove_connections(
        &self,
        dimension: DimensionId,
        coord: Coord,
    ) -> Result<bool, NavError> {
        let handle = self.handle(dimension)?;
        let mut guard = handle.write_ready().map_err(log_failure)?;
        Ok(maintenance::remove_connections(
            &mut guard.graph,
            coord,
            &self.config,
        ))
    }

    fn get_route(
        &self,
        dimension: DimensionId,
        origin: Coord,
        destination: Coord,
    ) -> Result<Route, NavError> {
        let handle = self.handle(dimension)?;
        let guard = handle.read_ready().map_err(log_failure)?;
        let result = pathfinding::astar(&guard.graph, origin, destination, &self.config);
        match &result {
            Ok(route) => tracing::trace!(
                %dimension,
                %origin,
                %destination,
                steps = route.len(),
                cost = route.total_cost(),
                "route found"
            ),
            Err(err) => tracing::trace!(%dimension, %err, "no route"),
        }
        result
    }
}

/// Log a failure at the level its kind deserves, then pass it on.
fn log_failure(err: NavError) -> NavError {
    if err.is_sequencing_bug() {
        tracing::error!(%err, "pathfinding call out of sequence");
    } else {
        tracing::trace!(%err, "pathfinding failure");
    }
    err
}
