// Error types for the pathfinding core.
//
// `NavError` covers the two kinds of failure a caller can see: sequencing
// bugs in the world module (asking about a dimension that was never
// created or never initialized) and the ordinary "no route" outcome. The
// first kind is logged by the registry and should be fixed at the call
// site; the second is normal gameplay and means the creature picks a new
// goal.

use crate::types::{Coord, DimensionId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NavError {
    #[error("unknown dimension {0}")]
    UnknownDimension(DimensionId),

    #[error("dimension {0} has not been initialized")]
    NotInitialized(DimensionId),

    /// Origin or destination is not walkable, or no path joins them.
    #[error("no route from {origin} to {destination}")]
    NodeUnreachable { origin: Coord, destination: Coord },
}

impl NavError {
    /// True for errors that mean the caller used the registry out of order.
    pub fn is_sequencing_bug(&self) -> bool {
        matches!(
            self,
            NavError::UnknownDimension(_) | NavError::NotInitialized(_)
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be finite and positive, got {value}")]
    InvalidCost { field: &'static str, value: f32 },

    #[error(
        "diagonal_cost {diagonal} must lie between orthogonal_cost {orthogonal} and twice that"
    )]
    InvalidCostRatio { orthogonal: f32, diagonal: f32 },

    #[error("euclidean heuristic needs diagonal_cost >= sqrt(2) * orthogonal_cost")]
    InadmissibleHeuristic,

    #[error("corner penalty multiplier must be finite and >= 1, got {0}")]
    InvalidPenalty(f32),

    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
}
