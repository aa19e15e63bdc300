// Data-driven pathfinding configuration.
//
// `NavConfig` holds the link cost model, the corner-cutting policy, and the
// search heuristic. It is loaded from JSON next to the rest of the game
// config; every field has a default so partial files work. In multiplayer
// all peers must run with identical configs, or their graphs and routes
// will diverge.
//
// `validate()` rejects combinations under which the configured heuristic
// could overestimate, since A* only returns optimal routes with an
// admissible heuristic.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::f32::consts::SQRT_2;

/// What happens to a diagonal step when both orthogonal corner tiles it
/// squeezes between are unwalkable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum CornerCutting {
    /// The diagonal link exists as usual.
    Allow,
    /// No diagonal link between two tiles that only touch at a corner.
    #[default]
    Disallow,
    /// The diagonal link exists at `multiplier` times its normal cost.
    Penalize { multiplier: f32 },
}

/// Distance estimate used to order the A* frontier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Heuristic {
    /// Exact obstacle-free distance under the 8-way cost model.
    #[default]
    Octile,
    /// Straight-line distance scaled by `orthogonal_cost`.
    Euclidean,
    /// No estimate: the search degrades to Dijkstra.
    Zero,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Base cost of a N/S/E/W step.
    pub orthogonal_cost: f32,
    /// Base cost of a diagonal step.
    pub diagonal_cost: f32,
    pub corner_cutting: CornerCutting,
    pub heuristic: Heuristic,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            orthogonal_cost: 1.0,
            diagonal_cost: SQRT_2,
            corner_cutting: CornerCutting::default(),
            heuristic: Heuristic::default(),
        }
    }
}

impl NavConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_cost("orthogonal_cost", self.orthogonal_cost)?;
        check_cost("diagonal_cost", self.diagonal_cost)?;
        if self.diagonal_cost < self.orthogonal_cost
            || self.diagonal_cost > 2.0 * self.orthogonal_cost
        {
            return Err(ConfigError::InvalidCostRatio {
                orthogonal: self.orthogonal_cost,
                diagonal: self.diagonal_cost,
            });
        }
        // Small slack so the default √2 ratio passes after f32 rounding.
        if self.heuristic == Heuristic::Euclidean
            && self.diagonal_cost < SQRT_2 * self.orthogonal_cost - 1e-6
        {
            return Err(ConfigError::InadmissibleHeuristic);
        }
        match self.corner_cutting {
            CornerCutting::Penalize { multiplier }
                if !(multiplier.is_finite() && multiplier >= 1.0) =>
            {
                Err(ConfigError::InvalidPenalty(multiplier))
            }
            _ => Ok(()),
        }
    }

    /// Base cost of one step in the given orientation, before terrain and
    /// corner penalties.
    pub fn step_cost(&self, diagonal: bool) -> f32 {
        if diagonal {
            self.diagonal_cost
        } else {
            self.orthogonal_cost
        }
    }
}

fn check_cost(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidCost { field, value })
    }
}
