//! Policy-level configuration for influence reward computation.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{InfluenceError, Result};

/// Divergence measure between the true and marginal predicted distributions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DivergenceMeasure {
    /// Kullback-Leibler divergence
    #[default]
    Kl,
    /// Jensen-Shannon divergence
    Jsd,
}

impl FromStr for DivergenceMeasure {
    type Err = InfluenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "kl" => Ok(DivergenceMeasure::Kl),
            "jsd" => Ok(DivergenceMeasure::Jsd),
            other => Err(InfluenceError::Config(format!(
                "unknown influence divergence measure '{}', expected one of [kl, jsd]",
                other
            ))),
        }
    }
}

/// What to assume about other agents when no visibility annotation exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityFallback {
    /// Treat every other agent as visible at every step
    #[default]
    AllVisible,
    /// Treat every other agent as hidden at every step
    AllHidden,
}

/// Configuration for the influence reward and MOA loss computation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InfluenceConfig {
    // Agents
    /// Number of other agents visible to this policy (N)
    pub num_other_agents: usize,

    // MOA supervised loss
    /// Weight on the MOA action-prediction cross-entropy loss
    pub moa_weight: f32,
    /// Only count MOA loss terms for visible agents
    pub train_moa_only_when_visible: bool,

    // Influence reward
    /// Symmetric clip bound on the summed per-step influence
    pub influence_reward_clip: f32,
    /// Target weight of the influence reward at full curriculum
    pub influence_reward_weight: f32,
    /// Steps over which the influence weight ramps up linearly from 0
    pub influence_curriculum_steps: u64,
    /// Step at which the influence weight starts scaling back down
    pub influence_scaledown_start: u64,
    /// Step at which the scaledown reaches its final value
    pub influence_scaledown_end: u64,
    /// Floor the influence weight decays to
    pub influence_scaledown_final_val: f32,
    /// Zero out influence credited for agents not currently visible
    pub influence_only_when_visible: bool,
    /// Divergence measure between true and marginal predictions
    pub influence_divergence_measure: DivergenceMeasure,
    /// Resolution of steps with no visibility annotation
    pub visibility_fallback: VisibilityFallback,

    // Advantage estimation
    /// Discount factor
    pub gamma: f32,
    /// GAE lambda
    pub gae_lambda: f32,
    /// Whether to use GAE (vs. plain discounted returns)
    pub use_gae: bool,
}

impl Default for InfluenceConfig {
    fn default() -> Self {
        Self {
            num_other_agents: 1,
            moa_weight: 10.0,
            train_moa_only_when_visible: true,
            influence_reward_clip: 10.0,
            influence_reward_weight: 1.0,
            influence_curriculum_steps: 10_000_000,
            influence_scaledown_start: 100_000_000,
            influence_scaledown_end: 300_000_000,
            influence_scaledown_final_val: 0.5,
            influence_only_when_visible: true,
            influence_divergence_measure: DivergenceMeasure::Kl,
            visibility_fallback: VisibilityFallback::AllVisible,
            gamma: 0.99,
            gae_lambda: 0.95,
            use_gae: true,
        }
    }
}

impl InfluenceConfig {
    /// Set the number of other agents
    pub fn with_num_other_agents(mut self, n: usize) -> Self {
        self.num_other_agents = n;
        self
    }

    /// Set the divergence measure
    pub fn with_divergence_measure(mut self, measure: DivergenceMeasure) -> Self {
        self.influence_divergence_measure = measure;
        self
    }

    /// Set the influence reward weight
    pub fn with_reward_weight(mut self, weight: f32) -> Self {
        self.influence_reward_weight = weight;
        self
    }

    /// Set the curriculum ramp-up horizon
    pub fn with_curriculum_steps(mut self, steps: u64) -> Self {
        self.influence_curriculum_steps = steps;
        self
    }

    /// Validate the configuration before any trajectory is processed
    pub fn validate(&self) -> Result<()> {
        if self.num_other_agents == 0 {
            return Err(InfluenceError::Config(
                "num_other_agents must be at least 1".to_string(),
            ));
        }
        if self.influence_reward_clip < 0.0 {
            return Err(InfluenceError::Config(format!(
                "influence_reward_clip must be non-negative, got {}",
                self.influence_reward_clip
            )));
        }
        if self.influence_scaledown_end <= self.influence_scaledown_start {
            return Err(InfluenceError::Config(format!(
                "influence_scaledown_end ({}) must be greater than influence_scaledown_start ({})",
                self.influence_scaledown_end, self.influence_scaledown_start
            )));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(InfluenceError::Config(format!(
                "gamma must be in [0, 1], got {}",
                self.gamma
            )));
        }
        if !(0.0..=1.0).contains(&self.gae_lambda) {
            return Err(InfluenceError::Config(format!(
                "gae_lambda must be in [0, 1], got {}",
                self.gae_lambda
            )));
        }
        Ok(())
    }
}
