//! # Causal Influence
//!
//! Causal social influence intrinsic rewards for multi-agent reinforcement
//! learning.
//!
//! ## Overview
//!
//! This crate implements the reward side of a "model of other agents" (MOA)
//! augmented policy-gradient trainer:
//! - Discrete-distribution divergence primitives (KL, Jensen-Shannon)
//! - Marginalization of counterfactual action predictions over the acting
//!   agent's own policy
//! - Per-step causal influence rewards with visibility masking, clipping,
//!   and a curriculum-weighted schedule
//! - Trajectory post-processing with bootstrap values and GAE over the
//!   influence-augmented reward stream
//!
//! Network construction, gradient descent, and rollout collection are
//! external collaborators: the post-processor consumes a [`Trajectory`]
//! produced by the surrounding framework and returns it augmented with
//! reward and diagnostic fields.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use causal_influence::prelude::*;
//!
//! let config = InfluenceConfig::default();
//! let mut postprocessor =
//!     TrajectoryPostprocessor::new(config, 0, value_fn, Gae)?;
//! let processed = postprocessor.postprocess(trajectory)?;
//! ```
//!
//! [`Trajectory`]: trajectory::Trajectory

pub mod config;
pub mod divergence;
pub mod influence;
pub mod log;
pub mod marginal;
pub mod moa;
pub mod postprocess;
pub mod schedule;
pub mod trajectory;
pub mod visibility;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{DivergenceMeasure, InfluenceConfig, VisibilityFallback};
    pub use crate::divergence::{jsd, kl_divergence};
    pub use crate::influence::{InfluenceOutcome, InfluenceReward};
    pub use crate::log::{CompositeLogger, ConsoleLogger, MetricLogger, NoOpLogger};
    pub use crate::moa::{moa_loss, trajectory_moa_loss};
    pub use crate::postprocess::{
        AdvantageEstimator, Gae, TrajectoryPostprocessor, ValueEstimator,
    };
    pub use crate::schedule::InfluenceSchedule;
    pub use crate::trajectory::{PostprocessedTrajectory, Trajectory};
    pub use crate::visibility::VisibilityAnnotations;
    pub use crate::{InfluenceError, Result};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum InfluenceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Shape mismatch in {field}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        field: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Length mismatch in {field}: expected {expected}, got {actual}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Trajectory has no steps")]
    EmptyTrajectory,

    #[error("Agent id {id} does not map to any of {num_other_agents} other-agent slots (self id {self_id})")]
    AgentIdOutOfRange {
        id: u32,
        self_id: u32,
        num_other_agents: usize,
    },

    #[error("Action {action} out of range for action space of size {num_actions}")]
    ActionOutOfRange { action: i64, num_actions: usize },
}

pub type Result<T> = core::result::Result<T, InfluenceError>;
