//! Trajectory records exchanged with the training framework.

use std::collections::HashMap;

use ndarray::{Array1, Array2, Array3, ArrayD};

use crate::visibility::VisibilityAnnotations;
use crate::{InfluenceError, Result};

/// One rollout segment for a single agent.
///
/// All per-step fields share the same first-axis length B. The
/// counterfactual logits carry, for each other agent and each hypothetical
/// own action, the predicted logits over that other agent's next action,
/// flattened to `[B, N*A, A]`.
#[derive(Clone, Debug)]
pub struct Trajectory {
    /// Observations at each step
    pub obs: Vec<ArrayD<f32>>,
    /// Observations after each step (used for the bootstrap value query)
    pub next_obs: Vec<ArrayD<f32>>,
    /// Actions taken by this agent
    pub actions: Array1<i64>,
    /// Extrinsic rewards received
    pub rewards: Array1<f32>,
    /// Done flags; the last entry signals a terminal trajectory
    pub dones: Vec<bool>,
    /// Value-function predictions at each step
    pub value_preds: Array1<f32>,
    /// Own-policy logits `[B, A]`
    pub action_logits: Array2<f32>,
    /// MOA counterfactual logits `[B, N*A, A]`
    pub counterfactual_logits: Array3<f32>,
    /// Realized actions of the other agents `[B, N]`
    pub other_actions: Array2<i64>,
    /// Per-step visibility of the other agents
    pub visibility: VisibilityAnnotations,
    /// Recurrent state after the final step (empty for feedforward policies)
    pub final_state: Vec<ArrayD<f32>>,
}

impl Trajectory {
    /// Build a trajectory, validating field consistency up front.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        num_other_agents: usize,
        obs: Vec<ArrayD<f32>>,
        next_obs: Vec<ArrayD<f32>>,
        actions: Array1<i64>,
        rewards: Array1<f32>,
        dones: Vec<bool>,
        value_preds: Array1<f32>,
        action_logits: Array2<f32>,
        counterfactual_logits: Array3<f32>,
        other_actions: Array2<i64>,
        visibility: VisibilityAnnotations,
        final_state: Vec<ArrayD<f32>>,
    ) -> Result<Self> {
        let trajectory = Self {
            obs,
            next_obs,
            actions,
            rewards,
            dones,
            value_preds,
            action_logits,
            counterfactual_logits,
            other_actions,
            visibility,
            final_state,
        };
        trajectory.validate(num_other_agents)?;
        Ok(trajectory)
    }

    /// Number of steps B
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Size of this agent's action space A
    pub fn num_actions(&self) -> usize {
        self.action_logits.ncols()
    }

    /// Whether the final step ended the episode
    pub fn is_terminal(&self) -> bool {
        self.dones.last().copied().unwrap_or(false)
    }

    /// Check batch-length and tensor-shape consistency against the
    /// configured number of other agents.
    pub fn validate(&self, num_other_agents: usize) -> Result<()> {
        let steps = self.rewards.len();
        if steps == 0 {
            return Err(InfluenceError::EmptyTrajectory);
        }

        let lengths = [
            ("obs", self.obs.len()),
            ("next_obs", self.next_obs.len()),
            ("actions", self.actions.len()),
            ("dones", self.dones.len()),
            ("value_preds", self.value_preds.len()),
        ];
        for (field, actual) in lengths {
            if actual != steps {
                return Err(InfluenceError::LengthMismatch {
                    field,
                    expected: steps,
                    actual,
                });
            }
        }

        let num_actions = self.action_logits.ncols();
        if self.action_logits.nrows() != steps {
            return Err(InfluenceError::ShapeMismatch {
                field: "action_logits",
                expected: vec![steps, num_actions],
                actual: self.action_logits.shape().to_vec(),
            });
        }

        let expected = [steps, num_other_agents * num_actions, num_actions];
        if self.counterfactual_logits.shape() != expected {
            return Err(InfluenceError::ShapeMismatch {
                field: "counterfactual_logits",
                expected: expected.to_vec(),
                actual: self.counterfactual_logits.shape().to_vec(),
            });
        }

        let expected = [steps, num_other_agents];
        if self.other_actions.shape() != expected {
            return Err(InfluenceError::ShapeMismatch {
                field: "other_actions",
                expected: expected.to_vec(),
                actual: self.other_actions.shape().to_vec(),
            });
        }

        Ok(())
    }
}

/// A trajectory after influence injection and advantage estimation.
#[derive(Clone, Debug)]
pub struct PostprocessedTrajectory {
    /// The source trajectory; `rewards` now includes the weighted influence
    pub trajectory: Trajectory,
    /// Own actions (column 0) concatenated with others' realized actions
    pub all_actions: Array2<i64>,
    /// Summed, clipped influence per step (unweighted)
    pub total_influence: Array1<f32>,
    /// Extrinsic rewards before influence injection
    pub reward_without_influence: Array1<f32>,
    /// Value targets from the advantage estimator
    pub value_targets: Array1<f32>,
    /// Advantage estimates over the influence-augmented reward stream
    pub advantages: Array1<f32>,
}

impl PostprocessedTrajectory {
    /// Diagnostic scalars for external logging.
    pub fn metrics(&self, moa_loss: Option<f32>) -> HashMap<String, f64> {
        let mut metrics = HashMap::new();
        metrics.insert(
            "total_influence".to_string(),
            self.total_influence.mean().unwrap_or(0.0) as f64,
        );
        metrics.insert(
            "reward_without_influence".to_string(),
            self.reward_without_influence.mean().unwrap_or(0.0) as f64,
        );
        if let Some(loss) = moa_loss {
            metrics.insert("moa_loss".to_string(), loss as f64);
        }
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2, Array3, IxDyn};

    fn dummy_obs(steps: usize) -> Vec<ArrayD<f32>> {
        (0..steps)
            .map(|_| ArrayD::zeros(IxDyn(&[4])))
            .collect()
    }

    fn build(steps: usize, n: usize, a: usize) -> Result<Trajectory> {
        Trajectory::new(
            n,
            dummy_obs(steps),
            dummy_obs(steps),
            Array1::zeros(steps),
            Array1::zeros(steps),
            vec![false; steps],
            Array1::zeros(steps),
            Array2::zeros((steps, a)),
            Array3::zeros((steps, n * a, a)),
            Array2::zeros((steps, n)),
            VisibilityAnnotations::Missing,
            Vec::new(),
        )
    }

    #[test]
    fn test_valid_construction() {
        let trajectory = build(4, 2, 3).unwrap();
        assert_eq!(trajectory.len(), 4);
        assert_eq!(trajectory.num_actions(), 3);
        assert!(!trajectory.is_terminal());
    }

    #[test]
    fn test_empty_trajectory_rejected() {
        assert!(matches!(build(0, 1, 2), Err(InfluenceError::EmptyTrajectory)));
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let mut trajectory = build(4, 2, 3).unwrap();
        trajectory.dones.pop();
        assert!(matches!(
            trajectory.validate(2),
            Err(InfluenceError::LengthMismatch { field: "dones", .. })
        ));
    }

    #[test]
    fn test_counterfactual_shape_checked_against_num_agents() {
        let trajectory = build(4, 2, 3).unwrap();
        // Trajectory was built for 2 other agents; validating against 3 fails
        assert!(matches!(
            trajectory.validate(3),
            Err(InfluenceError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_terminal_flag() {
        let mut trajectory = build(2, 1, 2).unwrap();
        assert!(!trajectory.is_terminal());
        trajectory.dones[1] = true;
        assert!(trajectory.is_terminal());
    }
}
