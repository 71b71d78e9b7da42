//! Causal influence intrinsic reward.

use ndarray::{Array1, Array3, Axis};

use crate::config::{DivergenceMeasure, InfluenceConfig, VisibilityFallback};
use crate::marginal::{marginalize_over_own_actions, renormalize, reshape_counterfactuals, softmax};
use crate::trajectory::Trajectory;
use crate::{InfluenceError, Result};

/// Influence computed for one trajectory.
#[derive(Clone, Debug)]
pub struct InfluenceOutcome {
    /// Summed, clipped influence per step (before curriculum weighting)
    pub total_influence: Array1<f32>,
    /// Extrinsic rewards before injection
    pub reward_without_influence: Array1<f32>,
}

/// Computes how much this agent's actions changed other agents' predicted
/// behavior, and injects the result into the reward stream.
///
/// Per step and other agent, the reward is the divergence between the MOA
/// prediction conditioned on the action actually taken and the marginal
/// prediction with the acting agent's choice averaged out under its own
/// policy. Invisible agents can be masked out, and the summed influence is
/// clipped symmetrically before the curriculum weight is applied.
pub struct InfluenceReward {
    num_other_agents: usize,
    measure: DivergenceMeasure,
    only_when_visible: bool,
    reward_clip: f32,
    visibility_fallback: VisibilityFallback,
    self_id: u32,
}

impl InfluenceReward {
    pub fn from_config(config: &InfluenceConfig, self_id: u32) -> Self {
        Self {
            num_other_agents: config.num_other_agents,
            measure: config.influence_divergence_measure,
            only_when_visible: config.influence_only_when_visible,
            reward_clip: config.influence_reward_clip,
            visibility_fallback: config.visibility_fallback,
            self_id,
        }
    }

    /// Slice out the counterfactual prediction corresponding to the action
    /// the agent actually took: `true_probs[b, n, :]`, softmax-normalized.
    fn true_action_probs(&self, trajectory: &Trajectory) -> Result<Array3<f32>> {
        let steps = trajectory.len();
        let num_actions = trajectory.num_actions();
        let n = self.num_other_agents;

        let counterfactuals = reshape_counterfactuals(
            &trajectory.counterfactual_logits.view(),
            n,
            num_actions,
        )?;

        let mut true_logits = Array3::<f32>::zeros((steps, n, num_actions));
        for b in 0..steps {
            let own = trajectory.actions[b];
            if own < 0 || own as usize >= num_actions {
                return Err(InfluenceError::ActionOutOfRange {
                    action: own,
                    num_actions,
                });
            }
            let own = own as usize;
            for ni in 0..n {
                for ai in 0..num_actions {
                    true_logits[[b, ni, ai]] = counterfactuals[[b, ni, own, ai]];
                }
            }
        }

        let mut true_probs = softmax(&true_logits.view());
        renormalize(&mut true_probs);
        Ok(true_probs)
    }

    /// Compute the influence reward and add it, curriculum-weighted, to the
    /// trajectory's rewards.
    pub fn apply(&self, trajectory: &mut Trajectory, weight: f32) -> Result<InfluenceOutcome> {
        trajectory.validate(self.num_other_agents)?;
        let steps = trajectory.len();

        let true_probs = self.true_action_probs(trajectory)?;
        let marginal_probs = marginalize_over_own_actions(
            &trajectory.action_logits.view(),
            &trajectory.counterfactual_logits.view(),
            self.num_other_agents,
        )?;

        // [B, N] divergence per step and other agent
        let mut per_agent_step = self
            .measure
            .compute(&true_probs.view(), &marginal_probs.view());

        if self.only_when_visible {
            let visible = trajectory.visibility.resolve(
                steps,
                self.self_id,
                self.num_other_agents,
                self.visibility_fallback,
            )?;
            per_agent_step *= &visible;
        }

        let clip = self.reward_clip;
        let influence = per_agent_step
            .sum_axis(Axis(1))
            .mapv(|v| v.clamp(-clip, clip));

        let reward_without_influence = trajectory.rewards.clone();
        let weighted = influence.mapv(|v| v * weight);
        trajectory.rewards = &reward_without_influence + &weighted;

        Ok(InfluenceOutcome {
            total_influence: influence,
            reward_without_influence,
        })
    }
}
