//! Trajectory post-processing: influence injection, bootstrap values, and
//! advantage estimation.

use ndarray::{Array1, Array2, ArrayD};

use crate::config::InfluenceConfig;
use crate::influence::InfluenceReward;
use crate::schedule::InfluenceSchedule;
use crate::trajectory::{PostprocessedTrajectory, Trajectory};
use crate::Result;

/// Value-function collaborator supplied by the training framework.
pub trait ValueEstimator {
    /// Scalar value estimate for a state, used to bootstrap truncated
    /// trajectories.
    fn value(
        &self,
        obs: &ArrayD<f32>,
        prev_action: i64,
        prev_reward: f32,
        state: &[ArrayD<f32>],
    ) -> f32;
}

/// Advantage-estimation collaborator.
pub trait AdvantageEstimator {
    /// Produce `(value_targets, advantages)` for a reward stream.
    #[allow(clippy::too_many_arguments)]
    fn estimate(
        &self,
        rewards: &Array1<f32>,
        value_preds: &Array1<f32>,
        dones: &[bool],
        last_r: f32,
        gamma: f32,
        gae_lambda: f32,
        use_gae: bool,
    ) -> (Array1<f32>, Array1<f32>);
}

/// Generalized Advantage Estimation over a single trajectory.
pub struct Gae;

impl AdvantageEstimator for Gae {
    fn estimate(
        &self,
        rewards: &Array1<f32>,
        value_preds: &Array1<f32>,
        dones: &[bool],
        last_r: f32,
        gamma: f32,
        gae_lambda: f32,
        use_gae: bool,
    ) -> (Array1<f32>, Array1<f32>) {
        let steps = rewards.len();

        if use_gae {
            let mut advantages = Array1::<f32>::zeros(steps);
            let mut last_gae = 0.0f32;
            for t in (0..steps).rev() {
                let next_value = if t == steps - 1 {
                    last_r
                } else {
                    value_preds[t + 1]
                };
                let not_done = if dones[t] { 0.0 } else { 1.0 };
                let delta = rewards[t] + gamma * next_value * not_done - value_preds[t];
                last_gae = delta + gamma * gae_lambda * not_done * last_gae;
                advantages[t] = last_gae;
            }
            let value_targets = &advantages + value_preds;
            (value_targets, advantages)
        } else {
            // Discounted return bootstrapped from last_r
            let mut value_targets = Array1::<f32>::zeros(steps);
            let mut ret = last_r;
            for t in (0..steps).rev() {
                let not_done = if dones[t] { 0.0 } else { 1.0 };
                ret = rewards[t] + gamma * ret * not_done;
                value_targets[t] = ret;
            }
            let advantages = &value_targets - value_preds;
            (value_targets, advantages)
        }
    }
}

/// Orchestrates per-trajectory post-processing for one policy instance.
///
/// Influence is injected into the reward stream *before* advantage
/// estimation, so the training signal optimizes the combined
/// extrinsic-plus-influence reward. The curriculum schedule is owned here
/// and advanced exactly once per trajectory.
pub struct TrajectoryPostprocessor<V: ValueEstimator, A: AdvantageEstimator> {
    config: InfluenceConfig,
    influence: InfluenceReward,
    schedule: InfluenceSchedule,
    value_fn: V,
    advantage_fn: A,
}

impl<V: ValueEstimator, A: AdvantageEstimator> TrajectoryPostprocessor<V, A> {
    /// Build a post-processor; fails on an invalid configuration before
    /// any trajectory is processed.
    pub fn new(config: InfluenceConfig, self_id: u32, value_fn: V, advantage_fn: A) -> Result<Self> {
        config.validate()?;
        let influence = InfluenceReward::from_config(&config, self_id);
        let schedule = InfluenceSchedule::from_config(&config);
        Ok(Self {
            config,
            influence,
            schedule,
            value_fn,
            advantage_fn,
        })
    }

    pub fn config(&self) -> &InfluenceConfig {
        &self.config
    }

    pub fn schedule(&self) -> &InfluenceSchedule {
        &self.schedule
    }

    /// Current curriculum weight on the influence reward
    pub fn current_influence_weight(&self) -> f32 {
        self.schedule.current_weight()
    }

    /// Process one completed rollout segment.
    pub fn postprocess(&mut self, mut trajectory: Trajectory) -> Result<PostprocessedTrajectory> {
        trajectory.validate(self.config.num_other_agents)?;
        let steps = trajectory.len();
        let n = self.config.num_other_agents;

        // Own actions in column 0, others' realized actions after
        let mut all_actions = Array2::<i64>::zeros((steps, n + 1));
        for t in 0..steps {
            all_actions[[t, 0]] = trajectory.actions[t];
            for ni in 0..n {
                all_actions[[t, ni + 1]] = trajectory.other_actions[[t, ni]];
            }
        }

        let weight = self.schedule.current_weight();
        let outcome = self.influence.apply(&mut trajectory, weight)?;
        self.schedule.advance(steps);

        let last_r = if trajectory.is_terminal() {
            0.0
        } else {
            self.value_fn.value(
                &trajectory.next_obs[steps - 1],
                trajectory.actions[steps - 1],
                trajectory.rewards[steps - 1],
                &trajectory.final_state,
            )
        };

        let (value_targets, advantages) = self.advantage_fn.estimate(
            &trajectory.rewards,
            &trajectory.value_preds,
            &trajectory.dones,
            last_r,
            self.config.gamma,
            self.config.gae_lambda,
            self.config.use_gae,
        );

        tracing::debug!(
            steps,
            weight = weight as f64,
            steps_processed = self.schedule.steps_processed(),
            "postprocessed trajectory"
        );

        Ok(PostprocessedTrajectory {
            trajectory,
            all_actions,
            total_influence: outcome.total_influence,
            reward_without_influence: outcome.reward_without_influence,
            value_targets,
            advantages,
        })
    }
}
