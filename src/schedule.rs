//! Influence reward curriculum schedule.

use crate::config::InfluenceConfig;

/// Time-varying multiplier on the influence reward.
///
/// Owns a monotonically increasing step counter for one policy instance.
/// The weight ramps up linearly from 0 over `curriculum_steps`, holds at
/// the full reward weight, then decays linearly between `scaledown_start`
/// and `scaledown_end` down to a floor of `scaledown_final_val`.
///
/// Steps between the end of the ramp-up and `scaledown_start` get the full
/// weight. Workers running their own policy copies each own an independent
/// schedule; reconciling counters across workers is the orchestration
/// layer's concern.
#[derive(Clone, Debug)]
pub struct InfluenceSchedule {
    steps_processed: u64,
    reward_weight: f32,
    curriculum_steps: u64,
    scaledown_start: u64,
    scaledown_end: u64,
    scaledown_final_val: f32,
}

impl InfluenceSchedule {
    pub fn new(
        reward_weight: f32,
        curriculum_steps: u64,
        scaledown_start: u64,
        scaledown_end: u64,
        scaledown_final_val: f32,
    ) -> Self {
        Self {
            steps_processed: 0,
            reward_weight,
            curriculum_steps,
            scaledown_start,
            scaledown_end,
            scaledown_final_val,
        }
    }

    pub fn from_config(config: &InfluenceConfig) -> Self {
        Self::new(
            config.influence_reward_weight,
            config.influence_curriculum_steps,
            config.influence_scaledown_start,
            config.influence_scaledown_end,
            config.influence_scaledown_final_val,
        )
    }

    /// Number of environment steps this schedule has seen
    pub fn steps_processed(&self) -> u64 {
        self.steps_processed
    }

    /// Advance the counter by the number of steps in a processed trajectory
    pub fn advance(&mut self, steps: usize) {
        self.steps_processed += steps as u64;
    }

    /// Current influence weight, recomputed from the step counter.
    ///
    /// The percent terms are computed in f64: the default scaledown window
    /// spans hundreds of millions of steps, past where f32 can represent
    /// consecutive integers.
    pub fn current_weight(&self) -> f32 {
        if self.steps_processed < self.curriculum_steps {
            let percent = self.steps_processed as f64 / self.curriculum_steps as f64;
            (percent * self.reward_weight as f64) as f32
        } else if self.steps_processed > self.scaledown_start {
            let span = (self.scaledown_end - self.scaledown_start) as f64;
            let percent = (self.steps_processed - self.scaledown_start) as f64 / span;
            let scaled = self.reward_weight as f64
                - (self.reward_weight as f64 - self.scaledown_final_val as f64) * percent;
            (scaled as f32).max(self.scaledown_final_val)
        } else {
            self.reward_weight
        }
    }
}
