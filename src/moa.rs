//! Supervised action-prediction loss for the model of other agents.

use ndarray::{s, ArrayView2, ArrayView3};

use crate::config::InfluenceConfig;
use crate::trajectory::PostprocessedTrajectory;
use crate::{InfluenceError, Result};

/// Cross-entropy loss for the MOA's next-action predictions.
///
/// The MOA predicts other agents' actions at step `t+1` from the joint
/// state at step `t`, so the final prediction row has no label and the
/// first ground-truth row has no prediction; both are dropped. The self
/// column of `all_actions` (column 0) is skipped. When a visibility mask
/// is given, loss terms for invisible agents are zeroed with the mask rows
/// aligned to the `t+1` labels.
///
/// Gradient machinery stays external; this is the scalar the trainer adds
/// to its policy loss and reports in diagnostics.
pub fn moa_loss(
    pred_logits: &ArrayView3<'_, f32>,
    all_actions: &ArrayView2<'_, i64>,
    visibility: Option<&ArrayView2<'_, f32>>,
    moa_weight: f32,
) -> Result<f32> {
    let (steps, n, num_actions) = {
        let shape = pred_logits.shape();
        (shape[0], shape[1], shape[2])
    };

    let expected = [steps, n + 1];
    if all_actions.shape() != expected {
        return Err(InfluenceError::ShapeMismatch {
            field: "all_actions",
            expected: expected.to_vec(),
            actual: all_actions.shape().to_vec(),
        });
    }
    if let Some(mask) = visibility {
        let expected = [steps, n];
        if mask.shape() != expected {
            return Err(InfluenceError::ShapeMismatch {
                field: "visibility",
                expected: expected.to_vec(),
                actual: mask.shape().to_vec(),
            });
        }
    }

    if steps < 2 {
        return Ok(0.0);
    }

    let mut total = 0.0f32;
    let mut count = 0usize;
    for t in 0..steps - 1 {
        for ni in 0..n {
            let target = all_actions[[t + 1, ni + 1]];
            if target < 0 || target as usize >= num_actions {
                return Err(InfluenceError::ActionOutOfRange {
                    action: target,
                    num_actions,
                });
            }

            let lane = pred_logits.slice(s![t, ni, ..]);
            let max = lane.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
            let log_sum_exp = lane.iter().map(|&v| (v - max).exp()).sum::<f32>().ln() + max;
            let mut ce = log_sum_exp - lane[target as usize];

            if let Some(mask) = visibility {
                ce *= mask[[t + 1, ni]];
            }

            total += ce;
            count += 1;
        }
    }

    if count == 0 {
        return Ok(0.0);
    }
    Ok(total / count as f32 * moa_weight)
}

/// MOA loss for a processed trajectory, with the visibility mask resolved
/// from the trajectory when `train_moa_only_when_visible` is set.
pub fn trajectory_moa_loss(
    config: &InfluenceConfig,
    self_id: u32,
    processed: &PostprocessedTrajectory,
    pred_logits: &ArrayView3<'_, f32>,
) -> Result<f32> {
    let mask = if config.train_moa_only_when_visible {
        Some(processed.trajectory.visibility.resolve(
            processed.trajectory.len(),
            self_id,
            config.num_other_agents,
            config.visibility_fallback,
        )?)
    } else {
        None
    };
    let mask_view = mask.as_ref().map(|m| m.view());
    moa_loss(
        pred_logits,
        &processed.all_actions.view(),
        mask_view.as_ref(),
        config.moa_weight,
    )
}
