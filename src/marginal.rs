//! Marginalization of counterfactual predictions over the acting agent's
//! own policy.

use ndarray::{Array, Array3, Array4, ArrayView, ArrayView2, ArrayView3, Axis, Dimension};

use crate::{InfluenceError, Result};

/// Softmax along the last axis.
pub fn softmax<D>(logits: &ArrayView<'_, f32, D>) -> Array<f32, D>
where
    D: Dimension,
{
    let axis = Axis(logits.ndim() - 1);
    let mut out = logits.to_owned();
    for mut lane in out.lanes_mut(axis) {
        let max = lane.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        lane.mapv_inplace(|v| (v - max).exp());
        let sum = lane.sum();
        lane.mapv_inplace(|v| v / sum);
    }
    out
}

/// Renormalize along the last axis to reduce floating-point drift.
pub fn renormalize<D>(probs: &mut Array<f32, D>)
where
    D: Dimension,
{
    let axis = Axis(probs.ndim() - 1);
    for mut lane in probs.lanes_mut(axis) {
        let sum = lane.sum();
        if sum > 0.0 {
            lane.mapv_inplace(|v| v / sum);
        }
    }
}

/// Reshape flat counterfactual logits `[B, N*A, A]` into `[B, N, A, A]`,
/// where axis 2 indexes the acting agent's own hypothetical action.
pub fn reshape_counterfactuals(
    counterfactual_logits: &ArrayView3<'_, f32>,
    num_other_agents: usize,
    num_actions: usize,
) -> Result<Array4<f32>> {
    let steps = counterfactual_logits.shape()[0];
    let (n, a) = (num_other_agents, num_actions);
    counterfactual_logits
        .to_owned()
        .into_shape_with_order((steps, n, a, a))
        .map_err(|_| InfluenceError::ShapeMismatch {
            field: "counterfactual_logits",
            expected: vec![steps, n * a, a],
            actual: counterfactual_logits.shape().to_vec(),
        })
}

/// Average the counterfactual predictions over the acting agent's own policy.
///
/// Output `[B, N, A]`: the distribution each other agent is predicted to
/// hold for its next action once the acting agent's actual choice is
/// marginalized out:
///
/// `marginal[b, n, :] = sum_own action_probs[b, own] * counterfactual[b, n, own, :]`
///
/// Rows are renormalized along the action axis on output.
pub fn marginalize_over_own_actions(
    action_logits: &ArrayView2<'_, f32>,
    counterfactual_logits: &ArrayView3<'_, f32>,
    num_other_agents: usize,
) -> Result<Array3<f32>> {
    let steps = action_logits.nrows();
    let num_actions = action_logits.ncols();
    let (n, a) = (num_other_agents, num_actions);

    let expected = [steps, n * a, a];
    if counterfactual_logits.shape() != expected {
        return Err(InfluenceError::ShapeMismatch {
            field: "counterfactual_logits",
            expected: expected.to_vec(),
            actual: counterfactual_logits.shape().to_vec(),
        });
    }

    let mut action_probs = softmax(action_logits);
    renormalize(&mut action_probs);

    let counterfactuals = reshape_counterfactuals(counterfactual_logits, n, a)?;
    let counterfactual_probs = softmax(&counterfactuals.view());

    let mut marginal = Array3::<f32>::zeros((steps, n, a));
    for b in 0..steps {
        for ni in 0..n {
            for own in 0..a {
                let weight = action_probs[[b, own]];
                for ai in 0..a {
                    marginal[[b, ni, ai]] += weight * counterfactual_probs[[b, ni, own, ai]];
                }
            }
        }
    }
    renormalize(&mut marginal);

    Ok(marginal)
}
