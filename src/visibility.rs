//! Visibility annotations and their resolution to dense masks.

use ndarray::Array2;

use crate::config::VisibilityFallback;
use crate::{InfluenceError, Result};

/// Per-step visibility information for the other agents.
///
/// Rollout workers attach visibility in whatever form the environment
/// provides; the resolver turns everything into a dense `[B, N]` 0/1
/// matrix aligned to other-agent slots.
#[derive(Clone, Debug)]
pub enum VisibilityAnnotations {
    /// Already-dense `[B, N]` matrix of 0/1 entries
    Dense(Array2<f32>),
    /// Per-step lists of visible agent ids (may include the self id)
    AgentIds(Vec<Vec<u32>>),
    /// No visibility information was recorded
    Missing,
}

impl VisibilityAnnotations {
    /// Resolve to a dense `[steps, num_other_agents]` 0/1 matrix.
    ///
    /// Agent ids map to other-agent slots with the self slot removed:
    /// `slot = id` when `id < self_id`, otherwise `id - 1`. The self id
    /// itself is skipped. `Missing` annotations resolve according to the
    /// configured fallback.
    pub fn resolve(
        &self,
        steps: usize,
        self_id: u32,
        num_other_agents: usize,
        fallback: VisibilityFallback,
    ) -> Result<Array2<f32>> {
        match self {
            VisibilityAnnotations::Dense(matrix) => {
                let expected = [steps, num_other_agents];
                if matrix.shape() != expected {
                    return Err(InfluenceError::ShapeMismatch {
                        field: "visibility",
                        expected: expected.to_vec(),
                        actual: matrix.shape().to_vec(),
                    });
                }
                Ok(matrix.clone())
            }
            VisibilityAnnotations::AgentIds(rows) => {
                if rows.len() != steps {
                    return Err(InfluenceError::LengthMismatch {
                        field: "visibility",
                        expected: steps,
                        actual: rows.len(),
                    });
                }
                let mut matrix = Array2::<f32>::zeros((steps, num_other_agents));
                for (t, visible) in rows.iter().enumerate() {
                    for &id in visible {
                        if id == self_id {
                            continue;
                        }
                        let slot = (if id < self_id { id } else { id - 1 }) as usize;
                        if slot >= num_other_agents {
                            return Err(InfluenceError::AgentIdOutOfRange {
                                id,
                                self_id,
                                num_other_agents,
                            });
                        }
                        matrix[[t, slot]] = 1.0;
                    }
                }
                Ok(matrix)
            }
            VisibilityAnnotations::Missing => match fallback {
                VisibilityFallback::AllVisible => {
                    Ok(Array2::ones((steps, num_other_agents)))
                }
                VisibilityFallback::AllHidden => {
                    Ok(Array2::zeros((steps, num_other_agents)))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_ids_map_around_self() {
        // self_id = 2, visible = [0, 1, 3] with 3 other agents fills every slot
        let annotations = VisibilityAnnotations::AgentIds(vec![vec![0, 1, 3]]);
        let matrix = annotations
            .resolve(1, 2, 3, VisibilityFallback::AllVisible)
            .unwrap();
        assert_eq!(matrix.row(0).to_vec(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_empty_visible_list_gives_zero_row() {
        let annotations = VisibilityAnnotations::AgentIds(vec![vec![]]);
        let matrix = annotations
            .resolve(1, 2, 3, VisibilityFallback::AllVisible)
            .unwrap();
        assert_eq!(matrix.row(0).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_self_id_is_skipped() {
        let annotations = VisibilityAnnotations::AgentIds(vec![vec![2]]);
        let matrix = annotations
            .resolve(1, 2, 3, VisibilityFallback::AllVisible)
            .unwrap();
        assert_eq!(matrix.sum(), 0.0);
    }

    #[test]
    fn test_out_of_range_id_is_an_error() {
        let annotations = VisibilityAnnotations::AgentIds(vec![vec![7]]);
        let result = annotations.resolve(1, 2, 3, VisibilityFallback::AllVisible);
        assert!(matches!(
            result,
            Err(InfluenceError::AgentIdOutOfRange { id: 7, .. })
        ));
    }

    #[test]
    fn test_dense_shape_checked() {
        let annotations = VisibilityAnnotations::Dense(Array2::ones((2, 2)));
        assert!(annotations
            .resolve(2, 0, 2, VisibilityFallback::AllVisible)
            .is_ok());
        assert!(annotations
            .resolve(3, 0, 2, VisibilityFallback::AllVisible)
            .is_err());
    }

    #[test]
    fn test_missing_resolves_per_fallback() {
        let annotations = VisibilityAnnotations::Missing;
        let visible = annotations
            .resolve(2, 0, 2, VisibilityFallback::AllVisible)
            .unwrap();
        assert_eq!(visible.sum(), 4.0);
        let hidden = annotations
            .resolve(2, 0, 2, VisibilityFallback::AllHidden)
            .unwrap();
        assert_eq!(hidden.sum(), 0.0);
    }
}
