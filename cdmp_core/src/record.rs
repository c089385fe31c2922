//! Per-turn records for persistence collaborators.
//!
//! The core does not own a storage format. It flattens each turn into a
//! serializable [`TurnRecord`] keyed by `(scenario, turn)` and hands it to
//! whatever [`TurnRecorder`] the caller supplies.

use crate::error::{ModelError, Result};
use crate::model::Model;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// One estimator's view of the utility matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorUtility {
    /// Actor doing the estimating
    pub estimator: usize,

    /// `rows[i][j]`: estimated utility to actor i of actor j's position
    pub rows: Vec<Vec<f64>>,
}

/// Everything derived at one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    /// Scenario name
    pub scenario: String,

    /// Index into the model history
    pub turn: usize,

    /// Display form of each actor's position
    pub positions: Vec<String>,

    /// Utility estimates that have been computed
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub utilities: Vec<EstimatorUtility>,

    /// First holder of each distinct position
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub u_indices: Vec<usize>,

    /// Lowest-indexed equivalent of each actor's position
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub e_indices: Vec<usize>,

    /// Win probability of each distinct position
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub unique_probs: Option<Vec<f64>>,
}

impl TurnRecord {
    /// Flattens the state at `turn`.
    pub fn capture(model: &Model, turn: usize) -> Result<Self> {
        let state = model.state(turn).ok_or(ModelError::StateNotInHistory)?;
        let utilities = (0..state.num_act())
            .filter_map(|h| {
                state.a_util(h).ok().map(|u| EstimatorUtility {
                    estimator: h,
                    rows: rows_of(u),
                })
            })
            .collect();

        Ok(Self {
            scenario: model.scenario_name().to_string(),
            turn,
            positions: state.pstns().iter().map(|p| p.to_string()).collect(),
            utilities,
            u_indices: state.u_indices().to_vec(),
            e_indices: state.e_indices().to_vec(),
            unique_probs: state.u_prob().map(|p| p.iter().copied().collect()),
        })
    }
}

fn rows_of(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter().map(|r| r.iter().copied().collect()).collect()
}

/// Receives turn records as a run progresses.
pub trait TurnRecorder {
    fn record_turn(&mut self, record: &TurnRecord) -> Result<()>;
}

/// Keeps records in memory.
#[derive(Debug, Default, Clone)]
pub struct VecRecorder {
    pub records: Vec<TurnRecord>,
}

impl TurnRecorder for VecRecorder {
    fn record_turn(&mut self, record: &TurnRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Captures every turn in the model's history, returning the count recorded.
pub fn record_history(model: &Model, recorder: &mut dyn TurnRecorder) -> Result<usize> {
    for t in 0..model.history().len() {
        recorder.record_turn(&TurnRecord::capture(model, t)?)?;
    }
    Ok(model.history().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ReportingLevel;
    use crate::state::{Perspective, State};
    use crate::testing::{line_model, LineState};

    #[test]
    fn test_capture_populated_state() {
        let mut model = line_model(3);
        let mut s = LineState::new(&model, &[0.0, 0.5, 0.5]).unwrap();
        s.set_a_util(Perspective::Actor(1), &model, ReportingLevel::Silent).unwrap();
        s.set_ue_ndx().unwrap();
        s.set_u_prob(&model).unwrap();
        model.add_state(Box::new(s)).unwrap();

        let rec = TurnRecord::capture(&model, 0).unwrap();
        assert_eq!(rec.turn, 0);
        assert_eq!(rec.positions, vec!["[0.0000]", "[0.5000]", "[0.5000]"]);
        assert_eq!(rec.utilities.len(), 1);
        assert_eq!(rec.utilities[0].estimator, 1);
        assert_eq!(rec.utilities[0].rows[0], vec![1.0, 0.5, 0.5]);
        assert_eq!(rec.u_indices, vec![0, 1]);
        assert_eq!(rec.e_indices, vec![0, 1, 1]);
        assert_eq!(rec.unique_probs.as_ref().map(|p| p.len()), Some(2));
    }

    #[test]
    fn test_capture_missing_turn() {
        let model = line_model(3);
        assert_eq!(TurnRecord::capture(&model, 0), Err(ModelError::StateNotInHistory));
    }

    #[test]
    fn test_record_history_and_json() {
        let mut model = line_model(3);
        for xs in [[0.0, 0.5, 1.0], [0.1, 0.5, 0.9]] {
            let s = LineState::new(&model, &xs).unwrap();
            model.add_state(Box::new(s)).unwrap();
        }
        let mut recorder = VecRecorder::default();
        assert_eq!(record_history(&model, &mut recorder).unwrap(), 2);
        assert_eq!(recorder.records[1].turn, 1);

        // empty caches are omitted from the serialized form
        let json = serde_json::to_string(&recorder.records[0]).unwrap();
        assert!(!json.contains("utilities"));
        let back: TurnRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, recorder.records[0]);
    }
}
