//! End-to-end runs through the public API of both crates.

use approx::assert_relative_eq;
use cdmp_core::{
    scalar_pce, ActorInfo, MaxTurns, Model, ModelError, PCEModel, PolicyConfig, ReportingLevel,
    State, VPModel, VotingRule,
};
use cdmp_sim::scenarios::ScenarioId;
use cdmp_sim::{
    scalar_positions, ScalarActor, ScalarParams, ScalarState, ScalarStep, ScenarioRunner,
    SimConfig,
};
use nalgebra::DMatrix;
use std::rc::Rc;

fn scalar_model(xs: &[f64], seed: u64) -> Model {
    let mut model = Model::new(PolicyConfig::default(), seed);
    for k in 0..xs.len() {
        let info = ActorInfo::new(format!("A{}", k), "integration actor").unwrap();
        model.add_actor(Box::new(ScalarActor::new(info, k, 1.0, VotingRule::PropBin)));
    }
    let params = Rc::new(ScalarParams {
        weights: vec![1.0; xs.len()],
        pos_tol: 1e-3,
        drift_rate: 0.25,
        util_noise: 0.0,
        reporting: ReportingLevel::Silent,
    });
    let mut s0 = ScalarState::new(&model, Rc::clone(&params), xs).unwrap();
    s0.prepare(&model).unwrap();
    s0.core_mut().step = Some(Box::new(ScalarStep::new(params)));
    model.add_state(Box::new(s0)).unwrap();
    model
}

#[test]
fn majority_option_is_most_likely() {
    let w = DMatrix::from_row_slice(1, 3, &[1.0, 1.0, 1.0]);
    let u = DMatrix::from_row_slice(3, 3, &[1.0, 0.6, 0.2, 1.0, 0.3, 0.5, 0.9, 1.0, 0.1]);
    let p = scalar_pce(
        3,
        3,
        &w,
        &u,
        VotingRule::Proportional,
        VPModel::Linear,
        PCEModel::MarkovUniform,
        ReportingLevel::Silent,
    )
    .unwrap();
    assert_relative_eq!(p.sum(), 1.0, epsilon = 1e-6);
    assert!(p[0] > p[1] && p[0] > p[2]);
}

#[test]
fn run_until_fifth_iteration_keeps_six_states() {
    let mut model = scalar_model(&[0.1, 0.4, 0.9, 0.95], 3)
        .with_stop(|iter: usize, _: &dyn State| iter >= 5);
    let steps = model.run().unwrap();
    assert_eq!(steps, 5);
    assert_eq!(model.history().len(), 6);
    for (t, s) in model.history().iter().enumerate() {
        assert_eq!(s.my_turn(&model).unwrap(), t);
        assert_eq!(s.model_id(), model.id());
    }
}

#[test]
fn max_turns_bounds_the_loop() {
    let mut model = scalar_model(&[0.0, 0.5, 1.0], 5).with_stop(MaxTurns(3));
    model.run().unwrap();
    assert_eq!(model.history().len(), 4);

    // a finished model cannot be run again
    assert!(matches!(model.run(), Err(ModelError::HistoryNotReady(4))));
}

#[test]
fn positions_contract_every_turn() {
    let mut model = scalar_model(&[0.05, 0.3, 0.6, 0.9], 8).with_stop(MaxTurns(4));
    model.run().unwrap();
    let spreads: Vec<f64> = model
        .history()
        .iter()
        .map(|s| {
            let xs = scalar_positions(s.as_ref()).unwrap();
            xs.iter().cloned().fold(f64::MIN, f64::max) - xs.iter().cloned().fold(f64::MAX, f64::min)
        })
        .collect();
    for pair in spreads.windows(2) {
        assert!(pair[1] < pair[0]);
    }
}

#[test]
fn every_scenario_passes_under_each_pce_model() {
    for &pce_model in PCEModel::ALL {
        let policy = PolicyConfig {
            pce_model,
            ..Default::default()
        };
        let runner = ScenarioRunner::new(SimConfig::default()).with_policy(policy);
        for scenario in ScenarioId::all() {
            let result = runner.run(scenario).unwrap();
            assert!(
                result.passed,
                "{} under {}: {:?}",
                scenario, pce_model, result.failure_reason
            );
        }
    }
}
