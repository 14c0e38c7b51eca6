//! End-to-end global fitting tests.

use approx::assert_relative_eq;
use globalfit_rs::{
    Experiment, FitError, FitStatus, GlobalFit, LmConfig, Model, ModelKind, SessionState,
};
use ndarray::Array1;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::time::Duration;

/// Heats for a single-site titration with fully competent material.
fn single_site_heats(x: &Array1<f64>, ka: f64, dh: f64) -> Array1<f64> {
    x.mapv(|xi| {
        let s = ka * xi;
        dh * s / (1.0 + s)
    })
}

fn titration_axis() -> Array1<f64> {
    Array1::linspace(2.0e-7, 2.0e-5, 30)
}

#[test]
fn fitting_zero_experiments_is_a_trivial_success() {
    let mut session = GlobalFit::new();

    let report = session.fit().unwrap();
    assert_eq!(report.status, FitStatus::Converged);
    assert!(report.params.is_empty());
    assert_eq!(session.state(), SessionState::Fitted);

    let (global, local) = session.fit_param().unwrap();
    assert!(global.is_empty());
    assert!(local.is_empty());
    assert!(session.plot_data().unwrap().is_empty());
}

#[test]
fn reading_results_before_any_fit_fails() {
    let mut session = GlobalFit::new();
    session
        .add_experiment(
            Experiment::new(
                "expt0",
                Model::new(ModelKind::SingleSite),
                titration_axis(),
                single_site_heats(&titration_axis(), 1.0e6, -5.0),
            )
            .unwrap(),
        )
        .unwrap();

    assert!(matches!(session.fit_param(), Err(FitError::State(_))));
    assert!(matches!(session.plot_data(), Err(FitError::State(_))));
}

#[test]
fn shared_enthalpy_appears_only_globally() {
    let x = titration_axis();
    let mut session = GlobalFit::new();

    // Two titrations of the same interaction at different affinities, with
    // one shared enthalpy.
    for (id, ka) in [("a", 1.0e6), ("b", 4.0e5)] {
        session
            .add_experiment(
                Experiment::new(
                    id,
                    Model::new(ModelKind::SingleSite),
                    x.clone(),
                    single_site_heats(&x, ka, -5.0),
                )
                .unwrap(),
            )
            .unwrap();
    }
    session.link_to_global("a", "dh", "global_dh").unwrap();
    session.link_to_global("b", "dh", "global_dh").unwrap();
    session.update_guess("global_dh", -1.0, None).unwrap();

    session.fit().unwrap();

    let (global, local) = session.fit_param().unwrap();
    assert!(global.contains_key("global_dh"));
    assert!(!local[0].contains_key("dh"));
    assert!(!local[1].contains_key("dh"));

    assert_relative_eq!(global["global_dh"], -5.0, max_relative = 1e-2);
    assert_relative_eq!(local[0]["ka"], 1.0e6, max_relative = 1e-2);
    assert_relative_eq!(local[1]["ka"], 4.0e5, max_relative = 1e-2);

    // Solved affinities stay inside the declared (1, 1e12) range; a step
    // past ka = 0 flips the sign of 1 + ka*x and wrecks the surface.
    assert!(local[0]["ka"] >= 1.0);
    assert!(local[1]["ka"] >= 1.0);
}

#[test]
fn noisy_single_site_data_recovers_known_parameters() {
    let x = titration_axis();
    let true_ka = 1.0e6;
    let true_dh = -5.0;

    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let noise = Normal::new(0.0, 0.02).unwrap();
    let clean = single_site_heats(&x, true_ka, true_dh);
    let heats = clean.mapv(|h| h + noise.sample(&mut rng));

    let mut session = GlobalFit::new();
    session
        .add_experiment(
            Experiment::new("expt0", Model::new(ModelKind::SingleSite), x, heats).unwrap(),
        )
        .unwrap();
    // Start well away from the truth.
    session.update_guess("ka", 3.0e5, Some("expt0")).unwrap();
    session.update_guess("dh", -1.0, Some("expt0")).unwrap();

    let config = LmConfig {
        max_iterations: 500,
        ftol: 1e-12,
        xtol: 1e-12,
        ..LmConfig::default()
    };
    session.fit_with_config(config).unwrap();

    let (_, local) = session.fit_param().unwrap();
    let ka = local[0]["ka"];
    let dh = local[0]["dh"];

    assert!(
        (ka - true_ka).abs() / true_ka < 0.05,
        "ka off by more than 5%: {}",
        ka
    );
    assert!(
        (dh - true_dh).abs() / true_dh.abs() < 0.05,
        "dh off by more than 5%: {}",
        dh
    );
}

#[test]
fn weights_pull_a_shared_parameter_toward_the_heavier_experiment() {
    // Two blank titrations disagree about the dilution heat; the shared
    // global settles at the weighted least-squares compromise
    // (w_a^2 * q_a + w_b^2 * q_b) / (w_a^2 + w_b^2).
    let x = Array1::from_elem(10, 1.0);
    let mut session = GlobalFit::new();
    session
        .add_experiment(
            Experiment::new("a", Model::new(ModelKind::Blank), x.clone(), Array1::from_elem(10, 1.0))
                .unwrap(),
        )
        .unwrap();
    session
        .add_experiment(
            Experiment::new("b", Model::new(ModelKind::Blank), x, Array1::from_elem(10, 3.0))
                .unwrap(),
        )
        .unwrap();
    session.update_weight("a", 2.0).unwrap();
    session.update_weight("b", 1.0).unwrap();

    session.link_to_global("a", "q_dilution", "global_q").unwrap();
    session.link_to_global("b", "q_dilution", "global_q").unwrap();

    session.fit().unwrap();

    let (global, _) = session.fit_param().unwrap();
    let expected = (4.0 * 1.0 + 1.0 * 3.0) / 5.0;
    assert_relative_eq!(global["global_q"], expected, max_relative = 1e-4);
}

#[test]
fn fixed_parameters_project_their_fixed_value() {
    let x = Array1::from_elem(5, 1.0);
    let mut session = GlobalFit::new();
    session
        .add_experiment(
            Experiment::new("a", Model::new(ModelKind::Blank), x, Array1::from_elem(5, 2.0))
                .unwrap(),
        )
        .unwrap();
    session.fix("q_dilution", 1.5, Some("a")).unwrap();

    session.fit().unwrap();

    let (_, local) = session.fit_param().unwrap();
    assert_eq!(local[0]["q_dilution"], 1.5);

    // The prediction honors the fixed value too.
    let plots = session.plot_data().unwrap();
    for p in plots[0].predicted.iter() {
        assert_eq!(*p, 1.5);
    }
}

#[test]
fn globally_fixed_parameter_overrides_the_solved_slot() {
    let x = Array1::from_elem(5, 1.0);
    let mut session = GlobalFit::new();
    for id in ["a", "b"] {
        session
            .add_experiment(
                Experiment::new(id, Model::new(ModelKind::Blank), x.clone(), Array1::from_elem(5, 2.0))
                    .unwrap(),
            )
            .unwrap();
        session.link_to_global(id, "q_dilution", "global_q").unwrap();
    }
    session.fix("global_q", 1.25, None).unwrap();

    session.fit().unwrap();

    let (global, _) = session.fit_param().unwrap();
    assert_eq!(global["global_q"], 1.25);
}

#[test]
fn deadline_expiry_cancels_without_storing_a_solution() {
    let x = titration_axis();
    let mut session = GlobalFit::new();
    session
        .add_experiment(
            Experiment::new(
                "expt0",
                Model::new(ModelKind::SingleSite),
                x.clone(),
                single_site_heats(&x, 1.0e6, -5.0),
            )
            .unwrap(),
        )
        .unwrap();

    let config = LmConfig {
        deadline: Some(Duration::ZERO),
        ..LmConfig::default()
    };
    let report = session.fit_with_config(config).unwrap();

    assert_eq!(report.status, FitStatus::Cancelled);
    assert!(!report.params.is_empty());
    assert_eq!(session.state(), SessionState::Configured);
    assert!(matches!(session.fit_param(), Err(FitError::State(_))));
}

#[test]
fn plot_data_matches_observations_for_exact_data() {
    let x = titration_axis();
    let heats = single_site_heats(&x, 1.0e6, -5.0);

    let mut session = GlobalFit::new();
    session
        .add_experiment(
            Experiment::new("expt0", Model::new(ModelKind::SingleSite), x.clone(), heats.clone())
                .unwrap(),
        )
        .unwrap();
    session.update_guess("dh", -1.0, Some("expt0")).unwrap();

    session.fit().unwrap();
    let plots = session.plot_data().unwrap();

    assert_eq!(plots.len(), 1);
    assert_eq!(plots[0].experiment_id, "expt0");
    assert_eq!(plots[0].x, x);
    assert_eq!(plots[0].observed, heats);
    for (observed, predicted) in plots[0].observed.iter().zip(plots[0].predicted.iter()) {
        assert_relative_eq!(observed, predicted, epsilon = 1e-3);
    }
}

#[test]
fn refitting_without_mutation_is_allowed() {
    let x = titration_axis();
    let mut session = GlobalFit::new();
    session
        .add_experiment(
            Experiment::new(
                "expt0",
                Model::new(ModelKind::SingleSite),
                x.clone(),
                single_site_heats(&x, 1.0e6, -5.0),
            )
            .unwrap(),
        )
        .unwrap();

    session.fit().unwrap();
    let first = session.fit_param().unwrap();

    session.fit().unwrap();
    let second = session.fit_param().unwrap();
    assert_eq!(first.0.len(), second.0.len());
    assert_eq!(session.state(), SessionState::Fitted);
}

#[test]
fn structural_mutation_after_fit_invalidates_results() {
    let x = titration_axis();
    let mut session = GlobalFit::new();
    for id in ["a", "b"] {
        session
            .add_experiment(
                Experiment::new(
                    id,
                    Model::new(ModelKind::SingleSite),
                    x.clone(),
                    single_site_heats(&x, 1.0e6, -5.0),
                )
                .unwrap(),
            )
            .unwrap();
    }
    session.fit().unwrap();
    assert!(session.fit_param().is_ok());

    session.link_to_global("a", "dh", "global_dh").unwrap();
    assert!(matches!(session.fit_param(), Err(FitError::State(_))));
    assert_eq!(session.state(), SessionState::Configured);

    // A fresh fit under the new aliasing makes results readable again.
    session.link_to_global("b", "dh", "global_dh").unwrap();
    session.fit().unwrap();
    let (global, _) = session.fit_param().unwrap();
    assert!(global.contains_key("global_dh"));
}
