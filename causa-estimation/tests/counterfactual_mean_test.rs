//! Counterfactual mean strategies, estimators and effects on simulated data.

use causa_core::config::EstimationConfig;
use causa_core::errors::EstimationError;
use causa_estimation::{
    CounterfactualMean, Dataset, EffectOptions, EffectScale, Estimator, Strategy,
};
use causa_graphs::Graph;
use causa_identification::Functional;
use test_fixtures::simulate::{self, expit};

fn backdoor_graph() -> Graph {
    Graph::dag(&["C", "T", "Y"], &[("C", "T"), ("C", "Y"), ("T", "Y")]).unwrap()
}

fn frontdoor_graph() -> Graph {
    Graph::admg(&["T", "M", "Y"], &[("T", "M"), ("M", "Y")], &[("T", "Y")]).unwrap()
}

/// `E[Y(1)] - E[Y(0)]` in the front-door simulation.
fn frontdoor_truth() -> f64 {
    let mean = |t: f64| {
        let p_m = expit(-1.0 + 2.0 * t);
        [(0.0, 1.0 - p_m), (1.0, p_m)]
            .iter()
            .map(|(m, pm)| {
                pm * [0.0, 1.0]
                    .iter()
                    .map(|u| 0.5 * expit(-1.2 + 1.5 * m + 1.4 * u))
                    .sum::<f64>()
            })
            .sum::<f64>()
    };
    mean(1.0) - mean(0.0)
}

fn mean_difference(cmean: &CounterfactualMean, data: &Dataset, estimator: Estimator) -> f64 {
    cmean.estimate_mean(data, estimator, 1.0).unwrap() - cmean.estimate_mean(data, estimator, 0.0).unwrap()
}

// =============================================================================
// Strategies
// =============================================================================

#[test]
fn treatment_outside_its_descendants_district_is_a_fixable() {
    let g = Graph::admg(
        &["Z1", "Z2", "C1", "C2", "T", "M", "Y", "D1", "D2"],
        &[
            ("C1", "Z1"),
            ("C1", "T"),
            ("C1", "M"),
            ("C2", "Z1"),
            ("C2", "T"),
            ("C2", "M"),
            ("C2", "D1"),
            ("Z1", "Z2"),
            ("Z2", "T"),
            ("T", "M"),
            ("M", "Y"),
            ("M", "D1"),
            ("Y", "D2"),
            ("D1", "D2"),
        ],
        &[("Z1", "T"), ("Z2", "C1"), ("C2", "Y"), ("D1", "Y")],
    )
    .unwrap();
    let cmean = CounterfactualMean::new(&g, "T", "Y").unwrap();
    assert_eq!(cmean.strategy(), Strategy::AFixable);
    assert_eq!(cmean.mb_shielded(), g.mb_shielded());
    let efficient = [Estimator::EfficientAipw, Estimator::EfficientApipw];
    let expected: Vec<Estimator> = Estimator::ALL
        .into_iter()
        .filter(|e| cmean.mb_shielded() || !efficient.contains(e))
        .collect();
    assert_eq!(cmean.valid_estimators(), expected);

    let order = cmean.order();
    let position = |v: &str| order.iter().position(|o| o == v).unwrap();
    for v in ["C1", "C2", "Z1", "Z2"] {
        assert!(position(v) < position("T"));
    }
}

#[test]
fn treatments_childless_in_their_district_are_p_fixable() {
    let first = Graph::admg(
        &["C", "T", "M", "L", "Y"],
        &[("C", "T"), ("C", "M"), ("C", "L"), ("C", "Y"), ("T", "M"), ("M", "L"), ("M", "Y"), ("L", "Y")],
        &[("T", "L"), ("T", "Y")],
    )
    .unwrap();
    let second = Graph::admg(
        &["C", "T", "M", "L", "Y"],
        &[("C", "T"), ("C", "M"), ("C", "L"), ("C", "Y"), ("T", "M"), ("M", "L"), ("T", "Y"), ("L", "Y")],
        &[("T", "L"), ("M", "Y")],
    )
    .unwrap();
    for g in [first, second] {
        let cmean = CounterfactualMean::new(&g, "T", "Y").unwrap();
        assert_eq!(cmean.strategy(), Strategy::PFixable);
        assert!(cmean.mb_shielded());
        assert_eq!(
            cmean.valid_estimators(),
            vec![
                Estimator::PrimalIpw,
                Estimator::DualIpw,
                Estimator::Apipw,
                Estimator::EfficientApipw,
                Estimator::NestedIpw,
                Estimator::AugmentedNestedIpw,
                Estimator::PlugIn,
            ]
        );
    }
}

#[test]
fn identified_treatments_with_district_children_are_nested_fixable() {
    let g = Graph::admg(
        &["C", "T", "M", "Z", "R1", "R2", "Y"],
        &[
            ("C", "T"),
            ("C", "Y"),
            ("R2", "Y"),
            ("Z", "T"),
            ("T", "R1"),
            ("T", "Y"),
            ("R1", "M"),
            ("M", "Y"),
        ],
        &[("Z", "R2"), ("T", "R2"), ("Z", "R1"), ("C", "M"), ("C", "Y")],
    )
    .unwrap();
    let cmean = CounterfactualMean::new(&g, "T", "Y").unwrap();
    assert_eq!(cmean.strategy(), Strategy::NestedFixable);
    assert_eq!(
        cmean.valid_estimators(),
        vec![Estimator::NestedIpw, Estimator::AugmentedNestedIpw, Estimator::PlugIn]
    );
}

#[test]
fn efficient_estimators_are_rejected_without_mb_shielding() {
    let g = Graph::admg(&["C", "T", "Y"], &[("T", "Y")], &[("C", "Y")]).unwrap();
    let cmean = CounterfactualMean::new(&g, "T", "Y").unwrap();
    assert_eq!(cmean.strategy(), Strategy::AFixable);
    assert!(!cmean.mb_shielded());
    assert!(!cmean.valid_estimators().contains(&Estimator::EfficientAipw));
    assert!(cmean.valid_estimators().contains(&Estimator::Aipw));

    let data = Dataset::try_from(simulate::backdoor(50, 1)).unwrap();
    let err = cmean.estimate_mean(&data, Estimator::EfficientAipw, 1.0).unwrap_err();
    assert_eq!(
        err,
        EstimationError::InvalidStrategy {
            estimator: "eff-aipw".into(),
            strategy: "a-fixable (not mb-shielded)".into(),
        }
    );
}

#[test]
fn bow_graph_is_not_identified() {
    let g = Graph::admg(&["A", "Y"], &[("A", "Y")], &[("A", "Y")]).unwrap();
    let cmean = CounterfactualMean::new(&g, "A", "Y").unwrap();
    assert_eq!(cmean.strategy(), Strategy::NotIdentified);
    assert!(cmean.valid_estimators().is_empty());

    let data = Dataset::try_from(simulate::backdoor_binary(50, 1)).unwrap();
    let err = cmean.estimate_mean(&data, Estimator::PlugIn, 1.0).unwrap_err();
    assert_eq!(
        err,
        EstimationError::InvalidStrategy {
            estimator: "plug-in".into(),
            strategy: "not identified".into(),
        }
    );
}

#[test]
fn unknown_vertices_are_rejected() {
    assert!(matches!(
        CounterfactualMean::new(&backdoor_graph(), "T", "Q"),
        Err(EstimationError::Graph(_))
    ));
}

// =============================================================================
// Back-door adjustment: every estimator recovers the effect
// =============================================================================

#[test]
fn a_fixable_estimators_recover_the_average_causal_effect() {
    let data = Dataset::try_from(simulate::backdoor(10_000, 17)).unwrap();
    let cmean = CounterfactualMean::new(&backdoor_graph(), "T", "Y").unwrap();
    for estimator in [
        Estimator::Ipw,
        Estimator::Gformula,
        Estimator::Aipw,
        Estimator::EfficientAipw,
        Estimator::PrimalIpw,
        Estimator::DualIpw,
        Estimator::Apipw,
        Estimator::EfficientApipw,
        Estimator::NestedIpw,
        Estimator::AugmentedNestedIpw,
    ] {
        let ace = mean_difference(&cmean, &data, estimator);
        assert!((ace - 2.0).abs() < 0.2, "{estimator}: {ace}");
    }
}

#[test]
fn primal_and_dual_reduce_to_ipw_and_gformula_under_back_door() {
    let data = Dataset::try_from(simulate::backdoor(2_000, 3)).unwrap();
    let cmean = CounterfactualMean::new(&backdoor_graph(), "T", "Y").unwrap();
    let close = |a: Estimator, b: Estimator| {
        let x = cmean.estimate_mean(&data, a, 1.0).unwrap();
        let y = cmean.estimate_mean(&data, b, 1.0).unwrap();
        assert!((x - y).abs() < 1e-6, "{a} = {x}, {b} = {y}");
    };
    close(Estimator::PrimalIpw, Estimator::Ipw);
    close(Estimator::DualIpw, Estimator::Gformula);
    close(Estimator::Apipw, Estimator::DualIpw);
    // Least-squares augmentation terms average to zero.
    close(Estimator::EfficientAipw, Estimator::Ipw);
    close(Estimator::EfficientApipw, Estimator::DualIpw);
}

#[test]
fn effect_scale_follows_the_outcome() {
    let continuous = Dataset::try_from(simulate::backdoor(1_000, 4)).unwrap();
    let binary = Dataset::try_from(simulate::backdoor_binary(1_000, 4)).unwrap();
    let cmean = CounterfactualMean::new(&backdoor_graph(), "T", "Y").unwrap();
    let options = EffectOptions::default();

    let ace = cmean.compute_effect(&continuous, Estimator::Gformula, &options).unwrap();
    assert_eq!(ace.scale, EffectScale::AverageCausalEffect);
    assert!(ace.interval.is_none());

    let log_or = cmean.compute_effect(&binary, Estimator::Gformula, &options).unwrap();
    assert_eq!(log_or.scale, EffectScale::LogOddsRatio);
    let treated = cmean.estimate_mean(&binary, Estimator::Gformula, 1.0).unwrap();
    let control = cmean.estimate_mean(&binary, Estimator::Gformula, 0.0).unwrap();
    let expected = (treated / (1.0 - treated)).ln() - (control / (1.0 - control)).ln();
    assert!((log_or.estimate - expected).abs() < 1e-9);
}

#[test]
fn bootstrap_intervals_are_ordered_and_reproducible() {
    let data = Dataset::try_from(simulate::backdoor_binary(2_000, 8)).unwrap();
    let cmean = CounterfactualMean::new(&backdoor_graph(), "T", "Y").unwrap();
    let config = EstimationConfig {
        n_bootstraps: 20,
        alpha: 0.1,
        seed: 7,
        ..EstimationConfig::default()
    };
    let options = EffectOptions::from(&config);

    let effect = cmean.compute_effect(&data, Estimator::Aipw, &options).unwrap();
    let (low, high) = effect.interval.unwrap();
    assert!(low <= high);
    assert!(low > 0.0, "the simulated effect is positive: ({low}, {high})");

    let again = cmean.compute_effect(&data, Estimator::Aipw, &options).unwrap();
    assert_eq!(effect, again);
}

// =============================================================================
// Front door: p-fixable estimators and plug-in
// =============================================================================

#[test]
fn front_door_estimators_recover_the_effect() {
    let data = Dataset::try_from(simulate::frontdoor(10_000, 21)).unwrap();
    let cmean = CounterfactualMean::new(&frontdoor_graph(), "T", "Y").unwrap();
    assert_eq!(cmean.strategy(), Strategy::PFixable);

    let truth = frontdoor_truth();
    for estimator in [
        Estimator::PrimalIpw,
        Estimator::DualIpw,
        Estimator::Apipw,
        Estimator::EfficientApipw,
        Estimator::NestedIpw,
        Estimator::AugmentedNestedIpw,
        Estimator::PlugIn,
    ] {
        let effect = mean_difference(&cmean, &data, estimator);
        assert!((effect - truth).abs() < 0.06, "{estimator}: {effect} vs {truth}");
    }
}

#[test]
fn efficient_apipw_matches_dual_ipw_on_the_front_door() {
    let data = Dataset::try_from(simulate::frontdoor(3_000, 5)).unwrap();
    let cmean = CounterfactualMean::new(&frontdoor_graph(), "T", "Y").unwrap();
    for assignment in [0.0, 1.0] {
        let efficient = cmean.estimate_mean(&data, Estimator::EfficientApipw, assignment).unwrap();
        let dual = cmean.estimate_mean(&data, Estimator::DualIpw, assignment).unwrap();
        assert!((efficient - dual).abs() < 1e-6, "{efficient} vs {dual}");
    }
}

#[test]
fn front_door_rejects_back_door_estimators() {
    let data = Dataset::try_from(simulate::frontdoor(200, 1)).unwrap();
    let cmean = CounterfactualMean::new(&frontdoor_graph(), "T", "Y").unwrap();
    let err = cmean.estimate_mean(&data, Estimator::Ipw, 1.0).unwrap_err();
    assert_eq!(
        err,
        EstimationError::InvalidStrategy {
            estimator: "ipw".into(),
            strategy: "p-fixable".into(),
        }
    );
}

// =============================================================================
// Napkin: nested fixable treatment
// =============================================================================

fn napkin_graph() -> Graph {
    Graph::admg(
        &["W1", "W2", "X", "Y"],
        &[("W1", "W2"), ("W2", "X"), ("X", "Y")],
        &[("W1", "X"), ("W1", "Y")],
    )
    .unwrap()
}

/// `E[Y(1)] - E[Y(0)]` in the napkin simulation.
fn napkin_truth() -> f64 {
    let mean = |x: f64| {
        [0.0, 1.0]
            .iter()
            .map(|u| 0.5 * expit(-1.5 + 1.5 * x + 3.0 * u))
            .sum::<f64>()
    };
    mean(1.0) - mean(0.0)
}

#[test]
fn nested_estimators_recover_the_napkin_effect() {
    let data = Dataset::try_from(simulate::napkin(20_000, 13)).unwrap();
    let cmean = CounterfactualMean::new(&napkin_graph(), "X", "Y").unwrap();
    assert_eq!(cmean.strategy(), Strategy::NestedFixable);

    let truth = napkin_truth();
    for estimator in [Estimator::NestedIpw, Estimator::AugmentedNestedIpw, Estimator::PlugIn] {
        let effect = mean_difference(&cmean, &data, estimator);
        assert!((effect - truth).abs() < 0.05, "{estimator}: {effect} vs {truth}");
    }
}

#[test]
fn nested_ipw_is_a_weighted_average_of_outcomes() {
    let data = Dataset::try_from(simulate::napkin(2_000, 3)).unwrap();
    let cmean = CounterfactualMean::new(&napkin_graph(), "X", "Y").unwrap();
    for assignment in [0.0, 1.0] {
        let value = cmean.estimate_mean(&data, Estimator::NestedIpw, assignment).unwrap();
        assert!((0.0..=1.0).contains(&value), "n-ipw({assignment}) = {value}");
    }
}

#[test]
fn napkin_rejects_fixing_based_estimators() {
    let data = Dataset::try_from(simulate::napkin(200, 1)).unwrap();
    let cmean = CounterfactualMean::new(&napkin_graph(), "X", "Y").unwrap();
    let err = cmean.estimate_mean(&data, Estimator::PrimalIpw, 1.0).unwrap_err();
    assert_eq!(
        err,
        EstimationError::InvalidStrategy {
            estimator: "p-ipw".into(),
            strategy: "nested fixable".into(),
        }
    );
}

// =============================================================================
// Effect options and arbitrary functionals
// =============================================================================

#[test]
fn bootstrap_alpha_outside_the_unit_interval_is_rejected() {
    let data = Dataset::try_from(simulate::backdoor(200, 2)).unwrap();
    let cmean = CounterfactualMean::new(&backdoor_graph(), "T", "Y").unwrap();
    for alpha in [0.0, 1.5, -0.1, f64::NAN] {
        let options = EffectOptions {
            n_bootstraps: 5,
            alpha,
            seed: 1,
        };
        let err = cmean.compute_effect(&data, Estimator::Ipw, &options).unwrap_err();
        assert!(
            matches!(err, EstimationError::InvalidOption { ref name, .. } if name == "alpha"),
            "{alpha}: {err}"
        );
    }
    // Without bootstrap replicates alpha is unused.
    let options = EffectOptions {
        n_bootstraps: 0,
        alpha: 2.0,
        seed: 1,
    };
    assert!(cmean.compute_effect(&data, Estimator::Ipw, &options).is_ok());
}

#[test]
fn estimate_evaluates_any_functional() {
    let data = Dataset::try_from(simulate::frontdoor(500, 2)).unwrap();
    let cmean = CounterfactualMean::new(&frontdoor_graph(), "T", "Y").unwrap();
    let marginal = Functional::bind("M", 1.0, Functional::prob(["M"], Vec::<String>::new()));
    let value = cmean.estimate(&data, &marginal).unwrap();
    assert!((value - data.mean("M").unwrap()).abs() < 1e-12);
}
