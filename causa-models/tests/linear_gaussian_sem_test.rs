//! Linear Gaussian SEM fitting by RICF.

use causa_core::errors::ModelError;
use causa_estimation::Dataset;
use causa_graphs::Graph;
use causa_models::{FitOptions, LinearGaussianSem};
use test_fixtures::simulate;

fn verma() -> Graph {
    Graph::admg(
        &["A", "B", "C", "D"],
        &[("A", "B"), ("B", "C"), ("C", "D")],
        &[("B", "D")],
    )
    .unwrap()
}

fn verma_data(n: usize) -> Dataset {
    Dataset::try_from(simulate::verma_linear_gaussian(n, 29, 0.5)).unwrap()
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn parameters_count_vertices_and_edges() {
    let model = LinearGaussianSem::new(&verma()).unwrap();
    assert_eq!(model.n_params(), 8);
    assert_eq!(model.vertices(), &["A", "B", "C", "D"].map(String::from));
}

#[test]
fn undirected_edges_are_rejected() {
    let g = Graph::cg(&["A", "B", "C"], &[("A", "B")], &[("B", "C")]).unwrap();
    assert!(matches!(
        LinearGaussianSem::new(&g),
        Err(ModelError::UnsupportedGraph { .. })
    ));
}

#[test]
fn queries_before_fitting_are_state_errors() {
    let model = LinearGaussianSem::new(&verma()).unwrap();
    assert_eq!(
        model.coefficients().unwrap_err(),
        ModelError::State {
            operation: "coefficients",
            requires: "fit",
        }
    );
    assert!(model.neg_log_likelihood(&verma_data(10)).is_err());
    assert!(model.total_effect("A", "D").is_err());
    assert!(!model.is_fitted());
}

// =============================================================================
// Fitting
// =============================================================================

#[test]
fn verma_model_recovers_generating_parameters() {
    let data = verma_data(5_000);
    let mut model = LinearGaussianSem::new(&verma()).unwrap();
    model.fit(&data).unwrap();
    assert!(model.converged().unwrap());

    assert!((model.coefficient("A", "B").unwrap() - 3.0).abs() < 0.1);
    assert!((model.coefficient("B", "C").unwrap() + 1.0).abs() < 0.1);
    assert!((model.coefficient("C", "D").unwrap() - 2.5).abs() < 0.1);
    assert_eq!(model.coefficient("A", "D").unwrap(), 0.0);
    assert!((model.error_covariance("B", "D").unwrap() - 0.5).abs() < 0.1);
    assert_eq!(model.error_covariance("A", "C").unwrap(), 0.0);

    let omega = model.covariance().unwrap();
    assert_eq!(omega, &omega.transpose());
    for i in 0..4 {
        assert!((omega[(i, i)] - 1.0).abs() < 0.15);
    }
}

#[test]
fn total_effect_multiplies_along_directed_paths() {
    let data = verma_data(5_000);
    let mut model = LinearGaussianSem::new(&verma()).unwrap();
    model.fit(&data).unwrap();

    let expected = model.coefficient("A", "B").unwrap()
        * model.coefficient("B", "C").unwrap()
        * model.coefficient("C", "D").unwrap();
    let effect = model.total_effect("A", "D").unwrap();
    assert!((effect - expected).abs() < 1e-12);
    assert!((effect + 7.5).abs() < 0.3);
    assert_eq!(model.total_effect("D", "A").unwrap(), 0.0);
}

#[test]
fn total_effect_sums_parallel_paths() {
    let g = Graph::dag(&["A", "B", "Y"], &[("A", "B"), ("B", "Y"), ("A", "Y")]).unwrap();
    let mut columns = simulate::verma_linear_gaussian(2_000, 3, 0.0);
    let c = columns.remove("C").unwrap();
    columns.insert("Y".to_string(), c);
    let renamed = Dataset::try_from(columns).unwrap();
    let mut model = LinearGaussianSem::new(&g).unwrap();
    model.fit(&renamed).unwrap();

    let direct = model.coefficient("A", "Y").unwrap();
    let indirect = model.coefficient("A", "B").unwrap() * model.coefficient("B", "Y").unwrap();
    assert!((model.total_effect("A", "Y").unwrap() - (direct + indirect)).abs() < 1e-12);
}

#[test]
fn dags_converge_after_a_repeat_sweep() {
    let g = Graph::dag(&["A", "B", "C", "D"], &[("A", "B"), ("B", "C"), ("C", "D")]).unwrap();
    let mut model = LinearGaussianSem::new(&g).unwrap();
    model.fit(&verma_data(1_000)).unwrap();
    assert_eq!(model.iterations().unwrap(), 2);
}

#[test]
fn bidirected_edge_never_worsens_the_fit() {
    let data = verma_data(3_000);
    let mut with_edge = LinearGaussianSem::new(&verma()).unwrap();
    with_edge.fit(&data).unwrap();
    let g = Graph::dag(&["A", "B", "C", "D"], &[("A", "B"), ("B", "C"), ("C", "D")]).unwrap();
    let mut without_edge = LinearGaussianSem::new(&g).unwrap();
    without_edge.fit(&data).unwrap();

    let nll_with = with_edge.neg_log_likelihood(&data).unwrap();
    let nll_without = without_edge.neg_log_likelihood(&data).unwrap();
    assert!(nll_with <= nll_without + 1e-6);

    let bic = with_edge.bic(&data).unwrap();
    let expected = 2.0 * nll_with + 8.0 * (3_000f64).ln();
    assert!((bic - expected).abs() < 1e-9);
}

// =============================================================================
// Convergence control
// =============================================================================

#[test]
fn running_out_of_iterations_is_an_error_by_default() {
    let data = verma_data(1_000);
    let mut model = LinearGaussianSem::new(&verma()).unwrap();
    let options = FitOptions {
        max_iterations: 1,
        tolerance: 1e-12,
        accept_unconverged: false,
    };
    match model.fit_with(&data, &options).unwrap_err() {
        ModelError::Convergence { iterations, .. } => assert_eq!(iterations, 1),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!model.is_fitted());
}

#[test]
fn unconverged_estimates_can_be_kept_explicitly() {
    let data = verma_data(1_000);
    let mut model = LinearGaussianSem::new(&verma()).unwrap();
    let options = FitOptions {
        max_iterations: 1,
        tolerance: 1e-12,
        accept_unconverged: true,
    };
    model.fit_with(&data, &options).unwrap();
    assert!(!model.converged().unwrap());
    assert!(model.coefficients().is_ok());
}

#[test]
fn missing_columns_are_invalid_data() {
    let data = Dataset::try_from(simulate::backdoor(100, 1)).unwrap();
    let mut model = LinearGaussianSem::new(&verma()).unwrap();
    assert!(matches!(model.fit(&data), Err(ModelError::InvalidData { .. })));
}
