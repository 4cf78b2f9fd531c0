//! Property tests for causa-estimation: plug-in probabilities normalize and
//! least squares recovers noiseless linear models.

use std::collections::BTreeMap;

use proptest::prelude::*;

use causa_estimation::{Dataset, Family, Glm, GlmOptions, PlugInEvaluator};
use causa_identification::Functional;

fn dataset(columns: &[(&str, Vec<f64>)]) -> Dataset {
    columns
        .iter()
        .map(|(name, values)| (name.to_string(), values.clone()))
        .collect::<BTreeMap<_, _>>()
        .try_into()
        .unwrap()
}

// =============================================================================
// Marginals sum to one over the observed domain
// =============================================================================
proptest! {
    #[test]
    fn marginals_sum_to_one(rows in prop::collection::vec((0u8..4, 0u8..3), 1..60)) {
        let a: Vec<f64> = rows.iter().map(|(a, _)| f64::from(*a)).collect();
        let b: Vec<f64> = rows.iter().map(|(_, b)| f64::from(*b)).collect();
        let data = dataset(&[("A", a), ("B", b)]);
        let mut evaluator = PlugInEvaluator::new(&data);

        let joint = Functional::sum(["A", "B"], Functional::prob(["A", "B"], Vec::<String>::new()));
        prop_assert!((evaluator.evaluate(&joint).unwrap() - 1.0).abs() < 1e-9);

        for value in data.domain("B").unwrap() {
            let conditional = Functional::bind("B", value, Functional::sum(["A"], Functional::prob(["A"], ["B"])));
            prop_assert!((evaluator.evaluate(&conditional).unwrap() - 1.0).abs() < 1e-9);
        }
    }
}

// =============================================================================
// Least squares recovers noiseless coefficients
// =============================================================================
proptest! {
    #[test]
    fn least_squares_recovers_coefficients(
        intercept in -5.0f64..5.0,
        slope in -5.0f64..5.0,
        xs in prop::collection::btree_set(-50i32..50, 3..30),
    ) {
        let x: Vec<f64> = xs.iter().map(|&v| f64::from(v) / 10.0).collect();
        let y: Vec<f64> = x.iter().map(|v| intercept + slope * v).collect();
        let data = dataset(&[("X", x), ("Y", y)]);
        let model = Glm::fit(&data, "Y", &["X".to_string()], Family::Gaussian, &GlmOptions::default()).unwrap();
        prop_assert!((model.coefficients()[0] - intercept).abs() < 1e-6);
        prop_assert!((model.coefficients()[1] - slope).abs() < 1e-6);
    }
}
